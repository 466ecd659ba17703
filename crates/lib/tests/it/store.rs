//! Store-level operations: create, delete, lookup, enumeration.

use ftpacct::{Error, store::StoreError};

use crate::helpers::*;

#[test]
fn test_create_then_load_by_name_and_uid() {
    let store = test_store();
    for (name, uid) in [("alice", 1), ("bob", 2), ("w00t", 42), ("x.y_z-1", 4_000_000)] {
        create_user(&store, name, uid);

        let by_name = store.load_by_name(name).unwrap();
        let by_uid = store.load_by_uid(uid).unwrap();
        assert_eq!(by_name.uid(), uid);
        assert_eq!(by_uid.name().unwrap(), name);

        let record = by_uid.record().unwrap();
        assert_eq!(record.primary_gid, 0);
        assert!(record.secondary_gids.is_empty());
        assert!(record.ip_masks.is_empty());
        assert_eq!(record.credits.get_default(), 0);
        assert!(record.tagline.is_empty());
        assert!(record.last_login.is_none());
        assert!(record.credential.is_none());
    }
    assert_eq!(store.total_count(), 4);
}

#[test]
fn test_duplicate_name_or_uid_is_rejected() {
    let store = test_store();
    create_user(&store, "w00t", 42);

    let err = store.create("w00t", 43, None).unwrap_err();
    assert!(err.is_conflict());
    assert!(matches!(err, Error::Store(StoreError::DuplicateIdentity(_))));

    let err = store.create("other", 42, None).unwrap_err();
    assert!(err.is_conflict());

    assert_eq!(store.total_count(), 1);
}

#[test]
fn test_invalid_names_are_rejected() {
    let store = test_store();
    let long = "n".repeat(33);
    for bad in ["", "-dash", "has space", "a/b", long.as_str()] {
        let err = store.create(bad, 1, None).unwrap_err();
        assert!(err.is_validation_error(), "{bad:?}: {err}");
    }
    assert_eq!(store.total_count(), 0);
}

#[test]
fn test_lookup_misses() {
    let store = test_store();
    assert!(store.load_by_name("ghost").unwrap_err().is_not_found());
    assert!(store.load_by_uid(7).unwrap_err().is_not_found());
    assert!(store.uid_for_name("ghost").is_none());
    assert!(store.name_for_uid(7).is_none());
    assert!(!store.exists_name("ghost"));
    assert!(!store.exists_uid(7));
}

#[test]
fn test_names_are_case_sensitive() {
    let store = test_store();
    create_user(&store, "Bob", 1);
    create_user(&store, "bob", 2);
    assert_eq!(store.uid_for_name("Bob"), Some(1));
    assert_eq!(store.uid_for_name("bob"), Some(2));
    assert!(store.load_by_name("BOB").is_err());
}

#[test]
fn test_delete_removes_identity() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    store.delete(42).unwrap();

    assert_eq!(store.total_count(), 0);
    assert!(store.load_by_name("w00t").unwrap_err().is_not_found());
    assert!(store.load_by_uid(42).unwrap_err().is_not_found());

    // Stale handles fail instead of resurrecting the record
    assert!(user.name().unwrap_err().is_not_found());
    assert!(user.incr_default_credits(1).unwrap_err().is_not_found());

    // Deleting twice is a lookup miss
    assert!(store.delete(42).unwrap_err().is_not_found());

    // Both halves of the identity can be reused
    create_user(&store, "w00t", 42);
    assert_eq!(store.total_count(), 1);
}

#[test]
fn test_all_uids_is_ordered() {
    let store = test_store();
    for (name, uid) in [("c", 30), ("a", 10), ("b", 20)] {
        create_user(&store, name, uid);
    }
    assert_eq!(store.all_uids(), vec![10, 20, 30]);
}

#[test]
fn test_all_users_is_a_restartable_snapshot() {
    let store = test_store();
    create_user(&store, "a", 1);
    create_user(&store, "b", 2);

    let users = store.all_users();
    assert_eq!(users.len(), 2);

    // Changes after the snapshot do not alter the set of yielded users
    create_user(&store, "c", 3);
    let names: Vec<String> = users.map(|u| u.name().unwrap()).collect();
    assert_eq!(names, vec!["a", "b"]);

    // A new call sees the new state
    assert_eq!(store.all_users().count(), 3);
    assert_eq!(store.all_users().count(), 3);
}

#[test]
fn test_next_free_uid() {
    let store = test_store();
    assert_eq!(store.next_free_uid().unwrap(), 1);
    create_user(&store, "a", 5);
    create_user(&store, "b", 2);
    assert_eq!(store.next_free_uid().unwrap(), 6);

    create_user(&store, "max", u32::MAX);
    let err = store.next_free_uid().unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::NoFreeUid)));
}

#[test]
fn test_uids_matching() {
    let store = test_store();
    create_user(&store, "alice", 3);
    create_user(&store, "albert", 1);
    create_user(&store, "bob", 2);

    assert_eq!(store.uids_matching("*"), vec![1, 2, 3]);
    assert_eq!(store.uids_matching("al*"), vec![1, 3]);
    assert_eq!(store.uids_matching("b?b"), vec![2]);
    assert!(store.uids_matching("zed*").is_empty());
    assert!(store.uids_matching("").is_empty());
}

#[test]
fn test_uids_matching_token_lists() {
    let store = store_with_groups(&[(1, "staff"), (2, "friends")]);
    let alice = create_user(&store, "alice", 3);
    let albert = create_user(&store, "albert", 1);
    create_user(&store, "bob", 2);
    create_user(&store, "carol", 4);
    alice.set_primary_group(1).unwrap();
    albert.add_secondary_groups(&[1]).unwrap();

    // Exact names, separated by any run of spaces
    assert_eq!(store.uids_matching("bob  carol"), vec![2, 4]);
    assert_eq!(store.uids_matching("bob ghost"), vec![2]);
    // Group members, primary and secondary alike
    assert_eq!(store.uids_matching("=staff"), vec![1, 3]);
    assert!(store.uids_matching("=friends").is_empty());
    assert!(store.uids_matching("=nosuchgroup").is_empty());
    // Mixed tokens are merged without repeats
    assert_eq!(store.uids_matching("=staff alice -bob"), vec![1, 2, 3]);
    assert_eq!(store.uids_matching("c* =staff"), vec![1, 3, 4]);
    // A lone star selects everybody, whatever else is listed
    assert_eq!(store.uids_matching("bob *"), vec![1, 2, 3, 4]);
}

#[test]
fn test_name_for_uid_follows_rename() {
    let store = test_store();
    let user = create_user(&store, "before", 9);
    user.rename("after").unwrap();
    assert_eq!(store.name_for_uid(9).as_deref(), Some("after"));
    assert_eq!(store.uid_for_name("after"), Some(9));
    assert!(store.uid_for_name("before").is_none());
}

#[test]
fn test_create_from_template_copies_settings() {
    let store = store_with_groups(&[(1, "staff"), (2, "friends")]);
    let template = create_user(&store, "default.user", 100);
    template.add_ip_mask("*@10.*").unwrap();
    template.set_primary_group(1).unwrap();
    template.add_secondary_groups(&[2]).unwrap();
    template.incr_default_credits(500).unwrap();
    template.incr_section_credits("MP3", 7).unwrap();
    template.set_flags("3").unwrap();
    template.set_section_ratio("MP3", 0).unwrap();
    template.set_default_allotment(4096).unwrap();
    template.set_home_dir("/incoming").unwrap();
    template.set_idle_time(Some(300)).unwrap();
    template.set_num_logins(Some(2)).unwrap();
    template.add_gadmin_gid(2).unwrap();
    template.set_tagline("new here").unwrap();
    template.record_login().unwrap();

    let admin = create_user(&store, "admin", 1);
    let user = store
        .create_from_template("default.user", "newbie", 101, Some("pw"), Some(admin.uid()))
        .unwrap();

    let record = user.record().unwrap();
    assert_eq!(record.name, "newbie");
    assert_eq!(record.uid, 101);
    assert_eq!(record.ip_masks.to_strings(), vec!["*@10.*"]);
    assert_eq!(record.primary_gid, 1);
    assert_eq!(record.secondary_gids, vec![2]);
    assert_eq!(record.credits.get_default(), 500);
    assert_eq!(record.credits.get_section("MP3"), 7);
    assert_eq!(record.flags.to_string(), "3");
    assert_eq!(record.ratios.section("MP3"), Some(0));
    assert_eq!(record.allotments.default_allotment(), 4096);
    assert_eq!(record.home_dir, "/incoming");
    assert_eq!(record.idle_time, Some(300));
    assert_eq!(record.num_logins, Some(2));
    assert_eq!(record.tagline, "new here");
    assert_eq!(record.creator, Some(1));
    // Per-account history is not copied
    assert!(record.last_login.is_none());
    assert_eq!(record.login_count, 0);
    // Group administration stays with the template
    assert!(record.gadmin_gids.is_empty());
    assert_eq!(store.group_members(2).unwrap().gadmins, vec![100]);
    assert!(user.verify_password("pw").unwrap());

    let members = store.group_members(1).unwrap();
    assert_eq!(members.primary, vec![100, 101]);
}

#[test]
fn test_create_from_missing_template() {
    let store = test_store();
    let err = store
        .create_from_template("nobody", "newbie", 1, None, None)
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(store.total_count(), 0);
}

#[test]
fn test_store_clones_share_state() {
    let store = test_store();
    let clone = store.clone();
    create_user(&clone, "shared", 1);
    assert!(store.exists_name("shared"));
}
