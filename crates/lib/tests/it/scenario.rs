//! End-to-end account administration walkthroughs.

use ftpacct::{AccountStore, Flag};

use crate::helpers::*;

#[test]
fn test_w00t_walkthrough() {
    let store = test_store();
    let user = store.create("w00t", 42, None).unwrap();

    user.rename("w00t").unwrap();
    assert_eq!(user.name().unwrap(), "w00t");

    assert!(user.add_ip_mask("10.0.0.*").unwrap().is_added());
    assert!(!user.remove_ip_mask("not-present").unwrap());
    assert_eq!(user.ip_masks().unwrap(), vec!["10.0.0.*"]);

    user.incr_default_credits(100_000).unwrap();
    assert_eq!(user.get_default_credits().unwrap(), 100_000);

    assert_eq!(store.total_count(), 1);
}

#[test]
fn test_site_administration_session() {
    let (dir, store) = temp_store();

    // Bootstrap an administrator and a template account
    store.create_group(1, "siteops").unwrap();
    store.create_group(2, "uploaders").unwrap();
    let admin = store.create("admin", 1, Some("s3cret")).unwrap();
    admin.set_primary_group(1).unwrap();
    admin.set_flags("1").unwrap();
    admin.add_ip_mask("*@127.0.0.1").unwrap();

    let template = store.create("default.user", 100, None).unwrap();
    template.set_primary_group(2).unwrap();
    template.add_ip_mask("*@10.0.0.*").unwrap();
    template.incr_default_credits(15_000).unwrap();
    template.set_flags("3A").unwrap();

    // The admin adds a new user from the template
    let uid = store.next_free_uid().unwrap();
    assert_eq!(uid, 101);
    let newbie = store
        .create_from_template("default.user", "newbie", uid, Some("pass"), Some(admin.uid()))
        .unwrap();
    assert_eq!(newbie.creator().unwrap(), Some(1));
    assert!(newbie.has_flag(Flag::Nuke).unwrap());
    assert!(newbie.has_flag(Flag::Glock).unwrap());

    // The new user logs in from an allowed address and downloads
    assert!(store.address_allowed("10.0.0.20"));
    let session = store.login("newbie", "ftp@10.0.0.20", "pass").unwrap();
    assert_eq!(session.take_default_credits_saturating(20_000).unwrap(), 15_000);
    session.incr_section_credits("MP3", 500).unwrap();

    // Refused from elsewhere
    assert!(store.login("newbie", "192.168.0.1", "pass").is_err());

    // Group listing reflects memberships
    let uploaders = store.group_members(2).unwrap();
    assert_eq!(uploaders.primary, vec![100, 101]);

    let matched: Vec<String> = store
        .uids_matching("*e*")
        .into_iter()
        .filter_map(|uid| store.name_for_uid(uid))
        .collect();
    assert_eq!(matched, vec!["default.user", "newbie"]);
    assert_eq!(store.uids_matching("=uploaders -admin"), vec![1, 100, 101]);

    drop((admin, template, newbie, session));
    drop(store);

    // Everything is still there after a restart
    let store = AccountStore::open_dir(dir.path()).unwrap();
    let newbie = store.load_by_name("newbie").unwrap();
    assert_eq!(newbie.get_default_credits().unwrap(), 0);
    assert_eq!(newbie.get_section_credits("MP3").unwrap(), 500);
    assert_eq!(newbie.login_count().unwrap(), 1);
    assert_eq!(newbie.primary_group().unwrap().name, "uploaders");

    // Retire the account
    store.delete(newbie.uid()).unwrap();
    assert_eq!(store.all_uids(), vec![1, 100]);
}
