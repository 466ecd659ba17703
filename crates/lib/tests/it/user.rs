//! Field accessors and mutators on user handles.

use chrono::NaiveDate;
use ftpacct::{Error, Flag, StoreConfig, constants::DEFAULT_RATIO, store::StoreError};

use crate::helpers::*;

#[test]
fn test_rename_to_self_is_noop() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    user.rename("w00t").unwrap();
    assert_eq!(user.name().unwrap(), "w00t");
    assert_eq!(store.total_count(), 1);
}

#[test]
fn test_rename_collision() {
    let store = test_store();
    let a = create_user(&store, "alice", 1);
    create_user(&store, "bob", 2);

    let err = a.rename("bob").unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::NameAlreadyTaken { .. })));
    assert_eq!(a.name().unwrap(), "alice");
    assert_eq!(store.uid_for_name("bob"), Some(2));
}

#[test]
fn test_rename_frees_old_name() {
    let store = test_store();
    let user = create_user(&store, "old", 1);
    user.rename("new").unwrap();
    create_user(&store, "old", 2);
    assert_eq!(store.uid_for_name("old"), Some(2));
    assert_eq!(store.uid_for_name("new"), Some(1));
}

#[test]
fn test_rename_validates() {
    let store = test_store();
    let user = create_user(&store, "w00t", 1);
    assert!(user.rename("bad name").unwrap_err().is_validation_error());
    assert!(user.rename("").unwrap_err().is_validation_error());
    assert_eq!(user.name().unwrap(), "w00t");
}

#[test]
fn test_handles_observe_each_other() {
    let store = test_store();
    let a = create_user(&store, "w00t", 42);
    let b = store.load_by_uid(42).unwrap();
    a.set_tagline("from a").unwrap();
    assert_eq!(b.tagline().unwrap(), "from a");
    b.rename("renamed").unwrap();
    assert_eq!(a.name().unwrap(), "renamed");
}

#[test]
fn test_password() {
    let store = test_store();
    let user = store.create("w00t", 42, Some("hunter2")).unwrap();
    assert!(user.has_password().unwrap());
    assert!(user.verify_password("hunter2").unwrap());
    assert!(!user.verify_password("hunter3").unwrap());

    user.set_password("changed").unwrap();
    assert!(!user.verify_password("hunter2").unwrap());
    assert!(user.verify_password("changed").unwrap());

    let record = user.record().unwrap();
    let debug = format!("{record:?}");
    assert!(!debug.contains("argon2"), "hash leaked into Debug output");
}

#[test]
fn test_user_without_password_never_verifies() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    assert!(!user.has_password().unwrap());
    assert!(!user.verify_password("").unwrap());
    assert!(!user.verify_password("anything").unwrap());
}

#[test]
fn test_tagline_and_comment() {
    let store = test_store_with(StoreConfig::default().with_max_tagline_len(10));
    let user = create_user(&store, "w00t", 42);

    user.set_tagline("hi there").unwrap();
    assert_eq!(user.tagline().unwrap(), "hi there");
    assert!(user.set_tagline("this is far too long").unwrap_err().is_validation_error());
    assert!(user.set_tagline("bad\ttab").unwrap_err().is_validation_error());
    assert_eq!(user.tagline().unwrap(), "hi there");

    user.set_comment("note").unwrap();
    assert_eq!(user.comment().unwrap(), "note");
    assert!(user.set_comment("line\nbreak").is_err());
}

#[test]
fn test_flags() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    assert!(user.flags().unwrap().is_empty());

    user.set_flags("A3").unwrap();
    assert_eq!(user.flags().unwrap().to_string(), "3A");
    user.add_flags("1").unwrap();
    assert!(user.has_flag(Flag::Siteop).unwrap());
    assert!(user.has_flag(Flag::Nuke).unwrap());
    user.del_flags("A").unwrap();
    assert!(!user.has_flag(Flag::Nuke).unwrap());
    assert!(user.has_any_flag("12").unwrap());
    assert!(!user.has_any_flag("2B").unwrap());

    let err = user.set_flags("1Z").unwrap_err();
    assert!(err.is_validation_error());
    assert_eq!(user.flags().unwrap().to_string(), "13");
}

#[test]
fn test_record_login() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    assert!(user.last_login().unwrap().is_none());
    assert_eq!(user.login_count().unwrap(), 0);

    let at = user.record_login().unwrap();
    assert_eq!(user.last_login().unwrap(), Some(at));
    assert!(at >= user.created().unwrap());

    user.record_login().unwrap();
    assert_eq!(user.login_count().unwrap(), 2);
}

#[test]
fn test_creator_is_unset_for_plain_create() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    assert_eq!(user.creator().unwrap(), None);
}

#[test]
fn test_ratios() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    assert_eq!(user.default_ratio().unwrap(), DEFAULT_RATIO);
    assert_eq!(user.section_ratio("MP3").unwrap(), None);
    assert_eq!(user.effective_ratio("MP3").unwrap(), DEFAULT_RATIO);

    user.set_section_ratio("MP3", 0).unwrap();
    user.set_default_ratio(5).unwrap();
    assert_eq!(user.section_ratio("MP3").unwrap(), Some(0));
    assert_eq!(user.effective_ratio("MP3").unwrap(), 0);
    assert_eq!(user.effective_ratio("ISO").unwrap(), 5);
    assert_eq!(user.section_ratios().unwrap(), vec![("MP3".to_string(), 0)]);

    assert!(user.clear_section_ratio("MP3").unwrap());
    assert!(!user.clear_section_ratio("MP3").unwrap());
    assert_eq!(user.effective_ratio("MP3").unwrap(), 5);
}

#[test]
fn test_weekly_allotments() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    assert_eq!(user.default_allotment().unwrap(), 0);

    user.set_default_allotment(2048).unwrap();
    user.set_section_allotment("MP3", 1024).unwrap();
    assert_eq!(user.default_allotment().unwrap(), 2048);
    assert_eq!(user.section_allotment("MP3").unwrap(), 1024);
    assert_eq!(user.section_allotment("ISO").unwrap(), 0);
    assert_eq!(
        user.section_allotments().unwrap(),
        vec![("MP3".to_string(), 1024)]
    );

    user.set_section_allotment("MP3", 0).unwrap();
    assert!(user.section_allotments().unwrap().is_empty());
}

#[test]
fn test_home_dir() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    assert_eq!(user.home_dir().unwrap(), "/");

    user.set_home_dir("/site/private").unwrap();
    assert_eq!(user.home_dir().unwrap(), "/site/private");

    for bad in ["", "relative/path", "/site/../etc", "/bad\nline"] {
        let err = user.set_home_dir(bad).unwrap_err();
        assert!(err.is_validation_error(), "{bad:?}: {err}");
    }
    assert_eq!(user.home_dir().unwrap(), "/site/private");
}

#[test]
fn test_idle_time_and_login_limit() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    assert_eq!(user.idle_time().unwrap(), None);
    assert_eq!(user.num_logins().unwrap(), Some(1));

    user.set_idle_time(Some(900)).unwrap();
    user.set_num_logins(Some(3)).unwrap();
    assert_eq!(user.idle_time().unwrap(), Some(900));
    assert_eq!(user.num_logins().unwrap(), Some(3));

    user.set_num_logins(None).unwrap();
    assert_eq!(user.num_logins().unwrap(), None);

    // The login limit is independent of the login counter
    user.record_login().unwrap();
    assert_eq!(user.login_count().unwrap(), 1);
    assert_eq!(user.num_logins().unwrap(), None);
}

#[test]
fn test_expiry() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    assert_eq!(user.expires().unwrap(), None);
    assert!(!user.expired().unwrap());

    let past = NaiveDate::from_ymd_opt(2001, 9, 1);
    user.set_expires(past).unwrap();
    assert_eq!(user.expires().unwrap(), past);
    assert!(user.expired().unwrap());

    user.set_expires(None).unwrap();
    assert!(!user.expired().unwrap());
}
