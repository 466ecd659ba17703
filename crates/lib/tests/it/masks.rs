//! IP masks, connection admission and login.

use chrono::NaiveDate;
use ftpacct::{
    Error, StoreConfig, credential::CredentialError, mask::MaskAdd, store::StoreError,
};

use crate::helpers::*;

#[test]
fn test_add_and_remove_masks() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);

    assert!(user.add_ip_mask("*@127.0.0.1").unwrap().is_added());
    assert!(user.add_ip_mask("10.0.0.*").unwrap().is_added());
    assert!(!user.add_ip_mask("10.0.0.*").unwrap().is_added());
    assert_eq!(user.ip_masks().unwrap(), vec!["*@127.0.0.1", "10.0.0.*"]);

    assert!(user.remove_ip_mask("10.0.0.*").unwrap());
    assert!(!user.remove_ip_mask("not-present").unwrap());
    assert_eq!(user.ip_masks().unwrap(), vec!["*@127.0.0.1"]);
}

#[test]
fn test_invalid_masks_are_rejected() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    for bad in ["", "has space", "a@b@c", "@10.0.0.1", "ident@"] {
        let err = user.add_ip_mask(bad).unwrap_err();
        assert!(err.is_validation_error(), "{bad:?}: {err}");
    }
    assert!(user.ip_masks().unwrap().is_empty());
}

#[test]
fn test_mask_limit() {
    let store = test_store_with(StoreConfig::default().with_max_ip_masks(2));
    let user = create_user(&store, "w00t", 42);
    user.add_ip_mask("10.*").unwrap();
    user.add_ip_mask("192.168.*").unwrap();

    let err = user.add_ip_mask("172.16.*").unwrap_err();
    assert!(err.is_validation_error());
    assert_eq!(user.ip_masks().unwrap().len(), 2);

    // Re-adding an existing mask at the limit is still a no-op
    assert!(!user.add_ip_mask("10.*").unwrap().is_added());

    // A broader mask fits by replacing the ones it covers
    let added = user.add_ip_mask("*").unwrap();
    assert_eq!(
        added,
        MaskAdd::Added {
            replaced: vec!["10.*".to_string(), "192.168.*".to_string()]
        }
    );
    assert_eq!(user.ip_masks().unwrap(), vec!["*"]);
}

#[test]
fn test_covered_mask_is_not_added() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    user.add_ip_mask("*@10.0.*").unwrap();

    let outcome = user.add_ip_mask("*@10.0.0.1").unwrap();
    assert_eq!(
        outcome,
        MaskAdd::Covered {
            by: "*@10.0.*".to_string()
        }
    );
    assert_eq!(user.ip_masks().unwrap(), vec!["*@10.0.*"]);
}

#[test]
fn test_broader_mask_replaces_narrower_ones() {
    let (dir, store) = temp_store();
    let user = create_user(&store, "w00t", 42);
    user.add_ip_mask("*@10.0.0.1").unwrap();
    user.add_ip_mask("ident@10.0.0.2").unwrap();
    user.add_ip_mask("*@192.168.1.*").unwrap();

    let outcome = user.add_ip_mask("*@10.0.0.*").unwrap();
    assert_eq!(
        outcome,
        MaskAdd::Added {
            replaced: vec!["*@10.0.0.1".to_string(), "ident@10.0.0.2".to_string()]
        }
    );
    assert_eq!(
        user.ip_masks().unwrap(),
        vec!["*@192.168.1.*", "*@10.0.0.*"]
    );

    drop(user);
    drop(store);
    let reopened = ftpacct::AccountStore::open_dir(dir.path()).unwrap();
    let user = reopened.load_by_uid(42).unwrap();
    assert_eq!(
        user.ip_masks().unwrap(),
        vec!["*@192.168.1.*", "*@10.0.0.*"]
    );
}

#[test]
fn test_remove_mask_by_index() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    user.add_ip_mask("10.*").unwrap();
    user.add_ip_mask("*@192.168.1.*").unwrap();
    user.add_ip_mask("ident@172.16.*").unwrap();

    assert_eq!(user.remove_ip_mask_at(1).unwrap(), "*@192.168.1.*");
    assert_eq!(user.ip_masks().unwrap(), vec!["10.*", "ident@172.16.*"]);

    let err = user.remove_ip_mask_at(2).unwrap_err();
    assert!(err.is_validation_error());
    assert_eq!(user.ip_masks().unwrap().len(), 2);
}

#[test]
fn test_clear_masks() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    user.add_ip_mask("10.*").unwrap();
    user.add_ip_mask("*@192.168.1.*").unwrap();

    let removed = user.clear_ip_masks().unwrap();
    assert_eq!(removed, vec!["10.*", "*@192.168.1.*"]);
    assert!(user.ip_masks().unwrap().is_empty());
    assert!(user.clear_ip_masks().unwrap().is_empty());
}

#[test]
fn test_matches_address() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    assert!(!user.matches_address("127.0.0.1").unwrap());

    user.add_ip_mask("ident@10.0.0.*").unwrap();
    assert!(user.matches_address("10.0.0.5").unwrap());
    assert!(user.matches_address("ident@10.0.0.5").unwrap());
    assert!(!user.matches_address("other@10.0.0.5").unwrap());
    assert!(!user.matches_address("10.0.1.5").unwrap());
}

#[test]
fn test_literal_mask_matches_only_itself() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    user.add_ip_mask("!!!!").unwrap();
    assert!(user.matches_address("!!!!").unwrap());
    assert!(!user.matches_address("127.0.0.1").unwrap());
}

#[test]
fn test_address_allowed_checks_every_user() {
    let store = test_store();
    let a = create_user(&store, "alice", 1);
    let b = create_user(&store, "bob", 2);
    assert!(!store.address_allowed("10.0.0.1"));

    a.add_ip_mask("192.168.*").unwrap();
    b.add_ip_mask("10.0.0.*").unwrap();
    assert!(store.address_allowed("10.0.0.1"));
    assert!(store.address_allowed("192.168.4.4"));
    assert!(!store.address_allowed("172.16.0.1"));

    store.delete(2).unwrap();
    assert!(!store.address_allowed("10.0.0.1"));
}

#[test]
fn test_login() {
    let store = test_store();
    let user = store.create("w00t", 42, Some("hunter2")).unwrap();
    user.add_ip_mask("*@127.0.0.1").unwrap();

    let logged_in = store.login("w00t", "ident@127.0.0.1", "hunter2").unwrap();
    assert_eq!(logged_in.uid(), 42);
    assert_eq!(user.login_count().unwrap(), 1);
    assert!(user.last_login().unwrap().is_some());
}

#[test]
fn test_login_rejections() {
    let store = test_store();
    let user = store.create("w00t", 42, Some("hunter2")).unwrap();
    user.add_ip_mask("127.0.0.1").unwrap();

    let err = store.login("w00t", "10.0.0.1", "hunter2").unwrap_err();
    assert!(err.is_authentication_failure());
    assert!(matches!(err, Error::Store(StoreError::AddressRejected { .. })));

    let err = store.login("w00t", "127.0.0.1", "wrong").unwrap_err();
    assert!(err.is_authentication_failure());
    assert!(matches!(
        err,
        Error::Credential(CredentialError::InvalidPassword)
    ));

    assert!(store.login("ghost", "127.0.0.1", "x").unwrap_err().is_not_found());

    // Failed attempts are not recorded
    assert_eq!(user.login_count().unwrap(), 0);
}

#[test]
fn test_login_without_password() {
    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    user.add_ip_mask("*").unwrap();
    let err = store.login("w00t", "127.0.0.1", "").unwrap_err();
    assert!(matches!(err, Error::Credential(CredentialError::NoPasswordSet)));
}

#[test]
fn test_expired_account_cannot_log_in() {
    let store = test_store();
    let user = store.create("w00t", 42, Some("hunter2")).unwrap();
    user.add_ip_mask("*").unwrap();

    user.set_expires(NaiveDate::from_ymd_opt(2000, 1, 1)).unwrap();
    assert!(user.expired().unwrap());
    let err = store.login("w00t", "127.0.0.1", "hunter2").unwrap_err();
    assert!(err.is_authentication_failure());
    assert!(matches!(err, Error::Store(StoreError::AccountExpired { .. })));
    assert_eq!(user.login_count().unwrap(), 0);

    user.set_expires(NaiveDate::from_ymd_opt(9999, 12, 31)).unwrap();
    assert!(!user.expired().unwrap());
    store.login("w00t", "127.0.0.1", "hunter2").unwrap();
    assert_eq!(user.login_count().unwrap(), 1);
}
