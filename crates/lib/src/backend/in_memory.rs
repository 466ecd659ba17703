//! In-memory backend.
//!
//! Documents are kept in their serialized JSON form, so loading and saving
//! go through the same codec as the file backend.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

#[cfg(any(test, feature = "testing"))]
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Backend, LoadedRecord, codec};
use crate::{
    Result,
    group::Group,
    user::{Uid, UserRecord},
};

/// A backend that keeps every document in memory.
///
/// Suitable for tests and for embedding where durability is handled
/// elsewhere. Contents are lost when the value is dropped.
#[derive(Debug, Default)]
pub struct InMemory {
    users: RwLock<BTreeMap<Uid, String>>,
    groups: RwLock<Option<String>>,
    #[cfg(any(test, feature = "testing"))]
    fail_writes: AtomicBool,
}

impl InMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw user document under `uid`, bypassing the codec.
    ///
    /// Useful for seeding a backend with foreign or damaged data.
    pub fn insert_raw_user(&self, uid: Uid, json: impl Into<String>) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uid, json.into());
    }

    /// Replace the raw group registry document.
    pub fn set_raw_groups(&self, json: impl Into<String>) {
        *self.groups.write().unwrap_or_else(PoisonError::into_inner) = Some(json.into());
    }

    /// The raw document stored for `uid`.
    pub fn raw_user(&self, uid: Uid) -> Option<String> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&uid)
            .cloned()
    }

    pub fn user_count(&self) -> usize {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Make every subsequent write fail until switched off again.
    #[cfg(any(test, feature = "testing"))]
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    #[cfg(any(test, feature = "testing"))]
    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(super::BackendError::WriteRejected {
                reason: "write failure injected".to_string(),
            }
            .into());
        }
        Ok(())
    }

    #[cfg(not(any(test, feature = "testing")))]
    fn check_writable(&self) -> Result<()> {
        Ok(())
    }
}

impl Backend for InMemory {
    fn load_users(&self) -> Result<Vec<LoadedRecord>> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(users
            .iter()
            .map(|(uid, json)| match codec::decode_record(json) {
                Ok(record) if record.uid == *uid => LoadedRecord::Valid(record),
                Ok(record) => LoadedRecord::Corrupt {
                    uid: Some(*uid),
                    location: format!("memory:{uid}"),
                    reason: format!("document claims uid {}", record.uid),
                },
                Err(reason) => LoadedRecord::Corrupt {
                    uid: Some(*uid),
                    location: format!("memory:{uid}"),
                    reason,
                },
            })
            .collect())
    }

    fn save_user(&self, record: &UserRecord) -> Result<()> {
        self.check_writable()?;
        let json = codec::encode_record(record)?;
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.uid, json);
        Ok(())
    }

    fn remove_user(&self, uid: Uid) -> Result<()> {
        self.check_writable()?;
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&uid);
        Ok(())
    }

    fn load_groups(&self) -> Result<Option<Vec<Group>>> {
        let groups = self.groups.read().unwrap_or_else(PoisonError::into_inner);
        match groups.as_deref() {
            None => Ok(None),
            Some(json) => codec::decode_groups(json).map(Some).map_err(|reason| {
                super::BackendError::CorruptRecord {
                    uid: None,
                    location: "memory:groups".to_string(),
                    reason,
                }
                .into()
            }),
        }
    }

    fn save_groups(&self, groups: &[Group]) -> Result<()> {
        self.check_writable()?;
        let json = codec::encode_groups(groups)?;
        *self.groups.write().unwrap_or_else(PoisonError::into_inner) = Some(json);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
