//! The name/uid index and per-record cells.
//!
//! Identities being created or renamed are *reserved* in the index while the
//! record write happens outside the index lock. A reservation blocks any
//! other claim on the same name or uid but is invisible to lookups, so
//! readers only ever see committed records.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::StoreError;
use super::errors::Identity;
use crate::user::{Uid, UserRecord};

/// The lockable state of one user.
#[derive(Debug)]
pub(crate) struct RecordState {
    pub record: UserRecord,
    /// Set once the record has been removed from the backend.
    pub deleted: bool,
}

#[derive(Debug)]
pub(crate) struct RecordCell {
    state: Mutex<RecordState>,
}

impl RecordCell {
    pub fn new(record: UserRecord) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(RecordState {
                record,
                deleted: false,
            }),
        })
    }

    pub fn lock(&self) -> MutexGuard<'_, RecordState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    Bound(Uid),
    Reserved(Uid),
}

#[derive(Debug)]
enum Slot {
    Live(Arc<RecordCell>),
    Reserved,
    Corrupt(String),
}

#[derive(Debug, Default)]
pub(crate) struct Index {
    names: HashMap<String, Binding>,
    uids: BTreeMap<Uid, Slot>,
}

impl Index {
    // === Loading ===

    /// Add a record read at open. Fails with a description on collision.
    pub fn insert_loaded(&mut self, record: &UserRecord) -> Result<Arc<RecordCell>, String> {
        if self.uids.contains_key(&record.uid) {
            return Err(format!("uid {} appears in more than one record", record.uid));
        }
        if let Some(Binding::Bound(other)) = self.names.get(&record.name) {
            return Err(format!(
                "name '{}' is claimed by uids {} and {}",
                record.name, other, record.uid
            ));
        }
        let cell = RecordCell::new(record.clone());
        self.names
            .insert(record.name.clone(), Binding::Bound(record.uid));
        self.uids.insert(record.uid, Slot::Live(Arc::clone(&cell)));
        Ok(cell)
    }

    /// Keep the uid of an undecodable record reserved.
    pub fn insert_corrupt(&mut self, uid: Uid, reason: String) -> Result<(), String> {
        if self.uids.contains_key(&uid) {
            return Err(format!("uid {uid} appears in more than one record"));
        }
        self.uids.insert(uid, Slot::Corrupt(reason));
        Ok(())
    }

    // === Lookup ===

    pub fn uid_for_name(&self, name: &str) -> Option<Uid> {
        match self.names.get(name) {
            Some(Binding::Bound(uid)) => Some(*uid),
            _ => None,
        }
    }

    pub fn cell(&self, uid: Uid) -> Result<Arc<RecordCell>, StoreError> {
        match self.uids.get(&uid) {
            Some(Slot::Live(cell)) => Ok(Arc::clone(cell)),
            Some(Slot::Corrupt(reason)) => Err(StoreError::CorruptRecord {
                uid,
                reason: reason.clone(),
            }),
            Some(Slot::Reserved) | None => Err(StoreError::UidNotFound { uid }),
        }
    }

    pub fn live(&self) -> impl Iterator<Item = (Uid, &Arc<RecordCell>)> {
        self.uids.iter().filter_map(|(uid, slot)| match slot {
            Slot::Live(cell) => Some((*uid, cell)),
            _ => None,
        })
    }

    pub fn live_count(&self) -> usize {
        self.live().count()
    }

    pub fn corrupt_uids(&self) -> Vec<Uid> {
        self.uids
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Corrupt(_)))
            .map(|(uid, _)| *uid)
            .collect()
    }

    /// Committed names and their uids.
    pub fn names(&self) -> impl Iterator<Item = (&str, Uid)> {
        self.names.iter().filter_map(|(name, binding)| match binding {
            Binding::Bound(uid) => Some((name.as_str(), *uid)),
            Binding::Reserved(_) => None,
        })
    }

    /// Highest uid claimed in any state.
    pub fn highest_uid(&self) -> Option<Uid> {
        self.uids.keys().next_back().copied()
    }

    // === Create ===

    pub fn reserve_identity(&mut self, name: &str, uid: Uid) -> Result<(), StoreError> {
        if self.names.contains_key(name) {
            return Err(StoreError::DuplicateIdentity(Identity::Name(
                name.to_string(),
            )));
        }
        if self.uids.contains_key(&uid) {
            return Err(StoreError::DuplicateIdentity(Identity::Uid(uid)));
        }
        self.names.insert(name.to_string(), Binding::Reserved(uid));
        self.uids.insert(uid, Slot::Reserved);
        Ok(())
    }

    pub fn commit_identity(&mut self, name: &str, uid: Uid, cell: Arc<RecordCell>) {
        self.names.insert(name.to_string(), Binding::Bound(uid));
        self.uids.insert(uid, Slot::Live(cell));
    }

    pub fn release_identity(&mut self, name: &str, uid: Uid) {
        if self.names.get(name) == Some(&Binding::Reserved(uid)) {
            self.names.remove(name);
        }
        if matches!(self.uids.get(&uid), Some(Slot::Reserved)) {
            self.uids.remove(&uid);
        }
    }

    // === Rename ===

    pub fn reserve_name(&mut self, name: &str, uid: Uid) -> Result<(), StoreError> {
        if self.names.contains_key(name) {
            return Err(StoreError::NameAlreadyTaken {
                name: name.to_string(),
            });
        }
        self.names.insert(name.to_string(), Binding::Reserved(uid));
        Ok(())
    }

    pub fn commit_rename(&mut self, old: &str, new: &str, uid: Uid) {
        if self.names.get(old) == Some(&Binding::Bound(uid)) {
            self.names.remove(old);
        }
        self.names.insert(new.to_string(), Binding::Bound(uid));
    }

    pub fn release_name(&mut self, name: &str, uid: Uid) {
        if self.names.get(name) == Some(&Binding::Reserved(uid)) {
            self.names.remove(name);
        }
    }

    // === Delete ===

    pub fn remove(&mut self, name: Option<&str>, uid: Uid) {
        if let Some(name) = name
            && self.names.get(name) == Some(&Binding::Bound(uid))
        {
            self.names.remove(name);
        }
        self.uids.remove(&uid);
    }
}
