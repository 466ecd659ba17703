//! Error types for the account store

use std::fmt;

use thiserror::Error;

use crate::user::Uid;

/// The half of a user identity that collided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Name(String),
    Uid(Uid),
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Name(name) => write!(f, "name '{name}'"),
            Identity::Uid(uid) => write!(f, "uid {uid}"),
        }
    }
}

/// Errors raised by store-level operations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("User not found: {name}")]
    UserNotFound { name: String },

    #[error("User not found: uid {uid}")]
    UidNotFound { uid: Uid },

    /// The handle refers to a user that has since been deleted.
    #[error("User {uid} has been deleted")]
    UserDeleted { uid: Uid },

    #[error("Duplicate identity: {0} is already in use")]
    DuplicateIdentity(Identity),

    #[error("Name already taken: {name}")]
    NameAlreadyTaken { name: String },

    /// The persisted record for this uid could not be decoded.
    #[error("Corrupt record for uid {uid}: {reason}")]
    CorruptRecord { uid: Uid, reason: String },

    /// The store could not establish its invariants at open and is read-only.
    #[error("Account index is corrupt, store is read-only: {reason}")]
    IndexCorrupt { reason: String },

    #[error("No user admits address {address}")]
    AddressRejected { address: String },

    #[error("Account {name} has expired")]
    AccountExpired { name: String },

    #[error("No free uid left")]
    NoFreeUid,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::UserNotFound { .. }
                | StoreError::UidNotFound { .. }
                | StoreError::UserDeleted { .. }
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::DuplicateIdentity(_) | StoreError::NameAlreadyTaken { .. }
        )
    }

    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            StoreError::CorruptRecord { .. } | StoreError::IndexCorrupt { .. }
        )
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            StoreError::AddressRejected { .. } | StoreError::AccountExpired { .. }
        )
    }
}

impl From<StoreError> for crate::Error {
    fn from(err: StoreError) -> Self {
        crate::Error::Store(err)
    }
}
