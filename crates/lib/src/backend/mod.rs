//! Persistence backends for the account store
//!
//! The [`Backend`] trait is the store's only path to durable state. Every
//! user record is persisted as its own document so a failed or torn write to
//! one record never affects another; the group registry is a single
//! document. A successful `save_*` call means the data is durable.
//!
//! Two implementations are provided: [`InMemory`] for tests and embedding,
//! and [`FileBackend`] for on-disk data directories.

use std::any::Any;
use std::fmt::Debug;

use crate::{Result, group::Group, user::{Uid, UserRecord}};

pub mod codec;
pub mod errors;
pub mod file;
pub mod in_memory;

pub use errors::BackendError;
pub use file::FileBackend;
pub use in_memory::InMemory;

/// One entry produced while loading persisted users.
#[derive(Debug, Clone)]
pub enum LoadedRecord {
    Valid(UserRecord),
    /// A document that exists but could not be decoded.
    Corrupt {
        uid: Option<Uid>,
        location: String,
        reason: String,
    },
}

/// Storage abstraction used by the account store.
///
/// All implementations must be `Send` and `Sync`, and implement `Any` to
/// allow for downcasting if needed.
pub trait Backend: Send + Sync + Debug + Any {
    /// Read every persisted user record.
    ///
    /// Undecodable documents are reported as [`LoadedRecord::Corrupt`]
    /// instead of failing the whole load.
    fn load_users(&self) -> Result<Vec<LoadedRecord>>;

    /// Durably write one user record, replacing any previous version.
    fn save_user(&self, record: &UserRecord) -> Result<()>;

    /// Remove a user record. Removing an absent record is not an error.
    fn remove_user(&self, uid: Uid) -> Result<()>;

    /// Read the group registry, or `None` if none was ever saved.
    ///
    /// A registry document that cannot be decoded is an error.
    fn load_groups(&self) -> Result<Option<Vec<Group>>>;

    /// Durably replace the group registry.
    fn save_groups(&self, groups: &[Group]) -> Result<()>;

    /// Returns a reference to the backend as a `dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}
