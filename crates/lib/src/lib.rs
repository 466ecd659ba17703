//!
//! ftpacct: the user account store of an FTP daemon.
//!
//! This library keeps the accounts that FTP session handlers and
//! administrative tools read and update concurrently, and persists every
//! change before reporting success.
//!
//! ## Core Concepts
//!
//! * **Account store (`store::AccountStore`)**: The authoritative collection of users. It arbitrates name and uid uniqueness, serializes changes per user and persists each one.
//! * **Users (`user::User`)**: Handles to stored accounts exposing typed accessors and mutators for every field.
//! * **Credentials (`credential`)**: Argon2id password hashes.
//! * **IP masks (`mask`)**: Per-user wildcard patterns checked at connection admission.
//! * **Groups (`group::GroupRegistry`)**: Numeric groups referenced by users as primary or secondary memberships.
//! * **Credits (`credits::CreditLedger`)**: A default balance plus named section balances that never go negative.
//! * **Backends (`backend::Backend`)**: Pluggable persistence, in memory or as one file per user.
//!
//! ## Example
//!
//! ```
//! use ftpacct::AccountStore;
//!
//! let store = AccountStore::in_memory()?;
//! let user = store.create("w00t", 42, Some("secret"))?;
//! user.add_ip_mask("10.0.0.*")?;
//! user.incr_default_credits(100_000)?;
//!
//! let again = store.login("w00t", "10.0.0.7", "secret")?;
//! assert_eq!(again.get_default_credits()?, 100_000);
//! assert_eq!(store.total_count(), 1);
//! # Ok::<(), ftpacct::Error>(())
//! ```

pub mod backend;
pub mod clock;
pub mod config;
pub mod constants;
pub mod credential;
pub mod credits;
pub mod group;
pub mod mask;
pub mod store;
pub mod user;
pub mod validate;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "testing"))]
pub use clock::{ClockHold, FixedClock};
pub use config::StoreConfig;
pub use group::{Gid, Group};
pub use store::{AccountStore, Users};
pub use user::{Flag, Flags, Uid, User, UserRecord};

/// Result type used throughout the ftpacct library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the ftpacct library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Password hashing and verification errors
    #[error(transparent)]
    Credential(credential::CredentialError),

    /// IP mask validation errors
    #[error(transparent)]
    Mask(mask::MaskError),

    /// Group registry errors
    #[error(transparent)]
    Group(group::GroupError),

    /// Credit balance errors
    #[error(transparent)]
    Credits(credits::CreditError),

    /// User field validation errors
    #[error(transparent)]
    User(user::UserError),

    /// Persistence errors
    #[error(transparent)]
    Backend(backend::BackendError),

    /// Store-level lookup, uniqueness and integrity errors
    #[error(transparent)]
    Store(store::StoreError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
            Error::Credential(_) => "credential",
            Error::Mask(_) => "mask",
            Error::Group(_) => "group",
            Error::Credits(_) => "credits",
            Error::User(_) => "user",
            Error::Backend(_) => "backend",
            Error::Store(_) => "store",
        }
    }

    /// Check if this error indicates a user or group was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Group(e) => e.is_not_found(),
            Error::Store(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates a name, uid or gid collision.
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Group(e) => e.is_conflict(),
            Error::Store(e) => e.is_conflict(),
            _ => false,
        }
    }

    /// Check if this error indicates undecodable or inconsistent persisted data.
    pub fn is_corruption(&self) -> bool {
        match self {
            Error::Backend(e) => e.is_corruption(),
            Error::Store(e) => e.is_corruption(),
            _ => false,
        }
    }

    /// Check if this error is an input validation failure.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Error::Mask(e) => e.is_validation_error() || e.is_limit_error(),
            Error::Group(e) => e.is_validation_error(),
            Error::User(e) => e.is_validation_error(),
            _ => false,
        }
    }

    /// Check if this error is credit-related.
    pub fn is_credit_error(&self) -> bool {
        matches!(self, Error::Credits(_))
    }

    /// Check if this error is an insufficient-credits rejection.
    pub fn is_insufficient_credits(&self) -> bool {
        match self {
            Error::Credits(e) => e.is_insufficient(),
            _ => false,
        }
    }

    /// Check if a login was refused (bad password, no password, or address).
    pub fn is_authentication_failure(&self) -> bool {
        match self {
            Error::Credential(e) => e.is_authentication_failure(),
            Error::Store(e) => e.is_access_denied(),
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) | Error::Serialize(_) => true,
            Error::Backend(e) => e.is_io_error(),
            _ => false,
        }
    }
}
