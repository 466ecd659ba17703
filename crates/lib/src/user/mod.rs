//! User records and handles
//!
//! A user is identified by a unique name and a unique numeric uid and owns
//! its credential, IP masks, group memberships, credits, flags and free-text
//! fields. The persisted form is [`UserRecord`]; callers work through
//! [`User`] handles obtained from the account store.

pub mod errors;
pub mod flags;
pub mod handle;
pub mod types;

pub use errors::UserError;
pub use flags::{Flag, Flags};
pub use handle::User;
pub use types::{Uid, UserRecord};
