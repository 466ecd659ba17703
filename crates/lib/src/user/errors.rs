//! Error types for user record fields
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum UserError {
    #[error("Invalid user name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid tagline: {reason}")]
    InvalidTagline { reason: String },

    #[error("Invalid comment: {reason}")]
    InvalidComment { reason: String },

    #[error("Invalid flags '{flags}': {reason}")]
    InvalidFlags { flags: String, reason: String },

    #[error("Invalid home directory '{path}': {reason}")]
    InvalidHomeDir { path: String, reason: String },
}

impl UserError {
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            UserError::InvalidName { .. }
                | UserError::InvalidTagline { .. }
                | UserError::InvalidComment { .. }
                | UserError::InvalidFlags { .. }
                | UserError::InvalidHomeDir { .. }
        )
    }
}

impl From<UserError> for crate::Error {
    fn from(err: UserError) -> Self {
        crate::Error::User(err)
    }
}
