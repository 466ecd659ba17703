//! Error types for credential handling
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Password hashing failed: {reason}")]
    HashingFailed { reason: String },

    #[error("Invalid password")]
    InvalidPassword,

    #[error("User has no password set")]
    NoPasswordSet,
}

impl CredentialError {
    /// Check if this error is an authentication failure (as opposed to an internal fault).
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            CredentialError::InvalidPassword | CredentialError::NoPasswordSet
        )
    }
}

impl From<CredentialError> for crate::Error {
    fn from(err: CredentialError) -> Self {
        crate::Error::Credential(err)
    }
}
