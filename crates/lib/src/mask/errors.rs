//! Error types for IP mask handling
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum MaskError {
    #[error("Invalid IP mask '{mask}': {reason}")]
    InvalidMask { mask: String, reason: String },

    #[error("IP mask limit reached ({limit} masks)")]
    MaskLimitReached { limit: usize },

    #[error("IP mask index {index} out of range ({len} masks)")]
    IndexOutOfRange { index: usize, len: usize },
}

impl MaskError {
    /// Check if this error is an input validation failure.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            MaskError::InvalidMask { .. } | MaskError::IndexOutOfRange { .. }
        )
    }

    /// Check if this error is a limit violation.
    pub fn is_limit_error(&self) -> bool {
        matches!(self, MaskError::MaskLimitReached { .. })
    }
}

impl From<MaskError> for crate::Error {
    fn from(err: MaskError) -> Self {
        crate::Error::Mask(err)
    }
}
