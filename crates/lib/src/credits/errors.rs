//! Error types for credit balances
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CreditError {
    /// Applying the delta would drive the balance negative.
    #[error(
        "Insufficient credits in section '{section}': balance {balance}, requested {requested}"
    )]
    InsufficientCredits {
        section: String,
        balance: u64,
        requested: u64,
    },

    /// Applying the delta would exceed the representable balance.
    #[error("Credit overflow in section '{section}': balance {balance}, delta {delta}")]
    CreditOverflow {
        section: String,
        balance: u64,
        delta: i64,
    },
}

impl CreditError {
    pub fn is_insufficient(&self) -> bool {
        matches!(self, CreditError::InsufficientCredits { .. })
    }

    /// The section the failed operation addressed (empty for the default balance).
    pub fn section(&self) -> &str {
        match self {
            CreditError::InsufficientCredits { section, .. }
            | CreditError::CreditOverflow { section, .. } => section,
        }
    }
}

impl From<CreditError> for crate::Error {
    fn from(err: CreditError) -> Self {
        crate::Error::Credits(err)
    }
}
