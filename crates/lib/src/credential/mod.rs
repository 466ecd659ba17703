//! Password hashing and verification
//!
//! Credentials are stored as Argon2id hashes in PHC string format. The PHC
//! string embeds the algorithm parameters and a random per-hash salt, so a
//! stored hash is self-describing and verifiable on its own.
//!
//! Verification goes through `argon2`'s `PasswordVerifier`, which compares
//! the recomputed output in constant time.

pub mod errors;

use std::fmt;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core},
};
use serde::{Deserialize, Serialize};

pub use errors::CredentialError;

use crate::Result;

/// A stored password hash (Argon2id, PHC format).
///
/// The `Debug` impl never prints the hash.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialHash(String);

impl CredentialHash {
    /// Wrap an already-encoded PHC string without validating it.
    ///
    /// Malformed input is accepted here; it simply never verifies.
    pub fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    /// The encoded PHC string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialHash(<redacted>)")
    }
}

/// Hash a password using Argon2id with a fresh random salt.
pub fn hash(password: impl AsRef<str>) -> Result<CredentialHash> {
    let salt = SaltString::generate(&mut rand_core::OsRng);

    let phc = Argon2::default()
        .hash_password(password.as_ref().as_bytes(), &salt)
        .map_err(|e| CredentialError::HashingFailed {
            reason: e.to_string(),
        })?
        .to_string();

    Ok(CredentialHash(phc))
}

/// Verify a password against a stored hash.
///
/// A hash that fails to parse (for example one corrupted on disk) never
/// verifies.
pub fn verify(hash: &CredentialHash, password: impl AsRef<str>) -> bool {
    let Ok(parsed) = PasswordHash::new(hash.as_str()) else {
        tracing::warn!("stored credential hash is malformed; rejecting password");
        return false;
    };

    Argon2::default()
        .verify_password(password.as_ref().as_bytes(), &parsed)
        .is_ok()
}

/// Verify an optional credential. Users without a credential never verify.
pub fn verify_optional(hash: Option<&CredentialHash>, password: impl AsRef<str>) -> bool {
    hash.is_some_and(|h| verify(h, password))
}
