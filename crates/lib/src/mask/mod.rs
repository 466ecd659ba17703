//! Per-user IP access masks
//!
//! An [`AccessMask`] is a wildcard pattern over a client address, optionally
//! prefixed by an ident pattern (`ident@address`). A [`MaskSet`] holds a
//! user's masks in insertion order with set semantics. Adding a mask that an
//! existing mask already covers is a no-op, adding a broader mask drops the
//! narrower ones it covers, and removal is by exact string match or index.

pub mod errors;
pub mod wildcard;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use errors::MaskError;
pub use wildcard::wildcard_match;

use crate::constants::MAX_MASK_LEN;

/// A validated IP mask pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessMask(String);

impl AccessMask {
    /// Validate and wrap a mask pattern.
    pub fn parse(pattern: impl Into<String>) -> Result<Self, MaskError> {
        let pattern = pattern.into();
        let invalid = |reason: &str| MaskError::InvalidMask {
            mask: pattern.clone(),
            reason: reason.to_string(),
        };

        if pattern.is_empty() {
            return Err(invalid("mask is empty"));
        }
        if pattern.len() > MAX_MASK_LEN {
            return Err(invalid("mask is too long"));
        }
        if pattern.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid("mask contains whitespace or control characters"));
        }
        if pattern.matches('@').count() > 1 {
            return Err(invalid("mask contains more than one '@'"));
        }
        if let Some((ident, address)) = pattern.split_once('@')
            && (ident.is_empty() || address.is_empty())
        {
            return Err(invalid("ident and address must both be present"));
        }

        Ok(Self(pattern))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check a client address (`address` or `ident@address`) against this mask.
    ///
    /// When both sides carry an ident the idents must match too; otherwise
    /// only the address halves are compared.
    pub fn matches(&self, candidate: &str) -> bool {
        let (mask_ident, mask_addr) = split_ident(&self.0);
        let (cand_ident, cand_addr) = split_ident(candidate);

        if !wildcard_match(mask_addr, cand_addr) {
            return false;
        }
        match (mask_ident, cand_ident) {
            (Some(mask_ident), Some(cand_ident)) => wildcard_match(mask_ident, cand_ident),
            _ => true,
        }
    }

    /// True if every address this mask's pattern describes is also admitted
    /// by `self`, judged by matching `self` against the other pattern's text.
    pub fn covers(&self, other: &AccessMask) -> bool {
        wildcard_match(&self.0, &other.0)
    }
}

impl TryFrom<String> for AccessMask {
    type Error = MaskError;

    fn try_from(pattern: String) -> Result<Self, Self::Error> {
        Self::parse(pattern)
    }
}

impl From<AccessMask> for String {
    fn from(mask: AccessMask) -> Self {
        mask.0
    }
}

impl fmt::Display for AccessMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn split_ident(s: &str) -> (Option<&str>, &str) {
    match s.split_once('@') {
        Some((ident, address)) => (Some(ident), address),
        None => (None, s),
    }
}

/// Outcome of adding a mask to a [`MaskSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskAdd {
    /// The mask was added. Narrower masks it covers were dropped.
    Added { replaced: Vec<String> },
    /// An identical or broader mask is already held; nothing changed.
    Covered { by: String },
}

impl MaskAdd {
    pub fn is_added(&self) -> bool {
        matches!(self, MaskAdd::Added { .. })
    }
}

/// Ordered, duplicate-free collection of a user's masks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<AccessMask>", into = "Vec<AccessMask>")]
pub struct MaskSet(Vec<AccessMask>);

impl MaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mask.
    ///
    /// If a held mask covers the new one nothing changes. Otherwise every held
    /// mask the new one covers is dropped and the new mask is appended. Fails
    /// with `MaskLimitReached` if the set would still hold `limit` masks after
    /// the narrower ones are dropped.
    pub fn add(&mut self, mask: AccessMask, limit: usize) -> Result<MaskAdd, MaskError> {
        if let Some(existing) = self.0.iter().find(|m| m.covers(&mask)) {
            return Ok(MaskAdd::Covered {
                by: existing.to_string(),
            });
        }

        let replaced: Vec<String> = self
            .0
            .iter()
            .filter(|m| mask.covers(m))
            .map(ToString::to_string)
            .collect();
        if self.0.len() - replaced.len() >= limit {
            return Err(MaskError::MaskLimitReached { limit });
        }

        self.0.retain(|m| !mask.covers(m));
        self.0.push(mask);
        Ok(MaskAdd::Added { replaced })
    }

    /// Remove a mask by exact match. Returns whether anything was removed.
    pub fn remove(&mut self, pattern: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|m| m.as_str() != pattern);
        self.0.len() != before
    }

    /// Remove the mask at a position in enumeration order, returning it.
    pub fn remove_at(&mut self, index: usize) -> Result<AccessMask, MaskError> {
        if index >= self.0.len() {
            return Err(MaskError::IndexOutOfRange {
                index,
                len: self.0.len(),
            });
        }
        Ok(self.0.remove(index))
    }

    /// Remove every mask, returning what was removed.
    pub fn clear(&mut self) -> Vec<AccessMask> {
        std::mem::take(&mut self.0)
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.0.iter().any(|m| m.as_str() == pattern)
    }

    /// True if any mask admits the candidate address.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.iter().any(|m| m.matches(candidate))
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccessMask> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The masks as plain strings, in insertion order.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|m| m.0.clone()).collect()
    }
}

impl TryFrom<Vec<AccessMask>> for MaskSet {
    type Error = MaskError;

    fn try_from(masks: Vec<AccessMask>) -> Result<Self, Self::Error> {
        for (i, mask) in masks.iter().enumerate() {
            if masks[..i].contains(mask) {
                return Err(MaskError::InvalidMask {
                    mask: mask.to_string(),
                    reason: "mask is listed twice".to_string(),
                });
            }
        }
        Ok(Self(masks))
    }
}

impl From<MaskSet> for Vec<AccessMask> {
    fn from(set: MaskSet) -> Self {
        set.0
    }
}
