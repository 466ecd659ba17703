//! Per-user credit balances
//!
//! A [`CreditLedger`] holds a default balance plus lazily created named
//! section balances. Balances are unsigned; every mutation is checked and a
//! failed mutation leaves the ledger untouched. Serializing concurrent
//! increments is the owner's job (the account store holds the per-user lock).

pub mod errors;
pub mod sections;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use errors::CreditError;
pub use sections::{Allotments, Ratios};

use crate::constants::DEFAULT_SECTION;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditLedger {
    #[serde(default)]
    default: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    sections: BTreeMap<String, u64>,
}

impl CreditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_default(&self) -> u64 {
        self.default
    }

    /// Balance of a section; 0 for a section never written. Never creates an entry.
    ///
    /// The empty section name addresses the default balance.
    pub fn get_section(&self, section: &str) -> u64 {
        if section == DEFAULT_SECTION {
            return self.default;
        }
        self.sections.get(section).copied().unwrap_or(0)
    }

    /// Apply a signed delta to the default balance, returning the new balance.
    pub fn incr_default(&mut self, delta: i64) -> Result<u64, CreditError> {
        self.default = apply(DEFAULT_SECTION, self.default, delta)?;
        Ok(self.default)
    }

    /// Apply a signed delta to a section balance, returning the new balance.
    ///
    /// The section entry is created on the first successful write.
    pub fn incr_section(&mut self, section: &str, delta: i64) -> Result<u64, CreditError> {
        if section == DEFAULT_SECTION {
            return self.incr_default(delta);
        }
        let current = self.get_section(section);
        let updated = apply(section, current, delta)?;
        self.sections.insert(section.to_string(), updated);
        Ok(updated)
    }

    /// Take up to `amount` from a balance, returning how much was actually taken.
    pub fn take_section_saturating(&mut self, section: &str, amount: u64) -> u64 {
        if section == DEFAULT_SECTION {
            return self.take_default_saturating(amount);
        }
        let current = self.get_section(section);
        let taken = current.min(amount);
        self.sections.insert(section.to_string(), current - taken);
        taken
    }

    pub fn take_default_saturating(&mut self, amount: u64) -> u64 {
        let taken = self.default.min(amount);
        self.default -= taken;
        taken
    }

    /// Named sections and their balances, ordered by name.
    pub fn sections(&self) -> impl Iterator<Item = (&str, u64)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

fn apply(section: &str, balance: u64, delta: i64) -> Result<u64, CreditError> {
    if delta >= 0 {
        balance
            .checked_add(delta.unsigned_abs())
            .ok_or_else(|| CreditError::CreditOverflow {
                section: section.to_string(),
                balance,
                delta,
            })
    } else {
        let requested = delta.unsigned_abs();
        balance
            .checked_sub(requested)
            .ok_or_else(|| CreditError::InsufficientCredits {
                section: section.to_string(),
                balance,
                requested,
            })
    }
}
