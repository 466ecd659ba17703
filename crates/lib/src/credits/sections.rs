//! Per-section transfer ratios and weekly allotments
//!
//! Both tables follow the ledger's convention: the empty section name
//! addresses the default entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_RATIO, DEFAULT_SECTION};

/// Upload-to-credit ratios. A ratio of 0 marks the user as a leech: downloads
/// in that section cost nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratios {
    #[serde(default = "default_ratio")]
    default: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    sections: BTreeMap<String, u32>,
}

fn default_ratio() -> u32 {
    DEFAULT_RATIO
}

impl Default for Ratios {
    fn default() -> Self {
        Self {
            default: DEFAULT_RATIO,
            sections: BTreeMap::new(),
        }
    }
}

impl Ratios {
    pub fn default_ratio(&self) -> u32 {
        self.default
    }

    /// The ratio set for a section, or None if it inherits the default.
    pub fn section(&self, section: &str) -> Option<u32> {
        if section == DEFAULT_SECTION {
            return Some(self.default);
        }
        self.sections.get(section).copied()
    }

    /// The ratio that applies in a section.
    pub fn effective(&self, section: &str) -> u32 {
        self.section(section).unwrap_or(self.default)
    }

    pub fn set(&mut self, section: &str, ratio: u32) {
        if section == DEFAULT_SECTION {
            self.default = ratio;
        } else {
            self.sections.insert(section.to_string(), ratio);
        }
    }

    /// Make a section inherit the default again. Returns whether it had its own ratio.
    pub fn clear(&mut self, section: &str) -> bool {
        self.sections.remove(section).is_some()
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, u32)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Credits granted each week, in the same unit as the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allotments {
    #[serde(default)]
    default: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    sections: BTreeMap<String, u64>,
}

impl Allotments {
    pub fn default_allotment(&self) -> u64 {
        self.default
    }

    /// The allotment of a section; 0 when none is set.
    pub fn section(&self, section: &str) -> u64 {
        if section == DEFAULT_SECTION {
            return self.default;
        }
        self.sections.get(section).copied().unwrap_or(0)
    }

    /// Set an allotment. Setting a section to 0 removes its entry.
    pub fn set(&mut self, section: &str, amount: u64) {
        if section == DEFAULT_SECTION {
            self.default = amount;
        } else if amount == 0 {
            self.sections.remove(section);
        } else {
            self.sections.insert(section.to_string(), amount);
        }
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, u64)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
