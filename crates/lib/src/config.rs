//! Store configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_IP_MASKS, DEFAULT_MAX_NAME_LEN, DEFAULT_MAX_TAGLINE_LEN};

/// Validation limits applied by the account store.
///
/// Every field has a default, so a partial document deserializes cleanly:
///
/// ```
/// use ftpacct::StoreConfig;
///
/// let config: StoreConfig = serde_json::from_str(r#"{"max_ip_masks": 3}"#).unwrap();
/// assert_eq!(config.max_ip_masks, 3);
/// assert_eq!(config.max_name_len, StoreConfig::default().max_name_len);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum length of user and group names.
    pub max_name_len: usize,
    /// Maximum length of taglines, comments and group descriptions.
    pub max_tagline_len: usize,
    /// Maximum number of IP masks a single user may hold.
    pub max_ip_masks: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_name_len: DEFAULT_MAX_NAME_LEN,
            max_tagline_len: DEFAULT_MAX_TAGLINE_LEN,
            max_ip_masks: DEFAULT_MAX_IP_MASKS,
        }
    }
}

impl StoreConfig {
    pub fn with_max_name_len(mut self, len: usize) -> Self {
        self.max_name_len = len;
        self
    }

    pub fn with_max_tagline_len(mut self, len: usize) -> Self {
        self.max_tagline_len = len;
        self
    }

    pub fn with_max_ip_masks(mut self, count: usize) -> Self {
        self.max_ip_masks = count;
        self
    }
}
