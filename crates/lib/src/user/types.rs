//! The persisted user record

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Flags;
use crate::{
    constants::{DEFAULT_HOME_DIR, DEFAULT_NUM_LOGINS, NO_GROUP_GID},
    credential::CredentialHash,
    credits::{Allotments, CreditLedger, Ratios},
    group::Gid,
    mask::MaskSet,
};

/// Numeric user identifier.
pub type Uid = u32;

/// Every field of one user account.
///
/// Values of this type returned by the store are snapshots; editing one has
/// no effect on the stored account. Mutation goes through [`super::User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub uid: Uid,
    pub name: String,
    /// None until a password is set; such a user never authenticates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<CredentialHash>,
    #[serde(default)]
    pub ip_masks: MaskSet,
    pub primary_gid: Gid,
    #[serde(default)]
    pub secondary_gids: Vec<Gid>,
    /// Groups this user administers, ascending
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gadmin_gids: Vec<Gid>,
    #[serde(default)]
    pub credits: CreditLedger,
    #[serde(default)]
    pub ratios: Ratios,
    #[serde(default)]
    pub allotments: Allotments,
    #[serde(default)]
    pub flags: Flags,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default = "default_home_dir")]
    pub home_dir: String,
    /// Idle timeout in seconds; None uses the server's default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_time: Option<u32>,
    /// First day on which the account no longer admits logins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<NaiveDate>,
    /// Simultaneous logins allowed; None is unlimited
    #[serde(default = "default_num_logins")]
    pub num_logins: Option<u32>,
    /// Uid of the administrator who created this account, if recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<Uid>,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    /// Successful logins recorded so far
    #[serde(default)]
    pub login_count: u64,
}

fn default_home_dir() -> String {
    DEFAULT_HOME_DIR.to_string()
}

fn default_num_logins() -> Option<u32> {
    Some(DEFAULT_NUM_LOGINS)
}

impl UserRecord {
    /// A fresh record with every optional field empty and no group.
    pub fn new(uid: Uid, name: impl Into<String>, created: DateTime<Utc>) -> Self {
        Self {
            uid,
            name: name.into(),
            credential: None,
            ip_masks: MaskSet::new(),
            primary_gid: NO_GROUP_GID,
            secondary_gids: Vec::new(),
            gadmin_gids: Vec::new(),
            credits: CreditLedger::new(),
            ratios: Ratios::default(),
            allotments: Allotments::default(),
            flags: Flags::new(),
            tagline: String::new(),
            comment: String::new(),
            home_dir: default_home_dir(),
            idle_time: None,
            expires: None,
            num_logins: default_num_logins(),
            creator: None,
            created,
            last_login: None,
            login_count: 0,
        }
    }

    /// Check the structural invariants a decoded record must satisfy.
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        if self.secondary_gids.contains(&self.primary_gid) {
            return Err(format!(
                "primary group {} is also listed as secondary",
                self.primary_gid
            ));
        }
        if self.secondary_gids.contains(&NO_GROUP_GID) {
            return Err("the 'none' group is listed as secondary".to_string());
        }
        let mut seen = self.secondary_gids.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != self.secondary_gids.len() {
            return Err("secondary groups contain duplicates".to_string());
        }
        if self.gadmin_gids.contains(&NO_GROUP_GID) {
            return Err("the 'none' group is listed as administered".to_string());
        }
        if !self.gadmin_gids.is_sorted_by(|a, b| a < b) {
            return Err("administered groups are unsorted or duplicated".to_string());
        }
        if !self.home_dir.starts_with('/') {
            return Err(format!("home directory '{}' is not absolute", self.home_dir));
        }
        if let Some(last_login) = self.last_login
            && last_login < self.created
        {
            return Err("last login precedes creation".to_string());
        }
        Ok(())
    }
}
