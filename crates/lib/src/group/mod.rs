//! Groups and the group registry
//!
//! Groups are small `{gid, name}` records owned by the [`GroupRegistry`].
//! Users reference groups by gid only; the registry keeps a reverse index of
//! which users hold each group as primary or secondary, or administer it, so
//! that membership can be resolved and in-use groups cannot be deleted.

pub mod errors;
pub mod registry;

use serde::{Deserialize, Serialize};

pub use errors::GroupError;
pub use registry::{GroupMembers, GroupRegistry};

use crate::constants::{NO_GROUP_GID, NO_GROUP_NAME};

/// Numeric group identifier.
pub type Gid = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub gid: Gid,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Group {
    pub fn new(gid: Gid, name: impl Into<String>) -> Self {
        Self {
            gid,
            name: name.into(),
            description: String::new(),
        }
    }

    /// The built-in "none" group used as the primary-group sentinel.
    pub fn none() -> Self {
        Self::new(NO_GROUP_GID, NO_GROUP_NAME)
    }

    pub fn is_none(&self) -> bool {
        self.gid == NO_GROUP_GID
    }
}
