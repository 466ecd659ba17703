//! Error types for the group registry
use thiserror::Error;

use super::Gid;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum GroupError {
    /// A gid was referenced that the registry does not contain.
    #[error("Unknown group: gid {gid}")]
    UnknownGroup { gid: Gid },

    #[error("Group not found: {name}")]
    GroupNotFound { name: String },

    #[error("Group name already exists: {name}")]
    GroupNameTaken { name: String },

    #[error("Gid already exists: {gid}")]
    GidTaken { gid: Gid },

    #[error("Group {gid} still has {members} member(s)")]
    GroupInUse { gid: Gid, members: usize },

    #[error("Group {gid} is reserved and cannot be modified")]
    ReservedGroup { gid: Gid },

    #[error("Invalid group name '{name}': {reason}")]
    InvalidGroupName { name: String, reason: String },

    #[error("Invalid group description: {reason}")]
    InvalidDescription { reason: String },
}

impl GroupError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GroupError::UnknownGroup { .. } | GroupError::GroupNotFound { .. }
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            GroupError::GroupNameTaken { .. }
                | GroupError::GidTaken { .. }
                | GroupError::GroupInUse { .. }
        )
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            GroupError::InvalidGroupName { .. }
                | GroupError::InvalidDescription { .. }
                | GroupError::ReservedGroup { .. }
        )
    }
}

impl From<GroupError> for crate::Error {
    fn from(err: GroupError) -> Self {
        crate::Error::Group(err)
    }
}
