//! Constants used throughout the ftpacct library.
//!
//! This module provides central definitions for reserved identifiers, on-disk
//! names and default limits.

use crate::group::Gid;

/// Gid of the built-in "no group" entry used as the primary group sentinel.
pub const NO_GROUP_GID: Gid = 0;

/// Name of the built-in "no group" entry.
pub const NO_GROUP_NAME: &str = "none";

/// Section name that addresses a user's default credit balance.
pub const DEFAULT_SECTION: &str = "";

/// Ratio a new user gets in every section.
pub const DEFAULT_RATIO: u32 = 3;

/// Home directory of a new user.
pub const DEFAULT_HOME_DIR: &str = "/";

/// Simultaneous logins a new user may hold.
pub const DEFAULT_NUM_LOGINS: u32 = 1;

/// Maximum length of a home directory path.
pub const MAX_HOME_DIR_LEN: usize = 255;

/// Directory (relative to the data directory) holding one record per user.
pub const USERS_DIR: &str = "users";

/// File (relative to the data directory) holding the group registry.
pub const GROUPS_FILE: &str = "groups.json";

/// Lock file guarding a data directory against concurrent processes.
pub const LOCK_FILE: &str = ".lock";

/// Extension of persisted user records.
pub const RECORD_EXTENSION: &str = "json";

/// Default maximum length of user and group names.
pub const DEFAULT_MAX_NAME_LEN: usize = 32;

/// Default maximum length of taglines, comments and group descriptions.
pub const DEFAULT_MAX_TAGLINE_LEN: usize = 100;

/// Default maximum number of IP masks per user.
pub const DEFAULT_MAX_IP_MASKS: usize = 10;

/// Maximum length of a single IP mask.
pub const MAX_MASK_LEN: usize = 128;
