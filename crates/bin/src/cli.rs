//! CLI argument definitions for the ftpacct binary.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Administer the user accounts of an FTP daemon
#[derive(Parser, Debug)]
#[command(name = "ftpacct")]
#[command(about = "ftpacct: user account administration for an FTP daemon")]
#[command(version)]
pub struct Cli {
    /// Data directory holding users/ and groups.json
    #[arg(short = 'D', long, global = true, env = "FTPACCT_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Maximum number of IP masks per user
    #[arg(long, global = true, env = "FTPACCT_MAX_IP_MASKS")]
    pub max_ip_masks: Option<usize>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage user accounts
    #[command(subcommand)]
    User(UserCommand),
    /// Manage IP masks
    #[command(subcommand)]
    Mask(MaskCommand),
    /// Manage groups
    #[command(subcommand)]
    Group(GroupCommand),
    /// Inspect and adjust credit balances
    #[command(subcommand)]
    Credits(CreditsCommand),
    /// Summarize the data directory
    Info,
}

/// A password given on the command line or read from stdin
#[derive(Args, Debug)]
pub struct PasswordArgs {
    /// The password (visible in process listings; prefer --password-stdin)
    #[arg(long, env = "FTPACCT_PASSWORD", conflicts_with = "password_stdin")]
    pub password: Option<String>,

    /// Read the password from the first line of stdin
    #[arg(long)]
    pub password_stdin: bool,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Create a user
    Add {
        name: String,
        /// Uid to assign; defaults to the next free uid
        #[arg(long)]
        uid: Option<u32>,
        /// Copy masks, groups, flags, credits, ratios, limits and tagline from this user
        #[arg(long)]
        template: Option<String>,
        /// Record this user as the creator
        #[arg(long)]
        creator: Option<String>,
        #[command(flatten)]
        password: PasswordArgs,
    },
    /// Delete a user by name or uid
    Del { user: String },
    /// List users selected by names, wildcards, `=group` or `*`
    List {
        #[arg(default_value = "*")]
        users: Vec<String>,
    },
    /// Show every field of a user
    Show { user: String },
    /// Rename a user
    Rename { user: String, new_name: String },
    /// Set a user's password
    Passwd {
        user: String,
        #[command(flatten)]
        password: PasswordArgs,
    },
    /// Set a user's tagline
    Tagline { user: String, tagline: String },
    /// Set, add or remove flags
    Flags {
        user: String,
        /// Flags to set, prefixed with + to add or - to remove
        #[arg(allow_hyphen_values = true)]
        flags: String,
    },
    /// Set a user's primary group
    Primary { user: String, group: String },
    /// Add secondary groups
    Gadd {
        user: String,
        #[arg(required = true)]
        groups: Vec<String>,
    },
    /// Remove secondary groups
    Gdel {
        user: String,
        #[arg(required = true)]
        groups: Vec<String>,
    },
    /// Replace every group membership; the first group becomes primary
    Gids {
        user: String,
        groups: Vec<String>,
        /// Flip membership of the listed groups instead
        #[arg(long)]
        toggle: bool,
    },
    /// Toggle administration of a group
    Gadmin { user: String, group: String },
    /// Change account limits
    Set {
        user: String,
        /// Home directory, an absolute path
        #[arg(long)]
        home: Option<String>,
        /// Idle timeout in seconds, or "default"
        #[arg(long)]
        idle: Option<Limit>,
        /// Expiry date (YYYY-MM-DD), or "never"
        #[arg(long)]
        expires: Option<Expiry>,
        /// Simultaneous logins allowed, or "unlimited"
        #[arg(long)]
        num_logins: Option<Limit>,
    },
    /// Check a login attempt and record it on success
    Login {
        user: String,
        /// Client address, `ip` or `ident@ip`
        address: String,
        #[command(flatten)]
        password: PasswordArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum MaskCommand {
    /// Add IP masks to a user
    Add {
        user: String,
        #[arg(required = true)]
        masks: Vec<String>,
    },
    /// Remove IP masks from a user, by value or by position
    Del {
        user: String,
        #[arg(required_unless_present = "index", conflicts_with = "index")]
        masks: Vec<String>,
        /// Position of the mask in `user show` order, starting at 0
        #[arg(long)]
        index: Option<usize>,
    },
    /// Remove every IP mask from a user
    Clear { user: String },
    /// Check whether any user admits an address, or one user if given
    Check {
        address: String,
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    /// Create a group
    Add {
        name: String,
        /// Gid to assign; defaults to the next free gid
        #[arg(long)]
        gid: Option<u32>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete an unused group
    Del { group: String },
    /// Rename a group
    Rename { group: String, new_name: String },
    /// List every group with its member count
    List,
    /// Show a group and its members
    Show { group: String },
}

#[derive(Subcommand, Debug)]
pub enum CreditsCommand {
    /// Show a user's balances
    Show { user: String },
    /// Add credits to a balance
    Give {
        user: String,
        amount: u64,
        /// Section name; the default balance when omitted
        #[arg(long, default_value = "")]
        section: String,
    },
    /// Remove credits from a balance
    Take {
        user: String,
        amount: u64,
        #[arg(long, default_value = "")]
        section: String,
        /// Take whatever is available instead of failing on a short balance
        #[arg(long)]
        saturating: bool,
    },
    /// Show or set a transfer ratio
    Ratio {
        user: String,
        /// New ratio; 0 makes downloads free
        ratio: Option<u32>,
        #[arg(long, default_value = "")]
        section: String,
        /// Make the section inherit the default ratio again
        #[arg(long, conflicts_with = "ratio")]
        clear: bool,
    },
    /// Show or set a weekly allotment
    Allotment {
        user: String,
        amount: Option<u64>,
        #[arg(long, default_value = "")]
        section: String,
    },
}

/// A numeric limit, where a keyword restores the unset state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(pub Option<u32>);

impl FromStr for Limit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" | "unlimited" | "none" => Ok(Limit(None)),
            _ => s
                .parse()
                .map(|n| Limit(Some(n)))
                .map_err(|_| format!("expected a number or \"default\", got {s:?}")),
        }
    }
}

/// An expiry date, or "never"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry(pub Option<NaiveDate>);

impl FromStr for Expiry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "never" {
            return Ok(Expiry(None));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(|date| Expiry(Some(date)))
            .map_err(|e| format!("invalid date {s:?}: {e}"))
    }
}
