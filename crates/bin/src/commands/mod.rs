//! Subcommand implementations and the lookups they share.

pub mod credits;
pub mod group;
pub mod info;
pub mod mask;
pub mod user;

use std::io::{self, BufRead};

use ftpacct::{AccountStore, Group, User};
use zeroize::Zeroizing;

use crate::cli::PasswordArgs;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Find a user by name, falling back to a numeric uid.
pub fn resolve_user(store: &AccountStore, user: &str) -> ftpacct::Result<User> {
    match store.load_by_name(user) {
        Err(e) if e.is_not_found() => match user.parse::<u32>() {
            Ok(uid) => store.load_by_uid(uid),
            Err(_) => Err(e),
        },
        other => other,
    }
}

/// Find a group by name, falling back to a numeric gid.
pub fn resolve_group(store: &AccountStore, group: &str) -> Result<Group, String> {
    store
        .groups()
        .by_name(group)
        .or_else(|| group.parse().ok().and_then(|gid| store.groups().get(gid)))
        .ok_or_else(|| format!("Unknown group: {group}"))
}

/// The password from `--password` or `--password-stdin`, if either was given.
pub fn read_password(args: &PasswordArgs) -> io::Result<Option<Zeroizing<String>>> {
    if args.password_stdin {
        let mut line = Zeroizing::new(String::new());
        io::stdin().lock().read_line(&mut line)?;
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        return Ok(Some(line));
    }
    Ok(args.password.clone().map(Zeroizing::new))
}
