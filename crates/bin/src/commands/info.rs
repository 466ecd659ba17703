//! Store info command - shows the data directory, counts and health.

use ftpacct::AccountStore;
use serde_json::json;

use super::CmdResult;
use crate::output::{OutputFormat, print_fields, print_json};

/// Run the info command
pub fn run(store: &AccountStore, format: OutputFormat) -> CmdResult {
    let users = store.total_count();
    let groups = store.groups().len();
    let corrupt = store.corrupt_uids();
    let next_uid = store.next_free_uid().ok();
    let status = store.degraded_reason().unwrap_or("ok");

    match format {
        OutputFormat::Human => {
            let corrupt_list = corrupt
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            print_fields(&[
                ("Users", users.to_string()),
                ("Groups", groups.to_string()),
                ("Corrupt", if corrupt.is_empty() { "none".into() } else { corrupt_list }),
                (
                    "Next uid",
                    next_uid.map_or_else(|| "exhausted".to_string(), |u| u.to_string()),
                ),
                ("Status", status.to_string()),
            ]);
        }
        OutputFormat::Json => {
            print_json(&json!({
                "users": users,
                "groups": groups,
                "corrupt_uids": corrupt,
                "next_uid": next_uid,
                "degraded": store.degraded_reason(),
            }))?;
        }
    }

    Ok(())
}
