//! `mask` subcommands.

use ftpacct::{AccountStore, mask::MaskAdd};
use serde_json::json;

use super::{CmdResult, resolve_user, user::report};
use crate::cli::MaskCommand;
use crate::output::OutputFormat;

pub fn run(store: &AccountStore, command: MaskCommand, format: OutputFormat) -> CmdResult {
    match command {
        MaskCommand::Add { user, masks } => {
            let user = resolve_user(store, &user)?;
            let mut outcomes = Vec::new();
            for mask in &masks {
                outcomes.push((mask.as_str(), user.add_ip_mask(mask)?));
            }
            let entries: Vec<_> = outcomes
                .iter()
                .map(|(mask, outcome)| match outcome {
                    MaskAdd::Added { replaced } => {
                        json!({ "mask": mask, "added": true, "replaced": replaced })
                    }
                    MaskAdd::Covered { by } => {
                        json!({ "mask": mask, "added": false, "covered_by": by })
                    }
                })
                .collect();
            report(format, json!({ "uid": user.uid(), "masks": entries }), || {
                for (mask, outcome) in &outcomes {
                    match outcome {
                        MaskAdd::Added { replaced } => {
                            println!("Added {mask}");
                            for old in replaced {
                                println!("  replaced {old}");
                            }
                        }
                        MaskAdd::Covered { by } => println!("Already covered by {by}: {mask}"),
                    }
                }
            })
        }
        MaskCommand::Del {
            user,
            masks,
            index,
        } => {
            let user = resolve_user(store, &user)?;
            let mut removed = Vec::new();
            if let Some(index) = index {
                removed.push(user.remove_ip_mask_at(index)?);
            }
            for mask in masks {
                if user.remove_ip_mask(&mask)? {
                    removed.push(mask);
                }
            }
            report(format, json!({ "uid": user.uid(), "removed": removed }), || {
                println!("Removed {} mask(s)", removed.len());
            })
        }
        MaskCommand::Clear { user } => {
            let user = resolve_user(store, &user)?;
            let removed = user.clear_ip_masks()?;
            report(format, json!({ "uid": user.uid(), "removed": removed }), || {
                println!("Removed {} mask(s)", removed.len());
            })
        }
        MaskCommand::Check { address, user } => {
            let allowed = match &user {
                Some(user) => resolve_user(store, user)?.matches_address(&address)?,
                None => store.address_allowed(&address),
            };
            report(format, json!({ "address": address, "allowed": allowed }), || {
                let verdict = if allowed { "allowed" } else { "rejected" };
                println!("{address}: {verdict}");
            })
        }
    }
}
