//! `group` subcommands.

use ftpacct::AccountStore;
use serde_json::json;

use super::{CmdResult, resolve_group, user::report};
use crate::cli::GroupCommand;
use crate::output::{OutputFormat, print_fields, print_json, print_table};

pub fn run(store: &AccountStore, command: GroupCommand, format: OutputFormat) -> CmdResult {
    match command {
        GroupCommand::Add {
            name,
            gid,
            description,
        } => {
            let gid = match gid {
                Some(gid) => gid,
                None => store.groups().next_free_gid().ok_or("No free gid")?,
            };
            let mut group = store.create_group(gid, &name)?;
            if let Some(description) = description {
                group = store.set_group_description(gid, &description)?;
            }
            report(format, json!(group), || {
                println!("Created group {} (gid {})", group.name, group.gid);
            })
        }
        GroupCommand::Del { group } => {
            let group = resolve_group(store, &group)?;
            store.delete_group(group.gid)?;
            report(format, json!({ "deleted": group.name, "gid": group.gid }), || {
                println!("Deleted group {}", group.name);
            })
        }
        GroupCommand::Rename { group, new_name } => {
            let group = resolve_group(store, &group)?;
            let renamed = store.rename_group(group.gid, &new_name)?;
            report(format, json!(renamed), || {
                println!("Renamed {} to {}", group.name, renamed.name);
            })
        }
        GroupCommand::List => {
            let mut rows = Vec::new();
            let mut entries = Vec::new();
            for group in store.groups().all() {
                let members = store.group_members(group.gid)?;
                rows.push(vec![
                    group.gid.to_string(),
                    group.name.clone(),
                    members.primary.len().to_string(),
                    members.secondary.len().to_string(),
                    group.description.clone(),
                ]);
                entries.push(json!({
                    "gid": group.gid,
                    "name": group.name,
                    "primary_members": members.primary.len(),
                    "secondary_members": members.secondary.len(),
                    "description": group.description,
                }));
            }
            match format {
                OutputFormat::Human => {
                    print_table(&["GID", "NAME", "PRIMARY", "SECONDARY", "DESCRIPTION"], &rows)
                }
                OutputFormat::Json => print_json(&json!(entries))?,
            }
            Ok(())
        }
        GroupCommand::Show { group } => {
            let group = resolve_group(store, &group)?;
            let members = store.group_members(group.gid)?;
            let names = |uids: &[u32]| -> Vec<String> {
                uids.iter()
                    .map(|uid| store.name_for_uid(*uid).unwrap_or_else(|| uid.to_string()))
                    .collect()
            };
            let primary = names(&members.primary);
            let secondary = names(&members.secondary);
            let gadmins = names(&members.gadmins);
            match format {
                OutputFormat::Human => print_fields(&[
                    ("Name", group.name.clone()),
                    ("Gid", group.gid.to_string()),
                    ("Description", group.description.clone()),
                    ("Primary", primary.join(" ")),
                    ("Secondary", secondary.join(" ")),
                    ("Admins", gadmins.join(" ")),
                ]),
                OutputFormat::Json => print_json(&json!({
                    "gid": group.gid,
                    "name": group.name,
                    "description": group.description,
                    "primary": primary,
                    "secondary": secondary,
                    "gadmins": gadmins,
                }))?,
            }
            Ok(())
        }
    }
}
