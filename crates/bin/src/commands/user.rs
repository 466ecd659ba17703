//! `user` subcommands.

use ftpacct::{AccountStore, Gid, User};
use serde_json::json;

use super::{CmdResult, read_password, resolve_group, resolve_user};
use crate::cli::{Expiry, Limit, UserCommand};
use crate::output::{OutputFormat, print_fields, print_json, print_table};

pub fn run(store: &AccountStore, command: UserCommand, format: OutputFormat) -> CmdResult {
    match command {
        UserCommand::Add {
            name,
            uid,
            template,
            creator,
            password,
        } => {
            let password = read_password(&password)?;
            let uid = match uid {
                Some(uid) => uid,
                None => store.next_free_uid()?,
            };
            let creator = creator
                .map(|c| resolve_user(store, &c).map(|u| u.uid()))
                .transpose()?;
            let password = password.as_deref().map(String::as_str);
            let user = match template {
                Some(template) => {
                    store.create_from_template(&template, &name, uid, password, creator)?
                }
                None => store.create(&name, uid, password)?,
            };
            report(format, json!({ "created": name, "uid": user.uid() }), || {
                println!("Created user {name} (uid {})", user.uid());
            })
        }
        UserCommand::Del { user } => {
            let user = resolve_user(store, &user)?;
            let name = user.name()?;
            store.delete(user.uid())?;
            report(format, json!({ "deleted": name, "uid": user.uid() }), || {
                println!("Deleted user {name}");
            })
        }
        UserCommand::List { users } => list(store, &users.join(" "), format),
        UserCommand::Show { user } => show(store, &resolve_user(store, &user)?, format),
        UserCommand::Rename { user, new_name } => {
            let user = resolve_user(store, &user)?;
            let old = user.name()?;
            user.rename(&new_name)?;
            report(format, json!({ "uid": user.uid(), "from": old, "to": new_name }), || {
                println!("Renamed {old} to {new_name}");
            })
        }
        UserCommand::Passwd { user, password } => {
            let user = resolve_user(store, &user)?;
            let password = read_password(&password)?
                .ok_or("A password is required (--password or --password-stdin)")?;
            user.set_password(&password)?;
            report(format, json!({ "uid": user.uid(), "password": "updated" }), || {
                println!("Password updated");
            })
        }
        UserCommand::Tagline { user, tagline } => {
            let user = resolve_user(store, &user)?;
            user.set_tagline(&tagline)?;
            report(format, json!({ "uid": user.uid(), "tagline": tagline }), || {
                println!("Tagline updated");
            })
        }
        UserCommand::Flags { user, flags } => {
            let user = resolve_user(store, &user)?;
            if let Some(add) = flags.strip_prefix('+') {
                user.add_flags(add)?;
            } else if let Some(del) = flags.strip_prefix('-') {
                user.del_flags(del)?;
            } else {
                user.set_flags(&flags)?;
            }
            let now = user.flags()?.to_string();
            report(format, json!({ "uid": user.uid(), "flags": now }), || {
                println!("Flags: {now}");
            })
        }
        UserCommand::Primary { user, group } => {
            let user = resolve_user(store, &user)?;
            let group = resolve_group(store, &group)?;
            user.set_primary_group(group.gid)?;
            report(format, json!({ "uid": user.uid(), "primary_gid": group.gid }), || {
                println!("Primary group set to {}", group.name);
            })
        }
        UserCommand::Gadd { user, groups } => {
            let user = resolve_user(store, &user)?;
            let gids = groups
                .iter()
                .map(|g| resolve_group(store, g).map(|g| g.gid))
                .collect::<Result<Vec<_>, _>>()?;
            let added = user.add_secondary_groups(&gids)?;
            report(format, json!({ "uid": user.uid(), "added": added }), || {
                println!("Added {} secondary group(s)", added.len());
            })
        }
        UserCommand::Gdel { user, groups } => {
            let user = resolve_user(store, &user)?;
            let gids = groups
                .iter()
                .map(|g| resolve_group(store, g).map(|g| g.gid))
                .collect::<Result<Vec<_>, _>>()?;
            let removed = user.remove_secondary_groups(&gids)?;
            report(format, json!({ "uid": user.uid(), "removed": removed }), || {
                println!("Removed {} secondary group(s)", removed.len());
            })
        }
        UserCommand::Gids {
            user,
            groups,
            toggle,
        } => {
            let user = resolve_user(store, &user)?;
            let gids = groups
                .iter()
                .map(|g| resolve_group(store, g).map(|g| g.gid))
                .collect::<Result<Vec<_>, _>>()?;
            if toggle {
                user.toggle_gids(&gids)?;
            } else {
                user.set_gids(&gids)?;
            }
            let primary = user.primary_gid()?;
            let secondary = user.secondary_gids()?;
            report(
                format,
                json!({ "uid": user.uid(), "primary_gid": primary, "secondary_gids": secondary }),
                || println!("Primary gid {primary}, secondary {secondary:?}"),
            )
        }
        UserCommand::Gadmin { user, group } => {
            let user = resolve_user(store, &user)?;
            let group = resolve_group(store, &group)?;
            let administers = user.toggle_gadmin_gid(group.gid)?;
            report(
                format,
                json!({ "uid": user.uid(), "gid": group.gid, "gadmin": administers }),
                || {
                    let verb = if administers { "now administers" } else { "no longer administers" };
                    println!("{} {verb} {}", user.name().unwrap_or_default(), group.name);
                },
            )
        }
        UserCommand::Set {
            user,
            home,
            idle,
            expires,
            num_logins,
        } => {
            let user = resolve_user(store, &user)?;
            if let Some(home) = &home {
                user.set_home_dir(home)?;
            }
            if let Some(Limit(idle)) = idle {
                user.set_idle_time(idle)?;
            }
            if let Some(Expiry(date)) = expires {
                user.set_expires(date)?;
            }
            if let Some(Limit(limit)) = num_logins {
                user.set_num_logins(limit)?;
            }
            let value = json!({
                "uid": user.uid(),
                "home_dir": user.home_dir()?,
                "idle_time": user.idle_time()?,
                "expires": user.expires()?,
                "num_logins": user.num_logins()?,
            });
            report(format, value, || println!("Account limits updated"))
        }
        UserCommand::Login {
            user,
            address,
            password,
        } => {
            let password = read_password(&password)?.unwrap_or_default();
            let user = store.login(&user, &address, &password)?;
            let at = user.last_login()?.map(|t| t.to_rfc3339());
            report(format, json!({ "uid": user.uid(), "last_login": at }), || {
                println!("Login accepted for {}", user.name().unwrap_or_default());
            })
        }
    }
}

/// Print `value` as JSON, or run `human` for table output.
pub(super) fn report(
    format: OutputFormat,
    value: serde_json::Value,
    human: impl FnOnce(),
) -> CmdResult {
    match format {
        OutputFormat::Human => human(),
        OutputFormat::Json => print_json(&value)?,
    }
    Ok(())
}

fn list(store: &AccountStore, specifiers: &str, format: OutputFormat) -> CmdResult {
    let mut rows = Vec::new();
    let mut entries = Vec::new();
    for uid in store.uids_matching(specifiers) {
        // Deleted since the match; skip it
        let Ok(record) = store.load_by_uid(uid).and_then(|u| u.record()) else {
            continue;
        };
        let group = store
            .groups()
            .get(record.primary_gid)
            .map_or_else(|| record.primary_gid.to_string(), |g| g.name);
        rows.push(vec![
            record.uid.to_string(),
            record.name.clone(),
            group.clone(),
            record.flags.to_string(),
            record.credits.get_default().to_string(),
        ]);
        entries.push(json!({
            "uid": record.uid,
            "name": record.name,
            "group": group,
            "flags": record.flags.to_string(),
            "credits": record.credits.get_default(),
        }));
    }

    match format {
        OutputFormat::Human => {
            if rows.is_empty() {
                println!("No users found.");
            } else {
                print_table(&["UID", "NAME", "GROUP", "FLAGS", "CREDITS"], &rows);
            }
        }
        OutputFormat::Json => print_json(&json!(entries))?,
    }
    Ok(())
}

fn show(store: &AccountStore, user: &User, format: OutputFormat) -> CmdResult {
    let record = user.record()?;
    let group_name = |gid: Gid| {
        store
            .groups()
            .get(gid)
            .map_or_else(|| gid.to_string(), |g| g.name)
    };
    let primary = group_name(record.primary_gid);
    let secondary: Vec<String> = record
        .secondary_gids
        .iter()
        .copied()
        .map(group_name)
        .collect();
    let sections = user.section_credits()?;
    let gadmin: Vec<String> = record.gadmin_gids.iter().copied().map(group_name).collect();

    match format {
        OutputFormat::Human => {
            let sections = sections
                .iter()
                .map(|(name, balance)| format!("{name}={balance}"))
                .collect::<Vec<_>>()
                .join(" ");
            print_fields(&[
                ("Name", record.name.clone()),
                ("Uid", record.uid.to_string()),
                (
                    "Password",
                    if record.credential.is_some() { "set" } else { "none" }.to_string(),
                ),
                ("Primary group", primary),
                ("Secondary", secondary.join(" ")),
                ("Gadmin of", gadmin.join(" ")),
                ("IP masks", record.ip_masks.to_strings().join(" ")),
                ("Flags", record.flags.to_string()),
                ("Credits", record.credits.get_default().to_string()),
                ("Sections", sections),
                ("Ratio", record.ratios.default_ratio().to_string()),
                ("Allotment", record.allotments.default_allotment().to_string()),
                ("Home", record.home_dir.clone()),
                (
                    "Idle time",
                    record.idle_time.map_or_else(|| "default".to_string(), |s| format!("{s}s")),
                ),
                (
                    "Expires",
                    record.expires.map_or_else(|| "never".to_string(), |d| d.to_string()),
                ),
                (
                    "Max logins",
                    record.num_logins.map_or_else(|| "unlimited".to_string(), |n| n.to_string()),
                ),
                ("Tagline", record.tagline.clone()),
                ("Comment", record.comment.clone()),
                ("Created", record.created.to_rfc3339()),
                (
                    "Last login",
                    record.last_login.map_or_else(|| "never".to_string(), |t| t.to_rfc3339()),
                ),
                ("Logins", record.login_count.to_string()),
            ]);
        }
        OutputFormat::Json => {
            let mut value = serde_json::to_value(&record)?;
            if let Some(fields) = value.as_object_mut() {
                fields.remove("credential");
                fields.insert("has_password".into(), json!(record.credential.is_some()));
                fields.insert("primary_group".into(), json!(primary));
                fields.insert("secondary_groups".into(), json!(secondary));
                fields.insert("gadmin_groups".into(), json!(gadmin));
            }
            print_json(&value)?;
        }
    }
    Ok(())
}
