//! `credits` subcommands.

use ftpacct::AccountStore;
use serde_json::json;

use super::{CmdResult, resolve_user, user::report};
use crate::cli::CreditsCommand;
use crate::output::{OutputFormat, print_json, print_table};

fn label(section: &str) -> &str {
    if section.is_empty() { "default" } else { section }
}

/// Convert an unsigned CLI amount to a ledger delta.
fn delta(amount: u64, negative: bool) -> Result<i64, String> {
    let delta = i64::try_from(amount).map_err(|_| format!("Amount too large: {amount}"))?;
    Ok(if negative { -delta } else { delta })
}

pub fn run(store: &AccountStore, command: CreditsCommand, format: OutputFormat) -> CmdResult {
    match command {
        CreditsCommand::Show { user } => {
            let user = resolve_user(store, &user)?;
            let default = user.get_default_credits()?;
            let sections = user.section_credits()?;
            match format {
                OutputFormat::Human => {
                    let mut rows = vec![vec!["default".to_string(), default.to_string()]];
                    rows.extend(
                        sections
                            .iter()
                            .map(|(name, balance)| vec![name.clone(), balance.to_string()]),
                    );
                    print_table(&["SECTION", "BALANCE"], &rows);
                }
                OutputFormat::Json => {
                    let sections: serde_json::Map<String, serde_json::Value> = sections
                        .into_iter()
                        .map(|(name, balance)| (name, json!(balance)))
                        .collect();
                    print_json(&json!({
                        "uid": user.uid(),
                        "default": default,
                        "sections": sections,
                    }))?;
                }
            }
            Ok(())
        }
        CreditsCommand::Give {
            user,
            amount,
            section,
        } => {
            let user = resolve_user(store, &user)?;
            let balance = user.incr_section_credits(&section, delta(amount, false)?)?;
            report(
                format,
                json!({ "uid": user.uid(), "section": section, "balance": balance }),
                || println!("{}: {balance}", label(&section)),
            )
        }
        CreditsCommand::Take {
            user,
            amount,
            section,
            saturating,
        } => {
            let user = resolve_user(store, &user)?;
            let taken = if saturating {
                user.take_section_credits_saturating(&section, amount)?
            } else {
                user.incr_section_credits(&section, delta(amount, true)?)?;
                amount
            };
            let balance = user.get_section_credits(&section)?;
            report(
                format,
                json!({ "uid": user.uid(), "section": section, "taken": taken, "balance": balance }),
                || println!("Took {taken} from {}: {balance} left", label(&section)),
            )
        }
        CreditsCommand::Ratio {
            user,
            ratio,
            section,
            clear,
        } => {
            let user = resolve_user(store, &user)?;
            if clear {
                user.clear_section_ratio(&section)?;
            } else if let Some(ratio) = ratio {
                user.set_section_ratio(&section, ratio)?;
            }
            let own = user.section_ratio(&section)?;
            let effective = user.effective_ratio(&section)?;
            report(
                format,
                json!({ "uid": user.uid(), "section": section, "ratio": own, "effective": effective }),
                || match effective {
                    0 => println!("{}: leech", label(&section)),
                    n if own.is_none() => println!("{}: 1:{n} (default)", label(&section)),
                    n => println!("{}: 1:{n}", label(&section)),
                },
            )
        }
        CreditsCommand::Allotment {
            user,
            amount,
            section,
        } => {
            let user = resolve_user(store, &user)?;
            if let Some(amount) = amount {
                user.set_section_allotment(&section, amount)?;
            }
            let allotment = user.section_allotment(&section)?;
            report(
                format,
                json!({ "uid": user.uid(), "section": section, "allotment": allotment }),
                || println!("{}: {allotment} per week", label(&section)),
            )
        }
    }
}
