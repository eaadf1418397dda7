use crate::cli::LedgerCommand;
use crate::commands::{CliError, CommandContext};
use crate::domain::models::{Balance, Direction, HistoryEntry, Identity};
use crate::services::gva::{is_pubkey, GvaClient};
use crate::services::output::{print_json, print_out};
use crate::services::wallets::{render, OutputShape, WalletAggregator, WalletFilter};
use colored::Colorize;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdentityReport {
    pubkey: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    is_member: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    balance: Option<Balance>,
}

impl IdentityReport {
    fn new(pubkey: String, idty: Option<Identity>) -> Self {
        let (username, is_member) = match idty {
            Some(i) => (i.username, i.is_member),
            None => (None, false),
        };
        Self {
            pubkey,
            username,
            is_member,
            balance: None,
        }
    }
}

/// `-p` value, else the credential's own pubkey; checksum suffix dropped.
fn target_pubkey(explicit: Option<&str>, ctx: &CommandContext<'_>) -> anyhow::Result<String> {
    let raw = match explicit {
        Some(p) => p.to_string(),
        None => ctx.credential.pubkey()?,
    };
    if !is_pubkey(&raw) {
        return Err(CliError::InvalidPubkey(raw).into());
    }
    Ok(raw.split(':').next().unwrap_or_default().to_string())
}

pub fn handle_ledger_commands(
    cmd: &LedgerCommand,
    ctx: &CommandContext<'_>,
) -> anyhow::Result<()> {
    let gva = GvaClient::new(ctx.address, ctx.settings.timeout_secs)?;
    tracing::debug!(
        endpoint = gva.endpoint(),
        keyless = ctx.no_credential_needed,
        "ledger command"
    );
    match cmd {
        LedgerCommand::Pay(_) => return Err(CliError::Unsupported("pay").into()),
        LedgerCommand::History(a) => {
            let pubkey = target_pubkey(a.pubkey.as_deref(), ctx)?;
            let entries = gva.history(&pubkey, a.number)?;
            if a.nocolors {
                colored::control::set_override(false);
            }
            if !a.json {
                println!("{}", history_header());
            }
            print_out(a.json, &entries, history_row)?;
        }
        LedgerCommand::Balance(a) => {
            if a.mempool {
                tracing::warn!(
                    "pending transactions are not counted, showing the blockchain balance"
                );
            }
            let pubkey = target_pubkey(a.pubkey.as_deref(), ctx)?;
            println!("{}", gva.balance(&pubkey)?.unwrap_or_default());
        }
        LedgerCommand::Id(a) => {
            let report = match (&a.pubkey, &a.username) {
                (None, Some(username)) => {
                    let wallets =
                        WalletAggregator::new(&gva, ctx.settings.wallet_page_size).collect()?;
                    let wallet = wallets
                        .into_iter()
                        .find(|w| w.username() == Some(username.as_str()))
                        .ok_or_else(|| anyhow::anyhow!("No identity named {}", username))?;
                    IdentityReport::new(wallet.pubkey, wallet.id)
                }
                (pubkey, _) => {
                    let pubkey = target_pubkey(pubkey.as_deref(), ctx)?;
                    let idty = gva.identity(&pubkey)?;
                    IdentityReport::new(pubkey, idty)
                }
            };
            print_json(&report)?;
        }
        LedgerCommand::IdBalance(a) => {
            let pubkey = target_pubkey(a.pubkey.as_deref(), ctx)?;
            let idty = gva.identity(&pubkey)?;
            let balance = gva.balance(&pubkey)?.unwrap_or_default();
            let mut report = IdentityReport::new(pubkey, idty);
            report.balance = Some(balance);
            print_json(&report)?;
        }
        LedgerCommand::CurrentUd(_) => {
            println!("{}", gva.current_ud()?);
        }
        LedgerCommand::ListWallets(a) => {
            let filter = WalletFilter {
                mbr: a.mbr,
                non_mbr: a.non_mbr,
                larf: a.larf,
            };
            let shape = if a.brut {
                OutputShape::Plain
            } else {
                OutputShape::JsonList
            };
            let wallets = WalletAggregator::new(&gva, ctx.settings.wallet_page_size)
                .list(filter)
                .map_err(|e| anyhow::anyhow!("Failed to retrieve the list:\n{}", e))?;
            println!("{}", render(&wallets, filter, shape)?);
        }
    }
    Ok(())
}

fn history_header() -> String {
    format!(
        "{:<16}  {:<44}  {:>12}  {}",
        "Date", "Issuer / Recipient", "Amount (Ğ1)", "Comment"
    )
    .bold()
    .to_string()
}

fn history_row(e: &HistoryEntry) -> String {
    let (sign, paint): (&str, fn(String) -> colored::ColoredString) = match e.direction {
        Direction::Received => ("+", |s| s.green()),
        Direction::Sent => ("-", |s| s.red()),
    };
    let amount = format!("{:>12}", format!("{}{}", sign, e.amount));
    format!(
        "{:<16}  {:<44}  {}  {}",
        e.date,
        e.pubkey,
        paint(amount),
        e.comment
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_rows_sign_amounts_by_direction() {
        colored::control::set_override(false);
        let received = HistoryEntry {
            date: "13/09/2020 12:26".into(),
            direction: Direction::Received,
            pubkey: "BOB".into(),
            amount: Balance(1234),
            comment: "merci".into(),
        };
        let row = history_row(&received);
        assert!(row.starts_with("13/09/2020 12:26  BOB "));
        assert!(row.contains("      +12.34  merci"));

        let sent = HistoryEntry {
            direction: Direction::Sent,
            amount: Balance(5),
            ..received
        };
        assert!(history_row(&sent).contains("-0.05"));
        assert!(history_header().starts_with("Date"));
    }

    #[test]
    fn identity_report_omits_missing_username() {
        let v = serde_json::to_value(IdentityReport::new("PK".into(), None)).expect("json");
        assert_eq!(v, serde_json::json!({"pubkey": "PK", "isMember": false}));

        let mut r = IdentityReport::new(
            "PK".into(),
            Some(Identity {
                is_member: true,
                username: Some("alice".into()),
            }),
        );
        r.balance = Some(Balance(1050));
        let v = serde_json::to_value(r).expect("json");
        assert_eq!(v["username"], "alice");
        assert_eq!(v["balance"], 10.5);
    }
}
