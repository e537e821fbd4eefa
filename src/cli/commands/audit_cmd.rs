//! `cipherstack audit`: display the vault audit log.
//!
//! Usage:
//!   cipherstack audit               # show last 50 entries
//!   cipherstack audit --last 20     # show last 20
//!   cipherstack audit --since 7d    # entries from last 7 days

use chrono::{DateTime, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::audit::{AuditEntry, AuditLog};
use crate::cli::{output, vault_dir, Cli};
use crate::errors::{CipherStackError, Result};
use crate::vault::VaultEvent;

/// Execute the `audit` command.
pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    let dir = vault_dir(cli)?;
    if !dir.exists() {
        output::info("No audit entries found.");
        return Ok(());
    }

    let since = since.map(parse_duration).transpose()?;
    let entries = AuditLog::open(&dir)?.history(last, since)?;

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    print_audit_table(&entries);
    Ok(())
}

/// Parse a duration like "7d", "24h" or "30m" into the instant that long ago.
fn parse_duration(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let invalid = || {
        CipherStackError::CommandFailed(format!(
            "invalid duration '{input}': use a form like 7d, 24h or 30m"
        ))
    };

    let (split, _) = input.char_indices().last().ok_or_else(invalid)?;
    let (num_str, unit) = input.split_at(split);
    let num: i64 = num_str.parse().map_err(|_| invalid())?;

    let duration = match unit {
        "d" => chrono::Duration::days(num),
        "h" => chrono::Duration::hours(num),
        "m" => chrono::Duration::minutes(num),
        _ => return Err(invalid()),
    };

    Ok(Utc::now() - duration)
}

/// Print audit entries in a formatted table.
pub fn print_audit_table(entries: &[AuditEntry]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Operation", "Alias", "Details"]);

    for entry in entries {
        table.add_row(vec![
            entry.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            colorize_operation(&entry.event),
            entry.event.alias().to_string(),
            details(&entry.event),
        ]);
    }

    println!(
        "{}",
        style(format!("{} audit entries:", entries.len())).bold()
    );
    println!("{table}");
}

fn colorize_operation(event: &VaultEvent) -> String {
    let op = style(event.operation());
    match event {
        VaultEvent::Saved { .. } => op.green(),
        VaultEvent::Renamed { .. } => op.blue(),
        VaultEvent::Deleted { .. } => op.red(),
    }
    .to_string()
}

/// The Details column.
fn details(event: &VaultEvent) -> String {
    match event {
        VaultEvent::Saved {
            strength_label,
            replaced: true,
            ..
        } => format!("replaced, strength {strength_label}"),
        VaultEvent::Saved { strength_label, .. } => format!("new, strength {strength_label}"),
        VaultEvent::Renamed { from, .. } => format!("from '{from}'"),
        VaultEvent::Deleted { .. } => "-".into(),
    }
}
