//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::crypto::{Algorithm, Mode, PasswordStrength};
use crate::vault::VaultEntryMetadata;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    eprintln!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    eprintln!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    eprintln!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Color a strength label by score.
pub fn styled_strength(score: u8, label: &str) -> String {
    match score {
        0 | 1 => style(label).red().to_string(),
        2 => style(label).yellow().to_string(),
        _ => style(label).green().to_string(),
    }
}

/// Print a table of vault entries (Alias, Saved, Strength).
pub fn print_entries_table(entries: &[VaultEntryMetadata]) {
    if entries.is_empty() {
        info("No entries in this vault yet.");
        tip("Run `cipherstack vault save <ALIAS>` to add your first secret.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Alias", "Saved", "Strength"]);

    for e in entries {
        table.add_row(vec![
            e.alias.clone(),
            e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            styled_strength(e.strength_score, &e.strength_label),
        ]);
    }

    println!("{table}");
}

/// Print the algorithm table (Identifier, Cipher, Mode, IV).
pub fn print_algorithms_table() {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Identifier", "Cipher", "Mode", "IV bytes"]);

    for algorithm in Algorithm::all() {
        let mode = match algorithm.mode() {
            Mode::Aead => "AEAD",
            Mode::Cbc => "CBC + PKCS#7",
        };
        table.add_row(vec![
            algorithm.id().to_string(),
            algorithm.spec().description.to_string(),
            mode.to_string(),
            algorithm.iv_size().to_string(),
        ]);
    }

    println!("{table}");
}

/// Print a password strength estimate.
pub fn print_strength(strength: &PasswordStrength) {
    println!(
        "{} {} (score {}/4, ~{:.0} bits)",
        style("Strength:").bold(),
        styled_strength(strength.score, &strength.label),
        strength.score,
        strength.entropy_bits
    );
}
