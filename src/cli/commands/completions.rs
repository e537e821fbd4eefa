//! `cipherstack completions <shell>`: print a completion script.
//!
//! Usage:
//!   cipherstack completions bash > ~/.bash_completion.d/cipherstack
//!   cipherstack completions ps | Out-String | Invoke-Expression

use std::io::{self, Write};
use std::str::FromStr;

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::errors::{CipherStackError, Result};

/// Execute the `completions` command.
pub fn execute(shell: &str) -> Result<()> {
    write_completions(parse_shell(shell)?, &mut io::stdout().lock())
}

/// Generate the script for `shell` into `out`, covering every subcommand
/// and flag of the `Cli` parser.
pub fn write_completions(shell: Shell, out: &mut dyn Write) -> Result<()> {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin, out);
    out.flush()?;
    Ok(())
}

/// Shell names as clap_complete spells them, any case, plus `ps`.
fn parse_shell(name: &str) -> Result<Shell> {
    let name = name.trim().to_ascii_lowercase();
    let name = if name == "ps" { "powershell" } else { name.as_str() };
    Shell::from_str(name).map_err(|_| {
        CipherStackError::CommandFailed(format!(
            "unknown shell '{name}' (supported: bash, zsh, fish, powershell, elvish)"
        ))
    })
}
