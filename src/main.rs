use clap::Parser;
use cipherstack::cli::commands;
use cipherstack::cli::{output, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Encrypt {
            ref text,
            ref algorithms,
            compress,
        } => commands::encrypt::execute(&cli, text.as_deref(), algorithms.as_deref(), compress),
        Commands::Decrypt { ref token, copy } => {
            commands::decrypt::execute(&cli, token.as_deref(), copy)
        }
        Commands::DeriveKey { ref salt } => commands::derive_key::execute(salt.as_deref()),
        Commands::Algorithms => commands::algorithms::execute(),
        Commands::Strength { ref password } => commands::strength::execute(password.as_deref()),
        Commands::Vault { ref action } => commands::vault::execute(&cli, action),
        Commands::Audit { last, ref since } => audit(&cli, last, since.as_deref()),
        Commands::Completions { ref shell } => commands::completions::execute(shell),
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout carries tokens and plaintext only.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cipherstack={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "audit-log")]
fn audit(cli: &Cli, last: usize, since: Option<&str>) -> cipherstack::errors::Result<()> {
    commands::audit_cmd::execute(cli, last, since)
}

#[cfg(not(feature = "audit-log"))]
fn audit(_cli: &Cli, _last: usize, _since: Option<&str>) -> cipherstack::errors::Result<()> {
    Err(cipherstack::errors::CipherStackError::CommandFailed(
        "audit log support was not compiled in (enable the `audit-log` feature)".into(),
    ))
}
