//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::crypto::{estimate_strength, NoProgress, ProgressSink, TracingProgress};
use crate::errors::{CipherStackError, Result};

/// Environment variable consulted before prompting for a password.
pub const PASSWORD_ENV: &str = "CIPHERSTACK_PASSWORD";

/// cipherstack CLI: layered password-based text encryption.
#[derive(Parser)]
#[command(
    name = "cipherstack",
    about = "Password-based multi-cipher text encryption",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault directory (default: from .cipherstack.toml, else .cipherstack)
    #[arg(long, global = true)]
    pub vault_dir: Option<String>,

    /// Debug logging and a step-by-step progress trail on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Encrypt text into a token
    Encrypt {
        /// Text to encrypt (omit to read from a pipe or prompt)
        text: Option<String>,

        /// Comma-separated chain, e.g. AES_GCM,TWOFISH_CBC (default: from config)
        #[arg(short, long)]
        algorithms: Option<String>,

        /// Deflate the text before encrypting
        #[arg(long)]
        compress: bool,
    },

    /// Decrypt a token back into text
    Decrypt {
        /// Token to decrypt (omit to read from a pipe or prompt)
        token: Option<String>,

        /// Copy the plaintext to the clipboard instead of printing it
        #[arg(long)]
        copy: bool,
    },

    /// Derive the root secret for a password and salt
    DeriveKey {
        /// Base64 salt (16 bytes); a random one is drawn if omitted
        #[arg(long)]
        salt: Option<String>,
    },

    /// List supported chain algorithms
    Algorithms,

    /// Estimate the strength of a password
    Strength {
        /// Password to score (omit for a hidden prompt)
        password: Option<String>,
    },

    /// Manage the hardware-backed secret vault
    Vault {
        #[command(subcommand)]
        action: VaultAction,
    },

    /// View the audit log of vault operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },
}

/// Vault subcommands.
#[derive(clap::Subcommand)]
pub enum VaultAction {
    /// Encrypt and store a secret under an alias
    Save {
        /// Alias to store the secret under
        alias: String,
        /// Secret value (omit for interactive prompt)
        secret: Option<String>,
    },

    /// Print a stored secret
    Load {
        /// Alias of the secret
        alias: String,
        /// Copy the secret to the clipboard instead of printing it
        #[arg(long)]
        copy: bool,
    },

    /// List stored aliases
    List,

    /// Rename an entry
    Rename {
        /// Current alias
        old: String,
        /// New alias
        new: String,
    },

    /// Delete an entry
    Delete {
        /// Alias to delete
        alias: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get the password for decryption, trying in order:
/// 1. `CIPHERSTACK_PASSWORD` env var (scripts/CI)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter password")
        .interact()
        .map_err(|e| CipherStackError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password with confirmation (used by `encrypt`).
///
/// Also respects `CIPHERSTACK_PASSWORD`. Weak passwords are accepted
/// with a warning showing their estimated strength.
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    let password = match password_from_env() {
        Some(pw) => pw,
        None => {
            let pw = dialoguer::Password::new()
                .with_prompt("Choose password")
                .with_confirmation("Confirm password", "Passwords do not match, try again")
                .interact()
                .map_err(|e| CipherStackError::CommandFailed(format!("password prompt: {e}")))?;
            Zeroizing::new(pw)
        }
    };

    let strength = estimate_strength(&password);
    if strength.score < 2 {
        output::warning(&format!(
            "Password strength is {} ({:.0} bits); consider a longer one.",
            strength.label, strength.entropy_bits
        ));
    }

    Ok(password)
}

fn password_from_env() -> Option<Zeroizing<String>> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

/// Resolve a value from, in order: the argument, piped stdin, or a prompt.
///
/// `hidden` prompts do not echo (secrets); others do (tokens, text).
pub fn read_input(arg: Option<&str>, prompt: &str, hidden: bool) -> Result<Zeroizing<String>> {
    if let Some(v) = arg {
        return Ok(Zeroizing::new(v.to_string()));
    }

    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        let trimmed_len = buf.trim_end_matches(['\r', '\n']).len();
        buf.truncate(trimmed_len);
        return Ok(buf);
    }

    let value = if hidden {
        dialoguer::Password::new().with_prompt(prompt).interact()
    } else {
        dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
    }
    .map_err(|e| CipherStackError::CommandFailed(format!("input prompt: {e}")))?;

    Ok(Zeroizing::new(value))
}

/// Load `.cipherstack.toml` from the working directory.
pub fn load_settings() -> Result<Settings> {
    let cwd = std::env::current_dir()?;
    Settings::load(&cwd)
}

/// Resolve the vault directory: `--vault-dir`, else config, else default.
///
/// Example: `<cwd>/.cipherstack`
pub fn vault_dir(cli: &Cli) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    match &cli.vault_dir {
        Some(dir) => Ok(cwd.join(dir)),
        None => Ok(load_settings()?.vault_dir_path(&cwd)),
    }
}

/// Progress sink for the current verbosity.
pub fn progress_sink(cli: &Cli) -> Box<dyn ProgressSink> {
    if cli.verbose {
        Box::new(TracingProgress)
    } else {
        Box::new(NoProgress)
    }
}

/// Put `text` on the system clipboard.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new()
        .map_err(|e| CipherStackError::CommandFailed(format!("clipboard unavailable: {e}")))?;
    clipboard
        .set_text(text.to_string())
        .map_err(|e| CipherStackError::CommandFailed(format!("clipboard write failed: {e}")))
}
