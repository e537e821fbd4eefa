//! `cipherstack vault`: the hardware-backed secret vault.
//!
//! Usage:
//!   cipherstack vault save bank            # prompts for the secret
//!   cipherstack vault load bank --copy
//!   cipherstack vault list
//!   cipherstack vault rename bank bank-old
//!   cipherstack vault delete bank-old
//!
//! The wrapping key lives in the OS keyring; entries live one file each
//! under `<vault_dir>/store/`.

use std::path::Path;

use dialoguer::Confirm;

use crate::cli::{copy_to_clipboard, output, read_input, Cli, VaultAction};
use crate::errors::{CipherStackError, Result};
use crate::vault::{HardwareKeystore, HardwareVault, PreferenceStore, VaultEvent};

/// Execute a `vault` subcommand.
#[cfg(feature = "keyring-store")]
pub fn execute(cli: &Cli, action: &VaultAction) -> Result<()> {
    use crate::cli::vault_dir;
    use crate::keyring::OsKeyringKeystore;
    use crate::vault::FileStore;

    let dir = vault_dir(cli)?;
    let store = FileStore::in_dir(&dir)?;
    let vault = HardwareVault::new(OsKeyringKeystore::for_vault_dir(&dir), store);
    run(&vault, &dir, action)
}

/// Execute a `vault` subcommand.
#[cfg(not(feature = "keyring-store"))]
pub fn execute(cli: &Cli, action: &VaultAction) -> Result<()> {
    let _ = (cli, action);
    Err(CipherStackError::CommandFailed(
        "vault commands need the `keyring-store` feature".into(),
    ))
}

/// Dispatch `action` against an opened vault.
pub fn run<K, S>(vault: &HardwareVault<K, S>, dir: &Path, action: &VaultAction) -> Result<()>
where
    K: HardwareKeystore,
    S: PreferenceStore,
{
    match action {
        VaultAction::Save { alias, secret } => save(vault, dir, alias, secret.as_deref()),
        VaultAction::Load { alias, copy } => load(vault, alias, *copy),
        VaultAction::List => {
            output::print_entries_table(&vault.list()?);
            Ok(())
        }
        VaultAction::Rename { old, new } => {
            vault.rename(old, new)?;
            record(
                dir,
                &VaultEvent::Renamed {
                    from: old.trim().to_string(),
                    to: new.trim().to_string(),
                },
            );
            output::success(&format!("Renamed '{}' to '{}'", old.trim(), new.trim()));
            Ok(())
        }
        VaultAction::Delete { alias, force } => delete(vault, dir, alias, *force),
    }
}

fn save<K, S>(
    vault: &HardwareVault<K, S>,
    dir: &Path,
    alias: &str,
    secret: Option<&str>,
) -> Result<()>
where
    K: HardwareKeystore,
    S: PreferenceStore,
{
    if secret.is_some() {
        output::warning("Secret provided on command line; it may appear in shell history.");
    }
    let secret = read_input(secret, &format!("Enter secret for {}", alias.trim()), true)?;

    let existed = vault.contains(alias)?;
    let meta = vault.save(alias, &secret)?;

    record(
        dir,
        &VaultEvent::Saved {
            alias: meta.alias.clone(),
            strength_label: meta.strength_label.clone(),
            replaced: existed,
        },
    );
    output::success(&format!(
        "Saved '{}' (strength: {})",
        meta.alias,
        output::styled_strength(meta.strength_score, &meta.strength_label)
    ));
    Ok(())
}

fn load<K, S>(vault: &HardwareVault<K, S>, alias: &str, copy: bool) -> Result<()>
where
    K: HardwareKeystore,
    S: PreferenceStore,
{
    let secret = vault
        .load(alias)?
        .ok_or_else(|| CipherStackError::AliasNotFound(alias.trim().to_string()))?;

    if copy {
        copy_to_clipboard(&secret)?;
        output::success(&format!("Secret '{}' copied to clipboard.", alias.trim()));
    } else {
        println!("{}", secret.as_str());
    }
    Ok(())
}

fn delete<K, S>(vault: &HardwareVault<K, S>, dir: &Path, alias: &str, force: bool) -> Result<()>
where
    K: HardwareKeystore,
    S: PreferenceStore,
{
    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete vault entry '{}'?", alias.trim()))
            .default(false)
            .interact()
            .map_err(|e| CipherStackError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    if !vault.delete(alias)? {
        return Err(CipherStackError::AliasNotFound(alias.trim().to_string()));
    }

    record(
        dir,
        &VaultEvent::Deleted {
            alias: alias.trim().to_string(),
        },
    );
    output::success(&format!("Deleted '{}'", alias.trim()));
    Ok(())
}

/// Write an audit entry when the `audit-log` feature is on.
fn record(dir: &Path, event: &VaultEvent) {
    #[cfg(feature = "audit-log")]
    crate::audit::log_audit(dir, event);

    #[cfg(not(feature = "audit-log"))]
    let _ = (dir, event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Argon2Params, CryptoEngine};
    use crate::vault::{MemoryStore, SoftwareKeystore};

    fn vault() -> HardwareVault<SoftwareKeystore, MemoryStore> {
        let engine = CryptoEngine::new(Argon2Params {
            memory_kib: 8_192,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        HardwareVault::with_engine(SoftwareKeystore::new(), MemoryStore::new(), engine)
    }

    #[test]
    fn run_dispatches_and_audits() {
        let dir = tempfile::TempDir::new().unwrap();
        let v = vault();

        let save = VaultAction::Save {
            alias: "bank".into(),
            secret: Some("BlueHorse".into()),
        };
        run(&v, dir.path(), &save).unwrap();
        assert!(v.contains("bank").unwrap());

        let rename = VaultAction::Rename {
            old: "bank".into(),
            new: "savings".into(),
        };
        run(&v, dir.path(), &rename).unwrap();

        let delete = VaultAction::Delete {
            alias: "savings".into(),
            force: true,
        };
        run(&v, dir.path(), &delete).unwrap();
        assert!(v.list().unwrap().is_empty());

        #[cfg(feature = "audit-log")]
        {
            let audit = crate::audit::AuditLog::open(dir.path()).unwrap();
            let events: Vec<VaultEvent> = audit
                .history(10, None)
                .unwrap()
                .into_iter()
                .map(|e| e.event)
                .collect();
            assert_eq!(
                events,
                vec![
                    VaultEvent::Deleted {
                        alias: "savings".into()
                    },
                    VaultEvent::Renamed {
                        from: "bank".into(),
                        to: "savings".into()
                    },
                    VaultEvent::Saved {
                        alias: "bank".into(),
                        strength_label: crate::crypto::secure_memory::estimate_strength("BlueHorse")
                            .label,
                        replaced: false
                    },
                ]
            );
        }
    }

    #[test]
    fn deleting_missing_alias_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let delete = VaultAction::Delete {
            alias: "ghost".into(),
            force: true,
        };
        assert!(matches!(
            run(&vault(), dir.path(), &delete),
            Err(CipherStackError::AliasNotFound(_))
        ));
    }
}
