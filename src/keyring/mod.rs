//! OS keyring-backed hardware keystore.
//!
//! Keeps the vault's wrapping key in the operating system's secure
//! credential store:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring / KDE Wallet)
//!
//! The key never leaves the credential store except transiently, inside a
//! zeroizing buffer, for the duration of one wrap or unwrap.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::crypto::keys::KEY_LEN;
use crate::errors::{CipherStackError, Result};
use crate::vault::keystore::{unwrap_with, wrap_with, HardwareKeystore, WrappedBlob};

/// Service name used in the OS keyring.
const SERVICE_NAME: &str = "cipherstack";

/// Keystore whose wrapping key lives in the OS credential store.
#[derive(Debug, Clone)]
pub struct OsKeyringKeystore {
    account: String,
}

impl OsKeyringKeystore {
    /// Use the keyring entry `cipherstack / <account>`.
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    /// One wrapping key per vault directory.
    ///
    /// Uses the canonical path so that different relative paths to the
    /// same vault resolve to the same keyring entry.
    pub fn for_vault_dir(vault_dir: &Path) -> Self {
        let canonical = vault_dir
            .canonicalize()
            .unwrap_or_else(|_| vault_dir.to_path_buf());
        Self::new(format!("vault:{}", canonical.display()))
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(SERVICE_NAME, &self.account).map_err(|e| {
            CipherStackError::KeystoreError(format!("failed to create keyring entry: {e}"))
        })
    }

    /// Read the wrapping key. `None` if no key is stored.
    fn load_key(&self) -> Result<Option<Zeroizing<Vec<u8>>>> {
        let encoded = match self.entry()?.get_password() {
            Ok(encoded) => Zeroizing::new(encoded),
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => {
                return Err(CipherStackError::KeystoreError(format!(
                    "failed to read from keyring: {e}"
                )))
            }
        };

        let key = Zeroizing::new(BASE64.decode(encoded.as_bytes()).map_err(|e| {
            CipherStackError::KeystoreError(format!("keyring entry is not a key: {e}"))
        })?);
        if key.len() != KEY_LEN {
            return Err(CipherStackError::KeystoreError(format!(
                "keyring key is {} bytes, expected {KEY_LEN}",
                key.len()
            )));
        }
        Ok(Some(key))
    }

    fn require_key(&self) -> Result<Zeroizing<Vec<u8>>> {
        self.load_key()?
            .ok_or_else(|| CipherStackError::KeystoreError("no wrapping key in keyring".into()))
    }

    /// Delete the wrapping key. Every entry of the vault becomes
    /// unrecoverable.
    pub fn delete_key(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // Already gone, that's fine.
            Err(e) => Err(CipherStackError::KeystoreError(format!(
                "failed to delete from keyring: {e}"
            ))),
        }
    }
}

impl HardwareKeystore for OsKeyringKeystore {
    fn has_key(&self) -> Result<bool> {
        Ok(self.load_key()?.is_some())
    }

    fn generate_non_exportable_key(&self) -> Result<()> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        rand::rng().fill_bytes(key.as_mut_slice());
        let encoded = Zeroizing::new(BASE64.encode(key.as_slice()));

        self.entry()?.set_password(&encoded).map_err(|e| {
            CipherStackError::KeystoreError(format!("failed to store key in keyring: {e}"))
        })?;

        tracing::debug!(account = %self.account, "stored new wrapping key in OS keyring");
        Ok(())
    }

    fn wrap(&self, plaintext: &[u8]) -> Result<WrappedBlob> {
        let key = self.require_key()?;
        wrap_with(&key, plaintext)
    }

    fn unwrap(&self, iv: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let key = self.require_key()?;
        unwrap_with(&key, iv, ciphertext)
    }
}
