//! Hardware keystore capability used to wrap the vault seed.
//!
//! A keystore holds one non-exportable wrapping key. The vault never sees
//! that key, only `wrap`/`unwrap` results.

use std::sync::Mutex;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::container::{base64_decode, base64_encode};
use crate::crypto::encryption::{self, NONCE_LEN};
use crate::crypto::keys::KEY_LEN;
use crate::errors::{CipherStackError, Result};

/// Output of `HardwareKeystore::wrap`. Serialized with base64 fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedBlob {
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub iv: Vec<u8>,
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub ciphertext: Vec<u8>,
}

/// A key store whose wrapping key never leaves it.
pub trait HardwareKeystore: Send + Sync {
    /// Whether the wrapping key exists.
    fn has_key(&self) -> Result<bool>;

    /// Create the wrapping key. Replaces any existing key.
    fn generate_non_exportable_key(&self) -> Result<()>;

    /// Encrypt `plaintext` under the wrapping key.
    fn wrap(&self, plaintext: &[u8]) -> Result<WrappedBlob>;

    /// Decrypt a blob produced by `wrap`.
    fn unwrap(&self, iv: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>>;
}

/// Process-memory keystore with an AES-256-GCM wrapping key.
///
/// For tests and hosts without a secure element; the key dies with the
/// process.
#[derive(Default)]
pub struct SoftwareKeystore {
    key: Mutex<Option<Zeroizing<[u8; KEY_LEN]>>>,
}

impl SoftwareKeystore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the wrapping key, as a device reset would.
    pub fn destroy_key(&self) {
        if let Ok(mut key) = self.key.lock() {
            *key = None;
        }
    }

    fn with_key<T>(&self, f: impl FnOnce(&[u8]) -> Result<T>) -> Result<T> {
        let guard = self
            .key
            .lock()
            .map_err(|_| CipherStackError::KeystoreError("keystore lock poisoned".into()))?;
        let key = guard
            .as_ref()
            .ok_or_else(|| CipherStackError::KeystoreError("no wrapping key".into()))?;
        f(key.as_slice())
    }
}

impl HardwareKeystore for SoftwareKeystore {
    fn has_key(&self) -> Result<bool> {
        let guard = self
            .key
            .lock()
            .map_err(|_| CipherStackError::KeystoreError("keystore lock poisoned".into()))?;
        Ok(guard.is_some())
    }

    fn generate_non_exportable_key(&self) -> Result<()> {
        let mut fresh = Zeroizing::new([0u8; KEY_LEN]);
        rand::rng().fill_bytes(fresh.as_mut_slice());

        let mut guard = self
            .key
            .lock()
            .map_err(|_| CipherStackError::KeystoreError("keystore lock poisoned".into()))?;
        *guard = Some(fresh);
        Ok(())
    }

    fn wrap(&self, plaintext: &[u8]) -> Result<WrappedBlob> {
        self.with_key(|key| wrap_with(key, plaintext))
    }

    fn unwrap(&self, iv: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.with_key(|key| unwrap_with(key, iv, ciphertext))
    }
}

/// AES-256-GCM wrap under `key` with a fresh IV.
pub(crate) fn wrap_with(key: &[u8], plaintext: &[u8]) -> Result<WrappedBlob> {
    let mut iv = vec![0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut iv);
    let ciphertext = encryption::encrypt(key, &iv, plaintext)
        .map_err(|e| CipherStackError::KeystoreError(format!("wrap failed: {e}")))?;
    Ok(WrappedBlob { iv, ciphertext })
}

pub(crate) fn unwrap_with(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if iv.len() != NONCE_LEN {
        return Err(CipherStackError::KeystoreError(format!(
            "wrapped IV must be {NONCE_LEN} bytes"
        )));
    }
    encryption::decrypt(key, iv, ciphertext)
        .map(Zeroizing::new)
        .ok_or_else(|| {
            CipherStackError::KeystoreError("unwrap failed: wrong key or corrupt blob".into())
        })
}
