//! AES-256-GCM authenticated encryption with a caller-supplied nonce.
//!
//! Used for the AEAD chain layer, for the encrypted container header,
//! and by the software keystore to wrap the vault seed. The caller owns
//! nonce generation so every nonce is recorded where it is needed
//! (header IV list, container prefix, wrapped-seed record).

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};

use crate::errors::{CipherStackError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Encrypt `plaintext` with a 32-byte `key` under `nonce`.
///
/// Returns `ciphertext || tag`.
pub fn encrypt(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_LEN {
        return Err(CipherStackError::EncryptionFailed(format!(
            "AES-GCM nonce must be {NONCE_LEN} bytes, got {}",
            nonce.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CipherStackError::EncryptionFailed(format!("invalid key length: {e}")))?;

    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| CipherStackError::EncryptionFailed(format!("encryption error: {e}")))
}

/// Decrypt `ciphertext || tag` produced by `encrypt`.
///
/// Any failure (bad nonce length, bad key length, tag mismatch) comes back
/// as `None`; callers decide which error kind it maps to.
pub fn decrypt(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Option<Vec<u8>> {
    if nonce.len() != NONCE_LEN || ciphertext.len() < TAG_LEN {
        return None;
    }

    let cipher = Aes256Gcm::new_from_slice(key).ok()?;
    cipher.decrypt(Nonce::from_slice(nonce), ciphertext).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0xAB; 32];
    const NONCE: [u8; NONCE_LEN] = [0x01; NONCE_LEN];

    #[test]
    fn roundtrip() {
        let ct = encrypt(&KEY, &NONCE, b"Meeting at 9 PM").unwrap();
        assert_eq!(ct.len(), 15 + TAG_LEN);
        assert_eq!(decrypt(&KEY, &NONCE, &ct).unwrap(), b"Meeting at 9 PM");
    }

    #[test]
    fn wrong_key_fails() {
        let ct = encrypt(&KEY, &NONCE, b"x").unwrap();
        assert!(decrypt(&[0xCD; 32], &NONCE, &ct).is_none());
    }

    #[test]
    fn wrong_nonce_fails() {
        let ct = encrypt(&KEY, &NONCE, b"x").unwrap();
        assert!(decrypt(&KEY, &[0x02; NONCE_LEN], &ct).is_none());
    }

    #[test]
    fn rejects_bad_nonce_length() {
        assert!(encrypt(&KEY, &[0u8; 16], b"x").is_err());
        assert!(decrypt(&KEY, &[0u8; 16], &[0u8; 32]).is_none());
    }

    #[test]
    fn truncated_ciphertext_fails() {
        assert!(decrypt(&KEY, &NONCE, &[0u8; 5]).is_none());
    }
}
