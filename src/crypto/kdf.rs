//! Password-based key derivation using SHA-512 + Argon2id.
//!
//! The password is first condensed with SHA-512 so arbitrarily long input
//! costs the same, then stretched through Argon2id into the 32-byte root
//! secret every other key is expanded from (see `keys`).

use argon2::{Algorithm, Argon2, Params, Version};
use rand::{CryptoRng, RngCore};
use sha2::digest::generic_array::GenericArray;
use sha2::{Digest, Sha512};
use zeroize::Zeroizing;

use super::keys::{RootSecret, KEY_LEN};
use crate::errors::{CipherStackError, Result};

/// Length of the per-token salt in bytes.
pub const SALT_LEN: usize = 16;

/// Minimum safe memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Argon2id cost parameters.
///
/// Tokens do not record these, so a token only decrypts under the
/// parameters it was produced with. The CLI always uses the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 4).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 4,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// Reject parameter sets too weak to be worth running.
    pub fn validate(&self) -> Result<()> {
        if self.memory_kib < MIN_MEMORY_KIB {
            return Err(CipherStackError::KeyDerivationFailed(format!(
                "Argon2 memory_kib must be at least {MIN_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if self.iterations < 1 {
            return Err(CipherStackError::KeyDerivationFailed(
                "Argon2 iterations must be at least 1".into(),
            ));
        }
        if self.parallelism < 1 {
            return Err(CipherStackError::KeyDerivationFailed(
                "Argon2 parallelism must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Derive the 32-byte root secret from a password and salt.
///
/// The same password + salt + params always produce the same secret.
/// The SHA-512 pre-hash lives in a zeroizing buffer and is wiped before
/// this function returns, whichever way it returns.
pub fn derive_root_secret(
    password: &[u8],
    salt: &[u8],
    argon2_params: &Argon2Params,
) -> Result<RootSecret> {
    argon2_params.validate()?;

    let params = Params::new(
        argon2_params.memory_kib,
        argon2_params.iterations,
        argon2_params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| CipherStackError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut prehash = Zeroizing::new([0u8; 64]);
    let mut hasher = Sha512::new();
    hasher.update(password);
    hasher.finalize_into(GenericArray::from_mut_slice(prehash.as_mut_slice()));

    let mut root = RootSecret::zeroed();
    argon2
        .hash_password_into(prehash.as_slice(), salt, root.as_mut_bytes())
        .map_err(|e| {
            CipherStackError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}"))
        })?;

    Ok(root)
}

/// Draw a fresh random salt.
pub fn generate_salt<R>(rng: &mut R) -> [u8; SALT_LEN]
where
    R: RngCore + CryptoRng + ?Sized,
{
    let mut salt = [0u8; SALT_LEN];
    rng.fill_bytes(&mut salt);
    salt
}
