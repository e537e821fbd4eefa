//! Root secret and purpose-bound sub-keys.
//!
//! From the Argon2id root secret we expand, with HKDF-SHA512:
//! - one key **per chain layer** (`LAYER_1`, `LAYER_2`, ...)
//! - a dedicated key for the **encrypted header** (`HEADER`)
//! - a dedicated key for the **container MAC** (`GLOBAL_MAC`)
//!
//! Distinct `info` strings give independent keys, so leaking one layer's
//! key says nothing about another layer, the header, or the MAC.

use hkdf::Hkdf;
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::errors::{CipherStackError, Result};

/// Length of the root secret and of every derived sub-key (256 bits).
pub const KEY_LEN: usize = 32;

/// HKDF context for the header encryption key.
pub const HEADER_CONTEXT: &str = "HEADER";

/// HKDF context for the container MAC key.
pub const MAC_CONTEXT: &str = "GLOBAL_MAC";

/// A derived 32-byte sub-key, wiped on drop.
pub type SubKey = Zeroizing<[u8; KEY_LEN]>;

/// HKDF context for the chain layer at zero-based `index`.
pub fn layer_context(index: usize) -> String {
    format!("LAYER_{}", index + 1)
}

/// Expand `root` into a sub-key bound to `context`.
pub fn derive_sub_key(root: &[u8], context: &str) -> Result<SubKey> {
    // No HKDF salt: the root already carries full entropy from Argon2id.
    let hk = Hkdf::<Sha512>::new(None, root);

    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(context.as_bytes(), okm.as_mut_slice())
        .map_err(|e| CipherStackError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// The 32-byte root secret of one encrypt/decrypt operation.
///
/// Never persisted; zeroed when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct RootSecret {
    bytes: [u8; KEY_LEN],
}

impl RootSecret {
    /// Wrap raw bytes (e.g. a known test vector).
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub(crate) fn zeroed() -> Self {
        Self {
            bytes: [0u8; KEY_LEN],
        }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8; KEY_LEN] {
        &mut self.bytes
    }

    /// Derive a sub-key for an arbitrary context.
    pub fn derive_sub_key(&self, context: &str) -> Result<SubKey> {
        derive_sub_key(&self.bytes, context)
    }

    /// Key for the chain layer at zero-based `index`.
    pub fn layer_key(&self, index: usize) -> Result<SubKey> {
        self.derive_sub_key(&layer_context(index))
    }

    /// Key for the encrypted header.
    pub fn header_key(&self) -> Result<SubKey> {
        self.derive_sub_key(HEADER_CONTEXT)
    }

    /// Key for the container MAC.
    pub fn mac_key(&self) -> Result<SubKey> {
        self.derive_sub_key(MAC_CONTEXT)
    }
}

impl std::fmt::Debug for RootSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RootSecret(..)")
    }
}
