//! Container MAC and in-band plaintext checksum.
//!
//! The MAC is HMAC-SHA256 under the `GLOBAL_MAC` sub-key over everything in
//! the packed container except the MAC itself. The checksum is SHA-256 of
//! the plaintext, appended before compression and the cipher chain and
//! checked again after decryption.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::errors::{CipherStackError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Length of the container MAC in bytes.
pub const MAC_LEN: usize = 32;

/// Length of the plaintext checksum in bytes.
pub const CHECKSUM_LEN: usize = 32;

/// Compute the container MAC over `data`.
pub fn compute_mac(mac_key: &[u8], data: &[u8]) -> Result<[u8; MAC_LEN]> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key)
        .map_err(|e| CipherStackError::EncryptionFailed(format!("HMAC init failed: {e}")))?;
    mac.update(data);

    let mut tag = [0u8; MAC_LEN];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}

/// Verify the container MAC in constant time.
pub fn verify_mac(mac_key: &[u8], data: &[u8], tag: &[u8]) -> Result<()> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key)
        .map_err(|_| CipherStackError::IntegrityFailure)?;
    mac.update(data);
    mac.verify_slice(tag)
        .map_err(|_| CipherStackError::IntegrityFailure)
}

/// `plaintext || SHA-256(plaintext)`.
pub fn append_checksum(plaintext: &[u8]) -> Zeroizing<Vec<u8>> {
    let digest = Sha256::digest(plaintext);
    let mut tagged = Zeroizing::new(Vec::with_capacity(plaintext.len() + CHECKSUM_LEN));
    tagged.extend_from_slice(plaintext);
    tagged.extend_from_slice(&digest);
    tagged
}

/// Split off and check the trailing checksum, returning the plaintext.
pub fn strip_checksum(mut tagged: Zeroizing<Vec<u8>>) -> Result<Zeroizing<Vec<u8>>> {
    if tagged.len() < CHECKSUM_LEN {
        return Err(CipherStackError::ChecksumMismatch);
    }
    let split = tagged.len() - CHECKSUM_LEN;
    let expected = Sha256::digest(&tagged[..split]);

    if !bool::from(expected.as_slice().ct_eq(&tagged[split..])) {
        return Err(CipherStackError::ChecksumMismatch);
    }

    // Drop the checksum bytes in place; the plaintext keeps the buffer.
    tagged.truncate(split);
    Ok(tagged)
}
