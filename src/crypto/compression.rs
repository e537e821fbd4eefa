//! Optional DEFLATE stage applied before the cipher chain.
//!
//! Both directions size or grow their output so no plaintext-bearing
//! allocation is freed unwiped. The deflate/inflate state inside `flate2`
//! (window and staging buffers) is outside our reach and is not wiped.

use std::io::{ErrorKind, Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use zeroize::Zeroizing;

use super::secure_memory::reserve_wiping;
use crate::errors::{CipherStackError, Result};

/// Upper bound on inflated output, so an authenticated but hostile
/// payload cannot balloon memory.
pub const MAX_INFLATED_LEN: usize = 64 * 1024 * 1024;

const CHUNK: usize = 8 * 1024;

/// Deflate `data` at maximum compression.
pub fn compress(data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    // Stored blocks cost 5 bytes per 64 KiB, so this never reallocates.
    let bound = data.len() + data.len() / 64 + 128;
    let mut out = Zeroizing::new(Vec::with_capacity(bound));

    let mut encoder = DeflateEncoder::new(&mut *out, Compression::best());
    encoder
        .write_all(data)
        .map_err(|e| CipherStackError::CompressionFailed(format!("deflate write: {e}")))?;
    encoder
        .finish()
        .map_err(|e| CipherStackError::CompressionFailed(format!("deflate finish: {e}")))?;
    Ok(out)
}

/// Inflate `data` produced by `compress`.
///
/// Returns `None` for corrupt streams and for output past
/// `MAX_INFLATED_LEN`.
pub fn decompress(data: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
    inflate_capped(data, MAX_INFLATED_LEN)
}

fn inflate_capped(data: &[u8], cap: usize) -> Option<Zeroizing<Vec<u8>>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut chunk = Zeroizing::new([0u8; CHUNK]);
    let mut out = Zeroizing::new(Vec::with_capacity(data.len().saturating_mul(4).min(cap)));

    loop {
        let n = match decoder.read(chunk.as_mut_slice()) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => return None,
        };
        if out.len() + n > cap {
            return None;
        }
        reserve_wiping(&mut out, n);
        out.extend_from_slice(&chunk[..n]);
    }
    Some(out)
}
