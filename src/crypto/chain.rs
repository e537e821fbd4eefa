//! Applying and reversing an ordered chain of layer ciphers.
//!
//! Layer `i` (zero-based) is keyed with the `LAYER_{i+1}` sub-key and a
//! fresh random IV. Decryption replays the recorded layers in reverse, so
//! `[A, B, C]` applied as `C(B(A(x)))` is undone as `A⁻¹(B⁻¹(C⁻¹(y)))`.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use super::algorithms::Algorithm;
use super::container::LayerSpec;
use super::keys::RootSecret;
use super::progress::ProgressSink;
use crate::errors::{CipherStackError, Result};

/// Run `data` through every algorithm in order.
///
/// Returns the final ciphertext and the layer specs (algorithm + IV) the
/// header must record.
pub fn encrypt_layers<R>(
    rng: &mut R,
    root: &RootSecret,
    algorithms: &[Algorithm],
    data: &[u8],
    progress: &mut dyn ProgressSink,
) -> Result<(Vec<u8>, Vec<LayerSpec>)>
where
    R: RngCore + CryptoRng + ?Sized,
{
    if algorithms.is_empty() {
        return Err(CipherStackError::EmptyChain);
    }

    let mut layers = Vec::with_capacity(algorithms.len());
    let mut current = Zeroizing::new(data.to_vec());

    for (index, &algorithm) in algorithms.iter().enumerate() {
        progress.step(&format!("layer {}: encrypting ({algorithm})", index + 1));

        let mut iv = vec![0u8; algorithm.iv_size()];
        rng.fill_bytes(&mut iv);
        let key = root.layer_key(index)?;

        let next = algorithm.cipher().encrypt(&current, key.as_slice(), &iv)?;
        tracing::trace!(
            layer = index + 1,
            %algorithm,
            in_len = current.len(),
            out_len = next.len(),
            "layer encrypted"
        );

        // The previous buffer is wiped as it is replaced.
        current = Zeroizing::new(next);
        layers.push(LayerSpec { algorithm, iv });
    }

    Ok((std::mem::take(&mut *current), layers))
}

/// Undo `encrypt_layers` using the recorded layer specs.
///
/// A tag or padding failure in layer `n` (one-based) is
/// `CipherFailure { layer: n }`.
pub fn decrypt_layers(
    root: &RootSecret,
    layers: &[LayerSpec],
    data: &[u8],
    progress: &mut dyn ProgressSink,
) -> Result<Zeroizing<Vec<u8>>> {
    if layers.is_empty() {
        return Err(CipherStackError::EmptyChain);
    }

    let mut current = Zeroizing::new(data.to_vec());

    for (index, layer) in layers.iter().enumerate().rev() {
        let algorithm = layer.algorithm;
        progress.step(&format!("layer {}: decrypting ({algorithm})", index + 1));

        let key = root.layer_key(index)?;
        let next = algorithm
            .cipher()
            .decrypt(&current, key.as_slice(), &layer.iv)
            .ok_or(CipherStackError::CipherFailure { layer: index + 1 })?;

        current = Zeroizing::new(next);
    }

    Ok(current)
}
