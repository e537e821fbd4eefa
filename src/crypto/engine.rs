//! `CryptoEngine`: password in, token out, and back.
//!
//! Encrypt:
//! 1. Draw a salt and derive the root secret (SHA-512 + Argon2id).
//! 2. Append the SHA-256 checksum to the plaintext, optionally deflate.
//! 3. Run the cipher chain, one sub-key and fresh IV per layer.
//! 4. Seal the chain header under the `HEADER` sub-key.
//! 5. Pack, MAC with the `GLOBAL_MAC` sub-key, base64.
//!
//! Decrypt checks the MAC before the header length is even read, then
//! walks the same steps backwards.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use super::algorithms::Algorithm;
use super::chain;
use super::compression;
use super::container::{self, ChainHeader, ContainerParts, HEADER_IV_LEN};
use super::integrity;
use super::kdf::{self, Argon2Params};
use super::keys::RootSecret;
use super::progress::ProgressSink;
use crate::errors::{CipherStackError, Result};

/// Entry point for password-based encryption.
///
/// Stateless apart from its Argon2 parameters; safe to share across
/// threads.
#[derive(Debug, Clone, Default)]
pub struct CryptoEngine {
    params: Argon2Params,
}

impl CryptoEngine {
    /// Build an engine with explicit Argon2 parameters.
    pub fn new(params: Argon2Params) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &Argon2Params {
        &self.params
    }

    /// Encrypt `plaintext` under `password` through `algorithms`.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        password: &str,
        algorithms: &[Algorithm],
        compress: bool,
        progress: &mut dyn ProgressSink,
    ) -> Result<String> {
        self.encrypt_with_rng(
            &mut rand::rng(),
            plaintext,
            password,
            algorithms,
            compress,
            progress,
        )
    }

    /// `encrypt` with an injected random source for salt and IVs.
    pub fn encrypt_with_rng<R>(
        &self,
        rng: &mut R,
        plaintext: &[u8],
        password: &str,
        algorithms: &[Algorithm],
        compress: bool,
        progress: &mut dyn ProgressSink,
    ) -> Result<String>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        if algorithms.is_empty() {
            return Err(CipherStackError::EmptyChain);
        }
        tracing::debug!(
            layers = algorithms.len(),
            compress,
            plaintext_len = plaintext.len(),
            "encrypting"
        );

        progress.step("deriving root secret");
        let salt = kdf::generate_salt(rng);
        let root = kdf::derive_root_secret(password.as_bytes(), &salt, &self.params)?;

        let tagged = integrity::append_checksum(plaintext);
        let payload = if compress {
            progress.step("compressing");
            let packed = compression::compress(&tagged)?;
            tracing::debug!(from = tagged.len(), to = packed.len(), "compressed payload");
            packed
        } else {
            tagged
        };

        let (body, layers) = chain::encrypt_layers(rng, &root, algorithms, &payload, progress)?;

        progress.step("sealing header");
        let header = ChainHeader {
            layers,
            compressed: compress,
        };
        let mut header_iv = [0u8; HEADER_IV_LEN];
        rng.fill_bytes(&mut header_iv);
        let header_key = root.header_key()?;
        let encrypted_header = container::seal_header(&header, header_key.as_slice(), &header_iv)?;

        progress.step("computing MAC");
        let mut packed = container::pack(&ContainerParts {
            salt: &salt,
            header_iv: &header_iv,
            encrypted_header: &encrypted_header,
            body: &body,
        })?;
        let mac_key = root.mac_key()?;
        let tag = integrity::compute_mac(mac_key.as_slice(), &packed)?;
        packed.extend_from_slice(&tag);

        tracing::debug!(container_len = packed.len(), "encrypted");
        Ok(container::encode_token(&packed))
    }

    /// Decrypt a token produced by `encrypt`.
    pub fn decrypt(
        &self,
        token: &str,
        password: &str,
        progress: &mut dyn ProgressSink,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let raw = container::decode_token(token)?;
        let (authenticated, tag) = container::split_mac(&raw)?;
        let salt = container::salt_of(authenticated)?;
        tracing::debug!(container_len = raw.len(), "decrypting");

        progress.step("deriving root secret");
        let root = kdf::derive_root_secret(password.as_bytes(), salt, &self.params)?;

        progress.step("verifying MAC");
        let mac_key = root.mac_key()?;
        integrity::verify_mac(mac_key.as_slice(), authenticated, tag)?;

        let parts = container::unpack(authenticated)?;

        progress.step("opening header");
        let header_key = root.header_key()?;
        let header =
            container::open_header(parts.encrypted_header, header_key.as_slice(), parts.header_iv)?;
        tracing::debug!(
            layers = header.layers.len(),
            compressed = header.compressed,
            "header opened"
        );

        let payload = chain::decrypt_layers(&root, &header.layers, parts.body, progress)?;

        let tagged = if header.compressed {
            progress.step("decompressing");
            compression::decompress(&payload).ok_or(CipherStackError::ChecksumMismatch)?
        } else {
            payload
        };

        progress.step("verifying checksum");
        integrity::strip_checksum(tagged)
    }

    /// `decrypt` for text payloads.
    pub fn decrypt_text(
        &self,
        token: &str,
        password: &str,
        progress: &mut dyn ProgressSink,
    ) -> Result<Zeroizing<String>> {
        let bytes = self.decrypt(token, password, progress)?;
        let text = std::str::from_utf8(&bytes).map_err(|_| {
            CipherStackError::SerializationError("decrypted payload is not UTF-8 text".into())
        })?;
        Ok(Zeroizing::new(text.to_owned()))
    }

    /// Run the password half of the key tree on its own.
    pub fn derive_key(&self, password: &str, salt: &[u8]) -> Result<RootSecret> {
        kdf::derive_root_secret(password.as_bytes(), salt, &self.params)
    }
}
