//! Token layout, the encrypted chain header, and base64 codecs.
//!
//! A token is unpadded standard base64 of:
//!
//! ```text
//! [salt: 16][header IV: 12][header_len: 4 bytes BE][encrypted header][body][HMAC-SHA256: 32]
//! ```
//!
//! - **Salt**: Argon2id salt for this token.
//! - **Header IV**: AES-256-GCM nonce for the encrypted header.
//! - **Header length**: big-endian u32 length of the encrypted header.
//! - **Encrypted header**: `ChainHeader` text under the `HEADER` sub-key.
//! - **Body**: output of the last chain layer.
//! - **HMAC**: container MAC over every preceding byte (see `integrity`).

use base64::alphabet;
use base64::engine::general_purpose::{self, GeneralPurpose, STANDARD as BASE64};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::Deserialize;

use super::algorithms::Algorithm;
use super::encryption::{self, NONCE_LEN};
use super::integrity::MAC_LEN;
use super::kdf::SALT_LEN;
use crate::errors::{CipherStackError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Length of the header nonce.
pub const HEADER_IV_LEN: usize = NONCE_LEN;

/// Size of the big-endian header length field.
const HEADER_LEN_FIELD: usize = 4;

/// Fixed-size prefix: salt + header IV + header length.
pub const PREFIX_LEN: usize = SALT_LEN + HEADER_IV_LEN + HEADER_LEN_FIELD;

/// Smallest byte length a decoded token can have.
pub const MIN_CONTAINER_LEN: usize = PREFIX_LEN + MAC_LEN;

/// Header flag for a compressed payload.
const FLAG_COMPRESSED: &str = "C";

/// Header flag for an uncompressed payload.
const FLAG_PLAIN: &str = "N";

/// Token codec: encodes without padding, decodes with or without it.
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    general_purpose::NO_PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// ---------------------------------------------------------------------------
// ChainHeader
// ---------------------------------------------------------------------------

/// One chain layer as recorded in the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSpec {
    pub algorithm: Algorithm,
    pub iv: Vec<u8>,
}

/// Everything needed to undo the chain: algorithms and IVs in encryption
/// order, plus the compression flag.
///
/// Text form: `ALGO1,ALGO2|IV1_b64,IV2_b64|C` (`C` compressed, `N` not).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainHeader {
    pub layers: Vec<LayerSpec>,
    pub compressed: bool,
}

impl ChainHeader {
    /// Algorithms in encryption order.
    pub fn algorithms(&self) -> Vec<Algorithm> {
        self.layers.iter().map(|l| l.algorithm).collect()
    }

    /// Render the header text.
    pub fn encode(&self) -> String {
        let algos = self
            .layers
            .iter()
            .map(|l| l.algorithm.id())
            .collect::<Vec<_>>()
            .join(",");
        let ivs = self
            .layers
            .iter()
            .map(|l| BASE64.encode(&l.iv))
            .collect::<Vec<_>>()
            .join(",");
        let flag = if self.compressed {
            FLAG_COMPRESSED
        } else {
            FLAG_PLAIN
        };
        format!("{algos}|{ivs}|{flag}")
    }

    /// Parse and validate header text.
    ///
    /// Every algorithm must be known, every IV must have the size its
    /// algorithm needs, and the algorithm and IV lists must line up.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parts = text.split('|');
        let (Some(algos), Some(ivs), Some(flag), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed("header must have three '|' separated fields"));
        };

        let compressed = match flag {
            FLAG_COMPRESSED => true,
            FLAG_PLAIN => false,
            other => return Err(malformed(&format!("unknown compression flag '{other}'"))),
        };

        let algos: Vec<&str> = algos.split(',').collect();
        let ivs: Vec<&str> = ivs.split(',').collect();
        if algos.len() != ivs.len() {
            return Err(malformed(&format!(
                "{} algorithms but {} IVs",
                algos.len(),
                ivs.len()
            )));
        }

        let mut layers = Vec::with_capacity(algos.len());
        for (index, (id, iv_b64)) in algos.iter().zip(&ivs).enumerate() {
            let algorithm = Algorithm::from_id(id)
                .ok_or_else(|| malformed(&format!("unknown algorithm '{id}'")))?;
            let iv = BASE64
                .decode(iv_b64)
                .map_err(|e| malformed(&format!("layer {} IV: {e}", index + 1)))?;
            if iv.len() != algorithm.iv_size() {
                return Err(malformed(&format!(
                    "layer {} IV is {} bytes, {algorithm} needs {}",
                    index + 1,
                    iv.len(),
                    algorithm.iv_size()
                )));
            }
            layers.push(LayerSpec { algorithm, iv });
        }

        if layers.is_empty() || algos.iter().any(|a| a.is_empty()) {
            return Err(malformed("header lists no algorithms"));
        }

        Ok(Self { layers, compressed })
    }
}

/// Encrypt the header text under the `HEADER` sub-key.
pub fn seal_header(header: &ChainHeader, header_key: &[u8], header_iv: &[u8]) -> Result<Vec<u8>> {
    encryption::encrypt(header_key, header_iv, header.encode().as_bytes())
}

/// Decrypt and parse the header. A tag mismatch is `HeaderDecryptFailure`.
pub fn open_header(sealed: &[u8], header_key: &[u8], header_iv: &[u8]) -> Result<ChainHeader> {
    let bytes = encryption::decrypt(header_key, header_iv, sealed)
        .ok_or(CipherStackError::HeaderDecryptFailure)?;
    let text = std::str::from_utf8(&bytes).map_err(|_| malformed("header is not UTF-8"))?;
    ChainHeader::parse(text)
}

// ---------------------------------------------------------------------------
// Binary layout
// ---------------------------------------------------------------------------

/// The MAC-covered sections of a decoded container.
#[derive(Debug, Clone, Copy)]
pub struct ContainerParts<'a> {
    pub salt: &'a [u8],
    pub header_iv: &'a [u8],
    pub encrypted_header: &'a [u8],
    pub body: &'a [u8],
}

/// Lay out everything the MAC covers. The caller appends the MAC.
pub fn pack(parts: &ContainerParts<'_>) -> Result<Vec<u8>> {
    if parts.salt.len() != SALT_LEN || parts.header_iv.len() != HEADER_IV_LEN {
        return Err(CipherStackError::EncryptionFailed(
            "salt or header IV has the wrong length".into(),
        ));
    }
    let header_len = u32::try_from(parts.encrypted_header.len()).map_err(|_| {
        CipherStackError::EncryptionFailed(format!(
            "header length {} exceeds u32::MAX",
            parts.encrypted_header.len()
        ))
    })?;

    let total = PREFIX_LEN + parts.encrypted_header.len() + parts.body.len() + MAC_LEN;
    let mut buf = Vec::with_capacity(total);
    buf.extend_from_slice(parts.salt);
    buf.extend_from_slice(parts.header_iv);
    buf.extend_from_slice(&header_len.to_be_bytes());
    buf.extend_from_slice(parts.encrypted_header);
    buf.extend_from_slice(parts.body);
    Ok(buf)
}

/// Split a decoded token into the MAC-covered bytes and the MAC.
pub fn split_mac(raw: &[u8]) -> Result<(&[u8], &[u8])> {
    if raw.len() < MIN_CONTAINER_LEN {
        return Err(malformed(&format!(
            "token is {} bytes, at least {MIN_CONTAINER_LEN} required",
            raw.len()
        )));
    }
    Ok(raw.split_at(raw.len() - MAC_LEN))
}

/// Salt of a decoded token, readable before the MAC is checked since the
/// MAC key is derived from it.
pub fn salt_of(raw: &[u8]) -> Result<&[u8]> {
    raw.get(..SALT_LEN)
        .ok_or_else(|| malformed("token too short for a salt"))
}

/// Slice the MAC-covered bytes into their sections.
///
/// Only call this after the MAC verified: the header length is untrusted
/// until then.
pub fn unpack(authenticated: &[u8]) -> Result<ContainerParts<'_>> {
    if authenticated.len() < PREFIX_LEN {
        return Err(malformed("container shorter than its fixed prefix"));
    }
    let (salt, rest) = authenticated.split_at(SALT_LEN);
    let (header_iv, rest) = rest.split_at(HEADER_IV_LEN);
    let (len_field, rest) = rest.split_at(HEADER_LEN_FIELD);

    let header_len_u32 = u32::from_be_bytes(
        len_field
            .try_into()
            .map_err(|_| malformed("bad header length"))?,
    );
    let header_len = usize::try_from(header_len_u32).map_err(|_| {
        malformed(&format!(
            "header length {header_len_u32} exceeds platform address space"
        ))
    })?;
    if header_len > rest.len() {
        return Err(malformed("header length exceeds container size"));
    }
    let (encrypted_header, body) = rest.split_at(header_len);

    Ok(ContainerParts {
        salt,
        header_iv,
        encrypted_header,
        body,
    })
}

// ---------------------------------------------------------------------------
// Base64
// ---------------------------------------------------------------------------

/// Encode container bytes as a token.
pub fn encode_token(raw: &[u8]) -> String {
    TOKEN_ENGINE.encode(raw)
}

/// Decode a token, ignoring surrounding whitespace and optional padding.
pub fn decode_token(token: &str) -> Result<Vec<u8>> {
    TOKEN_ENGINE
        .decode(token.trim())
        .map_err(|e| malformed(&format!("invalid base64: {e}")))
}

fn malformed(reason: &str) -> CipherStackError {
    CipherStackError::MalformedContainer(reason.to_string())
}

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> ChainHeader {
        ChainHeader {
            layers: vec![
                LayerSpec {
                    algorithm: Algorithm::AesGcm,
                    iv: vec![1u8; 12],
                },
                LayerSpec {
                    algorithm: Algorithm::TwofishCbc,
                    iv: vec![2u8; 16],
                },
            ],
            compressed: true,
        }
    }

    #[test]
    fn header_text_shape() {
        let text = header().encode();
        let fields: Vec<&str> = text.split('|').collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0], "AES_GCM,TWOFISH_CBC");
        assert_eq!(fields[2], "C");
        assert_eq!(ChainHeader::parse(&text).unwrap(), header());
    }

    #[test]
    fn header_rejects_inconsistent_text() {
        let iv12 = BASE64.encode([0u8; 12]);
        let iv16 = BASE64.encode([0u8; 16]);
        let bad = [
            format!("AES_GCM|{iv12}"),
            format!("AES_GCM|{iv12}|X"),
            format!("AES_GCM|{iv12}|N|extra"),
            format!("AES_GCM,AES_CBC|{iv12}|N"),
            format!("NOPE_CBC|{iv16}|N"),
            format!("AES_GCM|{iv16}|N"),
            "AES_GCM|***|N".to_string(),
            "|AAAA|N".to_string(),
        ];
        for text in &bad {
            assert!(
                matches!(
                    ChainHeader::parse(text),
                    Err(CipherStackError::MalformedContainer(_))
                ),
                "accepted {text}"
            );
        }
    }

    #[test]
    fn sealed_header_needs_the_right_key() {
        let key = [9u8; 32];
        let iv = [3u8; 12];
        let sealed = seal_header(&header(), &key, &iv).unwrap();
        assert_eq!(open_header(&sealed, &key, &iv).unwrap(), header());
        assert!(matches!(
            open_header(&sealed, &[8u8; 32], &iv),
            Err(CipherStackError::HeaderDecryptFailure)
        ));
    }

    #[test]
    fn pack_then_unpack() {
        let parts = ContainerParts {
            salt: &[1u8; SALT_LEN],
            header_iv: &[2u8; HEADER_IV_LEN],
            encrypted_header: b"sealed-header",
            body: b"body-bytes",
        };
        let packed = pack(&parts).unwrap();
        assert_eq!(packed.len(), PREFIX_LEN + 13 + 10);
        assert_eq!(&packed[28..32], &13u32.to_be_bytes());

        let back = unpack(&packed).unwrap();
        assert_eq!(back.salt, parts.salt);
        assert_eq!(back.header_iv, parts.header_iv);
        assert_eq!(back.encrypted_header, parts.encrypted_header);
        assert_eq!(back.body, parts.body);
    }

    #[test]
    fn unpack_rejects_overlong_header_length() {
        let mut packed = pack(&ContainerParts {
            salt: &[0u8; SALT_LEN],
            header_iv: &[0u8; HEADER_IV_LEN],
            encrypted_header: b"hdr",
            body: b"",
        })
        .unwrap();
        packed[28..32].copy_from_slice(&1000u32.to_be_bytes());
        assert!(unpack(&packed).is_err());
        assert!(unpack(&packed[..10]).is_err());
    }

    #[test]
    fn split_mac_requires_minimum_length() {
        assert!(split_mac(&[0u8; MIN_CONTAINER_LEN - 1]).is_err());
        let raw = [0u8; MIN_CONTAINER_LEN + 5];
        let (covered, mac) = split_mac(&raw).unwrap();
        assert_eq!(covered.len(), PREFIX_LEN + 5);
        assert_eq!(mac.len(), MAC_LEN);
    }

    #[test]
    fn token_codec_is_lenient_on_decode() {
        let raw = [0xFBu8, 0xFF, 0x00, 0x10];
        let token = encode_token(&raw);
        assert!(!token.contains('='));
        assert_eq!(decode_token(&token).unwrap(), raw);
        assert_eq!(decode_token(&format!("  {token}==\n")).unwrap(), raw);
        assert!(matches!(
            decode_token("not base64!"),
            Err(CipherStackError::MalformedContainer(_))
        ));
    }
}
