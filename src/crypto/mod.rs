//! Password-based multi-cipher encryption.
//!
//! This module provides:
//! - Argon2id root secret derivation (`kdf`) and HKDF sub-keys (`keys`)
//! - The algorithm table and per-layer ciphers (`algorithms`, `primitives`)
//! - Chaining, compression, container packing and the MAC (`chain`,
//!   `compression`, `container`, `integrity`)
//! - The `CryptoEngine` facade tying them together (`engine`)

pub mod algorithms;
pub mod chain;
pub mod compression;
pub mod container;
pub mod encryption;
pub mod engine;
pub mod integrity;
pub mod kdf;
pub mod keys;
pub mod primitives;
pub mod progress;
pub mod secure_memory;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{CryptoEngine, Algorithm, ...};
pub use algorithms::{Algorithm, LayerCipher, Mode};
pub use container::{ChainHeader, LayerSpec};
pub use engine::CryptoEngine;
pub use kdf::{derive_root_secret, generate_salt, Argon2Params, SALT_LEN};
pub use keys::{RootSecret, SubKey};
pub use progress::{NoProgress, ProgressEntry, ProgressLog, ProgressSink, TracingProgress};
pub use secure_memory::{estimate_strength, PasswordStrength};
