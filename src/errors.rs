use thiserror::Error;

/// User-facing text shared by every decryption failure.
///
/// Header, MAC, layer and checksum failures all render the same message so
/// the output never tells an attacker which check tripped.
const DECRYPTION_FAILED: &str = "Decryption failed: tampered data or wrong password";

/// All errors that can occur in cipherstack.
#[derive(Debug, Error)]
pub enum CipherStackError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Unsupported algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("Cipher chain must contain at least one algorithm")]
    EmptyChain,

    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    // --- Container / decryption errors ---
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    #[error("{}", DECRYPTION_FAILED)]
    IntegrityFailure,

    #[error("{}", DECRYPTION_FAILED)]
    HeaderDecryptFailure,

    #[error("{}", DECRYPTION_FAILED)]
    CipherFailure { layer: usize },

    #[error("{}", DECRYPTION_FAILED)]
    ChecksumMismatch,

    // --- Vault errors ---
    #[error("Invalid alias: {0}")]
    InvalidAlias(String),

    #[error("Vault entry '{0}' not found")]
    AliasNotFound(String),

    #[error("Vault entry '{0}' already exists")]
    AliasAlreadyExists(String),

    #[error("Hardware keystore error: {0}")]
    KeystoreError(String),

    #[error("Vault seed is unavailable: the hardware key is gone and stored entries cannot be recovered")]
    VaultSeedUnavailable,

    #[error("Preference store error: {0}")]
    StoreError(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Audit error: {0}")]
    AuditError(String),
}

impl CipherStackError {
    /// Returns `true` for the failures a wrong password or a tampered token
    /// can produce after the container was successfully decoded.
    pub fn is_decryption_failure(&self) -> bool {
        matches!(
            self,
            Self::IntegrityFailure
                | Self::HeaderDecryptFailure
                | Self::CipherFailure { .. }
                | Self::ChecksumMismatch
        )
    }
}

/// Convenience type alias for cipherstack results.
pub type Result<T> = std::result::Result<T, CipherStackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decryption_failures_share_one_message() {
        let kinds = [
            CipherStackError::IntegrityFailure,
            CipherStackError::HeaderDecryptFailure,
            CipherStackError::CipherFailure { layer: 3 },
            CipherStackError::ChecksumMismatch,
        ];
        for kind in &kinds {
            assert!(kind.is_decryption_failure());
            assert_eq!(kind.to_string(), DECRYPTION_FAILED);
        }
    }

    #[test]
    fn malformed_container_is_not_a_decryption_failure() {
        let err = CipherStackError::MalformedContainer("truncated".into());
        assert!(!err.is_decryption_failure());
        assert!(err.to_string().contains("truncated"));
    }
}
