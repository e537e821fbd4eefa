//! VaultEntry and VaultEntryMetadata types stored by the hardware vault.
//!
//! Each entry holds its alias, the encrypted secret token, when it was last
//! saved, and a strength estimate of the secret taken at save time so
//! listings never need to decrypt anything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single encrypted secret stored in the vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultEntry {
    /// The unique name of the entry (e.g. "bank").
    pub alias: String,

    /// When this entry was last saved.
    pub timestamp: DateTime<Utc>,

    /// Cached strength score (0-4) of the secret.
    pub strength_score: u8,

    /// Cached strength label, e.g. "Strong".
    pub strength_label: String,

    /// The secret as a `CryptoEngine` token.
    pub blob: String,
}

impl VaultEntry {
    /// Metadata view, without the encrypted blob.
    pub fn metadata(&self) -> VaultEntryMetadata {
        VaultEntryMetadata {
            alias: self.alias.clone(),
            timestamp: self.timestamp,
            strength_score: self.strength_score,
            strength_label: self.strength_label.clone(),
        }
    }
}

/// Lightweight metadata about an entry (no encrypted blob).
///
/// Returned by `HardwareVault::list` so callers can display aliases and
/// timestamps without touching any ciphertext.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VaultEntryMetadata {
    pub alias: String,
    pub timestamp: DateTime<Utc>,
    pub strength_score: u8,
    pub strength_label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_roundtrip_keeps_every_field() {
        let entry = VaultEntry {
            alias: "bank".into(),
            timestamp: Utc::now(),
            strength_score: 3,
            strength_label: "Strong".into(),
            blob: "AAAA".into(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"alias\":\"bank\""));
        let back: VaultEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);

        let meta = entry.metadata();
        assert_eq!(meta.alias, "bank");
        assert_eq!(meta.strength_score, 3);
    }
}
