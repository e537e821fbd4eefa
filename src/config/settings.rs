use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::Algorithm;
use crate::errors::{CipherStackError, Result};

/// Project-level configuration, loaded from `.cipherstack.toml`.
///
/// Every field has a sensible default so cipherstack works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Chain used by `encrypt` when `--algorithms` is not given.
    #[serde(default = "default_algorithms")]
    pub default_algorithms: Vec<String>,

    /// Whether `encrypt` deflates by default.
    #[serde(default)]
    pub compress: bool,

    /// Directory (relative to the working directory) holding the vault
    /// store and audit log.
    #[serde(default = "default_vault_dir")]
    pub vault_dir: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_algorithms() -> Vec<String> {
    vec![Algorithm::AesGcm.id().to_string()]
}

fn default_vault_dir() -> String {
    ".cipherstack".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_algorithms: default_algorithms(),
            compress: false,
            vault_dir: default_vault_dir(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = ".cipherstack.toml";

    /// Load settings from `<project_dir>/.cipherstack.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed or names an unknown
    /// algorithm, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            CipherStackError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        settings.algorithms().map_err(|e| {
            CipherStackError::ConfigError(format!("{}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// The default chain as parsed algorithms.
    pub fn algorithms(&self) -> Result<Vec<Algorithm>> {
        Algorithm::parse_list(&self.default_algorithms.join(","))
    }

    /// Full path of the vault directory.
    ///
    /// Example: `project_dir/.cipherstack`
    pub fn vault_dir_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.vault_dir)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
