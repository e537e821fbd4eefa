//! Vault mutations as values, for anything that wants to record them.

/// One successful change to the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
    Saved {
        alias: String,
        strength_label: String,
        /// An entry already existed under `alias`.
        replaced: bool,
    },
    Renamed {
        from: String,
        to: String,
    },
    Deleted {
        alias: String,
    },
}

impl VaultEvent {
    /// Short verb used in logs and the audit table.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Saved { .. } => "save",
            Self::Renamed { .. } => "rename",
            Self::Deleted { .. } => "delete",
        }
    }

    /// The alias the entry has after the event.
    pub fn alias(&self) -> &str {
        match self {
            Self::Saved { alias, .. } | Self::Deleted { alias } => alias,
            Self::Renamed { to, .. } => to,
        }
    }
}
