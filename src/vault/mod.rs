//! Vault module: named secrets under a hardware-wrapped seed.
//!
//! This module provides:
//! - `VaultEntry` and `VaultEntryMetadata` types (`entry`)
//! - The `HardwareKeystore` capability and `SoftwareKeystore` (`keystore`)
//! - The `PreferenceStore` string map with memory and file backends (`store`)
//! - `HardwareVault` with save/load/rename/delete/list (`hardware_vault`)
//! - `VaultEvent`, a record of one mutation (`event`)

pub mod entry;
pub mod event;
pub mod hardware_vault;
pub mod keystore;
pub mod store;

// Re-export the most commonly used items.
pub use entry::{VaultEntry, VaultEntryMetadata};
pub use event::VaultEvent;
pub use hardware_vault::{validate_alias, HardwareVault};
pub use keystore::{HardwareKeystore, SoftwareKeystore, WrappedBlob};
pub use store::{FileStore, MemoryStore, PreferenceStore};
