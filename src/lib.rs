#[cfg(feature = "audit-log")]
pub mod audit;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod vault;

#[cfg(feature = "keyring-store")]
pub mod keyring;
