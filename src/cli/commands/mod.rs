//! One module per subcommand; each exposes `execute`.

pub mod algorithms;
#[cfg(feature = "audit-log")]
pub mod audit_cmd;
pub mod completions;
pub mod decrypt;
pub mod derive_key;
pub mod encrypt;
pub mod strength;
pub mod vault;
