//! Project configuration (`.cipherstack.toml`).

pub mod settings;

pub use settings::Settings;
