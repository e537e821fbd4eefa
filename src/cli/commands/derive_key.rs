//! `cipherstack derive-key`: show the Argon2id root secret for a password.
//!
//! Prints the salt and the derived root secret, both base64. Useful for
//! checking that two machines derive the same key.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::Zeroizing;

use crate::cli::{output, prompt_password};
use crate::crypto::{generate_salt, CryptoEngine, SALT_LEN};
use crate::errors::{CipherStackError, Result};

/// Execute the `derive-key` command.
pub fn execute(salt: Option<&str>) -> Result<()> {
    let salt = match salt {
        Some(b64) => parse_salt(b64)?,
        None => generate_salt(&mut rand::rng()).to_vec(),
    };
    let password = prompt_password()?;

    let root = CryptoEngine::default().derive_key(&password, &salt)?;
    let encoded = Zeroizing::new(BASE64.encode(root.as_bytes()));

    output::warning("The root secret decrypts every token made with this salt; keep it private.");
    println!("salt: {}", BASE64.encode(&salt));
    println!("key:  {}", encoded.as_str());

    Ok(())
}

fn parse_salt(b64: &str) -> Result<Vec<u8>> {
    let salt = BASE64
        .decode(b64.trim())
        .map_err(|e| CipherStackError::CommandFailed(format!("salt is not base64: {e}")))?;
    if salt.len() != SALT_LEN {
        return Err(CipherStackError::CommandFailed(format!(
            "salt must be {SALT_LEN} bytes, got {}",
            salt.len()
        )));
    }
    Ok(salt)
}
