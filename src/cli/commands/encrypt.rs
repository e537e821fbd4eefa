//! `cipherstack encrypt`: turn text into a token.
//!
//! Usage:
//!   cipherstack encrypt "Meeting at 9 PM"
//!   echo "Meeting at 9 PM" | cipherstack encrypt -a AES_GCM,TWOFISH_CBC
//!   cipherstack encrypt --compress < notes.txt

use crate::cli::{load_settings, output, progress_sink, prompt_new_password, read_input, Cli};
use crate::crypto::{Algorithm, CryptoEngine};
use crate::errors::Result;

/// Execute the `encrypt` command.
pub fn execute(
    cli: &Cli,
    text: Option<&str>,
    algorithms: Option<&str>,
    compress: bool,
) -> Result<()> {
    let settings = load_settings()?;
    let chain = match algorithms {
        Some(list) => Algorithm::parse_list(list)?,
        None => settings.algorithms()?,
    };
    let compress = compress || settings.compress;

    let plaintext = read_input(text, "Text to encrypt", false)?;
    let password = prompt_new_password()?;

    let engine = CryptoEngine::default();
    let mut progress = progress_sink(cli);
    let token = engine.encrypt(
        plaintext.as_bytes(),
        &password,
        &chain,
        compress,
        progress.as_mut(),
    )?;

    println!("{token}");

    let names: Vec<&str> = chain.iter().map(|a| a.id()).collect();
    output::success(&format!(
        "Encrypted with {} layer(s): {}{}",
        chain.len(),
        names.join(" -> "),
        if compress { " (compressed)" } else { "" }
    ));

    Ok(())
}
