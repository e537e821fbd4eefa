//! `cipherstack decrypt`: turn a token back into text.

use crate::cli::{copy_to_clipboard, output, progress_sink, prompt_password, read_input, Cli};
use crate::crypto::CryptoEngine;
use crate::errors::Result;

/// Execute the `decrypt` command.
pub fn execute(cli: &Cli, token: Option<&str>, copy: bool) -> Result<()> {
    let token = read_input(token, "Token to decrypt", false)?;
    let password = prompt_password()?;

    let engine = CryptoEngine::default();
    let mut progress = progress_sink(cli);
    let plaintext = engine.decrypt_text(&token, &password, progress.as_mut())?;

    if copy {
        copy_to_clipboard(&plaintext)?;
        output::success("Plaintext copied to clipboard.");
    } else {
        println!("{}", plaintext.as_str());
    }

    Ok(())
}
