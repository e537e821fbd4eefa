//! `cipherstack strength`: estimate password strength.

use crate::cli::{output, read_input};
use crate::crypto::estimate_strength;
use crate::errors::Result;

/// Execute the `strength` command.
pub fn execute(password: Option<&str>) -> Result<()> {
    if password.is_some() {
        output::warning("Password provided on command line; it may appear in shell history.");
    }
    let password = read_input(password, "Password to score", true)?;

    output::print_strength(&estimate_strength(&password));
    Ok(())
}
