//! `cipherstack algorithms`: list the supported chain algorithms.

use crate::cli::output;
use crate::crypto::Algorithm;
use crate::errors::Result;

/// Execute the `algorithms` command.
pub fn execute() -> Result<()> {
    output::print_algorithms_table();
    output::tip(&format!(
        "Chain them with -a, e.g. `cipherstack encrypt -a {}`",
        Algorithm::VAULT_CHAIN.map(Algorithm::id).join(",")
    ));
    Ok(())
}
