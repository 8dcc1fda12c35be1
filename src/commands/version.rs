//! Command: print version information.
use anyhow::Result;

use crate::commands::print_lines;

/// Version string: `STASH_VERSION` at build time, else the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("STASH_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the stash version to stdout.
///
/// # Errors
///
/// Returns an error if stdout is closed.
pub fn run() -> Result<()> {
    print_lines([format!("stash {}", version())])
}
