//! Command: re-publish an earlier generation.
use anyhow::{Context as _, Result};

use crate::cli::{GlobalOpts, RollbackOpts};
use crate::commands::CommandSetup;
use crate::logging::Logger;
use crate::rollback::rollback_to_generation;

/// Run the rollback command.
///
/// # Errors
///
/// Returns an error if the generation or a requested module is unknown, a
/// recorded output is missing, or a link cannot be replaced.
pub fn run(global: &GlobalOpts, opts: &RollbackOpts, log: &Logger) -> Result<()> {
    let mut setup = CommandSetup::init(global, log)?;
    log.stage(&format!("Rolling back to {}", opts.generation));

    let modules = (!opts.modules.is_empty()).then_some(opts.modules.as_slice());
    let restored = setup
        .db
        .unit_of_work(|store| rollback_to_generation(store, opts.generation, modules))
        .with_context(|| format!("rolling back to generation {}", opts.generation))?;

    for (module, output) in &restored {
        log.info(&format!("\x1b[32m✓\x1b[0m {module} → {}", output.display()));
    }
    log.info(&format!("{} module(s) restored", restored.len()));
    Ok(())
}
