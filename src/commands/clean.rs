//! Command: garbage-collect generations.
use anyhow::{Context as _, Result};

use crate::cleanup::{clean_orphans, cleanup_generations};
use crate::cli::{CleanOpts, GlobalOpts};
use crate::commands::CommandSetup;
use crate::logging::Logger;

/// Run the clean command.
///
/// With `--keep N` the N newest generations survive; without it only
/// superseded and empty generations are removed.
///
/// # Errors
///
/// Returns an error if `--keep` is zero or a deletion fails.
pub fn run(global: &GlobalOpts, opts: &CleanOpts, log: &Logger) -> Result<()> {
    let mut setup = CommandSetup::init(global, log)?;
    let render_root = setup.settings.render_root.clone();

    let deleted = match opts.keep {
        Some(keep) => {
            log.stage(&format!("Keeping the {keep} most recent generations"));
            setup
                .db
                .unit_of_work(|store| cleanup_generations(store, keep, &render_root))
                .context("applying retention")?
        }
        None => {
            log.stage("Removing orphaned generations");
            setup
                .db
                .unit_of_work(|store| clean_orphans(store, &render_root))
                .context("removing orphans")?
        }
    };

    for id in &deleted {
        log.debug(&format!("deleted {id}"));
    }
    log.info(&format!("{} generation(s) deleted", deleted.len()));
    Ok(())
}
