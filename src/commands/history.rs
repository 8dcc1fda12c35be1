//! Command: list generations.
use anyhow::{Context as _, Result};

use crate::cli::{GlobalOpts, HistoryOpts};
use crate::commands::{CommandSetup, format_table, print_lines};
use crate::history::{HistoryEntry, collect_history};
use crate::logging::Logger;

/// Table lines for `entries`.
#[must_use]
pub fn history_table(entries: &[HistoryEntry]) -> Vec<String> {
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|entry| {
            vec![
                entry.id.to_string(),
                entry.created_local(),
                entry.modules.join(", "),
                entry.description.clone().unwrap_or_default(),
            ]
        })
        .collect();
    format_table(&["ID", "CREATED", "MODULES", "DESCRIPTION"], &rows)
}

/// Run the history command.
///
/// # Errors
///
/// Returns an error if the store cannot be read or output cannot be written.
pub fn run(global: &GlobalOpts, opts: &HistoryOpts, log: &Logger) -> Result<()> {
    let mut setup = CommandSetup::init(global, log)?;
    let entries = setup
        .db
        .unit_of_work(|store| collect_history(store, opts.module.as_deref()))
        .context("reading history")?;

    if opts.json {
        let json = serde_json::to_string_pretty(&entries).context("serializing history")?;
        return print_lines([json]);
    }
    if entries.is_empty() {
        log.info("No generations recorded");
        return Ok(());
    }
    print_lines(history_table(&entries))
}
