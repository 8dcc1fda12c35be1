//! Command: report drift between deployed files and their recorded hashes.
use anyhow::{Context as _, Result};

use crate::cli::{GlobalOpts, StatusOpts};
use crate::commands::{CommandSetup, format_table, print_lines};
use crate::logging::Logger;
use crate::status::{FileStatus, collect_status};

/// Table lines for `statuses`.
#[must_use]
pub fn status_table(statuses: &[FileStatus]) -> Vec<String> {
    let rows: Vec<Vec<String>> = statuses
        .iter()
        .map(|s| {
            vec![
                s.module_name.clone(),
                if s.dirty { "modified" } else { "clean" }.to_string(),
                s.target_path.display().to_string(),
            ]
        })
        .collect();
    format_table(&["MODULE", "STATE", "PATH"], &rows)
}

/// Run the status command.
///
/// # Errors
///
/// Returns an error if the store cannot be read or output cannot be written.
pub fn run(global: &GlobalOpts, opts: &StatusOpts, log: &Logger) -> Result<()> {
    let mut setup = CommandSetup::init(global, log)?;
    let statuses = setup
        .db
        .unit_of_work(collect_status)
        .context("checking deployed files")?;

    if opts.json {
        let json = serde_json::to_string_pretty(&statuses).context("serializing status")?;
        return print_lines([json]);
    }
    if statuses.is_empty() {
        log.info("Nothing deployed");
        return Ok(());
    }

    print_lines(status_table(&statuses))?;
    let dirty = statuses.iter().filter(|s| s.dirty).count();
    if dirty > 0 {
        log.warn(&format!("{dirty} file(s) changed since deploy"));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn status(module: &str, path: &str, dirty: bool) -> FileStatus {
        FileStatus {
            module_name: module.to_string(),
            generation_id: Uuid::nil(),
            target_path: PathBuf::from(path),
            rendered_path: PathBuf::from("/r"),
            content_hash: String::new(),
            dirty,
        }
    }

    #[test]
    fn table_marks_modified_files() {
        let lines = status_table(&[
            status("vim", "/home/a/.vimrc", false),
            status("git", "/home/a/.config/git/config", true),
        ]);
        insta::assert_snapshot!(lines.join("\n"), @r"
        MODULE  STATE     PATH
        vim     clean     /home/a/.vimrc
        git     modified  /home/a/.config/git/config
        ");
    }
}
