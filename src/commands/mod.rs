//! Command handlers: resolve settings, open the store, call into the library.
pub mod adopt;
pub mod clean;
pub mod deploy;
pub mod history;
pub mod rollback;
pub mod status;
pub mod version;

use std::io::Write as _;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::{Settings, SettingsOverrides, StashConfig};
use crate::logging::Logger;
use crate::store::Database;

/// Shared state produced by the common command setup sequence.
#[derive(Debug)]
pub struct CommandSetup {
    /// Resolved locations.
    pub settings: Settings,
    /// Open, migrated generation store.
    pub db: Database,
}

impl CommandSetup {
    /// Resolve settings from flags and environment and open the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory is unknown or the database
    /// cannot be opened.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let settings = Settings::from_env(&overrides(global))?;
        Self::with_settings(settings, log)
    }

    /// Open the database named by already resolved `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn with_settings(settings: Settings, log: &Logger) -> Result<Self> {
        log.debug(&format!("dotfiles: {}", settings.dotfiles_root.display()));
        log.debug(&format!("render root: {}", settings.render_root.display()));
        let db = Database::open(&settings.db_path)
            .with_context(|| format!("opening {}", settings.db_path.display()))?;
        log.debug(&format!(
            "database: {} (schema v{})",
            db.path().display(),
            db.schema_version()?
        ));
        Ok(Self { settings, db })
    }

    /// Load `stash.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is missing or invalid.
    pub fn load_config(&self) -> Result<StashConfig> {
        StashConfig::load(&self.settings.config_path)
            .context("loading module configuration")
    }
}

/// Map the global CLI flags onto settings overrides.
#[must_use]
pub fn overrides(global: &GlobalOpts) -> SettingsOverrides {
    SettingsOverrides {
        config: global.config.clone(),
        dotfiles: global.dotfiles.clone(),
        db: global.db.clone(),
        render_root: global.render_root.clone(),
    }
}

/// Write lines of command output to stdout.
///
/// # Errors
///
/// Returns an error if stdout is closed.
pub fn print_lines<I, S>(lines: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = std::io::stdout().lock();
    for line in lines {
        writeln!(out, "{}", line.as_ref()).context("writing to stdout")?;
    }
    Ok(())
}

/// Left-align `rows` under `header` with two spaces between columns.
#[must_use]
pub fn format_table(header: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: Vec<&str>| -> String {
        let mut line = String::new();
        for (i, (cell, width)) in cells.iter().zip(&widths).enumerate() {
            if i + 1 == cells.len() {
                line.push_str(cell);
            } else {
                line.push_str(&format!("{cell:<width$}  "));
            }
        }
        line.trim_end().to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(render(header.to_vec()));
    for row in rows {
        lines.push(render(row.iter().map(String::as_str).collect()));
    }
    lines
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn table_columns_are_aligned() {
        let rows = vec![
            vec!["vim".to_string(), "clean".to_string()],
            vec!["alacritty".to_string(), "dirty".to_string()],
        ];
        let lines = format_table(&["MODULE", "STATE"], &rows);
        insta::assert_snapshot!(lines.join("\n"), @r"
        MODULE     STATE
        vim        clean
        alacritty  dirty
        ");
    }

    #[test]
    fn table_without_rows_is_header_only() {
        assert_eq!(format_table(&["ID"], &[]), vec!["ID"]);
    }

    #[test]
    fn overrides_copy_global_flags() {
        let global = GlobalOpts {
            db: Some("/tmp/db".into()),
            ..GlobalOpts::default()
        };
        let o = overrides(&global);
        assert_eq!(o.db, Some("/tmp/db".into()));
        assert!(o.config.is_none());
    }
}
