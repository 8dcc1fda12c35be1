// Shared helpers for integration tests.
//
// Provides a temporary home, dotfiles root, render root and database so each
// integration test runs whole command flows against an isolated layout.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use stash::cli::DeployOpts;
use stash::commands::deploy::{DeploySummary, deploy_modules};
use stash::config::{Settings, StashConfig};
use stash::logging::Logger;
use stash::store::Database;

/// An isolated stash environment backed by a [`tempfile::TempDir`].
///
/// Layout below the temporary directory:
/// - `home/`      home directory used for `~` expansion and module targets
/// - `dotfiles/`  module sources and `stash.toml`
/// - `rendered/`  render root
/// - `state/stash.sqlite`
pub struct IntegrationTestContext {
    /// Temporary directory holding everything.
    pub root: tempfile::TempDir,
    /// Resolved settings pointing into `root`.
    pub settings: Settings,
}

impl IntegrationTestContext {
    /// Create a new context with empty home and dotfiles directories.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        // Canonical so that paths compare equal to the ones the library
        // resolves through symlinked temp dirs.
        let base = dunce::canonicalize(root.path()).expect("canonicalize temp dir");
        let settings = Settings {
            config_path: base.join("dotfiles/stash.toml"),
            dotfiles_root: base.join("dotfiles"),
            db_path: base.join("state/stash.sqlite"),
            render_root: base.join("rendered"),
            home: base.join("home"),
        };
        std::fs::create_dir_all(&settings.dotfiles_root).expect("create dotfiles dir");
        std::fs::create_dir_all(&settings.home).expect("create home dir");
        Self { root, settings }
    }

    /// Home directory.
    pub fn home(&self) -> &Path {
        &self.settings.home
    }

    /// Write `stash.toml`.
    pub fn write_config(&self, content: &str) {
        std::fs::write(&self.settings.config_path, content).expect("write stash.toml");
    }

    /// Load `stash.toml`.
    pub fn config(&self) -> StashConfig {
        StashConfig::load(&self.settings.config_path).expect("load stash.toml")
    }

    /// Write a template at `<dotfiles>/<module>/<relative>`.
    pub fn write_template(&self, module: &str, relative: &str, content: &str) -> PathBuf {
        let path = self.settings.dotfiles_root.join(module).join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create template parent");
        }
        std::fs::write(&path, content).expect("write template");
        path
    }

    /// Write a plain file below the home directory.
    pub fn write_home_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.settings.home.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create home file parent");
        }
        std::fs::write(&path, content).expect("write home file");
        path
    }

    /// Open (creating if needed) the database.
    pub fn db(&self) -> Database {
        Database::open(&self.settings.db_path).expect("open database")
    }

    /// Run a deploy with the current `stash.toml`.
    pub fn deploy(&self, opts: &DeployOpts) -> DeploySummary {
        let mut db = self.db();
        deploy_modules(&mut db, &self.settings, &self.config(), opts, &logger())
            .expect("deploy")
    }

    /// Run a plain best-effort deploy.
    pub fn deploy_default(&self) -> DeploySummary {
        self.deploy(&DeployOpts::default())
    }
}

/// A logger that does not point at any log file.
pub fn logger() -> Logger {
    Logger::with_log_file(None)
}

/// Read a file through any symlinks.
pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}
