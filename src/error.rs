//! Domain-specific error types for the generation store and its pipeline.
//!
//! Library modules return the typed errors below; command handlers at the
//! CLI boundary convert them to [`anyhow::Error`] via the standard `?`
//! operator.
//!
//! # Error hierarchy
//!
//! ```text
//! StashError
//! ├── Config(ConfigError)     — stash.toml, settings, home directory
//! ├── Store(StoreError)       — SQLite access, constraints, corrupt rows
//! ├── Render(RenderError)     — render/publish pass of one module
//! ├── Publish(PublishError)   — atomic symlink replacement
//! ├── Rollback(RollbackError) — unknown generation/module, missing output
//! ├── Cleanup(CleanupError)   — retention and orphan pruning
//! └── Adopt(AdoptError)       — adopting existing files into a module
//! ```

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

pub use crate::resources::error::PublishError;

/// Top-level error type for the stash engine.
#[derive(Error, Debug)]
pub enum StashError {
    /// Configuration-related error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Generation store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Render pass error.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Symlink publication error.
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Rollback error.
    #[error("Rollback error: {0}")]
    Rollback(#[from] RollbackError),

    /// Cleanup error.
    #[error("Cleanup error: {0}")]
    Cleanup(#[from] CleanupError),

    /// Adopt error.
    #[error("Adopt error: {0}")]
    Adopt(#[from] AdoptError),
}

/// Errors that arise from loading settings and the module configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration document does not exist.
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The configuration document could not be read or written.
    #[error("IO error on config file {}: {source}", path.display())]
    Io {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration document is not valid TOML for the expected shape.
    #[error("Invalid TOML in {}: {source}", path.display())]
    Parse {
        /// Path to the file.
        path: PathBuf,
        /// Underlying parse error.
        source: toml::de::Error,
    },

    /// The configuration could not be serialized back to TOML.
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Neither `HOME` nor `USERPROFILE` is set.
    #[error("cannot determine home directory: HOME is not set")]
    NoHome,
}

/// Errors that arise from the generation store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Any SQLite failure other than a constraint violation.
    #[error("database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// A uniqueness or foreign-key constraint was violated.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A stored row could not be decoded.
    #[error("corrupt row in {table}.{column}: {detail}")]
    CorruptRow {
        /// Table name.
        table: &'static str,
        /// Column name.
        column: &'static str,
        /// What was wrong with the value.
        detail: String,
    },

    /// Module names are trimmed and must not be empty.
    #[error("module name cannot be empty")]
    EmptyModuleName,

    /// Paths are stored as UTF-8 text.
    #[error("path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    /// The database file or its directory could not be prepared.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// Path being prepared.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::SqliteFailure(ref failure, _)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(e.to_string())
            }
            other => Self::Database(other),
        }
    }
}

/// Errors that abort a module render pass.
///
/// Per-template problems (undecodable file, syntax error, undefined variable)
/// are logged and handled inside the pass; they never appear here.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The module source tree could not be enumerated.
    #[error("cannot walk module source {}: {source}", path.display())]
    Walk {
        /// Module source directory.
        path: PathBuf,
        /// Underlying walk error.
        source: walkdir::Error,
    },

    /// A filesystem operation on the storage or target tree failed.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The parsed templates of a module could not be assembled into one set
    /// (for example an `extends` parent is missing).
    #[error("cannot assemble templates for module '{module}': {source}")]
    TemplateSet {
        /// Module name.
        module: String,
        /// Underlying templating error.
        source: tera::Error,
    },

    /// Store failure while recording the pass.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Symlink publication failure.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Errors that arise during rollback. No link is changed when one of the
/// not-found variants is returned.
#[derive(Error, Debug)]
pub enum RollbackError {
    /// The generation is unknown or owns no module records.
    #[error("No modules found for generation {0}")]
    EmptyGeneration(Uuid),

    /// Requested module names absent from the generation.
    #[error("Missing modules for generation {generation}: {}", names.join(", "))]
    MissingModules {
        /// Generation id.
        generation: Uuid,
        /// Sorted missing names.
        names: Vec<String>,
    },

    /// The recorded rendered output no longer exists on disk.
    #[error("Rendered path missing for {module}: {}", path.display())]
    MissingOutput {
        /// Module name.
        module: String,
        /// Recorded output path.
        path: PathBuf,
    },

    /// The recorded output tree could not be enumerated.
    #[error("cannot walk rendered output {}: {source}", path.display())]
    Walk {
        /// Recorded output path.
        path: PathBuf,
        /// Underlying walk error.
        source: walkdir::Error,
    },

    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Symlink publication failure.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Errors that arise while garbage-collecting generations.
#[derive(Error, Debug)]
pub enum CleanupError {
    /// Retention count must keep at least one generation.
    #[error("keep must be at least 1 (got {0})")]
    InvalidKeep(usize),

    /// The render root could not be listed.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// Directory being listed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A generation directory could not be removed.
    #[error(transparent)]
    Remove(#[from] PublishError),

    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors that arise when adopting existing files into a new module.
#[derive(Error, Debug)]
pub enum AdoptError {
    /// The module name is empty after trimming.
    #[error("Module name cannot be empty")]
    EmptyModuleName,

    /// No paths were given, or they share no usable common parent.
    #[error("Adopted files must share a common parent directory")]
    NoCommonRoot,

    /// A path to adopt does not exist.
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The given paths contain no regular files.
    #[error("No files found to adopt")]
    Empty,

    /// The module source directory already exists.
    #[error("Module directory already exists: {}", .0.display())]
    ModuleExists(PathBuf),

    /// Copying files into the module failed.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Deploying the adopted module failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Store failure while deploying.
    #[error(transparent)]
    Store(#[from] StoreError),
}
