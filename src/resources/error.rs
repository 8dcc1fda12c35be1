//! Typed error variants for publish operations.
//!
//! [`PublishError`] is returned by the atomic symlink resource and the
//! filesystem helpers; callers convert it into their own error via `?`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that arise while publishing or removing filesystem entries.
#[derive(Error, Debug)]
pub enum PublishError {
    /// A real directory sits where a link should go. Replacing it would
    /// destroy user data, so the operation is refused.
    #[error("Cannot replace directory at {} with a symlink", path.display())]
    DirectoryConflict {
        /// The directory that blocks publication.
        path: PathBuf,
    },

    /// A filesystem step failed.
    #[error("{op} {}: {source}", path.display())]
    Io {
        /// Short name of the failed step (e.g. `"rename"`).
        op: &'static str,
        /// Path the step operated on.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl PublishError {
    /// Build a closure that wraps an [`std::io::Error`] for `op` on `path`.
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { op, path, source }
    }
}
