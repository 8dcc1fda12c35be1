//! Atomic symlink publication.
//!
//! A link is replaced by creating the new symlink under a temporary sibling
//! name and renaming it over the destination. `rename` replaces the directory
//! entry in one step, so a reader sees either the old link or the new one and
//! never a missing path.
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::PublishError;
use super::helpers::fs::{ensure_parent_dir, is_real_dir, remove_if_exists};
use super::{Applicable, Resource, ResourceChange, ResourceState};

/// Suffix of the temporary sibling a new link is staged under.
pub const STAGING_SUFFIX: &str = ".stash-tmp";

/// A symlink at `link` that should point to `source`.
#[derive(Debug, Clone)]
pub struct AtomicSymlink {
    /// What the symlink points to.
    pub source: PathBuf,
    /// Where the symlink lives.
    pub link: PathBuf,
}

/// A new link created under its staging name, not yet visible at the
/// destination.
#[derive(Debug)]
#[must_use = "a staged link is only published by commit()"]
pub struct StagedLink {
    staged: PathBuf,
    link: PathBuf,
}

impl AtomicSymlink {
    /// Create a new symlink resource.
    #[must_use]
    pub const fn new(source: PathBuf, link: PathBuf) -> Self {
        Self { source, link }
    }

    /// Sibling path the new link is created under before the rename.
    #[must_use]
    pub fn staging_path(&self) -> PathBuf {
        let mut name = self
            .link
            .file_name()
            .map_or_else(|| OsString::from("link"), OsString::from);
        name.push(STAGING_SUFFIX);
        self.link.with_file_name(name)
    }

    /// Create the new link under its staging name.
    ///
    /// The destination is not touched. A stale staging entry left by an
    /// interrupted run is removed first.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::DirectoryConflict`] if a real directory sits at
    /// the destination, or an I/O error if a filesystem step fails.
    pub fn stage(&self) -> Result<StagedLink, PublishError> {
        if is_real_dir(&self.link) {
            return Err(PublishError::DirectoryConflict {
                path: self.link.clone(),
            });
        }
        ensure_parent_dir(&self.link)?;

        let staged = self.staging_path();
        remove_if_exists(&staged)?;
        create_symlink(&self.source, &staged)?;

        Ok(StagedLink {
            staged,
            link: self.link.clone(),
        })
    }
}

impl StagedLink {
    /// Path the link is currently staged under.
    #[must_use]
    pub fn staged_path(&self) -> &Path {
        &self.staged
    }

    /// Rename the staged link over the destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename fails; the staged link is removed in
    /// that case and the destination is left as it was.
    pub fn commit(self) -> Result<(), PublishError> {
        if let Err(e) = std::fs::rename(&self.staged, &self.link) {
            let _ = std::fs::remove_file(&self.staged);
            return Err(PublishError::io("rename", &self.link)(e));
        }
        Ok(())
    }
}

impl Applicable for AtomicSymlink {
    fn description(&self) -> String {
        format!("{} -> {}", self.link.display(), self.source.display())
    }

    fn apply(&self) -> Result<ResourceChange, PublishError> {
        if self.current_state()? == ResourceState::Correct {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        self.stage()?.commit()?;
        debug!(link = %self.link.display(), source = %self.source.display(), "published");
        Ok(ResourceChange::Applied)
    }
}

impl Resource for AtomicSymlink {
    fn current_state(&self) -> Result<ResourceState, PublishError> {
        if is_real_dir(&self.link) {
            return Ok(ResourceState::Invalid {
                reason: "link path is a real directory".to_string(),
            });
        }

        match std::fs::read_link(&self.link) {
            Ok(existing) if existing == self.source => Ok(ResourceState::Correct),
            Ok(existing) => Ok(ResourceState::Incorrect {
                current: format!("points to {}", existing.display()),
            }),
            Err(_) if self.link.symlink_metadata().is_ok() => Ok(ResourceState::Incorrect {
                current: "link path is a regular file".to_string(),
            }),
            Err(_) => Ok(ResourceState::Missing),
        }
    }
}

/// Create a symlink at `link` pointing to `target`.
fn create_symlink(target: &Path, link: &Path) -> Result<(), PublishError> {
    #[cfg(unix)]
    let result = std::os::unix::fs::symlink(target, link);

    #[cfg(windows)]
    let result = if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    };

    result.map_err(PublishError::io("symlink", link))
}
