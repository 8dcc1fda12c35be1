//! File-system helpers shared by publication, status and cleanup.
use std::fmt::Write as _;
use std::io;
use std::path::Path;

use sha2::{Digest as _, Sha256};
use walkdir::WalkDir;

use crate::resources::error::PublishError;

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<(), PublishError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(PublishError::io("create parent", parent))?;
    }
    Ok(())
}

/// Remove a file or symlink (broken links included). Absence is not an error.
///
/// # Errors
///
/// Returns an error if the entry exists but cannot be removed.
pub fn remove_if_exists(path: &Path) -> Result<(), PublishError> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
            Err(PublishError::io("remove", path)(e))
        }
        _ => Ok(()),
    }
}

/// True if `path` is a directory itself, not a symlink to one.
#[must_use]
pub fn is_real_dir(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok_and(|m| m.is_dir())
}

/// Lowercase hex SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(64);
    for b in &digest {
        // write! to a String is infallible; unwrap_or(()) makes that explicit.
        write!(hex, "{b:02x}").unwrap_or(());
    }
    hex
}

/// Digest of the file at `path`, following symlinks.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn hash_file(path: &Path) -> io::Result<String> {
    std::fs::read(path).map(|bytes| sha256_hex(&bytes))
}

/// Remove a directory tree bottom-up without following symlinks.
///
/// Links inside the tree are removed, never the entries they point to.
/// A tree that is already gone is not an error.
///
/// # Errors
///
/// Returns the first entry that cannot be removed.
pub fn remove_tree(root: &Path) -> Result<(), PublishError> {
    if std::fs::symlink_metadata(root).is_err() {
        return Ok(());
    }
    for entry in WalkDir::new(root).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.io_error().is_some_and(|io| io.kind() == io::ErrorKind::NotFound) => {
                continue;
            }
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                return Err(PublishError::Io {
                    op: "walk",
                    path,
                    source: e.into(),
                });
            }
        };
        let result = if entry.file_type().is_dir() {
            std::fs::remove_dir(entry.path())
        } else {
            std::fs::remove_file(entry.path())
        };
        match result {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                return Err(PublishError::io("remove", entry.path())(e));
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ensure_parent_dir_creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("file.txt");
        ensure_parent_dir(&nested).unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
    }

    #[test]
    fn sha256_known_values() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hex(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn hash_file_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, b"hello world").unwrap();
        assert_eq!(hash_file(&file).unwrap(), sha256_hex(b"hello world"));
        assert!(hash_file(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn remove_if_exists_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        remove_if_exists(&dir.path().join("nothing")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn remove_tree_does_not_follow_links() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("outside");
        std::fs::create_dir(&outside).unwrap();
        std::fs::write(outside.join("keep.txt"), b"keep").unwrap();

        let tree = dir.path().join("tree");
        std::fs::create_dir_all(tree.join("sub")).unwrap();
        std::fs::write(tree.join("sub/file"), b"x").unwrap();
        std::os::unix::fs::symlink(&outside, tree.join("link")).unwrap();

        remove_tree(&tree).unwrap();

        assert!(!tree.exists());
        assert!(outside.join("keep.txt").exists());
    }

    #[test]
    fn remove_tree_on_missing_root_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        remove_tree(&dir.path().join("gone")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn is_real_dir_rejects_symlinked_dir() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(dir.path(), &link).unwrap();
        assert!(is_real_dir(dir.path()));
        assert!(!is_real_dir(&link));
    }
}
