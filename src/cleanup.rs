//! Garbage collection of generations and their storage directories.
use std::path::Path;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::CleanupError;
use crate::resources::helpers::fs::remove_tree;
use crate::store::{Generation, Store};

/// Keep the `keep` most recent generations and delete the rest together
/// with their storage directories. Returns the deleted ids, newest first.
///
/// # Errors
///
/// Returns [`CleanupError::InvalidKeep`] if `keep` is zero, or a store or
/// filesystem error if a deletion fails.
pub fn cleanup_generations(
    store: &Store<'_>,
    keep: usize,
    render_root: &Path,
) -> Result<Vec<Uuid>, CleanupError> {
    if keep < 1 {
        return Err(CleanupError::InvalidKeep(keep));
    }

    let generations = store.generations().list_by_recency_desc()?;
    let expired: Vec<Generation> = generations.into_iter().skip(keep).collect();
    delete_all(store, &expired, render_root)
}

/// Drop superseded module records, then delete every generation left
/// without modules. Returns the deleted generation ids.
///
/// # Errors
///
/// Returns a store or filesystem error if a deletion fails.
pub fn clean_orphans(store: &Store<'_>, render_root: &Path) -> Result<Vec<Uuid>, CleanupError> {
    let pruned = store.modules().prune_stale()?;
    if !pruned.is_empty() {
        info!(count = pruned.len(), "pruned superseded module records");
    }
    let orphans = store.generations().list_orphans()?;
    delete_all(store, &orphans, render_root)
}

fn delete_all(
    store: &Store<'_>,
    generations: &[Generation],
    render_root: &Path,
) -> Result<Vec<Uuid>, CleanupError> {
    let mut deleted = Vec::with_capacity(generations.len());
    for generation in generations {
        store.generations().delete(generation)?;
        remove_generation_dirs(render_root, generation.id)?;
        debug!(generation = %generation.id, "generation removed");
        deleted.push(generation.id);
    }
    Ok(deleted)
}

/// Remove `<render_root>/<module>/<generation>` for every module directory.
///
/// Already-missing trees are skipped.
///
/// # Errors
///
/// Returns an error if the render root cannot be listed or a tree cannot be
/// removed.
pub fn remove_generation_dirs(render_root: &Path, generation_id: Uuid) -> Result<(), CleanupError> {
    let entries = match std::fs::read_dir(render_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(CleanupError::Io {
                path: render_root.to_path_buf(),
                source,
            });
        }
    };

    let name = generation_id.to_string();
    for entry in entries {
        let entry = entry.map_err(|source| CleanupError::Io {
            path: render_root.to_path_buf(),
            source,
        })?;
        remove_tree(&entry.path().join(&name))?;
    }
    Ok(())
}
