//! Drift detection: compare deployed files against their recorded hashes.
use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::resources::helpers::fs::hash_file;
use crate::store::{ModuleRecord, Store};

/// Status of one deployed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStatus {
    /// Module the file belongs to.
    #[serde(rename = "module")]
    pub module_name: String,
    /// Generation of the module record checked.
    pub generation_id: Uuid,
    /// Live path under the module target.
    pub target_path: PathBuf,
    /// Recorded rendered copy.
    pub rendered_path: PathBuf,
    /// Recorded content hash.
    pub content_hash: String,
    /// Live content is missing, unreadable or different.
    pub dirty: bool,
}

/// Check every file of the newest record of each module name.
///
/// Older generations of a module are ignored. Live files are hashed through
/// symlinks. Nothing is modified.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn collect_status(store: &Store<'_>) -> Result<Vec<FileStatus>, StoreError> {
    let mut seen = BTreeSet::new();
    let mut statuses = Vec::new();
    for module in store.modules().list_all()? {
        if !seen.insert(module.module_name.clone()) {
            continue;
        }
        statuses.extend(module_status(store, &module)?);
    }
    Ok(statuses)
}

fn module_status(store: &Store<'_>, module: &ModuleRecord) -> Result<Vec<FileStatus>, StoreError> {
    let files = store.rendered_files().list_by_module(module.id)?;
    Ok(files
        .into_iter()
        .map(|file| {
            let target_path = file
                .file_path
                .strip_prefix(&module.output_path)
                .map_or_else(|_| file.file_path.clone(), |rel| module.target_path.join(rel));
            let dirty = match hash_file(&target_path) {
                Ok(live) => live != file.content_hash,
                Err(e) => {
                    debug!(path = %target_path.display(), error = %e, "live file unreadable");
                    true
                }
            };
            FileStatus {
                module_name: module.module_name.clone(),
                generation_id: module.generation_id,
                target_path,
                rendered_path: file.file_path,
                content_hash: file.content_hash,
                dirty,
            }
        })
        .collect())
}
