//! Rollback executor: re-point published links at a recorded generation.
//!
//! Nothing is re-rendered and the store is only read. Every selected module
//! is validated before the first link changes, so a not-found failure leaves
//! the filesystem as it was.
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::RollbackError;
use crate::resources::Applicable as _;
use crate::resources::error::PublishError;
use crate::resources::helpers::fs::is_real_dir;
use crate::resources::symlink::AtomicSymlink;
use crate::store::{ModuleRecord, Store};

/// Re-publish the recorded output of `generation_id`.
///
/// `modules` selects a subset by name; `None` rolls back every module of the
/// generation. Returns module name → output path for every module that was
/// re-published.
///
/// # Errors
///
/// Returns [`RollbackError::EmptyGeneration`] if the generation is unknown or
/// has no modules, [`RollbackError::MissingModules`] if a requested name is
/// not part of it, [`RollbackError::MissingOutput`] if a recorded output
/// directory was deleted, and publish or store errors otherwise.
pub fn rollback_to_generation(
    store: &Store<'_>,
    generation_id: Uuid,
    modules: Option<&[String]>,
) -> Result<BTreeMap<String, PathBuf>, RollbackError> {
    let records = store.modules().list_by_generation(generation_id)?;
    if records.is_empty() {
        return Err(RollbackError::EmptyGeneration(generation_id));
    }

    let selected = select(generation_id, &records, modules)?;

    let mut plans = Vec::with_capacity(selected.len());
    for record in selected {
        if !record.output_path.exists() {
            return Err(RollbackError::MissingOutput {
                module: record.module_name.clone(),
                path: record.output_path.clone(),
            });
        }
        plans.push(plan(store, record)?);
    }

    let mut updated = BTreeMap::new();
    for relink in plans {
        relink.apply()?;
        info!(
            module = %relink.record.module_name,
            generation = %generation_id,
            removed = relink.stale.len(),
            "rolled back"
        );
        updated.insert(relink.record.module_name.clone(), relink.record.output_path.clone());
    }
    Ok(updated)
}

/// Resolve the requested names against the generation's records.
fn select<'r>(
    generation_id: Uuid,
    records: &'r [ModuleRecord],
    modules: Option<&[String]>,
) -> Result<Vec<&'r ModuleRecord>, RollbackError> {
    let Some(requested) = modules else {
        return Ok(records.iter().collect());
    };

    let wanted: BTreeSet<&str> = requested.iter().map(String::as_str).map(str::trim).collect();
    let missing: Vec<String> = wanted
        .iter()
        .filter(|name| !records.iter().any(|r| r.module_name == **name))
        .map(|name| (*name).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(RollbackError::MissingModules {
            generation: generation_id,
            names: missing,
        });
    }

    Ok(records
        .iter()
        .filter(|r| wanted.contains(r.module_name.as_str()))
        .collect())
}

/// Link changes that restore one module record.
#[derive(Debug)]
struct RelinkPlan<'r> {
    record: &'r ModuleRecord,
    /// Output file and its path relative to the output directory; empty when
    /// the target itself is linked to the output directory.
    files: Vec<(PathBuf, PathBuf)>,
    /// Links published by other generations of the module for files this
    /// record does not have.
    stale: Vec<PathBuf>,
}

impl RelinkPlan<'_> {
    /// Remove stale links, then point every remaining link at the output.
    fn apply(&self) -> Result<(), RollbackError> {
        for link in &self.stale {
            debug!(link = %link.display(), "removing link from another generation");
            std::fs::remove_file(link).map_err(PublishError::io("remove", link))?;
        }

        if !is_real_dir(&self.record.target_path) {
            AtomicSymlink::new(
                self.record.output_path.clone(),
                self.record.target_path.clone(),
            )
            .apply()?;
            return Ok(());
        }

        for (file, relative) in &self.files {
            let link = self.record.target_path.join(relative);
            debug!(link = %link.display(), "re-pointing");
            AtomicSymlink::new(file.clone(), link).apply()?;
        }
        Ok(())
    }
}

/// Work out the link changes for `record` without touching the filesystem.
///
/// A target that is a real directory holds one link per published file, so
/// each file link below it is re-pointed and links into other generations'
/// output that `record` has no file for are removed. Otherwise the target
/// path itself becomes a link to the output directory.
fn plan<'r>(store: &Store<'_>, record: &'r ModuleRecord) -> Result<RelinkPlan<'r>, RollbackError> {
    if !is_real_dir(&record.target_path) {
        return Ok(RelinkPlan {
            record,
            files: Vec::new(),
            stale: Vec::new(),
        });
    }

    let files = output_files(&record.output_path)?;
    let kept: BTreeSet<&Path> = files.iter().map(|(_, relative)| relative.as_path()).collect();
    let stale = stale_links(store, record, &kept)?;
    Ok(RelinkPlan {
        record,
        files,
        stale,
    })
}

/// Links below the target of `record` that other records of the same module
/// published and that still point into those records' output.
///
/// Links the user re-pointed elsewhere are left alone.
fn stale_links(
    store: &Store<'_>,
    record: &ModuleRecord,
    kept: &BTreeSet<&Path>,
) -> Result<Vec<PathBuf>, RollbackError> {
    let Some(module_root) = record.output_path.parent() else {
        return Ok(Vec::new());
    };

    let mut stale = BTreeSet::new();
    for other in store.modules().list_all()? {
        if other.module_name != record.module_name || other.id == record.id {
            continue;
        }
        for file in store.rendered_files().list_by_module(other.id)? {
            let Ok(relative) = file.file_path.strip_prefix(&other.output_path) else {
                continue;
            };
            if kept.contains(relative) {
                continue;
            }
            let link = record.target_path.join(relative);
            let Ok(destination) = std::fs::read_link(&link) else {
                continue;
            };
            if destination.starts_with(module_root)
                && !destination.starts_with(&record.output_path)
            {
                stale.insert(link);
            }
        }
    }
    Ok(stale.into_iter().collect())
}

/// Files below `output`, paired with their path relative to it.
fn output_files(output: &Path) -> Result<Vec<(PathBuf, PathBuf)>, RollbackError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(output).sort_by_file_name() {
        let entry = entry.map_err(|source| RollbackError::Walk {
            path: output.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(output) {
            files.push((entry.path().to_path_buf(), relative.to_path_buf()));
        }
    }
    Ok(files)
}
