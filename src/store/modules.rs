//! Module records: one module's rendered output as of one generation.
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::debug;
use uuid::Uuid;

use super::row_helpers;
use crate::error::StoreError;
use crate::paths;

/// One module's output as of one generation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    /// Row id.
    pub id: i64,
    /// Owning generation.
    pub generation_id: Uuid,
    /// Trimmed, non-empty module name.
    pub module_name: String,
    /// Generation-scoped storage directory holding the rendered files.
    pub output_path: PathBuf,
    /// Directory the files are published into.
    pub target_path: PathBuf,
}

const COLUMNS: &str = "m.id, m.generation_id, m.module_name, m.output_path, m.target_path";

/// Module-record queries bound to one connection.
#[derive(Debug, Clone, Copy)]
pub struct ModuleRepo<'c> {
    conn: &'c Connection,
}

impl<'c> ModuleRepo<'c> {
    pub(super) const fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Record a module's output for `generation_id`.
    ///
    /// The name is trimmed and both paths are normalized to absolute,
    /// home-expanded form before they are stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyModuleName`] for a blank name,
    /// [`StoreError::Constraint`] if the generation already has a record for
    /// this name or the generation does not exist, and other store errors if
    /// the insert fails.
    pub fn create(
        &self,
        generation_id: Uuid,
        module_name: &str,
        output_path: &Path,
        target_path: &Path,
    ) -> Result<ModuleRecord, StoreError> {
        let module_name = module_name.trim();
        if module_name.is_empty() {
            return Err(StoreError::EmptyModuleName);
        }
        let output_path = normalize(output_path)?;
        let target_path = normalize(target_path)?;

        self.conn.execute(
            "INSERT INTO dotfile_modules (generation_id, module_name, output_path, target_path)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                generation_id.to_string(),
                module_name,
                row_helpers::path_str(&output_path)?,
                row_helpers::path_str(&target_path)?,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(module = module_name, generation = %generation_id, id, "module recorded");

        Ok(ModuleRecord {
            id,
            generation_id,
            module_name: module_name.to_string(),
            output_path,
            target_path,
        })
    }

    /// Delete one module record (its rendered files cascade). A missing id is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete_by_id(&self, id: i64) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM dotfile_modules WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Every module record, ordered by owning-generation recency (newest
    /// first), then record id descending, then module name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is corrupt.
    pub fn list_all(&self) -> Result<Vec<ModuleRecord>, StoreError> {
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM dotfile_modules m
                 JOIN generations g ON g.id = m.generation_id
                 ORDER BY g.created_at DESC, g.rowid DESC, m.id DESC, m.module_name ASC"
            ),
            [],
        )
    }

    /// Module records owned by one generation, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is corrupt.
    pub fn list_by_generation(&self, generation_id: Uuid) -> Result<Vec<ModuleRecord>, StoreError> {
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM dotfile_modules m
                 WHERE m.generation_id = ?1 ORDER BY m.id ASC"
            ),
            [generation_id.to_string()],
        )
    }

    /// The record for `module_name` within one generation.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is corrupt.
    pub fn find(
        &self,
        generation_id: Uuid,
        module_name: &str,
    ) -> Result<Option<ModuleRecord>, StoreError> {
        Ok(self
            .query(
                &format!(
                    "SELECT {COLUMNS} FROM dotfile_modules m
                     WHERE m.generation_id = ?1 AND m.module_name = ?2"
                ),
                [generation_id.to_string(), module_name.trim().to_string()],
            )?
            .into_iter()
            .next())
    }

    /// The record for `module_name` in the most recent generation containing
    /// that module.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is corrupt.
    pub fn find_latest_by_name(&self, module_name: &str) -> Result<Option<ModuleRecord>, StoreError> {
        Ok(self
            .query(
                &format!(
                    "SELECT {COLUMNS} FROM dotfile_modules m
                     JOIN generations g ON g.id = m.generation_id
                     WHERE m.module_name = ?1
                     ORDER BY g.created_at DESC, g.rowid DESC, m.id DESC
                     LIMIT 1"
                ),
                [module_name.trim()],
            )?
            .into_iter()
            .next())
    }

    /// Keep only the newest record of each module name and delete the rest,
    /// returning the deleted ids.
    ///
    /// Records are visited in (name, owning-generation recency desc, id desc)
    /// order; every record after the first one seen for a name is deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the query or a delete fails.
    pub fn prune_stale(&self) -> Result<Vec<i64>, StoreError> {
        let ordered = self.query(
            &format!(
                "SELECT {COLUMNS} FROM dotfile_modules m
                 JOIN generations g ON g.id = m.generation_id
                 ORDER BY m.module_name ASC, g.created_at DESC, g.rowid DESC, m.id DESC"
            ),
            [],
        )?;

        let mut deleted = Vec::new();
        let mut current: Option<&str> = None;
        for record in &ordered {
            if current == Some(record.module_name.as_str()) {
                self.delete_by_id(record.id)?;
                deleted.push(record.id);
                continue;
            }
            current = Some(record.module_name.as_str());
        }

        if !deleted.is_empty() {
            debug!(count = deleted.len(), "pruned stale module records");
        }
        Ok(deleted)
    }

    fn query<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<ModuleRecord>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_module(row)?);
        }
        Ok(out)
    }
}

fn normalize(path: &Path) -> Result<PathBuf, StoreError> {
    paths::normalize(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn row_to_module(row: &rusqlite::Row<'_>) -> Result<ModuleRecord, StoreError> {
    const TABLE: &str = "dotfile_modules";
    Ok(ModuleRecord {
        id: row_helpers::get(row, 0, TABLE, "id")?,
        generation_id: row_helpers::get_uuid(row, 1, TABLE, "generation_id")?,
        module_name: row_helpers::get(row, 2, TABLE, "module_name")?,
        output_path: row_helpers::get_path(row, 3, TABLE, "output_path")?,
        target_path: row_helpers::get_path(row, 4, TABLE, "target_path")?,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::store::{Database, Store};

    fn with_store<T>(f: impl FnOnce(&Store<'_>) -> Result<T, StoreError>) -> T {
        let mut db = Database::in_memory().unwrap();
        db.unit_of_work(f).unwrap()
    }

    #[test]
    fn create_trims_name_and_normalizes_paths() {
        with_store(|store| {
            let generation = store.generations().create(None)?;
            let record = store.modules().create(
                generation.id,
                "  vim \n",
                Path::new("/render/vim/./g"),
                Path::new("/home/u/.config/../.config/vim"),
            )?;
            assert_eq!(record.module_name, "vim");
            assert!(record.output_path.is_absolute());
            assert!(record.output_path.ends_with("render/vim/g"));
            assert!(record.target_path.ends_with(".config/vim"));
            assert!(!record.target_path.to_string_lossy().contains(".."));
            Ok(())
        });
    }

    #[test]
    fn create_rejects_blank_name() {
        with_store(|store| {
            let generation = store.generations().create(None)?;
            let err = store
                .modules()
                .create(generation.id, "   ", Path::new("/o"), Path::new("/t"))
                .unwrap_err();
            assert!(matches!(err, StoreError::EmptyModuleName));
            Ok(())
        });
    }

    #[test]
    fn duplicate_name_in_generation_is_constraint_violation() {
        with_store(|store| {
            let generation = store.generations().create(None)?;
            store
                .modules()
                .create(generation.id, "vim", Path::new("/o1"), Path::new("/t"))?;
            let err = store
                .modules()
                .create(generation.id, "vim", Path::new("/o2"), Path::new("/t"))
                .unwrap_err();
            assert!(matches!(err, StoreError::Constraint(_)), "got {err:?}");
            Ok(())
        });
    }

    #[test]
    fn unknown_generation_is_constraint_violation() {
        with_store(|store| {
            let err = store
                .modules()
                .create(Uuid::new_v4(), "vim", Path::new("/o"), Path::new("/t"))
                .unwrap_err();
            assert!(matches!(err, StoreError::Constraint(_)), "got {err:?}");
            Ok(())
        });
    }

    #[test]
    fn find_and_find_latest_by_name() {
        with_store(|store| {
            let older = store.generations().create(Some("older"))?;
            let newer = store.generations().create(Some("newer"))?;
            store
                .modules()
                .create(older.id, "vim", Path::new("/r/vim/1"), Path::new("/t"))?;
            store
                .modules()
                .create(newer.id, "vim", Path::new("/r/vim/2"), Path::new("/t"))?;
            store
                .modules()
                .create(older.id, "git", Path::new("/r/git/1"), Path::new("/t"))?;

            let in_older = store.modules().find(older.id, "vim")?.unwrap();
            assert!(in_older.output_path.ends_with("vim/1"));
            assert!(store.modules().find(newer.id, "git")?.is_none());

            let latest = store.modules().find_latest_by_name("vim")?.unwrap();
            assert_eq!(latest.generation_id, newer.id);
            assert!(store.modules().find_latest_by_name("zsh")?.is_none());
            Ok(())
        });
    }

    #[test]
    fn list_all_orders_by_generation_recency() {
        with_store(|store| {
            let older = store.generations().create(None)?;
            let newer = store.generations().create(None)?;
            store
                .modules()
                .create(older.id, "a", Path::new("/r/a/1"), Path::new("/t/a"))?;
            store
                .modules()
                .create(newer.id, "b", Path::new("/r/b/2"), Path::new("/t/b"))?;
            store
                .modules()
                .create(newer.id, "c", Path::new("/r/c/2"), Path::new("/t/c"))?;

            let names: Vec<_> = store
                .modules()
                .list_all()?
                .into_iter()
                .map(|m| m.module_name)
                .collect();
            assert_eq!(names, vec!["c", "b", "a"]);
            Ok(())
        });
    }

    #[test]
    fn prune_stale_keeps_newest_per_name() {
        with_store(|store| {
            let g1 = store.generations().create(None)?;
            let g2 = store.generations().create(None)?;
            let old_vim = store
                .modules()
                .create(g1.id, "vim", Path::new("/r/vim/1"), Path::new("/t"))?;
            let git = store
                .modules()
                .create(g1.id, "git", Path::new("/r/git/1"), Path::new("/t"))?;
            let new_vim = store
                .modules()
                .create(g2.id, "vim", Path::new("/r/vim/2"), Path::new("/t"))?;

            let deleted = store.modules().prune_stale()?;
            assert_eq!(deleted, vec![old_vim.id]);

            let remaining: Vec<_> = store.modules().list_all()?.iter().map(|m| m.id).collect();
            assert!(remaining.contains(&git.id));
            assert!(remaining.contains(&new_vim.id));
            assert_eq!(remaining.len(), 2);
            Ok(())
        });
    }

    #[test]
    fn prune_stale_without_duplicates_is_noop() {
        with_store(|store| {
            let g = store.generations().create(None)?;
            store
                .modules()
                .create(g.id, "vim", Path::new("/r/vim/1"), Path::new("/t"))?;
            assert!(store.modules().prune_stale()?.is_empty());
            Ok(())
        });
    }
}
