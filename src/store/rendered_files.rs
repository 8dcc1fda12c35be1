//! Rendered-file rows: one per file a module record produced.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use uuid::Uuid;

use super::row_helpers;
use crate::error::StoreError;

/// One file produced for a module record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFileRecord {
    /// Row id.
    pub id: i64,
    /// Owning module record.
    pub module_id: i64,
    /// Where the rendered bytes were written (inside the module output).
    pub file_path: PathBuf,
    /// Source template the bytes came from.
    pub template_path: PathBuf,
    /// Lowercase hex SHA-256 of the rendered bytes.
    pub content_hash: String,
}

const COLUMNS: &str = "f.id, f.module_id, f.file_path, f.template_path, f.content_hash";

/// Rendered-file queries bound to one connection.
#[derive(Debug, Clone, Copy)]
pub struct RenderedFileRepo<'c> {
    conn: &'c Connection,
}

impl<'c> RenderedFileRepo<'c> {
    pub(super) const fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Record one rendered file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Constraint`] if the module already records this
    /// file path or the module does not exist.
    pub fn create(
        &self,
        module_id: i64,
        file_path: &Path,
        template_path: &Path,
        content_hash: &str,
    ) -> Result<RenderedFileRecord, StoreError> {
        self.conn.execute(
            "INSERT INTO rendered_files (module_id, file_path, template_path, content_hash)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                module_id,
                row_helpers::path_str(file_path)?,
                row_helpers::path_str(template_path)?,
                content_hash,
            ],
        )?;
        Ok(RenderedFileRecord {
            id: self.conn.last_insert_rowid(),
            module_id,
            file_path: file_path.to_path_buf(),
            template_path: template_path.to_path_buf(),
            content_hash: content_hash.to_string(),
        })
    }

    /// Files recorded for one module, ordered by file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is corrupt.
    pub fn list_by_module(&self, module_id: i64) -> Result<Vec<RenderedFileRecord>, StoreError> {
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM rendered_files f
                 WHERE f.module_id = ?1 ORDER BY f.file_path ASC"
            ),
            [module_id],
        )
    }

    /// Files recorded for every module of one generation.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is corrupt.
    pub fn list_by_generation(
        &self,
        generation_id: Uuid,
    ) -> Result<Vec<RenderedFileRecord>, StoreError> {
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM rendered_files f
                 JOIN dotfile_modules m ON m.id = f.module_id
                 WHERE m.generation_id = ?1
                 ORDER BY m.id ASC, f.file_path ASC"
            ),
            [generation_id.to_string()],
        )
    }

    /// Map of file path relative to `output_path` to content hash for one
    /// module. Files outside `output_path` keep their full path as the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is corrupt.
    pub fn hashes_by_module(
        &self,
        module_id: i64,
        output_path: &Path,
    ) -> Result<BTreeMap<PathBuf, String>, StoreError> {
        Ok(self
            .list_by_module(module_id)?
            .into_iter()
            .map(|f| {
                let key = f
                    .file_path
                    .strip_prefix(output_path)
                    .map_or_else(|_| f.file_path.clone(), Path::to_path_buf);
                (key, f.content_hash)
            })
            .collect())
    }

    fn query<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<RenderedFileRecord>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_file(row)?);
        }
        Ok(out)
    }
}

fn row_to_file(row: &rusqlite::Row<'_>) -> Result<RenderedFileRecord, StoreError> {
    const TABLE: &str = "rendered_files";
    Ok(RenderedFileRecord {
        id: row_helpers::get(row, 0, TABLE, "id")?,
        module_id: row_helpers::get(row, 1, TABLE, "module_id")?,
        file_path: row_helpers::get_path(row, 2, TABLE, "file_path")?,
        template_path: row_helpers::get_path(row, 3, TABLE, "template_path")?,
        content_hash: row_helpers::get(row, 4, TABLE, "content_hash")?,
    })
}
