//! Generation rows: one per deployment run.
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::row_helpers;
use crate::error::StoreError;

/// An immutable, uniquely identified deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generation {
    /// Minted at creation.
    pub id: Uuid,
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
    /// Optional free-text description.
    pub description: Option<String>,
}

const COLUMNS: &str = "g.id, g.created_at, g.description";
/// Newest first; insertion order breaks timestamp ties.
const RECENCY_DESC: &str = "g.created_at DESC, g.rowid DESC";

/// Generation queries bound to one connection.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRepo<'c> {
    conn: &'c Connection,
}

impl<'c> GenerationRepo<'c> {
    pub(super) const fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Create a generation stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be inserted.
    pub fn create(&self, description: Option<&str>) -> Result<Generation, StoreError> {
        let generation = Generation {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            description: description.map(str::to_string),
        };
        self.conn.execute(
            "INSERT INTO generations (id, created_at, description) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                generation.id.to_string(),
                row_helpers::encode_timestamp(&generation.created_at),
                generation.description,
            ],
        )?;
        debug!(generation = %generation.id, "generation created");
        Ok(generation)
    }

    /// Look up a generation by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is corrupt.
    pub fn get(&self, id: Uuid) -> Result<Option<Generation>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {COLUMNS} FROM generations g WHERE g.id = ?1"))?;
        let mut rows = stmt.query([id.to_string()])?;
        rows.next()?.map(row_to_generation).transpose()
    }

    /// All generations, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is corrupt.
    pub fn list_by_recency_desc(&self) -> Result<Vec<Generation>, StoreError> {
        self.query(&format!(
            "SELECT {COLUMNS} FROM generations g ORDER BY {RECENCY_DESC}"
        ))
    }

    /// The most recently created generation, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is corrupt.
    pub fn latest(&self) -> Result<Option<Generation>, StoreError> {
        Ok(self
            .query(&format!(
                "SELECT {COLUMNS} FROM generations g ORDER BY {RECENCY_DESC} LIMIT 1"
            ))?
            .into_iter()
            .next())
    }

    /// Generations that own no module records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is corrupt.
    pub fn list_orphans(&self) -> Result<Vec<Generation>, StoreError> {
        self.query(&format!(
            "SELECT {COLUMNS} FROM generations g
             WHERE NOT EXISTS (SELECT 1 FROM dotfile_modules m WHERE m.generation_id = g.id)
             ORDER BY {RECENCY_DESC}"
        ))
    }

    /// Delete a generation; its module and rendered-file rows cascade.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete(&self, generation: &Generation) -> Result<(), StoreError> {
        self.delete_by_id(generation.id)
    }

    /// Delete a generation by id; a missing id is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete_by_id(&self, id: Uuid) -> Result<(), StoreError> {
        let n = self
            .conn
            .execute("DELETE FROM generations WHERE id = ?1", [id.to_string()])?;
        debug!(generation = %id, deleted = n, "generation deleted");
        Ok(())
    }

    fn query(&self, sql: &str) -> Result<Vec<Generation>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_generation(row)?);
        }
        Ok(out)
    }
}

fn row_to_generation(row: &rusqlite::Row<'_>) -> Result<Generation, StoreError> {
    Ok(Generation {
        id: row_helpers::get_uuid(row, 0, "generations", "id")?,
        created_at: row_helpers::get_timestamp(row, 1, "generations", "created_at")?,
        description: row_helpers::get(row, 2, "generations", "description")?,
    })
}
