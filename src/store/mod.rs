//! Generation store: SQLite persistence for generations, module records and
//! rendered-file records.
//!
//! All access goes through [`Database::unit_of_work`], which hands a
//! [`Store`] bound to one transaction to the caller and commits only when the
//! closure returns `Ok`.
pub mod generations;
pub mod modules;
pub mod rendered_files;
pub mod row_helpers;
pub mod schema;

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension as _};
use tracing::{debug, info};

use crate::error::StoreError;

pub use generations::{Generation, GenerationRepo};
pub use modules::{ModuleRecord, ModuleRepo};
pub use rendered_files::{RenderedFileRecord, RenderedFileRepo};

/// Owned SQLite connection with the schema migrated to the latest version.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    /// Open or create a database at `path`, creating parent directories and
    /// applying pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the file cannot be
    /// opened, or a migration fails.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut conn = Connection::open(path)?;
        let version = prepare(&mut conn)?;
        info!(path = %path.display(), version, "database opened");

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Open a private in-memory database (for tests).
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database or the schema
    /// cannot be created.
    pub fn in_memory() -> Result<Self, StoreError> {
        let mut conn = Connection::open_in_memory()?;
        prepare(&mut conn)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    /// Location of the database file (`:memory:` for in-memory databases).
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Highest applied migration version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version table cannot be read.
    pub fn schema_version(&self) -> Result<u32, StoreError> {
        current_version(&self.conn).map(Option::unwrap_or_default)
    }

    /// Run `f` inside one transaction.
    ///
    /// The transaction is committed when `f` returns `Ok` and rolled back
    /// when it returns `Err`, so a failure never leaves a partial set of rows.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f`, or a store error if the transaction
    /// cannot be started or committed.
    pub fn unit_of_work<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Store<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let tx = self.conn.transaction().map_err(StoreError::from)?;
        let outcome = f(&Store::new(&tx));
        match outcome {
            Ok(value) => {
                tx.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(e) => {
                debug!("unit of work failed, rolling back");
                // Dropping the transaction rolls it back.
                drop(tx);
                Err(e)
            }
        }
    }
}

/// Apply pragmas and pending migrations, returning the resulting version.
fn prepare(conn: &mut Connection) -> Result<u32, StoreError> {
    conn.execute_batch(schema::PRAGMAS)?;
    conn.execute_batch(schema::CREATE_VERSION_TABLE)?;

    let mut version = current_version(conn)?;
    if version.is_none() && table_exists(conn, "generations")? {
        // Tables created before version tracking existed: they match the
        // initial schema, so record it as applied.
        conn.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
        version = Some(1);
    }
    let current = version.unwrap_or_default();

    let pending: Vec<_> = schema::MIGRATIONS
        .iter()
        .filter(|(v, _)| *v > current)
        .collect();
    if pending.is_empty() {
        return Ok(current);
    }

    let tx = conn.transaction()?;
    for (v, sql) in &pending {
        debug!(version = v, "applying migration");
        tx.execute_batch(sql)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [v])?;
    }
    tx.commit()?;
    Ok(schema::latest_version())
}

fn current_version(conn: &Connection) -> Result<Option<u32>, StoreError> {
    let version: Option<u32> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get(0)
        })?;
    Ok(version)
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool, StoreError> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

/// Repositories bound to one open transaction.
#[derive(Debug, Clone, Copy)]
pub struct Store<'c> {
    conn: &'c Connection,
}

impl<'c> Store<'c> {
    /// Bind repositories to `conn` (usually a transaction).
    #[must_use]
    pub const fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Generation queries.
    #[must_use]
    pub const fn generations(&self) -> GenerationRepo<'c> {
        GenerationRepo::new(self.conn)
    }

    /// Module-record queries.
    #[must_use]
    pub const fn modules(&self) -> ModuleRepo<'c> {
        ModuleRepo::new(self.conn)
    }

    /// Rendered-file-record queries.
    #[must_use]
    pub const fn rendered_files(&self) -> RenderedFileRepo<'c> {
        RenderedFileRepo::new(self.conn)
    }
}
