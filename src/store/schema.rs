//! SQL DDL and versioned migrations for the generation store.
//!
//! Foreign keys are enabled per connection so that deleting a generation
//! cascades to its module records and their rendered files.

/// Pragmas applied to every connection.
pub const PRAGMAS: &str = r"
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
";

/// Bookkeeping table for applied migrations.
pub const CREATE_VERSION_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
";

const INITIAL_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS generations (
    id TEXT PRIMARY KEY NOT NULL,
    created_at TEXT NOT NULL,
    description TEXT
);
CREATE INDEX IF NOT EXISTS ix_generations_created_at ON generations(created_at);

CREATE TABLE IF NOT EXISTS dotfile_modules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    generation_id TEXT NOT NULL REFERENCES generations(id) ON DELETE CASCADE,
    module_name TEXT NOT NULL,
    output_path TEXT NOT NULL,
    target_path TEXT NOT NULL,
    CONSTRAINT uq_generation_module UNIQUE (generation_id, module_name)
);
CREATE INDEX IF NOT EXISTS ix_dotfile_modules_generation_id ON dotfile_modules(generation_id);
CREATE INDEX IF NOT EXISTS ix_dotfile_modules_module_name ON dotfile_modules(module_name);

CREATE TABLE IF NOT EXISTS rendered_files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    module_id INTEGER NOT NULL REFERENCES dotfile_modules(id) ON DELETE CASCADE,
    file_path TEXT NOT NULL,
    template_path TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    CONSTRAINT uq_module_file UNIQUE (module_id, file_path)
);
CREATE INDEX IF NOT EXISTS ix_rendered_files_module_id ON rendered_files(module_id);
CREATE INDEX IF NOT EXISTS ix_rendered_files_content_hash ON rendered_files(content_hash);
";

/// Ordered `(version, sql)` migrations. Each runs once, in order.
pub const MIGRATIONS: &[(u32, &str)] = &[(1, INITIAL_SCHEMA)];

/// Version of the newest migration.
#[must_use]
pub fn latest_version() -> u32 {
    MIGRATIONS.iter().map(|(v, _)| *v).max().unwrap_or(0)
}
