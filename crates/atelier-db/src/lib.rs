//! # atelier-db
//!
//! The shared local store for the Atelier subsystem: one SQLite database
//! holding secret records and catalog entries in separate tables, so no
//! cross-component key collisions are possible.
//!
//! ## Schema
//!
//! - WAL mode, foreign keys enforced
//! - All timestamps are Unix epoch milliseconds (u64)
//! - Schema version stored in `PRAGMA user_version`
//! - The v1 single-record secret shape is upgraded in place (see
//!   [`migrations`])

pub mod migrations;
pub mod queries;
pub mod schema;

use std::path::Path;

use rusqlite::Connection;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 2;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store could not be opened in this environment.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the Atelier database at the given path.
///
/// Configures WAL mode and foreign keys, then runs any pending migrations.
/// Failure to open maps to [`DbError::Unavailable`] so callers can degrade
/// to an ephemeral store.
pub fn open(path: &Path) -> Result<Connection> {
    let conn =
        Connection::open(path).map_err(|e| DbError::Unavailable(e.to_string()))?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}
