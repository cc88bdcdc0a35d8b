//! Database migration system.
//!
//! Schema version stored in `PRAGMA user_version`. Migrations are
//! forward-only. The v1 shape (a single un-keyed secret record) predates
//! versioning, so it is detected by table shape and upgraded in place:
//! re-indexed under the default provider id with its salt, nonce and
//! iteration count preserved byte-for-byte. No re-encryption happens.

use rusqlite::Connection;

use crate::{schema, DbError, Result, SCHEMA_VERSION};

/// Provider id the legacy single record is re-indexed under.
pub const LEGACY_PROVIDER_ID: &str = "together";

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<()> {
    let mut current_version: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(DbError::Sqlite)?;

    // Pre-versioning databases carry the single-record `secret` table and
    // user_version 0. Treat them as v1 so the upgrade path below runs.
    if current_version == 0 && has_legacy_table(conn)? {
        current_version = 1;
    }

    if current_version == 0 {
        // Fresh database — apply current schema
        tracing::info!("Initializing database schema v{SCHEMA_VERSION}");
        conn.execute_batch(schema::SCHEMA_V2)
            .map_err(DbError::Sqlite)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(DbError::Sqlite)?;
    } else if current_version < SCHEMA_VERSION {
        for version in (current_version + 1)..=SCHEMA_VERSION {
            tracing::info!("Running migration to v{version}");
            run_migration(conn, version)?;
            conn.pragma_update(None, "user_version", version)
                .map_err(DbError::Sqlite)?;
        }
    } else if current_version > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "Database version {current_version} is newer than supported {SCHEMA_VERSION}"
        )));
    }

    Ok(())
}

/// Run a specific migration.
fn run_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        2 => migrate_v2(conn),
        _ => Err(DbError::Migration(format!(
            "Unknown migration version: {version}"
        ))),
    }
}

/// v1 -> v2: move the single legacy secret record into the keyed
/// `secrets` table under [`LEGACY_PROVIDER_ID`], then drop the old table.
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(schema::SCHEMA_V2)
        .map_err(DbError::Sqlite)?;

    let moved = conn.execute(
        "INSERT OR IGNORE INTO secrets
             (provider_id, encrypted, secret, iv, salt, iterations, created_at, updated_at)
         SELECT ?1, encrypted, secret, iv, salt, iterations, created_at, updated_at
         FROM secret WHERE id = 1",
        [LEGACY_PROVIDER_ID],
    )?;
    if moved > 0 {
        tracing::info!(provider_id = LEGACY_PROVIDER_ID, "Migrated legacy secret record");
    }

    conn.execute_batch("DROP TABLE IF EXISTS secret;")
        .map_err(DbError::Sqlite)?;
    Ok(())
}

fn has_legacy_table(conn: &Connection) -> Result<bool> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'secret'",
        [],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
