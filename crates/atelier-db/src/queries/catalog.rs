//! Catalog entry query functions.
//!
//! Model lists are stored as a JSON text column; a write fully replaces
//! the row in one statement so a failed fetch can never leave a partial
//! entry behind.

use rusqlite::Connection;

use crate::{DbError, Result};

/// A raw catalog row.
#[derive(Clone, Debug)]
pub struct CatalogRow {
    pub provider_id: String,
    /// JSON-encoded `Vec<ModelSpec>`.
    pub models: String,
    pub fetched_at: u64,
    pub ttl_ms: u64,
}

/// Insert or fully replace the catalog entry for a provider.
pub fn upsert(conn: &Connection, row: &CatalogRow) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO catalog (provider_id, models, fetched_at, ttl_ms)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            row.provider_id,
            row.models,
            row.fetched_at as i64,
            row.ttl_ms as i64,
        ],
    )?;
    Ok(())
}

/// Get the catalog entry for a provider.
pub fn get(conn: &Connection, provider_id: &str) -> Result<CatalogRow> {
    conn.query_row(
        "SELECT provider_id, models, fetched_at, ttl_ms FROM catalog WHERE provider_id = ?1",
        [provider_id],
        |row| {
            Ok(CatalogRow {
                provider_id: row.get(0)?,
                models: row.get(1)?,
                fetched_at: row.get::<_, i64>(2)? as u64,
                ttl_ms: row.get::<_, i64>(3)? as u64,
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            DbError::NotFound(format!("catalog for provider '{provider_id}'"))
        }
        other => DbError::Sqlite(other),
    })
}

/// Delete the catalog entry for a provider.
pub fn delete(conn: &Connection, provider_id: &str) -> Result<()> {
    conn.execute("DELETE FROM catalog WHERE provider_id = ?1", [provider_id])?;
    Ok(())
}
