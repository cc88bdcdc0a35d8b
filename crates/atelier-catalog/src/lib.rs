//! # atelier-catalog
//!
//! Read-through cache of provider model metadata, keyed by provider id.
//!
//! Reads never touch the network. Whether a stale entry triggers a refresh
//! through the provider boundary is the caller's decision; a forced refresh
//! bypasses the cache at the call site and lands here as a plain [`write`],
//! which fully replaces the entry with a new fetch timestamp.
//!
//! [`write`]: CatalogCache::write

use std::path::Path;
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;

use atelier_db::queries::catalog as catalog_queries;
use atelier_db::{queries::catalog::CatalogRow, DbError};
use atelier_types::catalog::{CatalogEntry, ModelSpec};

/// Default entry time-to-live (10 minutes).
pub const DEFAULT_TTL_MS: u64 = atelier_types::DEFAULT_CATALOG_TTL_MS;

/// Error types for catalog cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("catalog serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// The model catalog cache, backed by the shared local store.
pub struct CatalogCache {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogCache {
    /// Build the cache over an already-open shared connection.
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Open the cache over the durable store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = atelier_db::open(path)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// Open an in-memory cache (storage-unavailable fallback and tests).
    pub fn ephemeral() -> Result<Self> {
        let conn = atelier_db::open_memory()?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// Read the cached entry for a provider. `None` means "never fetched"
    /// (or deleted), not an error. No staleness check is applied; callers
    /// that want stale-serving behavior may use the entry regardless.
    pub async fn read(&self, provider_id: &str) -> Result<Option<CatalogEntry>> {
        let row = match catalog_queries::get(&*self.conn.lock().await, provider_id) {
            Ok(row) => row,
            Err(DbError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let models: Vec<ModelSpec> = serde_json::from_str(&row.models)
            .map_err(|e| CatalogError::Serialization(e.to_string()))?;

        Ok(Some(CatalogEntry {
            provider_id: row.provider_id,
            models,
            fetched_at: row.fetched_at,
            ttl_ms: row.ttl_ms,
        }))
    }

    /// Overwrite the entry for a provider with a freshly fetched model
    /// list. The replace is a single statement; a failure leaves the
    /// prior entry intact.
    pub async fn write(
        &self,
        provider_id: &str,
        models: Vec<ModelSpec>,
        ttl_ms: u64,
        now_ms: u64,
    ) -> Result<CatalogEntry> {
        let json = serde_json::to_string(&models)
            .map_err(|e| CatalogError::Serialization(e.to_string()))?;

        catalog_queries::upsert(
            &*self.conn.lock().await,
            &CatalogRow {
                provider_id: provider_id.to_string(),
                models: json,
                fetched_at: now_ms,
                ttl_ms,
            },
        )?;
        tracing::debug!(provider_id, model_count = models.len(), "catalog entry replaced");

        Ok(CatalogEntry {
            provider_id: provider_id.to_string(),
            models,
            fetched_at: now_ms,
            ttl_ms,
        })
    }

    /// Drop the cached entry for a provider.
    pub async fn delete(&self, provider_id: &str) -> Result<()> {
        catalog_queries::delete(&*self.conn.lock().await, provider_id)?;
        Ok(())
    }

    /// Staleness rule: stale iff more than `ttl_ms` elapsed since fetch.
    pub fn is_stale(entry: &CatalogEntry, now_ms: u64) -> bool {
        entry.is_stale(now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_types::catalog::{ModelCapabilities, ModelDefaults, ModelLimits};

    fn model(id: &str) -> ModelSpec {
        ModelSpec {
            id: id.to_string(),
            display_name: id.to_string(),
            recommended: false,
            capabilities: ModelCapabilities::default(),
            limits: ModelLimits {
                min_steps: 1,
                max_steps: 50,
                min_cfg: 1.0,
                max_cfg: 20.0,
                min_width: 256,
                max_width: 1440,
                min_height: 256,
                max_height: 1440,
                presets: vec![],
            },
            defaults: ModelDefaults {
                width: 1024,
                height: 1024,
                steps: 4,
                cfg: 3.5,
                seed: None,
                mode: None,
            },
        }
    }

    #[tokio::test]
    async fn test_read_never_fetched_is_none() {
        let cache = CatalogCache::ephemeral().expect("open");
        let entry = cache.read("together").await.expect("read");
        assert!(entry.is_none());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let cache = CatalogCache::ephemeral().expect("open");
        cache
            .write("together", vec![model("flux-schnell")], DEFAULT_TTL_MS, 1000)
            .await
            .expect("write");

        let entry = cache.read("together").await.expect("read").expect("entry");
        assert_eq!(entry.provider_id, "together");
        assert_eq!(entry.models.len(), 1);
        assert_eq!(entry.fetched_at, 1000);
    }

    #[tokio::test]
    async fn test_fresh_entry_never_stale() {
        let cache = CatalogCache::ephemeral().expect("open");
        let entry = cache
            .write("together", vec![], DEFAULT_TTL_MS, 1000)
            .await
            .expect("write");
        assert!(!CatalogCache::is_stale(&entry, 1000));
    }

    #[tokio::test]
    async fn test_staleness_boundary() {
        let cache = CatalogCache::ephemeral().expect("open");
        let entry = cache
            .write("together", vec![], 600_000, 1000)
            .await
            .expect("write");
        assert!(!CatalogCache::is_stale(&entry, 601_000));
        assert!(CatalogCache::is_stale(&entry, 601_001));
    }

    #[tokio::test]
    async fn test_rewrite_refreshes_fetched_at() {
        let cache = CatalogCache::ephemeral().expect("open");
        cache
            .write("together", vec![model("a")], DEFAULT_TTL_MS, 1000)
            .await
            .expect("first");
        cache
            .write("together", vec![model("a"), model("b")], DEFAULT_TTL_MS, 2000)
            .await
            .expect("second");

        let entry = cache.read("together").await.expect("read").expect("entry");
        assert_eq!(entry.fetched_at, 2000);
        assert_eq!(entry.models.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_returns_to_none() {
        let cache = CatalogCache::ephemeral().expect("open");
        cache
            .write("together", vec![], DEFAULT_TTL_MS, 1000)
            .await
            .expect("write");
        cache.delete("together").await.expect("delete");
        assert!(cache.read("together").await.expect("read").is_none());
    }
}
