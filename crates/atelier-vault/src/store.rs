//! Storage backends for secret records.
//!
//! The durable backend shares the workspace SQLite database. The ephemeral
//! backend is a plain in-memory map used when the durable store cannot be
//! opened; secrets then live only for the duration of the tab.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;

use atelier_db::queries::secrets;
use atelier_db::{DbError, Result};

pub use atelier_db::queries::secrets::SecretRow;

/// Where secret records live.
pub enum Backend {
    /// The shared SQLite database.
    Durable(Arc<Mutex<Connection>>),
    /// In-memory fallback, lost when the process exits.
    Ephemeral(Mutex<HashMap<String, SecretRow>>),
}

impl Backend {
    /// Open the durable backend at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = atelier_db::open(path)?;
        Ok(Backend::Durable(Arc::new(Mutex::new(conn))))
    }

    /// Wrap an already-open shared connection.
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Backend::Durable(conn)
    }

    /// Create the in-memory fallback backend.
    pub fn ephemeral() -> Self {
        Backend::Ephemeral(Mutex::new(HashMap::new()))
    }

    /// Whether records survive a restart.
    pub fn is_durable(&self) -> bool {
        matches!(self, Backend::Durable(_))
    }

    pub async fn get(&self, provider_id: &str) -> Result<SecretRow> {
        match self {
            Backend::Durable(conn) => secrets::get(&*conn.lock().await, provider_id),
            Backend::Ephemeral(map) => map
                .lock()
                .await
                .get(provider_id)
                .cloned()
                .ok_or_else(|| DbError::NotFound(format!("secret for provider '{provider_id}'"))),
        }
    }

    pub async fn upsert(&self, row: SecretRow) -> Result<()> {
        match self {
            Backend::Durable(conn) => secrets::upsert(&*conn.lock().await, &row),
            Backend::Ephemeral(map) => {
                let mut map = map.lock().await;
                let mut row = row;
                if let Some(existing) = map.get(&row.provider_id) {
                    row.created_at = existing.created_at;
                }
                map.insert(row.provider_id.clone(), row);
                Ok(())
            }
        }
    }

    pub async fn delete(&self, provider_id: &str) -> Result<()> {
        match self {
            Backend::Durable(conn) => secrets::delete(&*conn.lock().await, provider_id),
            Backend::Ephemeral(map) => {
                map.lock().await.remove(provider_id);
                Ok(())
            }
        }
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        match self {
            Backend::Durable(conn) => secrets::list(&*conn.lock().await),
            Backend::Ephemeral(map) => {
                let mut ids: Vec<String> = map.lock().await.keys().cloned().collect();
                ids.sort();
                Ok(ids)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(provider_id: &str) -> SecretRow {
        SecretRow {
            provider_id: provider_id.to_string(),
            encrypted: false,
            secret: b"secret".to_vec(),
            iv: None,
            salt: None,
            iterations: None,
            created_at: 100,
            updated_at: 100,
        }
    }

    #[tokio::test]
    async fn test_ephemeral_roundtrip() {
        let backend = Backend::ephemeral();
        assert!(!backend.is_durable());

        backend.upsert(row("together")).await.expect("upsert");
        let got = backend.get("together").await.expect("get");
        assert_eq!(got.secret, b"secret");

        backend.delete("together").await.expect("delete");
        assert!(matches!(
            backend.get("together").await,
            Err(DbError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ephemeral_preserves_created_at() {
        let backend = Backend::ephemeral();
        backend.upsert(row("together")).await.expect("first");

        let mut newer = row("together");
        newer.created_at = 999;
        newer.updated_at = 999;
        backend.upsert(newer).await.expect("second");

        let got = backend.get("together").await.expect("get");
        assert_eq!(got.created_at, 100);
        assert_eq!(got.updated_at, 999);
    }

    #[tokio::test]
    async fn test_ephemeral_list_sorted() {
        let backend = Backend::ephemeral();
        backend.upsert(row("together")).await.expect("upsert");
        backend.upsert(row("fal")).await.expect("upsert");
        assert_eq!(
            backend.list().await.expect("list"),
            vec!["fal".to_string(), "together".to_string()]
        );
    }
}
