//! The credential vault operations.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use rusqlite::Connection;
use tokio::sync::Mutex;
use zeroize::Zeroizing;

use atelier_crypto::{aead, kdf};
use atelier_db::DbError;
use atelier_types::now_ms;

use crate::record::SecretMetadata;
use crate::store::{Backend, SecretRow};
use crate::{Result, VaultError};

/// The credential vault: one secret record per provider id.
///
/// All operations are async and never block the runtime; key derivation
/// runs on the blocking pool. The vault holds no write lock — callers
/// serialize saves per provider id.
pub struct CredentialVault {
    backend: Backend,
    /// PINs that successfully unlocked or encrypted a record this session,
    /// keyed by provider id. Save paths may reuse them so a mode switch
    /// does not re-prompt; `load_key` never consults this map.
    session_pins: StdMutex<HashMap<String, Zeroizing<String>>>,
}

impl CredentialVault {
    /// Open the vault over the durable store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let backend = Backend::open(path).map_err(|e| match e {
            DbError::Unavailable(msg) => VaultError::StorageUnavailable(msg),
            other => VaultError::Db(other),
        })?;
        Ok(Self::with_backend(backend))
    }

    /// Open the vault at `path`, degrading to an in-memory store if the
    /// durable one is unavailable (private-browsing-like environments).
    pub fn open_or_ephemeral(path: &Path) -> Self {
        match Self::open(path) {
            Ok(vault) => vault,
            Err(e) => {
                tracing::warn!(error = %e, "durable store unavailable, secrets are in-memory for this session");
                Self::with_backend(Backend::ephemeral())
            }
        }
    }

    /// Build the vault over an already-open shared connection.
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self::with_backend(Backend::from_connection(conn))
    }

    /// Build an in-memory vault.
    pub fn ephemeral() -> Self {
        Self::with_backend(Backend::ephemeral())
    }

    fn with_backend(backend: Backend) -> Self {
        Self {
            backend,
            session_pins: StdMutex::new(HashMap::new()),
        }
    }

    /// Whether secrets survive a restart.
    pub fn is_durable(&self) -> bool {
        self.backend.is_durable()
    }

    /// Metadata about a provider's stored secret. Never touches the value
    /// and always succeeds; an absent record reports `has_key: false`.
    pub async fn load_metadata(&self, provider_id: &str) -> Result<SecretMetadata> {
        match self.backend.get(provider_id).await {
            Ok(row) => Ok(SecretMetadata {
                has_key: true,
                encrypted: row.encrypted,
                created_at: Some(row.created_at),
                updated_at: Some(row.updated_at),
            }),
            Err(DbError::NotFound(_)) => Ok(SecretMetadata::absent()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the plaintext secret for a provider.
    ///
    /// # Errors
    ///
    /// - [`VaultError::KeyNotFound`] if no record exists
    /// - [`VaultError::PinRequired`] if the record is encrypted and no PIN
    ///   was given
    /// - [`VaultError::InvalidPin`] if decryption fails
    ///
    /// An unencrypted record is returned directly, PIN or not.
    pub async fn load_key(
        &self,
        provider_id: &str,
        pin: Option<&str>,
    ) -> Result<Zeroizing<String>> {
        let row = self.get_row(provider_id).await?;

        if !row.encrypted {
            return plaintext_from(row.secret);
        }

        let pin = pin.ok_or(VaultError::PinRequired)?;
        let secret = self.decrypt_row(&row, pin).await?;
        self.remember_pin(provider_id, pin);
        Ok(secret)
    }

    /// Save a secret for a provider, overwriting any prior record. A mode
    /// change is a destructive rewrite: encrypting produces a fresh
    /// salt/nonce pair, storing plaintext drops them.
    ///
    /// With `encrypt` and no PIN, the session's remembered PIN for this
    /// provider is reused; if there is none, [`VaultError::PinRequired`].
    pub async fn save_key(
        &self,
        provider_id: &str,
        plaintext: &str,
        encrypt: bool,
        pin: Option<&str>,
    ) -> Result<()> {
        if plaintext.trim().is_empty() {
            return Err(VaultError::EmptyKey);
        }

        let now = now_ms();
        let row = if encrypt {
            let pin = match pin {
                Some(p) => Zeroizing::new(p.to_string()),
                None => self
                    .recall_pin(provider_id)
                    .ok_or(VaultError::PinRequired)?,
            };

            let salt = kdf::generate_salt();
            let nonce = aead::generate_nonce();
            let key = derive_blocking(&pin, salt, kdf::DEFAULT_ITERATIONS).await?;
            let ciphertext = aead::encrypt(&key, &nonce, plaintext.as_bytes(), provider_id.as_bytes())?;
            self.remember_pin(provider_id, &pin);

            SecretRow {
                provider_id: provider_id.to_string(),
                encrypted: true,
                secret: ciphertext,
                iv: Some(nonce.to_vec()),
                salt: Some(salt.to_vec()),
                iterations: Some(kdf::DEFAULT_ITERATIONS),
                created_at: now,
                updated_at: now,
            }
        } else {
            SecretRow {
                provider_id: provider_id.to_string(),
                encrypted: false,
                secret: plaintext.as_bytes().to_vec(),
                iv: None,
                salt: None,
                iterations: None,
                created_at: now,
                updated_at: now,
            }
        };

        self.backend.upsert(row).await?;
        tracing::debug!(provider_id, encrypted = encrypt, "secret saved");
        Ok(())
    }

    /// Delete a provider's secret. Idempotent.
    pub async fn delete_key(&self, provider_id: &str) -> Result<()> {
        self.backend.delete(provider_id).await?;
        self.forget_pin(provider_id);
        tracing::debug!(provider_id, "secret deleted");
        Ok(())
    }

    /// Rewrite a provider's record under a new encryption mode.
    ///
    /// Reads the current plaintext first (decrypting with `pin` or the
    /// session's remembered PIN if the record is encrypted), then saves
    /// under the new mode. Switching to encrypted with no PIN available
    /// fails with [`VaultError::PinRequired`].
    pub async fn set_encryption_mode(
        &self,
        provider_id: &str,
        encrypt: bool,
        pin: Option<&str>,
    ) -> Result<()> {
        let row = self.get_row(provider_id).await?;

        let plaintext = if row.encrypted {
            let pin = match pin {
                Some(p) => Zeroizing::new(p.to_string()),
                None => self
                    .recall_pin(provider_id)
                    .ok_or(VaultError::PinRequired)?,
            };
            let secret = self.decrypt_row(&row, &pin).await?;
            self.remember_pin(provider_id, &pin);
            secret
        } else {
            plaintext_from(row.secret)?
        };

        self.save_key(provider_id, &plaintext, encrypt, pin).await
    }

    /// Provider ids with a stored secret.
    pub async fn list_stored_providers(&self) -> Result<Vec<String>> {
        Ok(self.backend.list().await?)
    }

    async fn get_row(&self, provider_id: &str) -> Result<SecretRow> {
        self.backend.get(provider_id).await.map_err(|e| match e {
            DbError::NotFound(_) => VaultError::KeyNotFound(provider_id.to_string()),
            other => VaultError::Db(other),
        })
    }

    async fn decrypt_row(&self, row: &SecretRow, pin: &str) -> Result<Zeroizing<String>> {
        let salt = row
            .salt
            .clone()
            .ok_or_else(|| VaultError::Corrupt("encrypted record missing salt".to_string()))?;
        let nonce = row
            .iv
            .clone()
            .ok_or_else(|| VaultError::Corrupt("encrypted record missing nonce".to_string()))?;
        let iterations = row
            .iterations
            .ok_or_else(|| VaultError::Corrupt("encrypted record missing iterations".to_string()))?;

        let mut salt_arr = [0u8; kdf::SALT_SIZE];
        if salt.len() != kdf::SALT_SIZE {
            return Err(VaultError::Corrupt("bad salt length".to_string()));
        }
        salt_arr.copy_from_slice(&salt);

        let key = derive_blocking(pin, salt_arr, iterations).await?;
        let plaintext = aead::decrypt(&key, &nonce, &row.secret, row.provider_id.as_bytes())?;
        plaintext_from(plaintext)
    }

    fn remember_pin(&self, provider_id: &str, pin: &str) {
        if let Ok(mut pins) = self.session_pins.lock() {
            pins.insert(provider_id.to_string(), Zeroizing::new(pin.to_string()));
        }
    }

    fn recall_pin(&self, provider_id: &str) -> Option<Zeroizing<String>> {
        self.session_pins
            .lock()
            .ok()
            .and_then(|pins| pins.get(provider_id).cloned())
    }

    fn forget_pin(&self, provider_id: &str) {
        if let Ok(mut pins) = self.session_pins.lock() {
            pins.remove(provider_id);
        }
    }
}

/// Run PBKDF2 on the blocking pool so the event loop stays responsive.
async fn derive_blocking(
    pin: &str,
    salt: [u8; kdf::SALT_SIZE],
    iterations: u32,
) -> Result<kdf::SecretKey> {
    let pin = Zeroizing::new(pin.as_bytes().to_vec());
    let key = tokio::task::spawn_blocking(move || kdf::derive_key(&pin, &salt, iterations))
        .await
        .map_err(|e| VaultError::Task(e.to_string()))??;
    Ok(key)
}

fn plaintext_from(bytes: Vec<u8>) -> Result<Zeroizing<String>> {
    String::from_utf8(bytes)
        .map(Zeroizing::new)
        .map_err(|_| VaultError::Corrupt("secret is not valid UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> CredentialVault {
        CredentialVault::ephemeral()
    }

    #[tokio::test]
    async fn test_save_plaintext_and_load() {
        let v = vault();
        v.save_key("together", "secret-abc", false, None)
            .await
            .expect("save");

        let meta = v.load_metadata("together").await.expect("metadata");
        assert!(meta.has_key);
        assert!(!meta.encrypted);

        let key = v.load_key("together", None).await.expect("load");
        assert_eq!(key.as_str(), "secret-abc");
    }

    #[tokio::test]
    async fn test_plaintext_load_ignores_pin() {
        let v = vault();
        v.save_key("together", "secret-abc", false, None)
            .await
            .expect("save");
        let key = v.load_key("together", Some("1234")).await.expect("load");
        assert_eq!(key.as_str(), "secret-abc");
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let v = vault();
        let result = v.save_key("together", "   ", false, None).await;
        assert!(matches!(result, Err(VaultError::EmptyKey)));
    }

    #[tokio::test]
    async fn test_encrypted_roundtrip() {
        let v = vault();
        v.save_key("p", "secret-xyz", true, Some("1234"))
            .await
            .expect("save");

        let meta = v.load_metadata("p").await.expect("metadata");
        assert!(meta.has_key);
        assert!(meta.encrypted);

        let key = v.load_key("p", Some("1234")).await.expect("load");
        assert_eq!(key.as_str(), "secret-xyz");
    }

    #[tokio::test]
    async fn test_wrong_pin_rejected() {
        let v = vault();
        v.save_key("p", "secret-xyz", true, Some("1234"))
            .await
            .expect("save");

        let result = v.load_key("p", Some("0000")).await;
        assert!(matches!(result, Err(VaultError::InvalidPin)));

        // Wrong PIN must not destroy the record.
        let key = v.load_key("p", Some("1234")).await.expect("load");
        assert_eq!(key.as_str(), "secret-xyz");
    }

    #[tokio::test]
    async fn test_missing_pin_required() {
        let v = vault();
        v.save_key("p", "secret-xyz", true, Some("1234"))
            .await
            .expect("save");
        assert!(matches!(
            v.load_key("p", None).await,
            Err(VaultError::PinRequired)
        ));
    }

    #[tokio::test]
    async fn test_absent_record_is_key_not_found() {
        let v = vault();
        assert!(matches!(
            v.load_key("nonexistent", None).await,
            Err(VaultError::KeyNotFound(_))
        ));
        let meta = v.load_metadata("nonexistent").await.expect("metadata");
        assert!(!meta.has_key);
    }

    #[tokio::test]
    async fn test_encrypt_without_pin_rejected() {
        let v = vault();
        let result = v.save_key("p", "secret", true, None).await;
        assert!(matches!(result, Err(VaultError::PinRequired)));
    }

    #[tokio::test]
    async fn test_mode_switch_roundtrip() {
        let v = vault();
        v.save_key("p", "original", false, None).await.expect("save");

        v.set_encryption_mode("p", true, Some("1234"))
            .await
            .expect("encrypt mode");
        let meta = v.load_metadata("p").await.expect("metadata");
        assert!(meta.encrypted);

        // No explicit PIN: the session's remembered PIN decrypts.
        v.set_encryption_mode("p", false, None)
            .await
            .expect("plaintext mode");

        let key = v.load_key("p", None).await.expect("load");
        assert_eq!(key.as_str(), "original");
    }

    #[tokio::test]
    async fn test_mode_switch_without_any_pin_rejected() {
        let v = vault();
        v.save_key("p", "original", false, None).await.expect("save");
        assert!(matches!(
            v.set_encryption_mode("p", true, None).await,
            Err(VaultError::PinRequired)
        ));
    }

    #[tokio::test]
    async fn test_reencrypt_uses_fresh_salt_and_nonce() {
        let v = vault();
        v.save_key("p", "secret", true, Some("1234")).await.expect("save");
        let first = v.backend.get("p").await.expect("row");

        v.save_key("p", "secret", true, Some("1234")).await.expect("resave");
        let second = v.backend.get("p").await.expect("row");

        assert_ne!(first.salt, second.salt);
        assert_ne!(first.iv, second.iv);
    }

    #[tokio::test]
    async fn test_delete_idempotent() {
        let v = vault();
        v.save_key("p", "secret", false, None).await.expect("save");
        v.delete_key("p").await.expect("delete");
        v.delete_key("p").await.expect("delete again");
        assert!(matches!(
            v.load_key("p", None).await,
            Err(VaultError::KeyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_stored_providers() {
        let v = vault();
        v.save_key("together", "a", false, None).await.expect("save");
        v.save_key("fal", "b", true, Some("1")).await.expect("save");
        assert_eq!(
            v.list_stored_providers().await.expect("list"),
            vec!["fal".to_string(), "together".to_string()]
        );
    }
}
