//! # atelier-vault
//!
//! The credential vault: stores one provider secret per provider id in the
//! local database, either as plaintext or encrypted under a PIN-derived key.
//!
//! The vault never logs or transmits plaintext secrets or PINs, and it
//! provides no internal write serialization: callers must not issue
//! overlapping save/delete operations for the same provider id (the UI
//! disables its save control while a save is in flight). Last write wins.
//!
//! ## Modules
//!
//! - [`record`] — Secret metadata projection
//! - [`store`] — Durable/ephemeral storage backends
//! - [`vault`] — The [`CredentialVault`] operations

pub mod record;
pub mod store;
pub mod vault;

pub use record::SecretMetadata;
pub use vault::CredentialVault;

use atelier_crypto::CryptoError;
use atelier_db::DbError;

/// Error types for vault operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// A blank secret was passed to save.
    #[error("secret must not be empty")]
    EmptyKey,

    /// The record is encrypted and no PIN was supplied, or encryption was
    /// requested without a PIN.
    #[error("a PIN is required for this operation")]
    PinRequired,

    /// Decryption failed — wrong PIN (or a tampered record).
    #[error("invalid PIN")]
    InvalidPin,

    /// No secret is stored for this provider.
    #[error("no secret stored for provider '{0}'")]
    KeyNotFound(String),

    /// The durable store cannot be opened in this environment.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A stored record violates its own invariants (e.g. encrypted flag set
    /// but salt/nonce missing). Distinct from a wrong PIN.
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),

    /// The key-derivation task was cancelled or panicked.
    #[error("key derivation task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Crypto(CryptoError),
}

impl From<CryptoError> for VaultError {
    fn from(e: CryptoError) -> Self {
        match e {
            // Authentication failure means the PIN was wrong; everything
            // else is a real crypto-layer error.
            CryptoError::AeadDecryption => VaultError::InvalidPin,
            other => VaultError::Crypto(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
