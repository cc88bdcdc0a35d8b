//! # atelier-crypto
//!
//! Cryptographic primitives for secret-at-rest storage.
//!
//! The suite is fixed — no algorithm negotiation:
//!
//! - [`kdf`] — PBKDF2-HMAC-SHA256 key derivation with per-record salt and
//!   iteration count
//! - [`aead`] — ChaCha20-Poly1305 AEAD encryption (RFC 8439)

pub mod aead;
pub mod kdf;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// AEAD decryption failed (authentication tag mismatch). Surfaced when
    /// the PIN is wrong or the record is corrupted. Distinct from
    /// "record not found", which never reaches this crate.
    #[error("AEAD decryption failed")]
    AeadDecryption,

    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Invalid salt or nonce length.
    #[error("invalid {what} length: expected {expected}, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, CryptoError>;
