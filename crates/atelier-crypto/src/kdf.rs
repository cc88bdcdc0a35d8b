//! PBKDF2-HMAC-SHA256 key derivation.
//!
//! Derives the symmetric key that encrypts a provider secret at rest from
//! the user's PIN. The salt is random per record and the iteration count is
//! stored alongside the record, so old records keep decrypting if the
//! default ever changes.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{CryptoError, Result};

/// Salt size in bytes, random per save.
pub const SALT_SIZE: usize = 16;

/// Derived key size (256 bits).
pub const KEY_SIZE: usize = 32;

/// Default PBKDF2 iteration count. Chosen to resist offline brute force
/// while remaining interactively fast.
pub const DEFAULT_ITERATIONS: u32 = 250_000;

/// A derived symmetric key. Zeroed on drop.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct SecretKey {
    bytes: [u8; KEY_SIZE],
}

impl SecretKey {
    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

/// Derive a symmetric key from a PIN.
///
/// # Arguments
///
/// * `pin` - The user's PIN (never stored, never transmitted)
/// * `salt` - Random 16-byte salt stored alongside the record
/// * `iterations` - PBKDF2 iteration count stored alongside the record
pub fn derive_key(pin: &[u8], salt: &[u8], iterations: u32) -> Result<SecretKey> {
    if salt.len() != SALT_SIZE {
        return Err(CryptoError::InvalidLength {
            what: "salt",
            expected: SALT_SIZE,
            actual: salt.len(),
        });
    }
    if iterations == 0 {
        return Err(CryptoError::KeyDerivation(
            "iteration count must be non-zero".to_string(),
        ));
    }

    let mut bytes = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(pin, salt, iterations, &mut bytes);
    Ok(SecretKey { bytes })
}

/// Generate a random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}
