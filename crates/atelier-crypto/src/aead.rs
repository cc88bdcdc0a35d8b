//! ChaCha20-Poly1305 AEAD encryption (RFC 8439).
//!
//! Seals provider secrets at rest. The provider id is bound as additional
//! authenticated data, so a ciphertext copied under a different provider's
//! record fails authentication instead of decrypting.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::RngCore;

use crate::kdf::SecretKey;
use crate::{CryptoError, Result};

/// Nonce size for ChaCha20-Poly1305 (96 bits = 12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (128 bits = 16 bytes).
pub const TAG_SIZE: usize = 16;

/// Encrypt a secret with ChaCha20-Poly1305.
///
/// # Arguments
///
/// * `key` - Derived symmetric key
/// * `nonce` - 12-byte nonce, fresh per save (never reused across records
///   or re-saves of the same record)
/// * `plaintext` - Secret bytes
/// * `aad` - Additional authenticated data (the provider id)
///
/// # Returns
///
/// Ciphertext with appended 16-byte authentication tag.
pub fn encrypt(key: &SecretKey, nonce: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let nonce = check_nonce(nonce)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CryptoError::AeadDecryption)
}

/// Decrypt a secret with ChaCha20-Poly1305.
///
/// Fails with [`CryptoError::AeadDecryption`] on a wrong key (wrong PIN),
/// tampered ciphertext, or mismatched AAD.
pub fn decrypt(key: &SecretKey, nonce: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let nonce = check_nonce(nonce)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::AeadDecryption)
}

/// Generate a random 12-byte nonce.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

fn check_nonce(nonce: &[u8]) -> Result<&[u8]> {
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidLength {
            what: "nonce",
            expected: NONCE_SIZE,
            actual: nonce.len(),
        });
    }
    Ok(nonce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf;

    fn test_key(pin: &[u8]) -> SecretKey {
        kdf::derive_key(pin, b"1234567890123456", 1000).expect("derive")
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key(b"1234");
        let nonce = generate_nonce();

        let ciphertext = encrypt(&key, &nonce, b"secret-abc", b"together").expect("encrypt");
        let plaintext = decrypt(&key, &nonce, &ciphertext, b"together").expect("decrypt");
        assert_eq!(plaintext, b"secret-abc");
    }

    #[test]
    fn test_ciphertext_has_tag() {
        let key = test_key(b"1234");
        let nonce = generate_nonce();

        let ciphertext = encrypt(&key, &nonce, b"secret", b"").expect("encrypt");
        assert_eq!(ciphertext.len(), b"secret".len() + TAG_SIZE);
    }

    #[test]
    fn test_wrong_key_fails() {
        let nonce = generate_nonce();
        let ciphertext = encrypt(&test_key(b"1234"), &nonce, b"secret", b"p").expect("encrypt");

        let result = decrypt(&test_key(b"0000"), &nonce, &ciphertext, b"p");
        assert!(matches!(result, Err(CryptoError::AeadDecryption)));
    }

    #[test]
    fn test_wrong_aad_fails() {
        let key = test_key(b"1234");
        let nonce = generate_nonce();
        let ciphertext = encrypt(&key, &nonce, b"secret", b"together").expect("encrypt");

        let result = decrypt(&key, &nonce, &ciphertext, b"openai");
        assert!(matches!(result, Err(CryptoError::AeadDecryption)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = test_key(b"1234");
        let nonce = generate_nonce();
        let mut ciphertext = encrypt(&key, &nonce, b"secret", b"p").expect("encrypt");
        if let Some(byte) = ciphertext.first_mut() {
            *byte ^= 0xFF;
        }

        assert!(decrypt(&key, &nonce, &ciphertext, b"p").is_err());
    }

    #[test]
    fn test_bad_nonce_length_rejected() {
        let key = test_key(b"1234");
        let result = encrypt(&key, b"short", b"secret", b"");
        assert!(matches!(
            result,
            Err(CryptoError::InvalidLength { what: "nonce", .. })
        ));
    }
}
