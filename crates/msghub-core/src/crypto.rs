//! Content encryption for stored messages.
//!
//! The persistence path optionally encrypts message content before the
//! database insert. The envelope is ChaCha20-Poly1305 with a deployment-wide
//! key and nonce, base64-encoded for storage in a text column.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};

use crate::error::AppError;
use crate::result::AppResult;

/// Key length in bytes.
pub const KEY_SIZE: usize = 32;

/// Nonce length in bytes.
pub const NONCE_SIZE: usize = 12;

/// Symmetric cipher for message content.
///
/// Key and nonce are configured out of band and supplied base64-encoded.
pub struct ContentCipher {
    cipher: ChaCha20Poly1305,
    nonce: [u8; NONCE_SIZE],
}

impl std::fmt::Debug for ContentCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCipher").finish()
    }
}

impl ContentCipher {
    /// Build a cipher from base64-encoded key and nonce material.
    pub fn new(key_b64: &str, nonce_b64: &str) -> AppResult<Self> {
        let key_bytes = BASE64
            .decode(key_b64)
            .map_err(|e| AppError::configuration(format!("Invalid encryption key: {e}")))?;
        if key_bytes.len() != KEY_SIZE {
            return Err(AppError::configuration(format!(
                "Encryption key must be {KEY_SIZE} bytes, got {}",
                key_bytes.len()
            )));
        }

        let nonce_bytes = BASE64
            .decode(nonce_b64)
            .map_err(|e| AppError::configuration(format!("Invalid encryption IV: {e}")))?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(AppError::configuration(format!(
                "Encryption IV must be {NONCE_SIZE} bytes, got {}",
                nonce_bytes.len()
            )));
        }

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&nonce_bytes);

        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key_bytes)),
            nonce,
        })
    }

    /// Encrypt plaintext and return the base64-encoded ciphertext.
    pub fn encrypt(&self, plaintext: &str) -> AppResult<String> {
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&self.nonce), plaintext.as_bytes())
            .map_err(|e| AppError::internal(format!("Encryption failed: {e}")))?;

        Ok(BASE64.encode(ciphertext))
    }

    /// Decrypt base64-encoded ciphertext back to plaintext.
    pub fn decrypt(&self, content_b64: &str) -> AppResult<String> {
        let ciphertext = BASE64
            .decode(content_b64)
            .map_err(|e| AppError::validation(format!("Content is not valid base64: {e}")))?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&self.nonce), ciphertext.as_slice())
            .map_err(|e| {
                AppError::internal(format!(
                    "Decryption failed (wrong key or corrupted data): {e}"
                ))
            })?;

        String::from_utf8(plaintext)
            .map_err(|e| AppError::validation(format!("Decrypted content is not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> ContentCipher {
        let key = BASE64.encode([0x42u8; KEY_SIZE]);
        let nonce = BASE64.encode([0x24u8; NONCE_SIZE]);
        ContentCipher::new(&key, &nonce).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = test_cipher();

        let ciphertext = cipher.encrypt("hello").unwrap();
        assert_ne!(ciphertext, "hello");
        assert!(BASE64.decode(&ciphertext).is_ok());

        assert_eq!(cipher.decrypt(&ciphertext).unwrap(), "hello");
    }

    #[test]
    fn test_empty_plaintext() {
        let cipher = test_cipher();
        let ciphertext = cipher.encrypt("").unwrap();
        assert_eq!(cipher.decrypt(&ciphertext).unwrap(), "");
    }

    #[test]
    fn test_wrong_key_fails() {
        let cipher = test_cipher();
        let other = ContentCipher::new(
            &BASE64.encode([0x11u8; KEY_SIZE]),
            &BASE64.encode([0x24u8; NONCE_SIZE]),
        )
        .unwrap();

        let ciphertext = cipher.encrypt("secret").unwrap();
        assert!(other.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn test_rejects_short_key() {
        let key = BASE64.encode([0u8; 16]);
        let nonce = BASE64.encode([0u8; NONCE_SIZE]);
        assert!(ContentCipher::new(&key, &nonce).is_err());
    }

    #[test]
    fn test_rejects_invalid_base64_material() {
        assert!(ContentCipher::new("not base64 at all!", "also not").is_err());
    }
}
