//! Badge payload encryption at rest.
//!
//! Stored badge lists are encrypted with ChaCha20-Poly1305 (authenticated
//! encryption) under a single 32-byte key from process configuration. The
//! stored form is `hex(nonce):hex(ciphertext)` with a fresh random nonce per
//! encryption.

use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::config::ENCRYPTION_KEY_LEN;
use crate::types::{BadgewayError, Result};

/// Nonce length for ChaCha20-Poly1305 (12 bytes)
pub const NONCE_LEN: usize = 12;

/// Symmetric cipher for stored badge payloads
#[derive(Clone)]
pub struct BadgeCipher {
    cipher: ChaCha20Poly1305,
}

impl BadgeCipher {
    /// Create a cipher from the configured key.
    ///
    /// The key must be exactly 32 bytes; callers validate this at startup.
    pub fn new(key: &str) -> Result<Self> {
        if key.len() != ENCRYPTION_KEY_LEN {
            return Err(BadgewayError::Config(format!(
                "encryption key must be {} bytes (got {})",
                ENCRYPTION_KEY_LEN,
                key.len()
            )));
        }
        let key_bytes = Zeroizing::new(key.as_bytes().to_vec());
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key_bytes));
        Ok(Self { cipher })
    }

    /// Encrypt a plaintext payload to the `hex(nonce):hex(ciphertext)` form
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| BadgewayError::Crypto(format!("Encryption failed: {e}")))?;

        Ok(format!("{}:{}", hex::encode(nonce), hex::encode(ciphertext)))
    }

    /// Decrypt a stored `hex(nonce):hex(ciphertext)` payload
    pub fn decrypt(&self, stored: &str) -> Result<String> {
        let (nonce_hex, cipher_hex) = stored
            .split_once(':')
            .ok_or_else(|| BadgewayError::Crypto("Malformed encrypted payload".into()))?;

        let nonce = hex::decode(nonce_hex)
            .map_err(|e| BadgewayError::Crypto(format!("Invalid nonce encoding: {e}")))?;
        if nonce.len() != NONCE_LEN {
            return Err(BadgewayError::Crypto(format!(
                "Invalid nonce length: expected {}, got {}",
                NONCE_LEN,
                nonce.len()
            )));
        }
        let ciphertext = hex::decode(cipher_hex)
            .map_err(|e| BadgewayError::Crypto(format!("Invalid ciphertext encoding: {e}")))?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| BadgewayError::Crypto("Decryption failed (wrong key or tampered data)".into()))?;

        String::from_utf8(plaintext)
            .map_err(|e| BadgewayError::Crypto(format!("Decrypted payload is not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = BadgeCipher::new(TEST_KEY).unwrap();
        let plaintext = r#"[{"id":"123","name":"50 Days Badge 2024"}]"#;

        let stored = cipher.encrypt(plaintext).unwrap();
        assert!(stored.contains(':'));

        let decrypted = cipher.decrypt(&stored).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_fresh_nonce_per_encryption() {
        let cipher = BadgeCipher::new(TEST_KEY).unwrap();
        let a = cipher.encrypt("same payload").unwrap();
        let b = cipher.encrypt("same payload").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let cipher = BadgeCipher::new(TEST_KEY).unwrap();
        let stored = cipher.encrypt("secret badges").unwrap();

        let other = BadgeCipher::new("fedcba9876543210fedcba9876543210").unwrap();
        assert!(other.decrypt(&stored).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = BadgeCipher::new(TEST_KEY).unwrap();
        let stored = cipher.encrypt("secret badges").unwrap();

        // Flip the last hex digit of the ciphertext
        let mut tampered = stored.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });
        assert!(cipher.decrypt(&tampered).is_err());
    }

    #[test]
    fn test_malformed_payload_rejected() {
        let cipher = BadgeCipher::new(TEST_KEY).unwrap();
        assert!(cipher.decrypt("no-separator").is_err());
        assert!(cipher.decrypt("zzzz:zzzz").is_err());
        assert!(cipher.decrypt("abcd:abcd").is_err()); // nonce too short
    }

    #[test]
    fn test_wrong_key_length_rejected() {
        assert!(BadgeCipher::new("short").is_err());
        assert!(BadgeCipher::new(TEST_KEY).is_ok());
    }
}
