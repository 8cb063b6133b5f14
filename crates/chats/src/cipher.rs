//! At-rest encryption for message bodies.
//!
//! Stored form is `enc:v1:` followed by base64 of the 12-byte nonce and the
//! ChaCha20-Poly1305 ciphertext. Rows written before encryption was enabled
//! carry no prefix and are read back unchanged.

use std::fmt;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use chacha20poly1305::aead::rand_core::RngCore;
use chacha20poly1305::aead::{Aead, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use zoro_config::EncryptionConfig;

pub const ENCRYPTED_PREFIX: &str = "enc:v1:";

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("stored ciphertext is not valid base64")]
    InvalidEncoding,
    #[error("decrypted message is not valid UTF-8")]
    InvalidUtf8,
    #[error("key file must contain 32 bytes")]
    InvalidKeyLength,
    #[error("key file error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
pub struct MessageCipher {
    key: [u8; KEY_LEN],
}

impl fmt::Debug for MessageCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageCipher").finish_non_exhaustive()
    }
}

impl MessageCipher {
    pub fn from_key(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Derives the key as the SHA-256 of an operator-supplied secret.
    pub fn from_secret(secret: &str) -> Self {
        Self {
            key: Sha256::digest(secret.as_bytes()).into(),
        }
    }

    /// Loads a base64 key from `path`, generating and writing a new one when
    /// the file does not exist yet.
    pub fn from_key_file(path: &Path) -> Result<Self, CipherError> {
        if path.exists() {
            let encoded = std::fs::read_to_string(path)?;
            let bytes = STANDARD
                .decode(encoded.trim())
                .map_err(|_| CipherError::InvalidEncoding)?;
            let key: [u8; KEY_LEN] = bytes
                .try_into()
                .map_err(|_| CipherError::InvalidKeyLength)?;
            return Ok(Self { key });
        }

        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, STANDARD.encode(key))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        info!(path = %path.display(), "generated message encryption key");
        Ok(Self { key })
    }

    /// An explicit secret wins over the key file.
    pub fn from_config(config: &EncryptionConfig) -> Result<Self, CipherError> {
        match config.key.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => Ok(Self::from_secret(secret)),
            _ => Self::from_key_file(Path::new(&config.key_file)),
        }
    }

    pub fn is_encrypted(stored: &str) -> bool {
        stored.starts_with(ENCRYPTED_PREFIX)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let cipher = ChaCha20Poly1305::new((&self.key).into());
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(format!("{ENCRYPTED_PREFIX}{}", STANDARD.encode(combined)))
    }

    pub fn decrypt(&self, stored: &str) -> Result<String, CipherError> {
        let Some(encoded) = stored.strip_prefix(ENCRYPTED_PREFIX) else {
            return Ok(stored.to_string());
        };

        let combined = STANDARD
            .decode(encoded)
            .map_err(|_| CipherError::InvalidEncoding)?;
        if combined.len() < NONCE_LEN {
            return Err(CipherError::InvalidEncoding);
        }

        let (nonce, ciphertext) = combined.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new((&self.key).into());
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypts_with_prefix_and_fresh_nonce() {
        let cipher = MessageCipher::from_secret("correct horse battery staple");
        let a = cipher.encrypt("hello").unwrap();
        let b = cipher.encrypt("hello").unwrap();

        assert!(MessageCipher::is_encrypted(&a));
        assert_ne!(a, b);
        assert_eq!(cipher.decrypt(&a).unwrap(), "hello");
        assert_eq!(cipher.decrypt(&b).unwrap(), "hello");
    }

    #[test]
    fn plaintext_rows_pass_through() {
        let cipher = MessageCipher::from_secret("secret");
        assert_eq!(cipher.decrypt("legacy message").unwrap(), "legacy message");
    }

    #[test]
    fn wrong_key_or_tampering_is_rejected() {
        let stored = MessageCipher::from_secret("one").encrypt("hello").unwrap();
        assert!(matches!(
            MessageCipher::from_secret("two").decrypt(&stored),
            Err(CipherError::DecryptionFailed)
        ));

        let cipher = MessageCipher::from_secret("one");
        let mut bytes = STANDARD
            .decode(stored.strip_prefix(ENCRYPTED_PREFIX).unwrap())
            .unwrap();
        if let Some(last) = bytes.last_mut() {
            *last ^= 0x01;
        }
        let tampered = format!("{ENCRYPTED_PREFIX}{}", STANDARD.encode(bytes));
        assert!(cipher.decrypt(&tampered).is_err());

        assert!(matches!(
            cipher.decrypt("enc:v1:!!!"),
            Err(CipherError::InvalidEncoding)
        ));
    }

    #[test]
    fn key_file_is_created_once_and_reused() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("keys").join("message.key");

        let first = MessageCipher::from_key_file(&path).unwrap();
        assert!(path.exists());
        let second = MessageCipher::from_key_file(&path).unwrap();

        let stored = first.encrypt("persisted").unwrap();
        assert_eq!(second.decrypt(&stored).unwrap(), "persisted");
    }

    #[test]
    fn config_secret_takes_precedence_over_key_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = EncryptionConfig {
            key: Some("shared".to_string()),
            key_file: dir.path().join("unused.key").display().to_string(),
        };

        let cipher = MessageCipher::from_config(&config).unwrap();
        let stored = cipher.encrypt("hi").unwrap();
        assert_eq!(MessageCipher::from_secret("shared").decrypt(&stored).unwrap(), "hi");
        assert!(!dir.path().join("unused.key").exists());
    }

    #[test]
    fn short_key_file_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("short.key");
        std::fs::write(&path, STANDARD.encode([1u8; 8])).unwrap();
        assert!(matches!(
            MessageCipher::from_key_file(&path),
            Err(CipherError::InvalidKeyLength)
        ));
    }
}
