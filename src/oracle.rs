//! Key-encryption oracle.
//!
//! Wallet private keys and mnemonics are stored as oracle ciphertext only.
//! The trait keeps the engine agnostic of where decryption actually happens;
//! [`AesGcmOracle`] is the in-process implementation. Payload format:
//! base64(nonce ‖ ciphertext) with a random 12-byte nonce per encryption.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hkdf::Hkdf;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::config::OracleConfig;
use crate::error::KeyError;

const NONCE_LEN: usize = 12;
const HKDF_CONTEXT: &[u8] = b"wallet-key-encryption-v1";

/// Round-trip probe for `health_check`.
const HEALTH_PROBE: &str = "test-private-key-12345";

#[async_trait]
pub trait EncryptionOracle: Send + Sync {
    /// Encrypt key material. Errors never echo the plaintext.
    async fn encrypt(&self, plaintext: &str) -> Result<String, KeyError>;

    /// Decrypt a stored payload back into key material.
    async fn decrypt(&self, payload: &str) -> Result<SecretString, KeyError>;

    /// Verify the oracle can round-trip material before it is trusted with
    /// real keys.
    async fn health_check(&self) -> Result<(), KeyError>;
}

/// AES-256-GCM oracle keyed by HKDF-SHA256 over the configured master key.
pub struct AesGcmOracle {
    key: [u8; 32],
}

impl AesGcmOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, KeyError> {
        let hkdf = Hkdf::<Sha256>::new(None, config.master_key.expose_secret().as_bytes());
        let mut key = [0u8; 32];
        hkdf.expand(HKDF_CONTEXT, &mut key)
            .map_err(|_| KeyError::InvalidKeyMaterial {
                reason: "master key derivation failed".to_string(),
            })?;
        Ok(Self { key })
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key))
    }
}

#[async_trait]
impl EncryptionOracle for AesGcmOracle {
    async fn encrypt(&self, plaintext: &str) -> Result<String, KeyError> {
        if plaintext.is_empty() {
            return Err(KeyError::EncryptionFailed {
                reason: "refusing to encrypt empty material".to_string(),
            });
        }

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher()
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| KeyError::EncryptionFailed {
                reason: "cipher rejected the payload".to_string(),
            })?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(payload))
    }

    async fn decrypt(&self, payload: &str) -> Result<SecretString, KeyError> {
        if payload.is_empty() {
            return Err(KeyError::DecryptionFailed {
                reason: "payload is empty".to_string(),
            });
        }

        let bytes = BASE64
            .decode(payload)
            .map_err(|_| KeyError::DecryptionFailed {
                reason: "payload is not valid base64".to_string(),
            })?;
        if bytes.len() <= NONCE_LEN {
            return Err(KeyError::DecryptionFailed {
                reason: "payload shorter than nonce".to_string(),
            });
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher()
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| KeyError::DecryptionFailed {
                reason: "authentication failed".to_string(),
            })?;
        let plaintext = String::from_utf8(plaintext).map_err(|_| KeyError::DecryptionFailed {
            reason: "decrypted material is not UTF-8".to_string(),
        })?;
        Ok(SecretString::from(plaintext))
    }

    async fn health_check(&self) -> Result<(), KeyError> {
        let payload = self.encrypt(HEALTH_PROBE).await?;
        let recovered = self.decrypt(&payload).await?;
        if recovered.expose_secret() != HEALTH_PROBE {
            return Err(KeyError::DecryptionFailed {
                reason: "round-trip probe mismatch".to_string(),
            });
        }
        Ok(())
    }
}
