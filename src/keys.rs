//! Signing keys and deterministic key resolution.
//!
//! A [`LocalSigner`] pairs a secp256k1 key with its derived address. The
//! [`KeyAccessor`] resolves a wallet's signer in exactly one order: the
//! ciphertext already attached to the in-memory record, then the stored row
//! (cached back onto the record). Resolution fails before any chain
//! interaction, and the derived address must match the wallet's address.

use std::fmt;
use std::sync::Arc;

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use secrecy::{ExposeSecret, SecretString};

use crate::chain::abi::keccak256;
use crate::error::{KeyError, Result};
use crate::oracle::EncryptionOracle;
use crate::registry::same_address;
use crate::store::{Store, WalletRecord, WalletStore};

/// BIP-44 path for the first account, matching common EVM wallets.
pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

/// A resolved signing key and its address. Never serialized; the address is
/// the only part that may be logged.
pub struct LocalSigner {
    key: SigningKey,
    address: String,
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl LocalSigner {
    fn from_signing_key(key: SigningKey) -> Self {
        let address = derive_address(&key);
        Self { key, address }
    }

    /// Build a signer from a hex-encoded 32-byte private key, with or
    /// without the `0x` prefix. Errors never echo the input.
    pub fn from_private_key_hex(raw: &str) -> std::result::Result<Self, KeyError> {
        let trimmed = raw.trim();
        let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if body.len() != 64 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(KeyError::InvalidKeyMaterial {
                reason: "expected a 32-byte hex private key".to_string(),
            });
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(body, &mut bytes).map_err(|_| KeyError::InvalidKeyMaterial {
            reason: "private key is not valid hex".to_string(),
        })?;
        let key = SigningKey::from_slice(&bytes).map_err(|_| KeyError::InvalidKeyMaterial {
            reason: "private key scalar out of range".to_string(),
        })?;
        Ok(Self::from_signing_key(key))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.key
    }

    /// Hex form for oracle encryption at wallet creation/import time.
    pub fn private_key_hex(&self) -> SecretString {
        SecretString::from(format!("0x{}", hex::encode(self.key.to_bytes())))
    }
}

/// Address = last 20 bytes of keccak256 over the uncompressed public key
/// without its SEC1 tag byte, lowercase hex.
fn derive_address(key: &SigningKey) -> String {
    let point = key.verifying_key().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Derive a signer from a BIP-39 phrase at the given BIP-32 path.
pub fn signer_from_mnemonic(
    phrase: &str,
    path: &str,
) -> std::result::Result<LocalSigner, KeyError> {
    let mnemonic =
        bip39::Mnemonic::parse(phrase.trim()).map_err(|e| KeyError::InvalidMnemonic {
            reason: e.to_string(),
        })?;
    let seed = mnemonic.to_seed("");
    let derivation: bip32::DerivationPath =
        path.parse().map_err(|_| KeyError::InvalidMnemonic {
            reason: format!("'{path}' is not a derivation path"),
        })?;
    let xprv =
        bip32::XPrv::derive_from_path(seed, &derivation).map_err(|e| KeyError::InvalidMnemonic {
            reason: e.to_string(),
        })?;
    Ok(LocalSigner::from_signing_key(xprv.private_key().clone()))
}

/// Freshly generated wallet material.
pub struct GeneratedWallet {
    pub signer: LocalSigner,
    pub mnemonic: SecretString,
    pub derivation_path: String,
}

/// Generate a 12-word mnemonic and derive its first account.
pub fn generate_wallet() -> std::result::Result<GeneratedWallet, KeyError> {
    let mnemonic = bip39::Mnemonic::generate(12).map_err(|e| KeyError::InvalidMnemonic {
        reason: e.to_string(),
    })?;
    let phrase = mnemonic.to_string();
    let signer = signer_from_mnemonic(&phrase, DEFAULT_DERIVATION_PATH)?;
    Ok(GeneratedWallet {
        signer,
        mnemonic: SecretString::from(phrase),
        derivation_path: DEFAULT_DERIVATION_PATH.to_string(),
    })
}

/// Imported wallet material: either a raw private key or a mnemonic.
pub struct ImportedSigner {
    pub signer: LocalSigner,
    pub mnemonic: Option<SecretString>,
    pub derivation_path: Option<String>,
}

/// A `0x`-prefixed 66-char string is treated as a private key; anything
/// else is parsed as a mnemonic phrase.
pub fn looks_like_private_key(secret: &str) -> bool {
    let trimmed = secret.trim();
    trimmed.starts_with("0x") && trimmed.len() == 66
}

pub fn import_signer(secret: &str) -> std::result::Result<ImportedSigner, KeyError> {
    let trimmed = secret.trim();
    if looks_like_private_key(trimmed) {
        Ok(ImportedSigner {
            signer: LocalSigner::from_private_key_hex(trimmed)?,
            mnemonic: None,
            derivation_path: None,
        })
    } else {
        Ok(ImportedSigner {
            signer: signer_from_mnemonic(trimmed, DEFAULT_DERIVATION_PATH)?,
            mnemonic: Some(SecretString::from(trimmed.to_string())),
            derivation_path: Some(DEFAULT_DERIVATION_PATH.to_string()),
        })
    }
}

/// Resolves decrypted signers for wallets.
pub struct KeyAccessor {
    store: Arc<dyn Store>,
    oracle: Arc<dyn EncryptionOracle>,
}

impl KeyAccessor {
    pub fn new(store: Arc<dyn Store>, oracle: Arc<dyn EncryptionOracle>) -> Self {
        Self { store, oracle }
    }

    /// Resolve the signer for a wallet.
    ///
    /// Ciphertext attached to the in-memory record wins; otherwise the
    /// stored row is fetched once and its ciphertext cached onto the
    /// record. No ciphertext anywhere is `KeyNotFound`; oracle failure is
    /// `DecryptionFailed`; a derived address that does not match the
    /// record aborts with `AddressMismatch`.
    pub async fn resolve_signer(&self, wallet: &mut WalletRecord) -> Result<LocalSigner> {
        let ciphertext = match &wallet.encrypted_private_key {
            Some(ciphertext) => ciphertext.clone(),
            None => {
                let stored = self.store.wallet_by_id(wallet.id).await?;
                let ciphertext = stored
                    .and_then(|row| row.encrypted_private_key)
                    .ok_or_else(|| KeyError::NotFound {
                        wallet_id: wallet.id.to_string(),
                    })?;
                wallet.encrypted_private_key = Some(ciphertext.clone());
                ciphertext
            }
        };

        let plaintext = self.oracle.decrypt(&ciphertext).await?;
        let signer = LocalSigner::from_private_key_hex(plaintext.expose_secret())?;

        if !same_address(signer.address(), &wallet.address) {
            return Err(KeyError::AddressMismatch {
                expected: wallet.address.clone(),
                derived: signer.address().to_string(),
            }
            .into());
        }
        Ok(signer)
    }
}
