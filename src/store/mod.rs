//! Persistence traits and records.
//!
//! Real deployments put a database behind these traits; the engine ships
//! with [`MemoryStore`] as the reference backend. Amounts in records are
//! decimal strings, never raw base units.

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::registry::SeedToken;

/// A custodial wallet row. `encrypted_private_key` is oracle ciphertext;
/// plaintext key material never appears here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletRecord {
    pub id: Uuid,
    pub user_id: String,
    pub address: String,
    pub encrypted_private_key: Option<String>,
    pub encrypted_mnemonic: Option<String>,
    pub derivation_path: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A registry token row. The zero address marks the chain's native coin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenRecord {
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub is_native: bool,
    pub logo_url: Option<String>,
}

impl From<&SeedToken> for TokenRecord {
    fn from(seed: &SeedToken) -> Self {
        Self {
            address: seed.address.to_string(),
            symbol: seed.symbol.to_string(),
            name: seed.name.to_string(),
            decimals: seed.decimals,
            is_native: seed.is_native,
            logo_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Send,
    Receive,
    Swap,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Receive => "receive",
            Self::Swap => "swap",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "send" => Some(Self::Send),
            "receive" => Some(Self::Receive),
            "swap" => Some(Self::Swap),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }
}

/// A persisted transaction. Created only after submission succeeded, so a
/// row always carries a real hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub tx_hash: String,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub from_address: String,
    pub to_address: String,
    pub token_address: String,
    pub token_symbol: String,
    pub amount: String,
    pub to_token_address: Option<String>,
    pub to_token_symbol: Option<String>,
    pub to_amount: Option<String>,
    pub network_fee: Option<String>,
    pub block_number: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn insert_wallet(&self, wallet: &WalletRecord) -> Result<(), StoreError>;

    async fn wallet_by_id(&self, id: Uuid) -> Result<Option<WalletRecord>, StoreError>;

    async fn wallet_by_address(
        &self,
        user_id: &str,
        address: &str,
    ) -> Result<Option<WalletRecord>, StoreError>;

    async fn wallets_for_user(&self, user_id: &str) -> Result<Vec<WalletRecord>, StoreError>;

    async fn active_wallet(&self, user_id: &str) -> Result<Option<WalletRecord>, StoreError>;

    /// Clear every active flag for the user, then set the given wallet
    /// active, so at most one wallet is ever active.
    async fn set_active_wallet(&self, user_id: &str, wallet_id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn upsert_token(&self, token: &TokenRecord) -> Result<(), StoreError>;

    async fn token_by_address(&self, address: &str) -> Result<Option<TokenRecord>, StoreError>;

    async fn token_by_symbol(&self, symbol: &str) -> Result<Option<TokenRecord>, StoreError>;

    async fn list_tokens(&self) -> Result<Vec<TokenRecord>, StoreError>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn insert_transaction(&self, tx: &TransactionRecord) -> Result<(), StoreError>;

    async fn transaction_by_hash(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionRecord>, StoreError>;

    /// Newest first.
    async fn transactions_for_wallet(
        &self,
        wallet_id: Uuid,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Move a pending transaction to its terminal state. Terminal rows are
    /// left untouched; status never regresses.
    async fn update_transaction_outcome(
        &self,
        tx_hash: &str,
        status: TransactionStatus,
        block_number: Option<u64>,
        network_fee: Option<String>,
    ) -> Result<(), StoreError>;
}

/// Everything the engine needs from persistence, in one object-safe bound.
pub trait Store: WalletStore + TokenStore + TransactionStore {}

impl<T: WalletStore + TokenStore + TransactionStore> Store for T {}

/// Seed the registry's well-known tokens. Idempotent.
pub async fn seed_default_tokens(store: &dyn TokenStore) -> Result<(), StoreError> {
    for seed in crate::registry::SEED_TOKENS {
        store.upsert_token(&TokenRecord::from(seed)).await?;
    }
    Ok(())
}
