//! In-memory store backend (for testing and single-process deployments).

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    TokenRecord, TokenStore, TransactionRecord, TransactionStatus, TransactionStore, WalletRecord,
    WalletStore,
};
use crate::error::StoreError;
use crate::registry::{normalize_address, same_address};

#[derive(Default)]
pub struct MemoryStore {
    wallets: RwLock<Vec<WalletRecord>>,
    tokens: RwLock<Vec<TokenRecord>>,
    transactions: RwLock<Vec<TransactionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn insert_wallet(&self, wallet: &WalletRecord) -> Result<(), StoreError> {
        let mut wallets = self.wallets.write().await;
        if wallets
            .iter()
            .any(|w| w.user_id == wallet.user_id && same_address(&w.address, &wallet.address))
        {
            return Err(StoreError::Conflict(format!(
                "wallet {} already exists for user {}",
                wallet.address, wallet.user_id
            )));
        }
        wallets.push(wallet.clone());
        Ok(())
    }

    async fn wallet_by_id(&self, id: Uuid) -> Result<Option<WalletRecord>, StoreError> {
        let wallets = self.wallets.read().await;
        Ok(wallets.iter().find(|w| w.id == id).cloned())
    }

    async fn wallet_by_address(
        &self,
        user_id: &str,
        address: &str,
    ) -> Result<Option<WalletRecord>, StoreError> {
        let wallets = self.wallets.read().await;
        Ok(wallets
            .iter()
            .find(|w| w.user_id == user_id && same_address(&w.address, address))
            .cloned())
    }

    async fn wallets_for_user(&self, user_id: &str) -> Result<Vec<WalletRecord>, StoreError> {
        let wallets = self.wallets.read().await;
        Ok(wallets
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn active_wallet(&self, user_id: &str) -> Result<Option<WalletRecord>, StoreError> {
        let wallets = self.wallets.read().await;
        Ok(wallets
            .iter()
            .find(|w| w.user_id == user_id && w.is_active)
            .cloned())
    }

    async fn set_active_wallet(&self, user_id: &str, wallet_id: Uuid) -> Result<(), StoreError> {
        let mut wallets = self.wallets.write().await;
        if !wallets
            .iter()
            .any(|w| w.user_id == user_id && w.id == wallet_id)
        {
            return Err(StoreError::NotFound {
                entity: "wallet".to_string(),
                id: wallet_id.to_string(),
            });
        }
        for wallet in wallets.iter_mut().filter(|w| w.user_id == user_id) {
            wallet.is_active = wallet.id == wallet_id;
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn upsert_token(&self, token: &TokenRecord) -> Result<(), StoreError> {
        let mut tokens = self.tokens.write().await;
        let mut stored = token.clone();
        stored.address = normalize_address(&stored.address);
        match tokens
            .iter_mut()
            .find(|t| same_address(&t.address, &stored.address))
        {
            Some(existing) => *existing = stored,
            None => tokens.push(stored),
        }
        Ok(())
    }

    async fn token_by_address(&self, address: &str) -> Result<Option<TokenRecord>, StoreError> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .iter()
            .find(|t| same_address(&t.address, address))
            .cloned())
    }

    async fn token_by_symbol(&self, symbol: &str) -> Result<Option<TokenRecord>, StoreError> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol.trim()))
            .cloned())
    }

    async fn list_tokens(&self) -> Result<Vec<TokenRecord>, StoreError> {
        let tokens = self.tokens.read().await;
        Ok(tokens.clone())
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn insert_transaction(&self, tx: &TransactionRecord) -> Result<(), StoreError> {
        let mut transactions = self.transactions.write().await;
        if transactions
            .iter()
            .any(|t| t.tx_hash.eq_ignore_ascii_case(&tx.tx_hash))
        {
            return Err(StoreError::Conflict(format!(
                "transaction {} already recorded",
                tx.tx_hash
            )));
        }
        transactions.push(tx.clone());
        Ok(())
    }

    async fn transaction_by_hash(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .iter()
            .find(|t| t.tx_hash.eq_ignore_ascii_case(tx_hash))
            .cloned())
    }

    async fn transactions_for_wallet(
        &self,
        wallet_id: Uuid,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let transactions = self.transactions.read().await;
        let mut rows: Vec<TransactionRecord> = transactions
            .iter()
            .filter(|t| t.wallet_id == wallet_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn update_transaction_outcome(
        &self,
        tx_hash: &str,
        status: TransactionStatus,
        block_number: Option<u64>,
        network_fee: Option<String>,
    ) -> Result<(), StoreError> {
        let mut transactions = self.transactions.write().await;
        let row = transactions
            .iter_mut()
            .find(|t| t.tx_hash.eq_ignore_ascii_case(tx_hash))
            .ok_or_else(|| StoreError::NotFound {
                entity: "transaction".to_string(),
                id: tx_hash.to_string(),
            })?;
        // terminal rows never regress
        if row.status.is_terminal() {
            return Ok(());
        }
        row.status = status;
        if block_number.is_some() {
            row.block_number = block_number;
        }
        if network_fee.is_some() {
            row.network_fee = network_fee;
        }
        row.updated_at = Utc::now();
        Ok(())
    }
}
