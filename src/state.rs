//! Shared in-memory session state.
//!
//! One [`WalletState`] lives for the duration of a chat session and is
//! shared across the executors, the balance cache, and the transaction
//! monitors. The token list is only ever replaced wholesale so readers
//! never observe a half-refreshed view.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::registry::same_address;
use crate::store::{TokenRecord, TransactionRecord, TransactionStatus, WalletRecord};

/// A token as the session sees it: registry metadata plus the latest
/// fetched balance in display units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub is_native: bool,
    pub logo_url: Option<String>,
    pub balance: String,
}

impl Token {
    pub fn with_balance(record: &TokenRecord, balance: String) -> Self {
        Self {
            address: record.address.clone(),
            symbol: record.symbol.clone(),
            name: record.name.clone(),
            decimals: record.decimals,
            is_native: record.is_native,
            logo_url: record.logo_url.clone(),
            balance,
        }
    }
}

/// Rolling counters for balance refreshes. `last_response` keeps the
/// summary line of the most recent successful refresh.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BalanceCheckStats {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_response: Option<String>,
}

#[derive(Default)]
pub struct WalletState {
    active_wallet: RwLock<Option<WalletRecord>>,
    tokens: RwLock<Vec<Token>>,
    stats: RwLock<BalanceCheckStats>,
    transactions: RwLock<Vec<TransactionRecord>>,
}

impl WalletState {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Active wallet ====================

    pub async fn set_active_wallet(&self, wallet: Option<WalletRecord>) {
        *self.active_wallet.write().await = wallet;
    }

    pub async fn active_wallet(&self) -> Option<WalletRecord> {
        self.active_wallet.read().await.clone()
    }

    /// Cache resolved ciphertext back onto the session's active record so
    /// later signings skip the store fetch.
    pub async fn attach_ciphertext(&self, address: &str, ciphertext: &str) {
        let mut guard = self.active_wallet.write().await;
        if let Some(wallet) = guard.as_mut() {
            if same_address(&wallet.address, address) && wallet.encrypted_private_key.is_none() {
                wallet.encrypted_private_key = Some(ciphertext.to_string());
            }
        }
    }

    // ==================== Token balances ====================

    /// Swap in a complete new token list. Readers see either the old list
    /// or the new one, never a mixture.
    pub async fn replace_tokens(&self, tokens: Vec<Token>) {
        *self.tokens.write().await = tokens;
    }

    pub async fn tokens(&self) -> Vec<Token> {
        self.tokens.read().await.clone()
    }

    pub async fn token_by_symbol(&self, symbol: &str) -> Option<Token> {
        self.tokens
            .read()
            .await
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
            .cloned()
    }

    pub async fn token_by_address(&self, address: &str) -> Option<Token> {
        self.tokens
            .read()
            .await
            .iter()
            .find(|t| same_address(&t.address, address))
            .cloned()
    }

    /// Update a single token's balance in place, leaving the rest of the
    /// snapshot untouched. Used by targeted single-token lookups.
    pub async fn patch_token_balance(&self, address: &str, balance: &str) {
        let mut guard = self.tokens.write().await;
        if let Some(token) = guard.iter_mut().find(|t| same_address(&t.address, address)) {
            token.balance = balance.to_string();
        }
    }

    // ==================== Refresh stats ====================

    /// `partial_error` notes token lookups that failed inside an otherwise
    /// successful refresh; it lands in `last_error` without counting the
    /// refresh as failed.
    pub async fn record_refresh_success(&self, summary: String, partial_error: Option<String>) {
        let mut guard = self.stats.write().await;
        guard.attempted += 1;
        guard.succeeded += 1;
        guard.last_success = Some(Utc::now());
        guard.last_response = Some(summary);
        if partial_error.is_some() {
            guard.last_error = partial_error;
        }
    }

    pub async fn record_refresh_failure(&self, error: String) {
        let mut guard = self.stats.write().await;
        guard.attempted += 1;
        guard.failed += 1;
        guard.last_error = Some(error);
    }

    pub async fn stats(&self) -> BalanceCheckStats {
        self.stats.read().await.clone()
    }

    // ==================== Transaction view ====================

    /// Record a freshly submitted transaction, newest first.
    pub async fn push_transaction(&self, record: TransactionRecord) {
        self.transactions.write().await.insert(0, record);
    }

    pub async fn transactions(&self) -> Vec<TransactionRecord> {
        self.transactions.read().await.clone()
    }

    pub async fn transaction_by_hash(&self, tx_hash: &str) -> Option<TransactionRecord> {
        self.transactions
            .read()
            .await
            .iter()
            .find(|t| t.tx_hash.eq_ignore_ascii_case(tx_hash))
            .cloned()
    }

    /// Mirror a monitor outcome onto the session view. Terminal entries
    /// are left alone.
    pub async fn update_transaction_outcome(
        &self,
        tx_hash: &str,
        status: TransactionStatus,
        block_number: Option<u64>,
        network_fee: Option<String>,
    ) {
        let mut guard = self.transactions.write().await;
        if let Some(tx) = guard
            .iter_mut()
            .find(|t| t.tx_hash.eq_ignore_ascii_case(tx_hash))
        {
            if tx.status.is_terminal() {
                return;
            }
            tx.status = status;
            if block_number.is_some() {
                tx.block_number = block_number;
            }
            if network_fee.is_some() {
                tx.network_fee = network_fee;
            }
        }
    }
}
