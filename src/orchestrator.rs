//! Session-scoped wallet orchestration.
//!
//! [`WalletOrchestrator`] owns one user session end to end: wallet custody,
//! balance snapshots, transfers, swaps, monitoring, and the chat intent
//! surface. Fund-moving operations require an authenticated session and an
//! active wallet, and submissions from the same signing address are
//! serialized so concurrent sends cannot race nonce assignment.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tokio::sync::Mutex;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::activity::{ActivityEvent, ActivityLog, ActivitySink};
use crate::balances::BalanceCache;
use crate::chain::{ChainGateway, TxStatus};
use crate::config::Config;
use crate::error::{Error, Result, StoreError, ValidationError};
use crate::intent::{SendEntities, WalletIntent};
use crate::keys::{self, KeyAccessor, LocalSigner};
use crate::monitor::TransactionMonitor;
use crate::oracle::{AesGcmOracle, EncryptionOracle};
use crate::prices::PriceClient;
use crate::registry::{self, NATIVE_SYMBOL, NATIVE_TOKEN_ADDRESS, explorer_tx_url};
use crate::state::{BalanceCheckStats, Token, WalletState};
use crate::store::{
    MemoryStore, Store, TokenRecord, TokenStore, TransactionKind, TransactionRecord,
    TransactionStatus, TransactionStore, WalletRecord, WalletStore, seed_default_tokens,
};
use crate::swap::{QuoteEngine, SwapExecutor, SwapQuote};
use crate::transfer::TransferExecutor;

const NO_WALLET_REPLY: &str =
    "You don't have an active wallet yet. Would you like me to help you create one?";

const HELP_REPLY: &str = "I can help you manage your crypto! Try asking me to:\n\
• Check your balance\n\
• Send ETH or tokens to someone (e.g., \"send 0.1 ETH to 0x123...\" or \"send $10 of USDC\")\n\
• Show your wallet address\n\
• Swap tokens (e.g., \"swap 1 ETH for USDC\" or \"swap 100 USDC to DAI\")\n\
• View your recent transactions\n\
Or just chat with me about crypto in general!";

/// Who is driving this session.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    pub user_id: String,
    pub authenticated: bool,
}

pub struct WalletOrchestrator {
    identity: SessionIdentity,
    store: Arc<dyn Store>,
    state: Arc<WalletState>,
    oracle: Arc<dyn EncryptionOracle>,
    keys: KeyAccessor,
    gateway: Arc<ChainGateway>,
    quotes: Arc<QuoteEngine>,
    transfers: TransferExecutor,
    swaps: SwapExecutor,
    monitor: Arc<TransactionMonitor>,
    balances: Arc<BalanceCache>,
    prices: PriceClient,
    activity: Arc<ActivityLog>,
    submission_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl WalletOrchestrator {
    pub fn new(
        identity: SessionIdentity,
        store: Arc<dyn Store>,
        oracle: Arc<dyn EncryptionOracle>,
        gateway: Arc<ChainGateway>,
        prices: PriceClient,
        config: &Config,
    ) -> Self {
        let activity = Arc::new(ActivityLog::new());
        let sink: Arc<dyn ActivitySink> = activity.clone();
        let state = Arc::new(WalletState::new());
        let balances = Arc::new(BalanceCache::new(
            Arc::clone(&gateway),
            Arc::clone(&store),
            Arc::clone(&state),
            Arc::clone(&sink),
            config.balances.clone(),
        ));
        let quotes = Arc::new(QuoteEngine::new(Arc::clone(&gateway), config.swap.clone()));
        let monitor = Arc::new(TransactionMonitor::new(
            Arc::clone(&gateway),
            Arc::clone(&store),
            Arc::clone(&state),
            Arc::clone(&balances),
            Arc::clone(&sink),
            config.monitor.clone(),
        ));

        Self {
            keys: KeyAccessor::new(Arc::clone(&store), Arc::clone(&oracle)),
            transfers: TransferExecutor::new(Arc::clone(&gateway), Arc::clone(&sink)),
            swaps: SwapExecutor::new(
                Arc::clone(&gateway),
                Arc::clone(&quotes),
                sink,
                config.swap.clone(),
            ),
            identity,
            store,
            state,
            oracle,
            gateway,
            quotes,
            monitor,
            balances,
            prices,
            activity,
            submission_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Build a session on the default backends: an in-memory store seeded
    /// with the token registry, an HTTP gateway, and the AES-GCM oracle.
    pub async fn from_config(identity: SessionIdentity, config: &Config) -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        seed_default_tokens(store.as_ref()).await?;
        let oracle = Arc::new(AesGcmOracle::new(&config.oracle)?);
        let gateway = Arc::new(ChainGateway::http(&config.chain)?);
        let prices = PriceClient::new(&config.prices)?;
        Ok(Self::new(identity, store, oracle, gateway, prices, config))
    }

    // ==================== Wallet management ====================

    /// Generate a fresh wallet, encrypt its key material, and make it the
    /// session's active wallet.
    pub async fn create_wallet(&self) -> Result<WalletRecord> {
        self.require_auth()?;
        let generated = keys::generate_wallet()?;
        let wallet = self
            .persist_new_wallet(
                &generated.signer,
                Some(&generated.mnemonic),
                Some(generated.derivation_path.clone()),
            )
            .await?;
        info!(address = %wallet.address, "created wallet");
        self.activity
            .record("wallet_created", json!({ "address": wallet.address }));
        Ok(wallet)
    }

    /// Import a wallet from a private key or a BIP-39 phrase. The secret is
    /// never persisted in the clear; only oracle ciphertext is stored.
    pub async fn import_wallet(&self, secret: &str) -> Result<WalletRecord> {
        self.require_auth()?;
        let imported = keys::import_signer(secret)?;
        if let Some(existing) = self
            .store
            .wallet_by_address(&self.identity.user_id, imported.signer.address())
            .await?
        {
            return Err(ValidationError::DuplicateWallet {
                address: existing.address,
            }
            .into());
        }
        let wallet = self
            .persist_new_wallet(
                &imported.signer,
                imported.mnemonic.as_ref(),
                imported.derivation_path.clone(),
            )
            .await?;
        info!(address = %wallet.address, "imported wallet");
        self.activity
            .record("wallet_imported", json!({ "address": wallet.address }));
        Ok(wallet)
    }

    /// Switch the active wallet. The id must belong to this session's user.
    pub async fn set_active_wallet(&self, wallet_id: Uuid) -> Result<WalletRecord> {
        self.require_auth()?;
        let mut wallet = self
            .store
            .wallet_by_id(wallet_id)
            .await?
            .filter(|w| w.user_id == self.identity.user_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "wallet".to_string(),
                id: wallet_id.to_string(),
            })?;
        self.store
            .set_active_wallet(&self.identity.user_id, wallet_id)
            .await?;
        wallet.is_active = true;
        self.state.set_active_wallet(Some(wallet.clone())).await;
        self.balances.invalidate().await;
        self.activity
            .record("wallet_switched", json!({ "address": wallet.address }));
        Ok(wallet)
    }

    pub async fn wallets(&self) -> Result<Vec<WalletRecord>> {
        Ok(self.store.wallets_for_user(&self.identity.user_id).await?)
    }

    /// The session's active wallet, priming the in-memory view from the
    /// store on first use.
    pub async fn active_wallet(&self) -> Result<Option<WalletRecord>> {
        if let Some(wallet) = self.state.active_wallet().await {
            return Ok(Some(wallet));
        }
        let stored = self.store.active_wallet(&self.identity.user_id).await?;
        if let Some(wallet) = &stored {
            self.state.set_active_wallet(Some(wallet.clone())).await;
        }
        Ok(stored)
    }

    // ==================== Balances ====================

    pub async fn refresh_balances(&self) -> Result<Vec<Token>> {
        self.require_active_wallet().await?;
        self.balances.refresh().await
    }

    /// Current snapshot without touching the node.
    pub async fn balances(&self) -> Vec<Token> {
        self.state.tokens().await
    }

    pub async fn balance_stats(&self) -> BalanceCheckStats {
        self.state.stats().await
    }

    pub async fn balance_of(&self, symbol: &str) -> Result<Token> {
        self.require_active_wallet().await?;
        let token = self.resolve_token(symbol).await?;
        self.balances.balance_of(&token).await
    }

    // ==================== Quotes, transfers, swaps ====================

    pub async fn quote(
        &self,
        from_symbol: &str,
        to_symbol: &str,
        amount: &str,
        slippage_bps: Option<u32>,
    ) -> Result<SwapQuote> {
        let from = self.resolve_token(from_symbol).await?;
        let to = self.resolve_token(to_symbol).await?;
        self.quotes.quote(&from, &to, amount, slippage_bps).await
    }

    /// Send native coin (`token_symbol` = `None`) or an ERC-20 to a
    /// recipient. Returns the transaction hash at submission; a monitor
    /// task carries the record to its terminal state.
    pub async fn send(
        &self,
        to: &str,
        amount: &str,
        token_symbol: Option<&str>,
    ) -> Result<String> {
        self.require_auth()?;
        let recipient = registry::validate_address(to)?;
        let token = match token_symbol {
            Some(symbol) => {
                let record = self.resolve_token(symbol).await?;
                if record.is_native { None } else { Some(record) }
            }
            None => None,
        };

        let mut wallet = self.require_active_wallet().await?;
        let signer = self.keys.resolve_signer(&mut wallet).await?;
        if let Some(ciphertext) = &wallet.encrypted_private_key {
            self.state
                .attach_ciphertext(&wallet.address, ciphertext)
                .await;
        }

        let permit = self.submission_permit(signer.address()).await;
        let _guard = permit.lock().await;

        let (tx_hash, token_address, token_label) = match &token {
            Some(record) => (
                self.transfers
                    .send_token(&signer, &recipient, amount, record)
                    .await?,
                record.address.clone(),
                record.symbol.clone(),
            ),
            None => (
                self.transfers.send_native(&signer, &recipient, amount).await?,
                NATIVE_TOKEN_ADDRESS.to_string(),
                NATIVE_SYMBOL.to_string(),
            ),
        };

        let now = Utc::now();
        let record = TransactionRecord {
            id: Uuid::new_v4(),
            wallet_id: wallet.id,
            tx_hash: tx_hash.clone(),
            kind: TransactionKind::Send,
            status: TransactionStatus::Pending,
            from_address: signer.address().to_string(),
            to_address: recipient,
            token_address,
            token_symbol: token_label,
            amount: amount.to_string(),
            to_token_address: None,
            to_token_symbol: None,
            to_amount: None,
            network_fee: None,
            block_number: None,
            created_at: now,
            updated_at: now,
        };
        self.record_submission(record).await;
        Ok(tx_hash)
    }

    /// Swap between two known tokens. The record carries both legs; the
    /// monitor settles it once the router transaction reaches a terminal
    /// state.
    pub async fn swap(
        &self,
        from_symbol: &str,
        to_symbol: &str,
        amount: &str,
        slippage_bps: Option<u32>,
    ) -> Result<String> {
        self.require_auth()?;
        let from = self.resolve_token(from_symbol).await?;
        let to = self.resolve_token(to_symbol).await?;

        let mut wallet = self.require_active_wallet().await?;
        let signer = self.keys.resolve_signer(&mut wallet).await?;
        if let Some(ciphertext) = &wallet.encrypted_private_key {
            self.state
                .attach_ciphertext(&wallet.address, ciphertext)
                .await;
        }

        let permit = self.submission_permit(signer.address()).await;
        let _guard = permit.lock().await;

        let (quote, execution) = self
            .swaps
            .execute(&signer, &from, &to, amount, slippage_bps)
            .await?;

        let now = Utc::now();
        let record = TransactionRecord {
            id: Uuid::new_v4(),
            wallet_id: wallet.id,
            tx_hash: execution.tx_hash.clone(),
            kind: TransactionKind::Swap,
            status: TransactionStatus::Pending,
            from_address: signer.address().to_string(),
            to_address: signer.address().to_string(),
            token_address: from.address.clone(),
            token_symbol: quote.from_symbol.clone(),
            amount: quote.amount_in.clone(),
            to_token_address: Some(to.address.clone()),
            to_token_symbol: Some(quote.to_symbol.clone()),
            to_amount: Some(quote.expected_out.clone()),
            network_fee: None,
            block_number: None,
            created_at: now,
            updated_at: now,
        };
        self.record_submission(record).await;
        Ok(execution.tx_hash)
    }

    // ==================== History and status ====================

    pub async fn transaction_history(&self) -> Result<Vec<TransactionRecord>> {
        let wallet = self.require_active_wallet().await?;
        Ok(self.store.transactions_for_wallet(wallet.id).await?)
    }

    /// On-chain status for any hash, whether or not this session sent it.
    pub async fn transaction_status(&self, tx_hash: &str) -> Result<TxStatus> {
        let hash = registry::validate_tx_hash(tx_hash)?;
        Ok(self.gateway.status(&hash).await?)
    }

    // ==================== Activity ====================

    pub fn activity(&self) -> Vec<ActivityEvent> {
        self.activity.snapshot()
    }

    pub fn subscribe_activity(&self) -> BroadcastStream<ActivityEvent> {
        self.activity.subscribe()
    }

    // ==================== Intent execution ====================

    /// Execute a parsed chat intent and produce the assistant's reply.
    ///
    /// Missing-wallet situations on conversational intents come back as
    /// friendly replies rather than errors; validation and execution
    /// failures propagate as [`Error`] for the embedding layer to present.
    pub async fn execute_intent(&self, intent: &WalletIntent) -> Result<String> {
        self.activity
            .record("intent", json!({ "intent": intent.label() }));
        intent.validate()?;

        match intent {
            WalletIntent::Greeting => {
                Ok("Hey there! How can I help with your crypto today?".to_string())
            }

            WalletIntent::CheckBalance => {
                if self.active_wallet().await?.is_none() {
                    return Ok(NO_WALLET_REPLY.to_string());
                }
                let tokens = self.refresh_balances().await?;
                Ok(balance_reply(&tokens))
            }

            WalletIntent::Send { entities } => {
                if self.active_wallet().await?.is_none() {
                    return Ok("You'll need to create a wallet first before sending any crypto. \
                               Would you like me to help you create one?"
                        .to_string());
                }
                let Some(address) = entities.address.as_deref() else {
                    return Err(ValidationError::MissingField {
                        field: "address".to_string(),
                    }
                    .into());
                };
                let (amount, token_symbol) = self.send_intent_amount(entities).await?;
                let tx_hash = self.send(address, &amount, token_symbol.as_deref()).await?;
                Ok(format!(
                    "Transaction sent! View on Etherscan: {}\nIt might take a few moments to \
                     confirm on the network.",
                    explorer_tx_url(&tx_hash)
                ))
            }

            WalletIntent::Swap { entities } => {
                if self.active_wallet().await?.is_none() {
                    return Ok("You'll need to create a wallet first before swapping tokens. \
                               Would you like me to help you create one?"
                        .to_string());
                }
                let (Some(amount), Some(from), Some(to)) = (
                    entities.amount.as_deref(),
                    entities.from_token_symbol.as_deref(),
                    entities.to_token_symbol.as_deref(),
                ) else {
                    return Err(ValidationError::MissingField {
                        field: "amount".to_string(),
                    }
                    .into());
                };
                let tx_hash = self.swap(from, to, amount, None).await?;
                Ok(format!(
                    "Swap submitted! View on Etherscan: {}\nIt might take a few moments to \
                     confirm.",
                    explorer_tx_url(&tx_hash)
                ))
            }

            WalletIntent::WalletInfo => match self.active_wallet().await? {
                Some(wallet) => Ok(format!(
                    "Your active wallet is {}. Would you like to copy the full address or see \
                     your tokens?",
                    short_address(&wallet.address)
                )),
                None => Ok(NO_WALLET_REPLY.to_string()),
            },

            WalletIntent::CreateWalletInfo => Ok(
                "I can help you create a new wallet. Open the wallet panel and choose 'Create \
                 New Wallet'. Would you like me to guide you through the process?"
                    .to_string(),
            ),

            WalletIntent::Help => Ok(HELP_REPLY.to_string()),

            WalletIntent::TransactionHistoryInfo => {
                if self.active_wallet().await?.is_none() {
                    return Ok(NO_WALLET_REPLY.to_string());
                }
                let rows = self.transaction_history().await?;
                Ok(history_reply(&rows))
            }

            WalletIntent::RefreshBalances => {
                if self.active_wallet().await?.is_none() {
                    return Ok(NO_WALLET_REPLY.to_string());
                }
                self.refresh_balances().await?;
                Ok("I've refreshed your wallet balances. Is there anything specific you'd like \
                    to know about your holdings?"
                    .to_string())
            }

            WalletIntent::CryptoQuestion => Ok(
                "That's a great question about crypto! I'd be happy to explain. What specific \
                 aspects are you most interested in learning about?"
                    .to_string(),
            ),

            WalletIntent::Unknown => {
                Ok("I'm not quite sure what you're asking for. Could you rephrase that?"
                    .to_string())
            }
        }
    }

    /// Amount and token for a send intent. A complete fiat triple converts
    /// through the price client; otherwise the direct amount is used as is.
    async fn send_intent_amount(
        &self,
        entities: &SendEntities,
    ) -> Result<(String, Option<String>)> {
        if entities.has_fiat_request() {
            let (Some(raw), Some(currency), Some(target)) = (
                entities.currency_amount.as_deref(),
                entities.currency_symbol.as_deref(),
                entities.target_token_symbol.as_deref(),
            ) else {
                return Err(ValidationError::MissingField {
                    field: "currency_amount".to_string(),
                }
                .into());
            };
            let fiat: Decimal =
                raw.trim()
                    .parse()
                    .map_err(|_| ValidationError::InvalidAmount {
                        reason: format!("'{raw}' is not a valid amount"),
                    })?;
            if fiat <= Decimal::ZERO {
                return Err(ValidationError::InvalidAmount {
                    reason: format!("'{raw}' is not a positive amount"),
                }
                .into());
            }
            let amount = self
                .prices
                .token_amount_for_fiat(target, currency, fiat)
                .await?;
            return Ok((amount.normalize().to_string(), Some(target.to_string())));
        }

        let amount = entities
            .amount
            .as_deref()
            .ok_or_else(|| ValidationError::MissingField {
                field: "amount".to_string(),
            })?;
        Ok((amount.to_string(), entities.token_symbol.clone()))
    }

    // ==================== Internals ====================

    fn require_auth(&self) -> Result<()> {
        if !self.identity.authenticated {
            return Err(ValidationError::NotAuthenticated.into());
        }
        Ok(())
    }

    async fn require_active_wallet(&self) -> Result<WalletRecord> {
        self.active_wallet()
            .await?
            .ok_or_else(|| ValidationError::NoActiveWallet.into())
    }

    /// Known token for a symbol or contract address. Symbols hit the store
    /// and then the seed registry. An address neither knows is read from
    /// the contract itself (`decimals()`, `symbol()`, `name()`) and cached
    /// in the store for the next lookup.
    async fn resolve_token(&self, symbol_or_address: &str) -> Result<TokenRecord> {
        let input = symbol_or_address.trim();
        if let Ok(address) = registry::validate_address(input) {
            if let Some(token) = self.store.token_by_address(&address).await? {
                return Ok(token);
            }
            let meta = self.gateway.token_metadata(&address).await?;
            let token = TokenRecord {
                address: address.clone(),
                symbol: meta.symbol,
                name: meta.name,
                decimals: meta.decimals,
                is_native: false,
                logo_url: None,
            };
            if let Err(err) = self.store.upsert_token(&token).await {
                warn!(address = %address, error = %err, "failed to cache resolved token");
            }
            return Ok(token);
        }
        if let Some(token) = self.store.token_by_symbol(input).await? {
            return Ok(token);
        }
        registry::seed_token_by_symbol(input)
            .map(TokenRecord::from)
            .ok_or_else(|| {
                Error::Validation(ValidationError::UnknownToken {
                    symbol: input.to_string(),
                })
            })
    }

    /// One submission at a time per signing address. Nonces are assigned
    /// at submission time, so parallel submissions from the same key would
    /// collide on the same nonce.
    async fn submission_permit(&self, address: &str) -> Arc<Mutex<()>> {
        let mut locks = self.submission_locks.lock().await;
        Arc::clone(locks.entry(registry::normalize_address(address)).or_default())
    }

    /// Persist a freshly submitted transaction and hand it to the monitor.
    /// The hash already exists on chain, so a store hiccup is logged rather
    /// than turned into an error.
    async fn record_submission(&self, record: TransactionRecord) {
        if let Err(err) = self.store.insert_transaction(&record).await {
            warn!(tx_hash = %record.tx_hash, error = %err, "failed to persist pending transaction");
        }
        self.state.push_transaction(record.clone()).await;
        Arc::clone(&self.monitor).spawn(record.tx_hash, record.kind);
    }

    async fn persist_new_wallet(
        &self,
        signer: &LocalSigner,
        mnemonic: Option<&SecretString>,
        derivation_path: Option<String>,
    ) -> Result<WalletRecord> {
        let key_hex = signer.private_key_hex();
        let encrypted_private_key = self.oracle.encrypt(key_hex.expose_secret()).await?;
        let encrypted_mnemonic = match mnemonic {
            Some(phrase) => Some(self.oracle.encrypt(phrase.expose_secret()).await?),
            None => None,
        };

        let wallet = WalletRecord {
            id: Uuid::new_v4(),
            user_id: self.identity.user_id.clone(),
            address: signer.address().to_string(),
            encrypted_private_key: Some(encrypted_private_key),
            encrypted_mnemonic,
            derivation_path,
            is_active: true,
            created_at: Utc::now(),
        };
        self.store.insert_wallet(&wallet).await?;
        self.store
            .set_active_wallet(&self.identity.user_id, wallet.id)
            .await?;
        self.state.set_active_wallet(Some(wallet.clone())).await;
        self.balances.invalidate().await;
        Ok(wallet)
    }
}

// ==================== Reply formatting ====================

fn parsed_balance(token: &Token) -> f64 {
    token.balance.parse().unwrap_or(0.0)
}

/// Chat rendering of a balance snapshot. The native coin is always shown;
/// other tokens only above the dust threshold, stablecoins at two decimal
/// places and everything else at four.
fn balance_reply(tokens: &[Token]) -> String {
    let body = if tokens.is_empty() {
        "I couldn't fetch any token information for your wallet right now. It might be a new \
         wallet or there could be a temporary issue. Please try again in a moment."
            .to_string()
    } else {
        let native = tokens.iter().find(|t| t.is_native);
        let native_balance = native.map(parsed_balance).unwrap_or(0.0);
        let funded: Vec<&Token> = tokens
            .iter()
            .filter(|t| !t.is_native && parsed_balance(t) > 0.00001)
            .collect();

        if native_balance <= 0.000001 && funded.is_empty() {
            "It looks like your wallet is currently empty or has only trace amounts of crypto."
                .to_string()
        } else {
            let mut lines = String::from("Here's your current balance:");
            match native {
                Some(token) => {
                    let shown = if native_balance > 0.000001 {
                        format!("{native_balance:.6}")
                    } else {
                        "0.00".to_string()
                    };
                    lines.push_str(&format!("\n• {shown} {}", token.symbol));
                }
                None => lines.push_str("\n• Could not fetch ETH balance at the moment."),
            }
            for token in funded {
                let amount = parsed_balance(token);
                let line = match token.symbol.as_str() {
                    "USDC" | "USDT" | "DAI" => format!("\n• {amount:.2} {}", token.symbol),
                    _ => format!("\n• {amount:.4} {}", token.symbol),
                };
                lines.push_str(&line);
            }
            lines
        }
    };
    format!("{body}\n\nWould you like to do anything else?")
}

fn history_reply(rows: &[TransactionRecord]) -> String {
    if rows.is_empty() {
        return "No transactions yet.".to_string();
    }
    let mut reply = String::from("Here are your recent transactions:");
    for row in rows.iter().take(5) {
        let line = match row.kind {
            TransactionKind::Swap => format!(
                "\n• Swapped {} {} for ~{} {} ({})",
                row.amount,
                row.token_symbol,
                row.to_amount.as_deref().unwrap_or("?"),
                row.to_token_symbol.as_deref().unwrap_or("?"),
                row.status.as_str()
            ),
            TransactionKind::Send => format!(
                "\n• Sent {} {} to {} ({})",
                row.amount,
                row.token_symbol,
                short_address(&row.to_address),
                row.status.as_str()
            ),
            TransactionKind::Receive => format!(
                "\n• Received {} {} from {} ({})",
                row.amount,
                row.token_symbol,
                short_address(&row.from_address),
                row.status.as_str()
            ),
        };
        reply.push_str(&line);
    }
    reply
}

fn short_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}
