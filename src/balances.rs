//! Throttled balance snapshot for the active wallet.
//!
//! `refresh()` rebuilds the whole token list in one pass and swaps it into
//! the session state atomically. Calls arriving within the throttle window
//! of the previous completed refresh get the cached snapshot back without
//! touching the node. The throttle gate is held across the fetch, so two
//! concurrent refreshes cannot both decide the cache is stale.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::activity::ActivitySink;
use crate::chain::{ChainGateway, units};
use crate::config::BalanceConfig;
use crate::error::{Result, ValidationError};
use crate::registry::{NATIVE_DECIMALS, SEED_TOKENS, same_address};
use crate::state::{Token, WalletState};
use crate::store::{Store, TokenRecord, TokenStore};

pub struct BalanceCache {
    gateway: Arc<ChainGateway>,
    store: Arc<dyn Store>,
    state: Arc<WalletState>,
    activity: Arc<dyn ActivitySink>,
    config: BalanceConfig,
    last_completed: Mutex<Option<Instant>>,
}

impl BalanceCache {
    pub fn new(
        gateway: Arc<ChainGateway>,
        store: Arc<dyn Store>,
        state: Arc<WalletState>,
        activity: Arc<dyn ActivitySink>,
        config: BalanceConfig,
    ) -> Self {
        Self {
            gateway,
            store,
            state,
            activity,
            config,
            last_completed: Mutex::new(None),
        }
    }

    /// Refresh every balance for the active wallet and return the new
    /// snapshot, or the cached one when inside the throttle window.
    ///
    /// Tracked tokens are the stored registry plus the built-in seeds,
    /// deduplicated by address; registry tokens the wallet does not hold
    /// appear with balance "0". A failed native lookup aborts the refresh
    /// and leaves the previous snapshot in place.
    pub async fn refresh(&self) -> Result<Vec<Token>> {
        let mut gate = self.last_completed.lock().await;
        if let Some(completed) = *gate {
            if completed.elapsed() < self.config.min_refresh_interval {
                debug!("balance refresh throttled, serving cached snapshot");
                return Ok(self.state.tokens().await);
            }
        }

        let wallet = self
            .state
            .active_wallet()
            .await
            .ok_or(ValidationError::NoActiveWallet)?;
        let universe = self.token_universe().await?;

        let native_raw = match self.gateway.native_balance(&wallet.address).await {
            Ok(raw) => raw,
            Err(err) => {
                self.state.record_refresh_failure(err.to_string()).await;
                self.activity
                    .record("balance_refresh_failed", json!({ "error": err.to_string() }));
                return Err(err.into());
            }
        };

        let non_native: Vec<&TokenRecord> =
            universe.iter().filter(|token| !token.is_native).collect();
        let results = join_all(non_native.iter().map(|record| {
            let gateway = Arc::clone(&self.gateway);
            let token_address = &record.address;
            let holder = &wallet.address;
            async move { gateway.token_balance(token_address, holder).await }
        }))
        .await;

        let mut failed = 0usize;
        let mut fetched: HashMap<&str, String> = HashMap::with_capacity(non_native.len());
        for (record, result) in non_native.iter().zip(results) {
            let balance = match result {
                Ok(raw) => units::from_base_units(raw, record.decimals),
                Err(err) => {
                    failed += 1;
                    warn!(token = %record.symbol, error = %err, "token balance lookup failed");
                    "0".to_string()
                }
            };
            fetched.insert(record.address.as_str(), balance);
        }

        let tokens: Vec<Token> = universe
            .iter()
            .map(|record| {
                let balance = if record.is_native {
                    units::from_base_units(native_raw, record.decimals)
                } else {
                    fetched
                        .get(record.address.as_str())
                        .cloned()
                        .unwrap_or_else(|| "0".to_string())
                };
                Token::with_balance(record, balance)
            })
            .collect();

        let native_display = units::from_base_units(native_raw, NATIVE_DECIMALS);
        let summary = format!("ETH balance: {native_display}, Total tokens: {}", tokens.len());
        let partial = (failed > 0).then(|| format!("{failed} token balance lookups failed"));

        self.state.replace_tokens(tokens.clone()).await;
        self.state
            .record_refresh_success(summary.clone(), partial)
            .await;
        self.activity.record(
            "balance_refresh",
            json!({ "summary": summary, "token_failures": failed }),
        );

        *gate = Some(Instant::now());
        Ok(tokens)
    }

    /// Drop the cached snapshot and forget the previous completion, so the
    /// next refresh fetches regardless of the throttle window. Called when
    /// the active wallet changes; without it the window would briefly serve
    /// the previous wallet's balances.
    pub async fn invalidate(&self) {
        let mut gate = self.last_completed.lock().await;
        self.state.replace_tokens(Vec::new()).await;
        *gate = None;
    }

    /// Fetch one token's balance right now, skipping the throttle, and
    /// patch only that entry in the snapshot.
    pub async fn balance_of(&self, record: &TokenRecord) -> Result<Token> {
        let wallet = self
            .state
            .active_wallet()
            .await
            .ok_or(ValidationError::NoActiveWallet)?;

        let raw = if record.is_native {
            self.gateway.native_balance(&wallet.address).await?
        } else {
            self.gateway
                .token_balance(&record.address, &wallet.address)
                .await?
        };
        let balance = units::from_base_units(raw, record.decimals);
        self.state
            .patch_token_balance(&record.address, &balance)
            .await;
        Ok(Token::with_balance(record, balance))
    }

    /// Stored registry rows plus any built-in seed not yet stored.
    async fn token_universe(&self) -> Result<Vec<TokenRecord>> {
        let mut rows = self.store.list_tokens().await?;
        for seed in SEED_TOKENS {
            if !rows
                .iter()
                .any(|row| same_address(&row.address, seed.address))
            {
                rows.push(TokenRecord::from(seed));
            }
        }
        Ok(rows)
    }
}
