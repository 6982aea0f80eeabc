//! Post-submission transaction monitoring.
//!
//! One detached task per submitted hash polls the node until the
//! transaction reaches a terminal state or the ceiling passes. Timing out
//! is passive: the record stays pending and nothing is written.

use std::sync::Arc;

use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::activity::ActivitySink;
use crate::balances::BalanceCache;
use crate::chain::{ChainGateway, TxInclusion, TxStatus};
use crate::config::MonitorConfig;
use crate::state::WalletState;
use crate::store::{Store, TransactionKind, TransactionStatus, TransactionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    Confirmed,
    Failed,
    /// Ceiling reached with the transaction still pending.
    TimedOut,
}

pub struct TransactionMonitor {
    gateway: Arc<ChainGateway>,
    store: Arc<dyn Store>,
    state: Arc<WalletState>,
    balances: Arc<BalanceCache>,
    activity: Arc<dyn ActivitySink>,
    config: MonitorConfig,
}

impl TransactionMonitor {
    pub fn new(
        gateway: Arc<ChainGateway>,
        store: Arc<dyn Store>,
        state: Arc<WalletState>,
        balances: Arc<BalanceCache>,
        activity: Arc<dyn ActivitySink>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            gateway,
            store,
            state,
            balances,
            activity,
            config,
        }
    }

    /// Detach a monitor task for a submitted hash. The handle resolves to
    /// the outcome; callers are free to drop it.
    pub fn spawn(
        self: Arc<Self>,
        tx_hash: String,
        kind: TransactionKind,
    ) -> JoinHandle<MonitorOutcome> {
        tokio::spawn(async move { self.run(tx_hash, kind).await })
    }

    async fn run(&self, tx_hash: String, kind: TransactionKind) -> MonitorOutcome {
        let deadline = Instant::now() + self.config.timeout;
        loop {
            match self.gateway.status(&tx_hash).await {
                Ok(TxStatus::Confirmed(inclusion)) => {
                    self.settle(&tx_hash, kind, TransactionStatus::Confirmed, &inclusion)
                        .await;
                    return MonitorOutcome::Confirmed;
                }
                Ok(TxStatus::Failed(inclusion)) => {
                    self.settle(&tx_hash, kind, TransactionStatus::Failed, &inclusion)
                        .await;
                    return MonitorOutcome::Failed;
                }
                Ok(status) => {
                    debug!(%tx_hash, status = status.as_str(), "transaction not yet mined");
                }
                // includes node hiccups; the ceiling bounds the loop
                Err(err) => warn!(%tx_hash, error = %err, "status poll failed, will retry"),
            }

            if Instant::now() >= deadline {
                info!(%tx_hash, "monitor ceiling reached, leaving transaction pending");
                self.activity
                    .record("monitor_timeout", json!({ "tx_hash": tx_hash }));
                return MonitorOutcome::TimedOut;
            }
            sleep(self.config.poll_interval).await;
        }
    }

    /// Write the terminal state everywhere, then refresh balances now and
    /// again on the profile for this transaction kind.
    async fn settle(
        &self,
        tx_hash: &str,
        kind: TransactionKind,
        status: TransactionStatus,
        inclusion: &TxInclusion,
    ) {
        let fee = inclusion.fee_native();
        if let Err(err) = self
            .store
            .update_transaction_outcome(
                tx_hash,
                status,
                Some(inclusion.block_number),
                Some(fee.clone()),
            )
            .await
        {
            warn!(%tx_hash, error = %err, "failed to persist transaction outcome");
        }
        self.state
            .update_transaction_outcome(tx_hash, status, Some(inclusion.block_number), Some(fee))
            .await;

        info!(
            %tx_hash,
            status = status.as_str(),
            block = inclusion.block_number,
            "transaction settled"
        );
        self.activity.record(
            "transaction_settled",
            json!({
                "tx_hash": tx_hash,
                "status": status.as_str(),
                "block_number": inclusion.block_number,
            }),
        );

        if let Err(err) = self.balances.refresh().await {
            debug!(error = %err, "post-settlement balance refresh failed");
        }
        let delays = match kind {
            TransactionKind::Swap => &self.config.swap_refresh_delays,
            _ => &self.config.transfer_refresh_delays,
        };
        for delay in delays {
            sleep(*delay).await;
            if let Err(err) = self.balances.refresh().await {
                debug!(error = %err, "scheduled balance refresh failed");
            }
        }
    }
}
