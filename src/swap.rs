//! Swap quoting and execution against the V2-style router.
//!
//! Quotes come from the router's `getAmountsOut`; min-out protection is
//! pure integer math on the quoted output. Execution handles the approval
//! dance for token inputs and picks one of the three router entry points
//! by which leg is the native coin. Gas limits are fixed by configuration
//! rather than estimated, since router estimates are unreliable while a
//! pool is moving.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::activity::ActivitySink;
use crate::chain::{ChainGateway, TxStatus, abi, units};
use crate::config::SwapConfig;
use crate::error::{ChainError, QuoteError, Result, ValidationError};
use crate::keys::LocalSigner;
use crate::registry::{
    self, SWAP_ROUTER_ADDRESS, WRAPPED_NATIVE_ADDRESS, is_native, same_address,
};
use crate::store::TokenRecord;

/// A priced swap, ready to display or execute.
#[derive(Debug, Clone)]
pub struct SwapQuote {
    pub from_symbol: String,
    pub to_symbol: String,
    pub amount_in: String,
    pub expected_out: String,
    pub min_out: String,
    pub amount_in_raw: u128,
    pub expected_out_raw: u128,
    pub min_out_raw: u128,
    /// Output per input unit, six decimal places. Display only.
    pub execution_price: String,
    pub price_impact: String,
    pub slippage_bps: u32,
    pub deadline_minutes: u64,
    /// Router path after native mapping, normalized addresses.
    pub path: Vec<String>,
}

/// Outcome of an executed swap. The hash always exists; `succeeded` is
/// `None` when the receipt wait ran out before the swap mined, in which
/// case the monitor settles the record.
#[derive(Debug, Clone)]
pub struct SwapExecution {
    pub tx_hash: String,
    pub succeeded: Option<bool>,
}

/// `floor(out × (10000 − bps) / 10000)`, entirely in integers.
pub fn min_amount_out(expected_out: u128, slippage_bps: u32) -> u128 {
    let keep = 10_000u128.saturating_sub(u128::from(slippage_bps));
    expected_out.saturating_mul(keep) / 10_000
}

/// Map a leg to its routable address: the native sentinel trades as the
/// wrapped token.
fn routable_address(token: &TokenRecord) -> String {
    if token.is_native || is_native(&token.address) {
        WRAPPED_NATIVE_ADDRESS.to_string()
    } else {
        registry::normalize_address(&token.address)
    }
}

/// Router path for a pair. Direct when either mapped leg is the wrapped
/// native token, otherwise two hops through it. A pair that maps to the
/// same address cannot be routed.
fn router_path(from: &TokenRecord, to: &TokenRecord) -> Result<Vec<String>> {
    let from_mapped = routable_address(from);
    let to_mapped = routable_address(to);
    if same_address(&from_mapped, &to_mapped) {
        return Err(ValidationError::SameTokenSwap.into());
    }
    if registry::is_wrapped_native(&from_mapped) || registry::is_wrapped_native(&to_mapped) {
        Ok(vec![from_mapped, to_mapped])
    } else {
        Ok(vec![
            from_mapped,
            WRAPPED_NATIVE_ADDRESS.to_string(),
            to_mapped,
        ])
    }
}

fn path_bytes(path: &[String]) -> Result<Vec<[u8; 20]>> {
    path.iter()
        .map(|address| registry::address_bytes(address).map_err(Into::into))
        .collect()
}

/// Output per input unit at six decimal places, from display amounts.
fn execution_price(amount_in: &str, expected_out: &str) -> String {
    use rust_decimal::Decimal;
    let price = amount_in
        .parse::<Decimal>()
        .ok()
        .filter(|amount| !amount.is_zero())
        .and_then(|amount| expected_out.parse::<Decimal>().ok().map(|out| out / amount));
    match price {
        Some(price) => price.round_dp(6).normalize().to_string(),
        None => "0".to_string(),
    }
}

pub struct QuoteEngine {
    gateway: Arc<ChainGateway>,
    config: SwapConfig,
}

impl QuoteEngine {
    pub fn new(gateway: Arc<ChainGateway>, config: SwapConfig) -> Self {
        Self { gateway, config }
    }

    /// Requested slippage checked against the configured ceiling; the
    /// configured default when the caller gave none.
    pub fn effective_slippage(&self, requested: Option<u32>) -> Result<u32> {
        let bps = requested.unwrap_or(self.config.default_slippage_bps);
        if bps > self.config.max_slippage_bps {
            return Err(ValidationError::SlippageTooHigh {
                bps,
                max: self.config.max_slippage_bps,
            }
            .into());
        }
        Ok(bps)
    }

    /// Price `amount` of `from` into `to`. Fails with a validation error
    /// before any RPC for bad amounts, unroutable pairs, or excessive
    /// slippage.
    pub async fn quote(
        &self,
        from: &TokenRecord,
        to: &TokenRecord,
        amount: &str,
        slippage_bps: Option<u32>,
    ) -> Result<SwapQuote> {
        let bps = self.effective_slippage(slippage_bps)?;
        let amount_in_raw = units::to_positive_base_units(amount, from.decimals)?;
        let path = router_path(from, to)?;

        let data = abi::router_get_amounts_out(amount_in_raw, &path_bytes(&path)?);
        let bytes = match self.gateway.call(SWAP_ROUTER_ADDRESS, data).await {
            Ok(bytes) => bytes,
            Err(ChainError::Rpc { message, .. }) => {
                return Err(if message.to_ascii_uppercase().contains("INSUFFICIENT_LIQUIDITY") {
                    QuoteError::InsufficientLiquidity.into()
                } else {
                    QuoteError::Failed { reason: message }.into()
                });
            }
            Err(other) => return Err(other.into()),
        };

        let amounts = abi::decode_uint_array(&bytes)?;
        let expected_out_raw = amounts.last().copied().ok_or(QuoteError::Failed {
            reason: "router returned an empty amounts array".to_string(),
        })?;
        if expected_out_raw == 0 {
            return Err(QuoteError::InsufficientLiquidity.into());
        }
        let min_out_raw = min_amount_out(expected_out_raw, bps);

        let amount_in = units::from_base_units(amount_in_raw, from.decimals);
        let expected_out = units::from_base_units(expected_out_raw, to.decimals);
        let min_out = units::from_base_units(min_out_raw, to.decimals);
        debug!(
            from = %from.symbol,
            to = %to.symbol,
            %amount_in,
            %expected_out,
            bps,
            "quoted swap"
        );

        Ok(SwapQuote {
            from_symbol: from.symbol.clone(),
            to_symbol: to.symbol.clone(),
            execution_price: execution_price(&amount_in, &expected_out),
            // getAmountsOut carries no reserve data to size impact from
            price_impact: "<0.01%".to_string(),
            amount_in,
            expected_out,
            min_out,
            amount_in_raw,
            expected_out_raw,
            min_out_raw,
            slippage_bps: bps,
            deadline_minutes: self.config.deadline_minutes,
            path,
        })
    }
}

pub struct SwapExecutor {
    gateway: Arc<ChainGateway>,
    engine: Arc<QuoteEngine>,
    activity: Arc<dyn ActivitySink>,
    config: SwapConfig,
}

impl SwapExecutor {
    pub fn new(
        gateway: Arc<ChainGateway>,
        engine: Arc<QuoteEngine>,
        activity: Arc<dyn ActivitySink>,
        config: SwapConfig,
    ) -> Self {
        Self {
            gateway,
            engine,
            activity,
            config,
        }
    }

    /// Quote and execute in one step, returning once the swap receipt is
    /// seen (or the bounded wait runs out with the swap still pending).
    pub async fn execute(
        &self,
        signer: &LocalSigner,
        from: &TokenRecord,
        to: &TokenRecord,
        amount: &str,
        slippage_bps: Option<u32>,
    ) -> Result<(SwapQuote, SwapExecution)> {
        let quote = self.engine.quote(from, to, amount, slippage_bps).await?;

        let from_is_native = from.is_native || is_native(&from.address);
        let to_is_native = to.is_native || is_native(&to.address);
        if !from_is_native {
            self.ensure_allowance(signer, from, quote.amount_in_raw)
                .await?;
        }

        let deadline = Utc::now().timestamp().max(0) as u64 + self.config.deadline_minutes * 60;
        let path = path_bytes(&quote.path)?;
        let recipient = registry::address_bytes(signer.address())?;
        let (value, data) = if from_is_native {
            (
                quote.amount_in_raw,
                abi::router_swap_exact_native_for_tokens(
                    quote.min_out_raw,
                    &path,
                    &recipient,
                    deadline,
                ),
            )
        } else if to_is_native {
            (
                0,
                abi::router_swap_exact_tokens_for_native(
                    quote.amount_in_raw,
                    quote.min_out_raw,
                    &path,
                    &recipient,
                    deadline,
                ),
            )
        } else {
            (
                0,
                abi::router_swap_exact_tokens_for_tokens(
                    quote.amount_in_raw,
                    quote.min_out_raw,
                    &path,
                    &recipient,
                    deadline,
                ),
            )
        };

        let tx_hash = self
            .gateway
            .send_transaction(
                signer.signing_key(),
                signer.address(),
                SWAP_ROUTER_ADDRESS,
                value,
                data,
                Some(self.config.swap_gas_limit),
            )
            .await?;
        info!(
            %tx_hash,
            from = %quote.from_symbol,
            to = %quote.to_symbol,
            amount_in = %quote.amount_in,
            min_out = %quote.min_out,
            "swap submitted"
        );
        self.activity.record(
            "swap_submitted",
            json!({
                "tx_hash": tx_hash,
                "from": quote.from_symbol,
                "to": quote.to_symbol,
                "amount_in": quote.amount_in,
                "min_out": quote.min_out,
            }),
        );

        // From here the hash exists; never turn a slow receipt into an
        // error that would leave the submission unrecorded.
        let succeeded = match self
            .gateway
            .wait_for_receipt(
                &tx_hash,
                self.config.receipt_poll_interval,
                self.config.receipt_timeout,
            )
            .await
        {
            Ok(TxStatus::Confirmed(_)) => Some(true),
            Ok(TxStatus::Failed(_)) => Some(false),
            Ok(_) => None,
            Err(err) => {
                warn!(%tx_hash, error = %err, "swap receipt wait ended without a receipt");
                None
            }
        };

        Ok((quote, SwapExecution { tx_hash, succeeded }))
    }

    /// Raise the router allowance to `amount_in` if it is below, waiting
    /// until the approval mines before returning.
    async fn ensure_allowance(
        &self,
        signer: &LocalSigner,
        token: &TokenRecord,
        amount_in: u128,
    ) -> Result<()> {
        let allowance = self
            .gateway
            .allowance(&token.address, signer.address(), SWAP_ROUTER_ADDRESS)
            .await?;
        if allowance >= amount_in {
            return Ok(());
        }

        let router = registry::address_bytes(SWAP_ROUTER_ADDRESS)?;
        let approve_hash = self
            .gateway
            .send_transaction(
                signer.signing_key(),
                signer.address(),
                &token.address,
                0,
                abi::erc20_approve(&router, amount_in),
                Some(self.config.approve_gas_limit),
            )
            .await?;
        info!(tx_hash = %approve_hash, token = %token.symbol, "approval submitted");

        let status = self
            .gateway
            .wait_for_receipt(
                &approve_hash,
                self.config.receipt_poll_interval,
                self.config.receipt_timeout,
            )
            .await?;
        if matches!(status, TxStatus::Failed(_)) {
            return Err(ChainError::Submission {
                reason: format!("approval {approve_hash} reverted on-chain"),
            }
            .into());
        }
        self.activity.record(
            "approval_confirmed",
            json!({ "tx_hash": approve_hash, "token": token.symbol }),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityLog;
    use crate::chain::testing::ScriptedTransport;
    use crate::error::Error;
    use crate::registry::seed_token_by_symbol;
    use std::time::Duration;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const HASH: &str = "0x64c2313bd0a21ba69e2418b35d07cb8bb2911ba613acf4cdbdbd8a24b7477dcb";

    fn record(symbol: &str) -> TokenRecord {
        TokenRecord::from(seed_token_by_symbol(symbol).unwrap())
    }

    fn signer() -> LocalSigner {
        LocalSigner::from_private_key_hex(DEV_KEY).unwrap()
    }

    fn fast_config() -> SwapConfig {
        SwapConfig {
            receipt_poll_interval: Duration::from_millis(1),
            receipt_timeout: Duration::from_millis(50),
            ..SwapConfig::default()
        }
    }

    fn engine(transport: Arc<ScriptedTransport>) -> QuoteEngine {
        QuoteEngine::new(Arc::new(ChainGateway::new(transport)), fast_config())
    }

    fn executor(transport: Arc<ScriptedTransport>) -> SwapExecutor {
        let gateway = Arc::new(ChainGateway::new(transport));
        SwapExecutor::new(
            Arc::clone(&gateway),
            Arc::new(QuoteEngine::new(gateway, fast_config())),
            Arc::new(ActivityLog::new()),
            fast_config(),
        )
    }

    /// ABI-encodes a `uint256[]` the way `getAmountsOut` returns it.
    fn amounts_reply(amounts: &[u128]) -> serde_json::Value {
        let mut data = Vec::new();
        let mut word = [0u8; 32];
        word[31] = 0x20;
        data.extend_from_slice(&word);
        let mut len = [0u8; 32];
        len[16..].copy_from_slice(&(amounts.len() as u128).to_be_bytes());
        data.extend_from_slice(&len);
        for amount in amounts {
            let mut value = [0u8; 32];
            value[16..].copy_from_slice(&amount.to_be_bytes());
            data.extend_from_slice(&value);
        }
        json!(format!("0x{}", hex::encode(data)))
    }

    fn uint_reply(value: u128) -> serde_json::Value {
        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&value.to_be_bytes());
        json!(format!("0x{}", hex::encode(word)))
    }

    /// Nonce and fee lookups for one submission. The chain id is fetched
    /// once per gateway and cached, so it is scripted separately.
    fn script_submission_preamble(transport: &ScriptedTransport) {
        transport.push("eth_getTransactionCount", json!("0x1"));
        transport.push(
            "eth_getBlockByNumber",
            json!({ "baseFeePerGas": "0x3b9aca00" }),
        );
    }

    fn confirmed_receipt() -> serde_json::Value {
        json!({
            "status": "0x1",
            "blockNumber": "0x64",
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0x3b9aca00",
        })
    }

    #[test]
    fn min_out_is_exact_integer_floor() {
        assert_eq!(min_amount_out(10_000, 50), 9_950);
        assert_eq!(min_amount_out(10_000, 0), 10_000);
        assert_eq!(min_amount_out(3, 50), 2); // floor(3 × 9950 / 10000)
        assert_eq!(min_amount_out(0, 500), 0);
        assert_eq!(min_amount_out(1_234_567, 25), 1_231_480);
    }

    #[test]
    fn native_legs_route_directly_through_wrapped() {
        let eth_to_usdc = router_path(&record("ETH"), &record("USDC")).unwrap();
        assert_eq!(
            eth_to_usdc,
            vec![
                WRAPPED_NATIVE_ADDRESS.to_string(),
                record("USDC").address.clone()
            ]
        );

        let weth_to_dai = router_path(&record("WETH"), &record("DAI")).unwrap();
        assert_eq!(weth_to_dai.len(), 2);
    }

    #[test]
    fn token_to_token_routes_two_hops() {
        let path = router_path(&record("USDC"), &record("DAI")).unwrap();
        assert_eq!(
            path,
            vec![
                record("USDC").address.clone(),
                WRAPPED_NATIVE_ADDRESS.to_string(),
                record("DAI").address.clone(),
            ]
        );
    }

    #[test]
    fn native_to_wrapped_is_unroutable() {
        let err = router_path(&record("ETH"), &record("WETH")).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::SameTokenSwap)
        ));
    }

    #[test]
    fn execution_price_is_six_places() {
        assert_eq!(execution_price("2", "5300"), "2650");
        assert_eq!(execution_price("3", "1"), "0.333333");
        assert_eq!(execution_price("0", "10"), "0");
    }

    #[tokio::test]
    async fn quote_applies_slippage_to_last_amount() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push("eth_call", amounts_reply(&[1_000_000_000_000_000_000, 2_650_000_000]));

        let quote = engine(transport)
            .quote(&record("ETH"), &record("USDC"), "1", None)
            .await
            .unwrap();

        assert_eq!(quote.expected_out_raw, 2_650_000_000);
        // default 50 bps
        assert_eq!(quote.min_out_raw, 2_636_750_000);
        assert_eq!(quote.expected_out, "2650");
        assert_eq!(quote.min_out, "2636.75");
        assert_eq!(quote.execution_price, "2650");
        assert_eq!(quote.slippage_bps, 50);
    }

    #[tokio::test]
    async fn quote_rejects_excess_slippage_before_rpc() {
        let transport = Arc::new(ScriptedTransport::default());
        let err = engine(Arc::clone(&transport))
            .quote(&record("ETH"), &record("USDC"), "1", Some(750))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Validation(ValidationError::SlippageTooHigh { bps: 750, max: 500 })
        ));
        assert_eq!(transport.remaining(), 0);
    }

    #[tokio::test]
    async fn liquidity_reverts_map_to_insufficient_liquidity() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push_rpc_error(
            "eth_call",
            3,
            "execution reverted: UniswapV2Library: INSUFFICIENT_LIQUIDITY",
        );

        let err = engine(transport)
            .quote(&record("USDC"), &record("DAI"), "100", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Quote(QuoteError::InsufficientLiquidity)
        ));
    }

    #[tokio::test]
    async fn other_reverts_map_to_quote_failed() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push_rpc_error("eth_call", 3, "execution reverted: ds-math-sub-underflow");

        let err = engine(transport)
            .quote(&record("USDC"), &record("DAI"), "100", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Quote(QuoteError::Failed { .. })));
    }

    #[tokio::test]
    async fn native_swap_skips_approval() {
        let transport = Arc::new(ScriptedTransport::default());
        // quote
        transport.push("eth_call", amounts_reply(&[1_000_000_000_000_000_000, 2_650_000_000]));
        // swap submission + receipt
        transport.push("eth_chainId", json!("0x1"));
        script_submission_preamble(&transport);
        transport.push("eth_sendRawTransaction", json!(HASH));
        transport.push("eth_getTransactionReceipt", confirmed_receipt());
        transport.push("eth_blockNumber", json!("0x64"));

        let (quote, execution) = executor(Arc::clone(&transport))
            .execute(&signer(), &record("ETH"), &record("USDC"), "1", None)
            .await
            .unwrap();

        assert_eq!(execution.tx_hash, HASH);
        assert_eq!(execution.succeeded, Some(true));
        assert_eq!(quote.min_out_raw, 2_636_750_000);
        // no allowance read, no approval: every scripted reply consumed
        assert_eq!(transport.remaining(), 0);
    }

    #[tokio::test]
    async fn token_swap_approves_then_swaps_when_allowance_is_short() {
        let transport = Arc::new(ScriptedTransport::default());
        // quote
        transport.push("eth_call", amounts_reply(&[25_000_000, 9_400_000_000_000_000]));
        // allowance read: zero
        transport.push("eth_call", uint_reply(0));
        // approval submission + mined receipt
        transport.push("eth_chainId", json!("0x1"));
        script_submission_preamble(&transport);
        transport.push("eth_sendRawTransaction", json!("0x1111111111111111111111111111111111111111111111111111111111111111"));
        transport.push("eth_getTransactionReceipt", confirmed_receipt());
        transport.push("eth_blockNumber", json!("0x64"));
        // swap submission + mined receipt
        script_submission_preamble(&transport);
        transport.push("eth_sendRawTransaction", json!(HASH));
        transport.push("eth_getTransactionReceipt", confirmed_receipt());
        transport.push("eth_blockNumber", json!("0x65"));

        let (_, execution) = executor(Arc::clone(&transport))
            .execute(&signer(), &record("USDC"), &record("ETH"), "25", None)
            .await
            .unwrap();

        assert_eq!(execution.tx_hash, HASH);
        assert_eq!(execution.succeeded, Some(true));
        assert_eq!(transport.remaining(), 0);
    }

    #[tokio::test]
    async fn sufficient_allowance_skips_approval() {
        let transport = Arc::new(ScriptedTransport::default());
        // quote, then allowance covering the input
        transport.push("eth_call", amounts_reply(&[25_000_000, 9_400_000_000_000_000]));
        transport.push("eth_call", uint_reply(u128::MAX >> 1));
        // swap only
        transport.push("eth_chainId", json!("0x1"));
        script_submission_preamble(&transport);
        transport.push("eth_sendRawTransaction", json!(HASH));
        transport.push("eth_getTransactionReceipt", confirmed_receipt());
        transport.push("eth_blockNumber", json!("0x64"));

        let (_, execution) = executor(Arc::clone(&transport))
            .execute(&signer(), &record("USDC"), &record("ETH"), "25", None)
            .await
            .unwrap();
        assert_eq!(execution.succeeded, Some(true));
        assert_eq!(transport.remaining(), 0);
    }

    #[tokio::test]
    async fn reverted_approval_aborts_before_swap() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push("eth_call", amounts_reply(&[25_000_000, 9_400_000_000_000_000]));
        transport.push("eth_call", uint_reply(0));
        transport.push("eth_chainId", json!("0x1"));
        script_submission_preamble(&transport);
        transport.push("eth_sendRawTransaction", json!("0x2222222222222222222222222222222222222222222222222222222222222222"));
        transport.push(
            "eth_getTransactionReceipt",
            json!({
                "status": "0x0",
                "blockNumber": "0x64",
                "gasUsed": "0x5208",
                "effectiveGasPrice": "0x1",
            }),
        );
        transport.push("eth_blockNumber", json!("0x64"));

        let err = executor(Arc::clone(&transport))
            .execute(&signer(), &record("USDC"), &record("ETH"), "25", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Chain(ChainError::Submission { .. })));
        // the swap itself must never have been submitted
        assert_eq!(transport.remaining(), 0);
    }

    #[tokio::test]
    async fn receipt_timeout_still_returns_the_hash() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push("eth_call", amounts_reply(&[1_000_000_000_000_000_000, 2_650_000_000]));
        transport.push("eth_chainId", json!("0x1"));
        script_submission_preamble(&transport);
        transport.push("eth_sendRawTransaction", json!(HASH));
        // pending forever: receipt null, tx known
        for _ in 0..60 {
            transport.push("eth_getTransactionReceipt", serde_json::Value::Null);
            transport.push("eth_getTransactionByHash", json!({ "hash": HASH }));
        }

        let (_, execution) = executor(transport)
            .execute(&signer(), &record("ETH"), &record("USDC"), "1", None)
            .await
            .unwrap();

        assert_eq!(execution.tx_hash, HASH);
        assert_eq!(execution.succeeded, None);
    }
}
