//! Native and ERC-20 transfer submission.
//!
//! Executors validate and submit, then return the hash immediately; mining
//! and terminal state belong to the transaction monitor. A rejected
//! submission surfaces as an error with nothing persisted.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::activity::ActivitySink;
use crate::chain::{ChainGateway, abi, units};
use crate::error::Result;
use crate::keys::LocalSigner;
use crate::registry::{self, NATIVE_DECIMALS, NATIVE_SYMBOL};
use crate::store::TokenRecord;

pub struct TransferExecutor {
    gateway: Arc<ChainGateway>,
    activity: Arc<dyn ActivitySink>,
}

impl TransferExecutor {
    pub fn new(gateway: Arc<ChainGateway>, activity: Arc<dyn ActivitySink>) -> Self {
        Self { gateway, activity }
    }

    /// Send native coin. `amount` is a plain decimal string.
    pub async fn send_native(
        &self,
        signer: &LocalSigner,
        to: &str,
        amount: &str,
    ) -> Result<String> {
        let to = registry::validate_address(to)?;
        let value = units::to_positive_base_units(amount, NATIVE_DECIMALS)?;

        let hash = self
            .gateway
            .send_transaction(
                signer.signing_key(),
                signer.address(),
                &to,
                value,
                Vec::new(),
                None,
            )
            .await?;

        info!(tx_hash = %hash, to = %to, amount, "native transfer submitted");
        self.activity.record(
            "transfer_submitted",
            json!({
                "tx_hash": hash,
                "to": to,
                "amount": amount,
                "token": NATIVE_SYMBOL,
            }),
        );
        Ok(hash)
    }

    /// Send an ERC-20 token via `transfer(address,uint256)`.
    pub async fn send_token(
        &self,
        signer: &LocalSigner,
        to: &str,
        amount: &str,
        token: &TokenRecord,
    ) -> Result<String> {
        let to = registry::validate_address(to)?;
        let raw = units::to_positive_base_units(amount, token.decimals)?;
        let data = abi::erc20_transfer(&registry::address_bytes(&to)?, raw);

        let hash = self
            .gateway
            .send_transaction(
                signer.signing_key(),
                signer.address(),
                &token.address,
                0,
                data,
                None,
            )
            .await?;

        info!(
            tx_hash = %hash,
            to = %to,
            amount,
            token = %token.symbol,
            "token transfer submitted"
        );
        self.activity.record(
            "transfer_submitted",
            json!({
                "tx_hash": hash,
                "to": to,
                "amount": amount,
                "token": token.symbol,
            }),
        );
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityLog;
    use crate::chain::testing::ScriptedTransport;
    use crate::error::{ChainError, Error, ValidationError};
    use crate::registry::seed_token_by_symbol;
    use serde_json::json;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const RECIPIENT: &str = "0x2222222222222222222222222222222222222222";
    const HASH: &str = "0x64c2313bd0a21ba69e2418b35d07cb8bb2911ba613acf4cdbdbd8a24b7477dcb";

    fn signer() -> LocalSigner {
        LocalSigner::from_private_key_hex(DEV_KEY).unwrap()
    }

    fn executor(transport: Arc<ScriptedTransport>) -> TransferExecutor {
        TransferExecutor::new(
            Arc::new(ChainGateway::new(transport)),
            Arc::new(ActivityLog::new()),
        )
    }

    /// Scripts the nonce/fee/gas sequence `send_transaction` performs
    /// before submitting.
    fn script_submission_preamble(transport: &ScriptedTransport) {
        transport.push("eth_chainId", json!("0x1"));
        transport.push("eth_getTransactionCount", json!("0x5"));
        transport.push(
            "eth_getBlockByNumber",
            json!({ "baseFeePerGas": "0x3b9aca00" }),
        );
        transport.push("eth_estimateGas", json!("0x5208"));
    }

    #[tokio::test]
    async fn native_transfer_returns_hash_at_submission() {
        let transport = Arc::new(ScriptedTransport::default());
        script_submission_preamble(&transport);
        transport.push("eth_sendRawTransaction", json!(HASH));

        let hash = executor(Arc::clone(&transport))
            .send_native(&signer(), RECIPIENT, "0.5")
            .await
            .unwrap();

        assert_eq!(hash, HASH);
        // no receipt polling after submission
        assert_eq!(transport.remaining(), 0);
    }

    #[tokio::test]
    async fn token_transfer_uses_zero_value_and_calldata() {
        let transport = Arc::new(ScriptedTransport::default());
        script_submission_preamble(&transport);
        transport.push("eth_sendRawTransaction", json!(HASH));

        let usdc = TokenRecord::from(seed_token_by_symbol("USDC").unwrap());
        let hash = executor(transport)
            .send_token(&signer(), RECIPIENT, "25", &usdc)
            .await
            .unwrap();
        assert_eq!(hash, HASH);
    }

    #[tokio::test]
    async fn invalid_amounts_fail_before_any_rpc() {
        let transport = Arc::new(ScriptedTransport::default());
        let executor = executor(Arc::clone(&transport));

        for bad in ["0", "-1", "1e18", "abc", ""] {
            let err = executor
                .send_native(&signer(), RECIPIENT, bad)
                .await
                .unwrap_err();
            assert!(
                matches!(err, Error::Validation(ValidationError::InvalidAmount { .. })),
                "amount {bad:?} produced {err:?}"
            );
        }
        assert_eq!(transport.remaining(), 0);
    }

    #[tokio::test]
    async fn excess_token_precision_is_rejected() {
        let transport = Arc::new(ScriptedTransport::default());
        let usdc = TokenRecord::from(seed_token_by_symbol("USDC").unwrap());

        // USDC has 6 decimals; 7 fractional digits cannot be represented
        let err = executor(transport)
            .send_token(&signer(), RECIPIENT, "1.0000001", &usdc)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidAmount { .. })
        ));
    }

    #[tokio::test]
    async fn bad_recipient_is_rejected_before_any_rpc() {
        let transport = Arc::new(ScriptedTransport::default());
        let err = executor(Arc::clone(&transport))
            .send_native(&signer(), "0xnot-an-address", "1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidAddress { .. })
        ));
        assert_eq!(transport.remaining(), 0);
    }

    #[tokio::test]
    async fn node_rejection_surfaces_as_submission_error() {
        let transport = Arc::new(ScriptedTransport::default());
        script_submission_preamble(&transport);
        transport.push_rpc_error("eth_sendRawTransaction", -32000, "insufficient funds");

        let err = executor(transport)
            .send_native(&signer(), RECIPIENT, "10")
            .await
            .unwrap_err();
        match err {
            Error::Chain(ChainError::Submission { reason }) => {
                assert_eq!(reason, "insufficient funds");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
