//! Single boundary to the EVM JSON-RPC node.
//!
//! Everything that talks to the chain goes through [`ChainGateway`]; the
//! transport behind it is a trait so tests script node behavior without a
//! network. Amounts cross this boundary as raw `u128` base units only.

pub mod abi;
#[cfg(test)]
pub(crate) mod testing;
pub mod tx;
pub mod units;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::debug;

use crate::config::ChainConfig;
use crate::error::ChainError;
use crate::registry;

/// Priority tip offered on every transaction, in wei (1.5 gwei).
const PRIORITY_FEE_WEI: u128 = 1_500_000_000;

/// Raw JSON-RPC transport.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError>;
}

/// HTTP transport over reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: url::Url,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(config: &ChainConfig) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChainError::Network {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint: config.rpc_url.clone(),
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChainError::Network {
                reason: format!("node returned HTTP {status}"),
            });
        }

        let payload: Value = response.json().await?;
        if let Some(error) = payload.get("error").filter(|e| !e.is_null()) {
            return Err(ChainError::Rpc {
                code: error.get("code").and_then(Value::as_i64).unwrap_or(-1),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown RPC error")
                    .to_string(),
            });
        }
        payload
            .get("result")
            .cloned()
            .ok_or_else(|| ChainError::InvalidResponse {
                reason: format!("{method} response has neither result nor error"),
            })
    }
}

/// EIP-1559 fee data for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub base_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
}

/// Inclusion details once a transaction has a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInclusion {
    pub block_number: u64,
    pub confirmations: u64,
    pub gas_used: u128,
    pub effective_gas_price: u128,
}

impl TxInclusion {
    /// Network fee paid, in native decimal units.
    pub fn fee_native(&self) -> String {
        let fee_wei = self.gas_used.saturating_mul(self.effective_gas_price);
        units::from_base_units(fee_wei, registry::NATIVE_DECIMALS)
    }
}

/// Four-way transaction state as seen by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// The node does not know the hash at all.
    NotFound,
    /// Known to the node, no receipt yet.
    Pending,
    Confirmed(TxInclusion),
    Failed(TxInclusion),
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Pending => "pending",
            Self::Confirmed(_) => "confirmed",
            Self::Failed(_) => "failed",
        }
    }
}

/// On-chain ERC-20 metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

pub struct ChainGateway {
    transport: Arc<dyn RpcTransport>,
    chain_id: OnceCell<u64>,
}

impl ChainGateway {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            transport,
            chain_id: OnceCell::new(),
        }
    }

    pub fn http(config: &ChainConfig) -> Result<Self, ChainError> {
        Ok(Self::new(Arc::new(HttpTransport::new(config)?)))
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        self.transport.request(method, params).await
    }

    async fn request_quantity(&self, method: &str, params: Value) -> Result<u128, ChainError> {
        let value = self.request(method, params).await?;
        units::parse_quantity(require_str(&value, method)?)
    }

    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        self.chain_id
            .get_or_try_init(|| async {
                let raw = self.request("eth_chainId", json!([])).await?;
                units::parse_quantity_u64(require_str(&raw, "eth_chainId")?)
            })
            .await
            .copied()
    }

    pub async fn block_number(&self) -> Result<u64, ChainError> {
        let raw = self.request("eth_blockNumber", json!([])).await?;
        units::parse_quantity_u64(require_str(&raw, "eth_blockNumber")?)
    }

    pub async fn native_balance(&self, address: &str) -> Result<u128, ChainError> {
        self.request_quantity("eth_getBalance", json!([address, "latest"]))
            .await
    }

    /// Call a read-only contract function, returning the decoded bytes.
    pub async fn call(&self, to: &str, data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
        let call = json!({ "to": to, "data": format!("0x{}", hex::encode(&data)) });
        let raw = self.request("eth_call", json!([call, "latest"])).await?;
        let body = require_str(&raw, "eth_call")?
            .strip_prefix("0x")
            .ok_or_else(|| ChainError::InvalidResponse {
                reason: "eth_call result missing 0x prefix".to_string(),
            })?;
        hex::decode(body).map_err(|e| ChainError::InvalidResponse {
            reason: format!("eth_call returned invalid hex: {e}"),
        })
    }

    pub async fn token_balance(&self, token: &str, holder: &str) -> Result<u128, ChainError> {
        let data = abi::erc20_balance_of(&addr20(holder)?);
        abi::decode_uint(&self.call(token, data).await?)
    }

    pub async fn token_metadata(&self, token: &str) -> Result<TokenMetadata, ChainError> {
        let decimals = abi::decode_u8(&self.call(token, abi::erc20_decimals()).await?)?;
        let symbol = abi::decode_string(&self.call(token, abi::erc20_symbol()).await?)?;
        let name = abi::decode_string(&self.call(token, abi::erc20_name()).await?)?;
        Ok(TokenMetadata {
            symbol,
            name,
            decimals,
        })
    }

    pub async fn allowance(
        &self,
        token: &str,
        owner: &str,
        spender: &str,
    ) -> Result<u128, ChainError> {
        let data = abi::erc20_allowance(&addr20(owner)?, &addr20(spender)?);
        abi::decode_uint(&self.call(token, data).await?)
    }

    /// Next usable nonce, counting mempool transactions.
    pub async fn nonce(&self, address: &str) -> Result<u64, ChainError> {
        let raw = self
            .request("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        units::parse_quantity_u64(require_str(&raw, "eth_getTransactionCount")?)
    }

    pub async fn fee_estimate(&self) -> Result<FeeEstimate, ChainError> {
        let block = self
            .request("eth_getBlockByNumber", json!(["latest", false]))
            .await?;
        let base_fee = block
            .get("baseFeePerGas")
            .and_then(Value::as_str)
            .ok_or_else(|| ChainError::InvalidResponse {
                reason: "latest block has no baseFeePerGas".to_string(),
            })
            .and_then(units::parse_quantity)?;

        Ok(FeeEstimate {
            base_fee_per_gas: base_fee,
            max_priority_fee_per_gas: PRIORITY_FEE_WEI,
            // headroom for two max-inflation blocks
            max_fee_per_gas: base_fee.saturating_mul(2).saturating_add(PRIORITY_FEE_WEI),
        })
    }

    /// Estimate gas for a call, with 20% headroom on the node's answer.
    pub async fn estimate_gas(
        &self,
        from: &str,
        to: &str,
        value: u128,
        data: &[u8],
    ) -> Result<u64, ChainError> {
        let mut call = json!({ "from": from, "to": to });
        if value > 0 {
            call["value"] = Value::String(units::format_quantity(value));
        }
        if !data.is_empty() {
            call["data"] = Value::String(format!("0x{}", hex::encode(data)));
        }
        let raw = self.request("eth_estimateGas", json!([call])).await?;
        let estimated = units::parse_quantity_u64(require_str(&raw, "eth_estimateGas")?)?;
        Ok(estimated + estimated / 5)
    }

    /// Submit raw signed bytes. Node-level rejection surfaces as
    /// [`ChainError::Submission`]; transport failure stays `Network`.
    pub async fn submit(&self, raw: &[u8]) -> Result<String, ChainError> {
        let payload = format!("0x{}", hex::encode(raw));
        match self
            .request("eth_sendRawTransaction", json!([payload]))
            .await
        {
            Ok(result) => {
                let hash = require_str(&result, "eth_sendRawTransaction")?;
                Ok(hash.to_ascii_lowercase())
            }
            Err(ChainError::Rpc { message, .. }) => {
                Err(ChainError::Submission { reason: message })
            }
            Err(other) => Err(other),
        }
    }

    /// Resolve the full nonce/fee/gas/sign/submit sequence for one
    /// transaction and return its hash.
    pub async fn send_transaction(
        &self,
        key: &SigningKey,
        from: &str,
        to: &str,
        value: u128,
        data: Vec<u8>,
        gas_limit: Option<u64>,
    ) -> Result<String, ChainError> {
        let chain_id = self.chain_id().await?;
        let nonce = self.nonce(from).await?;
        let fees = self.fee_estimate().await?;
        let gas_limit = match gas_limit {
            Some(limit) => limit,
            None => self.estimate_gas(from, to, value, &data).await?,
        };

        let params = tx::TxParams {
            chain_id,
            nonce,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            max_fee_per_gas: fees.max_fee_per_gas,
            gas_limit,
            to: addr20(to)?,
            value,
            data,
        };
        let raw = tx::sign_transaction(key, &params)?;

        debug!(nonce, gas_limit, to, "submitting transaction");
        self.submit(&raw).await
    }

    /// Four-way status check: missing hash, pending, confirmed, reverted.
    pub async fn status(&self, tx_hash: &str) -> Result<TxStatus, ChainError> {
        let receipt = self
            .request("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        if receipt.is_null() {
            let known = self
                .request("eth_getTransactionByHash", json!([tx_hash]))
                .await?;
            return Ok(if known.is_null() {
                TxStatus::NotFound
            } else {
                TxStatus::Pending
            });
        }

        let block_number = receipt
            .get("blockNumber")
            .and_then(Value::as_str)
            .ok_or_else(|| ChainError::InvalidResponse {
                reason: "receipt has no blockNumber".to_string(),
            })
            .and_then(units::parse_quantity_u64)?;
        let gas_used = receipt
            .get("gasUsed")
            .and_then(Value::as_str)
            .map(units::parse_quantity)
            .transpose()?
            .unwrap_or(0);
        let effective_gas_price = receipt
            .get("effectiveGasPrice")
            .and_then(Value::as_str)
            .map(units::parse_quantity)
            .transpose()?
            .unwrap_or(0);

        let current = self.block_number().await?;
        let inclusion = TxInclusion {
            block_number,
            confirmations: current.saturating_sub(block_number) + 1,
            gas_used,
            effective_gas_price,
        };

        let succeeded = receipt
            .get("status")
            .and_then(Value::as_str)
            .is_some_and(|s| s == "0x1");
        Ok(if succeeded {
            TxStatus::Confirmed(inclusion)
        } else {
            TxStatus::Failed(inclusion)
        })
    }

    /// Poll until the transaction has a receipt. The `Ok` value is always
    /// `Confirmed` or `Failed`; running out of time is `ReceiptTimeout`.
    pub async fn wait_for_receipt(
        &self,
        tx_hash: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<TxStatus, ChainError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.status(tx_hash).await {
                Ok(TxStatus::Confirmed(inclusion)) => return Ok(TxStatus::Confirmed(inclusion)),
                Ok(TxStatus::Failed(inclusion)) => return Ok(TxStatus::Failed(inclusion)),
                Ok(_) => {}
                Err(ChainError::Network { reason }) => {
                    debug!(tx_hash, %reason, "node unreachable while waiting for receipt");
                }
                Err(other) => return Err(other),
            }
            if Instant::now() >= deadline {
                return Err(ChainError::ReceiptTimeout {
                    tx_hash: tx_hash.to_string(),
                    waited: timeout,
                });
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

fn addr20(address: &str) -> Result<[u8; 20], ChainError> {
    registry::address_bytes(address).map_err(|_| ChainError::InvalidResponse {
        reason: format!("'{address}' is not a usable address"),
    })
}

fn require_str<'v>(value: &'v Value, context: &str) -> Result<&'v str, ChainError> {
    value.as_str().ok_or_else(|| ChainError::InvalidResponse {
        reason: format!("{context} result is not a string"),
    })
}
