//! End-to-end wallet flows against a scripted node.
//!
//! These tests drive the public orchestrator API the way an embedding chat
//! layer would, with every JSON-RPC reply scripted:
//! - create a wallet, refresh balances, send native coin, watch the monitor
//!   settle the record into history
//! - import a known key and run a token swap through the approval path
//! - execute chat intents and check the reply strings
//! - authentication gating on custodial operations

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

use custodia::chain::{ChainGateway, RpcTransport};
use custodia::config::{
    BalanceConfig, ChainConfig, Config, MonitorConfig, OracleConfig, PriceConfig, SwapConfig,
};
use custodia::error::{ChainError, Error, ValidationError};
use custodia::intent::{SendEntities, WalletIntent};
use custodia::oracle::AesGcmOracle;
use custodia::prices::PriceClient;
use custodia::store::{
    MemoryStore, Store, TransactionKind, TransactionRecord, TransactionStatus, TransactionStore,
    seed_default_tokens,
};
use custodia::{SessionIdentity, WalletOrchestrator};

const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const DEV_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
const RECIPIENT: &str = "0x2222222222222222222222222222222222222222";
const SEND_HASH: &str = "0x64c2313bd0a21ba69e2418b35d07cb8bb2911ba613acf4cdbdbd8a24b7477dcb";
const APPROVE_HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";
const SWAP_HASH: &str = "0x3333333333333333333333333333333333333333333333333333333333333333";

/// Per-method reply queues; a request with nothing queued panics so an
/// unexpected RPC call fails the test loudly.
#[derive(Default)]
struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Result<Value, ChainError>>>>,
}

impl ScriptedTransport {
    fn push(&self, method: &str, value: Value) {
        self.replies
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(Ok(value));
    }

    fn remaining(&self) -> usize {
        self.replies
            .lock()
            .unwrap()
            .values()
            .map(VecDeque::len)
            .sum()
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn request(&self, method: &str, _params: Value) -> Result<Value, ChainError> {
        self.replies
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| panic!("no scripted reply for {method}"))
    }
}

fn test_config() -> Config {
    Config {
        chain: ChainConfig {
            rpc_url: Url::parse("http://127.0.0.1:9").unwrap(),
            request_timeout: Duration::from_millis(200),
        },
        swap: SwapConfig {
            receipt_poll_interval: Duration::from_millis(1),
            receipt_timeout: Duration::from_millis(500),
            ..SwapConfig::default()
        },
        monitor: MonitorConfig {
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_secs(1),
            transfer_refresh_delays: Vec::new(),
            swap_refresh_delays: Vec::new(),
        },
        balances: BalanceConfig {
            min_refresh_interval: Duration::ZERO,
        },
        oracle: OracleConfig {
            master_key: SecretString::from("wallet-flow-master-key"),
        },
        prices: PriceConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout: Duration::from_millis(200),
        },
    }
}

struct Session {
    orchestrator: WalletOrchestrator,
    transport: Arc<ScriptedTransport>,
    store: Arc<MemoryStore>,
}

async fn session(authenticated: bool) -> Session {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let config = test_config();
    let transport = Arc::new(ScriptedTransport::default());
    let store = Arc::new(MemoryStore::new());
    seed_default_tokens(store.as_ref()).await.unwrap();

    let orchestrator = WalletOrchestrator::new(
        SessionIdentity {
            user_id: "flow-user".to_string(),
            authenticated,
        },
        Arc::clone(&store) as Arc<dyn Store>,
        Arc::new(AesGcmOracle::new(&config.oracle).unwrap()),
        Arc::new(ChainGateway::new(
            Arc::clone(&transport) as Arc<dyn RpcTransport>
        )),
        PriceClient::new(&config.prices).unwrap(),
        &config,
    );
    Session {
        orchestrator,
        transport,
        store,
    }
}

fn uint_reply(value: u128) -> Value {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    json!(format!("0x{}", hex::encode(word)))
}

fn amounts_reply(amounts: &[u128]) -> Value {
    let mut data = Vec::new();
    let mut offset = [0u8; 32];
    offset[31] = 0x20;
    data.extend_from_slice(&offset);
    let mut len = [0u8; 32];
    len[16..].copy_from_slice(&(amounts.len() as u128).to_be_bytes());
    data.extend_from_slice(&len);
    for amount in amounts {
        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&amount.to_be_bytes());
        data.extend_from_slice(&word);
    }
    json!(format!("0x{}", hex::encode(data)))
}

fn confirmed_receipt() -> Value {
    json!({
        "status": "0x1",
        "blockNumber": "0x64",
        "gasUsed": "0x5208",
        "effectiveGasPrice": "0x3b9aca00",
    })
}

/// One balance pass: native lookup plus the five seeded ERC-20s.
fn script_refresh(transport: &ScriptedTransport, native_wei: &str) {
    transport.push("eth_getBalance", json!(native_wei));
    for _ in 0..5 {
        transport.push("eth_call", uint_reply(0));
    }
}

/// A monitor poll finding the receipt, then the post-settle refresh.
fn script_settlement(transport: &ScriptedTransport) {
    transport.push("eth_getTransactionReceipt", confirmed_receipt());
    transport.push("eth_blockNumber", json!("0x65"));
    script_refresh(transport, "0xde0b6b3a7640000");
}

async fn wait_for_terminal(store: &MemoryStore, tx_hash: &str) -> TransactionRecord {
    for _ in 0..500 {
        if let Some(row) = store.transaction_by_hash(tx_hash).await.unwrap() {
            if row.status.is_terminal() {
                return row;
            }
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("transaction {tx_hash} never reached a terminal status");
}

#[tokio::test]
async fn create_refresh_send_and_settle() {
    let s = session(true).await;

    let wallet = s.orchestrator.create_wallet().await.unwrap();
    assert!(wallet.is_active);
    assert!(wallet.encrypted_private_key.is_some());

    // 1.5 ETH, nothing else
    script_refresh(&s.transport, "0x14d1120d7b160000");
    let tokens = s.orchestrator.refresh_balances().await.unwrap();
    assert_eq!(tokens.len(), 6);
    assert_eq!(tokens[0].balance, "1.5");
    assert!(tokens[0].is_native);

    s.transport.push("eth_chainId", json!("0x1"));
    s.transport.push("eth_getTransactionCount", json!("0x0"));
    s.transport.push(
        "eth_getBlockByNumber",
        json!({ "baseFeePerGas": "0x3b9aca00" }),
    );
    s.transport.push("eth_estimateGas", json!("0x5208"));
    s.transport.push("eth_sendRawTransaction", json!(SEND_HASH));
    script_settlement(&s.transport);

    let hash = s.orchestrator.send(RECIPIENT, "0.25", None).await.unwrap();
    assert_eq!(hash, SEND_HASH);

    let row = wait_for_terminal(&s.store, SEND_HASH).await;
    assert_eq!(row.kind, TransactionKind::Send);
    assert_eq!(row.status, TransactionStatus::Confirmed);
    assert_eq!(row.block_number, Some(100));
    assert_eq!(row.network_fee.as_deref(), Some("0.000021"));
    assert_eq!(row.amount, "0.25");
    assert_eq!(row.token_symbol, "ETH");

    let history = s.orchestrator.transaction_history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].tx_hash, SEND_HASH);

    let reply = s
        .orchestrator
        .execute_intent(&WalletIntent::TransactionHistoryInfo)
        .await
        .unwrap();
    assert!(reply.contains("Sent 0.25 ETH to 0x2222...2222 (confirmed)"));

    let actions: Vec<String> = s
        .orchestrator
        .activity()
        .iter()
        .map(|e| e.action.clone())
        .collect();
    assert!(actions.contains(&"wallet_created".to_string()));
    assert!(actions.contains(&"transfer_submitted".to_string()));
    assert!(actions.contains(&"transaction_settled".to_string()));
}

#[tokio::test]
async fn token_swap_runs_the_approval_path() {
    let s = session(true).await;
    let wallet = s.orchestrator.import_wallet(DEV_KEY).await.unwrap();
    assert_eq!(wallet.address, DEV_ADDRESS);

    // Quote for 100 USDC -> DAI through the wrapped-native hop, a zero
    // allowance, approval, then the router swap, each with its receipt.
    s.transport.push(
        "eth_call",
        amounts_reply(&[
            100_000_000,
            40_000_000_000_000_000,
            99_500_000_000_000_000_000,
        ]),
    );
    s.transport.push("eth_call", uint_reply(0));
    s.transport.push("eth_chainId", json!("0x1"));
    s.transport.push("eth_getTransactionCount", json!("0x0"));
    s.transport.push(
        "eth_getBlockByNumber",
        json!({ "baseFeePerGas": "0x3b9aca00" }),
    );
    s.transport
        .push("eth_sendRawTransaction", json!(APPROVE_HASH));
    s.transport
        .push("eth_getTransactionReceipt", confirmed_receipt());
    s.transport.push("eth_blockNumber", json!("0x64"));
    s.transport.push("eth_getTransactionCount", json!("0x1"));
    s.transport.push(
        "eth_getBlockByNumber",
        json!({ "baseFeePerGas": "0x3b9aca00" }),
    );
    s.transport.push("eth_sendRawTransaction", json!(SWAP_HASH));
    s.transport
        .push("eth_getTransactionReceipt", confirmed_receipt());
    s.transport.push("eth_blockNumber", json!("0x65"));
    script_settlement(&s.transport);

    let hash = s
        .orchestrator
        .swap("USDC", "DAI", "100", None)
        .await
        .unwrap();
    assert_eq!(hash, SWAP_HASH);

    let row = wait_for_terminal(&s.store, SWAP_HASH).await;
    assert_eq!(row.kind, TransactionKind::Swap);
    assert_eq!(row.status, TransactionStatus::Confirmed);
    assert_eq!(row.token_symbol, "USDC");
    assert_eq!(row.amount, "100");
    assert_eq!(row.to_token_symbol.as_deref(), Some("DAI"));
    assert_eq!(row.to_amount.as_deref(), Some("99.5"));

    let actions: Vec<String> = s
        .orchestrator
        .activity()
        .iter()
        .map(|e| e.action.clone())
        .collect();
    assert!(actions.contains(&"approval_confirmed".to_string()));
    assert!(actions.contains(&"swap_submitted".to_string()));
    assert!(actions.contains(&"transaction_settled".to_string()));
}

#[tokio::test]
async fn chat_intents_end_to_end() {
    let s = session(true).await;

    let reply = s
        .orchestrator
        .execute_intent(&WalletIntent::CheckBalance)
        .await
        .unwrap();
    assert_eq!(
        reply,
        "You don't have an active wallet yet. Would you like me to help you create one?"
    );

    s.orchestrator.create_wallet().await.unwrap();

    // 2 ETH and 75 USDC
    s.transport
        .push("eth_getBalance", json!("0x1bc16d674ec80000"));
    s.transport.push("eth_call", uint_reply(0));
    s.transport.push("eth_call", uint_reply(75_000_000));
    s.transport.push("eth_call", uint_reply(0));
    s.transport.push("eth_call", uint_reply(0));
    s.transport.push("eth_call", uint_reply(0));

    let reply = s
        .orchestrator
        .execute_intent(&WalletIntent::CheckBalance)
        .await
        .unwrap();
    assert!(reply.contains("2.000000 ETH"));
    assert!(reply.contains("75.00 USDC"));

    let reply = s
        .orchestrator
        .execute_intent(&WalletIntent::WalletInfo)
        .await
        .unwrap();
    assert!(reply.starts_with("Your active wallet is 0x"));

    assert_eq!(s.transport.remaining(), 0);
}

#[tokio::test]
async fn send_intent_replies_with_an_explorer_link() {
    let s = session(true).await;
    s.orchestrator.create_wallet().await.unwrap();

    s.transport.push("eth_chainId", json!("0x1"));
    s.transport.push("eth_getTransactionCount", json!("0x0"));
    s.transport.push(
        "eth_getBlockByNumber",
        json!({ "baseFeePerGas": "0x3b9aca00" }),
    );
    s.transport.push("eth_estimateGas", json!("0x5208"));
    s.transport.push("eth_sendRawTransaction", json!(SEND_HASH));
    script_settlement(&s.transport);

    let intent = WalletIntent::Send {
        entities: SendEntities {
            address: Some(RECIPIENT.to_string()),
            amount: Some("0.1".to_string()),
            ..SendEntities::default()
        },
    };
    let reply = s.orchestrator.execute_intent(&intent).await.unwrap();
    assert!(reply.starts_with(&format!(
        "Transaction sent! View on Etherscan: https://etherscan.io/tx/{SEND_HASH}"
    )));

    wait_for_terminal(&s.store, SEND_HASH).await;
}

#[tokio::test]
async fn custodial_operations_require_authentication() {
    let s = session(false).await;

    let err = s.orchestrator.create_wallet().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::NotAuthenticated)
    ));
    let err = s.orchestrator.import_wallet(DEV_KEY).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::NotAuthenticated)
    ));
    let err = s.orchestrator.send(RECIPIENT, "1", None).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::NotAuthenticated)
    ));

    // conversational intents still answer
    let reply = s
        .orchestrator
        .execute_intent(&WalletIntent::Greeting)
        .await
        .unwrap();
    assert_eq!(reply, "Hey there! How can I help with your crypto today?");
}
