//! Chain constants and the seeded token registry.
//!
//! Addresses are normalized to lowercase hex at every boundary; comparisons
//! are case-insensitive so checksummed input never causes a mismatch.

use crate::error::ValidationError;

/// Sentinel address for the chain's native coin.
pub const NATIVE_TOKEN_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Canonical wrapped-native (WETH) contract.
pub const WRAPPED_NATIVE_ADDRESS: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";

/// Uniswap-V2-style swap router.
pub const SWAP_ROUTER_ADDRESS: &str = "0x7a250d5630b4cf539739df2c5dacb4c659f2488d";

pub const NATIVE_SYMBOL: &str = "ETH";
pub const NATIVE_DECIMALS: u8 = 18;

const EXPLORER_TX_BASE_URL: &str = "https://etherscan.io/tx/";

/// Well-known token seeded into the registry at startup.
#[derive(Debug, Clone, Copy)]
pub struct SeedToken {
    pub address: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
    pub decimals: u8,
    pub is_native: bool,
}

/// Mainnet registry seed. Anything else resolves metadata on-chain.
pub const SEED_TOKENS: &[SeedToken] = &[
    SeedToken {
        address: NATIVE_TOKEN_ADDRESS,
        symbol: NATIVE_SYMBOL,
        name: "Ethereum",
        decimals: NATIVE_DECIMALS,
        is_native: true,
    },
    SeedToken {
        address: WRAPPED_NATIVE_ADDRESS,
        symbol: "WETH",
        name: "Wrapped Ether",
        decimals: 18,
        is_native: false,
    },
    SeedToken {
        address: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
        symbol: "USDC",
        name: "USD Coin",
        decimals: 6,
        is_native: false,
    },
    SeedToken {
        address: "0xdac17f958d2ee523a2206206994597c13d831ec7",
        symbol: "USDT",
        name: "Tether USD",
        decimals: 6,
        is_native: false,
    },
    SeedToken {
        address: "0x6b175474e89094c44da98b954eedeac495271d0f",
        symbol: "DAI",
        name: "Dai Stablecoin",
        decimals: 18,
        is_native: false,
    },
    SeedToken {
        address: "0x2260fac5e5542a773aa44fbcfedf7c193bc2c599",
        symbol: "WBTC",
        name: "Wrapped BTC",
        decimals: 8,
        is_native: false,
    },
];

pub fn explorer_tx_url(tx_hash: &str) -> String {
    format!("{EXPLORER_TX_BASE_URL}{tx_hash}")
}

pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

pub fn same_address(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

pub fn is_native(address: &str) -> bool {
    same_address(address, NATIVE_TOKEN_ADDRESS)
}

pub fn is_wrapped_native(address: &str) -> bool {
    same_address(address, WRAPPED_NATIVE_ADDRESS)
}

fn is_hex_body(body: &str, len: usize) -> bool {
    body.len() == len && body.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Validate and normalize a 20-byte hex address.
pub fn validate_address(address: &str) -> Result<String, ValidationError> {
    let trimmed = address.trim();
    let valid = trimmed
        .strip_prefix("0x")
        .is_some_and(|body| is_hex_body(body, 40));
    if !valid {
        return Err(ValidationError::InvalidAddress {
            address: trimmed.to_string(),
        });
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// Validate a 32-byte transaction hash (`0x` + 64 hex chars).
pub fn validate_tx_hash(hash: &str) -> Result<String, ValidationError> {
    let trimmed = hash.trim();
    let valid = trimmed
        .strip_prefix("0x")
        .is_some_and(|body| is_hex_body(body, 64));
    if !valid {
        return Err(ValidationError::MalformedIntent {
            reason: format!("'{trimmed}' is not a transaction hash"),
        });
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// Decode an address into its 20 raw bytes.
pub fn address_bytes(address: &str) -> Result<[u8; 20], ValidationError> {
    let normalized = validate_address(address)?;
    let mut out = [0u8; 20];
    hex::decode_to_slice(&normalized[2..], &mut out).map_err(|_| {
        ValidationError::InvalidAddress {
            address: normalized.clone(),
        }
    })?;
    Ok(out)
}

/// Look up a seed token by symbol (case-insensitive).
pub fn seed_token_by_symbol(symbol: &str) -> Option<&'static SeedToken> {
    SEED_TOKENS
        .iter()
        .find(|t| t.symbol.eq_ignore_ascii_case(symbol.trim()))
}
