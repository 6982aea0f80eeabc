//! Configuration for the wallet engine.
//!
//! Everything resolves from environment variables. `Config::from_env` layers
//! `./.env` via dotenvy first (never overwriting real env vars), then runs
//! each domain resolver. Required keys fail loudly with a hint; optional keys
//! fall back to the defaults below.

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::ConfigError;

const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SLIPPAGE_BPS: u32 = 50;
const DEFAULT_MAX_SLIPPAGE_BPS: u32 = 500;
const DEFAULT_DEADLINE_MINUTES: u64 = 20;
const DEFAULT_SWAP_GAS_LIMIT: u64 = 500_000;
const DEFAULT_APPROVE_GAS_LIMIT: u64 = 100_000;
const DEFAULT_RECEIPT_POLL_SECS: u64 = 2;
const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 600;
const DEFAULT_MONITOR_POLL_SECS: u64 = 15;
const DEFAULT_MONITOR_TIMEOUT_SECS: u64 = 600;
const DEFAULT_BALANCE_REFRESH_MIN_SECS: u64 = 3;
const DEFAULT_TRANSFER_REFRESH_SECS: &[u64] = &[5];
const DEFAULT_SWAP_REFRESH_SECS: &[u64] = &[2, 5, 10, 20];
const DEFAULT_PRICE_API_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Main configuration for the engine.
#[derive(Debug, Clone)]
pub struct Config {
    pub chain: ChainConfig,
    pub swap: SwapConfig,
    pub monitor: MonitorConfig,
    pub balances: BalanceConfig,
    pub oracle: OracleConfig,
    pub prices: PriceConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Loads `./.env` via dotenvy first; dotenvy never overwrites vars that
    /// are already set, so real env always wins.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Ok(Self {
            chain: ChainConfig::resolve()?,
            swap: SwapConfig::resolve()?,
            monitor: MonitorConfig::resolve()?,
            balances: BalanceConfig::resolve()?,
            oracle: OracleConfig::resolve()?,
            prices: PriceConfig::resolve()?,
        })
    }
}

/// Node endpoint configuration.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: Url,
    pub request_timeout: Duration,
}

impl ChainConfig {
    pub fn resolve() -> Result<Self, ConfigError> {
        let raw = helpers::require_env(
            "CHAIN_RPC_URL",
            "Set CHAIN_RPC_URL to an EVM JSON-RPC endpoint, \
             e.g. https://eth-mainnet.g.alchemy.com/v2/<key>",
        )?;
        let rpc_url = Url::parse(&raw).map_err(|e| ConfigError::InvalidValue {
            key: "CHAIN_RPC_URL".to_string(),
            message: format!("not a valid URL: {e}"),
        })?;

        let timeout_secs =
            helpers::parse_env("CHAIN_RPC_TIMEOUT_SECS", DEFAULT_RPC_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CHAIN_RPC_TIMEOUT_SECS".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        Ok(Self {
            rpc_url,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Swap execution configuration.
///
/// Gas limits are explicit rather than estimated: router calls with freshly
/// granted allowances estimate unreliably on some nodes.
#[derive(Debug, Clone)]
pub struct SwapConfig {
    pub default_slippage_bps: u32,
    pub max_slippage_bps: u32,
    pub deadline_minutes: u64,
    pub swap_gas_limit: u64,
    pub approve_gas_limit: u64,
    pub receipt_poll_interval: Duration,
    pub receipt_timeout: Duration,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            default_slippage_bps: DEFAULT_SLIPPAGE_BPS,
            max_slippage_bps: DEFAULT_MAX_SLIPPAGE_BPS,
            deadline_minutes: DEFAULT_DEADLINE_MINUTES,
            swap_gas_limit: DEFAULT_SWAP_GAS_LIMIT,
            approve_gas_limit: DEFAULT_APPROVE_GAS_LIMIT,
            receipt_poll_interval: Duration::from_secs(DEFAULT_RECEIPT_POLL_SECS),
            receipt_timeout: Duration::from_secs(DEFAULT_RECEIPT_TIMEOUT_SECS),
        }
    }
}

impl SwapConfig {
    pub fn resolve() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let default_slippage_bps =
            helpers::parse_env("SWAP_DEFAULT_SLIPPAGE_BPS", defaults.default_slippage_bps)?;
        let max_slippage_bps =
            helpers::parse_env("SWAP_MAX_SLIPPAGE_BPS", defaults.max_slippage_bps)?;
        if max_slippage_bps >= 10_000 {
            return Err(ConfigError::InvalidValue {
                key: "SWAP_MAX_SLIPPAGE_BPS".to_string(),
                message: "must be below 10000 (100%)".to_string(),
            });
        }
        if default_slippage_bps > max_slippage_bps {
            return Err(ConfigError::InvalidValue {
                key: "SWAP_DEFAULT_SLIPPAGE_BPS".to_string(),
                message: format!("must not exceed SWAP_MAX_SLIPPAGE_BPS ({max_slippage_bps})"),
            });
        }

        let deadline_minutes =
            helpers::parse_env("SWAP_DEADLINE_MINUTES", defaults.deadline_minutes)?;
        if deadline_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SWAP_DEADLINE_MINUTES".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        Ok(Self {
            default_slippage_bps,
            max_slippage_bps,
            deadline_minutes,
            swap_gas_limit: helpers::parse_env("SWAP_GAS_LIMIT", defaults.swap_gas_limit)?,
            approve_gas_limit: helpers::parse_env(
                "SWAP_APPROVE_GAS_LIMIT",
                defaults.approve_gas_limit,
            )?,
            receipt_poll_interval: helpers::duration_secs_env(
                "SWAP_RECEIPT_POLL_SECS",
                DEFAULT_RECEIPT_POLL_SECS,
            )?,
            receipt_timeout: helpers::duration_secs_env(
                "SWAP_RECEIPT_TIMEOUT_SECS",
                DEFAULT_RECEIPT_TIMEOUT_SECS,
            )?,
        })
    }
}

/// Transaction monitor configuration.
///
/// The refresh delay lists are tuning knobs: swaps move two balances and
/// nodes lag differently behind the head, so swaps refresh on a staggered
/// schedule while plain transfers get a single delayed pass.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub transfer_refresh_delays: Vec<Duration>,
    pub swap_refresh_delays: Vec<Duration>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_MONITOR_POLL_SECS),
            timeout: Duration::from_secs(DEFAULT_MONITOR_TIMEOUT_SECS),
            transfer_refresh_delays: DEFAULT_TRANSFER_REFRESH_SECS
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
            swap_refresh_delays: DEFAULT_SWAP_REFRESH_SECS
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
        }
    }
}

impl MonitorConfig {
    pub fn resolve() -> Result<Self, ConfigError> {
        let poll_interval =
            helpers::duration_secs_env("MONITOR_POLL_SECS", DEFAULT_MONITOR_POLL_SECS)?;
        if poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "MONITOR_POLL_SECS".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        Ok(Self {
            poll_interval,
            timeout: helpers::duration_secs_env(
                "MONITOR_TIMEOUT_SECS",
                DEFAULT_MONITOR_TIMEOUT_SECS,
            )?,
            transfer_refresh_delays: helpers::duration_list_env(
                "MONITOR_TRANSFER_REFRESH_SECS",
                DEFAULT_TRANSFER_REFRESH_SECS,
            )?,
            swap_refresh_delays: helpers::duration_list_env(
                "MONITOR_SWAP_REFRESH_SECS",
                DEFAULT_SWAP_REFRESH_SECS,
            )?,
        })
    }
}

/// Balance cache configuration.
#[derive(Debug, Clone)]
pub struct BalanceConfig {
    pub min_refresh_interval: Duration,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            min_refresh_interval: Duration::from_secs(DEFAULT_BALANCE_REFRESH_MIN_SECS),
        }
    }
}

impl BalanceConfig {
    pub fn resolve() -> Result<Self, ConfigError> {
        Ok(Self {
            min_refresh_interval: helpers::duration_secs_env(
                "BALANCE_REFRESH_MIN_SECS",
                DEFAULT_BALANCE_REFRESH_MIN_SECS,
            )?,
        })
    }
}

/// Key-encryption oracle configuration.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub master_key: SecretString,
}

impl OracleConfig {
    pub fn resolve() -> Result<Self, ConfigError> {
        let master_key = helpers::require_env(
            "WALLET_MASTER_KEY",
            "Set WALLET_MASTER_KEY to the key-encryption master secret; \
             without it stored wallet keys cannot be decrypted",
        )?;
        Ok(Self {
            master_key: SecretString::from(master_key),
        })
    }
}

/// Fiat price lookup configuration.
#[derive(Debug, Clone)]
pub struct PriceConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PRICE_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl PriceConfig {
    pub fn resolve() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            base_url: helpers::optional_env("PRICE_API_BASE_URL")
                .unwrap_or(defaults.base_url)
                .trim_end_matches('/')
                .to_string(),
            request_timeout: helpers::duration_secs_env("PRICE_API_TIMEOUT_SECS", 10)?,
        })
    }
}

mod helpers {
    use super::*;

    /// Read an env var, treating unset and empty as absent.
    pub(crate) fn optional_env(key: &str) -> Option<String> {
        match std::env::var(key) {
            Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
            _ => None,
        }
    }

    pub(crate) fn require_env(key: &str, hint: &str) -> Result<String, ConfigError> {
        optional_env(key).ok_or_else(|| ConfigError::MissingRequired {
            key: key.to_string(),
            hint: hint.to_string(),
        })
    }

    pub(crate) fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        optional_env(key)
            .map(|s| s.parse())
            .transpose()
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("must be a valid number: {e}"),
            })
            .map(|v| v.unwrap_or(default))
    }

    pub(crate) fn duration_secs_env(key: &str, default_secs: u64) -> Result<Duration, ConfigError> {
        parse_env(key, default_secs).map(Duration::from_secs)
    }

    /// Comma-separated list of seconds, e.g. `"2,5,10,20"`.
    pub(crate) fn duration_list_env(
        key: &str,
        default_secs: &[u64],
    ) -> Result<Vec<Duration>, ConfigError> {
        let Some(raw) = optional_env(key) else {
            return Ok(default_secs.iter().map(|s| Duration::from_secs(*s)).collect());
        };
        raw.split(',')
            .map(|part| {
                part.trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: format!("expected comma-separated seconds: {e}"),
                    })
            })
            .collect()
    }
}
