//! Error types for the wallet engine.

use std::time::Duration;

use serde::Serialize;

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Quote error: {0}")]
    Quote(#[from] QuoteError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Price error: {0}")]
    Price(#[from] PriceError),
}

/// Failure domains surfaced to the chat layer.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorDomain {
    Validation,
    Key,
    Chain,
    Quote,
    Store,
    Config,
    Price,
}

/// Structured error payload for status events and chat replies.
///
/// `retryable` means the runtime may transparently re-attempt the operation.
/// Fund-moving failures are never retryable; only read-path transport
/// failures are.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub domain: ErrorDomain,
    pub code: &'static str,
    pub retryable: bool,
    pub message: String,
}

impl ErrorPayload {
    fn new(
        domain: ErrorDomain,
        code: &'static str,
        retryable: bool,
        message: impl Into<String>,
    ) -> Self {
        Self {
            domain,
            code,
            retryable,
            message: message.into(),
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Rejected user input or unmet operation preconditions.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("Invalid address: {address}")]
    InvalidAddress { address: String },

    #[error("Unknown token: {symbol}")]
    UnknownToken { symbol: String },

    #[error("Cannot swap a token for itself")]
    SameTokenSwap,

    #[error("Slippage {bps} bps exceeds the allowed maximum of {max} bps")]
    SlippageTooHigh { bps: u32, max: u32 },

    #[error("No active wallet for this session")]
    NoActiveWallet,

    #[error("Session is not authenticated")]
    NotAuthenticated,

    #[error("Wallet with address {address} already exists for this user")]
    DuplicateWallet { address: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Malformed intent: {reason}")]
    MalformedIntent { reason: String },
}

/// Key custody errors. Messages never carry key material.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("No encrypted key material for wallet {wallet_id}")]
    NotFound { wallet_id: String },

    #[error("Key decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    #[error("Key encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    #[error("Resolved signer {derived} does not match wallet address {expected}")]
    AddressMismatch { expected: String, derived: String },

    #[error("Invalid key material: {reason}")]
    InvalidKeyMaterial { reason: String },

    #[error("Invalid mnemonic: {reason}")]
    InvalidMnemonic { reason: String },
}

/// Errors at the node boundary.
///
/// `Network` is transport-level (the node was unreachable); `Rpc` means the
/// node answered with an error; `Submission` means the node rejected a signed
/// transaction. Callers rely on the distinction.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Network error reaching node: {reason}")]
    Network { reason: String },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Transaction submission failed: {reason}")]
    Submission { reason: String },

    #[error("Malformed RPC response: {reason}")]
    InvalidResponse { reason: String },

    #[error("Timed out waiting for receipt of {tx_hash} after {waited:?}")]
    ReceiptTimeout { tx_hash: String, waited: Duration },
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            reason: err.to_string(),
        }
    }
}

/// Swap quoting errors. Recoverable by the user, never auto-retried.
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error("Insufficient liquidity for this trade")]
    InsufficientLiquidity,

    #[error("Quote failed: {reason}")]
    Failed { reason: String },
}

/// Persistence backend errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Conflict(String),

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Fiat price lookup errors.
#[derive(Debug, thiserror::Error)]
pub enum PriceError {
    #[error("No price available for {symbol}")]
    Unavailable { symbol: String },

    #[error("Unsupported fiat currency: {currency}")]
    UnsupportedCurrency { currency: String },

    #[error("Price lookup failed: {reason}")]
    Http { reason: String },
}

impl ValidationError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "validation.invalid_amount",
            Self::InvalidAddress { .. } => "validation.invalid_address",
            Self::UnknownToken { .. } => "validation.unknown_token",
            Self::SameTokenSwap => "validation.same_token_swap",
            Self::SlippageTooHigh { .. } => "validation.slippage_too_high",
            Self::NoActiveWallet => "validation.no_active_wallet",
            Self::NotAuthenticated => "validation.not_authenticated",
            Self::DuplicateWallet { .. } => "validation.duplicate_wallet",
            Self::MissingField { .. } => "validation.missing_field",
            Self::MalformedIntent { .. } => "validation.malformed_intent",
        }
    }
}

impl KeyError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "key.not_found",
            Self::DecryptionFailed { .. } => "key.decryption_failed",
            Self::EncryptionFailed { .. } => "key.encryption_failed",
            Self::AddressMismatch { .. } => "key.address_mismatch",
            Self::InvalidKeyMaterial { .. } => "key.invalid_material",
            Self::InvalidMnemonic { .. } => "key.invalid_mnemonic",
        }
    }
}

impl ChainError {
    fn to_error_payload(&self) -> ErrorPayload {
        match self {
            Self::Network { .. } => {
                ErrorPayload::new(ErrorDomain::Chain, "chain.network", true, self.to_string())
            }
            Self::Rpc { .. } => {
                ErrorPayload::new(ErrorDomain::Chain, "chain.rpc", false, self.to_string())
            }
            Self::Submission { .. } => ErrorPayload::new(
                ErrorDomain::Chain,
                "chain.submission_failed",
                false,
                self.to_string(),
            ),
            Self::InvalidResponse { .. } => ErrorPayload::new(
                ErrorDomain::Chain,
                "chain.invalid_response",
                false,
                self.to_string(),
            ),
            Self::ReceiptTimeout { .. } => ErrorPayload::new(
                ErrorDomain::Chain,
                "chain.receipt_timeout",
                true,
                self.to_string(),
            ),
        }
    }
}

impl Error {
    /// Map engine errors into a structured surface for the chat layer.
    pub fn to_error_payload(&self) -> ErrorPayload {
        match self {
            Self::Validation(err) => {
                ErrorPayload::new(ErrorDomain::Validation, err.code(), false, err.to_string())
            }
            Self::Key(err) => {
                ErrorPayload::new(ErrorDomain::Key, err.code(), false, err.to_string())
            }
            Self::Chain(err) => err.to_error_payload(),
            Self::Quote(err) => match err {
                QuoteError::InsufficientLiquidity => ErrorPayload::new(
                    ErrorDomain::Quote,
                    "quote.insufficient_liquidity",
                    false,
                    err.to_string(),
                ),
                QuoteError::Failed { .. } => {
                    ErrorPayload::new(ErrorDomain::Quote, "quote.failed", false, err.to_string())
                }
            },
            Self::Store(err) => match err {
                StoreError::NotFound { .. } => ErrorPayload::new(
                    ErrorDomain::Store,
                    "store.not_found",
                    false,
                    err.to_string(),
                ),
                StoreError::Conflict(_) => {
                    ErrorPayload::new(ErrorDomain::Store, "store.conflict", false, err.to_string())
                }
                _ => {
                    ErrorPayload::new(ErrorDomain::Store, "store.backend", false, err.to_string())
                }
            },
            Self::Config(err) => ErrorPayload::new(
                ErrorDomain::Config,
                match err {
                    ConfigError::MissingRequired { .. } => "config.missing_required",
                    ConfigError::InvalidValue { .. } => "config.invalid_value",
                },
                false,
                err.to_string(),
            ),
            Self::Price(err) => match err {
                PriceError::Http { .. } => {
                    ErrorPayload::new(ErrorDomain::Price, "price.http", true, err.to_string())
                }
                PriceError::Unavailable { .. } => ErrorPayload::new(
                    ErrorDomain::Price,
                    "price.unavailable",
                    false,
                    err.to_string(),
                ),
                PriceError::UnsupportedCurrency { .. } => ErrorPayload::new(
                    ErrorDomain::Price,
                    "price.unsupported_currency",
                    false,
                    err.to_string(),
                ),
            },
        }
    }
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
