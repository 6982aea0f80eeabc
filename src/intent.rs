//! Structured chat intents.
//!
//! Classification happens upstream; this boundary only has to turn an
//! already-classified payload into something the orchestrator can trust.
//! The enum is closed: a tag outside it fails deserialization instead of
//! reaching dispatch.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Entities the classifier may attach to a send request. An amount arrives
/// either directly (`amount`) or as a fiat triple (`currency_amount` +
/// `currency_symbol` + `target_token_symbol`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SendEntities {
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub token_symbol: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub currency_amount: Option<String>,
    #[serde(default)]
    pub currency_symbol: Option<String>,
    #[serde(default)]
    pub target_token_symbol: Option<String>,
}

impl SendEntities {
    /// True when the fiat triple is fully present.
    pub fn has_fiat_request(&self) -> bool {
        present(&self.currency_amount) && present(&self.currency_symbol) && present(&self.target_token_symbol)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SwapEntities {
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub from_token_symbol: Option<String>,
    #[serde(default)]
    pub to_token_symbol: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum WalletIntent {
    Greeting,
    CheckBalance,
    Send {
        #[serde(default)]
        entities: SendEntities,
    },
    Swap {
        #[serde(default)]
        entities: SwapEntities,
    },
    WalletInfo,
    CreateWalletInfo,
    Help,
    TransactionHistoryInfo,
    RefreshBalances,
    CryptoQuestion,
    Unknown,
}

impl WalletIntent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::CheckBalance => "check_balance",
            Self::Send { .. } => "send",
            Self::Swap { .. } => "swap",
            Self::WalletInfo => "wallet_info",
            Self::CreateWalletInfo => "create_wallet_info",
            Self::Help => "help",
            Self::TransactionHistoryInfo => "transaction_history_info",
            Self::RefreshBalances => "refresh_balances",
            Self::CryptoQuestion => "crypto_question",
            Self::Unknown => "unknown",
        }
    }

    /// Per-variant completeness checks, before any resolution work.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Send { entities } => validate_send(entities),
            Self::Swap { entities } => validate_swap(entities),
            _ => Ok(()),
        }
    }
}

fn validate_send(entities: &SendEntities) -> Result<(), ValidationError> {
    if !present(&entities.address) {
        return Err(ValidationError::MissingField {
            field: "address".to_string(),
        });
    }

    if entities.has_fiat_request() {
        if let Some(amount) = entities.currency_amount.as_deref() {
            require_plain_decimal(amount)?;
        }
        return Ok(());
    }

    match entities.amount.as_deref() {
        Some(amount) if !amount.trim().is_empty() => require_plain_decimal(amount),
        _ => Err(ValidationError::MissingField {
            field: "amount".to_string(),
        }),
    }
}

fn validate_swap(entities: &SwapEntities) -> Result<(), ValidationError> {
    let amount = entities
        .amount
        .as_deref()
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| ValidationError::MissingField {
            field: "amount".to_string(),
        })?;
    require_plain_decimal(amount)?;

    let from = entities
        .from_token_symbol
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ValidationError::MissingField {
            field: "from_token_symbol".to_string(),
        })?;
    let to = entities
        .to_token_symbol
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ValidationError::MissingField {
            field: "to_token_symbol".to_string(),
        })?;

    if from.trim().eq_ignore_ascii_case(to.trim()) {
        return Err(ValidationError::SameTokenSwap);
    }
    Ok(())
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Amounts cross this boundary as plain decimal strings. Exponents, signs
/// and anything else `parse::<f64>` would tolerate are rejected here.
fn require_plain_decimal(amount: &str) -> Result<(), ValidationError> {
    let trimmed = amount.trim();
    let plain = !trimmed.is_empty()
        && trimmed.chars().all(|c| c.is_ascii_digit() || c == '.')
        && trimmed.chars().filter(|c| *c == '.').count() <= 1
        && trimmed.chars().any(|c| c.is_ascii_digit());
    if plain {
        Ok(())
    } else {
        Err(ValidationError::MalformedIntent {
            reason: format!("'{amount}' is not a plain decimal amount"),
        })
    }
}
