//! Fiat price lookups.
//!
//! Prices come from the CoinGecko simple-price endpoint. Only symbols in
//! the id map are quotable; everything else fails fast so fiat-denominated
//! requests ("send $50 of ETH") degrade with a clear message instead of a
//! silent guess.

use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value;

use crate::config::PriceConfig;
use crate::error::PriceError;

/// Symbol to CoinGecko id. Wrapped assets quote under their own ids.
const COINGECKO_IDS: &[(&str, &str)] = &[
    ("ETH", "ethereum"),
    ("WETH", "weth"),
    ("BTC", "bitcoin"),
    ("WBTC", "wrapped-bitcoin"),
    ("USDC", "usd-coin"),
    ("USDT", "tether"),
    ("DAI", "dai"),
    ("LINK", "chainlink"),
    ("MATIC", "matic-network"),
];

pub fn coingecko_id(symbol: &str) -> Option<&'static str> {
    let symbol = symbol.trim().to_ascii_uppercase();
    COINGECKO_IDS
        .iter()
        .find(|(sym, _)| *sym == symbol)
        .map(|(_, id)| *id)
}

pub struct PriceClient {
    client: Client,
    base_url: String,
}

impl PriceClient {
    pub fn new(config: &PriceConfig) -> Result<Self, PriceError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PriceError::Http {
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Current price of one unit of `symbol` in `currency` (e.g. "usd").
    pub async fn price(&self, symbol: &str, currency: &str) -> Result<Decimal, PriceError> {
        let id = coingecko_id(symbol).ok_or_else(|| PriceError::Unavailable {
            symbol: symbol.trim().to_ascii_uppercase(),
        })?;
        let currency = normalize_currency(currency)?;

        let url = format!(
            "{}/simple/price?ids={id}&vs_currencies={currency}",
            self.base_url
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PriceError::Http {
                reason: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(PriceError::Http {
                reason: format!("price API returned {}", response.status()),
            });
        }
        let body: Value = response.json().await.map_err(|e| PriceError::Http {
            reason: e.to_string(),
        })?;

        extract_price(&body, id, &currency).ok_or_else(|| PriceError::Unavailable {
            symbol: symbol.trim().to_ascii_uppercase(),
        })
    }

    /// Token quantity worth `fiat_amount` of `currency`, rounded to 8 dp.
    pub async fn token_amount_for_fiat(
        &self,
        symbol: &str,
        currency: &str,
        fiat_amount: Decimal,
    ) -> Result<Decimal, PriceError> {
        let price = self.price(symbol, currency).await?;
        Ok((fiat_amount / price).round_dp(8))
    }
}

fn normalize_currency(currency: &str) -> Result<String, PriceError> {
    let normalized = currency.trim().to_ascii_lowercase();
    if normalized.is_empty() || !normalized.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(PriceError::UnsupportedCurrency {
            currency: currency.to_string(),
        });
    }
    Ok(normalized)
}

/// Pull `body[id][currency]` out as a positive decimal.
fn extract_price(body: &Value, id: &str, currency: &str) -> Option<Decimal> {
    let number = body.get(id)?.get(currency)?.as_number()?;
    let price = number
        .to_string()
        .parse::<Decimal>()
        .ok()
        .or_else(|| number.as_f64().and_then(Decimal::from_f64))?;
    (price > Decimal::ZERO).then_some(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn maps_symbols_case_insensitively() {
        assert_eq!(coingecko_id("eth"), Some("ethereum"));
        assert_eq!(coingecko_id(" WBTC "), Some("wrapped-bitcoin"));
        assert_eq!(coingecko_id("MATIC"), Some("matic-network"));
        assert_eq!(coingecko_id("SHIB"), None);
    }

    #[test]
    fn extracts_positive_prices_only() {
        let body = json!({ "ethereum": { "usd": 2650.43 } });
        assert_eq!(extract_price(&body, "ethereum", "usd"), Some(dec!(2650.43)));

        let zero = json!({ "ethereum": { "usd": 0 } });
        assert_eq!(extract_price(&zero, "ethereum", "usd"), None);

        let missing_currency = json!({ "ethereum": { "eur": 2400 } });
        assert_eq!(extract_price(&missing_currency, "ethereum", "usd"), None);

        assert_eq!(extract_price(&json!({}), "ethereum", "usd"), None);
    }

    #[test]
    fn rejects_garbage_currencies() {
        assert!(matches!(
            normalize_currency("usd;drop"),
            Err(PriceError::UnsupportedCurrency { .. })
        ));
        assert_eq!(normalize_currency(" USD ").unwrap(), "usd");
    }

    #[tokio::test]
    async fn unsupported_symbol_fails_before_any_request() {
        // unroutable base_url: reaching the network would error differently
        let client = PriceClient::new(&PriceConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout: std::time::Duration::from_secs(1),
        })
        .unwrap();

        let err = client.price("SHIB", "usd").await.unwrap_err();
        assert!(matches!(err, PriceError::Unavailable { symbol } if symbol == "SHIB"));
    }

    #[test]
    fn fiat_conversion_rounds_to_eight_places() {
        let amount = (dec!(1) / dec!(3)).round_dp(8);
        assert_eq!(amount, dec!(0.33333333));

        let fifty_at_twenty_five = (dec!(50) / dec!(25)).round_dp(8);
        assert_eq!(fifty_at_twenty_five, dec!(2));
    }
}
