// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CoinGecko public API client.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use super::PriceFeedError;

pub const DEFAULT_COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";
const PRICE_TIMEOUT: Duration = Duration::from_secs(10);
const HISTORY_TIMEOUT: Duration = Duration::from_secs(15);

/// Supported assets: (symbol, CoinGecko id, display name).
pub const CRYPTO_IDS: &[(&str, &str, &str)] = &[
    ("BTC", "bitcoin", "Bitcoin"),
    ("ETH", "ethereum", "Ethereum"),
    ("USDT", "tether", "Tether"),
    ("USDC", "usd-coin", "USD Coin"),
    ("BNB", "binancecoin", "BNB"),
    ("XRP", "ripple", "XRP"),
    ("SOL", "solana", "Solana"),
    ("ADA", "cardano", "Cardano"),
    ("DOGE", "dogecoin", "Dogecoin"),
    ("MATIC", "matic-network", "Polygon"),
];

pub fn coin_id(symbol: &str) -> Option<&'static str> {
    CRYPTO_IDS
        .iter()
        .find(|(s, _, _)| s.eq_ignore_ascii_case(symbol))
        .map(|(_, id, _)| *id)
}

pub fn symbol_for(id: &str) -> Option<&'static str> {
    CRYPTO_IDS
        .iter()
        .find(|(_, i, _)| *i == id)
        .map(|(symbol, _, _)| *symbol)
}

/// One entry of `/simple/price`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimplePrice {
    #[serde(default)]
    pub usd: f64,
    #[serde(default)]
    pub inr: f64,
    #[serde(default)]
    pub usd_24h_change: Option<f64>,
    #[serde(default)]
    pub inr_24h_change: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MarketChart {
    #[serde(default)]
    prices: Vec<(f64, f64)>,
}

#[derive(Debug, Deserialize)]
struct GlobalEnvelope {
    data: GlobalData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalData {
    #[serde(default)]
    pub total_market_cap: HashMap<String, f64>,
    #[serde(default)]
    pub total_volume: HashMap<String, f64>,
    #[serde(default)]
    pub market_cap_percentage: HashMap<String, f64>,
    #[serde(default)]
    pub market_cap_change_percentage_24h_usd: f64,
    #[serde(default)]
    pub active_cryptocurrencies: u64,
}

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    base_url: String,
    prices_http: reqwest::Client,
    history_http: reqwest::Client,
}

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, PriceFeedError> {
        let build = |timeout| {
            reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| PriceFeedError::Upstream(format!("failed to build HTTP client: {e}")))
        };
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            prices_http: build(PRICE_TIMEOUT)?,
            history_http: build(HISTORY_TIMEOUT)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Spot prices in USD and INR keyed by CoinGecko id.
    pub async fn simple_prices(
        &self,
        ids: &[&str],
    ) -> Result<HashMap<String, SimplePrice>, PriceFeedError> {
        let url = format!("{}/simple/price", self.base_url);
        let ids = ids.join(",");
        let query = [
            ("ids", ids.as_str()),
            ("vs_currencies", "usd,inr"),
            ("include_24hr_change", "true"),
            ("include_last_updated_at", "true"),
        ];
        get_json(self.prices_http.get(url).query(&query), "simple/price").await
    }

    /// `(timestamp_ms, price_inr)` pairs.
    pub async fn market_chart(&self, id: &str, days: u32) -> Result<Vec<(f64, f64)>, PriceFeedError> {
        let url = format!("{}/coins/{id}/market_chart", self.base_url);
        let days = days.to_string();
        let interval = if days == "1" { "hourly" } else { "daily" };
        let query = [
            ("vs_currency", "inr"),
            ("days", days.as_str()),
            ("interval", interval),
        ];
        let chart: MarketChart =
            get_json(self.history_http.get(url).query(&query), "market_chart").await?;
        Ok(chart.prices)
    }

    pub async fn global(&self) -> Result<GlobalData, PriceFeedError> {
        let url = format!("{}/global", self.base_url);
        let envelope: GlobalEnvelope = get_json(self.prices_http.get(url), "global").await?;
        Ok(envelope.data)
    }
}

async fn get_json<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
    what: &str,
) -> Result<T, PriceFeedError> {
    let response = request
        .send()
        .await
        .map_err(|e| PriceFeedError::Upstream(format!("CoinGecko {what} request failed: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(PriceFeedError::Upstream(format!(
            "CoinGecko {what} returned {status}"
        )));
    }
    response
        .json()
        .await
        .map_err(|e| PriceFeedError::Upstream(format!("CoinGecko {what} decode failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_mapping_is_case_insensitive() {
        assert_eq!(coin_id("btc"), Some("bitcoin"));
        assert_eq!(coin_id("MATIC"), Some("matic-network"));
        assert_eq!(coin_id("PEPE"), None);
        assert_eq!(symbol_for("tether"), Some("USDT"));
    }

    #[test]
    fn simple_price_tolerates_missing_change_fields() {
        let parsed: HashMap<String, SimplePrice> =
            serde_json::from_str(r#"{"bitcoin":{"usd":65000.5,"inr":5400000}}"#).unwrap();
        let btc = &parsed["bitcoin"];
        assert_eq!(btc.inr, 5_400_000.0);
        assert!(btc.usd_24h_change.is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = CoinGeckoClient::new("http://localhost:1234/api/v3/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234/api/v3");
    }
}
