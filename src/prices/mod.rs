// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Live market data from CoinGecko.
//!
//! Spot prices and the global market overview are cached for 60 s. When a
//! refresh fails the last good value is served; only a cold cache surfaces
//! [`PriceFeedError::Upstream`]. Chart history is kept in a small LRU keyed
//! by `(symbol, days)`.

pub mod cache;
pub mod coingecko;

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

pub use cache::{LruTtlCache, TtlCache};
pub use coingecko::{CoinGeckoClient, CRYPTO_IDS, DEFAULT_COINGECKO_API_URL};

use crate::providers::env_or_default;

pub const PRICE_TTL: Duration = Duration::from_secs(60);
const HISTORY_TTL: Duration = Duration::from_secs(300);
const HISTORY_CAPACITY: usize = 64;
pub const MAX_HISTORY_DAYS: u32 = 365;

#[derive(Debug, thiserror::Error)]
pub enum PriceFeedError {
    #[error("Unsupported symbol: {0}")]
    UnsupportedSymbol(String),

    #[error("days must be between 1 and {MAX_HISTORY_DAYS}, got {0}")]
    InvalidRange(u32),

    #[error("Price feed unavailable: {0}")]
    Upstream(String),
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssetPrice {
    pub usd: f64,
    pub inr: f64,
    pub usd_24h_change: f64,
    pub inr_24h_change: f64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PricePoint {
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    pub price: f64,
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MarketOverview {
    pub total_market_cap: f64,
    pub total_volume_24h: f64,
    pub market_cap_percentage: BTreeMap<String, f64>,
    pub market_cap_change_24h: f64,
    pub active_cryptocurrencies: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SupportedAsset {
    pub symbol: String,
    pub coingecko_id: String,
    pub name: String,
}

type PriceTable = BTreeMap<String, AssetPrice>;

/// Chart history keyed by `(symbol, days)`.
pub type HistoryCache = LruTtlCache<(String, u32), Vec<PricePoint>>;

pub struct PriceService {
    client: CoinGeckoClient,
    prices: TtlCache<PriceTable>,
    market: TtlCache<MarketOverview>,
    history: HistoryCache,
}

impl PriceService {
    pub fn new(client: CoinGeckoClient, ttl: Duration) -> Self {
        Self {
            client,
            prices: TtlCache::new(ttl),
            market: TtlCache::new(ttl),
            history: HistoryCache::new(HISTORY_CAPACITY, HISTORY_TTL),
        }
    }

    /// Reads `COINGECKO_API_URL`, defaulting to the public endpoint.
    pub fn from_env() -> Result<Self, PriceFeedError> {
        let base_url = env_or_default("COINGECKO_API_URL", DEFAULT_COINGECKO_API_URL);
        Ok(Self::new(CoinGeckoClient::new(base_url)?, PRICE_TTL))
    }

    /// Prices for `symbols`, or every supported asset when `None`.
    /// Unknown symbols are left out of the result.
    pub async fn prices(&self, symbols: Option<&[String]>) -> Result<PriceTable, PriceFeedError> {
        let table = match self.prices.fresh().await {
            Some(table) => table,
            None => self.refresh_prices().await?,
        };
        Ok(match symbols {
            None => table,
            Some(symbols) => symbols
                .iter()
                .filter_map(|s| {
                    let key = s.to_ascii_uppercase();
                    table.get(&key).map(|p| (key, p.clone()))
                })
                .collect(),
        })
    }

    async fn refresh_prices(&self) -> Result<PriceTable, PriceFeedError> {
        let ids: Vec<&str> = CRYPTO_IDS.iter().map(|(_, id, _)| *id).collect();
        match self.client.simple_prices(&ids).await {
            Ok(raw) => {
                let now = Utc::now();
                let table: PriceTable = raw
                    .into_iter()
                    .filter_map(|(id, p)| {
                        coingecko::symbol_for(&id).map(|symbol| {
                            (
                                symbol.to_string(),
                                AssetPrice {
                                    usd: p.usd,
                                    inr: p.inr,
                                    usd_24h_change: p.usd_24h_change.unwrap_or_default(),
                                    inr_24h_change: p.inr_24h_change.unwrap_or_default(),
                                    last_updated: now,
                                },
                            )
                        })
                    })
                    .collect();
                info!(count = table.len(), "Fetched crypto prices");
                self.prices.store(table.clone()).await;
                Ok(table)
            }
            Err(e) => match self.prices.stale().await {
                Some(stale) => {
                    warn!(error = %e, "Price refresh failed; serving cached prices");
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }

    pub async fn history(&self, symbol: &str, days: u32) -> Result<Vec<PricePoint>, PriceFeedError> {
        if !(1..=MAX_HISTORY_DAYS).contains(&days) {
            return Err(PriceFeedError::InvalidRange(days));
        }
        let id = coingecko::coin_id(symbol)
            .ok_or_else(|| PriceFeedError::UnsupportedSymbol(symbol.to_string()))?;

        let key = (symbol.to_ascii_uppercase(), days);
        if let Some(points) = self.history.get(&key) {
            return Ok(points);
        }

        let points: Vec<PricePoint> = self
            .client
            .market_chart(id, days)
            .await?
            .into_iter()
            .filter_map(|(ts, price)| price_point(ts as i64, price))
            .collect();
        self.history.put(key, points.clone());
        Ok(points)
    }

    pub async fn market(&self) -> Result<MarketOverview, PriceFeedError> {
        if let Some(overview) = self.market.fresh().await {
            return Ok(overview);
        }
        match self.client.global().await {
            Ok(data) => {
                let overview = MarketOverview {
                    total_market_cap: data.total_market_cap.get("inr").copied().unwrap_or_default(),
                    total_volume_24h: data.total_volume.get("inr").copied().unwrap_or_default(),
                    market_cap_percentage: data.market_cap_percentage.into_iter().collect(),
                    market_cap_change_24h: data.market_cap_change_percentage_24h_usd,
                    active_cryptocurrencies: data.active_cryptocurrencies,
                };
                self.market.store(overview.clone()).await;
                Ok(overview)
            }
            Err(e) => match self.market.stale().await {
                Some(stale) => {
                    warn!(error = %e, "Market refresh failed; serving cached overview");
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }

    pub fn supported(&self) -> Vec<SupportedAsset> {
        CRYPTO_IDS
            .iter()
            .map(|(symbol, id, name)| SupportedAsset {
                symbol: symbol.to_string(),
                coingecko_id: id.to_string(),
                name: name.to_string(),
            })
            .collect()
    }

    #[cfg(test)]
    pub(crate) async fn seed_prices(&self, table: PriceTable) {
        self.prices.store(table).await;
    }
}

fn price_point(timestamp: i64, price: f64) -> Option<PricePoint> {
    let at = DateTime::<Utc>::from_timestamp_millis(timestamp)?;
    Some(PricePoint {
        timestamp,
        price,
        date: at.format("%Y-%m-%d").to_string(),
        time: at.format("%H:%M").to_string(),
    })
}
