// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Market price endpoints backed by the cached CoinGecko feed.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::Auth,
    desk::DeskError,
    error::ApiError,
    prices::{AssetPrice, MarketOverview, PricePoint, SupportedAsset},
    state::AppState,
};

const DEFAULT_HISTORY_DAYS: u32 = 7;

#[derive(Debug, Deserialize, IntoParams)]
pub struct PricesQuery {
    /// Comma-separated symbols such as `BTC,ETH,USDT`. All when omitted.
    pub symbols: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Days of history, 1 to 365.
    #[param(default = 7, minimum = 1, maximum = 365)]
    pub days: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PricesResponse {
    pub success: bool,
    pub prices: BTreeMap<String, AssetPrice>,
    pub supported_symbols: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChartConfig {
    pub x_axis: String,
    pub y_axis: String,
    pub currency: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    pub success: bool,
    pub symbol: String,
    pub days: u32,
    pub data: Vec<PricePoint>,
    pub chart_config: ChartConfig,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarketResponse {
    pub success: bool,
    pub market: MarketOverview,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SupportedResponse {
    pub success: bool,
    pub symbols: Vec<String>,
    pub details: Vec<SupportedAsset>,
}

/// Live USD and INR prices with 24 h change.
///
/// Served from cache while fresh; the last good table is returned when
/// CoinGecko is unreachable.
#[utoipa::path(
    get,
    path = "/api/crypto/prices",
    tag = "Crypto",
    security(("bearer_auth" = [])),
    params(PricesQuery),
    responses(
        (status = 200, description = "Prices", body = PricesResponse),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Price feed unavailable and nothing cached")
    )
)]
pub async fn prices(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Query(query): Query<PricesQuery>,
) -> Result<Json<PricesResponse>, ApiError> {
    let symbols = query.symbols.map(|raw| split_symbols(&raw));
    let prices = state
        .prices
        .prices(symbols.as_deref())
        .await
        .map_err(DeskError::from)?;
    Ok(Json(PricesResponse {
        success: true,
        prices,
        supported_symbols: supported_symbols(&state),
    }))
}

#[utoipa::path(
    get,
    path = "/api/crypto/prices/{symbol}/history",
    tag = "Crypto",
    security(("bearer_auth" = [])),
    params(("symbol" = String, Path, description = "Asset symbol, e.g. BTC"), HistoryQuery),
    responses(
        (status = 200, description = "Price history", body = HistoryResponse),
        (status = 400, description = "Unsupported symbol or range"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Price feed unavailable")
    )
)]
pub async fn history(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let symbol = symbol.to_ascii_uppercase();
    let days = query.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    let data = state
        .prices
        .history(&symbol, days)
        .await
        .map_err(DeskError::from)?;
    Ok(Json(HistoryResponse {
        success: true,
        symbol,
        days,
        data,
        chart_config: ChartConfig {
            x_axis: if days > 1 { "date" } else { "time" }.into(),
            y_axis: "price".into(),
            currency: "INR".into(),
        },
    }))
}

#[utoipa::path(
    get,
    path = "/api/crypto/market",
    tag = "Crypto",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Global market figures", body = MarketResponse),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Price feed unavailable and nothing cached")
    )
)]
pub async fn market(
    Auth(_user): Auth,
    State(state): State<AppState>,
) -> Result<Json<MarketResponse>, ApiError> {
    let market = state.prices.market().await.map_err(DeskError::from)?;
    Ok(Json(MarketResponse {
        success: true,
        market,
    }))
}

#[utoipa::path(
    get,
    path = "/api/crypto/supported",
    tag = "Crypto",
    responses((status = 200, description = "Supported assets", body = SupportedResponse))
)]
pub async fn supported(State(state): State<AppState>) -> Json<SupportedResponse> {
    Json(SupportedResponse {
        success: true,
        symbols: supported_symbols(&state),
        details: state.prices.supported(),
    })
}

fn supported_symbols(state: &AppState) -> Vec<String> {
    state.prices.supported().into_iter().map(|a| a.symbol).collect()
}

fn split_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_list_ignores_blanks() {
        assert_eq!(split_symbols("btc, ETH,,usdt "), vec!["btc", "ETH", "usdt"]);
        assert!(split_symbols(" , ").is_empty());
    }
}
