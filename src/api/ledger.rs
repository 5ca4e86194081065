// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger balance and history endpoints.

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::Auth,
    desk::ledger,
    error::ApiError,
    state::AppState,
    storage::LedgerEntry,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    /// Net credits minus debits per asset.
    #[schema(value_type = Object)]
    pub balances: BTreeMap<String, Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerResponse {
    pub entries: Vec<LedgerEntry>,
    pub total: usize,
}

/// Per-asset balance derived from the ledger.
#[utoipa::path(
    get,
    path = "/api/wallet/balance",
    tag = "Ledger",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Balances", body = BalanceResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn balance(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balances = ledger::balance(&state.db, &user.user_id)?;
    Ok(Json(BalanceResponse { balances }))
}

/// Ledger entries, newest first.
#[utoipa::path(
    get,
    path = "/api/wallet/ledger",
    tag = "Ledger",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Ledger history", body = LedgerResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn history(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<LedgerResponse>, ApiError> {
    let entries = ledger::history(&state.db, &user.user_id)?;
    Ok(Json(LedgerResponse {
        total: entries.len(),
        entries,
    }))
}
