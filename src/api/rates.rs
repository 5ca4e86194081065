// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{auth::Auth, desk::rates, error::ApiError, state::AppState, storage::AssetRate};

/// Effective buy/sell rates for the caller.
///
/// A rate reserved for the caller replaces the global rate of that asset.
#[utoipa::path(
    get,
    path = "/api/rates",
    tag = "Rates",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Effective rates", body = [AssetRate]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_rates(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<AssetRate>>, ApiError> {
    Ok(Json(rates::rates_for(&state.db, &user.user_id)?))
}
