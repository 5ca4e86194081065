// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Saved withdrawal wallet endpoints.
//!
//! Wallets start `pending` and need admin verification before they can be
//! made primary. All operations enforce ownership.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::MessageResponse;
use crate::{
    auth::Auth,
    desk::wallets::{self, NewWallet},
    error::ApiError,
    state::AppState,
    storage::SavedWallet,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SaveWalletRequest {
    pub asset: String,
    pub network: String,
    pub wallet_address: String,
    pub label: String,
    /// Screenshot proving control of the address.
    #[serde(default)]
    pub proof_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletResponse {
    pub success: bool,
    pub message: String,
    pub wallet: SavedWallet,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletListResponse {
    pub wallets: Vec<SavedWallet>,
    pub total: usize,
}

impl From<Vec<SavedWallet>> for WalletListResponse {
    fn from(wallets: Vec<SavedWallet>) -> Self {
        Self {
            total: wallets.len(),
            wallets,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/wallets/save",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    request_body = SaveWalletRequest,
    responses(
        (status = 201, description = "Wallet saved for verification", body = WalletResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Address already saved")
    )
)]
pub async fn save_wallet(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<SaveWalletRequest>,
) -> Result<(StatusCode, Json<WalletResponse>), ApiError> {
    let input = NewWallet {
        asset: request.asset,
        network: request.network,
        wallet_address: request.wallet_address,
        label: request.label,
        proof_image: request.proof_image,
    };
    let wallet = wallets::save(&state.db, &user.user_id, input)?;
    Ok((
        StatusCode::CREATED,
        Json(WalletResponse {
            success: true,
            message: "Wallet saved. Pending admin verification.".into(),
            wallet,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/wallets/my-wallets",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All saved wallets", body = WalletListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn my_wallets(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<WalletListResponse>, ApiError> {
    Ok(Json(wallets::list(&state.db, &user.user_id)?.into()))
}

/// Verified wallets only, usable as withdrawal targets.
#[utoipa::path(
    get,
    path = "/api/wallets/verified",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Verified wallets", body = WalletListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn verified_wallets(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<WalletListResponse>, ApiError> {
    Ok(Json(wallets::list_verified(&state.db, &user.user_id)?.into()))
}

#[utoipa::path(
    get,
    path = "/api/wallets/{id}",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Wallet id")),
    responses(
        (status = 200, description = "Wallet", body = SavedWallet),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn get_wallet(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
) -> Result<Json<SavedWallet>, ApiError> {
    Ok(Json(wallets::get(&state.db, &user, &wallet_id)?))
}

/// Make a verified wallet the primary one for its asset.
#[utoipa::path(
    put,
    path = "/api/wallets/{id}/set-primary",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Wallet id")),
    responses(
        (status = 200, description = "Primary wallet set", body = WalletResponse),
        (status = 400, description = "Wallet not verified"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn set_primary(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
) -> Result<Json<WalletResponse>, ApiError> {
    let wallet = wallets::set_primary(&state.db, &user, &wallet_id)?;
    Ok(Json(WalletResponse {
        success: true,
        message: "Primary wallet updated".into(),
        wallet,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/wallets/{id}",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Wallet id")),
    responses(
        (status = 200, description = "Wallet deleted", body = MessageResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn delete_wallet(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    wallets::delete(&state.db, &user, &wallet_id)?;
    Ok(Json(MessageResponse::ok("Wallet deleted")))
}
