// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! KYC submission and status for the signed-in user.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::Auth,
    desk::kyc::{self, KycStatusView},
    error::ApiError,
    notify::Template,
    state::AppState,
    storage::{KycCheck, KycDetails, KycDocument, KycStatus},
};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct KycSubmitResponse {
    pub success: bool,
    pub message: String,
    pub kyc_id: String,
    pub status: KycStatus,
    /// Automated checks run on this submission.
    pub verification: Vec<KycCheck>,
}

/// Submit or resubmit documents. The account moves to `under_review`.
///
/// PAN, Aadhaar and bank details are checked with the configured KYC
/// provider; the results are stored for the reviewing admin.
#[utoipa::path(
    post,
    path = "/api/kyc/submit",
    tag = "KYC",
    security(("bearer_auth" = [])),
    request_body = KycDetails,
    responses(
        (status = 200, description = "Documents submitted", body = KycSubmitResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "KYC already approved")
    )
)]
pub async fn submit(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(details): Json<KycDetails>,
) -> Result<Json<KycSubmitResponse>, ApiError> {
    let stored = kyc::submit(&state.db, &user.profile, details)?;
    let document = match kyc::verify_submission(&state.db, &state.kyc, &stored).await {
        Ok(checked) => checked,
        Err(e) => {
            tracing::warn!(kyc_id = %stored.id, error = %e, "Could not record KYC checks");
            stored
        }
    };

    state.notifier.email(
        &state.config.otc_email,
        Template::AdminKycSubmitted {
            user_id: user.user_id.clone(),
            client_uid: user.profile.client_uid.clone(),
            email: user.profile.email.clone(),
            mobile: user.profile.mobile.clone(),
        },
    );

    Ok(Json(KycSubmitResponse {
        success: true,
        message: "KYC submitted for review".into(),
        kyc_id: document.id,
        status: document.status,
        verification: document.verification,
    }))
}

#[utoipa::path(
    get,
    path = "/api/kyc/status",
    tag = "KYC",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current KYC state", body = KycStatusView),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn status(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<KycStatusView>, ApiError> {
    Ok(Json(kyc::status(&state.db, &user.profile)?))
}

/// The user's own submitted document.
#[utoipa::path(
    get,
    path = "/api/kyc/document",
    tag = "KYC",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Submitted document", body = KycDocument),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Nothing submitted yet")
    )
)]
pub async fn document(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<KycDocument>, ApiError> {
    Ok(Json(kyc::document(&state.db, &user.user_id)?))
}
