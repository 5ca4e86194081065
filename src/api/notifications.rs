// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client-initiated emails that hand KYC, wallet and bank details to the
//! desk team. The recipient is always a desk mailbox from configuration and
//! the client identity comes from the session.

use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use super::MessageResponse;
use crate::{auth::Auth, error::ApiError, notify::Template, state::AppState};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct KycNotice {
    #[serde(default)]
    pub pan_number: Option<String>,
    #[serde(default)]
    pub aadhaar_number: Option<String>,
    #[serde(default)]
    pub passport_number: Option<String>,
    #[serde(default)]
    pub is_nri: bool,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct KycNoticeRequest {
    pub kyc_data: KycNotice,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WalletNotice {
    /// `exchange`, `custodial` or `self_custody`.
    #[serde(default)]
    pub wallet_type: Option<String>,
    #[serde(default)]
    pub exchange_name: Option<String>,
    pub asset: String,
    pub wallet_address: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WalletNoticeRequest {
    pub wallet_data: WalletNotice,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BankNotice {
    pub account_holder: String,
    pub account_number: String,
    pub ifsc_code: String,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BankNoticeRequest {
    pub bank_data: BankNotice,
}

fn required(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    Ok(())
}

/// Email the client's KYC details to the support mailbox.
#[utoipa::path(
    post,
    path = "/api/notifications/send-kyc",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    request_body = KycNoticeRequest,
    responses(
        (status = 200, description = "Notification queued", body = MessageResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn send_kyc(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<KycNoticeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let data = request.kyc_data;
    state.notifier.email(
        &state.config.support_email,
        Template::ClientKycDetails {
            client_uid: user.profile.client_uid.clone(),
            email: user.profile.email.clone(),
            mobile: user.profile.mobile.clone(),
            pan_number: data.pan_number,
            aadhaar_number: data.aadhaar_number,
            passport_number: data.passport_number,
            is_nri: data.is_nri,
            address: data.address,
        },
    );
    tracing::info!(user_id = %user.user_id, "KYC details sent to support");
    Ok(Json(MessageResponse::ok("KYC notification sent")))
}

/// Email a wallet verification request to the OTC desk.
#[utoipa::path(
    post,
    path = "/api/notifications/send-wallet",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    request_body = WalletNoticeRequest,
    responses(
        (status = 200, description = "Notification queued", body = MessageResponse),
        (status = 400, description = "Missing asset or address"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn send_wallet(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<WalletNoticeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let data = request.wallet_data;
    required(&data.asset, "asset")?;
    required(&data.wallet_address, "wallet_address")?;

    state.notifier.email(
        &state.config.otc_email,
        Template::ClientWalletDetails {
            client_uid: user.profile.client_uid.clone(),
            email: user.profile.email.clone(),
            wallet_type: data.wallet_type,
            exchange_name: data.exchange_name,
            asset: data.asset.trim().to_ascii_uppercase(),
            wallet_address: data.wallet_address.trim().to_string(),
            notes: data.notes,
        },
    );
    tracing::info!(user_id = %user.user_id, "Wallet details sent to desk");
    Ok(Json(MessageResponse::ok("Wallet notification sent")))
}

/// Email a bank account verification request to the OTC desk. Only the
/// last four digits of the account number are included.
#[utoipa::path(
    post,
    path = "/api/notifications/send-bank",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    request_body = BankNoticeRequest,
    responses(
        (status = 200, description = "Notification queued", body = MessageResponse),
        (status = 400, description = "Missing holder, account number or IFSC"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn send_bank(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<BankNoticeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let data = request.bank_data;
    required(&data.account_holder, "account_holder")?;
    required(&data.account_number, "account_number")?;
    required(&data.ifsc_code, "ifsc_code")?;

    state.notifier.email(
        &state.config.otc_email,
        Template::ClientBankDetails {
            client_uid: user.profile.client_uid.clone(),
            email: user.profile.email.clone(),
            account_holder: data.account_holder,
            account_number: data.account_number,
            ifsc_code: data.ifsc_code.trim().to_ascii_uppercase(),
            bank_name: data.bank_name,
            branch: data.branch,
            account_type: data.account_type,
        },
    );
    tracing::info!(user_id = %user.user_id, "Bank details sent to desk");
    Ok(Json(MessageResponse::ok("Bank notification sent")))
}
