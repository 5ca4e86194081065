// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Desk payment details and the payment gateway webhook.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::Auth,
    config::{BankDetails, UpiDetails},
    desk::{orders, DeskError},
    error::ApiError,
    providers::{PaymentProvider, WebhookEvent},
    state::AppState,
};

pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub status: String,
}

/// Bank account to pay INR into for buy orders.
#[utoipa::path(
    get,
    path = "/api/payment/bank-details",
    tag = "Payment",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Bank details", body = BankDetails),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn bank_details(Auth(_user): Auth, State(state): State<AppState>) -> Json<BankDetails> {
    Json(state.config.bank.clone())
}

#[utoipa::path(
    get,
    path = "/api/payment/upi-details",
    tag = "Payment",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "UPI details", body = UpiDetails),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn upi_details(Auth(_user): Auth, State(state): State<AppState>) -> Json<UpiDetails> {
    Json(state.config.upi.clone())
}

/// Gateway callback. The body signature is checked before anything is read.
///
/// Captured payments are recorded on open orders; the order status is left
/// for an admin to move. Completed and cancelled orders are not touched.
#[utoipa::path(
    post,
    path = "/api/payment/webhook",
    tag = "Payment",
    params(("X-Razorpay-Signature" = Option<String>, Header, description = "Hex HMAC-SHA256 of the body")),
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Event accepted", body = WebhookAck),
        (status = 400, description = "Malformed payload"),
        (status = 401, description = "Missing or invalid signature")
    )
)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    state
        .payments
        .verify_webhook(&body, signature)
        .map_err(DeskError::from)?;

    let event = PaymentProvider::parse_webhook(&body).map_err(DeskError::from)?;
    match event {
        WebhookEvent::PaymentCaptured {
            payment_id,
            order_id: Some(order_id),
            amount,
        } => {
            tracing::info!(order_id = %order_id, payment_id = %payment_id, %amount, "Payment captured");
            match orders::record_gateway_payment(&state.db, &order_id, &payment_id) {
                Ok(order) if order.total_inr != amount => {
                    tracing::warn!(
                        order_id = %order_id,
                        payment_id = %payment_id,
                        captured = %amount,
                        expected = %order.total_inr,
                        "Captured amount does not match order total"
                    );
                }
                Ok(_) => {}
                // Unknown and closed orders are acknowledged so the gateway stops retrying.
                Err(DeskError::NotFound(_)) => {
                    tracing::warn!(order_id = %order_id, "Captured payment for unknown order");
                }
                Err(DeskError::TerminalOrder(status)) => {
                    tracing::warn!(
                        order_id = %order_id,
                        payment_id = %payment_id,
                        status = %status.as_str(),
                        "Captured payment for closed order"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        WebhookEvent::PaymentCaptured {
            payment_id,
            order_id: None,
            ..
        } => {
            tracing::warn!(payment_id = %payment_id, "Captured payment without order reference");
        }
        WebhookEvent::PaymentFailed { payment_id, reason } => {
            tracing::warn!(payment_id = %payment_id, reason = ?reason, "Payment failed");
        }
        WebhookEvent::Ignored(kind) => {
            tracing::debug!(event = %kind, "Ignoring webhook event");
        }
    }

    Ok(Json(WebhookAck {
        status: "ok".into(),
    }))
}
