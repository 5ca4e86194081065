// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Customer order endpoints.
//!
//! Orders are priced at the effective rate when placed. Customers may attach
//! payment proof; only admins move the status.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::Auth,
    desk::orders::{self, NewOrder, OrderUpdate},
    error::ApiError,
    providers::PaymentInstructions,
    state::AppState,
    storage::{Order, OrderType},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub asset: String,
    pub order_type: OrderType,
    #[schema(value_type = f64)]
    pub quantity: Decimal,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderResponse {
    pub success: bool,
    pub order: Order,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderListResponse {
    pub orders: Vec<Order>,
    pub total: usize,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub payment_proof: Option<String>,
    #[serde(default)]
    pub tx_reference: Option<String>,
}

/// Place an order at the caller's effective rate.
#[utoipa::path(
    post,
    path = "/api/orders/create",
    tag = "Orders",
    security(("bearer_auth" = [])),
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 400, description = "Invalid quantity or no rate for the asset"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "KYC not approved")
    )
)]
pub async fn create_order(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let input = NewOrder {
        asset: request.asset,
        order_type: request.order_type,
        quantity: request.quantity,
        wallet_address: request.wallet_address,
    };
    let order = orders::create_order(&state.db, &user.profile, input)?;
    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            success: true,
            order,
        }),
    ))
}

/// The caller's orders, newest first.
#[utoipa::path(
    get,
    path = "/api/orders/my-orders",
    tag = "Orders",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Orders", body = OrderListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn my_orders(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let orders = orders::list_by_user(&state.db, &user.user_id)?;
    Ok(Json(OrderListResponse {
        total: orders.len(),
        orders,
    }))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "Orders",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order", body = Order),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Order not found")
    )
)]
pub async fn get_order(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(orders::get_order(&state.db, &user, &order_id)?))
}

/// Attach payment proof or a transaction reference.
#[utoipa::path(
    put,
    path = "/api/orders/{id}/update",
    tag = "Orders",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Order id")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Nothing to attach"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order already completed or cancelled")
    )
)]
pub async fn update_order(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(request): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let update = OrderUpdate {
        payment_proof: request.payment_proof,
        tx_reference: request.tx_reference,
    };
    let order = orders::update_order(&state.db, &user, &order_id, update)?;
    Ok(Json(OrderResponse {
        success: true,
        order,
    }))
}

/// How to pay for an order that is still awaiting payment.
#[utoipa::path(
    get,
    path = "/api/orders/{id}/payment",
    tag = "Orders",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Payment instructions", body = PaymentInstructions),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order no longer awaiting payment"),
        (status = 502, description = "Payment gateway failed")
    )
)]
pub async fn payment_request(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<PaymentInstructions>, ApiError> {
    let instructions =
        orders::payment_request(&state.db, &state.payments, &user, &order_id).await?;
    Ok(Json(instructions))
}
