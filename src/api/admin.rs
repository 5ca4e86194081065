// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Desk operator endpoints.
//!
//! Every handler takes [`AdminOnly`]; the role is read from the stored
//! account on each request. Customer notifications are queued only after
//! the change has been written.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::AdminOnly,
    desk::{
        analytics::{self, Analytics},
        kyc::{self, KycDetail, PendingKyc},
        ledger::{self, ManualEntry},
        orders::{self, AdminOrderView},
        rates::{self, RateUpdate},
        seed::{self, SeedReport},
        users::{self, RmAssignment},
        wallets::{self, WalletDetail, WalletWithOwner},
        ReviewAction,
    },
    error::ApiError,
    notify::Template,
    state::AppState,
    storage::{
        AssetRate, AuditEvent, AuditQuery, KycStatus, LedgerEntry, Order, OrderStatus, SavedWallet,
        TransactionType, User, UserRepository, UserView,
    },
};

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserView>,
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserUpdateResponse {
    pub success: bool,
    pub message: String,
    pub user: UserView,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignRmRequest {
    pub rm_name: String,
    #[serde(default)]
    pub rm_phone: Option<String>,
    #[serde(default)]
    pub rm_whatsapp: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingKycResponse {
    pub documents: Vec<PendingKyc>,
    pub total: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct KycActionRequest {
    pub kyc_id: String,
    pub action: ReviewAction,
    /// Shown to the customer on rejection.
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct KycActionResponse {
    pub success: bool,
    pub message: String,
    pub status: KycStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminWalletListResponse {
    pub wallets: Vec<WalletWithOwner>,
    pub total: usize,
}

impl From<Vec<WalletWithOwner>> for AdminWalletListResponse {
    fn from(wallets: Vec<WalletWithOwner>) -> Self {
        Self {
            total: wallets.len(),
            wallets,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WalletActionRequest {
    pub wallet_id: String,
    pub action: ReviewAction,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WalletActionResponse {
    pub success: bool,
    pub message: String,
    pub wallet: SavedWallet,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrderListResponse {
    pub orders: Vec<AdminOrderView>,
    pub total: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderStatusRequest {
    pub order_id: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderStatusResponse {
    pub success: bool,
    pub message: String,
    pub order: Order,
    /// Present when this call settled the order into the ledger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_entry: Option<LedgerEntry>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RateUpdateRequest {
    pub asset: String,
    #[schema(value_type = f64)]
    pub buy_rate: Decimal,
    #[schema(value_type = f64)]
    pub sell_rate: Decimal,
    /// Reserve the rate for one user instead of setting the global rate.
    #[serde(default)]
    pub user_specific: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RateUpdateResponse {
    pub success: bool,
    pub rate: AssetRate,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ManualEntryRequest {
    pub user_id: String,
    pub asset: String,
    pub transaction_type: TransactionType,
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub description: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ManualEntryResponse {
    pub success: bool,
    pub entry: LedgerEntry,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogResponse {
    pub events: Vec<AuditEvent>,
    pub count: usize,
}

// =============================================================================
// Users
// =============================================================================

/// Customer accounts. Password hashes are never included.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Customers", body = UserListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_users(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<UserListResponse>, ApiError> {
    let users = users::list_customers(&state.db)?;
    Ok(Json(UserListResponse {
        total: users.len(),
        users,
    }))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/freeze",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Account frozen", body = UserUpdateResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn freeze_user(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserUpdateResponse>, ApiError> {
    let user = users::set_frozen(&state.db, &admin.user_id, &user_id, true)?;
    Ok(Json(user_updated("Account frozen", &user)))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/unfreeze",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Account unfrozen", body = UserUpdateResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn unfreeze_user(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserUpdateResponse>, ApiError> {
    let user = users::set_frozen(&state.db, &admin.user_id, &user_id, false)?;
    Ok(Json(user_updated("Account unfrozen", &user)))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/assign-rm",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User id")),
    request_body = AssignRmRequest,
    responses(
        (status = 200, description = "Relationship manager assigned", body = UserUpdateResponse),
        (status = 400, description = "Missing manager name"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn assign_rm(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<AssignRmRequest>,
) -> Result<Json<UserUpdateResponse>, ApiError> {
    let assignment = RmAssignment {
        rm_name: request.rm_name,
        rm_phone: request.rm_phone,
        rm_whatsapp: request.rm_whatsapp,
    };
    let user = users::assign_rm(&state.db, &admin.user_id, &user_id, assignment)?;
    Ok(Json(user_updated("Relationship manager assigned", &user)))
}

fn user_updated(message: &str, user: &User) -> UserUpdateResponse {
    UserUpdateResponse {
        success: true,
        message: message.to_string(),
        user: UserView::from(user),
    }
}

// =============================================================================
// KYC
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/admin/kyc-pending",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Documents awaiting review", body = PendingKycResponse),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn kyc_pending(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<PendingKycResponse>, ApiError> {
    let documents = kyc::list_pending(&state.db)?;
    Ok(Json(PendingKycResponse {
        total: documents.len(),
        documents,
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/kyc/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "KYC document id")),
    responses(
        (status = 200, description = "Document with owner", body = KycDetail),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "KYC not found")
    )
)]
pub async fn kyc_detail(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Path(kyc_id): Path<String>,
) -> Result<Json<KycDetail>, ApiError> {
    Ok(Json(kyc::detail(&state.db, &kyc_id)?))
}

/// Approve or reject a KYC document and tell the customer.
#[utoipa::path(
    post,
    path = "/api/admin/kyc/action",
    tag = "Admin",
    security(("bearer_auth" = [])),
    request_body = KycActionRequest,
    responses(
        (status = 200, description = "Decision recorded", body = KycActionResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "KYC not found")
    )
)]
pub async fn kyc_action(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<KycActionRequest>,
) -> Result<Json<KycActionResponse>, ApiError> {
    let (document, user) = kyc::review(
        &state.db,
        &admin.user_id,
        &request.kyc_id,
        request.action,
        request.reason,
    )?;

    let template = match &document.rejection_reason {
        Some(reason) if request.action == ReviewAction::Reject => Template::KycRejected {
            reason: reason.clone(),
        },
        _ => Template::KycApproved,
    };
    state.notifier.push(user.push_token.as_deref(), template.clone());
    state.notifier.email(&user.email, template);

    let message = match request.action {
        ReviewAction::Approve => "KYC approved",
        ReviewAction::Reject => "KYC rejected",
    };
    Ok(Json(KycActionResponse {
        success: true,
        message: message.into(),
        status: document.status,
    }))
}

// =============================================================================
// Wallets
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/admin/wallets/pending",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Wallets awaiting verification", body = AdminWalletListResponse),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn wallets_pending(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<AdminWalletListResponse>, ApiError> {
    Ok(Json(wallets::list_pending(&state.db)?.into()))
}

#[utoipa::path(
    get,
    path = "/api/admin/wallets/all",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Every saved wallet", body = AdminWalletListResponse),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn wallets_all(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<AdminWalletListResponse>, ApiError> {
    Ok(Json(wallets::list_all(&state.db)?.into()))
}

#[utoipa::path(
    get,
    path = "/api/admin/wallets/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Wallet id")),
    responses(
        (status = 200, description = "Wallet with owner", body = WalletDetail),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn wallet_detail(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
) -> Result<Json<WalletDetail>, ApiError> {
    Ok(Json(wallets::detail(&state.db, &wallet_id)?))
}

/// Verify or reject a saved wallet and tell the owner.
#[utoipa::path(
    post,
    path = "/api/admin/wallets/action",
    tag = "Admin",
    security(("bearer_auth" = [])),
    request_body = WalletActionRequest,
    responses(
        (status = 200, description = "Decision recorded", body = WalletActionResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn wallet_action(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<WalletActionRequest>,
) -> Result<Json<WalletActionResponse>, ApiError> {
    let wallet = wallets::review(
        &state.db,
        &admin.user_id,
        &request.wallet_id,
        request.action,
        request.notes,
    )?;

    if let Some(owner) = UserRepository::new(&state.db).find(&wallet.user_id)? {
        let template = match request.action {
            ReviewAction::Approve => Template::WalletVerified {
                asset: wallet.asset.clone(),
                address: wallet.wallet_address.clone(),
            },
            ReviewAction::Reject => Template::WalletRejected {
                asset: wallet.asset.clone(),
                address: wallet.wallet_address.clone(),
                notes: wallet.admin_notes.clone(),
            },
        };
        state.notifier.push(owner.push_token.as_deref(), template.clone());
        state.notifier.email(&owner.email, template);
    }

    let message = match request.action {
        ReviewAction::Approve => "Wallet verified",
        ReviewAction::Reject => "Wallet rejected",
    };
    Ok(Json(WalletActionResponse {
        success: true,
        message: message.into(),
        wallet,
    }))
}

// =============================================================================
// Orders
// =============================================================================

/// Every order, newest first, with owner contact details.
#[utoipa::path(
    get,
    path = "/api/admin/orders",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Orders", body = AdminOrderListResponse),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_orders(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<AdminOrderListResponse>, ApiError> {
    let orders = orders::list_all(&state.db)?;
    Ok(Json(AdminOrderListResponse {
        total: orders.len(),
        orders,
    }))
}

/// Move an order to a new status.
///
/// Completing an order credits (buy) or debits (sell) the owner's ledger
/// exactly once, however many times completion is requested.
#[utoipa::path(
    put,
    path = "/api/admin/orders/update",
    tag = "Admin",
    security(("bearer_auth" = [])),
    request_body = OrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderStatusResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order already completed or cancelled")
    )
)]
pub async fn update_order_status(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<OrderStatusRequest>,
) -> Result<Json<OrderStatusResponse>, ApiError> {
    let change = orders::admin_update_order(
        &state.db,
        &admin.user_id,
        &request.order_id,
        request.status,
        request.notes,
    )?;

    if change.changed() {
        let order = &change.order;
        if let Some(owner) = UserRepository::new(&state.db).find(&order.user_id)? {
            let template = Template::OrderStatusUpdate {
                order_ref: order.short_id().to_string(),
                status: order.status,
                asset: order.asset.clone(),
                quantity: order.quantity,
            };
            state.notifier.push(owner.push_token.as_deref(), template.clone());
            state.notifier.email(&owner.email, template.clone());
            state.notifier.sms(&owner.mobile, template);
        }
    }

    Ok(Json(OrderStatusResponse {
        success: true,
        message: format!("Order status updated to {}", change.order.status),
        order: change.order,
        ledger_entry: change.ledger_entry,
    }))
}

// =============================================================================
// Rates and ledger
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/admin/rates/update",
    tag = "Admin",
    security(("bearer_auth" = [])),
    request_body = RateUpdateRequest,
    responses(
        (status = 200, description = "Rate stored", body = RateUpdateResponse),
        (status = 400, description = "Invalid rate"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Target user not found")
    )
)]
pub async fn update_rate(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<RateUpdateRequest>,
) -> Result<Json<RateUpdateResponse>, ApiError> {
    let update = RateUpdate {
        asset: request.asset,
        buy_rate: request.buy_rate,
        sell_rate: request.sell_rate,
        user_scope: request.user_specific,
    };
    let rate = rates::upsert_rate(&state.db, &admin.user_id, update)?;
    Ok(Json(RateUpdateResponse {
        success: true,
        rate,
    }))
}

/// Global and user-specific rates.
#[utoipa::path(
    get,
    path = "/api/admin/rates",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All rate rows", body = [AssetRate]),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_rates(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<Vec<AssetRate>>, ApiError> {
    Ok(Json(rates::list_all_rates(&state.db)?))
}

#[utoipa::path(
    post,
    path = "/api/admin/ledger/manual-entry",
    tag = "Admin",
    security(("bearer_auth" = [])),
    request_body = ManualEntryRequest,
    responses(
        (status = 200, description = "Entry recorded", body = ManualEntryResponse),
        (status = 400, description = "Invalid amount"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn manual_ledger_entry(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<ManualEntryRequest>,
) -> Result<Json<ManualEntryResponse>, ApiError> {
    let input = ManualEntry {
        user_id: request.user_id,
        asset: request.asset,
        transaction_type: request.transaction_type,
        amount: request.amount,
        description: request.description,
    };
    let entry = ledger::manual_entry(&state.db, &admin.user_id, input)?;
    Ok(Json(ManualEntryResponse {
        success: true,
        entry,
    }))
}

// =============================================================================
// Analytics, seeding and audit
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/admin/analytics",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard figures", body = Analytics),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn analytics(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<Analytics>, ApiError> {
    Ok(Json(analytics::analytics(&state.db)?))
}

/// Insert the default admin and global rates where missing.
#[utoipa::path(
    post,
    path = "/api/admin/init-default-data",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Seeding report", body = SeedReport),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn init_default_data(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<SeedReport>, ApiError> {
    let report = seed::seed_defaults(
        &state.db,
        &state.auth,
        state.config.default_admin_password.as_deref(),
        Some(&admin.user_id),
    )
    .await?;
    Ok(Json(report))
}

/// Query the audit trail, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/audit",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(AuditQuery),
    responses(
        (status = 200, description = "Matching events", body = AuditLogResponse),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn audit_log(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<AuditLogResponse>, ApiError> {
    let events = analytics::audit_events(&state.db, &query)?;
    Ok(Json(AuditLogResponse {
        count: events.len(),
        events,
    }))
}
