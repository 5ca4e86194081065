// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::{BankDetails, UpiDetails},
    desk::{
        analytics::Analytics, kyc::KycStatusView, orders::AdminOrderView, seed::SeedReport,
        ReviewAction,
    },
    prices::{AssetPrice, MarketOverview, PricePoint, SupportedAsset},
    providers::PaymentInstructions,
    state::AppState,
    storage::{
        AccountType, AssetRate, AuditEvent, AuditEventType, KycDetails, KycDocument, KycStatus,
        LedgerEntry, Order, OrderStatus, OrderType, OtpPurpose, SavedWallet, TransactionType,
        UserView, VerificationStatus,
    },
};

pub mod admin;
pub mod auth;
pub mod crypto;
pub mod health;
pub mod kyc;
pub mod ledger;
pub mod notifications;
pub mod orders;
pub mod payment;
pub mod rates;
pub mod users;
pub mod wallets;

/// Plain acknowledgement body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let api_routes = Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/verify-otp", post(auth::verify_otp))
        .route("/auth/login", post(auth::login))
        .route("/auth/verify-2fa", post(auth::verify_2fa))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/register-push-token", post(auth::register_push_token))
        .route("/auth/me", get(auth::me))
        .route("/users/profile", get(users::profile))
        // KYC
        .route("/kyc/submit", post(kyc::submit))
        .route("/kyc/status", get(kyc::status))
        .route("/kyc/document", get(kyc::document))
        // Orders
        .route("/orders/create", post(orders::create_order))
        .route("/orders/my-orders", get(orders::my_orders))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/update", put(orders::update_order))
        .route("/orders/{id}/payment", get(orders::payment_request))
        // Saved wallets
        .route("/wallets/save", post(wallets::save_wallet))
        .route("/wallets/my-wallets", get(wallets::my_wallets))
        .route("/wallets/verified", get(wallets::verified_wallets))
        .route(
            "/wallets/{id}",
            get(wallets::get_wallet).delete(wallets::delete_wallet),
        )
        .route("/wallets/{id}/set-primary", put(wallets::set_primary))
        // Ledger, rates, payment
        .route("/wallet/balance", get(ledger::balance))
        .route("/wallet/ledger", get(ledger::history))
        .route("/rates", get(rates::list_rates))
        .route("/payment/bank-details", get(payment::bank_details))
        .route("/payment/upi-details", get(payment::upi_details))
        .route("/payment/webhook", post(payment::webhook))
        // Desk notifications
        .route("/notifications/send-kyc", post(notifications::send_kyc))
        .route("/notifications/send-wallet", post(notifications::send_wallet))
        .route("/notifications/send-bank", post(notifications::send_bank))
        // Market data
        .route("/crypto/prices", get(crypto::prices))
        .route("/crypto/prices/{symbol}/history", get(crypto::history))
        .route("/crypto/market", get(crypto::market))
        .route("/crypto/supported", get(crypto::supported))
        // Admin
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}/freeze", put(admin::freeze_user))
        .route("/admin/users/{id}/unfreeze", put(admin::unfreeze_user))
        .route("/admin/users/{id}/assign-rm", put(admin::assign_rm))
        .route("/admin/kyc-pending", get(admin::kyc_pending))
        .route("/admin/kyc/action", post(admin::kyc_action))
        .route("/admin/kyc/{id}", get(admin::kyc_detail))
        .route("/admin/wallets/pending", get(admin::wallets_pending))
        .route("/admin/wallets/all", get(admin::wallets_all))
        .route("/admin/wallets/action", post(admin::wallet_action))
        .route("/admin/wallets/{id}", get(admin::wallet_detail))
        .route("/admin/orders", get(admin::list_orders))
        .route("/admin/orders/update", put(admin::update_order_status))
        .route("/admin/rates", get(admin::list_rates))
        .route("/admin/rates/update", post(admin::update_rate))
        .route("/admin/ledger/manual-entry", post(admin::manual_ledger_entry))
        .route("/admin/analytics", get(admin::analytics))
        .route("/admin/init-default-data", post(admin::init_default_data))
        .route("/admin/audit", get(admin::audit_log));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .nest("/api", api_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
}

/// Any origin when none are configured, otherwise only the listed ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        auth::register,
        auth::verify_otp,
        auth::login,
        auth::verify_2fa,
        auth::forgot_password,
        auth::reset_password,
        auth::register_push_token,
        auth::me,
        users::profile,
        kyc::submit,
        kyc::status,
        kyc::document,
        orders::create_order,
        orders::my_orders,
        orders::get_order,
        orders::update_order,
        orders::payment_request,
        wallets::save_wallet,
        wallets::my_wallets,
        wallets::verified_wallets,
        wallets::get_wallet,
        wallets::set_primary,
        wallets::delete_wallet,
        ledger::balance,
        ledger::history,
        rates::list_rates,
        payment::bank_details,
        payment::upi_details,
        payment::webhook,
        notifications::send_kyc,
        notifications::send_wallet,
        notifications::send_bank,
        crypto::prices,
        crypto::history,
        crypto::market,
        crypto::supported,
        admin::list_users,
        admin::freeze_user,
        admin::unfreeze_user,
        admin::assign_rm,
        admin::kyc_pending,
        admin::kyc_detail,
        admin::kyc_action,
        admin::wallets_pending,
        admin::wallets_all,
        admin::wallet_detail,
        admin::wallet_action,
        admin::list_orders,
        admin::update_order_status,
        admin::update_rate,
        admin::list_rates,
        admin::manual_ledger_entry,
        admin::analytics,
        admin::init_default_data,
        admin::audit_log
    ),
    components(
        schemas(
            MessageResponse,
            UserView,
            AccountType,
            OtpPurpose,
            KycDetails,
            KycDocument,
            KycStatus,
            KycStatusView,
            Order,
            OrderType,
            OrderStatus,
            AdminOrderView,
            SavedWallet,
            VerificationStatus,
            LedgerEntry,
            TransactionType,
            AssetRate,
            AuditEvent,
            AuditEventType,
            ReviewAction,
            Analytics,
            SeedReport,
            PaymentInstructions,
            BankDetails,
            UpiDetails,
            AssetPrice,
            PricePoint,
            MarketOverview,
            SupportedAsset,
            notifications::KycNotice,
            notifications::KycNoticeRequest,
            notifications::WalletNotice,
            notifications::WalletNoticeRequest,
            notifications::BankNotice,
            notifications::BankNoticeRequest
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and storage readiness"),
        (name = "Auth", description = "Registration, OTP, login with 2FA and password reset"),
        (name = "Users", description = "Profile of the signed-in user"),
        (name = "KYC", description = "Identity document submission"),
        (name = "Orders", description = "Buy and sell orders at desk rates"),
        (name = "Wallets", description = "Saved withdrawal wallets"),
        (name = "Ledger", description = "Balances and ledger history"),
        (name = "Rates", description = "Effective desk rates"),
        (name = "Payment", description = "Payment details and gateway webhook"),
        (name = "Notifications", description = "Client details emailed to the desk"),
        (name = "Crypto", description = "Market prices"),
        (name = "Admin", description = "Desk operations")
    )
)]
struct ApiDoc;
