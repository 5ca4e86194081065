// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints: sign-up, OTP verification, login with 2FA and
//! password reset.
//!
//! Codes and reset tokens are only ever delivered through the notification
//! queue; no response body carries them.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::MessageResponse;
use crate::{
    auth::Auth,
    desk::accounts::{self, NewAccount, OtpVerification},
    error::ApiError,
    notify::Template,
    state::AppState,
    storage::{AccountType, OtpPurpose, UserView},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub mobile: String,
    /// Defaults to `+91` when the mobile has no prefix.
    #[serde(default)]
    pub country_code: Option<String>,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub account_type: AccountType,
    /// Required for corporate accounts.
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub referral_code: Option<String>,
    #[serde(default)]
    pub invite_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user_id: String,
    /// Seven-digit id quoted to the desk by phone and email.
    pub client_uid: String,
    pub email: String,
    pub account_type: AccountType,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyOtpRequest {
    /// Email for registration codes, mobile for 2FA codes.
    pub identifier: String,
    pub otp: String,
    #[serde(default = "default_purpose")]
    pub purpose: OtpPurpose,
}

fn default_purpose() -> OtpPurpose {
    OtpPurpose::Registration
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionResponse {
    pub success: bool,
    pub token: String,
    pub user: UserView,
}

/// Answer to a verified code that was not tied to an account.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum VerifyOtpResponse {
    Session(SessionResponse),
    Confirmed(MessageResponse),
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Email, mobile, or mobile without the country code.
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub requires_2fa: bool,
    /// Identifier to send back to `/auth/verify-2fa`.
    pub mobile: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct Verify2faRequest {
    pub mobile: String,
    pub otp: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PushTokenRequest {
    pub push_token: String,
}

/// Create an account and send the registration code by email and SMS.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, OTP sent", body = RegisterResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email or mobile already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let input = NewAccount {
        mobile: request.mobile,
        country_code: request.country_code,
        email: request.email,
        password: request.password,
        account_type: request.account_type,
        company_name: request.company_name,
        referral_code: request.referral_code,
        invite_code: request.invite_code,
    };
    let registered = accounts::register(&state.db, &state.auth, input).await?;
    let user = registered.user;

    let otp = Template::RegistrationOtp {
        code: registered.otp,
    };
    state.notifier.email(&user.email, otp.clone());
    state.notifier.sms(&user.mobile, otp);
    state.notifier.email(
        &state.config.otc_email,
        Template::AdminNewRegistration {
            client_uid: user.client_uid.clone(),
            email: user.email.clone(),
            mobile: user.mobile.clone(),
            account_type: user.account_type,
            company_name: user.company_name.clone(),
        },
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "OTP sent to email and mobile".into(),
            user_id: user.id,
            client_uid: user.client_uid,
            email: user.email,
            account_type: user.account_type,
        }),
    ))
}

/// Consume a registration or 2FA code.
///
/// Registration codes mark the account verified and return a session.
#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    tag = "Auth",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Code accepted", body = VerifyOtpResponse),
        (status = 400, description = "Invalid or expired OTP")
    )
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, ApiError> {
    let outcome = accounts::verify_otp(
        &state.db,
        &state.auth,
        &request.identifier,
        &request.otp,
        request.purpose,
    )
    .await?;

    let response = match outcome {
        OtpVerification::Session(session) => VerifyOtpResponse::Session(SessionResponse {
            success: true,
            token: session.token,
            user: UserView::from(&session.user),
        }),
        OtpVerification::Confirmed => {
            VerifyOtpResponse::Confirmed(MessageResponse::ok("OTP verified"))
        }
    };
    Ok(Json(response))
}

/// Check credentials and send a 2FA code to the account's email and mobile.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted, 2FA required", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account frozen")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let challenge =
        accounts::login(&state.db, &state.auth, &request.identifier, &request.password).await?;
    let user = challenge.user;

    let otp = Template::TwoFactorOtp {
        code: challenge.otp,
    };
    state.notifier.email(&user.email, otp.clone());
    state.notifier.sms(&user.mobile, otp);

    Ok(Json(LoginResponse {
        success: true,
        message: "2FA OTP sent to email and mobile".into(),
        requires_2fa: true,
        mobile: user.mobile,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-2fa",
    tag = "Auth",
    request_body = Verify2faRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 400, description = "Invalid or expired OTP"),
        (status = 403, description = "Account frozen")
    )
)]
pub async fn verify_2fa(
    State(state): State<AppState>,
    Json(request): Json<Verify2faRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = accounts::verify_2fa(&state.db, &state.auth, &request.mobile, &request.otp).await?;
    Ok(Json(SessionResponse {
        success: true,
        token: session.token,
        user: UserView::from(&session.user),
    }))
}

/// Email a reset token if the address is registered.
///
/// The answer is the same whether or not the account exists.
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "Auth",
    request_body = ForgotPasswordRequest,
    responses((status = 200, description = "Request accepted", body = MessageResponse))
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Some((user, reset)) = accounts::forgot_password(&state.db, &state.auth, &request.email)? {
        state
            .notifier
            .email(&user.email, Template::PasswordReset { token: reset.token });
    }
    Ok(Json(MessageResponse::ok("If email exists, reset link sent")))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid or expired token")
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    accounts::reset_password(&state.db, &state.auth, &request.token, &request.new_password).await?;
    Ok(Json(MessageResponse::ok("Password reset successfully")))
}

#[utoipa::path(
    post,
    path = "/api/auth/register-push-token",
    tag = "Auth",
    security(("bearer_auth" = [])),
    request_body = PushTokenRequest,
    responses(
        (status = 200, description = "Token stored", body = MessageResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn register_push_token(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<PushTokenRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    accounts::register_push_token(&state.db, &user.user_id, &request.push_token)?;
    Ok(Json(MessageResponse::ok("Push token registered")))
}

/// The signed-in account.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserView),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn me(Auth(user): Auth) -> Json<UserView> {
    Json(UserView::from(&user.profile))
}
