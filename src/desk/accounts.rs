// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration, OTP verification, login with 2FA and password reset.

use chrono::{Duration, Utc};
use serde_json::json;

use super::{normalize_email, DeskError, DeskResult};
use crate::audit_log;
use crate::auth::AuthSettings;
use crate::storage::{
    AccountType, AuditEvent, AuditEventType, Database, OtpOutcome, OtpPurpose,
    OtpRepository, PasswordResetToken, ResetOutcome, ResetTokenRepository, StorageError, User,
    UserRepository,
};

pub const MIN_PASSWORD_LEN: usize = 8;
const RESET_TOKEN_TTL_HOURS: i64 = 1;
const DEFAULT_COUNTRY_CODE: &str = "+91";

/// Sign-up input after transport decoding.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub mobile: String,
    pub country_code: Option<String>,
    pub email: String,
    pub password: String,
    pub account_type: AccountType,
    pub company_name: Option<String>,
    pub referral_code: Option<String>,
    pub invite_code: Option<String>,
}

/// A stored account and the registration code to deliver.
#[derive(Debug)]
pub struct Registered {
    pub user: User,
    pub otp: String,
}

/// A successful credential check awaiting the second factor.
#[derive(Debug)]
pub struct LoginChallenge {
    pub user: User,
    pub otp: String,
}

/// A bearer token and the account it was issued for.
#[derive(Debug)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Result of `verify_otp`. Codes not tied to an account only confirm.
#[derive(Debug)]
pub enum OtpVerification {
    Session(Session),
    Confirmed,
}

pub async fn register(db: &Database, auth: &AuthSettings, input: NewAccount) -> DeskResult<Registered> {
    let email = normalize_email(&input.email);
    validate_email(&email)?;
    let mobile = full_mobile(&input.mobile, input.country_code.as_deref())?;
    validate_password(&input.password)?;

    let company_name = input
        .company_name
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if input.account_type == AccountType::Corporate && company_name.is_none() {
        return Err(DeskError::Validation(
            "Company name is required for corporate accounts".into(),
        ));
    }

    let users = UserRepository::new(db);
    if users.find_by_identifier(&email)?.is_some() || users.find_by_identifier(&mobile)?.is_some() {
        return Err(DeskError::Conflict("User already exists".into()));
    }

    let hash = auth.passwords.hash(&input.password).await?;
    let mut user = User::new(mobile, email, hash);
    user.account_type = input.account_type;
    user.company_name = company_name;
    user.referral_code = input.referral_code.filter(|c| !c.trim().is_empty());
    user.invite_code = input.invite_code.filter(|c| !c.trim().is_empty());

    // The identity index still decides races between concurrent sign-ups.
    users.create(&mut user).map_err(|e| match e {
        StorageError::AlreadyExists { .. } => DeskError::Conflict("User already exists".into()),
        other => other.into(),
    })?;

    let record = auth.otp.new_record(&user.email, OtpPurpose::Registration)?;
    OtpRepository::new(db).issue(&record)?;

    audit_log!(db, AuditEventType::UserRegistered, &user.id);
    tracing::info!(user_id = %user.id, account_type = ?user.account_type, "User registered");

    Ok(Registered {
        user,
        otp: record.code,
    })
}

/// Consume a code. Registration codes verify the account and sign it in;
/// 2FA codes complete a login.
pub async fn verify_otp(
    db: &Database,
    auth: &AuthSettings,
    identifier: &str,
    code: &str,
    purpose: OtpPurpose,
) -> DeskResult<OtpVerification> {
    if purpose == OtpPurpose::TwoFactor {
        return verify_2fa(db, auth, identifier, code)
            .await
            .map(OtpVerification::Session);
    }

    let identifier = normalize_identifier(identifier);
    consume(db, &identifier, code, purpose)?;

    let users = UserRepository::new(db);
    let Some(user) = users.find_by_identifier(&identifier)? else {
        return Ok(OtpVerification::Confirmed);
    };
    let user = users.update(&user.id, |u| {
        u.is_email_verified = true;
        u.is_mobile_verified = true;
    })?;

    audit_log!(db, AuditEventType::OtpVerified, &user.id);
    let token = auth.tokens.issue(&user.id)?;
    Ok(OtpVerification::Session(Session { token, user }))
}

pub async fn login(
    db: &Database,
    auth: &AuthSettings,
    identifier: &str,
    password: &str,
) -> DeskResult<LoginChallenge> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(DeskError::Validation("Email or identifier required".into()));
    }

    let Some(user) = find_login_user(db, identifier)? else {
        audit_failure(db, None, "unknown identifier");
        return Err(DeskError::Unauthorized("Invalid credentials".into()));
    };
    if !auth.passwords.verify(password, &user.password_hash).await {
        audit_failure(db, Some(&user.id), "wrong password");
        return Err(DeskError::Unauthorized("Invalid credentials".into()));
    }
    if user.is_frozen {
        audit_failure(db, Some(&user.id), "account frozen");
        return Err(DeskError::Forbidden("Account is frozen".into()));
    }

    let record = auth.otp.new_record(&user.mobile, OtpPurpose::TwoFactor)?;
    OtpRepository::new(db).issue(&record)?;

    Ok(LoginChallenge {
        user,
        otp: record.code,
    })
}

pub async fn verify_2fa(
    db: &Database,
    auth: &AuthSettings,
    mobile: &str,
    code: &str,
) -> DeskResult<Session> {
    let mobile = mobile.trim();
    consume(db, mobile, code, OtpPurpose::TwoFactor)?;

    let users = UserRepository::new(db);
    let user = users
        .find_by_identifier(mobile)?
        .ok_or_else(|| DeskError::NotFound("User".into()))?;
    if user.is_frozen {
        return Err(DeskError::Forbidden("Account is frozen".into()));
    }
    let user = users.update(&user.id, |u| u.last_login = Some(Utc::now()))?;

    let token = auth.tokens.issue(&user.id)?;
    audit_log!(db, AuditEventType::AuthSuccess, &user.id);
    tracing::info!(user_id = %user.id, "User signed in");
    Ok(Session { token, user })
}

/// Issue a reset token for a known email. Unknown emails yield `None` and
/// callers answer identically in both cases.
pub fn forgot_password(
    db: &Database,
    auth: &AuthSettings,
    email: &str,
) -> DeskResult<Option<(User, PasswordResetToken)>> {
    let email = normalize_email(email);
    let Some(user) = UserRepository::new(db).find_by_identifier(&email)? else {
        return Ok(None);
    };
    if user.email != email {
        return Ok(None);
    }

    let now = Utc::now();
    let token = PasswordResetToken {
        token: auth.otp.reset_token()?,
        user_id: user.id.clone(),
        created_at: now,
        expires_at: now + Duration::hours(RESET_TOKEN_TTL_HOURS),
        is_used: false,
    };
    ResetTokenRepository::new(db).store(&token)?;
    Ok(Some((user, token)))
}

pub async fn reset_password(
    db: &Database,
    auth: &AuthSettings,
    token: &str,
    new_password: &str,
) -> DeskResult<()> {
    validate_password(new_password)?;
    let hash = auth.passwords.hash(new_password).await?;

    match ResetTokenRepository::new(db).redeem(token.trim(), &hash, Utc::now())? {
        ResetOutcome::Applied { user_id } => {
            audit_log!(db, AuditEventType::PasswordReset, &user_id);
            Ok(())
        }
        ResetOutcome::Expired => Err(DeskError::Validation("Token expired".into())),
        ResetOutcome::Invalid => Err(DeskError::Validation("Invalid or expired token".into())),
    }
}

pub fn register_push_token(db: &Database, user_id: &str, token: &str) -> DeskResult<User> {
    let token = token.trim();
    if token.is_empty() {
        return Err(DeskError::Validation("push_token is required".into()));
    }
    Ok(UserRepository::new(db).update(user_id, |u| u.push_token = Some(token.to_string()))?)
}

fn consume(db: &Database, identifier: &str, code: &str, purpose: OtpPurpose) -> DeskResult<()> {
    match OtpRepository::new(db).consume(identifier, code.trim(), purpose, Utc::now())? {
        OtpOutcome::Consumed => Ok(()),
        OtpOutcome::Expired => Err(DeskError::Validation("OTP expired".into())),
        OtpOutcome::Invalid => Err(DeskError::Validation("Invalid or expired OTP".into())),
    }
}

/// Email, mobile, or a mobile without the default country code.
fn find_login_user(db: &Database, identifier: &str) -> DeskResult<Option<User>> {
    let users = UserRepository::new(db);
    let identifier = normalize_identifier(identifier);
    if let Some(user) = users.find_by_identifier(&identifier)? {
        return Ok(Some(user));
    }
    if identifier.contains('@') || identifier.starts_with('+') {
        return Ok(None);
    }
    Ok(users.find_by_identifier(&format!("{DEFAULT_COUNTRY_CODE}{identifier}"))?)
}

fn normalize_identifier(identifier: &str) -> String {
    if identifier.contains('@') {
        normalize_email(identifier)
    } else {
        identifier.trim().to_string()
    }
}

fn audit_failure(db: &Database, user_id: Option<&str>, reason: &str) {
    let mut event = AuditEvent::new(AuditEventType::AuthFailure)
        .with_details(json!({ "reason": reason }))
        .failed("Invalid credentials");
    if let Some(id) = user_id {
        event = event.with_user(id);
    }
    audit_log!(@write db, event);
}

fn validate_email(email: &str) -> DeskResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(DeskError::Validation("A valid email is required".into())),
    }
}

fn validate_password(password: &str) -> DeskResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DeskError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Mobile in `+<country><number>` form.
fn full_mobile(mobile: &str, country_code: Option<&str>) -> DeskResult<String> {
    let mobile: String = mobile.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    let full = if mobile.starts_with('+') {
        mobile
    } else {
        let code = country_code.map(str::trim).unwrap_or(DEFAULT_COUNTRY_CODE);
        format!("{code}{mobile}")
    };
    let digits = full.strip_prefix('+').unwrap_or(&full);
    if !(10..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(DeskError::Validation("A valid mobile number is required".into()));
    }
    Ok(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::desk::testutil;
    use crate::storage::OtpRecord;

    fn settings(dir: &std::path::Path) -> AuthSettings {
        AuthSettings::from_config(&AppConfig::for_tests(dir))
    }

    fn account(email: &str, mobile: &str) -> NewAccount {
        NewAccount {
            mobile: mobile.into(),
            country_code: None,
            email: email.into(),
            password: "password123".into(),
            account_type: AccountType::Individual,
            company_name: None,
            referral_code: None,
            invite_code: None,
        }
    }

    #[tokio::test]
    async fn register_verify_login_and_second_factor() {
        let (dir, db) = testutil::db();
        let auth = settings(dir.path());

        let reg = register(&db, &auth, account(" Priya@Example.com ", "9800000001"))
            .await
            .unwrap();
        assert_eq!(reg.user.email, "priya@example.com");
        assert_eq!(reg.user.mobile, "+919800000001");
        assert_eq!(reg.otp, "123456");

        let verified = verify_otp(&db, &auth, "priya@example.com", "123456", OtpPurpose::Registration)
            .await
            .unwrap();
        let OtpVerification::Session(session) = verified else {
            panic!("expected a session");
        };
        assert!(session.user.is_email_verified && session.user.is_mobile_verified);

        let challenge = login(&db, &auth, "9800000001", "password123").await.unwrap();
        assert_eq!(challenge.user.id, reg.user.id);

        let session = verify_2fa(&db, &auth, "+919800000001", &challenge.otp)
            .await
            .unwrap();
        let claims = auth.tokens.verify(&session.token).unwrap();
        assert_eq!(claims.sub, reg.user.id);
        assert!(session.user.last_login.is_some());
    }

    #[tokio::test]
    async fn otp_is_single_use() {
        let (dir, db) = testutil::db();
        let auth = settings(dir.path());
        register(&db, &auth, account("a@example.com", "9800000001"))
            .await
            .unwrap();

        verify_otp(&db, &auth, "a@example.com", "123456", OtpPurpose::Registration)
            .await
            .unwrap();
        let again = verify_otp(&db, &auth, "a@example.com", "123456", OtpPurpose::Registration).await;
        assert!(matches!(again, Err(DeskError::Validation(_))));
    }

    #[tokio::test]
    async fn expired_otp_fails_even_with_matching_code() {
        let (dir, db) = testutil::db();
        let auth = settings(dir.path());
        let past = Utc::now() - Duration::minutes(30);
        OtpRepository::new(&db)
            .issue(&OtpRecord {
                id: "otp-1".into(),
                identifier: "a@example.com".into(),
                code: "654321".into(),
                purpose: OtpPurpose::Registration,
                created_at: past,
                expires_at: past + Duration::minutes(10),
                is_used: false,
            })
            .unwrap();

        let err = verify_otp(&db, &auth, "a@example.com", "654321", OtpPurpose::Registration)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "OTP expired");
    }

    #[tokio::test]
    async fn duplicate_email_or_mobile_conflicts() {
        let (dir, db) = testutil::db();
        let auth = settings(dir.path());
        register(&db, &auth, account("a@example.com", "9800000001"))
            .await
            .unwrap();

        let same_email = register(&db, &auth, account("A@EXAMPLE.com", "9800000002")).await;
        assert!(matches!(same_email, Err(DeskError::Conflict(_))));
        let same_mobile = register(&db, &auth, account("b@example.com", "+919800000001")).await;
        assert!(matches!(same_mobile, Err(DeskError::Conflict(_))));
    }

    #[tokio::test]
    async fn registration_input_is_validated() {
        let (dir, db) = testutil::db();
        let auth = settings(dir.path());

        let mut corporate = account("c@example.com", "9800000003");
        corporate.account_type = AccountType::Corporate;
        assert!(matches!(
            register(&db, &auth, corporate.clone()).await,
            Err(DeskError::Validation(_))
        ));
        corporate.company_name = Some("Acme Traders".into());
        let reg = register(&db, &auth, corporate).await.unwrap();
        assert_eq!(reg.user.company_name.as_deref(), Some("Acme Traders"));

        let mut short = account("d@example.com", "9800000004");
        short.password = "short".into();
        assert!(matches!(
            register(&db, &auth, short).await,
            Err(DeskError::Validation(_))
        ));

        assert!(matches!(
            register(&db, &auth, account("not-an-email", "9800000005")).await,
            Err(DeskError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn wrong_password_and_frozen_accounts_cannot_log_in() {
        let (dir, db) = testutil::db();
        let auth = settings(dir.path());
        let reg = register(&db, &auth, account("a@example.com", "9800000001"))
            .await
            .unwrap();

        let wrong = login(&db, &auth, "a@example.com", "not-the-password").await;
        assert!(matches!(wrong, Err(DeskError::Unauthorized(_))));
        let unknown = login(&db, &auth, "ghost@example.com", "password123").await;
        assert!(matches!(unknown, Err(DeskError::Unauthorized(_))));

        UserRepository::new(&db)
            .update(&reg.user.id, |u| u.is_frozen = true)
            .unwrap();
        let frozen = login(&db, &auth, "a@example.com", "password123").await;
        assert!(matches!(frozen, Err(DeskError::Forbidden(_))));
    }

    #[tokio::test]
    async fn password_reset_is_single_use() {
        let (dir, db) = testutil::db();
        let auth = settings(dir.path());
        register(&db, &auth, account("a@example.com", "9800000001"))
            .await
            .unwrap();

        assert!(forgot_password(&db, &auth, "ghost@example.com").unwrap().is_none());
        let (_, token) = forgot_password(&db, &auth, "A@example.com").unwrap().unwrap();

        reset_password(&db, &auth, &token.token, "new-password-1")
            .await
            .unwrap();
        login(&db, &auth, "a@example.com", "new-password-1").await.unwrap();

        let reused = reset_password(&db, &auth, &token.token, "new-password-2").await;
        assert!(matches!(reused, Err(DeskError::Validation(_))));
    }

    #[tokio::test]
    async fn push_token_must_not_be_blank() {
        let (_dir, db) = testutil::db();
        let user = testutil::user(&db, "+919800000001", crate::storage::KycStatus::Pending);

        assert!(register_push_token(&db, &user.id, "  ").is_err());
        let updated = register_push_token(&db, &user.id, "ExponentPushToken[abc]").unwrap();
        assert_eq!(updated.push_token.as_deref(), Some("ExponentPushToken[abc]"));
    }

    #[test]
    fn mobiles_get_a_country_code() {
        assert_eq!(full_mobile("9800000001", None).unwrap(), "+919800000001");
        assert_eq!(full_mobile("98000 00001", Some("+44")).unwrap(), "+449800000001");
        assert!(full_mobile("12ab", None).is_err());
    }
}
