// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Desk Domain Layer
//!
//! Business rules of the OTC desk, independent of HTTP. Each submodule owns
//! one area and talks to storage only through the repositories:
//!
//! - [`accounts`]: registration, OTP, login with 2FA, password reset
//! - [`orders`]: placement at a snapshotted rate and the status machine
//! - [`ledger`]: balances, history and manual adjustments
//! - [`rates`]: effective rate lookup and admin upserts
//! - [`kyc`]: document submission and review
//! - [`wallets`]: saved withdrawal addresses and the primary flag
//! - [`users`]: freezing accounts and relationship managers
//! - [`analytics`]: admin dashboard figures and the audit trail
//! - [`seed`]: default admin and rates
//!
//! Functions return [`DeskError`]. They never send notifications; callers
//! enqueue those after the write has committed.

pub mod accounts;
pub mod analytics;
pub mod kyc;
pub mod ledger;
pub mod orders;
pub mod rates;
pub mod seed;
pub mod users;
pub mod wallets;

use crate::auth::AuthError;
use crate::prices::PriceFeedError;
use crate::providers::PaymentError;
use crate::storage::{OrderStatus, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Validation(String),

    #[error("KYC verification required before trading")]
    KycNotApproved,

    #[error("No rate configured for {0}")]
    RateNotFound(String),

    #[error("KYC already approved")]
    AlreadyApproved,

    #[error("Wallet address already saved")]
    DuplicateWallet,

    #[error("Order is already {0}")]
    TerminalOrder(OrderStatus),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Storage(StorageError),
}

pub type DeskResult<T> = Result<T, DeskError>;

/// Admin decision on a KYC document or saved wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl From<StorageError> for DeskError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, .. } => DeskError::NotFound(capitalize(entity)),
            StorageError::PermissionDenied { .. } => DeskError::Forbidden("Access denied".into()),
            other => DeskError::Storage(other),
        }
    }
}

impl From<PriceFeedError> for DeskError {
    fn from(err: PriceFeedError) -> Self {
        match err {
            PriceFeedError::UnsupportedSymbol(_) | PriceFeedError::InvalidRange(_) => {
                DeskError::Validation(err.to_string())
            }
            PriceFeedError::Upstream(_) => DeskError::Upstream(err.to_string()),
        }
    }
}

impl From<PaymentError> for DeskError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Provider(_) => DeskError::Upstream(err.to_string()),
            PaymentError::MissingSignature | PaymentError::InvalidSignature => {
                DeskError::Unauthorized(err.to_string())
            }
            PaymentError::InvalidAmount(_) | PaymentError::InvalidPayload(_) => {
                DeskError::Validation(err.to_string())
            }
        }
    }
}

impl From<AuthError> for DeskError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InternalError(msg) => DeskError::Internal(msg),
            AuthError::AccountFrozen => DeskError::Forbidden(err.to_string()),
            AuthError::InsufficientPermissions => DeskError::Forbidden(err.to_string()),
            other => DeskError::Unauthorized(other.to_string()),
        }
    }
}

fn capitalize(entity: &str) -> String {
    let mut chars = entity.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Trimmed, NFKC-normalized, lower-cased email.
pub fn normalize_email(raw: &str) -> String {
    use unicode_normalization::UnicodeNormalization;
    raw.trim().nfkc().collect::<String>().to_lowercase()
}

/// Upper-cased asset symbol; empty symbols are rejected.
pub(crate) fn normalize_asset(raw: &str) -> DeskResult<String> {
    let asset = raw.trim().to_ascii_uppercase();
    if asset.is_empty() {
        return Err(DeskError::Validation("Asset is required".into()));
    }
    Ok(asset)
}

#[cfg(test)]
pub(crate) mod testutil {
    use tempfile::TempDir;

    use crate::auth::{AuthenticatedUser, Claims, Role};
    use crate::storage::{Database, KycStatus, User, UserRepository};

    pub fn db() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_dir(dir.path()).unwrap();
        (dir, db)
    }

    /// Store a user directly, skipping registration.
    pub fn user(db: &Database, mobile: &str, kyc: KycStatus) -> User {
        let mut user = User::new(mobile.into(), format!("{mobile}@example.com"), "hash".into());
        user.kyc_status = kyc;
        UserRepository::new(db).create(&mut user).unwrap();
        user
    }

    pub fn admin(db: &Database) -> User {
        let mut admin = User::new("+919999999999".into(), "admin@example.com".into(), "hash".into());
        admin.role = Role::Admin;
        UserRepository::new(db).create(&mut admin).unwrap();
        admin
    }

    /// The request identity handlers would build for `user`.
    pub fn authed(user: &User) -> AuthenticatedUser {
        let claims = Claims {
            sub: user.id.clone(),
            iat: 0,
            exp: i64::MAX,
        };
        AuthenticatedUser::new(claims, user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
        // Fullwidth characters fold under NFKC.
        assert_eq!(normalize_email("ａｂｃ@example.com"), "abc@example.com");
    }

    #[test]
    fn storage_not_found_keeps_entity_name() {
        let err = DeskError::from(StorageError::not_found("order", "o1"));
        assert_eq!(err.to_string(), "Order not found");
    }

    #[test]
    fn asset_symbols_are_upper_cased() {
        assert_eq!(normalize_asset(" usdt ").unwrap(), "USDT");
        assert!(normalize_asset("  ").is_err());
    }
}
