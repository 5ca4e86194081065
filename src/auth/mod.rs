// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Desk-issued HS256 bearer tokens for customers and admins.
//!
//! ## Auth Flow
//!
//! 1. Client logs in with email or mobile plus password
//! 2. Server sends a 2FA code by email and SMS
//! 3. Client verifies the code and receives `Authorization: Bearer <JWT>`
//! 4. On every request the [`Auth`] extractor:
//!    - verifies signature and expiry
//!    - loads the user named by `sub`
//!    - rejects frozen accounts
//!    - takes the role from the stored record, never from the token
//!
//! ## Security
//!
//! - Passwords are bcrypt hashes, computed off the async runtime
//! - OTPs and reset tokens come from the system CSPRNG
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod otp;
pub mod password;
pub mod roles;
pub mod token;

pub use claims::{AuthenticatedUser, Claims};
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth};
pub use otp::OtpIssuer;
pub use password::PasswordHasher;
pub use roles::Role;
pub use token::TokenService;

use crate::config::AppConfig;

/// Credentials machinery shared by every request.
#[derive(Clone)]
pub struct AuthSettings {
    pub tokens: TokenService,
    pub passwords: PasswordHasher,
    pub otp: OtpIssuer,
}

impl AuthSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            tokens: TokenService::new(
                config.jwt_secret.as_bytes(),
                chrono::Duration::days(config.jwt_expiry_days),
            ),
            passwords: PasswordHasher::new(config.bcrypt_cost),
            otp: OtpIssuer::new(config.otp_fixed_code.clone()),
        }
    }
}
