// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Core settings are loaded once at startup by [`AppConfig::from_env`].
//! Provider backends (email, SMS, push, payments, price feed) read their own
//! variables when they are constructed.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the redb file | `./data` |
//! | `JWT_SECRET` | HS256 signing secret | Required |
//! | `JWT_EXPIRY_DAYS` | Bearer token lifetime | `7` |
//! | `BCRYPT_COST` | bcrypt work factor | `12` |
//! | `OTP_FIXED_CODE` | Pin every OTP to this code (dev/mock only) | unset |
//! | `SUPPORT_EMAIL` | Support contact shown to users | `support@bharatbit.world` |
//! | `OTC_EMAIL` | Desk inbox for admin alerts | `otc@bharatbit.world` |
//! | `BANK_ACCOUNT_NAME` / `BANK_ACCOUNT_NUMBER` / `BANK_IFSC` / `BANK_NAME` / `BANK_BRANCH` | Desk bank details | empty |
//! | `UPI_ID` / `UPI_MERCHANT_NAME` | Desk UPI details | empty / `BharatBit OTC Desk` |
//! | `SEED_DEFAULT_DATA` | Seed admin and default rates at startup | `false` |
//! | `DEFAULT_ADMIN_PASSWORD` | Password of the seeded admin | unset (no admin seeded) |
//! | `CORS_ORIGINS` | Comma-separated allowed origins, `*` for any | `*` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | Serve HTTPS with these PEM files | unset (plain HTTP) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `EMAIL_PROVIDER` | `mock`, `sendgrid` or `resend` | `mock` |
//! | `SMS_PROVIDER` | `mock`, `twilio` or `msg91` | `mock` |
//! | `PUSH_NOTIFICATIONS_ENABLED` | Deliver Expo push notifications | `true` |
//! | `PAYMENT_PROVIDER` | `mock` or `razorpay` | `mock` |
//! | `KYC_PROVIDER` | `mock` or `signzy` (`SIGNZY_API_KEY`, `SIGNZY_BASE_URL`) | `mock` |
//! | `COINGECKO_API_URL` | Price feed base URL | `https://api.coingecko.com/api/v3` |

use std::path::PathBuf;

use serde::Serialize;
use utoipa::ToSchema;

use crate::providers::{env_flag, env_optional, env_or_default};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_JWT_EXPIRY_DAYS: i64 = 7;
const DEFAULT_BCRYPT_COST: u32 = 12;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Bank account customers pay INR into.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct BankDetails {
    pub account_name: String,
    pub account_number: String,
    pub ifsc: String,
    pub bank_name: String,
    pub branch: String,
}

/// UPI handle customers pay INR into.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct UpiDetails {
    pub upi_id: String,
    pub merchant_name: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub jwt_expiry_days: i64,
    pub bcrypt_cost: u32,
    pub otp_fixed_code: Option<String>,
    pub support_email: String,
    pub otc_email: String,
    pub bank: BankDetails,
    pub upi: UpiDetails,
    pub seed_default_data: bool,
    pub default_admin_password: Option<String>,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = env_optional(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;

        Ok(Self {
            host: env_or_default(HOST_ENV, "0.0.0.0"),
            port: parse_env(PORT_ENV, DEFAULT_PORT)?,
            data_dir: PathBuf::from(env_or_default(DATA_DIR_ENV, DEFAULT_DATA_DIR)),
            jwt_secret,
            jwt_expiry_days: parse_env("JWT_EXPIRY_DAYS", DEFAULT_JWT_EXPIRY_DAYS)?,
            bcrypt_cost: parse_env("BCRYPT_COST", DEFAULT_BCRYPT_COST)?,
            otp_fixed_code: env_optional("OTP_FIXED_CODE"),
            support_email: env_or_default("SUPPORT_EMAIL", "support@bharatbit.world"),
            otc_email: env_or_default("OTC_EMAIL", "otc@bharatbit.world"),
            bank: BankDetails {
                account_name: env_or_default("BANK_ACCOUNT_NAME", ""),
                account_number: env_or_default("BANK_ACCOUNT_NUMBER", ""),
                ifsc: env_or_default("BANK_IFSC", ""),
                bank_name: env_or_default("BANK_NAME", ""),
                branch: env_or_default("BANK_BRANCH", ""),
            },
            upi: UpiDetails {
                upi_id: env_or_default("UPI_ID", ""),
                merchant_name: env_or_default("UPI_MERCHANT_NAME", "BharatBit OTC Desk"),
            },
            seed_default_data: env_flag("SEED_DEFAULT_DATA", false),
            default_admin_password: env_optional("DEFAULT_ADMIN_PASSWORD"),
            cors_origins: parse_origins(&env_or_default("CORS_ORIGINS", "*")),
            tls_cert_path: env_optional("TLS_CERT_PATH").map(PathBuf::from),
            tls_key_path: env_optional("TLS_KEY_PATH").map(PathBuf::from),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Both TLS paths, when HTTPS is configured.
    pub fn tls_paths(&self) -> Option<(&PathBuf, &PathBuf)> {
        self.tls_cert_path.as_ref().zip(self.tls_key_path.as_ref())
    }
}

fn parse_env<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_optional(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty() && *o != "*")
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
impl AppConfig {
    /// Configuration for in-process tests: fixed OTP, cheap bcrypt.
    pub fn for_tests(data_dir: &std::path::Path) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            data_dir: data_dir.to_path_buf(),
            jwt_secret: "test-secret".into(),
            jwt_expiry_days: DEFAULT_JWT_EXPIRY_DAYS,
            bcrypt_cost: 4,
            otp_fixed_code: Some("123456".into()),
            support_email: "support@example.com".into(),
            otc_email: "otc@example.com".into(),
            bank: BankDetails {
                account_name: "Desk Pvt Ltd".into(),
                account_number: "000111222333".into(),
                ifsc: "HDFC0000001".into(),
                bank_name: "HDFC Bank".into(),
                branch: "Fort, Mumbai".into(),
            },
            upi: UpiDetails {
                upi_id: "desk@hdfcbank".into(),
                merchant_name: "Desk".into(),
            },
            seed_default_data: false,
            default_admin_password: Some("admin-password".into()),
            cors_origins: Vec::new(),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_split_and_wildcard_dropped() {
        assert!(parse_origins("*").is_empty());
        assert_eq!(
            parse_origins("https://a.example, https://b.example ,"),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn tls_requires_both_paths() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::for_tests(dir.path());
        assert!(config.tls_paths().is_none());

        config.tls_cert_path = Some("cert.pem".into());
        assert!(config.tls_paths().is_none());

        config.tls_key_path = Some("key.pem".into());
        assert!(config.tls_paths().is_some());
        assert_eq!(config.bind_address(), "127.0.0.1:0");
    }
}
