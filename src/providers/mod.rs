// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Third-party integrations configured from the environment.
//!
//! Each integration selects a backend (`mock` or a real provider) and reads
//! its own credentials with the helpers below.

pub mod kyc;
pub mod payments;

pub use kyc::KycVerifier;
pub use payments::{PaymentError, PaymentInstructions, PaymentProvider, WebhookEvent};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider configuration missing: {0}")]
    MissingConfig(String),

    #[error("provider configuration invalid: {0}")]
    InvalidConfig(String),

    #[error("provider request failed: {0}")]
    Request(String),

    #[error("provider response was invalid: {0}")]
    InvalidResponse(String),
}

pub fn env_required(name: &str) -> Result<String, ProviderError> {
    env_optional(name).ok_or_else(|| ProviderError::MissingConfig(name.to_string()))
}

/// Trimmed value of `name`; empty values count as unset.
pub fn env_optional(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Err(_) => None,
    }
}

pub fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

/// Boolean flag accepting `true`/`false` in any case.
pub fn env_flag(name: &str, default: bool) -> bool {
    match env_optional(name) {
        Some(value) => value.eq_ignore_ascii_case("true"),
        None => default,
    }
}

/// Shared outbound client with a request timeout.
pub fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))
}

/// Read a non-success response into a descriptive error.
pub(crate) async fn error_from_response(what: &str, response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ProviderError::Request(format!("{what} returned {status}: {body}"))
}
