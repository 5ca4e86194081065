// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Automated identity checks run on KYC submissions: PAN, Aadhaar and bank
//! account (penny drop) verification through Signzy, or a mock that accepts
//! everything.

use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use super::{env_or_default, env_required, error_from_response, http_client, ProviderError};
use crate::storage::{KycCheck, KycCheckKind};

const DEFAULT_SIGNZY_URL: &str = "https://api.signzy.tech";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub enum KycVerifier {
    Mock,
    Signzy {
        base_url: String,
        api_key: String,
        http: reqwest::Client,
    },
}

impl KycVerifier {
    /// Select the backend from `KYC_PROVIDER` (`mock` or `signzy`).
    pub fn from_env() -> Result<Self, ProviderError> {
        match env_or_default("KYC_PROVIDER", "mock").to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "signzy" => Ok(Self::Signzy {
                base_url: env_or_default("SIGNZY_BASE_URL", DEFAULT_SIGNZY_URL)
                    .trim_end_matches('/')
                    .to_string(),
                api_key: env_required("SIGNZY_API_KEY")?,
                http: http_client(REQUEST_TIMEOUT)?,
            }),
            other => Err(ProviderError::InvalidConfig(format!(
                "KYC_PROVIDER={other} (expected mock or signzy)"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Signzy { .. } => "signzy",
        }
    }

    pub async fn verify_pan(&self, pan_number: &str) -> Result<KycCheck, ProviderError> {
        self.check(
            KycCheckKind::Pan,
            "patrons/pan",
            json!({ "panNumber": pan_number }),
        )
        .await
    }

    /// Submitting Aadhaar for verification is the customer's consent.
    pub async fn verify_aadhaar(&self, aadhaar_number: &str) -> Result<KycCheck, ProviderError> {
        self.check(
            KycCheckKind::Aadhaar,
            "patrons/aadhaar",
            json!({ "aadhaarNumber": aadhaar_number, "consent": "Y" }),
        )
        .await
    }

    pub async fn verify_bank_account(
        &self,
        account_number: &str,
        ifsc: &str,
        holder_name: &str,
    ) -> Result<KycCheck, ProviderError> {
        self.check(
            KycCheckKind::BankAccount,
            "patrons/bankaccount",
            json!({
                "accountNumber": account_number,
                "ifsc": ifsc,
                "nameAsPerBank": holder_name,
            }),
        )
        .await
    }

    async fn check(
        &self,
        kind: KycCheckKind,
        path: &str,
        body: serde_json::Value,
    ) -> Result<KycCheck, ProviderError> {
        match self {
            Self::Mock => {
                tracing::info!(kind = ?kind, "[MOCK KYC] verification accepted");
            }
            Self::Signzy {
                base_url,
                api_key,
                http,
            } => {
                let response = http
                    .post(endpoint(base_url, path))
                    .bearer_auth(api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| ProviderError::Request(format!("Signzy {path} failed: {e}")))?;
                if !response.status().is_success() {
                    return Err(error_from_response("Signzy", response).await);
                }
            }
        }
        Ok(KycCheck {
            kind,
            provider: self.name().to_string(),
            verified: true,
            detail: None,
            checked_at: Utc::now(),
        })
    }
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{base_url}/api/v3/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_accepts_every_check() {
        let verifier = KycVerifier::Mock;
        let pan = verifier.verify_pan("ABCDE1234F").await.unwrap();
        assert_eq!(pan.kind, KycCheckKind::Pan);
        assert!(pan.verified);
        assert_eq!(pan.provider, "mock");

        let bank = verifier
            .verify_bank_account("1234567890", "HDFC0001234", "Asha")
            .await
            .unwrap();
        assert_eq!(bank.kind, KycCheckKind::BankAccount);
    }

    #[tokio::test]
    async fn unreachable_signzy_is_a_request_error() {
        let verifier = KycVerifier::Signzy {
            base_url: "http://127.0.0.1:9".into(),
            api_key: "key".into(),
            http: reqwest::Client::new(),
        };
        let err = verifier.verify_aadhaar("123412341234").await.unwrap_err();
        assert!(matches!(err, ProviderError::Request(_)));
    }

    #[test]
    fn endpoints_sit_under_api_v3() {
        assert_eq!(
            endpoint("https://api.signzy.tech", "patrons/pan"),
            "https://api.signzy.tech/api/v3/patrons/pan"
        );
    }
}
