// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transactional email through SendGrid or Resend.

use std::time::Duration;

use serde_json::json;

use super::DeliveryReport;
use crate::providers::{env_or_default, env_required, error_from_response, http_client, ProviderError};

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const RESEND_URL: &str = "https://api.resend.com/emails";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct Sender {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub enum EmailBackend {
    /// Logs instead of sending.
    Mock,
    SendGrid {
        api_key: String,
        sender: Sender,
        http: reqwest::Client,
    },
    Resend {
        api_key: String,
        sender: Sender,
        http: reqwest::Client,
    },
}

impl EmailBackend {
    /// Select the backend from `EMAIL_PROVIDER`.
    pub fn from_env() -> Result<Self, ProviderError> {
        let sender = Sender {
            email: env_or_default("FROM_EMAIL", "noreply@bharatbit.com"),
            name: env_or_default("FROM_NAME", "BharatBit OTC Desk"),
        };
        match env_or_default("EMAIL_PROVIDER", "mock").to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "sendgrid" => Ok(Self::SendGrid {
                api_key: env_required("SENDGRID_API_KEY")?,
                sender,
                http: http_client(REQUEST_TIMEOUT)?,
            }),
            "resend" => Ok(Self::Resend {
                api_key: env_required("RESEND_API_KEY")?,
                sender,
                http: http_client(REQUEST_TIMEOUT)?,
            }),
            other => Err(ProviderError::InvalidConfig(format!(
                "EMAIL_PROVIDER={other} (expected mock, sendgrid or resend)"
            ))),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::SendGrid { .. } => "sendgrid",
            Self::Resend { .. } => "resend",
        }
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str) -> DeliveryReport {
        let provider = self.provider_name();
        let result = match self {
            Self::Mock => {
                tracing::info!(to = %to, subject = %subject, "[MOCK EMAIL]");
                Ok("mock".to_string())
            }
            Self::SendGrid {
                api_key,
                sender,
                http,
            } => {
                let payload = json!({
                    "personalizations": [{ "to": [{ "email": to }] }],
                    "from": { "email": sender.email, "name": sender.name },
                    "subject": subject,
                    "content": [{ "type": "text/html", "value": html }],
                });
                post_json(http, SENDGRID_URL, api_key, &payload, "SendGrid send").await
            }
            Self::Resend {
                api_key,
                sender,
                http,
            } => {
                let payload = json!({
                    "from": format!("{} <{}>", sender.name, sender.email),
                    "to": [to],
                    "subject": subject,
                    "html": html,
                });
                post_json(http, RESEND_URL, api_key, &payload, "Resend send").await
            }
        };
        DeliveryReport::from_result(provider, result)
    }
}

async fn post_json(
    http: &reqwest::Client,
    url: &str,
    api_key: &str,
    payload: &serde_json::Value,
    what: &str,
) -> Result<String, ProviderError> {
    let response = http
        .post(url)
        .bearer_auth(api_key)
        .json(payload)
        .send()
        .await
        .map_err(|e| ProviderError::Request(format!("{what} failed: {e}")))?;

    if !response.status().is_success() {
        return Err(error_from_response(what, response).await);
    }
    Ok(format!("accepted ({})", response.status()))
}
