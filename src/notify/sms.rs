// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SMS through Twilio or MSG91.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use super::DeliveryReport;
use crate::providers::{env_or_default, env_required, error_from_response, http_client, ProviderError};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";
const MSG91_URL: &str = "https://api.msg91.com/api/v5/flow/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub enum SmsBackend {
    /// Logs instead of sending.
    Mock,
    Twilio {
        account_sid: String,
        auth_token: String,
        from_number: String,
        http: reqwest::Client,
    },
    Msg91 {
        auth_key: String,
        sender_id: String,
        route: String,
        http: reqwest::Client,
    },
}

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
}

impl SmsBackend {
    /// Select the backend from `SMS_PROVIDER`.
    pub fn from_env() -> Result<Self, ProviderError> {
        match env_or_default("SMS_PROVIDER", "mock").to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "twilio" => Ok(Self::Twilio {
                account_sid: env_required("TWILIO_ACCOUNT_SID")?,
                auth_token: env_required("TWILIO_AUTH_TOKEN")?,
                from_number: env_required("TWILIO_PHONE_NUMBER")?,
                http: http_client(REQUEST_TIMEOUT)?,
            }),
            "msg91" => Ok(Self::Msg91 {
                auth_key: env_required("MSG91_AUTH_KEY")?,
                sender_id: env_or_default("MSG91_SENDER_ID", "BHRTBT"),
                route: env_or_default("MSG91_ROUTE", "4"),
                http: http_client(REQUEST_TIMEOUT)?,
            }),
            other => Err(ProviderError::InvalidConfig(format!(
                "SMS_PROVIDER={other} (expected mock, twilio or msg91)"
            ))),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Twilio { .. } => "twilio",
            Self::Msg91 { .. } => "msg91",
        }
    }

    pub async fn send(&self, mobile: &str, text: &str) -> DeliveryReport {
        let provider = self.provider_name();
        let result = match self {
            Self::Mock => {
                tracing::info!(to = %mobile, message = %text, "[MOCK SMS]");
                Ok("mock-123".to_string())
            }
            Self::Twilio {
                account_sid,
                auth_token,
                from_number,
                http,
            } => send_twilio(http, account_sid, auth_token, from_number, mobile, text).await,
            Self::Msg91 {
                auth_key,
                sender_id,
                route,
                http,
            } => send_msg91(http, auth_key, sender_id, route, mobile, text).await,
        };
        DeliveryReport::from_result(provider, result)
    }
}

/// E.164 form; bare 10-digit numbers are taken as Indian.
fn international(mobile: &str) -> String {
    if mobile.starts_with('+') {
        mobile.to_string()
    } else {
        format!("+91{mobile}")
    }
}

/// National number without the `+91` prefix, as MSG91 expects.
fn national(mobile: &str) -> &str {
    mobile.strip_prefix("+91").unwrap_or(mobile)
}

async fn send_twilio(
    http: &reqwest::Client,
    account_sid: &str,
    auth_token: &str,
    from_number: &str,
    mobile: &str,
    text: &str,
) -> Result<String, ProviderError> {
    let to = international(mobile);
    let form = [("To", to.as_str()), ("From", from_number), ("Body", text)];
    let response = http
        .post(format!("{TWILIO_API_BASE}/Accounts/{account_sid}/Messages.json"))
        .basic_auth(account_sid, Some(auth_token))
        .form(&form)
        .send()
        .await
        .map_err(|e| ProviderError::Request(format!("Twilio send failed: {e}")))?;

    if !response.status().is_success() {
        return Err(error_from_response("Twilio send", response).await);
    }
    let message: TwilioMessage = response
        .json()
        .await
        .map_err(|e| ProviderError::InvalidResponse(format!("Twilio response: {e}")))?;
    Ok(message.sid)
}

async fn send_msg91(
    http: &reqwest::Client,
    auth_key: &str,
    sender_id: &str,
    route: &str,
    mobile: &str,
    text: &str,
) -> Result<String, ProviderError> {
    let payload = json!({
        "sender": sender_id,
        "route": route,
        "country": "91",
        "sms": [{ "message": text, "to": [national(mobile)] }],
    });
    let response = http
        .post(MSG91_URL)
        .header("authkey", auth_key)
        .json(&payload)
        .send()
        .await
        .map_err(|e| ProviderError::Request(format!("MSG91 send failed: {e}")))?;

    if !response.status().is_success() {
        return Err(error_from_response("MSG91 send", response).await);
    }
    let body = response.text().await.unwrap_or_default();
    Ok(body)
}
