// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! INR payment collection: UPI deep links or Razorpay UPI QR codes, plus
//! Razorpay webhook verification.

use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use utoipa::ToSchema;

use super::{env_optional, env_or_default, env_required, error_from_response, http_client, ProviderError};
use crate::config::UpiDetails;

const RAZORPAY_QR_URL: &str = "https://api.razorpay.com/v1/payments/qr_codes";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const QR_VALIDITY_HOURS: i64 = 24;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment request failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    #[error("Missing webhook signature")]
    MissingSignature,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
}

/// How the customer should pay for an order.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum PaymentInstructions {
    Mock {
        upi_string: String,
        upi_id: String,
    },
    Razorpay {
        qr_code_id: String,
        image_url: String,
        /// Amount in paise.
        payment_amount: i64,
    },
}

/// Events the desk acts on; anything else is acknowledged and ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    PaymentCaptured {
        payment_id: String,
        order_id: Option<String>,
        amount: Decimal,
    },
    PaymentFailed {
        payment_id: String,
        reason: Option<String>,
    },
    Ignored(String),
}

#[derive(Debug, Clone)]
pub enum PaymentProvider {
    Mock {
        upi: UpiDetails,
    },
    Razorpay {
        key_id: String,
        key_secret: String,
        webhook_secret: String,
        merchant_name: String,
        http: reqwest::Client,
    },
}

#[derive(Deserialize)]
struct QrCodeResponse {
    id: String,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    payment_amount: i64,
}

#[derive(Deserialize)]
struct WebhookEnvelope {
    event: String,
    #[serde(default)]
    payload: Option<WebhookPayload>,
}

#[derive(Deserialize)]
struct WebhookPayload {
    payment: Option<EntityWrapper>,
}

#[derive(Deserialize)]
struct EntityWrapper {
    entity: PaymentEntity,
}

#[derive(Deserialize)]
struct PaymentEntity {
    id: String,
    #[serde(default)]
    amount: i64,
    #[serde(default)]
    notes: serde_json::Value,
    #[serde(default)]
    error_description: Option<String>,
}

impl PaymentProvider {
    /// Select the provider from `PAYMENT_PROVIDER` (`mock` or `razorpay`).
    pub fn from_env(upi: &UpiDetails) -> Result<Self, ProviderError> {
        match env_or_default("PAYMENT_PROVIDER", "mock").to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock { upi: upi.clone() }),
            "razorpay" => Ok(Self::Razorpay {
                key_id: env_required("RAZORPAY_KEY_ID")?,
                key_secret: env_required("RAZORPAY_KEY_SECRET")?,
                webhook_secret: env_optional("RAZORPAY_WEBHOOK_SECRET").ok_or_else(|| {
                    ProviderError::MissingConfig("RAZORPAY_WEBHOOK_SECRET".to_string())
                })?,
                merchant_name: upi.merchant_name.clone(),
                http: http_client(REQUEST_TIMEOUT)?,
            }),
            other => Err(ProviderError::InvalidConfig(format!(
                "PAYMENT_PROVIDER={other} (expected mock or razorpay)"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mock { .. } => "mock",
            Self::Razorpay { .. } => "razorpay",
        }
    }

    pub async fn payment_request(
        &self,
        order_id: &str,
        amount: Decimal,
        description: &str,
    ) -> Result<PaymentInstructions, PaymentError> {
        if amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount(amount));
        }
        match self {
            Self::Mock { upi } => Ok(PaymentInstructions::Mock {
                upi_string: upi_link(&upi.upi_id, &upi.merchant_name, amount, order_id),
                upi_id: upi.upi_id.clone(),
            }),
            Self::Razorpay {
                key_id,
                key_secret,
                merchant_name,
                http,
                ..
            } => {
                let paise = amount
                    .checked_mul(Decimal::ONE_HUNDRED)
                    .and_then(|p| p.round().to_i64())
                    .ok_or(PaymentError::InvalidAmount(amount))?;
                let close_by = (Utc::now() + chrono::Duration::hours(QR_VALIDITY_HOURS)).timestamp();
                let body = json!({
                    "type": "upi_qr",
                    "name": merchant_name,
                    "usage": "single_use",
                    "fixed_amount": true,
                    "payment_amount": paise,
                    "description": description,
                    "close_by": close_by,
                    "notes": { "order_id": order_id },
                });
                let response = http
                    .post(RAZORPAY_QR_URL)
                    .basic_auth(key_id, Some(key_secret))
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| ProviderError::Request(format!("Razorpay QR failed: {e}")))?;
                if !response.status().is_success() {
                    return Err(error_from_response("Razorpay QR", response).await.into());
                }
                let qr: QrCodeResponse = response.json().await.map_err(|e| {
                    ProviderError::InvalidResponse(format!("Razorpay QR response: {e}"))
                })?;
                Ok(PaymentInstructions::Razorpay {
                    qr_code_id: qr.id,
                    image_url: qr.image_url,
                    payment_amount: qr.payment_amount,
                })
            }
        }
    }

    /// Check `X-Razorpay-Signature` against the raw body. Mock mode accepts
    /// unsigned deliveries.
    pub fn verify_webhook(&self, body: &[u8], signature: Option<&str>) -> Result<(), PaymentError> {
        match self {
            Self::Mock { .. } => Ok(()),
            Self::Razorpay { webhook_secret, .. } => {
                let signature = signature.ok_or(PaymentError::MissingSignature)?;
                verify_signature(webhook_secret, body, signature)
            }
        }
    }

    pub fn parse_webhook(body: &[u8]) -> Result<WebhookEvent, PaymentError> {
        let envelope: WebhookEnvelope = serde_json::from_slice(body)
            .map_err(|e| PaymentError::InvalidPayload(e.to_string()))?;
        let payment = envelope.payload.and_then(|p| p.payment).map(|p| p.entity);

        match (envelope.event.as_str(), payment) {
            ("payment.captured", Some(entity)) => Ok(WebhookEvent::PaymentCaptured {
                order_id: entity
                    .notes
                    .get("order_id")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                amount: Decimal::new(entity.amount, 2),
                payment_id: entity.id,
            }),
            ("payment.failed", Some(entity)) => Ok(WebhookEvent::PaymentFailed {
                payment_id: entity.id,
                reason: entity.error_description,
            }),
            ("payment.captured" | "payment.failed", None) => Err(PaymentError::InvalidPayload(
                "missing payment entity".to_string(),
            )),
            (other, _) => Ok(WebhookEvent::Ignored(other.to_string())),
        }
    }
}

fn upi_link(upi_id: &str, merchant: &str, amount: Decimal, order_id: &str) -> String {
    let note = format!("Order {order_id}");
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("pa", upi_id)
        .append_pair("pn", merchant)
        .append_pair("am", &amount.to_string())
        .append_pair("tn", &note)
        .finish();
    format!("upi://pay?{query}")
}

/// Constant-time comparison of a hex HMAC-SHA256 signature.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> Result<(), PaymentError> {
    let expected = hex::decode(signature.trim()).map_err(|_| PaymentError::InvalidSignature)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| PaymentError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| PaymentError::InvalidSignature)
}

#[cfg(test)]
pub(crate) fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn razorpay() -> PaymentProvider {
        PaymentProvider::Razorpay {
            key_id: "rzp_test".into(),
            key_secret: "secret".into(),
            webhook_secret: "whsec".into(),
            merchant_name: "Desk".into(),
            http: reqwest::Client::new(),
        }
    }

    fn mock() -> PaymentProvider {
        PaymentProvider::Mock {
            upi: UpiDetails {
                upi_id: "desk@hdfcbank".into(),
                merchant_name: "BharatBit OTC".into(),
            },
        }
    }

    #[tokio::test]
    async fn mock_returns_upi_deep_link() {
        let instructions = mock()
            .payment_request("order-1", Decimal::from_str("8450.00").unwrap(), "USDT buy")
            .await
            .unwrap();
        match instructions {
            PaymentInstructions::Mock { upi_string, upi_id } => {
                assert!(upi_string.starts_with("upi://pay?pa=desk%40hdfcbank"));
                assert!(upi_string.contains("am=8450.00"));
                assert!(upi_string.contains("tn=Order+order-1"));
                assert_eq!(upi_id, "desk@hdfcbank");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_amount_is_rejected() {
        let err = mock()
            .payment_request("order-1", Decimal::ZERO, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn amount_beyond_paise_range_is_rejected() {
        let huge = Decimal::from_str("1000000000000000000000000000").unwrap();
        let err = razorpay().payment_request("order-1", huge, "x").await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount(_)));
    }

    #[test]
    fn correct_signature_verifies() {
        let body = br#"{"event":"payment.captured"}"#;
        let signature = sign("whsec", body);
        assert!(razorpay().verify_webhook(body, Some(&signature)).is_ok());
    }

    #[test]
    fn tampered_body_fails_verification() {
        let signature = sign("whsec", br#"{"amount":100}"#);
        let err = razorpay()
            .verify_webhook(br#"{"amount":999}"#, Some(&signature))
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidSignature));
    }

    #[test]
    fn razorpay_requires_a_signature_but_mock_does_not() {
        assert!(matches!(
            razorpay().verify_webhook(b"{}", None),
            Err(PaymentError::MissingSignature)
        ));
        assert!(mock().verify_webhook(b"{}", None).is_ok());
    }

    #[test]
    fn captured_payment_is_parsed() {
        let body = json!({
            "event": "payment.captured",
            "payload": { "payment": { "entity": {
                "id": "pay_123",
                "amount": 845000,
                "notes": { "order_id": "order-1" }
            }}}
        });
        let event = PaymentProvider::parse_webhook(body.to_string().as_bytes()).unwrap();
        assert_eq!(
            event,
            WebhookEvent::PaymentCaptured {
                payment_id: "pay_123".into(),
                order_id: Some("order-1".into()),
                amount: Decimal::from_str("8450.00").unwrap(),
            }
        );
    }

    #[test]
    fn unknown_events_are_ignored() {
        let event = PaymentProvider::parse_webhook(br#"{"event":"refund.created"}"#).unwrap();
        assert_eq!(event, WebhookEvent::Ignored("refund.created".into()));
    }
}
