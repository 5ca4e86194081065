// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Expo push notifications.

use std::time::Duration;

use serde_json::json;

use super::DeliveryReport;
use crate::providers::{env_flag, error_from_response, http_client, ProviderError};

pub const EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const EXPO_TOKEN_PREFIX: &str = "ExponentPushToken";

#[derive(Debug, Clone)]
pub struct PushClient {
    /// When disabled, notifications are logged and reported as delivered.
    enabled: bool,
    endpoint: String,
    http: reqwest::Client,
}

impl PushClient {
    pub fn new(enabled: bool, endpoint: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            enabled,
            endpoint: endpoint.into(),
            http: http_client(REQUEST_TIMEOUT)?,
        })
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        Self::new(env_flag("PUSH_NOTIFICATIONS_ENABLED", true), EXPO_PUSH_URL)
    }

    pub fn disabled() -> Result<Self, ProviderError> {
        Self::new(false, EXPO_PUSH_URL)
    }

    pub fn is_expo_token(token: &str) -> bool {
        token.starts_with(EXPO_TOKEN_PREFIX)
    }

    pub async fn send(
        &self,
        token: &str,
        title: &str,
        body: &str,
        data: &serde_json::Value,
    ) -> DeliveryReport {
        if !self.enabled {
            tracing::info!(title = %title, body = %body, "[MOCK PUSH]");
            return DeliveryReport::delivered("mock", "push disabled");
        }
        if !Self::is_expo_token(token) {
            return DeliveryReport::failed("expo", "No valid push tokens");
        }

        let message = json!([{
            "to": token,
            "sound": "default",
            "title": title,
            "body": body,
            "priority": "high",
            "data": data,
        }]);
        let result = async {
            let response = self
                .http
                .post(&self.endpoint)
                .header("Accept", "application/json")
                .json(&message)
                .send()
                .await
                .map_err(|e| ProviderError::Request(format!("Expo push failed: {e}")))?;
            if !response.status().is_success() {
                return Err(error_from_response("Expo push", response).await);
            }
            Ok(response.text().await.unwrap_or_default())
        }
        .await;
        DeliveryReport::from_result("expo", result)
    }
}
