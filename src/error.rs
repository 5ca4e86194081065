// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::desk::DeskError;
use crate::storage::StorageError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<DeskError> for ApiError {
    fn from(err: DeskError) -> Self {
        let message = err.to_string();
        match err {
            DeskError::NotFound(_) => Self::not_found(message),
            DeskError::Conflict(_)
            | DeskError::AlreadyApproved
            | DeskError::DuplicateWallet
            | DeskError::TerminalOrder(_) => Self::conflict(message),
            DeskError::Forbidden(_) | DeskError::KycNotApproved => Self::forbidden(message),
            DeskError::Unauthorized(_) => Self::unauthorized(message),
            DeskError::Validation(_) | DeskError::RateNotFound(_) => Self::bad_request(message),
            DeskError::Upstream(_) => {
                tracing::warn!(error = %message, "Upstream provider failed");
                Self::bad_gateway(message)
            }
            DeskError::Internal(_) => {
                tracing::error!(error = %message, "Internal failure");
                Self::internal("Internal server error")
            }
            DeskError::Storage(e) => Self::from(e),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, .. } => Self::not_found(format!("{entity} not found")),
            StorageError::PermissionDenied { .. } => Self::forbidden("Access denied"),
            StorageError::AlreadyExists { entity, .. } => {
                Self::conflict(format!("{entity} already exists"))
            }
            other => {
                tracing::error!(error = %other, "Storage failure");
                Self::internal("Internal storage error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::OrderStatus;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let conflict = ApiError::conflict("dup");
        assert_eq!(conflict.status, StatusCode::CONFLICT);
    }

    #[test]
    fn desk_errors_map_to_status_codes() {
        let cases = [
            (DeskError::NotFound("order".into()), StatusCode::NOT_FOUND),
            (DeskError::AlreadyApproved, StatusCode::CONFLICT),
            (DeskError::DuplicateWallet, StatusCode::CONFLICT),
            (DeskError::TerminalOrder(OrderStatus::Completed), StatusCode::CONFLICT),
            (DeskError::KycNotApproved, StatusCode::FORBIDDEN),
            (DeskError::Unauthorized("bad".into()), StatusCode::UNAUTHORIZED),
            (DeskError::RateNotFound("DOGE".into()), StatusCode::BAD_REQUEST),
            (DeskError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (DeskError::Upstream("down".into()), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn storage_internals_are_not_echoed() {
        let err = StorageError::Serde(serde_json::from_str::<u8>("x").unwrap_err());
        let api = ApiError::from(DeskError::Storage(err));
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message, "Internal storage error");
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }
}
