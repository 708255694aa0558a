// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP error responses.
//!
//! Every failure leaves the gateway as `{"error": "..."}` with a status
//! derived from the [`DeskError`] variant.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use contactdesk_core::DeskError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// An error on its way out of a handler.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }
}

impl From<DeskError> for ApiError {
    fn from(err: DeskError) -> Self {
        let status = match &err {
            DeskError::Validation(_) | DeskError::Channel { .. } => StatusCode::BAD_REQUEST,
            DeskError::NotFound { .. } => StatusCode::NOT_FOUND,
            DeskError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            DeskError::Transport { .. } => StatusCode::BAD_GATEWAY,
            DeskError::Config(_) | DeskError::Storage { .. } | DeskError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        } else {
            tracing::debug!(error = %err, "request rejected");
        }

        let message = match err {
            DeskError::Validation(message) => message,
            other => other.to_string(),
        };
        Self::new(status, message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desk_errors_map_to_statuses() {
        let cases = [
            (DeskError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (DeskError::conversation_not_found("c-1"), StatusCode::NOT_FOUND),
            (
                DeskError::Storage {
                    source: "disk".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (DeskError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }

    #[test]
    fn validation_message_is_passed_through_verbatim() {
        let err = ApiError::from(DeskError::Validation(
            "content must be at least 1 character".into(),
        ));
        assert_eq!(err.message, "content must be at least 1 character");
    }

    #[test]
    fn error_response_serializes() {
        let resp = ErrorResponse {
            error: "something went wrong".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"error":"something went wrong"}"#);
    }
}
