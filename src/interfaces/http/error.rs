//! HTTP error mapping

use crate::error::PaymentError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Payment(#[from] PaymentError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Payment(err) => match err {
                PaymentError::InvalidAmount(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_AMOUNT"),
                PaymentError::ValidationError(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
                }
                PaymentError::IntentNotFound(_) => (StatusCode::NOT_FOUND, "INTENT_NOT_FOUND"),
                PaymentError::IntentAlreadyFinalized { .. } => {
                    (StatusCode::CONFLICT, "INTENT_ALREADY_FINALIZED")
                }
                PaymentError::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
                PaymentError::IdempotencyKeyReused(_) => {
                    (StatusCode::CONFLICT, "IDEMPOTENCY_KEY_REUSED")
                }
                PaymentError::SignatureInvalid
                | PaymentError::SessionUnknown
                | PaymentError::ReplayedClaim => (StatusCode::BAD_REQUEST, "CLAIM_REJECTED"),
                PaymentError::GatewayUnreachable(_) | PaymentError::Gateway(_) => {
                    (StatusCode::BAD_GATEWAY, "GATEWAY_ERROR")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let error = if status.is_server_error() {
            tracing::error!(error = %self, code, "Request failed");
            match status {
                StatusCode::BAD_GATEWAY => "Payment gateway is unavailable".to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { error, code })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::intent::{IntentId, IntentStatus};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::from(PaymentError::InvalidAmount(0)), StatusCode::UNPROCESSABLE_ENTITY),
            (
                ApiError::from(PaymentError::IntentNotFound(IntentId::generate())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(PaymentError::IntentAlreadyFinalized {
                    intent_id: IntentId::generate(),
                    status: IntentStatus::Verified,
                }),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(PaymentError::GatewayUnreachable("timeout".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::from(PaymentError::StorageError("disk".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::Unauthorized("no token".into()), StatusCode::UNAUTHORIZED),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
