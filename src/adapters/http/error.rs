//! Error responses for the billing HTTP API.
//!
//! Every error body has the shape `{"error":{"code":"ERR_…","message":"…"}}`.
//! Authenticated routes answer with the precise code; public routes answer
//! with [`PublicApiError`], which hides why a request was refused.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::billing::{BillingError, ErrorKind};
use crate::ports::AuthError;

/// Error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

pub(crate) fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (status, Json(ErrorBody::new(code, message))).into_response()
}

/// Maps an error category to its HTTP status.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::UpstreamGateway => StatusCode::BAD_GATEWAY,
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Authenticated API errors
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub BillingError);

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(billing_error_for_auth(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(BillingError::validation("body", rejection.body_text()))
    }
}

pub(crate) fn billing_error_for_auth(err: AuthError) -> BillingError {
    match err {
        AuthError::ServiceUnavailable(reason) => BillingError::Upstream(reason),
        AuthError::MissingCredentials | AuthError::InvalidToken | AuthError::TokenExpired => {
            BillingError::Unauthenticated
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);

        // Internal details stay in the logs.
        let message = match kind {
            ErrorKind::Internal => {
                tracing::error!(error = %self.0, "Request failed with internal error");
                "internal error".to_string()
            }
            ErrorKind::UpstreamGateway => {
                tracing::warn!(error = %self.0, "Upstream provider failed");
                "billing provider unavailable".to_string()
            }
            _ => self.0.to_string(),
        };

        error_response(status, self.0.code(), &message)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Public API errors
// ════════════════════════════════════════════════════════════════════════════════

pub const ERR_INVALID_REQUEST: &str = "ERR_INVALID_REQUEST";

const GENERIC_PUBLIC_MESSAGE: &str = "license key or inputs invalid";

/// Error for unauthenticated endpoints.
///
/// Validation, conflict, not-found and auth failures all become
/// `400 ERR_INVALID_REQUEST` so callers cannot tell which input was wrong.
#[derive(Debug)]
pub struct PublicApiError(pub BillingError);

impl From<BillingError> for PublicApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for PublicApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(BillingError::validation("body", rejection.body_text()))
    }
}

impl IntoResponse for PublicApiError {
    fn into_response(self) -> Response {
        match self.0.kind() {
            ErrorKind::RateLimited | ErrorKind::Internal | ErrorKind::UpstreamGateway => {
                ApiError(self.0).into_response()
            }
            ErrorKind::NotFound
            | ErrorKind::InvalidInput
            | ErrorKind::Conflict
            | ErrorKind::Unauthorized
            | ErrorKind::Forbidden => {
                tracing::warn!(code = self.0.code(), error = %self.0, "Public request rejected");
                error_response(
                    StatusCode::BAD_REQUEST,
                    ERR_INVALID_REQUEST,
                    GENERIC_PUBLIC_MESSAGE,
                )
            }
        }
    }
}
