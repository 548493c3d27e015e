//! Maps marketplace errors onto HTTP responses.

use crate::error::MarketplaceError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// Error returned by every handler.
///
/// Server-side failures are logged with their source and answered with a
/// generic message so no internal detail reaches the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    source: Option<MarketplaceError>,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Authentication required")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<MarketplaceError> for ApiError {
    fn from(err: MarketplaceError) -> Self {
        let (status, code, message) = match &err {
            MarketplaceError::ValidationError(message) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message.clone())
            }
            MarketplaceError::NotFoundError { .. } => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
            }
            MarketplaceError::ForbiddenError(_) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", err.to_string())
            }
            MarketplaceError::UnauthenticatedError => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", err.to_string())
            }
            MarketplaceError::SignatureError(_) => (
                StatusCode::BAD_REQUEST,
                "SIGNATURE_ERROR",
                "Webhook signature verification failed".to_string(),
            ),
            MarketplaceError::InvalidTransition { .. } => {
                (StatusCode::CONFLICT, "INVALID_TRANSITION", err.to_string())
            }
            MarketplaceError::ConflictError(message) => {
                (StatusCode::CONFLICT, "CONFLICT", message.clone())
            }
            MarketplaceError::PaymentProviderError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PAYMENT_PROVIDER_ERROR",
                "The payment provider could not process the request".to_string(),
            ),
            MarketplaceError::CsvError(_)
            | MarketplaceError::IoError(_)
            | MarketplaceError::StorageError(_)
            | MarketplaceError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "An internal error occurred".to_string(),
            ),
        };
        Self {
            status,
            code,
            message,
            source: Some(err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    error = %source,
                    "request failed"
                ),
                None => tracing::error!(status = %self.status, code = self.code, "request failed"),
            }
        }

        let body = ErrorBody {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
