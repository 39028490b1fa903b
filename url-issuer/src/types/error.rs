//! Universal error handling for the API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use image_storage::object_store::ObjectStoreError;
use serde::Serialize;

use crate::issuer::IssuerError;

/// Error body returned to callers
#[derive(Debug, Serialize)]
struct ErrorBody {
    /// Human-readable error message
    error: &'static str,
    /// Machine-readable error code
    code: &'static str,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    body: ErrorBody,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub const fn new(status: StatusCode, code: &'static str, msg: &'static str) -> Self {
        Self {
            status,
            body: ErrorBody { error: msg, code },
        }
    }

    /// Response for a path no route matches
    #[must_use]
    pub const fn route_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", "Not Found")
    }

    /// Response for a request body that is not JSON
    #[must_use]
    pub const fn invalid_json() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "invalid_json",
            "Invalid JSON in request body",
        )
    }

    /// Response for a handler that panicked
    #[must_use]
    pub const fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error",
        )
    }

    /// HTTP status of the response
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Stable message returned to the caller
    #[must_use]
    pub const fn message(&self) -> &'static str {
        self.body.error
    }

    /// Maps an issuer error, using `store_message` for store failures
    ///
    /// Store failures keep their detail in the operator log only.
    #[must_use]
    pub fn from_issuer(err: IssuerError, store_message: &'static str) -> Self {
        match err {
            IssuerError::Validation(msg) => {
                tracing::warn!("Invalid input: {msg}");
                Self::new(StatusCode::BAD_REQUEST, "validation_error", msg)
            }
            IssuerError::NotFound => {
                Self::new(StatusCode::NOT_FOUND, "not_found", "File not found")
            }
            IssuerError::Store(store_err) => {
                match &store_err {
                    ObjectStoreError::UpstreamError(msg) => {
                        tracing::error!("S3 upstream error: {msg}");
                    }
                    other => tracing::error!("Object store error: {other}"),
                }
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    store_message,
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error based on status code
        match self.status.as_u16() {
            400..=499 => tracing::warn!(
                "Client error: {} - {}",
                self.body.code,
                self.body.error
            ),
            500..=599 => tracing::error!(
                "Server error: {} - {}",
                self.body.code,
                self.body.error
            ),
            _ => {}
        }

        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issuer_errors_map_to_stable_messages() {
        let validation = AppError::from_issuer(
            IssuerError::Validation("Missing filename"),
            "Could not generate URL",
        );
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(validation.message(), "Missing filename");

        let not_found = AppError::from_issuer(IssuerError::NotFound, "Could not generate URL");
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.message(), "File not found");

        let store = AppError::from_issuer(
            IssuerError::Store(ObjectStoreError::S3Error("AccessDenied: secret detail".into())),
            "Could not generate URL",
        );
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.message(), "Could not generate URL");
    }
}
