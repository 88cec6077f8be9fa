use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use causerie_store::StoreError;

/// Errors surfaced by conversation operations.
///
/// `NotFound` / `Forbidden` / `Validation` are distinct, user-actionable
/// outcomes.  Store faults other than a missing record are internal and
/// never leak details to the caller.  Crypto failures are recovered on
/// read paths and do not appear here.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Access denied: {0}")]
    Forbidden(&'static str),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Missing or invalid caller identity")]
    Unauthorized,

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ServiceError::NotFound("Conversation"),
            other => ServiceError::Store(other),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServiceError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServiceError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServiceError::Store(e) => {
                tracing::error!(error = %e, "store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ServiceError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let err: ServiceError = StoreError::NotFound.into();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn test_internal_response_hides_detail() {
        let response = ServiceError::Internal("lock poisoned".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
