//! `ApiError` — the HTTP-facing error taxonomy. Every handler
//! returns `Result<_, ApiError>`; nothing past this boundary leaks a raw
//! `StorageError`/`BillingError` message to a client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Forbidden,
    NotFound(String),
    BadRequest(String),
    BudgetExceeded,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "missing tenant identity".to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "tenant does not own this resource".to_string()),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, what),
            ApiError::BadRequest(what) => (StatusCode::BAD_REQUEST, what),
            ApiError::BudgetExceeded => {
                (StatusCode::PAYMENT_REQUIRED, "tenant has exhausted its spending budget".to_string())
            }
            ApiError::Internal(what) => {
                tracing::error!(error = %what, "internal error serving request");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<pf_storage::StorageError> for ApiError {
    fn from(err: pf_storage::StorageError) -> Self {
        match err {
            pf_storage::StorageError::NotFound { kind, id } => {
                ApiError::NotFound(format!("no {kind} with id '{id}' found for tenant"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<pf_billing::BillingError> for ApiError {
    fn from(err: pf_billing::BillingError) -> Self {
        match err {
            pf_billing::BillingError::InvalidLimit(limit) => {
                ApiError::BadRequest(format!("budget limit must be a non-negative number, got {limit}"))
            }
            pf_billing::BillingError::Storage(inner) => inner.into(),
        }
    }
}
