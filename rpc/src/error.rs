//! RPC error types.

use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tokengate_store::StoreError;
use tokengate_verification::VerificationError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("session not found")]
    SessionNotFound,

    #[error("session expired")]
    SessionExpired,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("missing or invalid API token")]
    Unauthorized,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Infrastructure failure. The cause is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::SessionNotFound | RpcError::SessionExpired => StatusCode::NOT_FOUND,
            RpcError::InvalidSignature | RpcError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RpcError::Unauthorized => StatusCode::UNAUTHORIZED,
            RpcError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let detail = match &self {
            RpcError::Internal(cause) => {
                tracing::error!(%cause, "request failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(serde_json::json!({ "detail": detail }));
        let mut response = (self.status(), body).into_response();
        if matches!(self, RpcError::Unauthorized) {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<VerificationError> for RpcError {
    fn from(e: VerificationError) -> Self {
        RpcError::Internal(e.to_string())
    }
}

impl From<StoreError> for RpcError {
    fn from(e: StoreError) -> Self {
        RpcError::Internal(e.to_string())
    }
}
