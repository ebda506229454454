//! Shared-secret gate for endpoints only the chat bot may call.
//!
//! Session creation binds a challenge to a subject id, so whoever opens the
//! session decides which member a signature will be bound to. Only the bot,
//! which knows the requester's real id, holds the secret.

use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use crate::error::RpcError;
use crate::server::AppState;

/// Bearer secret presented in `Authorization: Bearer <token>`.
#[derive(Clone)]
pub struct ApiToken(Arc<str>);

impl ApiToken {
    /// Returns `None` for an empty or blank secret.
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return None;
        }
        Some(Self(secret.into()))
    }

    pub fn matches(&self, presented: &str) -> bool {
        self.0.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(<redacted>)")
    }
}

/// Middleware rejecting requests without the expected bearer token.
pub async fn require_api_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RpcError> {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| state.api_token.matches(token));
    if !authorized {
        tracing::warn!(path = %request.uri().path(), "rejected request without valid API token");
        return Err(RpcError::Unauthorized);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_secret_is_refused() {
        assert!(ApiToken::new("").is_none());
        assert!(ApiToken::new("   ").is_none());
    }

    #[test]
    fn matches_only_the_exact_secret() {
        let token = ApiToken::new("s3cret").unwrap();
        assert!(token.matches("s3cret"));
        assert!(!token.matches("s3cre"));
        assert!(!token.matches("s3cret "));
        assert!(!token.matches(""));
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let token = ApiToken::new("s3cret").unwrap();
        assert!(!format!("{token:?}").contains("s3cret"));
    }
}
