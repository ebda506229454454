//! Axum-based HTTP server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tokengate_store::BindingStore;
use tokengate_types::Timestamp;
use tokengate_verification::{ChallengeIssuer, SignatureVerifier};

use crate::auth::{self, ApiToken};
use crate::error::RpcError;
use crate::handlers;
use crate::metrics::RpcMetrics;

/// Source of the current time, replaceable in tests.
pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<ChallengeIssuer>,
    pub verifier: Arc<SignatureVerifier>,
    pub bindings: Arc<dyn BindingStore>,
    pub metrics: Arc<RpcMetrics>,
    /// Secret the bot presents to open sessions.
    pub api_token: ApiToken,
    pub clock: Clock,
    /// Bound on every store call made on behalf of a request.
    pub store_timeout: Duration,
}

impl AppState {
    pub fn new(
        issuer: Arc<ChallengeIssuer>,
        verifier: Arc<SignatureVerifier>,
        bindings: Arc<dyn BindingStore>,
        api_token: ApiToken,
        store_timeout: Duration,
    ) -> Self {
        Self {
            issuer,
            verifier,
            bindings,
            metrics: Arc::new(RpcMetrics::new()),
            api_token,
            clock: Arc::new(Timestamp::now),
            store_timeout,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> Timestamp {
        (self.clock)()
    }

    /// Run a synchronous store operation off the async runtime, bounded by
    /// `store_timeout`.
    pub async fn blocking<T, F>(&self, f: F) -> Result<T, RpcError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        match tokio::time::timeout(self.store_timeout, tokio::task::spawn_blocking(f)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(RpcError::Internal(format!("store task failed: {e}"))),
            Err(_) => Err(RpcError::Internal(format!(
                "store call timed out after {:?}",
                self.store_timeout
            ))),
        }
    }
}

/// Build the router with every endpoint.
pub fn router(state: AppState) -> Router {
    let bot_only = Router::new()
        .route("/api/sessions", post(handlers::create_session))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_token,
        ));
    Router::new()
        .merge(bot_only)
        .route("/api/generate-challenge", get(handlers::generate_challenge))
        .route("/api/verify-signature", post(handlers::verify_signature))
        .route("/api/status/:subject_id", get(handlers::subject_status))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}

pub struct RpcServer {
    pub addr: SocketAddr,
    pub state: AppState,
}

impl RpcServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self { addr, state }
    }

    /// Serve until `shutdown` resolves.
    pub async fn start(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let app = router(self.state);
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!(addr = %self.addr, "HTTP API listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
