//! HTTP API for tokengate.
//!
//! Provides endpoints for:
//! - Session creation (stands in for the chat command that starts verification;
//!   requires the bot's bearer token)
//! - Challenge retrieval for a session
//! - Signature submission
//! - Verification status of a subject
//! - Health and Prometheus metrics

pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod server;

pub use auth::ApiToken;
pub use error::RpcError;
pub use metrics::RpcMetrics;
pub use server::{router, AppState, RpcServer};
