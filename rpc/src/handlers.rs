//! Request handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokengate_store::VerifiedBinding;
use tokengate_types::{SessionId, SubjectId};
use tokengate_verification::{ChallengeStatus, IssuedChallenge, VerifyOutcome};

use crate::error::RpcError;
use crate::server::AppState;

// ── Sessions ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub subject_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub message: String,
    pub expires_at: u64,
}

impl From<IssuedChallenge> for CreateSessionResponse {
    fn from(issued: IssuedChallenge) -> Self {
        Self {
            session_id: issued.session_id.to_string(),
            message: issued.message,
            expires_at: issued.expires_at.as_secs(),
        }
    }
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), RpcError> {
    let subject = SubjectId::new(req.subject_id)
        .map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
    let now = state.now();
    let issuer = state.issuer.clone();
    let issued = state
        .blocking(move || issuer.issue_challenge(&subject, now))
        .await??;
    state.metrics.challenges_issued.inc();
    Ok((StatusCode::CREATED, Json(issued.into())))
}

// ── Challenge ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChallengeQuery {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub message: String,
}

pub async fn generate_challenge(
    State(state): State<AppState>,
    Query(query): Query<ChallengeQuery>,
) -> Result<Json<ChallengeResponse>, RpcError> {
    let session_id = SessionId::from(query.session_id);
    let now = state.now();
    let issuer = state.issuer.clone();
    let status = state
        .blocking(move || issuer.challenge_for(&session_id, now))
        .await??;
    match status {
        ChallengeStatus::Pending { message, .. } => Ok(Json(ChallengeResponse { message })),
        ChallengeStatus::NotFound => Err(RpcError::SessionNotFound),
        ChallengeStatus::Expired => Err(RpcError::SessionExpired),
    }
}

// ── Verification ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifySignatureRequest {
    pub session_id: String,
    /// Base58 public key, as wallets display it.
    pub public_key: String,
    /// Raw signature bytes as a JSON array of numbers.
    pub signature: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifySignatureResponse {
    pub status: String,
    pub message: String,
    pub wallet_address: String,
}

pub async fn verify_signature(
    State(state): State<AppState>,
    Json(req): Json<VerifySignatureRequest>,
) -> Result<Json<VerifySignatureResponse>, RpcError> {
    let session_id = SessionId::from(req.session_id);
    let now = state.now();
    let verifier = state.verifier.clone();
    let outcome = state
        .blocking(move || verifier.verify(&session_id, &req.public_key, &req.signature, now))
        .await??;
    state
        .metrics
        .verifications
        .with_label_values(&[outcome.label()])
        .inc();

    match outcome {
        VerifyOutcome::Verified { wallet_address, .. } => Ok(Json(VerifySignatureResponse {
            status: "success".into(),
            message: "wallet verified".into(),
            wallet_address: wallet_address.to_string(),
        })),
        VerifyOutcome::SessionNotFound => Err(RpcError::SessionNotFound),
        VerifyOutcome::SessionExpired => Err(RpcError::SessionExpired),
        VerifyOutcome::InvalidSignature => Err(RpcError::InvalidSignature),
    }
}

// ── Status ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<u64>,
}

impl From<Option<VerifiedBinding>> for StatusResponse {
    fn from(binding: Option<VerifiedBinding>) -> Self {
        match binding {
            Some(b) => Self {
                verified: true,
                wallet_address: Some(b.wallet_address.to_string()),
                last_sync_at: b.last_sync_at.map(|t| t.as_secs()),
            },
            None => Self {
                verified: false,
                wallet_address: None,
                last_sync_at: None,
            },
        }
    }
}

pub async fn subject_status(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<StatusResponse>, RpcError> {
    let subject = SubjectId::new(subject_id).map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
    let bindings = state.bindings.clone();
    let binding = state
        .blocking(move || bindings.get_binding(&subject))
        .await??;
    Ok(Json(binding.into()))
}

// ── Operations ───────────────────────────────────────────────────────────

pub async fn health() -> &'static str {
    "ok"
}

pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.encode()
}
