use thiserror::Error;
use tokengate_store::StoreError;

/// Infrastructure failures during challenge issuance or verification.
///
/// Client-facing rejections (unknown session, expiry, bad signature) are
/// [`crate::VerifyOutcome`] variants, not errors.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("session store unavailable: {0}")]
    Transient(#[from] StoreError),
}
