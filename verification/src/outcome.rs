//! Result of a verification attempt.

use tokengate_types::{SubjectId, WalletAddress};

/// How a verification attempt ended.
///
/// Only [`VerifyOutcome::Verified`] changes state. The other variants leave
/// the session untouched, except that a session found missing may already
/// have been consumed by a concurrent winner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Signature accepted, binding written, session consumed.
    Verified {
        subject_id: SubjectId,
        wallet_address: WalletAddress,
    },
    /// Never issued or already consumed. The two are indistinguishable.
    SessionNotFound,
    /// The session exists but its expiry has been reached.
    SessionExpired,
    /// Malformed key, malformed signature, or a signature that does not
    /// verify over the session's message.
    InvalidSignature,
}

impl VerifyOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerifyOutcome::Verified { .. })
    }

    /// Short, stable label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            VerifyOutcome::Verified { .. } => "verified",
            VerifyOutcome::SessionNotFound => "session_not_found",
            VerifyOutcome::SessionExpired => "session_expired",
            VerifyOutcome::InvalidSignature => "invalid_signature",
        }
    }
}
