//! Challenge issuance: one fresh session per request.

use std::sync::Arc;

use tokengate_store::SessionStore;
use tokengate_types::{SessionId, SubjectId, Timestamp};

use crate::{ChallengeTemplate, VerificationError};

/// How long a session stays valid after issuance.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 600;

/// A freshly issued challenge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedChallenge {
    pub session_id: SessionId,
    pub message: String,
    pub expires_at: Timestamp,
}

/// State of a session as seen by a client fetching its challenge text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChallengeStatus {
    Pending { message: String, expires_at: Timestamp },
    NotFound,
    Expired,
}

/// Creates verification sessions and the messages to sign for them.
///
/// Earlier sessions for the same subject stay valid until they expire or
/// are consumed.
pub struct ChallengeIssuer {
    sessions: Arc<dyn SessionStore>,
    template: ChallengeTemplate,
    ttl_secs: u64,
}

impl ChallengeIssuer {
    pub fn new(sessions: Arc<dyn SessionStore>, template: ChallengeTemplate, ttl_secs: u64) -> Self {
        Self {
            sessions,
            template,
            ttl_secs,
        }
    }

    /// Store a new session for `subject_id` and return its challenge.
    ///
    /// Store failures surface as [`VerificationError::Transient`] and are not retried.
    pub fn issue_challenge(
        &self,
        subject_id: &SubjectId,
        now: Timestamp,
    ) -> Result<IssuedChallenge, VerificationError> {
        let session = self
            .sessions
            .create_session(subject_id, now, now.plus_secs(self.ttl_secs))?;
        let message = self.template.render(&session.subject_id, &session.session_id);
        tracing::debug!(subject = %subject_id, session = %session.session_id, "issued challenge");
        Ok(IssuedChallenge {
            session_id: session.session_id,
            message,
            expires_at: session.expires_at,
        })
    }

    /// Rebuild the challenge for an existing session.
    pub fn challenge_for(
        &self,
        session_id: &SessionId,
        now: Timestamp,
    ) -> Result<ChallengeStatus, VerificationError> {
        let Some(session) = self.sessions.get_session(session_id)? else {
            return Ok(ChallengeStatus::NotFound);
        };
        if session.is_expired(now) {
            return Ok(ChallengeStatus::Expired);
        }
        Ok(ChallengeStatus::Pending {
            message: self.template.render(&session.subject_id, session_id),
            expires_at: session.expires_at,
        })
    }
}
