//! Verification session storage trait.

use crate::{StoreError, VerifiedBinding};
use serde::{Deserialize, Serialize};
use tokengate_types::{SessionId, SubjectId, Timestamp};

/// A pending challenge issued to a subject.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSession {
    pub session_id: SessionId,
    pub subject_id: SubjectId,
    pub created_at: Timestamp,
    /// The session is valid only while `now < expires_at`.
    pub expires_at: Timestamp,
}

impl VerificationSession {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_reached(now)
    }
}

/// Result of trying to consume a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The session existed; it is now deleted and the binding written.
    Consumed,
    /// No such session, either never issued or consumed by someone else first.
    Missing,
}

/// Trait for verification session storage.
pub trait SessionStore: Send + Sync {
    /// Insert a new session with a freshly generated id.
    fn create_session(
        &self,
        subject_id: &SubjectId,
        created_at: Timestamp,
        expires_at: Timestamp,
    ) -> Result<VerificationSession, StoreError>;

    fn get_session(&self, session_id: &SessionId)
        -> Result<Option<VerificationSession>, StoreError>;

    /// Atomically delete the session and upsert `binding`.
    ///
    /// Linearization point for single-use: under concurrent calls for the
    /// same `session_id`, at most one returns [`ConsumeOutcome::Consumed`].
    /// When the session is missing, nothing is written.
    fn consume_and_bind(
        &self,
        session_id: &SessionId,
        binding: &VerifiedBinding,
    ) -> Result<ConsumeOutcome, StoreError>;

    /// Remove every session whose expiry has been reached. Returns how many were removed.
    fn purge_expired(&self, now: Timestamp) -> Result<usize, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_expires_at_deadline() {
        let session = VerificationSession {
            session_id: SessionId::from("s"),
            subject_id: SubjectId::new("1").unwrap(),
            created_at: Timestamp::new(100),
            expires_at: Timestamp::new(700),
        };
        assert!(!session.is_expired(Timestamp::new(699)));
        assert!(session.is_expired(Timestamp::new(700)));
    }
}
