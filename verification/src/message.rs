//! The exact text a wallet signs.
//!
//! Issuer and verifier both call [`ChallengeTemplate::render`]; any drift in
//! the produced bytes makes every valid signature fail.

use tokengate_types::{SessionId, SubjectId};

/// Deployment-wide template for challenge messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChallengeTemplate {
    community: String,
}

impl ChallengeTemplate {
    pub fn new(community: impl Into<String>) -> Self {
        Self {
            community: community.into(),
        }
    }

    /// Build the message for `(subject_id, session_id)`.
    pub fn render(&self, subject_id: &SubjectId, session_id: &SessionId) -> String {
        format!(
            "Please sign this message to verify your account {} for {}.\n\nNonce: {}",
            subject_id, self.community, session_id
        )
    }
}

impl Default for ChallengeTemplate {
    fn default() -> Self {
        Self::new("the community")
    }
}
