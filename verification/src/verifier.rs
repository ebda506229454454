//! Signature verification and session consumption.

use std::sync::Arc;

use tokengate_crypto::{derive_address, parse_public_key, verify_signature};
use tokengate_store::{ConsumeOutcome, SessionStore, VerifiedBinding};
use tokengate_types::{SessionId, Signature, Timestamp};

use crate::{ChallengeTemplate, VerificationError, VerifyOutcome};

/// Checks a wallet's signature over a session's challenge and binds the
/// wallet to the session's subject.
pub struct SignatureVerifier {
    sessions: Arc<dyn SessionStore>,
    template: ChallengeTemplate,
}

impl SignatureVerifier {
    pub fn new(sessions: Arc<dyn SessionStore>, template: ChallengeTemplate) -> Self {
        Self { sessions, template }
    }

    /// Verify `signature` by `claimed_public_key` (base58) over the challenge
    /// of `session_id`.
    ///
    /// The message is rebuilt from the stored subject, never from client
    /// input. Expiry is checked before the signature. On acceptance the
    /// session is consumed and the binding upserted in one store operation;
    /// if another attempt consumed the session first, the result is
    /// [`VerifyOutcome::SessionNotFound`].
    pub fn verify(
        &self,
        session_id: &SessionId,
        claimed_public_key: &str,
        signature: &[u8],
        now: Timestamp,
    ) -> Result<VerifyOutcome, VerificationError> {
        let Some(session) = self.sessions.get_session(session_id)? else {
            return Ok(VerifyOutcome::SessionNotFound);
        };
        if session.is_expired(now) {
            tracing::debug!(session = %session_id, "rejecting expired session");
            return Ok(VerifyOutcome::SessionExpired);
        }

        let Some(public_key) = parse_public_key(claimed_public_key) else {
            return Ok(VerifyOutcome::InvalidSignature);
        };
        let Ok(signature) = Signature::try_from(signature) else {
            return Ok(VerifyOutcome::InvalidSignature);
        };

        let message = self.template.render(&session.subject_id, session_id);
        if !verify_signature(message.as_bytes(), &signature, &public_key) {
            tracing::info!(subject = %session.subject_id, "signature rejected");
            return Ok(VerifyOutcome::InvalidSignature);
        }

        let wallet_address = derive_address(&public_key);
        let binding = VerifiedBinding::new(session.subject_id.clone(), wallet_address.clone());
        match self.sessions.consume_and_bind(session_id, &binding)? {
            ConsumeOutcome::Consumed => {
                tracing::info!(
                    subject = %session.subject_id,
                    wallet = %wallet_address,
                    "wallet verified"
                );
                Ok(VerifyOutcome::Verified {
                    subject_id: session.subject_id,
                    wallet_address,
                })
            }
            ConsumeOutcome::Missing => Ok(VerifyOutcome::SessionNotFound),
        }
    }
}
