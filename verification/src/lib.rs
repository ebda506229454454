//! Wallet ownership verification.
//!
//! Two steps:
//! 1. **Challenge**: a subject asks to verify; a session with a fixed expiry
//!    is stored and a deterministic message naming the subject and the
//!    session nonce is returned for the wallet to sign.
//! 2. **Verification**: the signed message is rebuilt from the stored
//!    session, the Ed25519 signature is checked against the claimed key, and
//!    the session is consumed while the wallet binding is written.

pub mod challenge;
pub mod error;
pub mod message;
pub mod outcome;
pub mod verifier;

pub use challenge::{ChallengeIssuer, ChallengeStatus, IssuedChallenge, DEFAULT_SESSION_TTL_SECS};
pub use error::VerificationError;
pub use message::ChallengeTemplate;
pub use outcome::VerifyOutcome;
pub use verifier::SignatureVerifier;
