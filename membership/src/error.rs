use thiserror::Error;

#[derive(Debug, Error)]
pub enum MembershipError {
    /// The subject or role does not exist (e.g. the member left).
    #[error("not found: {0}")]
    NotFound(String),

    /// The bot lacks the privilege for this call.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Timeouts, rate limits and 5xx responses.
    #[error("transient membership failure: {0}")]
    Transient(String),

    #[error("invalid response from membership API: {0}")]
    InvalidResponse(String),
}
