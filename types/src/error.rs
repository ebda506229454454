//! Top-level error type shared across crates.

use thiserror::Error;

/// Errors raised while parsing or constructing the shared types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("invalid role id: {0}")]
    InvalidRoleId(String),

    #[error("invalid subject id: {0}")]
    InvalidSubjectId(String),

    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("invalid signature length: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),
}
