//! Fundamental types for the tokengate service.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! subject and session identifiers, role ids, wallet addresses, key material,
//! token amounts and timestamps.

pub mod address;
pub mod amount;
pub mod error;
pub mod ids;
pub mod keys;
pub mod time;

pub use address::WalletAddress;
pub use amount::TokenAmount;
pub use error::GateError;
pub use ids::{RoleId, SessionId, SubjectId};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use time::Timestamp;
