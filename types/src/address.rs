//! Wallet address type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A wallet address: the base58 encoding of the wallet's 32-byte Ed25519
/// public key.
///
/// This type only carries the string; `tokengate_crypto::decode_address`
/// validates it and `tokengate_crypto::derive_address` produces canonical
/// addresses from public keys.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Wrap a raw address string without validating it.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WalletAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
