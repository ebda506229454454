//! Token amounts as reported by the asset oracle.
//!
//! Balances arrive as raw integer units together with the mint's `decimals`.
//! Thresholds in entitlement rules are expressed in whole tokens, so every
//! comparison must go through [`TokenAmount::normalized`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw token balance and the number of decimals of its mint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenAmount {
    raw: u128,
    decimals: u8,
}

impl TokenAmount {
    pub fn new(raw: u128, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    pub fn raw(&self) -> u128 {
        self.raw
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Balance in whole tokens: `raw / 10^decimals`.
    pub fn normalized(&self) -> f64 {
        self.raw as f64 / 10f64.powi(i32::from(self.decimals))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized())
    }
}
