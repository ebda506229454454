//! Asset oracle for tokengate.
//!
//! The oracle answers one question: what does this wallet hold right now?
//! The sync engine depends only on the [`AssetOracle`] trait; [`DasOracle`]
//! is the production implementation speaking the Digital Asset Standard
//! JSON-RPC API.

pub mod das;
pub mod error;

pub use das::{DasOracle, DasOracleConfig};
pub use error::OracleError;

use async_trait::async_trait;
use tokengate_entitlements::AssetItem;
use tokengate_types::WalletAddress;

/// Source of a wallet's current holdings.
#[async_trait]
pub trait AssetOracle: Send + Sync {
    /// Every asset currently owned by `owner`.
    async fn fetch_assets(&self, owner: &WalletAddress) -> Result<Vec<AssetItem>, OracleError>;
}
