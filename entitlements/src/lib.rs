//! Entitlement evaluation.
//!
//! Turns the asset oracle's raw item list into [`WalletHoldings`], evaluates
//! entitlement rules against them, and diffs the resulting target role set
//! against a member's current roles into a [`RoleMutationPlan`]. Everything
//! here is pure; I/O lives in the oracle, membership and sync crates.

pub mod asset;
pub mod evaluator;
pub mod holdings;
pub mod plan;

pub use asset::{AssetGroup, AssetItem, TokenInfo};
pub use evaluator::{evaluate, evaluate_detailed, managed_roles, Evaluation};
pub use holdings::WalletHoldings;
pub use plan::RoleMutationPlan;
