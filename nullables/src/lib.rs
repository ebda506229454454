//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of tokengate (clock, storage, asset oracle,
//! membership directory) sits behind a trait. This crate provides
//! test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod membership;
pub mod oracle;
pub mod store;

pub use clock::NullClock;
pub use membership::{Mutation, NullMembership};
pub use oracle::NullOracle;
pub use store::NullStore;
