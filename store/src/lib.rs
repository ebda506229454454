//! Abstract storage traits for tokengate.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The verification and sync crates depend only on the traits.

pub mod binding;
pub mod error;
pub mod rule;
pub mod session;

pub use binding::{BindingStore, VerifiedBinding};
pub use error::StoreError;
pub use rule::{AssetKind, Condition, EntitlementRule, RuleStore};
pub use session::{ConsumeOutcome, SessionStore, VerificationSession};
