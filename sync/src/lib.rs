//! Reconciliation engine for tokengate.
//!
//! One pass loads every verified binding and the rule set, then converges
//! each member's managed roles onto what their wallet currently entitles
//! them to. Subjects are independent: a failure for one is logged, counted
//! in the [`SyncReport`] and never stops the others.

pub mod engine;
pub mod error;
pub mod report;

pub use engine::{ReconciliationEngine, SyncSettings};
pub use error::SyncError;
pub use report::SyncReport;
