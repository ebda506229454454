//! LMDB storage backend for tokengate.
//!
//! Implements all storage traits from `tokengate-store` using the `heed` LMDB
//! bindings. Each logical store maps to one LMDB database within a single
//! environment.

pub mod binding;
pub mod environment;
pub mod error;
pub mod rule;
pub mod session;

pub use binding::LmdbBindingStore;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use rule::LmdbRuleStore;
pub use session::LmdbSessionStore;
