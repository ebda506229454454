//! Cryptographic primitives for tokengate.
//!
//! - **Ed25519** for signing and signature verification
//! - Wallet address derivation: base58 of the 32-byte public key

pub mod address;
pub mod keys;
pub mod sign;

pub use address::{decode_address, derive_address, parse_public_key};
pub use keys::{keypair_from_private, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
