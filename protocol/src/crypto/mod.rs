//! # Cryptographic Primitives
//!
//! Everything on the signing path flows through here:
//!
//! - **BLAKE3** for hashing, with `derive_key` mode for domain separation.
//! - **Ed25519** for owner signatures.
//!
//! These are thin, type-safe wrappers around audited crates. No hand-rolled
//! primitives.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{blake3_hash, blake3_hash_multi, domain_separated_hash};
pub use keys::{KeyError, WardenKeypair, WardenPublicKey, WardenSignature};
pub use signatures::{sign, verify, verify_raw, SignatureError};
