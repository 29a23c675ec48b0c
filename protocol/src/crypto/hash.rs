//! # Hashing Utilities
//!
//! BLAKE3 is the only hash function on Warden's signing path. Approval
//! digests, type hashes, domain separators and address derivations all use
//! it, so there is exactly one primitive to audit.
//!
//! ## Why BLAKE3 and not SHA-256 or Keccak?
//!
//! Nothing outside Warden has to recompute these digests, so there is no
//! compatibility pull toward an older hash. BLAKE3 gives 128-bit collision
//! resistance in a 32-byte output, runs several times faster than SHA-256 on
//! common hardware, and has a built-in key-derivation mode. That mode is
//! what [`domain_separated_hash`] uses: an address derived from a public key
//! can never collide with an approval digest because the two are hashed
//! under different context strings.
//!
//! ## Multi-part hashing
//!
//! Composite messages (`typehash || module || vault || ...`) are fed to the
//! hasher part by part via [`blake3_hash_multi`] instead of being
//! concatenated into a temporary buffer first.

use crate::Hash;

/// Compute the BLAKE3 hash of the input data.
///
/// # Example
///
/// ```
/// use warden_protocol::crypto::blake3_hash;
///
/// let hash = blake3_hash(b"warden");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Hash multiple byte slices together without concatenation overhead.
///
/// Identical to hashing the concatenation of `parts`.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Compute a domain-separated hash using BLAKE3's `derive_key` mode.
///
/// The context string selects a different internal IV, so two contexts can
/// never produce colliding outputs for the same data. Context strings should
/// be hardcoded, globally unique, and application-specific.
pub fn domain_separated_hash(context: &str, data: &[u8]) -> Hash {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}
