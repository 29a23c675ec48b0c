//! # Digital Signatures
//!
//! Free-function wrappers for Ed25519 signing and verification. Vaults call
//! [`verify_raw`] on signature-blob entries that arrive as plain bytes;
//! owners call [`sign`] on the approval digest they were handed.
//!
//! ## Strict verification
//!
//! Verification is strict (`verify_strict`): small-order keys and
//! non-canonical signatures are rejected. Plain `verify` accepts a handful of
//! edge-case encodings that let a third party produce a second valid
//! signature for the same message. For a quorum check that is mostly
//! harmless, but strict mode costs nothing and removes the question.
//!
//! ## Raw bytes
//!
//! Signature blobs are untrusted input. [`verify_raw`] takes the public key
//! and signature exactly as they were cut out of the blob, and reports a key
//! that is not a curve point as [`SignatureError::InvalidPublicKey`] instead
//! of panicking. Callers never build typed keys from that input themselves.

use ed25519_dalek::{Signature as DalekSignature, VerifyingKey};
use thiserror::Error;

use super::keys::{WardenKeypair, WardenPublicKey, WardenSignature};
use crate::config::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

/// Errors during signature operations.
///
/// Intentionally vague. We don't tell attackers why verification failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error("invalid public key")]
    InvalidPublicKey,
}

/// Sign a message with an owner keypair.
///
/// # Example
///
/// ```
/// use warden_protocol::crypto::{sign, verify, WardenKeypair};
///
/// let keypair = WardenKeypair::generate();
/// let digest = [9u8; 32];
/// let signature = sign(&keypair, &digest);
///
/// assert!(verify(&keypair.public_key(), &digest, &signature));
/// ```
pub fn sign(keypair: &WardenKeypair, message: &[u8]) -> WardenSignature {
    keypair.sign(message)
}

/// Verify a signature against a public key and message.
pub fn verify(public_key: &WardenPublicKey, message: &[u8], signature: &WardenSignature) -> bool {
    public_key.verify(message, signature)
}

/// Verify a signature given as raw bytes off the wire.
pub fn verify_raw(
    public_key_bytes: &[u8; PUBLIC_KEY_LENGTH],
    message: &[u8],
    signature_bytes: &[u8; SIGNATURE_LENGTH],
) -> Result<(), SignatureError> {
    let verifying_key =
        VerifyingKey::from_bytes(public_key_bytes).map_err(|_| SignatureError::InvalidPublicKey)?;

    let signature = DalekSignature::from_bytes(signature_bytes);

    verifying_key
        .verify_strict(message, &signature)
        .map_err(|_| SignatureError::VerificationFailed)
}
