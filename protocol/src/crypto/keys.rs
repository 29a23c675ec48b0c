//! # Key Management
//!
//! Ed25519 keypairs held by vault owners. An owner signs approval digests
//! off-line with the secret half; vaults verify with the public half and map
//! it to an owner [`Address`](crate::Address).
//!
//! ## Why Ed25519?
//!
//! - Deterministic signatures. Signing the same digest twice gives the same
//!   bytes, and no nonce is drawn at signing time that a bad RNG could leak.
//! - 32-byte public keys and 64-byte signatures. A direct owner entry in a
//!   signature blob stays under a hundred bytes.
//! - Strict verification in ed25519-dalek rejects malleable signatures, so
//!   one approval cannot be dressed up as a second, different-looking one.
//! - Owners sign on laptops, hardware wallets and air-gapped boxes. Ed25519
//!   is supported on all of them.
//!
//! ## Security considerations
//!
//! - Private keys are zeroized on drop (ed25519-dalek does this for us).
//! - Key generation uses `OsRng`.
//! - Key bytes are never logged, and `Debug` prints only the public half.
//!   If you find yourself adding a `tracing` call that takes a keypair,
//!   stop and log the owner address instead.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

/// Errors that can occur during key operations.
///
/// Intentionally vague about *why* something failed.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not valid hex")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("invalid signature bytes: expected 64 bytes")]
    InvalidSignature,
}

/// An owner's Ed25519 keypair.
///
/// Does not implement `Serialize`: exporting a secret key should be a
/// deliberate call to [`secret_key_bytes`](Self::secret_key_bytes).
///
/// # Examples
///
/// ```
/// use warden_protocol::crypto::WardenKeypair;
///
/// let kp = WardenKeypair::generate();
/// let sig = kp.sign(b"approve transfer");
/// assert!(kp.public_key().verify(b"approve transfer", &sig));
/// ```
pub struct WardenKeypair {
    signing_key: SigningKey,
}

/// The public half of an owner key.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WardenPublicKey {
    bytes: [u8; PUBLIC_KEY_LENGTH],
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WardenSignature {
    bytes: Vec<u8>,
}

impl WardenKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic keypair from a 32-byte seed. The seed *is* the secret key.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstruct a keypair from a hex-encoded secret key (`0x` optional).
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let trimmed = hex_str.trim().trim_start_matches("0x");
        let bytes = hex::decode(trimmed).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// Returns the public key associated with this keypair.
    pub fn public_key(&self) -> WardenPublicKey {
        WardenPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Sign a message. Deterministic per RFC 8032.
    pub fn sign(&self, message: &[u8]) -> WardenSignature {
        WardenSignature {
            bytes: self.signing_key.sign(message).to_bytes().to_vec(),
        }
    }

    /// Exports the raw 32-byte secret key. Handle with care.
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Clone for WardenKeypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for WardenKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material, not even partially.
        write!(f, "WardenKeypair(pub={})", self.public_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// WardenPublicKey
// ---------------------------------------------------------------------------

impl WardenPublicKey {
    /// Wrap raw bytes without validation. [`verify`](Self::verify) fails
    /// cleanly if they are not a curve point.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Parse and validate a public key from a slice.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; PUBLIC_KEY_LENGTH] =
            slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.bytes
    }

    /// Strict Ed25519 verification. `false` on any failure, including a
    /// malformed key or signature.
    pub fn verify(&self, message: &[u8], signature: &WardenSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let Some(dalek_sig) = signature.to_dalek_signature() else {
            return false;
        };
        verifying_key.verify_strict(message, &dalek_sig).is_ok()
    }

    /// Hex-encoded representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Display for WardenPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for WardenPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WardenPublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// WardenSignature
// ---------------------------------------------------------------------------

impl WardenSignature {
    /// Create a signature from its raw 64-byte representation.
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Parse a signature from a slice, rejecting anything that is not 64 bytes.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        if slice.len() != SIGNATURE_LENGTH {
            return Err(KeyError::InvalidSignature);
        }
        Ok(Self {
            bytes: slice.to_vec(),
        })
    }

    /// Returns the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// `None` if the stored bytes are not exactly 64 long.
    pub fn to_dalek_signature(&self) -> Option<DalekSignature> {
        let arr: [u8; SIGNATURE_LENGTH] = self.bytes.as_slice().try_into().ok()?;
        Some(DalekSignature::from_bytes(&arr))
    }

    /// Hex-encoded signature.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Debug for WardenSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 128 {
            write!(f, "WardenSignature({}...{})", &hex_str[..8], &hex_str[120..])
        } else {
            write!(f, "WardenSignature({})", hex_str)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypair_sign_verify_roundtrip() {
        let kp = WardenKeypair::generate();
        let sig = kp.sign(b"approve 10");
        assert!(kp.public_key().verify(b"approve 10", &sig));
    }

    #[test]
    fn wrong_message_fails_verification() {
        let kp = WardenKeypair::generate();
        let sig = kp.sign(b"approve 10");
        assert!(!kp.public_key().verify(b"approve 11", &sig));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let kp1 = WardenKeypair::generate();
        let kp2 = WardenKeypair::generate();
        let sig = kp1.sign(b"message");
        assert!(!kp2.public_key().verify(b"message", &sig));
    }

    #[test]
    fn hex_secret_roundtrip() {
        let kp = WardenKeypair::generate();
        let hex_str = format!("0x{}", hex::encode(kp.secret_key_bytes()));
        let restored = WardenKeypair::from_hex(&hex_str).unwrap();
        assert_eq!(kp.public_key(), restored.public_key());
    }

    #[test]
    fn invalid_hex_rejected() {
        assert!(WardenKeypair::from_hex("deadbeef").is_err());
        assert!(WardenKeypair::from_hex("not-hex-at-all").is_err());
    }

    #[test]
    fn deterministic_from_seed() {
        let kp1 = WardenKeypair::from_seed(&[42u8; 32]);
        let kp2 = WardenKeypair::from_seed(&[42u8; 32]);
        assert_eq!(kp1.public_key(), kp2.public_key());
        assert_eq!(kp1.sign(b"x").as_bytes(), kp2.sign(b"x").as_bytes());
    }

    #[test]
    fn public_key_slice_validation() {
        let kp = WardenKeypair::generate();
        let pk = WardenPublicKey::try_from_slice(kp.public_key().as_bytes()).unwrap();
        assert_eq!(pk, kp.public_key());
        assert!(WardenPublicKey::try_from_slice(&[0u8; 16]).is_err());
    }

    #[test]
    fn truncated_signature_rejected() {
        assert!(WardenSignature::try_from_slice(&[0u8; 63]).is_err());
        let kp = WardenKeypair::generate();
        let bogus = WardenSignature {
            bytes: vec![1u8; 10],
        };
        assert!(!kp.public_key().verify(b"m", &bogus));
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = WardenKeypair::generate();
        let debug_str = format!("{:?}", kp);
        assert!(debug_str.starts_with("WardenKeypair(pub="));
        assert!(!debug_str.contains(&hex::encode(kp.secret_key_bytes())));
    }
}
