//! # Identities
//!
//! Every participant the transfer module talks to (owners, vaults, the
//! module itself, fungible tokens) is named by a 32-byte [`Address`].
//!
//! Two values are reserved and never valid as a transfer destination or an
//! asset: the all-zero address and the sentinel `0x00..01`, which vaults use
//! to mark "pre-approved by hash" entries in owner lists and signature blobs.
//!
//! Human-readable serializers (JSON) see the `0x`-prefixed hex form; binary
//! ones see the raw 32 bytes.
//!
//! Owner addresses are derived from Ed25519 public keys; contract-style
//! identities (vaults, modules, tokens) are derived from a label. Both
//! derivations go through a domain-separated BLAKE3 hash, so a key can never
//! collide with a label.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::ADDRESS_LENGTH;
use crate::crypto::hash::domain_separated_hash;
use crate::crypto::keys::WardenPublicKey;

/// Errors produced when parsing an address from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid address hex: {0}")]
    InvalidHex(String),

    #[error("invalid address length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// A 32-byte identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The all-zero identity.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// The reserved sentinel identity (`0x00..01`).
    pub const SENTINEL: Address = {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes[ADDRESS_LENGTH - 1] = 1;
        Address(bytes)
    };

    /// Wraps raw bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 32 bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Derives the owner address controlled by an Ed25519 public key.
    pub fn from_public_key(public_key: &WardenPublicKey) -> Self {
        Self(domain_separated_hash(
            "warden 2026 owner address",
            public_key.as_bytes(),
        ))
    }

    /// Derives a contract-style identity from a label, e.g. `"vault/treasury"`.
    ///
    /// Deterministic: the same label always yields the same address.
    pub fn derive(label: &str) -> Self {
        Self(domain_separated_hash(
            "warden 2026 contract address",
            label.as_bytes(),
        ))
    }

    /// `true` for the zero and sentinel identities.
    pub fn is_reserved(&self) -> bool {
        *self == Self::ZERO || *self == Self::SENTINEL
    }

    /// Hex-encoded form, without a `0x` prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hex address. A leading `0x` is accepted.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let arr: [u8; ADDRESS_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl From<[u8; ADDRESS_LENGTH]> for Address {
    fn from(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_hex(&s).map_err(de::Error::custom)
        } else {
            <[u8; ADDRESS_LENGTH]>::deserialize(deserializer).map(Self)
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{}..)", &self.to_hex()[..12])
    }
}
