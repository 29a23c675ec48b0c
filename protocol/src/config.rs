//! # Protocol Configuration & Constants
//!
//! Every magic number that ends up inside a signed message lives here.
//! Changing any of the type signatures or the encoding prefix invalidates
//! every approval ever signed, so treat this file as append-only.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Module Identity
// ---------------------------------------------------------------------------

/// Name reported by the token transfer module.
pub const MODULE_NAME: &str = "TokenTransferModule";

/// Version reported by the token transfer module.
pub const MODULE_VERSION: &str = "1.0.0";

// ---------------------------------------------------------------------------
// Structured Approval Hashing
// ---------------------------------------------------------------------------

/// Type signature of the approval record. Hashed into every struct hash so
/// an approval digest can never be mistaken for a differently shaped message.
pub const APPROVAL_TYPE_SIGNATURE: &str =
    "TokenTransferModuleApproval(address module,address vault,address to,uint256 amount,uint256 nonce)";

/// Type signature of the signing domain: the chain and the verifying module.
pub const DOMAIN_TYPE_SIGNATURE: &str = "TransferDomain(uint256 chainId,address verifyingContract)";

/// Type signature of messages a vault signs on behalf of its own owners
/// (the delegated, contract-owner signature path).
pub const VAULT_MESSAGE_TYPE_SIGNATURE: &str = "VaultMessage(bytes message)";

/// Two-byte prefix of every structured encoding: `0x19` keeps it from ever
/// being a valid serialized transaction, `0x01` is the structured-data version.
pub const ENCODING_PREFIX: [u8; 2] = [0x19, 0x01];

/// Width of one encoded field. Integers are left-padded big-endian.
pub const WORD_LENGTH: usize = 32;

/// Length of `prefix || domain_separator || struct_hash`.
pub const ENCODED_APPROVAL_LENGTH: usize = ENCODING_PREFIX.len() + 2 * HASH_OUTPUT_LENGTH;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Identities are 32 bytes.
pub const ADDRESS_LENGTH: usize = 32;

/// Hash output length in bytes.
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// Ed25519 public key length.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Deployment Configuration
// ---------------------------------------------------------------------------

/// Chain id used when none is configured. Matches a local development chain.
pub const DEFAULT_CHAIN_ID: u64 = 31337;

/// Errors loading a [`ModuleConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("chain id must be non-zero")]
    ZeroChainId,
}

/// Per-deployment parameters of a transfer module.
///
/// The chain id is part of the signing domain, so an approval signed for one
/// chain is meaningless on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleConfig {
    /// Chain the module is deployed on.
    pub chain_id: u64,
}

impl ModuleConfig {
    /// Config for an explicit chain.
    pub fn with_chain_id(chain_id: u64) -> Self {
        Self { chain_id }
    }

    /// Parses and validates a JSON config, e.g. `{"chainId": 1}`.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ModuleConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Rejects configurations that could never sign anything meaningful.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain_id == 0 {
            return Err(ConfigError::ZeroChainId);
        }
        Ok(())
    }
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
        }
    }
}
