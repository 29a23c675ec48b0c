//! # In-Memory Custody Vaults
//!
//! A registry of multi-owner vaults that answers the questions the transfer
//! module asks: who owns a vault, which modules it has enabled, and whether a
//! signature blob meets its threshold.
//!
//! In production this is the vault contract itself. The in-memory version
//! here backs the tests, the benches and the CLI, and follows the same rules
//! a real vault enforces.
//!
//! ## Signature checking
//!
//! The first `threshold` entries of the blob (see
//! [`crate::owner_signatures`]) are checked in order:
//!
//! - **Direct**: the public key must hash to the claimed owner and the
//!   Ed25519 signature must verify over the digest.
//! - **ApprovedHash**: the owner must have called [`approve_hash`] for the
//!   digest beforehand.
//! - **Contract**: the owner is another vault; the inner blob must satisfy
//!   *that* vault's threshold over its [`message_hash`] of the encoding.
//!
//! Owners must appear in strictly increasing order, which also rules out
//! counting one owner twice.
//!
//! ## Why only the first `threshold` entries?
//!
//! A vault with threshold 2 and five owners only needs two signatures. The
//! submitter may append more, but the extra entries are never looked at, so
//! a valid quorum cannot be spoiled by junk tacked on the end, and the cost
//! of a check is bounded by the threshold rather than by the blob.
//!
//! ## Contract owners and recursion
//!
//! A vault can be owned by another vault. Checking such an owner means
//! checking the inner vault's own quorum, which may in turn contain contract
//! owners. Two vaults can even own each other. Recursion is therefore capped
//! at [`MAX_CONTRACT_SIGNATURE_DEPTH`] levels; anything deeper is rejected
//! with `GS024`. The registry lock is released before recursing, so a nested
//! check never waits on the lock its caller holds.
//!
//! Rejection codes follow the vault contract's: `GS001` no threshold,
//! `GS020` blob too short or malformed, `GS024` contract signature invalid,
//! `GS025` hash not approved, `GS026` invalid or unordered owner.
//!
//! [`approve_hash`]: VaultRegistry::approve_hash
//! [`message_hash`]: VaultRegistry::message_hash

use std::collections::{BTreeSet, HashMap, HashSet};

use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;
use warden_protocol::config::{ENCODING_PREFIX, VAULT_MESSAGE_TYPE_SIGNATURE};
use warden_protocol::crypto::{blake3_hash, blake3_hash_multi, verify_raw};
use warden_protocol::{Address, Hash, ModuleConfig};

use crate::approval::domain_separator;
use crate::collaborators::{VaultCollaborator, VaultRejection};
use crate::owner_signatures::{decode_signatures, OwnerSignature};

/// How deep contract owners may nest (a vault owned by a vault owned by ...).
pub const MAX_CONTRACT_SIGNATURE_DEPTH: usize = 4;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from vault management calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    #[error("unknown vault: {0}")]
    UnknownVault(Address),

    #[error("vault already exists: {0}")]
    VaultExists(Address),

    /// Owners may not be the zero or sentinel identity.
    #[error("invalid owner: {0}")]
    InvalidOwner(Address),

    #[error("duplicate owner: {0}")]
    DuplicateOwner(Address),

    /// Modules may not be the zero or sentinel identity.
    #[error("invalid module: {0}")]
    InvalidModule(Address),

    #[error("not an owner: {0}")]
    NotAnOwner(Address),

    #[error("invalid threshold {threshold} for {owners} owner(s)")]
    InvalidThreshold { threshold: usize, owners: usize },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct VaultAccount {
    owners: BTreeSet<Address>,
    threshold: usize,
    modules: HashSet<Address>,
    approved_hashes: HashSet<(Address, Hash)>,
}

/// All vaults on one chain.
#[derive(Debug)]
pub struct VaultRegistry {
    config: ModuleConfig,
    vaults: RwLock<HashMap<Address, VaultAccount>>,
}

impl VaultRegistry {
    pub fn new(config: ModuleConfig) -> Self {
        Self {
            config,
            vaults: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a vault with `owners` and a `threshold` of them.
    pub fn create_vault(
        &self,
        vault: Address,
        owners: &[Address],
        threshold: usize,
    ) -> Result<(), VaultError> {
        let mut set = BTreeSet::new();
        for owner in owners {
            if owner.is_reserved() || *owner == vault {
                return Err(VaultError::InvalidOwner(*owner));
            }
            if !set.insert(*owner) {
                return Err(VaultError::DuplicateOwner(*owner));
            }
        }
        check_threshold(threshold, set.len())?;

        let mut vaults = self.vaults.write();
        if vaults.contains_key(&vault) {
            return Err(VaultError::VaultExists(vault));
        }
        vaults.insert(
            vault,
            VaultAccount {
                owners: set,
                threshold,
                ..VaultAccount::default()
            },
        );
        debug!(%vault, owners = owners.len(), threshold, "vault created");
        Ok(())
    }

    /// Adds an owner and sets a new threshold in one step.
    pub fn add_owner_with_threshold(
        &self,
        vault: Address,
        owner: Address,
        threshold: usize,
    ) -> Result<(), VaultError> {
        self.with_account(vault, |account| {
            if owner.is_reserved() || owner == vault {
                return Err(VaultError::InvalidOwner(owner));
            }
            if account.owners.contains(&owner) {
                return Err(VaultError::DuplicateOwner(owner));
            }
            check_threshold(threshold, account.owners.len() + 1)?;
            account.owners.insert(owner);
            account.threshold = threshold;
            Ok(())
        })
    }

    /// Allows `module` to act for `vault`.
    pub fn enable_module(&self, vault: Address, module: Address) -> Result<(), VaultError> {
        self.with_account(vault, |account| {
            if module.is_reserved() {
                return Err(VaultError::InvalidModule(module));
            }
            account.modules.insert(module);
            Ok(())
        })
    }

    /// Revokes `module`. Its pending approvals become unredeemable.
    pub fn disable_module(&self, vault: Address, module: Address) -> Result<(), VaultError> {
        self.with_account(vault, |account| {
            account.modules.remove(&module);
            Ok(())
        })
    }

    /// Records that `owner` approves `hash`, standing in for a signature.
    pub fn approve_hash(&self, vault: Address, owner: Address, hash: Hash) -> Result<(), VaultError> {
        self.with_account(vault, |account| {
            if !account.owners.contains(&owner) {
                return Err(VaultError::NotAnOwner(owner));
            }
            account.approved_hashes.insert((owner, hash));
            Ok(())
        })
    }

    /// Current owners, in ascending address order.
    pub fn owners(&self, vault: &Address) -> Vec<Address> {
        self.vaults
            .read()
            .get(vault)
            .map(|account| account.owners.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Current threshold, or 0 for an unknown vault.
    pub fn threshold(&self, vault: &Address) -> usize {
        self.vaults
            .read()
            .get(vault)
            .map(|account| account.threshold)
            .unwrap_or(0)
    }

    /// The hash `vault` expects its own owners to sign when the vault acts as
    /// a contract owner elsewhere:
    /// `H(0x19 || 0x01 || domain(vault) || H(H("VaultMessage(bytes message)") || H(message)))`.
    pub fn message_hash(&self, vault: &Address, message: &[u8]) -> Hash {
        let typehash = blake3_hash(VAULT_MESSAGE_TYPE_SIGNATURE.as_bytes());
        let struct_hash = blake3_hash_multi(&[&typehash, &blake3_hash(message)]);
        let domain = domain_separator(self.config.chain_id, vault);
        blake3_hash_multi(&[&ENCODING_PREFIX, &domain, &struct_hash])
    }

    /// Contract-owner check: is `signature` a valid quorum signature of
    /// `vault` for `message`?
    pub fn is_valid_signature(
        &self,
        vault: &Address,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), VaultRejection> {
        self.validate_message(vault, message, signature, 0)
    }

    fn validate_message(
        &self,
        vault: &Address,
        message: &[u8],
        signature: &[u8],
        depth: usize,
    ) -> Result<(), VaultRejection> {
        let hash = self.message_hash(vault, message);
        self.verify_quorum(vault, &hash, message, signature, depth)
    }

    fn verify_quorum(
        &self,
        vault: &Address,
        digest: &Hash,
        encoded: &[u8],
        blob: &[u8],
        depth: usize,
    ) -> Result<(), VaultRejection> {
        // Snapshot so nested contract checks never run under our lock.
        let account = self.vaults.read().get(vault).cloned();
        let Some(account) = account else {
            return Err(VaultRejection::new("GS001", "threshold needs to be defined"));
        };
        if account.threshold == 0 {
            return Err(VaultRejection::new("GS001", "threshold needs to be defined"));
        }

        let entries = decode_signatures(blob)
            .map_err(|e| VaultRejection::new("GS020", format!("signatures data malformed: {e}")))?;
        if entries.len() < account.threshold {
            return Err(VaultRejection::new("GS020", "signatures data too short"));
        }

        let mut last_owner = Address::ZERO;
        for entry in entries.iter().take(account.threshold) {
            let owner = entry.owner();
            match entry {
                OwnerSignature::Direct {
                    public_key,
                    signature,
                    ..
                } => {
                    if Address::from_public_key(public_key) != owner {
                        return Err(invalid_owner());
                    }
                    let sig_bytes: [u8; 64] = signature
                        .as_bytes()
                        .try_into()
                        .map_err(|_| invalid_owner())?;
                    verify_raw(public_key.as_bytes(), digest, &sig_bytes)
                        .map_err(|_| invalid_owner())?;
                }
                OwnerSignature::ApprovedHash { .. } => {
                    if !account.approved_hashes.contains(&(owner, *digest)) {
                        return Err(VaultRejection::new("GS025", "hash has not been approved"));
                    }
                }
                OwnerSignature::Contract { inner, .. } => {
                    if depth >= MAX_CONTRACT_SIGNATURE_DEPTH {
                        return Err(invalid_contract_signature());
                    }
                    self.validate_message(&owner, encoded, inner, depth + 1)
                        .map_err(|nested| {
                            debug!(%owner, code = %nested.code, "nested contract signature rejected");
                            invalid_contract_signature()
                        })?;
                }
            }

            if owner <= last_owner || owner == Address::SENTINEL || !account.owners.contains(&owner)
            {
                return Err(invalid_owner());
            }
            last_owner = owner;
        }

        Ok(())
    }

    fn with_account<T>(
        &self,
        vault: Address,
        f: impl FnOnce(&mut VaultAccount) -> Result<T, VaultError>,
    ) -> Result<T, VaultError> {
        let mut vaults = self.vaults.write();
        let account = vaults
            .get_mut(&vault)
            .ok_or(VaultError::UnknownVault(vault))?;
        f(account)
    }
}

impl VaultCollaborator for VaultRegistry {
    fn is_owner(&self, vault: &Address, who: &Address) -> bool {
        self.vaults
            .read()
            .get(vault)
            .is_some_and(|account| account.owners.contains(who))
    }

    fn is_module_enabled(&self, vault: &Address, module: &Address) -> bool {
        self.vaults
            .read()
            .get(vault)
            .is_some_and(|account| account.modules.contains(module))
    }

    fn check_signatures(
        &self,
        vault: &Address,
        digest: &Hash,
        encoded: &[u8],
        signatures: &[u8],
    ) -> Result<(), VaultRejection> {
        self.verify_quorum(vault, digest, encoded, signatures, 0)
    }
}

fn check_threshold(threshold: usize, owners: usize) -> Result<(), VaultError> {
    if threshold == 0 || threshold > owners {
        return Err(VaultError::InvalidThreshold { threshold, owners });
    }
    Ok(())
}

fn invalid_owner() -> VaultRejection {
    VaultRejection::new("GS026", "invalid owner provided")
}

fn invalid_contract_signature() -> VaultRejection {
    VaultRejection::new("GS024", "invalid contract signature provided")
}
