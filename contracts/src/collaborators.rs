//! # Collaborator Interfaces
//!
//! The transfer module owns almost nothing. Quorum membership, module
//! enablement and signature checking belong to the vault; balances and the
//! transfer primitive belong to the ledger. The module reaches both through
//! the two traits below, injected at construction.
//!
//! Both traits are identity-addressed: every call names the vault (or the
//! token) it is about, the same way a call names the contract it targets.
//! A single registry can therefore serve any number of vaults or tokens,
//! and tests can swap in fakes without a real vault behind them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use warden_protocol::{Address, Hash};

/// A vault refused a signature blob.
///
/// Carries the vault's own error code and message. The module forwards it
/// verbatim and never inspects it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {reason}")]
pub struct VaultRejection {
    /// Short machine-readable code chosen by the vault, e.g. `GS026`.
    pub code: String,
    /// Human-readable explanation.
    pub reason: String,
}

impl VaultRejection {
    pub fn new(code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            reason: reason.into(),
        }
    }
}

/// The ledger raised a fault instead of returning a success flag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ledger fault: {0}")]
pub struct LedgerFault(pub String);

/// Quorum membership and signature verification of custody vaults.
pub trait VaultCollaborator {
    /// Is `who` currently an owner of `vault`?
    fn is_owner(&self, vault: &Address, who: &Address) -> bool;

    /// Has `vault` enabled `module`?
    fn is_module_enabled(&self, vault: &Address, module: &Address) -> bool;

    /// Accepts `signatures` if they satisfy `vault`'s owner threshold for
    /// `digest`. `encoded` is the pre-hash message, needed by owners that are
    /// themselves contracts and hash the message their own way.
    fn check_signatures(
        &self,
        vault: &Address,
        digest: &Hash,
        encoded: &[u8],
        signatures: &[u8],
    ) -> Result<(), VaultRejection>;
}

/// Balances and transfers of fungible tokens.
pub trait LedgerCollaborator {
    /// Balance of `holder` in `asset`.
    fn balance_of(&self, asset: &Address, holder: &Address) -> u64;

    /// Moves `amount` of `asset` from `from` to `to`.
    ///
    /// `Ok(false)` is a reported failure; `Err` is a raised fault. The module
    /// treats both the same.
    fn transfer(
        &self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<bool, LedgerFault>;
}

impl<T: VaultCollaborator + ?Sized> VaultCollaborator for Arc<T> {
    fn is_owner(&self, vault: &Address, who: &Address) -> bool {
        (**self).is_owner(vault, who)
    }

    fn is_module_enabled(&self, vault: &Address, module: &Address) -> bool {
        (**self).is_module_enabled(vault, module)
    }

    fn check_signatures(
        &self,
        vault: &Address,
        digest: &Hash,
        encoded: &[u8],
        signatures: &[u8],
    ) -> Result<(), VaultRejection> {
        (**self).check_signatures(vault, digest, encoded, signatures)
    }
}

impl<T: LedgerCollaborator + ?Sized> LedgerCollaborator for Arc<T> {
    fn balance_of(&self, asset: &Address, holder: &Address) -> u64 {
        (**self).balance_of(asset, holder)
    }

    fn transfer(
        &self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<bool, LedgerFault> {
        (**self).transfer(asset, from, to, amount)
    }
}

impl<T: VaultCollaborator + ?Sized> VaultCollaborator for &T {
    fn is_owner(&self, vault: &Address, who: &Address) -> bool {
        (**self).is_owner(vault, who)
    }

    fn is_module_enabled(&self, vault: &Address, module: &Address) -> bool {
        (**self).is_module_enabled(vault, module)
    }

    fn check_signatures(
        &self,
        vault: &Address,
        digest: &Hash,
        encoded: &[u8],
        signatures: &[u8],
    ) -> Result<(), VaultRejection> {
        (**self).check_signatures(vault, digest, encoded, signatures)
    }
}

impl<T: LedgerCollaborator + ?Sized> LedgerCollaborator for &T {
    fn balance_of(&self, asset: &Address, holder: &Address) -> u64 {
        (**self).balance_of(asset, holder)
    }

    fn transfer(
        &self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<bool, LedgerFault> {
        (**self).transfer(asset, from, to, amount)
    }
}
