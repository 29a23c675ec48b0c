//! # Warden Contracts
//!
//! The token transfer module of a multi-signature custody vault, and the
//! in-memory collaborators it runs against:
//!
//! - **Token Transfer Module**: vault owners sign a transfer off-line; anyone
//!   holding a quorum of those signatures can redeem it exactly once.
//! - **Approval**: the domain-separated message the owners sign.
//! - **Owner Signatures**: the signature blob format the vault accepts.
//! - **Vault / Ledger**: in-memory stand-ins for the vault contract and the
//!   token contracts, behind the collaborator traits.
//!
//! ## Design Principles
//!
//! 1. Nonce and balance arithmetic is checked. An overflow is an error, never
//!    a wrap.
//! 2. State transitions are explicit: enum variants, not boolean flags.
//! 3. A quorum signature gates every movement of funds.
//! 4. A failed call leaves no trace: no nonce bump, no event, no transfer.

pub mod approval;
pub mod collaborators;
pub mod ledger;
pub mod owner_signatures;
pub mod token_transfer_module;
pub mod vault;

pub use approval::TransferApproval;
pub use collaborators::{LedgerCollaborator, LedgerFault, VaultCollaborator, VaultRejection};
pub use ledger::{LedgerError, TokenLedger};
pub use owner_signatures::{decode_signatures, encode_signatures, OwnerSignature};
pub use token_transfer_module::{
    ModuleError, ModuleEvent, ModuleRecord, ModuleState, TokenTransferModule,
};
pub use vault::{VaultError, VaultRegistry};
