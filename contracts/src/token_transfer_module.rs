//! # Token Transfer Module
//!
//! Lets a quorum of vault owners pre-approve a single transfer of one
//! designated token out of the vault with off-line signatures. Anyone holding
//! a valid quorum signature may then redeem it; the owners never have to
//! co-sign a vault transaction.
//!
//! ## Lifecycle
//!
//! ```text
//!   Uninitialized ──setup(asset), called by the vault──► Active { vault, asset }
//!                                                         │
//!                                              transfer_token (nonce += 1)
//! ```
//!
//! `setup` runs once. The caller at that moment *is* the vault: setup is meant
//! to be executed through the vault's own multi-signature path, so whoever
//! calls it is trusted to be the legitimate vault.
//!
//! ## Guard chain
//!
//! Applied in this order before every digest read and every redemption:
//!
//! 1. module initialized                 → `ModuleNotInitialized`
//! 2. module enabled by its vault        → `ModuleDisabled`
//! 3. caller is a vault owner (reads)    → `OnlyOwner`
//! 4. recipient is not zero or sentinel  → `InvalidAddress`
//! 5. vault balance covers the amount    → `InsufficientBalance` (reads)
//!
//! Redemption skips step 3: the signatures carry the owners' authority, not
//! the submitter. It also skips step 5 and leaves the balance to the ledger.
//! A vault drained after its owners signed fails the redemption with
//! `TokenTransferFailed`, and the nonce is left where it was.
//!
//! ## Replay protection
//!
//! Every approval embeds the module's current nonce, and only a successful
//! redemption advances it. Once a signature has been redeemed the digest it
//! signs can never be rebuilt again.
//!
//! ## Checks, effects, interactions
//!
//! The nonce is bumped *before* the ledger is called. If the ledger reports
//! or raises a failure the bump is rolled back and the whole call fails, so
//! a redemption is all-or-nothing. All mutating entry points take
//! `&mut self`, which rules out reentrant calls into the same instance while
//! the ledger call is in flight.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use warden_protocol::config::{MODULE_NAME, MODULE_VERSION};
use warden_protocol::crypto::blake3_hash;
use warden_protocol::{Address, Hash, ModuleConfig};

use crate::approval::TransferApproval;
use crate::collaborators::{LedgerCollaborator, VaultCollaborator, VaultRejection};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a module call is rejected. None of them leave any state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    /// `to` or `asset` is the zero or sentinel identity.
    #[error("invalid address")]
    InvalidAddress,

    #[error("module already initialized")]
    ModuleAlreadyInitialized,

    #[error("module not initialized")]
    ModuleNotInitialized,

    /// The vault has not enabled this module (or disabled it since).
    #[error("module disabled by its vault")]
    ModuleDisabled,

    /// Approval hashes are only handed out to current vault owners.
    #[error("caller is not an owner of the vault")]
    OnlyOwner,

    /// The vault holds less of the asset than requested.
    #[error("insufficient balance: vault holds {balance}")]
    InsufficientBalance {
        /// The vault's current balance.
        balance: u64,
    },

    /// The ledger reported or raised a failure during the transfer.
    #[error("token transfer failed")]
    TokenTransferFailed,

    /// The nonce cannot advance any further. The module is exhausted.
    #[error("nonce overflow: no further approvals can be redeemed")]
    NonceOverflow,

    /// The vault refused the signatures. Forwarded unchanged.
    #[error(transparent)]
    Vault(#[from] VaultRejection),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Initialization state of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleState {
    /// Freshly deployed; `setup` has not run.
    Uninitialized,
    /// Bound to a vault and an asset for the rest of the module's life.
    Active {
        /// The vault that called `setup`.
        vault: Address,
        /// The token this module may move.
        asset: Address,
    },
}

/// The module's persisted layout: `{asset, vault, initialized, nonce}`.
///
/// Uninitialized modules store zero identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub asset: Address,
    pub vault: Address,
    pub initialized: bool,
    pub nonce: u64,
}

/// Observable side effects of a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ModuleEvent {
    /// Emitted exactly once per successful redemption.
    ApprovedTransferRedeemed { to: Address, amount: u64 },
}

/// Which guards a call runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    /// Digest and encoding reads: caller must be an owner and the vault must
    /// hold the amount.
    OwnerRead,
    /// Redemption: open to anyone holding signatures. Balance is the
    /// ledger's call.
    Redeem,
}

/// A guarded request, ready to be hashed or redeemed.
struct Checked {
    approval: TransferApproval,
    asset: Address,
}

/// One deployed token transfer module.
///
/// `V` answers quorum questions about the vault, `L` moves the asset. Both
/// are injected so the module can be driven by the in-memory collaborators
/// in [`crate::vault`] and [`crate::ledger`], or by test fakes.
#[derive(Debug)]
pub struct TokenTransferModule<V, L> {
    /// This module's own identity. Part of every approval it builds.
    address: Address,
    config: ModuleConfig,
    state: ModuleState,
    nonce: u64,
    vaults: V,
    ledger: L,
    events: Vec<ModuleEvent>,
}

impl<V, L> TokenTransferModule<V, L>
where
    V: VaultCollaborator,
    L: LedgerCollaborator,
{
    /// Module name, as reported on-chain.
    pub const NAME: &'static str = MODULE_NAME;
    /// Module version, as reported on-chain.
    pub const VERSION: &'static str = MODULE_VERSION;

    /// Deploys an uninitialized module at `address`.
    pub fn new(address: Address, config: ModuleConfig, vaults: V, ledger: L) -> Self {
        Self {
            address,
            config,
            state: ModuleState::Uninitialized,
            nonce: 0,
            vaults,
            ledger,
            events: Vec::new(),
        }
    }

    /// Reloads a module from its persisted record.
    ///
    /// # Errors
    ///
    /// [`ModuleError::InvalidAddress`] if an initialized record names a
    /// reserved asset or vault, or if an uninitialized record carries
    /// anything but zero identities and a zero nonce.
    pub fn from_record(
        address: Address,
        config: ModuleConfig,
        record: ModuleRecord,
        vaults: V,
        ledger: L,
    ) -> Result<Self, ModuleError> {
        let state = if record.initialized {
            if record.asset.is_reserved() || record.vault.is_reserved() {
                return Err(ModuleError::InvalidAddress);
            }
            ModuleState::Active {
                vault: record.vault,
                asset: record.asset,
            }
        } else {
            let blank = record.asset == Address::ZERO
                && record.vault == Address::ZERO
                && record.nonce == 0;
            if !blank {
                return Err(ModuleError::InvalidAddress);
            }
            ModuleState::Uninitialized
        };

        Ok(Self {
            address,
            config,
            state,
            nonce: record.nonce,
            vaults,
            ledger,
            events: Vec::new(),
        })
    }

    /// Binds the module to `asset` and to the calling vault. Runs once.
    ///
    /// # Errors
    ///
    /// - [`ModuleError::ModuleAlreadyInitialized`] on a second call.
    /// - [`ModuleError::InvalidAddress`] if `asset` is zero or the sentinel.
    pub fn setup(&mut self, caller: Address, asset: Address) -> Result<(), ModuleError> {
        if let ModuleState::Active { .. } = self.state {
            debug!(module = %self.address, %caller, "setup rejected: already initialized");
            return Err(ModuleError::ModuleAlreadyInitialized);
        }
        if asset.is_reserved() {
            debug!(module = %self.address, %asset, "setup rejected: reserved asset address");
            return Err(ModuleError::InvalidAddress);
        }

        self.state = ModuleState::Active {
            vault: caller,
            asset,
        };

        info!(module = %self.address, vault = %caller, %asset, "module initialized");
        Ok(())
    }

    /// Digest owners sign to approve sending `amount` to `to` at the current
    /// nonce. Owner-only, read-only.
    pub fn get_transfer_approval_digest(
        &self,
        caller: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<Hash, ModuleError> {
        let checked = self.run_guards(Access::OwnerRead, caller, to, amount)?;
        Ok(checked.approval.digest(self.config.chain_id))
    }

    /// The pre-hash encoding behind [`get_transfer_approval_digest`].
    /// Delegated signers hash it with their own scheme before signing.
    ///
    /// [`get_transfer_approval_digest`]: Self::get_transfer_approval_digest
    pub fn encode_transfer_approval(
        &self,
        caller: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<Vec<u8>, ModuleError> {
        let checked = self.run_guards(Access::OwnerRead, caller, to, amount)?;
        Ok(checked.approval.encode(self.config.chain_id))
    }

    /// Redeems a quorum signature over the current approval for
    /// `(to, amount)` and moves the funds out of the vault.
    ///
    /// Any caller may submit. On success the nonce advances by exactly one and
    /// [`ModuleEvent::ApprovedTransferRedeemed`] is recorded. On any failure
    /// nothing changes.
    ///
    /// # Errors
    ///
    /// Guard failures (see module docs), [`ModuleError::Vault`] when the vault
    /// rejects the signatures, [`ModuleError::NonceOverflow`], and
    /// [`ModuleError::TokenTransferFailed`] when the ledger refuses or faults,
    /// including when the vault no longer holds `amount`.
    pub fn transfer_token(
        &mut self,
        caller: &Address,
        to: &Address,
        amount: u64,
        signatures: &[u8],
    ) -> Result<(), ModuleError> {
        let Checked { approval, asset } = self.run_guards(Access::Redeem, caller, to, amount)?;

        let encoded = approval.encode(self.config.chain_id);
        let digest = blake3_hash(&encoded);

        if let Err(rejection) =
            self.vaults
                .check_signatures(&approval.vault, &digest, &encoded, signatures)
        {
            debug!(
                module = %self.address,
                nonce = approval.nonce,
                code = %rejection.code,
                "vault rejected signatures"
            );
            return Err(rejection.into());
        }

        // Effects before interactions.
        let committed_nonce = self.nonce;
        self.nonce = committed_nonce
            .checked_add(1)
            .ok_or(ModuleError::NonceOverflow)?;

        let transferred = match self.ledger.transfer(&asset, &approval.vault, to, amount) {
            Ok(success) => success,
            Err(fault) => {
                warn!(module = %self.address, %asset, error = %fault, "ledger raised a fault");
                false
            }
        };

        if !transferred {
            self.nonce = committed_nonce;
            warn!(
                module = %self.address,
                %to,
                amount,
                nonce = committed_nonce,
                "token transfer failed, redemption reverted"
            );
            return Err(ModuleError::TokenTransferFailed);
        }

        self.events.push(ModuleEvent::ApprovedTransferRedeemed { to: *to, amount });

        info!(
            module = %self.address,
            vault = %approval.vault,
            submitter = %caller,
            %to,
            amount,
            nonce = self.nonce,
            "approved transfer redeemed"
        );
        Ok(())
    }

    fn run_guards(
        &self,
        access: Access,
        caller: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<Checked, ModuleError> {
        self.check(access, caller, to, amount).map_err(|e| {
            debug!(module = %self.address, ?access, %caller, error = %e, "guard rejected call");
            e
        })
    }

    fn check(
        &self,
        access: Access,
        caller: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<Checked, ModuleError> {
        let (vault, asset) = match self.state {
            ModuleState::Uninitialized => return Err(ModuleError::ModuleNotInitialized),
            ModuleState::Active { vault, asset } => (vault, asset),
        };

        if !self.vaults.is_module_enabled(&vault, &self.address) {
            return Err(ModuleError::ModuleDisabled);
        }

        if access == Access::OwnerRead && !self.vaults.is_owner(&vault, caller) {
            return Err(ModuleError::OnlyOwner);
        }

        if to.is_reserved() {
            return Err(ModuleError::InvalidAddress);
        }

        if access == Access::OwnerRead {
            let balance = self.ledger.balance_of(&asset, &vault);
            if balance < amount {
                return Err(ModuleError::InsufficientBalance { balance });
            }
        }

        Ok(Checked {
            approval: TransferApproval {
                module: self.address,
                vault,
                to: *to,
                amount,
                nonce: self.nonce,
            },
            asset,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// This module's identity.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, ModuleState::Active { .. })
    }

    /// The token this module moves, once initialized.
    pub fn asset(&self) -> Option<Address> {
        match self.state {
            ModuleState::Active { asset, .. } => Some(asset),
            ModuleState::Uninitialized => None,
        }
    }

    /// The vault this module serves, once initialized.
    pub fn vault(&self) -> Option<Address> {
        match self.state {
            ModuleState::Active { vault, .. } => Some(vault),
            ModuleState::Uninitialized => None,
        }
    }

    /// Nonce the next approval must be signed for.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Events recorded so far, oldest first.
    pub fn events(&self) -> &[ModuleEvent] {
        &self.events
    }

    /// Takes the recorded events, leaving the log empty.
    pub fn drain_events(&mut self) -> Vec<ModuleEvent> {
        std::mem::take(&mut self.events)
    }

    /// Snapshot of the persisted layout.
    pub fn record(&self) -> ModuleRecord {
        let (asset, vault, initialized) = match self.state {
            ModuleState::Active { vault, asset } => (asset, vault, true),
            ModuleState::Uninitialized => (Address::ZERO, Address::ZERO, false),
        };
        ModuleRecord {
            asset,
            vault,
            initialized,
            nonce: self.nonce,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::LedgerFault;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};

    /// Accepts exactly one digest, set by the test.
    #[derive(Default)]
    struct FakeVault {
        owners: HashSet<Address>,
        enabled: HashSet<Address>,
        accepted_digest: Mutex<Option<Hash>>,
    }

    impl VaultCollaborator for FakeVault {
        fn is_owner(&self, _vault: &Address, who: &Address) -> bool {
            self.owners.contains(who)
        }

        fn is_module_enabled(&self, _vault: &Address, module: &Address) -> bool {
            self.enabled.contains(module)
        }

        fn check_signatures(
            &self,
            _vault: &Address,
            digest: &Hash,
            _encoded: &[u8],
            _signatures: &[u8],
        ) -> Result<(), VaultRejection> {
            match *self.accepted_digest.lock() {
                Some(accepted) if accepted == *digest => Ok(()),
                _ => Err(VaultRejection::new("GS026", "invalid owner provided")),
            }
        }
    }

    enum TransferOutcome {
        Succeed,
        ReportFailure,
        Fault,
    }

    struct FakeLedger {
        balances: Mutex<HashMap<Address, u64>>,
        outcome: Mutex<TransferOutcome>,
    }

    impl FakeLedger {
        fn with_balance(holder: Address, amount: u64) -> Self {
            let mut balances = HashMap::new();
            balances.insert(holder, amount);
            Self {
                balances: Mutex::new(balances),
                outcome: Mutex::new(TransferOutcome::Succeed),
            }
        }
    }

    impl LedgerCollaborator for FakeLedger {
        fn balance_of(&self, _asset: &Address, holder: &Address) -> u64 {
            self.balances.lock().get(holder).copied().unwrap_or(0)
        }

        fn transfer(
            &self,
            _asset: &Address,
            from: &Address,
            to: &Address,
            amount: u64,
        ) -> Result<bool, LedgerFault> {
            match *self.outcome.lock() {
                TransferOutcome::ReportFailure => return Ok(false),
                TransferOutcome::Fault => return Err(LedgerFault("boom".into())),
                TransferOutcome::Succeed => {}
            }
            let mut balances = self.balances.lock();
            let from_balance = balances.get(from).copied().unwrap_or(0);
            if from_balance < amount {
                return Ok(false);
            }
            balances.insert(*from, from_balance - amount);
            *balances.entry(*to).or_insert(0) += amount;
            Ok(true)
        }
    }

    struct Fixture {
        module: TokenTransferModule<FakeVault, FakeLedger>,
        vault: Address,
        owner: Address,
        receiver: Address,
    }

    fn fixture() -> Fixture {
        let module_addr = Address::derive("module");
        let vault = Address::derive("vault");
        let owner = Address::derive("owner");
        let mut vaults = FakeVault::default();
        vaults.owners.insert(owner);
        vaults.enabled.insert(module_addr);
        let ledger = FakeLedger::with_balance(vault, 10);

        let mut module =
            TokenTransferModule::new(module_addr, ModuleConfig::default(), vaults, ledger);
        module.setup(vault, Address::derive("token")).unwrap();

        Fixture {
            module,
            vault,
            owner,
            receiver: Address::derive("receiver"),
        }
    }

    /// Makes the fake vault accept the current approval for `(to, amount)`.
    fn approve(f: &Fixture, to: &Address, amount: u64) {
        let digest = f
            .module
            .get_transfer_approval_digest(&f.owner, to, amount)
            .unwrap();
        *f.module.vaults.accepted_digest.lock() = Some(digest);
    }

    #[test]
    fn name_and_version() {
        assert_eq!(
            TokenTransferModule::<FakeVault, FakeLedger>::NAME,
            "TokenTransferModule"
        );
        assert_eq!(TokenTransferModule::<FakeVault, FakeLedger>::VERSION, "1.0.0");
    }

    #[test]
    fn setup_records_caller_as_vault() {
        let f = fixture();
        assert!(f.module.is_initialized());
        assert_eq!(f.module.vault(), Some(f.vault));
        assert_eq!(f.module.asset(), Some(Address::derive("token")));
        assert_eq!(f.module.nonce(), 0);
    }

    #[test]
    fn setup_rejects_reserved_assets() {
        for asset in [Address::ZERO, Address::SENTINEL] {
            let mut module = TokenTransferModule::new(
                Address::derive("m"),
                ModuleConfig::default(),
                FakeVault::default(),
                FakeLedger::with_balance(Address::ZERO, 0),
            );
            assert_eq!(
                module.setup(Address::derive("v"), asset),
                Err(ModuleError::InvalidAddress)
            );
            assert!(!module.is_initialized());
        }
    }

    #[test]
    fn setup_runs_once() {
        let mut f = fixture();
        let result = f.module.setup(Address::derive("other"), Address::derive("t2"));
        assert_eq!(result, Err(ModuleError::ModuleAlreadyInitialized));
        assert_eq!(f.module.vault(), Some(f.vault));
    }

    #[test]
    fn redemption_moves_funds_bumps_nonce_and_emits() {
        let mut f = fixture();
        let receiver = f.receiver;
        approve(&f, &receiver, 10);

        f.module
            .transfer_token(&Address::derive("executor"), &receiver, 10, b"sig")
            .unwrap();

        assert_eq!(f.module.nonce(), 1);
        assert_eq!(f.module.ledger.balance_of(&Address::ZERO, &f.vault), 0);
        assert_eq!(f.module.ledger.balance_of(&Address::ZERO, &receiver), 10);
        assert_eq!(
            f.module.events(),
            &[ModuleEvent::ApprovedTransferRedeemed {
                to: receiver,
                amount: 10
            }]
        );
    }

    #[test]
    fn replay_fails_after_redemption() {
        let mut f = fixture();
        let receiver = f.receiver;
        approve(&f, &receiver, 1);

        f.module.transfer_token(&receiver, &receiver, 1, b"sig").unwrap();
        let replay = f.module.transfer_token(&receiver, &receiver, 1, b"sig");

        assert!(matches!(replay, Err(ModuleError::Vault(_))));
        assert_eq!(f.module.nonce(), 1);
        assert_eq!(f.module.events().len(), 1);
    }

    #[test]
    fn reported_failure_reverts_nonce() {
        let mut f = fixture();
        let receiver = f.receiver;
        approve(&f, &receiver, 1);
        *f.module.ledger.outcome.lock() = TransferOutcome::ReportFailure;

        let result = f.module.transfer_token(&receiver, &receiver, 1, b"sig");
        assert_eq!(result, Err(ModuleError::TokenTransferFailed));
        assert_eq!(f.module.nonce(), 0);
        assert!(f.module.events().is_empty());
    }

    #[test]
    fn raised_fault_is_transfer_failure() {
        let mut f = fixture();
        let receiver = f.receiver;
        approve(&f, &receiver, 1);
        *f.module.ledger.outcome.lock() = TransferOutcome::Fault;

        let result = f.module.transfer_token(&receiver, &receiver, 1, b"sig");
        assert_eq!(result, Err(ModuleError::TokenTransferFailed));
        assert_eq!(f.module.nonce(), 0);
    }

    #[test]
    fn uninitialized_precedes_every_other_guard() {
        let module = TokenTransferModule::new(
            Address::derive("m"),
            ModuleConfig::default(),
            FakeVault::default(),
            FakeLedger::with_balance(Address::ZERO, 0),
        );
        // Not an owner, reserved recipient, no balance: still reports init.
        let result = module.get_transfer_approval_digest(&Address::ZERO, &Address::ZERO, 100);
        assert_eq!(result, Err(ModuleError::ModuleNotInitialized));
    }

    #[test]
    fn disabled_precedes_owner_and_balance() {
        let mut f = fixture();
        f.module.vaults.enabled.clear();
        let stranger = Address::derive("stranger");
        let receiver = f.receiver;

        assert_eq!(
            f.module.get_transfer_approval_digest(&stranger, &Address::ZERO, 1_000),
            Err(ModuleError::ModuleDisabled)
        );
        assert_eq!(
            f.module.transfer_token(&stranger, &receiver, 1_000, b""),
            Err(ModuleError::ModuleDisabled)
        );
    }

    #[test]
    fn owner_check_precedes_address_and_balance() {
        let f = fixture();
        let stranger = Address::derive("stranger");
        assert_eq!(
            f.module.encode_transfer_approval(&stranger, &Address::SENTINEL, 1_000),
            Err(ModuleError::OnlyOwner)
        );
    }

    #[test]
    fn address_check_precedes_balance() {
        let f = fixture();
        assert_eq!(
            f.module.get_transfer_approval_digest(&f.owner, &Address::ZERO, 1_000),
            Err(ModuleError::InvalidAddress)
        );
    }

    #[test]
    fn insufficient_balance_reports_current_balance() {
        let f = fixture();
        assert_eq!(
            f.module.get_transfer_approval_digest(&f.owner, &f.vault, 11),
            Err(ModuleError::InsufficientBalance { balance: 10 })
        );
    }

    #[test]
    fn redemption_leaves_balance_to_ledger() {
        let mut f = fixture();
        let receiver = f.receiver;
        approve(&f, &receiver, 10);
        f.module.ledger.balances.lock().insert(f.vault, 0);

        assert_eq!(
            f.module.transfer_token(&receiver, &receiver, 10, b"sig"),
            Err(ModuleError::TokenTransferFailed)
        );
        assert_eq!(f.module.nonce(), 0);
        assert!(f.module.events().is_empty());
        assert_eq!(f.module.ledger.balance_of(&Address::ZERO, &receiver), 0);
    }

    #[test]
    fn redemption_does_not_require_owner_caller() {
        let mut f = fixture();
        let receiver = f.receiver;
        approve(&f, &receiver, 5);
        let outsider = Address::derive("outsider");
        assert!(f.module.transfer_token(&outsider, &receiver, 5, b"sig").is_ok());
    }

    #[test]
    fn encoding_hashes_to_digest() {
        let f = fixture();
        let encoded = f
            .module
            .encode_transfer_approval(&f.owner, &f.receiver, 3)
            .unwrap();
        let digest = f
            .module
            .get_transfer_approval_digest(&f.owner, &f.receiver, 3)
            .unwrap();
        assert_eq!(blake3_hash(&encoded), digest);
    }

    #[test]
    fn nonce_overflow_is_fatal_not_wrapping() {
        let module_addr = Address::derive("module");
        let vault = Address::derive("vault");
        let mut vaults = FakeVault::default();
        vaults.enabled.insert(module_addr);
        let record = ModuleRecord {
            asset: Address::derive("token"),
            vault,
            initialized: true,
            nonce: u64::MAX,
        };
        let mut module = TokenTransferModule::from_record(
            module_addr,
            ModuleConfig::default(),
            record,
            vaults,
            FakeLedger::with_balance(vault, 10),
        )
        .unwrap();

        let to = Address::derive("receiver");
        let approval = TransferApproval {
            module: module_addr,
            vault,
            to,
            amount: 1,
            nonce: u64::MAX,
        };
        *module.vaults.accepted_digest.lock() = Some(approval.digest(module.config().chain_id));

        assert_eq!(
            module.transfer_token(&to, &to, 1, b"sig"),
            Err(ModuleError::NonceOverflow)
        );
        assert_eq!(module.nonce(), u64::MAX);
        assert_eq!(module.ledger.balance_of(&Address::ZERO, &vault), 10);
    }

    #[test]
    fn record_roundtrip() {
        let f = fixture();
        let record = f.module.record();
        assert_eq!(
            record,
            ModuleRecord {
                asset: Address::derive("token"),
                vault: f.vault,
                initialized: true,
                nonce: 0,
            }
        );

        let json = serde_json::to_string(&record).unwrap();
        let parsed: ModuleRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn record_with_reserved_asset_rejected() {
        let record = ModuleRecord {
            asset: Address::SENTINEL,
            vault: Address::derive("vault"),
            initialized: true,
            nonce: 0,
        };
        let result = TokenTransferModule::from_record(
            Address::derive("m"),
            ModuleConfig::default(),
            record,
            FakeVault::default(),
            FakeLedger::with_balance(Address::ZERO, 0),
        );
        assert_eq!(result.err(), Some(ModuleError::InvalidAddress));
    }

    #[test]
    fn uninitialized_record_with_leftover_state_rejected() {
        let dirty = [
            ModuleRecord {
                asset: Address::derive("token"),
                vault: Address::ZERO,
                initialized: false,
                nonce: 0,
            },
            ModuleRecord {
                asset: Address::ZERO,
                vault: Address::derive("vault"),
                initialized: false,
                nonce: 0,
            },
            ModuleRecord {
                asset: Address::ZERO,
                vault: Address::ZERO,
                initialized: false,
                nonce: 3,
            },
        ];
        for record in dirty {
            let result = TokenTransferModule::from_record(
                Address::derive("m"),
                ModuleConfig::default(),
                record,
                FakeVault::default(),
                FakeLedger::with_balance(Address::ZERO, 0),
            );
            assert_eq!(result.err(), Some(ModuleError::InvalidAddress), "{record:?}");
        }
    }

    #[test]
    fn fresh_record_reloads_uninitialized() {
        let module = TokenTransferModule::new(
            Address::derive("m"),
            ModuleConfig::default(),
            FakeVault::default(),
            FakeLedger::with_balance(Address::ZERO, 0),
        );
        let reloaded = TokenTransferModule::from_record(
            Address::derive("m"),
            ModuleConfig::default(),
            module.record(),
            FakeVault::default(),
            FakeLedger::with_balance(Address::ZERO, 0),
        )
        .unwrap();
        assert_eq!(reloaded.state(), ModuleState::Uninitialized);
        assert_eq!(reloaded.nonce(), 0);
    }

    #[test]
    fn drain_events_empties_log() {
        let mut f = fixture();
        let receiver = f.receiver;
        approve(&f, &receiver, 2);
        f.module.transfer_token(&receiver, &receiver, 2, b"sig").unwrap();
        assert_eq!(f.module.drain_events().len(), 1);
        assert!(f.module.events().is_empty());
    }
}
