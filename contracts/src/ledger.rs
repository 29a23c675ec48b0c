//! # In-Memory Token Ledger
//!
//! Fungible token balances keyed by token address. Stands in for the token
//! contracts a vault holds, so tests and tools can watch funds move.
//!
//! A transfer that the holder cannot cover returns `Ok(false)` rather than an
//! error, like a token that reports failure through its return value.
//! [`TokenLedger::refuse_next_transfer`] and [`TokenLedger::fail_next_transfer`]
//! arm one-shot failures of either shape regardless of balance.

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use warden_protocol::Address;

use crate::collaborators::{LedgerCollaborator, LedgerFault};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from ledger administration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("token not found: {0}")]
    TokenNotFound(Address),

    #[error("token already exists: {0}")]
    DuplicateToken(Address),

    /// Tokens may not live at the zero or sentinel address.
    #[error("invalid token address: {0}")]
    InvalidAddress(Address),

    /// The mint would push supply (or a balance) past `u64::MAX`.
    #[error("supply overflow: minting {amount} would exceed u64::MAX")]
    SupplyOverflow { amount: u64 },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Metadata and supply of a registered token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Sum of all balances, in the smallest denomination.
    pub total_supply: u64,
}

#[derive(Debug)]
enum ArmedFailure {
    Refuse,
    Fault(String),
}

#[derive(Debug, Default)]
struct LedgerState {
    tokens: HashMap<Address, TokenInfo>,
    balances: HashMap<Address, HashMap<Address, u64>>,
}

/// Balances of every token on one chain.
#[derive(Debug, Default)]
pub struct TokenLedger {
    state: RwLock<LedgerState>,
    armed: Mutex<Option<ArmedFailure>>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token with zero supply.
    pub fn create_token(
        &self,
        address: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
    ) -> Result<(), LedgerError> {
        if address.is_reserved() {
            return Err(LedgerError::InvalidAddress(address));
        }
        let mut state = self.state.write();
        if state.tokens.contains_key(&address) {
            return Err(LedgerError::DuplicateToken(address));
        }
        state.tokens.insert(
            address,
            TokenInfo {
                address,
                name: name.into(),
                symbol: symbol.into().to_uppercase(),
                decimals,
                total_supply: 0,
            },
        );
        state.balances.insert(address, HashMap::new());
        Ok(())
    }

    /// Creates `amount` new units of `token` held by `to`.
    pub fn mint(&self, token: &Address, to: &Address, amount: u64) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        let LedgerState { tokens, balances } = &mut *state;

        let info = tokens
            .get_mut(token)
            .ok_or(LedgerError::TokenNotFound(*token))?;
        let new_supply = info
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::SupplyOverflow { amount })?;

        // Supply bounds every balance, so this cannot overflow once supply didn't.
        let balance = balances.entry(*token).or_default().entry(*to).or_insert(0);
        *balance += amount;
        info.total_supply = new_supply;

        debug!(%token, %to, amount, "minted");
        Ok(())
    }

    /// Metadata for `token`.
    pub fn token_info(&self, token: &Address) -> Option<TokenInfo> {
        self.state.read().tokens.get(token).cloned()
    }

    /// Total supply of `token`, or 0 if it does not exist.
    pub fn total_supply(&self, token: &Address) -> u64 {
        self.state
            .read()
            .tokens
            .get(token)
            .map(|t| t.total_supply)
            .unwrap_or(0)
    }

    /// Makes the next [`transfer`](LedgerCollaborator::transfer) return
    /// `Ok(false)` without moving funds.
    pub fn refuse_next_transfer(&self) {
        *self.armed.lock() = Some(ArmedFailure::Refuse);
    }

    /// Makes the next [`transfer`](LedgerCollaborator::transfer) raise
    /// `reason` instead of moving funds.
    pub fn fail_next_transfer(&self, reason: impl Into<String>) {
        *self.armed.lock() = Some(ArmedFailure::Fault(reason.into()));
    }
}

impl LedgerCollaborator for TokenLedger {
    fn balance_of(&self, asset: &Address, holder: &Address) -> u64 {
        self.state
            .read()
            .balances
            .get(asset)
            .and_then(|b| b.get(holder))
            .copied()
            .unwrap_or(0)
    }

    fn transfer(
        &self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<bool, LedgerFault> {
        match self.armed.lock().take() {
            Some(ArmedFailure::Refuse) => return Ok(false),
            Some(ArmedFailure::Fault(reason)) => return Err(LedgerFault(reason)),
            None => {}
        }

        let mut state = self.state.write();
        let balances = state
            .balances
            .get_mut(asset)
            .ok_or_else(|| LedgerFault(format!("token not found: {asset}")))?;

        let available = balances.get(from).copied().unwrap_or(0);
        if available < amount {
            debug!(%asset, %from, available, amount, "transfer refused");
            return Ok(false);
        }
        if from == to {
            return Ok(true);
        }

        balances.insert(*from, available - amount);
        let received = balances.entry(*to).or_insert(0);
        *received += amount;
        Ok(true)
    }
}
