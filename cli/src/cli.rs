//! # CLI Interface
//!
//! Argument structure for `warden`, via `clap` derive. Every subcommand works
//! off-line: nothing here talks to a vault.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use warden_protocol::Address;

use crate::logging::LogFormat;

/// Off-line approval tooling for Warden vault owners.
///
/// Builds the digest a transfer module expects for a given transfer, signs it
/// with an owner key, and assembles owner signatures into the blob a vault
/// accepts.
#[derive(Parser, Debug)]
#[command(
    name = "warden",
    about = "Off-line approval tooling for Warden vault owners",
    version,
    propagate_version = true
)]
pub struct WardenCli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the approval digest owners sign.
    Digest(ApprovalArgs),
    /// Print the 66-byte pre-hash encoding behind the digest.
    Encode(ApprovalArgs),
    /// Sign the approval digest with an owner key.
    Sign(SignArgs),
    /// Print the owner address controlled by a key.
    Address(KeyArgs),
    /// Merge signature entries from several owners into one vault blob.
    Combine(CombineArgs),
    /// Print version information and exit.
    Version,
}

/// Which chain the module lives on.
#[derive(Args, Debug)]
pub struct ChainArgs {
    /// Chain id of the deployment. Overrides the config file.
    #[arg(long, env = "WARDEN_CHAIN_ID")]
    pub chain_id: Option<u64>,

    /// JSON config file, e.g. `{"chainId": 1}`.
    #[arg(long, short = 'c', env = "WARDEN_CONFIG")]
    pub config: Option<PathBuf>,
}

/// The transfer being approved.
#[derive(Args, Debug)]
pub struct ApprovalArgs {
    #[command(flatten)]
    pub chain: ChainArgs,

    /// Address of the transfer module.
    #[arg(long)]
    pub module: Address,

    /// Address of the vault the module is bound to.
    #[arg(long)]
    pub vault: Address,

    /// Recipient of the funds.
    #[arg(long)]
    pub to: Address,

    /// Amount in ledger units.
    #[arg(long)]
    pub amount: u64,

    /// The module's current nonce.
    #[arg(long)]
    pub nonce: u64,
}

/// An owner's signing key.
#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Hex-encoded Ed25519 secret key.
    ///
    /// Prefer the environment variable over the flag so the key stays out of
    /// shell history.
    #[arg(long, env = "WARDEN_OWNER_KEY", hide_env_values = true)]
    pub key: String,
}

/// Arguments for the `sign` subcommand.
#[derive(Args, Debug)]
pub struct SignArgs {
    #[command(flatten)]
    pub approval: ApprovalArgs,

    #[command(flatten)]
    pub key: KeyArgs,
}

/// Arguments for the `combine` subcommand.
#[derive(Args, Debug)]
pub struct CombineArgs {
    /// Hex-encoded signature entries or partial blobs, in any order.
    #[arg(long = "entry", required = true)]
    pub entries: Vec<String>,
}
