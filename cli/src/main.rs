// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Warden CLI
//!
//! Entry point for the `warden` binary. Vault owners use it to approve a
//! transfer without going on-line:
//!
//! - `digest` : the digest a transfer module will check
//! - `encode` : the pre-hash encoding, for owners that sign through a vault
//! - `sign`   : an owner's signature entry over the digest
//! - `address`: the owner address of a key
//! - `combine`: merge every owner's entry into one blob for `transfer_token`
//! - `version`: build and module version

mod cli;
mod logging;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;

use warden_contracts::approval::TransferApproval;
use warden_contracts::owner_signatures::{decode_signatures, encode_signatures, OwnerSignature};
use warden_protocol::config::{MODULE_NAME, MODULE_VERSION};
use warden_protocol::crypto::WardenKeypair;
use warden_protocol::{Address, ModuleConfig};

use cli::{ApprovalArgs, ChainArgs, Commands, WardenCli};

fn main() -> Result<()> {
    let cli = WardenCli::parse();
    logging::init_logging("warden=info,warden_contracts=info", cli.log_format);

    match cli.command {
        Commands::Digest(args) => {
            let (approval, config) = approval_from(&args)?;
            println!("0x{}", hex::encode(approval.digest(config.chain_id)));
            Ok(())
        }
        Commands::Encode(args) => {
            let (approval, config) = approval_from(&args)?;
            println!("0x{}", hex::encode(approval.encode(config.chain_id)));
            Ok(())
        }
        Commands::Sign(args) => sign(args),
        Commands::Address(args) => {
            let keypair = load_key(&args.key)?;
            println!("{}", Address::from_public_key(&keypair.public_key()));
            Ok(())
        }
        Commands::Combine(args) => combine(&args.entries),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Output of `warden sign`.
#[derive(Debug, Serialize)]
struct SignedApproval {
    owner: Address,
    digest: String,
    entry: String,
    approval: TransferApproval,
    chain_id: u64,
}

fn sign(args: cli::SignArgs) -> Result<()> {
    let (approval, config) = approval_from(&args.approval)?;
    let keypair = load_key(&args.key.key)?;
    let digest = approval.digest(config.chain_id);

    let entry = OwnerSignature::direct(&keypair, &digest);
    let owner = entry.owner();
    tracing::info!(%owner, nonce = approval.nonce, "approval signed");

    let blob = encode_signatures(&[entry]).context("failed to encode signature entry")?;
    let out = SignedApproval {
        owner,
        digest: format!("0x{}", hex::encode(digest)),
        entry: format!("0x{}", hex::encode(blob)),
        approval,
        chain_id: config.chain_id,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&out).context("failed to serialize signature")?
    );
    Ok(())
}

fn combine(inputs: &[String]) -> Result<()> {
    let mut entries = Vec::new();
    for (i, input) in inputs.iter().enumerate() {
        let bytes = decode_hex(input).with_context(|| format!("entry #{i} is not valid hex"))?;
        let decoded =
            decode_signatures(&bytes).with_context(|| format!("entry #{i} is not a signature entry"))?;
        entries.extend(decoded);
    }

    let mut owners: Vec<Address> = entries.iter().map(OwnerSignature::owner).collect();
    owners.sort();
    if let Some(pair) = owners.windows(2).find(|pair| pair[0] == pair[1]) {
        bail!("owner {} appears more than once", pair[0]);
    }

    let blob = encode_signatures(&entries).context("failed to assemble signature blob")?;
    tracing::info!(owners = entries.len(), "signature blob assembled");
    println!("0x{}", hex::encode(blob));
    Ok(())
}

fn approval_from(args: &ApprovalArgs) -> Result<(TransferApproval, ModuleConfig)> {
    let config = resolve_config(&args.chain)?;
    let approval = TransferApproval {
        module: args.module,
        vault: args.vault,
        to: args.to,
        amount: args.amount,
        nonce: args.nonce,
    };
    tracing::debug!(?approval, chain_id = config.chain_id, "approval built");
    Ok((approval, config))
}

/// Config file first, then `--chain-id` on top, then the default chain.
fn resolve_config(args: &ChainArgs) -> Result<ModuleConfig> {
    let mut config = match &args.config {
        Some(path) => ModuleConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ModuleConfig::default(),
    };
    if let Some(chain_id) = args.chain_id {
        config.chain_id = chain_id;
    }
    config.validate().context("invalid module configuration")?;
    Ok(config)
}

fn load_key(hex_key: &str) -> Result<WardenKeypair> {
    WardenKeypair::from_hex(hex_key)
        .context("owner key must be a 32-byte hex-encoded Ed25519 secret")
}

fn decode_hex(input: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(input.trim().trim_start_matches("0x"))
}

/// Prints build and module version information.
fn print_version() {
    println!("warden {}", env!("CARGO_PKG_VERSION"));
    println!("  module   : {MODULE_NAME} {MODULE_VERSION}");
    println!("  chain id : {} (default)", ModuleConfig::default().chain_id);
}
