// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Warden Protocol Core Primitives
//!
//! The small, boring foundation that Warden's vault modules stand on:
//! identities, hashing, and Ed25519 keys. Nothing in here knows what a
//! vault or a token is. That knowledge lives in `warden-contracts`.
//!
//! ## Modules
//!
//! - **address**: 32-byte identities for owners, vaults, modules and tokens,
//!   including the two reserved values (zero and the sentinel `...01`).
//! - **crypto**: BLAKE3 hashing with domain separation and Ed25519
//!   signing/verification wrappers.
//! - **config**: Protocol constants (type signatures, encoding prefix,
//!   lengths) and the per-deployment `ModuleConfig`.
//!
//! ## Design Philosophy
//!
//! 1. Fixed-size types for everything that is hashed. No stringly-typed
//!    addresses on the signing path.
//! 2. No unsafe code.
//! 3. Errors are typed (`thiserror`) and say what went wrong without
//!    leaking key material.

pub mod address;
pub mod config;
pub mod crypto;

pub use address::{Address, AddressError};
pub use config::{ConfigError, ModuleConfig};

/// A 32-byte digest. Every hash in the protocol has this shape.
pub type Hash = [u8; 32];
