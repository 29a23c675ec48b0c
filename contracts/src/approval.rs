//! # Transfer Approval Records
//!
//! Builds the canonical, domain-separated message that vault owners sign to
//! pre-approve one specific transfer at one specific nonce.
//!
//! ## Encoding
//!
//! ```text
//! APPROVAL_TYPEHASH = H("TokenTransferModuleApproval(address module,address vault,address to,uint256 amount,uint256 nonce)")
//! DOMAIN_TYPEHASH   = H("TransferDomain(uint256 chainId,address verifyingContract)")
//!
//! domain_separator  = H(DOMAIN_TYPEHASH || word(chain_id) || module)
//! struct_hash       = H(APPROVAL_TYPEHASH || module || vault || to || word(amount) || word(nonce))
//! encoding          = 0x19 || 0x01 || domain_separator || struct_hash      (66 bytes)
//! digest            = H(encoding)
//! ```
//!
//! `H` is BLAKE3 and `word(n)` is `n` as a 32-byte big-endian integer.
//!
//! The type hash pins the message shape, so the digest cannot collide with a
//! digest meant for anything else. The module appears in both the domain and
//! the struct, the vault in the struct: an approval signed for one
//! module/vault pair is meaningless for any other.
//!
//! Everything here is pure. The module decides *which* nonce goes in; this
//! file only knows how to hash it.

use serde::{Deserialize, Serialize};
use warden_protocol::config::{
    APPROVAL_TYPE_SIGNATURE, DOMAIN_TYPE_SIGNATURE, ENCODED_APPROVAL_LENGTH, ENCODING_PREFIX,
    WORD_LENGTH,
};
use warden_protocol::crypto::{blake3_hash, blake3_hash_multi};
use warden_protocol::{Address, Hash};

/// A proposed transfer out of a vault, bound to a module and a nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferApproval {
    /// The module that will redeem the approval.
    pub module: Address,
    /// The vault the funds leave.
    pub vault: Address,
    /// Recipient of the funds.
    pub to: Address,
    /// Quantity of the module's asset, in ledger units.
    pub amount: u64,
    /// The module's nonce at the time the record is built.
    pub nonce: u64,
}

impl TransferApproval {
    /// `H(APPROVAL_TYPEHASH || module || vault || to || word(amount) || word(nonce))`.
    pub fn struct_hash(&self) -> Hash {
        let typehash = approval_typehash();
        let amount = encode_word(self.amount);
        let nonce = encode_word(self.nonce);
        blake3_hash_multi(&[
            &typehash,
            self.module.as_bytes(),
            self.vault.as_bytes(),
            self.to.as_bytes(),
            &amount,
            &nonce,
        ])
    }

    /// The 66-byte pre-hash encoding. Delegated signers hash this themselves.
    pub fn encode(&self, chain_id: u64) -> Vec<u8> {
        let mut encoded = Vec::with_capacity(ENCODED_APPROVAL_LENGTH);
        encoded.extend_from_slice(&ENCODING_PREFIX);
        encoded.extend_from_slice(&domain_separator(chain_id, &self.module));
        encoded.extend_from_slice(&self.struct_hash());
        encoded
    }

    /// The digest owners sign directly.
    pub fn digest(&self, chain_id: u64) -> Hash {
        blake3_hash(&self.encode(chain_id))
    }
}

/// Hash of the approval type signature.
pub fn approval_typehash() -> Hash {
    blake3_hash(APPROVAL_TYPE_SIGNATURE.as_bytes())
}

/// Hash of the domain type signature.
pub fn domain_typehash() -> Hash {
    blake3_hash(DOMAIN_TYPE_SIGNATURE.as_bytes())
}

/// `H(DOMAIN_TYPEHASH || word(chain_id) || module)`.
pub fn domain_separator(chain_id: u64, module: &Address) -> Hash {
    let typehash = domain_typehash();
    let chain = encode_word(chain_id);
    blake3_hash_multi(&[&typehash, &chain, module.as_bytes()])
}

/// Left-pads `value` into a 32-byte big-endian word.
pub fn encode_word(value: u64) -> [u8; WORD_LENGTH] {
    let mut word = [0u8; WORD_LENGTH];
    word[WORD_LENGTH - 8..].copy_from_slice(&value.to_be_bytes());
    word
}
