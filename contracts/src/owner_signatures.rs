//! # Owner Signature Blobs
//!
//! The byte format [`crate::vault::VaultRegistry`] accepts as a quorum
//! signature. The transfer module never looks inside; it hands the blob to
//! the vault untouched.
//!
//! ## Layout
//!
//! A blob is a concatenation of entries, ordered by strictly increasing
//! owner address:
//!
//! ```text
//! kind (1) || owner (32) || payload
//!
//! kind 0x00  Contract      payload = len (u32 BE) || inner blob
//! kind 0x01  ApprovedHash  payload = (empty)
//! kind 0x02  Direct        payload = public key (32) || Ed25519 signature (64)
//! ```
//!
//! - **Direct**: the owner signed the digest with their own key.
//! - **ApprovedHash**: the owner called `approve_hash` on the vault earlier.
//! - **Contract**: the owner is itself a vault; `inner` is that vault's own
//!   quorum signature over its message hash of the encoding.

use thiserror::Error;
use warden_protocol::config::{ADDRESS_LENGTH, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use warden_protocol::crypto::{WardenKeypair, WardenPublicKey, WardenSignature};
use warden_protocol::{Address, Hash};

/// Entry tag for a contract-owner signature.
pub const KIND_CONTRACT: u8 = 0x00;
/// Entry tag for a pre-approved hash.
pub const KIND_APPROVED_HASH: u8 = 0x01;
/// Entry tag for a direct Ed25519 signature.
pub const KIND_DIRECT: u8 = 0x02;

/// Size of a `Direct` entry.
pub const DIRECT_ENTRY_LENGTH: usize = 1 + ADDRESS_LENGTH + PUBLIC_KEY_LENGTH + SIGNATURE_LENGTH;
/// Size of an `ApprovedHash` entry.
pub const APPROVED_HASH_ENTRY_LENGTH: usize = 1 + ADDRESS_LENGTH;
/// Largest inner blob a `Contract` entry can carry.
pub const MAX_INNER_SIGNATURE_LENGTH: usize = u32::MAX as usize;

/// Malformed blob.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureBlobError {
    #[error("signature blob truncated at offset {offset}")]
    Truncated { offset: usize },

    #[error("unknown signature kind {kind:#04x} at offset {offset}")]
    UnknownKind { kind: u8, offset: usize },

    /// A contract entry's inner blob does not fit the 4-byte length prefix.
    #[error("inner signature of {owner} is {len} bytes, over the {max} byte limit")]
    InnerTooLong { owner: Address, len: usize, max: usize },
}

/// One owner's contribution to a quorum signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerSignature {
    Direct {
        owner: Address,
        public_key: WardenPublicKey,
        signature: WardenSignature,
    },
    ApprovedHash {
        owner: Address,
    },
    Contract {
        owner: Address,
        inner: Vec<u8>,
    },
}

impl OwnerSignature {
    /// Signs `digest` with `keypair`; the owner is the key's address.
    pub fn direct(keypair: &WardenKeypair, digest: &Hash) -> Self {
        let public_key = keypair.public_key();
        OwnerSignature::Direct {
            owner: Address::from_public_key(&public_key),
            signature: keypair.sign(digest),
            public_key,
        }
    }

    /// The owner this entry speaks for.
    pub fn owner(&self) -> Address {
        match self {
            OwnerSignature::Direct { owner, .. }
            | OwnerSignature::ApprovedHash { owner }
            | OwnerSignature::Contract { owner, .. } => *owner,
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<(), SignatureBlobError> {
        match self {
            OwnerSignature::Direct {
                owner,
                public_key,
                signature,
            } => {
                out.push(KIND_DIRECT);
                out.extend_from_slice(owner.as_bytes());
                out.extend_from_slice(public_key.as_bytes());
                out.extend_from_slice(signature.as_bytes());
            }
            OwnerSignature::ApprovedHash { owner } => {
                out.push(KIND_APPROVED_HASH);
                out.extend_from_slice(owner.as_bytes());
            }
            OwnerSignature::Contract { owner, inner } => {
                out.push(KIND_CONTRACT);
                out.extend_from_slice(owner.as_bytes());
                let len = inner_length(*owner, inner.len())?;
                out.extend_from_slice(&len.to_be_bytes());
                out.extend_from_slice(inner);
            }
        }
        Ok(())
    }
}

fn inner_length(owner: Address, len: usize) -> Result<u32, SignatureBlobError> {
    u32::try_from(len).map_err(|_| SignatureBlobError::InnerTooLong {
        owner,
        len,
        max: MAX_INNER_SIGNATURE_LENGTH,
    })
}

/// Concatenates entries into a blob, sorted by owner address.
///
/// # Errors
///
/// [`SignatureBlobError::InnerTooLong`] if a contract entry's inner blob
/// cannot be length-prefixed. Nothing is written in that case.
pub fn encode_signatures(signatures: &[OwnerSignature]) -> Result<Vec<u8>, SignatureBlobError> {
    let mut sorted: Vec<&OwnerSignature> = signatures.iter().collect();
    sorted.sort_by_key(|s| s.owner());

    let mut out = Vec::new();
    for signature in sorted {
        signature.write_to(&mut out)?;
    }
    Ok(out)
}

/// Splits a blob back into entries, in blob order. Ordering and validity are
/// the vault's business, not the decoder's.
pub fn decode_signatures(blob: &[u8]) -> Result<Vec<OwnerSignature>, SignatureBlobError> {
    let mut reader = Reader { blob, offset: 0 };
    let mut entries = Vec::new();

    while !reader.is_empty() {
        let kind_offset = reader.offset;
        let kind = reader.take(1)?[0];
        let owner = Address::from_bytes(reader.take_array::<ADDRESS_LENGTH>()?);

        let entry = match kind {
            KIND_DIRECT => {
                let public_key = WardenPublicKey::from_bytes(reader.take_array()?);
                let signature = WardenSignature::from_bytes(reader.take_array::<SIGNATURE_LENGTH>()?);
                OwnerSignature::Direct {
                    owner,
                    public_key,
                    signature,
                }
            }
            KIND_APPROVED_HASH => OwnerSignature::ApprovedHash { owner },
            KIND_CONTRACT => {
                let len = u32::from_be_bytes(reader.take_array::<4>()?) as usize;
                let inner = reader.take(len)?.to_vec();
                OwnerSignature::Contract { owner, inner }
            }
            other => {
                return Err(SignatureBlobError::UnknownKind {
                    kind: other,
                    offset: kind_offset,
                })
            }
        };
        entries.push(entry);
    }

    Ok(entries)
}

struct Reader<'a> {
    blob: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn is_empty(&self) -> bool {
        self.offset >= self.blob.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], SignatureBlobError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.blob.len())
            .ok_or(SignatureBlobError::Truncated {
                offset: self.offset,
            })?;
        let slice = &self.blob[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], SignatureBlobError> {
        let offset = self.offset;
        self.take(N)?
            .try_into()
            .map_err(|_| SignatureBlobError::Truncated { offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_sorted_by_owner() {
        let digest = [1u8; 32];
        let a = OwnerSignature::direct(&WardenKeypair::from_seed(&[1u8; 32]), &digest);
        let b = OwnerSignature::direct(&WardenKeypair::from_seed(&[2u8; 32]), &digest);
        let (low, high) = if a.owner() < b.owner() { (a, b) } else { (b, a) };

        let blob = encode_signatures(&[high.clone(), low.clone()]).unwrap();
        assert_eq!(blob.len(), 2 * DIRECT_ENTRY_LENGTH);
        assert_eq!(decode_signatures(&blob).unwrap(), vec![low, high]);
    }

    #[test]
    fn mixed_kinds_decode() {
        let contract = OwnerSignature::Contract {
            owner: Address::derive("signer-vault"),
            inner: vec![9u8; 5],
        };
        let approved = OwnerSignature::ApprovedHash {
            owner: Address::derive("approver"),
        };
        let blob = encode_signatures(&[contract.clone(), approved.clone()]).unwrap();
        let decoded = decode_signatures(&blob).unwrap();
        assert_eq!(decoded.len(), 2);
        assert!(decoded.contains(&contract));
        assert!(decoded.contains(&approved));
    }

    #[test]
    fn approved_hash_entry_is_kind_and_owner() {
        let owner = Address::derive("approver");
        let blob = encode_signatures(&[OwnerSignature::ApprovedHash { owner }]).unwrap();
        assert_eq!(blob.len(), APPROVED_HASH_ENTRY_LENGTH);
        assert_eq!(blob[0], KIND_APPROVED_HASH);
        assert_eq!(&blob[1..], owner.as_bytes());
    }

    #[test]
    fn truncated_blob_rejected() {
        let blob = encode_signatures(&[OwnerSignature::direct(
            &WardenKeypair::from_seed(&[3u8; 32]),
            &[0u8; 32],
        )]).unwrap();
        let result = decode_signatures(&blob[..blob.len() - 1]);
        assert!(matches!(result, Err(SignatureBlobError::Truncated { .. })));
    }

    #[test]
    fn contract_length_overrun_rejected() {
        let mut blob = vec![KIND_CONTRACT];
        blob.extend_from_slice(Address::derive("x").as_bytes());
        blob.extend_from_slice(&100u32.to_be_bytes());
        blob.extend_from_slice(&[0u8; 10]);
        assert!(matches!(
            decode_signatures(&blob),
            Err(SignatureBlobError::Truncated { offset: 37 })
        ));
    }

    #[test]
    fn unknown_kind_rejected() {
        let mut blob = vec![0x07];
        blob.extend_from_slice(&[0u8; 32]);
        assert_eq!(
            decode_signatures(&blob),
            Err(SignatureBlobError::UnknownKind {
                kind: 0x07,
                offset: 0
            })
        );
    }

    #[test]
    fn inner_length_fits_prefix() {
        let owner = Address::derive("signer-vault");
        assert_eq!(inner_length(owner, 5), Ok(5));
        assert_eq!(
            inner_length(owner, MAX_INNER_SIGNATURE_LENGTH),
            Ok(u32::MAX)
        );
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_inner_rejected_not_truncated() {
        let owner = Address::derive("signer-vault");
        let len = MAX_INNER_SIGNATURE_LENGTH + 1;
        assert_eq!(
            inner_length(owner, len),
            Err(SignatureBlobError::InnerTooLong {
                owner,
                len,
                max: MAX_INNER_SIGNATURE_LENGTH,
            })
        );
    }

    #[test]
    fn empty_blob_has_no_entries() {
        assert!(decode_signatures(&[]).unwrap().is_empty());
    }
}
