//! # certproof-crypto — Cryptographic Building Blocks
//!
//! - **Field hasher**: domain-separated SHA-256 reduced into a 253-bit
//!   field, initialized once per process behind an async `OnceCell`.
//! - **Commitments**: ordered attribute messages folded into one field
//!   element.
//! - **Indexed Merkle accumulator**: append-only set of commitments with
//!   membership and non-membership proofs, snapshots, and a locked shared
//!   handle.
//! - **Ed25519** keys and signatures over `CanonicalBytes`.
//! - **Salted multi-message signatures** with selective disclosure.
//!
//! ## Crate Policy
//!
//! - Depends only on `certproof-core` internally.
//! - Tests use real hashing and real Ed25519; nothing is mocked.

pub mod accumulator;
pub mod commitment;
pub mod ed25519;
pub mod error;
pub mod hash;
mod hex;
pub mod signature;

pub use accumulator::{
    AccumulatorSnapshot, AccumulatorState, IndexedLeaf, IndexedMerkleTree, MembershipProof,
    NonMembershipProof, SharedAccumulator, EMPTY_ROOT,
};
pub use commitment::{commit, commit_messages, Committable};
pub use ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use error::CryptoError;
pub use hash::{field_hasher, FieldHasher, TREE_DEPTH};
pub use signature::{
    DisclosedMessage, MessageSignature, Salt, SelectiveDisclosureProof, SignatureManager,
    SignatureScheme,
};
