//! # certproof-core — Foundational Types
//!
//! The leaf of the certproof crate graph. Every other crate depends on
//! `certproof-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** Every byte sequence that is signed,
//!    committed, or hashed flows through `CanonicalBytes::new()`. No raw
//!    `serde_json::to_vec()` on a digest path.
//!
//! 2. **`FieldElement` for every accumulator value.** Commitments, roots,
//!    and sibling digests are 32-byte values below 2^253, so they can be fed
//!    back into the field-hash primitive without reduction.
//!
//! 3. **Identifier newtypes.** `CredentialId`, `HolderId`, `IssuerId`,
//!    `VerifierId` cannot be confused with each other at call sites.
//!
//! 4. **Fixed-point scores.** `Score` stores hundredths as an integer and
//!    serializes as a decimal string, so score values survive canonical
//!    serialization (which rejects floats).
//!
//! 5. **One error taxonomy.** [`CertError`] carries the nine failure kinds
//!    every role reports, each with enough structure to branch on.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `certproof-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod batch;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod field;
pub mod identity;
pub mod score;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use batch::BatchOutcome;
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use error::{CanonicalizationError, CertError, ErrorKind, ProofFailure};
pub use field::{FieldElement, FIELD_CHUNK_BYTES};
pub use identity::{CredentialId, HolderId, IssuerId, VerifierId};
pub use score::Score;
pub use temporal::Timestamp;
