//! # certproof-zkp — Disclosure Proofs
//!
//! Accumulator-backed selective disclosure for test-certification
//! credentials.
//!
//! - [`CredentialAccumulator`]: commitments in an indexed Merkle tree plus
//!   the `id -> (credential, commitment, index)` side table, persisted as
//!   JSON.
//! - [`ProofGenerator`]: enforces predicates on true values, then emits a
//!   [`DisclosureProof`] with a membership path and revealed attributes.
//! - [`ProofVerifier`]: checks a proof with no access to generator state.
//!
//! Predicates are checked in the clear by the generator. A disclosure
//! proof shows that a committed credential exists and that the revealed
//! values belong to it; it does not prove hidden-value ranges to a third
//! party.

pub mod generator;
pub mod ledger;
pub mod proof;
pub mod verifier;

pub use generator::{ProofGenerator, ProofRequest};
pub use ledger::{CredentialAccumulator, LedgerEntry, LEDGER_FILE, SNAPSHOT_FILE};
pub use proof::{DisclosureProof, DISCLOSURE_PROOF_TYPE};
pub use verifier::ProofVerifier;
