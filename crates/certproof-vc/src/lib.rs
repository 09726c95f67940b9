//! # certproof-vc — Test-Certification Credentials
//!
//! - [`Credential`]: the certified attribute set with dotted attribute
//!   paths and a fixed commitment/signing order.
//! - [`Predicate`]: typed `(field, condition)` expressions shared by
//!   admission criteria and proof-time threshold checks.
//! - [`VerifiableCredential`]: issuer-signed envelope, verification through
//!   a [`KeyDirectory`], and selective-disclosure signature proofs.

pub mod credential;
pub mod error;
pub mod predicate;
pub mod verifiable;

pub use credential::{
    attribute_message, AttributeValue, Credential, CredentialAttributes, RevealedAttributes,
    DEFAULT_CREDENTIAL_TYPE, OVERALL_SCORE,
};
pub use error::VcError;
pub use predicate::{Condition, Predicate, PredicateCheck};
pub use verifiable::{
    verify_disclosure_proof, CredentialProof, IssuerKey, KeyDirectory, ProofResult,
    VerifiableCredential, PROOF_TYPE,
};
