//! # certproof-protocol — Issuer, Holder, Verifier, Registry
//!
//! The parties exchange only payloads: [`VerifiableCredential`]s,
//! [`PresentationRequest`]s, and [`Presentation`]s. Each party keeps its
//! own accumulator, trust set, and key directory.
//!
//! ```text
//! Issuer ──issue──▶ Holder ──present──▶ Verifier
//!    │                                     │
//!    └──register / revoke──▶ Registry ◀────┘ (not-revoked check)
//! ```
//!
//! - [`Issuer`] signs and commits credentials and is the only party that
//!   may revoke them.
//! - [`Holder`] stores credentials from trusted issuers after checking
//!   their signatures, picks the best one for a request, and generates a
//!   disclosure proof.
//! - [`Verifier`] reports signature, trust, proof, requirement, and
//!   revocation checks separately and accepts only if all hold.
//! - [`Registry`] records issuer and revoked flag per credential.
//!
//! [`VerifiableCredential`]: certproof_vc::VerifiableCredential

pub mod config;
pub mod holder;
pub mod issuer;
pub mod lifecycle;
pub mod performance;
pub mod presentation;
pub mod registry;
pub mod selection;
pub mod trust;
pub mod verifier;

pub use config::{ConfigError, ProtocolConfig};
pub use holder::Holder;
pub use issuer::Issuer;
pub use lifecycle::{CredentialLifecycle, CredentialState, LifecycleError, TransitionRecord};
pub use performance::{Operation, OperationReport, PerformanceManager};
pub use presentation::{Presentation, PresentationRequest};
pub use registry::{PublishedRoot, Registry, RegistryEntry};
pub use selection::rank_candidates;
pub use trust::TrustSet;
pub use verifier::{CheckName, CheckOutcome, RootPolicy, VerificationReport, Verifier};
