//! # Error Types
//!
//! One taxonomy shared by every role. Each variant of [`CertError`] is one
//! failure kind a caller may need to branch on; [`CertError::kind()`]
//! returns the flat [`ErrorKind`] discriminant for that purpose.
//!
//! - Caller-input violations (validation, threshold, not-found, duplicate)
//!   are hard failures with no fallback.
//! - Proof failures carry a structured [`ProofFailure`] naming the exact
//!   check that did not hold.
//! - Unauthorized revocation is reported by the registry as `false`; the
//!   `Authorization` variant exists for callers that want to escalate it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for certproof.
#[derive(Error, Debug)]
pub enum CertError {
    /// Malformed credential, request, or value.
    #[error("validation error: {0}")]
    Validation(String),

    /// The issuer is not in the acting party's trust set.
    #[error("issuer untrusted: {issuer}")]
    Trust {
        /// The issuer that was looked up.
        issuer: String,
    },

    /// Signature missing, malformed, or not valid over the attributes.
    #[error("signature invalid: {0}")]
    Signature(String),

    /// A referenced object does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What was looked up ("credential", "commitment", ...).
        kind: &'static str,
        /// The identifier that missed.
        id: String,
    },

    /// A threshold predicate did not hold on the true attribute value.
    #[error("threshold not met for {field}: requires {comparator} {required}")]
    Threshold {
        /// Attribute path of the failing predicate.
        field: String,
        /// Comparator symbol (`>=`, `<=`, ...).
        comparator: String,
        /// Threshold value as rendered in the predicate.
        required: String,
    },

    /// Structurally invalid or root-mismatched proof.
    #[error("proof error: {0}")]
    Proof(ProofFailure),

    /// An actor attempted an operation reserved to another party.
    #[error("{actor} is not authorized to {action} {target}")]
    Authorization {
        /// The acting party.
        actor: String,
        /// The attempted action.
        action: &'static str,
        /// The object of the action.
        target: String,
    },

    /// Re-insertion of an identical value.
    #[error("duplicate {kind}: {id}")]
    Duplicate {
        /// What was duplicated.
        kind: &'static str,
        /// The duplicate value, rendered.
        id: String,
    },

    /// State save or load failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl CertError {
    /// The flat discriminant for programmatic branching.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Trust { .. } => ErrorKind::Trust,
            Self::Signature(_) => ErrorKind::Signature,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Threshold { .. } => ErrorKind::Threshold,
            Self::Proof(_) => ErrorKind::Proof,
            Self::Authorization { .. } => ErrorKind::Authorization,
            Self::Duplicate { .. } => ErrorKind::Duplicate,
            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Shorthand for a `NotFound` error.
    pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<CanonicalizationError> for CertError {
    fn from(e: CanonicalizationError) -> Self {
        Self::Validation(format!("canonicalization failed: {e}"))
    }
}

impl From<ProofFailure> for CertError {
    fn from(f: ProofFailure) -> Self {
        Self::Proof(f)
    }
}

impl From<std::io::Error> for CertError {
    fn from(e: std::io::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

/// Discriminant of [`CertError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Trust,
    Signature,
    NotFound,
    Threshold,
    Proof,
    Authorization,
    Duplicate,
    Persistence,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Trust => "trust",
            Self::Signature => "signature",
            Self::NotFound => "not_found",
            Self::Threshold => "threshold",
            Self::Proof => "proof",
            Self::Authorization => "authorization",
            Self::Duplicate => "duplicate",
            Self::Persistence => "persistence",
        };
        f.write_str(s)
    }
}

/// The specific check a proof failed.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "failure", rename_all = "snake_case")]
pub enum ProofFailure {
    /// The proof carries no leaf commitment.
    #[error("leaf commitment missing")]
    MissingLeaf,

    /// The proof carries no root.
    #[error("root missing")]
    MissingRoot,

    /// The proof's root is the empty-accumulator sentinel.
    #[error("root is the empty-accumulator sentinel")]
    EmptyRoot,

    /// The stated root differs from the caller's pinned root.
    #[error("root mismatch: expected {expected}, proof states {actual}")]
    RootMismatch {
        /// Hex of the expected root.
        expected: String,
        /// Hex of the root stated in the proof.
        actual: String,
    },

    /// No current root is known to compare the proof against.
    #[error("no current root available: {0}")]
    RootUnavailable(String),

    /// Sibling path and direction bits do not hash to the stated root.
    #[error("membership path does not reproduce the root")]
    PathMismatch,

    /// Sibling and direction sequences have the wrong length.
    #[error("membership path has {siblings} siblings and {directions} direction bits, expected {depth}")]
    PathShape {
        /// Number of siblings supplied.
        siblings: usize,
        /// Number of direction bits supplied.
        directions: usize,
        /// Tree depth.
        depth: usize,
    },

    /// The leaf preimage does not hash to the leaf or does not carry the
    /// claimed value.
    #[error("leaf preimage does not match the claimed commitment")]
    LeafMismatch,

    /// The non-membership predecessor does not bracket the query.
    #[error("query value is not strictly between predecessor and successor")]
    NotBracketed,

    /// The proof is bound to a different credential.
    #[error("proof is not bound to the presented credential: {0}")]
    CredentialBinding(String),

    /// A revealed value differs from the credential value at that path.
    #[error("revealed value for {0} does not match the credential")]
    RevealedMismatch(String),

    /// Selective-disclosure signature proof failed.
    #[error("disclosure signature proof invalid: {0}")]
    DisclosureSignature(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Scores must be fixed-point strings or integers.
    #[error("float values are not permitted in canonical representations; use a decimal string: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let cases: Vec<(CertError, ErrorKind)> = vec![
            (CertError::Validation("x".into()), ErrorKind::Validation),
            (
                CertError::Trust {
                    issuer: "did:x".into(),
                },
                ErrorKind::Trust,
            ),
            (CertError::Signature("bad".into()), ErrorKind::Signature),
            (CertError::not_found("credential", "c1"), ErrorKind::NotFound),
            (
                CertError::Threshold {
                    field: "scores.overall".into(),
                    comparator: ">=".into(),
                    required: "8.5".into(),
                },
                ErrorKind::Threshold,
            ),
            (CertError::Proof(ProofFailure::PathMismatch), ErrorKind::Proof),
            (
                CertError::Authorization {
                    actor: "mallory".into(),
                    action: "revoke",
                    target: "c1".into(),
                },
                ErrorKind::Authorization,
            ),
            (
                CertError::Duplicate {
                    kind: "commitment",
                    id: "ab".into(),
                },
                ErrorKind::Duplicate,
            ),
            (CertError::Persistence("disk".into()), ErrorKind::Persistence),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "{err}");
        }
    }

    #[test]
    fn test_threshold_message_names_field() {
        let err = CertError::Threshold {
            field: "scores.overall".into(),
            comparator: ">=".into(),
            required: "8.5".into(),
        };
        assert_eq!(
            err.to_string(),
            "threshold not met for scores.overall: requires >= 8.5"
        );
    }

    #[test]
    fn test_canonicalization_maps_to_validation() {
        let err: CertError = CanonicalizationError::FloatRejected(1.5).into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_io_maps_to_persistence() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CertError = io.into();
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn test_proof_failure_serializes_tagged() {
        let json = serde_json::to_value(ProofFailure::RootMismatch {
            expected: "aa".into(),
            actual: "bb".into(),
        })
        .unwrap();
        assert_eq!(json["failure"], "root_mismatch");
        assert_eq!(json["expected"], "aa");
    }
}
