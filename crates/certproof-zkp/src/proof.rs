//! Disclosure proof payload.
//!
//! Everything a verifier needs travels inside the proof: the leaf
//! commitment, the root it was generated against, the membership path,
//! an optional absence proof, and the revealed attributes.

use serde::{Deserialize, Serialize};

use certproof_core::{FieldElement, Timestamp};
use certproof_crypto::{MembershipProof, NonMembershipProof};
use certproof_vc::RevealedAttributes;

/// Type tag written into every disclosure proof.
pub const DISCLOSURE_PROOF_TYPE: &str = "IndexedMerkleDisclosureProof2025";

/// Proof that a committed credential is in an accumulator, plus the
/// attributes the holder chose to reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosureProof {
    /// Always [`DISCLOSURE_PROOF_TYPE`] for proofs this crate generates.
    #[serde(rename = "type")]
    pub proof_type: String,
    /// The credential commitment.
    pub leaf: Option<FieldElement>,
    /// Accumulator root at generation time.
    pub root: Option<FieldElement>,
    /// Path from the leaf to `root`.
    pub membership: MembershipProof,
    /// Absence proof for a probe value, when attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_membership: Option<NonMembershipProof>,
    /// Exactly the requested attribute paths.
    pub revealed_attributes: RevealedAttributes,
    /// Generation time.
    pub created: Timestamp,
}

impl DisclosureProof {
    /// Revealed attribute paths, sorted.
    pub fn revealed_fields(&self) -> impl Iterator<Item = &str> {
        self.revealed_attributes.keys().map(String::as_str)
    }

    /// Whether an absence proof is attached.
    pub fn has_non_membership(&self) -> bool {
        self.non_membership.is_some()
    }
}
