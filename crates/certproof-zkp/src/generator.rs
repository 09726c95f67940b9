//! # Proof Generation
//!
//! [`ProofGenerator`] turns an accumulated credential into a
//! [`DisclosureProof`]. Threshold predicates are evaluated against the true
//! credential values before any proof material exists, so a failing
//! predicate never yields a partial proof.
//!
//! The optional absence proof covers a probe value derived from the leaf
//! and its index. It is informational: failing to build it is logged and
//! the proof is returned without it.

use serde::{Deserialize, Serialize};

use certproof_core::{BatchOutcome, CertError, CredentialId, FieldElement, Timestamp};
use certproof_crypto::NonMembershipProof;
use certproof_vc::Predicate;

use crate::ledger::CredentialAccumulator;
use crate::proof::{DisclosureProof, DISCLOSURE_PROOF_TYPE};

/// One item of a batch generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    /// Credential to prove.
    pub credential_id: CredentialId,
    /// Attribute paths to reveal.
    pub revealed_fields: Vec<String>,
    /// Predicates that must hold on the true values.
    #[serde(default)]
    pub predicates: Vec<Predicate>,
}

/// Builds disclosure proofs against one credential accumulator.
#[derive(Debug, Clone, Copy)]
pub struct ProofGenerator<'a> {
    ledger: &'a CredentialAccumulator,
    attach_non_membership: bool,
}

impl<'a> ProofGenerator<'a> {
    /// Generator over `ledger`, attaching absence proofs.
    pub fn new(ledger: &'a CredentialAccumulator) -> Self {
        Self {
            ledger,
            attach_non_membership: true,
        }
    }

    /// Toggle the informational absence proof.
    pub fn with_non_membership(mut self, attach: bool) -> Self {
        self.attach_non_membership = attach;
        self
    }

    /// Generate a disclosure proof for `credential_id`.
    pub fn generate(
        &self,
        credential_id: &CredentialId,
        revealed_fields: &[String],
        predicates: &[Predicate],
    ) -> Result<DisclosureProof, CertError> {
        let entry = self
            .ledger
            .get(credential_id)
            .ok_or_else(|| CertError::not_found("credential", credential_id.as_str()))?;

        for predicate in predicates {
            if let Err(e) = predicate.evaluate(&entry.credential) {
                tracing::debug!(credential_id = %credential_id, error = %e, "predicate not met");
                return Err(e);
            }
        }

        let revealed_attributes = entry.credential.project(revealed_fields)?;
        let membership = self
            .ledger
            .tree()
            .membership_proof(&entry.commitment, entry.index)?;

        let non_membership = if self.attach_non_membership {
            self.probe(&entry.commitment, entry.index)
        } else {
            None
        };

        tracing::info!(
            credential_id = %credential_id,
            revealed = revealed_attributes.len(),
            predicates = predicates.len(),
            "disclosure proof generated"
        );

        Ok(DisclosureProof {
            proof_type: DISCLOSURE_PROOF_TYPE.to_string(),
            leaf: Some(entry.commitment),
            root: Some(self.ledger.root()),
            membership,
            non_membership,
            revealed_attributes,
            created: Timestamp::now(),
        })
    }

    /// Generate one proof per request, continuing past failures.
    pub fn generate_batch(&self, requests: &[ProofRequest]) -> BatchOutcome<DisclosureProof> {
        requests
            .iter()
            .map(|r| self.generate(&r.credential_id, &r.revealed_fields, &r.predicates))
            .collect()
    }

    fn probe(&self, leaf: &FieldElement, index: u64) -> Option<NonMembershipProof> {
        let hasher = self.ledger.hasher();
        let probe = hasher.hash(&[*leaf, FieldElement::from_u64(index)]);
        match self.ledger.tree().non_membership_proof(&probe) {
            Ok(proof) => Some(proof),
            Err(e) => {
                tracing::debug!(error = %e, "absence proof skipped");
                None
            }
        }
    }
}
