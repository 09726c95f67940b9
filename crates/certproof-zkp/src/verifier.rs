//! # Proof Verification
//!
//! [`ProofVerifier`] checks a [`DisclosureProof`] using only the proof, the
//! field hasher, and an optional pinned root. It holds no accumulator, so a
//! proof generated in one process verifies identically in another.
//!
//! Check order:
//!
//! 1. Leaf and root present.
//! 2. Root is not the empty-accumulator sentinel.
//! 3. Root equals the pinned root, when one is given.
//! 4. Membership path folds from the leaf to the root.
//! 5. Attached absence proof verifies against the same root.

use std::sync::Arc;

use certproof_core::{FieldElement, ProofFailure};
use certproof_crypto::{commit, FieldHasher, EMPTY_ROOT};
use certproof_vc::Credential;

use crate::proof::DisclosureProof;

/// Stateless disclosure-proof checker.
#[derive(Debug, Clone)]
pub struct ProofVerifier {
    hasher: Arc<FieldHasher>,
}

impl ProofVerifier {
    /// Verifier using `hasher`.
    pub fn new(hasher: Arc<FieldHasher>) -> Self {
        Self { hasher }
    }

    /// Verifier on the process-wide hasher.
    pub async fn initialize() -> Self {
        Self::new(certproof_crypto::field_hasher().await)
    }

    /// Check `proof`, naming the first failing step.
    pub fn check(
        &self,
        proof: &DisclosureProof,
        expected_root: Option<&FieldElement>,
    ) -> Result<(), ProofFailure> {
        let leaf = proof.leaf.ok_or(ProofFailure::MissingLeaf)?;
        let root = proof.root.ok_or(ProofFailure::MissingRoot)?;
        if root == EMPTY_ROOT {
            return Err(ProofFailure::EmptyRoot);
        }
        if let Some(expected) = expected_root {
            if *expected != root {
                return Err(ProofFailure::RootMismatch {
                    expected: expected.to_hex(),
                    actual: root.to_hex(),
                });
            }
        }
        proof.membership.check(&self.hasher, &leaf, &root)?;
        if let Some(absence) = &proof.non_membership {
            absence.check(&self.hasher, &root)?;
        }
        Ok(())
    }

    /// Boolean form of [`check`](Self::check).
    pub fn verify(&self, proof: &DisclosureProof, expected_root: Option<&FieldElement>) -> bool {
        match self.check(proof, expected_root) {
            Ok(()) => true,
            Err(failure) => {
                tracing::debug!(%failure, "disclosure proof rejected");
                false
            }
        }
    }

    /// Check that `proof` is about `credential`: the leaf is the
    /// credential's commitment and every revealed value is the
    /// credential's value at that path.
    pub fn check_binding(
        &self,
        proof: &DisclosureProof,
        credential: &Credential,
    ) -> Result<(), ProofFailure> {
        let leaf = proof.leaf.ok_or(ProofFailure::MissingLeaf)?;
        let commitment = commit(&self.hasher, credential)
            .map_err(|e| ProofFailure::CredentialBinding(e.to_string()))?;
        if commitment != leaf {
            return Err(ProofFailure::CredentialBinding(format!(
                "leaf is not the commitment of {}",
                credential.id
            )));
        }
        for (path, value) in &proof.revealed_attributes {
            match credential.attribute(path) {
                Some(actual) if actual.to_json() == *value => {}
                _ => return Err(ProofFailure::RevealedMismatch(path.clone())),
            }
        }
        Ok(())
    }

    /// [`check`](Self::check) followed by [`check_binding`](Self::check_binding).
    pub fn check_for_credential(
        &self,
        proof: &DisclosureProof,
        credential: &Credential,
        expected_root: Option<&FieldElement>,
    ) -> Result<(), ProofFailure> {
        self.check(proof, expected_root)?;
        self.check_binding(proof, credential)
    }
}
