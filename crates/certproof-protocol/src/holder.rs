//! # Holder
//!
//! Stores credentials it has validated and answers presentation requests
//! with a disclosure proof from its own accumulator.
//!
//! Storage checks run in a fixed order so the first failure is reported:
//! issuer trust, then signature, then structure.

use std::collections::BTreeMap;
use std::sync::Arc;

use certproof_core::{CertError, CredentialId, FieldElement, HolderId, IssuerId, Timestamp};
use certproof_crypto::{Ed25519PublicKey, FieldHasher, SelectiveDisclosureProof, SignatureManager};
use certproof_vc::{KeyDirectory, VerifiableCredential};
use certproof_zkp::{CredentialAccumulator, ProofGenerator};

use crate::config::ProtocolConfig;
use crate::lifecycle::{CredentialLifecycle, CredentialState};
use crate::performance::{Operation, PerformanceManager};
use crate::presentation::{Presentation, PresentationRequest};
use crate::registry::Registry;
use crate::selection::rank_candidates;
use crate::trust::TrustSet;

/// A credential-holding party.
#[derive(Debug)]
pub struct Holder {
    id: HolderId,
    trust: TrustSet,
    keys: KeyDirectory,
    scheme: SignatureManager,
    accumulator: CredentialAccumulator,
    /// Stored credentials in storage order.
    credentials: Vec<VerifiableCredential>,
    lifecycles: BTreeMap<CredentialId, CredentialLifecycle>,
    attach_non_membership: bool,
    metrics: PerformanceManager,
}

impl Holder {
    pub fn new(
        id: HolderId,
        hasher: Arc<FieldHasher>,
        config: &ProtocolConfig,
        metrics: PerformanceManager,
    ) -> Self {
        Self {
            id,
            trust: TrustSet::new(),
            keys: KeyDirectory::new(),
            scheme: SignatureManager::new(),
            accumulator: CredentialAccumulator::new(hasher),
            credentials: Vec::new(),
            lifecycles: BTreeMap::new(),
            attach_non_membership: config.attach_non_membership,
            metrics,
        }
    }

    pub fn id(&self) -> &HolderId {
        &self.id
    }

    /// Live handle to the holder's trust set.
    pub fn trust_set(&self) -> &TrustSet {
        &self.trust
    }

    pub fn trust_issuer(&self, issuer: IssuerId) {
        self.trust.trust(issuer);
    }

    /// Learn an issuer verification key.
    pub fn learn_issuer_key(&mut self, method: impl Into<String>, issuer: IssuerId, key: Ed25519PublicKey) {
        self.keys.register(method, issuer, key);
    }

    /// Mutable access to the holder's key directory.
    pub fn key_directory_mut(&mut self) -> &mut KeyDirectory {
        &mut self.keys
    }

    pub fn accumulator(&self) -> &CredentialAccumulator {
        &self.accumulator
    }

    pub fn root(&self) -> FieldElement {
        self.accumulator.root()
    }

    /// Publish the current accumulator root so verifiers can reject
    /// proofs made against earlier states.
    pub fn publish_root(&self, registry: &Registry) {
        registry.publish_root(self.id.clone(), self.accumulator.root());
    }

    pub fn credentials(&self) -> &[VerifiableCredential] {
        &self.credentials
    }

    pub fn lifecycle(&self, id: &CredentialId) -> Option<&CredentialLifecycle> {
        self.lifecycles.get(id)
    }

    /// Validate and keep a credential.
    pub fn store(&mut self, vc: VerifiableCredential) -> Result<(), CertError> {
        let metrics = self.metrics.clone();
        metrics.time(Operation::Store, || self.store_inner(vc))
    }

    fn store_inner(&mut self, vc: VerifiableCredential) -> Result<(), CertError> {
        if !self.trust.is_trusted(&vc.issuer) {
            tracing::warn!(holder = %self.id, issuer = %vc.issuer, "credential from untrusted issuer refused");
            return Err(CertError::Trust {
                issuer: vc.issuer.to_string(),
            });
        }
        let signature = vc.verify_with_directory(&self.scheme, &self.keys);
        if !signature.ok {
            tracing::warn!(holder = %self.id, credential_id = %vc.credential.id, error = %signature.error, "credential signature invalid");
            return Err(CertError::Signature(signature.error));
        }
        vc.validate()?;
        let index = self.accumulator.add(vc.credential.clone())?;

        let mut lifecycle = CredentialLifecycle::issued(vc.credential.id.clone());
        lifecycle.transition(CredentialState::Held, "stored by holder")?;
        self.lifecycles.insert(vc.credential.id.clone(), lifecycle);

        tracing::info!(holder = %self.id, credential_id = %vc.credential.id, index, "credential stored");
        self.credentials.push(vc);
        Ok(())
    }

    /// Answer `request` with the best matching credential.
    pub fn present(&mut self, request: &PresentationRequest) -> Result<Presentation, CertError> {
        self.present_at(request, &Timestamp::now())
    }

    /// [`present`](Self::present) with an explicit clock for expiry ranking.
    pub fn present_at(
        &mut self,
        request: &PresentationRequest,
        now: &Timestamp,
    ) -> Result<Presentation, CertError> {
        let metrics = self.metrics.clone();
        metrics.time(Operation::Present, || self.present_inner(request, now))
    }

    fn present_inner(
        &mut self,
        request: &PresentationRequest,
        now: &Timestamp,
    ) -> Result<Presentation, CertError> {
        request.validate()?;
        let candidates: Vec<&VerifiableCredential> = self
            .credentials
            .iter()
            .filter(|vc| {
                vc.credential.credential_type == request.credential_type
                    && vc.credential.holder == self.id
            })
            .collect();
        let plain: Vec<_> = candidates.iter().map(|vc| &vc.credential).collect();
        let chosen = rank_candidates(&plain, request, now)
            .first()
            .map(|i| candidates[*i].clone())
            .ok_or_else(|| {
                CertError::not_found(
                    "matching credential",
                    format!("{} for {}", request.credential_type, request.verifier),
                )
            })?;

        let proof = ProofGenerator::new(&self.accumulator)
            .with_non_membership(self.attach_non_membership)
            .generate(&chosen.credential.id, &request.required_fields, &request.predicates())?;
        let signature_disclosure = self.signature_disclosure(&chosen, request);

        if let Some(lc) = self.lifecycles.get_mut(&chosen.credential.id) {
            lc.transition(CredentialState::Presented, &request.purpose)?;
        }
        tracing::info!(
            holder = %self.id,
            credential_id = %chosen.credential.id,
            verifier = %request.verifier,
            revealed = proof.revealed_attributes.len(),
            "presentation created"
        );
        Ok(Presentation {
            holder: self.id.clone(),
            credential: chosen,
            proof,
            signature_disclosure,
        })
    }

    fn signature_disclosure(
        &self,
        vc: &VerifiableCredential,
        request: &PresentationRequest,
    ) -> Option<SelectiveDisclosureProof> {
        let nonce = request.nonce.as_deref()?;
        let key = self
            .keys
            .resolve_for(&vc.proof.verification_method, &vc.issuer)
            .ok()?;
        match vc.create_disclosure_proof(&self.scheme, &key, &request.required_fields, nonce) {
            Ok(proof) => Some(proof),
            Err(e) => {
                tracing::debug!(credential_id = %vc.credential.id, error = %e, "signature disclosure skipped");
                None
            }
        }
    }

    /// Record a verifier's decision for a presented credential.
    pub fn record_outcome(&mut self, id: &CredentialId, accepted: bool) -> Result<(), CertError> {
        let lc = self
            .lifecycles
            .get_mut(id)
            .ok_or_else(|| CertError::not_found("credential", id))?;
        let reason = if accepted { "accepted by verifier" } else { "rejected by verifier" };
        lc.record_outcome(accepted, reason)?;
        Ok(())
    }
}
