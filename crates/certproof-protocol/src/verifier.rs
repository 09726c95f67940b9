//! # Verifier
//!
//! Checks a [`Presentation`] and reports each check separately:
//!
//! | Check | Holds when |
//! |---|---|
//! | `signature` | the issuer signature covers the presented credential, the credential is the one the proof commits to, the revealed values are its values, the presenter is its holder, and it has not expired (unless expiry rejection is off) |
//! | `issuer_trusted` | the issuer is in this verifier's trust set at call time |
//! | `proof` | the disclosure proof's leaf, path, and absence proof verify against the current root |
//! | `requirements` | the revealed attributes alone satisfy the request |
//! | `not_revoked` | the registry lists the credential as not revoked |
//!
//! A presentation is accepted only if every check holds. Attributes edited
//! after issuance fail `signature`; `proof` only looks at the accumulator
//! side.
//!
//! ## Current root
//!
//! The root a proof must match comes from the verifier's [`RootPolicy`].
//! [`Verifier::new`] uses the root the presenting holder last published to
//! the registry, so proofs against an older accumulator state are
//! rejected. [`Verifier::accepting_any_root`] skips the comparison and
//! accepts stale roots.
//!
//! ## Revocation
//!
//! [`Verifier::new`] requires a [`Registry`]. A registry-less verifier
//! can only be built with [`Verifier::without_revocation_checks`]; it
//! reports `not_revoked` as passed without consulting anything.
//!
//! ## Thresholds on hidden attributes
//!
//! Requirements are judged from revealed values only. The holder enforces
//! a request's minimum scores before it builds a proof, but the proof does
//! not carry that guarantee to the verifier. A thresholded field that is
//! not revealed is therefore reported unmet, and a request that must be
//! accepted has to list the field in `required_fields`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use certproof_core::{CredentialId, FieldElement, HolderId, IssuerId, ProofFailure, Timestamp, VerifierId};
use certproof_crypto::{Ed25519PublicKey, FieldHasher, SignatureManager};
use certproof_vc::{verify_disclosure_proof, KeyDirectory, PredicateCheck};
use certproof_zkp::ProofVerifier;

use crate::performance::{Operation, PerformanceManager};
use crate::presentation::{Presentation, PresentationRequest};
use crate::registry::Registry;
use crate::trust::TrustSet;

/// Where the root a disclosure proof must match comes from.
#[derive(Debug, Clone)]
pub enum RootPolicy {
    /// The root the presenting holder last published to the registry.
    Published(Registry),
    /// A fixed root supplied by the caller.
    Pinned(FieldElement),
    /// Any non-empty root whose path verifies. Stale roots are accepted.
    AcceptAny,
}

/// Names of the individual checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckName {
    Signature,
    IssuerTrusted,
    Proof,
    Requirements,
    NotRevoked,
}

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub passed: bool,
    /// Why it failed, or a note on how it passed.
    pub detail: String,
}

impl CheckOutcome {
    fn pass(detail: impl Into<String>) -> Self {
        Self {
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            detail: detail.into(),
        }
    }
}

/// Per-check results plus the aggregate decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub credential_id: CredentialId,
    pub issuer: IssuerId,
    pub signature: CheckOutcome,
    pub issuer_trusted: CheckOutcome,
    pub proof: CheckOutcome,
    /// Structured reason when `proof` failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_failure: Option<ProofFailure>,
    /// Structured reason when `signature` failed because the credential
    /// does not match the proof or the presenter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_failure: Option<ProofFailure>,
    pub requirements: CheckOutcome,
    /// One entry per required field and threshold.
    pub requirement_checks: Vec<PredicateCheck>,
    pub not_revoked: CheckOutcome,
    /// Whether the credential had expired at verification time.
    pub expired: bool,
    pub accepted: bool,
}

impl VerificationReport {
    /// Every check with its name, in evaluation order.
    pub fn checks(&self) -> [(CheckName, &CheckOutcome); 5] {
        [
            (CheckName::Signature, &self.signature),
            (CheckName::IssuerTrusted, &self.issuer_trusted),
            (CheckName::Proof, &self.proof),
            (CheckName::Requirements, &self.requirements),
            (CheckName::NotRevoked, &self.not_revoked),
        ]
    }

    /// Names of the checks that failed.
    pub fn failed_checks(&self) -> Vec<CheckName> {
        self.checks()
            .into_iter()
            .filter(|(_, o)| !o.passed)
            .map(|(name, _)| name)
            .collect()
    }

    /// The first failing check, if any.
    pub fn first_failure(&self) -> Option<CheckName> {
        self.failed_checks().first().copied()
    }
}

/// A presentation-verifying party.
#[derive(Debug)]
pub struct Verifier {
    id: VerifierId,
    trust: TrustSet,
    keys: KeyDirectory,
    scheme: SignatureManager,
    proofs: ProofVerifier,
    registry: Option<Registry>,
    roots: RootPolicy,
    reject_expired: bool,
    metrics: PerformanceManager,
}

impl Verifier {
    /// Verifier that checks revocation against `registry` and proofs
    /// against the roots holders publish there.
    pub fn new(id: VerifierId, hasher: Arc<FieldHasher>, registry: Registry, metrics: PerformanceManager) -> Self {
        let roots = RootPolicy::Published(registry.clone());
        Self::build(id, hasher, Some(registry), roots, metrics)
    }

    /// Verifier with no registry. Its `not_revoked` check always passes,
    /// so revoked credentials are accepted. Proof roots follow `roots`.
    pub fn without_revocation_checks(
        id: VerifierId,
        hasher: Arc<FieldHasher>,
        roots: RootPolicy,
        metrics: PerformanceManager,
    ) -> Self {
        tracing::warn!(verifier = %id, "verifier built without revocation checks");
        Self::build(id, hasher, None, roots, metrics)
    }

    /// Verifier that checks revocation against `registry` but accepts a
    /// proof against any non-empty root, including stale ones.
    pub fn accepting_any_root(
        id: VerifierId,
        hasher: Arc<FieldHasher>,
        registry: Registry,
        metrics: PerformanceManager,
    ) -> Self {
        tracing::warn!(verifier = %id, "verifier accepts proofs against any root");
        Self::build(id, hasher, Some(registry), RootPolicy::AcceptAny, metrics)
    }

    fn build(
        id: VerifierId,
        hasher: Arc<FieldHasher>,
        registry: Option<Registry>,
        roots: RootPolicy,
        metrics: PerformanceManager,
    ) -> Self {
        Self {
            id,
            trust: TrustSet::new(),
            keys: KeyDirectory::new(),
            scheme: SignatureManager::new(),
            proofs: ProofVerifier::new(hasher),
            registry,
            roots,
            reject_expired: true,
            metrics,
        }
    }

    pub fn id(&self) -> &VerifierId {
        &self.id
    }

    /// Live handle to the verifier's trust set.
    pub fn trust_set(&self) -> &TrustSet {
        &self.trust
    }

    pub fn trust_issuer(&self, issuer: IssuerId) {
        self.trust.trust(issuer);
    }

    pub fn learn_issuer_key(&mut self, method: impl Into<String>, issuer: IssuerId, key: Ed25519PublicKey) {
        self.keys.register(method, issuer, key);
    }

    pub fn key_directory_mut(&mut self) -> &mut KeyDirectory {
        &mut self.keys
    }

    /// Only accept proofs against `root`.
    pub fn pin_root(&mut self, root: FieldElement) {
        self.roots = RootPolicy::Pinned(root);
    }

    pub fn set_root_policy(&mut self, roots: RootPolicy) {
        if matches!(roots, RootPolicy::AcceptAny) {
            tracing::warn!(verifier = %self.id, "verifier accepts proofs against any root");
        }
        self.roots = roots;
    }

    pub fn root_policy(&self) -> &RootPolicy {
        &self.roots
    }

    /// Whether an expired credential fails the signature check.
    pub fn set_reject_expired(&mut self, reject: bool) {
        self.reject_expired = reject;
    }

    /// Verify `presentation`, optionally against the request it answers.
    pub fn verify(&self, presentation: &Presentation, request: Option<&PresentationRequest>) -> VerificationReport {
        self.verify_at(presentation, request, &Timestamp::now())
    }

    /// [`verify`](Self::verify) with an explicit clock.
    pub fn verify_at(
        &self,
        presentation: &Presentation,
        request: Option<&PresentationRequest>,
        now: &Timestamp,
    ) -> VerificationReport {
        let start = std::time::Instant::now();
        let vc = &presentation.credential;
        let expired = vc.credential.is_expired_at(now);

        let (signature, binding_failure) = self.check_signature(presentation, request, expired);
        let issuer_trusted = if self.trust.is_trusted(&vc.issuer) {
            CheckOutcome::pass("")
        } else {
            CheckOutcome::fail(format!("issuer {} is not trusted", vc.issuer))
        };
        let (proof, proof_failure) = match self.check_proof(presentation) {
            Ok(()) => (CheckOutcome::pass(""), None),
            Err(failure) => (CheckOutcome::fail(failure.to_string()), Some(failure)),
        };
        let (requirements, requirement_checks) = check_requirements(presentation, request);
        let not_revoked = self.check_revocation(&vc.credential.id);

        let accepted = signature.passed
            && issuer_trusted.passed
            && proof.passed
            && requirements.passed
            && not_revoked.passed;
        let report = VerificationReport {
            credential_id: vc.credential.id.clone(),
            issuer: vc.issuer.clone(),
            signature,
            issuer_trusted,
            proof,
            proof_failure,
            binding_failure,
            requirements,
            requirement_checks,
            not_revoked,
            expired,
            accepted,
        };
        tracing::info!(
            verifier = %self.id,
            credential_id = %report.credential_id,
            accepted,
            failed = ?report.failed_checks(),
            "presentation verified"
        );
        self.metrics.record(Operation::Verify, start.elapsed(), accepted);
        report
    }

    fn check_signature(
        &self,
        presentation: &Presentation,
        request: Option<&PresentationRequest>,
        expired: bool,
    ) -> (CheckOutcome, Option<ProofFailure>) {
        let vc = &presentation.credential;
        if let Err(e) = vc.validate() {
            return (CheckOutcome::fail(e.to_string()), None);
        }
        let result = vc.verify_with_directory(&self.scheme, &self.keys);
        if !result.ok {
            return (CheckOutcome::fail(result.error), None);
        }
        if let Err(failure) = self.check_binding(presentation, request) {
            return (CheckOutcome::fail(failure.to_string()), Some(failure));
        }
        let outcome = match (expired, self.reject_expired) {
            (false, _) => CheckOutcome::pass(""),
            (true, true) => CheckOutcome::fail(format!("credential expired at {}", vc.credential.expiry_date)),
            (true, false) => CheckOutcome::pass(format!("credential expired at {}", vc.credential.expiry_date)),
        };
        (outcome, None)
    }

    /// The signed credential is the one the proof commits to, revealed
    /// values are its values, and the presenter is its holder.
    fn check_binding(
        &self,
        presentation: &Presentation,
        request: Option<&PresentationRequest>,
    ) -> Result<(), ProofFailure> {
        let vc = &presentation.credential;
        if presentation.holder != vc.credential.holder {
            return Err(ProofFailure::CredentialBinding(format!(
                "presented by {} but issued to {}",
                presentation.holder, vc.credential.holder
            )));
        }
        self.proofs.check_binding(&presentation.proof, &vc.credential)?;

        if let Some(disclosure) = &presentation.signature_disclosure {
            let nonce = request
                .and_then(|r| r.nonce.as_deref())
                .unwrap_or(disclosure.nonce.as_str());
            let key = self
                .keys
                .resolve_for(&vc.proof.verification_method, &vc.issuer)
                .map_err(|e| ProofFailure::DisclosureSignature(e.to_string()))?;
            let revealed = &presentation.proof.revealed_attributes;
            if !verify_disclosure_proof(&self.scheme, disclosure, revealed, &key, nonce) {
                return Err(ProofFailure::DisclosureSignature(
                    "opening does not match the revealed attributes".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn current_root(&self, holder: &HolderId) -> Result<Option<FieldElement>, ProofFailure> {
        match &self.roots {
            RootPolicy::Published(registry) => registry
                .current_root(holder)
                .map(Some)
                .ok_or_else(|| ProofFailure::RootUnavailable(format!("{holder} has published no root"))),
            RootPolicy::Pinned(root) => Ok(Some(*root)),
            RootPolicy::AcceptAny => Ok(None),
        }
    }

    fn check_proof(&self, presentation: &Presentation) -> Result<(), ProofFailure> {
        let expected = self.current_root(&presentation.holder)?;
        self.proofs.check(&presentation.proof, expected.as_ref())
    }

    fn check_revocation(&self, id: &CredentialId) -> CheckOutcome {
        let Some(registry) = &self.registry else {
            return CheckOutcome::pass("no registry attached; revocation not checked");
        };
        match registry.is_revoked(id) {
            Some(false) => CheckOutcome::pass(""),
            Some(true) => CheckOutcome::fail(format!("credential {id} is revoked")),
            None => CheckOutcome::fail(format!("credential {id} is not registered")),
        }
    }
}

fn check_requirements(
    presentation: &Presentation,
    request: Option<&PresentationRequest>,
) -> (CheckOutcome, Vec<PredicateCheck>) {
    let Some(request) = request else {
        return (CheckOutcome::pass("no request"), Vec::new());
    };
    let revealed = &presentation.proof.revealed_attributes;
    let mut checks: Vec<PredicateCheck> = request
        .required_fields
        .iter()
        .map(|field| {
            let present = revealed.contains_key(field);
            PredicateCheck {
                field: field.clone(),
                satisfied: present,
                reason: if present {
                    String::new()
                } else {
                    format!("{field} not revealed")
                },
            }
        })
        .collect();
    checks.extend(request.predicates().iter().map(|p| p.check_revealed(revealed)));

    let type_ok = presentation.credential.credential.credential_type == request.credential_type;
    let mut reasons: Vec<String> = checks
        .iter()
        .filter(|c| !c.satisfied)
        .map(|c| c.reason.clone())
        .collect();
    if !type_ok {
        reasons.insert(
            0,
            format!(
                "credential type {} does not match {}",
                presentation.credential.credential.credential_type, request.credential_type
            ),
        );
    }
    let outcome = if reasons.is_empty() {
        CheckOutcome::pass("")
    } else {
        CheckOutcome::fail(reasons.join("; "))
    };
    (outcome, checks)
}
