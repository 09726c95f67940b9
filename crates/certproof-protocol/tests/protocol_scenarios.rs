//! # Protocol Scenarios
//!
//! Issuer, holder, verifier, and registry driven through their public
//! APIs, exchanging payloads the way separate processes would.

use std::collections::BTreeMap;

use certproof_core::{CredentialId, ErrorKind, HolderId, IssuerId, ProofFailure, Score, Timestamp, VerifierId};
use certproof_crypto::field_hasher;
use certproof_protocol::{
    CheckName, CredentialState, Holder, Issuer, Operation, PerformanceManager, Presentation,
    PresentationRequest, ProtocolConfig, Registry, RootPolicy, Verifier,
};
use certproof_vc::{CredentialAttributes, VerifiableCredential};

const ISSUER: &str = "did:example:testing-board";

fn attributes(overall: u32, certified: (i32, u32, u32)) -> CredentialAttributes {
    let mut scores = BTreeMap::new();
    scores.insert("overall".to_string(), Score::from_hundredths(overall));
    scores.insert("reading".to_string(), Score::from_hundredths(700));
    scores.insert("writing".to_string(), Score::from_hundredths(650));
    let certification = Timestamp::from_ymd(certified.0, certified.1, certified.2).unwrap();
    CredentialAttributes {
        holder: Some(HolderId::new("holder-ada")),
        name: Some("Ada Lovelace".to_string()),
        test_name: Some("Academic English".to_string()),
        serial_number: Some(format!("SN-{overall}-{}", certified.0)),
        certification_date: Some(certification),
        expiry_date: Some(certification.plus_days(730)),
        scores: Some(scores),
        ..Default::default()
    }
}

fn now() -> Timestamp {
    Timestamp::from_ymd(2025, 9, 1).unwrap()
}

struct World {
    issuer: Issuer,
    holder: Holder,
    verifier: Verifier,
    registry: Registry,
    metrics: PerformanceManager,
}

async fn world() -> World {
    let config = ProtocolConfig::default();
    let metrics = PerformanceManager::new(false);
    let registry = Registry::new();
    let issuer = Issuer::new(IssuerId::new(ISSUER), &config, metrics.clone())
        .await
        .unwrap();
    let hasher = field_hasher().await;

    let mut holder = Holder::new(HolderId::new("holder-ada"), hasher.clone(), &config, metrics.clone());
    holder.trust_issuer(issuer.id().clone());
    issuer.publish_key(holder.key_directory_mut());

    let mut verifier = Verifier::new(VerifierId::new("university"), hasher, registry.clone(), metrics.clone());
    verifier.trust_issuer(issuer.id().clone());
    issuer.publish_key(verifier.key_directory_mut());

    World {
        issuer,
        holder,
        verifier,
        registry,
        metrics,
    }
}

impl World {
    fn issue_and_store(&mut self, attrs: CredentialAttributes) -> VerifiableCredential {
        let vc = self.issuer.issue(attrs).unwrap();
        self.issuer.register(&self.registry, &vc.credential.id).unwrap();
        // Over the wire.
        let json = serde_json::to_string(&vc).unwrap();
        self.holder
            .store(VerifiableCredential::from_json(&json).unwrap())
            .unwrap();
        self.holder.publish_root(&self.registry);
        vc
    }

    fn present(&mut self, request: &PresentationRequest) -> Presentation {
        let presentation = self.holder.present_at(request, &now()).unwrap();
        let json = serde_json::to_string(&presentation).unwrap();
        serde_json::from_str(&json).unwrap()
    }
}

fn admission() -> PresentationRequest {
    PresentationRequest::new(VerifierId::new("university"), "admission")
        .require("name")
        .require("scores.overall")
        .min_score("overall", Score::from_hundredths(700))
}

#[tokio::test]
async fn test_issue_store_present_verify() {
    let mut w = world().await;
    let vc = w.issue_and_store(attributes(800, (2025, 3, 1)));
    let request = admission().with_nonce("nonce-1");
    let presentation = w.present(&request);

    assert_eq!(presentation.credential.credential.id, vc.credential.id);
    let keys: Vec<&str> = presentation.proof.revealed_fields().collect();
    assert_eq!(keys, ["name", "scores.overall"]);
    assert!(presentation.signature_disclosure.is_some());

    let report = w.verifier.verify_at(&presentation, Some(&request), &now());
    assert!(report.accepted, "{report:?}");
    assert!(report.failed_checks().is_empty());
    assert_eq!(report.requirement_checks.len(), 3);

    w.holder.record_outcome(&vc.credential.id, report.accepted).unwrap();
    assert_eq!(
        w.holder.lifecycle(&vc.credential.id).unwrap().state,
        CredentialState::Verified
    );
    assert_eq!(w.metrics.report(Operation::Verify).count, 1);
    assert_eq!(w.metrics.report(Operation::Issue).count, 1);
}

#[tokio::test]
async fn test_newer_higher_credential_is_selected() {
    let mut w = world().await;
    w.issue_and_store(attributes(700, (2024, 6, 1)));
    let newer = w.issue_and_store(attributes(800, (2025, 3, 1)));

    let request = PresentationRequest::new(VerifierId::new("university"), "admission")
        .require("scores.overall")
        .min_score("overall", Score::from_hundredths(750));
    let presentation = w.present(&request);
    assert_eq!(presentation.credential.credential.id, newer.credential.id);
    assert_eq!(presentation.proof.revealed_attributes["scores.overall"], "8.0");
    assert!(w.verifier.verify_at(&presentation, Some(&request), &now()).accepted);
}

#[tokio::test]
async fn test_tampered_score_fails_signature() {
    let mut w = world().await;
    w.issue_and_store(attributes(650, (2025, 3, 1)));
    let request = PresentationRequest::new(VerifierId::new("university"), "admission").require("name");
    let mut presentation = w.present(&request);

    presentation
        .credential
        .credential
        .scores
        .insert("overall".to_string(), Score::from_hundredths(900));

    let report = w.verifier.verify_at(&presentation, Some(&request), &now());
    assert!(!report.accepted);
    assert_eq!(report.failed_checks(), [CheckName::Signature]);
    assert!(report.proof.passed);
    assert_eq!(report.proof_failure, None);
    assert!(report.requirements.passed);
}

#[tokio::test]
async fn test_revoked_credential_still_proves_membership() {
    let mut w = world().await;
    let vc = w.issue_and_store(attributes(800, (2025, 3, 1)));
    let request = admission();

    let presentation = w.present(&request);
    assert!(w.verifier.verify_at(&presentation, Some(&request), &now()).accepted);

    let impostor = Issuer::new(
        IssuerId::new("did:example:impostor"),
        &ProtocolConfig::default(),
        PerformanceManager::new(false),
    )
    .await
    .unwrap();
    assert!(!w.registry.revoke(&vc.credential.id, impostor.id()));
    assert_eq!(w.registry.is_revoked(&vc.credential.id), Some(false));

    assert!(w.issuer.revoke(&w.registry, &vc.credential.id));
    let report = w.verifier.verify_at(&presentation, Some(&request), &now());
    assert!(!report.accepted);
    assert!(!report.not_revoked.passed);
    assert!(report.proof.passed);
    assert_eq!(report.failed_checks(), [CheckName::NotRevoked]);

    let mut permissive = Verifier::without_revocation_checks(
        VerifierId::new("lenient"),
        field_hasher().await,
        RootPolicy::Pinned(w.holder.root()),
        PerformanceManager::new(false),
    );
    permissive.trust_issuer(w.issuer.id().clone());
    w.issuer.publish_key(permissive.key_directory_mut());
    let report = permissive.verify_at(&presentation, Some(&request), &now());
    assert!(report.accepted);
    assert!(report.not_revoked.detail.contains("no registry"));
}

#[tokio::test]
async fn test_unregistered_credential_fails_revocation_check() {
    let mut w = world().await;
    let vc = w.issuer.issue(attributes(800, (2025, 3, 1))).unwrap();
    w.holder.store(vc).unwrap();
    w.holder.publish_root(&w.registry);
    let request = admission();
    let presentation = w.present(&request);
    let report = w.verifier.verify_at(&presentation, Some(&request), &now());
    assert_eq!(report.failed_checks(), [CheckName::NotRevoked]);
}

#[tokio::test]
async fn test_trust_is_checked_live() {
    let mut w = world().await;
    w.issue_and_store(attributes(800, (2025, 3, 1)));
    let request = admission();
    let presentation = w.present(&request);

    let earlier = w.verifier.verify_at(&presentation, Some(&request), &now());
    assert!(earlier.accepted);

    w.verifier.trust_set().distrust(w.issuer.id());
    let later = w.verifier.verify_at(&presentation, Some(&request), &now());
    assert_eq!(later.failed_checks(), [CheckName::IssuerTrusted]);
    assert!(earlier.accepted);
}

#[tokio::test]
async fn test_hidden_threshold_is_unmet_for_the_verifier() {
    let mut w = world().await;
    w.issue_and_store(attributes(800, (2025, 3, 1)));
    let request = PresentationRequest::new(VerifierId::new("university"), "admission")
        .require("name")
        .min_score("overall", Score::from_hundredths(700));
    let presentation = w.present(&request);
    assert_eq!(presentation.proof.revealed_attributes.len(), 1);

    let report = w.verifier.verify_at(&presentation, Some(&request), &now());
    assert!(report.proof.passed);
    assert!(!report.requirements.passed);
    assert!(report.requirements.detail.contains("scores.overall not revealed"));

    let revealing = request.require("scores.overall");
    let presentation = w.present(&revealing);
    assert!(w.verifier.verify_at(&presentation, Some(&revealing), &now()).accepted);
}

#[tokio::test]
async fn test_stale_root_is_rejected_by_default() {
    let mut w = world().await;
    w.issue_and_store(attributes(800, (2025, 3, 1)));
    let request = admission();
    let presentation = w.present(&request);
    assert!(w.verifier.verify_at(&presentation, Some(&request), &now()).accepted);

    w.issue_and_store(attributes(720, (2025, 4, 1)));
    w.issue_and_store(attributes(710, (2025, 5, 1)));
    assert_ne!(Some(w.holder.root()), presentation.proof.root);

    let report = w.verifier.verify_at(&presentation, Some(&request), &now());
    assert!(!report.accepted);
    assert_eq!(report.failed_checks(), [CheckName::Proof]);
    assert!(matches!(report.proof_failure, Some(ProofFailure::RootMismatch { .. })));

    let fresh = w.present(&request);
    assert!(w.verifier.verify_at(&fresh, Some(&request), &now()).accepted);
}

#[tokio::test]
async fn test_unpublished_root_fails_the_proof_check() {
    let mut w = world().await;
    let vc = w.issuer.issue(attributes(800, (2025, 3, 1))).unwrap();
    w.issuer.register(&w.registry, &vc.credential.id).unwrap();
    w.holder.store(vc).unwrap();
    let request = admission();
    let presentation = w.present(&request);

    let report = w.verifier.verify_at(&presentation, Some(&request), &now());
    assert_eq!(report.failed_checks(), [CheckName::Proof]);
    assert!(matches!(report.proof_failure, Some(ProofFailure::RootUnavailable(_))));
}

#[tokio::test]
async fn test_pinned_and_permissive_root_policies() {
    let mut w = world().await;
    w.issue_and_store(attributes(800, (2025, 3, 1)));
    let request = admission();
    let presentation = w.present(&request);
    let presented_root = w.holder.root();
    w.issue_and_store(attributes(720, (2025, 4, 1)));

    w.verifier.pin_root(presented_root);
    assert!(w.verifier.verify_at(&presentation, Some(&request), &now()).accepted);

    w.verifier.pin_root(w.holder.root());
    let report = w.verifier.verify_at(&presentation, Some(&request), &now());
    assert!(matches!(report.proof_failure, Some(ProofFailure::RootMismatch { .. })));

    let mut lenient = Verifier::accepting_any_root(
        VerifierId::new("lenient"),
        field_hasher().await,
        w.registry.clone(),
        PerformanceManager::new(false),
    );
    assert!(matches!(lenient.root_policy(), RootPolicy::AcceptAny));
    lenient.trust_issuer(w.issuer.id().clone());
    w.issuer.publish_key(lenient.key_directory_mut());
    assert!(lenient.verify_at(&presentation, Some(&request), &now()).accepted);
}

#[tokio::test]
async fn test_expiry_rejection_is_configurable() {
    let mut w = world().await;
    w.issue_and_store(attributes(800, (2025, 3, 1)));
    let request = admission();
    let presentation = w.present(&request);
    let much_later = Timestamp::from_ymd(2030, 1, 1).unwrap();

    let report = w.verifier.verify_at(&presentation, Some(&request), &much_later);
    assert!(report.expired);
    assert_eq!(report.failed_checks(), [CheckName::Signature]);

    w.verifier.set_reject_expired(false);
    let report = w.verifier.verify_at(&presentation, Some(&request), &much_later);
    assert!(report.accepted);
    assert!(report.signature.detail.contains("expired"));
}

#[tokio::test]
async fn test_presentation_by_another_holder_is_not_bound() {
    let mut w = world().await;
    w.issue_and_store(attributes(800, (2025, 3, 1)));
    let request = admission();
    let mut presentation = w.present(&request);
    presentation.holder = HolderId::new("holder-eve");
    let report = w.verifier.verify_at(&presentation, Some(&request), &now());
    assert_eq!(report.first_failure(), Some(CheckName::Signature));
    assert!(matches!(report.binding_failure, Some(ProofFailure::CredentialBinding(_))));
}

#[tokio::test]
async fn test_edited_revealed_value_fails_signature_binding() {
    let mut w = world().await;
    w.issue_and_store(attributes(800, (2025, 3, 1)));
    let request = admission().with_nonce("n");
    let mut presentation = w.present(&request);
    presentation
        .proof
        .revealed_attributes
        .insert("scores.overall".into(), serde_json::json!("9.0"));
    let report = w.verifier.verify_at(&presentation, Some(&request), &now());
    assert_eq!(report.failed_checks(), [CheckName::Signature]);
    assert!(report.proof.passed);
    assert_eq!(
        report.binding_failure,
        Some(ProofFailure::RevealedMismatch("scores.overall".into()))
    );
}

#[tokio::test]
async fn test_presentation_errors() {
    let mut w = world().await;
    let request = admission();
    let err = w.holder.present_at(&request, &now()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    w.issue_and_store(attributes(650, (2025, 3, 1)));
    let err = w.holder.present_at(&request, &now()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Threshold);

    assert!(w.holder.record_outcome(&CredentialId::new("nope"), true).is_err());
}
