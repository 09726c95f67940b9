//! # Disclosure Proof Properties
//!
//! End-to-end checks over the public zkp API: persistence round-trips,
//! proof acceptance, root pinning, inclusive thresholds, and disclosure
//! minimality.

use std::collections::BTreeMap;
use std::sync::Arc;

use certproof_core::{CertError, ErrorKind, HolderId, Score, Timestamp};
use certproof_crypto::FieldHasher;
use certproof_vc::{Credential, CredentialAttributes, Predicate, DEFAULT_CREDENTIAL_TYPE};
use certproof_zkp::{CredentialAccumulator, ProofGenerator, ProofVerifier, LEDGER_FILE, SNAPSHOT_FILE};
use proptest::prelude::*;

fn hasher() -> Arc<FieldHasher> {
    Arc::new(FieldHasher::new())
}

fn credential(serial: &str, overall: Score) -> Credential {
    let mut scores = BTreeMap::new();
    scores.insert("overall".to_string(), overall);
    scores.insert("listening".to_string(), Score::from_hundredths(700));
    CredentialAttributes {
        holder: Some(HolderId::new("holder-grace")),
        name: Some("Grace Hopper".to_string()),
        test_name: Some("Academic English".to_string()),
        serial_number: Some(serial.to_string()),
        certification_date: Some(Timestamp::from_ymd(2025, 6, 1).unwrap()),
        expiry_date: Some(Timestamp::from_ymd(2027, 6, 1).unwrap()),
        scores: Some(scores),
        ..Default::default()
    }
    .into_credential(DEFAULT_CREDENTIAL_TYPE)
    .unwrap()
}

fn reveal(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Scenario A
// ---------------------------------------------------------------------------

#[test]
fn test_reveal_name_with_hidden_overall_threshold() {
    let mut ledger = CredentialAccumulator::new(hasher());
    let c = credential("SN-A", Score::from_hundredths(800));
    ledger.add(c.clone()).unwrap();

    let generator = ProofGenerator::new(&ledger);
    let proof = generator
        .generate(
            &c.id,
            &reveal(&["name"]),
            &[Predicate::at_least("scores.overall", Score::from_hundredths(700))],
        )
        .unwrap();
    assert_eq!(proof.revealed_attributes.len(), 1);
    assert_eq!(proof.revealed_attributes["name"], "Grace Hopper");

    let verifier = ProofVerifier::new(ledger.hasher().clone());
    assert!(verifier.verify(&proof, None));
    assert!(verifier.verify(&proof, Some(&ledger.root())));

    let err: CertError = generator
        .generate(
            &c.id,
            &reveal(&["name"]),
            &[Predicate::at_least("scores.overall", Score::from_hundredths(850))],
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Threshold);
    assert!(err.to_string().contains("scores.overall"));
}

#[test]
fn test_stale_root_is_rejected_when_pinned() {
    let mut ledger = CredentialAccumulator::new(hasher());
    let c = credential("SN-1", Score::from_hundredths(800));
    ledger.add(c.clone()).unwrap();
    let proof = ProofGenerator::new(&ledger)
        .generate(&c.id, &reveal(&["name"]), &[])
        .unwrap();

    ledger.add(credential("SN-2", Score::from_hundredths(650))).unwrap();
    let verifier = ProofVerifier::new(ledger.hasher().clone());
    assert!(verifier.verify(&proof, None));
    assert!(!verifier.verify(&proof, Some(&ledger.root())));
}

#[test]
fn test_proof_verifies_in_an_independent_verifier() {
    let mut ledger = CredentialAccumulator::new(hasher());
    let c = credential("SN-1", Score::from_hundredths(720));
    ledger.add(c.clone()).unwrap();
    let proof = ProofGenerator::new(&ledger)
        .generate(&c.id, &reveal(&["scores.listening"]), &[])
        .unwrap();

    let json = serde_json::to_string(&proof).unwrap();
    let received = serde_json::from_str(&json).unwrap();
    assert!(ProofVerifier::new(hasher()).verify(&received, proof.root.as_ref()));
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_save_and_load_restore_root_and_side_table() {
    let dir = tempfile::tempdir().unwrap();
    let mut ledger = CredentialAccumulator::initialize().await;
    for (i, overall) in [650u32, 700, 800, 900].iter().enumerate() {
        ledger
            .add(credential(&format!("SN-{i}"), Score::from_hundredths(*overall)))
            .unwrap();
    }
    ledger.save(dir.path()).await.unwrap();
    assert!(dir.path().join(SNAPSHOT_FILE).exists());
    assert!(dir.path().join(LEDGER_FILE).exists());

    let loaded = CredentialAccumulator::load(ledger.hasher().clone(), dir.path())
        .await
        .unwrap();
    assert_eq!(loaded.root(), ledger.root());
    assert_eq!(loaded.entries(), ledger.entries());
}

#[tokio::test]
async fn test_load_rejects_tampered_snapshot_root() {
    let dir = tempfile::tempdir().unwrap();
    let mut ledger = CredentialAccumulator::new(hasher());
    ledger.add(credential("SN-0", Score::from_hundredths(700))).unwrap();
    ledger.save(dir.path()).await.unwrap();

    let path = dir.path().join(SNAPSHOT_FILE);
    let mut snapshot: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    snapshot["root"] = serde_json::to_value(certproof_core::FieldElement::from_u64(5)).unwrap();
    std::fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).unwrap();

    let err = CredentialAccumulator::load(hasher(), dir.path()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
}

#[tokio::test]
async fn test_load_from_missing_directory_is_persistence_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = CredentialAccumulator::load(hasher(), &dir.path().join("absent"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

const PATHS: [&str; 6] = [
    "name",
    "testName",
    "serialNumber",
    "expiryDate",
    "scores.overall",
    "scores.listening",
];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_threshold_succeeds_iff_value_at_least_threshold(value in 0u32..=900, threshold in 0u32..=900) {
        let mut ledger = CredentialAccumulator::new(hasher());
        let c = credential("SN-P", Score::from_hundredths(value));
        ledger.add(c.clone()).unwrap();
        let result = ProofGenerator::new(&ledger).generate(
            &c.id,
            &[],
            &[Predicate::at_least("scores.overall", Score::from_hundredths(threshold))],
        );
        prop_assert_eq!(result.is_ok(), value >= threshold);
        if let Err(e) = result {
            prop_assert_eq!(e.kind(), ErrorKind::Threshold);
        }
    }

    #[test]
    fn test_revealed_keys_are_exactly_requested(mask in prop::collection::vec(any::<bool>(), PATHS.len())) {
        let mut ledger = CredentialAccumulator::new(hasher());
        let c = credential("SN-M", Score::from_hundredths(800));
        ledger.add(c.clone()).unwrap();
        let requested: Vec<String> = PATHS
            .iter()
            .zip(&mask)
            .filter(|(_, keep)| **keep)
            .map(|(p, _)| p.to_string())
            .collect();
        let proof = ProofGenerator::new(&ledger).generate(&c.id, &requested, &[]).unwrap();
        let keys: Vec<String> = proof.revealed_attributes.keys().cloned().collect();
        let mut expected = requested.clone();
        expected.sort();
        prop_assert_eq!(keys, expected);
        prop_assert!(ProofVerifier::new(ledger.hasher().clone())
            .check_for_credential(&proof, &c, Some(&ledger.root()))
            .is_ok());
    }

    #[test]
    fn test_every_accumulated_credential_proves(count in 1usize..6) {
        let mut ledger = CredentialAccumulator::new(hasher());
        let credentials: Vec<Credential> = (0..count)
            .map(|i| credential(&format!("SN-{i}"), Score::from_hundredths(500 + i as u32 * 50)))
            .collect();
        for c in &credentials {
            ledger.add(c.clone()).unwrap();
        }
        let verifier = ProofVerifier::new(ledger.hasher().clone());
        let root = ledger.root();
        for c in &credentials {
            let proof = ProofGenerator::new(&ledger).generate(&c.id, &[], &[]).unwrap();
            prop_assert!(verifier.verify(&proof, Some(&root)));
        }
    }
}
