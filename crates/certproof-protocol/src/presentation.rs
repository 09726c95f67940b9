//! Presentation request and response payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use certproof_core::{CertError, HolderId, Score, VerifierId};
use certproof_crypto::SelectiveDisclosureProof;
use certproof_vc::{Predicate, VerifiableCredential, DEFAULT_CREDENTIAL_TYPE, OVERALL_SCORE};
use certproof_zkp::DisclosureProof;

/// What a verifier asks a holder to present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationRequest {
    /// Requesting verifier.
    pub verifier: VerifierId,
    /// Why the verifier wants the credential.
    pub purpose: String,
    /// Expected credential type.
    #[serde(default = "default_credential_type")]
    pub credential_type: String,
    /// Attribute paths the holder must reveal.
    pub required_fields: Vec<String>,
    /// Minimum scores keyed by score name (`overall`) or full path
    /// (`scores.overall`).
    #[serde(default)]
    pub minimum_scores: BTreeMap<String, Score>,
    /// Freshness nonce for the selective-disclosure signature proof.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

fn default_credential_type() -> String {
    DEFAULT_CREDENTIAL_TYPE.to_string()
}

impl PresentationRequest {
    /// Request with no requirements yet.
    pub fn new(verifier: VerifierId, purpose: impl Into<String>) -> Self {
        Self {
            verifier,
            purpose: purpose.into(),
            credential_type: default_credential_type(),
            required_fields: Vec::new(),
            minimum_scores: BTreeMap::new(),
            nonce: None,
        }
    }

    /// Require `path` to be revealed.
    pub fn require(mut self, path: impl Into<String>) -> Self {
        self.required_fields.push(path.into());
        self
    }

    /// Require a minimum score.
    pub fn min_score(mut self, key: impl Into<String>, threshold: Score) -> Self {
        self.minimum_scores.insert(key.into(), threshold);
        self
    }

    pub fn with_credential_type(mut self, credential_type: impl Into<String>) -> Self {
        self.credential_type = credential_type.into();
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Minimum scores as `Gte` predicates on full attribute paths.
    pub fn predicates(&self) -> Vec<Predicate> {
        self.minimum_scores
            .iter()
            .map(|(key, threshold)| Predicate::at_least(score_path(key), *threshold))
            .collect()
    }

    /// Threshold on the overall score, if requested.
    pub fn overall_threshold(&self) -> Option<Score> {
        self.minimum_scores
            .iter()
            .find(|(key, _)| score_path(key) == format!("scores.{OVERALL_SCORE}"))
            .map(|(_, t)| *t)
    }

    /// Structural checks.
    pub fn validate(&self) -> Result<(), CertError> {
        let malformed = |why: String| CertError::Validation(format!("malformed request: {why}"));
        if self.verifier.as_str().trim().is_empty() {
            return Err(malformed("verifier is empty".into()));
        }
        if self.credential_type.trim().is_empty() {
            return Err(malformed("credentialType is empty".into()));
        }
        if let Some(bad) = self
            .required_fields
            .iter()
            .chain(self.minimum_scores.keys())
            .find(|f| f.trim().is_empty())
        {
            return Err(malformed(format!("empty field name {bad:?}")));
        }
        Ok(())
    }
}

fn score_path(key: &str) -> String {
    if key.contains('.') {
        key.to_string()
    } else {
        format!("scores.{key}")
    }
}

/// What a holder sends back: one credential and one disclosure proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub holder: HolderId,
    pub credential: VerifiableCredential,
    pub proof: DisclosureProof,
    /// Issuer-signature opening of the revealed attributes, when the
    /// request carried a nonce.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_disclosure: Option<SelectiveDisclosureProof>,
}
