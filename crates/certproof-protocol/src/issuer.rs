//! # Issuer
//!
//! Signs credentials, commits each one into the issuer's own accumulator,
//! registers them with a [`Registry`], and revokes them there.

use std::collections::BTreeMap;

use certproof_core::{BatchOutcome, CertError, CredentialId, FieldElement, IssuerId, Timestamp};
use certproof_crypto::{Ed25519KeyPair, Ed25519PublicKey, SignatureManager};
use certproof_vc::{CredentialAttributes, KeyDirectory, VerifiableCredential};
use certproof_zkp::CredentialAccumulator;

use crate::config::ProtocolConfig;
use crate::lifecycle::{CredentialLifecycle, CredentialState};
use crate::performance::{Operation, PerformanceManager};
use crate::registry::Registry;

/// A credential-issuing party.
#[derive(Debug)]
pub struct Issuer {
    id: IssuerId,
    verification_method: String,
    key: Ed25519KeyPair,
    scheme: SignatureManager,
    accumulator: CredentialAccumulator,
    lifecycles: BTreeMap<CredentialId, CredentialLifecycle>,
    credential_type: String,
    metrics: PerformanceManager,
}

impl Issuer {
    /// Create an issuer with a freshly generated signing key.
    pub async fn new(
        id: IssuerId,
        config: &ProtocolConfig,
        metrics: PerformanceManager,
    ) -> Result<Self, CertError> {
        let scheme = SignatureManager::new();
        let key = scheme.generate_key_pair_async().await?;
        Ok(Self::with_key(id, key, CredentialAccumulator::initialize().await, config, metrics))
    }

    /// Create an issuer from an existing key and accumulator.
    pub fn with_key(
        id: IssuerId,
        key: Ed25519KeyPair,
        accumulator: CredentialAccumulator,
        config: &ProtocolConfig,
        metrics: PerformanceManager,
    ) -> Self {
        Self {
            verification_method: format!("{id}#key-1"),
            id,
            key,
            scheme: SignatureManager::new(),
            accumulator,
            lifecycles: BTreeMap::new(),
            credential_type: config.credential_type.clone(),
            metrics,
        }
    }

    pub fn id(&self) -> &IssuerId {
        &self.id
    }

    pub fn verification_method(&self) -> &str {
        &self.verification_method
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        self.key.public_key()
    }

    /// Publish this issuer's verification key into `directory`.
    pub fn publish_key(&self, directory: &mut KeyDirectory) {
        directory.register(self.verification_method.clone(), self.id.clone(), self.public_key());
    }

    /// The issuer's view of the accumulator.
    pub fn accumulator(&self) -> &CredentialAccumulator {
        &self.accumulator
    }

    pub fn root(&self) -> FieldElement {
        self.accumulator.root()
    }

    pub fn lifecycle(&self, id: &CredentialId) -> Option<&CredentialLifecycle> {
        self.lifecycles.get(id)
    }

    /// Build, sign, and commit a credential.
    pub fn issue(&mut self, attributes: CredentialAttributes) -> Result<VerifiableCredential, CertError> {
        let metrics = self.metrics.clone();
        metrics.time(Operation::Issue, || self.issue_inner(attributes))
    }

    fn issue_inner(&mut self, attributes: CredentialAttributes) -> Result<VerifiableCredential, CertError> {
        let credential = attributes.into_credential(&self.credential_type)?;
        if self.accumulator.get(&credential.id).is_some() {
            return Err(CertError::Duplicate {
                kind: "credential",
                id: credential.id.to_string(),
            });
        }
        let vc = VerifiableCredential::issue(
            credential,
            self.id.clone(),
            Timestamp::now(),
            &self.key,
            self.verification_method.clone(),
            &self.scheme,
        )?;
        let index = self.accumulator.add(vc.credential.clone())?;
        self.lifecycles.insert(
            vc.credential.id.clone(),
            CredentialLifecycle::issued(vc.credential.id.clone()),
        );
        tracing::info!(
            issuer = %self.id,
            credential_id = %vc.credential.id,
            holder = %vc.credential.holder,
            index,
            "credential issued"
        );
        Ok(vc)
    }

    /// Issue several credentials, continuing past failures.
    pub fn issue_batch(&mut self, batch: Vec<CredentialAttributes>) -> BatchOutcome<VerifiableCredential> {
        batch.into_iter().map(|a| self.issue(a)).collect()
    }

    /// Record an issued credential in `registry`.
    pub fn register(&mut self, registry: &Registry, id: &CredentialId) -> Result<(), CertError> {
        let entry = self
            .accumulator
            .get(id)
            .ok_or_else(|| CertError::not_found("credential", id))?;
        registry.register(
            id.clone(),
            self.id.clone(),
            entry.credential.holder.clone(),
            entry.index,
        )?;
        if let Some(lc) = self.lifecycles.get_mut(id) {
            lc.transition(CredentialState::Registered, "recorded in registry")?;
        }
        Ok(())
    }

    /// Revoke a credential this issuer registered.
    pub fn revoke(&mut self, registry: &Registry, id: &CredentialId) -> bool {
        let start = std::time::Instant::now();
        let revoked = registry.revoke(id, &self.id);
        if revoked {
            if let Some(lc) = self.lifecycles.get_mut(id) {
                lc.mark_registered();
                if let Err(e) = lc.revoke() {
                    tracing::warn!(credential_id = %id, error = %e, "lifecycle not updated");
                }
            }
        }
        self.metrics.record(Operation::Revoke, start.elapsed(), revoked);
        revoked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::attributes;
    use certproof_core::ErrorKind;

    async fn issuer(name: &str) -> Issuer {
        Issuer::new(IssuerId::new(name), &ProtocolConfig::default(), PerformanceManager::new(false))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_issue_signs_and_commits() {
        let mut issuer = issuer("did:example:board").await;
        let vc = issuer.issue(attributes("ada", 800, (2025, 1, 1))).unwrap();

        let mut keys = KeyDirectory::new();
        issuer.publish_key(&mut keys);
        assert!(vc.verify_with_directory(&SignatureManager::new(), &keys).ok);
        assert_eq!(vc.issuer, *issuer.id());
        assert_eq!(issuer.accumulator().len(), 1);
        assert_eq!(
            issuer.lifecycle(&vc.credential.id).unwrap().state,
            CredentialState::Issued
        );
    }

    #[tokio::test]
    async fn test_missing_attributes_fail_issue() {
        let mut issuer = issuer("did:example:board").await;
        let mut attrs = attributes("ada", 800, (2025, 1, 1));
        attrs.name = None;
        assert_eq!(issuer.issue(attrs).unwrap_err().kind(), ErrorKind::Validation);
        assert!(issuer.accumulator().is_empty());
    }

    #[tokio::test]
    async fn test_batch_and_duplicates() {
        let mut issuer = issuer("did:example:board").await;
        let mut dup = attributes("ada", 800, (2025, 1, 1));
        dup.id = Some(CredentialId::new("cred-fixed"));
        let outcome = issuer.issue_batch(vec![
            dup.clone(),
            dup,
            attributes("bo", 650, (2025, 2, 1)),
        ]);
        assert_eq!(outcome.succeeded(), 2);
        assert_eq!(outcome.get(1).unwrap().as_ref().unwrap_err().kind(), ErrorKind::Duplicate);
    }

    #[tokio::test]
    async fn test_register_and_revoke() {
        let registry = Registry::new();
        let mut board = issuer("did:example:board").await;
        let mut other = issuer("did:example:other").await;
        let vc = board.issue(attributes("ada", 800, (2025, 1, 1))).unwrap();
        let id = vc.credential.id.clone();

        board.register(&registry, &id).unwrap();
        assert_eq!(registry.entry(&id).unwrap().accumulator_index, 1);
        assert_eq!(board.lifecycle(&id).unwrap().state, CredentialState::Registered);

        assert!(!other.revoke(&registry, &id));
        assert_eq!(registry.is_revoked(&id), Some(false));

        let root = board.root();
        assert!(board.revoke(&registry, &id));
        assert!(board.lifecycle(&id).unwrap().revoked);
        assert_eq!(board.root(), root);
    }
}
