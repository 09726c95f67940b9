//! # Revocation Registry
//!
//! Records who issued each registered credential and whether it has been
//! revoked. The revoked flag is the only mutable field and only the
//! recorded issuer may set it. Authorization is identity equality on
//! [`IssuerId`]; revocation itself carries no signature.
//!
//! Revocation never touches any accumulator. A revoked credential's
//! membership proof stays valid; verifiers wired to a registry report it
//! through their not-revoked check.
//!
//! ## Published roots
//!
//! Holders publish their current accumulator root here. A verifier wired
//! to the registry checks each disclosure proof against the presenting
//! holder's latest published root, so a proof made against an earlier
//! accumulator state is rejected once the holder publishes a newer one.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use certproof_core::{CertError, CredentialId, FieldElement, HolderId, IssuerId, Timestamp};

/// One registered credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub credential_id: CredentialId,
    pub issuer: IssuerId,
    pub holder: HolderId,
    pub revoked: bool,
    pub accumulator_index: u64,
    pub registered_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<Timestamp>,
}

/// A holder's latest accumulator root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedRoot {
    pub holder: HolderId,
    pub root: FieldElement,
    pub published_at: Timestamp,
}

/// Shared registry handle. Clones see the same entries.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Arc<RwLock<BTreeMap<CredentialId, RegistryEntry>>>,
    roots: Arc<RwLock<BTreeMap<HolderId, PublishedRoot>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a credential. Registering the same id twice is a duplicate.
    pub fn register(
        &self,
        credential_id: CredentialId,
        issuer: IssuerId,
        holder: HolderId,
        accumulator_index: u64,
    ) -> Result<(), CertError> {
        let mut entries = self.entries.write();
        if entries.contains_key(&credential_id) {
            return Err(CertError::Duplicate {
                kind: "registry entry",
                id: credential_id.to_string(),
            });
        }
        tracing::info!(credential_id = %credential_id, issuer = %issuer, accumulator_index, "credential registered");
        entries.insert(
            credential_id.clone(),
            RegistryEntry {
                credential_id,
                issuer,
                holder,
                revoked: false,
                accumulator_index,
                registered_at: Timestamp::now(),
                revoked_at: None,
            },
        );
        Ok(())
    }

    /// Revoke `id` on behalf of `acting_issuer`.
    ///
    /// Returns `false` when `id` is unknown or `acting_issuer` is not the
    /// recorded issuer. Revoking an already revoked credential returns
    /// `true` and keeps the original revocation time.
    pub fn revoke(&self, id: &CredentialId, acting_issuer: &IssuerId) -> bool {
        match self.try_revoke(id, acting_issuer) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(credential_id = %id, acting_issuer = %acting_issuer, error = %e, "revocation refused");
                false
            }
        }
    }

    /// [`revoke`](Self::revoke) with the refusal reason as an error.
    pub fn try_revoke(&self, id: &CredentialId, acting_issuer: &IssuerId) -> Result<(), CertError> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| CertError::not_found("registry entry", id.as_str()))?;
        if entry.issuer != *acting_issuer {
            return Err(CertError::Authorization {
                actor: acting_issuer.to_string(),
                action: "revoke",
                target: id.to_string(),
            });
        }
        if !entry.revoked {
            entry.revoked = true;
            entry.revoked_at = Some(Timestamp::now());
            tracing::info!(credential_id = %id, issuer = %acting_issuer, "credential revoked");
        }
        Ok(())
    }

    /// Revoked flag, or `None` for an unknown id.
    pub fn is_revoked(&self, id: &CredentialId) -> Option<bool> {
        self.entries.read().get(id).map(|e| e.revoked)
    }

    pub fn entry(&self, id: &CredentialId) -> Option<RegistryEntry> {
        self.entries.read().get(id).cloned()
    }

    /// Entries issued by `issuer`.
    pub fn entries_for_issuer(&self, issuer: &IssuerId) -> Vec<RegistryEntry> {
        self.entries
            .read()
            .values()
            .filter(|e| &e.issuer == issuer)
            .cloned()
            .collect()
    }

    /// Replace `holder`'s published root.
    pub fn publish_root(&self, holder: HolderId, root: FieldElement) {
        tracing::debug!(holder = %holder, root = %root, "accumulator root published");
        self.roots.write().insert(
            holder.clone(),
            PublishedRoot {
                holder,
                root,
                published_at: Timestamp::now(),
            },
        );
    }

    /// The root `holder` published last.
    pub fn current_root(&self, holder: &HolderId) -> Option<FieldElement> {
        self.roots.read().get(holder).map(|p| p.root)
    }

    pub fn published_root(&self, holder: &HolderId) -> Option<PublishedRoot> {
        self.roots.read().get(holder).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
