//! # Credential Accumulator
//!
//! An [`IndexedMerkleTree`] of credential commitments plus the side table
//! `credential id -> (credential, commitment, index)` that proof generation
//! needs. Both halves persist as JSON in one state directory:
//!
//! - `accumulator.json`: the [`AccumulatorSnapshot`] (insertion sequence
//!   and root).
//! - `ledger.json`: side-table entries in index order.
//!
//! Loading replays the snapshot, checks the recomputed root, and checks
//! every side-table entry against the tree. Any disagreement is a
//! persistence error; nothing is partially restored.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use certproof_core::{BatchOutcome, CertError, CredentialId, FieldElement};
use certproof_crypto::{commit, AccumulatorSnapshot, FieldHasher, IndexedMerkleTree};
use certproof_vc::Credential;

/// File name of the persisted snapshot.
pub const SNAPSHOT_FILE: &str = "accumulator.json";

/// File name of the persisted side table.
pub const LEDGER_FILE: &str = "ledger.json";

/// One side-table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// The full credential.
    pub credential: Credential,
    /// Its commitment.
    pub commitment: FieldElement,
    /// Its accumulator position.
    pub index: u64,
}

/// Accumulator of credential commitments with its side table.
#[derive(Debug, Clone)]
pub struct CredentialAccumulator {
    tree: IndexedMerkleTree,
    entries: BTreeMap<CredentialId, LedgerEntry>,
}

impl CredentialAccumulator {
    /// Empty accumulator on the given hasher.
    pub fn new(hasher: Arc<FieldHasher>) -> Self {
        Self {
            tree: IndexedMerkleTree::new(hasher),
            entries: BTreeMap::new(),
        }
    }

    /// Empty accumulator on the process-wide hasher.
    pub async fn initialize() -> Self {
        Self::new(certproof_crypto::field_hasher().await)
    }

    /// The underlying tree.
    pub fn tree(&self) -> &IndexedMerkleTree {
        &self.tree
    }

    /// The hasher in use.
    pub fn hasher(&self) -> &Arc<FieldHasher> {
        self.tree.hasher()
    }

    /// Current root.
    pub fn root(&self) -> FieldElement {
        self.tree.root()
    }

    /// Number of accumulated credentials.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no credential has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Commitment a credential would get.
    pub fn commitment_of(&self, credential: &Credential) -> Result<FieldElement, CertError> {
        commit(self.hasher(), credential)
    }

    /// Commit a credential and record it. Returns its accumulator index.
    pub fn add(&mut self, credential: Credential) -> Result<u64, CertError> {
        if self.entries.contains_key(&credential.id) {
            return Err(CertError::Duplicate {
                kind: "credential",
                id: credential.id.to_string(),
            });
        }
        let commitment = self.commitment_of(&credential)?;
        let index = self.tree.insert(commitment)?;
        tracing::debug!(credential_id = %credential.id, index, "credential accumulated");
        self.entries.insert(
            credential.id.clone(),
            LedgerEntry {
                credential,
                commitment,
                index,
            },
        );
        Ok(index)
    }

    /// Add several credentials in order, continuing past failures.
    pub fn add_batch(&mut self, credentials: Vec<Credential>) -> BatchOutcome<u64> {
        credentials.into_iter().map(|c| self.add(c)).collect()
    }

    /// Side-table entry for an id.
    pub fn get(&self, id: &CredentialId) -> Option<&LedgerEntry> {
        self.entries.get(id)
    }

    /// Entries in index order.
    pub fn entries(&self) -> Vec<&LedgerEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by_key(|e| e.index);
        entries
    }

    /// Snapshot of the tree.
    pub fn snapshot(&self) -> AccumulatorSnapshot {
        self.tree.snapshot()
    }

    /// Rebuild from a snapshot and side-table entries.
    pub fn restore(
        hasher: Arc<FieldHasher>,
        snapshot: &AccumulatorSnapshot,
        entries: Vec<LedgerEntry>,
    ) -> Result<Self, CertError> {
        let tree = IndexedMerkleTree::restore(hasher, snapshot)?;
        let mut table = BTreeMap::new();
        for entry in entries {
            let recomputed = commit(tree.hasher(), &entry.credential)?;
            if recomputed != entry.commitment {
                return Err(CertError::Persistence(format!(
                    "ledger entry {} does not match its commitment",
                    entry.credential.id
                )));
            }
            if tree.index_of(&entry.commitment) != Some(entry.index) {
                return Err(CertError::Persistence(format!(
                    "ledger entry {} is not at index {} in the snapshot",
                    entry.credential.id, entry.index
                )));
            }
            if table.insert(entry.credential.id.clone(), entry).is_some() {
                return Err(CertError::Persistence("duplicate ledger entry".to_string()));
            }
        }
        Ok(Self { tree, entries: table })
    }

    /// Persist snapshot and side table under `dir`.
    pub async fn save(&self, dir: &Path) -> Result<(), CertError> {
        tokio::fs::create_dir_all(dir).await?;
        let snapshot = serde_json::to_vec_pretty(&self.snapshot())
            .map_err(|e| CertError::Persistence(e.to_string()))?;
        let ledger = serde_json::to_vec_pretty(&self.entries())
            .map_err(|e| CertError::Persistence(e.to_string()))?;
        write_replace(&dir.join(SNAPSHOT_FILE), &snapshot).await?;
        write_replace(&dir.join(LEDGER_FILE), &ledger).await?;
        tracing::info!(dir = %dir.display(), credentials = self.len(), root = %self.root(), "accumulator saved");
        Ok(())
    }

    /// Load snapshot and side table from `dir`.
    pub async fn load(hasher: Arc<FieldHasher>, dir: &Path) -> Result<Self, CertError> {
        let snapshot_bytes = read(&dir.join(SNAPSHOT_FILE)).await?;
        let ledger_bytes = read(&dir.join(LEDGER_FILE)).await?;
        let snapshot: AccumulatorSnapshot = serde_json::from_slice(&snapshot_bytes)
            .map_err(|e| CertError::Persistence(format!("{SNAPSHOT_FILE}: {e}")))?;
        let entries: Vec<LedgerEntry> = serde_json::from_slice(&ledger_bytes)
            .map_err(|e| CertError::Persistence(format!("{LEDGER_FILE}: {e}")))?;
        let restored = Self::restore(hasher, &snapshot, entries)?;
        tracing::info!(dir = %dir.display(), credentials = restored.len(), "accumulator loaded");
        Ok(restored)
    }
}

async fn read(path: &Path) -> Result<Vec<u8>, CertError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| CertError::Persistence(format!("{}: {e}", path.display())))
}

async fn write_replace(path: &Path, bytes: &[u8]) -> Result<(), CertError> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
