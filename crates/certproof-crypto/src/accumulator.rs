//! # Indexed Merkle Accumulator
//!
//! An append-only authenticated set of credential commitments. Leaves live
//! in a fixed-depth binary tree ([`TREE_DEPTH`] levels) and are also linked
//! in ascending value order, which is what makes non-membership provable.
//!
//! ## Layout
//!
//! - Each leaf is `(value, next_index, next_value)` and its digest is
//!   `hash(value, next_index, next_value)`.
//! - Position 0 holds the low sentinel `(0, 0, 0)`. Commitments take
//!   positions 1, 2, ... in insertion order and keep them forever.
//! - `next_value == 0` marks the tail of the sorted chain.
//! - Unpopulated subtrees hash to the precomputed empty-subtree ladder;
//!   only populated nodes are stored.
//!
//! ## Invariants
//!
//! - The root is a pure function of the ordered insertion sequence.
//! - Every sibling in a membership proof is the true digest of the
//!   corresponding subtree, so folding the path reproduces the root.
//! - [`IndexedMerkleTree::root()`] reports [`EMPTY_ROOT`] until the first
//!   commitment is inserted.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use certproof_core::{BatchOutcome, CertError, FieldElement, ProofFailure};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::hash::{FieldHasher, TREE_DEPTH};

/// Root reported by an accumulator with no commitments.
pub const EMPTY_ROOT: FieldElement = FieldElement::ZERO;

/// Version tag written into snapshots.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

const CAPACITY: u64 = 1 << TREE_DEPTH;

// ---------------------------------------------------------------------------
// Leaves and proofs
// ---------------------------------------------------------------------------

/// A leaf of the sorted linked list embedded in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedLeaf {
    /// The committed value.
    pub value: FieldElement,
    /// Tree position of the next-larger value (0 at the tail).
    pub next_index: u64,
    /// The next-larger value (zero at the tail).
    pub next_value: FieldElement,
}

impl IndexedLeaf {
    const SENTINEL: IndexedLeaf = IndexedLeaf {
        value: FieldElement::ZERO,
        next_index: 0,
        next_value: FieldElement::ZERO,
    };

    /// Leaf digest as stored at tree level 0.
    pub fn digest(&self, hasher: &FieldHasher) -> FieldElement {
        hasher.hash(&[
            self.value,
            FieldElement::from_u64(self.next_index),
            self.next_value,
        ])
    }

    /// Whether this leaf is the tail of the sorted chain.
    pub fn is_tail(&self) -> bool {
        self.next_value.is_zero()
    }
}

/// Proof that a leaf sits at a given position under a root.
///
/// `directions[level]` is `true` when the running node is the right child
/// at that level, i.e. the parent is `node(sibling, current)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipProof {
    /// Tree position of the leaf.
    pub leaf_index: u64,
    /// Leaf preimage, so the verifier can recompute the leaf digest.
    pub leaf: IndexedLeaf,
    /// Sibling digests from the leaf level up to just below the root.
    pub siblings: Vec<FieldElement>,
    /// One direction bit per level.
    pub directions: Vec<bool>,
}

impl MembershipProof {
    /// Fold the path and return the root it implies.
    pub fn compute_root(&self, hasher: &FieldHasher) -> Result<FieldElement, ProofFailure> {
        if self.siblings.len() != TREE_DEPTH || self.directions.len() != TREE_DEPTH {
            return Err(ProofFailure::PathShape {
                siblings: self.siblings.len(),
                directions: self.directions.len(),
                depth: TREE_DEPTH,
            });
        }
        if self.leaf_index >= CAPACITY {
            return Err(ProofFailure::PathMismatch);
        }
        let mut cur = self.leaf.digest(hasher);
        for (level, (sibling, is_right)) in self.siblings.iter().zip(&self.directions).enumerate() {
            // Direction bits must spell out the leaf index.
            if *is_right != ((self.leaf_index >> level) & 1 == 1) {
                return Err(ProofFailure::PathMismatch);
            }
            cur = if *is_right {
                hasher.node(sibling, &cur)
            } else {
                hasher.node(&cur, sibling)
            };
        }
        Ok(cur)
    }

    /// Check that `commitment` is the leaf value and the path folds to `root`.
    pub fn check(
        &self,
        hasher: &FieldHasher,
        commitment: &FieldElement,
        root: &FieldElement,
    ) -> Result<(), ProofFailure> {
        if &self.leaf.value != commitment {
            return Err(ProofFailure::LeafMismatch);
        }
        if self.compute_root(hasher)? != *root {
            return Err(ProofFailure::PathMismatch);
        }
        Ok(())
    }

    /// Boolean form of [`check`](Self::check).
    pub fn verify(&self, hasher: &FieldHasher, commitment: &FieldElement, root: &FieldElement) -> bool {
        self.check(hasher, commitment, root).is_ok()
    }
}

/// Proof that a value is absent: its predecessor in the sorted chain is
/// committed, and the predecessor's successor lies strictly above the value
/// (or the predecessor is the tail).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonMembershipProof {
    /// The value proven absent.
    pub query: FieldElement,
    /// Membership proof for the predecessor leaf.
    pub predecessor: MembershipProof,
}

impl NonMembershipProof {
    /// The predecessor leaf `(value, next_index, next_value)`.
    pub fn low_leaf(&self) -> &IndexedLeaf {
        &self.predecessor.leaf
    }

    /// Check the predecessor path against `root` and the bracketing condition.
    pub fn check(&self, hasher: &FieldHasher, root: &FieldElement) -> Result<(), ProofFailure> {
        let low = self.low_leaf();
        if self.predecessor.compute_root(hasher)? != *root {
            return Err(ProofFailure::PathMismatch);
        }
        let above_low = low.value < self.query;
        let below_next = low.is_tail() || low.next_value > self.query;
        if !(above_low && below_next) {
            return Err(ProofFailure::NotBracketed);
        }
        Ok(())
    }

    /// Boolean form of [`check`](Self::check).
    pub fn verify(&self, hasher: &FieldHasher, root: &FieldElement) -> bool {
        self.check(hasher, root).is_ok()
    }
}

/// Serializable accumulator state: the insertion sequence plus metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatorSnapshot {
    /// Snapshot layout version.
    pub format_version: u32,
    /// Tree depth the snapshot was taken at.
    pub depth: usize,
    /// Commitments in insertion order.
    pub commitments: Vec<FieldElement>,
    /// Root at snapshot time.
    pub root: FieldElement,
}

/// Lifecycle of an accumulator. An uninitialized accumulator is one whose
/// hasher has not been obtained yet, so it has no runtime representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorState {
    /// Empty tree of fixed depth.
    Initialized,
    /// At least one commitment inserted.
    Populated,
}

// ---------------------------------------------------------------------------
// IndexedMerkleTree
// ---------------------------------------------------------------------------

/// Sparse indexed Merkle tree over commitments.
#[derive(Debug, Clone)]
pub struct IndexedMerkleTree {
    hasher: Arc<FieldHasher>,
    /// Leaves by tree position; position 0 is the sentinel.
    leaves: Vec<IndexedLeaf>,
    /// Value to position, for predecessor search and duplicate checks.
    positions: BTreeMap<FieldElement, u64>,
    /// Populated node digests keyed by (level, index); level 0 is leaves.
    nodes: HashMap<(usize, u64), FieldElement>,
    tree_root: FieldElement,
}

impl IndexedMerkleTree {
    /// Create an empty accumulator holding only the sentinel leaf.
    pub fn new(hasher: Arc<FieldHasher>) -> Self {
        let mut tree = Self {
            tree_root: hasher.zero(TREE_DEPTH),
            hasher,
            leaves: vec![IndexedLeaf::SENTINEL],
            positions: BTreeMap::new(),
            nodes: HashMap::new(),
        };
        tree.positions.insert(FieldElement::ZERO, 0);
        tree.write_leaf(0);
        tree
    }

    /// Create an empty accumulator on the process-wide hasher.
    pub async fn initialize() -> Self {
        Self::new(crate::hash::field_hasher().await)
    }

    /// The hasher this tree was built with.
    pub fn hasher(&self) -> &Arc<FieldHasher> {
        &self.hasher
    }

    /// Number of inserted commitments (the sentinel is not counted).
    pub fn len(&self) -> usize {
        self.leaves.len() - 1
    }

    /// Whether no commitment has been inserted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AccumulatorState {
        if self.is_empty() {
            AccumulatorState::Initialized
        } else {
            AccumulatorState::Populated
        }
    }

    /// Current root, or [`EMPTY_ROOT`] before the first insertion.
    pub fn root(&self) -> FieldElement {
        if self.is_empty() {
            EMPTY_ROOT
        } else {
            self.tree_root
        }
    }

    /// Position of a committed value.
    pub fn index_of(&self, value: &FieldElement) -> Option<u64> {
        if value.is_zero() {
            return None;
        }
        self.positions.get(value).copied()
    }

    /// Whether a value has been committed.
    pub fn contains(&self, value: &FieldElement) -> bool {
        self.index_of(value).is_some()
    }

    /// Leaf at a tree position.
    pub fn leaf(&self, index: u64) -> Option<&IndexedLeaf> {
        usize::try_from(index).ok().and_then(|i| self.leaves.get(i))
    }

    /// Committed values in insertion order.
    pub fn commitments(&self) -> impl Iterator<Item = &FieldElement> {
        self.leaves.iter().skip(1).map(|leaf| &leaf.value)
    }

    /// Insert a commitment and return its permanent position.
    pub fn insert(&mut self, value: FieldElement) -> Result<u64, CertError> {
        if value.is_zero() {
            return Err(CertError::Validation(
                "zero is reserved for the accumulator sentinel".to_string(),
            ));
        }
        if self.positions.contains_key(&value) {
            return Err(CertError::Duplicate {
                kind: "commitment",
                id: value.to_hex(),
            });
        }
        let index = self.leaves.len() as u64;
        if index >= CAPACITY {
            return Err(CertError::Validation(format!(
                "accumulator is full ({CAPACITY} positions)"
            )));
        }

        let (_, &low_index) = self
            .positions
            .range(..value)
            .next_back()
            .ok_or_else(|| CertError::Validation("sentinel leaf missing".to_string()))?;
        let low_slot = low_index as usize;
        let low = self.leaves[low_slot];

        self.leaves.push(IndexedLeaf {
            value,
            next_index: low.next_index,
            next_value: low.next_value,
        });
        self.leaves[low_slot].next_index = index;
        self.leaves[low_slot].next_value = value;
        self.positions.insert(value, index);

        self.write_leaf(low_index);
        self.write_leaf(index);
        Ok(index)
    }

    /// Insert several commitments in order, continuing past failures.
    pub fn insert_batch(&mut self, values: &[FieldElement]) -> BatchOutcome<u64> {
        values.iter().map(|v| self.insert(*v)).collect()
    }

    /// Membership proof for `commitment` at `index`.
    pub fn membership_proof(
        &self,
        commitment: &FieldElement,
        index: u64,
    ) -> Result<MembershipProof, CertError> {
        match self.leaf(index) {
            Some(leaf) if index != 0 && &leaf.value == commitment => Ok(self.path(index)),
            _ => Err(CertError::NotFound {
                kind: "commitment",
                id: format!("{} at index {index}", commitment.to_hex()),
            }),
        }
    }

    /// Non-membership proof for a value that has not been committed.
    pub fn non_membership_proof(&self, query: &FieldElement) -> Result<NonMembershipProof, CertError> {
        if self.is_empty() {
            return Err(CertError::Validation(
                "no absence proofs against an empty accumulator".to_string(),
            ));
        }
        if query.is_zero() {
            return Err(CertError::Validation(
                "zero is reserved for the accumulator sentinel".to_string(),
            ));
        }
        if self.positions.contains_key(query) {
            return Err(CertError::Validation(format!(
                "{} is a member of the accumulator",
                query.to_hex()
            )));
        }
        let (_, &low_index) = self
            .positions
            .range(..*query)
            .next_back()
            .ok_or_else(|| CertError::Validation("sentinel leaf missing".to_string()))?;
        Ok(NonMembershipProof {
            query: *query,
            predecessor: self.path(low_index),
        })
    }

    /// Verify a membership proof against the current root.
    pub fn verify_membership(&self, proof: &MembershipProof, commitment: &FieldElement) -> bool {
        !self.is_empty() && proof.verify(&self.hasher, commitment, &self.root())
    }

    /// Verify a non-membership proof against `root`.
    pub fn verify_non_membership(&self, proof: &NonMembershipProof, root: &FieldElement) -> bool {
        *root != EMPTY_ROOT && proof.verify(&self.hasher, root)
    }

    /// Capture the insertion sequence and root.
    pub fn snapshot(&self) -> AccumulatorSnapshot {
        AccumulatorSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            depth: TREE_DEPTH,
            commitments: self.commitments().copied().collect(),
            root: self.root(),
        }
    }

    /// Rebuild a tree by replaying a snapshot's insertions.
    pub fn restore(hasher: Arc<FieldHasher>, snapshot: &AccumulatorSnapshot) -> Result<Self, CertError> {
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(CertError::Persistence(format!(
                "unsupported snapshot format version {}",
                snapshot.format_version
            )));
        }
        if snapshot.depth != TREE_DEPTH {
            return Err(CertError::Persistence(format!(
                "snapshot depth {} does not match tree depth {TREE_DEPTH}",
                snapshot.depth
            )));
        }
        let mut tree = Self::new(hasher);
        for value in &snapshot.commitments {
            tree.insert(*value)
                .map_err(|e| CertError::Persistence(format!("snapshot replay failed: {e}")))?;
        }
        if tree.root() != snapshot.root {
            return Err(CertError::Persistence(format!(
                "snapshot root mismatch: recorded {}, recomputed {}",
                snapshot.root.to_hex(),
                tree.root().to_hex()
            )));
        }
        Ok(tree)
    }

    fn node(&self, level: usize, index: u64) -> FieldElement {
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or_else(|| self.hasher.zero(level))
    }

    fn write_leaf(&mut self, index: u64) {
        let mut cur = self.leaves[index as usize].digest(&self.hasher);
        let mut pos = index;
        self.nodes.insert((0, pos), cur);
        for level in 0..TREE_DEPTH {
            let sibling = self.node(level, pos ^ 1);
            cur = if pos & 1 == 1 {
                self.hasher.node(&sibling, &cur)
            } else {
                self.hasher.node(&cur, &sibling)
            };
            pos >>= 1;
            self.nodes.insert((level + 1, pos), cur);
        }
        self.tree_root = cur;
    }

    fn path(&self, index: u64) -> MembershipProof {
        let mut siblings = Vec::with_capacity(TREE_DEPTH);
        let mut directions = Vec::with_capacity(TREE_DEPTH);
        let mut pos = index;
        for level in 0..TREE_DEPTH {
            siblings.push(self.node(level, pos ^ 1));
            directions.push(pos & 1 == 1);
            pos >>= 1;
        }
        MembershipProof {
            leaf_index: index,
            leaf: self.leaves[index as usize],
            siblings,
            directions,
        }
    }
}

// ---------------------------------------------------------------------------
// SharedAccumulator
// ---------------------------------------------------------------------------

/// Clonable handle serializing access to one tree.
///
/// Index assignment and root update happen under one lock acquisition, so
/// concurrent inserters can never observe the same next index.
#[derive(Debug, Clone)]
pub struct SharedAccumulator {
    inner: Arc<Mutex<IndexedMerkleTree>>,
}

impl SharedAccumulator {
    /// Wrap a tree.
    pub fn new(tree: IndexedMerkleTree) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tree)),
        }
    }

    /// Insert under the lock.
    pub fn insert(&self, value: FieldElement) -> Result<u64, CertError> {
        self.inner.lock().insert(value)
    }

    /// Insert in order, taking the lock per item.
    pub fn insert_batch(&self, values: &[FieldElement]) -> BatchOutcome<u64> {
        values.iter().map(|v| self.insert(*v)).collect()
    }

    /// Current root.
    pub fn root(&self) -> FieldElement {
        self.inner.lock().root()
    }

    /// Number of commitments.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// See [`IndexedMerkleTree::membership_proof`].
    pub fn membership_proof(&self, commitment: &FieldElement, index: u64) -> Result<MembershipProof, CertError> {
        self.inner.lock().membership_proof(commitment, index)
    }

    /// See [`IndexedMerkleTree::non_membership_proof`].
    pub fn non_membership_proof(&self, query: &FieldElement) -> Result<NonMembershipProof, CertError> {
        self.inner.lock().non_membership_proof(query)
    }

    /// See [`IndexedMerkleTree::snapshot`].
    pub fn snapshot(&self) -> AccumulatorSnapshot {
        self.inner.lock().snapshot()
    }
}
