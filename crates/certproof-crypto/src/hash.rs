//! # Field-Hash Primitive
//!
//! A deterministic multi-input digest over [`FieldElement`]s, used for
//! accumulator nodes, indexed leaves, and credential commitments.
//!
//! ## Algorithm
//!
//! Domain-separated SHA-256, reduced into the field by clearing the top
//! three bits of the output:
//! - Multi-input: `SHA256(0x00 || u32_be(n) || x_1 || ... || x_n)`.
//! - Node: `SHA256(0x01 || left || right)`.
//! - Byte stream: length-prefixed, chunked into 31-byte blocks and folded
//!   `acc = hash(acc, block)`.
//!
//! ## Initialization
//!
//! [`field_hasher()`] performs the one-time setup (precomputing the
//! empty-subtree ladder for [`TREE_DEPTH`]) on a blocking thread, behind a
//! process-wide `OnceCell`. Concurrent first callers wait on the same
//! initialization; later callers get the cached handle.

use std::sync::Arc;

use certproof_core::{CertError, FieldElement, FIELD_CHUNK_BYTES};
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;

/// Fixed depth of the accumulator tree (2^32 leaf positions).
pub const TREE_DEPTH: usize = 32;

const DOMAIN_MULTI: u8 = 0x00;
const DOMAIN_NODE: u8 = 0x01;

static HASHER: OnceCell<Arc<FieldHasher>> = OnceCell::const_new();

/// The initialized hash primitive.
///
/// Holds the empty-subtree ladder: `zero(0)` is the empty-leaf digest
/// (the zero element) and `zero(i + 1) = node(zero(i), zero(i))`.
#[derive(Debug)]
pub struct FieldHasher {
    zero_ladder: Vec<FieldElement>,
}

impl FieldHasher {
    /// Build a hasher synchronously. Prefer [`field_hasher()`], which
    /// shares one instance per process.
    pub fn new() -> Self {
        let mut zero_ladder = Vec::with_capacity(TREE_DEPTH + 1);
        let mut cur = FieldElement::ZERO;
        zero_ladder.push(cur);
        for _ in 0..TREE_DEPTH {
            cur = node_digest(&cur, &cur);
            zero_ladder.push(cur);
        }
        Self { zero_ladder }
    }

    /// Hash an ordered list of field elements.
    pub fn hash(&self, inputs: &[FieldElement]) -> FieldElement {
        let mut h = Sha256::new();
        h.update([DOMAIN_MULTI]);
        h.update((inputs.len() as u32).to_be_bytes());
        for x in inputs {
            h.update(x.as_bytes());
        }
        finish(h)
    }

    /// Hash two children into their parent node.
    pub fn node(&self, left: &FieldElement, right: &FieldElement) -> FieldElement {
        node_digest(left, right)
    }

    /// Digest of an empty subtree of the given height (0 = empty leaf).
    pub fn zero(&self, level: usize) -> FieldElement {
        self.zero_ladder
            .get(level)
            .copied()
            .unwrap_or(FieldElement::ZERO)
    }

    /// Fold a byte stream into one field element.
    ///
    /// The stream length is absorbed first so that left-padding of the
    /// final block cannot make two different streams collide.
    pub fn hash_bytes(&self, data: &[u8]) -> Result<FieldElement, CertError> {
        let mut acc = self.hash(&[FieldElement::from_u64(data.len() as u64)]);
        for block in data.chunks(FIELD_CHUNK_BYTES) {
            acc = self.hash(&[acc, FieldElement::from_chunk(block)?]);
        }
        Ok(acc)
    }
}

impl Default for FieldHasher {
    fn default() -> Self {
        Self::new()
    }
}

fn node_digest(left: &FieldElement, right: &FieldElement) -> FieldElement {
    let mut h = Sha256::new();
    h.update([DOMAIN_NODE]);
    h.update(left.as_bytes());
    h.update(right.as_bytes());
    finish(h)
}

fn finish(h: Sha256) -> FieldElement {
    let mut out = [0u8; 32];
    out.copy_from_slice(&h.finalize());
    FieldElement::reduce(out)
}

/// The process-wide hash primitive, initialized on first use.
pub async fn field_hasher() -> Arc<FieldHasher> {
    HASHER
        .get_or_init(|| async {
            tracing::debug!(depth = TREE_DEPTH, "initializing field hasher");
            match tokio::task::spawn_blocking(FieldHasher::new).await {
                Ok(hasher) => Arc::new(hasher),
                Err(e) => {
                    tracing::warn!(error = %e, "hasher init task failed, building inline");
                    Arc::new(FieldHasher::new())
                }
            }
        })
        .await
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ladder_is_consistent() {
        let h = FieldHasher::new();
        assert_eq!(h.zero(0), FieldElement::ZERO);
        for level in 0..TREE_DEPTH {
            assert_eq!(h.zero(level + 1), h.node(&h.zero(level), &h.zero(level)));
        }
    }

    #[test]
    fn test_hash_is_order_and_arity_sensitive() {
        let h = FieldHasher::new();
        let a = FieldElement::from_u64(1);
        let b = FieldElement::from_u64(2);
        assert_ne!(h.hash(&[a, b]), h.hash(&[b, a]));
        assert_ne!(h.hash(&[a]), h.hash(&[a, FieldElement::ZERO]));
        assert_ne!(h.hash(&[a, b]), h.node(&a, &b));
    }

    #[test]
    fn test_outputs_are_field_elements() {
        let h = FieldHasher::new();
        for i in 0..64 {
            let out = h.hash(&[FieldElement::from_u64(i)]);
            assert!(FieldElement::try_from_bytes(*out.as_bytes()).is_ok());
        }
    }

    #[test]
    fn test_hash_bytes_separates_padding() {
        let h = FieldHasher::new();
        assert_ne!(h.hash_bytes(b"\x00a").unwrap(), h.hash_bytes(b"a").unwrap());
        assert_ne!(h.hash_bytes(b"").unwrap(), h.hash_bytes(b"\x00").unwrap());
        let long = vec![7u8; 100];
        assert_eq!(h.hash_bytes(&long).unwrap(), h.hash_bytes(&long).unwrap());
    }

    #[tokio::test]
    async fn test_shared_hasher_is_initialized_once() {
        let (a, b) = tokio::join!(field_hasher(), field_hasher());
        assert!(Arc::ptr_eq(&a, &b));
        let c = field_hasher().await;
        assert!(Arc::ptr_eq(&a, &c));
    }
}
