//! Per-party issuer allow-list.
//!
//! Membership is read at call time. Nothing caches a trust decision, so
//! distrusting an issuer affects later checks only.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;

use certproof_core::IssuerId;

/// Shared handle to a set of trusted issuers. Clones see the same set.
#[derive(Debug, Clone, Default)]
pub struct TrustSet {
    issuers: Arc<RwLock<BTreeSet<IssuerId>>>,
}

impl TrustSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an issuer. Returns `false` if it was already trusted.
    pub fn trust(&self, issuer: IssuerId) -> bool {
        let added = self.issuers.write().insert(issuer.clone());
        if added {
            tracing::info!(issuer = %issuer, "issuer trusted");
        }
        added
    }

    /// Remove an issuer. Returns `false` if it was not trusted.
    pub fn distrust(&self, issuer: &IssuerId) -> bool {
        let removed = self.issuers.write().remove(issuer);
        if removed {
            tracing::info!(issuer = %issuer, "issuer distrusted");
        }
        removed
    }

    pub fn is_trusted(&self, issuer: &IssuerId) -> bool {
        self.issuers.read().contains(issuer)
    }

    pub fn len(&self) -> usize {
        self.issuers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.issuers.read().is_empty()
    }
}

impl FromIterator<IssuerId> for TrustSet {
    fn from_iter<I: IntoIterator<Item = IssuerId>>(iter: I) -> Self {
        Self {
            issuers: Arc::new(RwLock::new(iter.into_iter().collect())),
        }
    }
}
