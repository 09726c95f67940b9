//! # Credential Lifecycle State Machine
//!
//! Tracks what a party has observed about one credential.
//!
//! ## States
//!
//! ```text
//! Issued ──▶ Registered ──▶ Held ──▶ Presented ──▶ Verified
//!    │                        ▲          │    ▲
//!    └────────────────────────┘          ▼    │
//!                                     Rejected┘  (presented again)
//! ```
//!
//! Registration is optional. A held credential may be presented any number
//! of times; each outcome is recorded against the latest presentation.
//!
//! The revoked flag is orthogonal to the state. It can only be raised once
//! the credential has been registered and is never cleared.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use certproof_core::{CertError, CredentialId, Timestamp};

// ─── States ──────────────────────────────────────────────────────────

/// Lifecycle state of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialState {
    Issued,
    Registered,
    Held,
    Presented,
    Verified,
    Rejected,
}

impl CredentialState {
    /// Whether `self -> to` is a valid transition.
    pub fn can_transition_to(&self, to: CredentialState) -> bool {
        use CredentialState::*;
        matches!(
            (self, to),
            (Issued, Registered)
                | (Issued, Held)
                | (Registered, Held)
                | (Held, Presented)
                | (Presented, Presented)
                | (Presented, Verified)
                | (Presented, Rejected)
                | (Verified, Presented)
                | (Rejected, Presented)
        )
    }
}

impl std::fmt::Display for CredentialState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Issued => "ISSUED",
            Self::Registered => "REGISTERED",
            Self::Held => "HELD",
            Self::Presented => "PRESENTED",
            Self::Verified => "VERIFIED",
            Self::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Rejected lifecycle operations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    /// Transition not allowed from the current state.
    #[error("invalid credential transition for {credential_id}: {from} -> {to}")]
    InvalidTransition {
        credential_id: String,
        from: CredentialState,
        to: CredentialState,
    },

    /// Revocation before registration.
    #[error("credential {credential_id} cannot be revoked before it is registered")]
    NotRegistered { credential_id: String },
}

impl From<LifecycleError> for CertError {
    fn from(e: LifecycleError) -> Self {
        CertError::Validation(e.to_string())
    }
}

// ─── Records ─────────────────────────────────────────────────────────

/// One entry in the transition log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from_state: CredentialState,
    pub to_state: CredentialState,
    pub timestamp: Timestamp,
    pub reason: String,
}

/// A credential's state, revoked flag, and transition history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialLifecycle {
    pub credential_id: CredentialId,
    pub state: CredentialState,
    pub revoked: bool,
    pub registered: bool,
    pub transitions: Vec<TransitionRecord>,
}

impl CredentialLifecycle {
    /// A freshly issued credential.
    pub fn issued(credential_id: CredentialId) -> Self {
        Self {
            credential_id,
            state: CredentialState::Issued,
            revoked: false,
            registered: false,
            transitions: Vec::new(),
        }
    }

    /// Move to `to`, logging the transition.
    pub fn transition(&mut self, to: CredentialState, reason: &str) -> Result<(), LifecycleError> {
        if !self.state.can_transition_to(to) {
            return Err(LifecycleError::InvalidTransition {
                credential_id: self.credential_id.to_string(),
                from: self.state,
                to,
            });
        }
        tracing::debug!(
            credential_id = %self.credential_id,
            from = %self.state,
            to = %to,
            reason,
            "credential transition"
        );
        self.transitions.push(TransitionRecord {
            from_state: self.state,
            to_state: to,
            timestamp: Timestamp::now(),
            reason: reason.to_string(),
        });
        if to == CredentialState::Registered {
            self.registered = true;
        }
        self.state = to;
        Ok(())
    }

    /// Record the verifier's decision on a presentation.
    pub fn record_outcome(&mut self, accepted: bool, reason: &str) -> Result<(), LifecycleError> {
        let to = if accepted {
            CredentialState::Verified
        } else {
            CredentialState::Rejected
        };
        self.transition(to, reason)
    }

    /// Mark registered without changing the state, for parties that learn
    /// of registration after the credential was already held.
    pub fn mark_registered(&mut self) {
        self.registered = true;
    }

    /// Raise the revoked flag. Idempotent once registered.
    pub fn revoke(&mut self) -> Result<(), LifecycleError> {
        if !self.registered {
            return Err(LifecycleError::NotRegistered {
                credential_id: self.credential_id.to_string(),
            });
        }
        self.revoked = true;
        Ok(())
    }
}
