//! # Identifier Newtypes
//!
//! Newtype wrappers for the party and credential identifiers. You cannot
//! pass an `IssuerId` where a `HolderId` is expected, which matters most in
//! revocation: authorization there is pure identity equality on `IssuerId`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an issued credential (e.g. `urn:uuid:...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(pub String);

/// Identifier of a credential holder (the test taker).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolderId(pub String);

/// Identifier of a credential issuer (e.g. a DID of a testing body).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssuerId(pub String);

/// Identifier of a verifier requesting presentations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerifierId(pub String);

impl CredentialId {
    /// Generate a fresh random credential identifier.
    pub fn generate() -> Self {
        Self(format!("urn:uuid:{}", Uuid::new_v4()))
    }
}

macro_rules! string_id {
    ($ty:ident) => {
        impl $ty {
            /// Wrap an identifier string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Access the identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(CredentialId);
string_id!(HolderId);
string_id!(IssuerId);
string_id!(VerifierId);
