//! # Verifiable Credentials
//!
//! A [`VerifiableCredential`] wraps a [`Credential`] with the issuer, the
//! issuance date, and a [`CredentialProof`] carrying the issuer's salted
//! multi-message signature.
//!
//! ## Signing input
//!
//! The signed messages are the credential's attribute messages in
//! commitment order, followed by `issuer=<id>` and `issuanceDate=<ts>`, so
//! the envelope cannot be re-attributed to another issuer without breaking
//! the signature.
//!
//! ## Verification
//!
//! Key lookup goes through a caller-supplied resolver from verification
//! method to public key. [`KeyDirectory`] is the in-process resolver; it
//! also checks that the key is controlled by the issuer the credential
//! names. Trust in that issuer is a separate, live decision made by the
//! caller.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use certproof_core::{CertError, IssuerId, Timestamp};
use certproof_crypto::{
    Committable, Ed25519KeyPair, Ed25519PublicKey, MessageSignature, SelectiveDisclosureProof,
    SignatureManager, SignatureScheme,
};

use crate::credential::{attribute_message, Credential, RevealedAttributes};
use crate::error::VcError;

/// Proof type written into every credential proof.
pub const PROOF_TYPE: &str = "SaltedEd25519MultiMessage2025";

const PROOF_PURPOSE: &str = "assertionMethod";

/// Issuer signature attached to a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialProof {
    /// Always [`PROOF_TYPE`].
    #[serde(rename = "type")]
    pub proof_type: String,
    /// When the proof was created.
    pub created: Timestamp,
    /// Identifier of the signing key.
    pub verification_method: String,
    /// Always `assertionMethod`.
    pub proof_purpose: String,
    /// Salts and Ed25519 signature over the signing messages.
    pub signature: MessageSignature,
}

/// A credential signed by its issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VerifiableCredential {
    /// The certified attributes.
    pub credential: Credential,
    /// The issuer.
    pub issuer: IssuerId,
    /// When the credential was issued.
    pub issuance_date: Timestamp,
    /// Issuer signature.
    pub proof: CredentialProof,
}

/// The result of verifying the proof on a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofResult {
    /// The verification method from the proof.
    pub verification_method: String,
    /// Whether the signature was valid.
    pub ok: bool,
    /// Error message if verification failed; empty if ok.
    pub error: String,
}

fn signing_messages(credential: &Credential, issuer: &IssuerId, issuance_date: &Timestamp) -> Vec<String> {
    let mut messages = credential.messages();
    messages.push(format!("issuer={issuer}"));
    messages.push(format!("issuanceDate={issuance_date}"));
    messages
}

impl VerifiableCredential {
    /// Sign a credential on behalf of `issuer`.
    pub fn issue(
        credential: Credential,
        issuer: IssuerId,
        issuance_date: Timestamp,
        key: &Ed25519KeyPair,
        verification_method: impl Into<String>,
        scheme: &SignatureManager,
    ) -> Result<Self, VcError> {
        let messages = signing_messages(&credential, &issuer, &issuance_date);
        let signature = scheme.sign(&messages, key)?;
        Ok(Self {
            credential,
            issuer,
            issuance_date,
            proof: CredentialProof {
                proof_type: PROOF_TYPE.to_string(),
                created: issuance_date,
                verification_method: verification_method.into(),
                proof_purpose: PROOF_PURPOSE.to_string(),
                signature,
            },
        })
    }

    /// Parse from JSON, reporting structural problems as validation errors.
    pub fn from_json(json: &str) -> Result<Self, CertError> {
        let vc: Self = serde_json::from_str(json).map_err(VcError::from)?;
        vc.validate()?;
        Ok(vc)
    }

    /// Structural checks: credential shape, proof type, salt count.
    pub fn validate(&self) -> Result<(), CertError> {
        self.credential.validate()?;
        if self.issuer.as_str().trim().is_empty() {
            return Err(CertError::Validation("malformed credential: issuer is empty".into()));
        }
        if self.proof.proof_type != PROOF_TYPE {
            return Err(CertError::Validation(format!(
                "malformed credential: unsupported proof type {}",
                self.proof.proof_type
            )));
        }
        let expected = self.messages().len();
        if self.proof.signature.salts.len() != expected {
            return Err(CertError::Validation(format!(
                "malformed credential: proof covers {} messages, credential has {expected}",
                self.proof.signature.salts.len()
            )));
        }
        Ok(())
    }

    /// The ordered signing messages.
    pub fn messages(&self) -> Vec<String> {
        signing_messages(&self.credential, &self.issuer, &self.issuance_date)
    }

    /// Verify the issuer signature, resolving the key through `resolve_key`.
    pub fn verify<F>(&self, scheme: &SignatureManager, resolve_key: F) -> ProofResult
    where
        F: Fn(&str) -> Result<Ed25519PublicKey, String>,
    {
        let vm = self.proof.verification_method.clone();
        match self.check(scheme, &resolve_key) {
            Ok(()) => ProofResult {
                verification_method: vm,
                ok: true,
                error: String::new(),
            },
            Err(e) => ProofResult {
                verification_method: vm,
                ok: false,
                error: e.to_string(),
            },
        }
    }

    fn check<F>(&self, scheme: &SignatureManager, resolve_key: &F) -> Result<(), VcError>
    where
        F: Fn(&str) -> Result<Ed25519PublicKey, String>,
    {
        if self.proof.proof_type != PROOF_TYPE {
            return Err(VcError::UnsupportedProofType(self.proof.proof_type.clone()));
        }
        let pk = resolve_key(&self.proof.verification_method).map_err(VcError::VerificationFailed)?;
        if scheme.verify(&self.messages(), &self.proof.signature, &pk) {
            Ok(())
        } else {
            Err(VcError::VerificationFailed(
                "signature does not cover the presented attributes".to_string(),
            ))
        }
    }

    /// Verify against a key directory, requiring the key to belong to
    /// `self.issuer`.
    pub fn verify_with_directory(&self, scheme: &SignatureManager, directory: &KeyDirectory) -> ProofResult {
        self.verify(scheme, |method| {
            directory
                .resolve_for(method, &self.issuer)
                .map_err(|e| e.to_string())
        })
    }

    /// Selective-disclosure signature proof for the given leaf paths.
    pub fn create_disclosure_proof(
        &self,
        scheme: &SignatureManager,
        public_key: &Ed25519PublicKey,
        paths: &[String],
        nonce: &str,
    ) -> Result<SelectiveDisclosureProof, CertError> {
        let indices = paths
            .iter()
            .map(|p| {
                self.credential.message_index(p).ok_or_else(|| {
                    CertError::Validation(format!("{p:?} is not a signed leaf attribute"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(scheme.create_selective_disclosure_proof(
            &self.proof.signature,
            public_key,
            &self.messages(),
            &indices,
            nonce,
        )?)
    }
}

/// Check a selective-disclosure proof against a revealed mapping.
///
/// Each revealed `(path, value)` must match one opening in the proof; the
/// opening's position is authenticated by the signed digest list.
pub fn verify_disclosure_proof(
    scheme: &SignatureManager,
    proof: &SelectiveDisclosureProof,
    revealed: &RevealedAttributes,
    public_key: &Ed25519PublicKey,
    nonce: &str,
) -> bool {
    let mut messages = BTreeMap::new();
    for (path, value) in revealed {
        let message = attribute_message(path, value);
        let Some(opening) = proof.disclosed.iter().find(|d| d.message == message) else {
            return false;
        };
        messages.insert(opening.index, message);
    }
    scheme.verify_selective_disclosure_proof(proof, &messages, public_key, nonce)
}

// ---------------------------------------------------------------------------
// KeyDirectory
// ---------------------------------------------------------------------------

/// A registered issuer key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerKey {
    /// The issuer controlling the key.
    pub issuer: IssuerId,
    /// The public key.
    pub public_key: Ed25519PublicKey,
}

/// Resolver from verification method to issuer key.
#[derive(Debug, Clone, Default)]
pub struct KeyDirectory {
    keys: HashMap<String, IssuerKey>,
}

impl KeyDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a key under a verification method. Replaces any previous
    /// entry for the same method.
    pub fn register(&mut self, method: impl Into<String>, issuer: IssuerId, public_key: Ed25519PublicKey) {
        self.keys.insert(method.into(), IssuerKey { issuer, public_key });
    }

    /// Look up a verification method.
    pub fn resolve(&self, method: &str) -> Option<&IssuerKey> {
        self.keys.get(method)
    }

    /// Look up a method and require it to belong to `issuer`.
    pub fn resolve_for(&self, method: &str, issuer: &IssuerId) -> Result<Ed25519PublicKey, VcError> {
        let entry = self
            .resolve(method)
            .ok_or_else(|| VcError::UnknownVerificationMethod(method.to_string()))?;
        if &entry.issuer != issuer {
            return Err(VcError::IssuerKeyMismatch {
                method: method.to_string(),
                issuer: issuer.to_string(),
            });
        }
        Ok(entry.public_key.clone())
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no key is registered.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
