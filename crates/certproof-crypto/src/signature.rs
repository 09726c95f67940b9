//! # Multi-Message Signatures with Selective Disclosure
//!
//! The issuer signs a credential as an ordered list of attribute messages.
//! Each message is first hidden behind a salted digest
//! `SHA256(salt || u32_be(index) || message)` with a fresh 16-byte salt,
//! and one Ed25519 signature covers the canonical list of digests.
//!
//! A holder discloses a subset by handing over the salts and messages for
//! the chosen indices together with all digests. The verifier recomputes
//! the disclosed digests, checks they sit at the claimed positions, and
//! checks the issuer signature over the full digest list. Undisclosed
//! messages stay hidden behind their salted digests.
//!
//! The verifier's nonce is folded into a binding digest over the nonce, the
//! signature, and the digest list. Every input is public, so the binding
//! only catches a proof offered against the wrong request by a party that
//! did not rebuild it. Anyone holding a proof can recompute the binding for
//! a fresh nonce. Replay resistance needs a holder-held key, which this
//! scheme does not have.
//!
//! [`SignatureScheme`] is the capability surface the protocol roles use;
//! [`SignatureManager`] is the salted-digest Ed25519 implementation.

use std::collections::BTreeMap;

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use certproof_core::{sha256_digest, CanonicalBytes, ContentDigest};

use crate::ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use crate::error::CryptoError;
use crate::hex;

const SALT_BYTES: usize = 16;
const SIGNED_PAYLOAD_TYPE: &str = "certproof-salted-messages-v1";

/// Abstract multi-message signature capability.
///
/// Mirrors the operations roles need: key generation, whole-set sign and
/// verify, and selective-disclosure proof creation and verification.
pub trait SignatureScheme: Send + Sync {
    /// Private signing material.
    type KeyPair: Send + Sync;
    /// Public verification key.
    type PublicKey: Clone + Send + Sync;
    /// Signature over an ordered message list.
    type Signature: Clone + Send + Sync;
    /// Selective-disclosure proof.
    type Proof: Clone + Send + Sync;

    /// Generate a fresh key pair.
    fn generate_key_pair(&self) -> Self::KeyPair;

    /// Public half of a key pair.
    fn public_key(&self, key: &Self::KeyPair) -> Self::PublicKey;

    /// Sign every message.
    fn sign(&self, messages: &[String], key: &Self::KeyPair) -> Result<Self::Signature, CryptoError>;

    /// Verify a signature over every message.
    fn verify(&self, messages: &[String], signature: &Self::Signature, public_key: &Self::PublicKey) -> bool;

    /// Prove the messages at `revealed_indices` are signed, hiding the rest.
    fn create_selective_disclosure_proof(
        &self,
        signature: &Self::Signature,
        public_key: &Self::PublicKey,
        messages: &[String],
        revealed_indices: &[usize],
        nonce: &str,
    ) -> Result<Self::Proof, CryptoError>;

    /// Verify a disclosure proof against exactly `revealed_messages`.
    fn verify_selective_disclosure_proof(
        &self,
        proof: &Self::Proof,
        revealed_messages: &BTreeMap<usize, String>,
        public_key: &Self::PublicKey,
        nonce: &str,
    ) -> bool;
}

/// A 16-byte per-message salt. Serializes as hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Salt(pub [u8; SALT_BYTES]);

impl Salt {
    fn random() -> Self {
        let mut bytes = [0u8; SALT_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from 32 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        hex::decode_fixed::<SALT_BYTES>(s).map(Self)
    }
}

impl std::fmt::Debug for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Salt({}...)", hex::prefix(&self.0))
    }
}

impl Serialize for Salt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Salt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Issuer signature over a salted message list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSignature {
    /// One salt per message, by position.
    pub salts: Vec<Salt>,
    /// Ed25519 signature over the canonical digest list.
    pub signature: Ed25519Signature,
}

/// One disclosed message with the salt that opens its digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosedMessage {
    /// Position in the signed message list.
    pub index: usize,
    /// Salt for this position.
    pub salt: Salt,
    /// The message itself.
    pub message: String,
}

/// Selective-disclosure proof over a [`MessageSignature`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectiveDisclosureProof {
    /// The issuer signature over `message_digests`.
    pub signature: Ed25519Signature,
    /// Salted digests of every signed message, by position.
    pub message_digests: Vec<ContentDigest>,
    /// Openings for the revealed positions, ascending by index.
    pub disclosed: Vec<DisclosedMessage>,
    /// Verifier-supplied nonce.
    pub nonce: String,
    /// Unkeyed digest over nonce, signature, and digest list.
    pub binding: ContentDigest,
}

/// Salted-digest Ed25519 implementation of [`SignatureScheme`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureManager;

impl SignatureManager {
    /// Create the manager.
    pub fn new() -> Self {
        Self
    }

    /// Generate a key pair on the blocking pool.
    pub async fn generate_key_pair_async(&self) -> Result<Ed25519KeyPair, CryptoError> {
        Ed25519KeyPair::generate_async().await
    }

    fn signed_payload(digests: &[ContentDigest]) -> Result<CanonicalBytes, CryptoError> {
        let hexes: Vec<String> = digests.iter().map(ContentDigest::to_hex).collect();
        Ok(CanonicalBytes::new(&serde_json::json!({
            "type": SIGNED_PAYLOAD_TYPE,
            "digests": hexes,
        }))?)
    }

    fn binding(
        nonce: &str,
        signature: &Ed25519Signature,
        digests: &[ContentDigest],
    ) -> Result<ContentDigest, CryptoError> {
        let hexes: Vec<String> = digests.iter().map(ContentDigest::to_hex).collect();
        let canonical = CanonicalBytes::new(&serde_json::json!({
            "nonce": nonce,
            "signature": signature.to_hex(),
            "digests": hexes,
        }))?;
        Ok(sha256_digest(&canonical))
    }

    fn check_proof(
        &self,
        proof: &SelectiveDisclosureProof,
        revealed_messages: &BTreeMap<usize, String>,
        public_key: &Ed25519PublicKey,
        nonce: &str,
    ) -> Result<(), CryptoError> {
        if proof.nonce != nonce {
            return Err(CryptoError::VerificationFailed("nonce mismatch".to_string()));
        }
        let binding = Self::binding(&proof.nonce, &proof.signature, &proof.message_digests)?;
        if binding != proof.binding {
            return Err(CryptoError::VerificationFailed("binding mismatch".to_string()));
        }
        if proof.disclosed.len() != revealed_messages.len() {
            return Err(CryptoError::VerificationFailed(format!(
                "proof discloses {} messages, {} expected",
                proof.disclosed.len(),
                revealed_messages.len()
            )));
        }
        let count = proof.message_digests.len();
        for opening in &proof.disclosed {
            if revealed_messages.get(&opening.index) != Some(&opening.message) {
                return Err(CryptoError::VerificationFailed(format!(
                    "disclosed message {} differs from the revealed set",
                    opening.index
                )));
            }
            let expected = proof
                .message_digests
                .get(opening.index)
                .ok_or(CryptoError::MessageIndex {
                    index: opening.index,
                    count,
                })?;
            if &message_digest(&opening.salt, opening.index, &opening.message) != expected {
                return Err(CryptoError::VerificationFailed(format!(
                    "opening for message {} does not match its digest",
                    opening.index
                )));
            }
        }
        public_key.verify(&Self::signed_payload(&proof.message_digests)?, &proof.signature)
    }
}

/// Salted digest of one message at its position.
pub fn message_digest(salt: &Salt, index: usize, message: &str) -> ContentDigest {
    let mut buf = Vec::with_capacity(SALT_BYTES + 4 + message.len());
    buf.extend_from_slice(&salt.0);
    buf.extend_from_slice(&(index as u32).to_be_bytes());
    buf.extend_from_slice(message.as_bytes());
    ContentDigest::of_bytes(&buf)
}

impl SignatureScheme for SignatureManager {
    type KeyPair = Ed25519KeyPair;
    type PublicKey = Ed25519PublicKey;
    type Signature = MessageSignature;
    type Proof = SelectiveDisclosureProof;

    fn generate_key_pair(&self) -> Ed25519KeyPair {
        Ed25519KeyPair::generate()
    }

    fn public_key(&self, key: &Ed25519KeyPair) -> Ed25519PublicKey {
        key.public_key()
    }

    fn sign(&self, messages: &[String], key: &Ed25519KeyPair) -> Result<MessageSignature, CryptoError> {
        let salts: Vec<Salt> = messages.iter().map(|_| Salt::random()).collect();
        let digests: Vec<ContentDigest> = salts
            .iter()
            .zip(messages)
            .enumerate()
            .map(|(i, (salt, m))| message_digest(salt, i, m))
            .collect();
        let signature = key.sign(&Self::signed_payload(&digests)?);
        Ok(MessageSignature { salts, signature })
    }

    fn verify(&self, messages: &[String], signature: &MessageSignature, public_key: &Ed25519PublicKey) -> bool {
        if signature.salts.len() != messages.len() {
            return false;
        }
        let digests: Vec<ContentDigest> = signature
            .salts
            .iter()
            .zip(messages)
            .enumerate()
            .map(|(i, (salt, m))| message_digest(salt, i, m))
            .collect();
        match Self::signed_payload(&digests) {
            Ok(payload) => public_key.verify(&payload, &signature.signature).is_ok(),
            Err(_) => false,
        }
    }

    fn create_selective_disclosure_proof(
        &self,
        signature: &MessageSignature,
        public_key: &Ed25519PublicKey,
        messages: &[String],
        revealed_indices: &[usize],
        nonce: &str,
    ) -> Result<SelectiveDisclosureProof, CryptoError> {
        if !self.verify(messages, signature, public_key) {
            return Err(CryptoError::VerificationFailed(
                "cannot derive a disclosure proof from an invalid signature".to_string(),
            ));
        }
        let message_digests: Vec<ContentDigest> = signature
            .salts
            .iter()
            .zip(messages)
            .enumerate()
            .map(|(i, (salt, m))| message_digest(salt, i, m))
            .collect();

        let mut indices = revealed_indices.to_vec();
        indices.sort_unstable();
        indices.dedup();
        let disclosed = indices
            .into_iter()
            .map(|index| {
                let message = messages.get(index).ok_or(CryptoError::MessageIndex {
                    index,
                    count: messages.len(),
                })?;
                Ok(DisclosedMessage {
                    index,
                    salt: signature.salts[index],
                    message: message.clone(),
                })
            })
            .collect::<Result<Vec<_>, CryptoError>>()?;

        let binding = Self::binding(nonce, &signature.signature, &message_digests)?;
        Ok(SelectiveDisclosureProof {
            signature: signature.signature.clone(),
            message_digests,
            disclosed,
            nonce: nonce.to_string(),
            binding,
        })
    }

    fn verify_selective_disclosure_proof(
        &self,
        proof: &SelectiveDisclosureProof,
        revealed_messages: &BTreeMap<usize, String>,
        public_key: &Ed25519PublicKey,
        nonce: &str,
    ) -> bool {
        match self.check_proof(proof, revealed_messages, public_key, nonce) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "selective disclosure proof rejected");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages() -> Vec<String> {
        ["urn:uuid:1", "holder-ada", "Ada Lovelace", "8.0", "7.5"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn revealed(pairs: &[(usize, &str)]) -> BTreeMap<usize, String> {
        pairs.iter().map(|(i, m)| (*i, m.to_string())).collect()
    }

    #[test]
    fn test_sign_and_verify_full_set() {
        let mgr = SignatureManager::new();
        let kp = mgr.generate_key_pair();
        let sig = mgr.sign(&messages(), &kp).unwrap();
        assert_eq!(sig.salts.len(), 5);
        assert!(mgr.verify(&messages(), &sig, &kp.public_key()));
    }

    #[test]
    fn test_tampered_message_fails_verification() {
        let mgr = SignatureManager::new();
        let kp = mgr.generate_key_pair();
        let sig = mgr.sign(&messages(), &kp).unwrap();
        let mut tampered = messages();
        tampered[3] = "9.0".to_string();
        assert!(!mgr.verify(&tampered, &sig, &kp.public_key()));
        assert!(!mgr.verify(&messages()[..4], &sig, &kp.public_key()));
    }

    #[test]
    fn test_salts_differ_per_signing() {
        let mgr = SignatureManager::new();
        let kp = mgr.generate_key_pair();
        let a = mgr.sign(&messages(), &kp).unwrap();
        let b = mgr.sign(&messages(), &kp).unwrap();
        assert_ne!(a.salts, b.salts);
    }

    #[test]
    fn test_selective_disclosure_roundtrip() {
        let mgr = SignatureManager::new();
        let kp = mgr.generate_key_pair();
        let pk = kp.public_key();
        let sig = mgr.sign(&messages(), &kp).unwrap();

        let proof = mgr
            .create_selective_disclosure_proof(&sig, &pk, &messages(), &[2, 0], "nonce-1")
            .unwrap();
        assert_eq!(proof.disclosed.len(), 2);
        assert_eq!(proof.disclosed[0].index, 0);

        let shown = revealed(&[(0, "urn:uuid:1"), (2, "Ada Lovelace")]);
        assert!(mgr.verify_selective_disclosure_proof(&proof, &shown, &pk, "nonce-1"));

        let json = serde_json::to_string(&proof).unwrap();
        let back: SelectiveDisclosureProof = serde_json::from_str(&json).unwrap();
        assert!(mgr.verify_selective_disclosure_proof(&back, &shown, &pk, "nonce-1"));
    }

    #[test]
    fn test_selective_disclosure_rejects_wrong_nonce_or_values() {
        let mgr = SignatureManager::new();
        let kp = mgr.generate_key_pair();
        let pk = kp.public_key();
        let sig = mgr.sign(&messages(), &kp).unwrap();
        let proof = mgr
            .create_selective_disclosure_proof(&sig, &pk, &messages(), &[2], "nonce-1")
            .unwrap();

        let shown = revealed(&[(2, "Ada Lovelace")]);
        assert!(!mgr.verify_selective_disclosure_proof(&proof, &shown, &pk, "nonce-2"));
        assert!(!mgr.verify_selective_disclosure_proof(
            &proof,
            &revealed(&[(2, "Grace Hopper")]),
            &pk,
            "nonce-1"
        ));
        assert!(!mgr.verify_selective_disclosure_proof(
            &proof,
            &revealed(&[(2, "Ada Lovelace"), (3, "8.0")]),
            &pk,
            "nonce-1"
        ));

        let mut forged = proof.clone();
        forged.disclosed[0].message = "Grace Hopper".to_string();
        assert!(!mgr.verify_selective_disclosure_proof(
            &forged,
            &revealed(&[(2, "Grace Hopper")]),
            &pk,
            "nonce-1"
        ));

        let other = mgr.generate_key_pair().public_key();
        assert!(!mgr.verify_selective_disclosure_proof(&proof, &shown, &other, "nonce-1"));
    }

    #[test]
    fn test_proof_creation_requires_valid_signature_and_indices() {
        let mgr = SignatureManager::new();
        let kp = mgr.generate_key_pair();
        let pk = kp.public_key();
        let sig = mgr.sign(&messages(), &kp).unwrap();

        assert!(matches!(
            mgr.create_selective_disclosure_proof(&sig, &pk, &messages(), &[7], "n"),
            Err(CryptoError::MessageIndex { index: 7, count: 5 })
        ));

        let mut tampered = messages();
        tampered[0] = "urn:uuid:2".to_string();
        assert!(mgr
            .create_selective_disclosure_proof(&sig, &pk, &tampered, &[0], "n")
            .is_err());
    }

    #[test]
    fn test_nonce_binding_is_recomputable_from_public_data() {
        let mgr = SignatureManager::new();
        let kp = mgr.generate_key_pair();
        let pk = kp.public_key();
        let sig = mgr.sign(&messages(), &kp).unwrap();
        let proof = mgr
            .create_selective_disclosure_proof(&sig, &pk, &messages(), &[2], "nonce-1")
            .unwrap();
        let shown = revealed(&[(2, "Ada Lovelace")]);

        let mut stale = proof.clone();
        stale.nonce = "nonce-2".to_string();
        assert!(!mgr.verify_selective_disclosure_proof(&stale, &shown, &pk, "nonce-2"));

        let mut rebound = proof;
        rebound.nonce = "nonce-2".to_string();
        rebound.binding =
            SignatureManager::binding("nonce-2", &rebound.signature, &rebound.message_digests).unwrap();
        assert!(mgr.verify_selective_disclosure_proof(&rebound, &shown, &pk, "nonce-2"));
    }
}
