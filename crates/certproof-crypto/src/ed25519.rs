//! # Ed25519 Keys
//!
//! Issuer signing keys. Everything an issuer signs is [`CanonicalBytes`],
//! so a holder or verifier re-deriving the payload gets the same bytes.
//!
//! - `Ed25519KeyPair` has no `Serialize` impl and redacts itself in
//!   `Debug`; the private half never leaves the issuer.
//! - Public keys and signatures serialize as lowercase hex.
//! - [`Ed25519KeyPair::generate_async`] runs key generation on the blocking
//!   pool, since it draws from the OS RNG.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use certproof_core::CanonicalBytes;

use crate::error::CryptoError;
use crate::hex;

/// An Ed25519 public key (32 bytes).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey(pub [u8; 32]);

/// An Ed25519 signature (64 bytes).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519Signature(pub [u8; 64]);

/// An Ed25519 signing key held by an issuer.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl Ed25519PublicKey {
    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        hex::decode_fixed::<32>(s)
            .map(Self)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }

    fn verifying_key(&self) -> Result<ed25519_dalek::VerifyingKey, CryptoError> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }

    /// Verify `signature` over canonical bytes.
    pub fn verify(&self, data: &CanonicalBytes, signature: &Ed25519Signature) -> Result<(), CryptoError> {
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        self.verifying_key()?
            .verify(data.as_bytes(), &sig)
            .map_err(|e| CryptoError::VerificationFailed(e.to_string()))
    }
}

impl Ed25519Signature {
    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Build from a byte slice of exactly 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from 128 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        hex::decode_fixed::<64>(s).map(Self)
    }
}

impl Ed25519KeyPair {
    /// Generate a key from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    /// Generate a key on the blocking pool.
    pub async fn generate_async() -> Result<Self, CryptoError> {
        tokio::task::spawn_blocking(Self::generate)
            .await
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))
    }

    /// Deterministic key from a 32-byte seed (tests and fixtures).
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// The verifying half.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign canonical bytes.
    pub fn sign(&self, data: &CanonicalBytes) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(data.as_bytes()).to_bytes())
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Ed25519KeyPair(<private>)")
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PublicKey({}...)", hex::prefix(&self.0))
    }
}

impl std::fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signature({}...)", hex::prefix(&self.0))
    }
}

macro_rules! hex_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_serde!(Ed25519PublicKey);
hex_serde!(Ed25519Signature);

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(v: serde_json::Value) -> CanonicalBytes {
        CanonicalBytes::new(&v).unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = Ed25519KeyPair::generate();
        let data = payload(serde_json::json!({"credential": "c1", "overall": "8.0"}));
        let sig = kp.sign(&data);
        kp.public_key().verify(&data, &sig).unwrap();
    }

    #[test]
    fn test_wrong_key_or_message_fails() {
        let kp = Ed25519KeyPair::generate();
        let other = Ed25519KeyPair::generate();
        let data = payload(serde_json::json!({"overall": "8.0"}));
        let tampered = payload(serde_json::json!({"overall": "9.0"}));
        let sig = kp.sign(&data);
        assert!(other.public_key().verify(&data, &sig).is_err());
        assert!(kp.public_key().verify(&tampered, &sig).is_err());
    }

    #[test]
    fn test_seeded_keys_are_deterministic() {
        let a = Ed25519KeyPair::from_seed(&[7u8; 32]);
        let b = Ed25519KeyPair::from_seed(&[7u8; 32]);
        assert_eq!(a.public_key(), b.public_key());
        let data = payload(serde_json::json!({"x": 1}));
        assert_eq!(a.sign(&data), b.sign(&data));
    }

    #[test]
    fn test_hex_serde_roundtrip() {
        let kp = Ed25519KeyPair::from_seed(&[1u8; 32]);
        let pk = kp.public_key();
        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(json.len(), 66);
        assert_eq!(serde_json::from_str::<Ed25519PublicKey>(&json).unwrap(), pk);

        let sig = kp.sign(&payload(serde_json::json!({})));
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json.len(), 130);
        assert_eq!(serde_json::from_str::<Ed25519Signature>(&json).unwrap(), sig);
    }

    #[test]
    fn test_from_slice_checks_length() {
        assert!(matches!(
            Ed25519Signature::from_slice(&[0u8; 32]),
            Err(CryptoError::InvalidSignatureLength(32))
        ));
        assert!(Ed25519Signature::from_slice(&[0u8; 64]).is_ok());
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let kp = Ed25519KeyPair::generate();
        assert_eq!(format!("{kp:?}"), "Ed25519KeyPair(<private>)");
    }

    #[tokio::test]
    async fn test_async_generation_yields_usable_key() {
        let kp = Ed25519KeyPair::generate_async().await.unwrap();
        let data = payload(serde_json::json!({"a": true}));
        kp.public_key().verify(&data, &kp.sign(&data)).unwrap();
    }
}
