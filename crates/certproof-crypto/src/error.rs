//! # Cryptographic Error Types
//!
//! Errors raised inside `certproof-crypto` before they reach a role. Every
//! variant converts into the shared [`CertError`] taxonomy so callers above
//! this crate only ever branch on one error type.

use certproof_core::CertError;
use thiserror::Error;

/// Errors from key handling, signing, and hex decoding.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("Ed25519 verification failed: {0}")]
    VerificationFailed(String),

    /// Invalid Ed25519 signature length.
    #[error("invalid Ed25519 signature length: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),

    /// Invalid Ed25519 public key.
    #[error("invalid Ed25519 public key: {0}")]
    InvalidPublicKey(String),

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(String),

    /// A message index outside the signed message list.
    #[error("message index {index} out of range for {count} messages")]
    MessageIndex {
        /// The offending index.
        index: usize,
        /// Number of signed messages.
        count: usize,
    },

    /// Signed message digests could not be canonicalized.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] certproof_core::CanonicalizationError),

    /// Blocking key generation task failed to join.
    #[error("key generation task failed: {0}")]
    KeyGeneration(String),
}

impl From<CryptoError> for CertError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::VerificationFailed(_)
            | CryptoError::InvalidSignatureLength(_)
            | CryptoError::InvalidPublicKey(_) => CertError::Signature(e.to_string()),
            CryptoError::HexDecode(_)
            | CryptoError::MessageIndex { .. }
            | CryptoError::Canonicalization(_)
            | CryptoError::KeyGeneration(_) => CertError::Validation(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certproof_core::ErrorKind;

    #[test]
    fn test_signature_failures_map_to_signature_kind() {
        let err: CertError = CryptoError::VerificationFailed("bad sig".into()).into();
        assert_eq!(err.kind(), ErrorKind::Signature);
        assert!(err.to_string().contains("bad sig"));

        let err: CertError = CryptoError::InvalidSignatureLength(32).into();
        assert_eq!(err.kind(), ErrorKind::Signature);
    }

    #[test]
    fn test_input_failures_map_to_validation_kind() {
        let err: CertError = CryptoError::MessageIndex { index: 9, count: 3 }.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("index 9"));
    }
}
