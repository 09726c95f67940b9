//! Errors from credential signing and signature verification.

use certproof_core::CertError;
use certproof_crypto::CryptoError;
use thiserror::Error;

/// Errors from VC signing and verification operations.
#[derive(Error, Debug)]
pub enum VcError {
    /// The proof names a verification method nobody registered.
    #[error("unknown verification method: {0}")]
    UnknownVerificationMethod(String),

    /// The verification method belongs to a different issuer.
    #[error("verification method {method} is not controlled by {issuer}")]
    IssuerKeyMismatch {
        /// Verification method from the proof.
        method: String,
        /// Issuer named in the credential.
        issuer: String,
    },

    /// The proof type is not one this crate produces.
    #[error("unsupported proof type: {0}")]
    UnsupportedProofType(String),

    /// Signature does not cover the credential as presented.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Credential JSON could not be parsed.
    #[error("malformed credential JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying crypto failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<VcError> for CertError {
    fn from(e: VcError) -> Self {
        match e {
            VcError::Json(_) => CertError::Validation(e.to_string()),
            VcError::Crypto(inner) => inner.into(),
            other => CertError::Signature(other.to_string()),
        }
    }
}
