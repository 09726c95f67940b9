//! # Credential Commitments
//!
//! A commitment is one field element binding every attribute of a
//! credential. The attribute messages are taken in a fixed order, encoded
//! as a canonical JSON array, and folded through the field hasher block by
//! block. The same messages always produce the same commitment, on any
//! party's machine.

use certproof_core::{CanonicalBytes, CertError, FieldElement};

use crate::hash::FieldHasher;

/// Anything that can be committed: an ordered list of attribute messages.
///
/// The order is part of the commitment, so implementors must produce it
/// deterministically.
pub trait Committable {
    /// The attribute messages in their fixed order.
    fn messages(&self) -> Vec<String>;
}

/// Commit to an ordered list of messages.
pub fn commit_messages(hasher: &FieldHasher, messages: &[String]) -> Result<FieldElement, CertError> {
    let canonical = CanonicalBytes::new(&messages)?;
    let commitment = hasher.hash_bytes(canonical.as_bytes())?;
    if commitment.is_zero() {
        return Err(CertError::Validation(
            "commitment collapsed to the reserved zero value".to_string(),
        ));
    }
    Ok(commitment)
}

/// Commit to a [`Committable`] value.
pub fn commit(hasher: &FieldHasher, value: &impl Committable) -> Result<FieldElement, CertError> {
    commit_messages(hasher, &value.messages())
}
