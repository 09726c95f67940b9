//! # Canonical Serialization
//!
//! `CanonicalBytes` is the only byte type accepted by the commitment,
//! signature, and digest paths. Two parties that serialize the same logical
//! credential must obtain identical bytes, otherwise commitments and
//! signatures computed by an issuer would not reproduce at a holder or a
//! verifier.
//!
//! ## Rules
//!
//! 1. **Reject floats.** Scores travel as fixed-point decimal strings (see
//!    [`Score`](crate::Score)). A float anywhere in the value tree is an
//!    error, since float formatting is not stable across serializers.
//! 2. **Sorted keys, compact separators.** Output is RFC 8785 (JCS) via
//!    `serde_jcs`.
//! 3. **Timestamps** are rendered by [`Timestamp`](crate::Timestamp) as
//!    `YYYY-MM-DDTHH:MM:SSZ` before they reach this module.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization after float rejection.
///
/// # Invariants
///
/// - The only constructors are [`CanonicalBytes::new()`] and
///   [`CanonicalBytes::from_value()`].
/// - No float numbers appear anywhere in the encoded value.
/// - Object keys are sorted and separators are compact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` if the value contains a
    /// float, or `CanonicalizationError::SerializationFailed` if serde fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Construct canonical bytes from an already-built JSON value.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        Value::Object(map) => map.values().try_for_each(reject_floats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_keys_compact_separators() {
        let data = serde_json::json!({"b": 2, "a": 1, "c": "hello"});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"a":1,"b":2,"c":"hello"}"#);
    }

    #[test]
    fn test_nested_objects_are_sorted() {
        let data = serde_json::json!({"outer": {"b": 2, "a": 1}, "list": [3, 2, 1]});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"list":[3,2,1],"outer":{"a":1,"b":2}}"#);
    }

    #[test]
    fn test_float_rejected() {
        let data = serde_json::json!({"overall": 7.5});
        match CanonicalBytes::new(&data) {
            Err(CanonicalizationError::FloatRejected(f)) => assert_eq!(f, 7.5),
            other => panic!("expected FloatRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_deeply_nested_float_rejected() {
        let data = serde_json::json!({"a": {"b": [{"c": 3.25}]}});
        assert!(CanonicalBytes::new(&data).is_err());
    }

    #[test]
    fn test_integers_and_strings_accepted() {
        let data = serde_json::json!({"count": 42, "score": "8.0"});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"count":42,"score":"8.0"}"#);
    }

    #[test]
    fn test_array_of_pairs_keeps_order() {
        let data = serde_json::json!([["name", "Ada"], ["id", "x"]]);
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_bytes(), br#"[["name","Ada"],["id","x"]]"#);
    }

    #[test]
    fn test_unicode_passes_through_as_utf8() {
        let data = serde_json::json!({"name": "Zo\u{00eb}"});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert!(std::str::from_utf8(cb.as_bytes()).unwrap().contains('\u{00eb}'));
    }
}
