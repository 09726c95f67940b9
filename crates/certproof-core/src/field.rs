//! # Field Elements
//!
//! The accumulator and the commitment scheme operate on 32-byte big-endian
//! integers strictly below 2^253. Every output of the field-hash primitive
//! is reduced into that range by clearing the top three bits, and every byte
//! stream fed into the primitive is chunked into 31-byte blocks, so a block
//! always fits without reduction.
//!
//! Big-endian layout means the derived `Ord` is numeric order, which the
//! indexed accumulator relies on for its sorted leaf chain.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CertError;

/// Number of bytes packed into one field element when chunking a stream.
pub const FIELD_CHUNK_BYTES: usize = 31;

/// Mask applied to the most significant byte to keep values below 2^253.
const TOP_BYTE_MASK: u8 = 0x1f;

/// A field element: 32 big-endian bytes, value < 2^253.
///
/// Serializes as a 64-character lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FieldElement([u8; 32]);

impl FieldElement {
    /// The zero element. Also the empty-leaf digest and the empty-root sentinel.
    pub const ZERO: FieldElement = FieldElement([0u8; 32]);

    /// Reduce arbitrary 32 bytes (e.g. a SHA-256 output) into the field.
    pub fn reduce(mut bytes: [u8; 32]) -> Self {
        bytes[0] &= TOP_BYTE_MASK;
        Self(bytes)
    }

    /// Accept 32 bytes only if they already encode a value below 2^253.
    pub fn try_from_bytes(bytes: [u8; 32]) -> Result<Self, CertError> {
        if bytes[0] & !TOP_BYTE_MASK != 0 {
            return Err(CertError::Validation(
                "field element exceeds 2^253".to_string(),
            ));
        }
        Ok(Self(bytes))
    }

    /// Embed an unsigned integer.
    pub fn from_u64(n: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    /// Embed a chunk of at most [`FIELD_CHUNK_BYTES`] bytes, left-padded.
    pub fn from_chunk(chunk: &[u8]) -> Result<Self, CertError> {
        if chunk.len() > FIELD_CHUNK_BYTES {
            return Err(CertError::Validation(format!(
                "chunk of {} bytes exceeds field capacity of {FIELD_CHUNK_BYTES}",
                chunk.len()
            )));
        }
        let mut bytes = [0u8; 32];
        bytes[32 - chunk.len()..].copy_from_slice(chunk);
        Ok(Self(bytes))
    }

    /// Return the raw big-endian bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the zero element.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Render as lowercase hex.
    pub fn to_hex(&self) -> String {
        encode_hex(&self.0)
    }

    /// Parse from a 64-character hex string, rejecting out-of-range values.
    pub fn from_hex(hex: &str) -> Result<Self, CertError> {
        Self::try_from_bytes(decode_hex_32(hex)?)
    }
}

impl std::fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FieldElement({}...)", &self.to_hex()[..12])
    }
}

impl std::fmt::Display for FieldElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Hex utilities (no external hex crate dependency)
// ---------------------------------------------------------------------------

pub(crate) fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub(crate) fn decode_hex_32(hex: &str) -> Result<[u8; 32], CertError> {
    let hex = hex.trim().to_lowercase();
    if hex.len() != 64 {
        return Err(CertError::Validation(format!(
            "expected 64 hex chars, got {}",
            hex.len()
        )));
    }
    let mut out = [0u8; 32];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let s = std::str::from_utf8(chunk)
            .map_err(|e| CertError::Validation(format!("invalid hex: {e}")))?;
        out[i] = u8::from_str_radix(s, 16)
            .map_err(|e| CertError::Validation(format!("invalid hex at {i}: {e}")))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_clears_top_bits() {
        let fe = FieldElement::reduce([0xff; 32]);
        assert_eq!(fe.as_bytes()[0], 0x1f);
        assert_eq!(fe.as_bytes()[31], 0xff);
    }

    #[test]
    fn test_try_from_bytes_rejects_out_of_range() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x20;
        assert!(FieldElement::try_from_bytes(bytes).is_err());
        bytes[0] = 0x1f;
        assert!(FieldElement::try_from_bytes(bytes).is_ok());
    }

    #[test]
    fn test_ordering_is_numeric() {
        assert!(FieldElement::from_u64(1) < FieldElement::from_u64(2));
        assert!(FieldElement::from_u64(255) < FieldElement::from_u64(256));
        assert!(FieldElement::ZERO < FieldElement::from_u64(1));
    }

    #[test]
    fn test_chunk_is_left_padded() {
        let fe = FieldElement::from_chunk(&[1, 2]).unwrap();
        assert_eq!(fe, FieldElement::from_u64(0x0102));
        assert!(FieldElement::from_chunk(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_hex_roundtrip_and_serde() {
        let fe = FieldElement::from_u64(0xdead_beef);
        let back = FieldElement::from_hex(&fe.to_hex()).unwrap();
        assert_eq!(back, fe);
        let json = serde_json::to_string(&fe).unwrap();
        let parsed: FieldElement = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, fe);
    }

    #[test]
    fn test_invalid_hex_rejected() {
        assert!(FieldElement::from_hex("abc").is_err());
        assert!(FieldElement::from_hex(&"zz".repeat(32)).is_err());
    }
}
