//! Hex helpers for keys, signatures, and salts (no external hex crate).

use crate::error::CryptoError;

pub(crate) fn encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub(crate) fn prefix(bytes: &[u8]) -> String {
    encode(&bytes[..bytes.len().min(4)])
}

pub(crate) fn decode_fixed<const N: usize>(hex: &str) -> Result<[u8; N], CryptoError> {
    let hex = hex.trim();
    if hex.len() != N * 2 {
        return Err(CryptoError::HexDecode(format!(
            "expected {} hex chars, got {}",
            N * 2,
            hex.len()
        )));
    }
    if !hex.is_ascii() {
        return Err(CryptoError::HexDecode("non-ASCII input".to_string()));
    }
    let mut out = [0u8; N];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|e| CryptoError::HexDecode(format!("invalid hex at {}: {e}", i * 2)))?;
    }
    Ok(out)
}
