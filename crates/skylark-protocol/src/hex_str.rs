//! Hex String Decoding
//!
//! Session key material arrives in the server hello as hex strings. The
//! wire format is lenient: a malformed digit decodes to the nibble value 0
//! instead of failing the whole message, and an odd-length string treats
//! the missing low nibble as 0. [`decode_hex_lenient`] preserves that
//! behavior exactly; [`decode_hex_strict`] is the validating alternative
//! for callers that would rather reject bad input.

use crate::errors::{ProtocolError, ProtocolResult};

/// Map a single hex digit to its value; anything else decodes to 0.
#[inline]
fn nibble(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'A'..=b'F' => c - b'A' + 10,
        b'a'..=b'f' => c - b'a' + 10,
        _ => 0,
    }
}

/// Decode a hex string into packed bytes, tolerating malformed digits.
///
/// `"0A1B2C"` decodes to `[0x0A, 0x1B, 0x2C]`; the empty string decodes to
/// an empty vector.
pub fn decode_hex_lenient(hex_string: &str) -> Vec<u8> {
    let bytes = hex_string.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len() / 2);
    let mut chunks = bytes.chunks(2);
    for pair in &mut chunks {
        let high = nibble(pair[0]);
        let low = pair.get(1).copied().map(nibble).unwrap_or(0);
        decoded.push((high << 4) | low);
    }
    decoded
}

/// Decode a hex string, rejecting malformed or odd-length input.
pub fn decode_hex_strict(hex_string: &str) -> ProtocolResult<Vec<u8>> {
    hex::decode(hex_string).map_err(|e| ProtocolError::InvalidHex(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_basic() {
        assert_eq!(decode_hex_lenient("0A1B2C"), vec![0x0A, 0x1B, 0x2C]);
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode_hex_lenient("").is_empty());
    }

    #[test]
    fn test_decode_lowercase() {
        assert_eq!(decode_hex_lenient("deadBEEF"), vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_decode_malformed_digit_is_zero_nibble() {
        // 'Z' is not a hex digit; it decodes as 0
        assert_eq!(decode_hex_lenient("ZF"), vec![0x0F]);
        assert_eq!(decode_hex_lenient("FZ"), vec![0xF0]);
    }

    #[test]
    fn test_decode_odd_length() {
        // Missing low nibble reads as 0
        assert_eq!(decode_hex_lenient("ABC"), vec![0xAB, 0xC0]);
    }

    #[test]
    fn test_decode_strict_rejects_bad_input() {
        assert!(decode_hex_strict("ZF").is_err());
        assert!(decode_hex_strict("ABC").is_err());
        assert_eq!(decode_hex_strict("0a1b").unwrap(), vec![0x0A, 0x1B]);
    }
}
