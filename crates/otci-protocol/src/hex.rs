//! Hex encoding used for keys, extended addresses, datasets and TXT payloads.
//!
//! The wire form is lowercase, two digits per byte, no separators.

use crate::error::{OtciError, OtciResult};

/// Encode bytes as lowercase hex.
pub fn encode(data: &[u8]) -> String {
    ::hex::encode(data)
}

/// Decode a hex string. Fails on odd length or non-hex characters.
pub fn decode(hexstr: &str) -> OtciResult<Vec<u8>> {
    ::hex::decode(hexstr).map_err(|e| OtciError::unexpected(&[hexstr], format!("invalid hex: {e}")))
}

/// Check that `hexstr` is well-formed hex.
pub fn is_valid(hexstr: &str) -> bool {
    hexstr.len() % 2 == 0 && hexstr.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Check that `hexstr` is exactly `n` bytes of hex.
pub fn is_valid_len(hexstr: &str, n: usize) -> bool {
    hexstr.len() == n * 2 && is_valid(hexstr)
}

/// Validate a caller-supplied 64-bit identifier (extended address, EUI-64, IID, ...).
pub fn validate_hex64(value: &str) -> OtciResult<()> {
    if is_valid_len(value, 8) {
        Ok(())
    } else {
        Err(OtciError::InvalidArguments(format!("expected 16 hex digits, got `{value}`")))
    }
}

/// Validate a caller-supplied 128-bit key.
pub fn validate_key128(value: &str) -> OtciResult<()> {
    if is_valid_len(value, 16) {
        Ok(())
    } else {
        Err(OtciError::InvalidArguments(format!("expected 32 hex digits, got `{value}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_lowercase() {
        assert_eq!(encode(&[0xde, 0xad, 0x00, 0x0f]), "dead000f");
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(decode("abc").is_err());
        assert!(decode("zz").is_err());
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
        assert_eq!(decode("76616c").unwrap(), b"val".to_vec());
    }

    #[test]
    fn test_validate_hex64() {
        assert!(validate_hex64("dead00beef00cafe").is_ok());
        assert!(validate_hex64("dead00beef00caf").is_err());
        assert!(validate_hex64("dead00beef00cafg").is_err());
    }

    proptest! {
        #[test]
        fn prop_hex_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let encoded = encode(&bytes);
            prop_assert_eq!(encoded.len(), bytes.len() * 2);
            prop_assert!(!encoded.chars().any(|c| c.is_ascii_uppercase()));
            prop_assert_eq!(decode(&encoded).unwrap(), bytes);
        }
    }
}
