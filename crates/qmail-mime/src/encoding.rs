//! Transfer encoding helpers.
//!
//! Part payloads are written as a single unbroken Base64 run using the
//! standard padded alphabet.

use crate::error::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Appends the Base64 encoding of `data` to `buf`.
pub fn encode_base64_into(data: &[u8], buf: &mut Vec<u8>) {
    buf.extend_from_slice(encode_base64(data).as_bytes());
}

/// Decodes Base64 data.
///
/// Whitespace is ignored so folded payloads decode as well.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_encode() {
        assert_eq!(encode_base64(b"hi"), "aGk=");
        assert_eq!(encode_base64(b"Hello, World!"), "SGVsbG8sIFdvcmxkIQ==");
        assert_eq!(encode_base64(b""), "");
    }

    #[test]
    fn test_base64_encode_into_appends() {
        let mut buf = b"prefix:".to_vec();
        encode_base64_into(b"hi", &mut buf);
        assert_eq!(buf, b"prefix:aGk=");

        let data: Vec<u8> = (0..=255).collect();
        let mut buf = Vec::new();
        encode_base64_into(&data, &mut buf);
        assert_eq!(buf, encode_base64(&data).as_bytes());
    }

    #[test]
    fn test_base64_encode_into_empty() {
        let mut buf = b"x".to_vec();
        encode_base64_into(b"", &mut buf);
        assert_eq!(buf, b"x");
    }

    #[test]
    fn test_base64_encode_into_no_wrapping() {
        let data = vec![0xABu8; 300];
        let mut buf = Vec::new();
        encode_base64_into(&data, &mut buf);
        assert!(!buf.contains(&b'\n'));
        assert_eq!(buf.len(), 400);
    }

    #[test]
    fn test_base64_decode_ignores_whitespace() {
        let decoded = decode_base64("SGVs\nbG8s IFdv\r\ncmxkIQ==").unwrap();
        assert_eq!(decoded, b"Hello, World!");
    }

    #[test]
    fn test_base64_decode_invalid() {
        assert!(decode_base64("not base64!").is_err());
    }
}
