//! Length-prefixed application frame.
//!
//! A frame carries a UTF-8 JSON text part and an optional binary part:
//!
//! ```text
//! +---------+----------------+---------+------------------+
//! |  u32 LE | text (UTF-8)   |  u32 LE | binary           |
//! |  = m    |  of length m   |  = n    |  of length n     |
//! +---------+----------------+---------+------------------+
//! ```
//!
//! When no binary part is present, `n = 0`.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use msghub_core::error::AppError;
use msghub_core::result::AppResult;

/// One logical message on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// UTF-8 JSON text part.
    pub text: String,
    /// Optional binary part; empty when absent.
    pub binary: Bytes,
}

impl Frame {
    /// Create a text-only frame.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            binary: Bytes::new(),
        }
    }

    /// Create a frame with both parts.
    pub fn with_binary(text: impl Into<String>, binary: impl Into<Bytes>) -> Self {
        Self {
            text: text.into(),
            binary: binary.into(),
        }
    }

    /// Whether the frame carries a binary part.
    pub fn has_binary(&self) -> bool {
        !self.binary.is_empty()
    }

    /// Encode the frame into its wire representation.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(8 + self.text.len() + self.binary.len());
        buf.put_u32_le(self.text.len() as u32);
        buf.put_slice(self.text.as_bytes());
        buf.put_u32_le(self.binary.len() as u32);
        buf.put_slice(&self.binary);
        buf.freeze()
    }

    /// Decode a frame from a complete wire buffer.
    pub fn decode(data: &[u8]) -> AppResult<Self> {
        let mut data = data;

        if data.remaining() < 4 {
            return Err(AppError::validation("Frame is truncated"));
        }
        let text_len = data.get_u32_le() as usize;
        if data.remaining() < text_len {
            return Err(AppError::validation("Frame is truncated"));
        }
        let text_bytes = data.copy_to_bytes(text_len);
        let text = String::from_utf8(text_bytes.to_vec())
            .map_err(|_| AppError::validation("Frame text part is not valid UTF-8"))?;

        if data.remaining() < 4 {
            return Err(AppError::validation("Frame is truncated"));
        }
        let binary_len = data.get_u32_le() as usize;
        if data.remaining() < binary_len {
            return Err(AppError::validation("Frame is truncated"));
        }
        let binary = data.copy_to_bytes(binary_len);

        if data.has_remaining() {
            return Err(AppError::validation("Frame has trailing bytes"));
        }

        Ok(Self { text, binary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_text_only() {
        let frame = Frame::text(r#"{"command":"ping"}"#);
        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded, frame);
        assert!(!decoded.has_binary());
    }

    #[test]
    fn test_roundtrip_with_binary() {
        let frame = Frame::with_binary(r#"{"command":"blob"}"#, vec![0u8, 1, 2, 255, 254]);
        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded, frame);
        assert!(decoded.has_binary());
    }

    #[test]
    fn test_roundtrip_empty_parts() {
        let frame = Frame::text("");
        let encoded = frame.encode();
        assert_eq!(encoded.len(), 8);
        assert_eq!(Frame::decode(&encoded).unwrap(), frame);
    }

    #[test]
    fn test_wire_layout_is_little_endian() {
        let frame = Frame::with_binary("ab", vec![9u8]);
        let encoded = frame.encode();
        assert_eq!(&encoded[..4], &[2, 0, 0, 0]);
        assert_eq!(&encoded[4..6], b"ab");
        assert_eq!(&encoded[6..10], &[1, 0, 0, 0]);
        assert_eq!(&encoded[10..], &[9]);
    }

    #[test]
    fn test_decode_rejects_truncation() {
        let frame = Frame::with_binary("hello", vec![1u8, 2, 3]);
        let encoded = frame.encode();

        for cut in 0..encoded.len() {
            assert!(Frame::decode(&encoded[..cut]).is_err(), "cut at {cut}");
        }
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut encoded = Frame::text("x").encode().to_vec();
        encoded.push(0);
        assert!(Frame::decode(&encoded).is_err());
    }

    #[test]
    fn test_decode_rejects_invalid_utf8_text() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&[0xff, 0xfe]);
        buf.extend_from_slice(&0u32.to_le_bytes());
        assert!(Frame::decode(&buf).is_err());
    }
}
