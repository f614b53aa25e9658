//! Wire Format Framing
//!
//! Every payload exchanged through the message transport is prefixed with a
//! fixed header that names the schema needed to decode it.
//!
//! ## Layout
//!
//! ```text
//! ┌────────────┬──────────────────────────┬─────────────────────────────┐
//! │ byte 0     │ bytes 1-4                │ bytes 5..                   │
//! │ magic 0x00 │ schema id (u32, BE)      │ Avro binary-encoded value   │
//! └────────────┴──────────────────────────┴─────────────────────────────┘
//! ```
//!
//! There is no length prefix: Avro binary encoding is self-delimiting, so the
//! payload simply runs to the end of the buffer.
//!
//! ## Magic Byte
//!
//! Writers always emit `0x00`. Readers get the magic byte back untouched in
//! [`Frame::magic`]; later format versions may use other values, so rejecting
//! them is a policy decision for the caller (see [`Frame::is_current_format`]).
//!
//! ## Usage
//! ```ignore
//! use avrolink_core::wire;
//!
//! let framed = wire::encode(1, &[0xAA, 0xBB]);
//! assert_eq!(&framed[..], &[0x00, 0x00, 0x00, 0x00, 0x01, 0xAA, 0xBB]);
//!
//! let frame = wire::decode(&framed)?;
//! assert_eq!(frame.schema_id, 1);
//! assert_eq!(frame.payload, &[0xAA, 0xBB]);
//! ```

use crate::error::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Registry-assigned schema identifier.
pub type SchemaId = u32;

/// Magic byte written in front of every payload.
pub const MAGIC_BYTE: u8 = 0x00;

/// Size of the framing header: magic byte plus 4-byte schema id.
pub const HEADER_LEN: usize = 5;

/// A parsed frame borrowing its payload from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Magic byte exactly as it appeared on the wire
    pub magic: u8,
    /// Schema id the payload was written with
    pub schema_id: SchemaId,
    /// Encoded value, everything after the header
    pub payload: &'a [u8],
}

impl Frame<'_> {
    /// Whether this frame uses the format version this crate writes.
    pub fn is_current_format(&self) -> bool {
        self.magic == MAGIC_BYTE
    }
}

/// Frame an encoded value with its schema id.
pub fn encode(schema_id: SchemaId, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    encode_into(&mut buf, schema_id, payload);
    buf.freeze()
}

/// Write a framed value into a caller-owned buffer.
pub fn encode_into(buf: &mut impl BufMut, schema_id: SchemaId, payload: &[u8]) {
    buf.put_u8(MAGIC_BYTE);
    // Big-endian, as every Confluent-compatible reader expects
    buf.put_u32(schema_id);
    buf.put_slice(payload);
}

/// Split a framed buffer into magic byte, schema id and payload.
///
/// Fails with [`Error::MalformedFrame`] when the buffer cannot hold the
/// header. The magic byte is not validated.
pub fn decode(data: &[u8]) -> Result<Frame<'_>> {
    if data.len() < HEADER_LEN {
        return Err(Error::MalformedFrame { len: data.len() });
    }

    let mut header = &data[..HEADER_LEN];
    let magic = header.get_u8();
    let schema_id = header.get_u32();

    Ok(Frame {
        magic,
        schema_id,
        payload: &data[HEADER_LEN..],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_exact_bytes() {
        let framed = encode(1, &[0xAA, 0xBB]);
        assert_eq!(&framed[..], &[0x00, 0x00, 0x00, 0x00, 0x01, 0xAA, 0xBB]);
    }

    #[test]
    fn test_decode_exact_bytes() {
        let frame = decode(&[0x00, 0x00, 0x00, 0x00, 0x01, 0xAA, 0xBB]).unwrap();
        assert_eq!(frame.magic, MAGIC_BYTE);
        assert_eq!(frame.schema_id, 1);
        assert_eq!(frame.payload, &[0xAA, 0xBB]);
        assert!(frame.is_current_format());
    }

    #[test]
    fn test_schema_id_is_big_endian() {
        let framed = encode(0x0102_0304, b"");
        assert_eq!(&framed[..], &[0x00, 0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_decode_too_short() {
        let result = decode(&[0x00, 0x00, 0x01]);
        assert_eq!(result, Err(Error::MalformedFrame { len: 3 }));
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(decode(&[]), Err(Error::MalformedFrame { len: 0 }));
    }

    #[test]
    fn test_decode_header_only() {
        let frame = decode(&[0x00, 0x00, 0x00, 0x00, 0x07]).unwrap();
        assert_eq!(frame.schema_id, 7);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_decode_keeps_unknown_magic() {
        let frame = decode(&[0x01, 0x00, 0x00, 0x00, 0x02, 0x42]).unwrap();
        assert_eq!(frame.magic, 0x01);
        assert_eq!(frame.schema_id, 2);
        assert!(!frame.is_current_format());
    }

    #[test]
    fn test_encode_into_appends() {
        let mut buf = BytesMut::from(&b"prefix"[..]);
        encode_into(&mut buf, 9, &[0x10]);
        assert_eq!(&buf[..6], b"prefix");
        assert_eq!(&buf[6..], &[0x00, 0x00, 0x00, 0x00, 0x09, 0x10]);
    }
}
