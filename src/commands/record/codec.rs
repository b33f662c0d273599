//! Binary codec for structured records.
//!
//! Wire format (all integers big-endian):
//! ```text
//! frame  := body_len:u32 body
//! body   := record
//! record := field* 0x00
//! field  := field_id:u8 type_tag:u8 value
//! ```
//!
//! Every field carries its own type tag, so a decoder can tell a malformed
//! payload from a valid one without any out-of-band schema. Zero-valued
//! fields are omitted by the encoder and restored as zero values on decode.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::record::Record;

/// Maximum encoded body size accepted or produced (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Maximum number of nested records in one frame
pub const MAX_DEPTH: usize = 64;

/// Size of the body length prefix
pub const FRAME_HEADER_LEN: usize = 4;

/// Field id terminating a record
const END: u8 = 0x00;

/// Minimum encoded size of one mapping entry (empty key + value)
const MIN_ENTRY_LEN: usize = 4 + 8;

/// Type tag written in front of every field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TypeTag {
    Int = 0x01,
    Str = 0x02,
    Map = 0x03,
    Bytes = 0x04,
    Record = 0x05,
}

impl TypeTag {
    fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(TypeTag::Int),
            0x02 => Some(TypeTag::Str),
            0x03 => Some(TypeTag::Map),
            0x04 => Some(TypeTag::Bytes),
            0x05 => Some(TypeTag::Record),
            _ => None,
        }
    }
}

/// Record fields in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Field {
    Number = 1,
    Text = 2,
    Counts = 3,
    Data = 4,
    Child = 5,
}

impl Field {
    fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Field::Number),
            2 => Some(Field::Text),
            3 => Some(Field::Counts),
            4 => Some(Field::Data),
            5 => Some(Field::Child),
            _ => None,
        }
    }

    fn tag(self) -> TypeTag {
        match self {
            Field::Number => TypeTag::Int,
            Field::Text => TypeTag::Str,
            Field::Counts => TypeTag::Map,
            Field::Data => TypeTag::Bytes,
            Field::Child => TypeTag::Record,
        }
    }
}

/// Errors produced while encoding or decoding a record.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CodecError {
    /// The input ended before a value was complete.
    #[error("insufficient data: need {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    /// A field id outside the record layout.
    #[error("unknown field id: {0}")]
    UnknownField(u8),

    /// A type tag byte that is not part of the format.
    #[error("unknown type tag: 0x{0:02X}")]
    UnknownType(u8),

    /// The type tag does not match the field it precedes.
    #[error("field {field} expects {expected:?}, found {found:?}")]
    TypeMismatch {
        field: u8,
        expected: TypeTag,
        found: TypeTag,
    },

    /// The same field appeared twice in one record.
    #[error("field {0} appears more than once")]
    DuplicateField(u8),

    /// The same key appeared twice in one mapping.
    #[error("mapping key {0:?} appears more than once")]
    DuplicateKey(String),

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// Nesting exceeds [`MAX_DEPTH`].
    #[error("record nesting exceeds {max} levels")]
    TooDeep { max: usize },

    /// Bytes remain in the frame after the outermost record ended.
    #[error("{0} trailing bytes after record")]
    TrailingBytes(usize),

    /// Frame body larger than [`MAX_FRAME_SIZE`].
    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// A length that does not fit in the u32 prefix.
    #[error("length {0} does not fit in a length prefix")]
    LengthOverflow(usize),
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encode a record as a complete frame (length prefix + body).
pub fn encode_frame(record: &Record) -> Result<Bytes, CodecError> {
    if record.depth() > MAX_DEPTH {
        return Err(CodecError::TooDeep { max: MAX_DEPTH });
    }

    let mut buf = BytesMut::with_capacity(128);
    buf.put_u32(0); // patched below
    encode_record(&mut buf, record)?;

    let body_len = buf.len() - FRAME_HEADER_LEN;
    if body_len > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            len: body_len,
            max: MAX_FRAME_SIZE,
        });
    }
    buf[..FRAME_HEADER_LEN].copy_from_slice(&(body_len as u32).to_be_bytes());

    Ok(buf.freeze())
}

fn encode_record(buf: &mut BytesMut, record: &Record) -> Result<(), CodecError> {
    if record.number != 0 {
        put_field(buf, Field::Number);
        buf.put_i64(record.number);
    }

    if !record.text.is_empty() {
        put_field(buf, Field::Text);
        put_bytes(buf, record.text.as_bytes())?;
    }

    if !record.counts.is_empty() {
        put_field(buf, Field::Counts);
        put_len(buf, record.counts.len())?;
        for (key, value) in &record.counts {
            put_bytes(buf, key.as_bytes())?;
            buf.put_i64(*value);
        }
    }

    if !record.data.is_empty() {
        put_field(buf, Field::Data);
        put_bytes(buf, &record.data)?;
    }

    if let Some(child) = &record.child {
        put_field(buf, Field::Child);
        encode_record(buf, child)?;
    }

    buf.put_u8(END);
    Ok(())
}

fn put_field(buf: &mut BytesMut, field: Field) {
    buf.put_u8(field as u8);
    buf.put_u8(field.tag() as u8);
}

fn put_len(buf: &mut BytesMut, len: usize) -> Result<(), CodecError> {
    let len = u32::try_from(len).map_err(|_| CodecError::LengthOverflow(len))?;
    buf.put_u32(len);
    Ok(())
}

fn put_bytes(buf: &mut BytesMut, bytes: &[u8]) -> Result<(), CodecError> {
    put_len(buf, bytes.len())?;
    buf.put_slice(bytes);
    Ok(())
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Read the body length from a frame header.
///
/// Rejects lengths above [`MAX_FRAME_SIZE`] so the caller never allocates
/// for an oversized frame.
pub fn body_len(header: [u8; FRAME_HEADER_LEN]) -> Result<usize, CodecError> {
    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            len,
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(len)
}

/// Decode one frame from the start of `bytes`.
///
/// Returns the record and the number of bytes consumed.
#[cfg(test)]
pub fn decode_frame(bytes: &[u8]) -> Result<(Record, usize), CodecError> {
    require(bytes, FRAME_HEADER_LEN)?;
    let header = [bytes[0], bytes[1], bytes[2], bytes[3]];
    let len = body_len(header)?;

    let rest = &bytes[FRAME_HEADER_LEN..];
    require(rest, len)?;

    let record = decode_body(&rest[..len])?;
    Ok((record, FRAME_HEADER_LEN + len))
}

/// Decode a frame body. The body must contain exactly one record.
pub fn decode_body(body: &[u8]) -> Result<Record, CodecError> {
    let mut buf = body;
    let record = decode_record(&mut buf, 1)?;

    if buf.has_remaining() {
        return Err(CodecError::TrailingBytes(buf.remaining()));
    }
    Ok(record)
}

fn decode_record(buf: &mut &[u8], depth: usize) -> Result<Record, CodecError> {
    if depth > MAX_DEPTH {
        return Err(CodecError::TooDeep { max: MAX_DEPTH });
    }

    let mut record = Record::default();
    let mut seen: u8 = 0;

    loop {
        let id = take_u8(buf)?;
        if id == END {
            return Ok(record);
        }

        let field = Field::from_u8(id).ok_or(CodecError::UnknownField(id))?;
        let tag_byte = take_u8(buf)?;
        let found = TypeTag::from_u8(tag_byte).ok_or(CodecError::UnknownType(tag_byte))?;
        if found != field.tag() {
            return Err(CodecError::TypeMismatch {
                field: id,
                expected: field.tag(),
                found,
            });
        }

        let bit = 1u8 << id;
        if seen & bit != 0 {
            return Err(CodecError::DuplicateField(id));
        }
        seen |= bit;

        match field {
            Field::Number => record.number = take_i64(buf)?,
            Field::Text => record.text = take_string(buf)?,
            Field::Counts => record.counts = take_counts(buf)?,
            Field::Data => record.data = take_bytes(buf)?.to_vec(),
            Field::Child => record.child = Some(Box::new(decode_record(buf, depth + 1)?)),
        }
    }
}

fn take_counts(buf: &mut &[u8]) -> Result<BTreeMap<String, i64>, CodecError> {
    let count = take_u32(buf)? as usize;
    require(buf, count.saturating_mul(MIN_ENTRY_LEN))?;

    let mut counts = BTreeMap::new();
    for _ in 0..count {
        let key = take_string(buf)?;
        let value = take_i64(buf)?;
        if counts.contains_key(&key) {
            return Err(CodecError::DuplicateKey(key));
        }
        counts.insert(key, value);
    }
    Ok(counts)
}

fn take_string(buf: &mut &[u8]) -> Result<String, CodecError> {
    let bytes = take_bytes(buf)?;
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| CodecError::InvalidUtf8)
}

fn take_bytes<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], CodecError> {
    let len = take_u32(buf)? as usize;
    require(buf, len)?;
    let (head, tail) = buf.split_at(len);
    *buf = tail;
    Ok(head)
}

fn take_u8(buf: &mut &[u8]) -> Result<u8, CodecError> {
    require(buf, 1)?;
    Ok(buf.get_u8())
}

fn take_u32(buf: &mut &[u8]) -> Result<u32, CodecError> {
    require(buf, 4)?;
    Ok(buf.get_u32())
}

fn take_i64(buf: &mut &[u8]) -> Result<i64, CodecError> {
    require(buf, 8)?;
    Ok(buf.get_i64())
}

fn require(buf: &[u8], needed: usize) -> Result<(), CodecError> {
    if buf.len() < needed {
        return Err(CodecError::Truncated {
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}
