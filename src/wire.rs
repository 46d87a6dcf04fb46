use byteorder::{ByteOrder, LittleEndian};
use memchr::memchr;

use crate::error::ReadError;

/// The maximum number of bytes a single varint may occupy.
const MAX_VARINT_LEN: usize = 10;

/// A decoded field from a self-describing tag/length/value envelope.
///
/// The envelope format is the protobuf wire format: each field is a varint
/// key `(field_number << 3) | wire_type` followed by a payload whose size is
/// determined by the wire type. Fixed-width payloads are little-endian
/// regardless of the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    /// Wire type 0. Carries bools, enums and all varint-encoded integers.
    Varint(u64),
    /// Wire type 1. Carries doubles and 64-bit fixed integers.
    Fixed64(u64),
    /// Wire type 2. Carries strings, bytes and nested messages. The slice
    /// borrows from the envelope.
    Bytes(&'a [u8]),
    /// Wire type 5. Carries floats and 32-bit fixed integers.
    Fixed32(u32),
}

impl<'a> FieldValue<'a> {
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            FieldValue::Varint(v) => Some(v),
            FieldValue::Fixed64(v) => Some(v),
            FieldValue::Fixed32(v) => Some(u64::from(v)),
            FieldValue::Bytes(_) => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.as_u64().map(|v| v as u32)
    }

    /// The value as a signed integer, assuming two's complement varint
    /// encoding (protobuf `int32`/`int64`).
    pub fn as_i64(&self) -> Option<i64> {
        self.as_u64().map(|v| v as i64)
    }

    /// The value as a signed integer, assuming zigzag encoding (protobuf
    /// `sint32`/`sint64`).
    pub fn as_sint64(&self) -> Option<i64> {
        self.as_u64().map(decode_zigzag)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            FieldValue::Fixed64(v) => Some(f64::from_bits(v)),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            FieldValue::Fixed32(v) => Some(f32::from_bits(v)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_u64().map(|v| v != 0)
    }

    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match *self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The payload of a string field, with trailing nul padding removed.
    ///
    /// Kernel tracepoints copy fixed-size char arrays into the event verbatim,
    /// so device and task names routinely arrive padded with nul bytes.
    pub fn as_str_bytes(&self) -> Option<&'a [u8]> {
        self.as_bytes().map(strip_nul_padding)
    }

    /// The payload interpreted as a nested message.
    pub fn as_message(&self) -> Option<FieldIter<'a>> {
        self.as_bytes().map(FieldIter::new)
    }
}

/// Truncate `bytes` at the first nul byte, if any.
pub fn strip_nul_padding(bytes: &[u8]) -> &[u8] {
    match memchr(0, bytes) {
        Some(pos) => &bytes[..pos],
        None => bytes,
    }
}

pub fn decode_zigzag(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

pub fn encode_zigzag(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

fn read_varint(data: &mut &[u8]) -> Result<u64, ReadError> {
    let mut value: u64 = 0;
    for (i, &byte) in data.iter().enumerate() {
        if i >= MAX_VARINT_LEN {
            return Err(ReadError::VarintTooLong);
        }
        value |= u64::from(byte & 0x7f) << (i * 7);
        if byte & 0x80 == 0 {
            *data = &data[i + 1..];
            return Ok(value);
        }
    }
    Err(ReadError::Varint)
}

/// An iterator over the fields of one envelope (or nested message).
///
/// Yields `(field_number, value)` pairs in the order they appear. Unknown
/// field numbers are the caller's business; the iterator only fails on
/// structurally malformed data.
#[derive(Debug, Clone)]
pub struct FieldIter<'a> {
    data: &'a [u8],
}

impl<'a> FieldIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn read_field(&mut self) -> Result<(u32, FieldValue<'a>), ReadError> {
        let key = read_varint(&mut self.data).map_err(|_| ReadError::FieldKey)?;
        let field_number = (key >> 3) as u32;
        if field_number == 0 {
            return Err(ReadError::ZeroFieldNumber);
        }
        let value = match key & 0x7 {
            0 => FieldValue::Varint(read_varint(&mut self.data)?),
            1 => {
                if self.data.len() < 8 {
                    return Err(ReadError::Fixed64);
                }
                let v = LittleEndian::read_u64(self.data);
                self.data = &self.data[8..];
                FieldValue::Fixed64(v)
            }
            2 => {
                let len = read_varint(&mut self.data)
                    .map_err(|_| ReadError::LengthDelimitedLen)?;
                let len =
                    usize::try_from(len).map_err(|_| ReadError::LengthDelimitedPayload)?;
                if self.data.len() < len {
                    return Err(ReadError::LengthDelimitedPayload);
                }
                let (payload, rest) = self.data.split_at(len);
                self.data = rest;
                FieldValue::Bytes(payload)
            }
            3 | 4 => return Err(ReadError::GroupWireType),
            5 => {
                if self.data.len() < 4 {
                    return Err(ReadError::Fixed32);
                }
                let v = LittleEndian::read_u32(self.data);
                self.data = &self.data[4..];
                FieldValue::Fixed32(v)
            }
            _ => return Err(ReadError::ReservedWireType),
        };
        Ok((field_number, value))
    }

    /// Find the first occurrence of `field_number` without consuming the
    /// iterator. Stops at the first malformed field.
    pub fn find(&self, field_number: u32) -> Option<FieldValue<'a>> {
        let mut iter = self.clone();
        while let Some(Ok((number, value))) = iter.next() {
            if number == field_number {
                return Some(value);
            }
        }
        None
    }
}

impl<'a> Iterator for FieldIter<'a> {
    type Item = Result<(u32, FieldValue<'a>), ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }
        match self.read_field() {
            Ok(field) => Some(Ok(field)),
            Err(e) => {
                // Once a field is malformed there is no resynchronization
                // point; drop the rest of the envelope.
                self.data = &[];
                Some(Err(e))
            }
        }
    }
}

/// Builds tag/length/value envelopes.
///
/// Mostly useful for tests and for tools that synthesize event streams; the
/// parser itself only reads.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    buf: Vec<u8>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    fn push_varint(&mut self, mut v: u64) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.buf.push(byte);
                return;
            }
            self.buf.push(byte | 0x80);
        }
    }

    fn push_key(&mut self, field_number: u32, wire_type: u64) {
        self.push_varint((u64::from(field_number) << 3) | wire_type);
    }

    pub fn varint(&mut self, field_number: u32, value: u64) -> &mut Self {
        self.push_key(field_number, 0);
        self.push_varint(value);
        self
    }

    pub fn int(&mut self, field_number: u32, value: i64) -> &mut Self {
        self.varint(field_number, value as u64)
    }

    pub fn sint(&mut self, field_number: u32, value: i64) -> &mut Self {
        self.varint(field_number, encode_zigzag(value))
    }

    pub fn bool(&mut self, field_number: u32, value: bool) -> &mut Self {
        self.varint(field_number, u64::from(value))
    }

    pub fn fixed64(&mut self, field_number: u32, value: u64) -> &mut Self {
        self.push_key(field_number, 1);
        let mut bytes = [0; 8];
        LittleEndian::write_u64(&mut bytes, value);
        self.buf.extend_from_slice(&bytes);
        self
    }

    pub fn double(&mut self, field_number: u32, value: f64) -> &mut Self {
        self.fixed64(field_number, value.to_bits())
    }

    pub fn fixed32(&mut self, field_number: u32, value: u32) -> &mut Self {
        self.push_key(field_number, 5);
        let mut bytes = [0; 4];
        LittleEndian::write_u32(&mut bytes, value);
        self.buf.extend_from_slice(&bytes);
        self
    }

    pub fn float(&mut self, field_number: u32, value: f32) -> &mut Self {
        self.fixed32(field_number, value.to_bits())
    }

    pub fn bytes(&mut self, field_number: u32, value: &[u8]) -> &mut Self {
        self.push_key(field_number, 2);
        self.push_varint(value.len() as u64);
        self.buf.extend_from_slice(value);
        self
    }

    pub fn string(&mut self, field_number: u32, value: &str) -> &mut Self {
        self.bytes(field_number, value.as_bytes())
    }

    pub fn message(&mut self, field_number: u32, inner: &MessageBuilder) -> &mut Self {
        self.bytes(field_number, &inner.buf)
    }

    pub fn build(&self) -> Vec<u8> {
        self.buf.clone()
    }
}

#[cfg(test)]
mod test {
    use super::{decode_zigzag, encode_zigzag, FieldIter, FieldValue, MessageBuilder};
    use crate::error::ReadError;

    #[test]
    fn roundtrip_field_types() {
        let mut nested = MessageBuilder::new();
        nested.varint(1, 42);
        let mut b = MessageBuilder::new();
        b.varint(1, 150)
            .string(2, "swapper/0")
            .double(3, 12.5)
            .fixed32(4, 7)
            .sint(5, -3)
            .message(6, &nested);
        let data = b.build();

        let fields: Vec<_> = FieldIter::new(&data).map(Result::unwrap).collect();
        assert_eq!(fields.len(), 6);
        assert_eq!(fields[0], (1, FieldValue::Varint(150)));
        assert_eq!(fields[1].1.as_str_bytes(), Some(&b"swapper/0"[..]));
        assert_eq!(fields[2].1.as_f64(), Some(12.5));
        assert_eq!(fields[3].1.as_u32(), Some(7));
        assert_eq!(fields[4].1.as_sint64(), Some(-3));
        let inner = fields[5].1.as_message().unwrap();
        assert_eq!(inner.find(1), Some(FieldValue::Varint(42)));
    }

    #[test]
    fn nul_padding_is_stripped() {
        let mut b = MessageBuilder::new();
        b.bytes(1, b"eth0\0\0\0\0\0\0\0\0\0\0\0\0");
        let data = b.build();
        let value = FieldIter::new(&data).find(1).unwrap();
        assert_eq!(value.as_str_bytes(), Some(&b"eth0"[..]));
    }

    #[test]
    fn truncated_payload_is_an_error() {
        // Field 1, wire type 2, claimed length 10, only 2 bytes present.
        let data = [0x0a, 10, 1, 2];
        let results: Vec<_> = FieldIter::new(&data).collect();
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].unwrap_err(),
            ReadError::LengthDelimitedPayload
        );
    }

    #[test]
    fn unknown_fields_are_yielded_not_rejected() {
        let mut b = MessageBuilder::new();
        b.varint(999, 1).varint(2, 10);
        let data = b.build();
        let fields: Vec<_> = FieldIter::new(&data).map(Result::unwrap).collect();
        assert_eq!(fields[0].0, 999);
        assert_eq!(fields[1].0, 2);
    }

    #[test]
    fn zigzag() {
        for v in [0i64, -1, 1, i64::MIN, i64::MAX, -123456789] {
            assert_eq!(decode_zigzag(encode_zigzag(v)), v);
        }
    }
}
