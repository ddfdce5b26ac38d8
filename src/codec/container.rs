//! Arrays and maps.
//!
//! Both start with a u32 count. `byte[]` is a blob (count then raw bytes); every other array is
//! count then each element through its own codec. Maps are count then key/value pairs.

use super::primitive::{self, read_blob};
use super::{Codec, CodecError};
use crate::ast::{ScalarKind, TypeNode};
use crate::buffer::WireBuffer;
use crate::value::Value;
use byteorder::{ByteOrder, LittleEndian};
use std::collections::HashMap;

/// Borrowed view over an encoded run of fixed-width scalars. Elements are decoded on access.
#[derive(Debug, Clone, Copy)]
pub struct ScalarView<'a> {
    kind: ScalarKind,
    width: usize,
    bytes: &'a [u8],
}

impl<'a> ScalarView<'a> {
    /// `None` if `kind` is not fixed-width or `bytes` is not a whole number of elements.
    pub fn new(kind: ScalarKind, bytes: &'a [u8]) -> Option<Self> {
        let width = kind.fixed_width()?;
        if bytes.len() % width != 0 {
            return None;
        }
        Some(ScalarView { kind, width, bytes })
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / self.width
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Underlying encoded bytes.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        if index >= self.len() {
            return None;
        }
        let b = &self.bytes[index * self.width..(index + 1) * self.width];
        Some(match self.kind {
            ScalarKind::Bool => Value::Bool(b[0] != 0),
            ScalarKind::Byte => Value::Byte(b[0]),
            ScalarKind::I16 => Value::I16(LittleEndian::read_i16(b)),
            ScalarKind::U16 => Value::U16(LittleEndian::read_u16(b)),
            ScalarKind::I32 => Value::I32(LittleEndian::read_i32(b)),
            ScalarKind::U32 => Value::U32(LittleEndian::read_u32(b)),
            ScalarKind::I64 => Value::I64(LittleEndian::read_i64(b)),
            ScalarKind::U64 => Value::U64(LittleEndian::read_u64(b)),
            ScalarKind::F32 => Value::F32(LittleEndian::read_f32(b)),
            ScalarKind::F64 => Value::F64(LittleEndian::read_f64(b)),
            ScalarKind::Date => Value::Date(crate::date::Date::from_ticks(LittleEndian::read_u64(b))),
            ScalarKind::Guid => {
                let mut wire = [0u8; crate::guid::GUID_SIZE];
                wire.copy_from_slice(b);
                Value::Guid(crate::guid::Guid::from_wire_bytes(&wire))
            }
            ScalarKind::String => return None,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Value> + 'a {
        let view = *self;
        (0..view.len()).filter_map(move |i| view.get(i))
    }
}

impl Codec {
    /// Check a decoded count against the configured cap and the bytes left in the input.
    fn check_count(&self, buf: &WireBuffer, count: usize, min_element: usize) -> Result<(), CodecError> {
        if count > self.options.max_collection_len {
            return Err(CodecError::OutOfMemory { requested: count });
        }
        // zero-width elements fit any remainder; only the cap above bounds them
        let needed = count.saturating_mul(min_element);
        if needed > buf.remaining() {
            return Err(CodecError::Malformed(format!(
                "count {} at offset {} needs at least {} bytes, {} remain",
                count,
                buf.position(),
                needed,
                buf.remaining()
            )));
        }
        Ok(())
    }

    pub(crate) fn encode_array(
        &self,
        buf: &mut WireBuffer,
        element: &TypeNode,
        value: &Value,
        depth: usize,
    ) -> Result<(), CodecError> {
        match value {
            Value::Bytes(bytes) if *element == TypeNode::Scalar(ScalarKind::Byte) => buf.write_bytes(bytes),
            Value::Array(items) => {
                buf.write_len(items.len())?;
                for item in items {
                    self.encode_type(buf, element, item, depth)?;
                }
                Ok(())
            }
            other => Err(CodecError::mismatch(format!("{}[]", element), other)),
        }
    }

    pub(crate) fn decode_array(&self, buf: &mut WireBuffer, element: &TypeNode, depth: usize) -> Result<Value, CodecError> {
        if let TypeNode::Scalar(ScalarKind::Byte) = element {
            return Ok(Value::Bytes(read_blob(buf, self.options.max_collection_len)?.to_vec()));
        }
        let count = buf.read_u32()? as usize;
        self.check_count(buf, count, self.resolved.min_encoded_size(element))?;
        if let TypeNode::Scalar(kind) = element {
            if let Some(values) = primitive::decode_numeric_run(buf, *kind, count)? {
                return Ok(Value::Array(values));
            }
        }
        let mut items = Vec::new();
        items
            .try_reserve_exact(count)
            .map_err(|_| CodecError::OutOfMemory { requested: count })?;
        for _ in 0..count {
            items.push(self.decode_type(buf, element, depth)?);
        }
        Ok(Value::Array(items))
    }

    /// Zero-copy read of a fixed-width scalar array at the read cursor.
    pub fn view_scalar_array<'b>(&self, buf: &'b mut WireBuffer, kind: ScalarKind) -> Result<ScalarView<'b>, CodecError> {
        let width = kind
            .fixed_width()
            .ok_or_else(|| CodecError::TypeMismatch {
                expected: "fixed-width scalar".to_string(),
                found: kind.name().to_string(),
            })?;
        let count = buf.read_u32()? as usize;
        self.check_count(buf, count, width)?;
        let bytes = buf.read_raw(count * width)?;
        ScalarView::new(kind, bytes).ok_or_else(|| CodecError::Malformed(format!("{}[] view", kind)))
    }

    pub(crate) fn encode_map(
        &self,
        buf: &mut WireBuffer,
        key: &TypeNode,
        val: &TypeNode,
        value: &Value,
        depth: usize,
    ) -> Result<(), CodecError> {
        let entries = match value {
            Value::Map(entries) => entries,
            other => return Err(CodecError::mismatch(format!("map[{}, {}]", key, val), other)),
        };
        buf.write_len(entries.len())?;
        for (k, v) in entries {
            self.encode_type(buf, key, k, depth)?;
            self.encode_type(buf, val, v, depth)?;
        }
        Ok(())
    }

    /// A repeated key keeps its first position and its last value.
    pub(crate) fn decode_map(
        &self,
        buf: &mut WireBuffer,
        key: &TypeNode,
        val: &TypeNode,
        depth: usize,
    ) -> Result<Value, CodecError> {
        let count = buf.read_u32()? as usize;
        let min_entry = self.resolved.min_encoded_size(key) + self.resolved.min_encoded_size(val);
        self.check_count(buf, count, min_entry)?;
        let mut entries: Vec<(Value, Value)> = Vec::new();
        entries
            .try_reserve_exact(count)
            .map_err(|_| CodecError::OutOfMemory { requested: count })?;
        // Keys are scalars or enums; their canonical encoding identifies them.
        let mut seen: HashMap<Vec<u8>, usize> = HashMap::new();
        let mut scratch = WireBuffer::with_capacity(32);
        for _ in 0..count {
            let k = self.decode_type(buf, key, depth)?;
            let v = self.decode_type(buf, val, depth)?;
            scratch.start_writing();
            self.encode_type(&mut scratch, key, &k, depth)?;
            match seen.get(scratch.as_bytes()) {
                Some(&i) => entries[i].1 = v,
                None => {
                    seen.insert(scratch.to_vec(), entries.len());
                    entries.push((k, v));
                }
            }
        }
        Ok(Value::Map(entries))
    }
}
