//! Encode/decode values against a resolved schema.
//!
//! [`Codec`] dispatches on [`TypeNode`]: scalars and enums go to the primitive codec, arrays and
//! maps to the container codec, and defined records to the record codec (struct, message or
//! union). Every path reads and writes through a [`WireBuffer`].
//!
//! Encoding appends at the buffer's write cursor; decoding consumes from its read cursor. The
//! `*_into` / `*_from` variants work against a caller-owned buffer so records can be composed
//! into larger streams; [`Codec::encode`] and [`Codec::decode`] are the one-shot forms.

mod container;
mod primitive;
mod record;

pub use container::ScalarView;
pub(crate) use primitive::scalar_size;

use crate::ast::{Definition, RecordDefinition, ResolvedSchema, ScalarKind, TypeNode};
use crate::buffer::{with_thread_buffer, WireBuffer, DEFAULT_CAPACITY};
use crate::guid::GuidParseError;
use crate::value::Value;
use std::io::Write;

/// Failure classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Truncated input, inconsistent length prefix, unknown discriminator, read past a record end.
    MalformedInput,
    /// A decoded count too large to allocate.
    OutOfMemory,
    /// A name that is not in the schema.
    UnresolvedType,
    /// A value missing where the schema requires one, or of the wrong shape.
    NullArgument,
    /// A value the wire format cannot represent.
    InvalidArgument,
    Io,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("truncated input at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("length prefix at offset {offset} declares {length} bytes, only {available} available")]
    LengthOutOfBounds {
        offset: usize,
        length: u64,
        available: usize,
    },
    #[error("{record}: body runs past its declared end at offset {end}")]
    Overrun { record: String, end: usize },
    #[error("union {union}: unknown discriminator {discriminator} (value ends at offset {end})")]
    UnknownDiscriminator {
        union: String,
        discriminator: u8,
        end: usize,
    },
    #[error("malformed input: {0}")]
    Malformed(String),
    #[error("cannot allocate {requested} elements")]
    OutOfMemory { requested: usize },
    #[error("nesting deeper than {limit} levels")]
    DepthExceeded { limit: usize },
    #[error("unknown type: {0}")]
    UnknownType(String),
    #[error("missing value for {0}")]
    MissingValue(String),
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
    #[error("value {value} out of range for {kind}")]
    ValueOutOfRange { kind: ScalarKind, value: i128 },
    #[error("invalid GUID: {0}")]
    InvalidGuid(#[from] GuidParseError),
    #[error("length slot at {position} outside written data ({length} bytes)")]
    InvalidPosition { position: usize, length: usize },
    #[error("length {0} does not fit a 4-byte prefix")]
    TooLarge(usize),
}

impl CodecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::Io(_) => ErrorKind::Io,
            CodecError::Truncated { .. }
            | CodecError::LengthOutOfBounds { .. }
            | CodecError::Overrun { .. }
            | CodecError::UnknownDiscriminator { .. }
            | CodecError::Malformed(_)
            | CodecError::DepthExceeded { .. } => ErrorKind::MalformedInput,
            CodecError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            CodecError::UnknownType(_) => ErrorKind::UnresolvedType,
            CodecError::MissingValue(_) | CodecError::TypeMismatch { .. } => ErrorKind::NullArgument,
            CodecError::ValueOutOfRange { .. }
            | CodecError::InvalidGuid(_)
            | CodecError::InvalidPosition { .. }
            | CodecError::TooLarge(_) => ErrorKind::InvalidArgument,
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.kind() == ErrorKind::MalformedInput
    }

    pub(crate) fn mismatch(expected: impl Into<String>, found: &Value) -> Self {
        CodecError::TypeMismatch {
            expected: expected.into(),
            found: found.kind_name().to_string(),
        }
    }
}

/// Codec limits and buffer sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecOptions {
    /// Initial capacity of buffers the codec allocates itself.
    pub initial_capacity: usize,
    /// Maximum nesting of records and containers, on encode and decode.
    pub max_depth: usize,
    /// Maximum element count of a decoded array or map, and byte length of a string or blob.
    ///
    /// Counts are also checked against the bytes left in the input, but elements that encode
    /// to nothing (an empty struct) take no input, so an array of them is bounded by this
    /// limit alone. Lower it when decoding untrusted input against such schemas.
    pub max_collection_len: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        CodecOptions {
            initial_capacity: DEFAULT_CAPACITY,
            max_depth: 64,
            max_collection_len: 16 * 1024 * 1024,
        }
    }
}

impl CodecOptions {
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_collection_len(mut self, len: usize) -> Self {
        self.max_collection_len = len;
        self
    }
}

#[derive(Debug)]
pub struct Codec {
    resolved: ResolvedSchema,
    options: CodecOptions,
}

impl Codec {
    pub fn new(resolved: ResolvedSchema) -> Self {
        Codec::with_options(resolved, CodecOptions::default())
    }

    pub fn with_options(resolved: ResolvedSchema, options: CodecOptions) -> Self {
        Codec { resolved, options }
    }

    pub fn schema(&self) -> &ResolvedSchema {
        &self.resolved
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    /// A write-mode buffer sized by [`CodecOptions::initial_capacity`].
    pub fn new_buffer(&self) -> WireBuffer {
        WireBuffer::with_capacity(self.options.initial_capacity)
    }

    pub(crate) fn record(&self, name: &str) -> Result<&RecordDefinition, CodecError> {
        self.resolved
            .get_record(name)
            .ok_or_else(|| CodecError::UnknownType(name.to_string()))
    }

    /// Encode a record by name into a fresh byte vector.
    pub fn encode(&self, name: &str, value: &Value) -> Result<Vec<u8>, CodecError> {
        let record = self.record(name)?;
        with_thread_buffer(|buf| {
            buf.start_writing();
            self.encode_record(buf, record, value, 0)?;
            Ok(buf.to_vec())
        })
    }

    /// Append the encoding of a record to `buf` (write mode). On failure nothing is appended.
    pub fn encode_into(&self, buf: &mut WireBuffer, name: &str, value: &Value) -> Result<(), CodecError> {
        let record = self.record(name)?;
        let start = buf.len();
        self.encode_record(buf, record, value, 0).inspect_err(|_| buf.truncate(start))
    }

    /// Append the encoding of any schema type to `buf`. On failure nothing is appended.
    pub fn encode_type_into(&self, buf: &mut WireBuffer, ty: &TypeNode, value: &Value) -> Result<(), CodecError> {
        let start = buf.len();
        self.encode_type(buf, ty, value, 0).inspect_err(|_| buf.truncate(start))
    }

    /// Encode a record and write it to `w`; returns the number of bytes written.
    pub fn write_to<W: Write>(&self, w: &mut W, name: &str, value: &Value) -> Result<usize, CodecError> {
        let bytes = self.encode(name, value)?;
        w.write_all(&bytes)?;
        Ok(bytes.len())
    }

    /// Decode one record from the start of `bytes`. Trailing bytes are ignored.
    pub fn decode(&self, name: &str, bytes: &[u8]) -> Result<Value, CodecError> {
        self.decode_prefix(name, bytes).map(|(value, _)| value)
    }

    /// Decode one record from the start of `bytes` and report how many bytes it used.
    pub fn decode_prefix(&self, name: &str, bytes: &[u8]) -> Result<(Value, usize), CodecError> {
        let record = self.record(name)?;
        let mut buf = WireBuffer::from_bytes(bytes);
        let value = self.decode_record(&mut buf, record, 0)?;
        Ok((value, buf.position()))
    }

    /// Decode a record at the read cursor. On failure the cursor is put back where it was.
    pub fn decode_from(&self, buf: &mut WireBuffer, name: &str) -> Result<Value, CodecError> {
        let record = self.record(name)?;
        let start = buf.position();
        self.decode_record(buf, record, 0).inspect_err(|_| {
            // start was a valid position before the attempt
            let _ = buf.seek(start);
        })
    }

    /// Decode any schema type at the read cursor. On failure the cursor is put back.
    pub fn decode_type_from(&self, buf: &mut WireBuffer, ty: &TypeNode) -> Result<Value, CodecError> {
        let start = buf.position();
        self.decode_type(buf, ty, 0).inspect_err(|_| {
            let _ = buf.seek(start);
        })
    }

    fn enter(&self, depth: usize) -> Result<usize, CodecError> {
        if depth >= self.options.max_depth {
            return Err(CodecError::DepthExceeded {
                limit: self.options.max_depth,
            });
        }
        Ok(depth + 1)
    }

    pub(crate) fn encode_type(
        &self,
        buf: &mut WireBuffer,
        ty: &TypeNode,
        value: &Value,
        depth: usize,
    ) -> Result<(), CodecError> {
        match ty {
            TypeNode::Scalar(kind) => primitive::encode_scalar(buf, *kind, value),
            TypeNode::Array(element) => self.encode_array(buf, element, value, self.enter(depth)?),
            TypeNode::Map(key, val) => self.encode_map(buf, key, val, value, self.enter(depth)?),
            TypeNode::Defined(name) => match self.resolved.get(name) {
                Some(Definition::Enum(e)) => primitive::encode_scalar(buf, e.underlying, value),
                Some(Definition::Record(r)) => self.encode_record(buf, r, value, depth),
                _ => Err(CodecError::UnknownType(name.clone())),
            },
        }
    }

    pub(crate) fn decode_type(&self, buf: &mut WireBuffer, ty: &TypeNode, depth: usize) -> Result<Value, CodecError> {
        match ty {
            TypeNode::Scalar(kind) => primitive::decode_scalar(buf, *kind, self.options.max_collection_len),
            TypeNode::Array(element) => self.decode_array(buf, element, self.enter(depth)?),
            TypeNode::Map(key, val) => self.decode_map(buf, key, val, self.enter(depth)?),
            TypeNode::Defined(name) => match self.resolved.get(name) {
                Some(Definition::Enum(e)) => {
                    primitive::decode_scalar(buf, e.underlying, self.options.max_collection_len)
                }
                Some(Definition::Record(r)) => self.decode_record(buf, r, depth),
                _ => Err(CodecError::UnknownType(name.clone())),
            },
        }
    }
}
