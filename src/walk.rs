//! Zero-copy walk over encoded data using the schema.
//!
//! The walker advances a byte position by following record layouts without building
//! [`Value`](crate::value::Value) trees. Use it when you need the extent of a record, or want to
//! check that a record is well formed, without paying for a full decode.
//!
//! ## Skip vs validate
//!
//! | Use case | Prefer |
//! |----------|--------|
//! | Byte length of one record | [`record_extent`] / [`BinaryWalker::skip_record`] |
//! | Well-formedness without decoding | [`validate_record_in_place`] / [`BinaryWalker::validate_record`] |
//! | Full decode for inspection | [codec](crate::codec) |
//!
//! Skipping trusts length prefixes: a message or union is passed over in one jump once its
//! prefix is known to fit the input. Validation descends into bodies and checks what decode
//! would check: tags, terminators, discriminators, and that nothing runs past a declared end.
//! Arrays whose element type has a fixed size are passed over in one jump in both modes.
//!
//! ## Example
//!
//! ```ignore
//! use schemawire::{record_extent, ResolvedSchema};
//!
//! let resolved: ResolvedSchema = /* ... */;
//! let stream: &[u8] = /* concatenated records */;
//! let n = record_extent(stream, 0, &resolved, "Person")?;
//! // n = number of bytes the first Person occupies
//! ```

use crate::ast::*;
use crate::buffer::LENGTH_PREFIX_SIZE;
use crate::codec::CodecError;
use byteorder::{ByteOrder, LittleEndian};

/// Default nesting limit, same as [`CodecOptions`](crate::codec::CodecOptions).
const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Skip,
    Validate,
}

/// Read-only walker over encoded records.
///
/// Position is tracked in [`BinaryWalker::position`]; [`BinaryWalker::remaining`] gives the
/// slice from the current position to the end. No decoded values are allocated.
pub struct BinaryWalker<'a> {
    data: &'a [u8],
    pos: usize,
    resolved: &'a ResolvedSchema,
    max_depth: usize,
}

impl<'a> BinaryWalker<'a> {
    pub fn new(data: &'a [u8], resolved: &'a ResolvedSchema) -> Self {
        BinaryWalker::at(data, 0, resolved)
    }

    pub fn at(data: &'a [u8], start: usize, resolved: &'a ResolvedSchema) -> Self {
        BinaryWalker {
            data,
            pos: start,
            resolved,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> &[u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    /// Skip one record; returns the number of bytes skipped.
    pub fn skip_record(&mut self, name: &str) -> Result<usize, CodecError> {
        self.walk_named(name, Mode::Skip)
    }

    /// Walk one record checking its structure; returns the number of bytes it occupies.
    pub fn validate_record(&mut self, name: &str) -> Result<usize, CodecError> {
        self.walk_named(name, Mode::Validate)
    }

    /// Skip one value of `ty`.
    pub fn skip_type(&mut self, ty: &TypeNode) -> Result<(), CodecError> {
        self.walk_type(ty, Mode::Skip, 0)
    }

    fn walk_named(&mut self, name: &str, mode: Mode) -> Result<usize, CodecError> {
        let start = self.pos;
        let record = self
            .resolved
            .get_record(name)
            .ok_or_else(|| CodecError::UnknownType(name.to_string()))?;
        self.walk_record(record, mode, 0)?;
        Ok(self.pos - start)
    }

    fn available(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn advance(&mut self, n: usize) -> Result<(), CodecError> {
        if n > self.available() {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: n,
                available: self.available(),
            });
        }
        self.pos += n;
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        self.advance(1)?;
        Ok(self.data[self.pos - 1])
    }

    fn read_u32(&mut self) -> Result<u32, CodecError> {
        self.advance(LENGTH_PREFIX_SIZE)?;
        Ok(LittleEndian::read_u32(&self.data[self.pos - LENGTH_PREFIX_SIZE..self.pos]))
    }

    /// Read a length prefix and check `length + extra` bytes follow it.
    fn read_length(&mut self, extra: usize) -> Result<usize, CodecError> {
        let offset = self.pos;
        let len = self.read_u32()? as usize;
        if len + extra > self.available() {
            return Err(CodecError::LengthOutOfBounds {
                offset,
                length: (len + extra) as u64,
                available: self.available(),
            });
        }
        Ok(len)
    }

    fn check_depth(&self, depth: usize) -> Result<usize, CodecError> {
        if depth >= self.max_depth {
            return Err(CodecError::DepthExceeded { limit: self.max_depth });
        }
        Ok(depth + 1)
    }

    fn walk_record(&mut self, record: &RecordDefinition, mode: Mode, depth: usize) -> Result<(), CodecError> {
        let depth = self.check_depth(depth)?;
        match record {
            RecordDefinition::Struct(s) => {
                for f in &s.fields {
                    self.walk_type(&f.ty, mode, depth)?;
                }
                Ok(())
            }
            RecordDefinition::Message(m) => {
                let len = self.read_length(0)?;
                let end = self.pos + len;
                if mode == Mode::Skip {
                    self.pos = end;
                    return Ok(());
                }
                loop {
                    if self.pos >= end {
                        return Err(CodecError::Overrun {
                            record: m.name.clone(),
                            end,
                        });
                    }
                    let tag = self.read_u8()?;
                    if tag == 0 {
                        break;
                    }
                    match m.field_by_tag(tag) {
                        Some(f) => self.walk_type(&f.ty, mode, depth)?,
                        // unknown tag: remainder of the body is opaque
                        None => break,
                    }
                    if self.pos > end {
                        return Err(CodecError::Overrun {
                            record: m.name.clone(),
                            end,
                        });
                    }
                }
                self.pos = end;
                Ok(())
            }
            RecordDefinition::Union(u) => {
                let len = self.read_length(1)?;
                let end = self.pos + 1 + len;
                if mode == Mode::Skip {
                    self.pos = end;
                    return Ok(());
                }
                let discriminator = self.read_u8()?;
                let branch = u.branch(discriminator).ok_or_else(|| CodecError::UnknownDiscriminator {
                    union: u.name.clone(),
                    discriminator,
                    end,
                })?;
                let inner = self
                    .resolved
                    .get_record(&branch.definition)
                    .ok_or_else(|| CodecError::UnknownType(branch.definition.clone()))?;
                self.walk_record(inner, mode, depth)?;
                if self.pos > end {
                    return Err(CodecError::Overrun {
                        record: u.name.clone(),
                        end,
                    });
                }
                self.pos = end;
                Ok(())
            }
        }
    }

    /// Skip `count` values of `ty`, in one jump when every value has the same size.
    fn walk_run(&mut self, ty: &TypeNode, count: usize, mode: Mode, depth: usize) -> Result<(), CodecError> {
        if let Some(width) = self.resolved.fixed_encoded_size(ty) {
            return self.advance(count.saturating_mul(width));
        }
        let min = self.resolved.min_encoded_size(ty);
        if count.saturating_mul(min) > self.available() {
            return Err(CodecError::Malformed(format!(
                "count {} of {} at offset {} cannot fit in {} bytes",
                count,
                ty,
                self.pos,
                self.available()
            )));
        }
        for _ in 0..count {
            self.walk_type(ty, mode, depth)?;
        }
        Ok(())
    }

    fn walk_type(&mut self, ty: &TypeNode, mode: Mode, depth: usize) -> Result<(), CodecError> {
        match ty {
            TypeNode::Scalar(ScalarKind::String) => {
                let len = self.read_length(0)?;
                self.advance(len)
            }
            TypeNode::Scalar(kind) => self.advance(kind.fixed_width().unwrap_or(0)),
            TypeNode::Array(element) => {
                let depth = self.check_depth(depth)?;
                if ty.is_bytes() {
                    let len = self.read_length(0)?;
                    return self.advance(len);
                }
                let count = self.read_u32()? as usize;
                self.walk_run(element, count, mode, depth)
            }
            TypeNode::Map(key, value) => {
                let depth = self.check_depth(depth)?;
                let count = self.read_u32()? as usize;
                let fixed = self
                    .resolved
                    .fixed_encoded_size(key)
                    .zip(self.resolved.fixed_encoded_size(value));
                if let Some((k, v)) = fixed {
                    return self.advance(count.saturating_mul(k + v));
                }
                let min = self.resolved.min_encoded_size(key) + self.resolved.min_encoded_size(value);
                if count.saturating_mul(min) > self.available() {
                    return Err(CodecError::Malformed(format!(
                        "map count {} at offset {} cannot fit in {} bytes",
                        count,
                        self.pos,
                        self.available()
                    )));
                }
                for _ in 0..count {
                    self.walk_type(key, mode, depth)?;
                    self.walk_type(value, mode, depth)?;
                }
                Ok(())
            }
            TypeNode::Defined(name) => match self.resolved.get(name) {
                Some(Definition::Enum(e)) => self.advance(e.underlying.fixed_width().unwrap_or(0)),
                Some(Definition::Record(r)) => self.walk_record(r, mode, depth),
                _ => Err(CodecError::UnknownType(name.clone())),
            },
        }
    }
}

/// Returns the number of bytes the record `name` starting at `start` occupies.
pub fn record_extent(data: &[u8], start: usize, resolved: &ResolvedSchema, name: &str) -> Result<usize, CodecError> {
    BinaryWalker::at(data, start, resolved).skip_record(name)
}

/// Checks the record at `start` is well formed without decoding it; returns its extent.
pub fn validate_record_in_place(
    data: &[u8],
    start: usize,
    resolved: &ResolvedSchema,
    name: &str,
) -> Result<usize, CodecError> {
    BinaryWalker::at(data, start, resolved).validate_record(name)
}
