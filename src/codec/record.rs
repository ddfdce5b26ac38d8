//! Struct, message and union encoding.
//!
//! - Struct: fields in declaration order, no framing.
//! - Message: `[len][tag value]*[0]`; `len` counts everything after the prefix.
//! - Union: `[len][discriminator][body]`; `len` counts the body only.

use super::{Codec, CodecError};
use crate::ast::{MessageDefinition, RecordDefinition, StructDefinition, UnionDefinition};
use crate::buffer::{LengthSlot, WireBuffer};
use crate::value::Value;
use std::collections::HashMap;
use tracing::{debug, trace};

fn fields_of<'v>(kind: &str, name: &str, value: &'v Value) -> Result<&'v HashMap<String, Value>, CodecError> {
    value
        .as_record()
        .ok_or_else(|| CodecError::mismatch(format!("{} {}", kind, name), value))
}

fn close_length(buf: &mut WireBuffer, slot: LengthSlot, start: usize) -> Result<(), CodecError> {
    let len = buf.len() - start;
    let len = u32::try_from(len).map_err(|_| CodecError::TooLarge(len))?;
    buf.fill_length_prefix(slot, len)
}

impl Codec {
    pub(crate) fn encode_record(
        &self,
        buf: &mut WireBuffer,
        record: &RecordDefinition,
        value: &Value,
        depth: usize,
    ) -> Result<(), CodecError> {
        let depth = self.enter(depth)?;
        trace!(record = record.name(), kind = record.kind_name(), "encode");
        match record {
            RecordDefinition::Struct(s) => self.encode_struct(buf, s, value, depth),
            RecordDefinition::Message(m) => self.encode_message(buf, m, value, depth),
            RecordDefinition::Union(u) => self.encode_union(buf, u, value, depth),
        }
    }

    pub(crate) fn decode_record(
        &self,
        buf: &mut WireBuffer,
        record: &RecordDefinition,
        depth: usize,
    ) -> Result<Value, CodecError> {
        let depth = self.enter(depth)?;
        trace!(record = record.name(), kind = record.kind_name(), offset = buf.position(), "decode");
        match record {
            RecordDefinition::Struct(s) => self.decode_struct(buf, s, depth),
            RecordDefinition::Message(m) => self.decode_message(buf, m, depth),
            RecordDefinition::Union(u) => self.decode_union(buf, u, depth),
        }
    }

    fn encode_struct(
        &self,
        buf: &mut WireBuffer,
        def: &StructDefinition,
        value: &Value,
        depth: usize,
    ) -> Result<(), CodecError> {
        let fields = fields_of("struct", &def.name, value)?;
        for f in &def.fields {
            let v = fields
                .get(&f.name)
                .ok_or_else(|| CodecError::MissingValue(format!("{}.{}", def.name, f.name)))?;
            self.encode_type(buf, &f.ty, v, depth)?;
        }
        Ok(())
    }

    fn decode_struct(&self, buf: &mut WireBuffer, def: &StructDefinition, depth: usize) -> Result<Value, CodecError> {
        let mut out = HashMap::with_capacity(def.fields.len());
        for f in &def.fields {
            let v = self.decode_type(buf, &f.ty, depth)?;
            out.insert(f.name.clone(), v);
        }
        Ok(Value::Record(out))
    }

    /// Absent and deprecated fields are not written.
    fn encode_message(
        &self,
        buf: &mut WireBuffer,
        def: &MessageDefinition,
        value: &Value,
        depth: usize,
    ) -> Result<(), CodecError> {
        let fields = fields_of("message", &def.name, value)?;
        let slot = buf.reserve_length_prefix();
        let start = buf.len();
        for f in def.fields.iter().filter(|f| !f.is_deprecated()) {
            if let Some(v) = fields.get(&f.name) {
                buf.write_byte(f.constant);
                self.encode_type(buf, &f.ty, v, depth)?;
            }
        }
        buf.write_byte(0);
        close_length(buf, slot, start)
    }

    /// Stops at tag 0. An unknown tag means a newer writer: everything up to the declared end
    /// is skipped and the fields read so far are returned.
    fn decode_message(&self, buf: &mut WireBuffer, def: &MessageDefinition, depth: usize) -> Result<Value, CodecError> {
        let len = buf.read_length_prefix()? as usize;
        let end = buf.position() + len;
        let mut out = HashMap::new();
        loop {
            if buf.position() >= end {
                return Err(CodecError::Overrun {
                    record: def.name.clone(),
                    end,
                });
            }
            let tag = buf.read_byte()?;
            if tag == 0 {
                break;
            }
            let field = match def.field_by_tag(tag) {
                Some(f) => f,
                None => {
                    debug!(record = %def.name, tag, end, "unknown tag, skipping to end of message");
                    buf.seek(end)?;
                    return Ok(Value::Record(out));
                }
            };
            let v = self.decode_type(buf, &field.ty, depth)?;
            if buf.position() > end {
                return Err(CodecError::Overrun {
                    record: def.name.clone(),
                    end,
                });
            }
            out.insert(field.name.clone(), v);
        }
        // Padding after the terminator belongs to this message.
        buf.seek(end)?;
        Ok(Value::Record(out))
    }

    fn encode_union(
        &self,
        buf: &mut WireBuffer,
        def: &UnionDefinition,
        value: &Value,
        depth: usize,
    ) -> Result<(), CodecError> {
        let (discriminator, inner) = value
            .as_union()
            .ok_or_else(|| CodecError::mismatch(format!("union {}", def.name), value))?;
        let branch = def.branch(discriminator).ok_or_else(|| CodecError::TypeMismatch {
            expected: format!("a branch of union {}", def.name),
            found: format!("discriminator {}", discriminator),
        })?;
        let record = self.record(&branch.definition)?;
        let slot = buf.reserve_length_prefix();
        buf.write_byte(discriminator);
        let start = buf.len();
        self.encode_record(buf, record, inner, depth)?;
        close_length(buf, slot, start)
    }

    fn decode_union(&self, buf: &mut WireBuffer, def: &UnionDefinition, depth: usize) -> Result<Value, CodecError> {
        let offset = buf.position();
        let len = buf.read_u32()? as usize;
        // The prefix does not count the discriminator byte.
        if len + 1 > buf.remaining() {
            return Err(CodecError::LengthOutOfBounds {
                offset,
                length: len as u64 + 1,
                available: buf.remaining(),
            });
        }
        let end = buf.position() + 1 + len;
        let discriminator = buf.read_byte()?;
        let branch = match def.branch(discriminator) {
            Some(b) => b,
            None => {
                debug!(union = %def.name, discriminator, end, "unknown discriminator");
                return Err(CodecError::UnknownDiscriminator {
                    union: def.name.clone(),
                    discriminator,
                    end,
                });
            }
        };
        let record = self.record(&branch.definition)?;
        let inner = self.decode_record(buf, record, depth)?;
        if buf.position() > end {
            return Err(CodecError::Overrun {
                record: def.name.clone(),
                end,
            });
        }
        buf.seek(end)?;
        Ok(Value::union(discriminator, inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Field, ResolvedSchema, Schema, ScalarKind, TypeNode, UnionBranch};

    fn codec() -> Codec {
        let schema = Schema::new(vec![
            MessageDefinition::new(
                "Note",
                vec![
                    Field::tagged(1, "text", TypeNode::scalar(ScalarKind::String)),
                    Field::tagged(2, "old", TypeNode::scalar(ScalarKind::I32)).deprecated("gone"),
                ],
            )
            .into(),
            StructDefinition::new("Unit", vec![]).into(),
            UnionDefinition::new("Either", vec![UnionBranch::new(1, "Note"), UnionBranch::new(2, "Unit")]).into(),
        ]);
        Codec::new(ResolvedSchema::resolve(schema).unwrap())
    }

    #[test]
    fn deprecated_field_is_not_written_but_is_read() {
        let c = codec();
        let bytes = c
            .encode("Note", &Value::record([("text", "a".into()), ("old", Value::I32(9))]))
            .unwrap();
        assert_eq!(bytes, vec![7, 0, 0, 0, 1, 1, 0, 0, 0, b'a', 0]);

        let with_old = vec![6, 0, 0, 0, 2, 9, 0, 0, 0, 0];
        let v = c.decode("Note", &with_old).unwrap();
        assert_eq!(v.field("old"), Some(&Value::I32(9)));
    }

    #[test]
    fn union_length_excludes_discriminator() {
        let c = codec();
        let bytes = c.encode("Either", &Value::union(2, Value::Record(HashMap::new()))).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0, 2]);
        assert_eq!(c.decode_prefix("Either", &bytes).unwrap().1, 5);
    }

    #[test]
    fn message_without_terminator_is_overrun() {
        let c = codec();
        // Declared body of 1 byte holding tag 1, whose string then runs past the end.
        let bytes = vec![1, 0, 0, 0, 1, 0, 0, 0, 0];
        assert!(matches!(c.decode("Note", &bytes), Err(CodecError::Overrun { .. })));
    }

    #[test]
    fn encoding_unknown_branch_is_rejected() {
        let c = codec();
        let err = c.encode("Either", &Value::union(9, Value::Record(HashMap::new()))).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
    }
}
