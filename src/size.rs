//! Exact encoded size of a value, computed without encoding it.

use crate::ast::{Definition, RecordDefinition, TypeNode};
use crate::buffer::LENGTH_PREFIX_SIZE;
use crate::codec::{Codec, CodecError};
use crate::value::Value;

impl Codec {
    /// Number of bytes [`Codec::encode`] would produce for `value`.
    pub fn encoded_size(&self, name: &str, value: &Value) -> Result<usize, CodecError> {
        let record = self.record(name)?;
        self.record_size(record, value, 0)
    }

    /// Encoded size of a value of any schema type.
    pub fn encoded_size_of(&self, ty: &TypeNode, value: &Value) -> Result<usize, CodecError> {
        self.type_size(ty, value, 0)
    }

    fn type_size(&self, ty: &TypeNode, value: &Value, depth: usize) -> Result<usize, CodecError> {
        if depth > self.options().max_depth {
            return Err(CodecError::DepthExceeded {
                limit: self.options().max_depth,
            });
        }
        match ty {
            TypeNode::Scalar(kind) => crate::codec::scalar_size(*kind, value),
            TypeNode::Array(element) => match value {
                Value::Bytes(b) if ty.is_bytes() => Ok(LENGTH_PREFIX_SIZE + b.len()),
                Value::Array(items) => {
                    if let Some(width) = self.schema().fixed_encoded_size(element) {
                        return Ok(LENGTH_PREFIX_SIZE + width * items.len());
                    }
                    items.iter().try_fold(LENGTH_PREFIX_SIZE, |acc, item| {
                        Ok(acc + self.type_size(element, item, depth + 1)?)
                    })
                }
                other => Err(CodecError::mismatch(ty.to_string(), other)),
            },
            TypeNode::Map(key, val) => match value {
                Value::Map(entries) => entries.iter().try_fold(LENGTH_PREFIX_SIZE, |acc, (k, v)| {
                    Ok(acc + self.type_size(key, k, depth + 1)? + self.type_size(val, v, depth + 1)?)
                }),
                other => Err(CodecError::mismatch(ty.to_string(), other)),
            },
            TypeNode::Defined(name) => match self.schema().get(name) {
                Some(Definition::Enum(e)) => crate::codec::scalar_size(e.underlying, value),
                Some(Definition::Record(r)) => self.record_size(r, value, depth + 1),
                _ => Err(CodecError::UnknownType(name.clone())),
            },
        }
    }

    fn record_size(&self, record: &RecordDefinition, value: &Value, depth: usize) -> Result<usize, CodecError> {
        match record {
            RecordDefinition::Struct(s) => {
                let fields = value
                    .as_record()
                    .ok_or_else(|| CodecError::mismatch(format!("struct {}", s.name), value))?;
                s.fields.iter().try_fold(0, |acc, f| {
                    let v = fields
                        .get(&f.name)
                        .ok_or_else(|| CodecError::MissingValue(format!("{}.{}", s.name, f.name)))?;
                    Ok(acc + self.type_size(&f.ty, v, depth)?)
                })
            }
            RecordDefinition::Message(m) => {
                let fields = value
                    .as_record()
                    .ok_or_else(|| CodecError::mismatch(format!("message {}", m.name), value))?;
                // prefix + terminator, then tag + value per present field
                m.fields
                    .iter()
                    .filter(|f| !f.is_deprecated())
                    .try_fold(LENGTH_PREFIX_SIZE + 1, |acc, f| match fields.get(&f.name) {
                        Some(v) => Ok(acc + 1 + self.type_size(&f.ty, v, depth)?),
                        None => Ok(acc),
                    })
            }
            RecordDefinition::Union(u) => {
                let (discriminator, inner) = value
                    .as_union()
                    .ok_or_else(|| CodecError::mismatch(format!("union {}", u.name), value))?;
                let branch = u.branch(discriminator).ok_or_else(|| CodecError::TypeMismatch {
                    expected: format!("a branch of union {}", u.name),
                    found: format!("discriminator {}", discriminator),
                })?;
                let record = self.record(&branch.definition)?;
                Ok(LENGTH_PREFIX_SIZE + 1 + self.record_size(record, inner, depth + 1)?)
            }
        }
    }
}
