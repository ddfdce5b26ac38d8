//! Scalar encode/decode: fixed-width numbers, bool, string, guid, date.
//!
//! Integral kinds accept any integral [`Value`] whose number fits the kind, so a `uint8` enum
//! can be fed `Value::U32(3)`. Decoding always yields the variant matching the kind.

use super::CodecError;
use crate::ast::ScalarKind;
use crate::buffer::WireBuffer;
use crate::guid::Guid;
use crate::value::Value;

fn integral(kind: ScalarKind, value: &Value) -> Result<i128, CodecError> {
    let v = value
        .as_i128()
        .ok_or_else(|| CodecError::mismatch(kind.name(), value))?;
    match kind.integral_range() {
        Some((min, max)) if v >= min && v <= max => Ok(v),
        _ => Err(CodecError::ValueOutOfRange { kind, value: v }),
    }
}

fn float(kind: ScalarKind, value: &Value) -> Result<f64, CodecError> {
    value
        .as_f64()
        .ok_or_else(|| CodecError::mismatch(kind.name(), value))
}

pub(crate) fn encode_scalar(buf: &mut WireBuffer, kind: ScalarKind, value: &Value) -> Result<(), CodecError> {
    match kind {
        ScalarKind::Bool => match value {
            Value::Bool(b) => buf.write_bool(*b),
            other => return Err(CodecError::mismatch("bool", other)),
        },
        ScalarKind::Byte => buf.write_byte(integral(kind, value)? as u8),
        ScalarKind::I16 => buf.write_i16(integral(kind, value)? as i16),
        ScalarKind::U16 => buf.write_u16(integral(kind, value)? as u16),
        ScalarKind::I32 => buf.write_i32(integral(kind, value)? as i32),
        ScalarKind::U32 => buf.write_u32(integral(kind, value)? as u32),
        ScalarKind::I64 => buf.write_i64(integral(kind, value)? as i64),
        ScalarKind::U64 => buf.write_u64(integral(kind, value)? as u64),
        ScalarKind::F32 => match value {
            Value::F32(x) => buf.write_f32(*x),
            other => buf.write_f32(float(kind, other)? as f32),
        },
        ScalarKind::F64 => buf.write_f64(float(kind, value)?),
        ScalarKind::String => match value {
            Value::String(s) => buf.write_string(s)?,
            other => return Err(CodecError::mismatch("string", other)),
        },
        ScalarKind::Guid => match value {
            Value::Guid(g) => buf.write_guid(g),
            Value::String(s) => buf.write_guid(&s.parse::<Guid>()?),
            other => return Err(CodecError::mismatch("guid", other)),
        },
        ScalarKind::Date => match value {
            Value::Date(d) => buf.write_date(*d),
            other => return Err(CodecError::mismatch("date", other)),
        },
    }
    Ok(())
}

/// Read a length-prefixed blob, refusing lengths above `max_len`.
pub(crate) fn read_blob<'a>(buf: &'a mut WireBuffer, max_len: usize) -> Result<&'a [u8], CodecError> {
    let len = buf.read_length_prefix()? as usize;
    if len > max_len {
        return Err(CodecError::OutOfMemory { requested: len });
    }
    buf.read_raw(len)
}

pub(crate) fn decode_scalar(buf: &mut WireBuffer, kind: ScalarKind, max_len: usize) -> Result<Value, CodecError> {
    Ok(match kind {
        ScalarKind::Bool => Value::Bool(buf.read_bool()?),
        ScalarKind::Byte => Value::Byte(buf.read_byte()?),
        ScalarKind::I16 => Value::I16(buf.read_i16()?),
        ScalarKind::U16 => Value::U16(buf.read_u16()?),
        ScalarKind::I32 => Value::I32(buf.read_i32()?),
        ScalarKind::U32 => Value::U32(buf.read_u32()?),
        ScalarKind::I64 => Value::I64(buf.read_i64()?),
        ScalarKind::U64 => Value::U64(buf.read_u64()?),
        ScalarKind::F32 => Value::F32(buf.read_f32()?),
        ScalarKind::F64 => Value::F64(buf.read_f64()?),
        ScalarKind::String => Value::String(String::from_utf8_lossy(read_blob(buf, max_len)?).into_owned()),
        ScalarKind::Guid => Value::Guid(buf.read_guid()?),
        ScalarKind::Date => Value::Date(buf.read_date()?),
    })
}

/// Bulk decode of `count` fixed-width numbers, one bounds check for the whole run.
/// `None` for kinds without a bulk reader.
pub(crate) fn decode_numeric_run(
    buf: &mut WireBuffer,
    kind: ScalarKind,
    count: usize,
) -> Result<Option<Vec<Value>>, CodecError> {
    let values = match kind {
        ScalarKind::I16 => buf.read_i16_array(count)?.into_iter().map(Value::I16).collect(),
        ScalarKind::U16 => buf.read_u16_array(count)?.into_iter().map(Value::U16).collect(),
        ScalarKind::I32 => buf.read_i32_array(count)?.into_iter().map(Value::I32).collect(),
        ScalarKind::U32 => buf.read_u32_array(count)?.into_iter().map(Value::U32).collect(),
        ScalarKind::I64 => buf.read_i64_array(count)?.into_iter().map(Value::I64).collect(),
        ScalarKind::U64 => buf.read_u64_array(count)?.into_iter().map(Value::U64).collect(),
        ScalarKind::F32 => buf.read_f32_array(count)?.into_iter().map(Value::F32).collect(),
        ScalarKind::F64 => buf.read_f64_array(count)?.into_iter().map(Value::F64).collect(),
        _ => return Ok(None),
    };
    Ok(Some(values))
}

/// Encoded size of a scalar value; strings are prefix plus UTF-8 length.
pub(crate) fn scalar_size(kind: ScalarKind, value: &Value) -> Result<usize, CodecError> {
    match (kind.fixed_width(), value) {
        (Some(width), _) => Ok(width),
        (None, Value::String(s)) => Ok(4 + s.len()),
        (None, other) => Err(CodecError::mismatch(kind.name(), other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_kinds_accept_any_integral_in_range() {
        let mut buf = WireBuffer::new();
        encode_scalar(&mut buf, ScalarKind::Byte, &Value::U32(200)).unwrap();
        encode_scalar(&mut buf, ScalarKind::I64, &Value::U16(7)).unwrap();
        assert_eq!(buf.as_bytes(), &[200, 7, 0, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(
            encode_scalar(&mut buf, ScalarKind::Byte, &Value::I32(-1)),
            Err(CodecError::ValueOutOfRange { kind: ScalarKind::Byte, value: -1 })
        ));
        assert!(matches!(
            encode_scalar(&mut buf, ScalarKind::U32, &Value::Bool(true)),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn guid_accepts_text() {
        let mut buf = WireBuffer::new();
        encode_scalar(&mut buf, ScalarKind::Guid, &"A1B2C3D4-E5F6-7890-ABCD-EF1234567890".into()).unwrap();
        let bytes = buf.to_vec();
        let mut buf = WireBuffer::from_bytes(&bytes);
        let v = decode_scalar(&mut buf, ScalarKind::Guid, usize::MAX).unwrap();
        assert_eq!(v.as_guid().unwrap().to_string(), "a1b2c3d4-e5f6-7890-abcd-ef1234567890");
    }

    #[test]
    fn blob_longer_than_limit_is_refused() {
        let mut buf = WireBuffer::new();
        buf.write_string("hello").unwrap();
        let bytes = buf.to_vec();
        let mut buf = WireBuffer::from_bytes(&bytes);
        assert!(matches!(
            decode_scalar(&mut buf, ScalarKind::String, 4),
            Err(CodecError::OutOfMemory { requested: 5 })
        ));
    }

    #[test]
    fn numeric_run_matches_single_reads() {
        let mut buf = WireBuffer::new();
        for v in [-3i32, 0, i32::MAX] {
            buf.write_i32(v);
        }
        let bytes = buf.to_vec();
        let mut buf = WireBuffer::from_bytes(&bytes);
        let run = decode_numeric_run(&mut buf, ScalarKind::I32, 3).unwrap().unwrap();
        assert_eq!(run, vec![Value::I32(-3), Value::I32(0), Value::I32(i32::MAX)]);
        assert!(decode_numeric_run(&mut buf, ScalarKind::String, 0).unwrap().is_none());
    }
}
