//! Frames: a byte stream holding one or more records of the same type back to back.
//!
//! When a record is malformed but its extent is still known from its length prefix (a message
//! or union with a bad body, for instance), it is reported as rejected and decoding continues
//! with the next one.

use crate::codec::{Codec, CodecError};
use crate::value::Value;
use crate::walk::record_extent;
use tracing::debug;

/// Result of decoding a frame: records that decoded, and those skipped as malformed.
#[derive(Debug)]
pub struct FrameDecodeResult {
    pub records: Vec<DecodedRecord>,
    pub rejected: Vec<RejectedRecord>,
}

#[derive(Debug)]
pub struct DecodedRecord {
    pub name: String,
    pub value: Value,
    pub byte_range: (usize, usize),
}

#[derive(Debug)]
pub struct RejectedRecord {
    pub name: String,
    pub byte_range: (usize, usize),
    pub reason: String,
}

/// Decode every `name` record in `bytes`.
///
/// Fails only when a record can be neither decoded nor skipped, since the position of the next
/// record is then unknown.
pub fn decode_frame(codec: &Codec, name: &str, bytes: &[u8]) -> Result<FrameDecodeResult, CodecError> {
    let mut records = Vec::new();
    let mut rejected = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        match codec.decode_prefix(name, &bytes[offset..]) {
            Ok((value, consumed)) => {
                if consumed == 0 {
                    // zero-width record (empty struct): nothing left to delimit
                    break;
                }
                records.push(DecodedRecord {
                    name: name.to_string(),
                    value,
                    byte_range: (offset, offset + consumed),
                });
                offset += consumed;
            }
            Err(e) => {
                let consumed = match record_extent(bytes, offset, codec.schema(), name) {
                    Ok(n) if n > 0 => n,
                    _ => return Err(e),
                };
                debug!(record = name, offset, consumed, error = %e, "rejected record");
                rejected.push(RejectedRecord {
                    name: name.to_string(),
                    byte_range: (offset, offset + consumed),
                    reason: e.to_string(),
                });
                offset += consumed;
            }
        }
    }

    Ok(FrameDecodeResult { records, rejected })
}

/// Concatenate the encodings of `values`.
pub fn encode_frame(codec: &Codec, name: &str, values: &[Value]) -> Result<Vec<u8>, CodecError> {
    let mut buf = codec.new_buffer();
    for v in values {
        codec.encode_into(&mut buf, name, v)?;
    }
    Ok(buf.into_vec())
}

/// Re-encode a decoded frame without its rejected records.
pub fn encode_frame_accepted_only(codec: &Codec, result: &FrameDecodeResult) -> Result<Vec<u8>, CodecError> {
    let mut buf = codec.new_buffer();
    for r in &result.records {
        codec.encode_into(&mut buf, &r.name, &r.value)?;
    }
    Ok(buf.into_vec())
}
