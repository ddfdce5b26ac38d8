//! Growable byte buffer with a write cursor and a read cursor.
//!
//! One [`WireBuffer`] serves both directions. [`WireBuffer::start_writing`] discards previous
//! content and appends from offset 0; [`WireBuffer::start_reading`] loads input bytes and reads
//! from offset 0 up to the input length. The same instance is normally reused across an encode
//! and a following decode, so switching modes keeps the backing allocation.
//!
//! All multi-byte values are little-endian. Writes always grow the buffer (capacity doubles);
//! reads never grow it and fail with [`CodecError::Truncated`] instead of running past the end.
//!
//! ## Length prefixes
//!
//! Messages and unions are framed by a 4-byte length that is only known once the body is
//! written. [`WireBuffer::reserve_length_prefix`] hands out a [`LengthSlot`]; once the body is
//! done, [`WireBuffer::fill_length_prefix`] consumes the slot and patches the value in place.

use crate::codec::CodecError;
use crate::date::Date;
use crate::guid::{Guid, GUID_SIZE};
use byteorder::{ByteOrder, LittleEndian};
use std::cell::RefCell;

/// Size of every length/count prefix on the wire.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Initial write capacity of a fresh buffer.
pub const DEFAULT_CAPACITY: usize = 256;

/// Position of a reserved, not yet filled, length prefix.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a reserved length prefix must be filled"]
pub struct LengthSlot {
    position: usize,
}

impl LengthSlot {
    pub fn position(&self) -> usize {
        self.position
    }
}

#[derive(Debug, Clone, Default)]
pub struct WireBuffer {
    /// Written bytes (write mode) or the bound input (read mode); `data.len()` is the length.
    data: Vec<u8>,
    /// Read cursor.
    index: usize,
}

macro_rules! fixed_width {
    ($($write:ident / $read:ident / $read_array:ident : $ty:ty, $size:expr, $put:ident, $get:ident, $get_into:ident;)*) => {
        $(
            pub fn $write(&mut self, value: $ty) {
                let at = self.grow_by($size);
                LittleEndian::$put(&mut self.data[at..at + $size], value);
            }

            pub fn $read(&mut self) -> Result<$ty, CodecError> {
                Ok(LittleEndian::$get(self.take($size)?))
            }

            /// Bulk read of `count` values in one bounds check.
            pub fn $read_array(&mut self, count: usize) -> Result<Vec<$ty>, CodecError> {
                let src = self.take(count.saturating_mul($size))?;
                let mut out = vec![<$ty>::default(); count];
                LittleEndian::$get_into(src, &mut out);
                Ok(out)
            }
        )*
    };
}

impl WireBuffer {
    pub fn new() -> Self {
        WireBuffer::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        WireBuffer {
            data: Vec::with_capacity(capacity),
            index: 0,
        }
    }

    /// A buffer already in read mode over a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut buf = WireBuffer::with_capacity(bytes.len());
        buf.start_reading(bytes);
        buf
    }

    /// Switch to write mode: drop previous content, keep the allocation.
    pub fn start_writing(&mut self) {
        self.data.clear();
        self.index = 0;
    }

    /// Switch to read mode over `bytes`.
    pub fn start_reading(&mut self, bytes: &[u8]) {
        self.data.clear();
        self.data.extend_from_slice(bytes);
        self.index = 0;
    }

    /// Write cursor: number of bytes written (or the input length in read mode).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Read cursor.
    pub fn position(&self) -> usize {
        self.index
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.index)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.data.clone()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Drop written bytes past `len`. Undoes a failed append.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
        self.index = self.index.min(self.data.len());
    }

    fn ensure_capacity(&mut self, additional: usize) {
        let needed = self.data.len() + additional;
        let capacity = self.data.capacity();
        if needed > capacity {
            let target = needed.max(capacity.saturating_mul(2)).max(DEFAULT_CAPACITY);
            self.data.reserve_exact(target - self.data.len());
        }
    }

    /// Extend the written length by `n` zero bytes; returns where they start.
    fn grow_by(&mut self, n: usize) -> usize {
        let at = self.data.len();
        self.ensure_capacity(n);
        self.data.resize(at + n, 0);
        at
    }

    /// Advance the read cursor by `n` bytes and return them.
    fn take(&mut self, n: usize) -> Result<&[u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::Truncated {
                offset: self.index,
                needed: n,
                available: self.remaining(),
            });
        }
        let start = self.index;
        self.index += n;
        Ok(&self.data[start..start + n])
    }

    // ---- cursor control -------------------------------------------------------------------

    pub fn skip(&mut self, n: usize) -> Result<(), CodecError> {
        self.take(n).map(|_| ())
    }

    /// Move the read cursor to an absolute offset within the input.
    pub fn seek(&mut self, position: usize) -> Result<(), CodecError> {
        if position > self.data.len() {
            return Err(CodecError::Truncated {
                offset: self.index,
                needed: position - self.index,
                available: self.remaining(),
            });
        }
        self.index = position;
        Ok(())
    }

    // ---- length prefixes --------------------------------------------------------------------

    /// Reserve 4 bytes at the write cursor for a length filled in later.
    pub fn reserve_length_prefix(&mut self) -> LengthSlot {
        LengthSlot {
            position: self.grow_by(LENGTH_PREFIX_SIZE),
        }
    }

    /// Patch a reserved prefix. The write cursor does not move.
    pub fn fill_length_prefix(&mut self, slot: LengthSlot, value: u32) -> Result<(), CodecError> {
        let at = slot.position;
        if at + LENGTH_PREFIX_SIZE > self.data.len() {
            return Err(CodecError::InvalidPosition {
                position: at,
                length: self.data.len(),
            });
        }
        LittleEndian::write_u32(&mut self.data[at..at + LENGTH_PREFIX_SIZE], value);
        Ok(())
    }

    /// Read a length prefix; the length must fit in the remaining input.
    pub fn read_length_prefix(&mut self) -> Result<u32, CodecError> {
        let offset = self.index;
        let length = self.read_u32()?;
        if length as usize > self.remaining() {
            return Err(CodecError::LengthOutOfBounds {
                offset,
                length: length as u64,
                available: self.remaining(),
            });
        }
        Ok(length)
    }

    /// Write a `usize` length as a u32 prefix.
    pub fn write_len(&mut self, len: usize) -> Result<(), CodecError> {
        let len = u32::try_from(len).map_err(|_| CodecError::TooLarge(len))?;
        self.write_u32(len);
        Ok(())
    }

    // ---- scalars --------------------------------------------------------------------------

    pub fn write_byte(&mut self, value: u8) {
        let at = self.grow_by(1);
        self.data[at] = value;
    }

    pub fn read_byte(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_byte(value as u8);
    }

    /// Any non-zero byte reads as `true`.
    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.read_byte()? != 0)
    }

    fixed_width! {
        write_u16 / read_u16 / read_u16_array : u16, 2, write_u16, read_u16, read_u16_into;
        write_i16 / read_i16 / read_i16_array : i16, 2, write_i16, read_i16, read_i16_into;
        write_u32 / read_u32 / read_u32_array : u32, 4, write_u32, read_u32, read_u32_into;
        write_i32 / read_i32 / read_i32_array : i32, 4, write_i32, read_i32, read_i32_into;
        write_u64 / read_u64 / read_u64_array : u64, 8, write_u64, read_u64, read_u64_into;
        write_i64 / read_i64 / read_i64_array : i64, 8, write_i64, read_i64, read_i64_into;
        write_f32 / read_f32 / read_f32_array : f32, 4, write_f32, read_f32, read_f32_into;
        write_f64 / read_f64 / read_f64_array : f64, 8, write_f64, read_f64, read_f64_into;
    }

    pub fn write_guid(&mut self, value: &Guid) {
        let at = self.grow_by(GUID_SIZE);
        self.data[at..at + GUID_SIZE].copy_from_slice(&value.to_wire_bytes());
    }

    pub fn read_guid(&mut self) -> Result<Guid, CodecError> {
        let mut wire = [0u8; GUID_SIZE];
        wire.copy_from_slice(self.take(GUID_SIZE)?);
        Ok(Guid::from_wire_bytes(&wire))
    }

    pub fn write_date(&mut self, value: Date) {
        // Date already keeps the kind bits clear.
        self.write_u64(value.ticks());
    }

    pub fn read_date(&mut self) -> Result<Date, CodecError> {
        Ok(Date::from_ticks(self.read_u64()?))
    }

    // ---- variable length --------------------------------------------------------------------

    /// Append bytes with no prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.ensure_capacity(bytes.len());
        self.data.extend_from_slice(bytes);
    }

    /// Borrow the next `n` input bytes.
    pub fn read_raw(&mut self, n: usize) -> Result<&[u8], CodecError> {
        self.take(n)
    }

    /// Length-prefixed byte blob.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.write_len(bytes.len())?;
        self.write_raw(bytes);
        Ok(())
    }

    /// Borrow a length-prefixed byte blob without copying.
    pub fn read_bytes_view(&mut self) -> Result<&[u8], CodecError> {
        let len = self.read_length_prefix()? as usize;
        self.take(len)
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        Ok(self.read_bytes_view()?.to_vec())
    }

    /// Length-prefixed UTF-8; the prefix is the byte length.
    pub fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
        self.write_bytes(value.as_bytes())
    }

    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let bytes = self.read_bytes_view()?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

thread_local! {
    static THREAD_BUFFER: RefCell<WireBuffer> = RefCell::new(WireBuffer::new());
}

/// Run `f` with this thread's reusable buffer. Nested calls get a fresh buffer.
pub fn with_thread_buffer<R>(f: impl FnOnce(&mut WireBuffer) -> R) -> R {
    THREAD_BUFFER.with(|cell| match cell.try_borrow_mut() {
        Ok(mut buf) => f(&mut buf),
        Err(_) => f(&mut WireBuffer::new()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_little_endian() {
        let mut buf = WireBuffer::new();
        buf.start_writing();
        buf.write_u16(0x0102);
        buf.write_i32(-2);
        buf.write_u64(1);
        assert_eq!(
            buf.as_bytes(),
            &[0x02, 0x01, 0xfe, 0xff, 0xff, 0xff, 1, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn write_then_read_extremes() {
        let mut buf = WireBuffer::new();
        buf.start_writing();
        buf.write_byte(255);
        buf.write_u16(u16::MAX);
        buf.write_u32(u32::MAX);
        buf.write_i16(i16::MIN);
        buf.write_i32(i32::MIN);
        buf.write_i64(i64::MAX);
        buf.write_f64(f64::MIN_POSITIVE);
        let bytes = buf.to_vec();
        buf.start_reading(&bytes);
        assert_eq!(buf.read_byte().unwrap(), 255);
        assert_eq!(buf.read_u16().unwrap(), 65535);
        assert_eq!(buf.read_u32().unwrap(), 4294967295);
        assert_eq!(buf.read_i16().unwrap(), -32768);
        assert_eq!(buf.read_i32().unwrap(), -2147483648);
        assert_eq!(buf.read_i64().unwrap(), i64::MAX);
        assert_eq!(buf.read_f64().unwrap(), f64::MIN_POSITIVE);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn reserve_and_fill_length() {
        let mut buf = WireBuffer::new();
        buf.start_writing();
        let slot = buf.reserve_length_prefix();
        let start = buf.len();
        buf.write_string("test message").unwrap();
        let body = buf.len() - start;
        buf.fill_length_prefix(slot, body as u32).unwrap();
        let bytes = buf.to_vec();
        buf.start_reading(&bytes);
        assert_eq!(buf.read_length_prefix().unwrap() as usize, body);
        assert_eq!(buf.read_string().unwrap(), "test message");
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut buf = WireBuffer::new();
        buf.start_writing();
        for i in 0..1000u32 {
            buf.write_u32(i);
        }
        assert_eq!(buf.len(), 4000);
        assert!(buf.capacity() >= 4000);
    }

    #[test]
    fn read_past_end_is_truncated() {
        let mut buf = WireBuffer::from_bytes(&[1, 2, 3]);
        assert!(matches!(
            buf.read_u32(),
            Err(CodecError::Truncated { offset: 0, needed: 4, available: 3 })
        ));
        assert_eq!(buf.position(), 0);
    }

    #[test]
    fn length_prefix_beyond_input_is_rejected() {
        let mut buf = WireBuffer::from_bytes(&[10, 0, 0, 0, 1, 2]);
        assert!(matches!(
            buf.read_length_prefix(),
            Err(CodecError::LengthOutOfBounds { length: 10, available: 2, .. })
        ));
    }

    #[test]
    fn skip_and_seek() {
        let mut buf = WireBuffer::new();
        buf.start_writing();
        buf.write_u32(12345);
        buf.write_u32(67890);
        let bytes = buf.to_vec();
        buf.start_reading(&bytes);
        assert_eq!(buf.read_u32().unwrap(), 12345);
        buf.skip(4).unwrap();
        assert_eq!(buf.position(), 8);
        buf.seek(4).unwrap();
        assert_eq!(buf.read_u32().unwrap(), 67890);
        assert!(buf.seek(9).is_err());
    }

    #[test]
    fn bulk_array_read_matches_single_reads() {
        let mut buf = WireBuffer::new();
        buf.start_writing();
        for v in [1.5f32, -2.25, 1e10] {
            buf.write_f32(v);
        }
        let bytes = buf.to_vec();
        buf.start_reading(&bytes);
        assert_eq!(buf.read_f32_array(3).unwrap(), vec![1.5, -2.25, 1e10]);
    }

    #[test]
    fn invalid_utf8_is_tolerated() {
        let mut buf = WireBuffer::from_bytes(&[3, 0, 0, 0, b'a', 0xff, b'b']);
        assert_eq!(buf.read_string().unwrap(), "a\u{fffd}b");
    }

    #[test]
    fn fill_rejects_foreign_slot() {
        let mut buf = WireBuffer::new();
        buf.start_writing();
        let slot = buf.reserve_length_prefix();
        buf.start_writing();
        assert!(matches!(
            buf.fill_length_prefix(slot, 1),
            Err(CodecError::InvalidPosition { position: 0, length: 0 })
        ));
    }
}
