//! # schemawire: schema-driven binary wire codec
//!
//! An IDL with a PEST grammar for describing records, plus a Rust codec that encodes and
//! decodes them in a compact little-endian binary format.
//!
//! ## Schema structure
//!
//! - **Structs**: fixed layout, every field always present, no framing
//! - **Messages**: tagged optional fields behind a length prefix; readers skip tags they don't know
//! - **Unions**: a length prefix, a discriminator byte, then one branch (struct, message or union)
//! - **Enums**: named constants over an integral type, encoded as that type
//! - **Consts**: named literals (no wire presence)
//!
//! ## Field types
//!
//! - Scalars: `bool`, `byte`/`uint8`, `int16`, `uint16`, `int32`, `uint32`, `int64`, `uint64`,
//!   `float32`, `float64`, `string`, `guid`, `date`
//! - `T[]` / `array[T]` (`byte[]` is a raw blob), `map[K, V]`
//! - References to other definitions, including cycles through messages, unions and containers
//!
//! ## Example schema
//!
//! ```text
//! enum Species : uint8 { Unknown = 0; Cat = 1; Dog = 2; }
//!
//! struct Point { float32 x; float32 y; }
//!
//! message Pet {
//!   1 -> string name;
//!   2 -> Species species;
//!   [deprecated("use tags")] 3 -> string tag;
//!   4 -> map[string, Point] favourite_spots;
//! }
//!
//! union Event {
//!   1 -> message Adopted { 1 -> Pet pet; 2 -> date when; }
//!   2 -> struct Lost { guid pet_id; }
//! }
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use schemawire::{parse, Codec, ResolvedSchema, Value};
//!
//! let resolved = ResolvedSchema::resolve(parse(src)?)?;
//! let codec = Codec::new(resolved);
//! let bytes = codec.encode("Pet", &Value::record([("name", "Rex".into())]))?;
//! let pet = codec.decode("Pet", &bytes)?;
//! ```
//!
//! See `tests/integration.rs` for full examples.

pub mod ast;
pub mod buffer;
pub mod codec;
pub mod date;
pub mod dump;
pub mod frame;
pub mod guid;
pub mod lint;
pub mod parser;
mod size;
pub mod value;
pub mod walk;

pub use ast::{ResolvedSchema, Schema, SchemaError, TypeNode};
pub use buffer::WireBuffer;
pub use codec::{Codec, CodecError, CodecOptions, ErrorKind, ScalarView};
pub use date::Date;
pub use frame::{decode_frame, encode_frame, FrameDecodeResult};
pub use guid::Guid;
pub use parser::{parse, parse_file, ParseError};
pub use value::Value;
pub use walk::{record_extent, validate_record_in_place, BinaryWalker};
