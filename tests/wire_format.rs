//! Byte-exact wire layouts, size computation, and schema walks over encoded data (no decode).

use schemawire::ast::ScalarKind;
use schemawire::codec::{Codec, CodecError};
use schemawire::walk::{record_extent, validate_record_in_place, BinaryWalker};
use schemawire::{parse, Date, Guid, ResolvedSchema, TypeNode, Value, WireBuffer};

const SCHEMA: &str = r#"
enum Color : int16 { Red = -1; Green = 0; Blue = 1; }

struct Pair { byte a; uint16 b; }

struct Stamp { date at; guid id; }

message Note {
  1 -> string text;
  2 -> Color color;
  3 -> int32[] nums;
  4 -> map[Color, bool] flags;
}

union Any {
  1 -> Pair;
  2 -> Note;
}

struct Batch { Note[] notes; Pair[] pairs; }
"#;

fn codec() -> Codec {
    Codec::new(ResolvedSchema::resolve(parse(SCHEMA).expect("parse")).expect("resolve"))
}

#[test]
fn test_struct_layout_is_packed_little_endian() {
    let c = codec();
    let v = Value::record([("a", Value::Byte(0xab)), ("b", Value::U16(0x1234))]);
    assert_eq!(c.encode("Pair", &v).expect("encode"), vec![0xab, 0x34, 0x12]);
}

#[test]
fn test_date_and_guid_layout() {
    let c = codec();
    let g: Guid = "00112233-4455-6677-8899-aabbccddeeff".parse().expect("guid");
    let v = Value::record([("at", Value::Date(Date::UNIX_EPOCH)), ("id", Value::Guid(g))]);
    let bytes = c.encode("Stamp", &v).expect("encode");
    let mut expected = 621_355_968_000_000_000u64.to_le_bytes().to_vec();
    expected.extend_from_slice(&[
        0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff,
    ]);
    assert_eq!(bytes, expected);
    assert_eq!(c.decode("Stamp", &bytes).expect("decode"), v);
}

#[test]
fn test_date_high_bits_are_masked_on_read() {
    let c = codec();
    let mut bytes = vec![0u8; 8 + 16];
    bytes[7] = 0xc0;
    let v = c.decode("Stamp", &bytes).expect("decode");
    assert_eq!(v.field("at").and_then(Value::as_date), Some(Date::from_ticks(0)));
}

#[test]
fn test_message_layout() {
    let c = codec();
    let v = Value::record([
        ("text", Value::from("hi")),
        ("color", Value::I16(-1)),
        ("nums", Value::Array(vec![Value::I32(7)])),
    ]);
    let bytes = c.encode("Note", &v).expect("encode");
    #[rustfmt::skip]
    let expected = vec![
        20, 0, 0, 0,                // body length
        1, 2, 0, 0, 0, b'h', b'i',  // text
        2, 0xff, 0xff,              // color
        3, 1, 0, 0, 0, 7, 0, 0, 0,  // nums
        0,                          // terminator
    ];
    assert_eq!(bytes, expected);
    assert_eq!(c.decode("Note", &bytes).expect("decode"), v);
}

#[test]
fn test_empty_message_is_prefix_and_terminator() {
    let c = codec();
    let bytes = c.encode("Note", &Value::record(Vec::<(String, Value)>::new())).expect("encode");
    assert_eq!(bytes, vec![1, 0, 0, 0, 0]);
}

#[test]
fn test_union_layout() {
    let c = codec();
    let v = Value::union(1, Value::record([("a", Value::Byte(1)), ("b", Value::U16(2))]));
    assert_eq!(c.encode("Any", &v).expect("encode"), vec![3, 0, 0, 0, 1, 1, 2, 0]);
}

#[test]
fn test_map_layout_with_enum_keys() {
    let c = codec();
    let v = Value::record([(
        "flags",
        Value::Map(vec![(Value::I16(1), Value::Bool(true)), (Value::I16(-1), Value::Bool(false))]),
    )]);
    let bytes = c.encode("Note", &v).expect("encode");
    assert_eq!(
        bytes,
        vec![12, 0, 0, 0, 4, 2, 0, 0, 0, 1, 0, 1, 0xff, 0xff, 0, 0]
    );
    assert_eq!(c.decode("Note", &bytes).expect("decode"), v);
}

#[test]
fn test_encoded_size_matches_encode() {
    let c = codec();
    let note = Value::record([
        ("text", Value::from("naïve")),
        ("nums", Value::Array((0..10).map(Value::I32).collect())),
        ("flags", Value::Map(vec![(Value::I16(0), Value::Bool(true))])),
    ]);
    let batch = Value::record([
        ("notes", Value::Array(vec![note.clone(), Value::record(Vec::<(String, Value)>::new())])),
        (
            "pairs",
            Value::Array(vec![Value::record([("a", Value::Byte(1)), ("b", Value::U16(2))]); 3]),
        ),
    ]);
    for (name, v) in [("Note", &note), ("Batch", &batch)] {
        let bytes = c.encode(name, v).expect("encode");
        assert_eq!(c.encoded_size(name, v).expect("size"), bytes.len(), "{}", name);
    }
    let any = Value::union(2, note);
    assert_eq!(
        c.encoded_size("Any", &any).expect("size"),
        c.encode("Any", &any).expect("encode").len()
    );
    assert_eq!(
        c.encoded_size_of(&TypeNode::scalar(ScalarKind::String), &Value::from("🚀"))
            .expect("size"),
        8
    );
}

#[test]
fn test_record_extent_without_decode() {
    let c = codec();
    let note = Value::record([("text", Value::from("hello")), ("nums", Value::Array(vec![Value::I32(1); 4]))]);
    let pair = Value::record([("a", Value::Byte(1)), ("b", Value::U16(2))]);
    let batch = Value::record([
        ("notes", Value::Array(vec![note.clone(), note])),
        ("pairs", Value::Array(vec![pair; 5])),
    ]);
    let one = c.encode("Batch", &batch).expect("encode");
    let mut stream = one.clone();
    stream.extend_from_slice(&one);

    let resolved = c.schema();
    assert_eq!(record_extent(&stream, 0, resolved, "Batch").expect("extent"), one.len());
    assert_eq!(
        record_extent(&stream, one.len(), resolved, "Batch").expect("extent"),
        one.len()
    );

    let mut walker = BinaryWalker::new(&stream, resolved);
    assert_eq!(walker.skip_record("Batch").expect("skip"), one.len());
    assert_eq!(walker.validate_record("Batch").expect("validate"), one.len());
    assert_eq!(walker.position(), stream.len());
    assert!(walker.remaining().is_empty());
}

#[test]
fn test_skip_type_for_standalone_values() {
    let mut buf = WireBuffer::new();
    buf.write_string("abc").expect("write");
    buf.write_i16(5);
    let bytes = buf.into_vec();
    let c = codec();
    let mut walker = BinaryWalker::new(&bytes, c.schema());
    walker.skip_type(&TypeNode::scalar(ScalarKind::String)).expect("skip");
    assert_eq!(walker.position(), 7);
    walker.skip_type(&TypeNode::defined("Color")).expect("skip");
    assert_eq!(walker.position(), 9);
}

#[test]
fn test_validate_catches_what_skip_trusts() {
    let c = codec();
    let bytes = c
        .encode("Any", &Value::union(1, Value::record([("a", Value::Byte(1)), ("b", Value::U16(2))])))
        .expect("encode");
    let mut bad = bytes.clone();
    bad[4] = 7;
    let resolved = c.schema();
    // skip only follows the length prefix
    assert_eq!(record_extent(&bad, 0, resolved, "Any").expect("extent"), bad.len());
    let err = validate_record_in_place(&bad, 0, resolved, "Any").unwrap_err();
    assert!(matches!(err, CodecError::UnknownDiscriminator { discriminator: 7, .. }));
    assert_eq!(
        validate_record_in_place(&bytes, 0, resolved, "Any").expect("validate"),
        bytes.len()
    );
}

#[test]
fn test_validate_detects_message_overrun() {
    let c = codec();
    // declared body of 3 bytes, but the string inside claims 2 bytes after its own prefix
    let bytes = [3, 0, 0, 0, 1, 2, 0, 0, 0, b'h', b'i', 0];
    let resolved = c.schema();
    assert_eq!(record_extent(&bytes, 0, resolved, "Note").expect("extent"), 7);
    assert!(matches!(
        validate_record_in_place(&bytes, 0, resolved, "Note"),
        Err(CodecError::Overrun { .. })
    ));
    assert!(c.decode("Note", &bytes).is_err());
}

#[test]
fn test_walk_rejects_prefix_past_input() {
    let c = codec();
    let err = record_extent(&[50, 0, 0, 0, 0], 0, c.schema(), "Note").unwrap_err();
    assert!(matches!(err, CodecError::LengthOutOfBounds { length: 50, .. }));
    let err = record_extent(&[], 0, c.schema(), "Pair").unwrap_err();
    assert!(matches!(err, CodecError::Truncated { .. }));
}

#[test]
fn test_walker_depth_limit() {
    let schema = parse("message Node { 1 -> Node child; }").expect("parse");
    let resolved = ResolvedSchema::resolve(schema).expect("resolve");
    let codec = Codec::new(resolved);
    let mut v = Value::record(Vec::<(String, Value)>::new());
    for _ in 0..6 {
        v = Value::record([("child", v)]);
    }
    let bytes = codec.encode("Node", &v).expect("encode");
    let mut walker = BinaryWalker::new(&bytes, codec.schema()).with_max_depth(3);
    assert!(matches!(
        walker.validate_record("Node"),
        Err(CodecError::DepthExceeded { limit: 3 })
    ));
    // skipping does not descend, so depth never grows
    let mut walker = BinaryWalker::new(&bytes, codec.schema()).with_max_depth(3);
    assert_eq!(walker.skip_record("Node").expect("skip"), bytes.len());
}

#[test]
fn test_scalar_view_reads_in_place() {
    let c = codec();
    let mut buf = WireBuffer::new();
    c.encode_type_into(
        &mut buf,
        &TypeNode::array(TypeNode::scalar(ScalarKind::U16)),
        &Value::Array(vec![Value::U16(1), Value::U16(0xbeef), Value::U16(3)]),
    )
    .expect("encode");
    let bytes = buf.into_vec();
    let mut buf = WireBuffer::from_bytes(&bytes);
    let view = c.view_scalar_array(&mut buf, ScalarKind::U16).expect("view");
    assert_eq!(view.len(), 3);
    assert_eq!(view.get(1), Some(Value::U16(0xbeef)));
    assert_eq!(view.get(3), None);
    assert_eq!(view.as_bytes(), &bytes[4..]);
    let all: Vec<Value> = view.iter().collect();
    assert_eq!(all, vec![Value::U16(1), Value::U16(0xbeef), Value::U16(3)]);

    let mut buf = WireBuffer::from_bytes(&bytes);
    assert!(matches!(
        c.view_scalar_array(&mut buf, ScalarKind::String),
        Err(CodecError::TypeMismatch { .. })
    ));
}
