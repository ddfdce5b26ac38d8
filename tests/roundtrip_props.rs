//! Property tests: random values survive encode/decode, sizes agree with the encoder, and
//! arbitrary input never panics the decoder or the walker.

use proptest::prelude::*;
use schemawire::frame::{decode_frame, encode_frame};
use schemawire::walk::{record_extent, validate_record_in_place};
use schemawire::{parse, Codec, ResolvedSchema, Value};

const SCHEMA: &str = r#"
enum Mood : uint8 { Calm = 0; Angry = 1; }

struct Inner { int16 a; float64 b; }

message Item {
  1 -> string label;
  2 -> uint64 count;
  3 -> Inner inner;
  4 -> int32[] values;
  5 -> map[string, Mood] moods;
  6 -> byte[] blob;
  7 -> Item[] children;
}

union Either {
  1 -> Item;
  2 -> Inner;
}
"#;

fn codec() -> Codec {
    Codec::new(ResolvedSchema::resolve(parse(SCHEMA).expect("parse")).expect("resolve"))
}

fn inner() -> impl Strategy<Value = Value> {
    (any::<i16>(), -1.0e12f64..1.0e12)
        .prop_map(|(a, b)| Value::record([("a", Value::I16(a)), ("b", Value::F64(b))]))
}

fn leaf_item() -> impl Strategy<Value = Value> {
    (
        proptest::option::of(".{0,16}"),
        proptest::option::of(any::<u64>()),
        proptest::option::of(inner()),
        proptest::option::of(prop::collection::vec(any::<i32>(), 0..16)),
        proptest::option::of(prop::collection::btree_map("[a-z]{0,6}", 0u8..2, 0..6)),
        proptest::option::of(prop::collection::vec(any::<u8>(), 0..32)),
    )
        .prop_map(|(label, count, inner, values, moods, blob)| {
            let mut fields: Vec<(&str, Value)> = Vec::new();
            if let Some(l) = label {
                fields.push(("label", Value::String(l)));
            }
            if let Some(c) = count {
                fields.push(("count", Value::U64(c)));
            }
            if let Some(i) = inner {
                fields.push(("inner", i));
            }
            if let Some(v) = values {
                fields.push(("values", Value::Array(v.into_iter().map(Value::I32).collect())));
            }
            if let Some(m) = moods {
                let entries = m.into_iter().map(|(k, v)| (Value::String(k), Value::Byte(v))).collect();
                fields.push(("moods", Value::Map(entries)));
            }
            if let Some(b) = blob {
                fields.push(("blob", Value::Bytes(b)));
            }
            Value::record(fields)
        })
}

fn item() -> impl Strategy<Value = Value> {
    leaf_item().prop_recursive(3, 16, 4, |element| {
        (leaf_item(), prop::collection::vec(element, 0..4)).prop_map(|(base, children)| {
            let mut fields = base.as_record().cloned().unwrap_or_default();
            fields.insert("children".to_string(), Value::Array(children));
            Value::Record(fields)
        })
    })
}

fn either() -> impl Strategy<Value = Value> {
    prop_oneof![
        item().prop_map(|v| Value::union(1, v)),
        inner().prop_map(|v| Value::union(2, v)),
    ]
}

proptest! {
    #[test]
    fn item_roundtrips(v in item()) {
        let c = codec();
        let bytes = c.encode("Item", &v).unwrap();
        let decoded = c.decode("Item", &bytes).unwrap();
        prop_assert!(decoded.same_entries(&v), "{:?} != {:?}", decoded, v);
        prop_assert_eq!(c.encoded_size("Item", &v).unwrap(), bytes.len());
        prop_assert_eq!(record_extent(&bytes, 0, c.schema(), "Item").unwrap(), bytes.len());
        prop_assert_eq!(validate_record_in_place(&bytes, 0, c.schema(), "Item").unwrap(), bytes.len());
    }

    #[test]
    fn union_roundtrips(v in either()) {
        let c = codec();
        let bytes = c.encode("Either", &v).unwrap();
        let (decoded, consumed) = c.decode_prefix("Either", &bytes).unwrap();
        prop_assert_eq!(consumed, bytes.len());
        prop_assert!(decoded.same_entries(&v));
    }

    #[test]
    fn frame_roundtrips(values in prop::collection::vec(item(), 0..5)) {
        let c = codec();
        let bytes = encode_frame(&c, "Item", &values).unwrap();
        let result = decode_frame(&c, "Item", &bytes).unwrap();
        prop_assert!(result.rejected.is_empty());
        prop_assert_eq!(result.records.len(), values.len());
        for (r, v) in result.records.iter().zip(&values) {
            prop_assert!(r.value.same_entries(v));
        }
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let c = codec();
        for name in ["Item", "Either", "Inner"] {
            let decoded = c.decode_prefix(name, &bytes);
            let extent = record_extent(&bytes, 0, c.schema(), name);
            let _ = validate_record_in_place(&bytes, 0, c.schema(), name);
            // whatever decodes has the extent the walker finds
            if let Ok((_, consumed)) = decoded {
                prop_assert_eq!(extent.ok(), Some(consumed));
            }
        }
        let _ = decode_frame(&c, "Either", &bytes);
    }

    #[test]
    fn truncation_is_always_an_error(v in item(), cut in any::<prop::sample::Index>()) {
        let c = codec();
        let bytes = c.encode("Item", &v).unwrap();
        let at = cut.index(bytes.len());
        let err = c.decode("Item", &bytes[..at]).unwrap_err();
        prop_assert!(err.is_malformed());
    }
}
