//! Benchmark: walk vs decode vs decode+encode over a frame of records. Walk uses
//! record_extent only (no decode); walk+validate descends into message and union bodies.
//! Decode and decode+encode round-trip every record.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use schemawire::frame::{decode_frame, encode_frame};
use schemawire::{parse, record_extent, validate_record_in_place, Codec, Date, Guid, ResolvedSchema, Value};

const SCHEMA: &str = r#"
enum Status : uint8 { Unknown = 0; Active = 1; Retired = 2; }

struct Position { float64 lat; float64 lon; float32 alt; }

message Track {
  1 -> guid id;
  2 -> string callsign;
  3 -> Status status;
  4 -> Position[] path;
  5 -> map[string, int32] counters;
  6 -> date seen;
  7 -> byte[] raw;
}

union Event {
  1 -> Track;
  2 -> struct Lost { guid id; date at; }
}
"#;

const RECORDS: usize = 1_000;

fn track(i: usize) -> Value {
    let path = (0..16)
        .map(|p| {
            Value::record([
                ("lat", Value::F64(48.0 + p as f64 * 0.01)),
                ("lon", Value::F64(2.0 + i as f64 * 0.001)),
                ("alt", Value::F32(1000.0 + p as f32)),
            ])
        })
        .collect();
    Value::record([
        ("id", Value::Guid(Guid::from_fields(i as u32, 1, 2, [3; 8]))),
        ("callsign", Value::from(format!("TRK{:04}", i))),
        ("status", Value::Byte((i % 3) as u8)),
        ("path", Value::Array(path)),
        (
            "counters",
            Value::Map(vec![("hits".into(), Value::I32(i as i32)), ("misses".into(), Value::I32(3))]),
        ),
        ("seen", Value::Date(Date::from_unix_millis(1_700_000_000_000 + i as i64))),
        ("raw", Value::Bytes(vec![i as u8; 32])),
    ])
}

fn event(i: usize) -> Value {
    if i % 10 == 0 {
        Value::union(
            2,
            Value::record([
                ("id", Value::Guid(Guid::NIL)),
                ("at", Value::Date(Date::UNIX_EPOCH)),
            ]),
        )
    } else {
        Value::union(1, track(i))
    }
}

fn walk(bytes: &[u8], resolved: &ResolvedSchema, validate: bool) -> usize {
    let mut pos = 0;
    let mut records = 0;
    while pos < bytes.len() {
        let n = if validate {
            validate_record_in_place(bytes, pos, resolved, "Event")
        } else {
            record_extent(bytes, pos, resolved, "Event")
        };
        match n {
            Ok(n) if n > 0 => {
                pos += n;
                records += 1;
            }
            _ => break,
        }
    }
    records
}

fn bench_codec(c: &mut Criterion) {
    let schema = parse(SCHEMA).expect("parse schema");
    let codec = Codec::new(ResolvedSchema::resolve(schema).expect("resolve"));
    let events: Vec<Value> = (0..RECORDS).map(event).collect();
    let bytes = encode_frame(&codec, "Event", &events).expect("encode frame");

    c.bench_function("walk_event_frame", |b| {
        b.iter(|| black_box(walk(black_box(&bytes), codec.schema(), false)))
    });

    c.bench_function("walk_validate_event_frame", |b| {
        b.iter(|| black_box(walk(black_box(&bytes), codec.schema(), true)))
    });

    c.bench_function("decode_event_frame", |b| {
        b.iter(|| {
            let result = decode_frame(&codec, black_box("Event"), black_box(&bytes)).expect("decode");
            black_box(result.records.len())
        })
    });

    c.bench_function("decode_encode_event_frame", |b| {
        b.iter(|| {
            let result = decode_frame(&codec, black_box("Event"), black_box(&bytes)).expect("decode");
            let mut total = 0;
            for r in &result.records {
                total += codec.encode(&r.name, &r.value).expect("encode").len();
            }
            black_box(total)
        })
    });

    c.bench_function("encode_track", |b| {
        let t = Value::union(1, track(7));
        b.iter(|| black_box(codec.encode("Event", black_box(&t)).expect("encode")))
    });

    c.bench_function("encoded_size_track", |b| {
        let t = Value::union(1, track(7));
        b.iter(|| black_box(codec.encoded_size("Event", black_box(&t)).expect("size")))
    });
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
