//! Decode fuzz target: arbitrary bytes against a fixed schema. Decode, walk and frame decoding
//! must return errors for bad input, never panic or allocate without bound.
//! Build with: cargo fuzz run decode_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
const SCHEMA: &str = r#"
enum Kind : uint16 { A = 0; B = 1; }
struct Point { float32 x; float32 y; guid id; date at; }
message Shape {
  1 -> string name;
  2 -> Point[] points;
  3 -> map[Kind, byte[]] blobs;
  4 -> Shape[] children;
  5 -> Any any;
}
union Any {
  1 -> Point;
  2 -> Shape;
  3 -> message Empty {}
}
"#;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let schema = match schemawire::parse(SCHEMA) {
        Ok(s) => s,
        Err(_) => return,
    };
    let resolved = match schemawire::ResolvedSchema::resolve(schema) {
        Ok(r) => r,
        Err(_) => return,
    };
    for name in ["Shape", "Any", "Point"] {
        let _ = schemawire::record_extent(data, 0, &resolved, name);
        let _ = schemawire::validate_record_in_place(data, 0, &resolved, name);
    }
    let codec = schemawire::Codec::with_options(
        resolved,
        schemawire::CodecOptions::default().with_max_collection_len(1 << 16),
    );
    for name in ["Shape", "Any", "Point"] {
        if let Ok(value) = codec.decode(name, data) {
            let _ = codec.encode(name, &value);
        }
    }
    let _ = schemawire::decode_frame(&codec, "Any", data);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run decode_fuzz");
}
