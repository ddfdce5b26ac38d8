//! Parser fuzz target: feed arbitrary text to the schema parser and resolver, then lint it.
//! None of them may panic; malformed schemas come back as errors or lint findings.
//! Build with: cargo fuzz run parser_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    if let Ok(schema) = schemawire::parse(s) {
        let _ = schemawire::ResolvedSchema::resolve(schema);
    }
    let _ = schemawire::lint::lint(s);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run parser_fuzz");
}
