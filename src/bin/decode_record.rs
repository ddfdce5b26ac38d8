//! Decode encoded records against a schema and print them.
//!
//! Usage:
//!   decode_record [OPTIONS] SCHEMA RECORD [FILE]
//!
//! Reads FILE (or stdin) as raw bytes, or as hex text with `--hex`.
//!
//! Options:
//!   --hex        Input is hex text
//!   --extent     Only print the byte extent of the first record (no decode)
//!   --frame      Input holds several records back to back; decode all of them
//!
//! Set `RUST_LOG=schemawire=debug` to see skipped tags and rejected records.

use anyhow::Context;
use schemawire::dump::{dump_record, parse_hex};
use schemawire::frame::decode_frame;
use schemawire::walk::record_extent;
use schemawire::{parse_file, Codec, ResolvedSchema};
use std::io::{self, Read};
use std::path::PathBuf;

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    match args.iter().position(|a| a == flag) {
        Some(pos) => {
            args.remove(pos);
            true
        }
        None => false,
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let hex = take_flag(&mut args, "--hex");
    let extent_only = take_flag(&mut args, "--extent");
    let frame = take_flag(&mut args, "--frame");

    let mut args = args.into_iter();
    let (schema_path, record) = match (args.next(), args.next()) {
        (Some(s), Some(r)) => (PathBuf::from(s), r),
        _ => anyhow::bail!("usage: decode_record [--hex] [--extent] [--frame] SCHEMA RECORD [FILE]"),
    };
    let input_path = args.next().map(PathBuf::from);

    let schema = parse_file(&schema_path).with_context(|| format!("parsing {}", schema_path.display()))?;
    let resolved = ResolvedSchema::resolve(schema)?;

    let mut raw = Vec::new();
    match &input_path {
        Some(p) => raw = std::fs::read(p).with_context(|| format!("reading {}", p.display()))?,
        None => {
            io::stdin().read_to_end(&mut raw)?;
        }
    }
    let bytes = if hex {
        let text = String::from_utf8_lossy(&raw);
        parse_hex(&text).ok_or_else(|| anyhow::anyhow!("input is not valid hex"))?
    } else {
        raw
    };

    if extent_only {
        let n = record_extent(&bytes, 0, &resolved, &record)?;
        println!("{}", n);
        return Ok(());
    }

    let codec = Codec::new(resolved);
    if frame {
        let result = decode_frame(&codec, &record, &bytes)?;
        for r in &result.records {
            println!("[{}..{}]", r.byte_range.0, r.byte_range.1);
            println!("{}", dump_record(codec.schema(), &r.name, &r.value));
        }
        for r in &result.rejected {
            eprintln!("[{}..{}] rejected: {}", r.byte_range.0, r.byte_range.1, r.reason);
        }
        eprintln!("{} record(s), {} rejected", result.records.len(), result.rejected.len());
    } else {
        let (value, consumed) = codec.decode_prefix(&record, &bytes)?;
        println!("{}", dump_record(codec.schema(), &record, &value));
        if consumed < bytes.len() {
            eprintln!("{} trailing byte(s) after the record", bytes.len() - consumed);
        }
    }
    Ok(())
}
