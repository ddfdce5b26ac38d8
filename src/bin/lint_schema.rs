//! Lint schema files: syntax, resolution, and compatibility warnings.
//!
//! Usage:
//!   lint_schema [OPTIONS] [FILE ...]
//!   lint_schema < schema.bop
//!
//! Options:
//!   --human, -H  Human-readable output
//!
//! If no files are given, reads from stdin. Exit code 1 if any error-level findings.

use schemawire::lint::{lint, LintMessage, LintRule, Severity};
use std::io::{self, Read};
use std::path::Path;

fn rule_id(rule: LintRule) -> &'static str {
    match rule {
        LintRule::Syntax => "syntax",
        LintRule::Resolution => "resolution",
        LintRule::TagGap => "tag-gap",
        LintRule::DiscriminatorOrder => "discriminator-order",
        LintRule::EmptyRecord => "empty-record",
        LintRule::EnumWithoutZero => "enum-without-zero",
        LintRule::DeprecatedWithoutReason => "deprecated-without-reason",
    }
}

fn print_message(path: &str, m: &LintMessage, style: OutputStyle) {
    let severity_str = match m.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    match style {
        OutputStyle::Compact => {
            println!("{}:{}: {}: {} [{}]", path, m.line, severity_str, m.message, rule_id(m.rule));
        }
        OutputStyle::Human => {
            println!("  {} {}:{}: {}", severity_str, path, m.line, m.message);
            println!("    rule: {}", rule_id(m.rule));
        }
    }
}

#[derive(Clone, Copy)]
enum OutputStyle {
    Compact,
    Human,
}

#[derive(Default)]
struct Totals {
    errors: usize,
    warnings: usize,
}

impl Totals {
    fn report(&mut self, path: &str, messages: &[LintMessage], style: OutputStyle) {
        for m in messages {
            match m.severity {
                Severity::Error => self.errors += 1,
                Severity::Warning => self.warnings += 1,
            }
            print_message(path, m, style);
        }
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
    let style = if let Some(pos) = args.iter().position(|a| a == "--human" || a == "-H") {
        args.remove(pos);
        OutputStyle::Human
    } else {
        OutputStyle::Compact
    };

    let mut totals = Totals::default();
    let mut unreadable = false;

    if args.is_empty() {
        let mut src = String::new();
        io::stdin().read_to_string(&mut src)?;
        totals.report("<stdin>", &lint(&src), style);
    } else {
        for path in &args {
            let path = Path::new(path);
            let src = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("{}: {}", path.display(), e);
                    unreadable = true;
                    continue;
                }
            };
            totals.report(&path.display().to_string(), &lint(&src), style);
        }
    }

    if totals.errors > 0 || totals.warnings > 0 {
        eprintln!("lint: {} error(s), {} warning(s)", totals.errors, totals.warnings);
    }
    if unreadable || totals.errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}
