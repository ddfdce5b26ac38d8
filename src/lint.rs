//! Linter for schema source: parse and resolution failures, plus compatibility warnings.
//!
//! ## Rules
//!
//! - **Syntax** (error): the source does not parse.
//! - **Resolution** (error): the schema parses but fails resolution (unknown type, duplicate
//!   tag, reserved tag 0, ...).
//! - **Tag gap** (warning): message tags are not contiguous from 1. Usually a sign of a
//!   removed field whose tag could be reused by mistake; deprecate instead of deleting.
//! - **Discriminator order** (warning): union branches not declared in ascending
//!   discriminator order. Legal, but easy to misread.
//! - **Empty record** (warning): struct or message without fields.
//! - **Enum without zero** (warning): no member has value 0, so a zeroed value has no name.
//! - **Deprecated without reason** (warning): `[deprecated]` with no explanation.
//!
//! Run the linter via the `lint_schema` binary: `cargo run --bin lint_schema -- schema.bop`
//! or pipe: `lint_schema < schema.bop`. Exit code 1 if any error-level findings.

use crate::ast::{Definition, Field, RecordDefinition, ResolvedSchema, Schema};
use crate::parser::{parse, ParseError};

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Identifies which rule produced the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintRule {
    Syntax,
    Resolution,
    TagGap,
    DiscriminatorOrder,
    EmptyRecord,
    EnumWithoutZero,
    DeprecatedWithoutReason,
}

/// A single lint message with location.
#[derive(Debug, Clone)]
pub struct LintMessage {
    pub line: usize,
    pub rule: LintRule,
    pub severity: Severity,
    pub message: String,
}

impl LintMessage {
    fn warning(line: usize, rule: LintRule, message: String) -> Self {
        LintMessage {
            line,
            rule,
            severity: Severity::Warning,
            message,
        }
    }
}

/// Run all lint rules on schema source. Returns messages in line order.
pub fn lint(source: &str) -> Vec<LintMessage> {
    let schema = match parse(source) {
        Ok(s) => s,
        Err(e) => {
            let line = e.line().unwrap_or(0);
            let message = match e {
                ParseError::Syntax { message, .. } | ParseError::Invalid { message, .. } => message,
                other => other.to_string(),
            };
            return vec![LintMessage {
                line,
                rule: LintRule::Syntax,
                severity: Severity::Error,
                message,
            }];
        }
    };

    let mut out = warnings(&schema);
    if let Err(e) = ResolvedSchema::resolve(schema.clone()) {
        let line = schema
            .definitions
            .iter()
            .find(|d| d.name() == e.subject())
            .map(|d| d.line())
            .unwrap_or(0);
        out.push(LintMessage {
            line,
            rule: LintRule::Resolution,
            severity: Severity::Error,
            message: e.to_string(),
        });
    }
    out.sort_by_key(|m| m.line);
    out
}

fn deprecated_without_reason(fields: &[Field], owner: &str, out: &mut Vec<LintMessage>) {
    for f in fields {
        if f.deprecated.as_ref().is_some_and(|d| d.reason.trim().is_empty()) {
            out.push(LintMessage::warning(
                f.line,
                LintRule::DeprecatedWithoutReason,
                format!("{}.{} is deprecated without a reason", owner, f.name),
            ));
        }
    }
}

fn warnings(schema: &Schema) -> Vec<LintMessage> {
    let mut out = Vec::new();
    for def in &schema.definitions {
        match def {
            Definition::Record(RecordDefinition::Struct(s)) => {
                if s.fields.is_empty() {
                    out.push(LintMessage::warning(
                        s.line,
                        LintRule::EmptyRecord,
                        format!("struct {} has no fields", s.name),
                    ));
                }
            }
            Definition::Record(RecordDefinition::Message(m)) => {
                if m.fields.is_empty() {
                    out.push(LintMessage::warning(
                        m.line,
                        LintRule::EmptyRecord,
                        format!("message {} has no fields", m.name),
                    ));
                }
                let mut tags: Vec<u8> = m.fields.iter().map(|f| f.constant).filter(|&t| t != 0).collect();
                tags.sort_unstable();
                tags.dedup();
                let missing: Vec<String> = (1..=tags.last().copied().unwrap_or(0))
                    .filter(|t| tags.binary_search(t).is_err())
                    .map(|t| t.to_string())
                    .collect();
                if !missing.is_empty() {
                    out.push(LintMessage::warning(
                        m.line,
                        LintRule::TagGap,
                        format!("message {} skips tag(s) {}", m.name, missing.join(", ")),
                    ));
                }
                deprecated_without_reason(&m.fields, &m.name, &mut out);
            }
            Definition::Record(RecordDefinition::Union(u)) => {
                let ascending = u.branches.windows(2).all(|w| w[0].discriminator < w[1].discriminator);
                if !ascending {
                    out.push(LintMessage::warning(
                        u.line,
                        LintRule::DiscriminatorOrder,
                        format!("union {} branches are not in ascending discriminator order", u.name),
                    ));
                }
            }
            Definition::Enum(e) => {
                if !e.members.is_empty() && e.members.iter().all(|m| m.value != 0) {
                    out.push(LintMessage::warning(
                        e.line,
                        LintRule::EnumWithoutZero,
                        format!("enum {} has no member with value 0", e.name),
                    ));
                }
                for m in &e.members {
                    if m.deprecated.as_ref().is_some_and(|d| d.reason.trim().is_empty()) {
                        out.push(LintMessage::warning(
                            e.line,
                            LintRule::DeprecatedWithoutReason,
                            format!("{}.{} is deprecated without a reason", e.name, m.name),
                        ));
                    }
                }
            }
            Definition::Const(_) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(src: &str) -> Vec<LintRule> {
        lint(src).into_iter().map(|m| m.rule).collect()
    }

    #[test]
    fn syntax_error_is_reported_with_line() {
        let msgs = lint("struct A {\n  int32 x\n}\n");
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].rule, LintRule::Syntax);
        assert_eq!(msgs[0].severity, Severity::Error);
        assert!(msgs[0].line >= 2, "{:?}", msgs);
    }

    #[test]
    fn unresolved_type_points_at_definition() {
        let msgs = lint("enum E { Zero = 0; }\n\nstruct A {\n  Missing m;\n}\n");
        let err = msgs.iter().find(|m| m.rule == LintRule::Resolution).unwrap();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("Missing"));
    }

    #[test]
    fn tag_gap_and_missing_reason() {
        let src = "message M {\n  1 -> int32 a;\n  [deprecated] 3 -> int32 c;\n}\n";
        let r = rules(src);
        assert!(r.contains(&LintRule::TagGap));
        assert!(r.contains(&LintRule::DeprecatedWithoutReason));
        assert!(!r.contains(&LintRule::Resolution));
    }

    #[test]
    fn discriminator_order_and_empty_records() {
        let src = "union U {\n  2 -> struct Two {}\n  1 -> message One {}\n}\n";
        let r = rules(src);
        assert!(r.contains(&LintRule::DiscriminatorOrder));
        assert_eq!(r.iter().filter(|x| **x == LintRule::EmptyRecord).count(), 2);
    }

    #[test]
    fn clean_schema_passes() {
        let src = "enum Kind : uint8 { Unknown = 0; Cat = 1; }\n\nmessage Pet {\n  1 -> string name;\n  2 -> Kind kind;\n}\n";
        assert!(lint(src).is_empty(), "{:?}", lint(src));
    }
}
