//! Format decoded values for display. Uses the resolved schema for field order, enum member
//! names and union branch names.

use crate::ast::{Definition, RecordDefinition, ResolvedSchema, TypeNode};
use crate::value::Value;

/// Lowercase hex, no separators.
pub fn hex_string(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Parse hex text (whitespace ignored, optional `0x` prefix) into bytes.
pub fn parse_hex(text: &str) -> Option<Vec<u8>> {
    let digits: String = text.split_whitespace().collect();
    let digits = digits.strip_prefix("0x").unwrap_or(&digits);
    hex::decode(digits).ok()
}

/// Format a scalar without schema context.
pub fn format_scalar_raw(v: &Value) -> String {
    match v {
        Value::Bool(x) => format!("{}", x),
        Value::Byte(x) => format!("{}", x),
        Value::I16(x) => format!("{}", x),
        Value::U16(x) => format!("{}", x),
        Value::I32(x) => format!("{}", x),
        Value::U32(x) => format!("{}", x),
        Value::I64(x) => format!("{}", x),
        Value::U64(x) => format!("{}", x),
        Value::F32(x) => format!("{}", x),
        Value::F64(x) => format!("{}", x),
        Value::String(s) => format!("{:?}", s),
        Value::Guid(g) => format!("{}", g),
        Value::Date(d) => format!("date({} ms)", d.to_unix_millis()),
        Value::Bytes(b) => format!("hex({})", hex_string(b)),
        other => format!("{:?}", other),
    }
}

/// Render a record value as indented text, fields in declaration order.
pub fn dump_record(resolved: &ResolvedSchema, name: &str, value: &Value) -> String {
    value_to_dump(resolved, &TypeNode::defined(name), value, 0)
}

/// Render a value of `ty` at the given indent level.
pub fn value_to_dump(resolved: &ResolvedSchema, ty: &TypeNode, v: &Value, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    match (ty, v) {
        (TypeNode::Array(element), Value::Array(items)) => {
            let mut lines = vec![format!("{}[", pad)];
            for item in items {
                lines.push(value_to_dump(resolved, element, item, indent + 1));
            }
            lines.push(format!("{}]", pad));
            lines.join("\n")
        }
        (TypeNode::Map(key, val), Value::Map(entries)) => {
            let mut lines = vec![format!("{}{{", pad)];
            for (k, item) in entries {
                let k = value_to_dump(resolved, key, k, 0);
                let item = value_to_dump(resolved, val, item, indent + 1);
                lines.push(format!("{}  {} =>\n{}", pad, k, item));
            }
            lines.push(format!("{}}}", pad));
            lines.join("\n")
        }
        (TypeNode::Defined(name), _) => match resolved.get(name) {
            Some(Definition::Enum(e)) => match v.as_i128().and_then(|n| e.member_name(n)) {
                Some(member) => format!("{}{}.{} ({})", pad, e.name, member, format_scalar_raw(v)),
                None => format!("{}{}", pad, format_scalar_raw(v)),
            },
            Some(Definition::Record(r)) => record_to_dump(resolved, r, v, indent),
            _ => format!("{}{}", pad, format_scalar_raw(v)),
        },
        _ => format!("{}{}", pad, format_scalar_raw(v)),
    }
}

fn record_to_dump(resolved: &ResolvedSchema, record: &RecordDefinition, v: &Value, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    match (record, v) {
        (RecordDefinition::Union(u), Value::Union { discriminator, value }) => {
            let branch = u.branch(*discriminator).map(|b| b.definition.as_str()).unwrap_or("?");
            format!(
                "{}{}::{} ({}) =>\n{}",
                pad,
                u.name,
                branch,
                discriminator,
                value_to_dump(resolved, &TypeNode::defined(branch), value, indent + 1)
            )
        }
        (_, Value::Record(fields)) => {
            let mut lines: Vec<String> = vec![format!("{}{} {} {{", pad, record.kind_name(), record.name())];
            for f in record.fields() {
                match fields.get(&f.name) {
                    Some(fv) => {
                        let rendered = value_to_dump(resolved, &f.ty, fv, indent + 2);
                        lines.push(format!("{}  {}:\n{}", pad, f.name, rendered));
                    }
                    None => lines.push(format!("{}  {}: <absent>", pad, f.name)),
                }
            }
            lines.push(format!("{}}}", pad));
            lines.join("\n")
        }
        _ => format!("{}{}", pad, format_scalar_raw(v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{EnumDefinition, Field, MessageDefinition, ScalarKind, Schema};

    #[test]
    fn hex_roundtrip() {
        assert_eq!(parse_hex("0x0a ff 10"), Some(vec![0x0a, 0xff, 0x10]));
        assert_eq!(parse_hex("abc"), None);
        assert_eq!(parse_hex("DEADbeef"), Some(vec![0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(hex_string(&[0x0a, 0xff]), "0aff");
    }

    #[test]
    fn non_ascii_text_is_not_hex() {
        assert_eq!(parse_hex("aéb"), None);
        assert_eq!(parse_hex("0xé0"), None);
        assert_eq!(parse_hex("zz"), None);
    }

    #[test]
    fn enum_member_names_and_absent_fields() {
        let schema = Schema::new(vec![
            EnumDefinition::new("Kind", ScalarKind::Byte, &[("Zero", 0), ("Cat", 1)]).into(),
            MessageDefinition::new(
                "Pet",
                vec![
                    Field::tagged(1, "kind", TypeNode::defined("Kind")),
                    Field::tagged(2, "name", TypeNode::scalar(ScalarKind::String)),
                ],
            )
            .into(),
        ]);
        let resolved = ResolvedSchema::resolve(schema).unwrap();
        let text = dump_record(&resolved, "Pet", &Value::record([("kind", Value::Byte(1))]));
        assert!(text.contains("Kind.Cat (1)"), "{}", text);
        assert!(text.contains("name: <absent>"), "{}", text);
    }
}
