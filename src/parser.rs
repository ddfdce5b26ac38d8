//! Parse IDL source into the schema model using PEST.
//!
//! Inline union branches (`1 -> struct Circle { ... }`) become ordinary named definitions in the
//! arena, registered right after the union that declares them.

use crate::ast::*;
use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;
use std::path::Path;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct SchemaParser;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: syntax error: {message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: {message}")]
    Invalid { line: usize, message: String },
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// Source line the error points at, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Syntax { line, .. } | ParseError::Invalid { line, .. } => Some(*line),
            ParseError::Io(_) => None,
        }
    }
}

fn line_of(pair: &Pair<Rule>) -> usize {
    pair.as_span().start_pos().line_col().0
}

fn invalid(pair: &Pair<Rule>, message: impl Into<String>) -> ParseError {
    ParseError::Invalid {
        line: line_of(pair),
        message: message.into(),
    }
}

/// Parse schema source into an unresolved [`Schema`].
pub fn parse(source: &str) -> Result<Schema, ParseError> {
    let mut pairs = SchemaParser::parse(Rule::schema, source).map_err(|e| {
        let line = match e.line_col {
            LineColLocation::Pos((line, _)) | LineColLocation::Span((line, _), _) => line,
        };
        ParseError::Syntax {
            line,
            message: e.variant.message().into_owned(),
        }
    })?;
    let pair = pairs.next().ok_or_else(|| ParseError::Syntax {
        line: 1,
        message: "empty parse".to_string(),
    })?;
    let mut definitions = Vec::new();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::definition {
            build_definition(inner, &mut definitions)?;
        }
    }
    Ok(Schema { definitions })
}

/// Read and parse a schema file.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Schema, ParseError> {
    let source = std::fs::read_to_string(path)?;
    parse(&source)
}

#[derive(Debug, Default)]
struct Attributes {
    deprecated: Option<Deprecated>,
    opcode: Option<u32>,
    flags: bool,
}

impl Attributes {
    fn add(&mut self, pair: Pair<Rule>) -> Result<(), ParseError> {
        let mut it = pair.clone().into_inner();
        let name = it.next().ok_or_else(|| invalid(&pair, "attribute: missing name"))?;
        let arg = it.next().map(build_literal).transpose()?;
        match (name.as_str(), arg) {
            ("deprecated", None) => self.deprecated = Some(Deprecated::default()),
            ("deprecated", Some(Literal::String(reason))) => self.deprecated = Some(Deprecated { reason }),
            ("opcode", Some(Literal::Int(v))) => {
                let v = u32::try_from(v).map_err(|_| invalid(&pair, format!("opcode {} does not fit in uint32", v)))?;
                self.opcode = Some(v);
            }
            ("opcode", Some(Literal::String(s))) if s.len() == 4 => {
                let b = s.as_bytes();
                self.opcode = Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]));
            }
            ("flags", None) => self.flags = true,
            _ => return Err(invalid(&pair, format!("unsupported attribute: {}", pair.as_str().trim()))),
        }
        Ok(())
    }

    fn no_flags(&self, pair: &Pair<Rule>) -> Result<(), ParseError> {
        if self.flags {
            return Err(invalid(pair, "[flags] only applies to enums"));
        }
        Ok(())
    }
}

fn build_definition(pair: Pair<Rule>, out: &mut Vec<Definition>) -> Result<(), ParseError> {
    let mut attrs = Attributes::default();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::attribute => attrs.add(inner)?,
            Rule::enum_def => {
                let e = build_enum(inner, std::mem::take(&mut attrs))?;
                out.push(Definition::Enum(e));
                return Ok(());
            }
            Rule::const_def => {
                attrs.no_flags(&inner)?;
                out.push(Definition::Const(build_const(inner)?));
                return Ok(());
            }
            Rule::struct_def | Rule::message_def | Rule::union_def => {
                build_record(inner, std::mem::take(&mut attrs), out)?;
                return Ok(());
            }
            _ => {}
        }
    }
    Ok(())
}

/// Build a record, push it and any inline branch definitions, and return its name.
fn build_record(pair: Pair<Rule>, attrs: Attributes, out: &mut Vec<Definition>) -> Result<String, ParseError> {
    attrs.no_flags(&pair)?;
    if attrs.deprecated.is_some() {
        return Err(invalid(&pair, "[deprecated] applies to fields and enum members, not records"));
    }
    let record = match pair.as_rule() {
        Rule::struct_def => RecordDefinition::Struct(build_struct(pair, attrs.opcode)?),
        Rule::message_def => RecordDefinition::Message(build_message(pair, attrs.opcode)?),
        Rule::union_def => {
            let at = out.len();
            let union = build_union(pair, attrs.opcode, out)?;
            let name = union.name.clone();
            out.insert(at, Definition::Record(RecordDefinition::Union(union)));
            return Ok(name);
        }
        other => return Err(invalid(&pair, format!("unexpected {:?}", other))),
    };
    let name = record.name().to_string();
    out.push(Definition::Record(record));
    Ok(name)
}

fn build_enum(pair: Pair<Rule>, attrs: Attributes) -> Result<EnumDefinition, ParseError> {
    if attrs.deprecated.is_some() || attrs.opcode.is_some() {
        return Err(invalid(&pair, "enums accept only the [flags] attribute"));
    }
    let line = line_of(&pair);
    let mut name = None;
    let mut underlying = ScalarKind::U32;
    let mut members = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident if name.is_none() => name = Some(inner.as_str().to_string()),
            Rule::ident => {
                underlying = ScalarKind::from_name(inner.as_str())
                    .ok_or_else(|| invalid(&inner, format!("unknown enum base type: {}", inner.as_str())))?;
            }
            Rule::enum_member => members.push(build_enum_member(inner)?),
            _ => {}
        }
    }
    Ok(EnumDefinition {
        name: name.ok_or_else(|| ParseError::Invalid {
            line,
            message: "enum: missing name".to_string(),
        })?,
        underlying,
        members,
        flags: attrs.flags,
        line,
    })
}

fn build_enum_member(pair: Pair<Rule>) -> Result<EnumMember, ParseError> {
    let mut attrs = Attributes::default();
    let mut name = None;
    let mut value = None;
    for inner in pair.clone().into_inner() {
        match inner.as_rule() {
            Rule::attribute => attrs.add(inner)?,
            Rule::ident => name = Some(inner.as_str().to_string()),
            Rule::int_literal => value = Some(parse_int(&inner)?),
            _ => {}
        }
    }
    Ok(EnumMember {
        name: name.ok_or_else(|| invalid(&pair, "enum member: missing name"))?,
        value: value.ok_or_else(|| invalid(&pair, "enum member: missing value"))?,
        deprecated: attrs.deprecated,
    })
}

fn build_const(pair: Pair<Rule>) -> Result<ConstDefinition, ParseError> {
    let line = line_of(&pair);
    let mut idents = Vec::new();
    let mut value = None;
    for inner in pair.clone().into_inner() {
        match inner.as_rule() {
            Rule::ident => idents.push(inner),
            Rule::literal => value = Some(build_literal(inner)?),
            _ => {}
        }
    }
    let (ty, name) = match idents.as_slice() {
        [ty, name] => (ty, name),
        _ => return Err(invalid(&pair, "const: expected `const <type> <name> = <value>;`")),
    };
    let kind = ScalarKind::from_name(ty.as_str())
        .ok_or_else(|| invalid(ty, format!("const type must be a scalar, got {}", ty.as_str())))?;
    Ok(ConstDefinition {
        name: name.as_str().to_string(),
        ty: kind,
        value: value.ok_or_else(|| invalid(&pair, "const: missing value"))?,
        line,
    })
}

fn build_struct(pair: Pair<Rule>, opcode: Option<u32>) -> Result<StructDefinition, ParseError> {
    let line = line_of(&pair);
    let mut def = StructDefinition {
        name: String::new(),
        fields: Vec::new(),
        mutable: false,
        opcode,
        line,
    };
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::mut_kw => def.mutable = true,
            Rule::ident => def.name = inner.as_str().to_string(),
            Rule::struct_field => def.fields.push(build_field(inner, false)?),
            _ => {}
        }
    }
    Ok(def)
}

fn build_message(pair: Pair<Rule>, opcode: Option<u32>) -> Result<MessageDefinition, ParseError> {
    let line = line_of(&pair);
    let mut def = MessageDefinition {
        name: String::new(),
        fields: Vec::new(),
        opcode,
        line,
    };
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => def.name = inner.as_str().to_string(),
            Rule::message_field => def.fields.push(build_field(inner, true)?),
            _ => {}
        }
    }
    Ok(def)
}

fn build_field(pair: Pair<Rule>, tagged: bool) -> Result<Field, ParseError> {
    let line = line_of(&pair);
    let mut attrs = Attributes::default();
    let mut constant = 0u8;
    let mut ty = None;
    let mut name = None;
    for inner in pair.clone().into_inner() {
        match inner.as_rule() {
            Rule::attribute => attrs.add(inner)?,
            Rule::int_literal if tagged => constant = parse_u8(&inner)?,
            Rule::type_ref => ty = Some(build_type(inner)?),
            Rule::ident => name = Some(inner.as_str().to_string()),
            _ => {}
        }
    }
    if attrs.opcode.is_some() {
        return Err(invalid(&pair, "[opcode] applies to records, not fields"));
    }
    attrs.no_flags(&pair)?;
    Ok(Field {
        name: name.ok_or_else(|| invalid(&pair, "field: missing name"))?,
        ty: ty.ok_or_else(|| invalid(&pair, "field: missing type"))?,
        constant,
        deprecated: attrs.deprecated,
        line,
    })
}

fn build_union(pair: Pair<Rule>, opcode: Option<u32>, out: &mut Vec<Definition>) -> Result<UnionDefinition, ParseError> {
    let line = line_of(&pair);
    let mut def = UnionDefinition {
        name: String::new(),
        branches: Vec::new(),
        opcode,
        line,
    };
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => def.name = inner.as_str().to_string(),
            Rule::union_branch => def.branches.push(build_branch(inner, out)?),
            _ => {}
        }
    }
    Ok(def)
}

fn build_branch(pair: Pair<Rule>, out: &mut Vec<Definition>) -> Result<UnionBranch, ParseError> {
    let mut discriminator = None;
    let mut definition = None;
    for inner in pair.clone().into_inner() {
        match inner.as_rule() {
            Rule::int_literal => discriminator = Some(parse_u8(&inner)?),
            Rule::branch_ref => {
                definition = inner.into_inner().next().map(|p| p.as_str().to_string());
            }
            Rule::branch_inline => {
                let mut attrs = Attributes::default();
                for part in inner.into_inner() {
                    match part.as_rule() {
                        Rule::attribute => attrs.add(part)?,
                        _ => {
                            definition = Some(build_record(part, std::mem::take(&mut attrs), out)?);
                            break;
                        }
                    }
                }
            }
            _ => {}
        }
    }
    Ok(UnionBranch {
        discriminator: discriminator.ok_or_else(|| invalid(&pair, "union branch: missing discriminator"))?,
        definition: definition.ok_or_else(|| invalid(&pair, "union branch: missing definition"))?,
    })
}

fn build_type(pair: Pair<Rule>) -> Result<TypeNode, ParseError> {
    let mut it = pair.clone().into_inner();
    let base = it.next().ok_or_else(|| invalid(&pair, "type: missing base"))?;
    let mut ty = build_base_type(base)?;
    for suffix in it {
        if suffix.as_rule() == Rule::array_suffix {
            ty = TypeNode::array(ty);
        }
    }
    Ok(ty)
}

fn build_base_type(pair: Pair<Rule>) -> Result<TypeNode, ParseError> {
    let inner = pair
        .clone()
        .into_inner()
        .next()
        .ok_or_else(|| invalid(&pair, "empty type"))?;
    match inner.as_rule() {
        Rule::array_type => {
            let element = inner
                .clone()
                .into_inner()
                .next()
                .ok_or_else(|| invalid(&inner, "array: missing element type"))?;
            Ok(TypeNode::array(build_type(element)?))
        }
        Rule::map_type => {
            let mut it = inner.clone().into_inner();
            let (k, v) = match (it.next(), it.next()) {
                (Some(k), Some(v)) => (k, v),
                _ => return Err(invalid(&inner, "map: expected key and value types")),
            };
            Ok(TypeNode::map(build_type(k)?, build_type(v)?))
        }
        Rule::ident => Ok(match ScalarKind::from_name(inner.as_str()) {
            Some(kind) => TypeNode::Scalar(kind),
            None => TypeNode::Defined(inner.as_str().to_string()),
        }),
        other => Err(invalid(&inner, format!("unhandled type rule: {:?}", other))),
    }
}

fn build_literal(pair: Pair<Rule>) -> Result<Literal, ParseError> {
    let inner = pair
        .clone()
        .into_inner()
        .next()
        .ok_or_else(|| invalid(&pair, "empty literal"))?;
    match inner.as_rule() {
        Rule::int_literal => Ok(Literal::Int(parse_int(&inner)?)),
        Rule::float_literal => inner
            .as_str()
            .parse::<f64>()
            .map(Literal::Float)
            .map_err(|e| invalid(&inner, format!("bad float {}: {}", inner.as_str(), e))),
        Rule::bool_literal => Ok(Literal::Bool(inner.as_str() == "true")),
        Rule::string_literal => Ok(Literal::String(unquote(inner.as_str()))),
        other => Err(invalid(&inner, format!("unhandled literal rule: {:?}", other))),
    }
}

/// Strip the quotes and resolve `\"` and `\\`.
fn unquote(s: &str) -> String {
    let body = &s[1..s.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            c => out.push(c),
        }
    }
    out
}

fn parse_int(pair: &Pair<Rule>) -> Result<i128, ParseError> {
    let s = pair.as_str();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let magnitude = match digits.strip_prefix("0x") {
        Some(hex) => i128::from_str_radix(hex, 16),
        None => digits.parse::<i128>(),
    }
    .map_err(|e| invalid(pair, format!("bad integer {}: {}", s, e)))?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn parse_u8(pair: &Pair<Rule>) -> Result<u8, ParseError> {
    let v = parse_int(pair)?;
    u8::try_from(v).map_err(|_| invalid(pair, format!("{} does not fit in a byte", v)))
}
