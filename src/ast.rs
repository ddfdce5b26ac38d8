//! Schema model: type graph, record shapes, enums and constants, plus the resolved name table
//! the codec reads.
//!
//! Definitions live in one arena ([`Schema::definitions`]); a [`TypeNode::Defined`] is a name
//! looked up through [`ResolvedSchema`], never an owned nested definition. That is what lets
//! records refer to each other (and to themselves) through arrays, maps, messages and unions.

use std::collections::{HashMap, HashSet};
use std::fmt;

/// Terminal wire types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Byte,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    String,
    Guid,
    Date,
}

impl ScalarKind {
    /// IDL spelling to kind. `uint8` is an alias of `byte`.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => ScalarKind::Bool,
            "byte" | "uint8" => ScalarKind::Byte,
            "int16" => ScalarKind::I16,
            "uint16" => ScalarKind::U16,
            "int32" => ScalarKind::I32,
            "uint32" => ScalarKind::U32,
            "int64" => ScalarKind::I64,
            "uint64" => ScalarKind::U64,
            "float32" => ScalarKind::F32,
            "float64" => ScalarKind::F64,
            "string" => ScalarKind::String,
            "guid" => ScalarKind::Guid,
            "date" => ScalarKind::Date,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Byte => "byte",
            ScalarKind::I16 => "int16",
            ScalarKind::U16 => "uint16",
            ScalarKind::I32 => "int32",
            ScalarKind::U32 => "uint32",
            ScalarKind::I64 => "int64",
            ScalarKind::U64 => "uint64",
            ScalarKind::F32 => "float32",
            ScalarKind::F64 => "float64",
            ScalarKind::String => "string",
            ScalarKind::Guid => "guid",
            ScalarKind::Date => "date",
        }
    }

    /// Encoded width, or `None` for strings.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            ScalarKind::Bool | ScalarKind::Byte => Some(1),
            ScalarKind::I16 | ScalarKind::U16 => Some(2),
            ScalarKind::I32 | ScalarKind::U32 | ScalarKind::F32 => Some(4),
            ScalarKind::I64 | ScalarKind::U64 | ScalarKind::F64 | ScalarKind::Date => Some(8),
            ScalarKind::Guid => Some(16),
            ScalarKind::String => None,
        }
    }

    pub fn is_integral(&self) -> bool {
        self.integral_range().is_some()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ScalarKind::F32 | ScalarKind::F64)
    }

    /// Inclusive value range of the integral kinds.
    pub fn integral_range(&self) -> Option<(i128, i128)> {
        match self {
            ScalarKind::Byte => Some((0, u8::MAX as i128)),
            ScalarKind::I16 => Some((i16::MIN as i128, i16::MAX as i128)),
            ScalarKind::U16 => Some((0, u16::MAX as i128)),
            ScalarKind::I32 => Some((i32::MIN as i128, i32::MAX as i128)),
            ScalarKind::U32 => Some((0, u32::MAX as i128)),
            ScalarKind::I64 => Some((i64::MIN as i128, i64::MAX as i128)),
            ScalarKind::U64 => Some((0, u64::MAX as i128)),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Field type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeNode {
    Scalar(ScalarKind),
    Array(Box<TypeNode>),
    Map(Box<TypeNode>, Box<TypeNode>),
    /// Enum, struct, message or union, by name.
    Defined(String),
}

impl TypeNode {
    pub fn scalar(kind: ScalarKind) -> Self {
        TypeNode::Scalar(kind)
    }

    pub fn array(element: TypeNode) -> Self {
        TypeNode::Array(Box::new(element))
    }

    pub fn map(key: TypeNode, value: TypeNode) -> Self {
        TypeNode::Map(Box::new(key), Box::new(value))
    }

    pub fn defined(name: impl Into<String>) -> Self {
        TypeNode::Defined(name.into())
    }

    /// `byte[]`, encoded as a raw blob.
    pub fn is_bytes(&self) -> bool {
        matches!(self, TypeNode::Array(e) if **e == TypeNode::Scalar(ScalarKind::Byte))
    }
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeNode::Scalar(k) => write!(f, "{}", k),
            TypeNode::Array(e) => write!(f, "{}[]", e),
            TypeNode::Map(k, v) => write!(f, "map[{}, {}]", k, v),
            TypeNode::Defined(n) => f.write_str(n),
        }
    }
}

/// `[deprecated("reason")]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Deprecated {
    pub reason: String,
}

/// A struct or message field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: TypeNode,
    /// Tag for message fields, 0 for struct fields.
    pub constant: u8,
    pub deprecated: Option<Deprecated>,
    pub line: usize,
}

impl Field {
    /// Struct field.
    pub fn new(name: impl Into<String>, ty: TypeNode) -> Self {
        Field {
            name: name.into(),
            ty,
            constant: 0,
            deprecated: None,
            line: 0,
        }
    }

    /// Message field with its wire tag.
    pub fn tagged(tag: u8, name: impl Into<String>, ty: TypeNode) -> Self {
        Field {
            constant: tag,
            ..Field::new(name, ty)
        }
    }

    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecated = Some(Deprecated {
            reason: reason.into(),
        });
        self
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecated.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDefinition {
    pub name: String,
    pub fields: Vec<Field>,
    pub mutable: bool,
    pub opcode: Option<u32>,
    pub line: usize,
}

impl StructDefinition {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        StructDefinition {
            name: name.into(),
            fields,
            mutable: false,
            opcode: None,
            line: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageDefinition {
    pub name: String,
    pub fields: Vec<Field>,
    pub opcode: Option<u32>,
    pub line: usize,
}

impl MessageDefinition {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        MessageDefinition {
            name: name.into(),
            fields,
            opcode: None,
            line: 0,
        }
    }

    pub fn field_by_tag(&self, tag: u8) -> Option<&Field> {
        self.fields.iter().find(|f| f.constant == tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionBranch {
    pub discriminator: u8,
    /// Name of the struct, message or union carried by this branch.
    pub definition: String,
}

impl UnionBranch {
    pub fn new(discriminator: u8, definition: impl Into<String>) -> Self {
        UnionBranch {
            discriminator,
            definition: definition.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionDefinition {
    pub name: String,
    pub branches: Vec<UnionBranch>,
    pub opcode: Option<u32>,
    pub line: usize,
}

impl UnionDefinition {
    pub fn new(name: impl Into<String>, branches: Vec<UnionBranch>) -> Self {
        UnionDefinition {
            name: name.into(),
            branches,
            opcode: None,
            line: 0,
        }
    }

    /// Branch lookup by discriminator value, independent of declaration order.
    pub fn branch(&self, discriminator: u8) -> Option<&UnionBranch> {
        self.branches.iter().find(|b| b.discriminator == discriminator)
    }
}

/// The three record shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordDefinition {
    Struct(StructDefinition),
    Message(MessageDefinition),
    Union(UnionDefinition),
}

impl RecordDefinition {
    pub fn name(&self) -> &str {
        match self {
            RecordDefinition::Struct(d) => &d.name,
            RecordDefinition::Message(d) => &d.name,
            RecordDefinition::Union(d) => &d.name,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            RecordDefinition::Struct(_) => "struct",
            RecordDefinition::Message(_) => "message",
            RecordDefinition::Union(_) => "union",
        }
    }

    pub fn opcode(&self) -> Option<u32> {
        match self {
            RecordDefinition::Struct(d) => d.opcode,
            RecordDefinition::Message(d) => d.opcode,
            RecordDefinition::Union(d) => d.opcode,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            RecordDefinition::Struct(d) => d.line,
            RecordDefinition::Message(d) => d.line,
            RecordDefinition::Union(d) => d.line,
        }
    }

    /// Struct or message fields; empty for unions.
    pub fn fields(&self) -> &[Field] {
        match self {
            RecordDefinition::Struct(d) => &d.fields,
            RecordDefinition::Message(d) => &d.fields,
            RecordDefinition::Union(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub name: String,
    pub value: i128,
    pub deprecated: Option<Deprecated>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDefinition {
    pub name: String,
    /// Integral kind the enum is encoded as.
    pub underlying: ScalarKind,
    pub members: Vec<EnumMember>,
    pub flags: bool,
    pub line: usize,
}

impl EnumDefinition {
    pub fn new(name: impl Into<String>, underlying: ScalarKind, members: &[(&str, i128)]) -> Self {
        EnumDefinition {
            name: name.into(),
            underlying,
            members: members
                .iter()
                .map(|(n, v)| EnumMember {
                    name: n.to_string(),
                    value: *v,
                    deprecated: None,
                })
                .collect(),
            flags: false,
            line: 0,
        }
    }

    pub fn member_name(&self, value: i128) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.value == value)
            .map(|m| m.name.as_str())
    }
}

/// Literal in a `const` definition or attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i128),
    Float(f64),
    Bool(bool),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstDefinition {
    pub name: String,
    pub ty: ScalarKind,
    pub value: Literal,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Enum(EnumDefinition),
    Record(RecordDefinition),
    Const(ConstDefinition),
}

impl Definition {
    pub fn name(&self) -> &str {
        match self {
            Definition::Enum(d) => &d.name,
            Definition::Record(r) => r.name(),
            Definition::Const(c) => &c.name,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Definition::Enum(d) => d.line,
            Definition::Record(r) => r.line(),
            Definition::Const(c) => c.line,
        }
    }
}

impl From<RecordDefinition> for Definition {
    fn from(r: RecordDefinition) -> Self {
        Definition::Record(r)
    }
}

impl From<StructDefinition> for Definition {
    fn from(d: StructDefinition) -> Self {
        Definition::Record(RecordDefinition::Struct(d))
    }
}

impl From<MessageDefinition> for Definition {
    fn from(d: MessageDefinition) -> Self {
        Definition::Record(RecordDefinition::Message(d))
    }
}

impl From<UnionDefinition> for Definition {
    fn from(d: UnionDefinition) -> Self {
        Definition::Record(RecordDefinition::Union(d))
    }
}

impl From<EnumDefinition> for Definition {
    fn from(d: EnumDefinition) -> Self {
        Definition::Enum(d)
    }
}

/// Unresolved schema: the definition arena in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub definitions: Vec<Definition>,
}

impl Schema {
    pub fn new(definitions: Vec<Definition>) -> Self {
        Schema { definitions }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate definition name: {0}")]
    DuplicateDefinition(String),
    #[error("{referenced_by}: unresolved type {name}")]
    UnresolvedType { name: String, referenced_by: String },
    #[error("{referenced_by}: {name} is a constant, not a type")]
    NotAType { name: String, referenced_by: String },
    #[error("{referenced_by}: map key type {key} is not a valid key (integral, bool, string, guid, date or enum)")]
    InvalidMapKey { key: String, referenced_by: String },
    #[error("message {message}: field {field} uses reserved tag 0")]
    ReservedTag { message: String, field: String },
    #[error("message {message}: tag {tag} used more than once")]
    DuplicateTag { message: String, tag: u8 },
    #[error("{record}: field {field} declared more than once")]
    DuplicateField { record: String, field: String },
    #[error("struct {record}: field {field} cannot be deprecated (only message fields can)")]
    DeprecatedStructField { record: String, field: String },
    #[error("union {union}: discriminator {discriminator} used more than once")]
    DuplicateDiscriminator { union: String, discriminator: u8 },
    #[error("union {union}: branch {branch} is not a struct, message or union")]
    InvalidUnionBranch { union: String, branch: String },
    #[error("enum {name}: underlying type {kind} is not integral")]
    InvalidEnumType { name: String, kind: ScalarKind },
    #[error("enum {name}: member {member} = {value} does not fit in {kind}")]
    EnumValueOutOfRange { name: String, member: String, value: i128, kind: ScalarKind },
    #[error("enum {name}: member {member} declared more than once")]
    DuplicateEnumMember { name: String, member: String },
    #[error("const {name}: value does not fit type {kind}")]
    InvalidConst { name: String, kind: ScalarKind },
    #[error("struct {0} contains itself by value and can never be encoded")]
    InfiniteStruct(String),
}

impl SchemaError {
    /// Name of the definition the error is about.
    pub fn subject(&self) -> &str {
        match self {
            SchemaError::DuplicateDefinition(name) | SchemaError::InfiniteStruct(name) => name,
            SchemaError::UnresolvedType { referenced_by, .. }
            | SchemaError::NotAType { referenced_by, .. }
            | SchemaError::InvalidMapKey { referenced_by, .. } => referenced_by,
            SchemaError::ReservedTag { message, .. } | SchemaError::DuplicateTag { message, .. } => message,
            SchemaError::DuplicateField { record, .. } | SchemaError::DeprecatedStructField { record, .. } => record,
            SchemaError::DuplicateDiscriminator { union, .. } | SchemaError::InvalidUnionBranch { union, .. } => union,
            SchemaError::InvalidEnumType { name, .. }
            | SchemaError::EnumValueOutOfRange { name, .. }
            | SchemaError::DuplicateEnumMember { name, .. }
            | SchemaError::InvalidConst { name, .. } => name,
        }
    }
}

/// Schema with its name table built and every invariant checked.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    schema: Schema,
    by_name: HashMap<String, usize>,
}

impl ResolvedSchema {
    pub fn resolve(schema: Schema) -> Result<Self, SchemaError> {
        let mut by_name = HashMap::new();
        for (i, d) in schema.definitions.iter().enumerate() {
            if by_name.insert(d.name().to_string(), i).is_some() {
                return Err(SchemaError::DuplicateDefinition(d.name().to_string()));
            }
        }
        let resolved = ResolvedSchema { schema, by_name };
        for d in &resolved.schema.definitions {
            match d {
                Definition::Enum(e) => resolved.check_enum(e)?,
                Definition::Const(c) => check_const(c)?,
                Definition::Record(RecordDefinition::Struct(s)) => {
                    resolved.check_fields(&s.name, &s.fields)?;
                    if let Some(f) = s.fields.iter().find(|f| f.is_deprecated()) {
                        return Err(SchemaError::DeprecatedStructField {
                            record: s.name.clone(),
                            field: f.name.clone(),
                        });
                    }
                }
                Definition::Record(RecordDefinition::Message(m)) => {
                    resolved.check_fields(&m.name, &m.fields)?;
                    let mut tags = HashSet::new();
                    for f in &m.fields {
                        if f.constant == 0 {
                            return Err(SchemaError::ReservedTag {
                                message: m.name.clone(),
                                field: f.name.clone(),
                            });
                        }
                        if !tags.insert(f.constant) {
                            return Err(SchemaError::DuplicateTag {
                                message: m.name.clone(),
                                tag: f.constant,
                            });
                        }
                    }
                }
                Definition::Record(RecordDefinition::Union(u)) => resolved.check_union(u)?,
            }
        }
        resolved.check_struct_cycles()?;
        Ok(resolved)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.schema.definitions
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.by_name.get(name).map(|&i| &self.schema.definitions[i])
    }

    pub fn get_record(&self, name: &str) -> Option<&RecordDefinition> {
        match self.get(name) {
            Some(Definition::Record(r)) => Some(r),
            _ => None,
        }
    }

    pub fn get_enum(&self, name: &str) -> Option<&EnumDefinition> {
        match self.get(name) {
            Some(Definition::Enum(e)) => Some(e),
            _ => None,
        }
    }

    pub fn get_const(&self, name: &str) -> Option<&ConstDefinition> {
        match self.get(name) {
            Some(Definition::Const(c)) => Some(c),
            _ => None,
        }
    }

    fn check_enum(&self, e: &EnumDefinition) -> Result<(), SchemaError> {
        let (min, max) = e.underlying.integral_range().ok_or_else(|| SchemaError::InvalidEnumType {
            name: e.name.clone(),
            kind: e.underlying,
        })?;
        let mut names = HashSet::new();
        for m in &e.members {
            if m.value < min || m.value > max {
                return Err(SchemaError::EnumValueOutOfRange {
                    name: e.name.clone(),
                    member: m.name.clone(),
                    value: m.value,
                    kind: e.underlying,
                });
            }
            if !names.insert(m.name.as_str()) {
                return Err(SchemaError::DuplicateEnumMember {
                    name: e.name.clone(),
                    member: m.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_fields(&self, record: &str, fields: &[Field]) -> Result<(), SchemaError> {
        let mut names = HashSet::new();
        for f in fields {
            if !names.insert(f.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    record: record.to_string(),
                    field: f.name.clone(),
                });
            }
            self.check_type(&f.ty, record)?;
        }
        Ok(())
    }

    fn check_type(&self, ty: &TypeNode, referenced_by: &str) -> Result<(), SchemaError> {
        match ty {
            TypeNode::Scalar(_) => Ok(()),
            TypeNode::Array(e) => self.check_type(e, referenced_by),
            TypeNode::Map(k, v) => {
                let valid_key = match k.as_ref() {
                    TypeNode::Scalar(kind) => !kind.is_float(),
                    TypeNode::Defined(n) => self.get_enum(n).is_some() || self.get(n).is_none(),
                    _ => false,
                };
                if !valid_key {
                    return Err(SchemaError::InvalidMapKey {
                        key: k.to_string(),
                        referenced_by: referenced_by.to_string(),
                    });
                }
                self.check_type(k, referenced_by)?;
                self.check_type(v, referenced_by)
            }
            TypeNode::Defined(name) => match self.get(name) {
                None => Err(SchemaError::UnresolvedType {
                    name: name.clone(),
                    referenced_by: referenced_by.to_string(),
                }),
                Some(Definition::Const(_)) => Err(SchemaError::NotAType {
                    name: name.clone(),
                    referenced_by: referenced_by.to_string(),
                }),
                Some(_) => Ok(()),
            },
        }
    }

    fn check_union(&self, u: &UnionDefinition) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for b in &u.branches {
            if !seen.insert(b.discriminator) {
                return Err(SchemaError::DuplicateDiscriminator {
                    union: u.name.clone(),
                    discriminator: b.discriminator,
                });
            }
            match self.get(&b.definition) {
                Some(Definition::Record(_)) => {}
                None => {
                    return Err(SchemaError::UnresolvedType {
                        name: b.definition.clone(),
                        referenced_by: u.name.clone(),
                    })
                }
                Some(_) => {
                    return Err(SchemaError::InvalidUnionBranch {
                        union: u.name.clone(),
                        branch: b.definition.clone(),
                    })
                }
            }
        }
        Ok(())
    }

    /// A struct field of struct type is stored by value; a cycle along such edges has no
    /// finite value.
    fn check_struct_cycles(&self) -> Result<(), SchemaError> {
        fn visit<'a>(
            schema: &'a ResolvedSchema,
            name: &'a str,
            on_path: &mut Vec<&'a str>,
            done: &mut HashSet<&'a str>,
        ) -> Result<(), SchemaError> {
            if done.contains(name) {
                return Ok(());
            }
            if on_path.contains(&name) {
                return Err(SchemaError::InfiniteStruct(name.to_string()));
            }
            if let Some(RecordDefinition::Struct(s)) = schema.get_record(name) {
                on_path.push(name);
                for f in &s.fields {
                    if let TypeNode::Defined(child) = &f.ty {
                        visit(schema, child, on_path, done)?;
                    }
                }
                on_path.pop();
            }
            done.insert(name);
            Ok(())
        }
        let mut done = HashSet::new();
        for d in &self.schema.definitions {
            if let Definition::Record(RecordDefinition::Struct(s)) = d {
                visit(self, &s.name, &mut Vec::new(), &mut done)?;
            }
        }
        Ok(())
    }

    /// Definitions with dependencies first, for emitters that need forward declarations.
    /// Cycles (legal through messages, unions and containers) are broken at the back edge;
    /// ties keep declaration order.
    pub fn topological_order(&self) -> Vec<&Definition> {
        fn deps<'a>(ty: &'a TypeNode, out: &mut Vec<&'a str>) {
            match ty {
                TypeNode::Scalar(_) => {}
                TypeNode::Array(e) => deps(e, out),
                TypeNode::Map(k, v) => {
                    deps(k, out);
                    deps(v, out);
                }
                TypeNode::Defined(n) => out.push(n),
            }
        }
        fn visit<'a>(
            schema: &'a ResolvedSchema,
            index: usize,
            state: &mut [u8],
            order: &mut Vec<&'a Definition>,
        ) {
            // 0 = unvisited, 1 = in progress, 2 = emitted
            if state[index] != 0 {
                return;
            }
            state[index] = 1;
            let def = &schema.schema.definitions[index];
            let mut names = Vec::new();
            if let Definition::Record(r) = def {
                match r {
                    RecordDefinition::Union(u) => {
                        names.extend(u.branches.iter().map(|b| b.definition.as_str()))
                    }
                    _ => r.fields().iter().for_each(|f| deps(&f.ty, &mut names)),
                }
            }
            for n in names {
                if let Some(&child) = schema.by_name.get(n) {
                    visit(schema, child, state, order);
                }
            }
            state[index] = 2;
            order.push(def);
        }
        let mut state = vec![0u8; self.schema.definitions.len()];
        let mut order = Vec::with_capacity(state.len());
        for i in 0..self.schema.definitions.len() {
            visit(self, i, &mut state, &mut order);
        }
        order
    }

    /// Smallest possible encoding of a value of `ty`.
    pub fn min_encoded_size(&self, ty: &TypeNode) -> usize {
        match ty {
            TypeNode::Scalar(k) => k.fixed_width().unwrap_or(4),
            TypeNode::Array(_) | TypeNode::Map(_, _) => 4,
            TypeNode::Defined(name) => match self.get(name) {
                Some(Definition::Enum(e)) => e.underlying.fixed_width().unwrap_or(0),
                Some(Definition::Record(r)) => self.min_record_size(r),
                _ => 0,
            },
        }
    }

    /// Message: prefix + terminator. Union: prefix + discriminator. Struct: sum of its fields.
    pub fn min_record_size(&self, record: &RecordDefinition) -> usize {
        match record {
            RecordDefinition::Message(_) | RecordDefinition::Union(_) => 5,
            RecordDefinition::Struct(s) => s.fields.iter().map(|f| self.min_encoded_size(&f.ty)).sum(),
        }
    }

    /// Encoded size when every value of `ty` has the same size (fixed scalars, enums, and
    /// structs made only of those).
    pub fn fixed_encoded_size(&self, ty: &TypeNode) -> Option<usize> {
        match ty {
            TypeNode::Scalar(k) => k.fixed_width(),
            TypeNode::Array(_) | TypeNode::Map(_, _) => None,
            TypeNode::Defined(name) => match self.get(name)? {
                Definition::Enum(e) => e.underlying.fixed_width(),
                Definition::Record(RecordDefinition::Struct(s)) => s
                    .fields
                    .iter()
                    .map(|f| self.fixed_encoded_size(&f.ty))
                    .sum(),
                _ => None,
            },
        }
    }
}

fn check_const(c: &ConstDefinition) -> Result<(), SchemaError> {
    let ok = match (&c.value, c.ty) {
        (Literal::Int(v), k) if k.is_integral() => {
            k.integral_range().is_some_and(|(min, max)| *v >= min && *v <= max)
        }
        (Literal::Int(_), k) | (Literal::Float(_), k) => k.is_float(),
        (Literal::Bool(_), ScalarKind::Bool) => true,
        (Literal::String(_), ScalarKind::String) => true,
        (Literal::String(s), ScalarKind::Guid) => s.parse::<crate::guid::Guid>().is_ok(),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(SchemaError::InvalidConst {
            name: c.name.clone(),
            kind: c.ty,
        })
    }
}
