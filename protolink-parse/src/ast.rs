//! The syntax tree produced by [`parse()`](crate::parse()).
//!
//! Type names are kept exactly as written. Deciding whether a name refers to a scalar, a message
//! or an enum is left to the consumer.

use std::fmt;

use logos::Span;

mod visit;

pub use self::visit::Visitor;

/// A parsed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    /// The declared syntax, defaulting to proto2.
    pub syntax: Syntax,
    /// The span of the `syntax` statement, if present.
    pub syntax_span: Option<Span>,
    /// The `package` statement, if present.
    pub package: Option<Package>,
    /// The `import` statements, in declaration order.
    pub imports: Vec<Import>,
    /// File-level options.
    pub options: Vec<OptionBody>,
    /// Top-level declarations.
    pub items: Vec<FileItem>,
}

/// The syntax version of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Syntax {
    /// `syntax = "proto2";`, or no syntax statement.
    #[default]
    Proto2,
    /// `syntax = "proto3";`
    Proto3,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum FileItem {
    Message(Message),
    Enum(Enum),
    Service(Service),
    Extend(Extend),
}

/// A `package` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Package {
    pub name: FullIdent,
    pub span: Span,
}

/// An `import` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Whether the import is `public` or `weak`.
    pub kind: Option<ImportKind>,
    /// The imported file name.
    pub value: String,
    /// The span of the quoted file name.
    pub value_span: Span,
    /// The span of the whole statement.
    pub span: Span,
}

/// The modifier of an `import` statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ImportKind {
    Public,
    Weak,
}

/// A single identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Ident {
    pub value: String,
    pub span: Span,
}

/// A dot-separated sequence of identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullIdent {
    /// The components, never empty.
    pub parts: Vec<Ident>,
}

/// A possibly fully-qualified type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    /// The span of the leading `.`, if the name is fully-qualified.
    pub leading_dot: Option<Span>,
    /// The name itself.
    pub name: FullIdent,
}

/// An integer literal with an optional sign.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Int {
    pub negative: bool,
    pub value: u64,
    pub span: Span,
}

/// A constant value, as used in options.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Constant {
    Ident(FullIdent),
    Int(Int),
    Float { value: f64, span: Span },
    String { value: String, span: Span },
}

/// An option assignment, either a statement or an entry in a `[...]` list.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionBody {
    /// The option name as written, e.g. `deprecated` or `(my.ext).field`.
    pub name: String,
    /// The span of the option name.
    pub name_span: Span,
    /// The assigned value.
    pub value: Constant,
    /// The span of the whole assignment.
    pub span: Span,
}

/// A `message` declaration.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct Message {
    pub name: Ident,
    pub body: MessageBody,
    pub comments: Option<String>,
    pub span: Span,
}

/// The contents of a message.
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(missing_docs)]
pub struct MessageBody {
    pub items: Vec<MessageItem>,
    pub options: Vec<OptionBody>,
    pub extensions: Vec<ExtensionRanges>,
    pub reserved: Vec<Reserved>,
}

/// A declaration nested inside a message.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum MessageItem {
    Field(Field),
    Oneof(Oneof),
    Message(Message),
    Enum(Enum),
    Extend(Extend),
}

/// The label of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum FieldLabel {
    Optional,
    Required,
    Repeated,
}

/// A field of a message, oneof or extend block.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// The label and its span, if present.
    pub label: Option<(FieldLabel, Span)>,
    /// The declared type.
    pub ty: FieldType,
    /// The field name.
    pub name: Ident,
    /// The field number.
    pub number: Int,
    /// Options in the trailing `[...]` list.
    pub options: Vec<OptionBody>,
    /// Comments directly preceding the field.
    pub comments: Option<String>,
    /// The span of the whole field.
    pub span: Span,
}

/// The declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum FieldType {
    Named(TypeName),
    Map {
        key: TypeName,
        value: TypeName,
        span: Span,
    },
}

/// A `oneof` declaration.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct Oneof {
    pub name: Ident,
    pub fields: Vec<Field>,
    pub options: Vec<OptionBody>,
    pub comments: Option<String>,
    pub span: Span,
}

/// An `extend` block.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct Extend {
    pub extendee: TypeName,
    pub fields: Vec<Field>,
    pub comments: Option<String>,
    pub span: Span,
}

/// An `extensions` statement.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct ExtensionRanges {
    pub ranges: Vec<Range>,
    pub options: Vec<OptionBody>,
    pub span: Span,
}

/// A `reserved` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Reserved {
    Ranges(Vec<Range>),
    Names(Vec<Ident>),
}

/// A number range in an `extensions` or `reserved` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Range {
    pub start: Int,
    pub end: RangeEnd,
}

/// The upper bound of a [`Range`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeEnd {
    /// A single number, e.g. `extensions 5;`
    None,
    /// An explicit upper bound, e.g. `extensions 5 to 10;`
    Int(Int),
    /// `extensions 5 to max;`
    Max(Span),
}

/// An `enum` declaration.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct Enum {
    pub name: Ident,
    pub values: Vec<EnumValue>,
    pub options: Vec<OptionBody>,
    pub reserved: Vec<Reserved>,
    pub comments: Option<String>,
    pub span: Span,
}

/// A constant of an enum.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct EnumValue {
    pub name: Ident,
    pub number: Int,
    pub options: Vec<OptionBody>,
    pub comments: Option<String>,
    pub span: Span,
}

/// A `service` declaration.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct Service {
    pub name: Ident,
    pub methods: Vec<Method>,
    pub options: Vec<OptionBody>,
    pub comments: Option<String>,
    pub span: Span,
}

/// An `rpc` declaration.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct Method {
    pub name: Ident,
    pub input_ty: TypeName,
    pub output_ty: TypeName,
    pub client_streaming: bool,
    pub server_streaming: bool,
    pub options: Vec<OptionBody>,
    pub comments: Option<String>,
    pub span: Span,
}

impl FullIdent {
    /// The span covering every component.
    pub fn span(&self) -> Span {
        let first = &self.parts[0].span;
        let last = &self.parts[self.parts.len() - 1].span;
        first.start..last.end
    }
}

impl From<Vec<Ident>> for FullIdent {
    fn from(parts: Vec<Ident>) -> Self {
        debug_assert!(!parts.is_empty());
        FullIdent { parts }
    }
}

impl TypeName {
    /// The span of the name, including any leading dot.
    pub fn span(&self) -> Span {
        match &self.leading_dot {
            Some(dot) => dot.start..self.name.span().end,
            None => self.name.span(),
        }
    }
}

impl Field {
    /// Whether this field is declared with the `map<K, V>` syntax.
    pub fn is_map(&self) -> bool {
        matches!(self.ty, FieldType::Map { .. })
    }
}

impl fmt::Display for FullIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, part) in self.parts.iter().enumerate() {
            if index != 0 {
                f.write_str(".")?;
            }
            f.write_str(&part.value)?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.leading_dot.is_some() {
            f.write_str(".")?;
        }
        self.name.fmt(f)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Named(name) => name.fmt(f),
            FieldType::Map { key, value, .. } => write!(f, "map<{}, {}>", key, value),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Ident(ident) => ident.fmt(f),
            Constant::Int(int) => {
                if int.negative {
                    f.write_str("-")?;
                }
                write!(f, "{}", int.value)
            }
            Constant::Float { value, .. } => {
                if value.fract() == 0.0 {
                    write!(f, "{:.1}", value)
                } else {
                    write!(f, "{}", value)
                }
            }
            Constant::String { value, .. } => write!(f, "{:?}", value),
        }
    }
}
