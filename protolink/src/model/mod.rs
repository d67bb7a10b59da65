//! The resolved semantic model of a set of protobuf files.
//!
//! Declarations refer to each other through typed ids. Use the [`Index`](std::ops::Index) impls
//! on [`Module`](crate::Module) to follow them, or on [`Proto`] for declarations of a single file.

mod ids;
mod ty;

use std::{fmt, ops::Index};

use protolink_parse::Span;

pub use self::{
    ids::{EnumId, ExtensionId, FileId, MessageId, ServiceId},
    ty::{MapType, ScalarType, Type, UserType},
};

/// The largest valid field number, also written as `max` in ranges.
pub const MAX_TAG_VALUE: i32 = protolink_parse::MAX_MESSAGE_FIELD_NUMBER;

/// A single source file and everything declared in it.
#[derive(Debug, Clone)]
pub struct Proto {
    pub(crate) id: FileId,
    pub(crate) file_name: String,
    pub(crate) package: Option<String>,
    pub(crate) syntax: Syntax,
    pub(crate) imports: Vec<Import>,
    pub(crate) options: Options,
    pub(crate) messages: Vec<MessageId>,
    pub(crate) enums: Vec<EnumId>,
    pub(crate) services: Vec<ServiceId>,
    pub(crate) extensions: Vec<ExtensionId>,
    pub(crate) message_arena: Vec<Message>,
    pub(crate) enum_arena: Vec<Enum>,
    pub(crate) service_arena: Vec<Service>,
    pub(crate) extension_arena: Vec<Extension>,
}

/// The syntax version declared by a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum Syntax {
    #[default]
    Proto2,
    Proto3,
}

/// An `import` statement, linked to the imported file once it has been loaded.
#[derive(Debug, Clone)]
pub struct Import {
    /// The imported file name, as written.
    pub name: String,
    /// The visibility of the import.
    pub kind: ImportKind,
    /// The imported file.
    pub file: Option<FileId>,
    pub(crate) span: Span,
}

/// The visibility modifier of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// A plain import, visible to the importing file only.
    Plain,
    /// `import public`, re-exported to every file importing the importer.
    Public,
    /// `import weak`, treated like a plain import.
    Weak,
}

/// Which declaration contains a message, enum or extend block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Parent {
    File(FileId),
    Message(MessageId),
}

/// A `message` declaration.
#[derive(Debug, Clone)]
pub struct Message {
    /// The short name.
    pub name: String,
    /// The fully-qualified name, starting with `.`.
    pub full_name: String,
    /// The declaring file.
    pub file: FileId,
    /// The enclosing file or message.
    pub parent: Parent,
    /// Whether this message is declared inside another message.
    pub nested: bool,
    /// All fields in declaration order, including oneof members.
    pub fields: Vec<Field>,
    /// The oneofs, referenced by [`Field::oneof`].
    pub oneofs: Vec<Oneof>,
    /// Nested messages.
    pub messages: Vec<MessageId>,
    /// Nested enums.
    pub enums: Vec<EnumId>,
    /// `extend` blocks declared inside this message.
    pub extensions: Vec<ExtensionId>,
    /// Field numbers reserved for extensions.
    pub extension_ranges: Vec<TagRange>,
    /// Field numbers that may not be used.
    pub reserved_ranges: Vec<TagRange>,
    /// Field names that may not be used.
    pub reserved_names: Vec<String>,
    #[allow(missing_docs)]
    pub options: Options,
    #[allow(missing_docs)]
    pub comments: Option<String>,
    #[allow(missing_docs)]
    pub location: Location,
    pub(crate) span: Span,
}

/// A field of a message or an extension.
#[derive(Debug, Clone)]
pub struct Field {
    #[allow(missing_docs)]
    pub name: String,
    /// The type as written in the source file.
    pub type_name: TypeName,
    /// The resolved type. Always set for files in a [`Module`](crate::Module).
    pub ty: Option<Type>,
    #[allow(missing_docs)]
    pub number: i32,
    #[allow(missing_docs)]
    pub label: Label,
    /// The index into [`Message::oneofs`] if this field belongs to a oneof.
    pub oneof: Option<usize>,
    #[allow(missing_docs)]
    pub options: Options,
    #[allow(missing_docs)]
    pub comments: Option<String>,
    #[allow(missing_docs)]
    pub location: Location,
    pub(crate) span: Span,
    pub(crate) type_span: Span,
}

/// The type of a field before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TypeName {
    Named(String),
    Map { key: String, value: String },
}

/// The cardinality of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Label {
    Optional,
    Required,
    Repeated,
}

/// A `oneof` declaration.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct Oneof {
    pub name: String,
    pub options: Options,
    pub comments: Option<String>,
    pub location: Location,
}

/// An `enum` declaration.
#[derive(Debug, Clone)]
pub struct Enum {
    /// The short name.
    pub name: String,
    /// The fully-qualified name, starting with `.`.
    pub full_name: String,
    /// The declaring file.
    pub file: FileId,
    /// The enclosing file or message.
    pub parent: Parent,
    /// Whether this enum is declared inside a message.
    pub nested: bool,
    #[allow(missing_docs)]
    pub values: Vec<EnumValue>,
    /// Reserved numbers.
    pub reserved_ranges: Vec<TagRange>,
    /// Reserved value names.
    pub reserved_names: Vec<String>,
    #[allow(missing_docs)]
    pub options: Options,
    #[allow(missing_docs)]
    pub comments: Option<String>,
    #[allow(missing_docs)]
    pub location: Location,
    pub(crate) span: Span,
}

/// A constant of an enum.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct EnumValue {
    pub name: String,
    pub number: i32,
    pub options: Options,
    pub comments: Option<String>,
    pub location: Location,
}

/// A `service` declaration.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct Service {
    pub name: String,
    /// The fully-qualified name, starting with `.`.
    pub full_name: String,
    pub file: FileId,
    pub methods: Vec<Method>,
    pub options: Options,
    pub comments: Option<String>,
    pub location: Location,
    pub(crate) span: Span,
}

/// An `rpc` declaration.
#[derive(Debug, Clone)]
pub struct Method {
    #[allow(missing_docs)]
    pub name: String,
    /// The request type as written.
    pub input_type: String,
    /// The response type as written.
    pub output_type: String,
    /// The resolved request message.
    pub input: Option<MessageId>,
    /// The resolved response message.
    pub output: Option<MessageId>,
    #[allow(missing_docs)]
    pub client_streaming: bool,
    #[allow(missing_docs)]
    pub server_streaming: bool,
    #[allow(missing_docs)]
    pub options: Options,
    #[allow(missing_docs)]
    pub comments: Option<String>,
    #[allow(missing_docs)]
    pub location: Location,
    pub(crate) input_span: Span,
    pub(crate) output_span: Span,
}

/// An `extend` block, adding fields to a message that may live in another file.
#[derive(Debug, Clone)]
pub struct Extension {
    /// The extended message as written.
    pub extendee_name: String,
    /// The resolved extended message.
    pub extendee: Option<MessageId>,
    /// The extension fields.
    pub fields: Vec<Field>,
    /// The namespace of the declaring file or message, ending with `.`.
    pub namespace: String,
    /// The declaring file.
    pub file: FileId,
    /// The enclosing file or message.
    pub parent: Parent,
    #[allow(missing_docs)]
    pub comments: Option<String>,
    #[allow(missing_docs)]
    pub location: Location,
    pub(crate) extendee_span: Span,
}

/// An inclusive range of field numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct TagRange {
    pub min: i32,
    pub max: i32,
}

/// Options as written on a declaration, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    entries: Vec<(String, OptionValue)>,
}

/// The value assigned to an option.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum OptionValue {
    Bool(bool),
    Identifier(String),
    SignedInt(i64),
    UnsignedInt(u64),
    Float(f64),
    String(String),
}

/// Where a declaration appears in its source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    /// The file name, as imported.
    pub file: String,
    /// The 1-based line number.
    pub line: usize,
}

impl Proto {
    pub(crate) fn new(id: FileId, file_name: String) -> Self {
        Proto {
            id,
            file_name,
            package: None,
            syntax: Syntax::default(),
            imports: Vec::new(),
            options: Options::default(),
            messages: Vec::new(),
            enums: Vec::new(),
            services: Vec::new(),
            extensions: Vec::new(),
            message_arena: Vec::new(),
            enum_arena: Vec::new(),
            service_arena: Vec::new(),
            extension_arena: Vec::new(),
        }
    }

    /// The id of this file.
    pub fn id(&self) -> FileId {
        self.id
    }

    /// The file name, as used in import statements.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The file name without directories or extension, e.g. `bar` for `foo/bar.proto`.
    pub fn name(&self) -> &str {
        let base = match self.file_name.rfind('/') {
            Some(index) => &self.file_name[index + 1..],
            None => &self.file_name,
        };
        match base.rfind('.') {
            Some(index) if index > 0 => &base[..index],
            _ => base,
        }
    }

    /// The declared package, if any.
    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    #[allow(missing_docs)]
    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    /// The import statements, in declaration order.
    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// File-level options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Top-level messages.
    pub fn messages(&self) -> &[MessageId] {
        &self.messages
    }

    /// Top-level enums.
    pub fn enums(&self) -> &[EnumId] {
        &self.enums
    }

    #[allow(missing_docs)]
    pub fn services(&self) -> &[ServiceId] {
        &self.services
    }

    /// Top-level `extend` blocks.
    pub fn extensions(&self) -> &[ExtensionId] {
        &self.extensions
    }

    /// Every message in this file, at any nesting depth.
    pub fn all_messages(&self) -> impl Iterator<Item = (MessageId, &Message)> + '_ {
        let file = self.id;
        self.message_arena
            .iter()
            .enumerate()
            .map(move |(index, message)| (MessageId::new(file, index), message))
    }

    /// Every enum in this file, at any nesting depth.
    pub fn all_enums(&self) -> impl Iterator<Item = (EnumId, &Enum)> + '_ {
        let file = self.id;
        self.enum_arena
            .iter()
            .enumerate()
            .map(move |(index, enu)| (EnumId::new(file, index), enu))
    }

    /// Every `extend` block in this file, at any nesting depth.
    pub fn all_extensions(&self) -> impl Iterator<Item = (ExtensionId, &Extension)> + '_ {
        let file = self.id;
        self.extension_arena
            .iter()
            .enumerate()
            .map(move |(index, extension)| (ExtensionId::new(file, index), extension))
    }

    /// The namespace of top-level declarations, e.g. `.foo.bar.` or `.`.
    pub(crate) fn namespace(&self) -> String {
        match &self.package {
            Some(package) => format!(".{}.", package),
            None => ".".to_owned(),
        }
    }
}

impl Message {
    /// Finds a field by number.
    pub fn get_field(&self, number: i32) -> Option<&Field> {
        self.fields.iter().find(|field| field.number == number)
    }

    /// Finds a field by name.
    pub fn get_field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Whether `number` lies in one of the extension ranges of this message.
    pub fn is_extension_number(&self, number: i32) -> bool {
        self.extension_ranges
            .iter()
            .any(|range| range.contains(number))
    }
}

impl Extension {
    /// The fully-qualified name of one of the fields of this extension.
    pub fn field_full_name(&self, field: &Field) -> String {
        format!("{}{}", self.namespace, field.name)
    }
}

impl ImportKind {
    /// Whether the import is re-exported to files importing the importer.
    pub fn is_public(self) -> bool {
        self == ImportKind::Public
    }
}

impl TagRange {
    /// Whether `number` lies within this range.
    pub fn contains(&self, number: i32) -> bool {
        self.min <= number && number <= self.max
    }
}

impl fmt::Display for TagRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else if self.max == MAX_TAG_VALUE {
            write!(f, "{} to max", self.min)
        } else {
            write!(f, "{} to {}", self.min, self.max)
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Named(name) => f.write_str(name),
            TypeName::Map { key, value } => write!(f, "map<{}, {}>", key, value),
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Syntax::Proto2 => f.write_str("proto2"),
            Syntax::Proto3 => f.write_str("proto3"),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

impl Options {
    pub(crate) fn push(&mut self, name: String, value: OptionValue) {
        self.entries.push((name, value));
    }

    /// Returns the last value assigned to the option `name`.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Iterates over every option in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the standard `deprecated` option is set to `true`.
    pub fn deprecated(&self) -> bool {
        matches!(self.get("deprecated"), Some(OptionValue::Bool(true)))
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(value) => write!(f, "{}", value),
            OptionValue::Identifier(value) => f.write_str(value),
            OptionValue::SignedInt(value) => write!(f, "{}", value),
            OptionValue::UnsignedInt(value) => write!(f, "{}", value),
            OptionValue::Float(value) => write!(f, "{}", value),
            OptionValue::String(value) => write!(f, "{:?}", value),
        }
    }
}

impl Index<MessageId> for Proto {
    type Output = Message;

    fn index(&self, id: MessageId) -> &Message {
        debug_assert_eq!(id.file, self.id);
        &self.message_arena[id.index()]
    }
}

impl Index<EnumId> for Proto {
    type Output = Enum;

    fn index(&self, id: EnumId) -> &Enum {
        debug_assert_eq!(id.file, self.id);
        &self.enum_arena[id.index()]
    }
}

impl Index<ServiceId> for Proto {
    type Output = Service;

    fn index(&self, id: ServiceId) -> &Service {
        debug_assert_eq!(id.file, self.id);
        &self.service_arena[id.index()]
    }
}

impl Index<ExtensionId> for Proto {
    type Output = Extension;

    fn index(&self, id: ExtensionId) -> &Extension {
        debug_assert_eq!(id.file, self.id);
        &self.extension_arena[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name() {
        let proto = |name: &str| Proto::new(FileId::new(0), name.to_owned());
        assert_eq!(proto("foo.proto").name(), "foo");
        assert_eq!(proto("a/b/foo_bar.proto").name(), "foo_bar");
        assert_eq!(proto("noext").name(), "noext");
        assert_eq!(proto("dir/.hidden").name(), ".hidden");
    }

    #[test]
    fn tag_range_display() {
        assert_eq!(TagRange { min: 5, max: 5 }.to_string(), "5");
        assert_eq!(TagRange { min: 1, max: 9 }.to_string(), "1 to 9");
        assert_eq!(
            TagRange {
                min: 10,
                max: MAX_TAG_VALUE
            }
            .to_string(),
            "10 to max"
        );
    }

    #[test]
    fn options_last_value_wins() {
        let mut options = Options::default();
        assert!(!options.deprecated());
        options.push("deprecated".to_owned(), OptionValue::Bool(false));
        options.push("deprecated".to_owned(), OptionValue::Bool(true));
        assert!(options.deprecated());
        assert_eq!(options.iter().count(), 2);
    }
}
