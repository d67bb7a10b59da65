//! Assembles a [`Proto`] from the parse events of a file.

use protolink_parse::ast::{self, Visitor};

use crate::{
    lines::LineResolver,
    model::{
        Enum, EnumId, EnumValue, Extension, ExtensionId, Field, FileId, Import, ImportKind, Label,
        Message, MessageId, Method, Oneof, OptionValue, Options, Parent, Proto, Service,
        ServiceId, Syntax, TagRange, TypeName, MAX_TAG_VALUE,
    },
};

/// Builds the model of one file.
///
/// Names, parents and types are left unset; they are filled in by the registrar and the
/// resolver once the file's imports are available.
pub(crate) fn build_proto(id: FileId, name: &str, source: &str, file: &ast::File) -> Proto {
    let lines = LineResolver::new(name, source);
    let mut builder = Builder {
        file: id,
        lines: &lines,
        stack: DeclarationStack::new(Proto::new(id, name.to_owned())),
    };
    file.walk(&mut builder);
    builder.stack.finish()
}

/// A declaration under construction.
#[derive(Debug)]
enum Declaration {
    Proto(Proto),
    Message(Message),
    Oneof(Oneof, Vec<Field>),
    Enum(Enum),
    Service(Service),
    Method(Method),
    Extension(Extension),
}

/// The declarations enclosing the current parse event, innermost last.
///
/// The file is always at the bottom. Each `enter_*` event pushes, each `exit_*` event pops the
/// matching variant and hands the finished declaration to the one below it.
#[derive(Debug)]
struct DeclarationStack {
    stack: Vec<Declaration>,
}

struct Builder<'a> {
    file: FileId,
    lines: &'a LineResolver<'a>,
    stack: DeclarationStack,
}

macro_rules! pop {
    ($stack:expr, $variant:ident) => {
        match $stack.pop() {
            Some(Declaration::$variant(value)) => value,
            other => unreachable!(
                "expected {} on the declaration stack, found {:?}",
                stringify!($variant),
                other
            ),
        }
    };
}

impl DeclarationStack {
    fn new(proto: Proto) -> Self {
        DeclarationStack {
            stack: vec![Declaration::Proto(proto)],
        }
    }

    fn push(&mut self, declaration: Declaration) {
        self.stack.push(declaration);
    }

    fn pop(&mut self) -> Option<Declaration> {
        if self.stack.len() > 1 {
            self.stack.pop()
        } else {
            None
        }
    }

    fn peek_mut(&mut self) -> &mut Declaration {
        self.stack
            .last_mut()
            .expect("declaration stack always contains the file")
    }

    fn proto_mut(&mut self) -> &mut Proto {
        match &mut self.stack[0] {
            Declaration::Proto(proto) => proto,
            _ => unreachable!("the file is always at the bottom of the declaration stack"),
        }
    }

    fn finish(mut self) -> Proto {
        debug_assert_eq!(self.stack.len(), 1);
        match self.stack.swap_remove(0) {
            Declaration::Proto(proto) => proto,
            _ => unreachable!("the file is always at the bottom of the declaration stack"),
        }
    }

    fn options_mut(&mut self) -> &mut Options {
        match self.peek_mut() {
            Declaration::Proto(proto) => &mut proto.options,
            Declaration::Message(message) => &mut message.options,
            Declaration::Oneof(oneof, _) => &mut oneof.options,
            Declaration::Enum(enu) => &mut enu.options,
            Declaration::Service(service) => &mut service.options,
            Declaration::Method(method) => &mut method.options,
            Declaration::Extension(_) => {
                unreachable!("extend blocks do not declare options")
            }
        }
    }
}

impl<'a> Builder<'a> {
    fn field(&self, field: &ast::Field) -> Field {
        let (type_name, label) = match &field.ty {
            ast::FieldType::Named(name) => (
                TypeName::Named(name.to_string()),
                match &field.label {
                    Some((ast::FieldLabel::Required, _)) => Label::Required,
                    Some((ast::FieldLabel::Repeated, _)) => Label::Repeated,
                    Some((ast::FieldLabel::Optional, _)) | None => Label::Optional,
                },
            ),
            ast::FieldType::Map { key, value, .. } => (
                TypeName::Map {
                    key: key.to_string(),
                    value: value.to_string(),
                },
                Label::Repeated,
            ),
        };

        let type_span = match &field.ty {
            ast::FieldType::Named(name) => name.span(),
            ast::FieldType::Map { span, .. } => span.clone(),
        };

        Field {
            name: field.name.value.clone(),
            type_name,
            ty: None,
            number: int_to_i32(&field.number),
            label,
            oneof: None,
            options: options(&field.options),
            comments: field.comments.clone(),
            location: self.lines.location(&field.span),
            span: field.name.span.clone(),
            type_span,
        }
    }
}

impl<'a> Visitor for Builder<'a> {
    fn enter_file(&mut self, file: &ast::File) {
        let proto = self.stack.proto_mut();
        proto.package = file.package.as_ref().map(|package| package.name.to_string());
        proto.syntax = match file.syntax {
            ast::Syntax::Proto2 => Syntax::Proto2,
            ast::Syntax::Proto3 => Syntax::Proto3,
        };
        proto.imports = file
            .imports
            .iter()
            .map(|import| Import {
                name: import.value.clone(),
                kind: match import.kind {
                    Some(ast::ImportKind::Public) => ImportKind::Public,
                    Some(ast::ImportKind::Weak) => ImportKind::Weak,
                    None => ImportKind::Plain,
                },
                file: None,
                span: import.value_span.clone(),
            })
            .collect();
    }

    fn enter_message(&mut self, message: &ast::Message) {
        let mut extension_ranges = Vec::new();
        for extensions in &message.body.extensions {
            extension_ranges.extend(extensions.ranges.iter().map(range));
        }

        let mut reserved_ranges = Vec::new();
        let mut reserved_names = Vec::new();
        reserved(&message.body.reserved, &mut reserved_ranges, &mut reserved_names);

        self.stack.push(Declaration::Message(Message {
            name: message.name.value.clone(),
            full_name: String::new(),
            file: self.file,
            parent: Parent::File(self.file),
            nested: false,
            fields: Vec::new(),
            oneofs: Vec::new(),
            messages: Vec::new(),
            enums: Vec::new(),
            extensions: Vec::new(),
            extension_ranges,
            reserved_ranges,
            reserved_names,
            options: Options::default(),
            comments: message.comments.clone(),
            location: self.lines.location(&message.span),
            span: message.name.span.clone(),
        }));
    }

    fn exit_message(&mut self, _: &ast::Message) {
        let message = pop!(self.stack, Message);

        let proto = self.stack.proto_mut();
        let id = MessageId::new(self.file, proto.message_arena.len());
        proto.message_arena.push(message);

        match self.stack.peek_mut() {
            Declaration::Proto(proto) => proto.messages.push(id),
            Declaration::Message(parent) => parent.messages.push(id),
            other => unreachable!("message declared inside {:?}", other),
        }
    }

    fn visit_field(&mut self, field: &ast::Field) {
        let field = self.field(field);
        match self.stack.peek_mut() {
            Declaration::Message(message) => message.fields.push(field),
            Declaration::Oneof(_, fields) => fields.push(field),
            Declaration::Extension(extension) => extension.fields.push(field),
            other => unreachable!("field declared inside {:?}", other),
        }
    }

    fn enter_oneof(&mut self, oneof: &ast::Oneof) {
        self.stack.push(Declaration::Oneof(
            Oneof {
                name: oneof.name.value.clone(),
                options: Options::default(),
                comments: oneof.comments.clone(),
                location: self.lines.location(&oneof.span),
            },
            Vec::new(),
        ));
    }

    fn exit_oneof(&mut self, _: &ast::Oneof) {
        let (oneof, fields) = match self.stack.pop() {
            Some(Declaration::Oneof(oneof, fields)) => (oneof, fields),
            other => unreachable!("expected Oneof on the declaration stack, found {:?}", other),
        };

        match self.stack.peek_mut() {
            Declaration::Message(message) => {
                let index = message.oneofs.len();
                message.oneofs.push(oneof);
                message.fields.extend(fields.into_iter().map(|field| Field {
                    oneof: Some(index),
                    ..field
                }));
            }
            other => unreachable!("oneof declared inside {:?}", other),
        }
    }

    fn enter_enum(&mut self, enu: &ast::Enum) {
        let mut reserved_ranges = Vec::new();
        let mut reserved_names = Vec::new();
        reserved(&enu.reserved, &mut reserved_ranges, &mut reserved_names);

        self.stack.push(Declaration::Enum(Enum {
            name: enu.name.value.clone(),
            full_name: String::new(),
            file: self.file,
            parent: Parent::File(self.file),
            nested: false,
            values: Vec::new(),
            reserved_ranges,
            reserved_names,
            options: Options::default(),
            comments: enu.comments.clone(),
            location: self.lines.location(&enu.span),
            span: enu.name.span.clone(),
        }));
    }

    fn visit_enum_value(&mut self, value: &ast::EnumValue) {
        let value = EnumValue {
            name: value.name.value.clone(),
            number: int_to_i32(&value.number),
            options: options(&value.options),
            comments: value.comments.clone(),
            location: self.lines.location(&value.span),
        };
        match self.stack.peek_mut() {
            Declaration::Enum(enu) => enu.values.push(value),
            other => unreachable!("enum value declared inside {:?}", other),
        }
    }

    fn exit_enum(&mut self, _: &ast::Enum) {
        let enu = pop!(self.stack, Enum);

        let proto = self.stack.proto_mut();
        let id = EnumId::new(self.file, proto.enum_arena.len());
        proto.enum_arena.push(enu);

        match self.stack.peek_mut() {
            Declaration::Proto(proto) => proto.enums.push(id),
            Declaration::Message(parent) => parent.enums.push(id),
            other => unreachable!("enum declared inside {:?}", other),
        }
    }

    fn enter_extend(&mut self, extend: &ast::Extend) {
        self.stack.push(Declaration::Extension(Extension {
            extendee_name: extend.extendee.to_string(),
            extendee: None,
            fields: Vec::new(),
            namespace: String::new(),
            file: self.file,
            parent: Parent::File(self.file),
            comments: extend.comments.clone(),
            location: self.lines.location(&extend.span),
            extendee_span: extend.extendee.span(),
        }));
    }

    fn exit_extend(&mut self, _: &ast::Extend) {
        let extension = pop!(self.stack, Extension);

        let proto = self.stack.proto_mut();
        let id = ExtensionId::new(self.file, proto.extension_arena.len());
        proto.extension_arena.push(extension);

        match self.stack.peek_mut() {
            Declaration::Proto(proto) => proto.extensions.push(id),
            Declaration::Message(parent) => parent.extensions.push(id),
            other => unreachable!("extend block declared inside {:?}", other),
        }
    }

    fn enter_service(&mut self, service: &ast::Service) {
        self.stack.push(Declaration::Service(Service {
            name: service.name.value.clone(),
            full_name: String::new(),
            file: self.file,
            methods: Vec::new(),
            options: Options::default(),
            comments: service.comments.clone(),
            location: self.lines.location(&service.span),
            span: service.name.span.clone(),
        }));
    }

    fn exit_service(&mut self, _: &ast::Service) {
        let service = pop!(self.stack, Service);

        let proto = self.stack.proto_mut();
        let id = ServiceId::new(self.file, proto.service_arena.len());
        proto.service_arena.push(service);
        proto.services.push(id);
    }

    fn enter_method(&mut self, method: &ast::Method) {
        self.stack.push(Declaration::Method(Method {
            name: method.name.value.clone(),
            input_type: method.input_ty.to_string(),
            output_type: method.output_ty.to_string(),
            input: None,
            output: None,
            client_streaming: method.client_streaming,
            server_streaming: method.server_streaming,
            options: Options::default(),
            comments: method.comments.clone(),
            location: self.lines.location(&method.span),
            input_span: method.input_ty.span(),
            output_span: method.output_ty.span(),
        }));
    }

    fn exit_method(&mut self, _: &ast::Method) {
        let method = pop!(self.stack, Method);
        match self.stack.peek_mut() {
            Declaration::Service(service) => service.methods.push(method),
            other => unreachable!("method declared inside {:?}", other),
        }
    }

    fn visit_option(&mut self, option: &ast::OptionBody) {
        self.stack
            .options_mut()
            .push(option.name.clone(), option_value(&option.value));
    }
}

fn options(options: &[ast::OptionBody]) -> Options {
    let mut result = Options::default();
    for option in options {
        result.push(option.name.clone(), option_value(&option.value));
    }
    result
}

fn option_value(value: &ast::Constant) -> OptionValue {
    match value {
        ast::Constant::Ident(ident) => match ident.to_string().as_str() {
            "true" => OptionValue::Bool(true),
            "false" => OptionValue::Bool(false),
            name => OptionValue::Identifier(name.to_owned()),
        },
        ast::Constant::Int(int) if int.negative => match i64::try_from(-i128::from(int.value)) {
            Ok(value) => OptionValue::SignedInt(value),
            Err(_) => OptionValue::Float(-(int.value as f64)),
        },
        ast::Constant::Int(int) => OptionValue::UnsignedInt(int.value),
        ast::Constant::Float { value, .. } => OptionValue::Float(*value),
        ast::Constant::String { value, .. } => OptionValue::String(value.clone()),
    }
}

fn reserved(reserved: &[ast::Reserved], ranges: &mut Vec<TagRange>, names: &mut Vec<String>) {
    for reserved in reserved {
        match reserved {
            ast::Reserved::Ranges(list) => ranges.extend(list.iter().map(range)),
            ast::Reserved::Names(list) => {
                names.extend(list.iter().map(|name| name.value.clone()))
            }
        }
    }
}

fn range(range: &ast::Range) -> TagRange {
    let min = int_to_i32(&range.start);
    let max = match &range.end {
        ast::RangeEnd::None => min,
        ast::RangeEnd::Int(end) => int_to_i32(end),
        ast::RangeEnd::Max(_) => MAX_TAG_VALUE,
    };
    TagRange { min, max }
}

/// Field and enum numbers are range-checked by the parser.
fn int_to_i32(int: &ast::Int) -> i32 {
    let value = i64::try_from(int.value).unwrap_or(i64::MAX);
    let value = if int.negative { -value } else { value };
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(source: &str) -> Proto {
        let file = protolink_parse::parse("test.proto", source).unwrap();
        build_proto(FileId::new(0), "test.proto", source, &file)
    }

    #[test]
    fn nested_declarations() {
        let proto = build(
            "package pkg;
            message A {
                message B { int32 x = 1; }
                enum E { ZERO = 0; }
                extend C { optional int32 ext = 100; }
                B b = 1;
            }
            enum Top { X = 0; }
            service S { rpc M (A) returns (A); }",
        );

        assert_eq!(proto.package(), Some("pkg"));
        assert_eq!(proto.messages().len(), 1);
        assert_eq!(proto.enums().len(), 1);
        assert_eq!(proto.services().len(), 1);
        assert!(proto.extensions().is_empty());

        let a = &proto[proto.messages()[0]];
        assert_eq!(a.name, "A");
        assert_eq!(a.messages.len(), 1);
        assert_eq!(a.enums.len(), 1);
        assert_eq!(a.extensions.len(), 1);
        assert_eq!(a.fields[0].type_name, TypeName::Named("B".to_owned()));
        assert_eq!(a.location.line, 2);

        let b = &proto[a.messages[0]];
        assert_eq!(b.name, "B");
        assert_eq!(b.fields[0].number, 1);

        let extension = &proto[a.extensions[0]];
        assert_eq!(extension.extendee_name, "C");
        assert_eq!(extension.fields[0].name, "ext");

        let service = &proto[proto.services()[0]];
        assert_eq!(service.methods[0].input_type, "A");
        assert_eq!(service.methods[0].output_type, "A");
    }

    #[test]
    fn oneof_fields() {
        let proto = build(
            "message M {
                int32 a = 1;
                oneof choice {
                    string b = 2;
                    bytes c = 3;
                }
                int32 d = 4;
            }",
        );

        let message = &proto[proto.messages()[0]];
        assert_eq!(message.oneofs.len(), 1);
        assert_eq!(message.oneofs[0].name, "choice");
        let fields: Vec<_> = message
            .fields
            .iter()
            .map(|field| (field.name.as_str(), field.oneof))
            .collect();
        assert_eq!(
            fields,
            [("a", None), ("b", Some(0)), ("c", Some(0)), ("d", None)]
        );
    }

    #[test]
    fn labels_and_maps() {
        let proto = build(
            "syntax = \"proto3\";
            message M {
                int32 a = 1;
                repeated int32 b = 2;
                map<string, int32> c = 3;
            }",
        );

        assert_eq!(proto.syntax(), Syntax::Proto3);
        let message = &proto[proto.messages()[0]];
        assert_eq!(message.fields[0].label, Label::Optional);
        assert_eq!(message.fields[1].label, Label::Repeated);
        assert_eq!(message.fields[2].label, Label::Repeated);
        assert_eq!(
            message.fields[2].type_name,
            TypeName::Map {
                key: "string".to_owned(),
                value: "int32".to_owned()
            }
        );
    }

    #[test]
    fn ranges_and_options() {
        let proto = build(
            "option java_package = \"com.example\";
            message M {
                option deprecated = true;
                extensions 5, 10 to max;
                reserved 2, 3 to 4;
                reserved \"old\";
                optional int32 a = 1 [default = -5];
            }",
        );

        assert_eq!(
            proto.options().get("java_package"),
            Some(&OptionValue::String("com.example".to_owned()))
        );

        let message = &proto[proto.messages()[0]];
        assert!(message.options.deprecated());
        assert_eq!(
            message.extension_ranges,
            [
                TagRange { min: 5, max: 5 },
                TagRange {
                    min: 10,
                    max: MAX_TAG_VALUE
                }
            ]
        );
        assert_eq!(
            message.reserved_ranges,
            [TagRange { min: 2, max: 2 }, TagRange { min: 3, max: 4 }]
        );
        assert_eq!(message.reserved_names, ["old"]);
        assert_eq!(
            message.fields[0].options.get("default"),
            Some(&OptionValue::SignedInt(-5))
        );
    }

    #[test]
    fn imports() {
        let proto = build(
            "import \"a.proto\";
            import public \"b.proto\";
            import weak \"c.proto\";",
        );

        let imports: Vec<_> = proto
            .imports()
            .iter()
            .map(|import| (import.name.as_str(), import.kind))
            .collect();
        assert_eq!(
            imports,
            [
                ("a.proto", ImportKind::Plain),
                ("b.proto", ImportKind::Public),
                ("c.proto", ImportKind::Weak),
            ]
        );
    }
}
