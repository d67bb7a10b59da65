use crate::ast;

/// Receives enter/exit events while walking a [`File`](ast::File).
///
/// Events arrive in source order. Every `enter_*` call is matched by the corresponding `exit_*`
/// call once all nested declarations have been visited. Options are reported through
/// [`visit_option`](Visitor::visit_option) immediately after the `enter_*` event of the
/// declaration they belong to, except for field and enum value options, which stay attached to
/// their declaration.
#[allow(unused_variables)]
pub trait Visitor {
    /// Called before anything else in the file.
    fn enter_file(&mut self, file: &ast::File) {}
    /// Called after every declaration of the file.
    fn exit_file(&mut self, file: &ast::File) {}

    /// Called when entering a message.
    fn enter_message(&mut self, message: &ast::Message) {}
    /// Called after the fields and nested declarations of a message.
    fn exit_message(&mut self, message: &ast::Message) {}

    /// Called for each field of a message, oneof or extend block.
    fn visit_field(&mut self, field: &ast::Field) {}

    /// Called when entering a oneof.
    fn enter_oneof(&mut self, oneof: &ast::Oneof) {}
    /// Called after the fields of a oneof.
    fn exit_oneof(&mut self, oneof: &ast::Oneof) {}

    /// Called when entering an enum.
    fn enter_enum(&mut self, enu: &ast::Enum) {}
    /// Called after the values of an enum.
    fn exit_enum(&mut self, enu: &ast::Enum) {}

    /// Called for each value of an enum.
    fn visit_enum_value(&mut self, value: &ast::EnumValue) {}

    /// Called when entering an extend block.
    fn enter_extend(&mut self, extend: &ast::Extend) {}
    /// Called after the fields of an extend block.
    fn exit_extend(&mut self, extend: &ast::Extend) {}

    /// Called when entering a service.
    fn enter_service(&mut self, service: &ast::Service) {}
    /// Called after the methods of a service.
    fn exit_service(&mut self, service: &ast::Service) {}

    /// Called when entering an rpc method.
    fn enter_method(&mut self, method: &ast::Method) {}
    /// Called after the options of an rpc method.
    fn exit_method(&mut self, method: &ast::Method) {}

    /// Called for each option statement.
    fn visit_option(&mut self, option: &ast::OptionBody) {}
}

impl ast::File {
    /// Walks this file, reporting each declaration to `visitor`.
    pub fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        visitor.enter_file(self);
        for option in &self.options {
            visitor.visit_option(option);
        }
        for item in &self.items {
            match item {
                ast::FileItem::Message(message) => message.walk(visitor),
                ast::FileItem::Enum(enu) => enu.walk(visitor),
                ast::FileItem::Service(service) => service.walk(visitor),
                ast::FileItem::Extend(extend) => extend.walk(visitor),
            }
        }
        visitor.exit_file(self);
    }
}

impl ast::Message {
    fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        visitor.enter_message(self);
        for option in &self.body.options {
            visitor.visit_option(option);
        }
        for item in &self.body.items {
            match item {
                ast::MessageItem::Field(field) => visitor.visit_field(field),
                ast::MessageItem::Oneof(oneof) => oneof.walk(visitor),
                ast::MessageItem::Message(message) => message.walk(visitor),
                ast::MessageItem::Enum(enu) => enu.walk(visitor),
                ast::MessageItem::Extend(extend) => extend.walk(visitor),
            }
        }
        visitor.exit_message(self);
    }
}

impl ast::Oneof {
    fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        visitor.enter_oneof(self);
        for option in &self.options {
            visitor.visit_option(option);
        }
        for field in &self.fields {
            visitor.visit_field(field);
        }
        visitor.exit_oneof(self);
    }
}

impl ast::Enum {
    fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        visitor.enter_enum(self);
        for option in &self.options {
            visitor.visit_option(option);
        }
        for value in &self.values {
            visitor.visit_enum_value(value);
        }
        visitor.exit_enum(self);
    }
}

impl ast::Extend {
    fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        visitor.enter_extend(self);
        for field in &self.fields {
            visitor.visit_field(field);
        }
        visitor.exit_extend(self);
    }
}

impl ast::Service {
    fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        visitor.enter_service(self);
        for option in &self.options {
            visitor.visit_option(option);
        }
        for method in &self.methods {
            visitor.enter_method(method);
            for option in &method.options {
                visitor.visit_option(option);
            }
            visitor.exit_method(method);
        }
        visitor.exit_service(self);
    }
}
