//! Links the type names written in a file to the declarations they refer to.

use protolink_parse::Span;

use crate::{
    context::ProtoContext,
    error::CheckError,
    model::{ExtensionId, Field, MapType, MessageId, ScalarType, Type, TypeName, UserType},
};

/// What a type name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolved {
    Scalar(ScalarType),
    User(UserType),
}

/// The namespaces searched for unqualified names, outermost first.
///
/// A file in package `a.b` starts with `.`, `.a.` and `.a.b.`. Each enclosing message pushes its
/// own namespace while its body is resolved.
#[derive(Debug, Clone)]
pub(crate) struct Scopes {
    namespaces: Vec<String>,
}

impl Scopes {
    pub fn new(package: Option<&str>) -> Self {
        let mut namespaces = vec![".".to_owned()];
        if let Some(package) = package {
            let mut namespace = ".".to_owned();
            for part in package.split('.') {
                namespace.push_str(part);
                namespace.push('.');
                namespaces.push(namespace.clone());
            }
        }
        Scopes { namespaces }
    }

    pub fn push(&mut self, full_name: &str) {
        self.namespaces.push(format!("{}.", full_name));
    }

    pub fn pop(&mut self) {
        debug_assert!(self.namespaces.len() > 1);
        self.namespaces.pop();
    }

    /// Innermost first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().rev().map(String::as_str)
    }
}

/// Looks up `name` as written inside the innermost of `scopes`.
///
/// Scalar names always win. A name starting with `.` is looked up as is, otherwise each scope
/// is tried in turn and the first match is returned.
pub(crate) fn lookup(
    ctx: &ProtoContext,
    loaded: &[ProtoContext],
    scopes: &Scopes,
    name: &str,
) -> Option<Resolved> {
    if let Some(scalar) = ScalarType::from_name(name) {
        return Some(Resolved::Scalar(scalar));
    }

    if name.starts_with('.') {
        return ctx.resolve(loaded, name).map(Resolved::User);
    }

    scopes.iter().find_map(|scope| {
        ctx.resolve(loaded, &format!("{}{}", scope, name))
            .map(Resolved::User)
    })
}

/// Resolves every type reference in the file: service methods first, then the fields and
/// extend blocks of each message depth-first, then top-level extend blocks.
pub(crate) fn resolve_types(
    ctx: &mut ProtoContext,
    loaded: &[ProtoContext],
) -> Result<(), CheckError> {
    let mut scopes = Scopes::new(ctx.proto.package());

    resolve_services(ctx, loaded, &scopes)?;

    for id in ctx.proto.messages.clone() {
        resolve_message(ctx, loaded, &mut scopes, id)?;
    }

    for id in ctx.proto.extensions.clone() {
        resolve_extension(ctx, loaded, &scopes, id)?;
    }

    Ok(())
}

fn resolve_services(
    ctx: &mut ProtoContext,
    loaded: &[ProtoContext],
    scopes: &Scopes,
) -> Result<(), CheckError> {
    for service in ctx.proto.services.clone() {
        for index in 0..ctx.proto[service].methods.len() {
            let method = &ctx.proto[service].methods[index];
            let input = resolve_method_type(
                ctx,
                loaded,
                scopes,
                "input",
                &method.input_type,
                &method.input_span,
            )?;
            let output = resolve_method_type(
                ctx,
                loaded,
                scopes,
                "output",
                &method.output_type,
                &method.output_span,
            )?;

            let method = &mut ctx.proto.service_arena[service.index()].methods[index];
            method.input = Some(input);
            method.output = Some(output);
        }
    }

    Ok(())
}

fn resolve_method_type(
    ctx: &ProtoContext,
    loaded: &[ProtoContext],
    scopes: &Scopes,
    kind: &'static str,
    name: &str,
    span: &Span,
) -> Result<MessageId, CheckError> {
    match lookup(ctx, loaded, scopes, name) {
        Some(Resolved::User(UserType::Message(id))) => Ok(id),
        Some(_) => Err(CheckError::InvalidMethodType {
            kind,
            name: name.to_owned(),
            span: Some(span.clone().into()),
        }),
        None => Err(CheckError::TypeNotFound {
            name: name.to_owned(),
            span: Some(span.clone().into()),
        }),
    }
}

fn resolve_message(
    ctx: &mut ProtoContext,
    loaded: &[ProtoContext],
    scopes: &mut Scopes,
    id: MessageId,
) -> Result<(), CheckError> {
    scopes.push(&ctx.proto[id].full_name);

    for index in 0..ctx.proto[id].fields.len() {
        let ty = resolve_field_type(ctx, loaded, scopes, &ctx.proto[id].fields[index])?;
        ctx.proto.message_arena[id.index()].fields[index].ty = Some(ty);
    }

    for extension in ctx.proto[id].extensions.clone() {
        resolve_extension(ctx, loaded, scopes, extension)?;
    }

    for nested in ctx.proto[id].messages.clone() {
        resolve_message(ctx, loaded, scopes, nested)?;
    }

    scopes.pop();
    Ok(())
}

fn resolve_extension(
    ctx: &mut ProtoContext,
    loaded: &[ProtoContext],
    scopes: &Scopes,
    id: ExtensionId,
) -> Result<(), CheckError> {
    let extension = &ctx.proto[id];
    let extendee = match lookup(ctx, loaded, scopes, &extension.extendee_name) {
        Some(Resolved::User(UserType::Message(message))) => message,
        Some(_) => {
            return Err(CheckError::InvalidExtendee {
                name: extension.extendee_name.clone(),
                span: Some(extension.extendee_span.clone().into()),
            })
        }
        None => {
            return Err(CheckError::TypeNotFound {
                name: extension.extendee_name.clone(),
                span: Some(extension.extendee_span.clone().into()),
            })
        }
    };
    ctx.proto.extension_arena[id.index()].extendee = Some(extendee);

    for index in 0..ctx.proto[id].fields.len() {
        let ty = resolve_field_type(ctx, loaded, scopes, &ctx.proto[id].fields[index])?;
        ctx.proto.extension_arena[id.index()].fields[index].ty = Some(ty);
    }

    Ok(())
}

fn resolve_field_type(
    ctx: &ProtoContext,
    loaded: &[ProtoContext],
    scopes: &Scopes,
    field: &Field,
) -> Result<Type, CheckError> {
    match &field.type_name {
        TypeName::Named(name) => resolve_value_type(ctx, loaded, scopes, name, &field.type_span),
        TypeName::Map { key, value } => {
            let key = match ScalarType::from_name(key) {
                Some(scalar) if scalar.is_valid_map_key() => scalar,
                _ => {
                    return Err(CheckError::InvalidMapKeyType {
                        name: key.clone(),
                        span: Some(field.type_span.clone().into()),
                    })
                }
            };
            let value = resolve_value_type(ctx, loaded, scopes, value, &field.type_span)?;
            Ok(Type::Map(Box::new(MapType { key, value })))
        }
    }
}

fn resolve_value_type(
    ctx: &ProtoContext,
    loaded: &[ProtoContext],
    scopes: &Scopes,
    name: &str,
    span: &Span,
) -> Result<Type, CheckError> {
    match lookup(ctx, loaded, scopes, name) {
        Some(Resolved::Scalar(scalar)) => Ok(Type::Scalar(scalar)),
        Some(Resolved::User(UserType::Message(id))) => Ok(Type::Message(id)),
        Some(Resolved::User(UserType::Enum(id))) => Ok(Type::Enum(id)),
        Some(Resolved::User(UserType::Service(_))) => Err(CheckError::InvalidFieldType {
            name: name.to_owned(),
            span: Some(span.clone().into()),
        }),
        None => Err(CheckError::TypeNotFound {
            name: name.to_owned(),
            span: Some(span.clone().into()),
        }),
    }
}
