use crate::{
    context::ProtoContext,
    error::CheckError,
    model::{EnumId, MessageId, Parent, ServiceId, UserType},
};

/// Assigns fully-qualified names to the messages, enums and services of a file and registers
/// them in its symbol table.
///
/// Top-level declarations are registered before any nested one.
pub(crate) fn register_types(
    ctx: &mut ProtoContext,
    loaded: &[ProtoContext],
    strict: bool,
) -> Result<(), CheckError> {
    let file = ctx.proto.id;
    let namespace = ctx.proto.namespace();

    let messages = ctx.proto.messages.clone();
    let enums = ctx.proto.enums.clone();
    let services = ctx.proto.services.clone();

    for &id in &messages {
        let full_name = format!("{}{}", namespace, ctx.proto[id].name);
        register_message(ctx, loaded, id, full_name, Parent::File(file), strict)?;
    }
    for &id in &enums {
        let full_name = format!("{}{}", namespace, ctx.proto[id].name);
        register_enum(ctx, loaded, id, full_name, Parent::File(file), strict)?;
    }
    for &id in &services {
        let full_name = format!("{}{}", namespace, ctx.proto[id].name);
        register_service(ctx, loaded, id, full_name, strict)?;
    }

    for &id in &messages {
        register_nested(ctx, loaded, id, strict)?;
    }

    Ok(())
}

fn register_nested(
    ctx: &mut ProtoContext,
    loaded: &[ProtoContext],
    parent: MessageId,
    strict: bool,
) -> Result<(), CheckError> {
    let message = &ctx.proto[parent];
    let namespace = format!("{}.", message.full_name);
    let messages = message.messages.clone();
    let enums = message.enums.clone();
    let extensions = message.extensions.clone();

    for id in extensions {
        ctx.proto.extension_arena[id.index()].parent = Parent::Message(parent);
    }

    for &id in &enums {
        let full_name = format!("{}{}", namespace, ctx.proto[id].name);
        register_enum(ctx, loaded, id, full_name, Parent::Message(parent), strict)?;
    }
    for &id in &messages {
        let full_name = format!("{}{}", namespace, ctx.proto[id].name);
        register_message(ctx, loaded, id, full_name, Parent::Message(parent), strict)?;
        register_nested(ctx, loaded, id, strict)?;
    }

    Ok(())
}

fn register_message(
    ctx: &mut ProtoContext,
    loaded: &[ProtoContext],
    id: MessageId,
    full_name: String,
    parent: Parent,
    strict: bool,
) -> Result<(), CheckError> {
    let message = &mut ctx.proto.message_arena[id.index()];
    message.full_name = full_name.clone();
    message.parent = parent;
    message.nested = matches!(parent, Parent::Message(_));
    let span = message.span.clone();

    ctx.register(loaded, full_name, UserType::Message(id), span, strict)
}

fn register_enum(
    ctx: &mut ProtoContext,
    loaded: &[ProtoContext],
    id: EnumId,
    full_name: String,
    parent: Parent,
    strict: bool,
) -> Result<(), CheckError> {
    let enu = &mut ctx.proto.enum_arena[id.index()];
    enu.full_name = full_name.clone();
    enu.parent = parent;
    enu.nested = matches!(parent, Parent::Message(_));
    let span = enu.span.clone();

    ctx.register(loaded, full_name, UserType::Enum(id), span, strict)
}

fn register_service(
    ctx: &mut ProtoContext,
    loaded: &[ProtoContext],
    id: ServiceId,
    full_name: String,
    strict: bool,
) -> Result<(), CheckError> {
    let service = &mut ctx.proto.service_arena[id.index()];
    service.full_name = full_name.clone();
    let span = service.span.clone();

    ctx.register(loaded, full_name, UserType::Service(id), span, strict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build::build_proto, model::FileId};

    fn context(source: &str) -> ProtoContext {
        let file = protolink_parse::parse("test.proto", source).unwrap();
        let proto = build_proto(FileId::new(0), "test.proto", source, &file);
        ProtoContext::new(proto, None, source.to_owned())
    }

    #[test]
    fn deeply_nested_names() {
        let mut ctx = context(
            "package pkg;
            message A {
                message B {
                    message C {
                        message D {
                            enum E { ZERO = 0; }
                        }
                    }
                }
            }",
        );
        register_types(&mut ctx, &[], true).unwrap();

        let expected = [".pkg.A", ".pkg.A.B", ".pkg.A.B.C", ".pkg.A.B.C.D"];
        let mut parent = None;
        let mut id = ctx.proto.messages()[0];
        for (depth, name) in expected.iter().enumerate() {
            let message = &ctx.proto[id];
            assert_eq!(message.full_name, *name);
            assert_eq!(message.nested, depth > 0);
            match parent {
                None => assert_eq!(message.parent, Parent::File(FileId::new(0))),
                Some(parent) => assert_eq!(message.parent, Parent::Message(parent)),
            }
            assert_eq!(ctx.resolve(&[], name), Some(UserType::Message(id)));

            parent = Some(id);
            if depth + 1 < expected.len() {
                id = message.messages[0];
            }
        }

        let d = &ctx.proto[id];
        let e = d.enums[0];
        assert_eq!(ctx.proto[e].full_name, ".pkg.A.B.C.D.E");
        assert!(ctx.proto[e].nested);
        assert_eq!(ctx.proto[e].parent, Parent::Message(id));
        assert_eq!(ctx.resolve(&[], ".pkg.A.B.C.D.E"), Some(UserType::Enum(e)));
    }

    #[test]
    fn no_package() {
        let mut ctx = context(
            "message Foo {}
            enum Bar { ZERO = 0; }
            service Baz {}",
        );
        register_types(&mut ctx, &[], true).unwrap();

        assert!(matches!(ctx.resolve(&[], ".Foo"), Some(UserType::Message(_))));
        assert!(matches!(ctx.resolve(&[], ".Bar"), Some(UserType::Enum(_))));
        assert!(matches!(ctx.resolve(&[], ".Baz"), Some(UserType::Service(_))));
        assert_eq!(ctx.resolve(&[], "Foo"), None);
    }

    #[test]
    fn nested_extension_parent() {
        let mut ctx = context(
            "message A {
                extensions 100 to 200;
                message B {
                    extend A { optional int32 x = 100; }
                }
            }
            extend A { optional int32 y = 101; }",
        );
        register_types(&mut ctx, &[], true).unwrap();

        let a = ctx.proto.messages()[0];
        let b = ctx.proto[a].messages[0];
        let nested = ctx.proto[b].extensions[0];
        let top = ctx.proto.extensions()[0];
        assert_eq!(ctx.proto[nested].parent, Parent::Message(b));
        assert_eq!(ctx.proto[top].parent, Parent::File(FileId::new(0)));
    }

    #[test]
    fn duplicate_names() {
        let source = "message Foo {}
            enum Foo { ZERO = 0; }";

        let mut ctx = context(source);
        register_types(&mut ctx, &[], false).unwrap();
        assert_eq!(ctx.conflicts().len(), 1);
        assert_eq!(ctx.conflicts()[0].name, ".Foo");
        assert!(matches!(ctx.conflicts()[0].previous, UserType::Message(_)));
        assert!(matches!(ctx.conflicts()[0].current, UserType::Enum(_)));
        assert!(matches!(ctx.resolve(&[], ".Foo"), Some(UserType::Enum(_))));

        let mut ctx = context(source);
        let err = register_types(&mut ctx, &[], true).unwrap_err();
        match err {
            CheckError::DuplicateName { name, help, .. } => {
                assert_eq!(name, ".Foo");
                assert_eq!(
                    help.as_deref(),
                    Some("it was previously defined in 'test.proto'")
                );
            }
            err => panic!("unexpected error {:?}", err),
        }
    }
}
