//! Checks run on each file once all of its types are resolved.

use std::{collections::HashMap, fmt::Write};

use crate::{
    error::{CheckError, Error},
    model::{Field, FileId, Message},
    Module,
};

/// A check run against every loaded file after resolution.
///
/// Validators see the whole module, but should only report problems in `file`. Imported files
/// have already been validated by the time their importers are.
pub trait Validator {
    /// Checks the declarations of `file`.
    fn validate(&self, module: &Module, file: FileId) -> Result<(), Error>;
}

impl<V> Validator for Box<V>
where
    V: Validator + ?Sized,
{
    fn validate(&self, module: &Module, file: FileId) -> Result<(), Error> {
        (**self).validate(module, file)
    }
}

/// The validators every [`Compiler`](crate::Compiler) starts with.
pub(crate) fn default_validators() -> Vec<Box<dyn Validator>> {
    vec![
        Box::new(MessageValidator),
        Box::new(ExtensionRangeValidator),
        Box::new(ExtensionNumberValidator),
    ]
}

/// Checks the fields of each message for duplicate numbers and names, and for numbers or names
/// that are reserved or set aside for extensions.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageValidator;

/// Checks that every extension field uses a number in one of the extension ranges of its
/// extendee.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtensionRangeValidator;

/// Checks that no two extensions of a message visible from the same file share a number, and
/// that no extension reuses a number of a field of the extendee.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtensionNumberValidator;

impl Validator for MessageValidator {
    fn validate(&self, module: &Module, file: FileId) -> Result<(), Error> {
        let error = |err| check_error(module, file, err);

        for (_, message) in module[file].all_messages() {
            check_message(message).map_err(error)?;
        }
        Ok(())
    }
}

fn check_message(message: &Message) -> Result<(), CheckError> {
    let mut numbers: HashMap<i32, &Field> = HashMap::new();
    let mut names: HashMap<&str, &Field> = HashMap::new();

    for field in &message.fields {
        if let Some(other) = numbers.insert(field.number, field) {
            return Err(CheckError::DuplicateFieldNumber {
                number: field.number,
                other: other.name.clone(),
                span: Some(field.span.clone().into()),
            });
        }
        if names.insert(&field.name, field).is_some() {
            return Err(CheckError::DuplicateFieldName {
                name: field.name.clone(),
                span: Some(field.span.clone().into()),
            });
        }

        if message.is_extension_number(field.number) {
            return Err(CheckError::FieldNumberInExtensionRange {
                name: field.name.clone(),
                number: field.number,
                message: message.full_name.clone(),
                span: Some(field.span.clone().into()),
            });
        }
        if message
            .reserved_ranges
            .iter()
            .any(|range| range.contains(field.number))
        {
            return Err(CheckError::ReservedFieldNumber {
                name: field.name.clone(),
                number: field.number,
                span: Some(field.span.clone().into()),
            });
        }
        if message.reserved_names.contains(&field.name) {
            return Err(CheckError::ReservedFieldName {
                name: field.name.clone(),
                span: Some(field.span.clone().into()),
            });
        }
    }

    Ok(())
}

impl Validator for ExtensionRangeValidator {
    fn validate(&self, module: &Module, file: FileId) -> Result<(), Error> {
        for (_, extension) in module[file].all_extensions() {
            let extendee = match extension.extendee {
                Some(id) => &module[id],
                None => continue,
            };

            for field in &extension.fields {
                if !extendee.is_extension_number(field.number) {
                    return Err(check_error(
                        module,
                        file,
                        CheckError::ExtensionOutOfRange {
                            name: extension.field_full_name(field),
                            tag: field.number,
                            help: allowed_ranges(extendee),
                            span: Some(field.span.clone().into()),
                        },
                    ));
                }
            }
        }
        Ok(())
    }
}

fn allowed_ranges(message: &Message) -> String {
    if message.extension_ranges.is_empty() {
        return format!(
            "message '{}' does not declare any extension ranges",
            message.full_name
        );
    }

    let mut help = format!("allowed ranges for message '{}': ", message.full_name);
    for (index, range) in message.extension_ranges.iter().enumerate() {
        if index != 0 {
            help.push_str(", ");
        }
        let _ = write!(help, "{}", range);
    }
    help
}

impl Validator for ExtensionNumberValidator {
    fn validate(&self, module: &Module, file: FileId) -> Result<(), Error> {
        for (id, extension) in module[file].all_extensions() {
            let extendee = match extension.extendee {
                Some(id) => &module[id],
                None => continue,
            };
            let visible = module.extensions(file, &extendee.full_name);

            for (position, field) in extension.fields.iter().enumerate() {
                if let Some(other) = extendee.get_field(field.number) {
                    return Err(check_error(
                        module,
                        file,
                        CheckError::DuplicateExtensionNumber {
                            number: field.number,
                            extendee: extendee.full_name.clone(),
                            other: format!("{}.{}", extendee.full_name, other.name),
                            span: Some(field.span.clone().into()),
                        },
                    ));
                }

                // a clash is reported at whichever field was declared last
                for &other_id in visible.iter() {
                    let other_extension = &module[other_id];
                    let earlier = if other_id == id {
                        &other_extension.fields[..position]
                    } else if other_id.file() == file && other_id.index() > id.index() {
                        continue;
                    } else {
                        &other_extension.fields[..]
                    };

                    if let Some(other) = earlier.iter().find(|other| other.number == field.number)
                    {
                        return Err(check_error(
                            module,
                            file,
                            CheckError::DuplicateExtensionNumber {
                                number: field.number,
                                extendee: extendee.full_name.clone(),
                                other: other_extension.field_full_name(other),
                                span: Some(field.span.clone().into()),
                            },
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_error(module: &Module, file: FileId, err: CheckError) -> Error {
    let ctx = module.context(file);
    Error::check(err, ctx.proto().file_name(), ctx.source())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_util::{compile, TestFileResolver},
        Compiler,
    };

    fn error(files: &[(&str, &str)]) -> String {
        compile(files).unwrap_err().to_string()
    }

    #[test]
    fn extension_in_open_range() {
        let module = compile(&[(
            "root.proto",
            "package pkg;
            message M { extensions 10 to max; }
            extend M { optional int32 ok = 42; }",
        )])
        .unwrap();

        let root = module.file_by_name("root.proto").unwrap().id();
        let (_, field) = module
            .get_extension_field(root, ".pkg.M", ".pkg.ok")
            .unwrap();
        assert_eq!(field.number, 42);
    }

    #[test]
    fn extension_out_of_range() {
        let err = compile(&[(
            "root.proto",
            "package pkg;
            message M { extensions 10 to max; }
            extend M { optional int32 bad = 5; }",
        )])
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "extension '.pkg.bad' tag=5 is out of allowed range"
        );
        assert_eq!(err.location().unwrap().line, 3);
        match err.kind() {
            crate::error::ErrorKind::Check {
                err: CheckError::ExtensionOutOfRange { help, .. },
                ..
            } => assert_eq!(help, "allowed ranges for message '.pkg.M': 10 to max"),
            kind => panic!("unexpected error {:?}", kind),
        }
    }

    #[test]
    fn extension_without_ranges() {
        let err = compile(&[(
            "root.proto",
            "message M {}
            message Holder {
                extend M { optional int32 bad = 1; }
            }",
        )])
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "extension '.Holder.bad' tag=1 is out of allowed range"
        );
        match err.kind() {
            crate::error::ErrorKind::Check {
                err: CheckError::ExtensionOutOfRange { help, .. },
                ..
            } => assert_eq!(help, "message '.M' does not declare any extension ranges"),
            kind => panic!("unexpected error {:?}", kind),
        }
    }

    #[test]
    fn message_field_errors() {
        assert_eq!(
            error(&[("a.proto", "message M { optional int32 a = 1; optional int32 b = 1; }")]),
            "field number 1 is already used by 'a'"
        );
        assert_eq!(
            error(&[("a.proto", "message M { optional int32 a = 1; optional int32 a = 2; }")]),
            "field name 'a' is already used"
        );
        assert_eq!(
            error(&[("a.proto", "message M { extensions 100 to 200; optional int32 a = 150; }")]),
            "field 'a' number 150 overlaps an extension range of message '.M'"
        );
        assert_eq!(
            error(&[("a.proto", "message M { reserved 4 to 6; optional int32 a = 5; }")]),
            "field 'a' uses reserved number 5"
        );
        assert_eq!(
            error(&[("a.proto", "message M { reserved \"a\"; optional int32 a = 5; }")]),
            "field name 'a' is reserved"
        );
    }

    #[test]
    fn duplicate_extension_numbers_across_files() {
        let err = compile(&[
            (
                "base.proto",
                "package base; message M { extensions 100 to 199; }",
            ),
            (
                "ext.proto",
                "package ext; import \"base.proto\"; extend base.M { optional int32 first = 100; }",
            ),
            (
                "root.proto",
                "import \"ext.proto\";
                import \"base.proto\";
                extend base.M { optional int32 second = 100; }",
            ),
        ])
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "extension number 100 of '.base.M' is already used by '.ext.first'"
        );
        assert_eq!(err.file(), Some("root.proto"));
    }

    #[test]
    fn duplicate_extension_numbers_in_one_block() {
        let err = compile(&[(
            "a.proto",
            "message M { extensions 1 to 10; }
            extend M {
                optional int32 x = 1;
                optional int32 y = 1;
            }",
        )])
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "extension number 1 of '.M' is already used by '.x'"
        );
        assert_eq!(err.location().unwrap().line, 4);
    }

    #[test]
    fn duplicate_extension_numbers_in_one_file() {
        let err = compile(&[(
            "a.proto",
            "message M { extensions 1 to 10; }
            extend M { optional int32 x = 2; }
            extend M { optional int32 y = 2; }",
        )])
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "extension number 2 of '.M' is already used by '.x'"
        );
        assert_eq!(err.location().unwrap().line, 3);
    }

    #[test]
    fn custom_validator() {
        struct NoServices;

        impl Validator for NoServices {
            fn validate(&self, module: &Module, file: FileId) -> Result<(), Error> {
                if module[file].services().is_empty() {
                    Ok(())
                } else {
                    Err(Error::new("services are not allowed"))
                }
            }
        }

        let mut compiler = Compiler::with_file_resolver(TestFileResolver::new(&[(
            "a.proto",
            "message M {} service S { rpc Call (M) returns (M); }",
        )]));
        compiler.add_validator(NoServices);
        let err = compiler.open_file("a.proto").unwrap_err();
        assert_eq!(err.to_string(), "services are not allowed");
        assert!(compiler.module().is_empty());
    }
}
