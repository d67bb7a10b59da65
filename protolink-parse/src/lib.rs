//! Parsing of protobuf interface definition files.
//!
//! See the documentation for [`parse()`] for details.
#![warn(missing_debug_implementations, missing_docs)]
#![deny(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/protolink-parse/0.1.0/")]

pub mod ast;
mod error;
mod lex;
mod parse;

pub use self::error::ParseError;
pub use logos::Span;

use self::error::ParseErrorKind;

/// The largest field number a message may declare, and the value of `max` in ranges.
pub const MAX_MESSAGE_FIELD_NUMBER: i32 = 536_870_911;

const MAX_FILE_LEN: usize = i32::MAX as usize;

/// Parses a single protobuf source file into its syntax tree.
///
/// This function only looks at the syntax of the file, without resolving type names or reading
/// imported files. `name` is only used when reporting errors.
///
/// # Examples
///
/// ```
/// # use protolink_parse::{parse, ast};
/// #
/// let source = r#"
///     syntax = "proto3";
///     import "dep.proto";
///
///     message Foo {
///         Bar bar = 1;
///     }
/// "#;
/// let file = parse("foo.proto", source).unwrap();
/// assert_eq!(file.syntax, ast::Syntax::Proto3);
/// assert_eq!(file.imports[0].value, "dep.proto");
///
/// match &file.items[0] {
///     ast::FileItem::Message(message) => {
///         assert_eq!(message.name.value, "Foo");
///         match &message.body.items[0] {
///             ast::MessageItem::Field(field) => {
///                 assert_eq!(field.ty.to_string(), "Bar");
///                 assert_eq!(field.number.value, 1);
///             }
///             _ => unreachable!(),
///         }
///     }
///     _ => unreachable!(),
/// }
/// ```
pub fn parse(name: &str, source: &str) -> Result<ast::File, ParseError> {
    if source.len() > MAX_FILE_LEN {
        return Err(ParseError::new(
            vec![ParseErrorKind::FileTooLarge],
            name,
            source,
        ));
    }

    parse::parse_file(source).map_err(|errors| ParseError::new(errors, name, source))
}
