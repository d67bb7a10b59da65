//! Semantic analysis for protobuf interface definitions.
//!
//! Protolink loads `.proto` files with their imports, names every declaration, links each type
//! reference to the declaration it refers to, and checks the result. The output is a [`Module`],
//! a read-only graph of files, messages, enums, services and extensions for code generators to
//! consume.
//!
//! For compiling files in a single call, see [`compile()`]. For more options see [`Compiler`].
//!
//! # Examples
//!
//! ```
//! # use std::{env, fs};
//! # let tempdir = tempfile::TempDir::new().unwrap();
//! # env::set_current_dir(&tempdir).unwrap();
//! fs::write("root.proto", "
//!     package pkg;
//!     message Foo { optional Bar bar = 1; }
//!     message Bar {}
//! ").unwrap();
//!
//! let module = protolink::compile(["root.proto"], ["."]).unwrap();
//! let foo = module.get_message_by_name("pkg.Foo").unwrap();
//! let bar = module.get_message_by_name("pkg.Bar").unwrap();
//! assert_eq!(module[foo].fields[0].ty, Some(protolink::model::Type::Message(bar)));
//! ```
//!
//! ### Error messages
//!
//! This crate uses [`miette`](https://crates.io/crates/miette) to add additional details to errors. For nice error messages, add `miette` as a dependency with the `fancy` feature enabled and return a [`miette::Result`](https://docs.rs/miette/latest/miette/type.Result.html).
//!
//! Example error message:
//!
//! ```text
//! Error:
//!   × name 'Bar' is not defined
//!    ╭─[root.proto:3:1]
//!  3 │ message Foo {
//!  4 │     Bar bar = 1;
//!    ·     ─┬─
//!    ·      ╰── found here
//!  5 │ }
//!    ╰────
//! ```
#![warn(missing_debug_implementations, missing_docs)]
#![deny(unsafe_code)]

pub mod file;
pub mod model;

mod build;
mod compile;
mod context;
mod error;
mod lines;
mod module;
mod registrar;
mod resolve;
mod validate;

#[cfg(test)]
mod test_util;

use std::path::Path;

pub use protolink_parse::ast;

pub use self::compile::Compiler;
pub use self::context::{Conflict, ProtoContext};
pub use self::error::Error;
pub use self::module::Module;
pub use self::validate::{
    ExtensionNumberValidator, ExtensionRangeValidator, MessageValidator, Validator,
};

/// Compiles a set of protobuf files using the given include paths.
///
/// For more control over how files are compiled, see [`Compiler`]. This function is equivalent to:
///
/// ```rust
/// # use protolink::Compiler;
/// # fn main() -> Result<(), protolink::Error> {
/// # let files: Vec<std::path::PathBuf> = vec![];
/// # let includes: Vec<std::path::PathBuf> = vec![".".into()];
/// let mut compiler = Compiler::new(includes)?;
/// compiler.open_files(files)?;
/// let module = compiler.into_module();
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the first error found in any file or import.
pub fn compile(
    files: impl IntoIterator<Item = impl AsRef<Path>>,
    includes: impl IntoIterator<Item = impl AsRef<Path>>,
) -> Result<Module, Error> {
    let mut compiler = Compiler::new(includes)?;
    compiler.open_files(files)?;
    Ok(compiler.into_module())
}
