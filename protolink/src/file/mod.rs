//! Locating and reading protobuf source files.

mod chain;
mod include;

pub use chain::ChainFileResolver;
pub use include::IncludeFileResolver;

pub(crate) use include::{check_shadow, path_to_file_name};

use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use protolink_parse::ast;

use crate::{error::ErrorKind, Error};

const MAX_FILE_LEN: u64 = i32::MAX as u64;

/// A strategy for locating protobuf source files.
///
/// The main implementation is [`IncludeFileResolver`] which uses the file system, but
/// this trait allows sourcing files from other places as well.
pub trait FileResolver {
    /// Converts a file system path to a unique file name.
    fn resolve_path(&self, _path: &Path) -> Option<String> {
        None
    }

    /// Opens a file by its unique name.
    ///
    /// # Errors
    ///
    /// If the file is not found, the implementation should return [`Error::file_not_found`].
    fn open_file(&self, name: &str) -> Result<File, Error>;
}

impl<T> FileResolver for Box<T>
where
    T: FileResolver + ?Sized,
{
    fn resolve_path(&self, path: &Path) -> Option<String> {
        (**self).resolve_path(path)
    }

    fn open_file(&self, name: &str) -> Result<File, Error> {
        (**self).open_file(name)
    }
}

/// A parsed protobuf source file, returned by [`FileResolver::open_file`].
#[derive(Debug, Clone)]
pub struct File {
    pub(crate) name: String,
    pub(crate) path: Option<PathBuf>,
    pub(crate) source: String,
    pub(crate) ast: ast::File,
}

impl File {
    /// Reads and parses the file at `path`, which is imported as `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if there is an IO error opening the file, or it is not
    /// a valid protobuf source file.
    ///
    /// If the file does not exist, [`Error::file_not_found()`] is returned.
    pub fn open(name: &str, path: &Path) -> Result<Self, Error> {
        let map_io_err = |err: io::Error| -> Error {
            if err.kind() == io::ErrorKind::NotFound {
                Error::file_not_found(name)
            } else {
                Error::from_kind(ErrorKind::OpenFile {
                    name: name.to_owned(),
                    path: path.to_owned(),
                    err,
                })
            }
        };

        let file = fs::File::open(path).map_err(map_io_err)?;
        let metadata = file.metadata().map_err(map_io_err)?;

        if metadata.len() > MAX_FILE_LEN {
            return Err(Error::from_kind(ErrorKind::FileTooLarge {
                name: name.to_owned(),
            }));
        }

        let mut buf = Vec::with_capacity(metadata.len() as usize);
        file.take(MAX_FILE_LEN)
            .read_to_end(&mut buf)
            .map_err(map_io_err)?;

        let source = String::from_utf8(buf).map_err(|_| {
            Error::from_kind(ErrorKind::FileInvalidUtf8 {
                name: name.to_owned(),
            })
        })?;

        let ast = protolink_parse::parse(name, &source)?;
        Ok(File {
            name: name.to_owned(),
            path: Some(path.to_owned()),
            source,
            ast,
        })
    }

    /// Parses a file from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid protobuf source file.
    ///
    /// # Examples
    ///
    /// ```
    /// # use protolink::file::File;
    /// let file = File::from_source("foo.proto", "message Foo { }").unwrap();
    /// assert_eq!(file.name(), "foo.proto");
    /// assert_eq!(file.path(), None);
    /// assert_eq!(file.source(), "message Foo { }");
    /// assert_eq!(file.ast().items.len(), 1);
    ///
    /// assert!(File::from_source("bar.proto", "message {").unwrap_err().is_parse());
    /// ```
    pub fn from_source(name: &str, source: &str) -> Result<Self, Error> {
        let ast = protolink_parse::parse(name, source)?;
        Ok(File {
            name: name.to_owned(),
            path: None,
            source: source.to_owned(),
            ast,
        })
    }

    /// The name used to import this file.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the filesystem path, if this source is backed by a physical file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the full content of the source file.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the syntax tree of the file.
    pub fn ast(&self) -> &ast::File {
        &self.ast
    }
}

#[cfg(test)]
mod tests;
