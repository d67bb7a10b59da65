use std::{fmt, io, path::PathBuf};

use miette::{Diagnostic, NamedSource, SourceCode, SourceSpan};
use protolink_parse::{ParseError, Span};
use thiserror::Error;

use crate::model::Location;

/// An error that can occur when compiling protobuf files.
#[derive(Diagnostic, Error)]
#[error(transparent)]
#[diagnostic(transparent)]
pub struct Error {
    kind: Box<ErrorKind>,
}

#[derive(Debug, Diagnostic, Error)]
pub(crate) enum ErrorKind {
    #[error("{}", err)]
    #[diagnostic(forward(err))]
    Parse { err: ParseError },
    #[error("{}", err)]
    #[diagnostic(forward(err))]
    Check {
        err: CheckError,
        name: String,
        #[source_code]
        source_code: NamedSource,
    },
    #[error("error opening file '{}'", path.display())]
    OpenFile {
        name: String,
        path: PathBuf,
        #[source]
        err: io::Error,
    },
    #[error("file '{name}' is too large")]
    #[diagnostic(help("the maximum file length is 2,147,483,647 bytes"))]
    FileTooLarge { name: String },
    #[error("file '{name}' is not valid utf-8")]
    FileInvalidUtf8 { name: String },
    #[error("file '{name}' not found")]
    FileNotFound { name: String },
    #[error("import '{name}' not found")]
    ImportNotFound {
        #[label("imported here")]
        span: Option<SourceSpan>,
        #[source_code]
        source_code: NamedSource,
        name: String,
        file: String,
    },
    #[error("import cycle detected: {cycle}")]
    CircularImport { name: String, cycle: String },
    #[error("file '{}' is not in any include path", path.display())]
    FileNotIncluded { path: PathBuf },
    #[error("path '{}' is shadowed by '{}' in the include paths", path.display(), shadow.display())]
    #[diagnostic(help("either pass '{}' as the input file, or re-order the include paths so that '{}' comes first", shadow.display(), path.display()))]
    FileShadowed {
        name: String,
        path: PathBuf,
        shadow: PathBuf,
    },
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

/// A semantic error found after parsing.
#[derive(Debug, Diagnostic, Error)]
pub(crate) enum CheckError {
    #[error("name '{name}' is not defined")]
    TypeNotFound {
        name: String,
        #[label("found here")]
        span: Option<SourceSpan>,
    },
    #[error("'{name}' is a service, which cannot be used as a field type")]
    InvalidFieldType {
        name: String,
        #[label("found here")]
        span: Option<SourceSpan>,
    },
    #[error("'{name}' is not a valid map key type")]
    #[diagnostic(help("map keys must be integral, bool or string scalars"))]
    InvalidMapKeyType {
        name: String,
        #[label("found here")]
        span: Option<SourceSpan>,
    },
    #[error("extendee type '{name}' is not a message")]
    InvalidExtendee {
        name: String,
        #[label("found here")]
        span: Option<SourceSpan>,
    },
    #[error("method {kind} type '{name}' is not a message")]
    InvalidMethodType {
        kind: &'static str,
        name: String,
        #[label("found here")]
        span: Option<SourceSpan>,
    },
    #[error("name '{name}' is defined twice")]
    DuplicateName {
        name: String,
        #[help]
        help: Option<String>,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("extension '{name}' tag={tag} is out of allowed range")]
    ExtensionOutOfRange {
        name: String,
        tag: i32,
        #[help]
        help: String,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("extension number {number} of '{extendee}' is already used by '{other}'")]
    DuplicateExtensionNumber {
        number: i32,
        extendee: String,
        other: String,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("field number {number} is already used by '{other}'")]
    DuplicateFieldNumber {
        number: i32,
        other: String,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("field name '{name}' is already used")]
    DuplicateFieldName {
        name: String,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("field '{name}' number {number} overlaps an extension range of message '{message}'")]
    FieldNumberInExtensionRange {
        name: String,
        number: i32,
        message: String,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("field '{name}' uses reserved number {number}")]
    ReservedFieldNumber {
        name: String,
        number: i32,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("field name '{name}' is reserved")]
    ReservedFieldName {
        name: String,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
}

impl Error {
    /// Creates an instance of [`struct@Error`] with an arbitrary payload.
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::from_kind(ErrorKind::Custom(error.into()))
    }

    /// Creates an instance of [`struct@Error`] indicating that an imported file could not be found.
    ///
    /// This error should be returned by [`FileResolver`](crate::file::FileResolver) instances if a file is not found.
    pub fn file_not_found(name: &str) -> Self {
        Error::from_kind(ErrorKind::FileNotFound {
            name: name.to_owned(),
        })
    }

    /// The file in which this error occurred, if available.
    pub fn file(&self) -> Option<&str> {
        match &*self.kind {
            ErrorKind::Parse { err } => Some(err.file()),
            ErrorKind::Check { name, .. }
            | ErrorKind::OpenFile { name, .. }
            | ErrorKind::FileTooLarge { name }
            | ErrorKind::FileInvalidUtf8 { name }
            | ErrorKind::FileNotFound { name }
            | ErrorKind::CircularImport { name, .. }
            | ErrorKind::FileShadowed { name, .. } => Some(name),
            ErrorKind::ImportNotFound { file, .. } => Some(file),
            ErrorKind::FileNotIncluded { .. } | ErrorKind::Custom(_) => None,
        }
    }

    /// The file and 1-based line at which this error occurred, if available.
    pub fn location(&self) -> Option<Location> {
        match &*self.kind {
            ErrorKind::Parse { err } => Some(Location {
                file: err.file().to_owned(),
                line: err.line()?,
            }),
            ErrorKind::Check {
                err,
                name,
                source_code,
            } => Some(Location {
                file: name.clone(),
                line: line_number(source_code, err.span()?)?,
            }),
            ErrorKind::ImportNotFound {
                span,
                source_code,
                file,
                ..
            } => Some(Location {
                file: file.clone(),
                line: line_number(source_code, (*span)?)?,
            }),
            _ => None,
        }
    }

    /// Returns true if this is an instance of [`Error::file_not_found()`]
    pub fn is_file_not_found(&self) -> bool {
        matches!(
            &*self.kind,
            ErrorKind::FileNotFound { .. }
                | ErrorKind::ImportNotFound { .. }
                | ErrorKind::FileNotIncluded { .. }
        )
    }

    /// Returns true if this error is caused by an invalid protobuf source file.
    pub fn is_parse(&self) -> bool {
        matches!(
            &*self.kind,
            ErrorKind::Parse { .. }
                | ErrorKind::FileTooLarge { .. }
                | ErrorKind::FileInvalidUtf8 { .. }
        )
    }

    /// Returns true if this error is caused by an IO error while opening a file.
    pub fn is_io(&self) -> bool {
        match &*self.kind {
            ErrorKind::OpenFile { .. } => true,
            ErrorKind::Custom(err) if err.downcast_ref::<io::Error>().is_some() => true,
            _ => false,
        }
    }

    pub(crate) fn from_kind(kind: ErrorKind) -> Self {
        Error {
            kind: Box::new(kind),
        }
    }

    pub(crate) fn check(err: CheckError, name: &str, source: &str) -> Self {
        Error::from_kind(ErrorKind::Check {
            err,
            name: name.to_owned(),
            source_code: NamedSource::new(name, source.to_owned()),
        })
    }

    #[cfg(test)]
    pub(crate) fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub(crate) fn into_import_error(self, file: &str, source: &str, span: Span) -> Self {
        match *self.kind {
            ErrorKind::FileNotFound { name } => Error::from_kind(ErrorKind::ImportNotFound {
                span: Some(span.into()),
                source_code: NamedSource::new(file, source.to_owned()),
                name,
                file: file.to_owned(),
            }),
            kind => Error::from_kind(kind),
        }
    }
}

impl CheckError {
    pub(crate) fn span(&self) -> Option<SourceSpan> {
        match self {
            CheckError::TypeNotFound { span, .. }
            | CheckError::InvalidFieldType { span, .. }
            | CheckError::InvalidMapKeyType { span, .. }
            | CheckError::InvalidExtendee { span, .. }
            | CheckError::InvalidMethodType { span, .. }
            | CheckError::DuplicateName { span, .. }
            | CheckError::ExtensionOutOfRange { span, .. }
            | CheckError::DuplicateExtensionNumber { span, .. }
            | CheckError::DuplicateFieldNumber { span, .. }
            | CheckError::DuplicateFieldName { span, .. }
            | CheckError::FieldNumberInExtensionRange { span, .. }
            | CheckError::ReservedFieldNumber { span, .. }
            | CheckError::ReservedFieldName { span, .. } => *span,
        }
    }
}

fn line_number(source_code: &NamedSource, span: SourceSpan) -> Option<usize> {
    let contents = source_code.read_span(&span, 0, 0).ok()?;
    Some(contents.line() + 1)
}

fn fmt_location(
    f: &mut fmt::Formatter<'_>,
    file: &str,
    source_code: &NamedSource,
    span: Option<SourceSpan>,
) -> fmt::Result {
    write!(f, "{}:", file)?;
    if let Some(span) = span {
        if let Ok(contents) = source_code.read_span(&span, 0, 0) {
            write!(f, "{}:{}:", contents.line() + 1, contents.column() + 1)?;
        }
    }
    f.write_str(" ")
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::from_kind(ErrorKind::Parse { err })
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::new(err)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.kind {
            ErrorKind::Parse { err } => fmt::Debug::fmt(err, f),
            ErrorKind::Check {
                err,
                name,
                source_code,
            } => {
                fmt_location(f, name, source_code, err.span())?;
                write!(f, "{}", self)
            }
            ErrorKind::OpenFile { err, .. } => write!(f, "{}: {}", self, err),
            ErrorKind::FileTooLarge { .. }
            | ErrorKind::FileInvalidUtf8 { .. }
            | ErrorKind::FileNotFound { .. }
            | ErrorKind::CircularImport { .. }
            | ErrorKind::FileNotIncluded { .. }
            | ErrorKind::FileShadowed { .. } => write!(f, "{}", self),
            ErrorKind::Custom(err) => fmt::Debug::fmt(err, f),
            ErrorKind::ImportNotFound {
                span,
                source_code,
                file,
                ..
            } => {
                fmt_location(f, file, source_code, *span)?;
                write!(f, "{}", self)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_debug_io() {
        let err = Error::from_kind(ErrorKind::OpenFile {
            name: "file.proto".into(),
            path: "path/to/file.proto".into(),
            err: io::Error::new(io::ErrorKind::Other, "io error"),
        });

        assert!(err.is_io());
        assert_eq!(err.file(), Some("file.proto"));
        assert_eq!(
            format!("{:?}", err),
            "error opening file 'path/to/file.proto': io error"
        );
    }

    #[test]
    fn fmt_debug_parse() {
        let err = Error::from(protolink_parse::parse("file.proto", "invalid").unwrap_err());

        assert!(err.is_parse());
        assert_eq!(err.file(), Some("file.proto"));
        assert_eq!(
            err.location(),
            Some(Location {
                file: "file.proto".to_owned(),
                line: 1
            })
        );
        assert_eq!(
            format!("{:?}", err),
            "file.proto:1:1: expected 'enum', 'extend', 'import', 'message', 'option', 'service', 'package' or ';', but found 'invalid'"
        );
    }

    #[test]
    fn fmt_debug_check() {
        let source = "message Foo {\n  Bar bar = 1;\n}\n";
        let err = Error::check(
            CheckError::TypeNotFound {
                name: "Bar".to_owned(),
                span: Some((16..19).into()),
            },
            "foo.proto",
            source,
        );

        assert!(!err.is_parse());
        assert_eq!(err.file(), Some("foo.proto"));
        assert_eq!(
            err.location(),
            Some(Location {
                file: "foo.proto".to_owned(),
                line: 2
            })
        );
        assert_eq!(
            format!("{:?}", err),
            "foo.proto:2:3: name 'Bar' is not defined"
        );
    }

    #[test]
    fn import_not_found() {
        let source = "import \"dep.proto\";\n";
        let err = Error::file_not_found("dep.proto").into_import_error("root.proto", source, 7..18);

        assert!(err.is_file_not_found());
        assert_eq!(err.file(), Some("root.proto"));
        assert_eq!(
            format!("{:?}", err),
            "root.proto:1:8: import 'dep.proto' not found"
        );
    }
}
