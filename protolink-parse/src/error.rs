use std::fmt;

use logos::Span;
use miette::{Diagnostic, NamedSource, SourceCode, SourceSpan};
use thiserror::Error;

use crate::MAX_MESSAGE_FIELD_NUMBER;

/// An error that may occur while parsing a source file.
///
/// A single `ParseError` holds every syntax error found in the file. [`Display`](fmt::Display)
/// shows the first one and how many others were found. The first error labels this diagnostic,
/// the others are reported as related diagnostics.
#[derive(Error, Diagnostic)]
#[diagnostic(forward(kind))]
pub struct ParseError {
    kind: ParseErrorKind,
    #[related]
    related: Vec<ParseErrorKind>,
    #[source_code]
    source_code: NamedSource,
    file: String,
}

#[derive(Error, Debug, Diagnostic, PartialEq)]
pub(crate) enum ParseErrorKind {
    #[error("invalid token")]
    InvalidToken {
        #[label("found here")]
        span: Span,
    },
    #[error("integer is too large")]
    IntegerOutOfRange {
        #[label("integer defined here")]
        span: Span,
    },
    #[error("invalid string character")]
    InvalidStringCharacters {
        #[label("invalid characters")]
        span: Span,
    },
    #[error("unterminated string")]
    UnterminatedString {
        #[label("string starts here")]
        span: Span,
    },
    #[error("invalid string escape")]
    InvalidStringEscape {
        #[label("defined here")]
        span: Span,
    },
    #[error("string is not valid utf-8")]
    InvalidUtf8String {
        #[label("defined here")]
        span: Span,
    },
    #[error("nested block comments are not supported")]
    NestedBlockComment {
        #[label("defined here")]
        span: Span,
    },
    #[error("unknown syntax '{syntax}'")]
    #[diagnostic(help("possible values are 'proto2' and 'proto3'"))]
    UnknownSyntax {
        syntax: String,
        #[label("defined here")]
        span: Span,
    },
    #[error("invalid identifier")]
    #[diagnostic(help("identifiers must consist of letters, numbers and underscores, and may not start with a number"))]
    InvalidIdentifier {
        #[label("defined here")]
        span: Span,
    },
    #[error("invalid import path")]
    #[diagnostic(help(
        "imports may not contain backslashes, repeated forward slashes, '.' or '..' components"
    ))]
    InvalidImport {
        #[label("defined here")]
        span: Span,
    },
    #[error("multiple package names specified")]
    DuplicatePackage {
        #[label("defined here…")]
        first: Span,
        #[label("…and again here")]
        second: Span,
    },
    #[error("whitespace is required between an integer literal and an identifier")]
    NoSpaceBetweenIntAndIdent {
        #[label("found here")]
        span: Span,
    },
    #[error("expected {expected}, but found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        #[label("found here")]
        span: Span,
    },
    #[error("expected {expected}, but reached end of file")]
    UnexpectedEof { expected: String },
    #[error("message numbers must be between 1 and {}", MAX_MESSAGE_FIELD_NUMBER)]
    InvalidMessageNumber {
        #[label("defined here")]
        span: Span,
    },
    #[error("enum numbers must be between {} and {}", i32::MIN, i32::MAX)]
    InvalidEnumNumber {
        #[label("defined here")]
        span: Span,
    },
    #[error("range start must not be greater than its end")]
    InvalidRange {
        #[label("defined here")]
        span: Span,
    },
    #[error("groups are not supported")]
    #[diagnostic(help("declare a nested message and a field of that type instead"))]
    GroupNotSupported {
        #[label("defined here")]
        span: Span,
    },
    #[error("map fields cannot have labels")]
    MapFieldWithLabel {
        #[label("defined here")]
        span: Span,
    },
    #[error("oneof fields cannot have labels")]
    OneofFieldWithLabel {
        #[label("defined here")]
        span: Span,
    },
    #[error("map fields are not allowed in {kind}")]
    InvalidMapField {
        kind: &'static str,
        #[label("defined here")]
        span: Span,
    },
    #[error("extension fields may not be required")]
    RequiredExtendField {
        #[label("defined here")]
        span: Span,
    },
    #[error("required fields are not allowed in proto3 syntax")]
    Proto3RequiredField {
        #[label("defined here")]
        span: Span,
    },
    #[error("a oneof must have at least one field")]
    EmptyOneof {
        #[label("defined here")]
        span: Span,
    },
    #[error("file is too large")]
    #[diagnostic(help("the maximum file length is 2,147,483,647 bytes"))]
    FileTooLarge,
}

impl ParseError {
    pub(crate) fn new(mut related: Vec<ParseErrorKind>, file: &str, source: &str) -> Self {
        debug_assert!(!related.is_empty());
        let kind = related.remove(0);
        ParseError {
            kind,
            related,
            source_code: NamedSource::new(file, source.to_owned()),
            file: file.to_owned(),
        }
    }

    /// The name of the file in which the errors occurred.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// The total number of syntax errors found in the file.
    pub fn error_count(&self) -> usize {
        1 + self.related.len()
    }

    /// The location of the first error, if it has one.
    pub fn span(&self) -> Option<SourceSpan> {
        self.kind.span().map(SourceSpan::from)
    }

    /// The 1-based line number of the first error, if it has a location.
    pub fn line(&self) -> Option<usize> {
        let span = self.span()?;
        let contents = self.source_code.read_span(&span, 0, 0).ok()?;
        Some(contents.line() + 1)
    }

    fn fmt_kind(&self, f: &mut fmt::Formatter<'_>, kind: &ParseErrorKind) -> fmt::Result {
        write!(f, "{}:", self.file)?;
        if let Some(span) = kind.span() {
            if let Ok(contents) = self.source_code.read_span(&span.into(), 0, 0) {
                write!(f, "{}:{}: ", contents.line() + 1, contents.column() + 1)?;
            }
        } else {
            write!(f, " ")?;
        }
        write!(f, "{}", kind)
    }
}

impl ParseErrorKind {
    fn span(&self) -> Option<Span> {
        match self {
            ParseErrorKind::InvalidToken { span }
            | ParseErrorKind::IntegerOutOfRange { span }
            | ParseErrorKind::InvalidStringCharacters { span }
            | ParseErrorKind::UnterminatedString { span }
            | ParseErrorKind::InvalidStringEscape { span }
            | ParseErrorKind::InvalidUtf8String { span }
            | ParseErrorKind::NestedBlockComment { span }
            | ParseErrorKind::UnknownSyntax { span, .. }
            | ParseErrorKind::InvalidIdentifier { span }
            | ParseErrorKind::InvalidImport { span }
            | ParseErrorKind::DuplicatePackage { second: span, .. }
            | ParseErrorKind::NoSpaceBetweenIntAndIdent { span }
            | ParseErrorKind::UnexpectedToken { span, .. }
            | ParseErrorKind::InvalidMessageNumber { span }
            | ParseErrorKind::InvalidEnumNumber { span }
            | ParseErrorKind::InvalidRange { span }
            | ParseErrorKind::GroupNotSupported { span }
            | ParseErrorKind::MapFieldWithLabel { span }
            | ParseErrorKind::OneofFieldWithLabel { span }
            | ParseErrorKind::InvalidMapField { span, .. }
            | ParseErrorKind::RequiredExtendField { span }
            | ParseErrorKind::Proto3RequiredField { span }
            | ParseErrorKind::EmptyOneof { span } => Some(span.clone()),
            ParseErrorKind::UnexpectedEof { .. } | ParseErrorKind::FileTooLarge => None,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)?;
        match self.related.len() {
            0 => Ok(()),
            1 => write!(f, " (and 1 more error)"),
            n => write!(f, " (and {} more errors)", n),
        }
    }
}

impl fmt::Debug for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_kind(f, &self.kind)?;
        for kind in &self.related {
            writeln!(f)?;
            self.fmt_kind(f, kind)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary() {
        let source = "message Foo {\n  int32 = 1;\n  int32 b = 0;\n}\n";
        let err = ParseError::new(
            vec![
                ParseErrorKind::UnexpectedToken {
                    expected: "an identifier".to_owned(),
                    found: "=".to_owned(),
                    span: 22..23,
                },
                ParseErrorKind::InvalidMessageNumber { span: 39..40 },
            ],
            "foo.proto",
            source,
        );

        assert_eq!(err.error_count(), 2);
        assert_eq!(err.line(), Some(2));
        assert_eq!(
            err.to_string(),
            "expected an identifier, but found '=' (and 1 more error)"
        );
        assert_eq!(
            format!("{:?}", err),
            "foo.proto:2:9: expected an identifier, but found '='\n\
             foo.proto:3:13: message numbers must be between 1 and 536870911"
        );
    }
}
