use protolink_parse::Span;

use crate::model::Location;

/// Maps byte offsets in a source file to line numbers.
pub(crate) struct LineResolver<'a> {
    file: &'a str,
    /// Offset of the first byte of every line after the first.
    starts: Vec<usize>,
}

impl<'a> LineResolver<'a> {
    pub fn new(file: &'a str, source_code: &str) -> Self {
        let starts = source_code
            .match_indices('\n')
            .map(|(index, _)| index + 1)
            .collect();
        LineResolver { file, starts }
    }

    /// The 1-based line containing `offset`.
    pub fn line(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(index) => index + 2,
            Err(index) => index + 1,
        }
    }

    pub fn location(&self, span: &Span) -> Location {
        Location {
            file: self.file.to_owned(),
            line: self.line(span.start),
        }
    }
}

#[test]
fn line_numbers() {
    let resolver = LineResolver::new("foo.proto", "hello\nworld\n\nfoo");

    assert_eq!(resolver.line(0), 1);
    assert_eq!(resolver.line(5), 1);
    assert_eq!(resolver.line(6), 2);
    assert_eq!(resolver.line(11), 2);
    assert_eq!(resolver.line(12), 3);
    assert_eq!(resolver.line(13), 4);
    assert_eq!(resolver.line(15), 4);

    assert_eq!(
        resolver.location(&(7..9)),
        Location {
            file: "foo.proto".to_owned(),
            line: 2,
        }
    );
}
