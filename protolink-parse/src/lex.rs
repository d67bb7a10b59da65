//! Tokenizer for protobuf source files.

use std::{borrow::Cow, fmt};

use logos::{skip, Lexer, Logos};

use crate::error::ParseErrorKind;

#[derive(Debug, Clone, Logos, PartialEq)]
#[logos(extras = TokenExtras)]
#[logos(subpattern exponent = r"[eE][+\-]?[0-9]+")]
pub(crate) enum Token<'a> {
    #[regex("[A-Za-z_][A-Za-z0-9_]*")]
    Ident(&'a str),
    #[regex("0[0-7]*|[1-9][0-9]*|0[xX][0-9A-Fa-f]+", int)]
    IntLiteral(u64),
    #[regex(
        r#"[0-9]+\.[0-9]*(?&exponent)?|[0-9]+(?&exponent)|\.[0-9]+(?&exponent)?"#,
        float
    )]
    FloatLiteral(f64),
    #[regex(r#"["']"#, string)]
    StringLiteral(String),
    #[token(".")]
    Dot,
    #[token("-")]
    Minus,
    #[token("+")]
    Plus,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token("<")]
    LeftAngleBracket,
    #[token(">")]
    RightAngleBracket,
    #[token(",")]
    Comma,
    #[token("=")]
    Equals,
    #[token(";")]
    Semicolon,
    #[regex(r#"//[^\n]*"#, line_comment)]
    LineComment(Cow<'a, str>),
    #[token(r#"/*"#, block_comment)]
    BlockComment(Cow<'a, str>),
    #[error]
    #[regex(r"[\t\v\f\r\n ]+", skip)]
    Error,
}

impl<'a> Token<'a> {
    fn punctuation(&self) -> Option<&'static str> {
        Some(match self {
            Token::Dot => ".",
            Token::Minus => "-",
            Token::Plus => "+",
            Token::LeftParen => "(",
            Token::RightParen => ")",
            Token::LeftBrace => "{",
            Token::RightBrace => "}",
            Token::LeftBracket => "[",
            Token::RightBracket => "]",
            Token::LeftAngleBracket => "<",
            Token::RightAngleBracket => ">",
            Token::Comma => ",",
            Token::Equals => "=",
            Token::Semicolon => ";",
            _ => return None,
        })
    }
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(punctuation) = self.punctuation() {
            return f.write_str(punctuation);
        }

        match self {
            Token::Ident(value) => f.write_str(value),
            Token::IntLiteral(value) => write!(f, "{}", value),
            Token::FloatLiteral(value) if value.fract() == 0.0 => write!(f, "{:.1}", value),
            Token::FloatLiteral(value) => write!(f, "{}", value),
            Token::StringLiteral(value) => write!(f, "{:?}", value),
            Token::LineComment(value) => write!(f, "//{}", value),
            Token::BlockComment(value) => write!(f, "/*{}*/", value),
            _ => f.write_str("<ERROR>"),
        }
    }
}

/// Errors found while lexing, collected alongside the token stream.
#[derive(Default)]
pub(crate) struct TokenExtras {
    pub errors: Vec<ParseErrorKind>,
}

fn int<'a>(lex: &mut Lexer<'a, Token<'a>>) -> u64 {
    let slice = lex.slice();
    let (digits, radix) = if let Some(hex) = slice
        .strip_prefix("0x")
        .or_else(|| slice.strip_prefix("0X"))
    {
        (hex, 16)
    } else if slice.len() > 1 && slice.starts_with('0') {
        (&slice[1..], 8)
    } else {
        (slice, 10)
    };

    // An identifier directly after a number, as in `10bar`.
    let remainder = lex.remainder().as_bytes();
    if matches!(remainder.first(), Some(ch) if ch.is_ascii_alphabetic() || *ch == b'_') {
        let len = remainder
            .iter()
            .take_while(|ch| ch.is_ascii_alphanumeric() || **ch == b'_')
            .count();
        lex.extras
            .errors
            .push(ParseErrorKind::NoSpaceBetweenIntAndIdent {
                span: lex.span().start..lex.span().end + len,
            });
    }

    match u64::from_str_radix(digits, radix) {
        Ok(value) => value,
        Err(_) => {
            let start = lex.span().end - digits.len();
            lex.extras.errors.push(ParseErrorKind::IntegerOutOfRange {
                span: start..lex.span().end,
            });
            0
        }
    }
}

fn float<'a>(lex: &mut Lexer<'a, Token<'a>>) -> f64 {
    lex.slice().parse().unwrap_or_else(|_| {
        lex.extras
            .errors
            .push(ParseErrorKind::InvalidToken { span: lex.span() });
        0.0
    })
}

/// A decoded escape sequence.
enum Escape {
    Byte(u8),
    Char(char),
}

/// Decodes the escape sequence following a backslash, returning it with the number of bytes it
/// spans after the backslash.
fn escape(bytes: &[u8]) -> Option<(Escape, usize)> {
    fn count(bytes: &[u8], max: usize, pred: fn(&u8) -> bool) -> usize {
        bytes.iter().take(max).take_while(|&ch| pred(ch)).count()
    }

    fn number(digits: &[u8], radix: u32) -> Option<u32> {
        u32::from_str_radix(std::str::from_utf8(digits).ok()?, radix).ok()
    }

    let (&kind, rest) = bytes.split_first()?;
    let byte = match kind {
        b'x' | b'X' => {
            let len = count(rest, 2, u8::is_ascii_hexdigit);
            if len == 0 {
                return None;
            }
            let value = number(&rest[..len], 16)?;
            return Some((Escape::Byte(u8::try_from(value).ok()?), len + 1));
        }
        b'0'..=b'7' => {
            let len = 1 + count(rest, 2, |ch| matches!(ch, b'0'..=b'7'));
            let value = number(&bytes[..len], 8)?;
            return Some((Escape::Byte(u8::try_from(value).ok()?), len));
        }
        b'u' | b'U' => {
            let len = if kind == b'u' { 4 } else { 8 };
            if count(rest, len, u8::is_ascii_hexdigit) != len {
                return None;
            }
            let ch = char::from_u32(number(&rest[..len], 16)?)?;
            return Some((Escape::Char(ch), len + 1));
        }
        b'a' => b'\x07',
        b'b' => b'\x08',
        b'f' => b'\x0c',
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b'v' => b'\x0b',
        b'?' | b'\\' | b'\'' | b'"' => kind,
        _ => return None,
    };
    Some((Escape::Byte(byte), 1))
}

fn string<'a>(lex: &mut Lexer<'a, Token<'a>>) -> String {
    let quote = lex.slice().as_bytes()[0];
    let offset = lex.span().end;
    let bytes = lex.remainder().as_bytes();

    let mut value = Vec::new();
    let mut errors = Vec::new();
    let mut pos = 0;
    let len = loop {
        match bytes.get(pos) {
            None => {
                errors.push(ParseErrorKind::UnexpectedEof {
                    expected: "string terminator".to_owned(),
                });
                break pos;
            }
            Some(&ch) if ch == quote => break pos + 1,
            Some(b'\n') => {
                errors.push(ParseErrorKind::UnterminatedString {
                    span: offset + pos..offset + pos + 1,
                });
                break pos + 1;
            }
            Some(b'\\') => match escape(&bytes[pos + 1..]) {
                Some((Escape::Byte(byte), len)) => {
                    value.push(byte);
                    pos += len + 1;
                }
                Some((Escape::Char(ch), len)) => {
                    value.extend_from_slice(ch.encode_utf8(&mut [0; 4]).as_bytes());
                    pos += len + 1;
                }
                None => {
                    errors.push(ParseErrorKind::InvalidStringEscape {
                        span: offset + pos..offset + pos + 1,
                    });
                    pos += 1;
                }
            },
            Some(0) => {
                let run = bytes[pos..].iter().take_while(|&&ch| ch == 0).count();
                errors.push(ParseErrorKind::InvalidStringCharacters {
                    span: offset + pos..offset + pos + run,
                });
                pos += run;
            }
            Some(&ch) => {
                value.push(ch);
                pos += 1;
            }
        }
    };

    let start = lex.span().start;
    lex.bump(len);
    lex.extras.errors.extend(errors);

    String::from_utf8(value).unwrap_or_else(|err| {
        lex.extras.errors.push(ParseErrorKind::InvalidUtf8String {
            span: start..lex.span().end,
        });
        String::from_utf8_lossy(err.as_bytes()).into_owned()
    })
}

fn line_comment<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Cow<'a, str> {
    let content = &lex.slice()[2..];
    Cow::Borrowed(content.strip_suffix('\r').unwrap_or(content))
}

fn block_comment<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Cow<'a, str> {
    let remainder = lex.remainder();
    let content = match remainder.find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            &remainder[..end]
        }
        None => {
            lex.extras.errors.push(ParseErrorKind::UnexpectedEof {
                expected: "comment terminator".to_owned(),
            });
            lex.bump(remainder.len());
            remainder
        }
    };

    if let Some(nested) = content.find("/*") {
        let start = lex.span().start + 2 + nested;
        lex.extras
            .errors
            .push(ParseErrorKind::NestedBlockComment {
                span: start..start + 2,
            });
    }

    if !content.contains('\n') {
        return Cow::Borrowed(content);
    }

    // Continuation lines lose their indentation and any leading `*`.
    let lines: Vec<&str> = content
        .lines()
        .enumerate()
        .map(|(index, line)| {
            if index == 0 {
                line
            } else {
                let line = line.trim_start();
                line.strip_prefix('*').unwrap_or(line)
            }
        })
        .collect();
    Cow::Owned(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn lex(source: &str) -> (Vec<Token<'_>>, Vec<ParseErrorKind>) {
        let mut lexer = Token::lexer(source);
        let tokens = lexer.by_ref().collect();
        (tokens, lexer.extras.errors)
    }

    #[test]
    fn numbers() {
        let (tokens, errors) = lex("0 017 255 0xff 0XFF 1.5 3. .25 6e2 1.5E-1 0.0");
        assert_eq!(
            tokens,
            vec![
                Token::IntLiteral(0),
                Token::IntLiteral(15),
                Token::IntLiteral(255),
                Token::IntLiteral(255),
                Token::IntLiteral(255),
                Token::FloatLiteral(1.5),
                Token::FloatLiteral(3.0),
                Token::FloatLiteral(0.25),
                Token::FloatLiteral(600.0),
                Token::FloatLiteral(0.15),
                Token::FloatLiteral(0.0),
            ]
        );
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn identifiers_and_punctuation() {
        let (tokens, errors) = lex("map<string, .pkg.Foo> f = -1;");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("map"),
                Token::LeftAngleBracket,
                Token::Ident("string"),
                Token::Comma,
                Token::Dot,
                Token::Ident("pkg"),
                Token::Dot,
                Token::Ident("Foo"),
                Token::RightAngleBracket,
                Token::Ident("f"),
                Token::Equals,
                Token::Minus,
                Token::IntLiteral(1),
                Token::Semicolon,
            ]
        );
        assert_eq!(errors, vec![]);
        assert_eq!(Token::LeftBrace.to_string(), "{");
        assert_eq!(Token::FloatLiteral(2.0).to_string(), "2.0");
    }

    #[test]
    fn integer_overflow() {
        let (tokens, errors) = lex("0x10000000000000000 7");
        assert_eq!(tokens, vec![Token::IntLiteral(0), Token::IntLiteral(7)]);
        assert_eq!(
            errors,
            vec![ParseErrorKind::IntegerOutOfRange { span: 2..19 }]
        );
    }

    #[test]
    fn int_followed_by_ident() {
        let (tokens, errors) = lex("x = 12ab_3;");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("x"),
                Token::Equals,
                Token::IntLiteral(12),
                Token::Ident("ab_3"),
                Token::Semicolon,
            ]
        );
        assert_eq!(
            errors,
            vec![ParseErrorKind::NoSpaceBetweenIntAndIdent { span: 4..10 }]
        );
    }

    #[test]
    fn invalid_token() {
        let (tokens, _) = lex("a # b");
        assert_eq!(
            tokens,
            vec![Token::Ident("a"), Token::Error, Token::Ident("b")]
        );
    }

    #[test]
    fn string_escapes() {
        let (tokens, errors) = lex(r#""tab\tquote\"nul\0oct\101hex\x41" 'single "double"'"#);
        assert_eq!(
            tokens,
            vec![
                Token::StringLiteral("tab\tquote\"nul\0octAhexA".to_owned()),
                Token::StringLiteral("single \"double\"".to_owned()),
            ]
        );
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn string_unicode_escapes() {
        let (tokens, errors) = lex(r#"'café \U0001F980'"#);
        assert_eq!(tokens, vec![Token::StringLiteral("café 🦀".to_owned())]);
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn invalid_string_escapes() {
        let (tokens, errors) = lex(r#""a\qb\400" x"#);
        assert_eq!(
            tokens,
            vec![
                Token::StringLiteral("aqb400".to_owned()),
                Token::Ident("x"),
            ]
        );
        assert_eq!(
            errors,
            vec![
                ParseErrorKind::InvalidStringEscape { span: 2..3 },
                ParseErrorKind::InvalidStringEscape { span: 5..6 },
            ]
        );
    }

    #[test]
    fn string_nul_characters() {
        let (tokens, errors) = lex("\"a\0\0b\"");
        assert_eq!(tokens, vec![Token::StringLiteral("ab".to_owned())]);
        assert_eq!(
            errors,
            vec![ParseErrorKind::InvalidStringCharacters { span: 2..4 }]
        );
    }

    #[test]
    fn string_invalid_utf8() {
        let (tokens, errors) = lex(r#"x '\xc3('"#);
        assert_eq!(tokens.len(), 2);
        assert_eq!(
            errors,
            vec![ParseErrorKind::InvalidUtf8String { span: 2..9 }]
        );
    }

    #[test]
    fn unterminated_string() {
        let (tokens, errors) = lex("'abc\ndef");
        assert_eq!(
            tokens,
            vec![
                Token::StringLiteral("abc".to_owned()),
                Token::Ident("def"),
            ]
        );
        assert_eq!(
            errors,
            vec![ParseErrorKind::UnterminatedString { span: 4..5 }]
        );

        let (_, errors) = lex("'abc");
        assert_eq!(
            errors,
            vec![ParseErrorKind::UnexpectedEof {
                expected: "string terminator".to_owned()
            }]
        );
    }

    #[test]
    fn comments() {
        let (tokens, errors) = lex("a // line\r\nb /* block */ c /*\n  * one\n  two */");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("a"),
                Token::LineComment(" line".into()),
                Token::Ident("b"),
                Token::BlockComment(" block ".into()),
                Token::Ident("c"),
                Token::BlockComment("\n one\ntwo ".into()),
            ]
        );
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn nested_block_comment() {
        let (_, errors) = lex("x /* a /* b */");
        assert_eq!(
            errors,
            vec![ParseErrorKind::NestedBlockComment { span: 7..9 }]
        );
    }

    #[test]
    fn unterminated_block_comment() {
        let (tokens, errors) = lex("x /* never closed");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("x"),
                Token::BlockComment(" never closed".into()),
            ]
        );
        assert_eq!(
            errors,
            vec![ParseErrorKind::UnexpectedEof {
                expected: "comment terminator".to_owned()
            }]
        );
    }

    proptest! {
        #[test]
        fn prop_identifier(s in "[A-Za-z_][A-Za-z0-9_]{0,32}") {
            let (tokens, errors) = lex(&s);
            prop_assert_eq!(tokens, vec![Token::Ident(&s)]);
            prop_assert!(errors.is_empty());
        }

        #[test]
        fn prop_decimal(value in 1u64..) {
            let source = value.to_string();
            let (tokens, errors) = lex(&source);
            prop_assert_eq!(tokens, vec![Token::IntLiteral(value)]);
            prop_assert!(errors.is_empty());
        }

        #[test]
        fn prop_hex(value: u64) {
            let source = format!("0x{:x}", value);
            let (tokens, errors) = lex(&source);
            prop_assert_eq!(tokens, vec![Token::IntLiteral(value)]);
            prop_assert!(errors.is_empty());
        }

        #[test]
        fn prop_plain_string(s in "[a-zA-Z0-9 _.,;:!?-]{0,40}") {
            let source = format!("\"{}\"", s);
            let (tokens, errors) = lex(&source);
            prop_assert_eq!(tokens, vec![Token::StringLiteral(s)]);
            prop_assert!(errors.is_empty());
        }
    }
}
