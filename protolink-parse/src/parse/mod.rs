use std::{borrow::Cow, fmt::Write, iter::once};

use logos::{Lexer, Logos, Span};

use crate::{ast, error::ParseErrorKind, lex::Token, MAX_MESSAGE_FIELD_NUMBER};


pub(crate) fn parse_file(source: &str) -> Result<ast::File, Vec<ParseErrorKind>> {
    let mut parser = Parser::new(source);
    let file = parser.parse_file();
    if parser.lexer.extras.errors.is_empty() {
        Ok(file)
    } else {
        Err(parser.lexer.extras.errors)
    }
}

struct Parser<'a> {
    lexer: Lexer<'a, Token<'a>>,
    peek: Option<(Token<'a>, Span)>,
    comments: Vec<Cow<'a, str>>,
    last_end: usize,
    syntax: ast::Syntax,
}

enum Statement {
    Empty,
    Package(ast::Package),
    Import(ast::Import),
    Option(ast::OptionBody),
    Item(ast::FileItem),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldContext {
    Message,
    Oneof,
    Extend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeContext {
    Message,
    Enum,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Parser {
            lexer: Token::lexer(source),
            peek: None,
            comments: Vec::new(),
            last_end: 0,
            syntax: ast::Syntax::default(),
        }
    }

    fn parse_file(&mut self) -> ast::File {
        let mut syntax_span = None;
        if let Some((Token::Ident("syntax"), _)) = self.peek() {
            match self.parse_syntax() {
                Ok((syntax, span)) => {
                    self.syntax = syntax;
                    syntax_span = Some(span);
                }
                Err(()) => self.skip_until(is_statement_start),
            }
        }

        let mut package: Option<ast::Package> = None;
        let mut imports = Vec::new();
        let mut options = Vec::new();
        let mut items = Vec::new();

        loop {
            match self.parse_statement() {
                Ok(Some(Statement::Empty)) => continue,
                Ok(Some(Statement::Package(next))) => {
                    if let Some(first) = &package {
                        self.add_error(ParseErrorKind::DuplicatePackage {
                            first: first.span.clone(),
                            second: next.span,
                        });
                    } else {
                        package = Some(next);
                    }
                }
                Ok(Some(Statement::Import(import))) => imports.push(import),
                Ok(Some(Statement::Option(option))) => options.push(option),
                Ok(Some(Statement::Item(item))) => items.push(item),
                Ok(None) => break,
                Err(()) => self.skip_until(is_statement_start),
            }
        }

        ast::File {
            syntax: self.syntax,
            syntax_span,
            package,
            imports,
            options,
            items,
        }
    }

    fn parse_syntax(&mut self) -> Result<(ast::Syntax, Span), ()> {
        let start = self.expect_eq(Token::Ident("syntax"))?;
        self.expect_eq(Token::Equals)?;

        let syntax = match self.peek() {
            Some((Token::StringLiteral(value), span)) => {
                self.bump();
                match value.as_str() {
                    "proto2" => ast::Syntax::Proto2,
                    "proto3" => ast::Syntax::Proto3,
                    _ => {
                        self.add_error(ParseErrorKind::UnknownSyntax {
                            syntax: value,
                            span,
                        });
                        ast::Syntax::Proto2
                    }
                }
            }
            _ => self.unexpected_token("a string literal")?,
        };

        self.expect_eq(Token::Semicolon)?;
        Ok((syntax, self.span_from(start.start)))
    }

    fn parse_statement(&mut self) -> Result<Option<Statement>, ()> {
        match self.peek() {
            Some((Token::Semicolon, _)) => {
                self.bump();
                Ok(Some(Statement::Empty))
            }
            Some((Token::Ident("import"), _)) => Ok(Some(Statement::Import(self.parse_import()?))),
            Some((Token::Ident("package"), _)) => {
                Ok(Some(Statement::Package(self.parse_package()?)))
            }
            Some((Token::Ident("option"), _)) => Ok(Some(Statement::Option(self.parse_option()?))),
            Some((Token::Ident("extend"), _)) => Ok(Some(Statement::Item(ast::FileItem::Extend(
                self.parse_extend()?,
            )))),
            Some((Token::Ident("message"), _)) => Ok(Some(Statement::Item(
                ast::FileItem::Message(self.parse_message()?),
            ))),
            Some((Token::Ident("enum"), _)) => Ok(Some(Statement::Item(ast::FileItem::Enum(
                self.parse_enum()?,
            )))),
            Some((Token::Ident("service"), _)) => Ok(Some(Statement::Item(
                ast::FileItem::Service(self.parse_service()?),
            ))),
            None => Ok(None),
            _ => self.unexpected_token(
                "'enum', 'extend', 'import', 'message', 'option', 'service', 'package' or ';'",
            ),
        }
    }

    fn parse_package(&mut self) -> Result<ast::Package, ()> {
        let start = self.expect_eq(Token::Ident("package"))?;

        let name = self.parse_full_ident(&[Token::Semicolon])?;

        self.expect_eq(Token::Semicolon)?;

        Ok(ast::Package {
            name,
            span: self.span_from(start.start),
        })
    }

    fn parse_import(&mut self) -> Result<ast::Import, ()> {
        let start = self.expect_eq(Token::Ident("import"))?;

        let kind = match self.peek() {
            Some((Token::Ident("weak"), _)) => {
                self.bump();
                Some(ast::ImportKind::Weak)
            }
            Some((Token::Ident("public"), _)) => {
                self.bump();
                Some(ast::ImportKind::Public)
            }
            Some((Token::StringLiteral(_), _)) => None,
            _ => self.unexpected_token("a string literal, 'public' or 'weak'")?,
        };

        let (value, value_span) = self.parse_string()?;
        if !is_valid_import(&value) {
            self.add_error(ParseErrorKind::InvalidImport {
                span: value_span.clone(),
            });
        }

        self.expect_eq(Token::Semicolon)?;

        Ok(ast::Import {
            kind,
            value,
            value_span,
            span: self.span_from(start.start),
        })
    }

    fn parse_message(&mut self) -> Result<ast::Message, ()> {
        let comments = self.take_comments();
        let start = self.expect_eq(Token::Ident("message"))?;

        let name = self.parse_ident()?;

        let body = self.parse_message_body()?;

        Ok(ast::Message {
            name,
            body,
            comments,
            span: self.span_from(start.start),
        })
    }

    fn parse_message_body(&mut self) -> Result<ast::MessageBody, ()> {
        let mut body = ast::MessageBody::default();

        self.expect_eq(Token::LeftBrace)?;

        loop {
            match self.peek() {
                Some((Token::Ident("message"), _)) => body
                    .items
                    .push(ast::MessageItem::Message(self.parse_message()?)),
                Some((Token::Ident("enum"), _)) => {
                    body.items.push(ast::MessageItem::Enum(self.parse_enum()?))
                }
                Some((Token::Ident("extend"), _)) => body
                    .items
                    .push(ast::MessageItem::Extend(self.parse_extend()?)),
                Some((Token::Ident("oneof"), _)) => body
                    .items
                    .push(ast::MessageItem::Oneof(self.parse_oneof()?)),
                Some((Token::Ident("option"), _)) => body.options.push(self.parse_option()?),
                Some((Token::Ident("reserved"), _)) => {
                    body.reserved.push(self.parse_reserved(RangeContext::Message)?)
                }
                Some((Token::Ident("extensions"), _)) => {
                    body.extensions.push(self.parse_extension_ranges()?)
                }
                Some((Token::Ident(_) | Token::Dot, _)) => body
                    .items
                    .push(ast::MessageItem::Field(self.parse_field(FieldContext::Message)?)),
                Some((Token::Semicolon, _)) => {
                    self.bump();
                    continue;
                }
                Some((Token::RightBrace, _)) => {
                    self.bump();
                    break;
                }
                _ => self.unexpected_token(
                    "a message field, oneof, reserved range, enum, message or '}'",
                )?,
            }
        }

        Ok(body)
    }

    fn parse_field(&mut self, context: FieldContext) -> Result<ast::Field, ()> {
        let comments = self.take_comments();

        let label = match self.peek() {
            Some((Token::Ident("optional"), span)) => {
                self.bump();
                Some((ast::FieldLabel::Optional, span))
            }
            Some((Token::Ident("required"), span)) => {
                self.bump();
                Some((ast::FieldLabel::Required, span))
            }
            Some((Token::Ident("repeated"), span)) => {
                self.bump();
                Some((ast::FieldLabel::Repeated, span))
            }
            Some((Token::Ident(_) | Token::Dot, _)) => None,
            _ => self.unexpected_token("a message field")?,
        };

        let start = match (&label, self.peek()) {
            (Some((_, span)), _) => span.start,
            (None, Some((_, span))) => span.start,
            (None, None) => self.last_end,
        };

        if let Some((label, span)) = &label {
            match (context, label) {
                (FieldContext::Oneof, _) => {
                    self.add_error(ParseErrorKind::OneofFieldWithLabel { span: span.clone() })
                }
                (FieldContext::Extend, ast::FieldLabel::Required) => {
                    self.add_error(ParseErrorKind::RequiredExtendField { span: span.clone() })
                }
                (_, ast::FieldLabel::Required) if self.syntax == ast::Syntax::Proto3 => {
                    self.add_error(ParseErrorKind::Proto3RequiredField { span: span.clone() })
                }
                _ => (),
            }
        }

        let ty = match self.peek() {
            Some((Token::Ident("group"), span)) => {
                self.add_error(ParseErrorKind::GroupNotSupported { span });
                return Err(());
            }
            Some((Token::Ident("map"), span)) => {
                self.bump();
                if let Some((Token::LeftAngleBracket, _)) = self.peek() {
                    let ty = self.parse_map_type(span.start)?;
                    if let Some((_, label_span)) = &label {
                        self.add_error(ParseErrorKind::MapFieldWithLabel {
                            span: label_span.clone(),
                        });
                    }
                    match context {
                        FieldContext::Message => (),
                        FieldContext::Oneof => self.add_error(ParseErrorKind::InvalidMapField {
                            kind: "oneofs",
                            span: span.start..self.last_end,
                        }),
                        FieldContext::Extend => self.add_error(ParseErrorKind::InvalidMapField {
                            kind: "extensions",
                            span: span.start..self.last_end,
                        }),
                    }
                    ty
                } else {
                    let first = ast::Ident {
                        value: "map".to_owned(),
                        span,
                    };
                    ast::FieldType::Named(ast::TypeName {
                        leading_dot: None,
                        name: self.parse_full_ident_from(first, &[Token::Ident("")])?,
                    })
                }
            }
            _ => ast::FieldType::Named(self.parse_type_name(&[Token::Ident("")])?),
        };

        let name = self.parse_ident()?;

        self.expect_eq(Token::Equals)?;

        let number = self.parse_field_number()?;

        let options = match self.peek() {
            Some((Token::LeftBracket, _)) => {
                let options = self.parse_options_list()?;
                self.expect_eq(Token::Semicolon)?;
                options
            }
            Some((Token::Semicolon, _)) => {
                self.bump();
                vec![]
            }
            _ => self.unexpected_token("';' or '['")?,
        };

        Ok(ast::Field {
            label,
            ty,
            name,
            number,
            options,
            comments,
            span: self.span_from(start),
        })
    }

    fn parse_map_type(&mut self, start: usize) -> Result<ast::FieldType, ()> {
        self.expect_eq(Token::LeftAngleBracket)?;
        let key = self.parse_type_name(&[Token::Comma])?;
        self.expect_eq(Token::Comma)?;
        let value = self.parse_type_name(&[Token::RightAngleBracket])?;
        self.expect_eq(Token::RightAngleBracket)?;

        Ok(ast::FieldType::Map {
            key,
            value,
            span: self.span_from(start),
        })
    }

    fn parse_oneof(&mut self) -> Result<ast::Oneof, ()> {
        let comments = self.take_comments();
        let start = self.expect_eq(Token::Ident("oneof"))?;

        let name = self.parse_ident()?;

        self.expect_eq(Token::LeftBrace)?;

        let mut fields = Vec::new();
        let mut options = Vec::new();
        loop {
            match self.peek() {
                Some((Token::Ident("option"), _)) => options.push(self.parse_option()?),
                Some((Token::Ident(_) | Token::Dot, _)) => {
                    fields.push(self.parse_field(FieldContext::Oneof)?)
                }
                Some((Token::Semicolon, _)) => {
                    self.bump();
                    continue;
                }
                Some((Token::RightBrace, _)) => {
                    self.bump();
                    break;
                }
                _ => self.unexpected_token("a message field, option or '}'")?,
            }
        }

        let span = self.span_from(start.start);
        if fields.is_empty() {
            self.add_error(ParseErrorKind::EmptyOneof { span: span.clone() });
        }

        Ok(ast::Oneof {
            name,
            fields,
            options,
            comments,
            span,
        })
    }

    fn parse_extend(&mut self) -> Result<ast::Extend, ()> {
        let comments = self.take_comments();
        let start = self.expect_eq(Token::Ident("extend"))?;

        let extendee = self.parse_type_name(&[Token::LeftBrace])?;

        self.expect_eq(Token::LeftBrace)?;

        let mut fields = Vec::new();
        loop {
            match self.peek() {
                Some((Token::Ident(_) | Token::Dot, _)) => {
                    fields.push(self.parse_field(FieldContext::Extend)?);
                }
                Some((Token::Semicolon, _)) => {
                    self.bump();
                    continue;
                }
                Some((Token::RightBrace, _)) => {
                    self.bump();
                    break;
                }
                _ => self.unexpected_token("a message field, '}' or ';'")?,
            }
        }

        Ok(ast::Extend {
            extendee,
            fields,
            comments,
            span: self.span_from(start.start),
        })
    }

    fn parse_service(&mut self) -> Result<ast::Service, ()> {
        let comments = self.take_comments();
        let start = self.expect_eq(Token::Ident("service"))?;

        let name = self.parse_ident()?;

        self.expect_eq(Token::LeftBrace)?;

        let mut options = Vec::new();
        let mut methods = Vec::new();

        loop {
            match self.peek() {
                Some((Token::Ident("rpc"), _)) => {
                    methods.push(self.parse_method()?);
                }
                Some((Token::Ident("option"), _)) => {
                    options.push(self.parse_option()?);
                }
                Some((Token::Semicolon, _)) => {
                    self.bump();
                    continue;
                }
                Some((Token::RightBrace, _)) => {
                    self.bump();
                    break;
                }
                _ => self.unexpected_token("'rpc', '}', 'option' or ';'")?,
            }
        }

        Ok(ast::Service {
            name,
            methods,
            options,
            comments,
            span: self.span_from(start.start),
        })
    }

    fn parse_method(&mut self) -> Result<ast::Method, ()> {
        let comments = self.take_comments();
        let start = self.expect_eq(Token::Ident("rpc"))?;

        let name = self.parse_ident()?;

        self.expect_eq(Token::LeftParen)?;
        let client_streaming = self.parse_stream()?;
        let input_ty = self.parse_type_name(&[Token::RightParen])?;
        self.expect_eq(Token::RightParen)?;

        self.expect_eq(Token::Ident("returns"))?;

        self.expect_eq(Token::LeftParen)?;
        let server_streaming = self.parse_stream()?;
        let output_ty = self.parse_type_name(&[Token::RightParen])?;
        self.expect_eq(Token::RightParen)?;

        let mut options = Vec::new();
        match self.peek() {
            Some((Token::Semicolon, _)) => {
                self.bump();
            }
            Some((Token::LeftBrace, _)) => {
                self.bump();
                loop {
                    match self.peek() {
                        Some((Token::Ident("option"), _)) => {
                            options.push(self.parse_option()?);
                        }
                        Some((Token::RightBrace, _)) => {
                            self.bump();
                            break;
                        }
                        Some((Token::Semicolon, _)) => {
                            self.bump();
                            continue;
                        }
                        _ => self.unexpected_token("'option', '}' or ';'")?,
                    }
                }
            }
            _ => self.unexpected_token("';' or '{'")?,
        }

        Ok(ast::Method {
            name,
            input_ty,
            output_ty,
            client_streaming,
            server_streaming,
            options,
            comments,
            span: self.span_from(start.start),
        })
    }

    fn parse_stream(&mut self) -> Result<bool, ()> {
        match self.peek() {
            Some((Token::Ident("stream"), _)) => {
                self.bump();
                Ok(true)
            }
            Some((Token::Dot | Token::Ident(_), _)) => Ok(false),
            _ => self.unexpected_token("'stream' or a type name"),
        }
    }

    fn parse_enum(&mut self) -> Result<ast::Enum, ()> {
        let comments = self.take_comments();
        let start = self.expect_eq(Token::Ident("enum"))?;

        let name = self.parse_ident()?;

        self.expect_eq(Token::LeftBrace)?;

        let mut values = Vec::new();
        let mut options = Vec::new();
        let mut reserved = Vec::new();

        loop {
            match self.peek() {
                Some((Token::Ident("option"), _)) => {
                    options.push(self.parse_option()?);
                }
                Some((Token::Ident("reserved"), _)) => {
                    reserved.push(self.parse_reserved(RangeContext::Enum)?);
                }
                Some((Token::Semicolon, _)) => {
                    self.bump();
                }
                Some((Token::Ident(_), _)) => {
                    values.push(self.parse_enum_value()?);
                }
                Some((Token::RightBrace, _)) => {
                    self.bump();
                    break;
                }
                _ => self.unexpected_token("an identifier, '}', ';' or 'option'")?,
            };
        }

        Ok(ast::Enum {
            name,
            values,
            options,
            reserved,
            comments,
            span: self.span_from(start.start),
        })
    }

    fn parse_enum_value(&mut self) -> Result<ast::EnumValue, ()> {
        let comments = self.take_comments();
        let name = self.parse_ident()?;

        self.expect_eq(Token::Equals)?;

        let number = self.parse_int()?;
        if !is_valid_enum_number(&number) {
            self.add_error(ParseErrorKind::InvalidEnumNumber {
                span: number.span.clone(),
            });
        }

        let options = match self.peek() {
            Some((Token::Semicolon, _)) => vec![],
            Some((Token::LeftBracket, _)) => self.parse_options_list()?,
            _ => self.unexpected_token("';' or '['")?,
        };

        self.expect_eq(Token::Semicolon)?;

        Ok(ast::EnumValue {
            span: self.span_from(name.span.start),
            name,
            number,
            options,
            comments,
        })
    }

    fn parse_reserved(&mut self, context: RangeContext) -> Result<ast::Reserved, ()> {
        self.expect_eq(Token::Ident("reserved"))?;

        match self.peek() {
            Some((Token::IntLiteral(_) | Token::Minus, _)) => {
                let ranges = self.parse_ranges(context)?;
                self.expect_eq(Token::Semicolon)?;
                Ok(ast::Reserved::Ranges(ranges))
            }
            Some((Token::StringLiteral(_), _)) => {
                Ok(ast::Reserved::Names(self.parse_reserved_names()?))
            }
            _ => self.unexpected_token("a positive integer or string"),
        }
    }

    fn parse_extension_ranges(&mut self) -> Result<ast::ExtensionRanges, ()> {
        let start = self.expect_eq(Token::Ident("extensions"))?;

        let ranges = self.parse_ranges(RangeContext::Message)?;

        let options = match self.peek() {
            Some((Token::LeftBracket, _)) => self.parse_options_list()?,
            _ => vec![],
        };

        self.expect_eq(Token::Semicolon)?;

        Ok(ast::ExtensionRanges {
            ranges,
            options,
            span: self.span_from(start.start),
        })
    }

    fn parse_reserved_names(&mut self) -> Result<Vec<ast::Ident>, ()> {
        let mut names = vec![self.parse_ident_string()?];

        loop {
            match self.peek() {
                Some((Token::Comma, _)) => {
                    self.bump();
                    names.push(self.parse_ident_string()?);
                }
                Some((Token::Semicolon, _)) => {
                    self.bump();
                    break;
                }
                _ => self.unexpected_token("',' or ';'")?,
            }
        }

        Ok(names)
    }

    fn parse_ident_string(&mut self) -> Result<ast::Ident, ()> {
        let (value, span) = self.parse_string()?;
        if !is_valid_ident(&value) {
            self.add_error(ParseErrorKind::InvalidIdentifier { span: span.clone() })
        }
        Ok(ast::Ident { value, span })
    }

    fn parse_ranges(&mut self, context: RangeContext) -> Result<Vec<ast::Range>, ()> {
        let mut ranges = vec![self.parse_range(context)?];

        while let Some((Token::Comma, _)) = self.peek() {
            self.bump();
            ranges.push(self.parse_range(context)?);
        }

        Ok(ranges)
    }

    fn parse_range(&mut self, context: RangeContext) -> Result<ast::Range, ()> {
        let start = match context {
            RangeContext::Message => self.parse_field_number()?,
            RangeContext::Enum => self.parse_enum_number()?,
        };

        let end = match self.peek() {
            Some((Token::Ident("to"), _)) => {
                self.bump();
                match self.peek() {
                    Some((Token::Ident("max"), span)) => {
                        self.bump();
                        ast::RangeEnd::Max(span)
                    }
                    _ => ast::RangeEnd::Int(match context {
                        RangeContext::Message => self.parse_field_number()?,
                        RangeContext::Enum => self.parse_enum_number()?,
                    }),
                }
            }
            _ => ast::RangeEnd::None,
        };

        if let ast::RangeEnd::Int(end) = &end {
            if int_value(end) < int_value(&start) {
                self.add_error(ParseErrorKind::InvalidRange {
                    span: start.span.start..end.span.end,
                });
            }
        }

        Ok(ast::Range { start, end })
    }

    fn parse_options_list(&mut self) -> Result<Vec<ast::OptionBody>, ()> {
        self.expect_eq(Token::LeftBracket)?;

        let mut options = vec![self.parse_option_body(&[Token::Comma, Token::RightBracket])?];
        loop {
            match self.peek() {
                Some((Token::Comma, _)) => {
                    self.bump();
                    options.push(self.parse_option_body(&[Token::Comma, Token::RightBracket])?);
                }
                Some((Token::RightBracket, _)) => {
                    self.bump();
                    break;
                }
                _ => self.unexpected_token("',' or ']'")?,
            }
        }

        Ok(options)
    }

    fn parse_option(&mut self) -> Result<ast::OptionBody, ()> {
        let start = self.expect_eq(Token::Ident("option"))?;

        let mut option = self.parse_option_body(&[Token::Semicolon])?;

        self.expect_eq(Token::Semicolon)?;

        option.span = self.span_from(start.start);
        Ok(option)
    }

    fn parse_option_body(&mut self, terminators: &[Token<'a>]) -> Result<ast::OptionBody, ()> {
        let start = match self.peek() {
            Some((_, span)) => span.start,
            None => self.last_end,
        };

        let mut name = String::new();
        self.parse_option_name_part(&mut name)?;
        let name_span = loop {
            match self.peek() {
                Some((Token::Dot, _)) => {
                    self.bump();
                    name.push('.');
                    self.parse_option_name_part(&mut name)?;
                }
                Some((Token::Equals, _)) => {
                    let name_span = self.span_from(start);
                    self.bump();
                    break name_span;
                }
                _ => self.unexpected_token("'.' or '='")?,
            }
        };

        let value = self.parse_constant(terminators)?;

        Ok(ast::OptionBody {
            name,
            name_span,
            value,
            span: self.span_from(start),
        })
    }

    fn parse_option_name_part(&mut self, name: &mut String) -> Result<(), ()> {
        match self.peek() {
            Some((Token::LeftParen, _)) => {
                self.bump();
                name.push('(');
                if let Some((Token::Dot, _)) = self.peek() {
                    self.bump();
                    name.push('.');
                }
                let ident = self.parse_full_ident(&[Token::RightParen])?;
                write!(name, "{}", ident).expect("writing to a string cannot fail");
                self.expect_eq(Token::RightParen)?;
                name.push(')');
                Ok(())
            }
            Some((Token::Ident(value), _)) => {
                self.bump();
                name.push_str(value);
                Ok(())
            }
            _ => self.unexpected_token("an identifier or '('"),
        }
    }

    fn parse_constant(&mut self, terminators: &[Token<'a>]) -> Result<ast::Constant, ()> {
        match self.peek() {
            Some((Token::Ident(_), _)) => Ok(ast::Constant::Ident(self.parse_full_ident(terminators)?)),
            Some((Token::Plus, span)) => {
                self.bump();
                self.parse_int_or_float(false, span.start)
            }
            Some((Token::Minus, span)) => {
                self.bump();
                self.parse_int_or_float(true, span.start)
            }
            Some((Token::IntLiteral(_) | Token::FloatLiteral(_), span)) => {
                self.parse_int_or_float(false, span.start)
            }
            Some((Token::StringLiteral(mut value), span)) => {
                self.bump();
                // Adjacent string literals are concatenated.
                while let Some((Token::StringLiteral(next), _)) = self.peek() {
                    self.bump();
                    value.push_str(&next);
                }
                Ok(ast::Constant::String {
                    value,
                    span: self.span_from(span.start),
                })
            }
            _ => self.unexpected_token("a constant"),
        }
    }

    fn parse_int_or_float(&mut self, negate: bool, start: usize) -> Result<ast::Constant, ()> {
        match self.peek() {
            Some((Token::IntLiteral(value), _)) => {
                self.bump();
                Ok(ast::Constant::Int(ast::Int {
                    negative: negate,
                    value,
                    span: self.span_from(start),
                }))
            }
            Some((Token::FloatLiteral(value), _)) => {
                self.bump();
                Ok(ast::Constant::Float {
                    value: if negate { -value } else { value },
                    span: self.span_from(start),
                })
            }
            Some((Token::Ident(ident @ ("inf" | "nan")), _)) => {
                self.bump();
                let value = if ident == "inf" {
                    f64::INFINITY
                } else {
                    f64::NAN
                };
                Ok(ast::Constant::Float {
                    value: if negate { -value } else { value },
                    span: self.span_from(start),
                })
            }
            _ => self.unexpected_token("a numeric literal"),
        }
    }

    fn parse_type_name(&mut self, terminators: &[Token<'a>]) -> Result<ast::TypeName, ()> {
        let leading_dot = match self.peek() {
            Some((Token::Dot, span)) => {
                self.bump();
                Some(span)
            }
            Some((Token::Ident(_), _)) => None,
            _ => self.unexpected_token("a type name")?,
        };

        let name = self.parse_full_ident(terminators)?;

        Ok(ast::TypeName { leading_dot, name })
    }

    fn parse_full_ident(&mut self, terminators: &[Token<'a>]) -> Result<ast::FullIdent, ()> {
        let first = self.parse_ident()?;
        self.parse_full_ident_from(first, terminators)
    }

    fn parse_full_ident_from(
        &mut self,
        first: ast::Ident,
        terminators: &[Token<'a>],
    ) -> Result<ast::FullIdent, ()> {
        let mut result = vec![first];

        loop {
            match self.peek() {
                Some((Token::Dot, _)) => {
                    self.bump();
                }
                Some((tok, _)) if is_terminator(&tok, terminators) => {
                    return Ok(result.into());
                }
                _ => self.unexpected_token(fmt_expected(
                    once(Token::Dot).chain(terminators.iter().cloned()),
                ))?,
            }

            result.push(self.parse_ident()?);
        }
    }

    fn parse_ident(&mut self) -> Result<ast::Ident, ()> {
        match self.peek() {
            Some((Token::Ident(value), span)) => {
                self.bump();
                Ok(ast::Ident {
                    value: value.to_owned(),
                    span,
                })
            }
            _ => self.unexpected_token("an identifier"),
        }
    }

    fn parse_field_number(&mut self) -> Result<ast::Int, ()> {
        let number = self.parse_positive_int()?;
        if number.value == 0 || number.value > MAX_MESSAGE_FIELD_NUMBER as u64 {
            self.add_error(ParseErrorKind::InvalidMessageNumber {
                span: number.span.clone(),
            });
        }
        Ok(number)
    }

    fn parse_enum_number(&mut self) -> Result<ast::Int, ()> {
        let number = self.parse_int()?;
        if !is_valid_enum_number(&number) {
            self.add_error(ParseErrorKind::InvalidEnumNumber {
                span: number.span.clone(),
            });
        }
        Ok(number)
    }

    fn parse_int(&mut self) -> Result<ast::Int, ()> {
        let start = match self.peek() {
            Some((Token::Minus, span)) => {
                self.bump();
                Some(span.start)
            }
            _ => None,
        };

        let mut int = self.parse_positive_int()?;
        if let Some(start) = start {
            int.negative = true;
            int.span = start..int.span.end;
        }
        Ok(int)
    }

    fn parse_positive_int(&mut self) -> Result<ast::Int, ()> {
        match self.peek() {
            Some((Token::IntLiteral(value), span)) => {
                self.bump();
                Ok(ast::Int {
                    negative: false,
                    value,
                    span,
                })
            }
            _ => self.unexpected_token("a positive integer"),
        }
    }

    fn parse_string(&mut self) -> Result<(String, Span), ()> {
        match self.peek() {
            Some((Token::StringLiteral(value), span)) => {
                self.bump();
                Ok((value, span))
            }
            _ => self.unexpected_token("a string literal"),
        }
    }

    fn expect_eq(&mut self, t: Token) -> Result<Span, ()> {
        match self.peek() {
            Some((tok, span)) if tok == t => {
                self.bump();
                Ok(span)
            }
            _ => self.unexpected_token(format!("'{}'", t)),
        }
    }

    fn take_comments(&mut self) -> Option<String> {
        self.peek();
        if self.comments.is_empty() {
            return None;
        }

        let comments: Vec<&str> = self.comments.iter().map(|c| c.trim()).collect();
        let result = comments.join("\n");
        self.comments.clear();
        Some(result)
    }

    fn skip_until(&mut self, f: impl Fn(&Token) -> bool) {
        while let Some((tok, _)) = self.peek() {
            if f(&tok) {
                break;
            }
            self.bump();
        }
    }

    fn bump(&mut self) -> (Token<'a>, Span) {
        let (tok, span) = self
            .peek
            .take()
            .expect("called bump without peek returning Some()");
        self.comments.clear();
        self.last_end = span.end;
        (tok, span)
    }

    fn peek(&mut self) -> Option<(Token<'a>, Span)> {
        if self.peek.is_none() {
            self.peek = self.next();
        }
        self.peek.clone()
    }

    fn next(&mut self) -> Option<(Token<'a>, Span)> {
        loop {
            match self.lexer.next() {
                Some(Token::LineComment(comment) | Token::BlockComment(comment)) => {
                    self.comments.push(comment);
                }
                Some(Token::Error) => {
                    let span = self.lexer.span();
                    self.add_error(ParseErrorKind::InvalidToken { span: span.clone() });
                    return Some((Token::Error, span));
                }
                Some(tok) => return Some((tok, self.lexer.span())),
                None => return None,
            }
        }
    }

    fn unexpected_token<T>(&mut self, expected: impl ToString) -> Result<T, ()> {
        match self.peek() {
            Some((Token::Error, _)) => Err(()),
            Some((found, span)) => {
                self.add_error(ParseErrorKind::UnexpectedToken {
                    expected: expected.to_string(),
                    found: found.to_string(),
                    span,
                });
                Err(())
            }
            None => {
                self.add_error(ParseErrorKind::UnexpectedEof {
                    expected: expected.to_string(),
                });
                Err(())
            }
        }
    }

    fn span_from(&self, start: usize) -> Span {
        start..self.last_end
    }

    fn add_error(&mut self, err: ParseErrorKind) {
        self.lexer.extras.errors.push(err);
    }
}

fn is_statement_start(tok: &Token) -> bool {
    matches!(
        tok,
        Token::Ident("enum" | "extend" | "import" | "message" | "option" | "service" | "package")
    )
}

/// `Token::Ident("")` in a terminator list matches any identifier.
fn is_terminator(tok: &Token, terminators: &[Token]) -> bool {
    terminators.iter().any(|t| match (t, tok) {
        (Token::Ident(""), Token::Ident(_)) => true,
        (t, tok) => t == tok,
    })
}

fn fmt_expected<'a>(ts: impl Iterator<Item = Token<'a>>) -> String {
    fn fmt_token(s: &mut String, t: &Token) {
        if let Token::Ident(_) = t {
            s.push_str("an identifier");
        } else {
            write!(s, "'{}'", t).expect("writing to a string cannot fail");
        }
    }

    let ts: Vec<_> = ts.collect();

    let mut s = String::with_capacity(32);
    fmt_token(&mut s, &ts[0]);
    if ts.len() > 1 {
        for t in &ts[1..][..ts.len() - 2] {
            s.push_str(", ");
            fmt_token(&mut s, t);
        }
        s.push_str(" or ");
        fmt_token(&mut s, &ts[ts.len() - 1]);
    }
    s
}

fn int_value(int: &ast::Int) -> i128 {
    if int.negative {
        -(int.value as i128)
    } else {
        int.value as i128
    }
}

fn is_valid_enum_number(int: &ast::Int) -> bool {
    let value = int_value(int);
    value >= i32::MIN as i128 && value <= i32::MAX as i128
}

fn is_valid_ident(s: &str) -> bool {
    !s.is_empty()
        && (s.as_bytes()[0].is_ascii_alphabetic() || s.as_bytes()[0] == b'_')
        && s.as_bytes()[1..]
            .iter()
            .all(|&ch| ch.is_ascii_alphanumeric() || ch == b'_')
}

fn is_valid_import(s: &str) -> bool {
    !s.is_empty()
        && !s.contains('\\')
        && !s.starts_with('/')
        && s.split('/').all(|part| !part.is_empty() && part != "." && part != "..")
}
