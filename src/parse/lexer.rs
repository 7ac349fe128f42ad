use std::borrow::Cow;
use std::error::Error;
use std::fmt::{self, Display};
use std::iter::FusedIterator;

use serde::Serialize;

use crate::parse::cursor::Cursor;
use crate::parse::token::{Symbol, Token, TokenValue, BACKSPACE, FORM_FEED, VERTICAL_TAB};
use crate::position::{HasSpan, Position, Span};

type ScanResult<'buf> = Result<TokenValue<'buf>, PosLexerError>;

fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\n' | FORM_FEED | b'\r' | b'\t' | VERTICAL_TAB)
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic()
}

fn is_ident_continuation(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Recognizes keywords, which are case-insensitive.
///
/// The only exception are the boolean literals: their first letter must be lowercase.
fn scan_keyword(ident: &[u8]) -> Option<Symbol> {
    match Symbol::parse_exact(&ident.to_ascii_lowercase()) {
        Some(Symbol::True | Symbol::False) if !ident[0].is_ascii_lowercase() => None,
        Some(sym) => Some(sym),
        None => None,
    }
}

fn unescape(c: u8) -> u8 {
    match c {
        b'b' => BACKSPACE,
        b't' => b'\t',
        b'n' => b'\n',
        b'f' => FORM_FEED,
        _ => c,
    }
}

#[derive(Serialize, Debug, Clone, Copy, Eq, PartialEq)]
pub enum LexerErrorKind {
    NumberTooLarge,
    UnterminatedComment,
    UnterminatedString,
    UnrecognizedCharacter(u8),
}

impl Display for LexerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NumberTooLarge => write!(f, "the number literal is too large"),
            Self::UnterminatedComment => write!(f, "the block comment is not terminated"),
            Self::UnterminatedString => write!(f, "the string is not terminated"),

            Self::UnrecognizedCharacter(c) if c.is_ascii_graphic() => {
                write!(f, "encountered an unrecognized character '{}'", *c as char)
            }

            Self::UnrecognizedCharacter(c) => {
                write!(f, "encountered an unrecognized character '\\x{:02x}'", c)
            }
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
struct PosLexerError {
    end: Position,
    kind: LexerErrorKind,
}

impl PosLexerError {
    fn with_start(self, start: Position) -> LexerError {
        LexerError {
            span: Span {
                start,
                end: self.end,
            },
            kind: self.kind,
        }
    }
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
pub struct LexerError {
    span: Span,
    kind: LexerErrorKind,
}

impl LexerError {
    pub fn kind(&self) -> LexerErrorKind {
        self.kind
    }
}

impl Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lexical analysis failed: {}", self.kind)
    }
}

impl Error for LexerError {}

impl HasSpan for LexerError {
    fn span(&self) -> Cow<'_, Span> {
        Cow::Borrowed(&self.span)
    }
}

/// Splits a source file into tokens.
///
/// The last item is always either an `Eof` token or an error; the lexer is fused afterwards.
#[derive(Debug, Clone)]
pub struct Lexer<'buf> {
    cursor: Cursor<'buf>,
    eof: bool,
}

impl<'buf> Lexer<'buf> {
    pub fn new(cursor: Cursor<'buf>) -> Self {
        Self { cursor, eof: false }
    }

    pub fn pos(&self) -> Position {
        self.cursor.pos()
    }

    fn create_error_at_pos(&self, kind: LexerErrorKind) -> PosLexerError {
        PosLexerError {
            end: self.cursor.pos(),
            kind,
        }
    }

    fn create_error_behind(&self, kind: LexerErrorKind) -> PosLexerError {
        PosLexerError {
            end: self.cursor.prev_pos(),
            kind,
        }
    }

    fn scan_int(&mut self) -> ScanResult<'buf> {
        let digits = self.cursor.consume_while(u8::is_ascii_digit);

        // `digits` is non-empty and consists of ASCII digits only: overflow is the only failure
        let value = digits.iter().try_fold(0i64, |acc, &d| {
            acc.checked_mul(10)?.checked_add(i64::from(d - b'0'))
        });

        value
            .map(TokenValue::Int)
            .ok_or_else(|| self.create_error_behind(LexerErrorKind::NumberTooLarge))
    }

    fn scan_ident_or_keyword(&mut self) -> ScanResult<'buf> {
        let ident = self.cursor.consume_while(|&c| is_ident_continuation(c));

        Ok(match scan_keyword(ident) {
            Some(sym) => TokenValue::Symbol(sym),
            None => TokenValue::Ident(Cow::Borrowed(ident)),
        })
    }

    /// Scans a string literal. The value is only copied if it contains escape sequences.
    fn scan_string(&mut self) -> ScanResult<'buf> {
        self.cursor.consume_expecting(b"\"");

        let raw = self.cursor.remaining();
        let mut unescaped: Option<Vec<u8>> = None;
        let mut null_at = None;

        let len = loop {
            let offset = raw.len() - self.cursor.remaining().len();
            let escaped = self.cursor.peek() == Some(b'\\');

            if escaped {
                self.cursor.next();
                unescaped.get_or_insert_with(|| raw[..offset].to_vec());
            }

            let c = match self.cursor.peek() {
                Some(b'"') if !escaped => {
                    self.cursor.next();

                    break offset;
                }

                Some(b'\n') if !escaped => {
                    return Err(self.create_error_at_pos(LexerErrorKind::UnterminatedString))
                }

                None => return Err(self.create_error_at_pos(LexerErrorKind::UnterminatedString)),
                Some(c) => c,
            };

            // keep scanning: an unterminated string takes precedence
            if c == b'\0' {
                null_at = null_at.or(Some(self.cursor.pos()));
            }

            self.cursor.next();

            if let Some(value) = &mut unescaped {
                value.push(if escaped { unescape(c) } else { c });
            }
        };

        if let Some(end) = null_at {
            return Err(PosLexerError {
                end,
                kind: LexerErrorKind::UnrecognizedCharacter(b'\0'),
            });
        }

        Ok(TokenValue::String(match unescaped {
            Some(value) => Cow::Owned(value),
            None => Cow::Borrowed(&raw[..len]),
        }))
    }

    fn skip_comment(&mut self) {
        self.cursor.consume_while(|&c| c != b'\n');
        self.cursor.next();
    }

    fn skip_block_comment(&mut self) -> Result<(), PosLexerError> {
        self.cursor.consume_expecting(b"(*");
        let mut depth = 1usize;

        while depth > 0 {
            let c = self
                .cursor
                .next()
                .ok_or_else(|| self.create_error_at_pos(LexerErrorKind::UnterminatedComment))?;

            match c {
                b'(' if self.cursor.consume_expecting(b"*").is_some() => depth += 1,
                b'*' if self.cursor.consume_expecting(b")").is_some() => depth -= 1,
                _ => {}
            }
        }

        Ok(())
    }

    fn skip_whitespace(&mut self) {
        self.cursor.consume_while(|&c| is_whitespace(c));
    }

    fn scan_symbol(&mut self, c: u8) -> ScanResult<'buf> {
        match Symbol::parse_prefix(self.cursor.remaining()) {
            Some(sym) => {
                self.cursor.consume_n(sym.as_slice().len());

                Ok(TokenValue::Symbol(sym))
            }

            None => Err(self.create_error_at_pos(LexerErrorKind::UnrecognizedCharacter(c))),
        }
    }

    /// Skips whitespace and comments.
    fn skip_trivia(&mut self) -> Result<(), LexerError> {
        loop {
            let start = self.cursor.pos();

            match self.cursor.peek() {
                Some(b'-') if self.cursor.starts_with(b"--") => self.skip_comment(),

                Some(b'(') if self.cursor.starts_with(b"(*") => self
                    .skip_block_comment()
                    .map_err(|e| e.with_start(start))?,

                Some(c) if is_whitespace(c) => self.skip_whitespace(),
                _ => return Ok(()),
            }
        }
    }

    fn scan_token(&mut self, c: u8) -> ScanResult<'buf> {
        match c {
            b'"' => self.scan_string(),
            _ if c.is_ascii_digit() => self.scan_int(),
            _ if is_ident_start(c) => self.scan_ident_or_keyword(),
            _ => self.scan_symbol(c),
        }
    }
}

impl<'buf> Iterator for Lexer<'buf> {
    type Item = Result<Token<'buf>, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.eof {
            return None;
        }

        let result = self.skip_trivia().and_then(|()| {
            let start = self.cursor.pos();

            let Some(c) = self.cursor.peek() else {
                return Ok(Token {
                    value: TokenValue::Eof,
                    span: Span { start, end: start },
                });
            };

            match self.scan_token(c) {
                Ok(value) => Ok(Token {
                    span: Span {
                        start,
                        end: self.cursor.prev_pos(),
                    },
                    value,
                }),

                Err(e) => Err(e.with_start(start)),
            }
        });

        self.eof = matches!(
            result,
            Ok(Token {
                value: TokenValue::Eof,
                ..
            }) | Err(_)
        );

        Some(result)
    }
}

impl<'buf> FusedIterator for Lexer<'buf> {}
