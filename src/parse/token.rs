use std::borrow::Cow;
use std::fmt::{self, Display};

use byte_string::ByteStr;
use itertools::Itertools;
use once_cell::sync::OnceCell;
use phf::phf_map;
use serde::Serialize;

use crate::position::{HasSpan, Span};
use crate::util::{serialize_bytes_as_string, slice_formatter, CloneStatic};

pub const BACKSPACE: u8 = b'\x08';
pub const FORM_FEED: u8 = b'\x0c';
pub const VERTICAL_TAB: u8 = b'\x0b';

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolCategory {
    Keyword,
    Punctuation,
    Operator,
}

macro_rules! symbols {
    ($( $category:ident { $( $lit:literal => $variant:ident ),+ $(,)? } )+) => {
        #[derive(Serialize, Debug, Clone, Copy, Hash, Eq, PartialEq)]
        pub enum Symbol {
            $( $( $variant ),+ ),+
        }

        impl Symbol {
            const SYMBOLS: phf::Map<&'static [u8], Symbol> = phf_map! {
                $( $( $lit => Self::$variant ),+ ),+
            };

            fn get_prefix_lengths() -> &'static [usize] {
                static PREFIX_LENGTHS: OnceCell<Vec<usize>> = OnceCell::new();

                PREFIX_LENGTHS.get_or_init(|| {
                    let mut lengths = [$( $( $lit.len() ),+ ),+];
                    lengths.sort_unstable();
                    lengths.into_iter().rev().dedup().collect()
                })
            }

            /// Finds the longest symbol `input` starts with.
            pub fn parse_prefix(input: &[u8]) -> Option<Symbol> {
                Self::get_prefix_lengths()
                    .iter()
                    .filter_map(|&len| input.get(0..len))
                    .find_map(|prefix| Self::SYMBOLS.get(prefix))
                    .copied()
            }

            pub fn parse_exact(input: &[u8]) -> Option<Symbol> {
                Self::SYMBOLS.get(input).copied()
            }

            pub fn as_slice(&self) -> &'static [u8] {
                match self {
                    $( $( Self::$variant => &$lit[..] ),+ ),+
                }
            }

            pub fn category(&self) -> SymbolCategory {
                match self {
                    $( $( Self::$variant )|+ => SymbolCategory::$category ),+
                }
            }
        }
    };
}

symbols! {
    Keyword {
        b"class" => Class,
        b"else" => Else,
        b"false" => False,
        b"fi" => Fi,
        b"if" => If,
        b"in" => In,
        b"inherits" => Inherits,
        b"isvoid" => IsVoid,
        b"let" => Let,
        b"loop" => Loop,
        b"pool" => Pool,
        b"then" => Then,
        b"while" => While,
        b"case" => Case,
        b"esac" => Esac,
        b"new" => New,
        b"of" => Of,
        b"not" => Not,
        b"true" => True,
    }

    Punctuation {
        b"{" => BraceLeft,
        b"}" => BraceRight,
        b"(" => ParenLeft,
        b")" => ParenRight,
        b":" => Colon,
        b";" => Semicolon,
        b"," => Comma,
        b"." => Dot,
        b"@" => At,
        b"=>" => Implies,
    }

    Operator {
        b"<-" => ArrowLeft,
        b"~" => Tilde,
        b"*" => Asterisk,
        b"/" => Slash,
        b"+" => Plus,
        b"-" => Minus,
        b"<=" => LessEquals,
        b"<" => Less,
        b"=" => Equals,
    }
}

impl Symbol {
    pub fn as_str(&self) -> &'static str {
        // all symbols are ASCII
        std::str::from_utf8(self.as_slice()).unwrap_or_default()
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.as_str())
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Int,
    Symbol(Symbol),
    Ident,
    String,
    Eof,
}

impl Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "an integer literal"),
            Self::Symbol(sym) if sym.category() == SymbolCategory::Keyword => {
                write!(f, "keyword {}", sym)
            }
            Self::Symbol(sym) => write!(f, "{}", sym),
            Self::Ident => write!(f, "an identifier"),
            Self::String => write!(f, "a string literal"),
            Self::Eof => write!(f, "the end of file"),
        }
    }
}

#[derive(Serialize, Clone, PartialEq, Eq)]
pub enum TokenValue<'buf> {
    Int(i64),
    Symbol(Symbol),
    Ident(#[serde(serialize_with = "serialize_bytes_as_string")] Cow<'buf, [u8]>),
    String(#[serde(serialize_with = "serialize_bytes_as_string")] Cow<'buf, [u8]>),
    Eof,
}

impl fmt::Debug for TokenValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::Symbol(sym) => f.debug_tuple("Symbol").field(sym).finish(),
            Self::Ident(id) => f.debug_tuple("Ident").field(&ByteStr::new(id)).finish(),
            Self::String(s) => f.debug_tuple("String").field(&ByteStr::new(s)).finish(),
            Self::Eof => f.write_str("Eof"),
        }
    }
}

impl CloneStatic<TokenValue<'static>> for TokenValue<'_> {
    fn clone_static(&self) -> TokenValue<'static> {
        match self {
            Self::Int(i) => TokenValue::Int(*i),
            Self::Symbol(sym) => TokenValue::Symbol(*sym),
            Self::Ident(id) => TokenValue::Ident(id.clone_static()),
            Self::String(s) => TokenValue::String(s.clone_static()),
            Self::Eof => TokenValue::Eof,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Token<'buf> {
    pub span: Span,
    pub value: TokenValue<'buf>,
}

impl<'buf> Token<'buf> {
    pub fn ty(&self) -> TokenType {
        match self.value {
            TokenValue::Int(_) => TokenType::Int,
            TokenValue::Symbol(sym) => TokenType::Symbol(sym),
            TokenValue::Ident(_) => TokenType::Ident,
            TokenValue::String(_) => TokenType::String,
            TokenValue::Eof => TokenType::Eof,
        }
    }
}

impl HasSpan for Token<'_> {
    fn span(&self) -> Cow<'_, Span> {
        Cow::Borrowed(&self.span)
    }
}

impl CloneStatic<Token<'static>> for Token<'_> {
    fn clone_static(&self) -> Token<'static> {
        Token {
            span: self.span.clone(),
            value: self.value.clone_static(),
        }
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            TokenValue::Int(i) => write!(f, "{}", i),
            TokenValue::Symbol(sym) => write!(f, "{}", sym),
            TokenValue::Ident(id) => write!(f, "`{}`", slice_formatter(id)),
            TokenValue::String(s) => write!(f, "{:?}", slice_formatter(s)),
            TokenValue::Eof => write!(f, "<eof>"),
        }
    }
}
