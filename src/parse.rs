mod cursor;
mod lexer;
mod parser;
pub mod token;

pub use cursor::Cursor;
pub use lexer::{Lexer, LexerError, LexerErrorKind};
pub use parser::{Parser, ParserError};
