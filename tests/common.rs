#![allow(dead_code)]

use std::path::PathBuf;

use coolbril::ast::{Class, Program};
use coolbril::parse::token::TokenValue;
use coolbril::parse::{Cursor, Lexer, LexerErrorKind, Parser, ParserError};
use coolbril::source::{Source, SourceBuffer, SourceFile};
use coolbril::util::CloneStatic;

/// Loads `code` as if it were read from `tests/<filename>`.
///
/// The source buffer is leaked so that everything borrowed from the file can outlive the caller.
fn load(filename: &str, code: &[u8]) -> &'static SourceFile<'static> {
    let source_buf: &'static mut SourceBuffer = Box::leak(Box::new(SourceBuffer::new()));
    let source: &'static mut Source<'static> = Box::leak(Box::new(Source::new(source_buf)));
    let source_id = source.load_from_string(PathBuf::from("tests").join(filename), code.to_vec());
    let source: &'static Source<'static> = source;

    source.get(source_id).unwrap()
}

pub fn try_parse(filename: &str, code: &[u8]) -> Result<Program<'static>, ParserError<'static>> {
    let lexer = Lexer::new(Cursor::new(load(filename, code)));

    Parser::new(lexer).parse()
}

pub fn parse(code: &str) -> Vec<Class<'static>> {
    match try_parse("test.cl", code.as_bytes()) {
        Ok(program) => program.classes,
        Err(e) => panic!("could not parse the test program: {}", e),
    }
}

/// Lexes `code` until the end of file or the first error.
pub fn lex(code: &str) -> Vec<Result<TokenValue<'static>, LexerErrorKind>> {
    Lexer::new(Cursor::new(load("test.cl", code.as_bytes())))
        .map(|token| match token {
            Ok(token) => Ok(token.value.clone_static()),
            Err(e) => Err(e.kind()),
        })
        .collect()
}
