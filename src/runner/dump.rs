use std::io::{self, Write};

use coolbril::analysis::TypeCtx;
use coolbril::ast;
use coolbril::ir;
use coolbril::parse::token::Token;
use coolbril::parse::LexerError;
use ron::ser::PrettyConfig;
use serde::Serialize;

use super::config::{CodegenOutputFormat, LexerOutputFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DumpFormat {
    Debug,
    Ron,
}

fn write_ron<T: Serialize>(value: &T, mut out: impl Write) -> io::Result<()> {
    let text = ron::ser::to_string_pretty(value, PrettyConfig::default())
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    writeln!(out, "{}", text)
}

pub fn dump_tokens<'buf, I>(format: LexerOutputFormat, tokens: I, mut out: impl Write) -> io::Result<()>
where
    I: Iterator<Item = Result<Token<'buf>, LexerError>>,
{
    match format {
        LexerOutputFormat::Debug => writeln!(out, "{:#?}", tokens.collect::<Vec<_>>()),
    }
}

pub fn dump_ast(format: DumpFormat, ast: &ast::Program<'_>, mut out: impl Write) -> io::Result<()> {
    match format {
        DumpFormat::Debug => writeln!(out, "{:#?}", ast),
        DumpFormat::Ron => write_ron(ast, out),
    }
}

pub fn dump_class_table(format: DumpFormat, ctx: &TypeCtx<'_>, mut out: impl Write) -> io::Result<()> {
    match format {
        DumpFormat::Debug => writeln!(out, "{:#?}", ctx),
        DumpFormat::Ron => write_ron(ctx, out),
    }
}

pub fn dump_program(
    format: CodegenOutputFormat,
    program: &ir::Program,
    mut out: impl Write,
) -> io::Result<()> {
    match format {
        CodegenOutputFormat::Debug => writeln!(out, "{:#?}", program),
        CodegenOutputFormat::Text => write!(out, "{}", program),

        CodegenOutputFormat::Json => {
            let json = program
                .to_json()
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

            writeln!(out, "{}", json)
        }
    }
}
