use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::ops::ControlFlow;

use coolbril::analysis::{self, TypeCtx};
use coolbril::ast::{Class, Program};
use coolbril::codegen::{self, ENTRY_FUNC};
use coolbril::errors::DiagnosticMessage;
use coolbril::ir;
use coolbril::parse::{Cursor, Lexer, Parser};
use coolbril::position::{HasSpan, Span};
use coolbril::util::CloneStatic;
use tracing::debug;

use super::config::{OutputKind, ParserOutputFormat, TypeckOutputFormat};
use super::dump::{dump_ast, dump_class_table, dump_program, dump_tokens, DumpFormat};
use super::{Pass, RunnerCtx};

pub fn load_files(ctx: &mut RunnerCtx<'_, '_>) -> Pass<()> {
    for path in &ctx.config.paths {
        if let Err(e) = ctx.source.borrow_mut().load(path.clone()) {
            ctx.diagnostics
                .error()
                .with_message(format!("could not load file {}", path.display()))
                .with_source(Box::new(e))
                .emit();
        }
    }

    ctx.checkpoint(())
}

pub fn scan_files<'buf>(ctx: &mut RunnerCtx<'buf, '_>) -> Pass<Vec<Lexer<'buf>>> {
    let lexers = ctx
        .source
        .borrow()
        .iter()
        .map(|src_file| {
            let cursor = Cursor::new(src_file);
            Lexer::new(cursor)
        })
        .collect();

    ControlFlow::Continue(lexers)
}

pub fn dump_tokens_if_asked<'buf>(
    ctx: &mut RunnerCtx<'buf, '_>,
    lexers: Vec<Lexer<'buf>>,
) -> Pass<Vec<Lexer<'buf>>> {
    let OutputKind::Lexer(format) = ctx.config.output else {
        return ControlFlow::Continue(lexers);
    };

    for lexer in lexers {
        if let Err(e) = dump_tokens(format, lexer, io::stdout()) {
            ctx.diagnostics
                .error()
                .with_message("could not dump the tokens to stdout".to_owned())
                .with_source(Box::new(e))
                .emit();
        }
    }

    ControlFlow::Break(())
}

pub fn parse_all<'buf>(
    ctx: &mut RunnerCtx<'buf, '_>,
    lexers: Vec<Lexer<'buf>>,
) -> Pass<Vec<Program<'buf>>> {
    let mut result = Vec::with_capacity(lexers.len());

    for lexer in lexers {
        let parser = Parser::new(lexer);

        match parser.parse() {
            Ok(program) => result.push(program),

            Err(e) => {
                ctx.diagnostics
                    .error()
                    .with_span_and_error(e.clone_static())
                    .emit();
            }
        }
    }

    ctx.checkpoint(result)
}

pub fn dump_asts_if_asked<'buf>(
    ctx: &mut RunnerCtx<'buf, '_>,
    asts: Vec<Program<'buf>>,
) -> Pass<Vec<Program<'buf>>> {
    let OutputKind::Parser(format) = ctx.config.output else {
        return ControlFlow::Continue(asts);
    };

    let format = match format {
        ParserOutputFormat::Debug => DumpFormat::Debug,
        ParserOutputFormat::Ron => DumpFormat::Ron,
    };

    for ast in &asts {
        if let Err(e) = dump_ast(format, ast, io::stdout()) {
            ctx.diagnostics
                .error()
                .with_message("could not dump an ast to stdout".to_owned())
                .with_source(Box::new(e))
                .emit();
        }
    }

    ControlFlow::Break(())
}

pub fn merge_asts(asts: Vec<Program<'_>>) -> Vec<Class<'_>> {
    asts.into_iter()
        .flat_map(|Program { classes, .. }| classes)
        .collect()
}

pub fn typeck<'buf>(
    ctx: &mut RunnerCtx<'buf, '_>,
    classes: &[Class<'buf>],
) -> Pass<TypeCtx<'buf>> {
    match analysis::typeck(classes) {
        Ok(ty_ctx) => {
            debug!(classes = classes.len(), "type checking succeeded");

            ControlFlow::Continue(ty_ctx)
        }

        Err(e) => {
            ctx.diagnostics.error().with_span_and_error(e).emit();

            ControlFlow::Break(())
        }
    }
}

pub fn dump_types_if_asked(ctx: &mut RunnerCtx<'_, '_>, ty_ctx: &TypeCtx<'_>) -> Pass<()> {
    let OutputKind::Typeck(format) = ctx.config.output else {
        return ControlFlow::Continue(());
    };

    let format = match format {
        TypeckOutputFormat::Debug => DumpFormat::Debug,
        TypeckOutputFormat::Ron => DumpFormat::Ron,
    };

    if let Err(e) = dump_class_table(format, ty_ctx, io::stdout()) {
        ctx.diagnostics
            .error()
            .with_message("could not dump the class table to stdout".to_owned())
            .with_source(Box::new(e))
            .emit();
    }

    ControlFlow::Break(())
}

pub fn codegen<'buf>(
    ctx: &mut RunnerCtx<'buf, '_>,
    classes: &[Class<'buf>],
    ty_ctx: &TypeCtx<'buf>,
) -> Pass<ir::Program> {
    match codegen::generate(classes, ty_ctx, &ctx.config.codegen) {
        Ok(program) => {
            debug!(functions = program.functions.len(), "generated the program");

            if program.function(ENTRY_FUNC).is_none() {
                let message = format!(
                    "method `{}.{}` is not defined, so the program has no entry function",
                    ctx.config.codegen.entry_class, ctx.config.codegen.entry_method,
                );

                ctx.diagnostics
                    .warn()
                    .with_message(match program_span(classes) {
                        Some(span) => DiagnosticMessage::with_span(span, message),
                        None => DiagnosticMessage::new(message),
                    })
                    .emit();
            }

            ControlFlow::Continue(program)
        }

        Err(e) => {
            ctx.diagnostics.error().with_span_and_error(e).emit();

            ControlFlow::Break(())
        }
    }
}

pub fn write_output(ctx: &mut RunnerCtx<'_, '_>, program: &ir::Program) -> Pass<()> {
    let OutputKind::Codegen(format) = ctx.config.output else {
        return ControlFlow::Continue(());
    };

    let (result, destination) = match &ctx.config.output_path {
        Some(path) => {
            let result = File::create(path).and_then(|file| {
                let mut out = BufWriter::new(file);
                dump_program(format, program, &mut out)?;

                out.flush()
            });

            (result, Cow::Owned(path.display().to_string()))
        }

        None => (
            dump_program(format, program, io::stdout().lock()),
            Cow::Borrowed("stdout"),
        ),
    };

    match result {
        Ok(()) => {
            debug!(%destination, "wrote the program");

            ControlFlow::Continue(())
        }

        Err(e) => {
            ctx.diagnostics
                .fatal()
                .with_message(format!("could not write the program to {}", destination))
                .with_source(Box::new(e))
                .emit();

            ControlFlow::Break(())
        }
    }
}

fn program_span(classes: &[Class<'_>]) -> Option<Span> {
    classes
        .iter()
        .map(|class| class.span())
        .reduce(|lhs, rhs| Cow::Owned(lhs.convex_hull(&rhs)))
        .map(Cow::into_owned)
}
