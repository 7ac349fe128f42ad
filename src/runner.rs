use std::cell::RefCell;
use std::ops::ControlFlow;
use std::process::ExitCode;
use std::rc::Rc;

use coolbril::errors::Diagnostics;
use coolbril::source::{Source, SourceBuffer};
use tracing::debug;

use self::config::{parse_args_or_exit, CoolbrilConfig};
use self::errors::print_diagnostic;

mod config;
mod dump;
mod errors;
mod passes;

/// The outcome of a pass: its output, or a request to stop compiling.
///
/// Stopping is not a failure by itself: the exit code depends on whether any errors were reported.
pub type Pass<O> = ControlFlow<(), O>;

pub struct RunnerCtx<'buf, 'emt> {
    pub config: CoolbrilConfig,
    pub source: Rc<RefCell<Source<'buf>>>,
    pub diagnostics: Diagnostics<'emt>,
}

impl RunnerCtx<'_, '_> {
    /// Passes `output` on unless an error has been reported.
    pub fn checkpoint<O>(&self, output: O) -> Pass<O> {
        if self.diagnostics.has_errors() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(output)
        }
    }
}

fn run(ctx: &mut RunnerCtx<'_, '_>) -> Pass<()> {
    passes::load_files(ctx)?;

    // lexical analysis
    let lexers = passes::scan_files(ctx)?;
    let lexers = passes::dump_tokens_if_asked(ctx, lexers)?;

    // syntax analysis
    let asts = passes::parse_all(ctx, lexers)?;
    let asts = passes::dump_asts_if_asked(ctx, asts)?;
    let classes = passes::merge_asts(asts);

    // semantic analysis
    let ty_ctx = passes::typeck(ctx, &classes)?;
    passes::dump_types_if_asked(ctx, &ty_ctx)?;

    // code generation
    let program = passes::codegen(ctx, &classes, &ty_ctx)?;

    passes::write_output(ctx, &program)
}

pub fn prepare_and_run() -> ExitCode {
    let config = parse_args_or_exit();
    let mut source_buf = SourceBuffer::new();
    let source = Rc::new(RefCell::new(Source::new(&mut source_buf)));

    let mut diagnostics = Diagnostics::new();

    diagnostics.set_emitter({
        let source = source.clone();

        Box::new(move |diagnostic| {
            print_diagnostic(&source.borrow(), diagnostic);
        })
    });

    let mut ctx = RunnerCtx {
        config,
        source,
        diagnostics,
    };

    if run(&mut ctx).is_break() {
        debug!("compilation stopped early");
    }

    if ctx.diagnostics.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
