pub mod analysis;
pub mod ast;
pub mod codegen;
pub mod errors;
pub mod ir;
pub mod parse;
pub mod position;
pub mod source;
pub mod util;

#[cfg(target_family = "wasm")]
pub mod wasm;

use std::borrow::Cow;
use std::error::Error;
use std::fmt::{self, Display};

use crate::analysis::{build_class_table, TypeChecker, TypeckError};
use crate::ast::Class;
use crate::codegen::{CodegenError, CodegenOptions};
use crate::position::{HasSpan, Span};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    Typeck(TypeckError),
    Codegen(CodegenError),
}

impl From<TypeckError> for CompileError {
    fn from(e: TypeckError) -> Self {
        Self::Typeck(e)
    }
}

impl From<CodegenError> for CompileError {
    fn from(e: CodegenError) -> Self {
        Self::Codegen(e)
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Typeck(e) => write!(f, "{}", e),
            Self::Codegen(e) => write!(f, "{}", e),
        }
    }
}

impl Error for CompileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Typeck(e) => Some(e),
            Self::Codegen(e) => Some(e),
        }
    }
}

impl HasSpan for CompileError {
    fn span(&self) -> Cow<'_, Span> {
        match self {
            Self::Typeck(e) => e.span(),
            Self::Codegen(e) => e.span(),
        }
    }
}

/// Type-checks the classes and generates a Bril program from them.
pub fn compile(classes: &[Class<'_>], options: &CodegenOptions) -> Result<ir::Program, CompileError> {
    let mut ctx = build_class_table(classes)?;
    TypeChecker::new(&mut ctx).check(classes)?;

    Ok(codegen::generate(classes, &ctx, options)?)
}
