use std::borrow::Cow;
use std::error::Error;
use std::fmt::{self, Display};

use itertools::Itertools;

use crate::analysis::typectx::ClassName;
use crate::ast::{Name, TyName};
use crate::position::{HasSpan, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidLiteralKind {
    IntOutOfRange(i64),
    InvalidUtf8,
}

impl Display for InvalidLiteralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IntOutOfRange(value) => write!(
                f,
                "the integer literal {} does not fit in a 32-bit signed integer",
                value
            ),

            Self::InvalidUtf8 => write!(f, "the string literal is not valid UTF-8"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeckError {
    UndefinedClass {
        name: ClassName<'static>,
        span: Span,
    },

    UndefinedIdentifier(Box<Name<'static>>),

    UndefinedMethod {
        class: ClassName<'static>,
        method: Box<Name<'static>>,
    },

    DuplicateAttribute {
        name: Box<Name<'static>>,
        inherited: bool,
    },

    NotAssignable {
        span: Span,
        from: ClassName<'static>,
        to: ClassName<'static>,
    },

    IllegalComparison {
        span: Span,
        lhs: ClassName<'static>,
        rhs: ClassName<'static>,
    },

    ArgumentTypeMismatch {
        span: Span,
        expected: ClassName<'static>,
        actual: ClassName<'static>,
    },

    ArgumentCountMismatch {
        call_span: Span,
        expected_count: usize,
        supplied_count: usize,
    },

    MissingCaseBranch(Span),

    InvalidLiteral {
        span: Span,
        kind: InvalidLiteralKind,
    },

    InheritanceCycle {
        ty_name: Box<TyName<'static>>,
        cycle: Vec<ClassName<'static>>,
    },

    DuplicateClass(Box<TyName<'static>>),

    DuplicateMethod {
        class: ClassName<'static>,
        method: Box<Name<'static>>,
    },
}

impl Display for TypeckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedClass { name, .. } => {
                write!(f, "the type name `{}` is not recognized", name)
            }

            Self::UndefinedIdentifier(name) => write!(f, "unrecognized name `{}`", name),

            Self::UndefinedMethod { class, method } => {
                write!(
                    f,
                    "class `{}` does not have a method named `{}`",
                    class, method,
                )
            }

            Self::DuplicateAttribute { name, inherited } => {
                write!(
                    f,
                    "detected multiple definition: `{}` is already defined{}",
                    name,
                    if *inherited { " in a superclass" } else { "" },
                )
            }

            Self::NotAssignable { from, to, .. } => {
                write!(
                    f,
                    "mismatched types: expected `{}`, found `{}`",
                    to, from,
                )
            }

            Self::IllegalComparison { lhs, rhs, .. } => {
                write!(
                    f,
                    "cannot compare a value of type `{}` with a value of type `{}`",
                    lhs, rhs,
                )
            }

            Self::ArgumentTypeMismatch {
                expected, actual, ..
            } => {
                write!(
                    f,
                    "mismatched argument type: expected `{}`, found `{}`",
                    expected, actual,
                )
            }

            Self::ArgumentCountMismatch {
                expected_count,
                supplied_count,
                ..
            } => {
                write!(
                    f,
                    "this function takes {} argument{} but {} argument{} {} supplied",
                    expected_count,
                    if *expected_count != 1usize { "s" } else { "" },
                    supplied_count,
                    if *supplied_count != 1usize { "s" } else { "" },
                    if *supplied_count != 1usize {
                        "were"
                    } else {
                        "was"
                    },
                )
            }

            Self::MissingCaseBranch(_) => {
                write!(f, "a case expression must have at least one branch")
            }

            Self::InvalidLiteral { kind, .. } => write!(f, "{}", kind),

            Self::InheritanceCycle { ty_name, cycle } => {
                write!(
                    f,
                    "an inheritance cycle containing `{}` has been detected: {}",
                    ty_name,
                    cycle.iter().join(" -> "),
                )
            }

            Self::DuplicateClass(ty_name) => {
                write!(
                    f,
                    "detected multiple definition: class `{}` is already defined",
                    ty_name,
                )
            }

            Self::DuplicateMethod { class, method } => {
                write!(
                    f,
                    "detected multiple definition: method `{}` is already defined in class `{}`",
                    method, class,
                )
            }
        }
    }
}

impl Error for TypeckError {}

impl HasSpan for TypeckError {
    fn span(&self) -> Cow<'_, Span> {
        match self {
            Self::UndefinedClass { span, .. } => Cow::Borrowed(span),
            Self::UndefinedIdentifier(name) => name.span(),
            Self::UndefinedMethod { method, .. } => method.span(),
            Self::DuplicateAttribute { name, .. } => name.span(),
            Self::NotAssignable { span, .. } => Cow::Borrowed(span),
            Self::IllegalComparison { span, .. } => Cow::Borrowed(span),
            Self::ArgumentTypeMismatch { span, .. } => Cow::Borrowed(span),
            Self::ArgumentCountMismatch { call_span, .. } => Cow::Borrowed(call_span),
            Self::MissingCaseBranch(span) => Cow::Borrowed(span),
            Self::InvalidLiteral { span, .. } => Cow::Borrowed(span),
            Self::InheritanceCycle { ty_name, .. } => ty_name.span(),
            Self::DuplicateClass(ty_name) => ty_name.span(),
            Self::DuplicateMethod { method, .. } => method.span(),
        }
    }
}
