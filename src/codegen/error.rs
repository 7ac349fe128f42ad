use std::borrow::Cow;
use std::error::Error;
use std::fmt::{self, Display};

use crate::analysis::ClassName;
use crate::ast::Name;
use crate::position::{HasSpan, Span};
use crate::util::slice_formatter;

/// A construct that type-checks but has no counterpart in the generated IR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedConstruct {
    StringLiteral,
    StringObject,
    Case,
    IsVoid,
    BuiltinMethod {
        class: ClassName<'static>,
        method: Vec<u8>,
    },
}

impl Display for UnsupportedConstruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StringLiteral => write!(f, "string literals"),
            Self::StringObject => write!(f, "`new String`"),
            Self::Case => write!(f, "case expressions"),
            Self::IsVoid => write!(f, "`isvoid`"),

            Self::BuiltinMethod { class, method } => {
                write!(f, "the built-in method `{}.{}`", class, slice_formatter(method))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    Unsupported {
        construct: UnsupportedConstruct,
        span: Span,
    },

    UnknownClass {
        name: ClassName<'static>,
        span: Span,
    },

    UnknownMethod {
        class: ClassName<'static>,
        method: Box<Name<'static>>,
    },

    UnknownName(Box<Name<'static>>),
}

impl Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported { construct, .. } => {
                write!(f, "{} cannot be compiled to Bril", construct)
            }

            Self::UnknownClass { name, .. } => write!(f, "unknown class `{}`", name),

            Self::UnknownMethod { class, method } => write!(
                f,
                "class `{}` does not have a method named `{}`",
                class, method,
            ),

            Self::UnknownName(name) => write!(f, "unknown name `{}`", name),
        }
    }
}

impl Error for CodegenError {}

impl HasSpan for CodegenError {
    fn span(&self) -> Cow<'_, Span> {
        match self {
            Self::Unsupported { span, .. } => Cow::Borrowed(span),
            Self::UnknownClass { span, .. } => Cow::Borrowed(span),
            Self::UnknownMethod { method, .. } => method.span(),
            Self::UnknownName(name) => name.span(),
        }
    }
}
