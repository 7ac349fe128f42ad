use std::borrow::Cow;
use std::cmp::{max, min};
use std::fmt::{self, Display};

use serde::Serialize;

use crate::source::{Source, SourceFile, SourceId};

#[derive(Serialize, Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct Position {
    #[serde(skip)]
    pub src: Option<SourceId>,
    pub byte: usize,
    pub line: usize,
    pub col: usize,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            src: None,
            byte: 0,
            line: 1,
            col: 1,
        }
    }
}

impl Position {
    pub fn with_source_id(src: SourceId) -> Self {
        Self {
            src: Some(src),
            ..Default::default()
        }
    }

    pub fn with_source_file(src_file: &SourceFile<'_>) -> Self {
        Self::with_source_id(src_file.id())
    }
}

/// A span between two positions, inclusive on the both ends.
#[derive(Serialize, Debug, Clone, Hash, Eq, PartialEq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    /// Returns the smallest span covering both `self` and `other`.
    ///
    /// Spans from different sources are not merged: `self` is returned as is.
    pub fn convex_hull(&self, other: &Span) -> Span {
        if self.start.src != other.start.src {
            return self.clone();
        }

        let start = min(self.start.byte, other.start.byte);
        let end = max(self.end.byte, other.end.byte);

        Span {
            start: if start == self.start.byte { self.start } else { other.start },
            end: if end == self.end.byte { self.end } else { other.end },
        }
    }

    pub fn display<'a>(&'a self, source: &'a Source<'_>) -> SpanDisplay<'a> {
        SpanDisplay { span: self, source }
    }
}

pub struct SpanDisplay<'a> {
    span: &'a Span,
    source: &'a Source<'a>,
}

impl Display for SpanDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Span { start, end } = self.span;

        match start.src.and_then(|id| self.source.get(id)) {
            Some(file) => write!(f, "{}:", file.path().display())?,
            None => write!(f, "<unknown>:")?,
        }

        if start.line == end.line {
            write!(f, "{}:{}-{}", start.line, start.col, end.col)
        } else {
            write!(f, "{}:{}-{}:{}", start.line, start.col, end.line, end.col)
        }
    }
}

#[derive(Serialize, Debug, Clone, Hash, Eq, PartialEq, Default)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

pub trait HasSpan {
    fn span(&self) -> Cow<'_, Span>;
}

impl HasSpan for Span {
    fn span(&self) -> Cow<'_, Span> {
        Cow::Borrowed(self)
    }
}

impl<T> HasSpan for Spanned<T> {
    fn span(&self) -> Cow<'_, Span> {
        Cow::Borrowed(&self.span)
    }
}

impl<T: HasSpan + ?Sized> HasSpan for Box<T> {
    fn span(&self) -> Cow<'_, Span> {
        self.as_ref().span()
    }
}
