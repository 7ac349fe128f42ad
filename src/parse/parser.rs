use std::borrow::Cow;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{self, Display};
use std::mem;
use std::ops::{Deref, DerefMut};

use itertools::{Itertools, PeekNth};
use serde::Serialize;
use tracing::{instrument, trace};

use crate::ast::{self, BinOpKind, Expr, Name, TyName, UnOpKind};
use crate::parse::lexer::{Lexer, LexerError};
use crate::parse::token::{Symbol, Token, TokenType, TokenValue};
use crate::position::{HasSpan, Position, Span, Spanned};
use crate::util::CloneStatic;

/// How deeply expressions may nest.
///
/// Each level costs several instrumented frames, so this has to fit in a 2 MiB thread stack.
const RECURSION_LIMIT: usize = 32;

/// Operator binding strength, loosest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Lowest,
    Not,
    Cmp,
    Sum,
    Product,
    IsVoid,
    Complement,
}

impl Prec {
    fn of_bin_op(op: BinOpKind) -> Self {
        match op {
            BinOpKind::LessThan | BinOpKind::LessEquals | BinOpKind::Equals => Self::Cmp,
            BinOpKind::Add | BinOpKind::Subtract => Self::Sum,
            BinOpKind::Multiply | BinOpKind::Divide => Self::Product,
        }
    }

    fn of_un_op(op: UnOpKind) -> Self {
        match op {
            UnOpKind::Not => Self::Not,
            UnOpKind::IsVoid => Self::IsVoid,
            UnOpKind::Complement => Self::Complement,
        }
    }
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
pub enum ParserError<'buf> {
    UnexpectedToken {
        expected: Cow<'static, [TokenType]>,
        actual: Token<'buf>,
    },

    UppercasedName(TyName<'buf>),
    LowercasedTyName(Name<'buf>),

    RecursionLimit(Span),

    LexerError(LexerError),
}

impl From<LexerError> for ParserError<'_> {
    fn from(e: LexerError) -> Self {
        Self::LexerError(e)
    }
}

impl Display for ParserError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken { expected, actual } => {
                write!(f, "encountered an unexpected token: {}", actual.ty())?;

                match expected.len() {
                    0 => Ok(()),
                    1 => write!(f, " (expected {})", &expected[0]),
                    2 => write!(f, " (expected {} or {})", &expected[0], &expected[1]),

                    n => write!(
                        f,
                        " (expected {}, or {})",
                        expected[..n - 1].iter().join(", "),
                        &expected[n - 1]
                    ),
                }
            }

            Self::UppercasedName(name) => {
                write!(
                    f,
                    "an object name cannot start with an uppercase letter: `{}`",
                    name
                )
            }

            Self::LowercasedTyName(name) => {
                write!(
                    f,
                    "a type name cannot start with a lowercase letter: `{}`",
                    name
                )
            }

            Self::RecursionLimit(_) => {
                write!(f, "a recursion limit has been reached while parsing")
            }

            Self::LexerError(err) => write!(f, "{}", err),
        }
    }
}

impl Error for ParserError<'_> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::LexerError(err) => Some(err),
            _ => None,
        }
    }
}

impl CloneStatic<ParserError<'static>> for ParserError<'_> {
    fn clone_static(&self) -> ParserError<'static> {
        match self {
            Self::UnexpectedToken { expected, actual } => ParserError::UnexpectedToken {
                expected: expected.clone_static(),
                actual: actual.clone_static(),
            },

            Self::UppercasedName(ty_name) => ParserError::UppercasedName(ty_name.clone_static()),
            Self::LowercasedTyName(name) => ParserError::LowercasedTyName(name.clone_static()),
            Self::RecursionLimit(span) => ParserError::RecursionLimit(span.clone()),
            Self::LexerError(e) => ParserError::LexerError(e.clone()),
        }
    }
}

impl HasSpan for ParserError<'_> {
    fn span(&self) -> Cow<'_, Span> {
        match self {
            Self::UnexpectedToken { actual, .. } => actual.span(),
            Self::UppercasedName(ty_name) => ty_name.span(),
            Self::LowercasedTyName(name) => name.span(),
            Self::RecursionLimit(span) => Cow::Borrowed(span),
            Self::LexerError(e) => e.span(),
        }
    }
}

trait Matcher {
    fn matches(&self, token: &Token<'_>) -> bool;

    fn expected_tokens(&self) -> Cow<'static, [TokenType]>;
}

impl<const N: usize> Matcher for &'_ [Symbol; N] {
    fn matches(&self, token: &Token<'_>) -> bool {
        match token.ty() {
            TokenType::Symbol(sym) => self.contains(&sym),
            _ => false,
        }
    }

    fn expected_tokens(&self) -> Cow<'static, [TokenType]> {
        self.iter().copied().map(TokenType::Symbol).collect()
    }
}

impl Matcher for TokenType {
    fn matches(&self, token: &Token<'_>) -> bool {
        self == &token.ty()
    }

    fn expected_tokens(&self) -> Cow<'static, [TokenType]> {
        vec![*self].into()
    }
}

impl Matcher for Symbol {
    fn matches(&self, token: &Token<'_>) -> bool {
        TokenType::Symbol(*self) == token.ty()
    }

    fn expected_tokens(&self) -> Cow<'static, [TokenType]> {
        vec![TokenType::Symbol(*self)].into()
    }
}

macro_rules! select {
    ($self:ident : { $( $matcher:expr => $arm:expr, )+ _ => $default:expr }) => ({
        match $self.lexer.peek() {
            $( Some(Ok(token)) if $matcher.matches(token) => $arm, )+
            _ => $default,
        }
    });

    ($self:ident : { $( $matcher:expr => $arm:expr, )+ _ => @error, }) => ({
        select!($self: { $( $matcher => $arm, )+ _ => {
            let expected: HashSet<_> = [$( $matcher.expected_tokens().iter().copied(), )+]
                .into_iter()
                .flatten()
                .collect();

            return match $self.lexer.next() {
                Some(Ok(actual)) => Err(ParserError::UnexpectedToken {
                    expected: expected.into_iter().collect::<Vec<_>>().into(),
                    actual,
                }),

                Some(Err(e)) => Err(ParserError::from(e)),
                None => unreachable!("the lexer is never polled past the end of file"),
            };
        }})
    });
}

fn format_expected(tokens: Cow<'static, [TokenType]>) -> String {
    tokens.iter().map(|token| format!("{}", token)).join(", ")
}

/// A guard decrementing the recursion budget of the parser while it's alive.
struct BoundedParser<'buf, 'a> {
    parser: &'a mut Parser<'buf>,
    prev_layer_start: Position,
}

impl Drop for BoundedParser<'_, '_> {
    fn drop(&mut self) {
        self.parser.recursion_limit += 1;
        self.parser.layer_start = self.prev_layer_start;
    }
}

impl<'buf> Deref for BoundedParser<'buf, '_> {
    type Target = Parser<'buf>;

    fn deref(&self) -> &Parser<'buf> {
        self.parser
    }
}

impl<'buf> DerefMut for BoundedParser<'buf, '_> {
    fn deref_mut(&mut self) -> &mut Parser<'buf> {
        self.parser
    }
}

pub struct Parser<'buf> {
    lexer: PeekNth<Lexer<'buf>>,
    recursion_limit: usize,
    layer_start: Position,
}

impl<'buf> Parser<'buf> {
    pub fn new(lexer: Lexer<'buf>) -> Self {
        let layer_start = lexer.pos();

        Self {
            lexer: itertools::peek_nth(lexer),
            recursion_limit: RECURSION_LIMIT,
            layer_start,
        }
    }

    fn bounded(&mut self) -> Result<BoundedParser<'buf, '_>, ParserError<'buf>> {
        let span = Span {
            start: self.layer_start,
            end: self.next_pos(),
        };

        self.recursion_limit = self
            .recursion_limit
            .checked_sub(1)
            .ok_or(ParserError::RecursionLimit(span))?;

        let layer_start = self.next_pos();
        let prev_layer_start = mem::replace(&mut self.layer_start, layer_start);

        Ok(BoundedParser {
            parser: self,
            prev_layer_start,
        })
    }

    fn next_pos(&mut self) -> Position {
        match self.lexer.peek() {
            Some(Ok(token)) => token.span.start,
            Some(Err(e)) => e.span().start,
            None => self.layer_start,
        }
    }

    fn expect_generic<M, F, G, R>(
        &mut self,
        matcher: M,
        on_match: F,
        on_fail: G,
    ) -> Result<R, ParserError<'buf>>
    where
        M: Matcher,
        F: FnOnce(Token<'buf>) -> Result<R, ParserError<'buf>>,
        G: FnOnce(&'_ Token<'buf>, M) -> Result<R, ParserError<'buf>>,
        R: fmt::Debug,
    {
        trace!(token = ?self.lexer.peek());

        let result = match self.lexer.peek() {
            Some(Ok(token)) if !matcher.matches(token) => on_fail(token, matcher),

            _ => match self.lexer.next() {
                Some(Ok(token)) => on_match(token),
                Some(Err(e)) => Err(e.into()),
                None => unreachable!("the lexer is never polled past the end of file"),
            },
        };

        trace!(result = ?result);

        result
    }

    #[instrument(
        level = "trace",
        ret,
        skip(self, matcher),
        fields(matcher = format_expected(matcher.expected_tokens()))
    )]
    fn expect(&mut self, matcher: impl Matcher) -> Result<Token<'buf>, ParserError<'buf>> {
        self.expect_generic(matcher, Ok, |token, matcher| {
            Err(ParserError::UnexpectedToken {
                expected: matcher.expected_tokens(),
                actual: token.clone(),
            })
        })
    }

    /// Consumes a token of type `ty` and extracts its payload.
    fn expect_value<R, F>(&mut self, ty: TokenType, extract: F) -> Result<Spanned<R>, ParserError<'buf>>
    where
        F: FnOnce(TokenValue<'buf>) -> Result<R, TokenValue<'buf>>,
    {
        let Token { span, value } = self.expect(ty)?;

        match extract(value) {
            Ok(value) => Ok(Spanned { value, span }),

            Err(value) => Err(ParserError::UnexpectedToken {
                expected: ty.expected_tokens(),
                actual: Token { span, value },
            }),
        }
    }

    #[instrument(
        level = "trace",
        ret,
        skip(self, matcher),
        fields(matcher = format_expected(matcher.expected_tokens()))
    )]
    fn try_consume(
        &mut self,
        matcher: impl Matcher,
    ) -> Result<Option<Token<'buf>>, ParserError<'buf>> {
        self.expect_generic(matcher, |token| Ok(Some(token)), |_, _| Ok(None))
    }

    #[instrument(
        level = "trace",
        ret,
        skip(self, matcher),
        fields(matcher = format_expected(matcher.expected_tokens()))
    )]
    fn matches_nth(&mut self, n: usize, matcher: impl Matcher) -> bool {
        trace!(token = ?self.lexer.peek_nth(n));

        matches!(self.lexer.peek_nth(n), Some(Ok(token)) if matcher.matches(token))
    }

    #[instrument(level = "trace", skip(self), ret)]
    pub fn parse(mut self) -> Result<ast::Program<'buf>, ParserError<'buf>> {
        let mut classes = Vec::new();

        loop {
            classes.push(self.parse_class()?);
            let semicolon = self.expect(Symbol::Semicolon)?;

            if self.try_consume(TokenType::Eof)?.is_some() {
                let span = match classes.first() {
                    Some(first) => first.span.convex_hull(&semicolon.span),
                    None => semicolon.span,
                };

                return Ok(ast::Program { classes, span });
            }
        }
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_class(&mut self) -> Result<ast::Class<'buf>, ParserError<'buf>> {
        let class = self.expect(Symbol::Class)?;
        let name = self.parse_ty_name()?;

        let inherits = match self.try_consume(Symbol::Inherits)? {
            Some(_) => Some(self.parse_ty_name()?),
            _ => None,
        };

        self.expect(Symbol::BraceLeft)?;
        let mut features = Vec::new();

        let brace_right = loop {
            if let Some(brace_right) = self.try_consume(Symbol::BraceRight)? {
                break brace_right;
            }

            features.push(self.parse_feature()?);
            self.expect(Symbol::Semicolon)?;
        };

        let span = class.span.convex_hull(&brace_right.span);

        Ok(ast::Class {
            name,
            inherits,
            features,
            span,
        })
    }

    fn parse_ident(&mut self) -> Result<Spanned<Cow<'buf, [u8]>>, ParserError<'buf>> {
        self.expect_value(TokenType::Ident, |value| match value {
            TokenValue::Ident(ident) => Ok(ident),
            value => Err(value),
        })
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_name(&mut self) -> Result<ast::Name<'buf>, ParserError<'buf>> {
        let ident = self.parse_ident()?;

        if ident.value.first().map_or(false, u8::is_ascii_uppercase) {
            Err(ParserError::UppercasedName(TyName(Name(ident))))
        } else {
            Ok(Name(ident))
        }
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_ty_name(&mut self) -> Result<ast::TyName<'buf>, ParserError<'buf>> {
        let ident = self.parse_ident()?;

        if ident.value.first().map_or(false, u8::is_ascii_lowercase) {
            Err(ParserError::LowercasedTyName(Name(ident)))
        } else {
            Ok(TyName(Name(ident)))
        }
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_feature(&mut self) -> Result<ast::Feature<'buf>, ParserError<'buf>> {
        let name = self.parse_name()?;

        Ok(select!(self: {
            Symbol::ParenLeft => ast::Feature::Method(self.parse_method(name)?),
            Symbol::Colon => ast::Feature::Field(ast::Field(self.parse_binding(name)?)),
            _ => @error,
        }))
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_method(&mut self, name: Name<'buf>) -> Result<ast::Method<'buf>, ParserError<'buf>> {
        self.expect(Symbol::ParenLeft)?;
        let mut params = Vec::new();

        loop {
            if self.try_consume(Symbol::ParenRight)?.is_some() {
                break;
            }

            if !params.is_empty() {
                self.expect(Symbol::Comma)?;
            }

            params.push(self.parse_formal()?);
        }

        self.expect(Symbol::Colon)?;
        let return_ty = self.parse_ty_name()?;

        self.expect(Symbol::BraceLeft)?;
        let body = self.parse_expr()?;
        let brace_right = self.expect(Symbol::BraceRight)?;
        let span = name.0.span.convex_hull(&brace_right.span);

        Ok(ast::Method {
            name,
            params,
            return_ty,
            body,
            span,
        })
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_formal(&mut self) -> Result<ast::Formal<'buf>, ParserError<'buf>> {
        let name = self.parse_name()?;
        self.expect(Symbol::Colon)?;
        let ty = self.parse_ty_name()?;
        let span = name.0.span.convex_hull(&ty.span());

        Ok(ast::Formal { name, ty, span })
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_binding(&mut self, name: Name<'buf>) -> Result<ast::Binding<'buf>, ParserError<'buf>> {
        self.expect(Symbol::Colon)?;
        let ty = self.parse_ty_name()?;

        let (span, init) = if self.try_consume(Symbol::ArrowLeft)?.is_some() {
            let expr = self.parse_expr()?;
            let span = name.0.span.convex_hull(&expr.span());

            (span, Some(expr))
        } else {
            let span = name.0.span.convex_hull(&ty.span());

            (span, None)
        };

        Ok(ast::Binding {
            name,
            ty,
            init,
            span,
        })
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_expr(&mut self) -> Result<Box<ast::Expr<'buf>>, ParserError<'buf>> {
        self.bounded()?.parse_expr_assign()
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_expr_assign(&mut self) -> Result<Box<ast::Expr<'buf>>, ParserError<'buf>> {
        if self.matches_nth(0, TokenType::Ident) && self.matches_nth(1, Symbol::ArrowLeft) {
            let name = self.parse_name()?;
            self.expect(Symbol::ArrowLeft)?;
            let expr = self.bounded()?.parse_expr_assign()?;
            let span = name.0.span.convex_hull(&expr.span());

            Ok(Box::new(Expr::Assignment(ast::Assignment { name, expr, span })))
        } else {
            self.parse_expr_prec(Prec::Lowest)
        }
    }

    /// Returns the next token's binary operator without consuming it.
    fn peek_op<T: TryFrom<Symbol>>(&mut self) -> Option<(T, Symbol)> {
        match self.lexer.peek() {
            Some(Ok(Token {
                value: TokenValue::Symbol(sym),
                ..
            })) => T::try_from(*sym).ok().map(|op| (op, *sym)),

            _ => None,
        }
    }

    /// Parses an operator expression whose binary operators all bind tighter than `min`.
    #[instrument(level = "trace", skip(self), ret)]
    fn parse_expr_prec(&mut self, min: Prec) -> Result<Box<ast::Expr<'buf>>, ParserError<'buf>> {
        let (mut lhs, prefix) = self.parse_expr_prefix(min)?;

        // nothing may follow a `not` operand at the same level
        if prefix == Some(UnOpKind::Not) {
            return Ok(lhs);
        }

        let mut seen_cmp = false;

        while let Some((op, sym)) = self.peek_op::<BinOpKind>() {
            let prec = Prec::of_bin_op(op);

            // comparisons are non-associative: `a < b < c` is rejected by the caller
            if prec <= min || (prec == Prec::Cmp && seen_cmp) {
                break;
            }

            seen_cmp |= prec == Prec::Cmp;
            self.expect(sym)?;
            let rhs = self.parse_expr_prec(prec)?;
            let span = lhs.span().convex_hull(&rhs.span());

            lhs = Box::new(Expr::BinOp(ast::BinOpExpr { op, lhs, rhs, span }));
        }

        Ok(lhs)
    }

    /// Parses a prefix operator application or a dispatch chain.
    ///
    /// A prefix operator is only accepted where it binds at least as tightly as `min`.
    fn parse_expr_prefix(
        &mut self,
        min: Prec,
    ) -> Result<(Box<ast::Expr<'buf>>, Option<UnOpKind>), ParserError<'buf>> {
        let Some((op, sym)) = self
            .peek_op::<UnOpKind>()
            .filter(|&(op, _)| Prec::of_un_op(op) >= min)
        else {
            return Ok((self.parse_expr_dispatch()?, None));
        };

        let token = self.expect(sym)?;
        let expr = self.bounded()?.parse_expr_prec(Prec::of_un_op(op))?;
        let span = token.span.convex_hull(&expr.span());

        Ok((Box::new(Expr::UnOp(ast::UnOpExpr { op, expr, span })), Some(op)))
    }

    /// Parses a chain of dispatches: `atom(.m(..) | @T.m(..))*`.
    #[instrument(level = "trace", skip(self), ret)]
    fn parse_expr_dispatch(&mut self) -> Result<Box<ast::Expr<'buf>>, ParserError<'buf>> {
        let mut object = self.parse_expr_atom()?;

        loop {
            let receiver_span = object.span().into_owned();

            let receiver = if self.try_consume(Symbol::Dot)?.is_some() {
                ast::Receiver::Dynamic(object)
            } else if self.try_consume(Symbol::At)?.is_some() {
                let ty = self.parse_ty_name()?;
                self.expect(Symbol::Dot)?;

                ast::Receiver::Static { object, ty }
            } else {
                break;
            };

            object = self.parse_method_call(Some(receiver_span), receiver)?;
        }

        Ok(object)
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_method_call(
        &mut self,
        receiver_span: Option<Span>,
        receiver: ast::Receiver<'buf>,
    ) -> Result<Box<ast::Expr<'buf>>, ParserError<'buf>> {
        let method = self.parse_name()?;
        self.expect(Symbol::ParenLeft)?;
        let mut args = Vec::new();

        let paren = loop {
            if let Some(paren) = self.try_consume(Symbol::ParenRight)? {
                break paren;
            }

            if !args.is_empty() {
                self.expect(Symbol::Comma)?;
            }

            args.push(self.parse_expr()?);
        };

        let span = receiver_span
            .as_ref()
            .unwrap_or(&method.0.span)
            .convex_hull(&paren.span);

        Ok(Box::new(Expr::Call(ast::Call {
            receiver,
            method,
            args,
            span,
        })))
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_expr_atom(&mut self) -> Result<Box<ast::Expr<'buf>>, ParserError<'buf>> {
        select!(self: {
            Symbol::If => self.parse_if(),
            Symbol::While => self.parse_while(),
            Symbol::BraceLeft => self.parse_block(),
            Symbol::Let => self.parse_let(),
            Symbol::Case => self.parse_case(),
            Symbol::New => self.parse_new(),
            Symbol::ParenLeft => self.parse_group(),

            TokenType::Ident => self.parse_expr_self_call(),
            TokenType::Int => self.parse_int_lit(),
            TokenType::String => self.parse_string_lit(),
            &[Symbol::True, Symbol::False] => self.parse_bool_lit(),

            _ => @error,
        })
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_if(&mut self) -> Result<Box<ast::Expr<'buf>>, ParserError<'buf>> {
        let r#if = self.expect(Symbol::If)?;
        let antecedent = self.parse_expr()?;
        self.expect(Symbol::Then)?;
        let consequent = self.parse_expr()?;
        self.expect(Symbol::Else)?;
        let alternative = self.parse_expr()?;
        let fi = self.expect(Symbol::Fi)?;

        let span = r#if.span.convex_hull(&fi.span);

        Ok(Box::new(Expr::If(ast::If {
            antecedent,
            consequent,
            alternative,
            span,
        })))
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_while(&mut self) -> Result<Box<ast::Expr<'buf>>, ParserError<'buf>> {
        let r#while = self.expect(Symbol::While)?;
        let condition = self.parse_expr()?;
        self.expect(Symbol::Loop)?;
        let body = self.parse_expr()?;
        let pool = self.expect(Symbol::Pool)?;

        let span = r#while.span.convex_hull(&pool.span);

        Ok(Box::new(Expr::While(ast::While {
            condition,
            body,
            span,
        })))
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_block(&mut self) -> Result<Box<ast::Expr<'buf>>, ParserError<'buf>> {
        let brace_left = self.expect(Symbol::BraceLeft)?;
        let mut body = Vec::new();

        let brace_right = loop {
            body.push(self.parse_expr()?);
            self.expect(Symbol::Semicolon)?;

            if let Some(brace_right) = self.try_consume(Symbol::BraceRight)? {
                break brace_right;
            }
        };

        let span = brace_left.span.convex_hull(&brace_right.span);

        Ok(Box::new(Expr::Block(ast::Block { body, span })))
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_let(&mut self) -> Result<Box<ast::Expr<'buf>>, ParserError<'buf>> {
        let r#let = self.expect(Symbol::Let)?;
        let mut bindings = Vec::new();

        loop {
            let name = self.parse_name()?;
            bindings.push(self.parse_binding(name)?);

            if self.try_consume(Symbol::In)?.is_some() {
                break;
            }

            self.expect(Symbol::Comma)?;
        }

        let expr = self.parse_expr()?;
        let span = r#let.span.convex_hull(&expr.span());

        Ok(Box::new(Expr::Let(ast::Let {
            bindings,
            expr,
            span,
        })))
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_case(&mut self) -> Result<Box<ast::Expr<'buf>>, ParserError<'buf>> {
        let case = self.expect(Symbol::Case)?;
        let scrutinee = self.parse_expr()?;
        self.expect(Symbol::Of)?;
        let mut arms = Vec::new();

        let esac = loop {
            let name = self.parse_name()?;
            self.expect(Symbol::Colon)?;
            let ty = self.parse_ty_name()?;
            self.expect(Symbol::Implies)?;
            let expr = self.parse_expr()?;
            let semicolon = self.expect(Symbol::Semicolon)?;

            let span = name.0.span.convex_hull(&semicolon.span);

            arms.push(ast::CaseArm {
                name,
                ty,
                expr,
                span,
            });

            if let Some(esac) = self.try_consume(Symbol::Esac)? {
                break esac;
            }
        };

        let span = case.span.convex_hull(&esac.span);

        Ok(Box::new(Expr::Case(ast::Case {
            scrutinee,
            arms,
            span,
        })))
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_new(&mut self) -> Result<Box<ast::Expr<'buf>>, ParserError<'buf>> {
        let new = self.expect(Symbol::New)?;
        let ty = self.parse_ty_name()?;
        let span = new.span.convex_hull(&ty.span());

        Ok(Box::new(Expr::New(ast::New { ty, span })))
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_group(&mut self) -> Result<Box<ast::Expr<'buf>>, ParserError<'buf>> {
        let paren_left = self.expect(Symbol::ParenLeft)?;
        let expr = self.parse_expr()?;
        let paren_right = self.expect(Symbol::ParenRight)?;
        let span = paren_left.span.convex_hull(&paren_right.span);

        Ok(Box::new(Expr::Group(ast::Group { expr, span })))
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_expr_self_call(&mut self) -> Result<Box<ast::Expr<'buf>>, ParserError<'buf>> {
        if self.matches_nth(1, Symbol::ParenLeft) {
            self.parse_method_call(None, ast::Receiver::SelfType)
        } else {
            let name = self.parse_name()?;

            Ok(Box::new(Expr::Name(ast::NameExpr(name))))
        }
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_int_lit(&mut self) -> Result<Box<ast::Expr<'buf>>, ParserError<'buf>> {
        let value = self.expect_value(TokenType::Int, |value| match value {
            TokenValue::Int(i) => Ok(i),
            value => Err(value),
        })?;

        Ok(Box::new(Expr::Int(ast::IntLit(value))))
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_string_lit(&mut self) -> Result<Box<ast::Expr<'buf>>, ParserError<'buf>> {
        let value = self.expect_value(TokenType::String, |value| match value {
            TokenValue::String(s) => Ok(s),
            value => Err(value),
        })?;

        Ok(Box::new(Expr::String(ast::StringLit(value))))
    }

    #[instrument(level = "trace", skip(self), ret)]
    fn parse_bool_lit(&mut self) -> Result<Box<ast::Expr<'buf>>, ParserError<'buf>> {
        let token = self.expect(&[Symbol::True, Symbol::False])?;
        let value = token.value == TokenValue::Symbol(Symbol::True);

        Ok(Box::new(Expr::Bool(ast::BoolLit(Spanned {
            value,
            span: token.span,
        }))))
    }
}
