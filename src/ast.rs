use std::borrow::Cow;
use std::fmt::{self, Display};

use byte_string::ByteStr;
use serde::{Serialize, Serializer};

use crate::parse::token::Symbol;
use crate::position::{HasSpan, Span, Spanned};
use crate::util::{slice_formatter, CloneStatic};

macro_rules! define_visitor {
    ($( $variant:ident => $name:ident ( $ty:ty ) ),+ $(,)?) => {
        /// An expression visitor: one method per expression kind.
        pub trait Visitor<'buf> {
            type Output;

            $(
                fn $name(&mut self, expr: &$ty) -> Self::Output;
            )+
        }

        impl<'buf> Expr<'buf> {
            pub fn accept<V: Visitor<'buf>>(&self, visitor: &mut V) -> V::Output {
                match self {
                    $( Self::$variant(expr) => visitor.$name(expr), )+
                }
            }
        }

        impl HasSpan for Expr<'_> {
            fn span(&self) -> Cow<'_, Span> {
                match self {
                    $( Self::$variant(expr) => expr.span(), )+
                }
            }
        }
    };
}

macro_rules! impl_has_span {
    ($type:ty) => {
        impl HasSpan for $type {
            fn span(&self) -> Cow<'_, Span> {
                Cow::Borrowed(&self.span)
            }
        }
    };

    (|&$s:ident: $type:ty| $body:expr) => {
        impl HasSpan for $type {
            fn span(&$s) -> Cow<'_, Span> {
                Cow::Borrowed($body)
            }
        }
    };

    (&$s:ident: $type:ty => $body:expr) => {
        impl HasSpan for $type {
            fn span(&$s) -> Cow<'_, Span> {
                $body
            }
        }
    };
}

macro_rules! define_op_kind {
    ($name:ident { $( $op:ident => $symbol:ident, )+ }) => {
        #[derive(Serialize, Debug, Clone, Copy, Eq, PartialEq, Hash)]
        pub enum $name {
            $( $op, )+
        }

        impl $name {
            pub fn symbol(self) -> Symbol {
                match self {
                    $( Self::$op => Symbol::$symbol, )+
                }
            }
        }

        impl TryFrom<Symbol> for $name {
            type Error = ();

            fn try_from(symbol: Symbol) -> Result<Self, Self::Error> {
                match symbol {
                    $( Symbol::$symbol => Ok(Self::$op), )+
                    _ => Err(()),
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.symbol())
            }
        }
    }
}

define_visitor! {
    Assignment => visit_assignment(Assignment<'buf>),
    Call => visit_call(Call<'buf>),
    If => visit_if(If<'buf>),
    While => visit_while(While<'buf>),
    Block => visit_block(Block<'buf>),
    Let => visit_let(Let<'buf>),
    Case => visit_case(Case<'buf>),
    New => visit_new(New<'buf>),
    BinOp => visit_bin_op(BinOpExpr<'buf>),
    UnOp => visit_un_op(UnOpExpr<'buf>),
    Name => visit_name_expr(NameExpr<'buf>),
    Group => visit_group(Group<'buf>),
    Int => visit_int_lit(IntLit),
    String => visit_string_lit(StringLit<'buf>),
    Bool => visit_bool_lit(BoolLit),
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct Program<'buf> {
    pub classes: Vec<Class<'buf>>,
    pub span: Span,
}

impl_has_span!(Program<'_>);

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct Class<'buf> {
    pub name: TyName<'buf>,
    pub inherits: Option<TyName<'buf>>,
    pub features: Vec<Feature<'buf>>,
    pub span: Span,
}

impl<'buf> Class<'buf> {
    pub fn methods(&self) -> impl Iterator<Item = &Method<'buf>> {
        self.features.iter().filter_map(|feature| match feature {
            Feature::Method(method) => Some(method),
            Feature::Field(_) => None,
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field<'buf>> {
        self.features.iter().filter_map(|feature| match feature {
            Feature::Field(field) => Some(field),
            Feature::Method(_) => None,
        })
    }
}

impl_has_span!(Class<'_>);

/// An object identifier (starts with a lowercase letter).
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Name<'buf>(pub Spanned<Cow<'buf, [u8]>>);

impl<'buf> Name<'buf> {
    pub fn as_slice(&self) -> &[u8] {
        &self.0.value
    }

    pub fn is_self(&self) -> bool {
        self.as_slice() == b"self"
    }
}

impl_has_span!(|&self: Name<'_>| &self.0.span);

impl fmt::Debug for Name<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Name")
            .field("span", &self.0.span)
            .field("value", &ByteStr::new(&self.0.value))
            .finish()
    }
}

impl Display for Name<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", slice_formatter(&self.0.value))
    }
}

impl Serialize for Name<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        slice_formatter(&self.0.value).serialize(serializer)
    }
}

impl CloneStatic<Name<'static>> for Name<'_> {
    fn clone_static(&self) -> Name<'static> {
        Name(Spanned {
            value: self.0.value.clone_static(),
            span: self.0.span.clone(),
        })
    }
}

/// A type identifier (starts with an uppercase letter).
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct TyName<'buf>(pub Name<'buf>);

impl<'buf> TyName<'buf> {
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn is_self_type(&self) -> bool {
        self.as_slice() == b"SELF_TYPE"
    }
}

impl_has_span!(&self: TyName<'_> => self.0.span());

impl fmt::Debug for TyName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TyName").field(&self.0).finish()
    }
}

impl Display for TyName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for TyName<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl CloneStatic<TyName<'static>> for TyName<'_> {
    fn clone_static(&self) -> TyName<'static> {
        TyName(self.0.clone_static())
    }
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub enum Feature<'buf> {
    Method(Method<'buf>),
    Field(Field<'buf>),
}

impl_has_span!(&self: Feature<'_> => match self {
    Self::Method(method) => method.span(),
    Self::Field(field) => field.span(),
});

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct Method<'buf> {
    pub name: Name<'buf>,
    pub params: Vec<Formal<'buf>>,
    pub return_ty: TyName<'buf>,
    pub body: Box<Expr<'buf>>,
    pub span: Span,
}

impl_has_span!(Method<'_>);

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct Formal<'buf> {
    pub name: Name<'buf>,
    pub ty: TyName<'buf>,
    pub span: Span,
}

impl_has_span!(Formal<'_>);

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct Field<'buf>(pub Binding<'buf>);

impl_has_span!(|&self: Field<'_>| &self.0.span);

/// A name with a declared type and an optional initializer: an attribute or a `let` binding.
#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct Binding<'buf> {
    pub name: Name<'buf>,
    pub ty: TyName<'buf>,
    pub init: Option<Box<Expr<'buf>>>,
    pub span: Span,
}

impl_has_span!(Binding<'_>);

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub enum Expr<'buf> {
    Assignment(Assignment<'buf>),
    Call(Call<'buf>),
    If(If<'buf>),
    While(While<'buf>),
    Block(Block<'buf>),
    Let(Let<'buf>),
    Case(Case<'buf>),
    New(New<'buf>),
    BinOp(BinOpExpr<'buf>),
    UnOp(UnOpExpr<'buf>),
    Name(NameExpr<'buf>),
    Group(Group<'buf>),
    Int(IntLit),
    String(StringLit<'buf>),
    Bool(BoolLit),
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct Assignment<'buf> {
    pub name: Name<'buf>,
    pub expr: Box<Expr<'buf>>,
    pub span: Span,
}

impl_has_span!(Assignment<'_>);

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct Call<'buf> {
    pub receiver: Receiver<'buf>,
    pub method: Name<'buf>,
    pub args: Vec<Box<Expr<'buf>>>,
    pub span: Span,
}

impl_has_span!(Call<'_>);

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub enum Receiver<'buf> {
    /// `method(args)`: an implicit `self` receiver.
    SelfType,

    /// `expr.method(args)`
    Dynamic(Box<Expr<'buf>>),

    /// `expr@Type.method(args)`
    Static {
        object: Box<Expr<'buf>>,
        ty: TyName<'buf>,
    },
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct If<'buf> {
    pub antecedent: Box<Expr<'buf>>,
    pub consequent: Box<Expr<'buf>>,
    pub alternative: Box<Expr<'buf>>,
    pub span: Span,
}

impl_has_span!(If<'_>);

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct While<'buf> {
    pub condition: Box<Expr<'buf>>,
    pub body: Box<Expr<'buf>>,
    pub span: Span,
}

impl_has_span!(While<'_>);

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct Block<'buf> {
    pub body: Vec<Box<Expr<'buf>>>,
    pub span: Span,
}

impl_has_span!(Block<'_>);

/// `let a: A <- .., b: B in expr`: all bindings share one scope, each visible to the next.
#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct Let<'buf> {
    pub bindings: Vec<Binding<'buf>>,
    pub expr: Box<Expr<'buf>>,
    pub span: Span,
}

impl_has_span!(Let<'_>);

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct Case<'buf> {
    pub scrutinee: Box<Expr<'buf>>,
    pub arms: Vec<CaseArm<'buf>>,
    pub span: Span,
}

impl_has_span!(Case<'_>);

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct CaseArm<'buf> {
    pub name: Name<'buf>,
    pub ty: TyName<'buf>,
    pub expr: Box<Expr<'buf>>,
    pub span: Span,
}

impl_has_span!(CaseArm<'_>);

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct New<'buf> {
    pub ty: TyName<'buf>,
    pub span: Span,
}

impl_has_span!(New<'_>);

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct BinOpExpr<'buf> {
    pub op: BinOpKind,
    pub lhs: Box<Expr<'buf>>,
    pub rhs: Box<Expr<'buf>>,
    pub span: Span,
}

impl_has_span!(BinOpExpr<'_>);

define_op_kind!(BinOpKind {
    Add => Plus,
    Subtract => Minus,
    Multiply => Asterisk,
    Divide => Slash,
    LessThan => Less,
    LessEquals => LessEquals,
    Equals => Equals,
});

impl BinOpKind {
    pub fn is_comparison(self) -> bool {
        matches!(self, Self::LessThan | Self::LessEquals | Self::Equals)
    }
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct UnOpExpr<'buf> {
    pub op: UnOpKind,
    pub expr: Box<Expr<'buf>>,
    pub span: Span,
}

impl_has_span!(UnOpExpr<'_>);

define_op_kind!(UnOpKind {
    IsVoid => IsVoid,
    Complement => Tilde,
    Not => Not,
});

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct NameExpr<'buf>(pub Name<'buf>);

impl_has_span!(&self: NameExpr<'_> => self.0.span());

/// A parenthesized expression.
#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct Group<'buf> {
    pub expr: Box<Expr<'buf>>,
    pub span: Span,
}

impl_has_span!(Group<'_>);

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct IntLit(pub Spanned<i64>);

impl_has_span!(|&self: IntLit| &self.0.span);

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct StringLit<'buf>(pub Spanned<Cow<'buf, [u8]>>);

impl fmt::Debug for StringLit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringLit")
            .field("span", &self.0.span)
            .field("value", &ByteStr::new(self.0.value.as_ref()))
            .finish()
    }
}

impl Serialize for StringLit<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        slice_formatter(&self.0.value).serialize(serializer)
    }
}

impl_has_span!(|&self: StringLit<'_>| &self.0.span);

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct BoolLit(pub Spanned<bool>);

impl_has_span!(|&self: BoolLit| &self.0.span);
