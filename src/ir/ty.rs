use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrTy {
    Int,
    Bool,
    Ptr(Box<IrTy>),
}

impl IrTy {
    /// The type of every object reference.
    pub fn object() -> Self {
        Self::Ptr(Box::new(Self::Int))
    }
}

impl Display for IrTy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Bool => write!(f, "bool"),
            Self::Ptr(pointee) => write!(f, "ptr<{}>", pointee),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Literal {
    Int(i64),
    Bool(bool),
}

impl Literal {
    pub fn ty(&self) -> IrTy {
        match self {
            Self::Int(_) => IrTy::Int,
            Self::Bool(_) => IrTy::Bool,
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{}", value),
            Self::Bool(value) => write!(f, "{}", value),
        }
    }
}
