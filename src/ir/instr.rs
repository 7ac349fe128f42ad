use std::fmt::{self, Display};

use super::ty::{IrTy, Literal};

macro_rules! define_ops {
    ($( $( #[$attr:meta] )* pub enum $name:ident { $( $variant:ident => $op:literal, )+ } )+) => {
        $(
            $( #[$attr] )*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum $name {
                $( $variant, )+
            }

            impl $name {
                pub fn as_str(self) -> &'static str {
                    match self {
                        $( Self::$variant => $op, )+
                    }
                }
            }

            impl Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

define_ops! {
    /// Operations that produce a value.
    pub enum ValueOp {
        Add => "add",
        Sub => "sub",
        Mul => "mul",
        Div => "div",
        Lt => "lt",
        Le => "le",
        Eq => "eq",
        Not => "not",
        Id => "id",
        Call => "call",
        Alloc => "alloc",
        PtrAdd => "ptradd",
        Load => "load",
    }

    /// Operations executed only for their side effects.
    pub enum EffectOp {
        Jmp => "jmp",
        Br => "br",
        Call => "call",
        Ret => "ret",
        Print => "print",
        Free => "free",
        Store => "store",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    Label(String),

    Const {
        dest: String,
        ty: IrTy,
        value: Literal,
    },

    Value {
        op: ValueOp,
        dest: String,
        ty: IrTy,
        args: Vec<String>,
        funcs: Vec<String>,
    },

    Effect {
        op: EffectOp,
        args: Vec<String>,
        funcs: Vec<String>,
        labels: Vec<String>,
    },
}

impl Instr {
    pub fn label(name: impl Into<String>) -> Self {
        Self::Label(name.into())
    }

    pub fn constant(dest: impl Into<String>, value: Literal) -> Self {
        Self::Const {
            dest: dest.into(),
            ty: value.ty(),
            value,
        }
    }

    pub fn value<A>(op: ValueOp, dest: impl Into<String>, ty: IrTy, args: A) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
    {
        Self::Value {
            op,
            dest: dest.into(),
            ty,
            args: args.into_iter().map(Into::into).collect(),
            funcs: vec![],
        }
    }

    pub fn call(dest: impl Into<String>, ty: IrTy, func: impl Into<String>, args: Vec<String>) -> Self {
        Self::Value {
            op: ValueOp::Call,
            dest: dest.into(),
            ty,
            args,
            funcs: vec![func.into()],
        }
    }

    pub fn effect<A>(op: EffectOp, args: A) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
    {
        Self::Effect {
            op,
            args: args.into_iter().map(Into::into).collect(),
            funcs: vec![],
            labels: vec![],
        }
    }

    pub fn jmp(label: impl Into<String>) -> Self {
        Self::Effect {
            op: EffectOp::Jmp,
            args: vec![],
            funcs: vec![],
            labels: vec![label.into()],
        }
    }

    pub fn br(cond: impl Into<String>, then: impl Into<String>, otherwise: impl Into<String>) -> Self {
        Self::Effect {
            op: EffectOp::Br,
            args: vec![cond.into()],
            funcs: vec![],
            labels: vec![then.into(), otherwise.into()],
        }
    }

    pub fn ret(arg: Option<String>) -> Self {
        Self::effect(EffectOp::Ret, arg)
    }

    /// The register written by this instruction, if any.
    pub fn dest(&self) -> Option<&str> {
        match self {
            Self::Const { dest, .. } | Self::Value { dest, .. } => Some(dest),
            Self::Label(_) | Self::Effect { .. } => None,
        }
    }

    /// The textual name of the operation (`label` for labels).
    pub fn op_name(&self) -> &'static str {
        match self {
            Self::Label(_) => "label",
            Self::Const { .. } => "const",
            Self::Value { op, .. } => op.as_str(),
            Self::Effect { op, .. } => op.as_str(),
        }
    }
}

fn write_operands(
    f: &mut fmt::Formatter<'_>,
    funcs: &[String],
    args: &[String],
    labels: &[String],
) -> fmt::Result {
    for func in funcs {
        write!(f, " @{}", func)?;
    }

    for arg in args {
        write!(f, " {}", arg)?;
    }

    for label in labels {
        write!(f, " .{}", label)?;
    }

    Ok(())
}

/// Formats the instruction in the Bril text syntax, without indentation.
impl Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(name) => write!(f, ".{}:", name),

            Self::Const { dest, ty, value } => write!(f, "{}: {} = const {};", dest, ty, value),

            Self::Value {
                op,
                dest,
                ty,
                args,
                funcs,
            } => {
                write!(f, "{}: {} = {}", dest, ty, op)?;
                write_operands(f, funcs, args, &[])?;
                write!(f, ";")
            }

            Self::Effect {
                op,
                args,
                funcs,
                labels,
            } => {
                write!(f, "{}", op)?;
                write_operands(f, funcs, args, labels)?;
                write!(f, ";")
            }
        }
    }
}
