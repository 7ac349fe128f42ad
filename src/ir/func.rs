use std::fmt::{self, Display};

use super::instr::Instr;
use super::ty::IrTy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: IrTy,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: IrTy) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub args: Vec<Param>,
    pub ret_ty: Option<IrTy>,
    pub instrs: Vec<Instr>,
}

impl Function {
    pub fn new(name: impl Into<String>, args: Vec<Param>, ret_ty: Option<IrTy>) -> Self {
        Self {
            name: name.into(),
            args,
            ret_ty,
            instrs: vec![],
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;

        if !self.args.is_empty() {
            write!(f, "(")?;

            for (idx, param) in self.args.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }

                write!(f, "{}: {}", param.name, param.ty)?;
            }

            write!(f, ")")?;
        }

        if let Some(ty) = &self.ret_ty {
            write!(f, ": {}", ty)?;
        }

        writeln!(f, " {{")?;

        for instr in &self.instrs {
            match instr {
                Instr::Label(_) => writeln!(f, "{}", instr)?,
                _ => writeln!(f, "  {}", instr)?,
            }
        }

        write!(f, "}}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub functions: Vec<Function>,
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|func| func.name == name)
    }

    /// Serializes the program in the canonical Bril JSON form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Formats the program in the Bril text syntax.
impl Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for func in &self.functions {
            writeln!(f, "{}", func)?;
        }

        Ok(())
    }
}
