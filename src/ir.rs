//! A Bril program: functions made of flat three-address instructions over named registers.

mod func;
mod instr;
mod json;
mod ty;

pub use func::{Function, Param, Program};
pub use instr::{EffectOp, Instr, ValueOp};
pub use ty::{IrTy, Literal};
