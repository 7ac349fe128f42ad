use crate::analysis::{BuiltinClass, ClassName};
use crate::ir::{EffectOp, Function, Instr, IrTy, Param};

use super::layout::{mangle, SELF_REG};

/// Built-in methods that have a Bril implementation.
pub static BUILTIN_METHODS: &[(BuiltinClass, &[u8])] = &[(BuiltinClass::IO, b"out_int")];

pub fn is_available(class: &ClassName<'_>, method: &[u8]) -> bool {
    BUILTIN_METHODS
        .iter()
        .any(|&(builtin, name)| class == &ClassName::Builtin(builtin) && name == method)
}

fn out_int() -> Function {
    let mut func = Function::new(
        mangle(&BuiltinClass::IO.into(), b"out_int"),
        vec![
            Param::new(SELF_REG, IrTy::object()),
            Param::new("number", IrTy::Int),
        ],
        Some(IrTy::object()),
    );

    func.instrs.push(Instr::effect(EffectOp::Print, ["number"]));
    func.instrs.push(Instr::ret(Some(SELF_REG.to_owned())));

    func
}

/// The functions implementing [`BUILTIN_METHODS`], in the same order.
pub fn builtin_functions() -> Vec<Function> {
    vec![out_int()]
}
