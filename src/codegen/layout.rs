//! Object layout and naming conventions shared by every generated function.

use crate::analysis::{BuiltinClass, ClassName, FieldTy, TypeCtx};
use crate::ir::IrTy;
use crate::util::slice_formatter;

pub const SELF_REG: &str = "self";
pub const CONSTRUCTOR: &[u8] = b"constructor";

/// Maps a class to the type of its values: `Int` and `Bool` are unboxed, everything else is a
/// pointer to the object's slots.
pub fn ir_ty(ty: &ClassName<'_>) -> IrTy {
    match ty {
        ClassName::Builtin(BuiltinClass::Int) => IrTy::Int,
        ClassName::Builtin(BuiltinClass::Bool) => IrTy::Bool,
        _ => IrTy::object(),
    }
}

/// `<Owner>__<member>`.
pub fn mangle(owner: &ClassName<'_>, member: &[u8]) -> String {
    format!("{}__{}", owner, slice_formatter(member))
}

/// The slot index of `field` in objects of class `class`.
///
/// Slots are numbered from the root ancestor down, each class's fields in declaration order.
pub fn field_slot<'a, 'buf>(
    ctx: &'a TypeCtx<'buf>,
    class: &'a ClassName<'buf>,
    field: &[u8],
) -> Option<(usize, &'a FieldTy<'buf>)> {
    // a field can be shadowed only by an ill-formed program, so the last match is the closest
    ctx.fields_in_layout_order(class)
        .into_iter()
        .enumerate()
        .filter(|(_, (name, _))| *name == field)
        .map(|(idx, (_, ty))| (idx, ty))
        .last()
}

/// The number of slots allocated for an object of class `class`.
pub fn object_size<'buf>(ctx: &TypeCtx<'buf>, class: &ClassName<'buf>) -> usize {
    ctx.fields_in_layout_order(class).len().max(1)
}
