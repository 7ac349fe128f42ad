mod builtin;
mod ctx;
mod error;
mod layout;
mod lower;

use tracing::{debug, trace, warn};

use crate::analysis::{hierarchy_order, ClassName, TypeCtx};
use crate::ast::{Class, Method};
use crate::ir::{EffectOp, Function, Instr, IrTy, Literal, Param, Program, ValueOp};
use crate::position::HasSpan;
use crate::util::{slice_formatter, CloneStatic};

pub use builtin::BUILTIN_METHODS;
pub use ctx::{FuncCtx, Local};
pub use error::{CodegenError, UnsupportedConstruct};
pub use layout::{field_slot, ir_ty, mangle, object_size};
pub use lower::{CodegenResult, Lowered, Lowerer};

use layout::{CONSTRUCTOR, SELF_REG};

/// The name of the generated entry function.
pub const ENTRY_FUNC: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    /// The class whose method becomes the entry function.
    pub entry_class: String,

    /// The method of `entry_class` that becomes the entry function.
    pub entry_method: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            entry_class: "Main".into(),
            entry_method: "main".into(),
        }
    }
}

/// Generates a Bril program from type-checked classes.
///
/// `ctx` must be the class table the classes were checked against.
pub fn generate<'buf>(
    classes: &[Class<'buf>],
    ctx: &TypeCtx<'buf>,
    options: &CodegenOptions,
) -> CodegenResult<Program> {
    Codegen::new(ctx, options).generate(classes)
}

struct Codegen<'a, 'buf> {
    ctx: &'a TypeCtx<'buf>,
    options: &'a CodegenOptions,
    entry_found: bool,
}

impl<'a, 'buf> Codegen<'a, 'buf> {
    fn new(ctx: &'a TypeCtx<'buf>, options: &'a CodegenOptions) -> Self {
        Self {
            ctx,
            options,
            entry_found: false,
        }
    }

    fn generate(mut self, classes: &[Class<'buf>]) -> CodegenResult<Program> {
        let mut functions = builtin::builtin_functions();

        for class in hierarchy_order(self.ctx, classes) {
            let class_name = ClassName::from(&class.name);
            debug!(class = %class_name, "generating a class");

            functions.push(self.constructor(class, &class_name)?);

            for method in class.methods() {
                functions.push(self.method(method, &class_name)?);
            }
        }

        if !self.entry_found {
            warn!(
                class = %self.options.entry_class,
                method = %self.options.entry_method,
                "the entry method is not defined; no entry function generated",
            );
        }

        Ok(Program { functions })
    }

    fn is_entry(&self, class_name: &ClassName<'buf>, method: &Method<'buf>) -> bool {
        class_name.as_bytes() == self.options.entry_class.as_bytes()
            && method.name.as_slice() == self.options.entry_method.as_bytes()
    }

    /// Generates `<Class>__constructor`: runs the parent's constructor, then initializes the
    /// class's own attributes in declaration order.
    fn constructor(
        &self,
        class: &Class<'buf>,
        class_name: &ClassName<'buf>,
    ) -> CodegenResult<Function> {
        let mut lowerer = Lowerer::new(self.ctx, class_name.clone());
        let mut func = Function::new(
            mangle(class_name, CONSTRUCTOR),
            vec![Param::new(SELF_REG, IrTy::object())],
            Some(IrTy::object()),
        );

        let Some(index) = self.ctx.get_class(class_name) else {
            return Err(CodegenError::UnknownClass {
                name: class_name.clone_static(),
                span: class.name.span().into_owned(),
            });
        };

        if let Some(parent) = index.parent().filter(|parent| !parent.is_builtin()) {
            let dest = lowerer.func.temp();
            func.instrs.push(Instr::call(
                dest,
                IrTy::object(),
                mangle(parent, CONSTRUCTOR),
                vec![SELF_REG.to_owned()],
            ));
        }

        for field in class.fields() {
            let binding = &field.0;
            let ty = ClassName::from(&binding.ty).resolve(class_name);
            trace!(class = %class_name, field = %binding.name, "initializing a field");

            let value = match &binding.init {
                Some(init) => {
                    let init = lowerer.lower(init)?;
                    func.instrs.extend(init.instrs);

                    init.dest
                }

                None => {
                    let dest = lowerer.func.temp();

                    match lowerer.default_value(&dest, &ty) {
                        Some(instr) => func.instrs.push(instr),
                        None => continue,
                    }

                    dest
                }
            };

            let (addr, _) = lowerer.field_address(&mut func.instrs, &binding.name)?;
            func.instrs.push(Instr::effect(EffectOp::Store, [addr, value]));
        }

        func.instrs.push(Instr::ret(Some(SELF_REG.to_owned())));

        Ok(func)
    }

    fn method(
        &mut self,
        method: &Method<'buf>,
        class_name: &ClassName<'buf>,
    ) -> CodegenResult<Function> {
        if self.is_entry(class_name, method) {
            self.entry_found = true;

            return self.entry(method, class_name);
        }

        let mut lowerer = Lowerer::new(self.ctx, class_name.clone());
        let mut args = vec![Param::new(SELF_REG, IrTy::object())];

        for formal in &method.params {
            let ty = ClassName::from(&formal.ty).resolve(class_name);
            let reg = lowerer.func.bind(formal.name.0.value.clone(), ty.clone());
            args.push(Param::new(reg, ir_ty(&ty)));
        }

        let ret_ty = ClassName::from(&method.return_ty).resolve(class_name);
        let mut func = Function::new(
            mangle(class_name, method.name.as_slice()),
            args,
            Some(ir_ty(&ret_ty)),
        );

        trace!(func = %func.name, "generating a method");

        let body = lowerer.lower(&method.body)?;
        func.instrs.extend(body.instrs);
        func.instrs.push(Instr::ret(Some(body.dest)));

        let leaked = lowerer.func.take_pending_frees();

        if !leaked.is_empty() {
            trace!(
                func = %func.name,
                count = leaked.len(),
                "objects allocated outside the entry function are not freed",
            );
        }

        Ok(func)
    }

    /// Generates the entry function: allocates and constructs the receiver, runs the body, and
    /// frees every object allocated along the way.
    fn entry(&self, method: &Method<'buf>, class_name: &ClassName<'buf>) -> CodegenResult<Function> {
        debug!(
            class = %class_name,
            method = %slice_formatter(method.name.as_slice()),
            "generating the entry function",
        );

        let mut lowerer = Lowerer::new(self.ctx, class_name.clone());
        let mut func = Function::new(ENTRY_FUNC, vec![], None);

        let size = lowerer.func.temp();
        func.instrs.extend([
            Instr::constant(&size, Literal::Int(object_size(self.ctx, class_name) as i64)),
            Instr::value(ValueOp::Alloc, SELF_REG, IrTy::object(), [size]),
            Instr::call(
                SELF_REG,
                IrTy::object(),
                mangle(class_name, CONSTRUCTOR),
                vec![SELF_REG.to_owned()],
            ),
        ]);

        let body = lowerer.lower(&method.body)?;
        func.instrs.extend(body.instrs);

        func.instrs.push(Instr::effect(EffectOp::Free, [SELF_REG]));

        for reg in lowerer.func.take_pending_frees() {
            func.instrs.push(Instr::effect(EffectOp::Free, [reg]));
        }

        func.instrs.push(Instr::ret(None));

        Ok(func)
    }
}
