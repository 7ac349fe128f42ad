use tracing::trace;

use crate::analysis::{BuiltinClass, ClassName, TypeCtx};
use crate::ast::{self, BinOpKind, UnOpKind, Visitor};
use crate::ir::{EffectOp, Instr, IrTy, Literal, ValueOp};
use crate::position::HasSpan;
use crate::util::CloneStatic;

use super::builtin;
use super::ctx::FuncCtx;
use super::error::{CodegenError, UnsupportedConstruct};
use super::layout::{field_slot, ir_ty, mangle, object_size, CONSTRUCTOR, SELF_REG};

pub type CodegenResult<T> = Result<T, CodegenError>;

/// The code computing an expression, the register holding its value, and its static type.
#[derive(Debug, Clone)]
pub struct Lowered<'buf> {
    pub instrs: Vec<Instr>,
    pub dest: String,
    pub ty: ClassName<'buf>,
}

/// Lowers expressions occurring in methods of the class `self_ty`.
pub struct Lowerer<'a, 'buf> {
    ctx: &'a TypeCtx<'buf>,
    self_ty: ClassName<'buf>,
    pub func: FuncCtx<'buf>,
}

impl<'a, 'buf> Lowerer<'a, 'buf> {
    pub fn new(ctx: &'a TypeCtx<'buf>, self_ty: ClassName<'buf>) -> Self {
        Self {
            ctx,
            self_ty,
            func: FuncCtx::new(),
        }
    }

    pub fn lower(&mut self, expr: &ast::Expr<'buf>) -> CodegenResult<Lowered<'buf>> {
        expr.accept(self)
    }

    /// Emits the address of the attribute `name` of `self`, returning the register holding it and
    /// the attribute's type.
    pub fn field_address(
        &mut self,
        instrs: &mut Vec<Instr>,
        name: &ast::Name<'buf>,
    ) -> CodegenResult<(String, ClassName<'buf>)> {
        let Some((slot, field_ty)) = field_slot(self.ctx, &self.self_ty, name.as_slice()) else {
            return Err(CodegenError::UnknownName(Box::new(name.clone_static())));
        };

        let ty = field_ty.ty.resolve(&self.self_ty);
        let offset = self.func.temp();
        let addr = self.func.temp();

        instrs.push(Instr::constant(&offset, Literal::Int(slot as i64)));
        instrs.push(Instr::value(
            ValueOp::PtrAdd,
            &addr,
            IrTy::object(),
            [SELF_REG, offset.as_str()],
        ));

        Ok((addr, ty))
    }

    /// Emits the default value for a variable of type `ty`, if it has one.
    pub fn default_value(&self, dest: &str, ty: &ClassName<'buf>) -> Option<Instr> {
        match ty {
            ClassName::Builtin(BuiltinClass::Int) => Some(Instr::constant(dest, Literal::Int(0))),
            ClassName::Builtin(BuiltinClass::Bool) => {
                Some(Instr::constant(dest, Literal::Bool(false)))
            }
            _ => None,
        }
    }

    fn literal(&mut self, value: Literal, ty: BuiltinClass) -> Lowered<'buf> {
        let dest = self.func.temp();

        Lowered {
            instrs: vec![Instr::constant(&dest, value)],
            dest,
            ty: ty.into(),
        }
    }

    fn unsupported(construct: UnsupportedConstruct, span: &impl HasSpan) -> CodegenError {
        CodegenError::Unsupported {
            construct,
            span: span.span().into_owned(),
        }
    }

    fn with_frame<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.func.push_frame();
        let result = f(self);
        self.func.pop_frame();

        result
    }

    /// Lowers code that may run zero or many times.
    fn in_branch<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.func.enter_branch();
        let result = f(self);
        self.func.leave_branch();

        result
    }
}

impl<'a, 'buf> Visitor<'buf> for Lowerer<'a, 'buf> {
    type Output = CodegenResult<Lowered<'buf>>;

    fn visit_assignment(&mut self, expr: &ast::Assignment<'buf>) -> Self::Output {
        let value = expr.expr.accept(self)?;
        let mut instrs = value.instrs;

        if let Some(local) = self.func.resolve(expr.name.as_slice()) {
            let reg = local.reg.clone();
            instrs.push(Instr::value(
                ValueOp::Id,
                &reg,
                ir_ty(&local.ty),
                [value.dest.as_str()],
            ));

            return Ok(Lowered {
                instrs,
                dest: reg,
                ty: value.ty,
            });
        }

        let (addr, _) = self.field_address(&mut instrs, &expr.name)?;
        instrs.push(Instr::effect(EffectOp::Store, [addr.as_str(), value.dest.as_str()]));

        Ok(Lowered {
            instrs,
            dest: value.dest,
            ty: value.ty,
        })
    }

    fn visit_call(&mut self, expr: &ast::Call<'buf>) -> Self::Output {
        let ctx = self.ctx;
        let mut instrs = vec![];

        let (receiver, receiver_ty, lookup_ty) = match &expr.receiver {
            ast::Receiver::SelfType => (
                SELF_REG.to_owned(),
                self.self_ty.clone(),
                self.self_ty.clone(),
            ),

            ast::Receiver::Dynamic(object) => {
                let object = object.accept(self)?;
                instrs.extend(object.instrs);

                (object.dest, object.ty.clone(), object.ty)
            }

            ast::Receiver::Static { object, ty } => {
                let object = object.accept(self)?;
                instrs.extend(object.instrs);
                let target = ClassName::from(ty).resolve(&self.self_ty);

                (object.dest, object.ty, target)
            }
        };

        let method = expr.method.as_slice();

        let Some((owner, method_ty)) = ctx.lookup_method(&lookup_ty, method) else {
            return Err(CodegenError::UnknownMethod {
                class: lookup_ty.clone_static(),
                method: Box::new(expr.method.clone_static()),
            });
        };

        if owner.is_builtin() && !builtin::is_available(owner, method) {
            return Err(Self::unsupported(
                UnsupportedConstruct::BuiltinMethod {
                    class: owner.clone_static(),
                    method: method.to_vec(),
                },
                &expr.method,
            ));
        }

        let func = mangle(owner, method);
        let ret_ty = match &method_ty.ret {
            ClassName::SelfType => receiver_ty,
            ret => ret.clone(),
        };

        trace!(%func, "lowering a call");

        let mut args = vec![receiver];

        for arg in &expr.args {
            let arg = arg.accept(self)?;
            instrs.extend(arg.instrs);
            args.push(arg.dest);
        }

        let dest = self.func.temp();
        instrs.push(Instr::call(&dest, ir_ty(&ret_ty), func, args));

        Ok(Lowered {
            instrs,
            dest,
            ty: ret_ty,
        })
    }

    fn visit_if(&mut self, expr: &ast::If<'buf>) -> Self::Output {
        let condition = expr.antecedent.accept(self)?;
        let consequent = self.in_branch(|this| expr.consequent.accept(this))?;
        let alternative = self.in_branch(|this| expr.alternative.accept(this))?;

        let [then, otherwise, exit] = self.func.labels("if", ["then", "else", "exit"]);
        let dest = self.func.temp();
        let ty = self.ctx.join(&consequent.ty, &alternative.ty, &self.self_ty);

        let mut instrs = condition.instrs;
        instrs.push(Instr::br(&condition.dest, &then, &otherwise));

        for (label, arm) in [(&then, consequent), (&otherwise, alternative)] {
            instrs.push(Instr::label(label));
            instrs.extend(arm.instrs);
            instrs.push(Instr::value(ValueOp::Id, &dest, ir_ty(&arm.ty), [arm.dest]));
            instrs.push(Instr::jmp(&exit));
        }

        instrs.push(Instr::label(&exit));

        Ok(Lowered { instrs, dest, ty })
    }

    fn visit_while(&mut self, expr: &ast::While<'buf>) -> Self::Output {
        let [cond, body_label, end] = self.func.labels("loop", ["cond", "body", "end"]);
        let condition = self.in_branch(|this| expr.condition.accept(this))?;
        let body = self.in_branch(|this| expr.body.accept(this))?;

        let mut instrs = vec![Instr::label(&cond)];
        instrs.extend(condition.instrs);
        instrs.push(Instr::br(&condition.dest, &body_label, &end));
        instrs.push(Instr::label(&body_label));
        instrs.extend(body.instrs);
        instrs.push(Instr::jmp(&cond));
        instrs.push(Instr::label(&end));

        Ok(Lowered {
            instrs,
            dest: condition.dest,
            ty: BuiltinClass::Object.into(),
        })
    }

    fn visit_block(&mut self, expr: &ast::Block<'buf>) -> Self::Output {
        self.with_frame(|this| {
            let mut instrs = vec![];
            let mut result = None;

            for expr in &expr.body {
                let lowered = expr.accept(this)?;
                instrs.extend(lowered.instrs);
                result = Some((lowered.dest, lowered.ty));
            }

            let (dest, ty) = result.unwrap_or_else(|| (SELF_REG.to_owned(), this.self_ty.clone()));

            Ok(Lowered { instrs, dest, ty })
        })
    }

    fn visit_let(&mut self, expr: &ast::Let<'buf>) -> Self::Output {
        self.with_frame(|this| {
            let mut instrs = vec![];

            for binding in &expr.bindings {
                let ty = ClassName::from(&binding.ty).resolve(&this.self_ty);

                let init = match &binding.init {
                    Some(init) => Some(init.accept(this)?),
                    None => None,
                };

                let reg = this.func.bind(binding.name.0.value.clone(), ty.clone());
                trace!(name = %binding.name, %reg, "binding a local");

                match init {
                    Some(init) => {
                        instrs.extend(init.instrs);
                        instrs.push(Instr::value(ValueOp::Id, &reg, ir_ty(&ty), [init.dest]));
                    }

                    None => instrs.extend(this.default_value(&reg, &ty)),
                }
            }

            let body = expr.expr.accept(this)?;
            instrs.extend(body.instrs);

            Ok(Lowered {
                instrs,
                dest: body.dest,
                ty: body.ty,
            })
        })
    }

    fn visit_case(&mut self, expr: &ast::Case<'buf>) -> Self::Output {
        Err(Self::unsupported(UnsupportedConstruct::Case, expr))
    }

    fn visit_new(&mut self, expr: &ast::New<'buf>) -> Self::Output {
        let ty = ClassName::from(&expr.ty).resolve(&self.self_ty);

        match &ty {
            ClassName::Builtin(BuiltinClass::Int) => {
                return Ok(self.literal(Literal::Int(0), BuiltinClass::Int))
            }

            ClassName::Builtin(BuiltinClass::Bool) => {
                return Ok(self.literal(Literal::Bool(false), BuiltinClass::Bool))
            }

            ClassName::Builtin(BuiltinClass::String) => {
                return Err(Self::unsupported(UnsupportedConstruct::StringObject, expr))
            }

            _ if !self.ctx.contains(&ty) => {
                return Err(CodegenError::UnknownClass {
                    name: ty.clone_static(),
                    span: expr.ty.span().into_owned(),
                })
            }

            _ => {}
        }

        let size = self.func.temp();
        let dest = self.func.temp();

        let mut instrs = vec![
            Instr::constant(&size, Literal::Int(object_size(self.ctx, &ty) as i64)),
            Instr::value(ValueOp::Alloc, &dest, IrTy::object(), [size.as_str()]),
        ];

        if !ty.is_builtin() {
            instrs.push(Instr::call(
                &dest,
                IrTy::object(),
                mangle(&ty, CONSTRUCTOR),
                vec![dest.clone()],
            ));
        }

        self.func.record_alloc(dest.clone());

        Ok(Lowered { instrs, dest, ty })
    }

    fn visit_bin_op(&mut self, expr: &ast::BinOpExpr<'buf>) -> Self::Output {
        let lhs = expr.lhs.accept(self)?;
        let rhs = expr.rhs.accept(self)?;

        let (op, ty) = match expr.op {
            BinOpKind::Add => (ValueOp::Add, BuiltinClass::Int),
            BinOpKind::Subtract => (ValueOp::Sub, BuiltinClass::Int),
            BinOpKind::Multiply => (ValueOp::Mul, BuiltinClass::Int),
            BinOpKind::Divide => (ValueOp::Div, BuiltinClass::Int),
            BinOpKind::LessThan => (ValueOp::Lt, BuiltinClass::Bool),
            BinOpKind::LessEquals => (ValueOp::Le, BuiltinClass::Bool),
            BinOpKind::Equals => (ValueOp::Eq, BuiltinClass::Bool),
        };

        let ty = ClassName::from(ty);
        let dest = self.func.temp();

        let mut instrs = lhs.instrs;
        instrs.extend(rhs.instrs);
        instrs.push(Instr::value(op, &dest, ir_ty(&ty), [lhs.dest, rhs.dest]));

        Ok(Lowered { instrs, dest, ty })
    }

    fn visit_un_op(&mut self, expr: &ast::UnOpExpr<'buf>) -> Self::Output {
        match expr.op {
            UnOpKind::IsVoid => Err(Self::unsupported(UnsupportedConstruct::IsVoid, expr)),

            UnOpKind::Not => {
                let operand = expr.expr.accept(self)?;
                let dest = self.func.temp();

                let mut instrs = operand.instrs;
                instrs.push(Instr::value(ValueOp::Not, &dest, IrTy::Bool, [operand.dest]));

                Ok(Lowered {
                    instrs,
                    dest,
                    ty: BuiltinClass::Bool.into(),
                })
            }

            UnOpKind::Complement => {
                let operand = expr.expr.accept(self)?;
                let zero = self.func.temp();
                let dest = self.func.temp();

                let mut instrs = operand.instrs;
                instrs.push(Instr::constant(&zero, Literal::Int(0)));
                instrs.push(Instr::value(ValueOp::Sub, &dest, IrTy::Int, [zero, operand.dest]));

                Ok(Lowered {
                    instrs,
                    dest,
                    ty: BuiltinClass::Int.into(),
                })
            }
        }
    }

    fn visit_name_expr(&mut self, expr: &ast::NameExpr<'buf>) -> Self::Output {
        let name = &expr.0;

        if name.is_self() {
            return Ok(Lowered {
                instrs: vec![],
                dest: SELF_REG.to_owned(),
                ty: self.self_ty.clone(),
            });
        }

        if let Some(local) = self.func.resolve(name.as_slice()) {
            return Ok(Lowered {
                instrs: vec![],
                dest: local.reg.clone(),
                ty: local.ty.clone(),
            });
        }

        let mut instrs = vec![];
        let (addr, ty) = self.field_address(&mut instrs, name)?;
        let dest = self.func.temp();
        instrs.push(Instr::value(ValueOp::Load, &dest, ir_ty(&ty), [addr]));

        Ok(Lowered { instrs, dest, ty })
    }

    fn visit_group(&mut self, expr: &ast::Group<'buf>) -> Self::Output {
        expr.expr.accept(self)
    }

    fn visit_int_lit(&mut self, expr: &ast::IntLit) -> Self::Output {
        Ok(self.literal(Literal::Int(expr.0.value), BuiltinClass::Int))
    }

    fn visit_string_lit(&mut self, expr: &ast::StringLit<'buf>) -> Self::Output {
        Err(Self::unsupported(UnsupportedConstruct::StringLiteral, expr))
    }

    fn visit_bool_lit(&mut self, expr: &ast::BoolLit) -> Self::Output {
        Ok(self.literal(Literal::Bool(expr.0.value), BuiltinClass::Bool))
    }
}
