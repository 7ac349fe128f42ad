use std::collections::HashSet;

use tracing::{debug, trace};

use crate::analysis::class_table::{build_class_table, hierarchy_order};
use crate::analysis::error::{InvalidLiteralKind, TypeckError};
use crate::analysis::scope::Scope;
use crate::analysis::typectx::{BuiltinClass, ClassName, FieldTy, TypeCtx};
use crate::ast::{self, Class, Feature, Visitor};
use crate::position::HasSpan;
use crate::util::CloneStatic;

pub type TypeckResult<T> = Result<T, TypeckError>;

pub struct TypeChecker<'a, 'buf> {
    ctx: &'a mut TypeCtx<'buf>,
}

impl<'a, 'buf> TypeChecker<'a, 'buf> {
    pub fn new(ctx: &'a mut TypeCtx<'buf>) -> Self {
        Self { ctx }
    }

    /// Checks every class, stopping at the first error.
    ///
    /// Registers the field signatures of every class into the class table as a side effect.
    pub fn check(mut self, classes: &[Class<'buf>]) -> TypeckResult<()> {
        self.register_fields(classes)?;
        let ctx: &TypeCtx<'buf> = &*self.ctx;

        for class in classes {
            let name = ClassName::from(&class.name);
            debug!(class = %name, "checking a class");

            ClassChecker::new(Scope::new(ctx, name)).check_class(class)?;
        }

        Ok(())
    }

    fn register_fields(&mut self, classes: &[Class<'buf>]) -> TypeckResult<()> {
        for class in hierarchy_order(self.ctx, classes) {
            let class_name = ClassName::from(&class.name);

            for field in class.fields() {
                let binding = &field.0;
                let ty = ClassName::from(&binding.ty);
                let name = binding.name.as_slice();

                if ty != ClassName::SelfType && !self.ctx.contains(&ty) {
                    return Err(TypeckError::UndefinedClass {
                        name: ty.clone_static(),
                        span: binding.ty.span().into_owned(),
                    });
                }

                if let Some((owner, _)) = self.ctx.lookup_field(&class_name, name) {
                    return Err(TypeckError::DuplicateAttribute {
                        name: Box::new(binding.name.clone_static()),
                        inherited: owner != &class_name,
                    });
                }

                trace!(class = %class_name, field = %binding.name, ty = %ty, "registering a field");

                if let Some(index) = self.ctx.get_class_mut(&class_name) {
                    index.add_field(binding.name.0.value.clone(), FieldTy { ty });
                }
            }
        }

        Ok(())
    }
}

struct ClassChecker<'a, 'buf> {
    scope: Scope<'a, 'buf>,
}

impl<'a, 'buf> ClassChecker<'a, 'buf> {
    fn new(scope: Scope<'a, 'buf>) -> Self {
        Self { scope }
    }

    fn check_class(&mut self, class: &Class<'buf>) -> TypeckResult<()> {
        for feature in &class.features {
            match feature {
                Feature::Method(method) => self.check_method(method)?,
                Feature::Field(field) => self.check_field(field)?,
            }
        }

        Ok(())
    }

    fn check_field(&mut self, field: &ast::Field<'buf>) -> TypeckResult<()> {
        let binding = &field.0;
        let Some(init) = &binding.init else { return Ok(()) };
        let ty = init.accept(self)?;

        self.scope
            .assignable(&ty, &ClassName::from(&binding.ty), &init.span())
    }

    fn check_method(&mut self, method: &ast::Method<'buf>) -> TypeckResult<()> {
        trace!(method = %method.name, "checking a method");

        self.with_frame(|this| {
            let mut seen = HashSet::new();

            for formal in &method.params {
                let ty = ClassName::from(&formal.ty);
                this.scope.check_exists(&ty, &formal.ty.span())?;

                if !seen.insert(formal.name.as_slice()) {
                    return Err(TypeckError::DuplicateAttribute {
                        name: Box::new(formal.name.clone_static()),
                        inherited: false,
                    });
                }

                this.scope.bindings.bind(formal.name.0.value.clone(), ty);
            }

            let body_ty = method.body.accept(this)?;

            this.scope.assignable(
                &body_ty,
                &ClassName::from(&method.return_ty),
                &method.body.span(),
            )
        })
    }

    fn with_frame<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.scope.bindings.push_frame();
        let result = f(self);
        self.scope.bindings.pop_frame();

        result
    }

    /// Resolves a name bound as a local or a field (but not `self`).
    fn resolve_binding(&self, name: &ast::Name<'buf>) -> Option<ClassName<'buf>> {
        if let Some(ty) = self.scope.bindings.resolve(name.as_slice()) {
            return Some(ty.resolve(&self.scope.self_ty));
        }

        self.scope
            .ctx
            .lookup_field(&self.scope.self_ty, name.as_slice())
            .map(|(_, field)| field.ty.resolve(&self.scope.self_ty))
    }

    fn check_visible(&self, name: &ast::Name<'buf>) -> TypeckResult<()> {
        let field_owner = self
            .scope
            .ctx
            .lookup_field(&self.scope.self_ty, name.as_slice())
            .map(|(owner, _)| owner);

        if name.is_self() || self.scope.bindings.is_bound(name.as_slice()) || field_owner.is_some()
        {
            return Err(TypeckError::DuplicateAttribute {
                name: Box::new(name.clone_static()),
                inherited: field_owner.map_or(false, |owner| owner != &self.scope.self_ty),
            });
        }

        Ok(())
    }

    fn expect_int(&self, ty: &ClassName<'buf>, expr: &ast::Expr<'buf>) -> TypeckResult<()> {
        self.scope.assignable(ty, &BuiltinClass::Int.into(), &expr.span())
    }

    fn expect_bool(&self, ty: &ClassName<'buf>, expr: &ast::Expr<'buf>) -> TypeckResult<()> {
        self.scope.assignable(ty, &BuiltinClass::Bool.into(), &expr.span())
    }
}

impl<'a, 'buf> Visitor<'buf> for ClassChecker<'a, 'buf> {
    type Output = TypeckResult<ClassName<'buf>>;

    fn visit_assignment(&mut self, expr: &ast::Assignment<'buf>) -> Self::Output {
        let declared = match self.resolve_binding(&expr.name) {
            Some(ty) if !expr.name.is_self() => ty,
            _ => return Err(TypeckError::UndefinedIdentifier(Box::new(expr.name.clone_static()))),
        };

        let ty = expr.expr.accept(self)?;
        self.scope.assignable(&ty, &declared, &expr.expr.span())?;

        Ok(declared)
    }

    fn visit_call(&mut self, expr: &ast::Call<'buf>) -> Self::Output {
        let ctx = self.scope.ctx;

        let (receiver_ty, lookup_ty, receiver_span) = match &expr.receiver {
            ast::Receiver::SelfType => (
                ClassName::SelfType,
                self.scope.self_ty.clone(),
                expr.method.span().into_owned(),
            ),

            ast::Receiver::Dynamic(object) => {
                let ty = object.accept(self)?;
                let lookup_ty = ty.resolve(&self.scope.self_ty);

                (ty, lookup_ty, object.span().into_owned())
            }

            ast::Receiver::Static { object, ty: ty_name } => {
                let ty = object.accept(self)?;
                let target = ClassName::from(ty_name);
                self.scope.check_exists(&target, &ty_name.span())?;
                self.scope.assignable(&ty, &target, &object.span())?;

                (ty, target.resolve(&self.scope.self_ty), object.span().into_owned())
            }
        };

        self.scope.check_exists(&lookup_ty, &receiver_span)?;

        let Some((_, method_ty)) = ctx.lookup_method(&lookup_ty, expr.method.as_slice())
        else {
            return Err(TypeckError::UndefinedMethod {
                class: lookup_ty.clone_static(),
                method: Box::new(expr.method.clone_static()),
            });
        };

        if method_ty.params.len() != expr.args.len() {
            return Err(TypeckError::ArgumentCountMismatch {
                call_span: expr.span.clone(),
                expected_count: method_ty.params.len(),
                supplied_count: expr.args.len(),
            });
        }

        for (arg, param) in expr.args.iter().zip(&method_ty.params) {
            let arg_ty = arg.accept(self)?;
            let span = arg.span();
            self.scope.check_exists(param, &span)?;

            if !ctx.conforms(&arg_ty, param, &self.scope.self_ty) {
                return Err(TypeckError::ArgumentTypeMismatch {
                    span: span.into_owned(),
                    expected: param.resolve(&self.scope.self_ty).clone_static(),
                    actual: arg_ty.resolve(&self.scope.self_ty).clone_static(),
                });
            }
        }

        Ok(match &method_ty.ret {
            ClassName::SelfType => receiver_ty,
            ret => ret.clone(),
        })
    }

    fn visit_if(&mut self, expr: &ast::If<'buf>) -> Self::Output {
        let condition_ty = expr.antecedent.accept(self)?;
        self.expect_bool(&condition_ty, &expr.antecedent)?;

        let consequent_ty = expr.consequent.accept(self)?;
        let alternative_ty = expr.alternative.accept(self)?;

        Ok(self.scope.join(&consequent_ty, &alternative_ty))
    }

    fn visit_while(&mut self, expr: &ast::While<'buf>) -> Self::Output {
        let condition_ty = expr.condition.accept(self)?;
        self.expect_bool(&condition_ty, &expr.condition)?;
        expr.body.accept(self)?;

        Ok(BuiltinClass::Object.into())
    }

    fn visit_block(&mut self, expr: &ast::Block<'buf>) -> Self::Output {
        self.with_frame(|this| {
            let mut ty = ClassName::Builtin(BuiltinClass::Object);

            for expr in &expr.body {
                ty = expr.accept(this)?;
            }

            Ok(ty)
        })
    }

    fn visit_let(&mut self, expr: &ast::Let<'buf>) -> Self::Output {
        self.with_frame(|this| {
            for binding in &expr.bindings {
                let ty = ClassName::from(&binding.ty);
                this.scope.check_exists(&ty, &binding.ty.span())?;
                this.check_visible(&binding.name)?;

                if let Some(init) = &binding.init {
                    let init_ty = init.accept(this)?;
                    this.scope.assignable(&init_ty, &ty, &init.span())?;
                }

                this.scope.bindings.bind(binding.name.0.value.clone(), ty);
            }

            expr.expr.accept(this)
        })
    }

    fn visit_case(&mut self, expr: &ast::Case<'buf>) -> Self::Output {
        if expr.arms.is_empty() {
            return Err(TypeckError::MissingCaseBranch(expr.span.clone()));
        }

        expr.scrutinee.accept(self)?;
        let mut result: Option<ClassName<'buf>> = None;

        for arm in &expr.arms {
            let arm_ty = self.with_frame(|this| {
                let ty = ClassName::from(&arm.ty);
                this.scope.check_exists(&ty, &arm.ty.span())?;
                this.scope.bindings.bind(arm.name.0.value.clone(), ty);

                arm.expr.accept(this)
            })?;

            result = Some(match result {
                Some(ty) => self.scope.join(&ty, &arm_ty),
                None => arm_ty,
            });
        }

        Ok(result.unwrap_or(ClassName::Builtin(BuiltinClass::Object)))
    }

    fn visit_new(&mut self, expr: &ast::New<'buf>) -> Self::Output {
        let ty = ClassName::from(&expr.ty);
        self.scope.check_exists(&ty, &expr.ty.span())?;

        Ok(ty)
    }

    fn visit_bin_op(&mut self, expr: &ast::BinOpExpr<'buf>) -> Self::Output {
        use ast::BinOpKind::*;

        let lhs_ty = expr.lhs.accept(self)?;
        let rhs_ty = expr.rhs.accept(self)?;

        if matches!(expr.op, Add | Subtract | Multiply | Divide | LessThan | LessEquals) {
            self.expect_int(&lhs_ty, &expr.lhs)?;
            self.expect_int(&rhs_ty, &expr.rhs)?;
        }

        if !expr.op.is_comparison() {
            return Ok(BuiltinClass::Int.into());
        }

        let lhs_ty = lhs_ty.resolve(&self.scope.self_ty);
        let rhs_ty = rhs_ty.resolve(&self.scope.self_ty);

        if (lhs_ty.is_primitive() || rhs_ty.is_primitive()) && lhs_ty != rhs_ty {
            return Err(TypeckError::IllegalComparison {
                span: expr.span.clone(),
                lhs: lhs_ty.clone_static(),
                rhs: rhs_ty.clone_static(),
            });
        }

        Ok(BuiltinClass::Bool.into())
    }

    fn visit_un_op(&mut self, expr: &ast::UnOpExpr<'buf>) -> Self::Output {
        let ty = expr.expr.accept(self)?;

        match expr.op {
            ast::UnOpKind::Not => {
                self.expect_bool(&ty, &expr.expr)?;

                Ok(BuiltinClass::Bool.into())
            }

            ast::UnOpKind::Complement => {
                self.expect_int(&ty, &expr.expr)?;

                Ok(BuiltinClass::Int.into())
            }

            ast::UnOpKind::IsVoid => Ok(BuiltinClass::Bool.into()),
        }
    }

    fn visit_name_expr(&mut self, expr: &ast::NameExpr<'buf>) -> Self::Output {
        let name = &expr.0;

        if name.is_self() {
            return Ok(self.scope.self_ty.clone());
        }

        self.resolve_binding(name)
            .ok_or_else(|| TypeckError::UndefinedIdentifier(Box::new(name.clone_static())))
    }

    fn visit_group(&mut self, expr: &ast::Group<'buf>) -> Self::Output {
        expr.expr.accept(self)
    }

    fn visit_int_lit(&mut self, expr: &ast::IntLit) -> Self::Output {
        let value = expr.0.value;

        match i32::try_from(value) {
            Ok(_) => Ok(BuiltinClass::Int.into()),

            Err(_) => Err(TypeckError::InvalidLiteral {
                span: expr.0.span.clone(),
                kind: InvalidLiteralKind::IntOutOfRange(value),
            }),
        }
    }

    fn visit_string_lit(&mut self, expr: &ast::StringLit<'buf>) -> Self::Output {
        match std::str::from_utf8(&expr.0.value) {
            Ok(_) => Ok(BuiltinClass::String.into()),

            Err(_) => Err(TypeckError::InvalidLiteral {
                span: expr.0.span.clone(),
                kind: InvalidLiteralKind::InvalidUtf8,
            }),
        }
    }

    fn visit_bool_lit(&mut self, _expr: &ast::BoolLit) -> Self::Output {
        Ok(BuiltinClass::Bool.into())
    }
}

/// Convenience wrapper: builds the class table and checks the classes against it.
pub fn typeck<'buf>(classes: &[Class<'buf>]) -> TypeckResult<TypeCtx<'buf>> {
    let mut ctx = build_class_table(classes)?;
    TypeChecker::new(&mut ctx).check(classes)?;

    Ok(ctx)
}
