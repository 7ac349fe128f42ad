use std::borrow::Cow;
use std::collections::HashMap;

use crate::analysis::error::TypeckError;
use crate::analysis::typectx::{ClassName, TypeCtx};
use crate::position::Span;
use crate::util::CloneStatic;

/// Lexical bindings organized as a stack of frames.
#[derive(Debug, Clone)]
pub struct BindingMap<'buf> {
    frames: Vec<HashMap<Cow<'buf, [u8]>, ClassName<'buf>>>,
}

impl<'buf> BindingMap<'buf> {
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Binds `name` in the innermost frame, returning the binding it replaced in that frame.
    pub fn bind(&mut self, name: Cow<'buf, [u8]>, ty: ClassName<'buf>) -> Option<ClassName<'buf>> {
        if self.frames.is_empty() {
            self.push_frame();
        }

        self.frames.last_mut()?.insert(name, ty)
    }

    pub fn resolve(&self, name: &[u8]) -> Option<&ClassName<'buf>> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn is_bound(&self, name: &[u8]) -> bool {
        self.resolve(name).is_some()
    }
}

impl Default for BindingMap<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// What an expression sees: the class table, the class being checked, and the local bindings.
pub struct Scope<'a, 'buf> {
    pub ctx: &'a TypeCtx<'buf>,
    pub self_ty: ClassName<'buf>,
    pub bindings: BindingMap<'buf>,
}

impl<'a, 'buf> Scope<'a, 'buf> {
    pub fn new(ctx: &'a TypeCtx<'buf>, self_ty: ClassName<'buf>) -> Self {
        Self {
            ctx,
            self_ty,
            bindings: BindingMap::new(),
        }
    }

    /// Fails with `UndefinedClass` unless `ty` names a known class (`SELF_TYPE` is always known).
    pub fn check_exists(&self, ty: &ClassName<'buf>, span: &Span) -> Result<(), TypeckError> {
        let resolved = ty.resolve(&self.self_ty);

        if self.ctx.contains(&resolved) {
            Ok(())
        } else {
            Err(TypeckError::UndefinedClass {
                name: resolved.clone_static(),
                span: span.clone(),
            })
        }
    }

    pub fn assignable(
        &self,
        sub: &ClassName<'buf>,
        sup: &ClassName<'buf>,
        span: &Span,
    ) -> Result<(), TypeckError> {
        self.check_exists(sub, span)?;
        self.check_exists(sup, span)?;

        if self.ctx.conforms(sub, sup, &self.self_ty) {
            Ok(())
        } else {
            Err(TypeckError::NotAssignable {
                span: span.clone(),
                from: sub.resolve(&self.self_ty).clone_static(),
                to: sup.resolve(&self.self_ty).clone_static(),
            })
        }
    }

    pub fn join(&self, lhs: &ClassName<'buf>, rhs: &ClassName<'buf>) -> ClassName<'buf> {
        self.ctx.join(lhs, rhs, &self.self_ty)
    }
}
