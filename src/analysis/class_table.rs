use std::borrow::Cow;

use indexmap::IndexSet;
use itertools::Itertools;
use tracing::{debug, trace};

use crate::analysis::error::TypeckError;
use crate::analysis::typectx::{BuiltinClass, ClassIndex, ClassName, MethodTy, TypeCtx};
use crate::ast::Class;
use crate::util::CloneStatic;

fn builtin_method<'buf>(
    index: &mut ClassIndex<'buf>,
    name: &'static str,
    params: &[ClassName<'buf>],
    ret: ClassName<'buf>,
) {
    index.add_method(
        Cow::Borrowed(name.as_bytes()),
        MethodTy {
            params: params.to_vec(),
            ret,
        },
    );
}

/// Creates a class table containing only the built-in classes.
pub fn builtin_ctx<'buf>() -> TypeCtx<'buf> {
    use BuiltinClass::*;

    let object = ClassName::Builtin(Object);
    let int = ClassName::Builtin(Int);
    let string = ClassName::Builtin(String);

    let mut ctx = TypeCtx::new();

    let mut index = ClassIndex::new(None);
    builtin_method(&mut index, "abort", &[], object.clone());
    builtin_method(&mut index, "type_name", &[], string.clone());
    builtin_method(&mut index, "copy", &[], object.clone());
    ctx.add_class(object.clone(), index);

    let mut index = ClassIndex::new(Some(object.clone()));
    builtin_method(&mut index, "in_int", &[], int.clone());
    builtin_method(&mut index, "in_string", &[], string.clone());
    builtin_method(&mut index, "out_int", &[int.clone()], ClassName::SelfType);
    builtin_method(&mut index, "out_string", &[string.clone()], ClassName::SelfType);
    ctx.add_class(IO.into(), index);

    ctx.add_class(int.clone(), ClassIndex::new(Some(object.clone())));

    let mut index = ClassIndex::new(Some(object.clone()));
    builtin_method(&mut index, "length", &[], int.clone());
    builtin_method(&mut index, "concat", &[string.clone()], string.clone());
    builtin_method(&mut index, "substr", &[int.clone(), int], string.clone());
    ctx.add_class(string, index);

    ctx.add_class(Bool.into(), ClassIndex::new(Some(object)));

    ctx
}

/// Builds the class table from the top-level class declarations.
///
/// Registers every class with its parent and method signatures. Field signatures are added later
/// by the type checker.
pub fn build_class_table<'buf>(classes: &[Class<'buf>]) -> Result<TypeCtx<'buf>, TypeckError> {
    let mut ctx = builtin_ctx();

    for class in classes {
        let name = ClassName::from(&class.name);
        trace!(class = %name, "registering a class");

        let parent = match &class.inherits {
            Some(ty_name) => ClassName::from(ty_name),
            None => BuiltinClass::Object.into(),
        };

        let mut index = ClassIndex::new(Some(parent));

        for method in class.methods() {
            let ty = MethodTy {
                params: method.params.iter().map(|formal| (&formal.ty).into()).collect(),
                ret: (&method.return_ty).into(),
            };

            if !index.add_method(method.name.0.value.clone(), ty) {
                return Err(TypeckError::DuplicateMethod {
                    class: name.clone_static(),
                    method: Box::new(method.name.clone_static()),
                });
            }
        }

        if name == ClassName::SelfType || !ctx.add_class(name, index) {
            return Err(TypeckError::DuplicateClass(Box::new(class.name.clone_static())));
        }
    }

    for class in classes {
        let Some(ty_name) = &class.inherits else { continue };
        let parent = ClassName::from(ty_name);

        if parent == ClassName::SelfType || !ctx.contains(&parent) {
            return Err(TypeckError::UndefinedClass {
                name: parent.clone_static(),
                span: ty_name.0 .0.span.clone(),
            });
        }
    }

    check_inheritance_cycles(&ctx, classes)?;

    debug!(classes = ctx.len(), "built the class table");

    Ok(ctx)
}

fn check_inheritance_cycles<'buf>(
    ctx: &TypeCtx<'buf>,
    classes: &[Class<'buf>],
) -> Result<(), TypeckError> {
    for class in classes {
        let start = ClassName::from(&class.name);
        let mut visited = IndexSet::new();
        let mut current = Some(&start);

        while let Some(name) = current {
            let (idx, inserted) = visited.insert_full(name);

            if !inserted {
                // only report the cycle once we start from one of its members
                if name == &start {
                    return Err(TypeckError::InheritanceCycle {
                        ty_name: Box::new(class.name.clone_static()),
                        cycle: visited
                            .iter()
                            .skip(idx)
                            .map(|name| name.clone_static())
                            .collect(),
                    });
                }

                break;
            }

            current = ctx.get_class(name).and_then(ClassIndex::parent);
        }
    }

    Ok(())
}

/// Orders the classes so that parents always precede their children.
///
/// Classes at the same depth keep their declaration order.
pub fn hierarchy_order<'a, 'buf>(
    ctx: &TypeCtx<'buf>,
    classes: &'a [Class<'buf>],
) -> Vec<&'a Class<'buf>> {
    classes
        .iter()
        .sorted_by_key(|class| ctx.depth(&ClassName::from(&class.name)))
        .collect()
}
