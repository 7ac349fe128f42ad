mod class_table;
pub mod error;
mod scope;
mod typeck;
mod typectx;

pub use class_table::{build_class_table, builtin_ctx, hierarchy_order};
pub use error::TypeckError;
pub use scope::{BindingMap, Scope};
pub use typeck::{typeck, TypeChecker, TypeckResult};
pub use typectx::{BuiltinClass, ClassIndex, ClassName, FieldTy, MethodTy, TypeCtx};
