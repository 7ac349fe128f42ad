mod common;

use coolbril::analysis::error::InvalidLiteralKind;
use coolbril::ast::{Expr, Feature};
use coolbril::analysis::{
    self, build_class_table, hierarchy_order, BuiltinClass, ClassName, TypeCtx, TypeckError,
    TypeckResult,
};
use paste::paste;
use pretty_assertions::assert_eq;

use self::common::parse;

fn run_typeck(code: &str) -> TypeckResult<TypeCtx<'static>> {
    let classes = Box::leak(parse(code).into_boxed_slice());

    analysis::typeck(classes)
}

fn class(name: &'static str) -> ClassName<'static> {
    ClassName::from(name.as_bytes())
}

fn builtin(class: BuiltinClass) -> ClassName<'static> {
    ClassName::Builtin(class)
}

fn names<'a>(names: impl IntoIterator<Item = &'a ClassName<'static>>) -> Vec<String> {
    names.into_iter().map(ToString::to_string).collect()
}

macro_rules! run_typeck_tests {
    {
        $(
            $filename:ident => $expected:pat
        ),+
        $(,)?
    } => {
        $(
            paste! {
                #[test]
                fn [< test_ $filename >]() {
                    let code = include_str!(concat!("typeck/", stringify!($filename), ".cl"));
                    let result = run_typeck(code);

                    assert!(
                        matches!(result, $expected),
                        "unexpected result for {}: {:#?}",
                        stringify!($filename),
                        result.map(|_| ()),
                    );
                }
            }
        )+
    };
}

run_typeck_tests! {
    pass_inheritance => Ok(_),
    pass_join => Ok(_),
    pass_self_type => Ok(_),
    pass_io_out_int => Ok(_),
    pass_static_dispatch => Ok(_),
    pass_case => Ok(_),

    fail_compare_builtins => Err(TypeckError::IllegalComparison { .. }),
    fail_cyclic_inheritance => Err(TypeckError::InheritanceCycle { .. }),
    fail_undefined_class => Err(TypeckError::UndefinedClass { .. }),
    fail_undefined_field_type => Err(TypeckError::UndefinedClass { .. }),
    fail_undefined_identifier => Err(TypeckError::UndefinedIdentifier(_)),
    fail_undefined_method => Err(TypeckError::UndefinedMethod { .. }),
    fail_duplicate_field_inherited => Err(TypeckError::DuplicateAttribute { inherited: true, .. }),
    fail_let_shadows_field => Err(TypeckError::DuplicateAttribute { inherited: false, .. }),
    fail_not_assignable => Err(TypeckError::NotAssignable { .. }),
    fail_argument_type => Err(TypeckError::ArgumentTypeMismatch { .. }),
    fail_argument_count => Err(TypeckError::ArgumentCountMismatch {
        expected_count: 2,
        supplied_count: 1,
        ..
    }),
    fail_int_out_of_range => Err(TypeckError::InvalidLiteral {
        kind: InvalidLiteralKind::IntOutOfRange(2147483648),
        ..
    }),
    fail_duplicate_class => Err(TypeckError::DuplicateClass(_)),
    fail_duplicate_method => Err(TypeckError::DuplicateMethod { .. }),
    fail_arith_on_bool => Err(TypeckError::NotAssignable { .. }),
    fail_while_condition_int => Err(TypeckError::NotAssignable { .. }),
}

const HIERARCHY: &str = "
    class C inherits B { c : Int; };
    class A { a : Int; b : Bool; };
    class B inherits A { f() : Int { 0 }; };
    class D inherits A {};
    class Main { main() : Int { 0 }; };
";

#[test]
fn test_inheritance_cycle_lists_members() {
    let result = run_typeck(include_str!("typeck/fail_cyclic_inheritance.cl"));

    let Err(TypeckError::InheritanceCycle { cycle, .. }) = result else {
        panic!("expected an inheritance cycle");
    };

    assert_eq!(names(&cycle), ["A", "C", "B"]);
}

#[test]
fn test_conforms() {
    let ctx = run_typeck(HIERARCHY).unwrap();
    let main = class("Main");

    assert!(ctx.conforms(&class("C"), &class("A"), &main));
    assert!(ctx.conforms(&class("C"), &class("C"), &main));
    assert!(ctx.conforms(&class("D"), &builtin(BuiltinClass::Object), &main));
    assert!(ctx.conforms(&builtin(BuiltinClass::Int), &builtin(BuiltinClass::Object), &main));
    assert!(!ctx.conforms(&class("A"), &class("C"), &main));
    assert!(!ctx.conforms(&class("D"), &class("B"), &main));

    // SELF_TYPE stands for the class the expression appears in
    assert!(ctx.conforms(&ClassName::SelfType, &class("A"), &class("C")));
    assert!(!ctx.conforms(&ClassName::SelfType, &class("B"), &class("D")));
}

#[test]
fn test_join() {
    let ctx = run_typeck(HIERARCHY).unwrap();
    let main = class("Main");

    assert_eq!(ctx.join(&class("C"), &class("D"), &main), class("A"));
    assert_eq!(ctx.join(&class("C"), &class("B"), &main), class("B"));
    assert_eq!(ctx.join(&class("C"), &class("A"), &main), class("A"));
    assert_eq!(ctx.join(&class("B"), &class("B"), &main), class("B"));
    assert_eq!(
        ctx.join(&class("A"), &class("Main"), &main),
        builtin(BuiltinClass::Object)
    );
    assert_eq!(
        ctx.join(&builtin(BuiltinClass::Int), &builtin(BuiltinClass::Int), &main),
        builtin(BuiltinClass::Int)
    );
    assert_eq!(
        ctx.join(&builtin(BuiltinClass::Int), &builtin(BuiltinClass::Bool), &main),
        builtin(BuiltinClass::Object)
    );
    assert_eq!(
        ctx.join(&ClassName::SelfType, &class("D"), &class("C")),
        class("A")
    );
}

#[test]
fn test_lookup_members() {
    let ctx = run_typeck(HIERARCHY).unwrap();
    let c = class("C");

    let (owner, method) = ctx.lookup_method(&c, b"f").unwrap();
    assert_eq!(owner, &class("B"));
    assert_eq!(method.ret, builtin(BuiltinClass::Int));

    let (owner, _) = ctx.lookup_method(&c, b"type_name").unwrap();
    assert_eq!(owner, &builtin(BuiltinClass::Object));

    let (owner, field) = ctx.lookup_field(&c, b"b").unwrap();
    assert_eq!(owner, &class("A"));
    assert_eq!(field.ty, builtin(BuiltinClass::Bool));

    assert!(ctx.lookup_method(&class("D"), b"f").is_none());
}

#[test]
fn test_fields_in_layout_order() {
    let ctx = run_typeck(HIERARCHY).unwrap();
    let c = class("C");

    let fields = ctx
        .fields_in_layout_order(&c)
        .into_iter()
        .map(|(name, _)| String::from_utf8_lossy(name).into_owned())
        .collect::<Vec<_>>();

    assert_eq!(fields, ["a", "b", "c"]);
    assert_eq!(ctx.depth(&c), 3);
}

#[test]
fn test_hierarchy_order() {
    let classes = parse(HIERARCHY);
    let ctx = build_class_table(&classes).unwrap();

    let order = hierarchy_order(&ctx, &classes)
        .into_iter()
        .map(|class| class.name.to_string())
        .collect::<Vec<_>>();

    assert_eq!(order, ["A", "Main", "B", "D", "C"]);
}

#[test]
fn test_case_without_arms() {
    let mut classes = parse("class Main { main() : Object { case 1 of x : Int => x; esac }; };");

    // the grammar requires at least one arm, so remove it after parsing
    let Feature::Method(method) = &mut classes[0].features[0] else {
        panic!("expected a method");
    };
    let Expr::Case(case) = &mut *method.body else {
        panic!("expected a case expression");
    };
    case.arms.clear();

    assert!(matches!(
        analysis::typeck(&classes),
        Err(TypeckError::MissingCaseBranch(_))
    ));
}
