mod common;

use coolbril::analysis::TypeckError;
use coolbril::codegen::{CodegenError, CodegenOptions, UnsupportedConstruct, ENTRY_FUNC};
use coolbril::ir::{Instr, Program, ValueOp};
use coolbril::{compile, CompileError};
use insta::assert_snapshot;
use pretty_assertions::assert_eq;

use self::common::parse;

fn try_compile(code: &str) -> Result<Program, CompileError> {
    compile(&parse(code), &CodegenOptions::default())
}

fn compile_ok(code: &str) -> Program {
    match try_compile(code) {
        Ok(program) => program,
        Err(e) => panic!("compilation failed: {}", e),
    }
}

fn function_text(program: &Program, name: &str) -> String {
    match program.function(name) {
        Some(func) => func.to_string(),
        None => panic!("function {} was not generated", name),
    }
}

fn function_names(program: &Program) -> Vec<&str> {
    program
        .functions
        .iter()
        .map(|func| func.name.as_str())
        .collect()
}

/// The functions called from `name`, in order.
fn call_targets<'a>(program: &'a Program, name: &str) -> Vec<&'a str> {
    program
        .function(name)
        .into_iter()
        .flat_map(|func| &func.instrs)
        .filter_map(|instr| match instr {
            Instr::Value {
                op: ValueOp::Call,
                funcs,
                ..
            } => funcs.first().map(String::as_str),
            _ => None,
        })
        .collect()
}

fn unsupported(code: &str) -> UnsupportedConstruct {
    match try_compile(code) {
        Err(CompileError::Codegen(CodegenError::Unsupported { construct, .. })) => construct,
        result => panic!("expected an unsupported construct, got {:?}", result),
    }
}

#[test]
fn test_field_access() {
    let program = compile_ok(include_str!("codegen/field_access.cl"));

    assert_eq!(
        function_names(&program),
        ["IO__out_int", "A__constructor", "A__get", "Main__constructor", "main"]
    );

    assert_snapshot!(program.to_string().trim_end(), @r###"
    @IO__out_int(self: ptr<int>, number: int): ptr<int> {
      print number;
      ret self;
    }
    @A__constructor(self: ptr<int>): ptr<int> {
      t.0: int = const 5;
      t.1: int = const 0;
      t.2: ptr<int> = ptradd self t.1;
      store t.2 t.0;
      ret self;
    }
    @A__get(self: ptr<int>): int {
      t.0: int = const 0;
      t.1: ptr<int> = ptradd self t.0;
      t.2: int = load t.1;
      ret t.2;
    }
    @Main__constructor(self: ptr<int>): ptr<int> {
      ret self;
    }
    @main {
      t.0: int = const 1;
      self: ptr<int> = alloc t.0;
      self: ptr<int> = call @Main__constructor self;
      t.1: int = const 1;
      t.2: ptr<int> = alloc t.1;
      t.2: ptr<int> = call @A__constructor t.2;
      t.3: int = call @A__get t.2;
      free self;
      free t.2;
      ret;
    }
    "###);
}

#[test]
fn test_parent_constructor_runs_first() {
    let program = compile_ok(include_str!("codegen/inheritance.cl"));

    assert_snapshot!(function_text(&program, "B__constructor"), @r###"
    @B__constructor(self: ptr<int>): ptr<int> {
      t.0: ptr<int> = call @A__constructor self;
      t.1: int = const 2;
      t.2: int = const 1;
      t.3: ptr<int> = ptradd self t.2;
      store t.3 t.1;
      ret self;
    }
    "###);

    // `B` has two slots and inherits `f` from `A`
    assert_snapshot!(function_text(&program, ENTRY_FUNC), @r###"
    @main {
      t.0: int = const 1;
      self: ptr<int> = alloc t.0;
      self: ptr<int> = call @Main__constructor self;
      t.1: int = const 2;
      t.2: ptr<int> = alloc t.1;
      t.2: ptr<int> = call @B__constructor t.2;
      t.3: int = call @A__f t.2;
      free self;
      free t.2;
      ret;
    }
    "###);
}

#[test]
fn test_if() {
    let program = compile_ok("class Main { main() : Int { if 3 < 5 then 1 else 2 fi }; };");

    assert_snapshot!(function_text(&program, ENTRY_FUNC), @r###"
    @main {
      t.0: int = const 1;
      self: ptr<int> = alloc t.0;
      self: ptr<int> = call @Main__constructor self;
      t.1: int = const 3;
      t.2: int = const 5;
      t.3: bool = lt t.1 t.2;
      br t.3 .if.then.6 .if.else.6;
    .if.then.6:
      t.4: int = const 1;
      t.7: int = id t.4;
      jmp .if.exit.6;
    .if.else.6:
      t.5: int = const 2;
      t.7: int = id t.5;
      jmp .if.exit.6;
    .if.exit.6:
      free self;
      ret;
    }
    "###);
}

#[test]
fn test_if_result_is_returned() {
    let program = compile_ok(
        "class Main {
            pick(flag : Bool) : Int { if flag then 1 else 2 fi };
            main() : Int { pick(true) };
        };",
    );

    // both arms write the register that the method returns
    assert_snapshot!(function_text(&program, "Main__pick"), @r###"
    @Main__pick(self: ptr<int>, flag: bool): int {
      br flag .if.then.2 .if.else.2;
    .if.then.2:
      t.0: int = const 1;
      t.3: int = id t.0;
      jmp .if.exit.2;
    .if.else.2:
      t.1: int = const 2;
      t.3: int = id t.1;
      jmp .if.exit.2;
    .if.exit.2:
      ret t.3;
    }
    "###);
}

#[test]
fn test_if_arms_keep_their_own_types() {
    let program = compile_ok(
        "class Main {
            mixed() : Object { if true then 1 else false fi };
            main() : Int { 0 };
        };",
    );

    assert_snapshot!(function_text(&program, "Main__mixed"), @r###"
    @Main__mixed(self: ptr<int>): ptr<int> {
      t.0: bool = const true;
      br t.0 .if.then.3 .if.else.3;
    .if.then.3:
      t.1: int = const 1;
      t.4: int = id t.1;
      jmp .if.exit.3;
    .if.else.3:
      t.2: bool = const false;
      t.4: bool = id t.2;
      jmp .if.exit.3;
    .if.exit.3:
      ret t.4;
    }
    "###);
}

#[test]
fn test_conditional_allocations_are_not_freed() {
    let program = compile_ok(
        "class A { x : Int; };
        class Main {
            main() : Object { {
                new A;
                if true then new A else new A fi;
                while false loop new A pool;
            } };
        };",
    );

    let frees = program
        .function(ENTRY_FUNC)
        .unwrap()
        .instrs
        .iter()
        .map(ToString::to_string)
        .filter(|instr| instr.starts_with("free"))
        .collect::<Vec<_>>();

    assert_eq!(frees, ["free self;", "free t.2;"]);
}

#[test]
fn test_while_with_out_int() {
    let program = compile_ok(include_str!("codegen/counter_loop.cl"));

    assert_snapshot!(function_text(&program, ENTRY_FUNC), @r###"
    @main {
      t.0: int = const 1;
      self: ptr<int> = alloc t.0;
      self: ptr<int> = call @Main__constructor self;
      t.1: int = const 0;
      i: int = id t.1;
    .loop.cond.2:
      t.3: int = const 3;
      t.4: bool = lt i t.3;
      br t.4 .loop.body.2 .loop.end.2;
    .loop.body.2:
      t.5: ptr<int> = call @IO__out_int self i;
      t.6: int = const 1;
      t.7: int = add i t.6;
      i: int = id t.7;
      jmp .loop.cond.2;
    .loop.end.2:
      free self;
      ret;
    }
    "###);

    // `IO` is built in, so there is no parent constructor to call
    assert_snapshot!(function_text(&program, "Main__constructor"), @r###"
    @Main__constructor(self: ptr<int>): ptr<int> {
      ret self;
    }
    "###);
}

#[test]
fn test_default_field_values() {
    let program = compile_ok(include_str!("codegen/default_fields.cl"));

    // `other` has no default value and is left untouched
    assert_snapshot!(function_text(&program, "Main__constructor"), @r###"
    @Main__constructor(self: ptr<int>): ptr<int> {
      t.0: int = const 0;
      t.1: int = const 0;
      t.2: ptr<int> = ptradd self t.1;
      store t.2 t.0;
      t.3: bool = const false;
      t.4: int = const 1;
      t.5: ptr<int> = ptradd self t.4;
      store t.5 t.3;
      ret self;
    }
    "###);

    assert_snapshot!(function_text(&program, "Main__neg"), @r###"
    @Main__neg(self: ptr<int>): int {
      t.0: int = const 0;
      t.1: ptr<int> = ptradd self t.0;
      t.2: int = load t.1;
      t.3: int = const 0;
      t.4: int = sub t.3 t.2;
      ret t.4;
    }
    "###);

    assert_snapshot!(function_text(&program, ENTRY_FUNC), @r###"
    @main {
      t.0: int = const 3;
      self: ptr<int> = alloc t.0;
      self: ptr<int> = call @Main__constructor self;
      t.1: int = const 1;
      t.2: ptr<int> = ptradd self t.1;
      t.3: bool = load t.2;
      t.4: bool = not t.3;
      free self;
      ret;
    }
    "###);
}

#[test]
fn test_locals_get_unique_registers() {
    let program = compile_ok(
        "class Main {
            twice() : Int { { let x : Int <- 1 in x; let x : Int <- 2 in x; } };
            main() : Int { twice() };
        };",
    );

    assert_snapshot!(function_text(&program, "Main__twice"), @r###"
    @Main__twice(self: ptr<int>): int {
      t.0: int = const 1;
      x: int = id t.0;
      t.1: int = const 2;
      x.2: int = id t.1;
      ret x.2;
    }
    "###);

    assert_eq!(call_targets(&program, ENTRY_FUNC), ["Main__constructor", "Main__twice"]);
}

#[test]
fn test_method_params() {
    let program = compile_ok(
        "class Main {
            pick(a : Int, b : Bool, c : Main) : SELF_TYPE { c };
            main() : Int { 0 };
        };",
    );

    assert_snapshot!(function_text(&program, "Main__pick"), @r###"
    @Main__pick(self: ptr<int>, a: int, b: bool, c: ptr<int>): ptr<int> {
      ret c;
    }
    "###);
}

#[test]
fn test_let_without_init() {
    let program = compile_ok(
        "class Main {
            main() : Int { let x : Int, b : Bool, m : Main in x };
        };",
    );

    let main = program.function(ENTRY_FUNC).unwrap();
    let body = main.instrs[3..]
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    assert_eq!(
        body,
        ["x: int = const 0;", "b: bool = const false;", "free self;", "ret;"]
    );
}

#[test]
fn test_let_default_before_use() {
    let program = compile_ok("class Main { main() : Int { let x : Int in x + 1 }; };");

    assert_snapshot!(function_text(&program, ENTRY_FUNC), @r###"
    @main {
      t.0: int = const 1;
      self: ptr<int> = alloc t.0;
      self: ptr<int> = call @Main__constructor self;
      x: int = const 0;
      t.1: int = const 1;
      t.2: int = add x t.1;
      free self;
      ret;
    }
    "###);
}

#[test]
fn test_dispatch_targets() {
    let program = compile_ok(include_str!("codegen/dispatch.cl"));

    assert_eq!(
        call_targets(&program, ENTRY_FUNC),
        [
            "Main__constructor",
            "B__constructor",
            "B__f",
            "B__constructor",
            "A__f",
            "B__constructor",
            "A__g",
        ]
    );

    let frees = program
        .function(ENTRY_FUNC)
        .unwrap()
        .instrs
        .iter()
        .filter(|instr| instr.op_name() == "free")
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    assert_eq!(frees, ["free self;", "free t.2;", "free t.5;", "free t.9;"]);
}

#[test]
fn test_new_builtin_classes() {
    let program = compile_ok(
        "class Main {
            main() : Object { { new Int; new Bool; new IO; } };
        };",
    );

    let body = program.function(ENTRY_FUNC).unwrap().instrs[3..]
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    assert_eq!(
        body,
        [
            "t.1: int = const 0;",
            "t.2: bool = const false;",
            "t.3: int = const 1;",
            "t.4: ptr<int> = alloc t.3;",
            "free self;",
            "free t.4;",
            "ret;",
        ]
    );
}

#[test]
fn test_custom_entry() {
    let classes = parse(
        "class Start {
            run() : Int { 1 };
            other() : Int { 2 };
        };",
    );

    let options = CodegenOptions {
        entry_class: "Start".into(),
        entry_method: "run".into(),
    };

    let program = compile(&classes, &options).unwrap();

    assert_eq!(
        function_names(&program),
        ["IO__out_int", "Start__constructor", "main", "Start__other"]
    );
}

#[test]
fn test_parents_are_emitted_first() {
    let program = compile_ok(
        "class B inherits A { g() : Int { 2 }; };
        class A { f() : Int { 1 }; };
        class Main { main() : Int { 0 }; };",
    );

    assert_eq!(
        function_names(&program),
        [
            "IO__out_int",
            "A__constructor",
            "A__f",
            "Main__constructor",
            "main",
            "B__constructor",
            "B__g",
        ]
    );
}

#[test]
fn test_output_is_deterministic() {
    let code = include_str!("codegen/default_fields.cl");
    let first = compile_ok(code);
    let second = compile_ok(code);

    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn test_missing_entry() {
    let program = compile_ok("class A { f() : Int { 1 }; };");

    assert!(program.function(ENTRY_FUNC).is_none());
    assert_eq!(
        function_names(&program),
        ["IO__out_int", "A__constructor", "A__f"]
    );
}

#[test]
fn test_unsupported_constructs() {
    assert_eq!(
        unsupported("class Main { main() : String { \"hello\" }; };"),
        UnsupportedConstruct::StringLiteral
    );

    assert_eq!(
        unsupported("class Main { main() : String { new String }; };"),
        UnsupportedConstruct::StringObject
    );

    assert_eq!(
        unsupported("class Main { main() : Int { case 1 of i : Int => i; esac }; };"),
        UnsupportedConstruct::Case
    );

    assert_eq!(
        unsupported("class Main { main() : Bool { isvoid self }; };"),
        UnsupportedConstruct::IsVoid
    );

    assert!(matches!(
        unsupported("class Main inherits IO { main() : Object { in_int() }; };"),
        UnsupportedConstruct::BuiltinMethod { method, .. } if method == b"in_int"
    ));
}

#[test]
fn test_typeck_errors_stop_compilation() {
    assert!(matches!(
        try_compile("class Main { main() : Int { true }; };"),
        Err(CompileError::Typeck(TypeckError::NotAssignable { .. }))
    ));
}
