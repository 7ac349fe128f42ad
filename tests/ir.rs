mod common;

use coolbril::codegen::CodegenOptions;
use coolbril::compile;
use coolbril::ir::{EffectOp, Function, Instr, IrTy, Literal, Param, Program, ValueOp};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use self::common::parse;

fn to_value(program: &Program) -> Value {
    serde_json::from_str(&program.to_json().unwrap()).unwrap()
}

#[test]
fn test_instr_json() {
    let cases = [
        (
            Instr::constant("t.0", Literal::Int(42)),
            json!({ "op": "const", "dest": "t.0", "type": "int", "value": 42 }),
        ),
        (
            Instr::constant("b", Literal::Bool(true)),
            json!({ "op": "const", "dest": "b", "type": "bool", "value": true }),
        ),
        (
            Instr::value(ValueOp::Add, "t.2", IrTy::Int, ["t.0", "t.1"]),
            json!({ "op": "add", "dest": "t.2", "type": "int", "args": ["t.0", "t.1"] }),
        ),
        (
            Instr::call("t.3", IrTy::object(), "A__f", vec!["self".to_owned()]),
            json!({
                "op": "call",
                "dest": "t.3",
                "type": { "ptr": "int" },
                "args": ["self"],
                "funcs": ["A__f"],
            }),
        ),
        (
            Instr::br("t.1", "if.then.2", "if.else.2"),
            json!({ "op": "br", "args": ["t.1"], "labels": ["if.then.2", "if.else.2"] }),
        ),
        (
            Instr::jmp("loop.cond.0"),
            json!({ "op": "jmp", "labels": ["loop.cond.0"] }),
        ),
        (
            Instr::effect(EffectOp::Store, ["t.1", "t.0"]),
            json!({ "op": "store", "args": ["t.1", "t.0"] }),
        ),
        (Instr::ret(None), json!({ "op": "ret" })),
        (Instr::label("if.exit.2"), json!({ "label": "if.exit.2" })),
    ];

    for (instr, expected) in cases {
        assert_eq!(serde_json::to_value(&instr).unwrap(), expected, "{}", instr);
    }
}

#[test]
fn test_instr_text() {
    assert_eq!(
        Instr::value(ValueOp::PtrAdd, "t.1", IrTy::object(), ["self", "t.0"]).to_string(),
        "t.1: ptr<int> = ptradd self t.0;"
    );
    assert_eq!(
        Instr::effect(EffectOp::Print, ["x"]).to_string(),
        "print x;"
    );
    assert_eq!(Instr::ret(Some("self".into())).to_string(), "ret self;");
    assert_eq!(Instr::label("loop.end.3").to_string(), ".loop.end.3:");
    assert_eq!(IrTy::Ptr(Box::new(IrTy::object())).to_string(), "ptr<ptr<int>>");
}

#[test]
fn test_instr_accessors() {
    let call = Instr::call("t.0", IrTy::Int, "f", vec![]);
    assert_eq!(call.dest(), Some("t.0"));
    assert_eq!(call.op_name(), "call");

    let store = Instr::effect(EffectOp::Store, ["a", "b"]);
    assert_eq!(store.dest(), None);
    assert_eq!(store.op_name(), "store");

    assert_eq!(Instr::label("l").op_name(), "label");
    assert_eq!(Instr::constant("c", Literal::Int(0)).op_name(), "const");
}

#[test]
fn test_function_without_args_or_return_type() {
    let mut func = Function::new("main", vec![], None);
    func.instrs.push(Instr::ret(None));

    assert_eq!(func.to_string(), "@main {\n  ret;\n}");
    assert_eq!(
        serde_json::to_value(&func).unwrap(),
        json!({ "name": "main", "args": [], "instrs": [{ "op": "ret" }] })
    );
}

#[test]
fn test_function_with_args() {
    let mut func = Function::new(
        "f",
        vec![Param::new("a", IrTy::Int), Param::new("b", IrTy::Bool)],
        Some(IrTy::Int),
    );
    func.instrs.push(Instr::ret(Some("a".into())));

    assert_eq!(func.to_string(), "@f(a: int, b: bool): int {\n  ret a;\n}");
    assert_eq!(
        serde_json::to_value(&func).unwrap(),
        json!({
            "name": "f",
            "args": [{ "name": "a", "type": "int" }, { "name": "b", "type": "bool" }],
            "type": "int",
            "instrs": [{ "op": "ret", "args": ["a"] }],
        })
    );
}

#[test]
fn test_program_json() {
    let classes = parse("class Main { main() : Int { 1 }; };");
    let program = compile(&classes, &CodegenOptions::default()).unwrap();

    assert_eq!(
        to_value(&program),
        json!({
            "functions": [
                {
                    "name": "IO__out_int",
                    "args": [
                        { "name": "self", "type": { "ptr": "int" } },
                        { "name": "number", "type": "int" },
                    ],
                    "type": { "ptr": "int" },
                    "instrs": [
                        { "op": "print", "args": ["number"] },
                        { "op": "ret", "args": ["self"] },
                    ],
                },
                {
                    "name": "Main__constructor",
                    "args": [{ "name": "self", "type": { "ptr": "int" } }],
                    "type": { "ptr": "int" },
                    "instrs": [{ "op": "ret", "args": ["self"] }],
                },
                {
                    "name": "main",
                    "args": [],
                    "instrs": [
                        { "op": "const", "dest": "t.0", "type": "int", "value": 1 },
                        { "op": "alloc", "dest": "self", "type": { "ptr": "int" }, "args": ["t.0"] },
                        {
                            "op": "call",
                            "dest": "self",
                            "type": { "ptr": "int" },
                            "args": ["self"],
                            "funcs": ["Main__constructor"],
                        },
                        { "op": "const", "dest": "t.1", "type": "int", "value": 1 },
                        { "op": "free", "args": ["self"] },
                        { "op": "ret" },
                    ],
                },
            ],
        })
    );
}
