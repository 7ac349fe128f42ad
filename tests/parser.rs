mod common;

use coolbril::ast::{self, BinOpKind, Expr, Feature, UnOpKind};
use coolbril::parse::token::{Symbol, TokenValue};
use coolbril::parse::{LexerErrorKind, ParserError};
use coolbril::util::slice_formatter;
use pretty_assertions::assert_eq;

use self::common::{lex, parse, try_parse};

/// Renders an expression as an s-expression to make the tree shape easy to compare.
fn render(expr: &Expr<'_>) -> String {
    fn bin_op(op: BinOpKind) -> &'static str {
        match op {
            BinOpKind::Add => "+",
            BinOpKind::Subtract => "-",
            BinOpKind::Multiply => "*",
            BinOpKind::Divide => "/",
            BinOpKind::LessThan => "<",
            BinOpKind::LessEquals => "<=",
            BinOpKind::Equals => "=",
        }
    }

    fn un_op(op: UnOpKind) -> &'static str {
        match op {
            UnOpKind::IsVoid => "isvoid",
            UnOpKind::Complement => "~",
            UnOpKind::Not => "not",
        }
    }

    fn list(exprs: &[Box<Expr<'_>>]) -> String {
        exprs
            .iter()
            .map(|expr| render(expr))
            .collect::<Vec<_>>()
            .join(" ")
    }

    match expr {
        Expr::Assignment(e) => format!("(<- {} {})", e.name, render(&e.expr)),

        Expr::Call(e) => match &e.receiver {
            ast::Receiver::SelfType => format!("(call {} [{}])", e.method, list(&e.args)),
            ast::Receiver::Dynamic(object) => {
                format!("(call {}.{} [{}])", render(object), e.method, list(&e.args))
            }
            ast::Receiver::Static { object, ty } => format!(
                "(call {}@{}.{} [{}])",
                render(object),
                ty,
                e.method,
                list(&e.args)
            ),
        },

        Expr::If(e) => format!(
            "(if {} {} {})",
            render(&e.antecedent),
            render(&e.consequent),
            render(&e.alternative)
        ),

        Expr::While(e) => format!("(while {} {})", render(&e.condition), render(&e.body)),
        Expr::Block(e) => format!("{{{}}}", list(&e.body)),

        Expr::Let(e) => {
            let bindings = e
                .bindings
                .iter()
                .map(|binding| match &binding.init {
                    Some(init) => format!("{}: {} {}", binding.name, binding.ty, render(init)),
                    None => format!("{}: {}", binding.name, binding.ty),
                })
                .collect::<Vec<_>>()
                .join(", ");

            format!("(let [{}] {})", bindings, render(&e.expr))
        }

        Expr::Case(e) => {
            let arms = e
                .arms
                .iter()
                .map(|arm| format!("{}: {} => {}", arm.name, arm.ty, render(&arm.expr)))
                .collect::<Vec<_>>()
                .join(", ");

            format!("(case {} [{}])", render(&e.scrutinee), arms)
        }

        Expr::New(e) => format!("(new {})", e.ty),
        Expr::BinOp(e) => format!("({} {} {})", bin_op(e.op), render(&e.lhs), render(&e.rhs)),
        Expr::UnOp(e) => format!("({} {})", un_op(e.op), render(&e.expr)),
        Expr::Name(e) => e.0.to_string(),
        Expr::Group(e) => format!("[{}]", render(&e.expr)),
        Expr::Int(e) => e.0.value.to_string(),
        Expr::String(e) => format!("{:?}", slice_formatter(&e.0.value).to_string()),
        Expr::Bool(e) => e.0.value.to_string(),
    }
}

/// Parses `expr` as the body of a method and renders it.
fn render_body(expr: &str) -> String {
    let classes = parse(&format!("class Main {{ main() : Object {{ {} }}; }};", expr));
    let method = classes[0].methods().next().unwrap();

    render(&method.body)
}

fn ident(name: &str) -> TokenValue<'static> {
    TokenValue::Ident(name.as_bytes().to_vec().into())
}

fn string(value: &[u8]) -> TokenValue<'static> {
    TokenValue::String(value.to_vec().into())
}

#[test]
fn test_lex_class_header() {
    assert_eq!(
        lex("class Main inherits IO {"),
        vec![
            Ok(TokenValue::Symbol(Symbol::Class)),
            Ok(ident("Main")),
            Ok(TokenValue::Symbol(Symbol::Inherits)),
            Ok(ident("IO")),
            Ok(TokenValue::Symbol(Symbol::BraceLeft)),
            Ok(TokenValue::Eof),
        ]
    );
}

#[test]
fn test_lex_keywords_are_case_insensitive() {
    assert_eq!(
        lex("CLASS If tHeN True tRUE false"),
        vec![
            Ok(TokenValue::Symbol(Symbol::Class)),
            Ok(TokenValue::Symbol(Symbol::If)),
            Ok(TokenValue::Symbol(Symbol::Then)),
            Ok(ident("True")),
            Ok(TokenValue::Symbol(Symbol::True)),
            Ok(TokenValue::Symbol(Symbol::False)),
            Ok(TokenValue::Eof),
        ]
    );
}

#[test]
fn test_lex_longest_operator_wins() {
    assert_eq!(
        lex("a <- b <= c < d => e"),
        vec![
            Ok(ident("a")),
            Ok(TokenValue::Symbol(Symbol::ArrowLeft)),
            Ok(ident("b")),
            Ok(TokenValue::Symbol(Symbol::LessEquals)),
            Ok(ident("c")),
            Ok(TokenValue::Symbol(Symbol::Less)),
            Ok(ident("d")),
            Ok(TokenValue::Symbol(Symbol::Implies)),
            Ok(ident("e")),
            Ok(TokenValue::Eof),
        ]
    );
}

#[test]
fn test_lex_comments() {
    assert_eq!(
        lex("1 -- line comment\n(* block (* nested *) comment *) 2"),
        vec![
            Ok(TokenValue::Int(1)),
            Ok(TokenValue::Int(2)),
            Ok(TokenValue::Eof),
        ]
    );
}

#[test]
fn test_lex_string_escapes() {
    assert_eq!(
        lex(r#""plain" "tab\there" "quote\"d" "\c""#),
        vec![
            Ok(string(b"plain")),
            Ok(string(b"tab\there")),
            Ok(string(b"quote\"d")),
            Ok(string(b"c")),
            Ok(TokenValue::Eof),
        ]
    );

    // an escaped line break is kept
    assert_eq!(
        lex("\"line\\\nbreak\""),
        vec![Ok(string(b"line\nbreak")), Ok(TokenValue::Eof)]
    );
}

#[test]
fn test_lex_errors() {
    assert_eq!(
        lex("1 (* never closed"),
        vec![
            Ok(TokenValue::Int(1)),
            Err(LexerErrorKind::UnterminatedComment),
        ]
    );

    assert_eq!(
        lex("\"nul\0byte\""),
        vec![Err(LexerErrorKind::UnrecognizedCharacter(b'\0'))]
    );

    assert_eq!(
        lex("\"no closing quote"),
        vec![Err(LexerErrorKind::UnterminatedString)]
    );

    assert_eq!(
        lex("\"line\nbreak\""),
        vec![Err(LexerErrorKind::UnterminatedString)]
    );

    assert_eq!(
        lex("x # y"),
        vec![
            Ok(ident("x")),
            Err(LexerErrorKind::UnrecognizedCharacter(b'#')),
        ]
    );

    assert_eq!(
        lex("99999999999999999999"),
        vec![Err(LexerErrorKind::NumberTooLarge)]
    );
}

#[test]
fn test_parse_classes() {
    let classes = parse(
        "class A { x : Int <- 1; get() : Int { x }; };
         class B inherits A { set(v : Int, w : Bool) : SELF_TYPE { self }; };",
    );

    assert_eq!(classes.len(), 2);
    assert_eq!(classes[0].name.to_string(), "A");
    assert!(classes[0].inherits.is_none());
    assert_eq!(classes[1].inherits.as_ref().unwrap().to_string(), "A");

    let Feature::Field(field) = &classes[0].features[0] else { panic!("expected a field") };
    assert_eq!(field.0.name.to_string(), "x");
    assert_eq!(field.0.ty.to_string(), "Int");
    assert_eq!(render(field.0.init.as_ref().unwrap()), "1");

    let method = classes[1].methods().next().unwrap();
    let params = method
        .params
        .iter()
        .map(|formal| format!("{}: {}", formal.name, formal.ty))
        .collect::<Vec<_>>();
    assert_eq!(params, ["v: Int", "w: Bool"]);
    assert!(method.return_ty.is_self_type());
}

#[test]
fn test_parse_empty_class() {
    let classes = parse("class A {};");

    assert!(classes[0].features.is_empty());
}

#[test]
fn test_parse_arith_precedence() {
    assert_eq!(render_body("1 + 2 * 3 - 4 / 5"), "(- (+ 1 (* 2 3)) (/ 4 5))");
    assert_eq!(render_body("(1 + 2) * 3"), "(* [(+ 1 2)] 3)");
    assert_eq!(render_body("~1 + 2"), "(+ (~ 1) 2)");
    assert_eq!(render_body("isvoid x + 1"), "(+ (isvoid x) 1)");
}

#[test]
fn test_parse_comparison_and_not() {
    assert_eq!(render_body("not 1 + 2 < 3"), "(not (< (+ 1 2) 3))");
    assert_eq!(render_body("a <= b"), "(<= a b)");
    assert_eq!(render_body("a = b + 1"), "(= a (+ b 1))");
}

#[test]
fn test_parse_comparisons_do_not_chain() {
    assert!(matches!(
        try_parse("chain.cl", b"class A { f() : Bool { 1 < 2 < 3 }; };"),
        Err(ParserError::UnexpectedToken { .. })
    ));

    assert!(matches!(
        try_parse("not_operand.cl", b"class A { f() : Int { 1 + not x }; };"),
        Err(ParserError::UnexpectedToken { .. })
    ));

    assert_eq!(render_body("not not a = b"), "(not (not (= a b)))");
    assert_eq!(render_body("isvoid ~x * 2"), "(* (isvoid (~ x)) 2)");

    assert!(matches!(
        try_parse("compl_operand.cl", b"class A { f() : Int { ~isvoid x }; };"),
        Err(ParserError::UnexpectedToken { .. })
    ));
}

#[test]
fn test_parse_assignment_is_right_associative() {
    assert_eq!(render_body("a <- b <- 1 + 2"), "(<- a (<- b (+ 1 2)))");
}

#[test]
fn test_parse_dispatch_chain() {
    assert_eq!(
        render_body("f(1).g()@A.h(x, y)"),
        "(call (call (call f [1]).g [])@A.h [x y])"
    );
}

#[test]
fn test_parse_let() {
    assert_eq!(
        render_body("let x : Int <- 1, y : Bool in x"),
        "(let [x: Int 1, y: Bool] x)"
    );

    // the body of a let extends as far as possible
    assert_eq!(
        render_body("let x : Int in x + 1"),
        "(let [x: Int] (+ x 1))"
    );
}

#[test]
fn test_parse_control_flow() {
    assert_eq!(
        render_body("if a < b then { a; b; } else while c loop d pool fi"),
        "(if (< a b) {a b} (while c d))"
    );

    assert_eq!(
        render_body("case x of i : Int => i; o : Object => 0; esac"),
        "(case x [i: Int => i, o: Object => 0])"
    );

    assert_eq!(render_body("new Foo"), "(new Foo)");
    assert_eq!(render_body("\"hi\""), "\"hi\"");
    assert_eq!(render_body("true"), "true");
}

#[test]
fn test_parse_errors() {
    assert!(matches!(
        try_parse("empty.cl", b""),
        Err(ParserError::UnexpectedToken { .. })
    ));

    assert!(matches!(
        try_parse("missing_semicolon.cl", b"class A {}"),
        Err(ParserError::UnexpectedToken { .. })
    ));

    assert!(matches!(
        try_parse("uppercased_name.cl", b"class A { X : Int; };"),
        Err(ParserError::UppercasedName(_))
    ));

    assert!(matches!(
        try_parse("lowercased_ty_name.cl", b"class a {};"),
        Err(ParserError::LowercasedTyName(_))
    ));

    assert!(matches!(
        try_parse("empty_block.cl", b"class A { f() : Int { {} }; };"),
        Err(ParserError::UnexpectedToken { .. })
    ));

    assert!(matches!(
        try_parse("lexer_error.cl", b"class A { f() : Int { 1 # 2 }; };"),
        Err(ParserError::LexerError(_))
    ));
}

fn nested_parens(depth: usize) -> String {
    format!(
        "class A {{ f() : Int {{ {}1{} }}; }};",
        "(".repeat(depth),
        ")".repeat(depth),
    )
}

#[test]
fn test_parse_recursion_limit() {
    // the method body itself takes one level out of 32
    assert!(try_parse("shallow.cl", nested_parens(31).as_bytes()).is_ok());

    for depth in [32, 1000] {
        assert!(matches!(
            try_parse("deep.cl", nested_parens(depth).as_bytes()),
            Err(ParserError::RecursionLimit(_))
        ));
    }

    let complements = format!("class A {{ f() : Int {{ {}1 }}; }};", "~".repeat(1000));
    assert!(matches!(
        try_parse("complements.cl", complements.as_bytes()),
        Err(ParserError::RecursionLimit(_))
    ));
}
