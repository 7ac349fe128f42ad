#![no_main]

use libfuzzer_sys::fuzz_target;

use coolbril::codegen::CodegenOptions;
use coolbril::parse::{Cursor, Lexer, Parser};
use coolbril::source::{Source, SourceBuffer};

fuzz_target!(|code: &[u8]| {
    let mut source_buf = SourceBuffer::new();
    let mut source = Source::new(&mut source_buf);
    let source_id = source.load_from_string("fuzz-input.cl".into(), code.to_vec());
    let source_file = source.get(source_id).unwrap();

    let cursor = Cursor::new(source_file);
    let lexer = Lexer::new(cursor);
    let parser = Parser::new(lexer);
    let Ok(ast) = parser.parse() else { return };

    // type errors and unsupported constructs are expected; panics and hangs are not
    if let Ok(program) = coolbril::compile(&ast.classes, &CodegenOptions::default()) {
        let _ = program.to_json().unwrap();
        let _ = program.to_string();
    }
});
