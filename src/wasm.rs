use wasm_bindgen::prelude::*;

use crate::codegen::CodegenOptions;
use crate::parse::{Cursor, Lexer, Parser};
use crate::source::{Source, SourceBuffer};

fn produce_error_message(errors: impl IntoIterator<Item = String>) -> String {
    let mut result = "Compilation failed due to the following errors:".to_owned();

    for message in errors {
        result.push('\n');
        result.push_str(&message);
    }

    result
}

/// Compiles a COOL program to Bril, returning the program in the JSON form.
#[wasm_bindgen]
pub fn compile_from_string(code: &str) -> Result<String, String> {
    console_error_panic_hook::set_once();

    let mut source_buf = SourceBuffer::new();
    let mut source = Source::new(&mut source_buf);
    let source_id = source.load_from_string("main.cl".into(), code.as_bytes().to_vec());
    let Some(source_file) = source.get(source_id) else {
        return Err(produce_error_message(["could not load the source".to_owned()]));
    };

    let cursor = Cursor::new(source_file);
    let lexer = Lexer::new(cursor);
    let parser = Parser::new(lexer);
    let ast = parser
        .parse()
        .map_err(|e| produce_error_message([e.to_string()]))?;

    let program = crate::compile(&ast.classes, &CodegenOptions::default())
        .map_err(|e| produce_error_message([e.to_string()]))?;

    program
        .to_json()
        .map_err(|e| produce_error_message([e.to_string()]))
}
