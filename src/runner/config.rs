use std::path::PathBuf;

use clap::{arg, command, value_parser, ValueEnum};
use coolbril::codegen::CodegenOptions;

#[derive(Debug, Clone)]
pub struct CoolbrilConfig {
    pub paths: Vec<PathBuf>,
    pub output: OutputKind,
    pub output_path: Option<PathBuf>,
    pub codegen: CodegenOptions,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum CompilationStage {
    Lexer,
    Parser,
    Typeck,
    #[default]
    Codegen,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Debug,
    Ron,
    Json,
    Text,
}

const INVALID_FORMAT: &str = "this format cannot be used for the current compilation stage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LexerOutputFormat {
    #[default]
    Debug,
}

impl TryFrom<OutputFormat> for LexerOutputFormat {
    type Error = &'static str;

    fn try_from(format: OutputFormat) -> Result<LexerOutputFormat, Self::Error> {
        match format {
            OutputFormat::Debug => Ok(Self::Debug),
            _ => Err(INVALID_FORMAT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParserOutputFormat {
    Debug,
    #[default]
    Ron,
}

impl TryFrom<OutputFormat> for ParserOutputFormat {
    type Error = &'static str;

    fn try_from(format: OutputFormat) -> Result<ParserOutputFormat, Self::Error> {
        match format {
            OutputFormat::Debug => Ok(Self::Debug),
            OutputFormat::Ron => Ok(Self::Ron),
            _ => Err(INVALID_FORMAT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TypeckOutputFormat {
    Debug,
    #[default]
    Ron,
}

impl TryFrom<OutputFormat> for TypeckOutputFormat {
    type Error = &'static str;

    fn try_from(format: OutputFormat) -> Result<TypeckOutputFormat, Self::Error> {
        match format {
            OutputFormat::Debug => Ok(Self::Debug),
            OutputFormat::Ron => Ok(Self::Ron),
            _ => Err(INVALID_FORMAT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CodegenOutputFormat {
    Debug,
    #[default]
    Json,
    Text,
}

impl TryFrom<OutputFormat> for CodegenOutputFormat {
    type Error = &'static str;

    fn try_from(format: OutputFormat) -> Result<CodegenOutputFormat, Self::Error> {
        match format {
            OutputFormat::Debug => Ok(Self::Debug),
            OutputFormat::Json => Ok(Self::Json),
            OutputFormat::Text => Ok(Self::Text),
            OutputFormat::Ron => Err(INVALID_FORMAT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Lexer(LexerOutputFormat),
    Parser(ParserOutputFormat),
    Typeck(TypeckOutputFormat),
    Codegen(CodegenOutputFormat),
}

fn select_format<F>(format: Option<OutputFormat>) -> Result<F, &'static str>
where
    F: TryFrom<OutputFormat, Error = &'static str> + Default,
{
    match format {
        Some(format) => format.try_into(),
        None => Ok(Default::default()),
    }
}

pub fn parse_args_or_exit() -> CoolbrilConfig {
    use clap::Command;

    fn command() -> Command {
        command!()
            .arg(
                arg!(files: <FILE> ... "input files")
                    .value_parser(value_parser!(PathBuf))
                    .required(true),
            )
            .arg(
                arg!(-s --stage <STAGE> "the compilation stage to perform")
                    .value_parser(value_parser!(CompilationStage))
                    .required(false),
            )
            .arg(
                arg!(-f --format <FORMAT> "the output format")
                    .value_parser(value_parser!(OutputFormat)),
            )
            .arg(
                arg!(-o --output <PATH> "write the generated program to a file instead of stdout")
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                arg!(--"entry-class" <NAME> "the class containing the entry method")
                    .default_value("Main"),
            )
            .arg(
                arg!(--"entry-method" <NAME> "the method compiled to the entry function")
                    .default_value("main"),
            )
    }

    fn parse_args() -> Result<CoolbrilConfig, clap::Error> {
        use clap::error::ErrorKind;

        let mut command = command();
        let matches = command.get_matches_mut();

        let paths = matches
            .get_many::<PathBuf>("files")
            .into_iter()
            .flatten()
            .cloned()
            .collect();

        let stage = matches
            .get_one::<CompilationStage>("stage")
            .copied()
            .unwrap_or_default();
        let format = matches.get_one::<OutputFormat>("format").copied();

        let output = match stage {
            CompilationStage::Lexer => select_format(format).map(OutputKind::Lexer),
            CompilationStage::Parser => select_format(format).map(OutputKind::Parser),
            CompilationStage::Typeck => select_format(format).map(OutputKind::Typeck),
            CompilationStage::Codegen => select_format(format).map(OutputKind::Codegen),
        }
        .map_err(|msg| command.error(ErrorKind::ValueValidation, msg))?;

        let output_path = matches.get_one::<PathBuf>("output").cloned();

        let mut codegen = CodegenOptions::default();

        if let Some(entry_class) = matches.get_one::<String>("entry-class") {
            codegen.entry_class = entry_class.clone();
        }

        if let Some(entry_method) = matches.get_one::<String>("entry-method") {
            codegen.entry_method = entry_method.clone();
        }

        Ok(CoolbrilConfig {
            paths,
            output,
            output_path,
            codegen,
        })
    }

    match parse_args() {
        Ok(cfg) => cfg,

        Err(e) => {
            e.format(&mut command()).exit();
        }
    }
}
