// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler and stack-based virtual machine for Slate.
//!
//! Source is parsed by `slate-parser`, compiled to bytecode in a single
//! pass, then executed by [`Vm`].
//!
//! ```no_run
//! use slate_vm::{ParseMode, Vm};
//!
//! let mut vm = Vm::new();
//! let result = vm.interpret("2 + 3 * 4", ParseMode::Strict).unwrap();
//! assert_eq!(result.map(|v| v.to_string()), Some("14".to_string()));
//! ```

pub mod chunk;
pub mod compiler;
pub mod datetime;
pub mod numeric;
pub mod opcode;
pub mod value;
pub mod vm;

use std::fmt;

pub use chunk::{Chunk, Function, FunctionTable};
pub use compiler::{CompileError, CompileOptions};
pub use datetime::{Period, Temporal};
pub use opcode::OpCode;
pub use slate_parser::{ErrorKind, ParseError, ParseMode};
pub use value::{Arity, ClassId, Native, ObjectMap, Value};
pub use vm::{Context, FloatPrecision, OutputBuffer, RuntimeError, Vm, VmConfig};

/// Any failure of the parse, compile, execute pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Parse(Vec<ParseError>),
    Compile(Vec<CompileError>),
    Runtime(RuntimeError),
}

impl Error {
    /// Kind of the first error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse(errors) => errors.first().map_or(ErrorKind::ParseError, |e| e.kind),
            Error::Compile(_) => ErrorKind::CompileError,
            Error::Runtime(err) => err.kind,
        }
    }

    /// Caret-underlined diagnostics, one per error.
    pub fn render(&self, source: &str) -> String {
        match self {
            Error::Parse(errors) => errors
                .iter()
                .map(|e| {
                    slate_parser::render_diagnostic(
                        e.kind,
                        &e.message,
                        slate_parser::source_line(source, e.line),
                        e.line,
                        e.column,
                    )
                })
                .collect(),
            Error::Compile(errors) => errors.iter().map(|e| e.render(source)).collect(),
            Error::Runtime(err) => err.render(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(errors) => write_all(f, errors),
            Error::Compile(errors) => write_all(f, errors),
            Error::Runtime(err) => write!(f, "{}", err),
        }
    }
}

fn write_all<E: fmt::Display>(f: &mut fmt::Formatter<'_>, errors: &[E]) -> fmt::Result {
    for (i, err) in errors.iter().enumerate() {
        if i > 0 {
            f.write_str("; ")?;
        }
        write!(f, "{}", err)?;
    }
    Ok(())
}

impl std::error::Error for Error {}

impl From<RuntimeError> for Error {
    fn from(err: RuntimeError) -> Self {
        Error::Runtime(err)
    }
}
