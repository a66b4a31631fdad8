// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler: transforms the Slate AST to bytecode in one pass.
//!
//! Scope resolution happens during generation: locals are stack slots,
//! captured variables become upvalues, and script-level declarations are
//! globals.

pub mod codegen;
pub mod emit;
pub mod scope;
pub mod types;

use std::rc::Rc;

use slate_parser::Node;

use crate::chunk::{Function, FunctionTable};

pub use codegen::Compiler;
pub use types::{CompileError, CompileOptions, Local, LoopContext, Result, Upvalue};

/// Compile a parsed program. New functions are appended to `functions`.
pub fn compile(
    program: &Node,
    source: &str,
    functions: &mut FunctionTable,
    options: CompileOptions,
) -> std::result::Result<Rc<Function>, Vec<CompileError>> {
    Compiler::new(Rc::from(source), functions, options).compile_program(program)
}
