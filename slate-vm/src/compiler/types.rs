// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared types for the bytecode compiler.

use std::fmt;
use std::rc::Rc;

use slate_parser::{ErrorKind, ParseMode, render_diagnostic, source_line};

use crate::chunk::{Chunk, Function, UpvalueDesc};
use crate::vm::FloatPrecision;

/// Error during compilation. Always of kind [`ErrorKind::CompileError`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl CompileError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        CompileError {
            message: message.into(),
            line,
            column,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::CompileError
    }

    /// Caret-underlined diagnostic against the compiled source.
    pub fn render(&self, source: &str) -> String {
        render_diagnostic(
            self.kind(),
            &self.message,
            source_line(source, self.line),
            self.line,
            self.column,
        )
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}:{}: {}",
            self.kind(),
            self.line,
            self.column,
            self.message
        )
    }
}

impl std::error::Error for CompileError {}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

/// Settings that change the emitted code.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Decides which block forms produce values.
    pub mode: ParseMode,
    /// Rounding applied to unsuffixed float literals.
    pub precision: FloatPrecision,
}

/// Local variable during compilation.
#[derive(Debug, Clone)]
pub struct Local {
    pub name: String,
    /// Scope depth the local was declared at.
    pub depth: usize,
    /// Stack slot relative to the frame base.
    pub slot: usize,
    pub mutable: bool,
}

/// Captured variable of the function being compiled.
#[derive(Debug, Clone, Copy)]
pub struct Upvalue {
    /// Index in parent's locals (is_local=true) or parent's upvalues (is_local=false)
    pub index: u8,
    /// True if capturing from parent's locals, false if from parent's upvalues
    pub is_local: bool,
    pub mutable: bool,
}

/// Loop context for compiling break/continue.
#[derive(Debug, Clone)]
pub struct LoopContext {
    /// Stack depth when the loop was entered; break/continue pop back to it.
    pub entry_depth: usize,
    /// Backward target for `continue`, when it is already known.
    pub continue_target: Option<usize>,
    /// Forward `continue` jumps awaiting the step/condition label.
    pub continue_jumps: Vec<usize>,
    /// Jumps to patch to the loop exit.
    pub break_jumps: Vec<usize>,
}

/// Whether a function state compiles a script body or a function literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Script,
    Function,
}

/// Per-function compilation state. Nested function literals push a new
/// state; the enclosing ones stay available for upvalue resolution.
pub struct FunctionState {
    pub kind: FunctionKind,
    pub name: Option<String>,
    pub params: Vec<String>,
    pub chunk: Chunk,
    pub locals: Vec<Local>,
    pub upvalues: Vec<Upvalue>,
    pub scope_depth: usize,
    /// Values on the stack above the frame base at this point of the code.
    pub stack_depth: usize,
    pub loops: Vec<LoopContext>,
}

/// Snapshot used to recover after a failed top-level statement.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    locals: usize,
    scope_depth: usize,
    stack_depth: usize,
    loops: usize,
}

impl FunctionState {
    pub fn script(source: Rc<str>) -> Self {
        Self::new(FunctionKind::Script, None, Vec::new(), source)
    }

    pub fn function(name: Option<String>, params: Vec<String>, source: Rc<str>) -> Self {
        Self::new(FunctionKind::Function, name, params, source)
    }

    fn new(kind: FunctionKind, name: Option<String>, params: Vec<String>, source: Rc<str>) -> Self {
        Self {
            kind,
            name,
            params,
            chunk: Chunk::new(source),
            locals: Vec::new(),
            upvalues: Vec::new(),
            scope_depth: 0,
            stack_depth: 0,
            loops: Vec::new(),
        }
    }

    pub fn is_script(&self) -> bool {
        self.kind == FunctionKind::Script
    }

    /// Innermost local named `name`: its slot and mutability.
    pub fn resolve_local(&self, name: &str) -> Option<(usize, bool)> {
        self.locals
            .iter()
            .rev()
            .find(|local| local.name == name)
            .map(|local| (local.slot, local.mutable))
    }

    /// A local with this name declared in the innermost open scope.
    pub fn local_in_scope(&self, name: &str) -> Option<usize> {
        self.locals
            .iter()
            .rev()
            .take_while(|local| local.depth == self.scope_depth)
            .position(|local| local.name == name)
            .map(|from_end| self.locals.len() - 1 - from_end)
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            locals: self.locals.len(),
            scope_depth: self.scope_depth,
            stack_depth: self.stack_depth,
            loops: self.loops.len(),
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.locals.truncate(checkpoint.locals);
        self.scope_depth = checkpoint.scope_depth;
        self.stack_depth = checkpoint.stack_depth;
        self.loops.truncate(checkpoint.loops);
    }

    pub fn into_function(self) -> Function {
        Function {
            name: self.name,
            params: self.params,
            chunk: self.chunk,
            upvalues: self
                .upvalues
                .iter()
                .map(|u| UpvalueDesc {
                    index: u.index,
                    is_local: u.is_local,
                })
                .collect(),
        }
    }
}
