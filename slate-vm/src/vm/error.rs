// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime errors for the VM.

use std::fmt;

use slate_parser::{ErrorKind, render_diagnostic};

/// Runtime error during VM execution.
///
/// Handlers create errors without a location; the VM fills in `line`,
/// `column` and `source_line` from the debug table when the error reaches
/// the `execute` boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    /// 0 when the location is unknown.
    pub line: usize,
    pub column: usize,
    pub source_line: Option<String>,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        RuntimeError {
            kind,
            message: message.into(),
            line: 0,
            column: 0,
            source_line: None,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    pub fn reference(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReferenceError, message)
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RangeError, message)
    }

    pub fn arity(name: &str, expected: impl fmt::Display, got: usize) -> Self {
        Self::new(
            ErrorKind::ArityError,
            format!("'{}' expects {}, got {}", name, expected, got),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn stack_underflow() -> Self {
        Self::internal("stack underflow")
    }

    pub fn has_location(&self) -> bool {
        self.line > 0
    }

    /// Caret-underlined diagnostic for terminals.
    pub fn render(&self) -> String {
        render_diagnostic(
            self.kind,
            &self.message,
            self.source_line.as_deref(),
            self.line,
            self.column,
        )
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_location() {
            write!(
                f,
                "{} at {}:{}: {}",
                self.kind, self.line, self.column, self.message
            )
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for VM operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
