// slate-parser - Error kinds and diagnostics for Slate
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Error kinds shared by every stage of the Slate pipeline, the parser's
//! error type, and caret-underlined diagnostic rendering.

use std::fmt;

/// The single error enumeration surfaced by the lexer, parser, compiler and VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid character, unterminated string/template, inconsistent dedent.
    LexError,
    /// Unexpected token, missing terminator, invalid lvalue.
    ParseError,
    /// Misplaced break/continue, oversized jumps, invalid assignment forms.
    CompileError,
    /// Operator applied to incompatible operands, non-callable callee.
    TypeError,
    /// Unknown global, assignment to an immutable binding.
    ReferenceError,
    /// Index out of bounds, shift count out of range, stack exhaustion.
    RangeError,
    /// Zero divisor for `/`, `//`, `%` or `mod`.
    DivisionByZero,
    /// Date/time arithmetic beyond the representable range.
    OverflowError,
    /// Wrong number of call arguments.
    ArityError,
    /// A VM invariant was broken.
    Internal,
}

impl ErrorKind {
    /// The name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::LexError => "LexError",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::CompileError => "CompileError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::DivisionByZero => "DivisionByZero",
            ErrorKind::OverflowError => "OverflowError",
            ErrorKind::ArityError => "ArityError",
            ErrorKind::Internal => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parser error with position information.
///
/// Lexical failures reach the parser as ERROR tokens and are reported
/// with `kind == ErrorKind::LexError`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    /// Create a syntax error.
    pub fn syntax(message: impl Into<String>, line: usize, column: usize) -> Self {
        ParseError {
            kind: ErrorKind::ParseError,
            message: message.into(),
            line,
            column,
        }
    }

    /// Create a lexical error.
    pub fn lexical(message: impl Into<String>, line: usize, column: usize) -> Self {
        ParseError {
            kind: ErrorKind::LexError,
            message: message.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}:{}: {}",
            self.kind, self.line, self.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// Return the text of a 1-indexed source line, without its terminator.
pub fn source_line(source: &str, line: usize) -> Option<&str> {
    if line == 0 {
        return None;
    }
    source
        .split('\n')
        .nth(line - 1)
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
}

/// Render a diagnostic with the offending source line and a caret under
/// the reported column.
///
/// ```text
/// ParseError: expected expression
///   --> 3:9
///    |
///  3 | var x = )
///    |         ^
/// ```
pub fn render_diagnostic(
    kind: ErrorKind,
    message: &str,
    line_text: Option<&str>,
    line: usize,
    column: usize,
) -> String {
    let mut out = format!("{}: {}\n", kind, message);
    if line == 0 {
        return out;
    }
    out.push_str(&format!("  --> {}:{}\n", line, column));
    if let Some(text) = line_text {
        let gutter = line.to_string().len();
        let pad = " ".repeat(gutter);
        out.push_str(&format!(" {} |\n", pad));
        out.push_str(&format!(" {} | {}\n", line, text));
        let caret_offset: String = text
            .chars()
            .take(column.saturating_sub(1))
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        out.push_str(&format!(" {} | {}^\n", pad, caret_offset));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_line_lookup() {
        let src = "a\r\nbb\nccc";
        assert_eq!(source_line(src, 1), Some("a"));
        assert_eq!(source_line(src, 2), Some("bb"));
        assert_eq!(source_line(src, 3), Some("ccc"));
        assert_eq!(source_line(src, 4), None);
        assert_eq!(source_line(src, 0), None);
    }

    #[test]
    fn test_caret_under_column() {
        let rendered =
            render_diagnostic(ErrorKind::ParseError, "boom", Some("var x = )"), 3, 9);
        let last = rendered.lines().last().unwrap();
        assert_eq!(last, "   |         ^");
        assert!(rendered.starts_with("ParseError: boom"));
    }
}
