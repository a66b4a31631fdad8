// slate-parser - Lexer for Slate
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Lexer (tokeniser) for Slate source code.
//!
//! Converts a UTF-8 source string into a stream of [`Token`]s. The lexer is
//! indentation sensitive (it emits `Indent`/`Dedent` around indented blocks)
//! and keeps a mode stack for template literals so that `${ ... }`
//! interpolations are tokenised as ordinary expressions.
//!
//! Lexical failures never abort the stream: they produce an `Error` token
//! spanning the offending character, and the message is available through
//! [`Lexer::take_error`].

use std::collections::VecDeque;

use log::trace;

use crate::token::{Token, TokenKind};

/// Columns a tab advances indentation by.
const TAB_WIDTH: usize = 4;

/// Lexer mode, pushed when entering a template literal or an interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Inside backticks, reading template text.
    Template,
    /// Inside `${ ... }`; `depth` counts unmatched `{` within the expression.
    TemplateExpr { depth: usize },
}

/// The lexer converts source code into tokens.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    /// Indentation widths of the enclosing blocks; never empty.
    indent_stack: Vec<usize>,
    /// Nesting of `()`, `[]` and `{}`; layout is suspended while non-zero.
    bracket_depth: usize,
    modes: Vec<Mode>,
    /// Tokens produced ahead of time (dedents, layout at end of input).
    pending: VecDeque<Token>,
    at_line_start: bool,
    /// Whether the current logical line produced a token (controls `Newline`).
    line_has_tokens: bool,
    finished: bool,
    /// Message for the most recent `Error` token.
    error: Option<String>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            indent_stack: vec![0],
            bracket_depth: 0,
            modes: Vec::new(),
            pending: VecDeque::new(),
            at_line_start: true,
            line_has_tokens: false,
            finished: false,
            error: None,
        }
    }

    /// The source text being tokenised.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Take the message of the most recent `Error` token.
    pub fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }

    /// Collect all tokens (excluding the final `Eof`) into a vector.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            tokens.push(token);
        }
        trace!("tokenised {} tokens", tokens.len());
        tokens
    }

    /// Get the next token from the source.
    pub fn next_token(&mut self) -> Token {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return token;
            }
            if self.finished {
                return self.make_at(TokenKind::Eof, self.pos, 0, self.line, self.column);
            }

            if self.modes.last() == Some(&Mode::Template) {
                return self.lex_template_part();
            }

            if self.at_line_start && self.layout_active() {
                self.at_line_start = false;
                self.handle_indentation();
                continue;
            }

            self.skip_trivia();

            let Some(c) = self.peek() else {
                self.finish();
                continue;
            };

            if c == b'\n' {
                let (line, column, start) = (self.line, self.column, self.pos);
                self.advance();
                if self.layout_active() {
                    self.at_line_start = true;
                    if self.line_has_tokens {
                        self.line_has_tokens = false;
                        return self.make_at(TokenKind::Newline, start, 1, line, column);
                    }
                }
                continue;
            }

            let token = self.scan_token();
            self.line_has_tokens = true;
            return token;
        }
    }

    // ========================================================================
    // Layout
    // ========================================================================

    /// Layout (newlines, indentation) only matters outside brackets and
    /// template interpolations.
    fn layout_active(&self) -> bool {
        self.bracket_depth == 0 && self.modes.is_empty()
    }

    /// Measure the indentation of the line starting at `pos` and queue the
    /// resulting `Indent`/`Dedent` tokens. Blank and comment-only lines are
    /// skipped entirely.
    fn handle_indentation(&mut self) {
        loop {
            let mut width = 0;
            while let Some(c) = self.peek() {
                match c {
                    b' ' => width += 1,
                    b'\t' => width += TAB_WIDTH,
                    b'\r' => {}
                    _ => break,
                }
                self.advance();
            }
            self.skip_trivia();
            match self.peek() {
                // Blank or comment-only line: ignore it for indentation.
                Some(b'\n') => {
                    self.advance();
                    continue;
                }
                None => return,
                Some(_) => {}
            }

            let (line, start) = (self.line, self.pos);
            let top = self.indent_top();
            if width > top {
                self.indent_stack.push(width);
                let token = self.make_at(TokenKind::Indent, start, 0, line, 1);
                self.pending.push_back(token);
            } else if width < top {
                while width < self.indent_top() && self.indent_stack.len() > 1 {
                    self.indent_stack.pop();
                    let token = self.make_at(TokenKind::Dedent, start, 0, line, 1);
                    self.pending.push_back(token);
                }
                if self.indent_top() != width {
                    self.error = Some("inconsistent indentation".to_string());
                    self.indent_stack.push(width);
                    let token = self.make_at(TokenKind::Error, start, 1, line, self.column);
                    self.pending.push_back(token);
                }
            }
            return;
        }
    }

    fn indent_top(&self) -> usize {
        self.indent_stack.last().copied().unwrap_or(0)
    }

    /// Queue the end-of-input layout: a final `Newline`, the pending
    /// `Dedent`s and `Eof`.
    fn finish(&mut self) {
        let (start, line, column) = (self.pos, self.line, self.column);
        if let Some(mode) = self.modes.pop() {
            let message = match mode {
                Mode::Template => "unterminated template literal",
                Mode::TemplateExpr { .. } => "unterminated template interpolation",
            };
            self.error = Some(message.to_string());
            self.modes.clear();
            let token = self.make_at(TokenKind::Error, start, 0, line, column);
            self.pending.push_back(token);
        }
        if self.line_has_tokens {
            self.line_has_tokens = false;
            let token = self.make_at(TokenKind::Newline, start, 0, line, column);
            self.pending.push_back(token);
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            let token = self.make_at(TokenKind::Dedent, start, 0, line, column);
            self.pending.push_back(token);
        }
        self.finished = true;
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else if b & 0xC0 != 0x80 {
            // Continuation bytes of a UTF-8 sequence share the column of
            // their leading byte.
            self.column += 1;
        }
        Some(b)
    }

    fn make_at(
        &self,
        kind: TokenKind,
        start: usize,
        len: usize,
        line: usize,
        column: usize,
    ) -> Token {
        Token {
            kind,
            start,
            len,
            line,
            column,
        }
    }

    fn error_token(&mut self, message: String, start: usize, line: usize, column: usize) -> Token {
        self.error = Some(message);
        let available = self.bytes.len().saturating_sub(start);
        let len = self.pos.saturating_sub(start).max(1).min(available);
        self.make_at(TokenKind::Error, start, len, line, column)
    }

    /// Skip spaces, tabs, carriage returns and comments. Newlines are
    /// skipped too when layout is suspended.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') => {
                    self.advance();
                }
                Some(b'\n') if !self.layout_active() => {
                    self.advance();
                }
                Some(b'\\') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    self.advance();
                    self.advance();
                    while let Some(c) = self.peek() {
                        if c == b'*' && self.peek_at(1) == Some(b'/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    // ========================================================================
    // Tokens
    // ========================================================================

    fn scan_token(&mut self) -> Token {
        let (start, line, column) = (self.pos, self.line, self.column);
        let Some(c) = self.advance() else {
            return self.make_at(TokenKind::Eof, start, 0, line, column);
        };

        let kind = match c {
            b'(' | b'[' => {
                self.bracket_depth += 1;
                if c == b'(' {
                    TokenKind::LParen
                } else {
                    TokenKind::LBracket
                }
            }
            b')' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                TokenKind::RParen
            }
            b']' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                TokenKind::RBracket
            }
            b'{' => {
                if let Some(Mode::TemplateExpr { depth }) = self.modes.last_mut() {
                    *depth += 1;
                } else {
                    self.bracket_depth += 1;
                }
                TokenKind::LBrace
            }
            b'}' => match self.modes.last_mut() {
                Some(Mode::TemplateExpr { depth }) if *depth == 0 => {
                    self.modes.pop();
                    TokenKind::TemplateExprEnd
                }
                Some(Mode::TemplateExpr { depth }) => {
                    *depth -= 1;
                    TokenKind::RBrace
                }
                _ => {
                    self.bracket_depth = self.bracket_depth.saturating_sub(1);
                    TokenKind::RBrace
                }
            },
            b'`' => {
                self.modes.push(Mode::Template);
                TokenKind::TemplateStart
            }
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b':' => TokenKind::Colon,
            b'~' => TokenKind::Tilde,
            b'"' | b'\'' => return self.scan_string(c, start, line, column),
            b'0'..=b'9' => return self.scan_number(start, line, column),
            c if c.is_ascii_alphabetic() || c == b'_' => {
                return self.scan_identifier(start, line, column);
            }
            b'+' => self.choose(&[(b"+", TokenKind::PlusPlus), (b"=", TokenKind::PlusEqual)], TokenKind::Plus),
            b'-' => self.choose(
                &[
                    (b"-", TokenKind::MinusMinus),
                    (b"=", TokenKind::MinusEqual),
                    (b">", TokenKind::Arrow),
                ],
                TokenKind::Minus,
            ),
            b'*' => self.choose(
                &[
                    (b"*=", TokenKind::StarStarEqual),
                    (b"*", TokenKind::StarStar),
                    (b"=", TokenKind::StarEqual),
                ],
                TokenKind::Star,
            ),
            b'/' => self.choose(
                &[
                    (b"/=", TokenKind::SlashSlashEqual),
                    (b"/", TokenKind::SlashSlash),
                    (b"=", TokenKind::SlashEqual),
                ],
                TokenKind::Slash,
            ),
            b'%' => self.choose(&[(b"=", TokenKind::PercentEqual)], TokenKind::Percent),
            b'&' => self.choose(
                &[
                    (b"&=", TokenKind::AmpAmpEqual),
                    (b"&", TokenKind::AmpAmp),
                    (b"=", TokenKind::AmpEqual),
                ],
                TokenKind::Amp,
            ),
            b'|' => self.choose(
                &[
                    (b"|=", TokenKind::PipePipeEqual),
                    (b"|", TokenKind::PipePipe),
                    (b"=", TokenKind::PipeEqual),
                ],
                TokenKind::Pipe,
            ),
            b'^' => self.choose(&[(b"=", TokenKind::CaretEqual)], TokenKind::Caret),
            b'<' => self.choose(
                &[
                    (b"<=", TokenKind::LessLessEqual),
                    (b"<", TokenKind::LessLess),
                    (b"=", TokenKind::LessEqual),
                ],
                TokenKind::Less,
            ),
            b'>' => self.choose(
                &[
                    (b">>=", TokenKind::GreaterGreaterGreaterEqual),
                    (b">>", TokenKind::GreaterGreaterGreater),
                    (b">=", TokenKind::GreaterGreaterEqual),
                    (b">", TokenKind::GreaterGreater),
                    (b"=", TokenKind::GreaterEqual),
                ],
                TokenKind::Greater,
            ),
            b'=' => self.choose(
                &[(b"=", TokenKind::EqualEqual), (b">", TokenKind::FatArrow)],
                TokenKind::Equal,
            ),
            b'!' => self.choose(&[(b"=", TokenKind::BangEqual)], TokenKind::Bang),
            b'?' => {
                // `?.5` is a ternary followed by a number, not optional chaining.
                let dot_digit = self.peek() == Some(b'.')
                    && self.peek_at(1).is_some_and(|d| d.is_ascii_digit());
                if dot_digit {
                    TokenKind::Question
                } else {
                    self.choose(
                        &[
                            (b"?=", TokenKind::QuestionQuestionEqual),
                            (b"?", TokenKind::QuestionQuestion),
                            (b".", TokenKind::QuestionDot),
                        ],
                        TokenKind::Question,
                    )
                }
            }
            b'.' => self.choose(&[(b".<", TokenKind::DotDotLess), (b".", TokenKind::DotDot)], TokenKind::Dot),
            _ => {
                // Consume the rest of a multi-byte character.
                while self.peek().is_some_and(|b| b & 0xC0 == 0x80) {
                    self.advance();
                }
                let text = &self.source[start..self.pos];
                return self.error_token(format!("unexpected character '{}'", text), start, line, column);
            }
        };

        self.make_at(kind, start, self.pos - start, line, column)
    }

    /// Longest-match helper for operators: the first suffix that matches the
    /// upcoming bytes is consumed.
    fn choose(&mut self, options: &[(&[u8], TokenKind)], default: TokenKind) -> TokenKind {
        for (suffix, kind) in options {
            if self.bytes[self.pos..].starts_with(suffix) {
                for _ in 0..suffix.len() {
                    self.advance();
                }
                return *kind;
            }
        }
        default
    }

    fn scan_identifier(&mut self, start: usize, line: usize, column: usize) -> Token {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.advance();
        }
        let text = &self.source[start..self.pos];
        let kind = TokenKind::keyword(text).unwrap_or(TokenKind::Identifier);
        self.make_at(kind, start, self.pos - start, line, column)
    }

    fn scan_number(&mut self, start: usize, line: usize, column: usize) -> Token {
        let first = self.bytes[start];
        if first == b'0' && matches!(self.peek(), Some(b'x') | Some(b'X')) {
            self.advance();
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.advance();
            }
            let trailing_ident = self
                .peek()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_');
            if self.pos == digits_start || trailing_ident {
                while self
                    .peek()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
                {
                    self.advance();
                }
                let text = &self.source[start..self.pos];
                return self.error_token(format!("invalid hex literal '{}'", text), start, line, column);
            }
            return self.make_at(TokenKind::Integer, start, self.pos - start, line, column);
        }

        let mut is_float = false;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let exponent_digits = match self.peek_at(1) {
                Some(b'+') | Some(b'-') => self.peek_at(2).is_some_and(|c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if exponent_digits {
                is_float = true;
                self.advance();
                if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                    self.advance();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let suffix_kind = match self.peek() {
            Some(b'f') => Some(TokenKind::Float32),
            Some(b'd') => Some(TokenKind::Float64),
            _ => None,
        };
        let kind = match suffix_kind {
            Some(kind)
                if !self
                    .peek_at(1)
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_') =>
            {
                self.advance();
                kind
            }
            _ if is_float => TokenKind::Number,
            _ => TokenKind::Integer,
        };
        self.make_at(kind, start, self.pos - start, line, column)
    }

    fn scan_string(&mut self, quote: u8, start: usize, line: usize, column: usize) -> Token {
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    return self.error_token("unterminated string".to_string(), start, line, column);
                }
                Some(b'\\') => {
                    self.advance();
                    if self.peek().is_some_and(|c| c != b'\n') {
                        self.advance();
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        self.make_at(TokenKind::String, start, self.pos - start, line, column)
    }

    /// Read the next piece of a template literal while in `Template` mode.
    fn lex_template_part(&mut self) -> Token {
        let (start, line, column) = (self.pos, self.line, self.column);
        self.line_has_tokens = true;
        match self.peek() {
            None => {
                self.modes.pop();
                self.error_token("unterminated template literal".to_string(), start, line, column)
            }
            Some(b'`') => {
                self.advance();
                self.modes.pop();
                self.make_at(TokenKind::TemplateEnd, start, 1, line, column)
            }
            Some(b'$') if self.peek_at(1) == Some(b'{') => {
                self.advance();
                self.advance();
                self.modes.push(Mode::TemplateExpr { depth: 0 });
                self.make_at(TokenKind::TemplateExprStart, start, 2, line, column)
            }
            Some(b'$')
                if self
                    .peek_at(1)
                    .is_some_and(|c| c.is_ascii_alphabetic() || c == b'_') =>
            {
                self.advance();
                while self
                    .peek()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
                {
                    self.advance();
                }
                self.make_at(TokenKind::TemplateSimpleVar, start, self.pos - start, line, column)
            }
            Some(_) => {
                while let Some(c) = self.peek() {
                    match c {
                        b'`' => break,
                        b'$' if self.peek_at(1) == Some(b'{')
                            || self
                                .peek_at(1)
                                .is_some_and(|n| n.is_ascii_alphabetic() || n == b'_') =>
                        {
                            break;
                        }
                        b'\\' => {
                            self.advance();
                            self.advance();
                        }
                        _ => {
                            self.advance();
                        }
                    }
                }
                self.make_at(TokenKind::TemplateText, start, self.pos - start, line, column)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(s: &str) -> Vec<TokenKind> {
        Lexer::new(s).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            kinds(">>>= >>> >> ** //= ?? ?. ..< .. -> =>"),
            vec![
                TokenKind::GreaterGreaterGreaterEqual,
                TokenKind::GreaterGreaterGreater,
                TokenKind::GreaterGreater,
                TokenKind::StarStar,
                TokenKind::SlashSlashEqual,
                TokenKind::QuestionQuestion,
                TokenKind::QuestionDot,
                TokenKind::DotDotLess,
                TokenKind::DotDot,
                TokenKind::Arrow,
                TokenKind::FatArrow,
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let src = "42 0xFF 3.14 1e10 2.5f 7d 1..5";
        let tokens = Lexer::new(src).tokenize();
        let pairs: Vec<_> = tokens
            .iter()
            .map(|t| (t.kind, t.lexeme(src)))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (TokenKind::Integer, "42"),
                (TokenKind::Integer, "0xFF"),
                (TokenKind::Number, "3.14"),
                (TokenKind::Number, "1e10"),
                (TokenKind::Float32, "2.5f"),
                (TokenKind::Float64, "7d"),
                (TokenKind::Integer, "1"),
                (TokenKind::DotDot, ".."),
                (TokenKind::Integer, "5"),
                (TokenKind::Newline, ""),
            ]
        );
    }

    #[test]
    fn test_invalid_hex() {
        let mut lexer = Lexer::new("0xZZ");
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::Error);
        assert!(lexer.take_error().unwrap().contains("invalid hex"));
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("var val def foo instanceof step"),
            vec![
                TokenKind::Var,
                TokenKind::Val,
                TokenKind::Def,
                TokenKind::Identifier,
                TokenKind::Instanceof,
                TokenKind::Step,
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("1 \\ line comment\n/* block\ncomment */ 2"),
            vec![
                TokenKind::Integer,
                TokenKind::Newline,
                TokenKind::Integer,
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn test_indent_and_dedent() {
        let src = "if x then\n  a\n  b\nc\n";
        assert_eq!(
            kinds(src),
            vec![
                TokenKind::If,
                TokenKind::Identifier,
                TokenKind::Then,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Identifier,
                TokenKind::Newline,
                TokenKind::Identifier,
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Identifier,
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn test_blank_lines_do_not_affect_indentation() {
        let src = "a\n  b\n\n    \n  \\ comment only\n  c\n";
        let ks = kinds(src);
        assert_eq!(ks.iter().filter(|k| **k == TokenKind::Indent).count(), 1);
        assert_eq!(ks.iter().filter(|k| **k == TokenKind::Dedent).count(), 1);
    }

    #[test]
    fn test_dedents_flushed_at_eof() {
        let src = "a\n  b\n    c";
        let ks = kinds(src);
        assert_eq!(&ks[ks.len() - 2..], &[TokenKind::Dedent, TokenKind::Dedent]);
    }

    #[test]
    fn test_inconsistent_dedent() {
        let src = "a\n    b\n  c\n";
        let mut lexer = Lexer::new(src);
        let mut saw_error = false;
        loop {
            let t = lexer.next_token();
            if t.kind == TokenKind::Error {
                saw_error = true;
                assert_eq!(lexer.take_error().unwrap(), "inconsistent indentation");
            }
            if t.kind == TokenKind::Eof {
                break;
            }
        }
        assert!(saw_error);
    }

    #[test]
    fn test_brackets_suspend_layout() {
        let src = "f(1,\n    2,\n  3)\n";
        assert_eq!(
            kinds(src),
            vec![
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::Integer,
                TokenKind::Comma,
                TokenKind::Integer,
                TokenKind::Comma,
                TokenKind::Integer,
                TokenKind::RParen,
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn test_template_literal_modes() {
        let src = "`Hello $name and ${a + {b: 1}.b}!`";
        assert_eq!(
            kinds(src),
            vec![
                TokenKind::TemplateStart,
                TokenKind::TemplateText,
                TokenKind::TemplateSimpleVar,
                TokenKind::TemplateText,
                TokenKind::TemplateExprStart,
                TokenKind::Identifier,
                TokenKind::Plus,
                TokenKind::LBrace,
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::Integer,
                TokenKind::RBrace,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::TemplateExprEnd,
                TokenKind::TemplateText,
                TokenKind::TemplateEnd,
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn test_unterminated_string_and_template() {
        let mut lexer = Lexer::new("\"abc");
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
        assert_eq!(lexer.take_error().unwrap(), "unterminated string");

        let mut lexer = Lexer::new("`abc");
        assert_eq!(lexer.next_token().kind, TokenKind::TemplateStart);
        assert_eq!(lexer.next_token().kind, TokenKind::TemplateText);
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
        assert_eq!(lexer.take_error().unwrap(), "unterminated template literal");
    }

    #[test]
    fn test_unexpected_character_spans_whole_char() {
        let src = "a § b";
        let mut lexer = Lexer::new(src);
        lexer.next_token();
        let bad = lexer.next_token();
        assert_eq!(bad.kind, TokenKind::Error);
        assert_eq!(bad.lexeme(src), "§");
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier);
    }
}
