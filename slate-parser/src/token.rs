// slate-parser - Tokens for Slate
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Token kinds and the token record produced by the lexer.

use std::fmt;

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Delimiters
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    LBrace,   // {
    RBrace,   // }
    Comma,
    Semicolon,
    Colon,
    Dot,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar,
    SlashSlash,
    PlusPlus,
    MinusMinus,

    // Bitwise
    Amp,
    Pipe,
    Caret,
    Tilde,
    LessLess,
    GreaterGreater,
    GreaterGreaterGreater,

    // Comparison
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Logical
    AmpAmp,
    PipePipe,
    Bang,
    QuestionQuestion,
    QuestionDot,
    Question,

    // Ranges and arrows
    DotDot,
    DotDotLess,
    Arrow,    // ->
    FatArrow, // =>

    // Assignment
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    StarStarEqual,
    SlashSlashEqual,
    AmpEqual,
    PipeEqual,
    CaretEqual,
    LessLessEqual,
    GreaterGreaterEqual,
    GreaterGreaterGreaterEqual,
    AmpAmpEqual,
    PipePipeEqual,
    QuestionQuestionEqual,

    // Literals
    Identifier,
    Integer,
    Float32,
    Float64,
    Number,
    String,

    // Template literals
    TemplateStart,
    TemplateText,
    TemplateSimpleVar,
    TemplateExprStart,
    TemplateExprEnd,
    TemplateEnd,

    // Keywords
    Var,
    Val,
    Def,
    Function,
    If,
    Elif,
    Else,
    For,
    While,
    Loop,
    Do,
    Break,
    Continue,
    Return,
    Then,
    End,
    And,
    Or,
    Not,
    In,
    Instanceof,
    Mod,
    True,
    False,
    Null,
    Undefined,
    NaN,
    Infinity,
    Import,
    Package,
    Private,
    Match,
    Case,
    Step,

    // Layout
    Newline,
    Indent,
    Dedent,

    // Special
    Error,
    Eof,
}

impl TokenKind {
    /// Look up the keyword kind for an identifier-shaped lexeme.
    pub fn keyword(text: &str) -> Option<TokenKind> {
        Some(match text {
            "var" => TokenKind::Var,
            "val" => TokenKind::Val,
            "def" => TokenKind::Def,
            "function" => TokenKind::Function,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "loop" => TokenKind::Loop,
            "do" => TokenKind::Do,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "return" => TokenKind::Return,
            "then" => TokenKind::Then,
            "end" => TokenKind::End,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            "instanceof" => TokenKind::Instanceof,
            "mod" => TokenKind::Mod,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "undefined" => TokenKind::Undefined,
            "NaN" => TokenKind::NaN,
            "Infinity" => TokenKind::Infinity,
            "import" => TokenKind::Import,
            "package" => TokenKind::Package,
            "private" => TokenKind::Private,
            "match" => TokenKind::Match,
            "case" => TokenKind::Case,
            "step" => TokenKind::Step,
            _ => return None,
        })
    }

    /// Returns true for the assignment operator family (`=` and compound forms).
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            TokenKind::Equal
                | TokenKind::PlusEqual
                | TokenKind::MinusEqual
                | TokenKind::StarEqual
                | TokenKind::SlashEqual
                | TokenKind::PercentEqual
                | TokenKind::StarStarEqual
                | TokenKind::SlashSlashEqual
                | TokenKind::AmpEqual
                | TokenKind::PipeEqual
                | TokenKind::CaretEqual
                | TokenKind::LessLessEqual
                | TokenKind::GreaterGreaterEqual
                | TokenKind::GreaterGreaterGreaterEqual
                | TokenKind::AmpAmpEqual
                | TokenKind::PipePipeEqual
                | TokenKind::QuestionQuestionEqual
        )
    }

    /// Keywords that begin a statement; the parser resynchronises on these.
    pub fn starts_statement(self) -> bool {
        matches!(
            self,
            TokenKind::Var
                | TokenKind::Val
                | TokenKind::Def
                | TokenKind::Function
                | TokenKind::If
                | TokenKind::For
                | TokenKind::While
                | TokenKind::Loop
                | TokenKind::Do
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Return
                | TokenKind::Import
                | TokenKind::Package
                | TokenKind::Private
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Comma => "','",
            TokenKind::Semicolon => "';'",
            TokenKind::Colon => "':'",
            TokenKind::Dot => "'.'",
            TokenKind::Arrow => "'->'",
            TokenKind::FatArrow => "'=>'",
            TokenKind::Equal => "'='",
            TokenKind::Identifier => "identifier",
            TokenKind::Integer => "integer",
            TokenKind::Float32 | TokenKind::Float64 | TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::TemplateStart => "template literal",
            TokenKind::TemplateText => "template text",
            TokenKind::TemplateSimpleVar => "template variable",
            TokenKind::TemplateExprStart => "'${'",
            TokenKind::TemplateExprEnd => "'}'",
            TokenKind::TemplateEnd => "'`'",
            TokenKind::Newline => "newline",
            TokenKind::Indent => "indent",
            TokenKind::Dedent => "dedent",
            TokenKind::Error => "invalid token",
            TokenKind::Eof => "end of input",
            other => return write!(f, "{:?}", other),
        };
        f.write_str(text)
    }
}

/// A token: a kind plus the byte span of its lexeme and its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the lexeme in the source.
    pub start: usize,
    /// Byte length of the lexeme.
    pub len: usize,
    /// Source line (1-indexed).
    pub line: usize,
    /// Source column (1-indexed).
    pub column: usize,
}

impl Token {
    /// The lexeme text of this token within `source`.
    pub fn lexeme<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.start..self.start + self.len).unwrap_or("")
    }
}
