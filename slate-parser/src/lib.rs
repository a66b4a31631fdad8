// slate-parser - Lexer and parser for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # slate-parser
//!
//! Lexer and parser for the Slate programming language.
//! Produces a [`Node`] tree from source code strings, and defines the
//! [`ErrorKind`] enumeration shared by every later stage.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{
    BinaryOp, FloatLiteral, ImportSpec, Node, NodeKind, ParseMode, TemplatePart, UnaryOp,
};
pub use error::{ErrorKind, ParseError, render_diagnostic, source_line};
pub use lexer::Lexer;
pub use num_bigint::BigInt;
pub use parser::{Parser, parse};
pub use token::{Token, TokenKind};
