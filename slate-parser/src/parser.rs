// slate-parser - Parser for Slate
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Recursive descent parser for Slate source code.
//!
//! Converts the token stream into a [`Node`] tree rooted at a `Program`.
//! Binary operators are parsed by precedence climbing, one function per
//! level. Errors are collected rather than returned immediately: after a
//! failed statement the parser enters panic mode, skips to the next
//! statement boundary and carries on, so one run reports every independent
//! mistake.

use log::{debug, warn};
use num_bigint::BigInt;

use crate::ast::{
    BinaryOp, FloatLiteral, ImportSpec, Node, NodeKind, ParseMode, TemplatePart, UnaryOp,
};
use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

pub type Result<T> = std::result::Result<T, ParseError>;

/// A token with the lexer's message attached when it is an `Error` token.
type Lookahead = (Token, Option<String>);

/// Parse a complete program.
pub fn parse(source: &str, mode: ParseMode) -> std::result::Result<Node, Vec<ParseError>> {
    Parser::new(source, mode).parse_program()
}

/// The parser converts tokens into [`Node`]s.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
    /// Tokens read ahead of `current`; the next token is at the end.
    pushback: Vec<Lookahead>,
    mode: ParseMode,
    errors: Vec<ParseError>,
    panic_mode: bool,
    package: Option<Vec<String>>,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given source code.
    pub fn new(source: &'a str, mode: ParseMode) -> Self {
        let start = Token {
            kind: TokenKind::Eof,
            start: 0,
            len: 0,
            line: 1,
            column: 1,
        };
        let mut parser = Parser {
            lexer: Lexer::new(source),
            current: start,
            previous: start,
            pushback: Vec::with_capacity(2),
            mode,
            errors: Vec::new(),
            panic_mode: false,
            package: None,
        };
        parser.advance();
        parser
    }

    /// The package declared by the program, if any.
    pub fn package(&self) -> Option<&[String]> {
        self.package.as_deref()
    }

    /// Parse every statement up to end of input.
    pub fn parse_program(&mut self) -> std::result::Result<Node, Vec<ParseError>> {
        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            if self.check(TokenKind::Eof) {
                break;
            }
            // Left over after an inconsistent dedent, already reported.
            if self.check(TokenKind::Dedent) {
                self.advance();
                continue;
            }
            self.statement_into(&mut stmts);
        }
        debug!(
            "parsed {} top-level statements ({} errors)",
            stmts.len(),
            self.errors.len()
        );
        if self.errors.is_empty() {
            Ok(Node::new(NodeKind::Program(stmts), 1, 1))
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    // ========================================================================
    // Token handling
    // ========================================================================

    fn source(&self) -> &'a str {
        self.lexer.source()
    }

    fn lexeme(&self, token: Token) -> &'a str {
        token.lexeme(self.source())
    }

    fn fetch(&mut self) -> Lookahead {
        let token = self.lexer.next_token();
        let message = if token.kind == TokenKind::Error {
            self.lexer.take_error()
        } else {
            None
        };
        (token, message)
    }

    fn advance(&mut self) -> Token {
        self.previous = self.current;
        let (token, message) = match self.pushback.pop() {
            Some(next) => next,
            None => self.fetch(),
        };
        self.current = token;
        if token.kind == TokenKind::Error {
            let message = message.unwrap_or_else(|| "invalid token".to_string());
            self.report(ParseError::lexical(message, token.line, token.column));
        }
        self.previous
    }

    /// The kind of the token after `current`.
    fn peek_next(&mut self) -> TokenKind {
        if self.pushback.is_empty() {
            let next = self.fetch();
            self.pushback.push(next);
        }
        self.pushback
            .last()
            .map(|(token, _)| token.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(message))
        }
    }

    fn expect_identifier(&mut self, message: &str) -> Result<String> {
        let token = self.expect(TokenKind::Identifier, message)?;
        Ok(self.lexeme(token).to_string())
    }

    /// A property name: an identifier or any keyword spelled as one
    /// (`range.end()`, `range.step()`).
    fn expect_property_name(&mut self) -> Result<String> {
        let text = self.lexeme(self.current);
        let is_name = self.check(TokenKind::Identifier) || TokenKind::keyword(text).is_some();
        if is_name {
            self.advance();
            Ok(text.to_string())
        } else {
            Err(self.error_at_current("expected property name after '.'"))
        }
    }

    fn error_at_current(&self, message: &str) -> ParseError {
        let token = self.current;
        if token.kind == TokenKind::Error {
            return ParseError::lexical(message, token.line, token.column);
        }
        ParseError::syntax(message, token.line, token.column)
    }

    /// Record an error unless the parser is already panicking.
    fn report(&mut self, error: ParseError) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.errors.push(error);
    }

    /// Record an error found after a construct parsed successfully; parsing
    /// continues without entering panic mode.
    fn record(&mut self, error: ParseError) {
        if !self.panic_mode {
            self.errors.push(error);
        }
    }

    /// Skip to the next statement boundary and leave panic mode.
    fn synchronize(&mut self) {
        loop {
            match self.current.kind {
                TokenKind::Eof | TokenKind::Dedent => break,
                TokenKind::Newline | TokenKind::Semicolon => {
                    self.advance();
                    if self.check(TokenKind::Indent) {
                        self.skip_indented_block();
                    }
                    break;
                }
                TokenKind::Indent => self.skip_indented_block(),
                kind if kind.starts_statement() => break,
                _ => {
                    self.advance();
                }
            }
        }
        self.panic_mode = false;
    }

    fn skip_indented_block(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.current.kind {
                TokenKind::Indent => depth += 1,
                TokenKind::Dedent => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                TokenKind::Eof => return,
                _ => {}
            }
            self.advance();
        }
    }

    fn skip_separators(&mut self) {
        while self.check(TokenKind::Newline) || self.check(TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// `NEWLINE INDENT` introduces an indented block.
    fn at_block_start(&mut self) -> bool {
        self.check(TokenKind::Newline) && self.peek_next() == TokenKind::Indent
    }

    fn at_terminator(&self) -> bool {
        matches!(
            self.current.kind,
            TokenKind::Newline
                | TokenKind::Semicolon
                | TokenKind::Eof
                | TokenKind::Dedent
                | TokenKind::Else
                | TokenKind::Elif
                | TokenKind::End
        )
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// Parse one statement into `stmts`, recovering from errors.
    fn statement_into(&mut self, stmts: &mut Vec<Node>) {
        let before = (self.current.start, self.current.kind);
        match self.parse_statement() {
            Ok(stmt) => stmts.push(stmt),
            Err(error) => {
                self.report(error);
                self.synchronize();
                let stuck = (self.current.start, self.current.kind) == before;
                if stuck && !matches!(self.current.kind, TokenKind::Eof | TokenKind::Dedent) {
                    self.advance();
                }
            }
        }
    }

    fn parse_statement(&mut self) -> Result<Node> {
        let node = match self.current.kind {
            TokenKind::Var | TokenKind::Val => self.parse_var_decl(false)?,
            TokenKind::Private => {
                self.advance();
                match self.current.kind {
                    TokenKind::Var | TokenKind::Val => self.parse_var_decl(true)?,
                    TokenKind::Def | TokenKind::Function => self.parse_def(true)?,
                    _ => return Err(self.error_at_current("expected declaration after 'private'")),
                }
            }
            TokenKind::Def | TokenKind::Function => self.parse_def(false)?,
            TokenKind::If => self.parse_if()?,
            TokenKind::While => self.parse_while()?,
            TokenKind::Do => self.parse_do_while()?,
            TokenKind::Loop => self.parse_loop()?,
            TokenKind::For => self.parse_for()?,
            TokenKind::Break | TokenKind::Continue | TokenKind::Return => {
                self.parse_jump_statement()?
            }
            TokenKind::Import => self.parse_import()?,
            TokenKind::Package => self.parse_package()?,
            TokenKind::Indent => return Err(self.error_at_current("unexpected indentation")),
            _ => self.parse_expression_statement()?,
        };
        self.end_statement()?;
        Ok(node)
    }

    /// A statement ends at `;`, a newline, end of input or the end of the
    /// enclosing block. Block forms end with their own dedent.
    fn end_statement(&mut self) -> Result<()> {
        if self.previous.kind == TokenKind::Dedent {
            return Ok(());
        }
        match self.current.kind {
            TokenKind::Semicolon => {
                self.advance();
                self.eat(TokenKind::Newline);
                Ok(())
            }
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof | TokenKind::Dedent => Ok(()),
            _ => Err(self.error_at_current("expected newline or ';' after statement")),
        }
    }

    fn parse_expression_statement(&mut self) -> Result<Node> {
        let expr = self.parse_expression()?;
        let (line, column) = (expr.line, expr.column);
        Ok(Node::new(NodeKind::ExprStmt(expr.boxed()), line, column))
    }

    /// A single statement used as an inline body (`then x`, `do x`).
    fn parse_inline_statement(&mut self) -> Result<Node> {
        match self.current.kind {
            TokenKind::Break | TokenKind::Continue | TokenKind::Return => {
                self.parse_jump_statement()
            }
            TokenKind::Var | TokenKind::Val => self.parse_var_decl(false),
            _ => self.parse_expression_statement(),
        }
    }

    /// Parse `NEWLINE INDENT statements DEDENT`.
    fn parse_block(&mut self) -> Result<Node> {
        self.expect(TokenKind::Newline, "expected newline before block")?;
        let indent = self.expect(TokenKind::Indent, "expected indented block")?;
        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            if self.check(TokenKind::Dedent) || self.check(TokenKind::Eof) {
                break;
            }
            self.statement_into(&mut stmts);
        }
        self.eat(TokenKind::Dedent);
        Ok(Node::new(NodeKind::Block(stmts), indent.line, indent.column))
    }

    /// Body of a loop: `do stmt`, an indented block, or `do` + block.
    fn parse_loop_body(&mut self, require_do: bool) -> Result<Node> {
        let has_do = self.eat(TokenKind::Do);
        if self.at_block_start() {
            return self.parse_block();
        }
        if require_do && !has_do {
            return Err(self.error_at_current("expected 'do' or an indented block"));
        }
        self.parse_inline_statement()
    }

    /// Report a block whose value is needed but which ends without one.
    fn check_produces_value(&mut self, body: &Node) {
        if body.produces_value(self.mode) {
            return;
        }
        let at = match &body.kind {
            NodeKind::Block(stmts) => stmts.last().unwrap_or(body),
            _ => body,
        };
        self.record(ParseError::syntax(
            "block used as a value must end with an expression",
            at.line,
            at.column,
        ));
    }

    fn parse_var_decl(&mut self, private: bool) -> Result<Node> {
        let keyword = self.advance();
        let mutable = keyword.kind == TokenKind::Var;
        let name = self.expect_identifier("expected variable name")?;
        let init = if self.eat(TokenKind::Equal) {
            let mut value = self.parse_expression()?;
            if let NodeKind::Lambda { name: lambda_name, .. } = &mut value.kind
                && lambda_name.is_none()
            {
                *lambda_name = Some(name.clone());
            }
            Some(value.boxed())
        } else {
            None
        };
        if !mutable && init.is_none() {
            return Err(self.error_at_current("'val' declaration requires an initializer"));
        }
        Ok(Node::new(
            NodeKind::VarDecl {
                name,
                mutable,
                private,
                init,
            },
            keyword.line,
            keyword.column,
        ))
    }

    /// `def name(params) = body` or `def name(params)` followed by a block.
    fn parse_def(&mut self, private: bool) -> Result<Node> {
        let keyword = self.advance();
        let name = self.expect_identifier("expected function name")?;
        self.expect(TokenKind::LParen, "expected '(' after function name")?;
        let params = self.parse_params()?;
        let body = if self.eat(TokenKind::Equal) {
            self.parse_lambda_body()?
        } else if self.at_block_start() {
            let block = self.parse_block()?;
            self.check_produces_value(&block);
            block
        } else {
            return Err(self.error_at_current(
                "expected '=' or an indented body after function signature",
            ));
        };
        let lambda = Node::new(
            NodeKind::Lambda {
                name: Some(name.clone()),
                params,
                body: body.boxed(),
            },
            keyword.line,
            keyword.column,
        );
        Ok(Node::new(
            NodeKind::VarDecl {
                name,
                mutable: false,
                private,
                init: Some(lambda.boxed()),
            },
            keyword.line,
            keyword.column,
        ))
    }

    /// Parameter names after `(`, through the closing `)`.
    fn parse_params(&mut self) -> Result<Vec<String>> {
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                params.push(self.expect_identifier("expected parameter name")?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "expected ')' after parameters")?;
        Ok(params)
    }

    fn parse_lambda_body(&mut self) -> Result<Node> {
        if self.at_block_start() {
            let block = self.parse_block()?;
            self.check_produces_value(&block);
            Ok(block)
        } else {
            self.parse_expression_statement()
        }
    }

    /// `if`/`elif` in either inline or block form.
    fn parse_if(&mut self) -> Result<Node> {
        let keyword = self.advance();
        let condition = self.parse_expression()?;
        let has_then = self.eat(TokenKind::Then);
        let then_branch = if self.at_block_start() {
            self.parse_block()?
        } else if has_then {
            self.parse_inline_statement()?
        } else {
            return Err(self.error_at_current("expected 'then' or an indented block after condition"));
        };
        let else_branch = self.parse_else()?;
        if self.eat(TokenKind::End) {
            self.eat(TokenKind::If);
        }
        Ok(Node::new(
            NodeKind::If {
                condition: condition.boxed(),
                then_branch: then_branch.boxed(),
                else_branch: else_branch.map(Box::new),
            },
            keyword.line,
            keyword.column,
        ))
    }

    fn parse_else(&mut self) -> Result<Option<Node>> {
        if self.check(TokenKind::Newline)
            && matches!(self.peek_next(), TokenKind::Else | TokenKind::Elif)
        {
            self.advance();
        }
        if self.check(TokenKind::Elif) {
            return self.parse_if().map(Some);
        }
        if !self.eat(TokenKind::Else) {
            return Ok(None);
        }
        let branch = if self.check(TokenKind::If) {
            self.parse_if()?
        } else if self.at_block_start() {
            self.parse_block()?
        } else {
            self.parse_inline_statement()?
        };
        Ok(Some(branch))
    }

    fn parse_while(&mut self) -> Result<Node> {
        let keyword = self.advance();
        let condition = self.parse_expression()?;
        let body = self.parse_loop_body(true)?;
        Ok(Node::new(
            NodeKind::While {
                condition: condition.boxed(),
                body: body.boxed(),
            },
            keyword.line,
            keyword.column,
        ))
    }

    fn parse_do_while(&mut self) -> Result<Node> {
        let keyword = self.advance();
        let body = if self.at_block_start() {
            self.parse_block()?
        } else {
            self.parse_inline_statement()?
        };
        if self.check(TokenKind::Newline) && self.peek_next() == TokenKind::While {
            self.advance();
        }
        self.expect(TokenKind::While, "expected 'while' after do body")?;
        let condition = self.parse_expression()?;
        Ok(Node::new(
            NodeKind::DoWhile {
                body: body.boxed(),
                condition: condition.boxed(),
            },
            keyword.line,
            keyword.column,
        ))
    }

    fn parse_loop(&mut self) -> Result<Node> {
        let keyword = self.advance();
        let body = self.parse_loop_body(false)?;
        Ok(Node::new(
            NodeKind::Loop { body: body.boxed() },
            keyword.line,
            keyword.column,
        ))
    }

    /// `for [init]; [cond]; [step] [do] body`
    fn parse_for(&mut self) -> Result<Node> {
        let keyword = self.advance();
        let init = match self.current.kind {
            TokenKind::Semicolon => None,
            TokenKind::Var | TokenKind::Val => Some(self.parse_var_decl(false)?),
            _ => Some(self.parse_expression_statement()?),
        };
        self.expect(TokenKind::Semicolon, "expected ';' after for initializer")?;
        let condition = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon, "expected ';' after for condition")?;
        let step = if self.check(TokenKind::Do) || self.at_block_start() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let body = self.parse_loop_body(true)?;
        Ok(Node::new(
            NodeKind::For {
                init: init.map(Box::new),
                condition: condition.map(Box::new),
                step: step.map(Box::new),
                body: body.boxed(),
            },
            keyword.line,
            keyword.column,
        ))
    }

    fn parse_jump_statement(&mut self) -> Result<Node> {
        let keyword = self.advance();
        let kind = match keyword.kind {
            TokenKind::Break => NodeKind::Break,
            TokenKind::Continue => NodeKind::Continue,
            _ => {
                let value = if self.at_terminator() {
                    None
                } else {
                    Some(self.parse_expression()?.boxed())
                };
                NodeKind::Return(value)
            }
        };
        Ok(Node::new(kind, keyword.line, keyword.column))
    }

    /// `import a.b.c`, `import a.b.c._`, `import a.b.c.{x, y => z}`
    fn parse_import(&mut self) -> Result<Node> {
        let keyword = self.advance();
        let mut path = vec![self.expect_identifier("expected module name after 'import'")?];
        let mut spec = ImportSpec::Namespace;
        while self.eat(TokenKind::Dot) {
            if self.eat(TokenKind::LBrace) {
                let mut names = Vec::new();
                loop {
                    let name = self.expect_identifier("expected name in import list")?;
                    let alias = if self.eat(TokenKind::FatArrow) {
                        Some(self.expect_identifier("expected alias after '=>'")?)
                    } else {
                        None
                    };
                    names.push((name, alias));
                    if !self.eat(TokenKind::Comma) || self.check(TokenKind::RBrace) {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace, "expected '}' after import list")?;
                spec = ImportSpec::Selective(names);
                break;
            }
            let segment = self.expect_identifier("expected module name after '.'")?;
            if segment == "_" {
                spec = ImportSpec::Wildcard;
                break;
            }
            path.push(segment);
        }
        Ok(Node::new(
            NodeKind::Import { path, spec },
            keyword.line,
            keyword.column,
        ))
    }

    fn parse_package(&mut self) -> Result<Node> {
        let keyword = self.advance();
        let mut path = vec![self.expect_identifier("expected package name")?];
        while self.eat(TokenKind::Dot) {
            path.push(self.expect_identifier("expected package name after '.'")?);
        }
        self.package = Some(path.clone());
        Ok(Node::new(
            NodeKind::Package(path),
            keyword.line,
            keyword.column,
        ))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn parse_expression(&mut self) -> Result<Node> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Node> {
        let target = self.parse_ternary()?;
        if !self.current.kind.is_assignment() {
            return Ok(target);
        }
        let op_token = self.advance();
        if !target.is_lvalue() {
            return Err(ParseError::syntax(
                "invalid assignment target",
                op_token.line,
                op_token.column,
            ));
        }
        let value = self.parse_assignment()?;
        let (line, column) = (target.line, target.column);
        let kind = match compound_op(op_token.kind) {
            None => NodeKind::Assign {
                target: target.boxed(),
                value: value.boxed(),
            },
            Some(op) => NodeKind::CompoundAssign {
                op,
                target: target.boxed(),
                value: value.boxed(),
            },
        };
        Ok(Node::new(kind, line, column))
    }

    fn parse_ternary(&mut self) -> Result<Node> {
        let condition = self.parse_coalesce()?;
        if !self.eat(TokenKind::Question) {
            return Ok(condition);
        }
        let then_branch = self.parse_ternary()?;
        self.expect(TokenKind::Colon, "expected ':' in conditional expression")?;
        let else_branch = self.parse_ternary()?;
        let (line, column) = (condition.line, condition.column);
        Ok(Node::new(
            NodeKind::Ternary {
                condition: condition.boxed(),
                then_branch: then_branch.boxed(),
                else_branch: else_branch.boxed(),
            },
            line,
            column,
        ))
    }

    /// One left-associative precedence level.
    fn binary_level(
        &mut self,
        operand: fn(&mut Self) -> Result<Node>,
        ops: &[(TokenKind, BinaryOp)],
    ) -> Result<Node> {
        let mut left = operand(self)?;
        'outer: loop {
            for (kind, op) in ops {
                if self.check(*kind) {
                    self.advance();
                    let right = operand(self)?;
                    let (line, column) = (left.line, left.column);
                    left = Node::new(
                        NodeKind::Binary {
                            op: *op,
                            left: left.boxed(),
                            right: right.boxed(),
                        },
                        line,
                        column,
                    );
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn parse_coalesce(&mut self) -> Result<Node> {
        self.binary_level(
            Self::parse_or,
            &[(TokenKind::QuestionQuestion, BinaryOp::NullCoalesce)],
        )
    }

    fn parse_or(&mut self) -> Result<Node> {
        self.binary_level(
            Self::parse_and,
            &[
                (TokenKind::PipePipe, BinaryOp::Or),
                (TokenKind::Or, BinaryOp::Or),
            ],
        )
    }

    fn parse_and(&mut self) -> Result<Node> {
        self.binary_level(
            Self::parse_bit_or,
            &[
                (TokenKind::AmpAmp, BinaryOp::And),
                (TokenKind::And, BinaryOp::And),
            ],
        )
    }

    fn parse_bit_or(&mut self) -> Result<Node> {
        self.binary_level(Self::parse_bit_xor, &[(TokenKind::Pipe, BinaryOp::BitOr)])
    }

    fn parse_bit_xor(&mut self) -> Result<Node> {
        self.binary_level(Self::parse_bit_and, &[(TokenKind::Caret, BinaryOp::BitXor)])
    }

    fn parse_bit_and(&mut self) -> Result<Node> {
        self.binary_level(Self::parse_equality, &[(TokenKind::Amp, BinaryOp::BitAnd)])
    }

    fn parse_equality(&mut self) -> Result<Node> {
        self.binary_level(
            Self::parse_relational,
            &[
                (TokenKind::EqualEqual, BinaryOp::Equal),
                (TokenKind::BangEqual, BinaryOp::NotEqual),
            ],
        )
    }

    fn parse_relational(&mut self) -> Result<Node> {
        self.binary_level(
            Self::parse_range,
            &[
                (TokenKind::Less, BinaryOp::Less),
                (TokenKind::LessEqual, BinaryOp::LessEqual),
                (TokenKind::Greater, BinaryOp::Greater),
                (TokenKind::GreaterEqual, BinaryOp::GreaterEqual),
                (TokenKind::In, BinaryOp::In),
                (TokenKind::Instanceof, BinaryOp::InstanceOf),
            ],
        )
    }

    fn parse_range(&mut self) -> Result<Node> {
        let start = self.parse_shift()?;
        let exclusive = match self.current.kind {
            TokenKind::DotDot => false,
            TokenKind::DotDotLess => true,
            _ => return Ok(start),
        };
        self.advance();
        let end = self.parse_shift()?;
        let step = if self.eat(TokenKind::Step) {
            Some(self.parse_shift()?.boxed())
        } else {
            None
        };
        let (line, column) = (start.line, start.column);
        Ok(Node::new(
            NodeKind::Range {
                start: start.boxed(),
                end: end.boxed(),
                exclusive,
                step,
            },
            line,
            column,
        ))
    }

    fn parse_shift(&mut self) -> Result<Node> {
        self.binary_level(
            Self::parse_additive,
            &[
                (TokenKind::LessLess, BinaryOp::ShiftLeft),
                (TokenKind::GreaterGreater, BinaryOp::ShiftRight),
                (TokenKind::GreaterGreaterGreater, BinaryOp::ShiftRightUnsigned),
            ],
        )
    }

    fn parse_additive(&mut self) -> Result<Node> {
        self.binary_level(
            Self::parse_multiplicative,
            &[
                (TokenKind::Plus, BinaryOp::Add),
                (TokenKind::Minus, BinaryOp::Subtract),
            ],
        )
    }

    fn parse_multiplicative(&mut self) -> Result<Node> {
        self.binary_level(
            Self::parse_power,
            &[
                (TokenKind::Star, BinaryOp::Multiply),
                (TokenKind::Slash, BinaryOp::Divide),
                (TokenKind::SlashSlash, BinaryOp::FloorDiv),
                (TokenKind::Percent, BinaryOp::Modulo),
                (TokenKind::Mod, BinaryOp::Modulo),
            ],
        )
    }

    /// `**` is right-associative.
    fn parse_power(&mut self) -> Result<Node> {
        let base = self.parse_unary()?;
        if !self.eat(TokenKind::StarStar) {
            return Ok(base);
        }
        let exponent = self.parse_power()?;
        let (line, column) = (base.line, base.column);
        Ok(Node::new(
            NodeKind::Binary {
                op: BinaryOp::Power,
                left: base.boxed(),
                right: exponent.boxed(),
            },
            line,
            column,
        ))
    }

    fn parse_unary(&mut self) -> Result<Node> {
        let token = self.current;
        let op = match token.kind {
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Bang | TokenKind::Not => UnaryOp::Not,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                self.advance();
                let target = self.parse_unary()?;
                if !target.is_lvalue() {
                    return Err(ParseError::syntax(
                        "invalid increment target",
                        token.line,
                        token.column,
                    ));
                }
                let delta = if token.kind == TokenKind::PlusPlus { 1 } else { -1 };
                return Ok(Node::new(
                    NodeKind::Increment {
                        target: target.boxed(),
                        delta,
                        prefix: true,
                    },
                    token.line,
                    token.column,
                ));
            }
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        if op == UnaryOp::Negate
            && let Some(folded) = negate_literal(&operand)
        {
            return Ok(Node::new(folded, token.line, token.column));
        }
        Ok(Node::new(
            NodeKind::Unary {
                op,
                operand: operand.boxed(),
            },
            token.line,
            token.column,
        ))
    }

    fn parse_postfix(&mut self) -> Result<Node> {
        let mut expr = self.parse_primary()?;
        loop {
            let (line, column) = (expr.line, expr.column);
            match self.current.kind {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_arguments()?;
                    expr = Node::new(
                        NodeKind::Call {
                            callee: expr.boxed(),
                            args,
                        },
                        line,
                        column,
                    );
                }
                TokenKind::Dot | TokenKind::QuestionDot => {
                    let optional = self.advance().kind == TokenKind::QuestionDot;
                    let name = self.expect_property_name()?;
                    expr = Node::new(
                        NodeKind::Member {
                            object: expr.boxed(),
                            name,
                            optional,
                        },
                        line,
                        column,
                    );
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let op = self.advance();
                    if !expr.is_lvalue() {
                        return Err(ParseError::syntax(
                            "invalid increment target",
                            op.line,
                            op.column,
                        ));
                    }
                    let delta = if op.kind == TokenKind::PlusPlus { 1 } else { -1 };
                    return Ok(Node::new(
                        NodeKind::Increment {
                            target: expr.boxed(),
                            delta,
                            prefix: false,
                        },
                        line,
                        column,
                    ));
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Call arguments after `(`, through the closing `)`.
    fn parse_arguments(&mut self) -> Result<Vec<Node>> {
        let mut args = Vec::new();
        while !self.check(TokenKind::RParen) {
            args.push(self.parse_expression()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "expected ')' after arguments")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Node> {
        let token = self.current;
        let (line, column) = (token.line, token.column);
        let kind = match token.kind {
            TokenKind::Integer => {
                self.advance();
                self.integer_literal(token)?
            }
            TokenKind::Number | TokenKind::Float32 | TokenKind::Float64 => {
                self.advance();
                self.float_literal(token)?
            }
            TokenKind::String => {
                self.advance();
                let raw = self.lexeme(token);
                NodeKind::String(unescape(&raw[1..raw.len() - 1]))
            }
            TokenKind::TemplateStart => return self.parse_template(),
            TokenKind::True | TokenKind::False => {
                self.advance();
                NodeKind::Boolean(token.kind == TokenKind::True)
            }
            TokenKind::Null => {
                self.advance();
                NodeKind::Null
            }
            TokenKind::Undefined => {
                self.advance();
                NodeKind::Undefined
            }
            TokenKind::NaN | TokenKind::Infinity => {
                self.advance();
                let value = if token.kind == TokenKind::NaN {
                    f64::NAN
                } else {
                    f64::INFINITY
                };
                NodeKind::Number {
                    value,
                    precision: FloatLiteral::Double,
                }
            }
            TokenKind::Identifier => {
                if self.peek_next() == TokenKind::Arrow {
                    return self.parse_single_param_lambda();
                }
                self.advance();
                NodeKind::Identifier(self.lexeme(token).to_string())
            }
            TokenKind::LParen => return self.parse_paren(),
            TokenKind::LBracket => return self.parse_array(),
            TokenKind::LBrace => return self.parse_object(),
            TokenKind::If => {
                let node = self.parse_if()?;
                if let NodeKind::If {
                    then_branch,
                    else_branch,
                    ..
                } = &node.kind
                {
                    self.check_produces_value(then_branch);
                    if let Some(else_branch) = else_branch {
                        self.check_produces_value(else_branch);
                    }
                }
                return Ok(node);
            }
            TokenKind::Match | TokenKind::Case => {
                let message = format!("'{}' is a reserved word", self.lexeme(token));
                return Err(self.error_at_current(&message));
            }
            TokenKind::Error => return Err(self.error_at_current("invalid token")),
            _ => return Err(self.error_at_current("expected expression")),
        };
        Ok(Node::new(kind, line, column))
    }

    fn integer_literal(&self, token: Token) -> Result<NodeKind> {
        let text = self.lexeme(token);
        if let Ok(n) = text.parse::<i32>() {
            return Ok(NodeKind::Integer(n));
        }
        let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(hex) => BigInt::parse_bytes(hex.as_bytes(), 16),
            None => BigInt::parse_bytes(text.as_bytes(), 10),
        };
        let big = parsed.ok_or_else(|| {
            ParseError::lexical(
                format!("invalid integer literal '{}'", text),
                token.line,
                token.column,
            )
        })?;
        Ok(match i32::try_from(&big) {
            Ok(n) => NodeKind::Integer(n),
            Err(_) => NodeKind::BigInt(big),
        })
    }

    fn float_literal(&self, token: Token) -> Result<NodeKind> {
        let text = self.lexeme(token);
        let (digits, precision) = match token.kind {
            TokenKind::Float32 => (&text[..text.len() - 1], FloatLiteral::Single),
            TokenKind::Float64 => (&text[..text.len() - 1], FloatLiteral::Double),
            _ => (text, FloatLiteral::Default),
        };
        let value = digits.parse::<f64>().map_err(|_| {
            ParseError::lexical(
                format!("invalid number literal '{}'", text),
                token.line,
                token.column,
            )
        })?;
        Ok(NodeKind::Number { value, precision })
    }

    fn parse_single_param_lambda(&mut self) -> Result<Node> {
        let param = self.advance();
        self.expect(TokenKind::Arrow, "expected '->'")?;
        let body = self.parse_lambda_body()?;
        Ok(Node::new(
            NodeKind::Lambda {
                name: None,
                params: vec![self.lexeme(param).to_string()],
                body: body.boxed(),
            },
            param.line,
            param.column,
        ))
    }

    /// A parenthesised expression or a parameter list followed by `->`.
    fn parse_paren(&mut self) -> Result<Node> {
        let open = self.advance();
        let lambda = |params, body: Node| {
            Node::new(
                NodeKind::Lambda {
                    name: None,
                    params,
                    body: body.boxed(),
                },
                open.line,
                open.column,
            )
        };

        if self.eat(TokenKind::RParen) {
            self.expect(TokenKind::Arrow, "expected '->' after '()'")?;
            let body = self.parse_lambda_body()?;
            return Ok(lambda(Vec::new(), body));
        }

        let mut items = vec![self.parse_expression()?];
        while self.eat(TokenKind::Comma) {
            items.push(self.parse_expression()?);
        }
        self.expect(TokenKind::RParen, "expected ')'")?;

        if self.check(TokenKind::Arrow) {
            let mut params = Vec::with_capacity(items.len());
            for item in items {
                match item.kind {
                    NodeKind::Identifier(name) => params.push(name),
                    _ => {
                        return Err(ParseError::syntax(
                            "lambda parameters must be identifiers",
                            item.line,
                            item.column,
                        ));
                    }
                }
            }
            self.advance();
            let body = self.parse_lambda_body()?;
            return Ok(lambda(params, body));
        }

        match items.pop() {
            Some(inner) if items.is_empty() => Ok(inner),
            _ => Err(self.error_at_current("expected '->' after parameter list")),
        }
    }

    fn parse_array(&mut self) -> Result<Node> {
        let open = self.advance();
        let mut items = Vec::new();
        while !self.check(TokenKind::RBracket) {
            items.push(self.parse_expression()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBracket, "expected ']' after array elements")?;
        Ok(Node::new(NodeKind::Array(items), open.line, open.column))
    }

    fn parse_object(&mut self) -> Result<Node> {
        let open = self.advance();
        let mut entries = Vec::new();
        while !self.check(TokenKind::RBrace) {
            let key_token = self.current;
            let key = match key_token.kind {
                TokenKind::Identifier | TokenKind::Integer => self.lexeme(key_token).to_string(),
                TokenKind::String => {
                    let raw = self.lexeme(key_token);
                    unescape(&raw[1..raw.len() - 1])
                }
                kind if TokenKind::keyword(self.lexeme(key_token)) == Some(kind) => {
                    self.lexeme(key_token).to_string()
                }
                _ => return Err(self.error_at_current("expected object key")),
            };
            self.advance();
            self.expect(TokenKind::Colon, "expected ':' after object key")?;
            let value = self.parse_expression()?;
            entries.push((key, value));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "expected '}' after object entries")?;
        Ok(Node::new(NodeKind::Object(entries), open.line, open.column))
    }

    fn parse_template(&mut self) -> Result<Node> {
        let open = self.advance();
        let mut parts = Vec::new();
        loop {
            let token = self.current;
            match token.kind {
                TokenKind::TemplateText => {
                    self.advance();
                    parts.push(TemplatePart::Text(unescape(self.lexeme(token))));
                }
                TokenKind::TemplateSimpleVar => {
                    self.advance();
                    let name = self.lexeme(token)[1..].to_string();
                    parts.push(TemplatePart::Expr(Node::new(
                        NodeKind::Identifier(name),
                        token.line,
                        token.column + 1,
                    )));
                }
                TokenKind::TemplateExprStart => {
                    self.advance();
                    let expr = self.parse_expression()?;
                    self.expect(
                        TokenKind::TemplateExprEnd,
                        "expected '}' to close template interpolation",
                    )?;
                    parts.push(TemplatePart::Expr(expr));
                }
                TokenKind::TemplateEnd => {
                    self.advance();
                    break;
                }
                _ => return Err(self.error_at_current("unterminated template literal")),
            }
        }
        Ok(Node::new(NodeKind::Template(parts), open.line, open.column))
    }
}

/// The arithmetic operator behind a compound assignment token.
fn compound_op(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::PlusEqual => BinaryOp::Add,
        TokenKind::MinusEqual => BinaryOp::Subtract,
        TokenKind::StarEqual => BinaryOp::Multiply,
        TokenKind::SlashEqual => BinaryOp::Divide,
        TokenKind::PercentEqual => BinaryOp::Modulo,
        TokenKind::StarStarEqual => BinaryOp::Power,
        TokenKind::SlashSlashEqual => BinaryOp::FloorDiv,
        TokenKind::AmpEqual => BinaryOp::BitAnd,
        TokenKind::PipeEqual => BinaryOp::BitOr,
        TokenKind::CaretEqual => BinaryOp::BitXor,
        TokenKind::LessLessEqual => BinaryOp::ShiftLeft,
        TokenKind::GreaterGreaterEqual => BinaryOp::ShiftRight,
        TokenKind::GreaterGreaterGreaterEqual => BinaryOp::ShiftRightUnsigned,
        TokenKind::AmpAmpEqual => BinaryOp::And,
        TokenKind::PipePipeEqual => BinaryOp::Or,
        TokenKind::QuestionQuestionEqual => BinaryOp::NullCoalesce,
        _ => return None,
    })
}

/// Fold `-literal` so that `-2147483648` stays an Int32.
fn negate_literal(operand: &Node) -> Option<NodeKind> {
    match &operand.kind {
        NodeKind::Integer(n) => n.checked_neg().map(NodeKind::Integer),
        NodeKind::BigInt(b) => {
            let negated = -b;
            Some(match i32::try_from(&negated) {
                Ok(n) => NodeKind::Integer(n),
                Err(_) => NodeKind::BigInt(negated),
            })
        }
        NodeKind::Number { value, precision } => Some(NodeKind::Number {
            value: -value,
            precision: *precision,
        }),
        _ => None,
    }
}

/// Process escape sequences in string and template text. Unknown escapes
/// are kept verbatim.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(c @ ('\\' | '"' | '\'' | '`' | '$')) => out.push(c),
            Some(other) => {
                warn!("unknown escape sequence '\\{}'", other);
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
