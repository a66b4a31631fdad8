// slate-parser - Abstract syntax tree for Slate
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The Slate AST: a single [`Node`] type carrying a [`NodeKind`] and the
//! source position it was parsed from.
//!
//! `Display` renders a node as an S-expression. Positions are not part of
//! the rendering, so two parses of differently spaced source compare equal
//! by their rendered shape.

use std::fmt;

use num_bigint::BigInt;

/// Parser strictness for blocks used as values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Scripts: a value-producing block must end in an expression.
    #[default]
    Strict,
    /// REPL: a terminal `var`/`val` with an initializer also produces a value.
    Lenient,
}

/// Precision requested by a float literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatLiteral {
    /// No suffix: use the configured precision.
    Default,
    /// `f` suffix.
    Single,
    /// `d` suffix.
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorDiv,
    Modulo,
    Power,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    NullCoalesce,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    ShiftRightUnsigned,
    In,
    InstanceOf,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "**",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::NullCoalesce => "??",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::ShiftRightUnsigned => ">>>",
            BinaryOp::In => "in",
            BinaryOp::InstanceOf => "instanceof",
        }
    }

    /// Logical operators evaluate their right operand conditionally.
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::NullCoalesce)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

/// A piece of a template literal.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Expr(Node),
}

/// The binding shape of an `import`.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpec {
    /// `import a.b.c` binds `c` to the module's export object.
    Namespace,
    /// `import a.b.c._` copies every export.
    Wildcard,
    /// `import a.b.c.{x, y => z}` copies the listed exports.
    Selective(Vec<(String, Option<String>)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // Literals
    Integer(i32),
    BigInt(BigInt),
    Number { value: f64, precision: FloatLiteral },
    String(String),
    Boolean(bool),
    Null,
    Undefined,
    Identifier(String),
    Array(Vec<Node>),
    Object(Vec<(String, Node)>),
    Range {
        start: Box<Node>,
        end: Box<Node>,
        exclusive: bool,
        step: Option<Box<Node>>,
    },
    Template(Vec<TemplatePart>),

    // Expressions
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    /// `++x`, `x--` and friends; `delta` is +1 or -1.
    Increment {
        target: Box<Node>,
        delta: i8,
        prefix: bool,
    },
    Ternary {
        condition: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Box<Node>,
    },
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    Member {
        object: Box<Node>,
        name: String,
        optional: bool,
    },
    Assign {
        target: Box<Node>,
        value: Box<Node>,
    },
    CompoundAssign {
        op: BinaryOp,
        target: Box<Node>,
        value: Box<Node>,
    },
    Lambda {
        name: Option<String>,
        params: Vec<String>,
        body: Box<Node>,
    },

    // Statements
    VarDecl {
        name: String,
        mutable: bool,
        private: bool,
        init: Option<Box<Node>>,
    },
    If {
        condition: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Option<Box<Node>>,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
    },
    DoWhile {
        body: Box<Node>,
        condition: Box<Node>,
    },
    For {
        init: Option<Box<Node>>,
        condition: Option<Box<Node>>,
        step: Option<Box<Node>>,
        body: Box<Node>,
    },
    Loop {
        body: Box<Node>,
    },
    Break,
    Continue,
    Return(Option<Box<Node>>),
    ExprStmt(Box<Node>),
    Block(Vec<Node>),
    Import {
        path: Vec<String>,
        spec: ImportSpec,
    },
    Package(Vec<String>),
    Program(Vec<Node>),
}

/// An AST node with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub line: usize,
    pub column: usize,
}

impl Node {
    pub fn new(kind: NodeKind, line: usize, column: usize) -> Self {
        Node { kind, line, column }
    }

    /// Wrap a child in a `Box`, keeping this node's position.
    pub fn boxed(self) -> Box<Node> {
        Box::new(self)
    }

    /// Whether this node can be the target of an assignment or increment:
    /// an identifier, a non-optional member access, or call-form indexing
    /// with exactly one argument.
    pub fn is_lvalue(&self) -> bool {
        match &self.kind {
            NodeKind::Identifier(_) => true,
            NodeKind::Member { optional, .. } => !optional,
            NodeKind::Call { args, .. } => args.len() == 1,
            _ => false,
        }
    }

    /// Whether this statement (or block) leaves a value when used as the
    /// producing form of a block expression.
    ///
    /// Blocks defer to their last statement and `if` checks both arms.
    /// Control transfers never fall through, so they count as producing.
    pub fn produces_value(&self, mode: ParseMode) -> bool {
        match &self.kind {
            NodeKind::Block(stmts) => stmts.last().is_some_and(|s| s.produces_value(mode)),
            NodeKind::ExprStmt(_) | NodeKind::Return(_) | NodeKind::Break | NodeKind::Continue => {
                true
            }
            NodeKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                then_branch.produces_value(mode)
                    && else_branch.as_ref().is_none_or(|e| e.produces_value(mode))
            }
            NodeKind::VarDecl { init, .. } => mode == ParseMode::Lenient && init.is_some(),
            _ => false,
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Node]) -> fmt::Result {
    for item in items {
        write!(f, " {}", item)?;
    }
    Ok(())
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Integer(n) => write!(f, "{}", n),
            NodeKind::BigInt(n) => write!(f, "{}n", n),
            NodeKind::Number { value, precision } => match precision {
                FloatLiteral::Default => write!(f, "{:?}", value),
                FloatLiteral::Single => write!(f, "{:?}f", value),
                FloatLiteral::Double => write!(f, "{:?}d", value),
            },
            NodeKind::String(s) => write!(f, "{:?}", s),
            NodeKind::Boolean(b) => write!(f, "{}", b),
            NodeKind::Null => f.write_str("null"),
            NodeKind::Undefined => f.write_str("undefined"),
            NodeKind::Identifier(name) => f.write_str(name),
            NodeKind::Array(items) => {
                f.write_str("(array")?;
                write_list(f, items)?;
                f.write_str(")")
            }
            NodeKind::Object(entries) => {
                f.write_str("(object")?;
                for (key, value) in entries {
                    write!(f, " ({:?} {})", key, value)?;
                }
                f.write_str(")")
            }
            NodeKind::Range {
                start,
                end,
                exclusive,
                step,
            } => {
                let op = if *exclusive { "..<" } else { ".." };
                write!(f, "({} {} {}", op, start, end)?;
                if let Some(step) = step {
                    write!(f, " step {}", step)?;
                }
                f.write_str(")")
            }
            NodeKind::Template(parts) => {
                f.write_str("(template")?;
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => write!(f, " {:?}", text)?,
                        TemplatePart::Expr(node) => write!(f, " {}", node)?,
                    }
                }
                f.write_str(")")
            }
            NodeKind::Binary { op, left, right } => {
                write!(f, "({} {} {})", op.symbol(), left, right)
            }
            NodeKind::Unary { op, operand } => write!(f, "({} {})", op.symbol(), operand),
            NodeKind::Increment {
                target,
                delta,
                prefix,
            } => {
                let op = if *delta > 0 { "++" } else { "--" };
                if *prefix {
                    write!(f, "(pre{} {})", op, target)
                } else {
                    write!(f, "(post{} {})", op, target)
                }
            }
            NodeKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => write!(f, "(? {} {} {})", condition, then_branch, else_branch),
            NodeKind::Call { callee, args } => {
                write!(f, "(call {}", callee)?;
                write_list(f, args)?;
                f.write_str(")")
            }
            NodeKind::Member {
                object,
                name,
                optional,
            } => {
                let op = if *optional { "?." } else { "." };
                write!(f, "({} {} {})", op, object, name)
            }
            NodeKind::Assign { target, value } => write!(f, "(= {} {})", target, value),
            NodeKind::CompoundAssign { op, target, value } => {
                write!(f, "({}= {} {})", op.symbol(), target, value)
            }
            NodeKind::Lambda { name, params, body } => {
                f.write_str("(lambda")?;
                if let Some(name) = name {
                    write!(f, " {}", name)?;
                }
                write!(f, " ({}) {})", params.join(" "), body)
            }
            NodeKind::VarDecl {
                name,
                mutable,
                private,
                init,
            } => {
                f.write_str("(")?;
                if *private {
                    f.write_str("private ")?;
                }
                f.write_str(if *mutable { "var " } else { "val " })?;
                f.write_str(name)?;
                if let Some(init) = init {
                    write!(f, " {}", init)?;
                }
                f.write_str(")")
            }
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                write!(f, "(if {} {}", condition, then_branch)?;
                if let Some(else_branch) = else_branch {
                    write!(f, " {}", else_branch)?;
                }
                f.write_str(")")
            }
            NodeKind::While { condition, body } => write!(f, "(while {} {})", condition, body),
            NodeKind::DoWhile { body, condition } => {
                write!(f, "(do {} while {})", body, condition)
            }
            NodeKind::For {
                init,
                condition,
                step,
                body,
            } => {
                f.write_str("(for")?;
                for part in [init, condition, step] {
                    match part {
                        Some(node) => write!(f, " {}", node)?,
                        None => f.write_str(" _")?,
                    }
                }
                write!(f, " {})", body)
            }
            NodeKind::Loop { body } => write!(f, "(loop {})", body),
            NodeKind::Break => f.write_str("(break)"),
            NodeKind::Continue => f.write_str("(continue)"),
            NodeKind::Return(value) => match value {
                Some(value) => write!(f, "(return {})", value),
                None => f.write_str("(return)"),
            },
            NodeKind::ExprStmt(expr) => write!(f, "{}", expr),
            NodeKind::Block(stmts) => {
                f.write_str("(block")?;
                write_list(f, stmts)?;
                f.write_str(")")
            }
            NodeKind::Import { path, spec } => {
                write!(f, "(import {}", path.join("."))?;
                match spec {
                    ImportSpec::Namespace => {}
                    ImportSpec::Wildcard => f.write_str(" _")?,
                    ImportSpec::Selective(names) => {
                        for (name, alias) in names {
                            match alias {
                                Some(alias) => write!(f, " ({} {})", name, alias)?,
                                None => write!(f, " {}", name)?,
                            }
                        }
                    }
                }
                f.write_str(")")
            }
            NodeKind::Package(path) => write!(f, "(package {})", path.join(".")),
            NodeKind::Program(stmts) => {
                f.write_str("(program")?;
                write_list(f, stmts)?;
                f.write_str(")")
            }
        }
    }
}
