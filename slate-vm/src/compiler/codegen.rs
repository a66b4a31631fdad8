// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Single-pass code generation from the Slate AST.
//!
//! The generator tracks how many values the current frame holds at every
//! point of the emitted code. A local's slot is the depth at which its
//! initializer was pushed, so declaring a local costs no instruction, and
//! break/continue know how far to unwind.

use std::rc::Rc;

use log::{debug, trace};
use slate_parser::{
    BinaryOp, FloatLiteral, ImportSpec, Node, NodeKind, TemplatePart, UnaryOp, source_line,
};

use crate::chunk::{Function, FunctionTable};
use crate::opcode::{
    GLOBAL_IMMUTABLE, GLOBAL_PRIVATE, IMPORT_NAMESPACE, IMPORT_WILDCARD, OpCode, RANGE_EXCLUSIVE,
    RANGE_HAS_STEP,
};
use crate::value::Value;

use super::types::{CompileError, CompileOptions, FunctionState, LoopContext, Result};

/// Bytecode compiler for one program.
///
/// Functions compiled along the way are appended to the VM's function
/// table; `CLOSURE` operands index into it.
pub struct Compiler<'a> {
    pub(super) functions: &'a mut FunctionTable,
    pub(super) source: Rc<str>,
    pub(super) options: CompileOptions,
    pub(super) current: FunctionState,
    pub(super) enclosing: Vec<FunctionState>,
    errors: Vec<CompileError>,
    pub(super) line: usize,
    pub(super) column: usize,
}

impl<'a> Compiler<'a> {
    pub fn new(source: Rc<str>, functions: &'a mut FunctionTable, options: CompileOptions) -> Self {
        Compiler {
            functions,
            current: FunctionState::script(Rc::clone(&source)),
            source,
            options,
            enclosing: Vec::new(),
            errors: Vec::new(),
            line: 0,
            column: 0,
        }
    }

    /// Compile a whole program into its script function.
    ///
    /// A failing statement is recorded and compilation continues with the
    /// next one, so every error of the program is reported at once.
    pub fn compile_program(
        mut self,
        program: &Node,
    ) -> std::result::Result<Rc<Function>, Vec<CompileError>> {
        let stmts = match &program.kind {
            NodeKind::Program(stmts) => stmts.as_slice(),
            _ => std::slice::from_ref(program),
        };
        for stmt in stmts {
            let checkpoint = self.current.checkpoint();
            if let Err(err) = self.statement(stmt) {
                self.errors.push(err);
                if !self.enclosing.is_empty() {
                    let script = self.enclosing.swap_remove(0);
                    self.enclosing.clear();
                    self.current = script;
                }
                self.current.restore(checkpoint);
            }
        }
        self.emit(OpCode::ClearDebugLocation);
        self.emit(OpCode::Halt);

        if !self.errors.is_empty() {
            debug!("compilation failed with {} error(s)", self.errors.len());
            return Err(self.errors);
        }
        let function = self.current.into_function();
        debug!(
            "compiled script: {} bytes, {} constants",
            function.chunk.code.len(),
            function.chunk.constants.len()
        );
        trace!("{}", function.chunk.disassemble("<script>"));
        Ok(Rc::new(function))
    }

    /// Record the position of `node` for diagnostics and the debug table.
    fn locate(&mut self, node: &Node) {
        self.line = node.line;
        self.column = node.column;
        if node.line > 0 {
            self.current.chunk.mark(node.line, node.column);
        }
    }

    fn debug_location(&mut self, node: &Node) -> Result<()> {
        let text = source_line(&self.source, node.line).unwrap_or("").to_string();
        let idx = self.make_constant(Value::from(text))?;
        self.emit_u16(OpCode::SetDebugLocation, idx);
        let line = node.line.min(u8::MAX as usize) as u8;
        let column = node.column.min(u8::MAX as usize) as u8;
        self.chunk().write_byte(line);
        self.chunk().write_byte(column);
        Ok(())
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn statement(&mut self, node: &Node) -> Result<()> {
        self.locate(node);
        self.debug_location(node)?;
        match &node.kind {
            NodeKind::ExprStmt(expr) => {
                self.expression(expr)?;
                self.discard_or_keep_result();
            }
            NodeKind::VarDecl {
                name,
                mutable,
                private,
                init,
            } => self.var_decl(name, *mutable, *private, init.as_deref())?,
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let produce =
                    self.current.is_script() && node.produces_value(self.options.mode);
                self.if_expr(condition, then_branch, else_branch.as_deref(), produce)?;
                if produce {
                    self.emit(OpCode::SetResult);
                }
            }
            NodeKind::While { condition, body } => self.while_loop(condition, body)?,
            NodeKind::DoWhile { body, condition } => self.do_while(body, condition)?,
            NodeKind::For {
                init,
                condition,
                step,
                body,
            } => self.for_loop(init.as_deref(), condition.as_deref(), step.as_deref(), body)?,
            NodeKind::Loop { body } => self.infinite_loop(body)?,
            NodeKind::Break => self.break_stmt()?,
            NodeKind::Continue => self.continue_stmt()?,
            NodeKind::Return(value) => self.return_stmt(value.as_deref())?,
            NodeKind::Block(stmts) => self.block(stmts, false)?,
            NodeKind::Import { path, spec } => self.import(path, spec)?,
            NodeKind::Package(path) => debug!("package {}", path.join(".")),
            NodeKind::Program(_) => return Err(self.error("nested program")),
            _ => {
                self.expression(node)?;
                self.discard_or_keep_result();
            }
        }
        Ok(())
    }

    /// Script-level expression values land in the result register;
    /// inside functions they are dropped.
    fn discard_or_keep_result(&mut self) {
        if self.current.is_script() {
            self.emit(OpCode::SetResult);
        } else {
            self.emit(OpCode::Pop);
        }
    }

    fn var_decl(
        &mut self,
        name: &str,
        mutable: bool,
        private: bool,
        init: Option<&Node>,
    ) -> Result<()> {
        if self.at_global_scope() {
            self.initializer(init)?;
            let idx = self.name_constant(name)?;
            let mut flags = 0;
            if !mutable {
                flags |= GLOBAL_IMMUTABLE;
            }
            if private {
                flags |= GLOBAL_PRIVATE;
            }
            self.emit_u16(OpCode::DefineGlobal, idx);
            self.chunk().write_byte(flags);
            return Ok(());
        }

        // Redeclaring in the same scope re-initializes the existing slot.
        if let Some(index) = self.current.local_in_scope(name) {
            self.initializer(init)?;
            let slot = self.current.locals[index].slot as u8;
            self.current.locals[index].mutable = mutable;
            self.emit_u8(OpCode::SetLocal, slot);
            return Ok(());
        }

        if matches!(init.map(|n| &n.kind), Some(NodeKind::Lambda { .. })) {
            // Visible inside its own body for recursion.
            let slot = self.depth();
            self.declare_local(name, mutable, slot)?;
            self.initializer(init)
        } else {
            self.initializer(init)?;
            let slot = self.depth() - 1;
            self.declare_local(name, mutable, slot)
        }
    }

    fn initializer(&mut self, init: Option<&Node>) -> Result<()> {
        match init {
            Some(init) => self.expression(init),
            None => {
                self.emit(OpCode::PushUndefined);
                Ok(())
            }
        }
    }

    /// Compile a block. With `produce`, the block leaves the value of its
    /// last statement (or null) on the stack.
    fn block(&mut self, stmts: &[Node], produce: bool) -> Result<()> {
        self.begin_scope();
        match stmts.split_last() {
            Some((last, rest)) => {
                for stmt in rest {
                    self.statement(stmt)?;
                }
                if produce {
                    self.producing(last)?;
                } else {
                    self.statement(last)?;
                }
            }
            None if produce => self.emit(OpCode::PushNull),
            None => {}
        }
        self.end_scope(produce)
    }

    /// Branch or loop body: blocks directly, single statements as a
    /// one-statement block.
    fn arm(&mut self, node: &Node, produce: bool) -> Result<()> {
        match &node.kind {
            NodeKind::Block(stmts) => self.block(stmts, produce),
            _ => self.block(std::slice::from_ref(node), produce),
        }
    }

    /// Compile the terminal statement of a value-producing block.
    fn producing(&mut self, node: &Node) -> Result<()> {
        match &node.kind {
            NodeKind::ExprStmt(expr) => {
                self.locate(node);
                self.debug_location(node)?;
                self.expression(expr)
            }
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.locate(node);
                self.debug_location(node)?;
                self.if_expr(condition, then_branch, else_branch.as_deref(), true)
            }
            NodeKind::Block(stmts) => self.block(stmts, true),
            NodeKind::VarDecl {
                name,
                init: Some(_),
                ..
            } => {
                self.statement(node)?;
                self.load_variable(name)
            }
            NodeKind::Return(_) | NodeKind::Break | NodeKind::Continue => {
                self.statement(node)?;
                // Control never reaches the merge from here.
                self.adjust(1);
                Ok(())
            }
            NodeKind::VarDecl { .. }
            | NodeKind::While { .. }
            | NodeKind::DoWhile { .. }
            | NodeKind::For { .. }
            | NodeKind::Loop { .. }
            | NodeKind::Import { .. }
            | NodeKind::Package(_)
            | NodeKind::Program(_) => {
                self.statement(node)?;
                self.emit(OpCode::PushNull);
                Ok(())
            }
            _ => self.expression(node),
        }
    }

    fn if_expr(
        &mut self,
        condition: &Node,
        then_branch: &Node,
        else_branch: Option<&Node>,
        produce: bool,
    ) -> Result<()> {
        self.expression(condition)?;
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let base = self.depth();
        self.arm(then_branch, produce)?;
        match else_branch {
            Some(else_branch) => {
                let end_jump = self.emit_jump(OpCode::Jump);
                self.patch_jump(else_jump)?;
                self.set_depth(base);
                self.arm(else_branch, produce)?;
                self.patch_jump(end_jump)?;
            }
            None if produce => {
                let end_jump = self.emit_jump(OpCode::Jump);
                self.patch_jump(else_jump)?;
                self.set_depth(base);
                self.emit(OpCode::PushNull);
                self.patch_jump(end_jump)?;
            }
            None => self.patch_jump(else_jump)?,
        }
        self.set_depth(base + usize::from(produce));
        Ok(())
    }

    // =========================================================================
    // Loops
    // =========================================================================

    fn push_loop(&mut self, continue_target: Option<usize>) {
        let entry_depth = self.depth();
        self.current.loops.push(LoopContext {
            entry_depth,
            continue_target,
            continue_jumps: Vec::new(),
            break_jumps: Vec::new(),
        });
    }

    /// Patch pending `continue` jumps to the current offset.
    fn patch_continues(&mut self) -> Result<()> {
        let jumps = match self.current.loops.last_mut() {
            Some(ctx) => std::mem::take(&mut ctx.continue_jumps),
            None => Vec::new(),
        };
        for jump in jumps {
            self.patch_jump(jump)?;
        }
        Ok(())
    }

    /// Close the innermost loop, patching its breaks to the current offset.
    fn pop_loop(&mut self) -> Result<()> {
        let ctx = self
            .current
            .loops
            .pop()
            .ok_or_else(|| self.error("loop context underflow"))?;
        for jump in ctx.break_jumps {
            self.patch_jump(jump)?;
        }
        self.set_depth(ctx.entry_depth);
        Ok(())
    }

    fn while_loop(&mut self, condition: &Node, body: &Node) -> Result<()> {
        let start = self.chunk().current_offset();
        self.expression(condition)?;
        let exit = self.emit_jump(OpCode::JumpIfFalse);
        self.push_loop(Some(start));
        self.arm(body, false)?;
        self.emit_loop(start)?;
        self.patch_jump(exit)?;
        self.pop_loop()
    }

    fn do_while(&mut self, body: &Node, condition: &Node) -> Result<()> {
        let start = self.chunk().current_offset();
        self.push_loop(None);
        self.arm(body, false)?;
        self.patch_continues()?;
        self.expression(condition)?;
        let exit = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_loop(start)?;
        self.patch_jump(exit)?;
        self.pop_loop()
    }

    fn for_loop(
        &mut self,
        init: Option<&Node>,
        condition: Option<&Node>,
        step: Option<&Node>,
        body: &Node,
    ) -> Result<()> {
        self.begin_scope();
        if let Some(init) = init {
            match &init.kind {
                NodeKind::VarDecl {
                    name,
                    mutable,
                    private,
                    init: value,
                } => self.var_decl(name, *mutable, *private, value.as_deref())?,
                NodeKind::ExprStmt(expr) => {
                    self.expression(expr)?;
                    self.emit(OpCode::Pop);
                }
                _ => {
                    self.expression(init)?;
                    self.emit(OpCode::Pop);
                }
            }
        }
        let start = self.chunk().current_offset();
        let exit = match condition {
            Some(condition) => {
                self.expression(condition)?;
                Some(self.emit_jump(OpCode::JumpIfFalse))
            }
            None => None,
        };
        self.push_loop(None);
        self.arm(body, false)?;
        self.patch_continues()?;
        if let Some(step) = step {
            let step = match &step.kind {
                NodeKind::ExprStmt(expr) => expr.as_ref(),
                _ => step,
            };
            self.expression(step)?;
            self.emit(OpCode::Pop);
        }
        self.emit_loop(start)?;
        if let Some(exit) = exit {
            self.patch_jump(exit)?;
        }
        self.pop_loop()?;
        self.end_scope(false)
    }

    fn infinite_loop(&mut self, body: &Node) -> Result<()> {
        let start = self.chunk().current_offset();
        self.push_loop(Some(start));
        self.arm(body, false)?;
        self.emit_loop(start)?;
        self.pop_loop()
    }

    fn break_stmt(&mut self) -> Result<()> {
        let entry_depth = match self.current.loops.last() {
            Some(ctx) => ctx.entry_depth,
            None => return Err(self.error("'break' outside of a loop")),
        };
        self.emit_unwind(self.depth() - entry_depth);
        let jump = self.emit_jump(OpCode::Jump);
        if let Some(ctx) = self.current.loops.last_mut() {
            ctx.break_jumps.push(jump);
        }
        Ok(())
    }

    fn continue_stmt(&mut self) -> Result<()> {
        let (entry_depth, target) = match self.current.loops.last() {
            Some(ctx) => (ctx.entry_depth, ctx.continue_target),
            None => return Err(self.error("'continue' outside of a loop")),
        };
        self.emit_unwind(self.depth() - entry_depth);
        match target {
            Some(start) => self.emit_loop(start),
            None => {
                let jump = self.emit_jump(OpCode::Jump);
                if let Some(ctx) = self.current.loops.last_mut() {
                    ctx.continue_jumps.push(jump);
                }
                Ok(())
            }
        }
    }

    fn return_stmt(&mut self, value: Option<&Node>) -> Result<()> {
        if self.current.is_script() {
            return Err(self.error("'return' outside of a function"));
        }
        match value {
            Some(value) => self.expression(value)?,
            None => self.emit(OpCode::PushNull),
        }
        self.emit(OpCode::Return);
        Ok(())
    }

    fn import(&mut self, path: &[String], spec: &ImportSpec) -> Result<()> {
        let path_idx = self.name_constant(&path.join("."))?;
        self.emit_u16(OpCode::ImportModule, path_idx);
        match spec {
            ImportSpec::Namespace => {
                let name = path.last().map(String::as_str).unwrap_or_default();
                let name_idx = self.name_constant(name)?;
                self.chunk().write_byte(IMPORT_NAMESPACE);
                self.chunk().write_u16(name_idx);
            }
            ImportSpec::Wildcard => self.chunk().write_byte(IMPORT_WILDCARD),
            ImportSpec::Selective(names) => {
                let count = u8::try_from(names.len())
                    .ok()
                    .filter(|n| *n < IMPORT_NAMESPACE)
                    .ok_or_else(|| self.error("too many names in one import"))?;
                let mut pairs = Vec::with_capacity(names.len());
                for (name, alias) in names {
                    let name_idx = self.name_constant(name)?;
                    let alias_idx = self.name_constant(alias.as_deref().unwrap_or(name))?;
                    pairs.push((name_idx, alias_idx));
                }
                self.chunk().write_byte(count);
                for (name_idx, alias_idx) in pairs {
                    self.chunk().write_u16(name_idx);
                    self.chunk().write_u16(alias_idx);
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn expression(&mut self, node: &Node) -> Result<()> {
        self.locate(node);
        match &node.kind {
            NodeKind::Integer(n) => self.emit_constant(Value::Int(*n))?,
            NodeKind::BigInt(n) => self.emit_constant(Value::bigint(n.clone()))?,
            NodeKind::Number { value, precision } => {
                let value = match precision {
                    FloatLiteral::Single => f64::from(*value as f32),
                    FloatLiteral::Double => *value,
                    FloatLiteral::Default => self.options.precision.round(*value),
                };
                self.emit_constant(Value::Number(value))?
            }
            NodeKind::String(s) => self.emit_constant(Value::from(s.as_str()))?,
            NodeKind::Boolean(true) => self.emit(OpCode::PushTrue),
            NodeKind::Boolean(false) => self.emit(OpCode::PushFalse),
            NodeKind::Null => self.emit(OpCode::PushNull),
            NodeKind::Undefined => self.emit(OpCode::PushUndefined),
            NodeKind::Identifier(name) => self.load_variable(name)?,
            NodeKind::Array(items) => {
                for item in items {
                    self.expression(item)?;
                }
                self.emit_count(OpCode::BuildArray, items.len(), "array elements")?;
                self.adjust(1 - items.len() as isize);
            }
            NodeKind::Object(entries) => {
                for (key, value) in entries {
                    self.emit_constant(Value::from(key.as_str()))?;
                    self.expression(value)?;
                }
                self.emit_count(OpCode::BuildObject, entries.len(), "object entries")?;
                self.adjust(1 - 2 * entries.len() as isize);
            }
            NodeKind::Range {
                start,
                end,
                exclusive,
                step,
            } => {
                self.expression(start)?;
                self.expression(end)?;
                let mut flags = 0;
                if *exclusive {
                    flags |= RANGE_EXCLUSIVE;
                }
                if let Some(step) = step {
                    self.expression(step)?;
                    flags |= RANGE_HAS_STEP;
                }
                self.locate(node);
                self.emit_u8(OpCode::BuildRange, flags);
                self.adjust(if step.is_some() { -2 } else { -1 });
            }
            NodeKind::Template(parts) => self.template(parts)?,
            NodeKind::Binary { op, left, right } => self.binary(node, *op, left, right)?,
            NodeKind::Unary { op, operand } => {
                self.expression(operand)?;
                self.locate(node);
                self.emit(match op {
                    UnaryOp::Negate => OpCode::Negate,
                    UnaryOp::Not => OpCode::Not,
                    UnaryOp::BitNot => OpCode::BitwiseNot,
                });
            }
            NodeKind::Increment {
                target,
                delta,
                prefix,
            } => self.increment(node, target, *delta, *prefix)?,
            NodeKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expression(condition)?;
                let else_jump = self.emit_jump(OpCode::JumpIfFalse);
                let base = self.depth();
                self.expression(then_branch)?;
                let end_jump = self.emit_jump(OpCode::Jump);
                self.patch_jump(else_jump)?;
                self.set_depth(base);
                self.expression(else_branch)?;
                self.patch_jump(end_jump)?;
            }
            NodeKind::Call { callee, args } => self.call(node, callee, args)?,
            NodeKind::Member {
                object,
                name,
                optional,
            } => {
                self.expression(object)?;
                let skip = optional.then(|| self.emit_jump(OpCode::JumpIfNullish));
                self.locate(node);
                let idx = self.name_constant(name)?;
                self.emit_u16(OpCode::GetProperty, idx);
                if let Some(skip) = skip {
                    self.patch_jump(skip)?;
                }
            }
            NodeKind::Assign { target, value } => self.assign(node, target, value)?,
            NodeKind::CompoundAssign { op, target, value } => {
                self.compound_assign(node, *op, target, value)?
            }
            NodeKind::Lambda { name, params, body } => {
                self.lambda(name.as_deref(), params, body)?
            }
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => self.if_expr(condition, then_branch, else_branch.as_deref(), true)?,
            NodeKind::Block(stmts) => self.block(stmts, true)?,
            NodeKind::ExprStmt(expr) => self.expression(expr)?,
            _ => return Err(self.error("statement used where an expression is expected")),
        }
        Ok(())
    }

    fn binary(&mut self, node: &Node, op: BinaryOp, left: &Node, right: &Node) -> Result<()> {
        self.expression(left)?;
        match op {
            BinaryOp::And | BinaryOp::Or => {
                // Keep the deciding operand as the result.
                self.emit(OpCode::Dup);
                let jump_op = if op == BinaryOp::And {
                    OpCode::JumpIfFalse
                } else {
                    OpCode::JumpIfTrue
                };
                let end = self.emit_jump(jump_op);
                self.emit(OpCode::Pop);
                self.expression(right)?;
                self.patch_jump(end)
            }
            BinaryOp::NullCoalesce => {
                let end = self.emit_jump(OpCode::NullCoalesce);
                self.expression(right)?;
                self.patch_jump(end)
            }
            _ => {
                self.expression(right)?;
                self.locate(node);
                let opcode = self.binary_opcode(op)?;
                self.emit(opcode);
                Ok(())
            }
        }
    }

    fn binary_opcode(&self, op: BinaryOp) -> Result<OpCode> {
        Ok(match op {
            BinaryOp::Add => OpCode::Add,
            BinaryOp::Subtract => OpCode::Subtract,
            BinaryOp::Multiply => OpCode::Multiply,
            BinaryOp::Divide => OpCode::Divide,
            BinaryOp::FloorDiv => OpCode::FloorDiv,
            BinaryOp::Modulo => OpCode::Mod,
            BinaryOp::Power => OpCode::Power,
            BinaryOp::Equal => OpCode::Equal,
            BinaryOp::NotEqual => OpCode::NotEqual,
            BinaryOp::Less => OpCode::Less,
            BinaryOp::LessEqual => OpCode::LessEqual,
            BinaryOp::Greater => OpCode::Greater,
            BinaryOp::GreaterEqual => OpCode::GreaterEqual,
            BinaryOp::And => OpCode::And,
            BinaryOp::Or => OpCode::Or,
            BinaryOp::BitAnd => OpCode::BitwiseAnd,
            BinaryOp::BitOr => OpCode::BitwiseOr,
            BinaryOp::BitXor => OpCode::BitwiseXor,
            BinaryOp::ShiftLeft => OpCode::LeftShift,
            BinaryOp::ShiftRight => OpCode::RightShift,
            BinaryOp::ShiftRightUnsigned => OpCode::LogicalRightShift,
            BinaryOp::In => OpCode::In,
            BinaryOp::InstanceOf => OpCode::InstanceOf,
            BinaryOp::NullCoalesce => {
                return Err(self.error("'??' has no single-instruction form"));
            }
        })
    }

    fn call(&mut self, node: &Node, callee: &Node, args: &[Node]) -> Result<()> {
        if let NodeKind::Member {
            object,
            name,
            optional,
        } = &callee.kind
        {
            self.expression(object)?;
            let skip = optional.then(|| self.emit_jump(OpCode::JumpIfNullish));
            for arg in args {
                self.expression(arg)?;
            }
            let argc = self.argument_count(args)?;
            let name_idx = self.name_constant(name)?;
            self.locate(node);
            self.emit(OpCode::CallMethod);
            self.chunk().write_u16(name_idx);
            self.chunk().write_u16(argc);
            self.adjust(-(args.len() as isize));
            if let Some(skip) = skip {
                self.patch_jump(skip)?;
            }
            return Ok(());
        }
        self.expression(callee)?;
        for arg in args {
            self.expression(arg)?;
        }
        let argc = self.argument_count(args)?;
        self.locate(node);
        self.emit_u16(OpCode::Call, argc);
        self.adjust(-(args.len() as isize));
        Ok(())
    }

    fn argument_count(&self, args: &[Node]) -> Result<u16> {
        u16::try_from(args.len()).map_err(|_| self.error("too many call arguments"))
    }

    fn assign(&mut self, node: &Node, target: &Node, value: &Node) -> Result<()> {
        match &target.kind {
            NodeKind::Identifier(name) => {
                self.expression(value)?;
                self.emit(OpCode::Dup);
                self.locate(node);
                self.store_variable(name)
            }
            NodeKind::Member {
                object,
                name,
                optional: false,
            } => {
                self.expression(object)?;
                self.expression(value)?;
                self.locate(node);
                let idx = self.name_constant(name)?;
                self.emit_u16(OpCode::SetProperty, idx);
                Ok(())
            }
            NodeKind::Call { callee, args } if args.len() == 1 => {
                self.expression(callee)?;
                self.expression(&args[0])?;
                self.expression(value)?;
                self.locate(node);
                self.emit(OpCode::SetIndex);
                Ok(())
            }
            _ => {
                self.locate(target);
                Err(self.error("invalid assignment target"))
            }
        }
    }

    fn compound_assign(
        &mut self,
        node: &Node,
        op: BinaryOp,
        target: &Node,
        value: &Node,
    ) -> Result<()> {
        if op.is_logical() {
            let NodeKind::Identifier(name) = &target.kind else {
                self.locate(target);
                return Err(self.error("compound assignment on non-identifier"));
            };
            self.load_variable(name)?;
            let end = match op {
                BinaryOp::NullCoalesce => self.emit_jump(OpCode::NullCoalesce),
                _ => {
                    self.emit(OpCode::Dup);
                    let jump_op = if op == BinaryOp::And {
                        OpCode::JumpIfFalse
                    } else {
                        OpCode::JumpIfTrue
                    };
                    let end = self.emit_jump(jump_op);
                    self.emit(OpCode::Pop);
                    end
                }
            };
            self.expression(value)?;
            self.emit(OpCode::Dup);
            self.locate(node);
            self.store_variable(name)?;
            return self.patch_jump(end);
        }

        let opcode = self.binary_opcode(op)?;
        match &target.kind {
            NodeKind::Identifier(name) => {
                self.load_variable(name)?;
                self.expression(value)?;
                self.locate(node);
                self.emit(opcode);
                self.emit(OpCode::Dup);
                self.store_variable(name)
            }
            NodeKind::Member {
                object,
                name,
                optional: false,
            } => {
                let idx = self.name_constant(name)?;
                self.expression(object)?;
                self.emit(OpCode::Dup);
                self.emit_u16(OpCode::GetProperty, idx);
                self.expression(value)?;
                self.locate(node);
                self.emit(opcode);
                self.emit_u16(OpCode::SetProperty, idx);
                Ok(())
            }
            NodeKind::Call { callee, args } if args.len() == 1 => {
                self.expression(callee)?;
                self.expression(&args[0])?;
                self.emit(OpCode::Dup2);
                self.emit(OpCode::GetIndex);
                self.expression(value)?;
                self.locate(node);
                self.emit(opcode);
                self.emit(OpCode::SetIndex);
                Ok(())
            }
            _ => {
                self.locate(target);
                Err(self.error("invalid assignment target"))
            }
        }
    }

    /// Prefix forms leave the new value, postfix forms the old one.
    /// Member and index targets store the new value and then undo the step
    /// on the stack copy for postfix forms.
    fn increment(&mut self, node: &Node, target: &Node, delta: i8, prefix: bool) -> Result<()> {
        let (step, undo) = if delta > 0 {
            (OpCode::Increment, OpCode::Decrement)
        } else {
            (OpCode::Decrement, OpCode::Increment)
        };
        match &target.kind {
            NodeKind::Identifier(name) => {
                self.load_variable(name)?;
                self.locate(node);
                if prefix {
                    self.emit(step);
                    self.emit(OpCode::Dup);
                } else {
                    self.emit(OpCode::Dup);
                    self.emit(step);
                }
                self.store_variable(name)
            }
            NodeKind::Member {
                object,
                name,
                optional: false,
            } => {
                let idx = self.name_constant(name)?;
                self.expression(object)?;
                self.locate(node);
                self.emit(OpCode::Dup);
                self.emit_u16(OpCode::GetProperty, idx);
                self.emit(step);
                self.emit_u16(OpCode::SetProperty, idx);
                if !prefix {
                    self.emit(undo);
                }
                Ok(())
            }
            NodeKind::Call { callee, args } if args.len() == 1 => {
                self.expression(callee)?;
                self.expression(&args[0])?;
                self.locate(node);
                self.emit(OpCode::Dup2);
                self.emit(OpCode::GetIndex);
                self.emit(step);
                self.emit(OpCode::SetIndex);
                if !prefix {
                    self.emit(undo);
                }
                Ok(())
            }
            _ => {
                self.locate(target);
                Err(self.error("invalid increment target"))
            }
        }
    }

    /// `` `a ${b}` `` builds through a StringBuilder chain.
    fn template(&mut self, parts: &[TemplatePart]) -> Result<()> {
        let builder = self.name_constant("StringBuilder")?;
        let append = self.name_constant("append")?;
        let to_string = self.name_constant("toString")?;
        self.emit_u16(OpCode::GetGlobal, builder);
        self.emit_u16(OpCode::Call, 0);
        for part in parts {
            match part {
                TemplatePart::Text(text) => self.emit_constant(Value::from(text.as_str()))?,
                TemplatePart::Expr(expr) => self.expression(expr)?,
            }
            self.emit(OpCode::CallMethod);
            self.chunk().write_u16(append);
            self.chunk().write_u16(1);
            self.adjust(-1);
        }
        self.emit(OpCode::CallMethod);
        self.chunk().write_u16(to_string);
        self.chunk().write_u16(0);
        Ok(())
    }

    fn lambda(&mut self, name: Option<&str>, params: &[String], body: &Node) -> Result<()> {
        if params.len() > u8::MAX as usize {
            return Err(self.error("too many parameters"));
        }
        let state = FunctionState::function(
            name.map(str::to_string),
            params.to_vec(),
            Rc::clone(&self.source),
        );
        let parent = std::mem::replace(&mut self.current, state);
        self.enclosing.push(parent);

        let result = self.function_body(params, body);

        let parent = self
            .enclosing
            .pop()
            .ok_or_else(|| self.error("function nesting underflow"))?;
        let finished = std::mem::replace(&mut self.current, parent);
        result?;

        let function = finished.into_function();
        let index = self.functions.len();
        let operand = u16::try_from(index).map_err(|_| self.error("too many functions"))?;
        debug!(
            "compiled function {} (#{}, {} upvalues)",
            function.display_name(),
            index,
            function.upvalues.len()
        );
        trace!("{}", function.chunk.disassemble(function.display_name()));
        self.functions.push(Rc::new(function));
        self.emit_u16(OpCode::Closure, operand);
        Ok(())
    }

    fn function_body(&mut self, params: &[String], body: &Node) -> Result<()> {
        self.begin_scope();
        for (slot, param) in params.iter().enumerate() {
            self.declare_local(param, true, slot)?;
        }
        self.set_depth(params.len());
        match &body.kind {
            NodeKind::Block(stmts) => self.block(stmts, true)?,
            _ => self.producing(body)?,
        }
        self.emit(OpCode::Return);
        Ok(())
    }
}
