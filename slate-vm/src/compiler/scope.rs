// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Scope management: locals, upvalue resolution and block cleanup.
//!
//! Top-level declarations of a script become globals. Everything else is
//! a stack slot in the current frame, captured through upvalues when a
//! nested function refers to it.

use crate::opcode::OpCode;

use super::codegen::Compiler;
use super::types::{FunctionState, Local, Result, Upvalue};

/// Where an identifier lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Resolved {
    Local { slot: u8, mutable: bool },
    Upvalue { index: u8, mutable: bool },
    Global,
}

impl Compiler<'_> {
    /// Declarations at this point become globals.
    pub(super) fn at_global_scope(&self) -> bool {
        self.current.is_script() && self.current.scope_depth == 0
    }

    pub(super) fn begin_scope(&mut self) {
        self.current.scope_depth += 1;
    }

    /// Close the innermost scope, popping its locals. With `preserve_top`
    /// the block's value stays on top of the stack.
    pub(super) fn end_scope(&mut self, preserve_top: bool) -> Result<()> {
        let depth = self.current.scope_depth;
        self.current.scope_depth = depth.saturating_sub(1);
        let keep = self
            .current
            .locals
            .iter()
            .rposition(|local| local.depth < depth)
            .map_or(0, |i| i + 1);
        let count = self.current.locals.len() - keep;
        self.current.locals.truncate(keep);
        if count == 0 {
            return Ok(());
        }
        let n = u8::try_from(count).map_err(|_| self.error("too many locals in one block"))?;
        let op = if preserve_top {
            OpCode::PopNPreserveTop
        } else {
            OpCode::PopN
        };
        self.emit_u8(op, n);
        self.adjust(-(count as isize));
        Ok(())
    }

    /// Declare a local living in stack slot `slot`.
    pub(super) fn declare_local(&mut self, name: &str, mutable: bool, slot: usize) -> Result<()> {
        if slot > u8::MAX as usize {
            return Err(self.error("too many local variables in function"));
        }
        self.current.locals.push(Local {
            name: name.to_string(),
            depth: self.current.scope_depth,
            slot,
            mutable,
        });
        Ok(())
    }

    fn state_at(&self, level: usize) -> &FunctionState {
        if level >= self.enclosing.len() {
            &self.current
        } else {
            &self.enclosing[level]
        }
    }

    fn state_at_mut(&mut self, level: usize) -> &mut FunctionState {
        if level >= self.enclosing.len() {
            &mut self.current
        } else {
            &mut self.enclosing[level]
        }
    }

    /// Resolve a name: innermost local, then upvalue, then global.
    pub(super) fn resolve(&mut self, name: &str) -> Result<Resolved> {
        if let Some((slot, mutable)) = self.current.resolve_local(name) {
            return Ok(Resolved::Local {
                slot: slot as u8,
                mutable,
            });
        }
        let level = self.enclosing.len();
        if let Some((index, mutable)) = self.resolve_upvalue(level, name)? {
            return Ok(Resolved::Upvalue { index, mutable });
        }
        Ok(Resolved::Global)
    }

    fn resolve_upvalue(&mut self, level: usize, name: &str) -> Result<Option<(u8, bool)>> {
        if level == 0 {
            return Ok(None);
        }
        let parent = level - 1;
        if let Some((slot, mutable)) = self.state_at(parent).resolve_local(name) {
            return self.add_upvalue(level, slot as u8, true, mutable).map(Some);
        }
        match self.resolve_upvalue(parent, name)? {
            Some((index, mutable)) => self.add_upvalue(level, index, false, mutable).map(Some),
            None => Ok(None),
        }
    }

    fn add_upvalue(&mut self, level: usize, index: u8, is_local: bool, mutable: bool) -> Result<(u8, bool)> {
        let too_many = self.error("too many captured variables in function");
        let state = self.state_at_mut(level);
        if let Some(existing) = state
            .upvalues
            .iter()
            .position(|u| u.index == index && u.is_local == is_local)
        {
            return Ok((existing as u8, mutable));
        }
        if state.upvalues.len() > u8::MAX as usize {
            return Err(too_many);
        }
        state.upvalues.push(Upvalue {
            index,
            is_local,
            mutable,
        });
        Ok(((state.upvalues.len() - 1) as u8, mutable))
    }

    /// Emit a read of `name`.
    pub(super) fn load_variable(&mut self, name: &str) -> Result<()> {
        match self.resolve(name)? {
            Resolved::Local { slot, .. } => self.emit_u8(OpCode::GetLocal, slot),
            Resolved::Upvalue { index, .. } => self.emit_u8(OpCode::GetUpvalue, index),
            Resolved::Global => {
                let idx = self.name_constant(name)?;
                self.emit_u16(OpCode::GetGlobal, idx);
            }
        }
        Ok(())
    }

    /// Emit a store of the top value into `name`, popping it. Immutable
    /// locals and captures are rejected here; immutable globals at run time.
    pub(super) fn store_variable(&mut self, name: &str) -> Result<()> {
        match self.resolve(name)? {
            Resolved::Local { mutable: false, .. } | Resolved::Upvalue { mutable: false, .. } => {
                Err(self.error(format!("cannot reassign immutable '{}'", name)))
            }
            Resolved::Local { slot, .. } => {
                self.emit_u8(OpCode::SetLocal, slot);
                Ok(())
            }
            Resolved::Upvalue { index, .. } => {
                self.emit_u8(OpCode::SetUpvalue, index);
                Ok(())
            }
            Resolved::Global => {
                let idx = self.name_constant(name)?;
                self.emit_u16(OpCode::SetGlobal, idx);
                Ok(())
            }
        }
    }
}
