// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode emission for the compiler.
//!
//! Every emit keeps the compile-time stack depth in step with the code:
//! fixed-effect instructions adjust it automatically, operand-dependent
//! ones through [`Compiler::adjust`].

use crate::chunk::Chunk;
use crate::opcode::OpCode;
use crate::value::Value;

use super::codegen::Compiler;
use super::types::{CompileError, Result};

impl Compiler<'_> {
    pub(super) fn chunk(&mut self) -> &mut Chunk {
        &mut self.current.chunk
    }

    pub(super) fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::new(message, self.line, self.column)
    }

    pub(super) fn depth(&self) -> usize {
        self.current.stack_depth
    }

    pub(super) fn set_depth(&mut self, depth: usize) {
        self.current.stack_depth = depth;
    }

    pub(super) fn adjust(&mut self, delta: isize) {
        let depth = self.current.stack_depth as isize + delta;
        self.current.stack_depth = depth.max(0) as usize;
    }

    /// Emit an opcode.
    pub(super) fn emit(&mut self, op: OpCode) {
        self.chunk().write_op(op);
        if let Some(effect) = op.stack_effect() {
            self.adjust(effect as isize);
        }
    }

    pub(super) fn emit_u8(&mut self, op: OpCode, operand: u8) {
        self.emit(op);
        self.chunk().write_byte(operand);
    }

    pub(super) fn emit_u16(&mut self, op: OpCode, operand: u16) {
        self.emit(op);
        self.chunk().write_u16(operand);
    }

    /// Add a constant and return its index.
    pub(super) fn make_constant(&mut self, value: Value) -> Result<u16> {
        match self.chunk().add_constant(value) {
            Some(idx) => Ok(idx),
            None => Err(self.error("too many constants in one function")),
        }
    }

    pub(super) fn name_constant(&mut self, name: &str) -> Result<u16> {
        self.make_constant(Value::from(name))
    }

    /// Emit a constant load.
    pub(super) fn emit_constant(&mut self, value: Value) -> Result<()> {
        let idx = self.make_constant(value)?;
        self.emit_u16(OpCode::PushConstant, idx);
        Ok(())
    }

    /// Emit a count operand, failing when it does not fit in 16 bits.
    pub(super) fn emit_count(&mut self, op: OpCode, count: usize, what: &str) -> Result<()> {
        let operand =
            u16::try_from(count).map_err(|_| self.error(format!("too many {}", what)))?;
        self.emit_u16(op, operand);
        Ok(())
    }

    /// Emit a forward jump and return the offset of its operand for patching.
    pub(super) fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit(op);
        let operand = self.chunk().current_offset();
        self.chunk().write_u16(u16::MAX);
        operand
    }

    /// Point the jump whose operand sits at `operand` to the current offset.
    pub(super) fn patch_jump(&mut self, operand: usize) -> Result<()> {
        let distance = self.chunk().current_offset() - (operand + 2);
        let distance = u16::try_from(distance)
            .map_err(|_| self.error("jump distance exceeds 65535 bytes"))?;
        self.chunk().patch_u16(operand, distance);
        Ok(())
    }

    /// Emit a backward jump to `start`.
    pub(super) fn emit_loop(&mut self, start: usize) -> Result<()> {
        self.emit(OpCode::Loop);
        let distance = self.chunk().current_offset() + 2 - start;
        let distance = u16::try_from(distance).map_err(|_| self.error("loop body too large"))?;
        self.chunk().write_u16(distance);
        Ok(())
    }

    /// Pop `count` values at run time without touching the compile-time
    /// depth. Used by break/continue, whose code path never falls through.
    pub(super) fn emit_unwind(&mut self, mut count: usize) {
        while count > 0 {
            let n = count.min(u8::MAX as usize);
            self.chunk().write_op(OpCode::PopN);
            self.chunk().write_byte(n as u8);
            count -= n;
        }
    }
}
