// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode chunks and compiled functions.

use std::fmt::Write as _;
use std::rc::Rc;

use crate::OpCode;
use crate::value::Value;

/// Maps a bytecode offset to the source position that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugEntry {
    pub offset: usize,
    /// Source line number (1-indexed).
    pub line: usize,
    /// Source column number (1-indexed).
    pub column: usize,
}

/// A chunk of bytecode with its constant pool and debug information.
#[derive(Clone)]
pub struct Chunk {
    /// Encoded instructions.
    pub code: Vec<u8>,

    /// Constant pool: literals and names.
    pub constants: Vec<Value>,

    /// Debug table, sorted by offset.
    pub debug: Vec<DebugEntry>,

    /// The source text this chunk was compiled from.
    pub source: Rc<str>,
}

impl Chunk {
    /// Create a new empty chunk.
    pub fn new(source: Rc<str>) -> Self {
        Self {
            code: Vec::new(),
            constants: Vec::new(),
            debug: Vec::new(),
            source,
        }
    }

    pub fn write_op(&mut self, op: OpCode) {
        self.code.push(op as u8);
    }

    pub fn write_byte(&mut self, byte: u8) {
        self.code.push(byte);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let bytes = self.code.get(offset..offset + 2)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Overwrite a previously written u16 operand.
    pub fn patch_u16(&mut self, offset: usize, value: u16) {
        if let Some(slot) = self.code.get_mut(offset..offset + 2) {
            slot.copy_from_slice(&value.to_le_bytes());
        }
    }

    /// Add a constant to the pool and return its index.
    ///
    /// Returns `None` if the constant pool is full (> u16::MAX entries).
    pub fn add_constant(&mut self, value: Value) -> Option<u16> {
        // Check for existing constant to deduplicate
        for (i, existing) in self.constants.iter().enumerate() {
            if Self::constants_equal(existing, &value) {
                return Some(i as u16);
            }
        }

        let idx = self.constants.len();
        if idx > u16::MAX as usize {
            return None;
        }
        self.constants.push(value);
        Some(idx as u16)
    }

    /// Constants are shared only when they are the same variant with the
    /// same content, so `1` and `1.0` stay distinct.
    fn constants_equal(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }

    /// Get the current instruction offset (for jump patching).
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Record that code emitted from here on comes from `line:column`.
    pub fn mark(&mut self, line: usize, column: usize) {
        let offset = self.code.len();
        if let Some(last) = self.debug.last_mut() {
            if last.line == line && last.column == column {
                return;
            }
            if last.offset == offset {
                last.line = line;
                last.column = column;
                return;
            }
        }
        self.debug.push(DebugEntry {
            offset,
            line,
            column,
        });
    }

    /// Source position of the instruction containing `offset`.
    pub fn location_at(&self, offset: usize) -> Option<(usize, usize)> {
        let idx = self.debug.partition_point(|e| e.offset <= offset);
        idx.checked_sub(1)
            .map(|i| (self.debug[i].line, self.debug[i].column))
    }

    /// Text of a 1-indexed source line.
    pub fn source_line(&self, line: usize) -> Option<&str> {
        slate_parser::source_line(&self.source, line)
    }

    /// Render the chunk as one instruction per line.
    pub fn disassemble(&self, name: &str) -> String {
        let mut out = format!("== {} ==\n", name);
        let mut offset = 0;
        while offset < self.code.len() {
            let byte = self.code[offset];
            let Ok(op) = OpCode::try_from(byte) else {
                let _ = writeln!(out, "{:04} <bad opcode 0x{:02x}>", offset, byte);
                offset += 1;
                continue;
            };
            let _ = write!(out, "{:04} {}", offset, op);
            let operands = offset + 1;
            let width = match op.operand_width() {
                Some(width) => width,
                None => self.import_operand_width(operands),
            };
            match (op, width) {
                (OpCode::PushConstant, _) => {
                    if let Some(value) = self
                        .read_u16(operands)
                        .and_then(|i| self.constants.get(i as usize))
                    {
                        let _ = write!(out, " {:?}", value);
                    }
                }
                (OpCode::Jump | OpCode::JumpIfFalse | OpCode::JumpIfTrue
                | OpCode::JumpIfNullish | OpCode::NullCoalesce, _) => {
                    if let Some(delta) = self.read_u16(operands) {
                        let _ = write!(out, " -> {:04}", operands + 2 + delta as usize);
                    }
                }
                (OpCode::Loop, _) => {
                    if let Some(delta) = self.read_u16(operands) {
                        let target = (operands + 2).saturating_sub(delta as usize);
                        let _ = write!(out, " -> {:04}", target);
                    }
                }
                (_, 1) => {
                    let _ = write!(out, " {}", self.code.get(operands).copied().unwrap_or(0));
                }
                (_, 2) => {
                    let _ = write!(out, " {}", self.read_u16(operands).unwrap_or(0));
                }
                _ => {}
            }
            out.push('\n');
            offset = operands + width;
        }
        out
    }

    fn import_operand_width(&self, operands: usize) -> usize {
        match self.code.get(operands + 2) {
            Some(&crate::opcode::IMPORT_NAMESPACE) => 5,
            Some(&crate::opcode::IMPORT_WILDCARD) => 3,
            Some(&count) => 3 + 4 * count as usize,
            None => 2,
        }
    }
}

/// Information about a captured variable (upvalue).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpvalueDesc {
    /// Slot (when `is_local`) or upvalue index in the enclosing function.
    pub index: u8,

    /// Whether this captures from the immediate parent's locals (true)
    /// or from the parent's upvalues (false).
    pub is_local: bool,
}

/// A compiled function: parameter list, bytecode and upvalue descriptors.
#[derive(Clone)]
pub struct Function {
    /// Function name (for diagnostics and display).
    pub name: Option<String>,

    pub params: Vec<String>,

    pub chunk: Chunk,

    /// Read by `CLOSURE` to build the closure's upvalue cells.
    pub upvalues: Vec<UpvalueDesc>,
}

impl Function {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

/// Every function compiled for a VM, indexed by `CLOSURE` operands.
pub type FunctionTable = Vec<Rc<Function>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk() -> Chunk {
        Chunk::new(Rc::from("a\nb"))
    }

    #[test]
    fn test_constant_dedup_keeps_variants_apart() {
        let mut c = chunk();
        let a = c.add_constant(Value::Int(1)).unwrap();
        let b = c.add_constant(Value::Number(1.0)).unwrap();
        let again = c.add_constant(Value::Int(1)).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, again);
        assert_eq!(c.add_constant(Value::from("x")), c.add_constant(Value::from("x")));
    }

    #[test]
    fn test_u16_operands_little_endian() {
        let mut c = chunk();
        c.write_op(OpCode::Jump);
        c.write_u16(0x1234);
        assert_eq!(c.code, vec![OpCode::Jump as u8, 0x34, 0x12]);
        c.patch_u16(1, 7);
        assert_eq!(c.read_u16(1), Some(7));
    }

    #[test]
    fn test_debug_table_lookup() {
        let mut c = chunk();
        c.mark(1, 1);
        c.write_op(OpCode::PushNull);
        c.write_op(OpCode::Pop);
        c.mark(2, 3);
        c.write_op(OpCode::PushTrue);
        assert_eq!(c.location_at(0), Some((1, 1)));
        assert_eq!(c.location_at(1), Some((1, 1)));
        assert_eq!(c.location_at(2), Some((2, 3)));
        assert_eq!(c.source_line(2), Some("b"));
    }

    #[test]
    fn test_disassemble() {
        let mut c = chunk();
        let idx = c.add_constant(Value::Int(42)).unwrap();
        c.write_op(OpCode::PushConstant);
        c.write_u16(idx);
        c.write_op(OpCode::GetLocal);
        c.write_byte(3);
        c.write_op(OpCode::Halt);
        let text = c.disassemble("main");
        assert!(text.contains("0000 PUSH_CONSTANT 42"));
        assert!(text.contains("0003 GET_LOCAL 3"));
        assert!(text.contains("0005 HALT"));
    }
}
