// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode instruction definitions.

use std::fmt;

/// Bytecode instructions for the Slate VM.
///
/// Instructions are encoded as one opcode byte followed by their operands.
/// Operands are 16-bit little-endian unless listed as single bytes: local and
/// upvalue slots, `POP_N` counts and `BUILD_RANGE` flags. Jump offsets are
/// unsigned and measured from the end of the jump instruction.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // =========================================================================
    // Stack
    // =========================================================================
    /// `PUSH_CONSTANT idx:u16`
    PushConstant = 0x00,
    PushNull = 0x01,
    PushUndefined = 0x02,
    PushTrue = 0x03,
    PushFalse = 0x04,
    Pop = 0x05,
    Dup = 0x06,
    /// Duplicate the top two values, keeping their order.
    Dup2 = 0x07,
    /// Pop the top value into the result register.
    SetResult = 0x08,

    // =========================================================================
    // Arithmetic
    // =========================================================================
    Add = 0x10,
    Subtract = 0x11,
    Multiply = 0x12,
    Divide = 0x13,
    Mod = 0x14,
    Power = 0x15,
    Negate = 0x16,
    FloorDiv = 0x17,
    Increment = 0x18,
    Decrement = 0x19,

    // =========================================================================
    // Comparison
    // =========================================================================
    Equal = 0x20,
    NotEqual = 0x21,
    Less = 0x22,
    LessEqual = 0x23,
    Greater = 0x24,
    GreaterEqual = 0x25,

    // =========================================================================
    // Logical
    // =========================================================================
    Not = 0x28,
    /// Eager `&&`: pops both operands, pushes the deciding one.
    And = 0x29,
    /// Eager `||`: pops both operands, pushes the deciding one.
    Or = 0x2A,
    /// `NULL_COALESCE off:u16`: jump (keeping the value) when the top is
    /// neither null nor undefined, otherwise pop it.
    NullCoalesce = 0x2B,
    In = 0x2C,
    InstanceOf = 0x2D,

    // =========================================================================
    // Bitwise
    // =========================================================================
    BitwiseAnd = 0x30,
    BitwiseOr = 0x31,
    BitwiseXor = 0x32,
    BitwiseNot = 0x33,
    LeftShift = 0x34,
    RightShift = 0x35,
    LogicalRightShift = 0x36,

    // =========================================================================
    // Variables
    // =========================================================================
    /// `GET_LOCAL slot:u8`
    GetLocal = 0x40,
    /// `SET_LOCAL slot:u8`: pops the value.
    SetLocal = 0x41,
    /// `GET_UPVALUE idx:u8`
    GetUpvalue = 0x42,
    /// `SET_UPVALUE idx:u8`: pops the value.
    SetUpvalue = 0x43,
    /// `GET_GLOBAL name:u16`
    GetGlobal = 0x44,
    /// `SET_GLOBAL name:u16`: pops the value.
    SetGlobal = 0x45,
    /// `DEFINE_GLOBAL name:u16 flags:u8`: bit 0 immutable, bit 1 private.
    DefineGlobal = 0x46,

    // =========================================================================
    // Data
    // =========================================================================
    /// `GET_PROPERTY name:u16`
    GetProperty = 0x50,
    /// `SET_PROPERTY name:u16`: pops value and target, pushes the value.
    SetProperty = 0x51,
    GetIndex = 0x52,
    /// Pops value, key and target, pushes the value.
    SetIndex = 0x53,
    /// `BUILD_ARRAY n:u16`
    BuildArray = 0x54,
    /// `BUILD_OBJECT n:u16`: n key/value pairs.
    BuildObject = 0x55,
    /// `BUILD_RANGE flags:u8`: bit 0 exclusive, bit 1 explicit step.
    BuildRange = 0x56,

    // =========================================================================
    // Control
    // =========================================================================
    /// `JUMP off:u16`
    Jump = 0x60,
    /// `JUMP_IF_FALSE off:u16`: pops the condition.
    JumpIfFalse = 0x61,
    /// `JUMP_IF_TRUE off:u16`: pops the condition.
    JumpIfTrue = 0x62,
    /// `JUMP_IF_NULLISH off:u16`: jump without popping when the top is null
    /// or undefined.
    JumpIfNullish = 0x63,
    /// `LOOP off:u16`: jump backward.
    Loop = 0x64,

    // =========================================================================
    // Calls
    // =========================================================================
    /// `CLOSURE func:u16`
    Closure = 0x70,
    /// `CALL argc:u16`
    Call = 0x71,
    /// `CALL_METHOD name:u16 argc:u16`
    CallMethod = 0x72,
    Return = 0x73,

    // =========================================================================
    // Scope
    // =========================================================================
    /// `POP_N n:u8`: closes upvalues over the popped slots.
    PopN = 0x78,
    /// `POP_N_PRESERVE_TOP n:u8`: removes n values beneath the top.
    PopNPreserveTop = 0x79,

    // =========================================================================
    // Debug, modules, end
    // =========================================================================
    /// `SET_DEBUG_LOCATION text:u16 line:u8 column:u8`
    SetDebugLocation = 0x7C,
    ClearDebugLocation = 0x7D,
    /// `IMPORT_MODULE path:u16` then `0xFE name:u16`, `0xFF`, or
    /// `count:u8 (name:u16 alias:u16)*`.
    ImportModule = 0x7E,
    Halt = 0x7F,
}

/// Discriminator byte of a namespace import.
pub const IMPORT_NAMESPACE: u8 = 0xFE;
/// Discriminator byte of a wildcard import.
pub const IMPORT_WILDCARD: u8 = 0xFF;

pub const GLOBAL_IMMUTABLE: u8 = 0b01;
pub const GLOBAL_PRIVATE: u8 = 0b10;

pub const RANGE_EXCLUSIVE: u8 = 0b01;
pub const RANGE_HAS_STEP: u8 = 0b10;

const ALL: &[OpCode] = &[
    OpCode::PushConstant,
    OpCode::PushNull,
    OpCode::PushUndefined,
    OpCode::PushTrue,
    OpCode::PushFalse,
    OpCode::Pop,
    OpCode::Dup,
    OpCode::Dup2,
    OpCode::SetResult,
    OpCode::Add,
    OpCode::Subtract,
    OpCode::Multiply,
    OpCode::Divide,
    OpCode::Mod,
    OpCode::Power,
    OpCode::Negate,
    OpCode::FloorDiv,
    OpCode::Increment,
    OpCode::Decrement,
    OpCode::Equal,
    OpCode::NotEqual,
    OpCode::Less,
    OpCode::LessEqual,
    OpCode::Greater,
    OpCode::GreaterEqual,
    OpCode::Not,
    OpCode::And,
    OpCode::Or,
    OpCode::NullCoalesce,
    OpCode::In,
    OpCode::InstanceOf,
    OpCode::BitwiseAnd,
    OpCode::BitwiseOr,
    OpCode::BitwiseXor,
    OpCode::BitwiseNot,
    OpCode::LeftShift,
    OpCode::RightShift,
    OpCode::LogicalRightShift,
    OpCode::GetLocal,
    OpCode::SetLocal,
    OpCode::GetUpvalue,
    OpCode::SetUpvalue,
    OpCode::GetGlobal,
    OpCode::SetGlobal,
    OpCode::DefineGlobal,
    OpCode::GetProperty,
    OpCode::SetProperty,
    OpCode::GetIndex,
    OpCode::SetIndex,
    OpCode::BuildArray,
    OpCode::BuildObject,
    OpCode::BuildRange,
    OpCode::Jump,
    OpCode::JumpIfFalse,
    OpCode::JumpIfTrue,
    OpCode::JumpIfNullish,
    OpCode::Loop,
    OpCode::Closure,
    OpCode::Call,
    OpCode::CallMethod,
    OpCode::Return,
    OpCode::PopN,
    OpCode::PopNPreserveTop,
    OpCode::SetDebugLocation,
    OpCode::ClearDebugLocation,
    OpCode::ImportModule,
    OpCode::Halt,
];

const DECODE: [Option<OpCode>; 256] = {
    let mut table = [None; 256];
    let mut i = 0;
    while i < ALL.len() {
        table[ALL[i] as usize] = Some(ALL[i]);
        i += 1;
    }
    table
};

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(byte: u8) -> std::result::Result<Self, u8> {
        DECODE[byte as usize].ok_or(byte)
    }
}

impl OpCode {
    /// Byte width of the fixed operands following the opcode. `None` for
    /// `IMPORT_MODULE`, whose operand shape is variable.
    pub fn operand_width(self) -> Option<usize> {
        Some(match self {
            OpCode::PushConstant
            | OpCode::GetGlobal
            | OpCode::SetGlobal
            | OpCode::GetProperty
            | OpCode::SetProperty
            | OpCode::BuildArray
            | OpCode::BuildObject
            | OpCode::Jump
            | OpCode::JumpIfFalse
            | OpCode::JumpIfTrue
            | OpCode::JumpIfNullish
            | OpCode::NullCoalesce
            | OpCode::Loop
            | OpCode::Closure
            | OpCode::Call => 2,
            OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::GetUpvalue
            | OpCode::SetUpvalue
            | OpCode::PopN
            | OpCode::PopNPreserveTop
            | OpCode::BuildRange => 1,
            OpCode::DefineGlobal => 3,
            OpCode::CallMethod | OpCode::SetDebugLocation => 4,
            OpCode::ImportModule => return None,
            _ => 0,
        })
    }

    /// Returns true if this instruction may transfer control.
    pub fn is_control_flow(self) -> bool {
        matches!(
            self,
            OpCode::Jump
                | OpCode::JumpIfFalse
                | OpCode::JumpIfTrue
                | OpCode::JumpIfNullish
                | OpCode::NullCoalesce
                | OpCode::Loop
                | OpCode::Call
                | OpCode::CallMethod
                | OpCode::Return
                | OpCode::Halt
        )
    }

    /// Returns the stack effect of this instruction (positive = push, negative = pop).
    /// Returns None for instructions whose effect depends on an operand.
    pub fn stack_effect(self) -> Option<i8> {
        Some(match self {
            // Push 1
            OpCode::PushConstant
            | OpCode::PushNull
            | OpCode::PushUndefined
            | OpCode::PushTrue
            | OpCode::PushFalse
            | OpCode::Dup
            | OpCode::GetLocal
            | OpCode::GetUpvalue
            | OpCode::GetGlobal
            | OpCode::Closure => 1,

            OpCode::Dup2 => 2,

            // Pop 1
            OpCode::Pop
            | OpCode::SetResult
            | OpCode::SetLocal
            | OpCode::SetUpvalue
            | OpCode::SetGlobal
            | OpCode::DefineGlobal
            | OpCode::JumpIfFalse
            | OpCode::JumpIfTrue
            | OpCode::Return => -1,

            // Pop 2, push 1
            OpCode::Add
            | OpCode::Subtract
            | OpCode::Multiply
            | OpCode::Divide
            | OpCode::Mod
            | OpCode::Power
            | OpCode::FloorDiv
            | OpCode::Equal
            | OpCode::NotEqual
            | OpCode::Less
            | OpCode::LessEqual
            | OpCode::Greater
            | OpCode::GreaterEqual
            | OpCode::And
            | OpCode::Or
            | OpCode::In
            | OpCode::InstanceOf
            | OpCode::BitwiseAnd
            | OpCode::BitwiseOr
            | OpCode::BitwiseXor
            | OpCode::LeftShift
            | OpCode::RightShift
            | OpCode::LogicalRightShift
            | OpCode::GetIndex
            | OpCode::SetProperty => -1,

            // Pop 3, push 1
            OpCode::SetIndex => -2,

            // Neutral
            OpCode::Negate
            | OpCode::Not
            | OpCode::BitwiseNot
            | OpCode::Increment
            | OpCode::Decrement
            | OpCode::GetProperty
            | OpCode::Jump
            | OpCode::JumpIfNullish
            | OpCode::Loop
            | OpCode::SetDebugLocation
            | OpCode::ClearDebugLocation
            | OpCode::ImportModule
            | OpCode::Halt => 0,

            // Fallthrough path pops; the right operand pushes again.
            OpCode::NullCoalesce => -1,

            OpCode::BuildArray
            | OpCode::BuildObject
            | OpCode::BuildRange
            | OpCode::Call
            | OpCode::CallMethod
            | OpCode::PopN
            | OpCode::PopNPreserveTop => return None,
        })
    }

    /// Upper-case mnemonic used in disassembly.
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::PushConstant => "PUSH_CONSTANT",
            OpCode::PushNull => "PUSH_NULL",
            OpCode::PushUndefined => "PUSH_UNDEFINED",
            OpCode::PushTrue => "PUSH_TRUE",
            OpCode::PushFalse => "PUSH_FALSE",
            OpCode::Pop => "POP",
            OpCode::Dup => "DUP",
            OpCode::Dup2 => "DUP_2",
            OpCode::SetResult => "SET_RESULT",
            OpCode::Add => "ADD",
            OpCode::Subtract => "SUBTRACT",
            OpCode::Multiply => "MULTIPLY",
            OpCode::Divide => "DIVIDE",
            OpCode::Mod => "MOD",
            OpCode::Power => "POWER",
            OpCode::Negate => "NEGATE",
            OpCode::FloorDiv => "FLOOR_DIV",
            OpCode::Increment => "INCREMENT",
            OpCode::Decrement => "DECREMENT",
            OpCode::Equal => "EQUAL",
            OpCode::NotEqual => "NOT_EQUAL",
            OpCode::Less => "LESS",
            OpCode::LessEqual => "LESS_EQUAL",
            OpCode::Greater => "GREATER",
            OpCode::GreaterEqual => "GREATER_EQUAL",
            OpCode::Not => "NOT",
            OpCode::And => "AND",
            OpCode::Or => "OR",
            OpCode::NullCoalesce => "NULL_COALESCE",
            OpCode::In => "IN",
            OpCode::InstanceOf => "INSTANCEOF",
            OpCode::BitwiseAnd => "BITWISE_AND",
            OpCode::BitwiseOr => "BITWISE_OR",
            OpCode::BitwiseXor => "BITWISE_XOR",
            OpCode::BitwiseNot => "BITWISE_NOT",
            OpCode::LeftShift => "LEFT_SHIFT",
            OpCode::RightShift => "RIGHT_SHIFT",
            OpCode::LogicalRightShift => "LOGICAL_RIGHT_SHIFT",
            OpCode::GetLocal => "GET_LOCAL",
            OpCode::SetLocal => "SET_LOCAL",
            OpCode::GetUpvalue => "GET_UPVALUE",
            OpCode::SetUpvalue => "SET_UPVALUE",
            OpCode::GetGlobal => "GET_GLOBAL",
            OpCode::SetGlobal => "SET_GLOBAL",
            OpCode::DefineGlobal => "DEFINE_GLOBAL",
            OpCode::GetProperty => "GET_PROPERTY",
            OpCode::SetProperty => "SET_PROPERTY",
            OpCode::GetIndex => "GET_INDEX",
            OpCode::SetIndex => "SET_INDEX",
            OpCode::BuildArray => "BUILD_ARRAY",
            OpCode::BuildObject => "BUILD_OBJECT",
            OpCode::BuildRange => "BUILD_RANGE",
            OpCode::Jump => "JUMP",
            OpCode::JumpIfFalse => "JUMP_IF_FALSE",
            OpCode::JumpIfTrue => "JUMP_IF_TRUE",
            OpCode::JumpIfNullish => "JUMP_IF_NULLISH",
            OpCode::Loop => "LOOP",
            OpCode::Closure => "CLOSURE",
            OpCode::Call => "CALL",
            OpCode::CallMethod => "CALL_METHOD",
            OpCode::Return => "RETURN",
            OpCode::PopN => "POP_N",
            OpCode::PopNPreserveTop => "POP_N_PRESERVE_TOP",
            OpCode::SetDebugLocation => "SET_DEBUG_LOCATION",
            OpCode::ClearDebugLocation => "CLEAR_DEBUG_LOCATION",
            OpCode::ImportModule => "IMPORT_MODULE",
            OpCode::Halt => "HALT",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_round_trip() {
        for op in ALL {
            assert_eq!(OpCode::try_from(*op as u8), Ok(*op));
        }
        assert_eq!(OpCode::try_from(0xEE), Err(0xEE));
    }

    #[test]
    fn test_opcode_bytes_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for op in ALL {
            assert!(seen.insert(*op as u8), "duplicate byte for {}", op);
        }
    }

    #[test]
    fn test_variable_effects_have_no_fixed_stack_effect() {
        assert_eq!(OpCode::Call.stack_effect(), None);
        assert_eq!(OpCode::PopN.stack_effect(), None);
        assert_eq!(OpCode::SetIndex.stack_effect(), Some(-2));
        assert_eq!(OpCode::Dup2.stack_effect(), Some(2));
    }
}
