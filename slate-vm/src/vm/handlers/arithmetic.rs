// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Arithmetic and bitwise opcode handlers.

use crate::numeric::{self, ArithOp, BitOp, Num};
use crate::opcode::OpCode;
use crate::value::Value;
use crate::vm::{Result, RuntimeError, Vm};

impl Vm {
    /// Execute an arithmetic or bitwise opcode.
    pub(crate) fn execute_arithmetic(&mut self, op: OpCode) -> Result<()> {
        match op {
            OpCode::Negate => {
                let value = self.stack.pop()?;
                let result = match Num::of(&value) {
                    Some(n) => numeric::negate(n),
                    None => return Err(bad_unary("-", &value)),
                };
                self.stack.push(result)
            }
            OpCode::BitwiseNot => {
                let value = self.stack.pop()?;
                let result = match Num::of(&value) {
                    Some(n) => Value::Int(!numeric::to_int32(n)),
                    None => return Err(bad_unary("~", &value)),
                };
                self.stack.push(result)
            }
            OpCode::Increment | OpCode::Decrement => {
                let value = self.stack.pop()?;
                let delta = if op == OpCode::Increment { 1 } else { -1 };
                let result = match Num::of(&value) {
                    Some(n) => numeric::step(n, delta),
                    None => {
                        let symbol = if delta > 0 { "++" } else { "--" };
                        return Err(bad_unary(symbol, &value));
                    }
                };
                let result = self.rounded(result);
                self.stack.push(result)
            }
            _ => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                let result = self.binary_arithmetic(op, &a, &b)?;
                self.stack.push(result)
            }
        }
    }

    /// Apply a binary arithmetic or bitwise operator.
    pub(crate) fn binary_arithmetic(&self, op: OpCode, a: &Value, b: &Value) -> Result<Value> {
        if op == OpCode::Add {
            if let Some(joined) = concat(a, b) {
                return Ok(joined);
            }
        }
        let (Some(x), Some(y)) = (Num::of(a), Num::of(b)) else {
            return Err(unsupported(op, a, b));
        };
        let result = match op {
            OpCode::Add => numeric::arith(ArithOp::Add, x, y)?,
            OpCode::Subtract => numeric::arith(ArithOp::Sub, x, y)?,
            OpCode::Multiply => numeric::arith(ArithOp::Mul, x, y)?,
            OpCode::FloorDiv => numeric::arith(ArithOp::FloorDiv, x, y)?,
            OpCode::Mod => numeric::arith(ArithOp::Mod, x, y)?,
            OpCode::Divide => Value::Number(numeric::divide(x, y)?),
            OpCode::Power => Value::Number(numeric::power(x, y)),
            OpCode::BitwiseAnd => numeric::bitwise(BitOp::And, x, y)?,
            OpCode::BitwiseOr => numeric::bitwise(BitOp::Or, x, y)?,
            OpCode::BitwiseXor => numeric::bitwise(BitOp::Xor, x, y)?,
            OpCode::LeftShift => numeric::bitwise(BitOp::Shl, x, y)?,
            OpCode::RightShift => numeric::bitwise(BitOp::Shr, x, y)?,
            OpCode::LogicalRightShift => numeric::bitwise(BitOp::UShr, x, y)?,
            _ => {
                return Err(RuntimeError::internal(format!(
                    "execute_arithmetic: unexpected opcode {}",
                    op
                )));
            }
        };
        Ok(self.rounded(result))
    }

    /// Apply the configured precision to a float result.
    fn rounded(&self, value: Value) -> Value {
        match value {
            Value::Number(n) => self.number(n),
            other => other,
        }
    }
}

/// `+` on strings and arrays. A string on either side stringifies the
/// other operand; two arrays concatenate into a new array.
fn concat(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => {
            let mut joined = String::with_capacity(x.len() + y.len());
            joined.push_str(x);
            joined.push_str(y);
            Some(Value::from(joined))
        }
        (Value::String(_), _) | (_, Value::String(_)) => Some(Value::from(format!("{}{}", a, b))),
        (Value::Array(x), Value::Array(y)) => {
            let mut items = x.borrow().clone();
            items.extend(y.borrow().iter().cloned());
            Some(Value::array(items))
        }
        _ => None,
    }
}

fn bad_unary(symbol: &str, value: &Value) -> RuntimeError {
    RuntimeError::type_error(format!(
        "bad operand type for unary '{}': '{}'",
        symbol,
        value.type_name()
    ))
}

fn unsupported(op: OpCode, a: &Value, b: &Value) -> RuntimeError {
    let symbol = match op {
        OpCode::Add => "+",
        OpCode::Subtract => "-",
        OpCode::Multiply => "*",
        OpCode::Divide => "/",
        OpCode::FloorDiv => "//",
        OpCode::Mod => "%",
        OpCode::Power => "**",
        OpCode::BitwiseAnd => "&",
        OpCode::BitwiseOr => "|",
        OpCode::BitwiseXor => "^",
        OpCode::LeftShift => "<<",
        OpCode::RightShift => ">>",
        OpCode::LogicalRightShift => ">>>",
        _ => op.mnemonic(),
    };
    RuntimeError::type_error(format!(
        "unsupported operand types for '{}': '{}' and '{}'",
        symbol,
        a.type_name(),
        b.type_name()
    ))
}
