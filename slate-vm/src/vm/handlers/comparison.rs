// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Comparison and logical opcode handlers.

use std::cmp::Ordering;

use crate::numeric::{self, Num};
use crate::opcode::OpCode;
use crate::value::Value;
use crate::vm::builtins::range;
use crate::vm::{Result, RuntimeError, Vm};

impl Vm {
    /// Execute a comparison or logical opcode.
    pub(crate) fn execute_comparison(&mut self, op: OpCode) -> Result<()> {
        if op == OpCode::Not {
            let value = self.stack.pop()?;
            return self.stack.push(Value::Boolean(value.is_falsy()));
        }
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        let result = match op {
            OpCode::Equal => Value::Boolean(a.equals(&b)),
            OpCode::NotEqual => Value::Boolean(!a.equals(&b)),
            OpCode::Less => Value::Boolean(compare(&a, &b, "<")? == Some(Ordering::Less)),
            OpCode::LessEqual => Value::Boolean(matches!(
                compare(&a, &b, "<=")?,
                Some(Ordering::Less | Ordering::Equal)
            )),
            OpCode::Greater => Value::Boolean(compare(&a, &b, ">")? == Some(Ordering::Greater)),
            OpCode::GreaterEqual => Value::Boolean(matches!(
                compare(&a, &b, ">=")?,
                Some(Ordering::Greater | Ordering::Equal)
            )),
            // Eager forms: both operands are already evaluated.
            OpCode::And => {
                if a.is_falsy() {
                    a
                } else {
                    b
                }
            }
            OpCode::Or => {
                if a.is_falsy() {
                    b
                } else {
                    a
                }
            }
            OpCode::In => Value::Boolean(contains(&b, &a)?),
            OpCode::InstanceOf => match b {
                Value::Class(class) => Value::Boolean(a.class() == Some(class)),
                other => {
                    return Err(RuntimeError::type_error(format!(
                        "right operand of 'instanceof' must be a class, got '{}'",
                        other.type_name()
                    )));
                }
            },
            _ => {
                return Err(RuntimeError::internal(format!(
                    "execute_comparison: unexpected opcode {}",
                    op
                )));
            }
        };
        self.stack.push(result)
    }
}

/// Order two values: numbers numerically, strings lexicographically,
/// date/time values of the same class chronologically. `None` for NaN.
pub(crate) fn compare(a: &Value, b: &Value, symbol: &str) -> Result<Option<Ordering>> {
    if let (Some(x), Some(y)) = (Num::of(a), Num::of(b)) {
        return Ok(numeric::compare(x, y));
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Ok(Some(x.cmp(y))),
        (Value::Temporal(x), Value::Temporal(y)) if x.class() == y.class() => {
            match (x.ordering_key(), y.ordering_key()) {
                (Some(kx), Some(ky)) => Ok(Some(kx.cmp(&ky))),
                _ => Err(not_comparable(a, b, symbol)),
            }
        }
        _ => Err(not_comparable(a, b, symbol)),
    }
}

fn not_comparable(a: &Value, b: &Value, symbol: &str) -> RuntimeError {
    RuntimeError::type_error(format!(
        "cannot compare '{}' and '{}' with '{}'",
        a.type_name(),
        b.type_name(),
        symbol
    ))
}

/// `needle in haystack`.
fn contains(haystack: &Value, needle: &Value) -> Result<bool> {
    match haystack {
        Value::Object(map) => Ok(match needle {
            Value::String(key) => map.borrow().contains_key(key),
            other => map.borrow().contains_key(other.to_string().as_str()),
        }),
        Value::Array(items) => Ok(items.borrow().iter().any(|item| item.equals(needle))),
        Value::String(text) => match needle {
            Value::String(part) => Ok(text.contains(&**part)),
            other => Err(RuntimeError::type_error(format!(
                "'in <string>' requires a string on the left, got '{}'",
                other.type_name()
            ))),
        },
        Value::Range(r) => Ok(range::contains(r, needle)),
        other => Err(RuntimeError::type_error(format!(
            "'in' needs an object, array, string or range on the right, got '{}'",
            other.type_name()
        ))),
    }
}
