// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Data opcode handlers: properties, indexing and literal construction.

use std::rc::Rc;

use crate::opcode::{OpCode, RANGE_EXCLUSIVE, RANGE_HAS_STEP};
use crate::value::{BoundMethod, ObjectMap, Value};
use crate::vm::builtins::{self, range};
use crate::vm::{Result, RuntimeError, Vm};

impl Vm {
    /// Execute a data opcode.
    pub(crate) fn execute_data(&mut self, op: OpCode) -> Result<()> {
        match op {
            OpCode::GetProperty => {
                let name = self.read_name()?;
                let target = self.stack.pop()?;
                let value = get_property(&target, &name)?;
                self.stack.push(value)
            }
            OpCode::SetProperty => {
                let name = self.read_name()?;
                let value = self.stack.pop()?;
                let target = self.stack.pop()?;
                match &target {
                    Value::Object(map) => {
                        map.borrow_mut().insert(name, value.clone());
                    }
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "cannot set property '{}' on '{}'",
                            name,
                            other.type_name()
                        )));
                    }
                }
                self.stack.push(value)
            }
            OpCode::GetIndex => {
                let key = self.stack.pop()?;
                let target = self.stack.pop()?;
                let value = self.index_value(&target, &key)?;
                self.stack.push(value)
            }
            OpCode::SetIndex => {
                let value = self.stack.pop()?;
                let key = self.stack.pop()?;
                let target = self.stack.pop()?;
                set_index(&target, &key, value.clone())?;
                self.stack.push(value)
            }
            OpCode::BuildArray => {
                let count = usize::from(self.read_u16()?);
                let items = self.stack.pop_n(count)?;
                self.stack.push(Value::array(items))
            }
            OpCode::BuildObject => {
                let count = usize::from(self.read_u16()?);
                let flat = self.stack.pop_n(count * 2)?;
                let mut map = ObjectMap::with_capacity(count);
                let mut entries = flat.into_iter();
                while let (Some(key), Some(value)) = (entries.next(), entries.next()) {
                    map.insert(property_key(&key), value);
                }
                self.stack.push(Value::object(map))
            }
            OpCode::BuildRange => {
                let flags = self.read_byte()?;
                let step = if flags & RANGE_HAS_STEP != 0 {
                    Some(self.stack.pop()?)
                } else {
                    None
                };
                let end = self.stack.pop()?;
                let start = self.stack.pop()?;
                let value = range::make(start, end, step, flags & RANGE_EXCLUSIVE != 0)?;
                self.stack.push(value)
            }
            _ => Err(RuntimeError::internal(format!(
                "execute_data: unexpected opcode {}",
                op
            ))),
        }
    }

    /// `target(key)` / `target[key]` read.
    pub(crate) fn index_value(&self, target: &Value, key: &Value) -> Result<Value> {
        match target {
            Value::Array(items) => {
                let items = items.borrow();
                let i = checked_index(key, items.len())?;
                Ok(items[i].clone())
            }
            Value::String(text) => {
                if text.is_ascii() {
                    let i = checked_index(key, text.len())?;
                    return Ok(Value::from(&text[i..i + 1]));
                }
                let count = text.chars().count();
                let i = checked_index(key, count)?;
                let ch = text.chars().nth(i).unwrap_or_default();
                Ok(Value::from(ch.to_string()))
            }
            Value::Buffer(bytes) => {
                let bytes = bytes.borrow();
                let i = checked_index(key, bytes.len())?;
                Ok(Value::Int(i32::from(bytes[i])))
            }
            Value::Object(map) => Ok(map
                .borrow()
                .get(property_key(key).as_ref())
                .cloned()
                .unwrap_or(Value::Undefined)),
            other => Err(RuntimeError::type_error(format!(
                "'{}' is not indexable",
                other.type_name()
            ))),
        }
    }
}

/// Read `target.name`.
pub(crate) fn get_property(target: &Value, name: &str) -> Result<Value> {
    match target {
        Value::Object(map) => {
            return Ok(map.borrow().get(name).cloned().unwrap_or(Value::Undefined));
        }
        Value::Null | Value::Undefined => {
            return Err(RuntimeError::type_error(format!(
                "cannot read property '{}' of {}",
                name,
                target.type_name()
            )));
        }
        _ => {}
    }
    if name == "length" {
        if let Some(len) = builtins::length(target) {
            return Ok(builtins::int_from_usize(len));
        }
    }
    if builtins::has_method(target, name) {
        return Ok(Value::BoundMethod(Rc::new(BoundMethod {
            receiver: target.clone(),
            name: Rc::from(name),
        })));
    }
    Err(RuntimeError::type_error(format!(
        "'{}' has no property '{}'",
        target.type_name(),
        name
    )))
}

fn set_index(target: &Value, key: &Value, value: Value) -> Result<()> {
    match target {
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            let i = checked_index(key, items.len())?;
            items[i] = value;
            Ok(())
        }
        Value::Buffer(bytes) => {
            let mut bytes = bytes.borrow_mut();
            let i = checked_index(key, bytes.len())?;
            bytes[i] = builtins::byte_value(&value)?;
            Ok(())
        }
        Value::Object(map) => {
            map.borrow_mut().insert(property_key(key), value);
            Ok(())
        }
        Value::String(_) => Err(RuntimeError::type_error("strings are immutable")),
        other => Err(RuntimeError::type_error(format!(
            "'{}' does not support index assignment",
            other.type_name()
        ))),
    }
}

/// Object keys are strings; other keys use their display form.
fn property_key(key: &Value) -> Rc<str> {
    match key {
        Value::String(s) => Rc::clone(s),
        other => Rc::from(other.to_string()),
    }
}

/// Validate an index against a length.
pub(crate) fn checked_index(key: &Value, len: usize) -> Result<usize> {
    let index = match key {
        Value::Int(n) => i64::from(*n),
        Value::Number(n) if n.fract() == 0.0 && n.is_finite() => *n as i64,
        Value::BigInt(_) => -1,
        other => {
            return Err(RuntimeError::type_error(format!(
                "index must be an integer, got '{}'",
                other.type_name()
            )));
        }
    };
    match usize::try_from(index) {
        Ok(i) if i < len => Ok(i),
        _ => Err(RuntimeError::range(format!(
            "index {} out of bounds for length {}",
            key, len
        ))),
    }
}
