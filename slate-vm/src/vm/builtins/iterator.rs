// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Iterators: explicit `hasNext()` / `next()` cursors over arrays,
//! strings, ranges, buffers and object keys.

use std::cell::RefCell;
use std::rc::Rc;

use crate::value::{Arity, IteratorState, Value};
use crate::vm::{Result, RuntimeError, Vm};

use super::{int_from_i64, method, no_such_method, range, MethodSpec};

pub(crate) const METHODS: &[MethodSpec] = &[
    method("hasNext", Arity::Exact(0)),
    method("next", Arity::Exact(0)),
];

/// `Iterator(x)`: a cursor over any iterable value.
pub(crate) fn from_value(source: &Value) -> Result<Value> {
    let state = match source {
        Value::Iterator(_) => return Ok(source.clone()),
        Value::Array(items) => IteratorState::Array {
            items: Rc::clone(items),
            index: 0,
        },
        Value::String(text) => IteratorState::Chars {
            text: Rc::clone(text),
            offset: 0,
        },
        Value::Range(r) => range::iterator(r),
        Value::Buffer(bytes) => IteratorState::Bytes {
            bytes: Rc::clone(bytes),
            index: 0,
        },
        Value::Object(map) => IteratorState::Keys {
            keys: map.borrow().keys().cloned().collect(),
            index: 0,
        },
        other => {
            return Err(RuntimeError::type_error(format!(
                "'{}' is not iterable",
                other.type_name()
            )))
        }
    };
    Ok(Value::Iterator(Rc::new(RefCell::new(state))))
}

pub(crate) fn invoke(
    _vm: &mut Vm,
    state: &Rc<RefCell<IteratorState>>,
    name: &str,
    _args: &[Value],
) -> Result<Value> {
    match name {
        "hasNext" => Ok(Value::Boolean(state.borrow().has_next())),
        "next" => state
            .borrow_mut()
            .advance()
            .ok_or_else(|| RuntimeError::range("iterator is exhausted")),
        _ => Err(no_such_method("Iterator", name)),
    }
}

impl IteratorState {
    /// Whether `advance` would yield a value.
    pub fn has_next(&self) -> bool {
        match self {
            IteratorState::Array { items, index } => *index < items.borrow().len(),
            IteratorState::IntRange {
                next,
                end,
                step,
                exclusive,
            } => in_bounds(*next < *end, *next > *end, *next == *end, *step > 0, *exclusive),
            IteratorState::FloatRange {
                next,
                end,
                step,
                exclusive,
            } => in_bounds(*next < *end, *next > *end, *next == *end, *step > 0.0, *exclusive),
            IteratorState::Chars { text, offset } => *offset < text.len(),
            IteratorState::Bytes { bytes, index } => *index < bytes.borrow().len(),
            IteratorState::Keys { keys, index } => *index < keys.len(),
        }
    }

    /// Yield the next value and move past it.
    pub fn advance(&mut self) -> Option<Value> {
        if !self.has_next() {
            return None;
        }
        match self {
            IteratorState::Array { items, index } => {
                let value = items.borrow().get(*index).cloned();
                *index += 1;
                value
            }
            IteratorState::IntRange {
                next,
                end,
                step,
                exclusive,
            } => {
                let value = int_from_i64(*next);
                match next.checked_add(*step) {
                    Some(n) => *next = n,
                    // Walking past i64 ends the range.
                    None => {
                        *next = *end;
                        *exclusive = true;
                    }
                }
                Some(value)
            }
            IteratorState::FloatRange { next, step, .. } => {
                let value = Value::Number(*next);
                *next += *step;
                Some(value)
            }
            IteratorState::Chars { text, offset } => {
                let ch = text[*offset..].chars().next()?;
                *offset += ch.len_utf8();
                Some(Value::from(ch.to_string()))
            }
            IteratorState::Bytes { bytes, index } => {
                let value = bytes.borrow().get(*index).map(|b| Value::Int(i32::from(*b)));
                *index += 1;
                value
            }
            IteratorState::Keys { keys, index } => {
                let value = keys.get(*index).map(|k| Value::String(Rc::clone(k)));
                *index += 1;
                value
            }
        }
    }
}

fn in_bounds(below: bool, above: bool, at: bool, ascending: bool, exclusive: bool) -> bool {
    let before_end = if ascending { below } else { above };
    before_end || (at && !exclusive)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(value: Value) -> Vec<Value> {
        let Value::Iterator(state) = value else {
            panic!("expected an iterator");
        };
        let mut out = Vec::new();
        while let Some(v) = state.borrow_mut().advance() {
            out.push(v);
        }
        out
    }

    #[test]
    fn test_chars_walk_unicode() {
        let values = drain(from_value(&Value::from("añb")).unwrap());
        assert_eq!(values, vec![Value::from("a"), Value::from("ñ"), Value::from("b")]);
    }

    #[test]
    fn test_object_keys_in_insertion_order() {
        let mut map = crate::value::ObjectMap::new();
        map.insert(Rc::from("z"), Value::Int(1));
        map.insert(Rc::from("a"), Value::Int(2));
        let values = drain(from_value(&Value::object(map)).unwrap());
        assert_eq!(values, vec![Value::from("z"), Value::from("a")]);
    }

    #[test]
    fn test_array_iterator_sees_appends() {
        let array = Value::array(vec![Value::Int(1)]);
        let iter = from_value(&array).unwrap();
        if let Value::Array(items) = &array {
            items.borrow_mut().push(Value::Int(2));
        }
        assert_eq!(drain(iter), vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_not_iterable() {
        assert!(from_value(&Value::Int(3)).is_err());
    }
}
