// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! String methods. Positions count characters, not bytes.

use std::cell::RefCell;
use std::rc::Rc;

use crate::value::{Arity, IteratorState, Value};
use crate::vm::{Result, RuntimeError, Vm};

use super::{expect_index, expect_str, int_from_usize, method, no_such_method, MethodSpec};

pub(crate) const METHODS: &[MethodSpec] = &[
    method("length", Arity::Exact(0)),
    method("isEmpty", Arity::Exact(0)),
    method("nonEmpty", Arity::Exact(0)),
    method("toUpper", Arity::Exact(0)),
    method("toLower", Arity::Exact(0)),
    method("trim", Arity::Exact(0)),
    method("contains", Arity::Exact(1)),
    method("startsWith", Arity::Exact(1)),
    method("endsWith", Arity::Exact(1)),
    method("indexOf", Arity::Exact(1)),
    method("substring", Arity::Range(1, 2)),
    method("split", Arity::Range(0, 1)),
    method("replace", Arity::Exact(2)),
    method("repeat", Arity::Exact(1)),
    method("charAt", Arity::Exact(1)),
    method("iterator", Arity::Exact(0)),
    method("toString", Arity::Exact(0)),
    method("equals", Arity::Exact(1)),
];

pub(crate) fn char_len(s: &str) -> usize {
    if s.is_ascii() {
        s.len()
    } else {
        s.chars().count()
    }
}

/// Byte offset of character `index`; `index == len` maps to the end.
fn byte_offset(s: &str, index: usize) -> Option<usize> {
    if s.is_ascii() {
        return (index <= s.len()).then_some(index);
    }
    s.char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(s.len()))
        .nth(index)
}

fn out_of_bounds(index: usize, len: usize) -> RuntimeError {
    RuntimeError::range(format!("index {} out of bounds for length {}", index, len))
}

pub(crate) fn invoke(_vm: &mut Vm, s: &Rc<str>, name: &str, args: &[Value]) -> Result<Value> {
    match name {
        "length" => Ok(int_from_usize(char_len(s))),
        "isEmpty" => Ok(Value::Boolean(s.is_empty())),
        "nonEmpty" => Ok(Value::Boolean(!s.is_empty())),
        "toUpper" => Ok(Value::from(s.to_uppercase())),
        "toLower" => Ok(Value::from(s.to_lowercase())),
        "trim" => Ok(Value::from(s.trim())),
        "contains" => Ok(Value::Boolean(s.contains(&**expect_str(name, &args[0])?))),
        "startsWith" => Ok(Value::Boolean(s.starts_with(&**expect_str(name, &args[0])?))),
        "endsWith" => Ok(Value::Boolean(s.ends_with(&**expect_str(name, &args[0])?))),
        "indexOf" => {
            let needle = expect_str(name, &args[0])?;
            Ok(match s.find(&**needle) {
                Some(offset) => int_from_usize(char_len(&s[..offset])),
                None => Value::Int(-1),
            })
        }
        "substring" => {
            let len = char_len(s);
            let start = expect_index(name, &args[0])?;
            let end = match args.get(1) {
                Some(end) => expect_index(name, end)?,
                None => len,
            };
            if end > len {
                return Err(out_of_bounds(end, len));
            }
            if start > end {
                return Err(RuntimeError::range(format!(
                    "substring start {} is after end {}",
                    start, end
                )));
            }
            match (byte_offset(s, start), byte_offset(s, end)) {
                (Some(from), Some(to)) => Ok(Value::from(&s[from..to])),
                _ => Err(out_of_bounds(end, len)),
            }
        }
        "split" => {
            let parts: Vec<Value> = match args.first() {
                Some(sep) => {
                    let sep = expect_str(name, sep)?;
                    if sep.is_empty() {
                        chars(s)
                    } else {
                        s.split(&**sep).map(Value::from).collect()
                    }
                }
                None => chars(s),
            };
            Ok(Value::array(parts))
        }
        "replace" => {
            let from = expect_str(name, &args[0])?;
            let to = expect_str(name, &args[1])?;
            if from.is_empty() {
                return Ok(Value::String(Rc::clone(s)));
            }
            Ok(Value::from(s.replace(&**from, to)))
        }
        "repeat" => {
            let times = expect_index(name, &args[0])?;
            Ok(Value::from(s.repeat(times)))
        }
        "charAt" => {
            let len = char_len(s);
            let i = expect_index(name, &args[0])?;
            s.chars()
                .nth(i)
                .map(|ch| Value::from(ch.to_string()))
                .ok_or_else(|| out_of_bounds(i, len))
        }
        "iterator" => Ok(Value::Iterator(Rc::new(RefCell::new(IteratorState::Chars {
            text: Rc::clone(s),
            offset: 0,
        })))),
        "toString" => Ok(Value::String(Rc::clone(s))),
        "equals" => Ok(Value::Boolean(matches!(&args[0], Value::String(other) if other == s))),
        _ => Err(no_such_method("String", name)),
    }
}

fn chars(s: &str) -> Vec<Value> {
    s.chars().map(|ch| Value::from(ch.to_string())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(s: &str, name: &str, args: &[Value]) -> Result<Value> {
        let mut vm = Vm::new();
        invoke(&mut vm, &Rc::from(s), name, args)
    }

    #[test]
    fn test_positions_count_characters() {
        assert_eq!(char_len("héllo"), 5);
        assert_eq!(byte_offset("héllo", 2), Some(3));
        assert_eq!(byte_offset("héllo", 5), Some(6));
        assert_eq!(byte_offset("héllo", 6), None);
        assert_eq!(
            call("héllo", "substring", &[Value::Int(1), Value::Int(3)]).unwrap(),
            Value::from("él")
        );
        assert_eq!(
            call("héllo", "indexOf", &[Value::from("l")]).unwrap(),
            Value::Int(2)
        );
    }

    #[test]
    fn test_substring_bounds() {
        assert!(call("abc", "substring", &[Value::Int(1), Value::Int(4)]).is_err());
        assert!(call("abc", "substring", &[Value::Int(2), Value::Int(1)]).is_err());
        assert_eq!(
            call("abc", "substring", &[Value::Int(1)]).unwrap(),
            Value::from("bc")
        );
    }

    #[test]
    fn test_split_and_replace() {
        let parts = call("a,b,c", "split", &[Value::from(",")]).unwrap();
        assert_eq!(parts.to_string(), "[\"a\", \"b\", \"c\"]");
        let chars = call("ab", "split", &[]).unwrap();
        assert_eq!(chars.to_string(), "[\"a\", \"b\"]");
        assert_eq!(
            call("aXbX", "replace", &[Value::from("X"), Value::from("-")]).unwrap(),
            Value::from("a-b-")
        );
    }
}
