// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Buffer: a growable byte vector.

use std::cell::RefCell;
use std::fmt::Write;
use std::rc::Rc;

use crate::value::{Arity, Value};
use crate::vm::handlers::data::checked_index;
use crate::vm::{Result, RuntimeError, Vm};

use super::{byte_value, expect_index, int_from_usize, method, no_such_method, MethodSpec};

pub(crate) const METHODS: &[MethodSpec] = &[
    method("length", Arity::Exact(0)),
    method("get", Arity::Exact(1)),
    method("set", Arity::Exact(2)),
    method("push", Arity::Exact(1)),
    method("slice", Arity::Range(1, 2)),
    method("toArray", Arity::Exact(0)),
    method("toHex", Arity::Exact(0)),
    method("toString", Arity::Exact(0)),
];

type Bytes = Rc<RefCell<Vec<u8>>>;

/// `Buffer()`, `Buffer(size)` (zero filled), `Buffer(array)` or
/// `Buffer(string)` (its UTF-8 bytes).
pub(crate) fn construct(args: &[Value]) -> Result<Value> {
    let bytes = match args {
        [] => Vec::new(),
        [Value::String(s)] => s.as_bytes().to_vec(),
        [Value::Array(items)] => items
            .borrow()
            .iter()
            .map(byte_value)
            .collect::<Result<Vec<u8>>>()?,
        [size] => vec![0; expect_index("Buffer", size)?],
        _ => return Err(RuntimeError::arity("Buffer", Arity::Range(0, 1), args.len())),
    };
    Ok(Value::Buffer(Rc::new(RefCell::new(bytes))))
}

pub(crate) fn invoke(_vm: &mut Vm, bytes: &Bytes, name: &str, args: &[Value]) -> Result<Value> {
    match name {
        "length" => Ok(int_from_usize(bytes.borrow().len())),
        "get" => {
            let bytes = bytes.borrow();
            let i = checked_index(&args[0], bytes.len())?;
            Ok(Value::Int(i32::from(bytes[i])))
        }
        "set" => {
            let byte = byte_value(&args[1])?;
            let mut bytes = bytes.borrow_mut();
            let i = checked_index(&args[0], bytes.len())?;
            bytes[i] = byte;
            Ok(args[1].clone())
        }
        "push" => {
            let byte = byte_value(&args[0])?;
            let mut bytes = bytes.borrow_mut();
            bytes.push(byte);
            Ok(int_from_usize(bytes.len()))
        }
        "slice" => {
            let bytes = bytes.borrow();
            let start = expect_index(name, &args[0])?;
            let end = match args.get(1) {
                Some(end) => expect_index(name, end)?,
                None => bytes.len(),
            };
            if start > end || end > bytes.len() {
                return Err(RuntimeError::range(format!(
                    "slice {}..{} out of bounds for length {}",
                    start,
                    end,
                    bytes.len()
                )));
            }
            Ok(Value::Buffer(Rc::new(RefCell::new(bytes[start..end].to_vec()))))
        }
        "toArray" => Ok(Value::array(
            bytes.borrow().iter().map(|b| Value::Int(i32::from(*b))).collect(),
        )),
        "toHex" => {
            let bytes = bytes.borrow();
            let mut hex = String::with_capacity(bytes.len() * 2);
            for b in bytes.iter() {
                let _ = write!(hex, "{:02x}", b);
            }
            Ok(Value::from(hex))
        }
        "toString" => Ok(Value::from(String::from_utf8_lossy(&bytes.borrow()).into_owned())),
        _ => Err(no_such_method("Buffer", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(args: &[Value]) -> Bytes {
        match construct(args).unwrap() {
            Value::Buffer(bytes) => bytes,
            other => panic!("expected a buffer, got {:?}", other),
        }
    }

    #[test]
    fn test_constructors() {
        assert_eq!(*buffer(&[Value::Int(3)]).borrow(), vec![0, 0, 0]);
        assert_eq!(*buffer(&[Value::from("hi")]).borrow(), b"hi".to_vec());
        let from_array = buffer(&[Value::array(vec![Value::Int(1), Value::Int(255)])]);
        assert_eq!(*from_array.borrow(), vec![1, 255]);
        assert!(construct(&[Value::array(vec![Value::Int(256)])]).is_err());
    }

    #[test]
    fn test_hex_and_text() {
        let mut vm = Vm::new();
        let bytes = buffer(&[Value::from("AB")]);
        assert_eq!(
            invoke(&mut vm, &bytes, "toHex", &[]).unwrap(),
            Value::from("4142")
        );
        invoke(&mut vm, &bytes, "push", &[Value::Int(67)]).unwrap();
        assert_eq!(
            invoke(&mut vm, &bytes, "toString", &[]).unwrap(),
            Value::from("ABC")
        );
        assert!(invoke(&mut vm, &bytes, "push", &[Value::Int(-1)]).is_err());
    }
}
