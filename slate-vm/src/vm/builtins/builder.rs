// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! StringBuilder: a mutable string. `append` and `clear` return the same
//! builder so calls chain.

use std::cell::RefCell;
use std::rc::Rc;

use crate::value::{Arity, Value};
use crate::vm::{Result, RuntimeError, Vm};

use super::{int_from_usize, method, no_such_method, string, MethodSpec};

pub(crate) const METHODS: &[MethodSpec] = &[
    method("append", Arity::Exact(1)),
    method("length", Arity::Exact(0)),
    method("clear", Arity::Exact(0)),
    method("toString", Arity::Exact(0)),
];

pub(crate) fn construct(args: &[Value]) -> Result<Value> {
    let text = match args {
        [] => String::new(),
        [initial] => initial.to_string(),
        _ => {
            return Err(RuntimeError::arity(
                "StringBuilder",
                Arity::Range(0, 1),
                args.len(),
            ))
        }
    };
    Ok(Value::StringBuilder(Rc::new(RefCell::new(text))))
}

pub(crate) fn invoke(
    _vm: &mut Vm,
    receiver: &Value,
    text: &Rc<RefCell<String>>,
    name: &str,
    args: &[Value],
) -> Result<Value> {
    match name {
        "append" => {
            let piece = args[0].to_string();
            text.borrow_mut().push_str(&piece);
            Ok(receiver.clone())
        }
        "length" => Ok(int_from_usize(string::char_len(&text.borrow()))),
        "clear" => {
            text.borrow_mut().clear();
            Ok(receiver.clone())
        }
        "toString" => Ok(Value::from(text.borrow().clone())),
        _ => Err(no_such_method("StringBuilder", name)),
    }
}
