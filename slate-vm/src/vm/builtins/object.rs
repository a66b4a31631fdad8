// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Object methods. A field holding a callable shadows these when called
//! as `obj.name(...)`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::value::{Arity, ObjectMap, Value};
use crate::vm::{Result, Vm};

use super::{int_from_usize, method, no_such_method, MethodSpec};

pub(crate) const METHODS: &[MethodSpec] = &[
    method("keys", Arity::Exact(0)),
    method("values", Arity::Exact(0)),
    method("hasKey", Arity::Exact(1)),
    method("remove", Arity::Exact(1)),
    method("length", Arity::Exact(0)),
    method("toString", Arity::Exact(0)),
];

fn key_of(value: &Value) -> Rc<str> {
    match value {
        Value::String(s) => Rc::clone(s),
        other => Rc::from(other.to_string()),
    }
}

pub(crate) fn invoke(
    _vm: &mut Vm,
    map: &Rc<RefCell<ObjectMap>>,
    name: &str,
    args: &[Value],
) -> Result<Value> {
    match name {
        "keys" => Ok(Value::array(
            map.borrow().keys().map(|k| Value::String(Rc::clone(k))).collect(),
        )),
        "values" => Ok(Value::array(map.borrow().values().cloned().collect())),
        "hasKey" => Ok(Value::Boolean(map.borrow().contains_key(&key_of(&args[0])))),
        "remove" => Ok(map
            .borrow_mut()
            .shift_remove(&key_of(&args[0]))
            .unwrap_or(Value::Undefined)),
        "length" => Ok(int_from_usize(map.borrow().len())),
        "toString" => Ok(Value::from(Value::Object(Rc::clone(map)).to_string())),
        _ => Err(no_such_method("Object", name)),
    }
}
