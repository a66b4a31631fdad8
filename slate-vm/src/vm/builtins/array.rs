// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Array methods. Callbacks run through [`Vm::call_value`] on a snapshot
//! of the elements, so a callback may modify the array it walks.

use std::cell::RefCell;
use std::rc::Rc;

use crate::value::{Arity, IteratorState, Value};
use crate::vm::handlers::data::checked_index;
use crate::vm::{Result, RuntimeError, Vm};

use super::{expect_callable, expect_index, expect_str, int_from_usize, method, no_such_method, MethodSpec};

pub(crate) const METHODS: &[MethodSpec] = &[
    method("length", Arity::Exact(0)),
    method("isEmpty", Arity::Exact(0)),
    method("nonEmpty", Arity::Exact(0)),
    method("push", Arity::AtLeast(1)),
    method("pop", Arity::Exact(0)),
    method("get", Arity::Exact(1)),
    method("set", Arity::Exact(2)),
    method("contains", Arity::Exact(1)),
    method("indexOf", Arity::Exact(1)),
    method("join", Arity::Range(0, 1)),
    method("reverse", Arity::Exact(0)),
    method("slice", Arity::Range(1, 2)),
    method("first", Arity::Exact(0)),
    method("last", Arity::Exact(0)),
    method("map", Arity::Exact(1)),
    method("filter", Arity::Exact(1)),
    method("reduce", Arity::Range(1, 2)),
    method("forEach", Arity::Exact(1)),
    method("iterator", Arity::Exact(0)),
    method("toString", Arity::Exact(0)),
];

type Items = Rc<RefCell<Vec<Value>>>;

pub(crate) fn invoke(vm: &mut Vm, items: &Items, name: &str, args: &[Value]) -> Result<Value> {
    match name {
        "length" => Ok(int_from_usize(items.borrow().len())),
        "isEmpty" => Ok(Value::Boolean(items.borrow().is_empty())),
        "nonEmpty" => Ok(Value::Boolean(!items.borrow().is_empty())),
        "push" => {
            let mut items = items.borrow_mut();
            items.extend(args.iter().cloned());
            Ok(int_from_usize(items.len()))
        }
        "pop" => items
            .borrow_mut()
            .pop()
            .ok_or_else(|| RuntimeError::range("pop from an empty array")),
        "get" => {
            let items = items.borrow();
            let i = checked_index(&args[0], items.len())?;
            Ok(items[i].clone())
        }
        "set" => {
            let mut items = items.borrow_mut();
            let i = checked_index(&args[0], items.len())?;
            items[i] = args[1].clone();
            Ok(args[1].clone())
        }
        "contains" => Ok(Value::Boolean(
            items.borrow().iter().any(|item| item.equals(&args[0])),
        )),
        "indexOf" => Ok(items
            .borrow()
            .iter()
            .position(|item| item.equals(&args[0]))
            .map_or(Value::Int(-1), int_from_usize)),
        "join" => {
            let sep = match args.first() {
                Some(sep) => expect_str(name, sep)?.to_string(),
                None => ",".to_string(),
            };
            let joined = items
                .borrow()
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(&sep);
            Ok(Value::from(joined))
        }
        "reverse" => {
            let mut reversed = items.borrow().clone();
            reversed.reverse();
            Ok(Value::array(reversed))
        }
        "slice" => {
            let items = items.borrow();
            let start = expect_index(name, &args[0])?;
            let end = match args.get(1) {
                Some(end) => expect_index(name, end)?,
                None => items.len(),
            };
            if start > end || end > items.len() {
                return Err(RuntimeError::range(format!(
                    "slice {}..{} out of bounds for length {}",
                    start,
                    end,
                    items.len()
                )));
            }
            Ok(Value::array(items[start..end].to_vec()))
        }
        "first" => Ok(items.borrow().first().cloned().unwrap_or(Value::Null)),
        "last" => Ok(items.borrow().last().cloned().unwrap_or(Value::Null)),
        "map" => {
            let f = expect_callable(name, &args[0])?;
            let snapshot = items.borrow().clone();
            let mut mapped = Vec::with_capacity(snapshot.len());
            for item in snapshot {
                mapped.push(vm.call_value(f, &[item])?);
            }
            Ok(Value::array(mapped))
        }
        "filter" => {
            let f = expect_callable(name, &args[0])?;
            let snapshot = items.borrow().clone();
            let mut kept = Vec::new();
            for item in snapshot {
                if !vm.call_value(f, &[item.clone()])?.is_falsy() {
                    kept.push(item);
                }
            }
            Ok(Value::array(kept))
        }
        "reduce" => {
            let f = expect_callable(name, &args[0])?;
            let mut snapshot = items.borrow().clone().into_iter();
            let mut acc = match args.get(1) {
                Some(init) => init.clone(),
                None => snapshot
                    .next()
                    .ok_or_else(|| RuntimeError::type_error("reduce of an empty array with no initial value"))?,
            };
            for item in snapshot {
                acc = vm.call_value(f, &[acc, item])?;
            }
            Ok(acc)
        }
        "forEach" => {
            let f = expect_callable(name, &args[0])?;
            let snapshot = items.borrow().clone();
            for item in snapshot {
                vm.call_value(f, &[item])?;
            }
            Ok(Value::Null)
        }
        "iterator" => Ok(Value::Iterator(Rc::new(RefCell::new(IteratorState::Array {
            items: Rc::clone(items),
            index: 0,
        })))),
        "toString" => Ok(Value::from(Value::Array(Rc::clone(items)).to_string())),
        _ => Err(no_such_method("Array", name)),
    }
}
