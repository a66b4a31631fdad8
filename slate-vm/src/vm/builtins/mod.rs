// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Built-in functions and classes.
//!
//! Every built-in class declares its methods in a [`MethodSpec`] table.
//! The tables decide whether `value.name` yields a bound method and check
//! argument counts before the class's `invoke` runs.

pub mod array;
pub mod buffer;
pub mod builder;
pub mod globals;
pub mod iterator;
pub mod object;
pub mod range;
pub mod string;
pub mod temporal;

use std::rc::Rc;

use num_traits::ToPrimitive;

use crate::value::{Arity, ClassId, Native, ObjectMap, Value};
use crate::vm::{Global, Globals, Result, RuntimeError, Vm};

/// A method a built-in class responds to.
#[derive(Debug, Clone, Copy)]
pub struct MethodSpec {
    pub name: &'static str,
    pub arity: Arity,
}

pub(crate) const fn method(name: &'static str, arity: Arity) -> MethodSpec {
    MethodSpec { name, arity }
}

/// Signature of a built-in global function.
type BuiltinFn = fn(&mut Vm, &[Value]) -> Result<Value>;

// ============================================================================
// Registration
// ============================================================================

fn define(globals: &mut Globals, name: &str, arity: Arity, func: BuiltinFn) {
    let native = Value::Native(Rc::new(Native::new(name, arity, func)));
    globals.insert(
        Rc::from(name),
        Global {
            value: native,
            immutable: false,
            private: true,
        },
    );
}

/// Seed a namespace with every built-in function and class. Built-ins are
/// private so they never appear in a module's exports.
pub fn install(globals: &mut Globals) {
    use globals::*;

    // Output and introspection
    define(globals, "print", Arity::AtLeast(0), builtin_print);
    define(globals, "type", Arity::Exact(1), builtin_type);
    define(globals, "len", Arity::Exact(1), builtin_len);
    define(globals, "str", Arity::Exact(1), builtin_str);
    define(globals, "int", Arity::Exact(1), builtin_int);
    define(globals, "float", Arity::Exact(1), builtin_float);

    // Arithmetic
    define(globals, "abs", Arity::Exact(1), builtin_abs);
    define(globals, "sqrt", Arity::Exact(1), builtin_sqrt);
    define(globals, "pow", Arity::Exact(2), builtin_pow);
    define(globals, "floor", Arity::Exact(1), builtin_floor);
    define(globals, "ceil", Arity::Exact(1), builtin_ceil);
    define(globals, "round", Arity::Exact(1), builtin_round);
    define(globals, "sign", Arity::Exact(1), builtin_sign);
    define(globals, "min", Arity::AtLeast(1), builtin_min);
    define(globals, "max", Arity::AtLeast(1), builtin_max);
    define(globals, "random", Arity::Exact(0), builtin_random);

    // Trigonometry, exponentials and logarithms
    define(globals, "sin", Arity::Exact(1), builtin_sin);
    define(globals, "cos", Arity::Exact(1), builtin_cos);
    define(globals, "tan", Arity::Exact(1), builtin_tan);
    define(globals, "asin", Arity::Exact(1), builtin_asin);
    define(globals, "acos", Arity::Exact(1), builtin_acos);
    define(globals, "atan", Arity::Exact(1), builtin_atan);
    define(globals, "atan2", Arity::Exact(2), builtin_atan2);
    define(globals, "exp", Arity::Exact(1), builtin_exp);
    define(globals, "log", Arity::Exact(1), builtin_log);
    define(globals, "log10", Arity::Exact(1), builtin_log10);
    define(globals, "log2", Arity::Exact(1), builtin_log2);
    define(globals, "degrees", Arity::Exact(1), builtin_degrees);
    define(globals, "radians", Arity::Exact(1), builtin_radians);

    // Classes
    for class in ClassId::ALL {
        globals.insert(
            Rc::from(class.name()),
            Global {
                value: Value::Class(class),
                immutable: true,
                private: true,
            },
        );
    }
}

// ============================================================================
// Method tables
// ============================================================================

/// Instance methods of a class.
pub(crate) fn methods(class: ClassId) -> &'static [MethodSpec] {
    match class {
        ClassId::String => string::METHODS,
        ClassId::Array => array::METHODS,
        ClassId::Object => object::METHODS,
        ClassId::Range => range::METHODS,
        ClassId::Iterator => iterator::METHODS,
        ClassId::StringBuilder => builder::METHODS,
        ClassId::Buffer => buffer::METHODS,
        _ => temporal::methods(class),
    }
}

fn find(table: &'static [MethodSpec], name: &str) -> Option<&'static MethodSpec> {
    table.iter().find(|spec| spec.name == name)
}

/// Whether `value.name(...)` resolves to something callable.
pub(crate) fn has_method(value: &Value, name: &str) -> bool {
    match value {
        Value::Class(class) => find(temporal::statics(*class), name).is_some(),
        _ => {
            name == "toString"
                || value
                    .class()
                    .is_some_and(|class| find(methods(class), name).is_some())
        }
    }
}

impl Vm {
    /// Invoke `receiver.name(args)`.
    pub fn invoke_method(&mut self, receiver: &Value, name: &str, args: &[Value]) -> Result<Value> {
        if let Value::Object(map) = receiver {
            let field = map.borrow().get(name).cloned();
            if let Some(field) = field.filter(Value::is_callable) {
                return self.call_value(&field, args);
            }
        }
        if let Value::Class(class) = receiver {
            let Some(spec) = find(temporal::statics(*class), name) else {
                return Err(RuntimeError::type_error(format!(
                    "class '{}' has no method '{}'",
                    class.name(),
                    name
                )));
            };
            check_arity(spec, args)?;
            return temporal::call_static(self, *class, name, args);
        }

        let spec = receiver.class().and_then(|class| find(methods(class), name));
        let Some(spec) = spec else {
            if name == "toString" && args.is_empty() {
                return Ok(Value::from(receiver.to_string()));
            }
            return Err(RuntimeError::type_error(format!(
                "'{}' has no method '{}'",
                receiver.type_name(),
                name
            )));
        };
        check_arity(spec, args)?;
        match receiver {
            Value::String(s) => string::invoke(self, s, name, args),
            Value::Array(items) => array::invoke(self, items, name, args),
            Value::Object(map) => object::invoke(self, map, name, args),
            Value::Range(r) => range::invoke(self, r, name, args),
            Value::Iterator(state) => iterator::invoke(self, state, name, args),
            Value::StringBuilder(text) => builder::invoke(self, receiver, text, name, args),
            Value::Buffer(bytes) => buffer::invoke(self, bytes, name, args),
            Value::Temporal(t) => temporal::invoke(self, t, name, args),
            other => Err(RuntimeError::internal(format!(
                "no method table for '{}'",
                other.type_name()
            ))),
        }
    }
}

fn check_arity(spec: &MethodSpec, args: &[Value]) -> Result<()> {
    if spec.arity.accepts(args.len()) {
        Ok(())
    } else {
        Err(RuntimeError::arity(spec.name, spec.arity, args.len()))
    }
}

pub(crate) fn no_such_method(class: &str, name: &str) -> RuntimeError {
    RuntimeError::internal(format!("'{}' listed but not implemented on {}", name, class))
}

// ============================================================================
// Constructors
// ============================================================================

/// Call a class: `String(x)`, `Buffer(4)`, `LocalDate(2024, 2, 29)`...
pub(crate) fn construct(vm: &mut Vm, class: ClassId, args: &[Value]) -> Result<Value> {
    match class {
        ClassId::String => match args {
            [] => Ok(Value::from("")),
            [value] => Ok(Value::from(value.to_string())),
            _ => Err(RuntimeError::arity("String", Arity::Range(0, 1), args.len())),
        },
        ClassId::Array => Ok(Value::array(args.to_vec())),
        ClassId::Object => match args {
            [] => Ok(Value::object(ObjectMap::new())),
            _ => Err(RuntimeError::arity("Object", Arity::Exact(0), args.len())),
        },
        ClassId::Range => match args {
            [start, end] => range::make(start.clone(), end.clone(), None, false),
            [start, end, step] => {
                range::make(start.clone(), end.clone(), Some(step.clone()), false)
            }
            _ => Err(RuntimeError::arity("Range", Arity::Range(2, 3), args.len())),
        },
        ClassId::Iterator => match args {
            [source] => iterator::from_value(source),
            _ => Err(RuntimeError::arity("Iterator", Arity::Exact(1), args.len())),
        },
        ClassId::StringBuilder => builder::construct(args),
        ClassId::Buffer => buffer::construct(args),
        _ => temporal::construct(vm, class, args),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Length of a sized value, if it has one.
pub(crate) fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(string::char_len(s)),
        Value::Array(items) => Some(items.borrow().len()),
        Value::Buffer(bytes) => Some(bytes.borrow().len()),
        Value::StringBuilder(text) => Some(string::char_len(&text.borrow())),
        Value::Range(r) => Some(range::count(r)),
        _ => None,
    }
}

/// An Int, or a BigInt when `n` does not fit.
pub(crate) fn int_from_usize(n: usize) -> Value {
    int_from_i64(n as i64)
}

pub(crate) fn int_from_i64(n: i64) -> Value {
    Value::from(n)
}

/// Check that a value fits in a byte.
pub(crate) fn byte_value(value: &Value) -> Result<u8> {
    match value {
        Value::Int(n) => u8::try_from(*n)
            .map_err(|_| RuntimeError::range(format!("byte value {} out of range 0..255", n))),
        other => Err(RuntimeError::type_error(format!(
            "byte value must be an int, got '{}'",
            other.type_name()
        ))),
    }
}

/// Integer argument, accepting integral floats.
pub(crate) fn expect_int(method: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Int(n) => Ok(i64::from(*n)),
        Value::BigInt(n) => n.to_i64().ok_or_else(|| {
            RuntimeError::range(format!("'{}' argument {} is out of range", method, n))
        }),
        Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Ok(*n as i64),
        other => Err(expected(method, "an integer", other)),
    }
}

/// Non-negative integer argument (counts and positions).
pub(crate) fn expect_index(method: &str, value: &Value) -> Result<usize> {
    let n = expect_int(method, value)?;
    usize::try_from(n)
        .map_err(|_| RuntimeError::range(format!("'{}' argument must not be negative, got {}", method, n)))
}

pub(crate) fn expect_number(method: &str, value: &Value) -> Result<f64> {
    match crate::numeric::Num::of(value) {
        Some(n) => Ok(n.to_f64()),
        None => Err(expected(method, "a number", value)),
    }
}

pub(crate) fn expect_str<'a>(method: &str, value: &'a Value) -> Result<&'a Rc<str>> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(expected(method, "a string", other)),
    }
}

pub(crate) fn expect_callable<'a>(method: &str, value: &'a Value) -> Result<&'a Value> {
    if value.is_callable() {
        Ok(value)
    } else {
        Err(expected(method, "a function", value))
    }
}

pub(crate) fn expected(method: &str, what: &str, got: &Value) -> RuntimeError {
    RuntimeError::type_error(format!(
        "'{}' expects {}, got '{}'",
        method,
        what,
        got.type_name()
    ))
}
