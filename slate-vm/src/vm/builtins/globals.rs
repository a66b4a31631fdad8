// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Global built-in functions: output, conversion and math.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::Signed;

use crate::numeric::{self, integral_value, Num};
use crate::value::Value;
use crate::vm::handlers::comparison::compare;
use crate::vm::{Result, RuntimeError, Vm};

use super::{expect_number, expected, int_from_i64, length};

fn num<'a>(name: &str, value: &'a Value) -> Result<Num<'a>> {
    Num::of(value).ok_or_else(|| expected(name, "a number", value))
}

// ============================================================================
// Output and introspection
// ============================================================================

/// (print args...) - Write the arguments separated by spaces, then a newline.
pub fn builtin_print(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let line = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    vm.write_line(&line)?;
    Ok(Value::Null)
}

/// (type x) - Type tag of a value.
pub fn builtin_type(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    Ok(Value::from(args[0].type_name()))
}

/// (len x) - Length of a string, array, buffer, builder, range or object.
pub fn builtin_len(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    if let Value::Object(map) = &args[0] {
        return Ok(super::int_from_usize(map.borrow().len()));
    }
    length(&args[0])
        .map(super::int_from_usize)
        .ok_or_else(|| expected("len", "a sized value", &args[0]))
}

/// (str x) - String form of a value.
pub fn builtin_str(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::String(_) => Ok(args[0].clone()),
        other => Ok(Value::from(other.to_string())),
    }
}

/// (int x) - Convert to an integer, truncating floats toward zero.
pub fn builtin_int(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Int(_) | Value::BigInt(_) => Ok(args[0].clone()),
        Value::Number(n) if n.is_finite() => Ok(integral_value(n.trunc())),
        Value::Number(n) => Err(RuntimeError::range(format!(
            "cannot convert {} to int",
            numeric::format_number(*n)
        ))),
        Value::Boolean(b) => Ok(Value::Int(i32::from(*b))),
        Value::String(s) => parse_int(s.trim())
            .ok_or_else(|| RuntimeError::type_error(format!("cannot convert {:?} to int", s))),
        other => Err(expected("int", "a number, boolean or string", other)),
    }
}

fn parse_int(text: &str) -> Option<Value> {
    if let Ok(n) = text.parse::<i64>() {
        return Some(int_from_i64(n));
    }
    text.parse::<BigInt>().ok().map(Value::bigint)
}

/// (float x) - Convert to a Number.
pub fn builtin_float(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let n = match &args[0] {
        Value::Boolean(b) => f64::from(u8::from(*b)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| RuntimeError::type_error(format!("cannot convert {:?} to float", s)))?,
        other => num("float", other)?.to_f64(),
    };
    Ok(vm.number(n))
}

// ============================================================================
// Arithmetic
// ============================================================================

/// (abs x) - Absolute value, keeping the numeric variant.
pub fn builtin_abs(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    Ok(numeric::abs(num("abs", &args[0])?))
}

/// (sqrt x) - Square root.
pub fn builtin_sqrt(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    unary_float(vm, "sqrt", args, f64::sqrt)
}

/// (pow base exp) - Floating-point power.
pub fn builtin_pow(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let base = num("pow", &args[0])?;
    let exp = num("pow", &args[1])?;
    Ok(vm.number(numeric::power(base, exp)))
}

fn rounding(name: &str, value: &Value, f: fn(f64) -> f64) -> Result<Value> {
    match value {
        Value::Int(_) | Value::BigInt(_) => Ok(value.clone()),
        Value::Number(n) if n.is_finite() => Ok(integral_value(f(*n))),
        Value::Number(_) => Ok(value.clone()),
        other => Err(expected(name, "a number", other)),
    }
}

/// (floor x) - Largest integer not above x.
pub fn builtin_floor(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    rounding("floor", &args[0], f64::floor)
}

/// (ceil x) - Smallest integer not below x.
pub fn builtin_ceil(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    rounding("ceil", &args[0], f64::ceil)
}

/// (round x) - Nearest integer, halves away from zero.
pub fn builtin_round(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    rounding("round", &args[0], f64::round)
}

/// (sign x) - -1, 0 or 1 (NaN stays NaN).
pub fn builtin_sign(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    match num("sign", &args[0])? {
        Num::Int(n) => Ok(Value::Int(n.signum())),
        Num::Big(n) => Ok(Value::Int(if n.is_positive() {
            1
        } else if n.is_negative() {
            -1
        } else {
            0
        })),
        Num::Float(n) if n == 0.0 || n.is_nan() => Ok(vm.number(n)),
        Num::Float(n) => Ok(vm.number(n.signum())),
    }
}

fn extreme(vm: &Vm, name: &str, args: &[Value], wanted: Ordering) -> Result<Value> {
    let candidates: Vec<Value> = match args {
        [Value::Array(items)] => items.borrow().clone(),
        _ => args.to_vec(),
    };
    let mut iter = candidates.into_iter();
    let Some(mut best) = iter.next() else {
        return Err(RuntimeError::range(format!("'{}' of an empty array", name)));
    };
    for candidate in iter {
        if compare(&candidate, &best, name)? == Some(wanted) {
            best = candidate;
        }
    }
    if let Value::Number(n) = best {
        return Ok(vm.number(n));
    }
    Ok(best)
}

/// (min xs...) - Smallest argument, or smallest element of one array.
pub fn builtin_min(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    extreme(vm, "min", args, Ordering::Less)
}

/// (max xs...) - Largest argument, or largest element of one array.
pub fn builtin_max(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    extreme(vm, "max", args, Ordering::Greater)
}

/// (random) - Pseudo-random Number in [0, 1).
pub fn builtin_random(vm: &mut Vm, _args: &[Value]) -> Result<Value> {
    let n = vm.next_random();
    Ok(vm.number(n))
}

// ============================================================================
// Trigonometry, exponentials and logarithms
// ============================================================================

fn unary_float(vm: &Vm, name: &str, args: &[Value], f: fn(f64) -> f64) -> Result<Value> {
    let x = expect_number(name, &args[0])?;
    Ok(vm.number(f(x)))
}

/// (sin x)
pub fn builtin_sin(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    unary_float(vm, "sin", args, f64::sin)
}

/// (cos x)
pub fn builtin_cos(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    unary_float(vm, "cos", args, f64::cos)
}

/// (tan x)
pub fn builtin_tan(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    unary_float(vm, "tan", args, f64::tan)
}

/// (asin x)
pub fn builtin_asin(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    unary_float(vm, "asin", args, f64::asin)
}

/// (acos x)
pub fn builtin_acos(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    unary_float(vm, "acos", args, f64::acos)
}

/// (atan x)
pub fn builtin_atan(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    unary_float(vm, "atan", args, f64::atan)
}

/// (atan2 y x) - Angle of the point (x, y).
pub fn builtin_atan2(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let y = expect_number("atan2", &args[0])?;
    let x = expect_number("atan2", &args[1])?;
    Ok(vm.number(y.atan2(x)))
}

/// (exp x) - e raised to x.
pub fn builtin_exp(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    unary_float(vm, "exp", args, f64::exp)
}

/// (log x) - Natural logarithm.
pub fn builtin_log(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    unary_float(vm, "log", args, f64::ln)
}

/// (log10 x)
pub fn builtin_log10(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    unary_float(vm, "log10", args, f64::log10)
}

/// (log2 x)
pub fn builtin_log2(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    unary_float(vm, "log2", args, f64::log2)
}

/// (degrees x) - Radians to degrees.
pub fn builtin_degrees(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    unary_float(vm, "degrees", args, f64::to_degrees)
}

/// (radians x) - Degrees to radians.
pub fn builtin_radians(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    unary_float(vm, "radians", args, f64::to_radians)
}
