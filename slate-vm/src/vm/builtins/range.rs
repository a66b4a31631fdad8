// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Numeric ranges: `a..b`, `a..<b`, `a..b step s`.
//!
//! Ranges whose endpoints and step all fit in `i64` are walked exactly;
//! anything else (floats, huge BigInts) is walked in `f64`.

use std::cell::RefCell;
use std::rc::Rc;

use num_traits::ToPrimitive;

use crate::numeric::{self, Num};
use crate::value::{Arity, IteratorState, RangeValue, Value};
use crate::vm::{Result, RuntimeError, Vm};

use super::{int_from_usize, method, no_such_method, MethodSpec};

pub(crate) const METHODS: &[MethodSpec] = &[
    method("start", Arity::Exact(0)),
    method("end", Arity::Exact(0)),
    method("step", Arity::Exact(0)),
    method("length", Arity::Exact(0)),
    method("isEmpty", Arity::Exact(0)),
    method("nonEmpty", Arity::Exact(0)),
    method("contains", Arity::Exact(1)),
    method("toArray", Arity::Exact(0)),
    method("iterator", Arity::Exact(0)),
    method("toString", Arity::Exact(0)),
];

/// `toArray` refuses to build more elements than this.
const MAX_MATERIALIZED: usize = 1 << 24;

/// Build a range. Without a step it counts up, or down when `end < start`.
pub(crate) fn make(start: Value, end: Value, step: Option<Value>, exclusive: bool) -> Result<Value> {
    for bound in [&start, &end] {
        if !bound.is_numeric() {
            return Err(RuntimeError::type_error(format!(
                "range bounds must be numbers, got '{}'",
                bound.type_name()
            )));
        }
    }
    let step = match step {
        Some(step) => {
            let Some(n) = Num::of(&step) else {
                return Err(RuntimeError::type_error(format!(
                    "range step must be a number, got '{}'",
                    step.type_name()
                )));
            };
            if n.to_f64() == 0.0 {
                return Err(RuntimeError::range("range step must not be zero"));
            }
            step
        }
        None => match (Num::of(&start), Num::of(&end)) {
            (Some(a), Some(b)) if numeric::compare(b, a) == Some(std::cmp::Ordering::Less) => {
                Value::Int(-1)
            }
            _ => Value::Int(1),
        },
    };
    Ok(Value::Range(Rc::new(RangeValue {
        start,
        end,
        step,
        exclusive,
    })))
}

enum Bounds {
    Int { start: i64, end: i64, step: i64 },
    Float { start: f64, end: f64, step: f64 },
}

fn exact(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(i64::from(*n)),
        Value::BigInt(n) => n.to_i64(),
        _ => None,
    }
}

fn float(value: &Value) -> f64 {
    Num::of(value).map_or(f64::NAN, Num::to_f64)
}

fn bounds(r: &RangeValue) -> Bounds {
    match (exact(&r.start), exact(&r.end), exact(&r.step)) {
        (Some(start), Some(end), Some(step)) => Bounds::Int { start, end, step },
        _ => Bounds::Float {
            start: float(&r.start),
            end: float(&r.end),
            step: float(&r.step),
        },
    }
}

/// Number of values the range yields.
pub(crate) fn count(r: &RangeValue) -> usize {
    match bounds(r) {
        Bounds::Int { start, end, step } => {
            let (start, end, step) = (i128::from(start), i128::from(end), i128::from(step));
            let span = if step > 0 { end - start } else { start - end };
            if span < 0 || step == 0 {
                return 0;
            }
            let step = step.abs();
            let mut n = span / step + 1;
            if r.exclusive && span % step == 0 {
                n -= 1;
            }
            usize::try_from(n).unwrap_or(usize::MAX)
        }
        Bounds::Float { start, end, step } => {
            let span = if step > 0.0 { end - start } else { start - end };
            if span.is_nan() || span < 0.0 || step == 0.0 || !step.is_finite() {
                return 0;
            }
            let steps = (span / step.abs()).floor();
            let mut n = steps + 1.0;
            if r.exclusive && start + steps * step == end {
                n -= 1.0;
            }
            if n >= usize::MAX as f64 {
                usize::MAX
            } else {
                n as usize
            }
        }
    }
}

/// Whether `value` is one of the values the range yields.
pub(crate) fn contains(r: &RangeValue, value: &Value) -> bool {
    let Some(n) = Num::of(value) else {
        return false;
    };
    match (bounds(r), exact(value)) {
        (Bounds::Int { start, end, step }, Some(v)) => {
            let (start, end, step, v) = (
                i128::from(start),
                i128::from(end),
                i128::from(step),
                i128::from(v),
            );
            let within = if step > 0 {
                start <= v && v <= end
            } else {
                end <= v && v <= start
            };
            within && (v - start) % step == 0 && !(r.exclusive && v == end)
        }
        (Bounds::Int { .. }, None) => {
            let v = n.to_f64();
            v.fract() == 0.0 && float_contains(r, v)
        }
        (Bounds::Float { .. }, _) => float_contains(r, n.to_f64()),
    }
}

fn float_contains(r: &RangeValue, v: f64) -> bool {
    let (start, end, step) = (float(&r.start), float(&r.end), float(&r.step));
    let within = if step > 0.0 {
        start <= v && v <= end
    } else {
        end <= v && v <= start
    };
    within && ((v - start) / step).fract() == 0.0 && !(r.exclusive && v == end)
}

/// A fresh cursor over the range.
pub(crate) fn iterator(r: &RangeValue) -> IteratorState {
    match bounds(r) {
        Bounds::Int { start, end, step } => IteratorState::IntRange {
            next: start,
            end,
            step,
            exclusive: r.exclusive,
        },
        Bounds::Float { start, end, step } => IteratorState::FloatRange {
            next: start,
            end,
            step,
            exclusive: r.exclusive,
        },
    }
}

pub(crate) fn invoke(_vm: &mut Vm, r: &Rc<RangeValue>, name: &str, args: &[Value]) -> Result<Value> {
    match name {
        "start" => Ok(r.start.clone()),
        "end" => Ok(r.end.clone()),
        "step" => Ok(r.step.clone()),
        "length" => Ok(int_from_usize(count(r))),
        "isEmpty" => Ok(Value::Boolean(count(r) == 0)),
        "nonEmpty" => Ok(Value::Boolean(count(r) > 0)),
        "contains" => Ok(Value::Boolean(contains(r, &args[0]))),
        "toArray" => {
            let n = count(r);
            if n > MAX_MATERIALIZED {
                return Err(RuntimeError::range(format!(
                    "range of {} values is too large for an array",
                    n
                )));
            }
            let mut state = iterator(r);
            let mut items = Vec::with_capacity(n);
            while let Some(value) = state.advance() {
                items.push(value);
            }
            Ok(Value::array(items))
        }
        "iterator" => Ok(Value::Iterator(Rc::new(RefCell::new(iterator(r))))),
        "toString" => Ok(Value::from(Value::Range(Rc::clone(r)).to_string())),
        _ => Err(no_such_method("Range", name)),
    }
}
