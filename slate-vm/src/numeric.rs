// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Numeric tower: Int (32-bit) promotes to BigInt on overflow, and any
//! Number operand makes the result a Number. Results never demote.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};

use crate::value::Value;
use crate::vm::{ErrorKind, Result, RuntimeError};

/// A borrowed view of a numeric value.
#[derive(Debug, Clone, Copy)]
pub enum Num<'a> {
    Int(i32),
    Big(&'a BigInt),
    Float(f64),
}

impl<'a> Num<'a> {
    pub fn of(value: &'a Value) -> Option<Num<'a>> {
        match value {
            Value::Int(n) => Some(Num::Int(*n)),
            Value::BigInt(n) => Some(Num::Big(n)),
            Value::Number(n) => Some(Num::Float(*n)),
            _ => None,
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Num::Int(n) => f64::from(n),
            Num::Big(n) => n.to_f64().unwrap_or(f64::NAN),
            Num::Float(n) => n,
        }
    }

    fn to_bigint(self) -> Option<BigInt> {
        match self {
            Num::Int(n) => Some(BigInt::from(n)),
            Num::Big(n) => Some(n.clone()),
            Num::Float(_) => None,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Num::Int(n) => n == 0,
            Num::Big(n) => n.is_zero(),
            Num::Float(n) => n == 0.0,
        }
    }
}

/// Arithmetic operators that follow the promotion rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    FloorDiv,
    Mod,
}

impl ArithOp {
    fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::FloorDiv => "//",
            ArithOp::Mod => "%",
        }
    }
}

/// Normalize a BigInt result without demoting: BigInt operands keep
/// producing BigInt values.
fn big(n: BigInt) -> Value {
    Value::bigint(n)
}

fn division_by_zero(op: &str) -> RuntimeError {
    RuntimeError::new(ErrorKind::DivisionByZero, format!("division by zero in '{}'", op))
}

/// Apply an integer-or-float arithmetic operator. Float results are
/// returned unrounded; the caller applies the configured precision.
pub fn arith(op: ArithOp, a: Num<'_>, b: Num<'_>) -> Result<Value> {
    if matches!(op, ArithOp::FloorDiv | ArithOp::Mod) && b.is_zero() {
        return Err(division_by_zero(op.symbol()));
    }
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Ok(int_arith(op, x, y)),
        (Num::Float(_), _) | (_, Num::Float(_)) => {
            Ok(Value::Number(float_arith(op, a.to_f64(), b.to_f64())))
        }
        _ => {
            let (x, y) = match (a.to_bigint(), b.to_bigint()) {
                (Some(x), Some(y)) => (x, y),
                _ => return Err(RuntimeError::internal("non-integer BigInt operand")),
            };
            Ok(big(match op {
                ArithOp::Add => x + y,
                ArithOp::Sub => x - y,
                ArithOp::Mul => x * y,
                ArithOp::FloorDiv => Integer::div_floor(&x, &y),
                ArithOp::Mod => Integer::mod_floor(&x, &y),
            }))
        }
    }
}

fn int_arith(op: ArithOp, x: i32, y: i32) -> Value {
    let checked = match op {
        ArithOp::Add => x.checked_add(y),
        ArithOp::Sub => x.checked_sub(y),
        ArithOp::Mul => x.checked_mul(y),
        // i32::MIN // -1 overflows.
        ArithOp::FloorDiv => x.checked_div(y).map(|_| Integer::div_floor(&x, &y)),
        ArithOp::Mod => Some(if y == -1 { 0 } else { Integer::mod_floor(&x, &y) }),
    };
    match checked {
        Some(n) => Value::Int(n),
        None => {
            let (x, y) = (BigInt::from(x), BigInt::from(y));
            big(match op {
                ArithOp::Add => x + y,
                ArithOp::Sub => x - y,
                ArithOp::Mul => x * y,
                ArithOp::FloorDiv => Integer::div_floor(&x, &y),
                ArithOp::Mod => Integer::mod_floor(&x, &y),
            })
        }
    }
}

fn float_arith(op: ArithOp, x: f64, y: f64) -> f64 {
    match op {
        ArithOp::Add => x + y,
        ArithOp::Sub => x - y,
        ArithOp::Mul => x * y,
        ArithOp::FloorDiv => (x / y).floor(),
        ArithOp::Mod => x - y * (x / y).floor(),
    }
}

/// True division; always a Number.
pub fn divide(a: Num<'_>, b: Num<'_>) -> Result<f64> {
    if b.is_zero() {
        return Err(division_by_zero("/"));
    }
    Ok(a.to_f64() / b.to_f64())
}

pub fn power(a: Num<'_>, b: Num<'_>) -> f64 {
    a.to_f64().powf(b.to_f64())
}

pub fn negate(a: Num<'_>) -> Value {
    match a {
        Num::Int(n) => match n.checked_neg() {
            Some(n) => Value::Int(n),
            None => big(-BigInt::from(n)),
        },
        Num::Big(n) => big(-n.clone()),
        Num::Float(n) => Value::Number(-n),
    }
}

/// Add a small delta (`INCREMENT`/`DECREMENT`).
pub fn step(a: Num<'_>, delta: i32) -> Value {
    match a {
        Num::Int(n) => match n.checked_add(delta) {
            Some(n) => Value::Int(n),
            None => big(BigInt::from(n) + delta),
        },
        Num::Big(n) => big(n + delta),
        Num::Float(n) => Value::Number(n + f64::from(delta)),
    }
}

pub fn abs(a: Num<'_>) -> Value {
    match a {
        Num::Int(n) => match n.checked_abs() {
            Some(n) => Value::Int(n),
            None => big(BigInt::from(n).abs()),
        },
        Num::Big(n) => big(n.abs()),
        Num::Float(n) => Value::Number(n.abs()),
    }
}

/// Compare two numbers. `None` when either is NaN.
pub fn compare(a: Num<'_>, b: Num<'_>) -> Option<Ordering> {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Some(x.cmp(&y)),
        (Num::Float(_), _) | (_, Num::Float(_)) => a.to_f64().partial_cmp(&b.to_f64()),
        _ => match (a.to_bigint(), b.to_bigint()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => None,
        },
    }
}

pub fn numeric_eq(a: &Value, b: &Value) -> bool {
    match (Num::of(a), Num::of(b)) {
        (Some(x), Some(y)) => compare(x, y) == Some(Ordering::Equal),
        _ => false,
    }
}

/// Truncate to 32-bit two's complement, as bitwise operators do.
pub fn to_int32(a: Num<'_>) -> i32 {
    match a {
        Num::Int(n) => n,
        Num::Big(n) => {
            let modulus = BigInt::from(1u64 << 32);
            let wrapped = Integer::mod_floor(n, &modulus);
            wrapped.to_u32().map(|u| u as i32).unwrap_or(0)
        }
        Num::Float(n) => {
            if !n.is_finite() {
                return 0;
            }
            let wrapped = n.trunc().rem_euclid(4_294_967_296.0);
            (wrapped as u32) as i32
        }
    }
}

/// Bitwise and shift operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    And,
    Or,
    Xor,
    Shl,
    Shr,
    UShr,
}

pub fn bitwise(op: BitOp, a: Num<'_>, b: Num<'_>) -> Result<Value> {
    let x = to_int32(a);
    let y = to_int32(b);
    let shift = |y: i32| -> Result<u32> {
        if (0..32).contains(&y) {
            Ok(y as u32)
        } else {
            Err(RuntimeError::new(
                ErrorKind::RangeError,
                format!("shift count {} out of range 0..31", y),
            ))
        }
    };
    Ok(match op {
        BitOp::And => Value::Int(x & y),
        BitOp::Or => Value::Int(x | y),
        BitOp::Xor => Value::Int(x ^ y),
        BitOp::Shl => Value::Int(x.wrapping_shl(shift(y)?)),
        BitOp::Shr => Value::Int(x >> shift(y)?),
        BitOp::UShr => {
            let result = (x as u32) >> shift(y)?;
            match i32::try_from(result) {
                Ok(n) => Value::Int(n),
                Err(_) => big(BigInt::from(result)),
            }
        }
    })
}

/// Convert an integral float to Int, or BigInt when it does not fit.
pub fn integral_value(n: f64) -> Value {
    if n >= f64::from(i32::MIN) && n <= f64::from(i32::MAX) {
        Value::Int(n as i32)
    } else {
        match BigInt::from_f64(n) {
            Some(b) => big(b),
            None => Value::Number(n),
        }
    }
}

/// Render a Number: integral values keep a `.0`, non-finite values use
/// `NaN`/`Infinity`, and values exactly representable as `f32` print with
/// the shorter single-precision digits.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n.fract() == 0.0 {
        if n.abs() < 1e16 {
            return format!("{:.1}", n);
        }
        return format!("{:e}", n);
    }
    let single = n as f32;
    if f64::from(single) == n {
        format!("{}", single)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn int(n: i32) -> Num<'static> {
        Num::Int(n)
    }

    #[test]
    fn test_int_overflow_promotes() {
        let sum = arith(ArithOp::Add, int(i32::MAX), int(1)).unwrap();
        assert_eq!(sum, Value::bigint(BigInt::from(2_147_483_648i64)));
        assert!(matches!(sum, Value::BigInt(_)));
    }

    #[test]
    fn test_floor_division_and_mod() {
        assert_eq!(arith(ArithOp::FloorDiv, int(17), int(3)).unwrap(), Value::Int(5));
        assert_eq!(arith(ArithOp::FloorDiv, int(-17), int(3)).unwrap(), Value::Int(-6));
        assert_eq!(arith(ArithOp::Mod, int(-17), int(3)).unwrap(), Value::Int(1));
        assert_eq!(arith(ArithOp::FloorDiv, int(17), int(-3)).unwrap(), Value::Int(-6));
        assert_eq!(arith(ArithOp::Mod, int(17), int(-3)).unwrap(), Value::Int(-1));
        let big = BigInt::from(-10_000_000_001i64);
        let quotient = arith(ArithOp::FloorDiv, Num::Big(&big), int(2)).unwrap();
        assert_eq!(quotient.to_string(), "-5000000001");
        let remainder = arith(ArithOp::Mod, Num::Big(&big), int(2)).unwrap();
        assert_eq!(remainder.to_string(), "1");
        assert_eq!(arith(ArithOp::Mod, int(i32::MIN), int(-1)).unwrap(), Value::Int(0));
        assert!(matches!(
            arith(ArithOp::FloorDiv, int(i32::MIN), int(-1)).unwrap(),
            Value::BigInt(_)
        ));
    }

    #[test]
    fn test_zero_divisors() {
        for op in [ArithOp::FloorDiv, ArithOp::Mod] {
            let err = arith(op, int(1), int(0)).unwrap_err();
            assert_eq!(err.kind, ErrorKind::DivisionByZero);
        }
        assert_eq!(divide(int(1), Num::Float(0.0)).unwrap_err().kind, ErrorKind::DivisionByZero);
        assert_eq!(divide(int(1), int(2)).unwrap(), 0.5);
    }

    #[test]
    fn test_float_contaminates() {
        let v = arith(ArithOp::Add, int(1), Num::Float(0.5)).unwrap();
        assert!(matches!(v, Value::Number(n) if n == 1.5));
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(bitwise(BitOp::Shl, int(1), int(31)).unwrap(), Value::Int(i32::MIN));
        assert_eq!(bitwise(BitOp::Shr, int(-8), int(1)).unwrap(), Value::Int(-4));
        assert_eq!(
            bitwise(BitOp::UShr, int(-1), int(0)).unwrap(),
            Value::bigint(BigInt::from(u32::MAX))
        );
        assert_eq!(bitwise(BitOp::UShr, int(-1), int(1)).unwrap(), Value::Int(i32::MAX));
        let err = bitwise(BitOp::Shl, int(1), int(32)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RangeError);
        assert_eq!(to_int32(Num::Float(4_294_967_297.0)), 1);
        assert_eq!(to_int32(Num::Float(f64::NAN)), 0);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(2.0), "2.0");
        assert_eq!(format_number(-0.5), "-0.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(f64::from(0.1f32)), "0.1");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_negate_min_promotes() {
        assert_eq!(negate(int(i32::MIN)), Value::bigint(BigInt::from(2_147_483_648i64)));
        assert_eq!(abs(int(i32::MIN)), Value::bigint(BigInt::from(2_147_483_648i64)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_int_ops_match_bigint(a in any::<i32>(), b in any::<i32>()) {
            for (op, expected) in [
                (ArithOp::Add, BigInt::from(a) + BigInt::from(b)),
                (ArithOp::Sub, BigInt::from(a) - BigInt::from(b)),
                (ArithOp::Mul, BigInt::from(a) * BigInt::from(b)),
            ] {
                let result = arith(op, int(a), int(b)).unwrap();
                let fits = i32::try_from(&expected).is_ok();
                match &result {
                    Value::Int(n) => prop_assert!(fits && BigInt::from(*n) == expected),
                    Value::BigInt(n) => prop_assert!(!fits && **n == expected),
                    other => prop_assert!(false, "unexpected {:?}", other),
                }
            }
        }

        #[test]
        fn prop_floor_div_mod_identity(a in any::<i32>(), b in any::<i32>().prop_filter("non-zero", |b| *b != 0)) {
            let q = arith(ArithOp::FloorDiv, int(a), int(b)).unwrap();
            let r = arith(ArithOp::Mod, int(a), int(b)).unwrap();
            let q = match q {
                Value::Int(n) => BigInt::from(n),
                Value::BigInt(n) => (*n).clone(),
                other => return Err(TestCaseError::fail(format!("{:?}", other))),
            };
            let r = match r {
                Value::Int(n) => BigInt::from(n),
                other => return Err(TestCaseError::fail(format!("{:?}", other))),
            };
            prop_assert_eq!(q * BigInt::from(b) + &r, BigInt::from(a));
            // The remainder takes the divisor's sign.
            prop_assert!(r.is_zero() || (r.is_negative() == (b < 0)));
        }
    }
}
