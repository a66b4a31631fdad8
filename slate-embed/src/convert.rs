// slate-embed - Type conversion traits
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Type conversion between Rust and Slate values.
//!
//! # Built-in Conversions
//!
//! | Rust Type | Slate Type |
//! |-----------|------------|
//! | `()` | `null` |
//! | `bool` | `boolean` |
//! | `i32` | `int` |
//! | `i64`, `usize`, `BigInt` | `int`, or `bigint` when it does not fit |
//! | `f32`, `f64` | `number` |
//! | `String`, `&str` | `string` |
//! | `Vec<T>` | `array` |
//! | `HashMap<String, V>` | `object` |
//! | `Option<T>` | `T` or `null` |
//!
//! # Custom Conversions
//!
//! ```rust
//! use slate_embed::{FromValue, IntoValue, Result, Value, convert_error};
//!
//! struct Point { x: i32, y: i32 }
//!
//! impl IntoValue for Point {
//!     fn into_value(self) -> Value {
//!         vec![self.x, self.y].into_value()
//!     }
//! }
//!
//! impl FromValue for Point {
//!     fn from_value(value: &Value) -> Result<Self> {
//!         match Vec::<i32>::from_value(value)?.as_slice() {
//!             [x, y] => Ok(Point { x: *x, y: *y }),
//!             _ => Err(convert_error("array of 2 ints", value)),
//!         }
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use num_bigint::BigInt;
use slate_vm::{Error, ObjectMap, RuntimeError, Value};

use crate::Result;

/// Convert a Rust type into a Slate [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Convert a Slate [`Value`] into a Rust type.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

/// TypeError for a value that does not have the expected shape.
pub fn convert_error(expected: &str, got: &Value) -> Error {
    Error::Runtime(RuntimeError::type_error(format!(
        "expected {}, got '{}'",
        expected,
        got.type_name()
    )))
}

fn out_of_range(value: &Value, target: &str) -> Error {
    Error::Runtime(RuntimeError::range(format!(
        "{} out of range for {}",
        value, target
    )))
}

// ============================================================================
// IntoValue implementations
// ============================================================================

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Null
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Boolean(self)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl IntoValue for usize {
    fn into_value(self) -> Value {
        match i64::try_from(self) {
            Ok(n) => Value::from(n),
            Err(_) => Value::bigint(BigInt::from(self)),
        }
    }
}

impl IntoValue for BigInt {
    fn into_value(self) -> Value {
        match i32::try_from(&self) {
            Ok(n) => Value::Int(n),
            Err(_) => Value::bigint(self),
        }
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Number(self)
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Number(f64::from(self))
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl IntoValue for Rc<str> {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::array(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

/// Keys are sorted so the object's field order is stable.
impl<V: IntoValue> IntoValue for HashMap<String, V> {
    fn into_value(self) -> Value {
        let mut entries: Vec<(String, V)> = self.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let map: ObjectMap = entries
            .into_iter()
            .map(|(k, v)| (Rc::from(k), v.into_value()))
            .collect();
        Value::object(map)
    }
}

// ============================================================================
// FromValue implementations
// ============================================================================

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for () {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null | Value::Undefined => Ok(()),
            other => Err(convert_error("null", other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Boolean(b) => Ok(*b),
            other => Err(convert_error("boolean", other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Int(n) => Ok(*n),
            Value::BigInt(_) => Err(out_of_range(value, "i32")),
            other => Err(convert_error("integer", other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Int(n) => Ok(i64::from(*n)),
            Value::BigInt(n) => i64::try_from(n.as_ref()).map_err(|_| out_of_range(value, "i64")),
            other => Err(convert_error("integer", other)),
        }
    }
}

impl FromValue for usize {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Int(n) => usize::try_from(*n).map_err(|_| out_of_range(value, "usize")),
            Value::BigInt(n) => {
                usize::try_from(n.as_ref()).map_err(|_| out_of_range(value, "usize"))
            }
            other => Err(convert_error("non-negative integer", other)),
        }
    }
}

impl FromValue for BigInt {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Int(n) => Ok(BigInt::from(*n)),
            Value::BigInt(n) => Ok(n.as_ref().clone()),
            other => Err(convert_error("integer", other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Number(n) => Ok(*n),
            Value::Int(n) => Ok(f64::from(*n)),
            other => Err(convert_error("number", other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self> {
        let n = f64::from_value(value)?;
        let single = n as f32;
        if single.is_infinite() && n.is_finite() {
            return Err(out_of_range(value, "f32"));
        }
        Ok(single)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s.to_string()),
            Value::StringBuilder(s) => Ok(s.borrow().clone()),
            other => Err(convert_error("string", other)),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Array(items) => items.borrow().iter().map(T::from_value).collect(),
            other => Err(convert_error("array", other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null | Value::Undefined => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<V: FromValue> FromValue for HashMap<String, V> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => {
                let map = map.borrow();
                let mut result = HashMap::with_capacity(map.len());
                for (k, v) in map.iter() {
                    result.insert(k.to_string(), V::from_value(v)?);
                }
                Ok(result)
            }
            other => Err(convert_error("object", other)),
        }
    }
}

// ============================================================================
// Convenience functions
// ============================================================================

#[must_use]
pub fn to_value<T: IntoValue>(value: T) -> Value {
    value.into_value()
}

pub fn from_value<T: FromValue>(value: &Value) -> Result<T> {
    T::from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i64_promotes_past_int32() {
        assert!(matches!(5i64.into_value(), Value::Int(5)));
        let big = (i64::from(i32::MAX) + 1).into_value();
        assert!(matches!(big, Value::BigInt(_)));
        assert_eq!(i64::from_value(&big).unwrap(), i64::from(i32::MAX) + 1);
    }

    #[test]
    fn test_narrowing_checks_range() {
        let big = i64::MAX.into_value();
        assert!(i32::from_value(&big).is_err());
        assert!(usize::from_value(&Value::Int(-1)).is_err());
        assert!(f32::from_value(&Value::Number(f64::MAX)).is_err());
    }

    #[test]
    fn test_containers() {
        let value = vec![Some(1), None, Some(3)].into_value();
        assert_eq!(value.to_string(), "[1, null, 3]");
        let back: Vec<Option<i32>> = from_value(&value).unwrap();
        assert_eq!(back, vec![Some(1), None, Some(3)]);

        let mut map = HashMap::new();
        map.insert("b".to_string(), 2);
        map.insert("a".to_string(), 1);
        let value = map.clone().into_value();
        assert_eq!(value.to_string(), "{a: 1, b: 2}");
        assert_eq!(HashMap::<String, i32>::from_value(&value).unwrap(), map);
    }

    #[test]
    fn test_type_mismatch_is_type_error() {
        let err = bool::from_value(&Value::Int(1)).unwrap_err();
        assert_eq!(err.kind(), slate_vm::ErrorKind::TypeError);
    }
}
