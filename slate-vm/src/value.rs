// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime values.
//!
//! Heap variants are reference counted with `Rc`; mutable containers sit
//! behind a `RefCell`. Dropping the last reference releases owned values
//! recursively. Cycles through arrays and objects are not collected.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use num_bigint::BigInt;

use crate::chunk::Function;
use crate::datetime::Temporal;
use crate::numeric::format_number;
use crate::vm::{Globals, Result, Vm};

/// Object storage: insertion ordered string keys.
pub type ObjectMap = IndexMap<Rc<str>, Value>;

/// Signature of a native function.
pub type NativeFn = dyn Fn(&mut Vm, &[Value]) -> Result<Value>;

/// A Slate value.
#[derive(Clone)]
pub enum Value {
    Null,
    Undefined,
    Boolean(bool),
    Int(i32),
    BigInt(Rc<BigInt>),
    Number(f64),
    String(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<ObjectMap>>),
    Range(Rc<RangeValue>),
    Iterator(Rc<RefCell<IteratorState>>),
    Buffer(Rc<RefCell<Vec<u8>>>),
    StringBuilder(Rc<RefCell<String>>),
    Closure(Rc<Closure>),
    Native(Rc<Native>),
    BoundMethod(Rc<BoundMethod>),
    Class(ClassId),
    Temporal(Rc<Temporal>),
}

/// Number of arguments a callable accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    /// Inclusive bounds.
    Range(usize, usize),
}

impl Arity {
    pub fn accepts(self, argc: usize) -> bool {
        match self {
            Arity::Exact(n) => argc == n,
            Arity::AtLeast(n) => argc >= n,
            Arity::Range(lo, hi) => (lo..=hi).contains(&argc),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(1) => write!(f, "1 argument"),
            Arity::Exact(n) => write!(f, "{} arguments", n),
            Arity::AtLeast(n) => write!(f, "at least {} arguments", n),
            Arity::Range(lo, hi) => write!(f, "{} to {} arguments", lo, hi),
        }
    }
}

/// A function implemented in Rust.
pub struct Native {
    pub name: String,
    pub arity: Arity,
    pub func: Rc<NativeFn>,
}

impl Native {
    pub fn new(
        name: impl Into<String>,
        arity: Arity,
        func: impl Fn(&mut Vm, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        Native {
            name: name.into(),
            arity,
            func: Rc::new(func),
        }
    }
}

/// A captured variable. Open upvalues point at a live stack slot; closing
/// moves the value into the cell.
#[derive(Clone)]
pub enum Upvalue {
    Open(usize),
    Closed(Value),
}

/// A function plus its captured upvalue cells.
///
/// `globals` is the namespace the function was defined in. It is held
/// weakly: namespaces own their functions, not the other way round.
pub struct Closure {
    pub function: Rc<Function>,
    pub upvalues: Vec<Rc<RefCell<Upvalue>>>,
    pub globals: Weak<RefCell<Globals>>,
}

impl Closure {
    pub fn name(&self) -> Option<&str> {
        self.function.name.as_deref()
    }
}

/// A receiver paired with a method name, produced by reading a method as
/// a property (`arr.push`).
pub struct BoundMethod {
    pub receiver: Value,
    pub name: Rc<str>,
}

/// A numeric range. Endpoints and step are Int, BigInt or Number values.
#[derive(Clone, PartialEq)]
pub struct RangeValue {
    pub start: Value,
    pub end: Value,
    pub step: Value,
    pub exclusive: bool,
}

/// Cursor state of an iterator.
pub enum IteratorState {
    Array {
        items: Rc<RefCell<Vec<Value>>>,
        index: usize,
    },
    /// Integer range walked in `i64`.
    IntRange {
        next: i64,
        end: i64,
        step: i64,
        exclusive: bool,
    },
    /// Any other numeric range, walked in `f64`.
    FloatRange {
        next: f64,
        end: f64,
        step: f64,
        exclusive: bool,
    },
    Chars {
        text: Rc<str>,
        offset: usize,
    },
    Bytes {
        bytes: Rc<RefCell<Vec<u8>>>,
        index: usize,
    },
    Keys {
        keys: Vec<Rc<str>>,
        index: usize,
    },
}

/// Built-in classes. Classes are first-class values: calling one
/// constructs an instance, and `instanceof` compares against them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassId {
    String,
    Array,
    Object,
    Range,
    Iterator,
    StringBuilder,
    Buffer,
    LocalDate,
    LocalTime,
    LocalDateTime,
    ZonedDateTime,
    Instant,
    Duration,
    Period,
}

impl ClassId {
    pub const ALL: [ClassId; 14] = [
        ClassId::String,
        ClassId::Array,
        ClassId::Object,
        ClassId::Range,
        ClassId::Iterator,
        ClassId::StringBuilder,
        ClassId::Buffer,
        ClassId::LocalDate,
        ClassId::LocalTime,
        ClassId::LocalDateTime,
        ClassId::ZonedDateTime,
        ClassId::Instant,
        ClassId::Duration,
        ClassId::Period,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ClassId::String => "String",
            ClassId::Array => "Array",
            ClassId::Object => "Object",
            ClassId::Range => "Range",
            ClassId::Iterator => "Iterator",
            ClassId::StringBuilder => "StringBuilder",
            ClassId::Buffer => "Buffer",
            ClassId::LocalDate => "LocalDate",
            ClassId::LocalTime => "LocalTime",
            ClassId::LocalDateTime => "LocalDateTime",
            ClassId::ZonedDateTime => "ZonedDateTime",
            ClassId::Instant => "Instant",
            ClassId::Duration => "Duration",
            ClassId::Period => "Period",
        }
    }
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Value {
        Value::String(s.into())
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(map: ObjectMap) -> Value {
        Value::Object(Rc::new(RefCell::new(map)))
    }

    pub fn bigint(n: BigInt) -> Value {
        Value::BigInt(Rc::new(n))
    }

    pub fn temporal(t: Temporal) -> Value {
        Value::Temporal(Rc::new(t))
    }

    /// `Null`, `Undefined`, `false`, numeric zero and the empty string are
    /// falsy; everything else is truthy.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Null | Value::Undefined => true,
            Value::Boolean(b) => !b,
            Value::Int(n) => *n == 0,
            Value::BigInt(n) => n.sign() == num_bigint::Sign::NoSign,
            Value::Number(n) => *n == 0.0 || n.is_nan(),
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::BigInt(_) | Value::Number(_))
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Closure(_) | Value::Native(_) | Value::BoundMethod(_) | Value::Class(_)
        )
    }

    /// The tag returned by the `type` built-in.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Undefined => "undefined",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::BigInt(_) => "bigint",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Range(_) => "range",
            Value::Iterator(_) => "iterator",
            Value::Buffer(_) => "buffer",
            Value::StringBuilder(_) => "stringbuilder",
            Value::Closure(_) | Value::Native(_) | Value::BoundMethod(_) => "function",
            Value::Class(_) => "class",
            Value::Temporal(t) => t.type_name(),
        }
    }

    /// The built-in class of this value, if it has one.
    pub fn class(&self) -> Option<ClassId> {
        Some(match self {
            Value::String(_) => ClassId::String,
            Value::Array(_) => ClassId::Array,
            Value::Object(_) => ClassId::Object,
            Value::Range(_) => ClassId::Range,
            Value::Iterator(_) => ClassId::Iterator,
            Value::StringBuilder(_) => ClassId::StringBuilder,
            Value::Buffer(_) => ClassId::Buffer,
            Value::Temporal(t) => t.class(),
            _ => return None,
        })
    }

    /// Loose equality: numbers compare across Int, BigInt and Number;
    /// strings, ranges and date/time values by content; containers,
    /// functions and builders by identity.
    pub fn equals(&self, other: &Value) -> bool {
        if self.is_numeric() && other.is_numeric() {
            return crate::numeric::numeric_eq(self, other);
        }
        match (self, other) {
            (Value::Null, Value::Null) | (Value::Undefined, Value::Undefined) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Range(a), Value::Range(b)) => a == b,
            (Value::Iterator(a), Value::Iterator(b)) => Rc::ptr_eq(a, b),
            (Value::Buffer(a), Value::Buffer(b)) => Rc::ptr_eq(a, b),
            (Value::StringBuilder(a), Value::StringBuilder(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::BoundMethod(a), Value::BoundMethod(b)) => {
                a.name == b.name && a.receiver.equals(&b.receiver)
            }
            (Value::Class(a), Value::Class(b)) => a == b,
            (Value::Temporal(a), Value::Temporal(b)) => a == b,
            _ => false,
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            Value::String(s) if depth > 0 => write!(f, "{:?}", s),
            Value::Array(items) => {
                if depth > MAX_DISPLAY_DEPTH {
                    return f.write_str("[...]");
                }
                f.write_str("[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_nested(f, depth + 1)?;
                }
                f.write_str("]")
            }
            Value::Object(map) => {
                if depth > MAX_DISPLAY_DEPTH {
                    return f.write_str("{...}");
                }
                f.write_str("{")?;
                for (i, (key, value)) in map.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: ", key)?;
                    value.fmt_nested(f, depth + 1)?;
                }
                f.write_str("}")
            }
            _ => write!(f, "{}", self),
        }
    }
}

/// Nesting beyond this is elided when displaying (cyclic containers).
const MAX_DISPLAY_DEPTH: usize = 32;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Undefined => f.write_str("undefined"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::BigInt(n) => write!(f, "{}", n),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Array(_) | Value::Object(_) => self.fmt_nested(f, 0),
            Value::Range(r) => {
                let op = if r.exclusive { "..<" } else { ".." };
                write!(f, "{}{}{}", r.start, op, r.end)?;
                if !r.step.equals(&Value::Int(1)) {
                    write!(f, " step {}", r.step)?;
                }
                Ok(())
            }
            Value::Iterator(_) => f.write_str("<iterator>"),
            Value::Buffer(bytes) => {
                f.write_str("Buffer[")?;
                for (i, b) in bytes.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", b)?;
                }
                f.write_str("]")
            }
            Value::StringBuilder(s) => f.write_str(&s.borrow()),
            Value::Closure(c) => match c.name() {
                Some(name) => write!(f, "<function {}>", name),
                None => f.write_str("<function>"),
            },
            Value::Native(n) => write!(f, "<native {}>", n.name),
            Value::BoundMethod(b) => write!(f, "<bound method {}>", b.name),
            Value::Class(c) => write!(f, "<class {}>", c.name()),
            Value::Temporal(t) => write!(f, "{}", t),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::BigInt(n) => write!(f, "{}n", n),
            _ => write!(f, "{}", self),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

/// Int when it fits in 32 bits, otherwise BigInt.
impl From<i64> for Value {
    fn from(n: i64) -> Self {
        match i32::try_from(n) {
            Ok(small) => Value::Int(small),
            Err(_) => Value::bigint(BigInt::from(n)),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(Value::Null.is_falsy());
        assert!(Value::Undefined.is_falsy());
        assert!(Value::Int(0).is_falsy());
        assert!(Value::Number(0.0).is_falsy());
        assert!(Value::string("").is_falsy());
        assert!(!Value::array(vec![]).is_falsy());
        assert!(!Value::object(ObjectMap::new()).is_falsy());
        assert!(!Value::string("0").is_falsy());
    }

    #[test]
    fn test_containers_compare_by_identity() {
        let a = Value::array(vec![Value::Int(1)]);
        let b = Value::array(vec![Value::Int(1)]);
        assert!(a.equals(&a.clone()));
        assert!(!a.equals(&b));
        assert!(!Value::Null.equals(&Value::Undefined));
    }

    #[test]
    fn test_numeric_equality_crosses_types() {
        assert!(Value::Int(2).equals(&Value::Number(2.0)));
        assert!(Value::Int(2).equals(&Value::bigint(BigInt::from(2))));
        assert!(!Value::Number(f64::NAN).equals(&Value::Number(f64::NAN)));
    }

    #[test]
    fn test_display() {
        let nested = Value::array(vec![
            Value::Int(1),
            Value::string("a"),
            Value::Number(2.0),
            Value::Null,
        ]);
        assert_eq!(nested.to_string(), "[1, \"a\", 2.0, null]");
        let mut map = ObjectMap::new();
        map.insert(Rc::from("k"), Value::Boolean(true));
        assert_eq!(Value::object(map).to_string(), "{k: true}");
        assert_eq!(Value::string("plain").to_string(), "plain");
    }

    #[test]
    fn test_cyclic_display_terminates() {
        let items = Rc::new(RefCell::new(Vec::new()));
        let array = Value::Array(Rc::clone(&items));
        items.borrow_mut().push(array.clone());
        assert!(array.to_string().contains("[...]"));
        // Break the cycle so the test does not leak.
        items.borrow_mut().clear();
    }

    #[test]
    fn test_arity() {
        assert!(Arity::Exact(2).accepts(2));
        assert!(!Arity::Exact(2).accepts(1));
        assert!(Arity::AtLeast(1).accepts(5));
        assert!(Arity::Range(1, 2).accepts(2));
        assert!(!Arity::Range(1, 2).accepts(3));
        assert_eq!(Arity::Exact(1).to_string(), "1 argument");
    }
}
