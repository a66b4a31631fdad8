// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Value stack for the VM.

use crate::value::Value;

use super::{Result, RuntimeError};

/// The VM's value stack. Its capacity is fixed when the VM is created;
/// pushing past it is a `RangeError`.
#[derive(Default)]
pub struct ValueStack {
    values: Vec<Value>,
    capacity: usize,
}

impl ValueStack {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Push a value onto the stack.
    #[inline]
    pub fn push(&mut self, value: Value) -> Result<()> {
        if self.values.len() >= self.capacity {
            return Err(RuntimeError::range("stack overflow"));
        }
        self.values.push(value);
        Ok(())
    }

    /// Pop a value from the stack.
    #[inline]
    pub fn pop(&mut self) -> Result<Value> {
        self.values.pop().ok_or_else(RuntimeError::stack_underflow)
    }

    /// Peek at a value on the stack without removing it.
    /// `distance` is the offset from the top (0 = top).
    #[inline]
    pub fn peek(&self, distance: usize) -> Result<&Value> {
        if distance >= self.values.len() {
            return Err(RuntimeError::stack_underflow());
        }
        Ok(&self.values[self.values.len() - 1 - distance])
    }

    /// Get a value at an absolute index.
    #[inline]
    pub fn get(&self, index: usize) -> Result<Value> {
        self.values
            .get(index)
            .cloned()
            .ok_or_else(RuntimeError::stack_underflow)
    }

    /// Set a value at an absolute index.
    #[inline]
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::stack_underflow()),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Truncate the stack to the given size.
    #[inline]
    pub fn truncate(&mut self, size: usize) {
        self.values.truncate(size);
    }

    /// Pop n values and return them in stack order.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>> {
        if n > self.values.len() {
            return Err(RuntimeError::stack_underflow());
        }
        let start = self.values.len() - n;
        Ok(self.values.drain(start..).collect())
    }

    /// Remove `n` values sitting directly beneath the top value.
    pub fn remove_below_top(&mut self, n: usize) -> Result<()> {
        if n + 1 > self.values.len() {
            return Err(RuntimeError::stack_underflow());
        }
        let top = self.values.len() - 1;
        self.values.drain(top - n..top);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slate_parser::ErrorKind;

    #[test]
    fn test_overflow_is_range_error() {
        let mut stack = ValueStack::with_capacity(2);
        stack.push(Value::Int(1)).unwrap();
        stack.push(Value::Int(2)).unwrap();
        let err = stack.push(Value::Int(3)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RangeError);
    }

    #[test]
    fn test_remove_below_top() {
        let mut stack = ValueStack::with_capacity(8);
        for n in 1..=4 {
            stack.push(Value::Int(n)).unwrap();
        }
        stack.remove_below_top(2).unwrap();
        assert_eq!(stack.pop_n(2).unwrap(), vec![Value::Int(1), Value::Int(4)]);
        assert!(stack.is_empty());
    }
}
