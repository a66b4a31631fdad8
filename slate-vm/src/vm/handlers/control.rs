// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Control flow opcode handlers: jumps, closures, calls, returns and
//! scope cleanup.

use std::rc::Rc;

use crate::opcode::OpCode;
use crate::value::{Closure, Value};
use crate::vm::{Result, RuntimeError, Vm};

/// What the dispatch loop does after a control opcode.
#[derive(Debug)]
pub enum ControlFlow {
    Continue,
    /// The frame the loop was entered for has finished.
    Return(Value),
}

impl Vm {
    /// Execute a control flow opcode.
    pub(crate) fn execute_control(&mut self, op: OpCode, stop_depth: usize) -> Result<ControlFlow> {
        match op {
            // Jump instructions
            OpCode::Jump => {
                let offset = self.read_u16()?;
                self.jump(offset)?;
            }
            OpCode::JumpIfFalse => {
                let offset = self.read_u16()?;
                if self.stack.pop()?.is_falsy() {
                    self.jump(offset)?;
                }
            }
            OpCode::JumpIfTrue => {
                let offset = self.read_u16()?;
                if !self.stack.pop()?.is_falsy() {
                    self.jump(offset)?;
                }
            }
            OpCode::JumpIfNullish => {
                let offset = self.read_u16()?;
                if self.stack.peek(0)?.is_nullish() {
                    self.jump(offset)?;
                }
            }
            OpCode::NullCoalesce => {
                let offset = self.read_u16()?;
                if self.stack.peek(0)?.is_nullish() {
                    self.stack.pop()?;
                } else {
                    self.jump(offset)?;
                }
            }
            OpCode::Loop => {
                let offset = usize::from(self.read_u16()?);
                let frame = self.frame_mut()?;
                frame.ip = frame
                    .ip
                    .checked_sub(offset)
                    .ok_or_else(|| RuntimeError::internal("loop target before chunk start"))?;
            }

            // Closures and calls
            OpCode::Closure => {
                let idx = usize::from(self.read_u16()?);
                self.make_closure(idx)?;
            }
            OpCode::Call => {
                let argc = usize::from(self.read_u16()?);
                let callee = self.stack.peek(argc)?.clone();
                self.call_from_stack(callee, argc)?;
            }
            OpCode::CallMethod => {
                let name = self.read_name()?;
                let argc = usize::from(self.read_u16()?);
                self.call_method(&name, argc)?;
            }
            OpCode::Return => {
                let result = self.stack.pop()?;
                let frame = self
                    .frames
                    .pop()
                    .ok_or_else(|| RuntimeError::internal("return without a frame"))?;
                self.close_upvalues(frame.cleanup_base);
                self.stack.truncate(frame.cleanup_base);
                if self.frames.len() <= stop_depth {
                    return Ok(ControlFlow::Return(result));
                }
                self.stack.push(result)?;
            }

            // Scope cleanup
            OpCode::PopN => {
                let count = usize::from(self.read_byte()?);
                let keep = self.scope_floor(count)?;
                self.close_upvalues(keep);
                self.stack.truncate(keep);
            }
            OpCode::PopNPreserveTop => {
                let count = usize::from(self.read_byte()?);
                let keep = self.scope_floor(count + 1)?;
                self.close_upvalues(keep);
                self.stack.remove_below_top(count)?;
            }
            OpCode::Halt => {
                let frame = self
                    .frames
                    .pop()
                    .ok_or_else(|| RuntimeError::internal("halt without a frame"))?;
                self.close_upvalues(frame.cleanup_base);
                self.stack.truncate(frame.cleanup_base);
                return Ok(ControlFlow::Return(Value::Null));
            }

            _ => {
                return Err(RuntimeError::internal(format!(
                    "execute_control: unexpected opcode {}",
                    op
                )));
            }
        }
        Ok(ControlFlow::Continue)
    }

    fn jump(&mut self, offset: u16) -> Result<()> {
        let frame = self.frame_mut()?;
        frame.ip += usize::from(offset);
        Ok(())
    }

    /// Stack length after popping `count` values.
    fn scope_floor(&self, count: usize) -> Result<usize> {
        self.stack
            .len()
            .checked_sub(count)
            .ok_or_else(RuntimeError::stack_underflow)
    }

    fn make_closure(&mut self, idx: usize) -> Result<()> {
        let function = self.function(idx)?;
        let frame = self
            .frames
            .last()
            .ok_or_else(|| RuntimeError::internal("no active frame"))?;
        let base = frame.base;
        let parent = Rc::clone(&frame.closure);
        let globals = Rc::downgrade(&frame.globals);

        let mut upvalues = Vec::with_capacity(function.upvalues.len());
        for desc in &function.upvalues {
            let index = usize::from(desc.index);
            if desc.is_local {
                upvalues.push(self.capture_upvalue(base + index));
            } else {
                let cell = parent.upvalues.get(index).cloned().ok_or_else(|| {
                    RuntimeError::internal(format!("upvalue index {} out of bounds", index))
                })?;
                upvalues.push(cell);
            }
        }
        let closure = Closure {
            function,
            upvalues,
            globals,
        };
        self.stack.push(Value::Closure(Rc::new(closure)))
    }

    /// Call `callee` with the `argc` arguments on top of the stack. The
    /// slot below them holds the callee (or the method receiver).
    /// Closures get a new frame; everything else runs to completion here.
    fn call_from_stack(&mut self, callee: Value, argc: usize) -> Result<()> {
        let slot = self
            .stack
            .len()
            .checked_sub(argc + 1)
            .ok_or_else(RuntimeError::stack_underflow)?;
        if let Value::Closure(closure) = &callee {
            self.check_arity(closure, argc)?;
            self.stack.set(slot, callee.clone())?;
            let globals = self.closure_globals(closure);
            return self.push_frame(Rc::clone(closure), slot, globals);
        }
        let args = self.stack.pop_n(argc)?;
        self.stack.pop()?;
        let result = self.call_non_closure(&callee, &args)?;
        self.stack.push(result)
    }

    /// `receiver.name(args)`. Callable fields of objects are called without
    /// a receiver; everything else dispatches to the receiver's class.
    fn call_method(&mut self, name: &str, argc: usize) -> Result<()> {
        let receiver = self.stack.peek(argc)?.clone();
        if let Value::Object(map) = &receiver {
            let field = map.borrow().get(name).cloned();
            if let Some(field) = field.filter(Value::is_callable) {
                return self.call_from_stack(field, argc);
            }
        }
        let args = self.stack.pop_n(argc)?;
        self.stack.pop()?;
        let result = self.invoke_method(&receiver, name, &args)?;
        self.stack.push(result)
    }
}
