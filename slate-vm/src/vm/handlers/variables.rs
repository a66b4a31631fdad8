// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Variable opcode handlers: locals, upvalues and globals.

use std::cell::RefCell;
use std::rc::Rc;

use crate::opcode::{GLOBAL_IMMUTABLE, GLOBAL_PRIVATE, OpCode};
use crate::value::Upvalue;
use crate::vm::{Global, Result, RuntimeError, Vm};

impl Vm {
    /// Execute a variable opcode.
    pub(crate) fn execute_variables(&mut self, op: OpCode) -> Result<()> {
        match op {
            OpCode::GetLocal => {
                let slot = usize::from(self.read_byte()?);
                let base = self.frame_base()?;
                let value = self.stack.get(base + slot)?;
                self.stack.push(value)
            }
            OpCode::SetLocal => {
                let slot = usize::from(self.read_byte()?);
                let value = self.stack.pop()?;
                let base = self.frame_base()?;
                self.stack.set(base + slot, value)
            }
            OpCode::GetUpvalue => {
                let cell = self.upvalue_cell()?;
                let value = self.read_upvalue(&cell)?;
                self.stack.push(value)
            }
            OpCode::SetUpvalue => {
                let cell = self.upvalue_cell()?;
                let value = self.stack.pop()?;
                self.write_upvalue(&cell, value)
            }
            OpCode::GetGlobal => {
                let name = self.read_name()?;
                let value = self
                    .current_globals()
                    .borrow()
                    .get(&name)
                    .map(|g| g.value.clone())
                    .ok_or_else(|| undefined(&name))?;
                self.stack.push(value)
            }
            OpCode::SetGlobal => {
                let name = self.read_name()?;
                let value = self.stack.pop()?;
                let globals = self.current_globals();
                let mut globals = globals.borrow_mut();
                let global = globals.get_mut(&name).ok_or_else(|| undefined(&name))?;
                if global.immutable {
                    return Err(RuntimeError::reference(format!(
                        "cannot reassign immutable '{}'",
                        name
                    )));
                }
                global.value = value;
                Ok(())
            }
            OpCode::DefineGlobal => {
                let name = self.read_name()?;
                let flags = self.read_byte()?;
                let value = self.stack.pop()?;
                self.current_globals().borrow_mut().insert(
                    name,
                    Global {
                        value,
                        immutable: flags & GLOBAL_IMMUTABLE != 0,
                        private: flags & GLOBAL_PRIVATE != 0,
                    },
                );
                Ok(())
            }
            _ => Err(RuntimeError::internal(format!(
                "execute_variables: unexpected opcode {}",
                op
            ))),
        }
    }

    fn upvalue_cell(&mut self) -> Result<Rc<RefCell<Upvalue>>> {
        let idx = usize::from(self.read_byte()?);
        self.frame_mut()?
            .closure
            .upvalues
            .get(idx)
            .cloned()
            .ok_or_else(|| RuntimeError::internal(format!("upvalue index {} out of bounds", idx)))
    }
}

fn undefined(name: &str) -> RuntimeError {
    RuntimeError::reference(format!("undefined variable '{}'", name))
}
