// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Call frames for the VM.

use std::cell::RefCell;
use std::rc::Rc;

use crate::value::Closure;
use crate::vm::Globals;

/// A call frame on the VM's call stack.
pub struct CallFrame {
    /// The closure being executed.
    pub closure: Rc<Closure>,

    /// Instruction pointer (index into the chunk's code).
    pub ip: usize,

    /// Stack base: index of local slot 0 (the first parameter).
    pub base: usize,

    /// Stack cleanup point: where to truncate on return (the callee slot).
    pub cleanup_base: usize,

    /// Global namespace the code of this frame resolves names in.
    pub globals: Rc<RefCell<Globals>>,
}

impl CallFrame {
    /// Frame for a closure whose callee value sits at `cleanup_base`.
    pub fn new(closure: Rc<Closure>, cleanup_base: usize, globals: Rc<RefCell<Globals>>) -> Self {
        Self {
            closure,
            ip: 0,
            base: cleanup_base + 1,
            cleanup_base,
            globals,
        }
    }
}
