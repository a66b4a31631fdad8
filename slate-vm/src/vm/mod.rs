// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Stack-based virtual machine for executing Slate bytecode.
//!
//! The VM owns all interpreter state: the value stack, call frames, global
//! namespaces, the function table and the module cache. Opcode handlers
//! live in [`handlers`], built-in functions and classes in [`builtins`].

pub mod builtins;
pub mod error;
pub mod frame;
pub mod handlers;
pub mod modules;
pub mod stack;

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;

use indexmap::IndexMap;
use log::{debug, log_enabled, trace};
use slate_parser::ParseMode;

use crate::chunk::{Function, FunctionTable};
use crate::compiler::{self, CompileOptions};
use crate::datetime;
use crate::opcode::OpCode;
use crate::value::{Arity, Closure, Native, Upvalue, Value};

pub use error::{Result, RuntimeError};
pub use frame::CallFrame;
pub use handlers::control::ControlFlow;
pub use slate_parser::ErrorKind;
pub use stack::ValueStack;

// ============================================================================
// Configuration
// ============================================================================

/// Precision of float literals without a suffix and of float arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatPrecision {
    /// Round to `f32`.
    Single,
    #[default]
    Double,
}

impl FloatPrecision {
    pub fn round(self, value: f64) -> f64 {
        match self {
            FloatPrecision::Single => f64::from(value as f32),
            FloatPrecision::Double => value,
        }
    }
}

/// Whether runtime diagnostics are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Context {
    /// Print caret-underlined diagnostics to stderr.
    #[default]
    Default,
    /// Stay silent so callers can inspect the error.
    Test,
}

/// VM settings.
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Maximum number of values on the stack.
    pub stack_capacity: usize,
    /// Maximum call depth.
    pub frame_capacity: usize,
    pub float_precision: FloatPrecision,
    pub context: Context,
    /// Directories searched for modules after the script's own directory.
    pub search_paths: Vec<PathBuf>,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            stack_capacity: 65_536,
            frame_capacity: 1_024,
            float_precision: FloatPrecision::Double,
            context: Context::Default,
            search_paths: Vec::new(),
        }
    }
}

// ============================================================================
// Globals
// ============================================================================

/// A global binding.
#[derive(Clone)]
pub struct Global {
    pub value: Value,
    pub immutable: bool,
    /// Hidden from module exports. Built-ins are private.
    pub private: bool,
}

/// A global namespace, in definition order.
pub type Globals = IndexMap<Rc<str>, Global>;

/// In-memory sink for `print`, shared with whoever reads it back.
#[derive(Clone, Default)]
pub struct OutputBuffer(Rc<RefCell<Vec<u8>>>);

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Last source position announced by `SET_DEBUG_LOCATION`.
#[derive(Debug, Clone)]
struct DebugLocation {
    line: usize,
    column: usize,
    text: Rc<str>,
}

// ============================================================================
// The VM
// ============================================================================

/// The Slate virtual machine.
pub struct Vm {
    config: VmConfig,

    /// Value stack.
    pub(crate) stack: ValueStack,

    /// Call frame stack.
    pub(crate) frames: Vec<CallFrame>,

    /// The main script namespace.
    globals: Rc<RefCell<Globals>>,

    /// Every namespace created by this VM, main and modules alike. Closures
    /// refer to their namespace weakly; these keep them alive.
    namespaces: Vec<Rc<RefCell<Globals>>>,

    /// Functions compiled so far; `CLOSURE` operands index here.
    functions: FunctionTable,

    /// Result register, set by `SET_RESULT`.
    result: Option<Value>,

    /// Upvalues still pointing at live stack slots.
    open_upvalues: Vec<Rc<RefCell<Upvalue>>>,

    debug_location: Option<DebugLocation>,

    output: Box<dyn Write>,

    rng_state: u64,

    pub(crate) modules: modules::ModuleCache,

    /// Directory of the running script, searched first for modules.
    script_dir: Option<PathBuf>,
}

impl Vm {
    /// Create a VM with the default configuration.
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        let stack = ValueStack::with_capacity(config.stack_capacity);
        let seed = datetime::now_millis() as u64;
        let mut vm = Vm {
            config,
            stack,
            frames: Vec::new(),
            globals: Rc::new(RefCell::new(Globals::new())),
            namespaces: Vec::new(),
            functions: FunctionTable::new(),
            result: None,
            open_upvalues: Vec::new(),
            debug_location: None,
            output: Box::new(io::stdout()),
            rng_state: seed ^ 0x9E37_79B9_7F4A_7C15,
            modules: modules::ModuleCache::default(),
            script_dir: None,
        };
        vm.globals = vm.new_namespace();
        vm
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Redirect `print` output.
    pub fn set_output(&mut self, output: Box<dyn Write>) {
        self.output = output;
    }

    /// Directory searched first when resolving imports.
    pub fn set_script_dir(&mut self, dir: Option<PathBuf>) {
        self.script_dir = dir;
    }

    pub fn script_dir(&self) -> Option<&PathBuf> {
        self.script_dir.as_ref()
    }

    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.config.search_paths.push(path.into());
    }

    /// A fresh namespace seeded with the built-ins.
    pub(crate) fn new_namespace(&mut self) -> Rc<RefCell<Globals>> {
        let mut globals = Globals::new();
        builtins::install(&mut globals);
        let namespace = Rc::new(RefCell::new(globals));
        self.namespaces.push(Rc::clone(&namespace));
        namespace
    }

    /// Define (or redefine) a mutable, exported global.
    pub fn define_global(&mut self, name: &str, value: Value) {
        self.globals.borrow_mut().insert(
            Rc::from(name),
            Global {
                value,
                immutable: false,
                private: false,
            },
        );
    }

    /// Register a Rust function as a global.
    pub fn define_native(
        &mut self,
        name: &str,
        arity: Arity,
        func: impl Fn(&mut Vm, &[Value]) -> Result<Value> + 'static,
    ) {
        let native = Value::Native(Rc::new(Native::new(name, arity, func)));
        self.define_global(name, native);
    }

    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name).map(|g| g.value.clone())
    }

    /// Names of the main namespace's globals, built-ins included.
    pub fn global_names(&self) -> Vec<String> {
        self.globals.borrow().keys().map(|k| k.to_string()).collect()
    }

    /// Values currently on the stack. Natives observe their caller's depth.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn precision(&self) -> FloatPrecision {
        self.config.float_precision
    }

    /// Round a float result to the configured precision.
    pub(crate) fn number(&self, value: f64) -> Value {
        Value::Number(self.config.float_precision.round(value))
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// Parse and compile `source` into a script function.
    pub fn compile(
        &mut self,
        source: &str,
        mode: ParseMode,
    ) -> std::result::Result<Rc<Function>, crate::Error> {
        let program = slate_parser::parse(source, mode).map_err(crate::Error::Parse)?;
        let options = CompileOptions {
            mode,
            precision: self.config.float_precision,
        };
        compiler::compile(&program, source, &mut self.functions, options)
            .map_err(crate::Error::Compile)
    }

    /// Parse, compile and execute `source`, returning the result register.
    ///
    /// Under [`Context::Default`] every diagnostic is also printed to stderr.
    pub fn interpret(
        &mut self,
        source: &str,
        mode: ParseMode,
    ) -> std::result::Result<Option<Value>, crate::Error> {
        let function = match self.compile(source, mode) {
            Ok(function) => function,
            Err(err) => {
                if self.config.context == Context::Default {
                    eprint!("{}", err.render(source));
                }
                return Err(err);
            }
        };
        self.execute(function).map_err(crate::Error::Runtime)
    }

    /// Run a compiled script in the main namespace.
    pub fn execute(&mut self, function: Rc<Function>) -> Result<Option<Value>> {
        let globals = Rc::clone(&self.globals);
        self.execute_in(function, globals)
    }

    /// Run a compiled script against `globals`. On error the stack and
    /// frames are restored to their state before the call.
    pub(crate) fn execute_in(
        &mut self,
        function: Rc<Function>,
        globals: Rc<RefCell<Globals>>,
    ) -> Result<Option<Value>> {
        let stack_mark = self.stack.len();
        let frame_mark = self.frames.len();
        let outermost = frame_mark == 0;
        self.result = None;
        debug!("vm start: {} bytes", function.chunk.code.len());

        let closure = Rc::new(Closure {
            function,
            upvalues: Vec::new(),
            globals: Rc::downgrade(&globals),
        });
        let outcome = self.enter(closure, globals, &[], frame_mark);
        if outermost {
            self.debug_location = None;
        }
        match outcome {
            Ok(_) => {
                debug!("vm halt");
                Ok(self.result.take())
            }
            Err(err) => {
                let err = self.locate(err);
                self.unwind(stack_mark, frame_mark);
                debug!("vm error: {}", err);
                if outermost && self.config.context == Context::Default {
                    eprint!("{}", err.render());
                }
                Err(err)
            }
        }
    }

    /// Call any callable value with `args`. Natives use this to call back
    /// into Slate code.
    pub fn call_value(&mut self, callee: &Value, args: &[Value]) -> Result<Value> {
        let Value::Closure(closure) = callee else {
            return self.call_non_closure(callee, args);
        };
        self.check_arity(closure, args.len())?;
        let stack_mark = self.stack.len();
        let frame_mark = self.frames.len();
        let globals = self.closure_globals(closure);
        match self.enter(Rc::clone(closure), globals, args, frame_mark) {
            Ok(value) => Ok(value),
            Err(err) => {
                let err = self.locate(err);
                self.unwind(stack_mark, frame_mark);
                Err(err)
            }
        }
    }

    /// Push `closure` and `args`, then run until its frame is gone.
    fn enter(
        &mut self,
        closure: Rc<Closure>,
        globals: Rc<RefCell<Globals>>,
        args: &[Value],
        stop_depth: usize,
    ) -> Result<Value> {
        let cleanup_base = self.stack.len();
        self.stack.push(Value::Closure(Rc::clone(&closure)))?;
        for arg in args {
            self.stack.push(arg.clone())?;
        }
        self.push_frame(closure, cleanup_base, globals)?;
        self.run(stop_depth)
    }

    pub(crate) fn check_arity(&self, closure: &Closure, argc: usize) -> Result<()> {
        let arity = closure.function.arity();
        if arity == argc {
            Ok(())
        } else {
            Err(RuntimeError::arity(
                closure.function.display_name(),
                Arity::Exact(arity),
                argc,
            ))
        }
    }

    pub(crate) fn push_frame(
        &mut self,
        closure: Rc<Closure>,
        cleanup_base: usize,
        globals: Rc<RefCell<Globals>>,
    ) -> Result<()> {
        if self.frames.len() >= self.config.frame_capacity {
            return Err(RuntimeError::range("stack overflow"));
        }
        self.frames
            .push(CallFrame::new(closure, cleanup_base, globals));
        Ok(())
    }

    /// The namespace a closure resolves globals in.
    pub(crate) fn closure_globals(&self, closure: &Closure) -> Rc<RefCell<Globals>> {
        closure
            .globals
            .upgrade()
            .unwrap_or_else(|| Rc::clone(&self.globals))
    }

    /// Call anything but a closure. Arguments are already off the stack.
    pub(crate) fn call_non_closure(&mut self, callee: &Value, args: &[Value]) -> Result<Value> {
        match callee {
            Value::Native(native) => {
                if !native.arity.accepts(args.len()) {
                    return Err(RuntimeError::arity(&native.name, native.arity, args.len()));
                }
                let func = Rc::clone(&native.func);
                func(self, args)
            }
            Value::BoundMethod(bound) => {
                let receiver = bound.receiver.clone();
                let name = Rc::clone(&bound.name);
                self.invoke_method(&receiver, &name, args)
            }
            Value::Class(class) => builtins::construct(self, *class, args),
            Value::Closure(_) => self.call_value(callee, args),
            Value::Array(_) | Value::String(_) | Value::Buffer(_) | Value::Object(_)
                if args.len() == 1 =>
            {
                self.index_value(callee, &args[0])
            }
            other => Err(RuntimeError::type_error(format!(
                "'{}' is not callable",
                other.type_name()
            ))),
        }
    }

    // ========================================================================
    // Dispatch loop
    // ========================================================================

    /// Execute until the frame count drops back to `stop_depth`.
    fn run(&mut self, stop_depth: usize) -> Result<Value> {
        loop {
            let op = self.read_op()?;
            if log_enabled!(log::Level::Trace) {
                let ip = self.frames.last().map_or(0, |f| f.ip.saturating_sub(1));
                trace!("{:04} {:<20} stack={}", ip, op, self.stack.len());
            }

            match op {
                // Stack - handled inline
                OpCode::PushConstant => {
                    let value = self.read_constant()?;
                    self.stack.push(value)?;
                }
                OpCode::PushNull => self.stack.push(Value::Null)?,
                OpCode::PushUndefined => self.stack.push(Value::Undefined)?,
                OpCode::PushTrue => self.stack.push(Value::Boolean(true))?,
                OpCode::PushFalse => self.stack.push(Value::Boolean(false))?,
                OpCode::Pop => {
                    self.stack.pop()?;
                }
                OpCode::Dup => {
                    let value = self.stack.peek(0)?.clone();
                    self.stack.push(value)?;
                }
                OpCode::Dup2 => {
                    let below = self.stack.peek(1)?.clone();
                    let top = self.stack.peek(0)?.clone();
                    self.stack.push(below)?;
                    self.stack.push(top)?;
                }
                OpCode::SetResult => {
                    let value = self.stack.pop()?;
                    self.result = Some(value);
                }

                // Arithmetic and bitwise - delegated to handler
                OpCode::Add
                | OpCode::Subtract
                | OpCode::Multiply
                | OpCode::Divide
                | OpCode::Mod
                | OpCode::Power
                | OpCode::Negate
                | OpCode::FloorDiv
                | OpCode::Increment
                | OpCode::Decrement
                | OpCode::BitwiseAnd
                | OpCode::BitwiseOr
                | OpCode::BitwiseXor
                | OpCode::BitwiseNot
                | OpCode::LeftShift
                | OpCode::RightShift
                | OpCode::LogicalRightShift => self.execute_arithmetic(op)?,

                // Comparison and logical - delegated to handler
                OpCode::Equal
                | OpCode::NotEqual
                | OpCode::Less
                | OpCode::LessEqual
                | OpCode::Greater
                | OpCode::GreaterEqual
                | OpCode::Not
                | OpCode::And
                | OpCode::Or
                | OpCode::In
                | OpCode::InstanceOf => self.execute_comparison(op)?,

                // Variables - delegated to handler
                OpCode::GetLocal
                | OpCode::SetLocal
                | OpCode::GetUpvalue
                | OpCode::SetUpvalue
                | OpCode::GetGlobal
                | OpCode::SetGlobal
                | OpCode::DefineGlobal => self.execute_variables(op)?,

                // Data - delegated to handler
                OpCode::GetProperty
                | OpCode::SetProperty
                | OpCode::GetIndex
                | OpCode::SetIndex
                | OpCode::BuildArray
                | OpCode::BuildObject
                | OpCode::BuildRange => self.execute_data(op)?,

                // Control flow - delegated to handler
                OpCode::Jump
                | OpCode::JumpIfFalse
                | OpCode::JumpIfTrue
                | OpCode::JumpIfNullish
                | OpCode::NullCoalesce
                | OpCode::Loop
                | OpCode::Closure
                | OpCode::Call
                | OpCode::CallMethod
                | OpCode::Return
                | OpCode::PopN
                | OpCode::PopNPreserveTop
                | OpCode::Halt => match self.execute_control(op, stop_depth)? {
                    ControlFlow::Continue => {}
                    ControlFlow::Return(value) => return Ok(value),
                },

                // Debug registers
                OpCode::SetDebugLocation => {
                    let text = match self.read_constant()? {
                        Value::String(text) => text,
                        _ => Rc::from(""),
                    };
                    let line = usize::from(self.read_byte()?);
                    let column = usize::from(self.read_byte()?);
                    self.debug_location = Some(DebugLocation { line, column, text });
                }
                OpCode::ClearDebugLocation => self.debug_location = None,

                OpCode::ImportModule => self.execute_import()?,
            }
        }
    }

    fn current_frame(&self) -> Result<&CallFrame> {
        self.frames
            .last()
            .ok_or_else(|| RuntimeError::internal("no active frame"))
    }

    pub(crate) fn frame_mut(&mut self) -> Result<&mut CallFrame> {
        self.frames
            .last_mut()
            .ok_or_else(|| RuntimeError::internal("no active frame"))
    }

    pub(crate) fn frame_base(&self) -> Result<usize> {
        self.current_frame().map(|f| f.base)
    }

    /// Namespace of the running code.
    pub(crate) fn current_globals(&self) -> Rc<RefCell<Globals>> {
        self.frames
            .last()
            .map_or_else(|| Rc::clone(&self.globals), |f| Rc::clone(&f.globals))
    }

    pub(crate) fn read_byte(&mut self) -> Result<u8> {
        let frame = self.frame_mut()?;
        let byte = frame
            .closure
            .function
            .chunk
            .code
            .get(frame.ip)
            .copied()
            .ok_or_else(|| RuntimeError::internal("instruction pointer out of bounds"))?;
        frame.ip += 1;
        Ok(byte)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        let lo = self.read_byte()?;
        let hi = self.read_byte()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn read_op(&mut self) -> Result<OpCode> {
        let byte = self.read_byte()?;
        OpCode::try_from(byte)
            .map_err(|b| RuntimeError::internal(format!("unknown opcode 0x{:02X}", b)))
    }

    pub(crate) fn read_constant(&mut self) -> Result<Value> {
        let idx = usize::from(self.read_u16()?);
        self.current_frame()?
            .closure
            .function
            .chunk
            .constants
            .get(idx)
            .cloned()
            .ok_or_else(|| RuntimeError::internal("constant index out of bounds"))
    }

    /// Read a constant that must be a name.
    pub(crate) fn read_name(&mut self) -> Result<Rc<str>> {
        match self.read_constant()? {
            Value::String(name) => Ok(name),
            other => Err(RuntimeError::internal(format!(
                "expected a name constant, found {}",
                other.type_name()
            ))),
        }
    }

    pub(crate) fn function(&self, idx: usize) -> Result<Rc<Function>> {
        self.functions
            .get(idx)
            .cloned()
            .ok_or_else(|| RuntimeError::internal("function index out of bounds"))
    }

    pub(crate) fn functions_mut(&mut self) -> &mut FunctionTable {
        &mut self.functions
    }

    // ========================================================================
    // Upvalues
    // ========================================================================

    /// The open upvalue for stack slot `slot`, created on first capture so
    /// sibling closures share it.
    pub(crate) fn capture_upvalue(&mut self, slot: usize) -> Rc<RefCell<Upvalue>> {
        let existing = self
            .open_upvalues
            .iter()
            .find(|cell| matches!(*cell.borrow(), Upvalue::Open(s) if s == slot));
        if let Some(cell) = existing {
            return Rc::clone(cell);
        }
        let cell = Rc::new(RefCell::new(Upvalue::Open(slot)));
        self.open_upvalues.push(Rc::clone(&cell));
        cell
    }

    /// Close every open upvalue at or above stack slot `from`.
    pub(crate) fn close_upvalues(&mut self, from: usize) {
        let stack = &self.stack;
        self.open_upvalues.retain(|cell| {
            let slot = match *cell.borrow() {
                Upvalue::Open(slot) => slot,
                Upvalue::Closed(_) => return false,
            };
            if slot < from {
                return true;
            }
            let value = stack.get(slot).unwrap_or(Value::Undefined);
            *cell.borrow_mut() = Upvalue::Closed(value);
            false
        });
    }

    pub(crate) fn read_upvalue(&self, cell: &RefCell<Upvalue>) -> Result<Value> {
        match &*cell.borrow() {
            Upvalue::Open(slot) => self.stack.get(*slot),
            Upvalue::Closed(value) => Ok(value.clone()),
        }
    }

    pub(crate) fn write_upvalue(&mut self, cell: &RefCell<Upvalue>, value: Value) -> Result<()> {
        let slot = match &mut *cell.borrow_mut() {
            Upvalue::Open(slot) => *slot,
            Upvalue::Closed(stored) => {
                *stored = value;
                return Ok(());
            }
        };
        self.stack.set(slot, value)
    }

    // ========================================================================
    // Errors
    // ========================================================================

    /// Attach the source position of the current instruction.
    fn locate(&self, mut err: RuntimeError) -> RuntimeError {
        if err.has_location() {
            return err;
        }
        if let Some(frame) = self.frames.last() {
            let chunk = &frame.closure.function.chunk;
            if let Some((line, column)) = chunk.location_at(frame.ip.saturating_sub(1)) {
                err.line = line;
                err.column = column;
                err.source_line = chunk.source_line(line).map(str::to_string);
                return err;
            }
        }
        if let Some(location) = &self.debug_location {
            err.line = location.line;
            err.column = location.column;
            err.source_line = Some(location.text.to_string());
        }
        err
    }

    /// Drop frames and values above the marks, closing their upvalues.
    fn unwind(&mut self, stack_mark: usize, frame_mark: usize) {
        self.close_upvalues(stack_mark);
        self.frames.truncate(frame_mark);
        self.stack.truncate(stack_mark);
    }

    // ========================================================================
    // Host services for built-ins
    // ========================================================================

    /// Write a line to the `print` sink.
    pub(crate) fn write_line(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text)
            .and_then(|_| self.output.flush())
            .map_err(|e| RuntimeError::internal(format!("cannot write output: {}", e)))
    }

    /// Next pseudo-random number in `[0, 1)`.
    pub(crate) fn next_random(&mut self) -> f64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.rng_state >> 11) as f64 / (1u64 << 53) as f64
    }

    pub(crate) fn set_result(&mut self, value: Option<Value>) -> Option<Value> {
        std::mem::replace(&mut self.result, value)
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
