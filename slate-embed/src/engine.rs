// slate-embed - Engine implementation
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The Engine struct - main entry point for embedding Slate.

use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use slate_parser::ParseMode;
use slate_vm::{Arity, Context, Error, RuntimeError, Value, Vm, VmConfig};

use crate::Result;
use crate::convert::{FromValue, IntoValue};

/// The Slate scripting engine.
///
/// `Engine` owns one VM; globals defined by one `eval` are visible to the
/// next.
///
/// # Thread Safety
///
/// **`Engine` is NOT thread-safe.** Values are reference counted with `Rc`.
/// Create one `Engine` per thread.
///
/// # Example
///
/// ```rust
/// use slate_embed::Engine;
///
/// let mut engine = Engine::new();
/// engine.eval("val greeting = \"hi\"").unwrap();
/// let result = engine.eval("greeting + \"!\"").unwrap();
/// assert_eq!(result.to_string(), "hi!");
/// ```
pub struct Engine {
    vm: Vm,
    mode: ParseMode,
}

impl Engine {
    /// Create an engine with silent diagnostics and strict parsing.
    pub fn new() -> Self {
        Self::with_config(VmConfig {
            context: Context::Test,
            ..VmConfig::default()
        })
    }

    pub fn with_config(config: VmConfig) -> Self {
        Engine {
            vm: Vm::with_config(config),
            mode: ParseMode::Strict,
        }
    }

    /// Switch between strict (script) and lenient (REPL) parsing.
    pub fn set_parse_mode(&mut self, mode: ParseMode) {
        self.mode = mode;
    }

    /// Evaluate Slate source.
    ///
    /// Returns the value of the last expression statement, or `null` when
    /// the code has none.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The code contains lexical or syntax errors
    /// - Compilation fails (`break` outside a loop, etc.)
    /// - Execution fails (undefined variable, type error, etc.)
    pub fn eval(&mut self, code: &str) -> Result<Value> {
        let result = self.vm.interpret(code, self.mode)?;
        Ok(result.unwrap_or(Value::Null))
    }

    /// Evaluate and convert the result.
    ///
    /// ```rust
    /// use slate_embed::Engine;
    ///
    /// let mut engine = Engine::new();
    /// let squares: Vec<i64> = engine.eval_as("[1, 2, 3].map(x -> x * x)").unwrap();
    /// assert_eq!(squares, vec![1, 4, 9]);
    /// ```
    pub fn eval_as<T: FromValue>(&mut self, code: &str) -> Result<T> {
        let value = self.eval(code)?;
        T::from_value(&value)
    }

    /// Evaluate a script file. Imports resolve relative to the file's
    /// directory while it runs.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (not found, permission denied)
    /// - The file fails to parse, compile or run
    pub fn eval_file(&mut self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let code = std::fs::read_to_string(path).map_err(|e| {
            Error::Runtime(RuntimeError::reference(format!(
                "cannot read '{}': {}",
                path.display(),
                e
            )))
        })?;
        debug!("eval_file {}", path.display());
        let saved = self.vm.script_dir().cloned();
        self.vm.set_script_dir(path.parent().map(Path::to_path_buf));
        let outcome = self.eval(&code);
        self.vm.set_script_dir(saved);
        outcome
    }

    /// Get a global. Returns `None` if it is not defined.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.vm.get_global(name)
    }

    /// Get a global converted to `T`.
    ///
    /// Returns `None` if the global is not defined or cannot be converted.
    #[must_use]
    pub fn get_as<T: FromValue>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|v| T::from_value(&v).ok())
    }

    /// Get a global converted to `T`, keeping the conversion error.
    ///
    /// ```rust
    /// use slate_embed::Engine;
    ///
    /// let mut engine = Engine::new();
    /// engine.eval("var x = \"hello\"").unwrap();
    ///
    /// // Not defined
    /// assert!(engine.try_get_as::<i64>("y").unwrap().is_none());
    ///
    /// // Defined, but a string
    /// assert!(engine.try_get_as::<i64>("x").is_err());
    /// ```
    pub fn try_get_as<T: FromValue>(&self, name: &str) -> Result<Option<T>> {
        match self.get(name) {
            Some(v) => T::from_value(&v).map(Some),
            None => Ok(None),
        }
    }

    /// Define or overwrite a mutable global.
    pub fn set(&mut self, name: &str, value: impl IntoValue) {
        self.vm.define_global(name, value.into_value());
    }

    /// Call a global function with arguments.
    ///
    /// ```rust
    /// use slate_embed::{Engine, Value};
    ///
    /// let mut engine = Engine::new();
    /// engine.eval("def add(a, b) = a + b").unwrap();
    /// let result = engine.call("add", &[Value::Int(1), Value::Int(2)]).unwrap();
    /// assert_eq!(result.to_string(), "3");
    /// ```
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        let func = self.get(name).ok_or_else(|| {
            Error::Runtime(RuntimeError::reference(format!(
                "undefined variable '{}'",
                name
            )))
        })?;
        Ok(self.vm.call_value(&func, args)?)
    }

    /// Register a native Rust function as a global.
    ///
    /// The VM checks the argument count against `arity` before the
    /// function runs.
    ///
    /// ```rust
    /// use slate_embed::{Arity, Engine, Value};
    ///
    /// let mut engine = Engine::new();
    /// engine.register_native("greet", Arity::Range(0, 1), |args| {
    ///     let name = match args.first() {
    ///         Some(Value::String(s)) => s.to_string(),
    ///         _ => "World".to_string(),
    ///     };
    ///     Ok(Value::from(format!("Hello, {}!", name)))
    /// });
    /// assert_eq!(engine.eval("greet(\"Ada\")").unwrap().to_string(), "Hello, Ada!");
    /// ```
    pub fn register_native(
        &mut self,
        name: &str,
        arity: Arity,
        func: impl Fn(&[Value]) -> std::result::Result<Value, RuntimeError> + 'static,
    ) {
        self.vm.define_native(name, arity, move |_vm, args| func(args));
    }

    /// Register a native that may call back into Slate, for example to
    /// apply a function argument.
    pub fn register_native_with_vm(
        &mut self,
        name: &str,
        arity: Arity,
        func: impl Fn(&mut Vm, &[Value]) -> std::result::Result<Value, RuntimeError> + 'static,
    ) {
        self.vm.define_native(name, arity, func);
    }

    /// Add a directory searched by `import`.
    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.vm.add_search_path(path);
    }

    /// Redirect `print` output.
    pub fn set_output(&mut self, output: Box<dyn Write>) {
        self.vm.set_output(output);
    }

    /// Names of the globals defined so far, built-ins included.
    #[must_use]
    pub fn global_names(&self) -> Vec<String> {
        self.vm.global_names()
    }

    /// The underlying VM.
    #[must_use]
    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    pub fn vm_mut(&mut self) -> &mut Vm {
        &mut self.vm
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
