// slate-embed - Embedding API for Slate
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # slate-embed
//!
//! A high-level embedding API for the Slate scripting language.
//!
//! [`Engine`] owns a VM, converts between Rust and Slate values and
//! registers Rust functions as Slate globals.
//!
//! ## Quick Start
//!
//! ```rust
//! use slate_embed::Engine;
//!
//! let mut engine = Engine::new();
//! let result = engine.eval("2 + 3 * 4").unwrap();
//! assert_eq!(result.to_string(), "14");
//! ```
//!
//! ## Registering Native Functions
//!
//! ```rust
//! use slate_embed::{Arity, Engine, RuntimeError, Value};
//!
//! let mut engine = Engine::new();
//! engine.register_native("double", Arity::Exact(1), |args: &[Value]| match &args[0] {
//!     Value::Int(n) => Ok(Value::from(i64::from(*n) * 2)),
//!     other => Err(RuntimeError::type_error(format!("expected int, got {}", other.type_name()))),
//! });
//! let result = engine.eval("double(21)").unwrap();
//! assert_eq!(result.to_string(), "42");
//! ```

mod convert;
mod engine;

pub use convert::{FromValue, IntoValue, convert_error, from_value, to_value};
pub use engine::Engine;

pub use slate_parser::{ErrorKind, ParseMode};
pub use slate_vm::{Arity, Error, RuntimeError, Value, VmConfig};

/// Result of engine operations.
pub type Result<T> = std::result::Result<T, Error>;
