// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Module loading for `IMPORT_MODULE`.
//!
//! `import a.b.c` looks for `a/b/c.slate` in the importing script's
//! directory, then in each configured search path. A module runs once per
//! VM in its own namespace; its non-private globals become the export
//! object.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::debug;
use slate_parser::ParseMode;

use crate::compiler::{self, CompileOptions};
use crate::opcode::{IMPORT_NAMESPACE, IMPORT_WILDCARD};
use crate::value::{ObjectMap, Value};
use crate::vm::{Global, Result, RuntimeError, Vm};

/// Modules already run, and the chain currently loading.
#[derive(Debug, Default)]
pub struct ModuleCache {
    loaded: HashMap<PathBuf, Value>,
    loading: Vec<PathBuf>,
}

impl ModuleCache {
    pub fn is_loaded(&self, path: &Path) -> bool {
        self.loaded.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}

/// How the exports are bound in the importing namespace.
enum Binding {
    Namespace(Rc<str>),
    Wildcard,
    Selective(Vec<(Rc<str>, Rc<str>)>),
}

impl Vm {
    pub(crate) fn execute_import(&mut self) -> Result<()> {
        let dotted = self.read_name()?;
        let binding = match self.read_byte()? {
            IMPORT_NAMESPACE => Binding::Namespace(self.read_name()?),
            IMPORT_WILDCARD => Binding::Wildcard,
            count => {
                let mut names = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let name = self.read_name()?;
                    let alias = self.read_name()?;
                    names.push((name, alias));
                }
                Binding::Selective(names)
            }
        };

        let exports = self.load_module(&dotted)?;
        let globals = self.current_globals();
        let mut globals = globals.borrow_mut();
        let mut bind = |name: Rc<str>, value: Value| {
            globals.insert(
                name,
                Global {
                    value,
                    immutable: false,
                    private: true,
                },
            );
        };
        match binding {
            Binding::Namespace(name) => bind(name, exports),
            Binding::Wildcard => {
                if let Value::Object(map) = &exports {
                    for (name, value) in map.borrow().iter() {
                        bind(Rc::clone(name), value.clone());
                    }
                }
            }
            Binding::Selective(names) => {
                let Value::Object(map) = &exports else {
                    return Err(RuntimeError::internal("module exports are not an object"));
                };
                let map = map.borrow();
                for (name, alias) in names {
                    let value = map.get(&name).cloned().ok_or_else(|| {
                        RuntimeError::reference(format!(
                            "module '{}' has no export '{}'",
                            dotted, name
                        ))
                    })?;
                    bind(alias, value);
                }
            }
        }
        Ok(())
    }

    /// First `a/b/c.slate` found under the script directory or a search path.
    fn resolve_module(&self, dotted: &str) -> Option<PathBuf> {
        let mut relative: PathBuf = dotted.split('.').collect();
        relative.set_extension("slate");
        self.script_dir
            .iter()
            .chain(self.config.search_paths.iter())
            .map(|dir| dir.join(&relative))
            .find(|candidate| candidate.is_file())
    }

    /// Run a module (once) and return its export object.
    fn load_module(&mut self, dotted: &str) -> Result<Value> {
        let path = self.resolve_module(dotted).ok_or_else(|| {
            RuntimeError::reference(format!("module not found: '{}'", dotted))
        })?;
        let path = std::fs::canonicalize(&path).unwrap_or(path);
        if let Some(exports) = self.modules.loaded.get(&path) {
            return Ok(exports.clone());
        }
        if self.modules.loading.contains(&path) {
            return Err(RuntimeError::reference(format!(
                "circular import of '{}'",
                dotted
            )));
        }

        let source = std::fs::read_to_string(&path).map_err(|e| {
            RuntimeError::reference(format!("cannot read module '{}': {}", dotted, e))
        })?;
        debug!("loading module {} from {}", dotted, path.display());

        self.modules.loading.push(path.clone());
        let outcome = self.run_module(dotted, &path, &source);
        self.modules.loading.pop();

        let exports = outcome?;
        self.modules.loaded.insert(path, exports.clone());
        Ok(exports)
    }

    fn run_module(&mut self, dotted: &str, path: &Path, source: &str) -> Result<Value> {
        let program = slate_parser::parse(source, ParseMode::Strict)
            .map_err(|errors| module_error(dotted, crate::Error::Parse(errors)))?;
        let options = CompileOptions {
            mode: ParseMode::Strict,
            precision: self.config.float_precision,
        };
        let function = compiler::compile(&program, source, self.functions_mut(), options)
            .map_err(|errors| module_error(dotted, crate::Error::Compile(errors)))?;

        let namespace = self.new_namespace();
        let saved_dir = std::mem::replace(
            &mut self.script_dir,
            path.parent().map(Path::to_path_buf),
        );
        let saved_result = self.set_result(None);
        let outcome = self.execute_in(function, Rc::clone(&namespace));
        self.set_result(saved_result);
        self.script_dir = saved_dir;
        outcome?;

        let exports: ObjectMap = namespace
            .borrow()
            .iter()
            .filter(|(_, global)| !global.private)
            .map(|(name, global)| (Rc::clone(name), global.value.clone()))
            .collect();
        Ok(Value::object(exports))
    }
}

fn module_error(dotted: &str, err: crate::Error) -> RuntimeError {
    RuntimeError::new(err.kind(), format!("in module '{}': {}", dotted, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::ErrorKind;

    #[test]
    fn test_module_error_keeps_kind() {
        let errors = slate_parser::parse("var = 1", ParseMode::Strict).unwrap_err();
        let err = module_error("a.b", crate::Error::Parse(errors));
        assert_eq!(err.kind, ErrorKind::ParseError);
        assert!(err.message.starts_with("in module 'a.b'"));
    }
}
