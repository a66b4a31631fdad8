// slate-vm - Module import tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::fs;
use std::path::{Path, PathBuf};

use slate_vm::{Context, ErrorKind, OutputBuffer, ParseMode, Value, Vm, VmConfig};

/// A scratch directory removed on drop.
struct ScratchDir(PathBuf);

impl ScratchDir {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "slate-module-test-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        ScratchDir(dir)
    }

    fn path(&self) -> &Path {
        &self.0
    }

    fn write(&self, relative: &str, source: &str) {
        let path = self.0.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, source).unwrap();
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

fn vm_in(dir: &Path) -> Vm {
    let mut vm = Vm::with_config(VmConfig {
        context: Context::Test,
        ..VmConfig::default()
    });
    vm.set_script_dir(Some(dir.to_path_buf()));
    vm
}

fn run_in(dir: &Path, src: &str) -> Value {
    let mut vm = vm_in(dir);
    match vm.interpret(src, ParseMode::Strict) {
        Ok(Some(value)) => value,
        Ok(None) => panic!("no result for {:?}", src),
        Err(e) => panic!("error for {:?}: {}", src, e),
    }
}

fn error_in(dir: &Path, src: &str) -> slate_vm::Error {
    let mut vm = vm_in(dir);
    match vm.interpret(src, ParseMode::Strict) {
        Ok(value) => panic!("expected an error for {:?}, got {:?}", src, value),
        Err(e) => e,
    }
}

const UTIL: &str = "\
def double(x) = x * 2
val base = 10
private val secret = 42
def scaled(x) = double(x) + base
";

#[test]
fn test_namespace_import() {
    let dir = ScratchDir::new("namespace");
    dir.write("lib/util.slate", UTIL);
    assert_eq!(
        run_in(dir.path(), "import lib.util\nutil.scaled(4)"),
        Value::Int(18)
    );
    assert_eq!(
        run_in(dir.path(), "import lib.util\nutil.secret"),
        Value::Undefined
    );
}

#[test]
fn test_wildcard_import() {
    let dir = ScratchDir::new("wildcard");
    dir.write("lib/util.slate", UTIL);
    assert_eq!(
        run_in(dir.path(), "import lib.util._\ndouble(base)"),
        Value::Int(20)
    );
    let err = error_in(dir.path(), "import lib.util._\nsecret");
    assert_eq!(err.kind(), ErrorKind::ReferenceError);
}

#[test]
fn test_selective_import_with_alias() {
    let dir = ScratchDir::new("selective");
    dir.write("util.slate", UTIL);
    assert_eq!(
        run_in(dir.path(), "import util.{double => twice, base}\ntwice(base)"),
        Value::Int(20)
    );
    let err = error_in(dir.path(), "import util.{double}\nbase");
    assert_eq!(err.kind(), ErrorKind::ReferenceError);
}

#[test]
fn test_missing_export() {
    let dir = ScratchDir::new("missing-export");
    dir.write("util.slate", UTIL);
    let err = error_in(dir.path(), "import util.{secret}");
    assert_eq!(err.kind(), ErrorKind::ReferenceError);
    assert!(err.to_string().contains("has no export 'secret'"), "{}", err);
}

#[test]
fn test_module_not_found() {
    let dir = ScratchDir::new("not-found");
    let err = error_in(dir.path(), "import no.such.thing");
    assert_eq!(err.kind(), ErrorKind::ReferenceError);
    assert!(err.to_string().contains("module not found"), "{}", err);
}

#[test]
fn test_circular_import() {
    let dir = ScratchDir::new("circular");
    dir.write("a.slate", "import b\nval x = 1\n");
    dir.write("b.slate", "import a\nval y = 2\n");
    let err = error_in(dir.path(), "import a");
    assert_eq!(err.kind(), ErrorKind::ReferenceError);
    assert!(err.to_string().contains("circular import"), "{}", err);
}

#[test]
fn test_module_runs_once() {
    let dir = ScratchDir::new("once");
    dir.write("noisy.slate", "print(\"loading\")\nval n = 1\n");
    let mut vm = vm_in(dir.path());
    let out = OutputBuffer::new();
    vm.set_output(Box::new(out.clone()));
    let result = vm
        .interpret("import noisy\nimport noisy.{n}\nnoisy.n + n", ParseMode::Strict)
        .unwrap();
    assert_eq!(result, Some(Value::Int(2)));
    assert_eq!(out.contents(), "loading\n");
}

#[test]
fn test_module_errors_surface() {
    let dir = ScratchDir::new("broken");
    dir.write("bad.slate", "val x = 1 / 0\n");
    dir.write("syntax.slate", "var = 1\n");
    assert_eq!(
        error_in(dir.path(), "import bad").kind(),
        ErrorKind::DivisionByZero
    );
    let err = error_in(dir.path(), "import syntax");
    assert_eq!(err.kind(), ErrorKind::ParseError);
    assert!(err.to_string().contains("in module 'syntax'"), "{}", err);
}

#[test]
fn test_nested_import_resolves_from_module_directory() {
    let dir = ScratchDir::new("nested");
    dir.write("pkg/inner.slate", "val v = 5\n");
    dir.write("pkg/outer.slate", "import inner\nval w = inner.v + 1\n");
    assert_eq!(
        run_in(dir.path(), "import pkg.outer\nouter.w"),
        Value::Int(6)
    );
}

#[test]
fn test_search_paths() {
    let script = ScratchDir::new("script");
    let library = ScratchDir::new("library");
    library.write("shared/math.slate", "def square(x) = x * x\n");
    let mut vm = Vm::with_config(VmConfig {
        context: Context::Test,
        search_paths: vec![library.path().to_path_buf()],
        ..VmConfig::default()
    });
    vm.set_script_dir(Some(script.path().to_path_buf()));
    let result = vm
        .interpret("import shared.math._\nsquare(7)", ParseMode::Strict)
        .unwrap();
    assert_eq!(result, Some(Value::Int(49)));

    let mut vm = vm_in(script.path());
    vm.add_search_path(library.path());
    let result = vm
        .interpret("import shared.math\nmath.square(3)", ParseMode::Strict)
        .unwrap();
    assert_eq!(result, Some(Value::Int(9)));
}
