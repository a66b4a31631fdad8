// slate-vm - Error path tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use slate_vm::{Context, Error, ErrorKind, ParseMode, Value, Vm, VmConfig};

fn test_vm() -> Vm {
    Vm::with_config(VmConfig {
        context: Context::Test,
        ..VmConfig::default()
    })
}

fn run_err(src: &str) -> Error {
    let mut vm = test_vm();
    match vm.interpret(src, ParseMode::Strict) {
        Ok(value) => panic!("expected an error for {:?}, got {:?}", src, value),
        Err(e) => e,
    }
}

fn expect_error(src: &str, kind: ErrorKind) {
    let err = run_err(src);
    assert_eq!(err.kind(), kind, "wrong error for {:?}: {}", src, err);
}

fn expect_error_containing(src: &str, kind: ErrorKind, text: &str) {
    let err = run_err(src);
    assert_eq!(err.kind(), kind, "wrong error for {:?}: {}", src, err);
    assert!(
        err.to_string().contains(text),
        "message {:?} does not mention {:?}",
        err.to_string(),
        text
    );
}

// ============================================================================
// Runtime errors
// ============================================================================

#[test]
fn test_division_by_zero() {
    expect_error("1 / 0", ErrorKind::DivisionByZero);
    expect_error("1 // 0", ErrorKind::DivisionByZero);
    expect_error("1 % 0", ErrorKind::DivisionByZero);
    expect_error("7 mod 0", ErrorKind::DivisionByZero);
}

#[test]
fn test_reference_errors() {
    expect_error_containing("nope + 1", ErrorKind::ReferenceError, "undefined variable");
    expect_error_containing(
        "val fixed = 1\nfixed = 2",
        ErrorKind::ReferenceError,
        "cannot reassign immutable",
    );
}

#[test]
fn test_type_errors() {
    expect_error("1 - \"a\"", ErrorKind::TypeError);
    expect_error("5()", ErrorKind::TypeError);
    expect_error("null.x", ErrorKind::TypeError);
    expect_error("1 < \"a\"", ErrorKind::TypeError);
    expect_error("\"s\"(0) = \"t\"", ErrorKind::TypeError);
    expect_error("(42).frobnicate()", ErrorKind::TypeError);
    expect_error_containing("1 instanceof \"number\"", ErrorKind::TypeError, "class");
}

#[test]
fn test_arity_errors() {
    expect_error("def f(a, b) = a + b\nf(1)", ErrorKind::ArityError);
    expect_error("(x -> x)()", ErrorKind::ArityError);
    expect_error("abs(1, 2)", ErrorKind::ArityError);
    expect_error("\"abc\".toUpper(1)", ErrorKind::ArityError);
}

#[test]
fn test_range_errors() {
    expect_error("[1, 2](5)", ErrorKind::RangeError);
    expect_error("[1, 2](-1)", ErrorKind::RangeError);
    expect_error("1 << 40", ErrorKind::RangeError);
    expect_error("[].pop()", ErrorKind::RangeError);
    expect_error("1..10 step 0", ErrorKind::RangeError);
}

#[test]
fn test_overflow_error() {
    expect_error(
        "Instant(0).plusSeconds(9223372036854775807)",
        ErrorKind::OverflowError,
    );
}

#[test]
fn test_deep_recursion_is_reported() {
    expect_error("def down(n) = down(n + 1)\ndown(0)", ErrorKind::RangeError);
}

// ============================================================================
// Compile, parse and lex errors
// ============================================================================

#[test]
fn test_compile_errors() {
    expect_error_containing("break", ErrorKind::CompileError, "'break' outside of a loop");
    expect_error_containing(
        "continue",
        ErrorKind::CompileError,
        "'continue' outside of a loop",
    );
    expect_error_containing(
        "return 1",
        ErrorKind::CompileError,
        "'return' outside of a function",
    );
    expect_error("def f()\n  val x = 1\n  x = 2\n  x\nf()", ErrorKind::CompileError);
    expect_error("var o = {}; o.x ||= 1", ErrorKind::CompileError);
}

#[test]
fn test_parse_errors() {
    expect_error("var = 1", ErrorKind::ParseError);
    expect_error("(1 + 2", ErrorKind::ParseError);
    expect_error("1 + 2 = 3", ErrorKind::ParseError);
    expect_error("match x", ErrorKind::ParseError);
}

#[test]
fn test_parse_errors_accumulate() {
    let Error::Parse(errors) = run_err("var = 1\nvar ok = 2\nx = )\n") else {
        panic!("expected parse errors");
    };
    assert_eq!(errors.len(), 2);
}

#[test]
fn test_lex_errors() {
    expect_error("1 § 2", ErrorKind::LexError);
    expect_error("\"unterminated", ErrorKind::LexError);
    expect_error("if true\n    1\n  2", ErrorKind::LexError);
}

// ============================================================================
// Diagnostics and recovery
// ============================================================================

#[test]
fn test_runtime_error_has_location() {
    let src = "var a = 1\nvar b = a + \"x\" - 2";
    let Error::Runtime(err) = run_err(src) else {
        panic!("expected a runtime error");
    };
    assert_eq!(err.line, 2);
    assert!(err.has_location());
    let rendered = err.render();
    assert!(rendered.contains("TypeError"), "{}", rendered);
    assert!(rendered.contains("^"), "{}", rendered);
}

#[test]
fn test_vm_usable_after_error() {
    let mut vm = test_vm();
    assert!(vm.interpret("var x = 10", ParseMode::Strict).is_ok());
    assert!(vm.interpret("def f(n) = n / 0\nf(x)", ParseMode::Strict).is_err());
    assert_eq!(vm.stack_depth(), 0);
    let value = vm.interpret("x * 2", ParseMode::Strict).unwrap();
    assert_eq!(value, Some(Value::Int(20)));
}

#[test]
fn test_error_inside_native_callback_unwinds() {
    let mut vm = test_vm();
    assert!(
        vm.interpret("[1, 2, 0].map(n -> 10 // n)", ParseMode::Strict)
            .is_err()
    );
    assert_eq!(vm.stack_depth(), 0);
    let value = vm.interpret("[1, 2].map(n -> n + 1)", ParseMode::Strict).unwrap();
    assert_eq!(value.map(|v| v.to_string()), Some("[2, 3]".to_string()));
}
