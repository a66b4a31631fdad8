// slate-vm - Bytecode generation tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use slate_vm::compiler::{self, CompileError, CompileOptions};
use slate_vm::{FunctionTable, ParseMode};

/// Compile `src` and disassemble every function it produced.
fn listing(src: &str) -> String {
    let program = slate_parser::parse(src, ParseMode::Strict).unwrap();
    let mut functions = FunctionTable::new();
    let script = compiler::compile(&program, src, &mut functions, CompileOptions::default())
        .unwrap_or_else(|errors| panic!("compile errors for {:?}: {:?}", src, errors));
    let mut out = script.chunk.disassemble("script");
    for function in &functions {
        out.push_str(&function.chunk.disassemble(function.display_name()));
    }
    out
}

/// Disassembly of the function named `name`.
fn function_listing(src: &str, name: &str) -> String {
    let program = slate_parser::parse(src, ParseMode::Strict).unwrap();
    let mut functions = FunctionTable::new();
    compiler::compile(&program, src, &mut functions, CompileOptions::default()).unwrap();
    let function = functions
        .iter()
        .find(|f| f.display_name() == name)
        .unwrap_or_else(|| panic!("no function {:?}", name));
    function.chunk.disassemble(name)
}

fn compile_errors(src: &str) -> Vec<CompileError> {
    let program = slate_parser::parse(src, ParseMode::Strict).unwrap();
    let mut functions = FunctionTable::new();
    match compiler::compile(&program, src, &mut functions, CompileOptions::default()) {
        Ok(_) => panic!("expected compile errors for {:?}", src),
        Err(errors) => errors,
    }
}

fn has_op(listing: &str, mnemonic: &str) -> bool {
    listing
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(mnemonic))
}

#[test]
fn test_expression_statement_sets_result() {
    let out = listing("2 + 3 * 4");
    assert!(has_op(&out, "MULTIPLY"), "{}", out);
    assert!(has_op(&out, "ADD"), "{}", out);
    assert!(has_op(&out, "SET_RESULT"), "{}", out);
    assert!(out.trim_end().ends_with("HALT"), "{}", out);
}

#[test]
fn test_floor_division_opcode() {
    assert!(has_op(&listing("7 // 2"), "FLOOR_DIV"));
}

#[test]
fn test_script_declarations_are_globals() {
    let out = listing("val x = 1\nvar y = x");
    assert!(has_op(&out, "DEFINE_GLOBAL"), "{}", out);
    assert!(has_op(&out, "GET_GLOBAL"), "{}", out);
    assert!(!has_op(&out, "SET_LOCAL"), "{}", out);
}

#[test]
fn test_captured_parameter_becomes_upvalue() {
    let src = "def adder(n) = x -> x + n";
    let outer = function_listing(src, "adder");
    assert!(has_op(&outer, "CLOSURE"), "{}", outer);
    let inner = listing(src);
    assert!(has_op(&inner, "GET_UPVALUE"), "{}", inner);
    assert!(has_op(&inner, "GET_LOCAL"), "{}", inner);
}

#[test]
fn test_method_call_form() {
    let out = listing("\"a\".toUpper()");
    assert!(has_op(&out, "CALL_METHOD"), "{}", out);
    assert!(!has_op(&out, "GET_PROPERTY"), "{}", out);
}

#[test]
fn test_block_scopes_pop_their_locals() {
    let out = listing("var i = 0\nwhile i < 1\n  var t = i\n  i += 1\n");
    assert!(has_op(&out, "POP_N"), "{}", out);
    assert!(has_op(&out, "LOOP"), "{}", out);

    let out = listing("var c = true\nval y = if c\n  var a = 2\n  a * 3\nelse\n  0\ny");
    assert!(has_op(&out, "POP_N_PRESERVE_TOP"), "{}", out);
}

#[test]
fn test_short_circuit_uses_jumps() {
    let out = listing("var a = 1\na && a");
    assert!(has_op(&out, "JUMP_IF_FALSE"), "{}", out);
    let out = listing("var a = 1\na || a");
    assert!(has_op(&out, "JUMP_IF_TRUE"), "{}", out);
}

#[test]
fn test_import_opcode() {
    let out = listing("import a.b._");
    assert!(has_op(&out, "IMPORT_MODULE"), "{}", out);
}

#[test]
fn test_jump_outside_loop_or_function() {
    let errors = compile_errors("break");
    assert_eq!(errors[0].message, "'break' outside of a loop");
    let errors = compile_errors("if true then continue");
    assert_eq!(errors[0].message, "'continue' outside of a loop");
    let errors = compile_errors("return 1");
    assert_eq!(errors[0].message, "'return' outside of a function");
}

#[test]
fn test_break_inside_nested_function_is_not_in_loop() {
    let errors = compile_errors("while true\n  val f = () -> 1\n  def g()\n    break\n    1\n  break\n");
    assert_eq!(errors[0].message, "'break' outside of a loop");
}

#[test]
fn test_local_immutable_reassignment() {
    let errors = compile_errors("def f()\n  val x = 1\n  x = 2\n  x\n");
    assert!(errors[0].message.contains("cannot reassign immutable"), "{:?}", errors);
    assert!(errors[0].line >= 3);
}
