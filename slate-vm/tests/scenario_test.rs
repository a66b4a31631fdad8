// slate-vm - End-to-end language scenarios
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use slate_vm::{Arity, Context, ErrorKind, ParseMode, Value, Vm, VmConfig};

fn test_vm() -> Vm {
    Vm::with_config(VmConfig {
        context: Context::Test,
        ..VmConfig::default()
    })
}

fn compile_and_run(src: &str) -> Value {
    let mut vm = test_vm();
    match vm.interpret(src, ParseMode::Strict) {
        Ok(Some(value)) => value,
        Ok(None) => panic!("no result for {:?}", src),
        Err(e) => panic!("error for {:?}: {}", src, e),
    }
}

fn expect_error(src: &str, kind: ErrorKind) {
    let mut vm = test_vm();
    match vm.interpret(src, ParseMode::Strict) {
        Ok(value) => panic!("expected {:?} for {:?}, got {:?}", kind, src, value),
        Err(e) => assert_eq!(e.kind(), kind, "wrong error for {:?}: {}", src, e),
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_precedence() {
    assert!(matches!(compile_and_run("2 + 3 * 4"), Value::Int(14)));
    assert!(matches!(compile_and_run("(2 + 3) * 4"), Value::Int(20)));
    assert!(matches!(compile_and_run("2 ** 3 ** 2"), Value::Number(n) if n == 512.0));
}

#[test]
fn test_floor_division() {
    assert!(matches!(compile_and_run("17 // 3"), Value::Int(5)));
    assert!(matches!(compile_and_run("-17 // 3"), Value::Int(-6)));
    assert!(matches!(compile_and_run("-17 % 3"), Value::Int(1)));
    assert!(matches!(compile_and_run("17 mod -3"), Value::Int(-1)));
}

#[test]
fn test_true_division_yields_number() {
    assert!(matches!(compile_and_run("7 / 2"), Value::Number(n) if n == 3.5));
    assert!(matches!(compile_and_run("6 / 3"), Value::Number(n) if n == 2.0));
}

#[test]
fn test_increment_promotes_to_bigint() {
    let value = compile_and_run("var max = 2147483647; ++max");
    assert!(matches!(value, Value::BigInt(_)));
    assert_eq!(value.to_string(), "2147483648");
}

#[test]
fn test_bigint_arithmetic_stays_big() {
    let value = compile_and_run("2147483647 * 2147483647");
    assert!(matches!(value, Value::BigInt(_)));
    assert_eq!(value.to_string(), "4611686014132420609");
    assert!(matches!(compile_and_run("2147483648 - 1"), Value::BigInt(_)));
}

#[test]
fn test_bitwise() {
    assert!(matches!(compile_and_run("6 & 3"), Value::Int(2)));
    assert!(matches!(compile_and_run("6 | 3"), Value::Int(7)));
    assert!(matches!(compile_and_run("6 ^ 3"), Value::Int(5)));
    assert!(matches!(compile_and_run("~0"), Value::Int(-1)));
    assert!(matches!(compile_and_run("1 << 4"), Value::Int(16)));
    assert!(matches!(compile_and_run("-16 >> 2"), Value::Int(-4)));
    assert!(matches!(compile_and_run("-1 >>> 28"), Value::Int(15)));
}

// ============================================================================
// Functions and control flow
// ============================================================================

#[test]
fn test_adder_and_compose() {
    assert!(matches!(
        compile_and_run("def adder(n) = x -> x + n; adder(5)(10)"),
        Value::Int(15)
    ));
    assert!(matches!(
        compile_and_run("def compose(f, g) = x -> f(g(x)); compose(a -> a + 1, b -> 2*b)(3)"),
        Value::Int(7)
    ));
}

#[test]
fn test_for_loop_sum() {
    assert!(matches!(
        compile_and_run("var sum = 0; for var i = 0; i < 5; i += 1 do sum = sum + i; sum"),
        Value::Int(10)
    ));
}

#[test]
fn test_while_and_do_while() {
    let src = "\
var n = 0
while n < 10
  n += 3
n
";
    assert!(matches!(compile_and_run(src), Value::Int(12)));
    // The body runs once even though the condition is false.
    let src = "\
var runs = 0
do
  runs += 1
while false
runs
";
    assert!(matches!(compile_and_run(src), Value::Int(1)));
}

#[test]
fn test_break_and_continue() {
    let src = "\
var total = 0
for var i = 0; i < 10; i += 1
  if i % 2 == 0 then continue
  if i > 7 then break
  total += i
total
";
    // 1 + 3 + 5 + 7
    assert!(matches!(compile_and_run(src), Value::Int(16)));

    let src = "\
var i = 0
var seen = 0
while i < 6
  i += 1
  if i == 3 then continue
  seen += i
seen
";
    assert!(matches!(compile_and_run(src), Value::Int(18)));

    let src = "\
var n = 0
loop
  n += 1
  if n >= 4 then break
n
";
    assert!(matches!(compile_and_run(src), Value::Int(4)));

    let src = "\
var n = 0
var odd = 0
do
  n += 1
  if n % 2 == 0 then continue
  odd += 1
while n < 5
odd
";
    assert!(matches!(compile_and_run(src), Value::Int(3)));
}

#[test]
fn test_nested_break_leaves_inner_loop_only() {
    let src = "\
var pairs = 0
for var i = 0; i < 3; i += 1
  for var j = 0; j < 3; j += 1
    if j == 1 then break
    pairs += 1
pairs
";
    assert!(matches!(compile_and_run(src), Value::Int(3)));
}

#[test]
fn test_if_expression_forms() {
    assert!(matches!(
        compile_and_run("var x = 5; if x > 3 then 1 elif x > 1 then 2 else 3 end if"),
        Value::Int(1)
    ));
    assert!(matches!(
        compile_and_run("var y = if false then 1 else 2; y"),
        Value::Int(2)
    ));
    assert!(matches!(compile_and_run("true ? \"a\" : \"b\"").to_string().as_str(), "a"));
}

#[test]
fn test_block_value_keeps_captured_local() {
    let src = "\
var f = null
val v = if true
  var x = 5
  f = () -> x
  x * 2
else
  0
v + f()";
    assert!(matches!(compile_and_run(src), Value::Int(15)));
}

#[test]
fn test_scope_cleanup() {
    let mut vm = test_vm();
    vm.define_native("depth", Arity::Exact(0), |vm, _| {
        Ok(Value::Int(vm.stack_depth() as i32))
    });
    let src = "\
val before = depth()
var after = 0
if true
  var a = 1
  var b = 2
  a + b
for var i = 0; i < 3; i += 1
  var inner = i * 2
  inner
var k = 0
while k < 2
  var tmp = k
  k += 1
after = depth()
after - before
";
    let result = vm.interpret(src, ParseMode::Strict).unwrap().unwrap();
    assert_eq!(result, Value::Int(0));
    assert_eq!(vm.stack_depth(), 0);
}

// ============================================================================
// Strings, collections, operators
// ============================================================================

#[test]
fn test_template_literal() {
    assert_eq!(
        compile_and_run("`Hello ${\"Wo\" + \"rld\"}`").to_string(),
        "Hello World"
    );
    assert_eq!(
        compile_and_run("var name = \"Ada\"; `Hi $name, ${1 + 1} times`").to_string(),
        "Hi Ada, 2 times"
    );
}

#[test]
fn test_string_indexing() {
    assert_eq!(compile_and_run("\"hello\"(0)").to_string(), "h");
    expect_error("\"hello\"(10)", ErrorKind::RangeError);
}

#[test]
fn test_string_concatenation_coerces() {
    assert_eq!(compile_and_run("\"n=\" + 5").to_string(), "n=5");
    assert_eq!(compile_and_run("1.5 + \"x\"").to_string(), "1.5x");
    expect_error("1 + true", ErrorKind::TypeError);
}

#[test]
fn test_array_concatenation() {
    let value = compile_and_run("[1,2] + [3,4]");
    assert_eq!(value.to_string(), "[1, 2, 3, 4]");
    assert!(matches!(compile_and_run("([1,2] + [3,4]).length"), Value::Int(4)));
}

#[test]
fn test_in_operator() {
    assert_eq!(compile_and_run("\"a\" in {a:1, b:2}"), Value::Boolean(true));
    assert_eq!(compile_and_run("\"c\" in {a:1}"), Value::Boolean(false));
    assert_eq!(compile_and_run("3 in [1, 2, 3]"), Value::Boolean(true));
    assert_eq!(compile_and_run("5 in 1..<5"), Value::Boolean(false));
    assert_eq!(compile_and_run("\"ell\" in \"hello\""), Value::Boolean(true));
}

#[test]
fn test_containers_compare_by_identity() {
    assert_eq!(compile_and_run("[1] == [1]"), Value::Boolean(false));
    assert_eq!(compile_and_run("val a = [1]; a == a"), Value::Boolean(true));
    assert_eq!(compile_and_run("{} != {}"), Value::Boolean(true));
}

#[test]
fn test_objects_and_members() {
    let src = "\
var o = {count: 1}
o.count += 2
++o.count
o.missing == undefined ? o.count : -1
";
    assert!(matches!(compile_and_run(src), Value::Int(4)));
    assert_eq!(compile_and_run("var o = null; o?.x ?? \"none\"").to_string(), "none");
}

#[test]
fn test_index_assignment() {
    assert_eq!(
        compile_and_run("var a = [1, 2, 3]; a(1) = 20; a(2) += 1; a").to_string(),
        "[1, 20, 4]"
    );
}

#[test]
fn test_logical_assignment() {
    assert!(matches!(compile_and_run("var a = null; a ??= 5; a"), Value::Int(5)));
    assert!(matches!(compile_and_run("var b = 0; b ||= 7; b"), Value::Int(7)));
    assert!(matches!(compile_and_run("var c = 1; c &&= 9; c"), Value::Int(9)));
}

#[test]
fn test_instanceof() {
    assert_eq!(compile_and_run("\"x\" instanceof String"), Value::Boolean(true));
    assert_eq!(compile_and_run("[1] instanceof Array"), Value::Boolean(true));
    assert_eq!(compile_and_run("[1] instanceof String"), Value::Boolean(false));
    expect_error("1 instanceof \"number\"", ErrorKind::TypeError);
}

#[test]
fn test_truthiness() {
    assert_eq!(compile_and_run("!0"), Value::Boolean(true));
    assert_eq!(compile_and_run("!\"\""), Value::Boolean(true));
    assert_eq!(compile_and_run("![]"), Value::Boolean(false));
    assert_eq!(compile_and_run("not {}"), Value::Boolean(false));
    assert!(matches!(compile_and_run("0 ?? 3"), Value::Int(0)));
}

// ============================================================================
// Date and time
// ============================================================================

#[test]
fn test_leap_day_plus_year_clamps() {
    assert!(matches!(
        compile_and_run("LocalDate.of(2024,2,29).plusYears(1).day()"),
        Value::Int(28)
    ));
}

#[test]
fn test_instant_arithmetic() {
    assert_eq!(
        compile_and_run("Instant(0).plusSeconds(60).plusMillis(500).toString()").to_string(),
        "1970-01-01T00:01:00.500Z"
    );
}

#[test]
fn test_date_comparisons() {
    assert_eq!(
        compile_and_run("LocalDate(2024, 1, 1) < LocalDate(2024, 1, 2)"),
        Value::Boolean(true)
    );
    assert_eq!(
        compile_and_run("LocalDate(2024, 1, 1).equals(LocalDate.of(2024, 1, 1))"),
        Value::Boolean(true)
    );
}
