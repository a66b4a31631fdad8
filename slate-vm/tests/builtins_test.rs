// slate-vm - Built-in function and class tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use slate_vm::{Context, FloatPrecision, OutputBuffer, ParseMode, Value, Vm, VmConfig};

fn test_vm() -> Vm {
    Vm::with_config(VmConfig {
        context: Context::Test,
        ..VmConfig::default()
    })
}

fn run(src: &str) -> Value {
    let mut vm = test_vm();
    match vm.interpret(src, ParseMode::Strict) {
        Ok(Some(value)) => value,
        Ok(None) => panic!("no result for {:?}", src),
        Err(e) => panic!("error for {:?}: {}", src, e),
    }
}

fn run_str(src: &str) -> String {
    run(src).to_string()
}

/// Run `src` and return what it printed.
fn output_of(src: &str) -> String {
    let mut vm = test_vm();
    let out = OutputBuffer::new();
    vm.set_output(Box::new(out.clone()));
    if let Err(e) = vm.interpret(src, ParseMode::Strict) {
        panic!("error for {:?}: {}", src, e);
    }
    out.contents()
}

// ============================================================================
// Global functions
// ============================================================================

#[test]
fn test_print_joins_arguments() {
    assert_eq!(output_of("print(\"a\", 1, [2])\nprint()"), "a 1 [2]\n\n");
}

#[test]
fn test_type_and_conversions() {
    assert_eq!(run_str("type(1)"), "int");
    assert_eq!(run_str("type(1.5)"), "number");
    assert_eq!(run_str("type(2147483648)"), "bigint");
    assert_eq!(run_str("type(\"s\")"), "string");
    assert_eq!(run_str("type(x -> x)"), "function");
    assert_eq!(run_str("type(LocalDate(2024, 1, 1))"), "localdate");
    assert_eq!(run_str("str(12) + str(null)"), "12null");
    assert_eq!(run("int(\"42\")"), Value::Int(42));
    assert_eq!(run("int(-3.9)"), Value::Int(-3));
    assert!(matches!(run("int(\"99999999999\")"), Value::BigInt(_)));
    assert!(matches!(run("float(3)"), Value::Number(n) if n == 3.0));
}

#[test]
fn test_len() {
    assert_eq!(run("len(\"héllo\")"), Value::Int(5));
    assert_eq!(run("len([1, 2, 3])"), Value::Int(3));
    assert_eq!(run("len({a: 1, b: 2})"), Value::Int(2));
    assert_eq!(run("len(0..<10)"), Value::Int(10));
}

#[test]
fn test_math() {
    assert_eq!(run("abs(-5)"), Value::Int(5));
    assert_eq!(run("floor(2.7)"), Value::Int(2));
    assert_eq!(run("ceil(2.1)"), Value::Int(3));
    assert_eq!(run("round(2.5)"), Value::Int(3));
    assert_eq!(run("floor(7)"), Value::Int(7));
    assert_eq!(run("sign(-5)"), Value::Int(-1));
    assert!(matches!(run("sign(-0.5)"), Value::Number(n) if n == -1.0));
    assert!(matches!(run("sqrt(16)"), Value::Number(n) if n == 4.0));
    assert!(matches!(run("pow(2, 10)"), Value::Number(n) if n == 1024.0));
    assert!(matches!(run("degrees(0)"), Value::Number(n) if n == 0.0));
    assert!(matches!(run("random()"), Value::Number(n) if (0.0..1.0).contains(&n)));
}

#[test]
fn test_min_and_max() {
    assert_eq!(run("min(3, 1, 2)"), Value::Int(1));
    assert_eq!(run("max(3, 1, 2)"), Value::Int(3));
    assert_eq!(run("max([4, 9, 2])"), Value::Int(9));
    assert_eq!(run_str("min(\"pear\", \"apple\")"), "apple");
}

// ============================================================================
// Strings and builders
// ============================================================================

#[test]
fn test_string_methods() {
    assert_eq!(run_str("\"Hello\".toUpper()"), "HELLO");
    assert_eq!(run_str("\"  pad  \".trim()"), "pad");
    assert_eq!(run("\"hello\".indexOf(\"l\")"), Value::Int(2));
    assert_eq!(run_str("\"hello\".substring(1, 3)"), "el");
    assert_eq!(run_str("\"a,b,c\".split(\",\")"), "[\"a\", \"b\", \"c\"]");
    assert_eq!(run_str("\"aXbX\".replace(\"X\", \"-\")"), "a-b-");
    assert_eq!(run_str("\"ab\".repeat(3)"), "ababab");
    assert_eq!(run("\"abc\".length"), Value::Int(3));
    assert_eq!(run("\"\".isEmpty()"), Value::Boolean(true));
}

#[test]
fn test_string_builder_chains() {
    let src = "\
val sb = StringBuilder()
sb.append(\"a\").append(1).append(true)
sb.toString()
";
    assert_eq!(run_str(src), "a1true");
    assert_eq!(run("StringBuilder(\"xy\").append(\"z\").length"), Value::Int(3));
}

#[test]
fn test_bound_method_captured_in_variable() {
    let src = "\
val up = \"abc\".toUpper
up()
";
    assert_eq!(run_str(src), "ABC");
}

// ============================================================================
// Arrays, objects and ranges
// ============================================================================

#[test]
fn test_array_methods() {
    assert_eq!(run_str("[1, 2, 3].map(x -> x * x)"), "[1, 4, 9]");
    assert_eq!(run("[1, 2, 3, 4].reduce((a, b) -> a + b)"), Value::Int(10));
    assert_eq!(run_str("[3, 1, 2].reverse()"), "[2, 1, 3]");
    assert_eq!(run_str("[1, 2, 3].join(\"-\")"), "1-2-3");
    assert_eq!(run_str("[1, 2, 3, 4].slice(1, 3)"), "[2, 3]");
    assert_eq!(run("[].first()"), Value::Null);
    let src = "\
var a = [1]
a.push(2)
a.push(3)
a.pop()
a.length
";
    assert_eq!(run(src), Value::Int(2));
}

#[test]
fn test_for_each_side_effects() {
    assert_eq!(output_of("[1, 2].forEach(x -> print(x))"), "1\n2\n");
}

#[test]
fn test_object_methods() {
    assert_eq!(run_str("{b: 1, a: 2}.keys()"), "[\"b\", \"a\"]");
    assert_eq!(run_str("{b: 1, a: 2}.values()"), "[1, 2]");
    assert_eq!(run("{a: 1}.hasKey(\"a\")"), Value::Boolean(true));
    assert_eq!(run("var o = {a: 1}; o.remove(\"a\"); o.length()"), Value::Int(0));
}

#[test]
fn test_ranges() {
    assert_eq!(run("(1..10).toArray().length"), Value::Int(10));
    assert_eq!(run_str("(0..<10 step 3).toArray()"), "[0, 3, 6, 9]");
    assert_eq!(run_str("(5..1).toArray()"), "[5, 4, 3, 2, 1]");
    assert_eq!(run("(1..<1).isEmpty()"), Value::Boolean(true));
    assert_eq!(run("Range(0, 4).length"), Value::Int(5));
}

#[test]
fn test_iterators() {
    let src = "\
val it = (1..4).iterator()
var sum = 0
while it.hasNext()
  sum += it.next()
sum
";
    assert_eq!(run(src), Value::Int(10));
    let src = "\
val it = \"héy\".iterator()
var out = \"\"
while it.hasNext() do out = it.next() + out
out
";
    assert_eq!(run_str(src), "yéh");
    assert_eq!(run("Iterator([7]).next()"), Value::Int(7));
}

#[test]
fn test_buffer() {
    let src = "\
val b = Buffer(\"hi\")
b.push(33)
b(0) = 72
b.toString()
";
    assert_eq!(run_str(src), "Hi!");
    assert_eq!(run_str("Buffer([255, 1]).toHex()"), "ff01");
}

// ============================================================================
// Date and time
// ============================================================================

#[test]
fn test_date_time_strings() {
    assert_eq!(run_str("LocalDate(2024, 3, 5)"), "2024-03-05");
    assert_eq!(run_str("LocalTime(9, 5, 0)"), "09:05:00");
    assert_eq!(run_str("LocalDate.parse(\"2024-01-31\").plusMonths(1)"), "2024-02-29");
    assert_eq!(run_str("Duration.ofMinutes(90)"), "PT1H30M");
    assert_eq!(run_str("Period.of(1, 2, 3)"), "P1Y2M3D");
    assert_eq!(
        run_str("LocalDateTime(LocalDate(2024, 1, 1), LocalTime(12, 0, 0)).plusHours(13)"),
        "2024-01-02T01:00:00"
    );
}

#[test]
fn test_period_between_dates() {
    assert_eq!(
        run_str("Period.between(LocalDate(2024, 1, 31), LocalDate(2024, 3, 1))"),
        "P1M1D"
    );
}

// ============================================================================
// Evaluation order and precision
// ============================================================================

#[test]
fn test_short_circuit_skips_right_operand() {
    assert_eq!(output_of("false && print(\"and\")\ntrue || print(\"or\")"), "");
    assert_eq!(output_of("true && print(\"and\")"), "and\n");
    assert_eq!(output_of("null ?? print(\"fallback\")\n1 ?? print(\"no\")"), "fallback\n");
}

#[test]
fn test_single_precision() {
    let mut vm = Vm::with_config(VmConfig {
        context: Context::Test,
        float_precision: FloatPrecision::Single,
        ..VmConfig::default()
    });
    let value = vm.interpret("0.1 + 0.2", ParseMode::Strict).unwrap();
    let expected = f64::from(0.1f32 + 0.2f32);
    assert!(matches!(value, Some(Value::Number(n)) if (n - expected).abs() < 1e-12));
    let double = run("0.1d");
    assert!(matches!(double, Value::Number(n) if n == 0.1));
}
