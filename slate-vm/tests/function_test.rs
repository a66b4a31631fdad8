// slate-vm - Function and closure tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use slate_vm::{Arity, Context, ParseMode, Value, Vm, VmConfig};

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

fn run_to_string(src: &str) -> String {
    compile_and_run(src).to_string()
}

#[test]
fn test_def_forms() {
    assert_eq!(run_to_string("def double(x) = x * 2\ndouble(21)"), "42");
    assert_eq!(
        run_to_string("def f(a)\n  var b = a * 2\n  b + 1\nf(4)"),
        "9"
    );
    assert_eq!(run_to_string("function g() = 7\ng()"), "7");
    assert_eq!(run_to_string("var h = (a, b) -> a - b\nh(10, 3)"), "7");
}

#[test]
fn test_higher_order_functions() {
    assert_eq!(run_to_string("def adder(n) = x -> x + n\nadder(5)(10)"), "15");
    assert_eq!(
        run_to_string("def compose(f, g) = x -> f(g(x))\ncompose(a -> a + 1, b -> 2*b)(3)"),
        "7"
    );
}

#[test]
fn test_closures_from_one_factory_are_independent() {
    let src = "\
def adder(n) = x -> x + n
val one = adder(1)
val ten = adder(10)
[one(1), ten(1), one(5)]
";
    assert_eq!(run_to_string(src), "[2, 11, 6]");
}

#[test]
fn test_closure_mutates_captured_variable() {
    let src = "\
def counter()
  var count = 0
  () -> count += 1
val c = counter()
c()
c()
c()
";
    assert_eq!(run_to_string(src), "3");
}

#[test]
fn test_sibling_closures_share_a_capture() {
    let src = "\
def pair()
  var n = 0
  val inc = () -> n += 1
  val get = () -> n
  [inc, get]
val fns = pair()
fns(0)()
fns(0)()
fns(1)()
";
    assert_eq!(run_to_string(src), "2");
}

#[test]
fn test_nested_capture_through_two_levels() {
    let src = "\
def outer(a)
  def middle(b) = c -> a + b + c
  middle
outer(1)(2)(3)
";
    assert_eq!(run_to_string(src), "6");
}

#[test]
fn test_recursion() {
    let src = "\
def fact(n) = if n <= 1 then 1 else n * fact(n - 1)
fact(10)
";
    assert_eq!(run_to_string(src), "3628800");
    let src = "\
def fib(n) = if n < 2 then n else fib(n - 1) + fib(n - 2)
fib(15)
";
    assert_eq!(run_to_string(src), "610");
}

#[test]
fn test_factorial_promotes_to_bigint() {
    let src = "\
def fact(n) = if n <= 1 then 1 else n * fact(n - 1)
fact(20)
";
    let value = compile_and_run(src);
    assert!(matches!(value, Value::BigInt(_)));
    assert_eq!(value.to_string(), "2432902008176640000");
}

#[test]
fn test_return_from_function() {
    let src = "\
def first_even(xs)
  var i = 0
  while i < xs.length
    if xs(i) % 2 == 0
      return xs(i)
    i += 1
  null
first_even([1, 3, 4, 5])
";
    assert_eq!(run_to_string(src), "4");
}

#[test]
fn test_natives_call_back_into_closures() {
    assert_eq!(
        run_to_string("[1, 2, 3].map(x -> x * 10)"),
        "[10, 20, 30]"
    );
    assert_eq!(
        run_to_string("[1, 2, 3, 4].filter(x -> x % 2 == 0).reduce((a, b) -> a + b, 100)"),
        "106"
    );
}

#[test]
fn test_host_native_function() {
    let mut vm = test_vm();
    vm.define_native("twice", Arity::Exact(1), |vm, args| {
        let f = args[0].clone();
        let once = vm.call_value(&f, &[Value::Int(1)])?;
        vm.call_value(&f, &[once])
    });
    let result = vm
        .interpret("twice(x -> x + 3)", ParseMode::Strict)
        .unwrap()
        .unwrap();
    assert_eq!(result.to_string(), "7");
}

#[test]
fn test_call_value_from_host() {
    let mut vm = test_vm();
    vm.interpret("def mul(a, b) = a * b", ParseMode::Strict).unwrap();
    let mul = vm.get_global("mul").unwrap();
    let product = vm.call_value(&mul, &[Value::Int(6), Value::Int(7)]).unwrap();
    assert_eq!(product.to_string(), "42");
}
