// slate-vm - Property tests for arithmetic through the full pipeline
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use num_bigint::BigInt;
use proptest::prelude::*;
use slate_vm::{Context, ParseMode, Value, Vm, VmConfig};

fn eval(src: &str) -> Value {
    let mut vm = Vm::with_config(VmConfig {
        context: Context::Test,
        ..VmConfig::default()
    });
    match vm.interpret(src, ParseMode::Strict) {
        Ok(Some(value)) => value,
        other => panic!("unexpected outcome for {:?}: {:?}", src, other.map(|_| ())),
    }
}

/// Expected value of an exact integer result: Int when it fits, else BigInt.
fn expected_int(n: BigInt) -> String {
    match i32::try_from(&n) {
        Ok(small) => format!("int {}", small),
        Err(_) => format!("bigint {}", n),
    }
}

fn described(value: &Value) -> String {
    format!("{} {}", value.type_name(), value)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_int_ops_promote_exactly(a in any::<i32>(), b in any::<i32>()) {
        let (x, y) = (BigInt::from(a), BigInt::from(b));
        for (op, exact) in [
            ("+", &x + &y),
            ("-", &x - &y),
            ("*", &x * &y),
        ] {
            let value = eval(&format!("({}) {} ({})", a, op, b));
            prop_assert_eq!(described(&value), expected_int(exact));
        }
    }

    #[test]
    fn prop_floor_div_and_mod_reconstruct(a in any::<i32>(), b in any::<i32>().prop_filter("nonzero", |b| *b != 0)) {
        let value = eval(&format!("val a = {}; val b = {}; (a // b) * b + a % b == a", a, b));
        prop_assert_eq!(value, Value::Boolean(true));
    }

    #[test]
    fn prop_mod_takes_divisor_sign(a in any::<i32>(), b in any::<i32>().prop_filter("nonzero", |b| *b != 0)) {
        let value = eval(&format!("({}) % ({})", a, b));
        let Value::Int(r) = value else {
            return Err(TestCaseError::fail(format!("expected an int, got {:?}", value)));
        };
        prop_assert!(r == 0 || (r < 0) == (b < 0));
        prop_assert!(i64::from(r).abs() < i64::from(b).abs());
    }

    #[test]
    fn prop_comparisons_match_rust(a in any::<i32>(), b in any::<i32>()) {
        let value = eval(&format!("[({a}) < ({b}), ({a}) <= ({b}), ({a}) == ({b})]"));
        prop_assert_eq!(value.to_string(), format!("[{}, {}, {}]", a < b, a <= b, a == b));
    }
}
