// slate-embed integration tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Tests for the slate-embed embedding API.

use std::collections::HashMap;

use slate_embed::{Arity, Engine, ErrorKind, FromValue, ParseMode, RuntimeError, Value};

// =============================================================================
// Type conversion edge cases
// =============================================================================

mod type_conversion {
    use super::*;

    #[test]
    fn int_boundary_values() {
        let mut engine = Engine::new();

        let max: i32 = engine.eval_as("2147483647").unwrap();
        assert_eq!(max, i32::MAX);

        // One past i32 comes back as a BigInt, still readable as i64.
        let past = engine.eval("2147483647 + 1").unwrap();
        assert!(matches!(past, Value::BigInt(_)));
        assert_eq!(i64::from_value(&past).unwrap(), 2_147_483_648);
        assert!(i32::from_value(&past).is_err());
    }

    #[test]
    fn float_boundary_values() {
        let mut engine = Engine::new();
        let inf: f64 = engine.eval_as("Infinity").unwrap();
        assert!(inf.is_infinite() && inf.is_sign_positive());
        let nan: f64 = engine.eval_as("NaN").unwrap();
        assert!(nan.is_nan());
    }

    #[test]
    fn string_empty_and_unicode() {
        let mut engine = Engine::new();

        engine.set("empty", "");
        assert_eq!(engine.get_as::<String>("empty").unwrap(), "");

        engine.set("unicode", "Hello, 世界! 🎉");
        assert_eq!(engine.get_as::<String>("unicode").unwrap(), "Hello, 世界! 🎉");
        assert_eq!(engine.eval("unicode.length").unwrap(), Value::Int(12));
    }

    #[test]
    fn option_round_trip() {
        let mut engine = Engine::new();
        engine.set("some", Some(42));
        engine.set("none", None::<i32>);
        assert_eq!(engine.get_as::<Option<i32>>("some").unwrap(), Some(42));
        assert_eq!(engine.get_as::<Option<i32>>("none").unwrap(), None);
        assert_eq!(engine.eval("none ?? 7").unwrap(), Value::Int(7));
    }

    #[test]
    fn nested_vectors() {
        let mut engine = Engine::new();
        engine.set("grid", vec![vec![1, 2], vec![3]]);
        assert_eq!(engine.eval("grid(0)(1) + grid(1)(0)").unwrap(), Value::Int(5));
        let back: Vec<Vec<i64>> = engine.eval_as("grid").unwrap();
        assert_eq!(back, vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn hashmap_round_trip() {
        let mut engine = Engine::new();
        let mut scores = HashMap::new();
        scores.insert("ada".to_string(), 3);
        scores.insert("bob".to_string(), 5);
        engine.set("scores", scores.clone());
        assert_eq!(engine.eval("scores.bob - scores.ada").unwrap(), Value::Int(2));
        assert_eq!(engine.eval("\"ada\" in scores").unwrap(), Value::Boolean(true));
        let back: HashMap<String, i32> = engine.eval_as("scores").unwrap();
        assert_eq!(back, scores);
    }
}

// =============================================================================
// Engine::eval_file()
// =============================================================================

mod eval_file {
    use super::*;
    use std::fs;

    fn scratch(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "slate-embed-test-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn eval_file_nonexistent() {
        let mut engine = Engine::new();
        let err = engine.eval_file("/nonexistent/path/to/file.slate").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReferenceError);
    }

    #[test]
    fn eval_file_valid_with_import() {
        let dir = scratch("valid");
        fs::write(dir.join("helper.slate"), "def triple(x) = x * 3\n").unwrap();
        fs::write(dir.join("main.slate"), "import helper\nhelper.triple(14)\n").unwrap();

        let mut engine = Engine::new();
        let result = engine.eval_file(dir.join("main.slate")).unwrap();
        assert_eq!(result, Value::Int(42));
        // The script directory is restored afterwards.
        assert!(engine.vm().script_dir().is_none());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn eval_file_syntax_error() {
        let dir = scratch("syntax");
        fs::write(dir.join("bad.slate"), "var = 1\n").unwrap();
        let mut engine = Engine::new();
        let err = engine.eval_file(dir.join("bad.slate")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
        let _ = fs::remove_dir_all(&dir);
    }
}

// =============================================================================
// Globals
// =============================================================================

mod globals {
    use super::*;

    #[test]
    fn get_undefined_returns_none() {
        let engine = Engine::new();
        assert!(engine.get("nothing_here").is_none());
        assert!(engine.get_as::<i64>("nothing_here").is_none());
    }

    #[test]
    fn get_after_declaration() {
        let mut engine = Engine::new();
        engine.eval("val answer = 42").unwrap();
        assert_eq!(engine.get_as::<i64>("answer"), Some(42));
        assert!(engine.global_names().contains(&"answer".to_string()));
    }

    #[test]
    fn set_and_get_multiple_types() {
        let mut engine = Engine::new();
        engine.set("flag", true);
        engine.set("ratio", 0.5);
        engine.set("name", "slate".to_string());
        assert_eq!(engine.eval("flag ? ratio * 4 : 0").unwrap().to_string(), "2.0");
        assert_eq!(engine.eval("name.toUpper()").unwrap().to_string(), "SLATE");
    }

    #[test]
    fn state_persists_between_evals() {
        let mut engine = Engine::new();
        engine.eval("var counter = 0").unwrap();
        engine.eval("counter += 5").unwrap();
        engine.eval("counter += 5").unwrap();
        assert_eq!(engine.get_as::<i32>("counter"), Some(10));
    }

    #[test]
    fn statements_without_value_yield_null() {
        let mut engine = Engine::new();
        assert_eq!(engine.eval("var x = 1").unwrap(), Value::Null);
    }
}

// =============================================================================
// Calling and registering functions
// =============================================================================

mod functions {
    use super::*;

    #[test]
    fn call_defined_function() {
        let mut engine = Engine::new();
        engine.eval("def add_one(x) = x + 1").unwrap();
        let result = engine.call("add_one", &[Value::Int(41)]).unwrap();
        assert_eq!(result, Value::Int(42));
    }

    #[test]
    fn call_non_callable() {
        let mut engine = Engine::new();
        engine.eval("val not_a_fn = 42").unwrap();
        let err = engine.call("not_a_fn", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeError);
    }

    #[test]
    fn call_undefined() {
        let mut engine = Engine::new();
        let err = engine.call("missing", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReferenceError);
    }

    #[test]
    fn call_builtin() {
        let mut engine = Engine::new();
        let result = engine.call("max", &[Value::Int(3), Value::Int(9)]).unwrap();
        assert_eq!(result, Value::Int(9));
    }

    #[test]
    fn register_simple_function() {
        let mut engine = Engine::new();
        engine.register_native("double", Arity::Exact(1), |args| match &args[0] {
            Value::Int(n) => Ok(Value::from(i64::from(*n) * 2)),
            other => Err(RuntimeError::type_error(format!(
                "double expects an int, got {}",
                other.type_name()
            ))),
        });
        assert_eq!(engine.eval("double(21)").unwrap(), Value::Int(42));
        assert_eq!(engine.eval("[1, 2].map(double)").unwrap().to_string(), "[2, 4]");
    }

    #[test]
    fn register_arity_is_checked() {
        let mut engine = Engine::new();
        engine.register_native("one", Arity::Exact(1), |args| Ok(args[0].clone()));
        let err = engine.eval("one(1, 2)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArityError);
    }

    #[test]
    fn register_function_with_captured_state() {
        use std::cell::Cell;
        use std::rc::Rc;

        let mut engine = Engine::new();
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        engine.register_native("tick", Arity::Exact(0), move |_| {
            seen.set(seen.get() + 1);
            Ok(Value::Int(seen.get()))
        });
        engine.eval("tick(); tick(); tick()").unwrap();
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn register_native_with_vm_calls_back() {
        let mut engine = Engine::new();
        engine.register_native_with_vm("apply_twice", Arity::Exact(2), |vm, args| {
            let once = vm.call_value(&args[0], &[args[1].clone()])?;
            vm.call_value(&args[0], &[once])
        });
        assert_eq!(engine.eval("apply_twice(x -> x * 3, 2)").unwrap(), Value::Int(18));
    }

    #[test]
    fn register_overrides_existing() {
        let mut engine = Engine::new();
        engine.register_native("shout", Arity::Exact(0), |_| Ok(Value::from("first")));
        engine.register_native("shout", Arity::Exact(0), |_| Ok(Value::from("second")));
        assert_eq!(engine.eval("shout()").unwrap().to_string(), "second");
    }
}

// =============================================================================
// Errors
// =============================================================================

mod error_handling {
    use super::*;

    #[test]
    fn eval_syntax_error() {
        let mut engine = Engine::new();
        let err = engine.eval("(1 + ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
    }

    #[test]
    fn eval_runtime_error() {
        let mut engine = Engine::new();
        let err = engine.eval("undefined_name * 2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReferenceError);
        assert!(err.to_string().contains("undefined_name"));
    }

    #[test]
    fn native_error_propagates() {
        let mut engine = Engine::new();
        engine.register_native("fail", Arity::Exact(0), |_| {
            Err(RuntimeError::range("deliberate"))
        });
        let err = engine.eval("1 + fail()").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeError);
        // The engine is still usable.
        assert_eq!(engine.eval("1 + 1").unwrap(), Value::Int(2));
    }

    #[test]
    fn try_get_as_distinguishes_errors() {
        let mut engine = Engine::new();
        engine.eval("var text = \"hello\"").unwrap();
        assert!(engine.try_get_as::<i64>("absent").unwrap().is_none());
        let err = engine.try_get_as::<i64>("text").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeError);
    }

    #[test]
    fn lenient_mode_accepts_repl_input() {
        let mut engine = Engine::new();
        let src = "def f()\n  var x = 1\n";
        assert!(engine.eval(src).is_err());
        engine.set_parse_mode(ParseMode::Lenient);
        assert!(engine.eval(src).is_ok());
    }
}
