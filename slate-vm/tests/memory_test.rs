// slate-vm - Heap release tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use slate_vm::value::Closure;
use slate_vm::{Arity, Context, ObjectMap, ParseMode, RuntimeError, Value, Vm, VmConfig};

/// Weak handle to a heap value produced by a script.
enum Tracked {
    Array(Weak<RefCell<Vec<Value>>>),
    Object(Weak<RefCell<ObjectMap>>),
    Closure(Weak<Closure>),
}

impl Tracked {
    fn is_live(&self) -> bool {
        match self {
            Tracked::Array(w) => w.upgrade().is_some(),
            Tracked::Object(w) => w.upgrade().is_some(),
            Tracked::Closure(w) => w.upgrade().is_some(),
        }
    }
}

/// A VM with a `keep(v)` native that records a weak handle to `v`.
fn tracking_vm() -> (Vm, Rc<RefCell<Vec<Tracked>>>) {
    let mut vm = Vm::with_config(VmConfig {
        context: Context::Test,
        ..VmConfig::default()
    });
    let tracked = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&tracked);
    vm.define_native("keep", Arity::Exact(1), move |_, args| {
        let handle = match &args[0] {
            Value::Array(items) => Tracked::Array(Rc::downgrade(items)),
            Value::Object(map) => Tracked::Object(Rc::downgrade(map)),
            Value::Closure(closure) => Tracked::Closure(Rc::downgrade(closure)),
            other => {
                return Err(RuntimeError::type_error(format!(
                    "cannot track '{}'",
                    other.type_name()
                )));
            }
        };
        sink.borrow_mut().push(handle);
        Ok(args[0].clone())
    });
    (vm, tracked)
}

fn live_count(tracked: &Rc<RefCell<Vec<Tracked>>>) -> usize {
    tracked.borrow().iter().filter(|t| t.is_live()).count()
}

#[test]
fn test_globals_released_on_drop() {
    let (mut vm, tracked) = tracking_vm();
    let src = "var a = keep([1, keep([2, 3])])\nvar o = keep({k: a})\no.k.length";
    let result = vm.interpret(src, ParseMode::Strict).unwrap();
    assert_eq!(result, Some(Value::Int(2)));
    assert_eq!(live_count(&tracked), 3);

    drop(vm);
    assert_eq!(tracked.borrow().len(), 3);
    assert_eq!(live_count(&tracked), 0);
}

#[test]
fn test_temporaries_released_after_run() {
    let (mut vm, tracked) = tracking_vm();
    let src = "def f()\n  var tmp = keep([1, 2, 3])\n  tmp.length\nf() + f()";
    let result = vm.interpret(src, ParseMode::Strict).unwrap();
    assert_eq!(result, Some(Value::Int(6)));
    // Locals die with their frame, before the VM does.
    assert_eq!(tracked.borrow().len(), 2);
    assert_eq!(live_count(&tracked), 0);
}

#[test]
fn test_captured_array_released_with_closure() {
    let (mut vm, tracked) = tracking_vm();
    let src = "\
def make()
  var items = keep([1, 2])
  keep(() -> items.length)
var f = make()
f()";
    let result = vm.interpret(src, ParseMode::Strict).unwrap();
    assert_eq!(result, Some(Value::Int(2)));
    // The closed upvalue keeps the array alive while `f` is reachable.
    assert_eq!(live_count(&tracked), 2);

    drop(vm);
    assert_eq!(live_count(&tracked), 0);
}

#[test]
fn test_values_released_after_runtime_error() {
    let (mut vm, tracked) = tracking_vm();
    let src = "def g(x)\n  var held = keep([x])\n  held + null.y\ng(1)";
    assert!(vm.interpret(src, ParseMode::Strict).is_err());
    assert_eq!(vm.stack_depth(), 0);
    assert_eq!(live_count(&tracked), 0);

    drop(vm);
    assert_eq!(live_count(&tracked), 0);
}
