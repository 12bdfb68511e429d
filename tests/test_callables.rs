use laf::ffi::MethodTable;
use laf::{BindError, Config, ErrorKind, NativeCallable, ScriptHost, Signature, StrView, ValueKind};
use std::cell::Cell;
use std::rc::Rc;

fn str_id(text: StrView) -> StrView {
    text
}

fn sum(a: i32, b: i32) -> i32 {
    a + b
}

fn greet() -> &'static str {
    "hi"
}

struct Base {
    value: i32,
}

impl Base {
    fn add(&self, b: i32) -> i32 {
        self.value + b
    }
}

#[test]
fn test_closure_sum() {
    let host = ScriptHost::new().unwrap();
    host.register("apb", NativeCallable::closure(|a: i32, b: i32| a + b)).unwrap();
    host.exec("assert(apb(5, 10) == 15)").unwrap();
}

#[test]
fn test_closure_with_captured_state() {
    let host = ScriptHost::new().unwrap();
    let v = 2.0;
    host.register(
        "axpbpv",
        NativeCallable::closure(move |a: i32, x: f64, b: i32| a as f64 * x + b as f64 + v),
    )
    .unwrap();
    host.exec("assert(axpbpv(4, 3, 8) == 22)").unwrap();
}

#[test]
fn test_void_closure_returns_nothing() {
    let host = ScriptHost::new().unwrap();
    let seen = Rc::new(Cell::new(0.0));
    let sink = seen.clone();
    host.register(
        "print_a_b",
        NativeCallable::closure(move |a: i32, b: f64| sink.set(a as f64 + b)),
    )
    .unwrap();

    assert_eq!(host.eval::<i64>("return select('#', print_a_b(4, 3.14))").unwrap(), 0);
    assert!((seen.get() - 7.14).abs() < 1e-9);
}

#[test]
fn test_owned_string_round_trip() {
    let host = ScriptHost::new().unwrap();
    host.register(
        "add_world",
        NativeCallable::closure(|a: String| a + " world!"),
    )
    .unwrap();
    host.exec("assert(add_world('hello') == 'hello world!')").unwrap();
}

#[test]
fn test_function_pointer_string_view() {
    let host = ScriptHost::new().unwrap();
    host.register("str_id", NativeCallable::pointer(str_id as fn(StrView) -> StrView)).unwrap();
    host.register("greet", NativeCallable::function(greet)).unwrap();

    host.exec("assert(str_id('lua!') == 'lua!')").unwrap();
    host.exec("assert(greet() == 'hi')").unwrap();
}

#[test]
fn test_callable_shapes_agree() {
    let host = ScriptHost::new().unwrap();
    let zero = 0;
    host.register("by_function", NativeCallable::function(sum)).unwrap();
    host.register("by_pointer", NativeCallable::pointer(sum as fn(i32, i32) -> i32)).unwrap();
    host.register("by_closure", NativeCallable::closure(move |a: i32, b: i32| a + b + zero)).unwrap();

    host.register_type::<Base>("shapes::Base").unwrap();
    host.attach_methods(
        &MethodTable::builder::<Base>()
            .method("add", NativeCallable::method(Base::add))
            .build()
            .unwrap(),
    )
    .unwrap();
    host.register("by_member", NativeCallable::method(Base::add)).unwrap();

    for (a, b) in [(1, 2), (-7, 7), (100, 23)] {
        let handle = host.create_handle(Base { value: a }).unwrap();
        host.set_global("h", handle).unwrap();
        host.set_global("a", a).unwrap();
        host.set_global("b", b).unwrap();
        host.exec(
            r#"
            local expected = by_function(a, b)
            assert(by_pointer(a, b) == expected)
            assert(by_closure(a, b) == expected)
            assert(by_member(h, b) == expected)
            assert(h:add(b) == expected)
            "#,
        )
        .unwrap();
    }
}

#[test]
fn test_arity_error_leaves_state_usable() {
    let host = ScriptHost::new().unwrap();
    host.register("apb", NativeCallable::closure(|a: i32, b: i32| a + b)).unwrap();

    let error = host.exec("apb(5)").unwrap_err();
    assert_eq!(error.kind, ErrorKind::Arity { expected: 2, found: 1 });
    assert_eq!(error.function.as_deref(), Some("apb"));

    host.exec("assert(apb(1, 2) == 3)").unwrap();
}

#[test]
fn test_arity_error_catchable_in_script() {
    let host = ScriptHost::new().unwrap();
    host.register("apb", NativeCallable::closure(|a: i32, b: i32| a + b)).unwrap();

    let message: String = host
        .eval("local ok, err = pcall(apb, 1, 2, 3); assert(not ok); return tostring(err)")
        .unwrap();
    assert!(message.contains("wrong number of arguments"), "{}", message);
}

#[test]
fn test_type_mismatch_has_position_and_no_side_effect() {
    let host = ScriptHost::new().unwrap();
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    host.register(
        "record",
        NativeCallable::closure(move |_label: String, amount: i64| {
            counter.set(counter.get() + 1);
            amount
        }),
    )
    .unwrap();

    let error = host.exec("record('coins', true)").unwrap_err();
    match &error.kind {
        ErrorKind::TypeMismatch { index, expected, found } => {
            assert_eq!(*index, 2);
            assert_eq!(*expected, ValueKind::Integer);
            assert_eq!(found, "boolean");
        }
        other => panic!("unexpected error kind {:?}", other),
    }
    assert!(error.to_string().starts_with("bad argument #2 to 'record'"));
    assert_eq!(calls.get(), 0);

    host.exec("assert(record('coins', 3) == 3)").unwrap();
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_fractional_integer_rejected_by_default() {
    let host = ScriptHost::new().unwrap();
    host.register("twice", NativeCallable::closure(|n: i32| n * 2)).unwrap();

    host.exec("assert(twice(4.0) == 8)").unwrap();
    let error = host.exec("twice(4.5)").unwrap_err();
    assert!(matches!(error.kind, ErrorKind::TypeMismatch { index: 1, .. }));
    assert!(!error.suggestions.is_empty());
}

#[test]
fn test_result_error_becomes_script_error() {
    let host = ScriptHost::new().unwrap();
    host.register(
        "checked_div",
        NativeCallable::closure(|a: i64, b: i64| {
            if b == 0 {
                Err("division by zero")
            } else {
                Ok(a / b)
            }
        }),
    )
    .unwrap();

    assert_eq!(host.eval::<i64>("return checked_div(9, 3)").unwrap(), 3);
    let error = host.exec("checked_div(1, 0)").unwrap_err();
    assert_eq!(error.kind, ErrorKind::Native { message: "division by zero".to_string() });
}

#[test]
fn test_requested_signature_must_match() {
    let host = ScriptHost::new().unwrap();
    let wanted = Signature::new(vec![ValueKind::Integer, ValueKind::Integer], ValueKind::Integer);
    host.register_with_signature("sum", NativeCallable::function(sum), &wanted).unwrap();
    host.exec("assert(sum(2, 2) == 4)").unwrap();

    let floats = Signature::new(vec![ValueKind::Number, ValueKind::Number], ValueKind::Number);
    let error: BindError = host
        .register_with_signature("fsum", NativeCallable::function(sum), &floats)
        .unwrap_err();
    assert!(error.kind.is_registration_error());
    assert!(host.eval::<bool>("return fsum == nil").unwrap());
}

#[test]
fn test_closure_state_lives_with_binding() {
    let host = ScriptHost::new().unwrap();
    let state = Rc::new(Cell::new(0_i64));
    let captured = state.clone();
    host.register(
        "bump",
        NativeCallable::closure(move || {
            captured.set(captured.get() + 1);
            captured.get()
        }),
    )
    .unwrap();

    host.exec("bump(); bump()").unwrap();
    assert_eq!(host.eval::<i64>("return bump()").unwrap(), 3);
    assert_eq!(Rc::strong_count(&state), 2);

    drop(host);
    assert_eq!(Rc::strong_count(&state), 1);
}

#[test]
fn test_numeric_conversions_follow_the_runtime() {
    let mut config = Config::default();
    config.codec.string_to_number = true;
    let host = ScriptHost::with_config(config).unwrap();
    host.register("as_text", NativeCallable::closure(|s: String| s)).unwrap();
    host.register("half", NativeCallable::closure(|x: f64| x / 2.0)).unwrap();
    host.register("succ", NativeCallable::closure(|n: i64| n + 1)).unwrap();

    host.exec("assert(as_text(0.1 + 0.2) == tostring(0.1 + 0.2))").unwrap();
    host.exec("assert(as_text(1e15) == '1e+15')").unwrap();
    host.exec("assert(as_text(2^63) == tostring(2^63))").unwrap();
    host.exec("assert(half('0x10') == 8)").unwrap();
    host.exec("assert(succ('0x10') == 17)").unwrap();

    let error = host.exec("half('nan')").unwrap_err();
    assert!(matches!(error.kind, ErrorKind::TypeMismatch { index: 1, ref found, .. } if found == "string"));
    assert!(!error.to_string().contains("string_to_number"), "{}", error);
}

#[test]
fn test_numeric_strings_rejected_by_default() {
    let host = ScriptHost::new().unwrap();
    host.register("half", NativeCallable::closure(|x: f64| x / 2.0)).unwrap();

    let error = host.exec("half('10')").unwrap_err();
    assert!(matches!(error.kind, ErrorKind::TypeMismatch { index: 1, .. }));
    assert!(error.to_string().contains("enable codec.string_to_number"), "{}", error);
}
