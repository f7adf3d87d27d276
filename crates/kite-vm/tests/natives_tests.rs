use super::*;
use crate::console::MemoryConsole;
use crate::value::Object;
use std::rc::Rc;
use std::sync::Arc;

fn call(owner: &str, name: &str, args: &[Value]) -> (NativeResult, String) {
    let natives = Natives::standard();
    let native = natives
        .lookup(owner, name)
        .unwrap_or_else(|| panic!("native {owner}.{name}"));
    let mut console = MemoryConsole::new();
    let mut allocate = |class: &str| Rc::new(Object::new(1, Arc::from(class), FxHashMap::default(), false));
    let result = {
        let mut context = NativeContext::new(&mut console, &mut allocate);
        native(&mut context, args)
    };
    (result, console.output())
}

fn value(owner: &str, name: &str, args: &[Value]) -> Value {
    call(owner, name, args).0.unwrap_or_else(|raise| panic!("{owner}.{name} raised {raise}"))
}

#[test]
fn test_int_operators() {
    assert!(matches!(value(INT_CLASS, "plus", &[Value::Int(2), Value::Int(3)]), Value::Int(5)));
    assert!(matches!(value(INT_CLASS, "times", &[Value::Int(i32::MAX), Value::Int(2)]), Value::Int(-2)));
    assert!(matches!(value(INT_CLASS, "rem", &[Value::Int(-7), Value::Int(3)]), Value::Int(-1)));
    assert!(matches!(value(INT_CLASS, "compareTo", &[Value::Int(1), Value::Int(9)]), Value::Int(-1)));
    assert!(matches!(value(INT_CLASS, "unaryMinus", &[Value::Int(4)]), Value::Int(-4)));
}

#[test]
fn test_division_by_zero_raises_arithmetic_exception() {
    let (result, _) = call(INT_CLASS, "div", &[Value::Int(1), Value::Int(0)]);
    assert_eq!(result.expect_err("division by zero"), Raise::new(ARITHMETIC_EXCEPTION, "/ by zero"));
}

#[test]
fn test_wrong_argument_types_raise_class_cast_exception() {
    let (result, _) = call(INT_CLASS, "plus", &[Value::Int(1), Value::string("2")]);
    let raise = result.expect_err("string is not an Int");
    assert_eq!(raise.class, CLASS_CAST_EXCEPTION);
    assert_eq!(raise.message.as_deref(), Some("kite.String cannot be cast to kite.Int"));
}

#[test]
fn test_string_members() {
    assert_eq!(value(STRING_CLASS, "plus", &[Value::string("n="), Value::Int(3)]).to_string(), "n=3");
    assert_eq!(value(STRING_CLASS, "plus", &[Value::string("x"), Value::Null]).to_string(), "xnull");
    assert!(matches!(value(STRING_CLASS, "getLength", &[Value::string("kite")]), Value::Int(4)));
    assert!(matches!(value(STANDARD_FACADE, "getLastIndex", &[Value::string("kite")]), Value::Int(3)));
    assert!(matches!(
        value(STRING_CLASS, "compareTo", &[Value::string("b"), Value::string("a")]),
        Value::Int(1)
    ));
}

#[test]
fn test_max_of_prefers_the_first_of_equals() {
    assert!(matches!(value(STANDARD_FACADE, "maxOf", &[Value::Int(2), Value::Int(7)]), Value::Int(7)));
    assert_eq!(
        value(STANDARD_FACADE, "maxOf", &[Value::string("pear"), Value::string("apple")]).to_string(),
        "pear"
    );
    let (result, _) = call(STANDARD_FACADE, "maxOf", &[Value::Int(1), Value::Bool(true)]);
    assert_eq!(result.expect_err("not comparable").class, CLASS_CAST_EXCEPTION);
}

#[test]
fn test_error_raises_illegal_state() {
    let (result, _) = call(STANDARD_FACADE, "error", &[Value::string("boom")]);
    assert_eq!(result.expect_err("error throws"), Raise::new(ILLEGAL_STATE_EXCEPTION, "boom"));
}

#[test]
fn test_console_natives_write_to_the_console() {
    let (_, output) = call(CONSOLE_FACADE, "println", &[Value::Int(42)]);
    assert_eq!(output, "42\n");
    let (_, output) = call(CONSOLE_FACADE, "println", &[]);
    assert_eq!(output, "\n");
    let (_, output) = call(CONSOLE_FACADE, "print", &[Value::Bool(true)]);
    assert_eq!(output, "true");
}

#[test]
fn test_read_line_returns_null_at_end_of_input() {
    let natives = Natives::standard();
    let read_line = natives.lookup(CONSOLE_FACADE, "readLine").expect("readLine");
    let mut console = MemoryConsole::with_input(["first"]);
    let mut allocate = |class: &str| Rc::new(Object::new(1, Arc::from(class), FxHashMap::default(), false));
    let mut context = NativeContext::new(&mut console, &mut allocate);
    assert_eq!(read_line(&mut context, &[]).expect("reads").to_string(), "first");
    assert!(read_line(&mut context, &[]).expect("reads").is_null());
}

#[test]
fn test_boxes_hold_a_value() {
    let boxed = value(COLLECTIONS_FACADE, "boxOf", &[Value::Int(1)]);
    assert_eq!(boxed.class_name(), Some(BOX_CLASS));
    value(BOX_CLASS, "setValue", &[boxed.clone(), Value::Int(2)]);
    assert!(matches!(value(BOX_CLASS, "getValue", &[boxed]), Value::Int(2)));
}

#[test]
fn test_intrinsics() {
    assert!(matches!(
        value(INTRINSICS_CLASS, "areEqual", &[Value::string("a"), Value::string("a")]),
        Value::Bool(true)
    ));
    assert!(matches!(
        value(INTRINSICS_CLASS, "areEqual", &[Value::Int(1), Value::Null]),
        Value::Bool(false)
    ));
    assert!(matches!(value(INTRINSICS_CLASS, "compare", &[Value::Int(5), Value::Int(5)]), Value::Int(0)));
}

#[test]
fn test_hash_codes_of_builtins() {
    assert_eq!(hash_code(&Value::Int(17)), 17);
    assert_eq!(hash_code(&Value::Bool(true)), 1231);
    assert_eq!(hash_code(&Value::string("ab")), 31 * 97 + 98);
}

#[test]
fn test_registered_natives_override_and_extend() {
    let mut natives = Natives::empty();
    assert!(natives.lookup(INT_CLASS, "plus").is_none());
    natives.register("demo/Host", "answer", |_, _| Ok(Value::Int(42)));
    assert!(natives.lookup("demo/Host", "answer").is_some());
    assert!(natives.lookup("demo/Host", "question").is_none());
}
