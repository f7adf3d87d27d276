use super::*;
use rustc_hash::FxHashMap;

fn object(class: &str, throwable: bool) -> ObjectRef {
    Rc::new(Object::new(7, Arc::from(class), FxHashMap::default(), throwable))
}

#[test]
fn test_unboxed_values_report_their_runtime_class() {
    assert_eq!(Value::Int(3).class_name(), Some(INT_CLASS));
    assert_eq!(Value::Bool(true).class_name(), Some(BOOLEAN_CLASS));
    assert_eq!(Value::string("hi").class_name(), Some(STRING_CLASS));
    assert_eq!(Value::Unit.class_name(), Some(UNIT_CLASS));
    assert_eq!(Value::Null.class_name(), None);
    assert_eq!(Value::ReturnAddress(4).class_name(), None);
}

#[test]
fn test_booleans_read_as_integers() {
    assert_eq!(Value::Bool(true).as_int(), Some(1));
    assert_eq!(Value::Bool(false).as_int(), Some(0));
    assert_eq!(Value::string("1").as_int(), None);
}

#[test]
fn test_equality_is_by_value_for_builtins_and_by_identity_for_objects() {
    assert!(Value::string("a").structurally_equals(&Value::string("a")));
    assert!(!Value::Int(1).structurally_equals(&Value::Bool(true)));
    assert!(Value::Null.structurally_equals(&Value::Null));

    let first = object("Line1", false);
    let second = object("Line1", false);
    assert!(Value::Object(Rc::clone(&first)).structurally_equals(&Value::Object(Rc::clone(&first))));
    assert!(!Value::Object(first).structurally_equals(&Value::Object(second)));
}

#[test]
fn test_to_string_of_builtin_values() {
    assert_eq!(Value::Int(-4).to_string(), "-4");
    assert_eq!(Value::Bool(false).to_string(), "false");
    assert_eq!(Value::Null.to_string(), "null");
    assert_eq!(Value::Unit.to_string(), "kite.Unit");
    assert_eq!(Value::Object(object("Line2", false)).to_string(), "Line2@7");
}

#[test]
fn test_throwables_render_class_and_message() {
    let exception = object("kite/ArithmeticException", true);
    assert_eq!(exception.to_string(), "kite.ArithmeticException");
    exception.set_field(MESSAGE_FIELD, Value::string("/ by zero"));
    assert_eq!(exception.to_string(), "kite.ArithmeticException: / by zero");
    assert_eq!(exception.message().as_deref(), Some("/ by zero"));
}

#[test]
fn test_boxes_render_their_content() {
    let boxed = object(crate::natives::BOX_CLASS, false);
    boxed.set_field(BOX_VALUE_FIELD, Value::Int(9));
    assert_eq!(boxed.to_string(), "Box(9)");
}
