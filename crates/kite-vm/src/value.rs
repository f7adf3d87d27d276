//! Runtime values.
//!
//! Values are dynamically typed. `Int` and `Boolean` are never boxed, so a
//! slot declared `kite/Any` may hold an `Int` directly; its runtime class is
//! still `kite/Int` for `checkcast` and `instanceof`.

use crate::error::StackFrame;
use kite_bytecode::{Offset, TypeDesc};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

pub const INT_CLASS: &str = "kite/Int";
pub const BOOLEAN_CLASS: &str = "kite/Boolean";
pub const STRING_CLASS: &str = "kite/String";
pub const UNIT_CLASS: &str = "kite/Unit";

pub type ObjectRef = Rc<Object>;

#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Int(i32),
    Bool(bool),
    Str(Arc<str>),
    Object(ObjectRef),
    /// The `kite.Unit` singleton.
    Unit,
    /// Pushed by `jsr`, consumed by `ret`.
    ReturnAddress(Offset),
}

impl Value {
    pub fn string(text: &str) -> Value {
        Value::Str(Arc::from(text))
    }

    /// The zero value of a field or local of type `ty`.
    pub fn default_for(ty: &TypeDesc) -> Value {
        match ty {
            TypeDesc::Int => Value::Int(0),
            TypeDesc::Boolean => Value::Bool(false),
            TypeDesc::Void | TypeDesc::Object(_) => Value::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The integer view used by `if*` and arithmetic: booleans are 0 or 1.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(value) => Some(*value),
            Value::Bool(value) => Some(i32::from(*value)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Internal name of the runtime class, `None` for `null` and return
    /// addresses.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Value::Int(_) => Some(INT_CLASS),
            Value::Bool(_) => Some(BOOLEAN_CLASS),
            Value::Str(_) => Some(STRING_CLASS),
            Value::Unit => Some(UNIT_CLASS),
            Value::Object(object) => Some(&object.class),
            Value::Null | Value::ReturnAddress(_) => None,
        }
    }

    /// `==` as Kite defines it for the built-in types: value equality for
    /// numbers, booleans and strings, identity for objects.
    pub fn structurally_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) | (Value::Unit, Value::Unit) => true,
            (Value::Int(left), Value::Int(right)) => left == right,
            (Value::Bool(left), Value::Bool(right)) => left == right,
            (Value::Str(left), Value::Str(right)) => left == right,
            (Value::Object(left), Value::Object(right)) => Rc::ptr_eq(left, right),
            (Value::ReturnAddress(left), Value::ReturnAddress(right)) => left == right,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    /// `toString()` of the value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Str(text) => f.write_str(text),
            Value::Unit => f.write_str("kite.Unit"),
            Value::Object(object) => write!(f, "{object}"),
            Value::ReturnAddress(offset) => write!(f, "<return address {offset}>"),
        }
    }
}

/// A heap object: an instance of a loaded class or of a built-in class such
/// as `kite/collections/Box` or an exception.
#[derive(Debug)]
pub struct Object {
    pub id: u32,
    pub class: Arc<str>,
    fields: RefCell<FxHashMap<Arc<str>, Value>>,
    /// Filled when a throwable is created.
    pub(crate) stack_trace: RefCell<Vec<StackFrame>>,
    throwable: bool,
}

impl Object {
    pub(crate) fn new(id: u32, class: Arc<str>, fields: FxHashMap<Arc<str>, Value>, throwable: bool) -> Self {
        Object {
            id,
            class,
            fields: RefCell::new(fields),
            stack_trace: RefCell::new(Vec::new()),
            throwable,
        }
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn set_field(&self, name: &str, value: Value) {
        let mut fields = self.fields.borrow_mut();
        match fields.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                fields.insert(Arc::from(name), value);
            }
        }
    }

    pub fn is_throwable(&self) -> bool {
        self.throwable
    }

    /// The `message` of a throwable.
    pub fn message(&self) -> Option<String> {
        match self.field(MESSAGE_FIELD)? {
            Value::Null => None,
            value => Some(value.to_string()),
        }
    }

    pub fn stack_trace(&self) -> Vec<StackFrame> {
        self.stack_trace.borrow().clone()
    }
}

pub(crate) const MESSAGE_FIELD: &str = "message";
pub(crate) const BOX_VALUE_FIELD: &str = "value";

/// Dotted form of an internal class name: `kite/Int` is `kite.Int`.
pub fn display_class_name(internal: &str) -> String {
    internal.replace('/', ".")
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = display_class_name(&self.class);
        if self.throwable {
            return match self.message() {
                Some(message) => write!(f, "{class}: {message}"),
                None => f.write_str(&class),
            };
        }
        if &*self.class == crate::natives::BOX_CLASS {
            let value = self.field(BOX_VALUE_FIELD).unwrap_or_default();
            return write!(f, "Box({value})");
        }
        write!(f, "{class}@{:x}", self.id)
    }
}

#[cfg(test)]
#[path = "../tests/value_tests.rs"]
mod value_tests;
