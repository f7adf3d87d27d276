//! Native implementations of the standard library.
//!
//! Natives are looked up by owner class and method name. Instance natives
//! receive the receiver as their first argument; overloads are told apart
//! by argument count. A native returns the pushed value, which the caller
//! discards for `void` descriptors.

use crate::console::Console;
use crate::loader::{ANY_CLASS, ARITHMETIC_EXCEPTION, CLASS_CAST_EXCEPTION, ILLEGAL_STATE_EXCEPTION, THROWABLE_CLASS};
use crate::value::{BOOLEAN_CLASS, BOX_VALUE_FIELD, INT_CLASS, MESSAGE_FIELD, ObjectRef, STRING_CLASS, Value};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::fmt;

pub const BOX_CLASS: &str = "kite/collections/Box";
pub const STANDARD_FACADE: &str = "kite/StandardKt";
pub const CONSOLE_FACADE: &str = "kite/io/ConsoleKt";
pub const COLLECTIONS_FACADE: &str = "kite/collections/CollectionsKt";
pub const INTRINSICS_CLASS: &str = "kite/internal/Intrinsics";

/// An exception a native asks the interpreter to throw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raise {
    pub class: &'static str,
    pub message: Option<String>,
}

impl Raise {
    pub fn new(class: &'static str, message: impl Into<String>) -> Self {
        Raise {
            class,
            message: Some(message.into()),
        }
    }
}

impl fmt::Display for Raise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.class),
            None => f.write_str(self.class),
        }
    }
}

pub type NativeResult = Result<Value, Raise>;

/// What a native may touch while it runs.
pub struct NativeContext<'a> {
    pub console: &'a mut dyn Console,
    allocate: &'a mut dyn FnMut(&str) -> ObjectRef,
}

impl<'a> NativeContext<'a> {
    pub(crate) fn new(
        console: &'a mut dyn Console,
        allocate: &'a mut dyn FnMut(&str) -> ObjectRef,
    ) -> Self {
        NativeContext {
            console,
            allocate,
        }
    }

    pub fn allocate(&mut self, class: &str) -> ObjectRef {
        (self.allocate)(class)
    }
}

pub type NativeFn = fn(&mut NativeContext<'_>, &[Value]) -> NativeResult;

#[derive(Clone, Default)]
pub struct Natives {
    by_owner: FxHashMap<&'static str, FxHashMap<&'static str, NativeFn>>,
}

impl fmt::Debug for Natives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Natives").field("owners", &self.by_owner.len()).finish()
    }
}

impl Natives {
    pub fn empty() -> Self {
        Natives::default()
    }

    /// The natives backing the `kite`, `kite.io` and `kite.collections`
    /// packages plus the intrinsics generated code calls.
    pub fn standard() -> Self {
        let mut natives = Natives::empty();

        natives.register(ANY_CLASS, "<init>", any_init);
        natives.register(ANY_CLASS, "toString", any_to_string);
        natives.register(ANY_CLASS, "hashCode", any_hash_code);

        natives.register(INT_CLASS, "plus", |_, args| int_binary(args, i32::wrapping_add));
        natives.register(INT_CLASS, "minus", |_, args| int_binary(args, i32::wrapping_sub));
        natives.register(INT_CLASS, "times", |_, args| int_binary(args, i32::wrapping_mul));
        natives.register(INT_CLASS, "div", |_, args| int_division(args, i32::wrapping_div));
        natives.register(INT_CLASS, "rem", |_, args| int_division(args, i32::wrapping_rem));
        natives.register(INT_CLASS, "unaryMinus", |_, args| Ok(Value::Int(int_arg(args, 0)?.wrapping_neg())));
        natives.register(INT_CLASS, "compareTo", |_, args| {
            Ok(ordering_value(int_arg(args, 0)?.cmp(&int_arg(args, 1)?)))
        });

        natives.register(BOOLEAN_CLASS, "not", |_, args| Ok(Value::Bool(int_arg(args, 0)? == 0)));

        natives.register(STRING_CLASS, "plus", string_plus);
        natives.register(STRING_CLASS, "compareTo", |_, args| {
            Ok(ordering_value(str_arg(args, 0)?.cmp(str_arg(args, 1)?)))
        });
        natives.register(STRING_CLASS, "getLength", |_, args| {
            Ok(Value::Int(str_arg(args, 0)?.chars().count() as i32))
        });

        natives.register(THROWABLE_CLASS, "<init>", throwable_init);
        natives.register(THROWABLE_CLASS, "getMessage", |_, args| {
            Ok(object_arg(args, 0)?.field(MESSAGE_FIELD).unwrap_or_default())
        });

        natives.register(BOX_CLASS, "<init>", |_, args| {
            object_arg(args, 0)?.set_field(BOX_VALUE_FIELD, arg(args, 1));
            Ok(Value::Unit)
        });
        natives.register(BOX_CLASS, "getValue", |_, args| {
            Ok(object_arg(args, 0)?.field(BOX_VALUE_FIELD).unwrap_or_default())
        });
        natives.register(BOX_CLASS, "setValue", |_, args| {
            object_arg(args, 0)?.set_field(BOX_VALUE_FIELD, arg(args, 1));
            Ok(Value::Unit)
        });

        natives.register(STANDARD_FACADE, "identity", |_, args| Ok(arg(args, 0)));
        natives.register(STANDARD_FACADE, "maxOf", max_of);
        natives.register(STANDARD_FACADE, "error", |_, args| {
            Err(Raise::new(ILLEGAL_STATE_EXCEPTION, arg(args, 0).to_string()))
        });
        natives.register(STANDARD_FACADE, "squared", |_, args| {
            let value = int_arg(args, 0)?;
            Ok(Value::Int(value.wrapping_mul(value)))
        });
        natives.register(STANDARD_FACADE, "getLastIndex", |_, args| {
            Ok(Value::Int(str_arg(args, 0)?.chars().count() as i32 - 1))
        });
        natives.register(STANDARD_FACADE, "getMAX_INT", |_, _| Ok(Value::Int(i32::MAX)));

        natives.register(CONSOLE_FACADE, "println", |context, args| {
            match args.first() {
                Some(value) => context.console.write(&format!("{value}\n")),
                None => context.console.write("\n"),
            }
            Ok(Value::Unit)
        });
        natives.register(CONSOLE_FACADE, "print", |context, args| {
            context.console.write(&arg(args, 0).to_string());
            Ok(Value::Unit)
        });
        natives.register(CONSOLE_FACADE, "readLine", |context, _| {
            context.console.flush();
            Ok(context.console.read_line().map_or(Value::Null, |line| Value::string(&line)))
        });

        natives.register(COLLECTIONS_FACADE, "boxOf", |context, args| {
            let boxed = context.allocate(BOX_CLASS);
            boxed.set_field(BOX_VALUE_FIELD, arg(args, 0));
            Ok(Value::Object(boxed))
        });

        natives.register(INTRINSICS_CLASS, "areEqual", |_, args| {
            Ok(Value::Bool(arg(args, 0).structurally_equals(&arg(args, 1))))
        });
        natives.register(INTRINSICS_CLASS, "compare", |_, args| {
            Ok(ordering_value(int_arg(args, 0)?.cmp(&int_arg(args, 1)?)))
        });

        natives
    }

    pub fn register(&mut self, owner: &'static str, name: &'static str, native: NativeFn) {
        self.by_owner.entry(owner).or_default().insert(name, native);
    }

    pub fn lookup(&self, owner: &str, name: &str) -> Option<NativeFn> {
        self.by_owner.get(owner)?.get(name).copied()
    }
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

fn wrong_type(args: &[Value], index: usize, expected: &str) -> Raise {
    let found = args.get(index).and_then(Value::class_name).unwrap_or("null");
    Raise::new(
        CLASS_CAST_EXCEPTION,
        format!(
            "{} cannot be cast to {}",
            crate::value::display_class_name(found),
            crate::value::display_class_name(expected)
        ),
    )
}

fn int_arg(args: &[Value], index: usize) -> Result<i32, Raise> {
    args.get(index)
        .and_then(Value::as_int)
        .ok_or_else(|| wrong_type(args, index, INT_CLASS))
}

fn str_arg(args: &[Value], index: usize) -> Result<&str, Raise> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| wrong_type(args, index, STRING_CLASS))
}

fn object_arg(args: &[Value], index: usize) -> Result<&ObjectRef, Raise> {
    args.get(index)
        .and_then(Value::as_object)
        .ok_or_else(|| wrong_type(args, index, ANY_CLASS))
}

fn ordering_value(ordering: Ordering) -> Value {
    Value::Int(match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    })
}

fn int_binary(args: &[Value], op: fn(i32, i32) -> i32) -> NativeResult {
    Ok(Value::Int(op(int_arg(args, 0)?, int_arg(args, 1)?)))
}

fn int_division(args: &[Value], op: fn(i32, i32) -> i32) -> NativeResult {
    let divisor = int_arg(args, 1)?;
    if divisor == 0 {
        return Err(Raise::new(ARITHMETIC_EXCEPTION, "/ by zero"));
    }
    Ok(Value::Int(op(int_arg(args, 0)?, divisor)))
}

fn any_init(_: &mut NativeContext<'_>, _: &[Value]) -> NativeResult {
    Ok(Value::Unit)
}

fn any_to_string(_: &mut NativeContext<'_>, args: &[Value]) -> NativeResult {
    Ok(Value::string(&arg(args, 0).to_string()))
}

fn any_hash_code(_: &mut NativeContext<'_>, args: &[Value]) -> NativeResult {
    Ok(Value::Int(hash_code(&arg(args, 0))))
}

/// `hashCode()` of the built-in types.
pub fn hash_code(value: &Value) -> i32 {
    match value {
        Value::Null | Value::Unit | Value::ReturnAddress(_) => 0,
        Value::Int(value) => *value,
        Value::Bool(value) => {
            if *value {
                1231
            } else {
                1237
            }
        }
        Value::Str(text) => text
            .chars()
            .fold(0i32, |hash, c| hash.wrapping_mul(31).wrapping_add(c as i32)),
        Value::Object(object) => object.id as i32,
    }
}

fn string_plus(_: &mut NativeContext<'_>, args: &[Value]) -> NativeResult {
    let left = str_arg(args, 0)?;
    Ok(Value::string(&format!("{left}{}", arg(args, 1))))
}

fn throwable_init(_: &mut NativeContext<'_>, args: &[Value]) -> NativeResult {
    object_arg(args, 0)?.set_field(MESSAGE_FIELD, arg(args, 1));
    Ok(Value::Unit)
}

/// The larger of two comparable values, the first when they are equal.
fn max_of(_: &mut NativeContext<'_>, args: &[Value]) -> NativeResult {
    let ordering = match (arg(args, 0), arg(args, 1)) {
        (Value::Int(a), Value::Int(b)) => a.cmp(&b),
        (Value::Str(a), Value::Str(b)) => a.cmp(&b),
        _ => return Err(wrong_type(args, 1, crate::loader::COMPARABLE_CLASS)),
    };
    Ok(if ordering == Ordering::Less {
        arg(args, 1)
    } else {
        arg(args, 0)
    })
}

#[cfg(test)]
#[path = "../tests/natives_tests.rs"]
mod natives_tests;
