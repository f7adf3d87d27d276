//! How Kite types and declarations appear in class files.
//!
//! `Int` and `Boolean` travel as integers, every other type as a
//! reference to its class. Nullable types, including `Int?`, are always
//! references. Type parameters erase to `kite/Any`. `Unit` and `Nothing`
//! are not materialized: a function returning them is `void`.

use kite_bytecode::{MethodDescriptor, TypeDesc};
use kite_types::{ClassId, FunctionDescriptor, KType, PropertyDescriptor, ValueParameterDescriptor};

pub const ANY_CLASS: &str = "kite/Any";
pub const UNIT_CLASS: &str = "kite/Unit";
pub const INT_CLASS: &str = "kite/Int";
pub const BOOLEAN_CLASS: &str = "kite/Boolean";
/// Runtime helpers the generated code calls.
pub const INTRINSICS_CLASS: &str = "kite/internal/Intrinsics";
pub const UNIT_INSTANCE_FIELD: &str = "INSTANCE";
/// Field of a REPL line class holding the value of its last expression.
pub const RESULT_FIELD: &str = "$$result";

pub fn internal_name(class_id: &ClassId) -> String {
    class_id.as_string()
}

/// The class-file type of a value of `ty`, or `None` when such values are
/// never materialized.
pub fn value_desc(ty: &KType) -> Option<TypeDesc> {
    if ty.is_error() {
        return None;
    }
    if ty.type_parameter_descriptor().is_some() {
        return Some(TypeDesc::object(ANY_CLASS));
    }
    let class_id = ty.class_id()?;
    if ty.is_marked_nullable() {
        return Some(TypeDesc::object(&internal_name(class_id)));
    }
    if ty.is_int() {
        Some(TypeDesc::Int)
    } else if ty.is_boolean() {
        Some(TypeDesc::Boolean)
    } else if ty.is_unit() || ty.is_nothing() {
        None
    } else {
        Some(TypeDesc::object(&internal_name(class_id)))
    }
}

/// Like [`value_desc`], but `Unit` is the `kite/Unit` object. Used where a
/// value must exist, such as a field or a generic argument.
pub fn stored_desc(ty: &KType) -> TypeDesc {
    match value_desc(ty) {
        Some(desc) => desc,
        None if ty.is_unit() => TypeDesc::object(UNIT_CLASS),
        None => TypeDesc::object(ANY_CLASS),
    }
}

pub fn return_desc(ty: &KType) -> TypeDesc {
    value_desc(ty).unwrap_or(TypeDesc::Void)
}

fn parameter_descs(parameters: &[ValueParameterDescriptor]) -> impl Iterator<Item = TypeDesc> + '_ {
    parameters.iter().map(|parameter| stored_desc(&parameter.ty))
}

/// The descriptor of a function. Static functions with an extension
/// receiver take it as their first parameter.
pub fn function_descriptor(function: &FunctionDescriptor) -> MethodDescriptor {
    let receiver = function.extension_receiver.as_ref().map(stored_desc);
    MethodDescriptor::new(
        receiver.into_iter().chain(parameter_descs(&function.value_parameters)).collect(),
        return_desc(&function.return_type),
    )
}

pub fn constructor_descriptor(parameters: &[ValueParameterDescriptor]) -> MethodDescriptor {
    MethodDescriptor::new(parameter_descs(parameters).collect(), TypeDesc::Void)
}

/// `get` + `Name`: `length` is read through `getLength`.
pub fn accessor_name(prefix: &str, property: &str) -> String {
    let mut chars = property.chars();
    let mut name = String::with_capacity(prefix.len() + property.len());
    name.push_str(prefix);
    if let Some(first) = chars.next() {
        name.extend(first.to_uppercase());
        name.push_str(chars.as_str());
    }
    name
}

pub fn getter_descriptor(property: &PropertyDescriptor) -> MethodDescriptor {
    let receiver = property.extension_receiver.as_ref().map(stored_desc);
    MethodDescriptor::new(receiver.into_iter().collect(), stored_desc(&property.ty))
}

pub fn setter_descriptor(property: &PropertyDescriptor) -> MethodDescriptor {
    let receiver = property.extension_receiver.as_ref().map(stored_desc);
    MethodDescriptor::new(
        receiver.into_iter().chain([stored_desc(&property.ty)]).collect(),
        TypeDesc::Void,
    )
}

/// The field of a REPL line class that holds the instance of an earlier
/// line: `Line3` is held in `$line3`.
pub fn earlier_line_field(line_class: &ClassId) -> String {
    let name = line_class.short_class_name();
    let mut chars = name.as_str().chars();
    let mut field = String::from("$");
    if let Some(first) = chars.next() {
        field.extend(first.to_lowercase());
        field.push_str(chars.as_str());
    }
    field
}

#[cfg(test)]
#[path = "../tests/types_tests.rs"]
mod types_tests;
