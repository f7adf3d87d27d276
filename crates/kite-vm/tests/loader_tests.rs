use super::*;
use crate::test_support::{class_with, static_method};
use kite_bytecode::{Instruction, TypeDesc};

#[test]
fn test_builtin_hierarchy() {
    let loader = ClassLoader::new();
    assert!(loader.is_subclass(ARITHMETIC_EXCEPTION, EXCEPTION_CLASS));
    assert!(loader.is_subclass(ARITHMETIC_EXCEPTION, THROWABLE_CLASS));
    assert!(loader.is_subclass(STACK_OVERFLOW_ERROR, THROWABLE_CLASS));
    assert!(!loader.is_subclass(STACK_OVERFLOW_ERROR, EXCEPTION_CLASS));
    assert!(loader.is_subclass(INT_CLASS, COMPARABLE_CLASS));
    assert!(!loader.is_subclass(BOOLEAN_CLASS, COMPARABLE_CLASS));
    assert!(loader.is_throwable(NULL_POINTER_EXCEPTION));
    assert!(!loader.is_throwable(STRING_CLASS));
}

#[test]
fn test_instances_of_any() {
    let loader = ClassLoader::new();
    assert!(loader.is_instance(&Value::Int(1), ANY_CLASS));
    assert!(loader.is_instance(&Value::Unit, UNIT_CLASS));
    assert!(!loader.is_instance(&Value::Null, ANY_CLASS));
    assert!(!loader.is_instance(&Value::Int(1), STRING_CLASS));
}

#[test]
fn test_unit_instance_is_preinitialized() {
    let loader = ClassLoader::new();
    let unit = loader.get(UNIT_CLASS).expect("builtin Unit");
    assert!(matches!(unit.static_field(UNIT_INSTANCE_FIELD), Some(Value::Unit)));
}

#[test]
fn test_defined_classes_keep_definition_order() {
    let mut loader = ClassLoader::new();
    for name in ["Line1", "Line2"] {
        let method = static_method("f", "()V", |code| code.emit(Instruction::Return));
        loader.define(class_with(name, vec![method])).expect("class verifies");
    }
    let names: Vec<&str> = loader.defined_classes().map(|class| class.name()).collect();
    assert_eq!(names, ["Line1", "Line2"]);
    assert!(loader.is_subclass("Line2", ANY_CLASS));
}

#[test]
fn test_duplicate_definitions_are_rejected() {
    let mut loader = ClassLoader::new();
    let method = || static_method("f", "()V", |code| code.emit(Instruction::Return));
    loader.define(class_with("Twice", vec![method()])).expect("first definition");
    assert!(matches!(
        loader.define(class_with("Twice", vec![method()])),
        Err(VmError::DuplicateClass(name)) if name == "Twice"
    ));
    assert!(matches!(loader.define(ClassFile::new(INT_CLASS, None, AccessFlags::PUBLIC)), Err(VmError::DuplicateClass(_))));
}

#[test]
fn test_methods_failing_verification_are_rejected() {
    let mut loader = ClassLoader::new();
    // `ret` through a local that never held a return address.
    let bad = MethodInfo {
        name: "bad".into(),
        descriptor: MethodDescriptor::new(vec![TypeDesc::Int], TypeDesc::Void),
        flags: AccessFlags::PUBLIC | AccessFlags::STATIC,
        code: Some(Code {
            max_stack: 0,
            max_locals: 1,
            instructions: vec![Instruction::Ret(0)],
            ..Code::default()
        }),
    };
    let error = loader.define(class_with("Bad", vec![bad])).expect_err("verification fails");
    assert!(matches!(&error, VmError::Verify { class, .. } if class == "Bad"), "{error}");
    assert!(loader.get("Bad").is_none());
}

#[test]
fn test_class_images_are_decoded_before_definition() {
    let mut loader = ClassLoader::new();
    let method = static_method("answer", "()I", |code| {
        code.emit(Instruction::IConst(42));
        code.emit(Instruction::IReturn);
    });
    let bytes = kite_bytecode::encode_class(&class_with("Image", vec![method]));
    let class = loader.define_bytes(&bytes).expect("image decodes");
    assert_eq!(class.name(), "Image");
    assert!(matches!(loader.define_bytes(b"garbage"), Err(VmError::ClassFormat(_))));
}

#[test]
fn test_instance_fields_include_superclass_fields_with_defaults() {
    let mut loader = ClassLoader::new();
    let mut class = class_with("Holder", Vec::new());
    class.fields.push(FieldInfo {
        name: "count".into(),
        ty: TypeDesc::Int,
        flags: AccessFlags::PUBLIC,
    });
    class.fields.push(FieldInfo {
        name: "shared".into(),
        ty: TypeDesc::Int,
        flags: AccessFlags::PUBLIC | AccessFlags::STATIC,
    });
    let loaded = loader.define(class).expect("class verifies");
    let fields = loader.instance_fields("Holder");
    assert!(matches!(fields.get("count"), Some(Value::Int(0))));
    assert!(!fields.contains_key("shared"));
    assert!(matches!(loaded.static_field("shared"), Some(Value::Int(0))));
}
