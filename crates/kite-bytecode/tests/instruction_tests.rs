use super::*;

#[test]
fn test_condition_negation_inverts_the_test() {
    for condition in [
        Condition::Eq,
        Condition::Ne,
        Condition::Lt,
        Condition::Ge,
        Condition::Gt,
        Condition::Le,
    ] {
        for (left, right) in [(1, 2), (2, 2), (3, 2)] {
            assert_ne!(condition.test(left, right), condition.negate().test(left, right));
        }
        assert_eq!(condition.negate().negate(), condition);
    }
}

#[test]
fn test_type_descriptors_parse_and_print() {
    assert_eq!(TypeDesc::parse("I"), Some(TypeDesc::Int));
    assert_eq!(TypeDesc::parse("Z"), Some(TypeDesc::Boolean));
    assert_eq!(TypeDesc::parse("Lkite/String;"), Some(TypeDesc::object("kite/String")));
    assert_eq!(TypeDesc::parse("L;"), None);
    assert_eq!(TypeDesc::parse("II"), None);
    assert_eq!(TypeDesc::object("kite/Any").to_string(), "Lkite/Any;");
}

#[test]
fn test_method_descriptor_parse() {
    let descriptor = MethodDescriptor::parse("(ILkite/Any;Z)Lkite/String;").expect("valid descriptor");
    assert_eq!(
        descriptor.parameters,
        vec![TypeDesc::Int, TypeDesc::object("kite/Any"), TypeDesc::Boolean]
    );
    assert_eq!(descriptor.returns, TypeDesc::object("kite/String"));
    assert_eq!(descriptor.to_string(), "(ILkite/Any;Z)Lkite/String;");

    assert_eq!(MethodDescriptor::parse("()V").map(|d| d.parameters.len()), Some(0));
    assert!(MethodDescriptor::parse("(V)V").is_none());
    assert!(MethodDescriptor::parse("I)V").is_none());
}

#[test]
fn test_switch_lists_default_target_first() {
    let switch = Instruction::LookupSwitch {
        default: 9,
        cases: vec![(1, 4), (2, 6)],
    };
    assert_eq!(switch.jump_targets().as_slice(), &[9, 4, 6]);
    assert!(switch.is_switch());
    assert!(!switch.is_jump());
    assert!(!switch.can_fall_through());
}

#[test]
fn test_jsr_is_a_jump_that_does_not_fall_through() {
    let jsr = Instruction::Jsr(3);
    assert!(jsr.is_jump());
    assert!(!jsr.is_conditional_jump());
    assert!(!jsr.can_fall_through());
    assert!(!Instruction::Ret(1).can_fall_through());
    assert!(Instruction::If(Condition::Eq, 3).can_fall_through());
    assert!(Instruction::AThrow.exits_method());
    assert!(!Instruction::Ret(1).exits_method());
}

#[test]
fn test_map_targets_rewrites_every_target() {
    let mut switch = Instruction::LookupSwitch {
        default: 1,
        cases: vec![(10, 2), (20, 3)],
    };
    switch.map_targets(|target| target * 10);
    assert_eq!(switch.jump_targets().as_slice(), &[10, 20, 30]);

    let mut load = Instruction::ILoad(2);
    load.map_targets(|_| 99);
    assert_eq!(load, Instruction::ILoad(2));
}

#[test]
fn test_display_includes_operands() {
    let call = Instruction::InvokeStatic(MethodRef::new(
        "kite/io/ConsoleKt",
        "println",
        MethodDescriptor::new(vec![TypeDesc::object("kite/Any")], TypeDesc::Void),
    ));
    assert_eq!(call.to_string(), "invokestatic kite/io/ConsoleKt.println(Lkite/Any;)V");
    assert_eq!(Instruction::IfICmp(Condition::Lt, 7).to_string(), "if_icmplt 7");
    assert_eq!(Instruction::Ldc("hi".into()).to_string(), "ldc \"hi\"");
}

#[test]
fn test_instructions_serialize_for_json_listings() {
    let json = serde_json::to_string(&Instruction::IfICmp(Condition::Ge, 12)).expect("serializable");
    assert_eq!(json, r#"{"IfICmp":["Ge",12]}"#);
}
