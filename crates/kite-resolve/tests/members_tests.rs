use super::*;
use crate::test_support::environment;
use kite_metadata::box_class_id;
use kite_types::{TypeProjection, equal_types};

#[test]
fn test_override_hides_supertype_declaration() {
    let env = environment();
    let functions = member_functions(&env.builtins.int_type(), &Name::identifier("compareTo"), &env.builtins);
    assert_eq!(functions.len(), 1);
    let parameter = &functions[0].descriptor.value_parameters[0].ty;
    assert!(parameter.is_int());
}

#[test]
fn test_members_inherited_from_any() {
    let env = environment();
    let functions = member_functions(&env.builtins.string_type(), &Name::identifier("toString"), &env.builtins);
    assert_eq!(functions.len(), 1);
}

#[test]
fn test_nullable_receiver_sees_the_same_members() {
    let env = environment();
    let nullable = env.builtins.string_type().make_nullable();
    let properties = member_properties(&nullable, &Name::identifier("length"), &env.builtins);
    assert_eq!(properties.len(), 1);
}

#[test]
fn test_member_property_substitutes_class_arguments() {
    let env = environment();
    let class = env.finder.find_class(&box_class_id()).expect("Box is in the stdlib");
    let boxed = KType::class(&class, vec![TypeProjection::invariant(env.builtins.int_type())], false);

    let properties = member_properties(&boxed, &Name::identifier("value"), &env.builtins);
    let [value] = &properties[..] else {
        panic!("expected one value property, got {}", properties.len());
    };
    let ty = value.substitutor.substitute(&value.descriptor.ty);
    assert!(equal_types(&ty, &env.builtins.int_type()));
}

#[test]
fn test_all_members_collapses_overrides() {
    let env = environment();
    let members = all_members(&env.builtins.int_type(), &env.builtins);
    let compare_to = members
        .iter()
        .filter(|member| member.name().as_str() == "compareTo")
        .count();
    assert_eq!(compare_to, 1);
    assert!(members.iter().any(|member| member.name().as_str() == "hashCode"));
    assert!(members.iter().any(|member| member.name().as_str() == "plus"));
}

#[test]
fn test_error_type_has_no_members() {
    let env = environment();
    assert!(all_members(&KType::error("broken"), &env.builtins).is_empty());
}
