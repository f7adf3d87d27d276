use super::*;
use kite_resolve::ResolveEnvironment;
use kite_types::Name;

fn env() -> ResolveEnvironment {
    ResolveEnvironment::stdlib().expect("stdlib environment loads")
}

#[test]
fn test_primitives_travel_as_integers_unless_nullable() {
    let env = env();
    let builtins = &env.builtins;
    assert_eq!(value_desc(&builtins.int_type()), Some(TypeDesc::Int));
    assert_eq!(value_desc(&builtins.boolean_type()), Some(TypeDesc::Boolean));
    assert_eq!(
        value_desc(&builtins.int_type().make_nullable()),
        Some(TypeDesc::object("kite/Int"))
    );
    assert_eq!(value_desc(&builtins.string_type()), Some(TypeDesc::object("kite/String")));
}

#[test]
fn test_unit_and_nothing_are_not_materialized() {
    let env = env();
    let builtins = &env.builtins;
    assert_eq!(value_desc(&builtins.unit_type()), None);
    assert_eq!(value_desc(&builtins.nothing_type()), None);
    assert_eq!(return_desc(&builtins.unit_type()), TypeDesc::Void);
    assert_eq!(stored_desc(&builtins.unit_type()), TypeDesc::object(UNIT_CLASS));
    assert_eq!(stored_desc(&builtins.nothing_type()), TypeDesc::object(ANY_CLASS));
    assert_eq!(
        value_desc(&builtins.nullable_nothing_type()),
        Some(TypeDesc::object("kite/Nothing"))
    );
}

#[test]
fn test_accessor_names_capitalize_the_property() {
    assert_eq!(accessor_name("get", "length"), "getLength");
    assert_eq!(accessor_name("set", "value"), "setValue");
    assert_eq!(accessor_name("get", "x"), "getX");
}

#[test]
fn test_earlier_line_fields() {
    assert_eq!(earlier_line_field(&kite_resolve::line_class_id(3)), "$line3");
    assert_eq!(earlier_line_field(&kite_resolve::line_class_id(12)), "$line12");
}

#[test]
fn test_extension_functions_take_the_receiver_first() {
    let env = env();
    let fragment = env
        .finder
        .find_package_members(&kite_types::FqName::parse("kite"))
        .expect("kite package");
    let squared = fragment
        .scope
        .functions(&Name::identifier("squared"))
        .first()
        .cloned()
        .expect("Int.squared");
    assert_eq!(function_descriptor(&squared).to_string(), "(I)I");

    let max_of = fragment
        .scope
        .functions(&Name::identifier("maxOf"))
        .first()
        .cloned()
        .expect("maxOf");
    assert_eq!(
        function_descriptor(&max_of).to_string(),
        "(Lkite/Any;Lkite/Any;)Lkite/Any;"
    );
}
