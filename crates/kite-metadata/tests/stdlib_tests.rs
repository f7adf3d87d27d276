use super::*;
use crate::codec::{decode_module, encode_module};
use kite_types::{KType, Name};

fn assert_resolved(ty: &KType, context: &str) {
    assert!(!ty.is_error(), "{context}: {ty}");
    for argument in ty.arguments() {
        if let Some(argument) = argument.ty() {
            assert_resolved(argument, context);
        }
    }
}

#[test]
fn test_stdlib_module_is_valid_and_encodable() {
    let module = stdlib_module();
    module.validate().expect("stdlib validates");
    let decoded = decode_module(&encode_module(&module)).expect("stdlib decodes");
    assert_eq!(decoded, module);
}

#[test]
fn test_every_stdlib_type_resolves() {
    let finder = stdlib_finder();
    for package in DEFAULT_IMPORTS {
        let fragment = finder
            .find_package_members(&FqName::parse(package))
            .unwrap_or_else(|| panic!("package {package}"));
        for function in fragment.scope.all_functions() {
            assert_resolved(&function.return_type, function.name.as_str());
            for parameter in &function.value_parameters {
                assert_resolved(&parameter.ty, function.name.as_str());
            }
            for bound in function.type_parameters.iter().flat_map(|t| t.upper_bounds()) {
                assert_resolved(bound, function.name.as_str());
            }
        }
        for property in fragment.scope.all_properties() {
            assert_resolved(&property.ty, property.name.as_str());
        }
        for class in fragment.scope.all_descriptors().iter().filter_map(|d| match d {
            kite_types::DeclarationDescriptor::Class(class) => Some(class.clone()),
            _ => None,
        }) {
            for supertype in class.supertypes() {
                assert_resolved(supertype, &class.class_id.to_string());
            }
            for function in class.member_scope().all_functions() {
                assert_resolved(&function.return_type, function.name.as_str());
            }
        }
    }
}

#[test]
fn test_extension_members_carry_receivers() {
    let finder = stdlib_finder();
    let kite = finder.find_package_members(&FqName::parse("kite")).expect("kite");
    let squared = &kite.scope.functions(&Name::from("squared"))[0];
    assert!(squared.extension_receiver.as_ref().is_some_and(|r| r.is_int()));
    let last_index = &kite.scope.properties(&Name::from("lastIndex"))[0];
    assert!(last_index.extension_receiver.as_ref().is_some_and(|r| r.is_string()));
}
