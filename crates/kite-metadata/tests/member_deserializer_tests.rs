use super::*;
use crate::proto::{TypeArgumentProto, TypeParameterProto, VarianceProto, ProjectionProto};
use crate::stdlib::box_class_id;
use crate::test_support::{StdlibFixture, stdlib_fixture};
use kite_types::{Modality, Visibility, standard_class_ids};

fn callable(fx: &StdlibFixture, kind: CallableKind, name: &str, ty: Option<TypeProto>) -> CallableProto {
    CallableProto {
        flags: CallableFlags::build(Visibility::Public, Modality::Final, kind),
        name: fx.string(name),
        type_parameters: Vec::new(),
        receiver_type: None,
        value_parameters: Vec::new(),
        return_type: ty,
        getter_flags: AccessorFlags::empty(),
        setter_flags: AccessorFlags::empty(),
        setter_parameter: None,
        constant: None,
    }
}

fn class_members(fx: &StdlibFixture) -> MemberDeserializer {
    let types = TypeDeserializer::root(Arc::clone(&fx.context), "class Box");
    MemberDeserializer::new(types, ContainingDeclaration::Class(box_class_id()))
}

fn package_members(fx: &StdlibFixture) -> MemberDeserializer {
    let types = TypeDeserializer::root(Arc::clone(&fx.context), "package kite");
    MemberDeserializer::new(
        types,
        ContainingDeclaration::Package {
            fq_name: kite_types::FqName::parse("kite"),
            facade: crate::stdlib::facades::kite(),
        },
    )
}

#[test]
fn test_var_with_default_accessors() {
    let fx = stdlib_fixture();
    let mut proto = callable(&fx, CallableKind::Var, "value", Some(fx.class_type(&standard_class_ids::int())));
    proto.flags |= CallableFlags::HAS_GETTER | CallableFlags::HAS_SETTER;
    proto.getter_flags = AccessorFlags::build(Visibility::Public, false);
    proto.setter_flags = AccessorFlags::build(Visibility::Private, false);

    let property = class_members(&fx).load_property(&proto).expect("valid property");
    assert!(property.is_var);
    assert_eq!(property.dispatch_receiver, Some(box_class_id()));
    let getter = property.getter.as_ref().expect("getter");
    assert!(getter.is_getter && getter.is_default);
    let setter = property.setter.as_ref().expect("setter");
    assert!(setter.is_default);
    assert_eq!(setter.visibility, Visibility::Private);
    let parameter = setter.value_parameter.as_ref().expect("setter parameter");
    assert_eq!(parameter.ty, property.ty, "default setter takes the property type");
}

#[test]
fn test_explicit_setter_parameter_is_deserialized() {
    let fx = stdlib_fixture();
    let mut proto = callable(&fx, CallableKind::Var, "value", Some(fx.class_type(&standard_class_ids::int())));
    proto.flags |= CallableFlags::HAS_SETTER;
    proto.setter_flags = AccessorFlags::build(Visibility::Public, true);
    proto.setter_parameter = Some(ValueParameterProto {
        name: fx.string("other"),
        ty: fx.class_type(&standard_class_ids::int()),
        declares_default: false,
    });

    let property = class_members(&fx).load_property(&proto).expect("valid property");
    assert!(property.getter.is_none());
    let setter = property.setter.as_ref().expect("setter");
    assert!(!setter.is_default);
    assert_eq!(setter.value_parameter.as_ref().map(|p| p.name.as_str()), Some("other"));
}

#[test]
fn test_constant_is_evaluated_lazily() {
    let fx = stdlib_fixture();
    let mut proto = callable(&fx, CallableKind::Val, "MAX_INT", Some(fx.class_type(&standard_class_ids::string())));
    proto.flags |= CallableFlags::HAS_CONSTANT | CallableFlags::IS_CONST;
    proto.constant = Some(ConstantProto::String(fx.string("kite")));

    let property = package_members(&fx).load_property(&proto).expect("valid property");
    let lazy = property.compile_time_constant.as_ref().expect("constant attached");
    assert!(!lazy.is_computed());
    assert_eq!(property.constant(), Some(&ConstantValue::String(Arc::from("kite"))));
    assert!(lazy.is_computed());
    assert!(property.dispatch_receiver.is_none());
}

#[test]
fn test_constant_without_flag_is_ignored() {
    let fx = stdlib_fixture();
    let mut proto = callable(&fx, CallableKind::Val, "MAX_INT", Some(fx.class_type(&standard_class_ids::int())));
    proto.constant = Some(ConstantProto::Int(1));
    let property = package_members(&fx).load_property(&proto).expect("valid property");
    assert!(property.compile_time_constant.is_none());
}

#[test]
fn test_function_type_parameters_resolve_in_own_scope() {
    let fx = stdlib_fixture();
    let comparable_of_t = TypeProto::class(
        fx.class_index(&standard_class_ids::comparable()),
        vec![TypeArgumentProto {
            projection: ProjectionProto::Invariant,
            ty: Some(TypeProto::type_parameter(40, false)),
        }],
        false,
    );
    let mut proto = callable(&fx, CallableKind::Fun, "maxOf", Some(TypeProto::type_parameter(40, false)));
    proto.type_parameters = vec![TypeParameterProto {
        id: 40,
        name: fx.string("T"),
        variance: VarianceProto::Invariant,
        reified: false,
        upper_bounds: vec![comparable_of_t],
    }];
    proto.value_parameters = vec![
        ValueParameterProto { name: fx.string("a"), ty: TypeProto::type_parameter(40, false), declares_default: false },
        ValueParameterProto { name: fx.string("b"), ty: TypeProto::type_parameter(40, false), declares_default: false },
    ];

    let function = package_members(&fx).load_function(&proto).expect("valid function");
    assert_eq!(function.type_parameters.len(), 1);
    let t = &function.type_parameters[0];
    assert_eq!(t.containing, ContainingDeclaration::Callable(function.id));
    assert_eq!(function.return_type.type_parameter_descriptor(), Some(t));
    assert!(function.value_parameters.iter().all(|p| p.ty.type_parameter_descriptor() == Some(t)));
    assert_eq!(t.upper_bounds()[0].to_string(), "Comparable<T>");
}

#[test]
fn test_load_callable_dispatches_on_kind() {
    let fx = stdlib_fixture();
    let members = class_members(&fx);
    let function = callable(&fx, CallableKind::Fun, "plus", Some(fx.class_type(&standard_class_ids::int())));
    let constructor = callable(&fx, CallableKind::Constructor, "<init>", None);
    assert!(matches!(members.load_callable(&function), Ok(CallableDescriptor::Function(_))));
    match members.load_callable(&constructor) {
        Ok(CallableDescriptor::Constructor(constructor)) => {
            assert_eq!(constructor.containing_class, box_class_id());
        }
        other => panic!("expected a constructor, got {other:?}"),
    }
}

#[test]
fn test_unknown_kind_is_a_hard_failure() {
    let fx = stdlib_fixture();
    let mut proto = callable(&fx, CallableKind::Fun, "plus", Some(fx.class_type(&standard_class_ids::int())));
    proto.flags = CallableFlags::from_bits_retain(6 << 4);
    assert_eq!(
        class_members(&fx).load_callable(&proto).err(),
        Some(MetadataError::UnknownCallableKind { kind: 6, name: "plus".to_string() })
    );
}

#[test]
fn test_constructor_outside_class_is_rejected() {
    let fx = stdlib_fixture();
    let proto = callable(&fx, CallableKind::Constructor, "<init>", None);
    assert!(matches!(
        package_members(&fx).load_constructor(&proto),
        Err(MetadataError::MissingField { record: "Constructor", .. })
    ));
}

#[test]
fn test_missing_return_type_is_rejected() {
    let fx = stdlib_fixture();
    let proto = callable(&fx, CallableKind::Fun, "plus", None);
    assert!(matches!(
        class_members(&fx).load_function(&proto),
        Err(MetadataError::MissingField { field: "return_type", .. })
    ));
}
