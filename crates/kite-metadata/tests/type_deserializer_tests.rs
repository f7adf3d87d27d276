use super::*;
use crate::test_support::stdlib_fixture;
use kite_types::{ClassId, DescriptorId, standard_class_ids};

fn parameter(id: u32, name: u32, upper_bounds: Vec<TypeProto>) -> TypeParameterProto {
    TypeParameterProto {
        id,
        name,
        variance: VarianceProto::Invariant,
        reified: false,
        upper_bounds,
    }
}

fn outer() -> ContainingDeclaration {
    ContainingDeclaration::Class(ClassId::from_string("test/Outer"))
}

#[test]
fn test_child_scope_sees_parent_type_parameters() {
    let fx = stdlib_fixture();
    let root = TypeDeserializer::root(Arc::clone(&fx.context), "class Outer");
    root.register_type_parameters(&[parameter(100, fx.string("T"), vec![])], outer());
    let child = root.child("fun inner");
    child.register_type_parameters(
        &[parameter(101, fx.string("value"), vec![])],
        ContainingDeclaration::Callable(DescriptorId::fresh()),
    );

    let from_parent = child.ty(&TypeProto::type_parameter(100, true));
    assert_eq!(from_parent.to_string(), "T?");
    assert!(child.ty(&TypeProto::type_parameter(101, false)).type_parameter_descriptor().is_some());

    // The parent never sees the child's parameters.
    assert!(root.ty(&TypeProto::type_parameter(101, false)).is_error());
}

#[test]
fn test_unknown_type_parameter_at_root_is_an_error_type() {
    let fx = stdlib_fixture();
    let root = TypeDeserializer::root(Arc::clone(&fx.context), "empty");
    let ty = root.ty(&TypeProto::type_parameter(9_999, false));
    assert!(ty.is_error());
    assert!(matches!(
        root.type_constructor(&TypeProto::type_parameter(9_999, false)),
        TypeConstructor::Unresolved(_)
    ));
}

#[test]
fn test_class_lookups_are_memoized() {
    let fx = stdlib_fixture();
    let root = TypeDeserializer::root(Arc::clone(&fx.context), "memo");
    let int = fx.class_type(&standard_class_ids::int());
    let first = root.ty(&int);
    let second = root.child("nested").ty(&int);
    let (Some(a), Some(b)) = (first.class_descriptor(), second.class_descriptor()) else {
        panic!("Int should resolve to a class");
    };
    assert!(Arc::ptr_eq(a, b));
    assert!(Arc::ptr_eq(a, &fx.finder.find_class(&standard_class_ids::int()).expect("Int exists")));
}

#[test]
fn test_class_without_data_is_an_error_type() {
    let fx = stdlib_fixture();
    let root = TypeDeserializer::root(Arc::clone(&fx.context), "facade");
    // Facade names are interned but have no class record.
    let facade = fx.class_type(&crate::stdlib::facades::io());
    let ty = root.ty(&facade);
    assert!(ty.is_error());
    assert!(ty.to_string().contains("kite.io.ConsoleKt"));
}

#[test]
fn test_flexible_type_uses_registered_capabilities() {
    let fx = stdlib_fixture();
    let root = TypeDeserializer::root(Arc::clone(&fx.context), "flexible");
    let string = fx.class_type(&standard_class_ids::string());
    let mut upper = string.clone();
    upper.nullable = true;

    let mut proto = string.clone();
    proto.flexible_type_capabilities_id = Some(fx.string(crate::PLATFORM_CAPABILITIES_ID));
    proto.flexible_upper_bound = Some(Box::new(upper));
    let ty = root.ty(&proto);
    assert_eq!(ty.to_string(), "String!");
    assert!(!ty.lower_if_flexible().is_marked_nullable());
    assert!(ty.upper_if_flexible().is_marked_nullable());

    proto.flexible_type_capabilities_id = Some(fx.string("Int"));
    assert!(root.ty(&proto).is_error(), "unknown capabilities give an error type");
}

#[test]
fn test_type_arguments_keep_order_and_projection() {
    let fx = stdlib_fixture();
    let root = TypeDeserializer::root(Arc::clone(&fx.context), "arguments");
    let arguments = root.type_arguments(&[
        TypeArgumentProto {
            projection: ProjectionProto::Out,
            ty: Some(fx.class_type(&standard_class_ids::int())),
        },
        TypeArgumentProto {
            projection: ProjectionProto::Star,
            ty: None,
        },
        TypeArgumentProto {
            projection: ProjectionProto::In,
            ty: Some(fx.class_type(&standard_class_ids::string())),
        },
    ]);
    assert_eq!(arguments.len(), 3);
    assert!(matches!(&arguments[0], TypeProjection::Type { projection: Variance::Out, ty } if ty.is_int()));
    assert!(matches!(arguments[1], TypeProjection::Star));
    assert!(matches!(&arguments[2], TypeProjection::Type { projection: Variance::In, ty } if ty.is_string()));
}

#[test]
fn test_self_referential_bound_is_lazy() {
    let fx = stdlib_fixture();
    let root = TypeDeserializer::root(Arc::clone(&fx.context), "fun max");
    let comparable_of_t = TypeProto::class(
        fx.class_index(&standard_class_ids::comparable()),
        vec![TypeArgumentProto {
            projection: ProjectionProto::Invariant,
            ty: Some(TypeProto::type_parameter(7, false)),
        }],
        false,
    );
    let parameters = root.register_type_parameters(&[parameter(7, fx.string("T"), vec![comparable_of_t])], outer());
    let t = &parameters[0];
    assert!(!t.bounds_computed());
    assert_eq!(t.upper_bounds().len(), 1);
    assert_eq!(t.upper_bounds()[0].to_string(), "Comparable<T>");
    assert!(t.bounds_computed());
}

#[test]
#[should_panic(expected = "registered twice")]
fn test_registering_twice_panics() {
    let fx = stdlib_fixture();
    let root = TypeDeserializer::root(Arc::clone(&fx.context), "twice");
    root.register_type_parameters(&[], outer());
    root.register_type_parameters(&[], outer());
}
