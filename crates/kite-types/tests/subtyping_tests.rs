use super::*;
use crate::descriptors::Variance;
use crate::fixtures::{Fixture, type_parameter};
use crate::types::FlexibleTypeCapabilities;
use std::sync::Arc;

#[test]
fn test_nullability() {
    let f = Fixture::new();
    let int = f.int();
    assert!(is_subtype_of(&int, &int.make_nullable()));
    assert!(!is_subtype_of(&int.make_nullable(), &int));
    assert!(is_subtype_of(&f.builtins.nullable_nothing_type(), &f.string().make_nullable()));
    assert!(!is_subtype_of(&f.builtins.nullable_nothing_type(), &f.string()));
}

#[test]
fn test_top_and_bottom() {
    let f = Fixture::new();
    assert!(is_subtype_of(&f.string(), &f.builtins.any_type()));
    assert!(is_subtype_of(&f.builtins.nothing_type(), &f.int()));
    assert!(!is_subtype_of(&f.builtins.any_type(), &f.int()));
    assert!(!is_subtype_of(&f.builtins.nullable_any_type(), &f.builtins.any_type()));
}

#[test]
fn test_supertype_substitution() {
    let f = Fixture::new();
    assert!(is_subtype_of(&f.int(), &f.comparable_of(f.int())));
    assert!(!is_subtype_of(&f.int(), &f.comparable_of(f.string())));
    let found = find_corresponding_supertype(&f.int(), &f.comparable.class_id)
        .expect("Int implements Comparable");
    assert_eq!(found.to_string(), "Comparable<Int>");
}

#[test]
fn test_declaration_site_variance() {
    let f = Fixture::new();
    let any = f.builtins.any_type();
    // Box<out T> is covariant.
    assert!(is_subtype_of(&f.box_of(f.int()), &f.box_of(any.clone())));
    assert!(!is_subtype_of(&f.box_of(any.clone()), &f.box_of(f.int())));
    // Cell<T> is invariant.
    assert!(!is_subtype_of(&f.cell_of(f.int()), &f.cell_of(any.clone())));
    assert!(is_subtype_of(&f.cell_of(f.int()), &f.cell_of(f.int())));
    // Comparable<in T> is contravariant.
    assert!(is_subtype_of(&f.comparable_of(any.clone()), &f.comparable_of(f.int())));
    assert!(!is_subtype_of(&f.comparable_of(f.int()), &f.comparable_of(any)));
}

#[test]
fn test_type_parameter_bounds() {
    let f = Fixture::new();
    let bounded = type_parameter("T", Variance::Invariant, vec![f.comparable_of(f.int())]);
    let t = KType::type_parameter(&bounded, false);
    assert!(is_subtype_of(&t, &t));
    assert!(is_subtype_of(&t, &f.comparable_of(f.int())));
    assert!(!is_subtype_of(&f.int(), &t));

    let unbounded = type_parameter("U", Variance::Invariant, Vec::new());
    let u = KType::type_parameter(&unbounded, false);
    assert!(!is_subtype_of(&u, &f.builtins.any_type()));
    assert!(is_subtype_of(&u, &f.builtins.nullable_any_type()));
}

#[test]
fn test_flexible_types_accept_both_nullabilities() {
    let f = Fixture::new();
    let capabilities = Arc::new(FlexibleTypeCapabilities {
        id: "kite.platform".to_string(),
    });
    let flexible = KType::flexible(f.string(), f.string().make_nullable(), capabilities);
    assert!(is_subtype_of(&flexible, &f.string()));
    assert!(is_subtype_of(&f.string().make_nullable(), &flexible));
    assert_eq!(flexible.to_string(), "String!");
}

#[test]
fn test_error_types_are_compatible() {
    let f = Fixture::new();
    assert!(is_subtype_of(&KType::error("unresolved"), &f.int()));
    assert!(is_subtype_of(&f.int(), &KType::error("unresolved")));
}

#[test]
fn test_common_supertype() {
    let f = Fixture::new();
    let b = &f.builtins;
    assert_eq!(common_supertype(&[f.int(), f.int()], b), f.int());
    assert_eq!(
        common_supertype(&[f.int(), b.nullable_nothing_type()], b),
        f.int().make_nullable()
    );
    assert_eq!(common_supertype(&[f.int(), b.nothing_type()], b), f.int());
    assert_eq!(common_supertype(&[f.int(), f.string()], b), b.any_type());

    let exception = KType::simple_class(&f.exception);
    assert_eq!(
        common_supertype(&[exception, b.throwable_type()], b),
        b.throwable_type()
    );
}
