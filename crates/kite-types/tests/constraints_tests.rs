use super::*;
use crate::fixtures::{Fixture, type_parameter};

#[test]
fn test_infers_from_lower_bounds() {
    let f = Fixture::new();
    let t = type_parameter("T", Variance::Invariant, Vec::new());
    let mut system = ConstraintSystem::new(&f.builtins);
    system.register_type_variables(std::slice::from_ref(&t));
    system.add_subtype_constraint(
        &f.int(),
        &KType::type_parameter(&t, false),
        ConstraintPosition::ValueParameterPosition(0),
    );
    let (status, substitutor) = system.solve();
    assert!(status.is_successful(), "{:?}", system.errors());
    assert_eq!(substitutor.get(&t), Some(&f.int()));
}

#[test]
fn test_null_argument_makes_result_nullable() {
    let f = Fixture::new();
    let t = type_parameter("T", Variance::Invariant, Vec::new());
    let t_type = KType::type_parameter(&t, false);
    let mut system = ConstraintSystem::new(&f.builtins);
    system.register_type_variables(std::slice::from_ref(&t));
    system.add_subtype_constraint(&f.int(), &t_type, ConstraintPosition::ValueParameterPosition(0));
    system.add_subtype_constraint(
        &f.builtins.nullable_nothing_type(),
        &t_type,
        ConstraintPosition::ValueParameterPosition(1),
    );
    let (status, substitutor) = system.solve();
    assert!(status.is_successful());
    assert_eq!(substitutor.get(&t), Some(&f.int().make_nullable()));
}

#[test]
fn test_declared_bound_is_checked() {
    let f = Fixture::new();
    // fun <T, U : Comparable<T>> pick(a: T, b: U)
    let t = type_parameter("T", Variance::Invariant, Vec::new());
    let u = type_parameter("U", Variance::Invariant, vec![f.comparable_of(KType::type_parameter(&t, false))]);
    let t_type = KType::type_parameter(&t, false);
    let u_type = KType::type_parameter(&u, false);
    let parameters = [Arc::clone(&t), Arc::clone(&u)];

    let mut system = ConstraintSystem::new(&f.builtins);
    system.register_type_variables(&parameters);
    system.add_subtype_constraint(&f.int(), &t_type, ConstraintPosition::ValueParameterPosition(0));
    system.add_subtype_constraint(&f.int(), &u_type, ConstraintPosition::ValueParameterPosition(1));
    let (status, substitutor) = system.solve();
    assert!(status.is_successful(), "{:?}", system.errors());
    assert_eq!(substitutor.get(&u), Some(&f.int()));

    let mut failing = ConstraintSystem::new(&f.builtins);
    failing.register_type_variables(&parameters);
    failing.add_subtype_constraint(&f.int(), &t_type, ConstraintPosition::ValueParameterPosition(0));
    failing.add_subtype_constraint(&f.string(), &u_type, ConstraintPosition::ValueParameterPosition(1));
    let (status, _) = failing.solve();
    assert!(status.has_violated_bounds);
    assert!(!status.is_successful());
}

#[test]
fn test_contradiction_between_concrete_types() {
    let f = Fixture::new();
    let mut system = ConstraintSystem::new(&f.builtins);
    system.add_subtype_constraint(&f.string(), &f.int(), ConstraintPosition::ValueParameterPosition(0));
    let (status, _) = system.solve();
    assert!(status.has_contradiction);
    assert_eq!(system.errors().len(), 1);
}

#[test]
fn test_unknown_parameter_without_constraints() {
    let f = Fixture::new();
    let t = type_parameter("T", Variance::Invariant, Vec::new());
    let mut system = ConstraintSystem::new(&f.builtins);
    system.register_type_variables(std::slice::from_ref(&t));
    let (status, substitutor) = system.solve();
    assert!(status.has_unknown_parameters);
    assert_eq!(system.unknown_parameters(&substitutor).len(), 1);
}

#[test]
fn test_structural_decomposition_through_supertypes() {
    let f = Fixture::new();
    // Int <: Comparable<T> gives T := Int through Int's supertype.
    let t = type_parameter("T", Variance::Invariant, Vec::new());
    let mut system = ConstraintSystem::new(&f.builtins);
    system.register_type_variables(std::slice::from_ref(&t));
    system.add_subtype_constraint(
        &f.int(),
        &f.comparable_of(KType::type_parameter(&t, false)),
        ConstraintPosition::ReceiverPosition,
    );
    let (status, substitutor) = system.solve();
    assert!(status.is_successful(), "{:?}", system.errors());
    assert_eq!(substitutor.get(&t), Some(&f.int()));
}

#[test]
fn test_invariant_argument_fixes_variable() {
    let f = Fixture::new();
    let t = type_parameter("T", Variance::Invariant, Vec::new());
    let mut system = ConstraintSystem::new(&f.builtins);
    system.register_type_variables(std::slice::from_ref(&t));
    system.add_subtype_constraint(
        &f.cell_of(f.string()),
        &f.cell_of(KType::type_parameter(&t, false)),
        ConstraintPosition::ValueParameterPosition(0),
    );
    let (status, substitutor) = system.solve();
    assert!(status.is_successful());
    assert_eq!(substitutor.get(&t), Some(&f.string()));
}

#[test]
fn test_receiver_check_rejects_unrelated_type() {
    let f = Fixture::new();
    let mut system = ConstraintSystem::new(&f.builtins);
    system.add_subtype_constraint(
        &f.string(),
        &f.comparable_of(f.int()),
        ConstraintPosition::ReceiverPosition,
    );
    assert!(!system.solve().0.is_successful());
}
