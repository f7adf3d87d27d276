//! Subtyping with declaration-site variance, nullability and flexible types.

use crate::builtins::BuiltIns;
use crate::descriptors::Variance;
use crate::names::ClassId;
use crate::substitution::immediate_supertypes;
use crate::types::{KType, TypeProjection};
use kite_common::limits::MAX_SUBTYPE_DEPTH;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use tracing::trace;

/// Is `sub` a subtype of `sup`?
pub fn is_subtype_of(sub: &KType, sup: &KType) -> bool {
    is_subtype_at_depth(sub, sup, 0)
}

/// Structural equality modulo flexible types: mutual subtyping.
pub fn equal_types(a: &KType, b: &KType) -> bool {
    a == b || (is_subtype_of(a, b) && is_subtype_of(b, a))
}

fn is_subtype_at_depth(sub: &KType, sup: &KType, depth: u32) -> bool {
    if depth > MAX_SUBTYPE_DEPTH {
        trace!(%sub, %sup, "subtype check exceeded depth limit");
        return false;
    }
    if sub.is_error() || sup.is_error() {
        return true;
    }
    let sub = sub.lower_if_flexible();
    let sup = sup.upper_if_flexible();

    if sub.is_nullable() && !sup.is_nullable() {
        return false;
    }
    if sub.is_nothing() || sup.is_any() {
        return true;
    }

    match (sub, sup) {
        (KType::TypeParameter(a), KType::TypeParameter(b)) if a.parameter.id == b.parameter.id => true,
        (KType::TypeParameter(_), _) => immediate_supertypes(sub)
            .iter()
            .any(|bound| is_subtype_at_depth(bound, sup, depth + 1)),
        (_, KType::TypeParameter(_)) => false,
        (KType::Class(_), KType::Class(target)) => {
            let Some(corresponding) =
                find_corresponding_supertype(&sub.make_not_nullable(), &target.class.class_id)
            else {
                return false;
            };
            let parameters = &target.class.type_parameters;
            let sub_arguments = corresponding.arguments();
            if sub_arguments.len() != target.arguments.len() {
                // Raw or malformed; only trust identical shapes.
                return target.arguments.is_empty();
            }
            parameters
                .iter()
                .zip(sub_arguments.iter().zip(&target.arguments))
                .all(|(parameter, (sub_argument, sup_argument))| {
                    argument_fits(parameter.variance, sub_argument, sup_argument, depth)
                })
        }
        _ => false,
    }
}

fn argument_fits(
    declared: Variance,
    sub_argument: &TypeProjection,
    sup_argument: &TypeProjection,
    depth: u32,
) -> bool {
    let (sup_projection, sup_ty) = match sup_argument {
        TypeProjection::Star => return true,
        TypeProjection::Type { projection, ty } => (*projection, ty),
    };
    let (sub_projection, sub_ty) = match sub_argument {
        TypeProjection::Star => return false,
        TypeProjection::Type { projection, ty } => (*projection, ty),
    };
    let variance = if sup_projection == Variance::Invariant {
        declared
    } else {
        sup_projection
    };
    match variance {
        Variance::Out => {
            sub_projection != Variance::In && is_subtype_at_depth(sub_ty, sup_ty, depth + 1)
        }
        Variance::In => {
            sub_projection != Variance::Out && is_subtype_at_depth(sup_ty, sub_ty, depth + 1)
        }
        Variance::Invariant => {
            sub_projection == Variance::Invariant
                && is_subtype_at_depth(sub_ty, sup_ty, depth + 1)
                && is_subtype_at_depth(sup_ty, sub_ty, depth + 1)
        }
    }
}

/// Walk the supertypes of `ty` breadth-first looking for `target`,
/// substituting type arguments along the way. `List<Int>` asked for
/// `Collection` yields `Collection<Int>`.
pub fn find_corresponding_supertype(ty: &KType, target: &ClassId) -> Option<KType> {
    let mut queue = VecDeque::from([ty.clone()]);
    let mut visited = FxHashSet::default();
    while let Some(current) = queue.pop_front() {
        if let Some(id) = current.class_id() {
            if id == target {
                return Some(current);
            }
            if !visited.insert(id.clone()) {
                continue;
            }
        }
        queue.extend(immediate_supertypes(&current));
    }
    None
}

/// The most specific type that every type in `types` is a subtype of.
pub fn common_supertype(types: &[KType], builtins: &BuiltIns) -> KType {
    if let Some(error) = types.iter().find(|ty| ty.is_error()) {
        return error.clone();
    }
    let nullable = types.iter().any(KType::is_nullable);
    let candidates: Vec<&KType> = types.iter().filter(|ty| !ty.is_nothing()).collect();
    if candidates.is_empty() {
        return match types.first() {
            Some(first) => first.with_nullability(nullable),
            None => builtins.nothing_type(),
        };
    }

    let fits_all = |candidate: &KType| {
        let candidate = candidate.with_nullability(nullable);
        types.iter().all(|ty| is_subtype_of(ty, &candidate))
    };

    for candidate in &candidates {
        if fits_all(candidate) {
            return candidate.with_nullability(nullable);
        }
    }

    // Breadth-first over the first type's supertypes; nearest wins.
    let mut queue = VecDeque::from(immediate_supertypes(&candidates[0].make_not_nullable()));
    while let Some(supertype) = queue.pop_front() {
        if fits_all(&supertype) {
            return supertype.with_nullability(nullable);
        }
        queue.extend(immediate_supertypes(&supertype));
    }
    builtins.any_type().with_nullability(nullable)
}

#[cfg(test)]
#[path = "../tests/subtyping_tests.rs"]
mod subtyping_tests;
