//! Constraint system for inferring type arguments.
//!
//! Type parameters of a candidate callable are registered as variables.
//! Subtype constraints between argument types and parameter types are
//! decomposed structurally into lower bounds (`L <: α`), upper bounds
//! (`α <: U`) and equalities. Variables that must be equal are merged in an
//! `ena` union-find table; the table value holds a fixed type when an
//! equality pins one down.
//!
//! After collection, each variable's value is the common supertype of its
//! lower bounds (or a fixed type, or its first upper bound) and must then
//! satisfy every bound. The declared bounds of the type parameters are
//! checked against the result but never used to pick it when lower bounds
//! exist.

use crate::builtins::BuiltIns;
use crate::descriptors::{DescriptorId, TypeParameterDescriptor, Variance};
use crate::substitution::TypeSubstitutor;
use crate::subtyping::{common_supertype, find_corresponding_supertype, is_subtype_of};
use crate::types::{KType, TypeProjection};
use ena::unify::{InPlaceUnificationTable, NoError, UnifyKey, UnifyValue};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, trace};

/// A type variable standing for one registered type parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeVariable(pub u32);

/// Wrapper for a fixed type to implement `UnifyValue`.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedType(pub Option<KType>);

impl UnifyKey for TypeVariable {
    type Value = FixedType;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        TypeVariable(u)
    }

    fn tag() -> &'static str {
        "TypeVariable"
    }
}

impl UnifyValue for FixedType {
    type Error = NoError;

    fn unify_values(a: &Self, b: &Self) -> Result<Self, Self::Error> {
        match (&a.0, &b.0) {
            (None, None) => Ok(FixedType(None)),
            (Some(t), None) | (None, Some(t)) => Ok(FixedType(Some(t.clone()))),
            // Conflicts are detected when the merged bounds are checked.
            (Some(t), Some(_)) => Ok(FixedType(Some(t.clone()))),
        }
    }
}

/// Where a constraint came from; used for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintPosition {
    ReceiverPosition,
    ValueParameterPosition(u32),
    ExpectedTypePosition,
    TypeBoundPosition(u32),
    ExplicitTypeArgument(u32),
}

/// Bounds collected for one variable.
#[derive(Clone, Debug, Default)]
pub struct ConstraintSet {
    pub lower_bounds: SmallVec<[KType; 2]>,
    pub upper_bounds: SmallVec<[KType; 2]>,
}

impl ConstraintSet {
    fn add_lower_bound(&mut self, ty: KType) {
        if !self.lower_bounds.contains(&ty) {
            self.lower_bounds.push(ty);
        }
    }

    fn add_upper_bound(&mut self, ty: KType) {
        if !self.upper_bounds.contains(&ty) {
            self.upper_bounds.push(ty);
        }
    }

    fn merge_from(&mut self, other: ConstraintSet) {
        for ty in other.lower_bounds {
            self.add_lower_bound(ty);
        }
        for ty in other.upper_bounds {
            self.add_upper_bound(ty);
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConstraintError {
    /// Two concrete types were required to be related and are not.
    TypeMismatch {
        sub: KType,
        sup: KType,
        position: ConstraintPosition,
    },
    /// The inferred value violates a bound.
    BoundViolated {
        parameter: String,
        value: KType,
        bound: KType,
    },
}

/// Summary of a solved system.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConstraintSystemStatus {
    pub has_contradiction: bool,
    pub has_unknown_parameters: bool,
    pub has_violated_bounds: bool,
}

impl ConstraintSystemStatus {
    pub fn is_successful(&self) -> bool {
        !self.has_contradiction && !self.has_unknown_parameters && !self.has_violated_bounds
    }
}

pub struct ConstraintSystem<'a> {
    builtins: &'a BuiltIns,
    table: InPlaceUnificationTable<TypeVariable>,
    parameters: Vec<Arc<TypeParameterDescriptor>>,
    variables: FxHashMap<DescriptorId, TypeVariable>,
    constraints: Vec<ConstraintSet>,
    errors: Vec<ConstraintError>,
}

impl<'a> ConstraintSystem<'a> {
    pub fn new(builtins: &'a BuiltIns) -> Self {
        ConstraintSystem {
            builtins,
            table: InPlaceUnificationTable::new(),
            parameters: Vec::new(),
            variables: FxHashMap::default(),
            constraints: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Register type parameters as variables and record their declared bounds.
    pub fn register_type_variables(&mut self, parameters: &[Arc<TypeParameterDescriptor>]) {
        for parameter in parameters {
            let var = self.table.new_key(FixedType(None));
            debug_assert_eq!(var.0 as usize, self.constraints.len());
            self.constraints.push(ConstraintSet::default());
            self.parameters.push(Arc::clone(parameter));
            self.variables.insert(parameter.id, var);
        }
    }

    pub fn variable_count(&self) -> usize {
        self.parameters.len()
    }

    fn variable_of(&self, ty: &KType) -> Option<TypeVariable> {
        let parameter = ty.type_parameter_descriptor()?;
        self.variables.get(&parameter.id).copied()
    }

    fn mentions_variables(&self, ty: &KType) -> bool {
        ty.contains_type_parameter(&|parameter| self.variables.contains_key(&parameter.id))
    }

    /// Require `sub <: sup`.
    pub fn add_subtype_constraint(&mut self, sub: &KType, sup: &KType, position: ConstraintPosition) {
        trace!(%sub, %sup, ?position, "subtype constraint");
        self.add_subtype(sub, sup, position, 0);
    }

    /// Require `sub` and `sup` to be equal.
    pub fn add_equality_constraint(&mut self, a: &KType, b: &KType, position: ConstraintPosition) {
        self.add_equal(a, b, position, 0);
    }

    fn add_subtype(&mut self, sub: &KType, sup: &KType, position: ConstraintPosition, depth: u32) {
        if depth > kite_common::limits::MAX_SUBTYPE_DEPTH || sub.is_error() || sup.is_error() {
            return;
        }

        if let Some(var) = self.variable_of(sup) {
            if sup.is_marked_nullable() {
                // `x <: T?` constrains T by the non-null part of x.
                let bound = sub.make_not_nullable();
                if !bound.is_nothing() {
                    self.constraint_set(var).add_lower_bound(bound);
                }
            } else {
                self.constraint_set(var).add_lower_bound(sub.clone());
            }
            return;
        }
        if let Some(var) = self.variable_of(sub) {
            if sub.is_marked_nullable() && !sup.is_nullable() {
                self.mismatch(sub, sup, position);
                return;
            }
            self.constraint_set(var).add_upper_bound(sup.clone());
            return;
        }

        if !self.mentions_variables(sub) && !self.mentions_variables(sup) {
            if !is_subtype_of(sub, sup) {
                self.mismatch(sub, sup, position);
            }
            return;
        }

        let sub_lower = sub.lower_if_flexible();
        let sup_upper = sup.upper_if_flexible();
        if sub_lower.is_nullable() && !sup_upper.is_nullable() {
            self.mismatch(sub, sup, position);
            return;
        }
        if sub_lower.is_nothing() {
            return;
        }
        let Some(target) = sup_upper.class_descriptor().cloned() else {
            self.mismatch(sub, sup, position);
            return;
        };
        let Some(corresponding) =
            find_corresponding_supertype(&sub_lower.make_not_nullable(), &target.class_id)
        else {
            self.mismatch(sub, sup, position);
            return;
        };
        let sub_arguments = corresponding.arguments().to_vec();
        let sup_arguments = sup_upper.arguments().to_vec();
        for ((parameter, sub_argument), sup_argument) in target
            .type_parameters
            .iter()
            .zip(&sub_arguments)
            .zip(&sup_arguments)
        {
            let (TypeProjection::Type { ty: sub_ty, .. }, TypeProjection::Type { projection, ty: sup_ty }) =
                (sub_argument, sup_argument)
            else {
                continue;
            };
            let variance = if *projection == Variance::Invariant {
                parameter.variance
            } else {
                *projection
            };
            match variance {
                Variance::Out => self.add_subtype(sub_ty, sup_ty, position, depth + 1),
                Variance::In => self.add_subtype(sup_ty, sub_ty, position, depth + 1),
                Variance::Invariant => self.add_equal(sub_ty, sup_ty, position, depth + 1),
            }
        }
    }

    fn add_equal(&mut self, a: &KType, b: &KType, position: ConstraintPosition, depth: u32) {
        match (self.variable_of(a), self.variable_of(b)) {
            (Some(x), Some(y)) => {
                let y_root = self.table.find(y);
                let merged = std::mem::take(&mut self.constraints[y_root.0 as usize]);
                let _ = self.table.unify_var_var(x, y);
                let root = self.table.find(x);
                self.constraints[root.0 as usize].merge_from(merged);
            }
            (Some(var), None) => self.fix(var, b),
            (None, Some(var)) => self.fix(var, a),
            (None, None) => {
                self.add_subtype(a, b, position, depth);
                self.add_subtype(b, a, position, depth);
            }
        }
    }

    fn fix(&mut self, var: TypeVariable, ty: &KType) {
        let _ = self.table.unify_var_value(var, FixedType(Some(ty.clone())));
        let set = self.constraint_set(var);
        set.add_lower_bound(ty.clone());
        set.add_upper_bound(ty.clone());
    }

    fn constraint_set(&mut self, var: TypeVariable) -> &mut ConstraintSet {
        let root = self.table.find(var);
        &mut self.constraints[root.0 as usize]
    }

    fn mismatch(&mut self, sub: &KType, sup: &KType, position: ConstraintPosition) {
        debug!(%sub, %sup, ?position, "constraint contradiction");
        self.errors.push(ConstraintError::TypeMismatch {
            sub: sub.clone(),
            sup: sup.clone(),
            position,
        });
    }

    /// Solve the system. Returns the status and the inferred substitution;
    /// unknown variables are left unmapped.
    pub fn solve(&mut self) -> (ConstraintSystemStatus, TypeSubstitutor) {
        let mut status = ConstraintSystemStatus {
            has_contradiction: !self.errors.is_empty(),
            ..ConstraintSystemStatus::default()
        };
        let mut substitutor = TypeSubstitutor::empty();
        let mut values: Vec<Option<KType>> = Vec::with_capacity(self.parameters.len());

        for index in 0..self.parameters.len() {
            let var = TypeVariable(index as u32);
            let root = self.table.find(var);
            let fixed = self.table.probe_value(var).0;
            let set = &self.constraints[root.0 as usize];
            let value = fixed
                .or_else(|| {
                    let lower: Vec<KType> = set
                        .lower_bounds
                        .iter()
                        .filter(|ty| !self.mentions_variables(ty))
                        .cloned()
                        .collect();
                    (!lower.is_empty()).then(|| common_supertype(&lower, self.builtins))
                })
                .or_else(|| {
                    set.upper_bounds
                        .iter()
                        .find(|ty| !self.mentions_variables(ty))
                        .cloned()
                });
            values.push(value);
        }

        for (parameter, value) in self.parameters.iter().zip(&values) {
            match value {
                Some(value) => substitutor.insert(parameter, value.clone()),
                None => status.has_unknown_parameters = true,
            }
        }

        for (index, parameter) in self.parameters.iter().enumerate() {
            let Some(value) = &values[index] else {
                continue;
            };
            let root = self.table.find(TypeVariable(index as u32));
            let set = &self.constraints[root.0 as usize];
            for lower in &set.lower_bounds {
                let lower = substitutor.substitute(lower);
                if !is_subtype_of(&lower, value) {
                    status.has_contradiction = true;
                    self.errors.push(ConstraintError::TypeMismatch {
                        sub: lower,
                        sup: value.clone(),
                        position: ConstraintPosition::TypeBoundPosition(parameter.index),
                    });
                }
            }
            for upper in &set.upper_bounds {
                let upper = substitutor.substitute(upper);
                if !is_subtype_of(value, &upper) {
                    status.has_contradiction = true;
                    self.errors.push(ConstraintError::TypeMismatch {
                        sub: value.clone(),
                        sup: upper,
                        position: ConstraintPosition::TypeBoundPosition(parameter.index),
                    });
                }
            }
            for bound in parameter.upper_bounds() {
                let bound = substitutor.substitute(bound);
                if !is_subtype_of(value, &bound) {
                    status.has_violated_bounds = true;
                    self.errors.push(ConstraintError::BoundViolated {
                        parameter: parameter.name.to_string(),
                        value: value.clone(),
                        bound,
                    });
                }
            }
        }

        debug!(?status, variables = self.parameters.len(), "constraint system solved");
        (status, substitutor)
    }

    pub fn errors(&self) -> &[ConstraintError] {
        &self.errors
    }

    /// Parameters that could not be inferred after [`ConstraintSystem::solve`].
    pub fn unknown_parameters(&self, substitutor: &TypeSubstitutor) -> Vec<Arc<TypeParameterDescriptor>> {
        self.parameters
            .iter()
            .filter(|parameter| substitutor.get(parameter).is_none())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "../tests/constraints_tests.rs"]
mod constraints_tests;
