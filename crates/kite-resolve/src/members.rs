//! Member lookup through a type's supertype graph.
//!
//! Members are collected breadth-first from the receiver type upwards,
//! each with the substitution that maps the declaring class's type
//! parameters to the receiver's arguments. A member whose name and arity
//! were already seen lower in the hierarchy is an override and skipped.

use kite_types::substitution::immediate_supertypes;
use kite_types::{
    BuiltIns, ClassId, DeclarationDescriptor, FunctionDescriptor, KType, Name, PropertyDescriptor,
    TypeSubstitutor,
};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::sync::Arc;

/// A member together with the substitution for its declaring class.
#[derive(Debug)]
pub struct Member<T> {
    pub descriptor: Arc<T>,
    pub substitutor: TypeSubstitutor,
}

impl<T> Clone for Member<T> {
    fn clone(&self) -> Self {
        Member {
            descriptor: Arc::clone(&self.descriptor),
            substitutor: self.substitutor.clone(),
        }
    }
}

/// Class types reachable from `receiver`, nearest first, each once.
fn supertype_walk(receiver: &KType, builtins: &BuiltIns) -> Vec<KType> {
    let start = receiver.lower_if_flexible().make_not_nullable();
    let mut queue = VecDeque::from([start]);
    let mut visited: FxHashSet<ClassId> = FxHashSet::default();
    let mut classes = Vec::new();
    while let Some(current) = queue.pop_front() {
        match &current {
            KType::Class(_) => {
                let Some(class_id) = current.class_id() else {
                    continue;
                };
                if !visited.insert(class_id.clone()) {
                    continue;
                }
                queue.extend(immediate_supertypes(&current).iter().map(KType::make_not_nullable));
                classes.push(current);
            }
            KType::TypeParameter(parameter) => {
                if parameter.parameter.upper_bounds().is_empty() {
                    queue.push_back(builtins.any_type());
                } else {
                    queue.extend(immediate_supertypes(&current).iter().map(KType::make_not_nullable));
                }
            }
            KType::Flexible(flexible) => queue.push_back(flexible.lower.make_not_nullable()),
            KType::Error(_) => {}
        }
    }
    classes
}

fn substitutor_for(ty: &KType) -> Option<TypeSubstitutor> {
    let class = ty.class_descriptor()?;
    Some(TypeSubstitutor::for_class(class, ty.arguments()))
}

pub fn member_functions(receiver: &KType, name: &Name, builtins: &BuiltIns) -> Vec<Member<FunctionDescriptor>> {
    let mut seen_arities = FxHashSet::default();
    let mut members = Vec::new();
    for ty in supertype_walk(receiver, builtins) {
        let (Some(class), Some(substitutor)) = (ty.class_descriptor(), substitutor_for(&ty)) else {
            continue;
        };
        let declared = class.member_scope().functions(name);
        for function in declared {
            if !seen_arities.contains(&function.value_parameters.len()) {
                members.push(Member {
                    descriptor: Arc::clone(function),
                    substitutor: substitutor.clone(),
                });
            }
        }
        seen_arities.extend(declared.iter().map(|function| function.value_parameters.len()));
    }
    members
}

pub fn member_properties(receiver: &KType, name: &Name, builtins: &BuiltIns) -> Vec<Member<PropertyDescriptor>> {
    for ty in supertype_walk(receiver, builtins) {
        let (Some(class), Some(substitutor)) = (ty.class_descriptor(), substitutor_for(&ty)) else {
            continue;
        };
        let found: Vec<_> = class
            .member_scope()
            .properties(name)
            .iter()
            .filter(|property| !property.is_extension())
            .map(|property| Member {
                descriptor: Arc::clone(property),
                substitutor: substitutor.clone(),
            })
            .collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// Every member function and property visible on `receiver`, overrides
/// collapsed onto the nearest declaration.
pub fn all_members(receiver: &KType, builtins: &BuiltIns) -> Vec<DeclarationDescriptor> {
    let mut seen: FxHashSet<(Name, Option<usize>)> = FxHashSet::default();
    let mut members = Vec::new();
    for ty in supertype_walk(receiver, builtins) {
        let Some(class) = ty.class_descriptor() else {
            continue;
        };
        for descriptor in class.member_scope().all_descriptors() {
            let key = match &descriptor {
                DeclarationDescriptor::Function(function) => {
                    (function.name.clone(), Some(function.value_parameters.len()))
                }
                DeclarationDescriptor::Property(property) => (property.name.clone(), None),
                _ => continue,
            };
            if seen.insert(key) {
                members.push(descriptor);
            }
        }
    }
    members
}

#[cfg(test)]
#[path = "../tests/members_tests.rs"]
mod members_tests;
