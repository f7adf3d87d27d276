//! Type substitution: replacing type parameters with concrete types.

use crate::descriptors::{ClassDescriptor, DescriptorId, TypeParameterDescriptor};
use crate::types::{ClassType, KType, TypeProjection};
use rustc_hash::FxHashMap;
use std::sync::Arc;

#[derive(Clone, Default, Debug)]
pub struct TypeSubstitutor {
    map: FxHashMap<DescriptorId, KType>,
}

impl TypeSubstitutor {
    pub fn empty() -> Self {
        TypeSubstitutor::default()
    }

    /// Map each of `class`'s type parameters to the matching argument.
    /// Star projections leave the parameter unmapped.
    pub fn for_class(class: &ClassDescriptor, arguments: &[TypeProjection]) -> Self {
        let mut substitutor = TypeSubstitutor::default();
        for (parameter, argument) in class.type_parameters.iter().zip(arguments) {
            if let Some(ty) = argument.ty() {
                substitutor.insert(parameter, ty.clone());
            }
        }
        substitutor
    }

    pub fn insert(&mut self, parameter: &TypeParameterDescriptor, ty: KType) {
        self.map.insert(parameter.id, ty);
    }

    pub fn get(&self, parameter: &TypeParameterDescriptor) -> Option<&KType> {
        self.map.get(&parameter.id)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn substitute(&self, ty: &KType) -> KType {
        if self.map.is_empty() {
            return ty.clone();
        }
        match ty {
            KType::TypeParameter(parameter) => match self.map.get(&parameter.parameter.id) {
                Some(replacement) if parameter.nullable => replacement.make_nullable(),
                Some(replacement) => replacement.clone(),
                None => ty.clone(),
            },
            KType::Class(class) if !class.arguments.is_empty() => KType::Class(Arc::new(ClassType {
                class: Arc::clone(&class.class),
                arguments: class
                    .arguments
                    .iter()
                    .map(|argument| self.substitute_projection(argument))
                    .collect(),
                nullable: class.nullable,
            })),
            KType::Flexible(flexible) => KType::flexible(
                self.substitute(&flexible.lower),
                self.substitute(&flexible.upper),
                Arc::clone(&flexible.capabilities),
            ),
            _ => ty.clone(),
        }
    }

    pub fn substitute_projection(&self, projection: &TypeProjection) -> TypeProjection {
        match projection {
            TypeProjection::Type { projection, ty } => TypeProjection::Type {
                projection: *projection,
                ty: self.substitute(ty),
            },
            TypeProjection::Star => TypeProjection::Star,
        }
    }
}

/// Supertypes of `ty` with the class's type arguments substituted in.
pub fn immediate_supertypes(ty: &KType) -> Vec<KType> {
    match ty.lower_if_flexible() {
        KType::Class(class) => {
            let substitutor = TypeSubstitutor::for_class(&class.class, &class.arguments);
            class
                .class
                .supertypes()
                .iter()
                .map(|supertype| substitutor.substitute(supertype).with_nullability(class.nullable))
                .collect()
        }
        KType::TypeParameter(parameter) => parameter
            .parameter
            .upper_bounds()
            .iter()
            .map(|bound| {
                if parameter.nullable {
                    bound.make_nullable()
                } else {
                    bound.clone()
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}
