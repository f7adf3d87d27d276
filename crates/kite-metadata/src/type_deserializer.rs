//! Reconstructing semantic types from type protos.
//!
//! A [`TypeDeserializer`] is one node of a scope chain: a class's
//! deserializer owns the class's type parameters, and each member gets a
//! child that owns the member's own type parameters. Type-parameter lookup
//! walks from the child to the root; class lookup goes through a memoized
//! function shared by the whole chain.

use crate::context::DeserializationContext;
use crate::proto::{ProjectionProto, TypeArgumentProto, TypeConstructorProto, TypeParameterProto, TypeProto, VarianceProto};
use indexmap::IndexMap;
use kite_common::{LazyValue, MemoizedFunction};
use kite_types::{
    ClassDescriptor, ContainingDeclaration, KType, TypeParameterDescriptor, TypeProjection, Variance,
};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

/// What a type proto's constructor resolved to.
#[derive(Debug, Clone)]
pub enum TypeConstructor {
    Class(Arc<ClassDescriptor>),
    TypeParameter(Arc<TypeParameterDescriptor>),
    /// The class or type parameter is not available; carries a description.
    Unresolved(String),
}

pub struct TypeDeserializer {
    context: Arc<DeserializationContext>,
    parent: Option<Arc<TypeDeserializer>>,
    debug_name: String,
    class_descriptors: Arc<MemoizedFunction<u32, Arc<ClassDescriptor>>>,
    type_parameters: OnceCell<IndexMap<u32, Arc<TypeParameterDescriptor>>>,
}

impl TypeDeserializer {
    /// Create the root of a scope chain.
    pub fn root(context: Arc<DeserializationContext>, debug_name: impl Into<String>) -> Arc<Self> {
        let lookup_context = Arc::clone(&context);
        let class_descriptors = MemoizedFunction::new(move |index: &u32| {
            let class_id = match lookup_context.resolver.get_class_id(*index) {
                Ok(class_id) => class_id,
                Err(err) => {
                    warn!(module = %lookup_context.module_name, index, %err, "bad class reference");
                    return None;
                }
            };
            let finder = lookup_context.finder.upgrade()?;
            finder.find_class(&class_id)
        });
        Arc::new(TypeDeserializer {
            context,
            parent: None,
            debug_name: debug_name.into(),
            class_descriptors: Arc::new(class_descriptors),
            type_parameters: OnceCell::new(),
        })
    }

    /// Create a nested scope that sees this scope's type parameters.
    pub fn child(self: &Arc<Self>, debug_name: impl Into<String>) -> Arc<Self> {
        Arc::new(TypeDeserializer {
            context: Arc::clone(&self.context),
            parent: Some(Arc::clone(self)),
            debug_name: debug_name.into(),
            class_descriptors: Arc::clone(&self.class_descriptors),
            type_parameters: OnceCell::new(),
        })
    }

    pub fn context(&self) -> &Arc<DeserializationContext> {
        &self.context
    }

    /// Declare this scope's type parameters.
    ///
    /// Must run before any type referring to them is deserialized, and at
    /// most once per scope. Bounds are deserialized lazily so that a bound
    /// may mention the parameter itself (`T : Comparable<T>`).
    ///
    /// # Panics
    ///
    /// If type parameters were already registered for this scope.
    pub fn register_type_parameters(
        self: &Arc<Self>,
        protos: &[TypeParameterProto],
        containing: ContainingDeclaration,
    ) -> Vec<Arc<TypeParameterDescriptor>> {
        let mut descriptors = IndexMap::with_capacity(protos.len());
        for (index, proto) in protos.iter().enumerate() {
            let name = match self.context.resolver.get_name(proto.name) {
                Ok(name) => name,
                Err(err) => {
                    warn!(scope = %self.debug_name, %err, "bad type parameter name");
                    kite_types::special_names::no_name_provided()
                }
            };
            let scope = Arc::clone(self);
            let bound_protos = proto.upper_bounds.clone();
            let upper_bounds = LazyValue::new(move || {
                bound_protos.iter().map(|bound| scope.ty(bound)).collect()
            });
            let descriptor = TypeParameterDescriptor::new(
                name,
                index as u32,
                variance(proto.variance),
                proto.reified,
                containing.clone(),
                upper_bounds,
            );
            descriptors.insert(proto.id, Arc::new(descriptor));
        }
        let own: Vec<_> = descriptors.values().cloned().collect();
        assert!(
            self.type_parameters.set(descriptors).is_ok(),
            "type parameters of {} registered twice",
            self.debug_name
        );
        own
    }

    /// Type parameters declared by this scope, in declaration order.
    pub fn own_type_parameters(&self) -> Vec<Arc<TypeParameterDescriptor>> {
        self.type_parameters
            .get()
            .map(|parameters| parameters.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Look a type parameter up by proto id, innermost scope first.
    pub fn type_parameter(&self, id: u32) -> Option<Arc<TypeParameterDescriptor>> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(parameter) = current.type_parameters.get().and_then(|own| own.get(&id)) {
                return Some(Arc::clone(parameter));
            }
            scope = current.parent.as_deref();
        }
        None
    }

    pub fn ty(&self, proto: &TypeProto) -> KType {
        let Some(capabilities_id) = proto.flexible_type_capabilities_id else {
            return self.simple_type(proto);
        };
        let capabilities = self
            .context
            .resolver
            .get_string(capabilities_id)
            .ok()
            .and_then(|id| self.context.capabilities.get(id));
        let Some(capabilities) = capabilities else {
            return KType::error(format!("unknown flexible type capabilities #{capabilities_id}"));
        };
        let Some(upper) = &proto.flexible_upper_bound else {
            return KType::error("flexible type without an upper bound");
        };
        KType::flexible(self.simple_type(proto), self.ty(upper), capabilities)
    }

    fn simple_type(&self, proto: &TypeProto) -> KType {
        match self.type_constructor(proto) {
            TypeConstructor::Class(class) => {
                let arguments = self.type_arguments(&proto.arguments);
                KType::class(&class, arguments, proto.nullable)
            }
            TypeConstructor::TypeParameter(parameter) => KType::type_parameter(&parameter, proto.nullable),
            TypeConstructor::Unresolved(description) => KType::error(description),
        }
    }

    pub fn type_constructor(&self, proto: &TypeProto) -> TypeConstructor {
        match proto.constructor {
            TypeConstructorProto::Class(index) => match self.class_descriptors.invoke(&index) {
                Some(class) => TypeConstructor::Class(class),
                None => {
                    let name = self
                        .context
                        .resolver
                        .get_fq_name(index)
                        .map(|name| name.to_string())
                        .unwrap_or_else(|_| format!("#{index}"));
                    trace!(scope = %self.debug_name, class = %name, "unresolved class");
                    TypeConstructor::Unresolved(format!("Unresolved class {name}"))
                }
            },
            TypeConstructorProto::TypeParameter(id) => match self.type_parameter(id) {
                Some(parameter) => TypeConstructor::TypeParameter(parameter),
                None => {
                    trace!(scope = %self.debug_name, id, "unresolved type parameter");
                    TypeConstructor::Unresolved(format!("Unknown type parameter {id}"))
                }
            },
        }
    }

    pub fn type_arguments(&self, protos: &[TypeArgumentProto]) -> Vec<TypeProjection> {
        protos
            .iter()
            .map(|argument| match (&argument.ty, argument.projection) {
                (None, _) | (_, ProjectionProto::Star) => TypeProjection::Star,
                (Some(ty), projection) => TypeProjection::Type {
                    projection: match projection {
                        ProjectionProto::In => Variance::In,
                        ProjectionProto::Out => Variance::Out,
                        _ => Variance::Invariant,
                    },
                    ty: self.ty(ty),
                },
            })
            .collect()
    }
}

impl fmt::Debug for TypeDeserializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = vec![self.debug_name.as_str()];
        let mut parent = self.parent.as_deref();
        while let Some(scope) = parent {
            names.push(scope.debug_name.as_str());
            parent = scope.parent.as_deref();
        }
        write!(f, "TypeDeserializer({})", names.join(" <- "))
    }
}

fn variance(proto: VarianceProto) -> Variance {
    match proto {
        VarianceProto::Invariant => Variance::Invariant,
        VarianceProto::In => Variance::In,
        VarianceProto::Out => Variance::Out,
    }
}

#[cfg(test)]
#[path = "../tests/type_deserializer_tests.rs"]
mod type_deserializer_tests;
