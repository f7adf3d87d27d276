//! Reconstructing functions, properties and constructors from callable protos.

use crate::context::DeserializationContext;
use crate::error::{MetadataError, MetadataResult};
use crate::flags::{AccessorFlags, CallableFlags, CallableKind};
use crate::proto::{CallableProto, ConstantProto, TypeProto, ValueParameterProto};
use crate::type_deserializer::TypeDeserializer;
use kite_common::LazyValue;
use kite_types::{
    ClassId, ConstantValue, ConstructorDescriptor, ContainingDeclaration, DescriptorId,
    FunctionDescriptor, Name, PropertyAccessorDescriptor, PropertyDescriptor,
    ValueParameterDescriptor,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// A deserialized callable member.
#[derive(Debug, Clone)]
pub enum CallableDescriptor {
    Function(Arc<FunctionDescriptor>),
    Property(Arc<PropertyDescriptor>),
    Constructor(Arc<ConstructorDescriptor>),
}

/// Builds the members of one class or package.
#[derive(Debug, Clone)]
pub struct MemberDeserializer {
    type_deserializer: Arc<TypeDeserializer>,
    containing: ContainingDeclaration,
    /// Set for class members; package members are static.
    dispatch_receiver: Option<ClassId>,
}

impl MemberDeserializer {
    pub fn new(type_deserializer: Arc<TypeDeserializer>, containing: ContainingDeclaration) -> Self {
        let dispatch_receiver = match &containing {
            ContainingDeclaration::Class(class_id) => Some(class_id.clone()),
            _ => None,
        };
        MemberDeserializer {
            type_deserializer,
            containing,
            dispatch_receiver,
        }
    }

    fn context(&self) -> &Arc<DeserializationContext> {
        self.type_deserializer.context()
    }

    /// Load any callable, dispatching on its kind.
    ///
    /// An unknown kind means the module is corrupt and fails the load.
    pub fn load_callable(&self, proto: &CallableProto) -> MetadataResult<CallableDescriptor> {
        match proto.flags.kind() {
            Some(CallableKind::Fun) => self.load_function(proto).map(CallableDescriptor::Function),
            Some(CallableKind::Val | CallableKind::Var) => {
                self.load_property(proto).map(CallableDescriptor::Property)
            }
            Some(CallableKind::Constructor) => {
                self.load_constructor(proto).map(CallableDescriptor::Constructor)
            }
            None => Err(MetadataError::UnknownCallableKind {
                kind: proto.flags.kind_code(),
                name: self.context().resolver.get_string(proto.name)?.to_string(),
            }),
        }
    }

    pub fn load_function(&self, proto: &CallableProto) -> MetadataResult<Arc<FunctionDescriptor>> {
        let id = DescriptorId::fresh();
        let name = self.context().resolver.get_name(proto.name)?;
        let scope = self.type_deserializer.child(format!("fun {name}"));
        let type_parameters =
            scope.register_type_parameters(&proto.type_parameters, ContainingDeclaration::Callable(id));

        let extension_receiver = proto.receiver_type.as_ref().map(|ty| scope.ty(ty));
        let value_parameters = self.value_parameters(&scope, &proto.value_parameters)?;
        let return_type = scope.ty(required_type(proto)?);

        debug!(function = %name, parameters = value_parameters.len(), "loaded function");
        Ok(Arc::new(FunctionDescriptor {
            id,
            name,
            containing: self.containing.clone(),
            visibility: proto.flags.visibility(),
            modality: proto.flags.modality(),
            type_parameters,
            extension_receiver,
            dispatch_receiver: self.dispatch_receiver.clone(),
            value_parameters,
            return_type,
            is_operator: proto.flags.contains(CallableFlags::IS_OPERATOR),
        }))
    }

    /// Load a property with its accessors and, when flagged, a lazily
    /// evaluated compile-time constant.
    ///
    /// The property's own pieces (type parameters, receiver, type) are
    /// resolved before the accessors, which are built from them.
    pub fn load_property(&self, proto: &CallableProto) -> MetadataResult<Arc<PropertyDescriptor>> {
        let id = DescriptorId::fresh();
        let name = self.context().resolver.get_name(proto.name)?;
        let is_var = proto.flags.kind() == Some(CallableKind::Var);
        let scope = self.type_deserializer.child(format!("val {name}"));
        let type_parameters =
            scope.register_type_parameters(&proto.type_parameters, ContainingDeclaration::Callable(id));
        let extension_receiver = proto.receiver_type.as_ref().map(|ty| scope.ty(ty));
        let ty = scope.ty(required_type(proto)?);

        let getter = proto
            .flags
            .contains(CallableFlags::HAS_GETTER)
            .then(|| accessor(proto.getter_flags, true, None));
        let setter = if proto.flags.contains(CallableFlags::HAS_SETTER) {
            let parameter = match (&proto.setter_parameter, proto.setter_flags.is_not_default()) {
                (Some(parameter), true) => self.value_parameter(&scope, 0, parameter)?,
                _ => ValueParameterDescriptor {
                    name: Name::special("<set-?>"),
                    index: 0,
                    ty: ty.clone(),
                    declares_default_value: false,
                },
            };
            Some(accessor(proto.setter_flags, false, Some(parameter)))
        } else {
            None
        };

        let compile_time_constant = match (&proto.constant, proto.flags.contains(CallableFlags::HAS_CONSTANT)) {
            (Some(constant), true) => Some(self.lazy_constant(constant.clone(), name.clone())),
            _ => None,
        };

        debug!(property = %name, is_var, "loaded property");
        Ok(Arc::new(PropertyDescriptor {
            id,
            name,
            containing: self.containing.clone(),
            visibility: proto.flags.visibility(),
            modality: proto.flags.modality(),
            is_var,
            is_const: proto.flags.contains(CallableFlags::IS_CONST),
            type_parameters,
            extension_receiver,
            dispatch_receiver: self.dispatch_receiver.clone(),
            ty,
            getter,
            setter,
            compile_time_constant,
        }))
    }

    pub fn load_constructor(&self, proto: &CallableProto) -> MetadataResult<Arc<ConstructorDescriptor>> {
        let Some(class_id) = self.dispatch_receiver.clone() else {
            return Err(MetadataError::MissingField {
                record: "Constructor",
                field: "containing class",
            });
        };
        let scope = self.type_deserializer.child(format!("constructor {class_id}"));
        let value_parameters = self.value_parameters(&scope, &proto.value_parameters)?;
        Ok(Arc::new(ConstructorDescriptor {
            id: DescriptorId::fresh(),
            containing_class: class_id,
            visibility: proto.flags.visibility(),
            is_primary: proto.flags.contains(CallableFlags::IS_PRIMARY),
            value_parameters,
        }))
    }

    fn value_parameters(
        &self,
        scope: &TypeDeserializer,
        protos: &[ValueParameterProto],
    ) -> MetadataResult<Vec<ValueParameterDescriptor>> {
        protos
            .iter()
            .enumerate()
            .map(|(index, proto)| self.value_parameter(scope, index as u32, proto))
            .collect()
    }

    fn value_parameter(
        &self,
        scope: &TypeDeserializer,
        index: u32,
        proto: &ValueParameterProto,
    ) -> MetadataResult<ValueParameterDescriptor> {
        Ok(ValueParameterDescriptor {
            name: self.context().resolver.get_name(proto.name)?,
            index,
            ty: scope.ty(&proto.ty),
            declares_default_value: proto.declares_default,
        })
    }

    fn lazy_constant(&self, constant: ConstantProto, property: Name) -> LazyValue<Option<ConstantValue>> {
        let resolver = Arc::clone(&self.context().resolver);
        LazyValue::new(move || match &constant {
            ConstantProto::Int(value) => Some(ConstantValue::Int(*value)),
            ConstantProto::Boolean(value) => Some(ConstantValue::Boolean(*value)),
            ConstantProto::Null => Some(ConstantValue::Null),
            ConstantProto::String(index) => match resolver.get_string(*index) {
                Ok(text) => Some(ConstantValue::String(Arc::from(text))),
                Err(err) => {
                    warn!(%property, %err, "bad constant string");
                    None
                }
            },
        })
    }
}

fn required_type(proto: &CallableProto) -> MetadataResult<&TypeProto> {
    proto.return_type.as_ref().ok_or(MetadataError::MissingField {
        record: "Callable",
        field: "return_type",
    })
}

fn accessor(
    flags: AccessorFlags,
    is_getter: bool,
    value_parameter: Option<ValueParameterDescriptor>,
) -> PropertyAccessorDescriptor {
    PropertyAccessorDescriptor {
        is_getter,
        is_default: !flags.is_not_default(),
        visibility: flags.visibility(),
        value_parameter,
    }
}

#[cfg(test)]
#[path = "../tests/member_deserializer_tests.rs"]
mod member_deserializer_tests;
