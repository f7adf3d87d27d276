// =============================================================================
// Calls and property access
// =============================================================================

use super::method::{MethodGenerator, Pushed};
use crate::error::{CodegenError, CodegenResult};
use crate::types::{
    INTRINSICS_CLASS, accessor_name, constructor_descriptor, function_descriptor, getter_descriptor, internal_name,
    setter_descriptor, stored_desc,
};
use kite_bytecode::{CONSTRUCTOR_NAME, FieldRef, Instruction, MethodDescriptor, MethodRef, TypeDesc};
use kite_resolve::{Callee, ReceiverValue, ResolvedCall};
use kite_syntax::NodeIndex;
use kite_types::{ClassId, ConstantValue, ContainingDeclaration, FunctionDescriptor, PropertyDescriptor, standard_class_ids};

/// Where the value of a property lives.
enum PropertyAccess {
    /// A field of this REPL line or an earlier one.
    LineField(ClassId),
    /// A static field of the facade being generated.
    OwnStaticField,
    /// `get<Name>`/`set<Name>` of another class: static for top-level
    /// properties.
    Accessors { owner: ClassId, is_static: bool },
}

/// `Int` operators compiled to single instructions.
fn int_operator(function: &FunctionDescriptor) -> Option<Instruction> {
    if function.containing != ContainingDeclaration::Class(standard_class_ids::int()) {
        return None;
    }
    if !function.value_parameters.iter().all(|parameter| parameter.ty.is_int()) {
        return None;
    }
    Some(match (function.name.as_str(), function.value_parameters.len()) {
        ("plus", 1) => Instruction::IAdd,
        ("minus", 1) => Instruction::ISub,
        ("times", 1) => Instruction::IMul,
        ("div", 1) => Instruction::IDiv,
        ("rem", 1) => Instruction::IRem,
        ("unaryMinus", 0) => Instruction::INeg,
        _ => return None,
    })
}

fn push_constant(generator: &mut MethodGenerator<'_>, constant: &ConstantValue) -> TypeDesc {
    match constant {
        ConstantValue::Int(value) => {
            generator.emit(Instruction::IConst(*value));
            TypeDesc::Int
        }
        ConstantValue::Boolean(value) => {
            generator.emit(Instruction::BConst(*value));
            TypeDesc::Boolean
        }
        ConstantValue::String(value) => {
            generator.emit(Instruction::Ldc(value.clone()));
            TypeDesc::object("kite/String")
        }
        ConstantValue::Null => {
            generator.emit(Instruction::AConstNull);
            TypeDesc::object("kite/Nothing")
        }
    }
}

impl MethodGenerator<'_> {
    pub(super) fn is_int_comparison(resolved: &ResolvedCall) -> bool {
        match &resolved.callee {
            Callee::Function(function) => {
                function.name.as_str() == "compareTo"
                    && function.containing == ContainingDeclaration::Class(standard_class_ids::int())
                    && function.value_parameters.iter().all(|parameter| parameter.ty.is_int())
            }
            _ => false,
        }
    }

    /// A call, an operator or an `Int` comparison used as a value.
    pub(super) fn call(&mut self, node: NodeIndex) -> CodegenResult<Pushed> {
        let resolved = self.resolved_call(node)?;
        self.invoke_resolved(&resolved)
    }

    pub(super) fn invoke_resolved(&mut self, resolved: &ResolvedCall) -> CodegenResult<Pushed> {
        match &resolved.callee {
            Callee::Function(function) => {
                if let Some(instruction) = int_operator(function) {
                    self.dispatch_receiver_as(resolved, Some(&TypeDesc::Int))?;
                    self.arguments(resolved, &vec![TypeDesc::Int; function.value_parameters.len()])?;
                    self.emit(instruction);
                    return Ok(Some(TypeDesc::Int));
                }
                if Self::is_int_comparison(resolved) {
                    self.dispatch_receiver_as(resolved, Some(&TypeDesc::Int))?;
                    self.arguments(resolved, &[TypeDesc::Int])?;
                    self.emit(Instruction::InvokeStatic(MethodRef::new(
                        INTRINSICS_CLASS,
                        "compare",
                        MethodDescriptor::new(vec![TypeDesc::Int, TypeDesc::Int], TypeDesc::Int),
                    )));
                    return Ok(Some(TypeDesc::Int));
                }
                self.invoke_function(resolved, function)
            }
            Callee::Constructor { constructor, class } => {
                let class_name = internal_name(&class.class_id);
                let descriptor = constructor_descriptor(&constructor.value_parameters);
                self.emit(Instruction::New(class_name.as_str().into()));
                self.emit(Instruction::Dup);
                self.arguments(resolved, &descriptor.parameters)?;
                self.emit(Instruction::InvokeSpecial(MethodRef::new(
                    &class_name,
                    CONSTRUCTOR_NAME,
                    descriptor,
                )));
                Ok(Some(TypeDesc::object(&class_name)))
            }
            Callee::Property(property) => self.read_property(resolved, property),
        }
    }

    fn invoke_function(&mut self, resolved: &ResolvedCall, function: &FunctionDescriptor) -> CodegenResult<Pushed> {
        let Some(owner) = function.containing.owner_class() else {
            return Err(CodegenError::Unsupported {
                what: format!("call of local function {}", function.name),
            });
        };
        let owner_name = internal_name(owner);
        let descriptor = function_descriptor(function);
        let returns = descriptor.returns.clone();
        let is_static = function.containing.is_package();

        if is_static {
            let mut parameters = descriptor.parameters.iter();
            if function.extension_receiver.is_some() {
                let receiver = parameters.next().cloned();
                self.extension_receiver_as(resolved, receiver.as_ref())?;
            }
            let rest: Vec<TypeDesc> = parameters.cloned().collect();
            self.arguments(resolved, &rest)?;
        } else {
            self.dispatch_receiver(resolved, owner)?;
            self.arguments(resolved, &descriptor.parameters)?;
        }

        let method = MethodRef::new(&owner_name, function.name.as_str(), descriptor);
        let is_private = function.visibility == kite_types::Visibility::Private;
        self.emit(if is_static {
            Instruction::InvokeStatic(method)
        } else if is_private && self.class.is_line_class(owner) {
            Instruction::InvokeSpecial(method)
        } else {
            Instruction::InvokeVirtual(method)
        });

        if function.return_type.is_nothing() && !function.return_type.is_marked_nullable() {
            self.throw_illegal_state(&format!("{} returned normally", function.name));
            return Ok(None);
        }
        Ok((!returns.is_void()).then_some(returns))
    }

    /// Push the arguments of `resolved`, converted to `parameters`.
    fn arguments(&mut self, resolved: &ResolvedCall, parameters: &[TypeDesc]) -> CodegenResult<()> {
        for (index, argument) in resolved.value_arguments.iter().enumerate() {
            let Some(argument) = argument else {
                return Err(CodegenError::Unsupported {
                    what: format!("default value of argument {} of {}", index + 1, resolved.callee.name()),
                });
            };
            self.expression_as(*argument, parameters.get(index))?;
        }
        Ok(())
    }

    /// Push the object a member of `owner` is called on.
    fn dispatch_receiver(&mut self, resolved: &ResolvedCall, owner: &ClassId) -> CodegenResult<()> {
        match &resolved.dispatch_receiver {
            Some(ReceiverValue::Expression { node, .. }) => {
                self.expression(*node)?;
                Ok(())
            }
            Some(ReceiverValue::Implicit(receiver)) => self.load_line_instance(&receiver.class.class_id),
            None => self.load_line_instance(owner),
        }
    }

    fn dispatch_receiver_as(&mut self, resolved: &ResolvedCall, target: Option<&TypeDesc>) -> CodegenResult<()> {
        match &resolved.dispatch_receiver {
            Some(ReceiverValue::Expression { node, .. }) => self.expression_as(*node, target),
            _ => Err(CodegenError::MissingBinding {
                node: resolved.call_node.0,
                what: "operator receiver",
            }),
        }
    }

    fn extension_receiver_as(&mut self, resolved: &ResolvedCall, target: Option<&TypeDesc>) -> CodegenResult<()> {
        match &resolved.extension_receiver {
            Some(ReceiverValue::Expression { node, .. }) => self.expression_as(*node, target),
            Some(ReceiverValue::Implicit(receiver)) => self.load_line_instance(&receiver.class.class_id),
            None => Err(CodegenError::MissingBinding {
                node: resolved.call_node.0,
                what: "extension receiver",
            }),
        }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    fn property_access(&self, property: &PropertyDescriptor) -> CodegenResult<PropertyAccess> {
        let owner = property.containing.owner_class().ok_or_else(|| CodegenError::Unsupported {
            what: format!("property {} without an owner", property.name),
        })?;
        Ok(match &property.containing {
            ContainingDeclaration::Class(_) if self.class.is_line_class(owner) => PropertyAccess::LineField(owner.clone()),
            ContainingDeclaration::Package { .. } if !self.class.is_repl && *owner == self.class.class_id => {
                PropertyAccess::OwnStaticField
            }
            containing => PropertyAccess::Accessors {
                owner: owner.clone(),
                is_static: containing.is_package(),
            },
        })
    }

    /// Read the property a name or `receiver.name` node refers to.
    pub(super) fn property_get(&mut self, node: NodeIndex) -> CodegenResult<Pushed> {
        let resolved = self.resolved_call(node)?;
        match &resolved.callee {
            Callee::Property(property) => self.read_property(&resolved, property),
            _ => Err(CodegenError::MissingBinding {
                node: node.0,
                what: "property",
            }),
        }
    }

    fn read_property(&mut self, resolved: &ResolvedCall, property: &PropertyDescriptor) -> CodegenResult<Pushed> {
        if let Some(constant) = property.constant() {
            return Ok(Some(push_constant(self, constant)));
        }
        let desc = stored_desc(&property.ty);
        match self.property_access(property)? {
            PropertyAccess::LineField(owner) => {
                self.dispatch_receiver(resolved, &owner)?;
                self.emit(Instruction::GetField(FieldRef::new(
                    &internal_name(&owner),
                    property.name.as_str(),
                    desc.clone(),
                )));
            }
            PropertyAccess::OwnStaticField => {
                self.emit(Instruction::GetStatic(FieldRef::new(
                    &self.class.internal_name,
                    property.name.as_str(),
                    desc.clone(),
                )));
            }
            PropertyAccess::Accessors { owner, is_static } => {
                let getter = MethodRef::new(
                    &internal_name(&owner),
                    &accessor_name("get", property.name.as_str()),
                    getter_descriptor(property),
                );
                if is_static {
                    if property.extension_receiver.is_some() {
                        let receiver = getter.descriptor.parameters.first().cloned();
                        self.extension_receiver_as(resolved, receiver.as_ref())?;
                    }
                    self.emit(Instruction::InvokeStatic(getter));
                } else {
                    self.dispatch_receiver(resolved, &owner)?;
                    self.emit(Instruction::InvokeVirtual(getter));
                }
            }
        }
        Ok(Some(desc))
    }

    /// `target = value` for a property `target`.
    pub(super) fn property_set(&mut self, target: NodeIndex, value: NodeIndex) -> CodegenResult<()> {
        let resolved = self.resolved_call(target)?;
        let Callee::Property(property) = &resolved.callee else {
            return Err(CodegenError::MissingBinding {
                node: target.0,
                what: "assigned property",
            });
        };
        let desc = stored_desc(&property.ty);
        match self.property_access(property)? {
            PropertyAccess::LineField(owner) => {
                self.dispatch_receiver(&resolved, &owner)?;
                self.expression_as(value, Some(&desc))?;
                self.emit(Instruction::PutField(FieldRef::new(
                    &internal_name(&owner),
                    property.name.as_str(),
                    desc,
                )));
            }
            PropertyAccess::OwnStaticField => {
                self.expression_as(value, Some(&desc))?;
                self.emit(Instruction::PutStatic(FieldRef::new(
                    &self.class.internal_name,
                    property.name.as_str(),
                    desc,
                )));
            }
            PropertyAccess::Accessors { owner, is_static } => {
                let setter = MethodRef::new(
                    &internal_name(&owner),
                    &accessor_name("set", property.name.as_str()),
                    setter_descriptor(property),
                );
                if is_static {
                    if property.extension_receiver.is_some() {
                        let receiver = setter.descriptor.parameters.first().cloned();
                        self.extension_receiver_as(&resolved, receiver.as_ref())?;
                    }
                    self.expression_as(value, Some(&desc))?;
                    self.emit(Instruction::InvokeStatic(setter));
                } else {
                    self.dispatch_receiver(&resolved, &owner)?;
                    self.expression_as(value, Some(&desc))?;
                    self.emit(Instruction::InvokeVirtual(setter));
                }
            }
        }
        Ok(())
    }
}
