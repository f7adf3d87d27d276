//! Imports, properties and functions.

use super::ScriptAnalyzer;
use crate::context::{ExpectedType, ExpressionPosition, ResolutionContext};
use crate::data_flow::DataFlowInfo;
use crate::scope::{LexicalScope, ScopeKind};
use crate::trace::BindingTrace;
use kite_common::{LazyValue, diagnostic_codes};
use kite_syntax::{NodeArena, NodeIndex, NodeKind};
use kite_types::{
    ContainingDeclaration, DeclarationDescriptor, DescriptorId, FqName, FunctionDescriptor, KType, LocalVariableDescriptor,
    Modality, Name, PropertyAccessorDescriptor, PropertyDescriptor, TypeParameterDescriptor,
    ValueParameterDescriptor, Variance, Visibility,
};
use once_cell::sync::OnceCell;
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

/// A function whose signature is known, with the scope its body sees.
#[derive(Debug)]
pub(super) struct DeclaredFunction {
    pub node: NodeIndex,
    pub descriptor: Arc<FunctionDescriptor>,
    pub body_scope: Rc<LexicalScope>,
}

/// Whether the function's return type is known without looking at its
/// body: written out, or `Unit` for a block body.
pub(super) fn has_known_return_type(arena: &NodeArena, node: NodeIndex) -> bool {
    matches!(
        arena.kind(node),
        NodeKind::Function { return_type, expression_body, .. } if return_type.is_some() || !*expression_body
    )
}

impl ScriptAnalyzer<'_> {
    /// Bring import directives into a new importing scope over `parent`.
    pub(super) fn imports(
        &self,
        imports: &[NodeIndex],
        parent: &Rc<LexicalScope>,
        trace: &BindingTrace,
    ) -> Rc<LexicalScope> {
        if imports.is_empty() {
            return Rc::clone(parent);
        }
        let scope = LexicalScope::new(parent, ScopeKind::Importing, format!("imports of {}", self.file_name));
        for &import in imports {
            let NodeKind::Import { path, all_under } = self.arena.kind(import) else {
                continue;
            };
            let found = if *all_under {
                let package = FqName::from_segments(path.iter().map(String::as_str));
                match self.env.finder.find_package_members(&package) {
                    Some(fragment) if !package.is_root() => {
                        scope.import_all(&fragment.scope);
                        true
                    }
                    _ => false,
                }
            } else {
                match path.split_last() {
                    Some((name, package)) => {
                        let package = FqName::from_segments(package.iter().map(String::as_str));
                        self.env
                            .finder
                            .find_package_members(&package)
                            .is_some_and(|fragment| scope.import_named(&fragment.scope, &Name::identifier(name)))
                    }
                    None => false,
                }
            };
            if found {
                debug!(import = %path.join("."), all_under, "import");
            } else {
                self.report_at(trace, import, diagnostic_codes::UNRESOLVED_IMPORT, &[&path.join(".")]);
            }
        }
        scope
    }

    /// Declare a top-level property, analyzing its initializer first.
    pub(super) fn script_property(
        &self,
        node: NodeIndex,
        context: &Rc<ResolutionContext>,
    ) -> Option<Arc<PropertyDescriptor>> {
        let NodeKind::Property {
            is_private,
            is_var,
            name,
            name_span,
            ty,
            initializer,
        } = self.arena.kind(node)
        else {
            return None;
        };
        let ty = self.variable_type(*ty, *initializer, context);
        let visibility = if *is_private { Visibility::Private } else { Visibility::Public };
        let setter = is_var.then(|| PropertyAccessorDescriptor {
            is_getter: false,
            is_default: true,
            visibility,
            value_parameter: Some(ValueParameterDescriptor {
                name: Name::special("<set-?>"),
                index: 0,
                ty: ty.clone(),
                declares_default_value: false,
            }),
        });
        let property = Arc::new(PropertyDescriptor {
            id: DescriptorId::fresh(),
            name: Name::identifier(name),
            containing: self.containing(),
            visibility,
            modality: Modality::Final,
            is_var: *is_var,
            is_const: false,
            type_parameters: Vec::new(),
            extension_receiver: None,
            dispatch_receiver: self.dispatch_receiver(),
            ty,
            getter: Some(PropertyAccessorDescriptor {
                is_getter: true,
                is_default: true,
                visibility,
                value_parameter: None,
            }),
            setter,
            compile_time_constant: None,
        });
        if context.scope.add_property(Arc::clone(&property)).is_err() {
            self.report(&context.trace, *name_span, diagnostic_codes::REDECLARATION, &[name]);
        }
        context
            .trace
            .record_declaration(node, DeclarationDescriptor::Property(Arc::clone(&property)));
        debug!(property = %property.name, ty = %property.ty, "declared property");
        Some(property)
    }

    /// Declare a local `val`/`var` in the context's (block) scope.
    pub(super) fn local_variable(&self, node: NodeIndex, context: &Rc<ResolutionContext>) {
        let NodeKind::Property {
            is_var,
            name,
            name_span,
            ty,
            initializer,
            ..
        } = self.arena.kind(node)
        else {
            return;
        };
        let ty = self.variable_type(*ty, *initializer, context);
        let variable = Arc::new(LocalVariableDescriptor {
            id: DescriptorId::fresh(),
            name: Name::identifier(name),
            ty,
            is_var: *is_var,
        });
        if context.scope.add_variable(Arc::clone(&variable)).is_err() {
            self.report(&context.trace, *name_span, diagnostic_codes::REDECLARATION, &[name]);
        }
        context
            .trace
            .record_declaration(node, DeclarationDescriptor::Variable(variable));
    }

    /// The declared type, or the initializer's type when none is written.
    fn variable_type(&self, ty: NodeIndex, initializer: NodeIndex, context: &Rc<ResolutionContext>) -> KType {
        let declared = ty
            .is_some()
            .then(|| self.types.resolve(&context.scope, &context.trace, ty));
        let initialized = initializer.is_some().then(|| {
            let initializer_context = context
                .replace_expected_type(ExpectedType::from(declared.clone()))
                .replace_position(ExpressionPosition::Free);
            self.expression(initializer, &initializer_context)
        });
        match (declared, initialized) {
            (Some(declared), _) => declared,
            (None, Some(initialized)) => initialized,
            (None, None) => KType::error("property without type or initializer"),
        }
    }

    /// Declare a function in the context's scope.
    ///
    /// An expression body without a written return type is analyzed here
    /// to infer the type; any other body is left to
    /// [`ScriptAnalyzer::function_body`].
    pub(super) fn declare_function(
        &self,
        node: NodeIndex,
        context: &Rc<ResolutionContext>,
    ) -> Option<DeclaredFunction> {
        let NodeKind::Function {
            is_private,
            name,
            name_span,
            type_parameters,
            parameters,
            return_type,
            body,
            expression_body,
        } = self.arena.kind(node)
        else {
            return None;
        };
        let trace = &context.trace;
        let id = DescriptorId::fresh();
        let function_name = Name::identifier(name);

        let header_scope = LexicalScope::new(&context.scope, ScopeKind::Block, format!("header of {name}"));
        let mut declared_type_parameters = Vec::with_capacity(type_parameters.len());
        let mut bounds = Vec::with_capacity(type_parameters.len());
        for (index, &parameter_node) in type_parameters.iter().enumerate() {
            let NodeKind::TypeParameter { name, bound } = self.arena.kind(parameter_node) else {
                continue;
            };
            let cell: Arc<OnceCell<Vec<KType>>> = Arc::default();
            let reader = Arc::clone(&cell);
            let parameter = Arc::new(TypeParameterDescriptor::new(
                Name::identifier(name),
                index as u32,
                Variance::Invariant,
                false,
                ContainingDeclaration::Callable(id),
                LazyValue::new(move || reader.get().cloned().unwrap_or_default()),
            ));
            if header_scope.add_type_parameter(Arc::clone(&parameter)).is_err() {
                self.report_at(trace, parameter_node, diagnostic_codes::REDECLARATION, &[name]);
            }
            trace.record_declaration(parameter_node, DeclarationDescriptor::TypeParameter(Arc::clone(&parameter)));
            declared_type_parameters.push(parameter);
            bounds.push((cell, *bound));
        }
        // Bounds may mention any of the function's type parameters.
        for (cell, bound) in bounds {
            let resolved = if bound.is_some() {
                vec![self.types.resolve_bound(&header_scope, trace, bound)]
            } else {
                Vec::new()
            };
            let _ = cell.set(resolved);
        }

        let declared_return = if return_type.is_some() {
            Some(self.types.resolve(&header_scope, trace, *return_type))
        } else if !*expression_body {
            Some(self.env.builtins.unit_type())
        } else {
            None
        };
        let body_scope = LexicalScope::new(
            &header_scope,
            ScopeKind::Function {
                name: function_name.clone(),
                return_type: declared_return.clone(),
            },
            format!("fun {name}"),
        );
        let mut value_parameters = Vec::with_capacity(parameters.len());
        for (index, &parameter_node) in parameters.iter().enumerate() {
            let NodeKind::Parameter { name, ty } = self.arena.kind(parameter_node) else {
                continue;
            };
            let ty = self.types.resolve(&header_scope, trace, *ty);
            let variable = Arc::new(LocalVariableDescriptor {
                id: DescriptorId::fresh(),
                name: Name::identifier(name),
                ty: ty.clone(),
                is_var: false,
            });
            if body_scope.add_variable(Arc::clone(&variable)).is_err() {
                self.report_at(trace, parameter_node, diagnostic_codes::REDECLARATION, &[name]);
            }
            trace.record_declaration(parameter_node, DeclarationDescriptor::Variable(variable));
            value_parameters.push(ValueParameterDescriptor {
                name: Name::identifier(name),
                index: index as u32,
                ty,
                declares_default_value: false,
            });
        }

        let return_type = match declared_return {
            Some(ty) => ty,
            None => {
                let body_context = context
                    .replace_scope(&body_scope)
                    .replace_data_flow_info(&DataFlowInfo::empty())
                    .replace_expected_type(ExpectedType::NoExpectedType)
                    .replace_position(ExpressionPosition::Free);
                self.expression(*body, &body_context)
            }
        };

        let descriptor = Arc::new(FunctionDescriptor {
            id,
            name: function_name,
            containing: self.containing(),
            visibility: if *is_private { Visibility::Private } else { Visibility::Public },
            modality: Modality::Final,
            type_parameters: declared_type_parameters,
            extension_receiver: None,
            dispatch_receiver: self.dispatch_receiver(),
            value_parameters,
            return_type,
            is_operator: false,
        });
        if context.scope.add_function(Arc::clone(&descriptor)).is_err() {
            self.report(trace, *name_span, diagnostic_codes::REDECLARATION, &[name]);
        }
        trace.record_declaration(node, DeclarationDescriptor::Function(Arc::clone(&descriptor)));
        debug!(function = %descriptor.name, return_type = %descriptor.return_type, "declared function");
        Some(DeclaredFunction {
            node,
            descriptor,
            body_scope,
        })
    }

    /// Analyze the body of a function declared with a known return type.
    pub(super) fn function_body(&self, declared: &DeclaredFunction, context: &Rc<ResolutionContext>) {
        let NodeKind::Function {
            body, expression_body, ..
        } = self.arena.kind(declared.node)
        else {
            return;
        };
        if body.is_none() {
            return;
        }
        let body_context = context
            .replace_scope(&declared.body_scope)
            .replace_data_flow_info(&DataFlowInfo::empty());
        if *expression_body {
            let expected = ExpectedType::Type(declared.descriptor.return_type.clone());
            self.expression(
                *body,
                &body_context
                    .replace_expected_type(expected)
                    .replace_position(ExpressionPosition::Free),
            );
        } else {
            self.expression(
                *body,
                &body_context
                    .replace_expected_type(ExpectedType::NoExpectedType)
                    .replace_position(ExpressionPosition::Statement),
            );
        }
    }
}
