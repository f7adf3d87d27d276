//! Turning written types into [`KType`]s.

use crate::scope::LexicalScope;
use crate::trace::BindingTrace;
use kite_common::{Diagnostic, diagnostic_codes};
use kite_metadata::DescriptorFinder;
use kite_syntax::{NodeArena, NodeIndex, NodeKind};
use kite_types::{
    ClassDescriptor, DeclarationDescriptor, FqName, KType, Name, TypeProjection, TypeSubstitutor, is_subtype_of,
};
use std::rc::Rc;
use std::sync::Arc;

pub struct TypeResolver<'a> {
    arena: &'a NodeArena,
    finder: &'a DescriptorFinder,
    file_name: &'a str,
}

impl<'a> TypeResolver<'a> {
    pub fn new(arena: &'a NodeArena, finder: &'a DescriptorFinder, file_name: &'a str) -> Self {
        TypeResolver {
            arena,
            finder,
            file_name,
        }
    }

    fn report(&self, trace: &BindingTrace, node: NodeIndex, code: u32, args: &[&str]) {
        let span = self.arena.span(node);
        trace.report(Diagnostic::from_code(self.file_name, span.start, span.len(), code, args));
    }

    /// Resolve a type reference. Unresolvable types are reported and come
    /// back as error types.
    pub fn resolve(&self, scope: &Rc<LexicalScope>, trace: &BindingTrace, node: NodeIndex) -> KType {
        self.resolve_with(scope, trace, node, true)
    }

    /// Resolve a type-parameter bound. Bounds are not checked against
    /// other bounds while the parameters they mention are being declared.
    pub fn resolve_bound(&self, scope: &Rc<LexicalScope>, trace: &BindingTrace, node: NodeIndex) -> KType {
        self.resolve_with(scope, trace, node, false)
    }

    fn resolve_with(&self, scope: &Rc<LexicalScope>, trace: &BindingTrace, node: NodeIndex, check_bounds: bool) -> KType {
        let NodeKind::TypeReference {
            qualifier,
            name,
            arguments,
            nullable,
        } = self.arena.kind(node)
        else {
            return KType::error("missing type");
        };
        let short_name = Name::identifier(name);

        if qualifier.is_empty() {
            if let Some(parameter) = scope.find_type_parameter(&short_name) {
                trace.record_reference(node, DeclarationDescriptor::TypeParameter(Arc::clone(&parameter)));
                if !arguments.is_empty() {
                    self.report(trace, node, diagnostic_codes::WRONG_NUMBER_OF_TYPE_ARGUMENTS, &["0", name]);
                }
                return KType::type_parameter(&parameter, *nullable);
            }
        }

        let class = if qualifier.is_empty() {
            scope.find_class(&short_name)
        } else {
            let package = FqName::from_segments(qualifier.iter().map(String::as_str));
            self.finder
                .find_package_members(&package)
                .and_then(|fragment| fragment.scope.classifier(&short_name).cloned())
        };
        let Some(class) = class else {
            let written = if qualifier.is_empty() {
                name.clone()
            } else {
                format!("{}.{name}", qualifier.join("."))
            };
            self.report(trace, node, diagnostic_codes::UNRESOLVED_REFERENCE, &[&written]);
            return KType::error(format!("Unresolved type {written}"));
        };
        trace.record_reference(node, DeclarationDescriptor::Class(Arc::clone(&class)));

        let resolved: Vec<KType> = arguments
            .iter()
            .map(|argument| self.resolve_with(scope, trace, *argument, check_bounds))
            .collect();
        if resolved.len() != class.type_parameters.len() {
            self.report(
                trace,
                node,
                diagnostic_codes::WRONG_NUMBER_OF_TYPE_ARGUMENTS,
                &[&class.type_parameters.len().to_string(), name],
            );
            let arguments = class
                .type_parameters
                .iter()
                .map(|parameter| TypeProjection::invariant(KType::error(format!("Missing argument {}", parameter.name))))
                .collect();
            return KType::class(&class, arguments, *nullable);
        }
        if check_bounds {
            self.check_bounds(trace, &class, &resolved, arguments);
        }
        let projections = resolved.into_iter().map(TypeProjection::invariant).collect();
        KType::class(&class, projections, *nullable)
    }

    fn check_bounds(&self, trace: &BindingTrace, class: &Arc<ClassDescriptor>, arguments: &[KType], nodes: &[NodeIndex]) {
        let mut substitutor = TypeSubstitutor::empty();
        for (parameter, argument) in class.type_parameters.iter().zip(arguments) {
            substitutor.insert(parameter, argument.clone());
        }
        for ((parameter, argument), node) in class.type_parameters.iter().zip(arguments).zip(nodes) {
            for bound in parameter.upper_bounds() {
                let bound = substitutor.substitute(bound);
                if !is_subtype_of(argument, &bound) {
                    self.report(
                        trace,
                        *node,
                        diagnostic_codes::UPPER_BOUND_VIOLATED,
                        &[&argument.to_string(), &bound.to_string()],
                    );
                }
            }
        }
    }
}
