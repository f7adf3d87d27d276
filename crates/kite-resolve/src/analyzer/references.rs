//! Names, qualified access, calls and assignment targets.

use super::ScriptAnalyzer;
use super::expressions::strip_parentheses;
use crate::calls::{
    Call, CallArgument, Callee, Candidate, MemberKind, ReceiverValue, ResolutionStatus, ResolvedCall,
};
use crate::context::{ContextDependency, ExpectedType, ExpressionPosition, ResolutionContext};
use crate::members::{self, Member};
use crate::scope::{ReceiverParameter, VariableLookup};
use kite_common::{Span, diagnostic_codes};
use kite_syntax::{NodeIndex, NodeKind};
use kite_types::{
    DeclarationDescriptor, DescriptorId, FqName, KType, Name, PropertyDescriptor, Visibility,
};
use std::rc::Rc;
use std::sync::Arc;
use tracing::trace;

/// What the left side of a `.` denotes.
#[derive(Debug)]
pub(super) enum Qualifier {
    Package(FqName),
    Value(KType),
}

impl ScriptAnalyzer<'_> {
    fn receiver_context(&self, context: &Rc<ResolutionContext>) -> Rc<ResolutionContext> {
        context
            .replace_expected_type(ExpectedType::NoExpectedType)
            .replace_position(ExpressionPosition::Free)
            .replace_dependency(ContextDependency::Independent)
    }

    pub(super) fn name_expression(&self, node: NodeIndex, name: &str, context: &Rc<ResolutionContext>) -> KType {
        context.trace.record_resolution_scope(node, Rc::clone(&context.scope));
        if name.is_empty() {
            return KType::error("missing name");
        }
        let name = Name::identifier(name);
        match context.scope.find_variable(&name, &self.env.builtins) {
            Some(VariableLookup::Local(variable)) => {
                context
                    .trace
                    .record_reference(node, DeclarationDescriptor::Variable(Arc::clone(&variable)));
                self.smart_cast(node, variable.id, !variable.is_var, &variable.ty, context)
            }
            Some(VariableLookup::Property { property, receiver }) => {
                self.property_reference(node, self.arena.span(node), property, receiver, context)
            }
            None => {
                if let Some(package) = context.scope.find_package(&name) {
                    context.trace.record_reference(node, DeclarationDescriptor::Package(package.clone()));
                    if context.position != ExpressionPosition::ImportDirective {
                        self.report_at(
                            &context.trace,
                            node,
                            diagnostic_codes::PACKAGE_USED_AS_EXPRESSION,
                            &[package.as_str()],
                        );
                    }
                } else {
                    self.report_at(
                        &context.trace,
                        node,
                        diagnostic_codes::UNRESOLVED_REFERENCE,
                        &[name.as_str()],
                    );
                }
                KType::error(format!("unresolved {name}"))
            }
        }
    }

    /// A property named without a receiver: a script or imported
    /// property, or a member of an implicit receiver.
    fn property_reference(
        &self,
        node: NodeIndex,
        span: Span,
        property: Member<PropertyDescriptor>,
        receiver: Option<ReceiverParameter>,
        context: &Rc<ResolutionContext>,
    ) -> KType {
        let descriptor = property.descriptor;
        let declared = property.substitutor.substitute(&descriptor.ty);
        let mut status = ResolutionStatus::Success;
        if descriptor.visibility == Visibility::Private
            && descriptor.containing.owner_class() != Some(&self.class.class_id)
        {
            let owner = descriptor
                .containing
                .owner_class()
                .map(|owner| owner.short_class_name().to_string())
                .unwrap_or_default();
            self.report(
                &context.trace,
                span,
                diagnostic_codes::INVISIBLE_MEMBER,
                &[descriptor.name.as_str(), &owner],
            );
            status = ResolutionStatus::Invisible;
        }
        context.trace.record_resolved_call(
            node,
            Rc::new(ResolvedCall {
                call_node: node,
                callee: Callee::Property(Arc::clone(&descriptor)),
                dispatch_receiver: receiver.map(ReceiverValue::Implicit),
                extension_receiver: None,
                type_arguments: Vec::new(),
                value_arguments: Vec::new(),
                parameter_types: Vec::new(),
                result_type: declared.clone(),
                status,
            }),
        );
        context
            .trace
            .record_reference(node, DeclarationDescriptor::Property(Arc::clone(&descriptor)));
        self.smart_cast(node, descriptor.id, !descriptor.is_var, &declared, context)
    }

    /// The type a stable value has here, narrowed when data flow proves it
    /// is not null.
    fn smart_cast(
        &self,
        node: NodeIndex,
        id: DescriptorId,
        stable: bool,
        declared: &KType,
        context: &ResolutionContext,
    ) -> KType {
        if context.position == ExpressionPosition::AssignmentTarget
            || !stable
            || !declared.is_nullable()
            || !context.data_flow_info.is_definitely_not_null(id)
        {
            return declared.clone();
        }
        let narrowed = declared.make_not_nullable();
        trace!(node = node.0, ty = %narrowed, "smart cast");
        context.trace.record_smart_cast(node, narrowed.clone());
        narrowed
    }

    /// Classify the receiver of a `.`: package names are not values.
    pub(super) fn qualifier(&self, node: NodeIndex, context: &Rc<ResolutionContext>) -> Qualifier {
        let receiver_context = self.receiver_context(context);
        match self.arena.kind(node) {
            NodeKind::Name(name) => {
                let simple = Name::identifier(name);
                if context.scope.find_variable(&simple, &self.env.builtins).is_none() {
                    if let Some(package) = context.scope.find_package(&simple) {
                        context.trace.record_resolution_scope(node, Rc::clone(&context.scope));
                        context.trace.record_reference(node, DeclarationDescriptor::Package(package.clone()));
                        return Qualifier::Package(package);
                    }
                }
                Qualifier::Value(self.expression(node, &receiver_context))
            }
            NodeKind::Dot { receiver, name, .. } => {
                if let Qualifier::Package(parent) = self.qualifier(*receiver, context) {
                    if let Some(child) = self.child_package(&parent, name) {
                        context.trace.record_resolution_scope(node, Rc::clone(&context.scope));
                        context.trace.record_reference(node, DeclarationDescriptor::Package(child.clone()));
                        return Qualifier::Package(child);
                    }
                    let ty = self.package_property(node, &parent, name, context);
                    context.trace.record_expression_type(node, ty.clone());
                    return Qualifier::Value(ty);
                }
                Qualifier::Value(self.expression(node, &receiver_context))
            }
            _ => Qualifier::Value(self.expression(node, &receiver_context)),
        }
    }

    pub(super) fn dot(
        &self,
        node: NodeIndex,
        receiver: NodeIndex,
        name: &str,
        name_span: Span,
        context: &Rc<ResolutionContext>,
    ) -> KType {
        context.trace.record_resolution_scope(node, Rc::clone(&context.scope));
        match self.qualifier(receiver, context) {
            Qualifier::Package(package) => {
                if let Some(child) = self.child_package(&package, name) {
                    context.trace.record_reference(node, DeclarationDescriptor::Package(child.clone()));
                    if context.position != ExpressionPosition::ImportDirective {
                        self.report(
                            &context.trace,
                            name_span,
                            diagnostic_codes::PACKAGE_USED_AS_EXPRESSION,
                            &[child.as_str()],
                        );
                    }
                    return KType::error(format!("package {child}"));
                }
                self.package_property(node, &package, name, context)
            }
            Qualifier::Value(receiver_type) => {
                if name.is_empty() || receiver_type.is_error() {
                    return KType::error("receiver has errors");
                }
                let call = Rc::new(Call {
                    node,
                    span: self.arena.span(node),
                    callee_span: name_span,
                    name: Name::identifier(name),
                    kind: MemberKind::Property,
                    explicit_receiver: Some(ReceiverValue::Expression {
                        node: receiver,
                        span: self.arena.span(receiver),
                        ty: receiver_type,
                    }),
                    type_arguments: Vec::new(),
                    value_arguments: Vec::new(),
                });
                self.resolve_with_receiver(node, call, context)
            }
        }
    }

    /// `package.name` as a subpackage. A top-level property of the same
    /// name shadows it.
    fn child_package(&self, package: &FqName, name: &str) -> Option<FqName> {
        if name.is_empty() {
            return None;
        }
        let simple = Name::identifier(name);
        let is_property = self
            .env
            .finder
            .find_package_members(package)
            .is_some_and(|fragment| !fragment.scope.properties(&simple).is_empty());
        let child = package.child(&simple);
        (!is_property && self.env.finder.has_package(&child)).then_some(child)
    }

    /// `package.name` where `name` is a top-level property.
    fn package_property(&self, node: NodeIndex, package: &FqName, name: &str, context: &Rc<ResolutionContext>) -> KType {
        if name.is_empty() {
            return KType::error("missing name");
        }
        let simple = Name::identifier(name);
        let property = self.env.finder.find_package_members(package).and_then(|fragment| {
            fragment
                .scope
                .properties(&simple)
                .iter()
                .find(|property| !property.is_extension())
                .cloned()
        });
        let name_span = match self.arena.kind(node) {
            NodeKind::Dot { name_span, .. } => *name_span,
            _ => self.arena.span(node),
        };
        match property {
            Some(descriptor) => self.property_reference(
                node,
                name_span,
                Member {
                    descriptor,
                    substitutor: Default::default(),
                },
                None,
                context,
            ),
            None => {
                self.report(
                    &context.trace,
                    name_span,
                    diagnostic_codes::UNRESOLVED_REFERENCE,
                    &[name],
                );
                KType::error(format!("unresolved {package}.{name}"))
            }
        }
    }

    /// Resolve a call whose explicit receiver is a value: members of the
    /// receiver's type first, then extensions in scope.
    pub(super) fn resolve_with_receiver(&self, node: NodeIndex, call: Rc<Call>, context: &Rc<ResolutionContext>) -> KType {
        let Some(receiver) = call.explicit_receiver.clone() else {
            return KType::error("call without receiver");
        };
        let levels = self.receiver_levels(&receiver, &call.name, call.kind, context);
        self.finish_call(node, call, levels, context)
    }

    fn receiver_levels(
        &self,
        receiver: &ReceiverValue,
        name: &Name,
        kind: MemberKind,
        context: &ResolutionContext,
    ) -> Vec<Vec<Candidate>> {
        let builtins = &self.env.builtins;
        let mut levels = Vec::new();
        let members: Vec<Candidate> = match kind {
            MemberKind::Function => members::member_functions(receiver.ty(), name, builtins)
                .into_iter()
                .map(|member| Candidate {
                    callee: Callee::Function(member.descriptor),
                    substitutor: member.substitutor,
                    dispatch_receiver: Some(receiver.clone()),
                    extension_receiver: None,
                })
                .collect(),
            MemberKind::Property => members::member_properties(receiver.ty(), name, builtins)
                .into_iter()
                .map(|member| Candidate {
                    callee: Callee::Property(member.descriptor),
                    substitutor: member.substitutor,
                    dispatch_receiver: Some(receiver.clone()),
                    extension_receiver: None,
                })
                .collect(),
        };
        if !members.is_empty() {
            levels.push(members);
        }
        levels.extend(self.extension_levels(receiver, name, kind, context));
        levels
    }

    fn extension_levels(
        &self,
        receiver: &ReceiverValue,
        name: &Name,
        kind: MemberKind,
        context: &ResolutionContext,
    ) -> Vec<Vec<Candidate>> {
        let with_receiver = |callee: Callee| Candidate {
            extension_receiver: Some(receiver.clone()),
            ..Candidate::new(callee)
        };
        match kind {
            MemberKind::Function => context
                .scope
                .extension_function_levels(name)
                .into_iter()
                .map(|level| level.into_iter().map(|f| with_receiver(Callee::Function(f))).collect())
                .collect(),
            MemberKind::Property => context
                .scope
                .extension_property_levels(name)
                .into_iter()
                .map(|level| level.into_iter().map(|p| with_receiver(Callee::Property(p))).collect())
                .collect(),
        }
    }

    /// Run overload resolution and record what the call site refers to.
    fn finish_call(
        &self,
        node: NodeIndex,
        call: Rc<Call>,
        levels: Vec<Vec<Candidate>>,
        context: &Rc<ResolutionContext>,
    ) -> KType {
        let results = self.calls.resolve_call(context, call, levels);
        if let Some(resolved) = results.resolved_call() {
            context.trace.record_reference(node, resolved.callee.descriptor());
        }
        results
            .result_type()
            .unwrap_or_else(|| KType::error("unresolved call"))
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn call(
        &self,
        node: NodeIndex,
        receiver: NodeIndex,
        name: &str,
        name_span: Span,
        type_arguments: &[NodeIndex],
        arguments: &[NodeIndex],
        context: &Rc<ResolutionContext>,
    ) -> KType {
        context.trace.record_resolution_scope(node, Rc::clone(&context.scope));
        let qualifier = receiver.is_some().then(|| self.qualifier(receiver, context));
        let type_arguments: Vec<KType> = type_arguments
            .iter()
            .map(|&argument| self.types.resolve(&context.scope, &context.trace, argument))
            .collect();
        let argument_context = context
            .replace_expected_type(ExpectedType::NoExpectedType)
            .replace_position(ExpressionPosition::Free)
            .replace_dependency(ContextDependency::Dependent);
        let value_arguments: Vec<CallArgument> = arguments
            .iter()
            .map(|&argument| CallArgument {
                node: argument,
                expression: strip_parentheses(self.arena, argument),
                span: self.arena.span(argument),
                ty: self.expression(argument, &argument_context),
            })
            .collect();
        if name.is_empty() {
            return KType::error("missing name");
        }
        let simple = Name::identifier(name);
        let explicit_receiver = match &qualifier {
            Some(Qualifier::Value(ty)) => {
                if ty.is_error() {
                    return KType::error("receiver has errors");
                }
                Some(ReceiverValue::Expression {
                    node: receiver,
                    span: self.arena.span(receiver),
                    ty: ty.clone(),
                })
            }
            _ => None,
        };
        let call = Rc::new(Call {
            node,
            span: self.arena.span(node),
            callee_span: name_span,
            name: simple.clone(),
            kind: MemberKind::Function,
            explicit_receiver,
            type_arguments,
            value_arguments,
        });

        let levels = match qualifier {
            Some(Qualifier::Value(_)) => return self.resolve_with_receiver(node, call, context),
            Some(Qualifier::Package(package)) => self.package_call_levels(&package, &simple),
            None => {
                let levels = self.implicit_call_levels(&simple, context);
                if levels.is_empty() {
                    if let Some(variable) = context.scope.find_variable(&simple, &self.env.builtins) {
                        let ty = match variable {
                            VariableLookup::Local(variable) => variable.ty.clone(),
                            VariableLookup::Property { property, .. } => {
                                property.substitutor.substitute(&property.descriptor.ty)
                            }
                        };
                        self.report(
                            &context.trace,
                            name_span,
                            diagnostic_codes::NOT_A_FUNCTION,
                            &[name, &ty.to_string()],
                        );
                        return KType::error(format!("{name} is not a function"));
                    }
                }
                levels
            }
        };
        self.finish_call(node, call, levels, context)
    }

    /// Candidates for `name(...)`: functions and constructors level by
    /// level, then extensions callable on an implicit receiver.
    fn implicit_call_levels(&self, name: &Name, context: &ResolutionContext) -> Vec<Vec<Candidate>> {
        let mut levels: Vec<Vec<Candidate>> = context
            .scope
            .function_levels(name, &self.env.builtins)
            .into_iter()
            .map(|level| {
                let dispatch = level.receiver.map(ReceiverValue::Implicit);
                let mut candidates: Vec<Candidate> = level
                    .functions
                    .into_iter()
                    .map(|member| Candidate {
                        callee: Callee::Function(member.descriptor),
                        substitutor: member.substitutor,
                        dispatch_receiver: dispatch.clone(),
                        extension_receiver: None,
                    })
                    .collect();
                candidates.extend(
                    level
                        .constructors
                        .into_iter()
                        .map(|(constructor, class)| Candidate::new(Callee::Constructor { constructor, class })),
                );
                candidates
            })
            .collect();
        for receiver in context.scope.implicit_receivers() {
            levels.extend(self.extension_levels(
                &ReceiverValue::Implicit(receiver),
                name,
                MemberKind::Function,
                context,
            ));
        }
        levels
    }

    fn package_call_levels(&self, package: &FqName, name: &Name) -> Vec<Vec<Candidate>> {
        let Some(fragment) = self.env.finder.find_package_members(package) else {
            return Vec::new();
        };
        let mut level: Vec<Candidate> = fragment
            .scope
            .functions(name)
            .iter()
            .filter(|function| !function.is_extension())
            .map(|function| Candidate::new(Callee::Function(Arc::clone(function))))
            .collect();
        if let Some(class) = fragment.scope.classifier(name) {
            level.extend(class.constructors().iter().map(|constructor| {
                Candidate::new(Callee::Constructor {
                    constructor: Arc::clone(constructor),
                    class: Arc::clone(class),
                })
            }));
        }
        if level.is_empty() { Vec::new() } else { vec![level] }
    }

    /// `target = value`.
    pub(super) fn assignment(&self, target: NodeIndex, value: NodeIndex, context: &Rc<ResolutionContext>) -> KType {
        let unit = self.env.builtins.unit_type();
        let target_context = context
            .replace_expected_type(ExpectedType::NoExpectedType)
            .replace_position(ExpressionPosition::AssignmentTarget)
            .replace_dependency(ContextDependency::Independent);
        let target_node = strip_parentheses(self.arena, target);
        let assignable = match self.arena.kind(target_node) {
            NodeKind::Name(_) | NodeKind::Dot { .. } => {
                let ty = self.expression(target_node, &target_context);
                self.assignable_type(target_node, &ty, context)
            }
            _ => {
                self.report_at(&context.trace, target, diagnostic_codes::ASSIGNMENT_TARGET, &[]);
                None
            }
        };
        let value_context = context
            .replace_expected_type(ExpectedType::from(assignable))
            .replace_position(ExpressionPosition::Free)
            .replace_dependency(ContextDependency::Independent);
        self.expression(value, &value_context);
        unit
    }

    /// The type a resolved assignment target accepts, reporting `val`s.
    fn assignable_type(&self, target: NodeIndex, ty: &KType, context: &ResolutionContext) -> Option<KType> {
        if ty.is_error() {
            return None;
        }
        let (name, is_var) = match context.trace.reference(target)? {
            DeclarationDescriptor::Variable(variable) => (variable.name.clone(), variable.is_var),
            DeclarationDescriptor::Property(property) => (property.name.clone(), property.is_var),
            _ => {
                self.report_at(&context.trace, target, diagnostic_codes::ASSIGNMENT_TARGET, &[]);
                return None;
            }
        };
        if !is_var {
            self.report_at(&context.trace, target, diagnostic_codes::VAL_REASSIGNMENT, &[name.as_str()]);
        }
        Some(ty.clone())
    }
}
