//! Overload resolution and type-argument inference.
//!
//! Candidates arrive grouped by scope level, innermost first. Each
//! candidate is checked in its own temporary trace and cache; the first
//! level with an applicable candidate decides the call, and only the
//! winner's records are committed. Inference runs without the expected
//! type first and is re-solved with it when that succeeds.

use crate::cache::{CachedResolution, DeferredComputation, ResolutionResultsCache};
use crate::calls::{
    Call, CallArgument, Callee, Candidate, OverloadResolutionResults, ReceiverValue, ResolutionStatus,
    ResolvedCall,
};
use crate::context::{ContextDependency, ExpectedType, ResolutionContext};
use crate::trace::BindingTrace;
use kite_common::limits::MAX_REPORTED_CANDIDATES;
use kite_common::{Diagnostic, Span, diagnostic_codes};
use kite_types::constraints::ConstraintError;
use kite_types::{
    BuiltIns, ClassId, ConstraintPosition, ConstraintSystem, KType, TypeParameterDescriptor,
    TypeSubstitutor, is_subtype_of,
};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, trace};

pub struct CallResolver<'a> {
    builtins: &'a BuiltIns,
    file_name: &'a str,
    /// The class whose private members are accessible.
    owner: Option<ClassId>,
}

/// A checked candidate with the trace and cache holding its records.
struct CandidateOutcome {
    resolved: Rc<ResolvedCall>,
    trace: Rc<BindingTrace>,
    cache: Rc<ResolutionResultsCache>,
}

impl CandidateOutcome {
    fn commit(&self) {
        self.trace.commit();
        self.cache.commit();
    }
}

struct Inference {
    successful: bool,
    substitutor: TypeSubstitutor,
    errors: Vec<ConstraintError>,
    unknown: Vec<Arc<TypeParameterDescriptor>>,
}

impl Inference {
    fn only_unknown_parameters(&self) -> bool {
        !self.successful && self.errors.is_empty() && !self.unknown.is_empty()
    }
}

impl<'a> CallResolver<'a> {
    pub fn new(builtins: &'a BuiltIns, file_name: &'a str, owner: Option<ClassId>) -> Self {
        CallResolver {
            builtins,
            file_name,
            owner,
        }
    }

    fn report(&self, trace: &BindingTrace, span: Span, code: u32, args: &[&str]) {
        trace.report(Diagnostic::from_code(self.file_name, span.start, span.len(), code, args));
    }

    /// Resolve `call` against `levels` of candidates.
    ///
    /// Results are cached per call site; a repeated resolution replays the
    /// cached diagnostics into the context's trace.
    pub fn resolve_call(
        &self,
        context: &Rc<ResolutionContext>,
        call: Rc<Call>,
        levels: Vec<Vec<Candidate>>,
    ) -> Rc<OverloadResolutionResults> {
        if let Some(cached) = context.cache.resolution(call.node, call.kind) {
            trace!(call = %call.name, "resolution cache hit");
            for diagnostic in cached.diagnostics {
                context.trace.report(diagnostic);
            }
            if let Some(resolved) = cached.results.resolved_call() {
                context.trace.record_resolved_call(call.node, Rc::clone(resolved));
            }
            return cached.results;
        }

        let trace = BindingTrace::temporary(&context.trace, format!("call {}", call.name));
        let call_context = context.to_call(&call).replace_trace(&trace);
        let results = Rc::new(self.resolve_levels(&call_context, &call, levels));
        if let Some(resolved) = results.resolved_call() {
            trace.record_resolved_call(call.node, Rc::clone(resolved));
        }
        let diagnostics = trace.diagnostics();
        trace.commit();
        context.cache.record_resolution(
            call.node,
            call.kind,
            CachedResolution {
                results: Rc::clone(&results),
                diagnostics,
            },
        );
        results
    }

    fn resolve_levels(
        &self,
        context: &Rc<ResolutionContext>,
        call: &Rc<Call>,
        levels: Vec<Vec<Candidate>>,
    ) -> OverloadResolutionResults {
        let mut failed: Vec<CandidateOutcome> = Vec::new();
        for level in levels {
            let mut applicable = Vec::new();
            for candidate in level {
                let outcome = self.resolve_candidate(context, call, candidate);
                if outcome.resolved.status.is_applicable() {
                    applicable.push(outcome);
                } else {
                    failed.push(outcome);
                }
            }
            if applicable.is_empty() {
                continue;
            }
            let winners: Vec<usize> = (0..applicable.len())
                .filter(|&index| {
                    applicable.iter().enumerate().all(|(other, rival)| {
                        other == index || dominates(&applicable[index].resolved, &rival.resolved)
                    })
                })
                .collect();
            if let [winner] = winners[..] {
                let outcome = &applicable[winner];
                debug!(call = %call.name, callee = %outcome.resolved.callee, "resolved call");
                outcome.commit();
                return OverloadResolutionResults::Success(Rc::clone(&outcome.resolved));
            }
            let rendered = render_candidates(applicable.iter().map(|outcome| &outcome.resolved.callee));
            self.report(
                &context.trace,
                call.callee_span,
                diagnostic_codes::OVERLOAD_RESOLUTION_AMBIGUITY,
                &[&rendered],
            );
            return OverloadResolutionResults::Ambiguity(
                applicable.into_iter().map(|outcome| outcome.resolved).collect(),
            );
        }

        match failed.len() {
            0 => {
                self.report(
                    &context.trace,
                    call.callee_span,
                    diagnostic_codes::UNRESOLVED_REFERENCE,
                    &[call.name.as_str()],
                );
                OverloadResolutionResults::Unresolved
            }
            1 => {
                failed[0].commit();
                OverloadResolutionResults::Inapplicable(vec![Rc::clone(&failed[0].resolved)])
            }
            _ => {
                let rendered = render_candidates(failed.iter().map(|outcome| &outcome.resolved.callee));
                self.report(
                    &context.trace,
                    call.callee_span,
                    diagnostic_codes::NONE_APPLICABLE,
                    &[&rendered],
                );
                OverloadResolutionResults::Inapplicable(failed.into_iter().map(|outcome| outcome.resolved).collect())
            }
        }
    }

    fn resolve_candidate(&self, context: &Rc<ResolutionContext>, call: &Rc<Call>, candidate: Candidate) -> CandidateOutcome {
        let trace = BindingTrace::temporary(&context.trace, format!("candidate {}", candidate.callee));
        let cache = ResolutionResultsCache::temporary(&context.cache);
        let candidate_context = context.to_candidate(call, candidate.clone(), &trace, &cache);
        let resolved = self.check_candidate(&candidate_context, call, &candidate);
        CandidateOutcome {
            resolved: Rc::new(resolved),
            trace,
            cache,
        }
    }

    /// Check one candidate, recording into the context's trace.
    fn check_candidate(&self, context: &Rc<ResolutionContext>, call: &Rc<Call>, candidate: &Candidate) -> ResolvedCall {
        let callee = &candidate.callee;
        let trace = &context.trace;
        let mut status = ResolutionStatus::Success;

        if callee.is_private() && callee.owner() != self.owner {
            let owner = callee.owner().map(|owner| owner.short_class_name().to_string()).unwrap_or_default();
            self.report(
                trace,
                call.callee_span,
                diagnostic_codes::INVISIBLE_MEMBER,
                &[callee.name().as_str(), &owner],
            );
            downgrade(&mut status, ResolutionStatus::Invisible);
        }

        // Positional arguments map onto parameters in order.
        let parameters = callee.value_parameters();
        let mut value_arguments = vec![None; parameters.len()];
        for (index, argument) in call.value_arguments.iter().enumerate() {
            if index < parameters.len() {
                value_arguments[index] = Some(argument.node);
            } else {
                self.report(
                    trace,
                    argument.span,
                    diagnostic_codes::TOO_MANY_ARGUMENTS,
                    &[&callee.to_string()],
                );
                downgrade(&mut status, ResolutionStatus::WrongArgumentCount);
                break;
            }
        }
        for parameter in parameters.iter().skip(call.value_arguments.len()) {
            if !parameter.declares_default_value {
                self.report(
                    trace,
                    Span::at(call.span.end.saturating_sub(1)),
                    diagnostic_codes::NO_VALUE_FOR_PARAMETER,
                    &[parameter.name.as_str()],
                );
                downgrade(&mut status, ResolutionStatus::WrongArgumentCount);
            }
        }
        assert_eq!(
            value_arguments.len(),
            parameters.len(),
            "argument mapping for {callee} lost parameters"
        );

        let type_parameters = callee.type_parameters();
        if !call.type_arguments.is_empty() && call.type_arguments.len() != type_parameters.len() {
            self.report(
                trace,
                call.callee_span,
                diagnostic_codes::WRONG_NUMBER_OF_TYPE_ARGUMENTS,
                &[&type_parameters.len().to_string(), callee.name().as_str()],
            );
            downgrade(&mut status, ResolutionStatus::WrongArgumentCount);
        }

        if let Some(receiver) = &candidate.dispatch_receiver {
            if is_nullable_receiver(receiver) {
                self.report_unsafe_call(trace, call, receiver);
                downgrade(&mut status, ResolutionStatus::UnsafeCall);
            }
        }
        let extension_receiver_type = match (&candidate.extension_receiver, callee.extension_receiver()) {
            (Some(receiver), Some(declared)) => {
                let declared = candidate.substitutor.substitute(declared);
                if is_nullable_receiver(receiver) && !declared.is_nullable() {
                    self.report_unsafe_call(trace, call, receiver);
                    downgrade(&mut status, ResolutionStatus::UnsafeCall);
                    Some((receiver.ty().make_not_nullable(), declared))
                } else {
                    Some((receiver.ty().clone(), declared))
                }
            }
            _ => None,
        };

        let declared_parameters: Vec<KType> = parameters
            .iter()
            .map(|parameter| candidate.substitutor.substitute(&parameter.ty))
            .collect();
        let declared_result = candidate.substitutor.substitute(&callee.declared_type());
        let mentions_own = |ty: &KType| {
            ty.contains_type_parameter(&|parameter: &TypeParameterDescriptor| type_parameters.iter().any(|own| own.id == parameter.id))
        };

        // Deferred arguments whose parameter type is already fixed are
        // completed before inference sees them.
        let mut argument_types: Vec<KType> = Vec::with_capacity(call.value_arguments.len());
        let mut completed = vec![false; call.value_arguments.len()];
        for (index, argument) in call.value_arguments.iter().enumerate() {
            match declared_parameters.get(index) {
                Some(parameter) if !mentions_own(parameter) => {
                    argument_types.push(self.complete_argument(context, argument, Some(parameter)));
                    completed[index] = true;
                }
                _ => argument_types.push(argument.ty.clone()),
            }
        }

        let mut type_arguments = Vec::new();
        let result_type;
        let parameter_types;
        if type_parameters.is_empty() {
            if let Some((actual, declared)) = &extension_receiver_type {
                if !is_subtype_of(actual, declared) {
                    self.report(
                        trace,
                        receiver_span(call),
                        diagnostic_codes::TYPE_MISMATCH,
                        &[&actual.to_string(), &declared.to_string()],
                    );
                    downgrade(&mut status, ResolutionStatus::ReceiverMismatch);
                }
            }
            for ((argument, actual), expected) in call.value_arguments.iter().zip(&argument_types).zip(&declared_parameters) {
                if !is_subtype_of(actual, expected) {
                    self.report(
                        trace,
                        argument.span,
                        diagnostic_codes::TYPE_MISMATCH,
                        &[&actual.to_string(), &expected.to_string()],
                    );
                    downgrade(&mut status, ResolutionStatus::ArgumentMismatch);
                }
            }
            result_type = declared_result;
            parameter_types = declared_parameters;
        } else {
            let expected = match (&context.expected_type, context.dependency) {
                (ExpectedType::Type(ty), ContextDependency::Independent) => Some(ty),
                _ => None,
            };
            let infer = |expected: Option<&KType>| {
                self.infer(
                    type_parameters,
                    call,
                    extension_receiver_type.as_ref(),
                    &declared_parameters,
                    &argument_types,
                    &declared_result,
                    expected,
                )
            };
            let mut inference = infer(None);
            if let Some(expected) = expected {
                if inference.successful || inference.only_unknown_parameters() {
                    let with_expected = infer(Some(expected));
                    if with_expected.successful {
                        inference = with_expected;
                    }
                }
            }
            let preliminary =
                inference.only_unknown_parameters() && context.dependency == ContextDependency::Dependent;
            if !inference.successful && !preliminary && status.is_applicable() {
                self.report_inference_errors(trace, call, callee, &inference);
                downgrade(
                    &mut status,
                    if inference.only_unknown_parameters() {
                        ResolutionStatus::InferenceFailed
                    } else {
                        ResolutionStatus::ArgumentMismatch
                    },
                );
            }
            let substitutor = inference.substitutor;
            type_arguments = type_parameters
                .iter()
                .map(|parameter| match substitutor.get(parameter) {
                    Some(ty) => ty.clone(),
                    None => KType::type_parameter(parameter, false),
                })
                .collect();
            parameter_types = declared_parameters.iter().map(|ty| substitutor.substitute(ty)).collect::<Vec<_>>();
            result_type = substitutor.substitute(&declared_result);

            for (index, argument) in call.value_arguments.iter().enumerate() {
                if completed[index] {
                    continue;
                }
                let expected = parameter_types.get(index).filter(|ty| !mentions_own(*ty));
                self.complete_argument(context, argument, expected);
            }

            if status.is_applicable()
                && context.dependency == ContextDependency::Dependent
                && mentions_own(&declared_result)
            {
                trace!(call = %call.name, "deferring inference until the expected type is known");
                context.cache.record_deferred_computation(
                    call.node,
                    call.kind,
                    DeferredComputation {
                        call: Rc::clone(call),
                        candidate: candidate.clone(),
                    },
                );
            }
        }

        ResolvedCall {
            call_node: call.node,
            callee: callee.clone(),
            dispatch_receiver: candidate.dispatch_receiver.clone(),
            extension_receiver: candidate.extension_receiver.clone(),
            type_arguments,
            value_arguments,
            parameter_types,
            result_type,
            status,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn infer(
        &self,
        type_parameters: &[Arc<TypeParameterDescriptor>],
        call: &Call,
        extension_receiver: Option<&(KType, KType)>,
        parameter_types: &[KType],
        argument_types: &[KType],
        result_type: &KType,
        expected: Option<&KType>,
    ) -> Inference {
        let mut system = ConstraintSystem::new(self.builtins);
        system.register_type_variables(type_parameters);
        for (index, (explicit, parameter)) in call.type_arguments.iter().zip(type_parameters).enumerate() {
            system.add_equality_constraint(
                explicit,
                &KType::type_parameter(parameter, false),
                ConstraintPosition::ExplicitTypeArgument(index as u32),
            );
        }
        if let Some((actual, declared)) = extension_receiver {
            system.add_subtype_constraint(actual, declared, ConstraintPosition::ReceiverPosition);
        }
        for (index, (actual, parameter)) in argument_types.iter().zip(parameter_types).enumerate() {
            system.add_subtype_constraint(actual, parameter, ConstraintPosition::ValueParameterPosition(index as u32));
        }
        if let Some(expected) = expected {
            system.add_subtype_constraint(result_type, expected, ConstraintPosition::ExpectedTypePosition);
        }
        let (status, substitutor) = system.solve();
        let unknown = system.unknown_parameters(&substitutor);
        trace!(call = %call.name, ?status, with_expected = expected.is_some(), "inference");
        Inference {
            successful: status.is_successful(),
            errors: system.errors().to_vec(),
            unknown,
            substitutor,
        }
    }

    fn report_inference_errors(&self, trace: &BindingTrace, call: &Call, callee: &Callee, inference: &Inference) {
        let mut reported = false;
        for error in &inference.errors {
            match error {
                ConstraintError::TypeMismatch { sub, sup, position } => {
                    let span = match position {
                        ConstraintPosition::ValueParameterPosition(index) => call
                            .value_arguments
                            .get(*index as usize)
                            .map_or(call.callee_span, |argument| argument.span),
                        ConstraintPosition::ReceiverPosition => receiver_span(call),
                        _ => call.callee_span,
                    };
                    self.report(
                        trace,
                        span,
                        diagnostic_codes::TYPE_MISMATCH,
                        &[&sub.to_string(), &sup.to_string()],
                    );
                }
                ConstraintError::BoundViolated { value, bound, .. } => {
                    self.report(
                        trace,
                        call.callee_span,
                        diagnostic_codes::UPPER_BOUND_VIOLATED,
                        &[&value.to_string(), &bound.to_string()],
                    );
                }
            }
            reported = true;
        }
        for parameter in &inference.unknown {
            self.report(
                trace,
                call.callee_span,
                diagnostic_codes::TYPE_INFERENCE_FAILED,
                &[parameter.name.as_str()],
            );
            reported = true;
        }
        if !reported {
            self.report(
                trace,
                call.callee_span,
                diagnostic_codes::TYPE_INFERENCE_FAILED,
                &[&callee.name().to_string()],
            );
        }
    }

    fn report_unsafe_call(&self, trace: &BindingTrace, call: &Call, receiver: &ReceiverValue) {
        self.report(
            trace,
            call.callee_span,
            diagnostic_codes::UNSAFE_CALL,
            &[&receiver.ty().to_string()],
        );
    }

    /// Finish the inference of a deferred argument call against the type of
    /// the parameter it flows into. With no parameter type the call is
    /// finished on its own, reporting whatever could not be inferred.
    /// Returns the argument's final type.
    fn complete_argument(&self, context: &Rc<ResolutionContext>, argument: &CallArgument, expected: Option<&KType>) -> KType {
        let Some(deferred) = context.cache.deferred_computation(argument.expression) else {
            return argument.ty.clone();
        };
        let attempt = |expected: Option<&KType>| {
            let trace = BindingTrace::temporary(&context.trace, format!("complete {}", deferred.call.name));
            let inner = context
                .replace_trace(&trace)
                .replace_dependency(ContextDependency::Independent)
                .replace_expected_type(ExpectedType::from(expected.cloned()))
                .to_expression();
            let resolved = self.check_candidate(&inner, &deferred.call, &deferred.candidate);
            (resolved, trace)
        };

        let (mut resolved, mut trace) = attempt(expected);
        if !resolved.status.is_applicable() && expected.is_some() {
            (resolved, trace) = attempt(None);
        }
        trace!(call = %deferred.call.name, result = %resolved.result_type, "completed deferred call");
        let ty = resolved.result_type.clone();
        trace.record_resolved_call(deferred.call.node, Rc::new(resolved));
        trace.record_expression_type(deferred.call.node, ty.clone());
        trace.record_expression_type(argument.node, ty.clone());
        trace.commit();
        ty
    }
}

/// Record the first reason a candidate fails; later ones don't override it.
fn downgrade(status: &mut ResolutionStatus, to: ResolutionStatus) {
    if status.is_applicable() {
        *status = to;
    }
}

fn is_nullable_receiver(receiver: &ReceiverValue) -> bool {
    receiver.ty().lower_if_flexible().is_nullable()
}

fn receiver_span(call: &Call) -> Span {
    match &call.explicit_receiver {
        Some(ReceiverValue::Expression { span, .. }) => *span,
        _ => call.callee_span,
    }
}

/// Whether `a` is strictly preferred over `b`: its parameters are at
/// least as specific, and a non-generic callee beats a generic one with
/// the same parameter types.
fn dominates(a: &ResolvedCall, b: &ResolvedCall) -> bool {
    let at_least = |x: &ResolvedCall, y: &ResolvedCall| {
        x.parameter_types.len() == y.parameter_types.len()
            && x
                .parameter_types
                .iter()
                .zip(&y.parameter_types)
                .all(|(px, py)| is_subtype_of(px, py))
    };
    match (at_least(a, b), at_least(b, a)) {
        (true, false) => true,
        (true, true) => a.callee.type_parameters().len() < b.callee.type_parameters().len(),
        _ => false,
    }
}

fn render_candidates<'c>(callees: impl Iterator<Item = &'c Callee>) -> String {
    let rendered: Vec<String> = callees.take(MAX_REPORTED_CANDIDATES).map(ToString::to_string).collect();
    rendered.join("; ")
}

#[cfg(test)]
#[path = "../tests/call_resolver_tests.rs"]
mod call_resolver_tests;
