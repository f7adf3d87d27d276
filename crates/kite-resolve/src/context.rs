//! Resolution contexts.
//!
//! A context bundles what expression analysis needs at one point: the
//! trace to record into, the lexical scope, the expected type, data-flow
//! facts and the results cache. Contexts are immutable and shared; every
//! `replace_*` returns the same context when the value does not change and
//! otherwise a copy built by one factory, so the plain, call and candidate
//! variants all stay in step.

use crate::cache::ResolutionResultsCache;
use crate::calls::{Call, Candidate};
use crate::data_flow::DataFlowInfo;
use crate::scope::LexicalScope;
use crate::trace::BindingTrace;
use kite_types::KType;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq)]
pub enum ExpectedType {
    NoExpectedType,
    Type(KType),
}

impl ExpectedType {
    pub fn as_type(&self) -> Option<&KType> {
        match self {
            ExpectedType::NoExpectedType => None,
            ExpectedType::Type(ty) => Some(ty),
        }
    }
}

impl From<Option<KType>> for ExpectedType {
    fn from(ty: Option<KType>) -> Self {
        ty.map_or(ExpectedType::NoExpectedType, ExpectedType::Type)
    }
}

/// Where the analyzed expression sits syntactically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpressionPosition {
    Free,
    /// A statement whose value is discarded.
    Statement,
    /// Left side of `=`.
    AssignmentTarget,
    /// Inside an import directive: only packages are meaningful.
    ImportDirective,
}

/// Whether the expected type is final, or the expression is an argument
/// whose expected type depends on the enclosing call's resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextDependency {
    Independent,
    Dependent,
}

#[derive(Clone, Debug)]
pub enum ContextKind {
    Expression,
    /// Resolving a call site.
    Call(Rc<Call>),
    /// Checking one candidate of a call.
    Candidate { call: Rc<Call>, candidate: Rc<Candidate> },
}

#[derive(Clone, Debug)]
pub struct ResolutionContext {
    pub trace: Rc<BindingTrace>,
    pub scope: Rc<LexicalScope>,
    pub expected_type: ExpectedType,
    pub data_flow_info: Rc<DataFlowInfo>,
    pub position: ExpressionPosition,
    pub dependency: ContextDependency,
    pub cache: Rc<ResolutionResultsCache>,
    pub kind: ContextKind,
}

impl ResolutionContext {
    pub fn new(trace: Rc<BindingTrace>, scope: Rc<LexicalScope>, cache: Rc<ResolutionResultsCache>) -> Rc<Self> {
        Rc::new(ResolutionContext {
            trace,
            scope,
            expected_type: ExpectedType::NoExpectedType,
            data_flow_info: DataFlowInfo::empty(),
            position: ExpressionPosition::Free,
            dependency: ContextDependency::Independent,
            cache,
            kind: ContextKind::Expression,
        })
    }

    /// The single place new contexts are made from an existing one.
    fn with(self: &Rc<Self>, update: impl FnOnce(&mut ResolutionContext)) -> Rc<Self> {
        let mut next = (**self).clone();
        update(&mut next);
        Rc::new(next)
    }

    pub fn replace_trace(self: &Rc<Self>, trace: &Rc<BindingTrace>) -> Rc<Self> {
        if Rc::ptr_eq(&self.trace, trace) {
            return Rc::clone(self);
        }
        self.with(|context| context.trace = Rc::clone(trace))
    }

    pub fn replace_scope(self: &Rc<Self>, scope: &Rc<LexicalScope>) -> Rc<Self> {
        if Rc::ptr_eq(&self.scope, scope) {
            return Rc::clone(self);
        }
        self.with(|context| context.scope = Rc::clone(scope))
    }

    pub fn replace_expected_type(self: &Rc<Self>, expected_type: ExpectedType) -> Rc<Self> {
        if self.expected_type == expected_type {
            return Rc::clone(self);
        }
        self.with(|context| context.expected_type = expected_type)
    }

    pub fn replace_data_flow_info(self: &Rc<Self>, info: &Rc<DataFlowInfo>) -> Rc<Self> {
        if Rc::ptr_eq(&self.data_flow_info, info) {
            return Rc::clone(self);
        }
        self.with(|context| context.data_flow_info = Rc::clone(info))
    }

    pub fn replace_position(self: &Rc<Self>, position: ExpressionPosition) -> Rc<Self> {
        if self.position == position {
            return Rc::clone(self);
        }
        self.with(|context| context.position = position)
    }

    pub fn replace_dependency(self: &Rc<Self>, dependency: ContextDependency) -> Rc<Self> {
        if self.dependency == dependency {
            return Rc::clone(self);
        }
        self.with(|context| context.dependency = dependency)
    }

    pub fn replace_cache(self: &Rc<Self>, cache: &Rc<ResolutionResultsCache>) -> Rc<Self> {
        if Rc::ptr_eq(&self.cache, cache) {
            return Rc::clone(self);
        }
        self.with(|context| context.cache = Rc::clone(cache))
    }

    /// A plain expression context with the same settings.
    pub fn to_expression(self: &Rc<Self>) -> Rc<Self> {
        if matches!(self.kind, ContextKind::Expression) {
            return Rc::clone(self);
        }
        self.with(|context| context.kind = ContextKind::Expression)
    }

    pub fn to_call(self: &Rc<Self>, call: &Rc<Call>) -> Rc<Self> {
        if let ContextKind::Call(current) = &self.kind {
            if Rc::ptr_eq(current, call) {
                return Rc::clone(self);
            }
        }
        self.with(|context| context.kind = ContextKind::Call(Rc::clone(call)))
    }

    /// A candidate context recording into `trace` and `cache`.
    pub fn to_candidate(
        self: &Rc<Self>,
        call: &Rc<Call>,
        candidate: Candidate,
        trace: &Rc<BindingTrace>,
        cache: &Rc<ResolutionResultsCache>,
    ) -> Rc<Self> {
        self.with(|context| {
            context.trace = Rc::clone(trace);
            context.cache = Rc::clone(cache);
            context.kind = ContextKind::Candidate {
                call: Rc::clone(call),
                candidate: Rc::new(candidate),
            };
        })
    }

    /// The candidate being checked, for candidate contexts.
    pub fn candidate(&self) -> Option<&Rc<Candidate>> {
        match &self.kind {
            ContextKind::Candidate { candidate, .. } => Some(candidate),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../tests/context_tests.rs"]
mod context_tests;
