//! Name binding, overload resolution and type inference for Kite script.
//!
//! - `trace` - `BindingTrace`, what analysis learned per syntax node
//! - `context` - immutable `ResolutionContext` values
//! - `cache` - `ResolutionResultsCache` and its temporary variant
//! - `scope` - lexical scopes and implicit receivers
//! - `call_resolver` - overload resolution with constraint-based inference
//! - `analyzer` - script analysis, one REPL line or source file at a time
//! - `tips` - `TipsManager`, completion variants

pub mod analyzer;
pub mod cache;
pub mod call_resolver;
pub mod calls;
pub mod context;
pub mod data_flow;
pub mod environment;
pub mod error;
pub mod members;
pub mod scope;
pub mod tips;
pub mod trace;
pub mod type_resolver;

pub use analyzer::{
    ScriptAnalysis, ScriptFunction, ScriptMode, ScriptProperty, ScriptResult, analyze_script,
    file_facade_class_id, line_class_id,
};
pub use cache::ResolutionResultsCache;
pub use calls::{Callee, MemberKind, OverloadResolutionResults, ReceiverValue, ResolutionStatus, ResolvedCall};
pub use context::{ContextDependency, ExpectedType, ExpressionPosition, ResolutionContext};
pub use environment::ResolveEnvironment;
pub use error::{ResolveError, ResolveResult};
pub use scope::{LexicalScope, ReceiverParameter, ScopeKind};
pub use tips::{CompletionTarget, TipsManager, completion_target};
pub use trace::BindingTrace;

#[cfg(test)]
#[path = "../tests/test_support.rs"]
pub(crate) mod test_support;
