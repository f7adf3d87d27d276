//! Shared helpers for resolution tests.

use crate::analyzer::{ScriptAnalysis, ScriptMode, analyze_script};
use crate::cache::ResolutionResultsCache;
use crate::context::ResolutionContext;
use crate::environment::ResolveEnvironment;
use crate::scope::LexicalScope;
use crate::trace::BindingTrace;
use kite_syntax::{NodeIndex, NodeKind, ParsedScript, parse_script};
use kite_types::{FqName, FunctionDescriptor, Name};
use std::rc::Rc;
use std::sync::Arc;

pub(crate) fn environment() -> ResolveEnvironment {
    ResolveEnvironment::stdlib().expect("stdlib environment loads")
}

/// A fresh expression context over the default imports.
pub(crate) fn root_context(env: &ResolveEnvironment) -> Rc<ResolutionContext> {
    ResolutionContext::new(BindingTrace::new("test"), env.default_scope(), ResolutionResultsCache::new())
}

pub(crate) fn stdlib_function(env: &ResolveEnvironment, package: &str, name: &str) -> Arc<FunctionDescriptor> {
    let fragment = env
        .finder
        .find_package_members(&FqName::parse(package))
        .unwrap_or_else(|| panic!("package {package} exists"));
    fragment
        .scope
        .functions(&Name::identifier(name))
        .first()
        .cloned()
        .unwrap_or_else(|| panic!("{package}.{name} exists"))
}

/// REPL lines analyzed one after another, each seeing the previous
/// successful line's scope.
pub(crate) struct Session {
    pub env: ResolveEnvironment,
    pub scope: Rc<LexicalScope>,
    line: u32,
}

impl Session {
    pub fn new() -> Self {
        let env = environment();
        let scope = env.default_scope();
        Session { env, scope, line: 0 }
    }

    pub fn line(&mut self, text: &str) -> (ParsedScript, ScriptAnalysis) {
        self.line += 1;
        let script = parse_script(&format!("Line{}.kite", self.line), text);
        assert!(!script.has_errors(), "syntax errors in {text:?}: {:?}", script.diagnostics);
        let analysis = analyze_script(&self.env, &script, ScriptMode::ReplLine { line: self.line }, &self.scope);
        if !analysis.has_errors() {
            self.scope = Rc::clone(&analysis.scope);
        }
        (script, analysis)
    }
}

/// Analyze a single REPL line in a fresh session.
pub(crate) fn analyze(text: &str) -> (ParsedScript, ScriptAnalysis) {
    Session::new().line(text)
}

pub(crate) fn codes(analysis: &ScriptAnalysis) -> Vec<u32> {
    analysis.diagnostics().iter().map(|diagnostic| diagnostic.code).collect()
}

pub(crate) fn result_type(analysis: &ScriptAnalysis) -> String {
    analysis
        .result
        .as_ref()
        .map(|result| result.ty.to_string())
        .unwrap_or_else(|| panic!("line has a result: {:?}", analysis.diagnostics()))
}

/// The first node (in creation order) that is a call of `name`.
pub(crate) fn call_node(script: &ParsedScript, name: &str) -> NodeIndex {
    (0..script.arena.len() as u32)
        .map(NodeIndex)
        .find(|&node| matches!(script.arena.kind(node), NodeKind::Call { name: n, .. } if n == name))
        .unwrap_or_else(|| panic!("call {name} in script"))
}

/// Simple-name nodes `name`, in creation order.
pub(crate) fn name_nodes(script: &ParsedScript, name: &str) -> Vec<NodeIndex> {
    (0..script.arena.len() as u32)
        .map(NodeIndex)
        .filter(|&node| matches!(script.arena.kind(node), NodeKind::Name(n) if n == name))
        .collect()
}
