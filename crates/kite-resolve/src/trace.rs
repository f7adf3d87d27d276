//! The binding trace: what analysis learned about each syntax node.
//!
//! A trace is a set of typed maps keyed by [`NodeIndex`] plus a diagnostics
//! sink. A temporary trace reads through to its parent and writes locally;
//! [`BindingTrace::commit`] moves its records up. Speculative resolution of
//! an overload candidate runs in a temporary trace that is committed only
//! if the candidate wins.

use crate::calls::ResolvedCall;
use crate::scope::LexicalScope;
use kite_common::Diagnostic;
use kite_syntax::NodeIndex;
use kite_types::{DeclarationDescriptor, KType};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

#[derive(Default)]
struct BindingData {
    expression_types: FxHashMap<NodeIndex, KType>,
    references: FxHashMap<NodeIndex, DeclarationDescriptor>,
    resolved_calls: FxHashMap<NodeIndex, Rc<ResolvedCall>>,
    declarations: FxHashMap<NodeIndex, DeclarationDescriptor>,
    smart_casts: FxHashMap<NodeIndex, KType>,
    resolution_scopes: FxHashMap<NodeIndex, Rc<LexicalScope>>,
    diagnostics: Vec<Diagnostic>,
}

pub struct BindingTrace {
    debug_name: String,
    parent: Option<Rc<BindingTrace>>,
    data: RefCell<BindingData>,
}

macro_rules! slice_accessors {
    ($($field:ident: $value:ty => $get:ident, $record:ident;)+) => {
        $(
            pub fn $get(&self, node: NodeIndex) -> Option<$value> {
                if let Some(value) = self.data.borrow().$field.get(&node) {
                    return Some(value.clone());
                }
                self.parent.as_ref().and_then(|parent| parent.$get(node))
            }

            pub fn $record(&self, node: NodeIndex, value: $value) {
                self.data.borrow_mut().$field.insert(node, value);
            }
        )+
    };
}

impl BindingTrace {
    pub fn new(debug_name: impl Into<String>) -> Rc<Self> {
        Rc::new(BindingTrace {
            debug_name: debug_name.into(),
            parent: None,
            data: RefCell::default(),
        })
    }

    /// A trace whose writes stay local until [`BindingTrace::commit`].
    pub fn temporary(parent: &Rc<BindingTrace>, debug_name: impl Into<String>) -> Rc<Self> {
        Rc::new(BindingTrace {
            debug_name: debug_name.into(),
            parent: Some(Rc::clone(parent)),
            data: RefCell::default(),
        })
    }

    pub fn is_temporary(&self) -> bool {
        self.parent.is_some()
    }

    slice_accessors! {
        expression_types: KType => expression_type, record_expression_type;
        references: DeclarationDescriptor => reference, record_reference;
        resolved_calls: Rc<ResolvedCall> => resolved_call, record_resolved_call;
        declarations: DeclarationDescriptor => declaration, record_declaration;
        smart_casts: KType => smart_cast, record_smart_cast;
        resolution_scopes: Rc<LexicalScope> => resolution_scope, record_resolution_scope;
    }

    /// Report a diagnostic. A second report with the same code at the
    /// same offset is dropped.
    pub fn report(&self, diagnostic: Diagnostic) {
        let mut data = self.data.borrow_mut();
        let duplicate = data
            .diagnostics
            .iter()
            .any(|existing| existing.start == diagnostic.start && existing.code == diagnostic.code);
        if !duplicate {
            trace!(trace = %self.debug_name, code = diagnostic.code, message = %diagnostic.message_text, "diagnostic");
            data.diagnostics.push(diagnostic);
        }
    }

    /// Diagnostics recorded in this trace, not counting the parent's.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.data.borrow().diagnostics.clone()
    }

    pub fn has_errors(&self) -> bool {
        self.data.borrow().diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Move every local record into the parent. Later reads still see them
    /// through the parent; committing again is a no-op.
    ///
    /// # Panics
    ///
    /// If this trace has no parent.
    pub fn commit(&self) {
        let Some(parent) = &self.parent else {
            panic!("commit on root trace {}", self.debug_name);
        };
        let data = std::mem::take(&mut *self.data.borrow_mut());
        trace!(
            from = %self.debug_name,
            to = %parent.debug_name,
            diagnostics = data.diagnostics.len(),
            "committing trace"
        );
        let mut target = parent.data.borrow_mut();
        target.expression_types.extend(data.expression_types);
        target.references.extend(data.references);
        target.resolved_calls.extend(data.resolved_calls);
        target.declarations.extend(data.declarations);
        target.smart_casts.extend(data.smart_casts);
        target.resolution_scopes.extend(data.resolution_scopes);
        drop(target);
        for diagnostic in data.diagnostics {
            parent.report(diagnostic);
        }
    }
}

impl fmt::Debug for BindingTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.borrow();
        f.debug_struct("BindingTrace")
            .field("name", &self.debug_name)
            .field("temporary", &self.parent.is_some())
            .field("types", &data.expression_types.len())
            .field("calls", &data.resolved_calls.len())
            .field("diagnostics", &data.diagnostics.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/trace_tests.rs"]
mod trace_tests;
