//! Memoized call resolution.
//!
//! The cache keys results by call site and member kind. Each entry keeps
//! the overload resolution results together with the diagnostics reported
//! while producing them, so a second analysis of the same call site in a
//! different trace can replay them. A temporary cache reads through to its
//! parent and is merged into it by [`ResolutionResultsCache::commit`].

use crate::calls::{Call, Candidate, MemberKind, OverloadResolutionResults};
use kite_common::Diagnostic;
use kite_syntax::NodeIndex;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// A generic call whose inference was left open because its expected type
/// was not known yet. The enclosing call completes it once it has chosen
/// the parameter type the value flows into.
#[derive(Clone, Debug)]
pub struct DeferredComputation {
    pub call: Rc<Call>,
    pub candidate: Candidate,
}

#[derive(Clone, Debug)]
pub struct CachedResolution {
    pub results: Rc<OverloadResolutionResults>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Default)]
struct CacheData {
    resolutions: FxHashMap<(NodeIndex, MemberKind), CachedResolution>,
    deferred: FxHashMap<NodeIndex, Rc<DeferredComputation>>,
}

pub struct ResolutionResultsCache {
    parent: Option<Rc<ResolutionResultsCache>>,
    data: RefCell<CacheData>,
}

impl ResolutionResultsCache {
    pub fn new() -> Rc<Self> {
        Rc::new(ResolutionResultsCache {
            parent: None,
            data: RefCell::default(),
        })
    }

    pub fn temporary(parent: &Rc<ResolutionResultsCache>) -> Rc<Self> {
        Rc::new(ResolutionResultsCache {
            parent: Some(Rc::clone(parent)),
            data: RefCell::default(),
        })
    }

    pub fn is_temporary(&self) -> bool {
        self.parent.is_some()
    }

    pub fn record_resolution(&self, call: NodeIndex, kind: MemberKind, resolution: CachedResolution) {
        trace!(node = call.0, ?kind, "caching resolution results");
        self.data.borrow_mut().resolutions.insert((call, kind), resolution);
    }

    pub fn resolution(&self, call: NodeIndex, kind: MemberKind) -> Option<CachedResolution> {
        if let Some(found) = self.data.borrow().resolutions.get(&(call, kind)) {
            return Some(found.clone());
        }
        self.parent.as_ref()?.resolution(call, kind)
    }

    /// Record the open inference of a function call. Property accesses are
    /// never generic in their own right, so a computation offered for a
    /// property is ignored.
    pub fn record_deferred_computation(&self, call: NodeIndex, kind: MemberKind, computation: DeferredComputation) {
        if kind == MemberKind::Property {
            return;
        }
        self.data.borrow_mut().deferred.insert(call, Rc::new(computation));
    }

    pub fn deferred_computation(&self, call: NodeIndex) -> Option<Rc<DeferredComputation>> {
        if let Some(found) = self.data.borrow().deferred.get(&call) {
            return Some(Rc::clone(found));
        }
        self.parent.as_ref()?.deferred_computation(call)
    }

    /// Merge every local entry into the parent. Entries are keyed, so
    /// committing twice leaves the parent unchanged.
    ///
    /// # Panics
    ///
    /// If this cache has no parent.
    pub fn commit(&self) {
        let Some(parent) = &self.parent else {
            panic!("commit on a root resolution cache");
        };
        let data = self.data.borrow();
        let mut target = parent.data.borrow_mut();
        for (key, resolution) in &data.resolutions {
            target.resolutions.insert(*key, resolution.clone());
        }
        for (node, computation) in &data.deferred {
            target.deferred.insert(*node, Rc::clone(computation));
        }
    }
}

impl fmt::Debug for ResolutionResultsCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.borrow();
        f.debug_struct("ResolutionResultsCache")
            .field("temporary", &self.parent.is_some())
            .field("resolutions", &data.resolutions.len())
            .field("deferred", &data.deferred.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/cache_tests.rs"]
mod cache_tests;
