//! Value interner for compact table serialization.
//!
//! Interning assigns each distinct value a dense `u32` id so that metadata
//! records can refer to strings and qualified names by index instead of
//! repeating them.
//!
//! An interner may be chained to a parent. The child consults the parent
//! before allocating, and its own ids continue where the parent's left off,
//! so a per-class table can extend a module-wide table without renumbering.
//!
//! Interning is single-writer: a parent must not grow while a child created
//! from it is in use. The child records the parent's size at construction and
//! asserts it on every call.

use rustc_hash::FxHashMap;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug)]
struct InternerState<T> {
    ids: FxHashMap<T, u32>,
    values: Vec<T>,
}

impl<T> Default for InternerState<T> {
    fn default() -> Self {
        InternerState {
            ids: FxHashMap::default(),
            values: Vec::new(),
        }
    }
}

/// Assigns stable, densely increasing ids to values.
///
/// # Example
/// ```
/// use kite_common::Interner;
/// use std::sync::Arc;
///
/// let module = Arc::new(Interner::new());
/// assert_eq!(module.intern("kite".to_string()), 0);
/// assert_eq!(module.intern("io".to_string()), 1);
///
/// let class = Interner::with_parent(Arc::clone(&module));
/// assert_eq!(class.intern("kite".to_string()), 0); // found in parent
/// assert_eq!(class.intern("println".to_string()), 2); // continues after parent
/// ```
#[derive(Debug)]
pub struct Interner<T> {
    parent: Option<Arc<Interner<T>>>,
    /// First id handed out by this interner.
    first_index: u32,
    /// Parent's local size when this interner was created.
    parent_local_size: usize,
    state: RwLock<InternerState<T>>,
}

impl<T> Default for Interner<T>
where
    T: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Interner<T>
where
    T: Eq + Hash + Clone,
{
    /// Create a root interner whose ids start at zero.
    pub fn new() -> Self {
        Interner {
            parent: None,
            first_index: 0,
            parent_local_size: 0,
            state: RwLock::new(InternerState::default()),
        }
    }

    /// Create an interner that extends `parent`.
    ///
    /// The first id of the child is `parent.first_index() + parent.local_size()`.
    pub fn with_parent(parent: Arc<Interner<T>>) -> Self {
        let parent_local_size = parent.local_size();
        let first_index = parent.first_index + parent_local_size as u32;
        Interner {
            parent: Some(parent),
            first_index,
            parent_local_size,
            state: RwLock::new(InternerState::default()),
        }
    }

    /// Intern `value`, returning its id.
    ///
    /// The parent chain is consulted first; a fresh id is allocated only when
    /// neither an ancestor nor this interner has seen the value.
    pub fn intern(&self, value: T) -> u32 {
        if let Some(id) = self.find(&value) {
            return id;
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        // Another writer may have raced us between find() and write().
        if let Some(&id) = state.ids.get(&value) {
            return id;
        }
        let id = self.first_index + state.values.len() as u32;
        state.values.push(value.clone());
        state.ids.insert(value, id);
        id
    }

    /// Look up the id of `value` without interning it.
    pub fn find(&self, value: &T) -> Option<u32> {
        if let Some(parent) = &self.parent {
            self.check_parent_unchanged(parent);
            if let Some(id) = parent.find(value) {
                return Some(id);
            }
        }
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.ids.get(value).copied()
    }

    /// Resolve an id back to its value, searching ancestors as needed.
    pub fn get(&self, id: u32) -> Option<T> {
        if id < self.first_index {
            return self.parent.as_ref().and_then(|parent| parent.get(id));
        }
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.values.get((id - self.first_index) as usize).cloned()
    }

    /// Values interned by this interner (not its ancestors), in id order.
    pub fn all_interned_objects(&self) -> Vec<T> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.values.clone()
    }

    /// Number of values interned locally.
    pub fn local_size(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).values.len()
    }

    /// First id allocated by this interner.
    pub fn first_index(&self) -> u32 {
        self.first_index
    }

    /// One past the largest id this interner can currently return.
    pub fn next_index(&self) -> u32 {
        self.first_index + self.local_size() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.local_size() == 0
    }

    fn check_parent_unchanged(&self, parent: &Interner<T>) {
        assert_eq!(
            parent.local_size(),
            self.parent_local_size,
            "parent interner grew after a child interner was created from it"
        );
    }
}

#[cfg(test)]
#[path = "../tests/interner_tests.rs"]
mod interner_tests;
