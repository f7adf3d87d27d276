//! Deferred values and memoized lookups.
//!
//! Both types compute outside of any lock and publish with
//! first-writer-wins: if two threads race, both may run the computation but
//! only the first stored result is ever observed, and the loser's value is
//! dropped. Computations must therefore be idempotent.

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use rustc_hash::FxBuildHasher;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

type Thunk<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// A value computed at most once on first access.
///
/// The initializer is released after the value is published, so a thunk
/// that captures its own owner does not keep it alive forever.
pub struct LazyValue<T> {
    cell: OnceCell<T>,
    init: Mutex<Option<Thunk<T>>>,
}

impl<T> LazyValue<T> {
    /// Defer `init` until the first call to [`LazyValue::get`].
    pub fn new(init: impl Fn() -> T + Send + Sync + 'static) -> Self {
        LazyValue {
            cell: OnceCell::new(),
            init: Mutex::new(Some(Arc::new(init))),
        }
    }

    /// An already computed value.
    pub fn ready(value: T) -> Self {
        LazyValue {
            cell: OnceCell::with_value(value),
            init: Mutex::new(None),
        }
    }

    pub fn get(&self) -> &T {
        if let Some(value) = self.cell.get() {
            return value;
        }
        let thunk = self.init.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(thunk) = thunk {
            // Losing the race is fine; the stored value wins.
            let _ = self.cell.set(thunk());
            self.init.lock().unwrap_or_else(PoisonError::into_inner).take();
        }
        // The thunk is only taken after a value has been stored.
        match self.cell.get() {
            Some(value) => value,
            None => unreachable!("lazy value published without a value"),
        }
    }

    pub fn is_computed(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: fmt::Debug> fmt::Debug for LazyValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("LazyValue").field(value).finish(),
            None => f.write_str("LazyValue(<pending>)"),
        }
    }
}

/// A memoized function from `K` to an optional `V`.
///
/// Each key is in one of three states: not yet computed, computed-present,
/// or computed-absent. An absent result is cached just like a present one,
/// so a missing class is looked up only once.
pub struct MemoizedFunction<K, V> {
    cache: DashMap<K, Option<V>, FxBuildHasher>,
    compute: Box<dyn Fn(&K) -> Option<V> + Send + Sync>,
}

impl<K, V> MemoizedFunction<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(compute: impl Fn(&K) -> Option<V> + Send + Sync + 'static) -> Self {
        MemoizedFunction {
            cache: DashMap::with_hasher(FxBuildHasher),
            compute: Box::new(compute),
        }
    }

    /// Return the memoized result for `key`, computing it on first use.
    pub fn invoke(&self, key: &K) -> Option<V> {
        if let Some(cached) = self.cache.get(key) {
            return cached.value().clone();
        }
        // No shard lock is held here, so `compute` may re-enter `invoke`
        // for other keys.
        let computed = (self.compute)(key);
        self.cache
            .entry(key.clone())
            .or_insert(computed)
            .value()
            .clone()
    }

    /// Whether `key` has been computed (present or absent).
    pub fn is_computed(&self, key: &K) -> bool {
        self.cache.contains_key(key)
    }

    /// Keys whose computation produced a value.
    pub fn computed_values(&self) -> Vec<V> {
        self.cache
            .iter()
            .filter_map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl<K: Eq + Hash, V> fmt::Debug for MemoizedFunction<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizedFunction")
            .field("entries", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/lazy_tests.rs"]
mod lazy_tests;
