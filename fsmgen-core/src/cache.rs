//! Fingerprint-keyed reuse of compiled dispatchers.

use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use rustc_hash::FxHashMap;

use crate::compiler::Dispatcher;
use crate::error::{Error, Result};
use crate::model::{Fingerprint, Model, StateValue};
use crate::token::TokenValue;

type Key = (TypeId, Fingerprint);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Maps model fingerprints to dispatchers.
///
/// Entries are also keyed by the state and token types, so models of
/// different types that happen to print alike never share a dispatcher.
#[derive(Default)]
pub struct DispatcherCache {
    entries: RwLock<FxHashMap<Key, Arc<dyn Any + Send + Sync>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DispatcherCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the dispatcher cached for `model`'s fingerprint, compiling and
    /// publishing one on a miss.
    ///
    /// `compile` runs without holding the lock. When several callers miss on
    /// the same fingerprint concurrently, the first published dispatcher wins
    /// and every caller receives it.
    pub fn get_or_compile<S, T, F>(&self, model: &Model<S, T>, compile: F) -> Result<Dispatcher<S, T>>
    where
        S: StateValue,
        T: TokenValue,
        F: FnOnce(&Model<S, T>) -> Result<Dispatcher<S, T>>,
    {
        let key = (TypeId::of::<(S, T)>(), model.fingerprint().clone());
        if let Some(entry) = self.read(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return downcast(&entry);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let compiled = compile(model)?;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let published = Arc::clone(entries.entry(key).or_insert_with(|| {
            tracing::debug!(fingerprint = %model.fingerprint(), "published dispatcher");
            Arc::new(compiled) as Arc<dyn Any + Send + Sync>
        }));
        drop(entries);
        downcast(&published)
    }

    /// The cached dispatcher for `model`, if any.
    pub fn get<S: StateValue, T: TokenValue>(&self, model: &Model<S, T>) -> Option<Dispatcher<S, T>> {
        let key = (TypeId::of::<(S, T)>(), model.fingerprint().clone());
        let entry = self.read(&key)?;
        entry.downcast_ref::<Dispatcher<S, T>>().cloned()
    }

    fn read(&self, key: &Key) -> Option<Arc<dyn Any + Send + Sync>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl std::fmt::Debug for DispatcherCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherCache").field("stats", &self.stats()).finish()
    }
}

fn downcast<S: StateValue, T: TokenValue>(entry: &Arc<dyn Any + Send + Sync>) -> Result<Dispatcher<S, T>> {
    entry.downcast_ref::<Dispatcher<S, T>>().cloned().ok_or_else(|| {
        tracing::error!("cache entry holds a dispatcher of another type");
        Error::ModelCompilation("cache entry type mismatch".to_owned())
    })
}
