//! Code-generation backends: turning a [`MachinePlan`] into a callable
//! routine.

use std::any::{Any, TypeId};
use std::sync::{Arc, PoisonError, RwLock};

use rustc_hash::FxHashMap;

use crate::compiler::{MachinePlan, StateId};
use crate::error::Result;
use crate::token::{TokenKind, TokenValue};

/// A compiled `transit(state, token) -> state` routine.
pub trait TransitionFunction<T>: Send + Sync {
    fn transit(&self, state: StateId, token: &T) -> StateId;
}

impl<T, F> TransitionFunction<T> for F
where
    F: Fn(StateId, &T) -> StateId + Send + Sync,
{
    #[inline]
    fn transit(&self, state: StateId, token: &T) -> StateId {
        self(state, token)
    }
}

/// Compiles machine plans into routines.
pub trait Backend: Send + Sync {
    fn supports(&self, kind: TokenKind) -> bool {
        let _ = kind;
        true
    }

    /// `name` identifies the routine; backends may return a previously
    /// compiled routine registered under the same name.
    fn compile<T: TokenValue>(&self, name: &str, plan: MachinePlan<T>) -> Result<Arc<dyn TransitionFunction<T>>>;
}

/// Shared registry of produced values, keyed by name and value type.
#[derive(Default)]
pub struct Loader {
    loaded: RwLock<FxHashMap<(TypeId, String), Arc<dyn Any + Send + Sync>>>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value registered under `name`, producing and registering
    /// it on first request. Producers run outside the lock; when two callers
    /// race, the first registration wins and both receive it.
    pub fn load<V, F>(&self, name: &str, produce: F) -> Result<V>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<V>,
    {
        let key = (TypeId::of::<V>(), name.to_owned());
        if let Some(value) = self.lookup::<V>(&key) {
            return Ok(value);
        }

        let produced = produce()?;
        let mut loaded = self.loaded.write().unwrap_or_else(PoisonError::into_inner);
        let entry = loaded
            .entry(key)
            .or_insert_with(|| Arc::new(produced.clone()) as Arc<dyn Any + Send + Sync>);
        Ok(entry.downcast_ref::<V>().cloned().unwrap_or(produced))
    }

    fn lookup<V: Clone + 'static>(&self, key: &(TypeId, String)) -> Option<V> {
        let loaded = self.loaded.read().unwrap_or_else(PoisonError::into_inner);
        loaded.get(key)?.downcast_ref::<V>().cloned()
    }

    pub fn len(&self) -> usize {
        self.loaded.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader").field("loaded", &self.len()).finish()
    }
}

/// Interprets machine plans directly: dense slot tables and sparse binary
/// searches precomputed by the switch selector.
#[derive(Debug, Default)]
pub struct TableBackend {
    loader: Loader,
}

impl TableBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }
}

impl Backend for TableBackend {
    fn compile<T: TokenValue>(&self, name: &str, plan: MachinePlan<T>) -> Result<Arc<dyn TransitionFunction<T>>> {
        self.loader.load(name, || {
            tracing::debug!(routine = name, branches = plan.branches().len(), "loading table routine");
            Ok(Arc::new(plan) as Arc<dyn TransitionFunction<T>>)
        })
    }
}
