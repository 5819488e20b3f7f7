//! Model to dispatcher compilation.
//!
//! Compilation runs in two halves. [`Compiler::plan`] assigns compact ids to
//! states and lowers every state's transitions into a [`BranchPlan`]; a
//! [`Backend`] then turns the resulting [`MachinePlan`] into a callable
//! routine. The proc macro reuses the first half and emits Rust source for
//! the second.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHasher};

use crate::backend::{Backend, TableBackend, TransitionFunction};
use crate::cache::DispatcherCache;
use crate::error::{Error, Result};
use crate::machine::Machine;
use crate::model::{Fingerprint, Model, State, StateValue};
use crate::switch::{Strategy, SwitchMap};
use crate::token::{Token, TokenKind, TokenValue};

/// Compact state identity used by compiled routines.
pub type StateId = u32;

pub const EXIT_ID: StateId = 0;
pub const INIT_ID: StateId = 1;

pub const DEFAULT_MAX_DELTA: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    max_delta: u32,
    strategy: Strategy,
    kinds: Vec<TokenKind>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_delta: DEFAULT_MAX_DELTA,
            strategy: Strategy::Auto,
            kinds: TokenKind::ALL.to_vec(),
        }
    }
}

impl CompilerConfig {
    /// Largest hash span (and gap) a dense table may cover.
    pub fn with_max_delta(mut self, max_delta: u32) -> Self {
        self.max_delta = max_delta;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Restricts the token kinds this compiler accepts.
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = TokenKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    pub fn max_delta(&self) -> u32 {
        self.max_delta
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn supports(&self, kind: TokenKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// Bidirectional mapping between state values and their ids.
#[derive(Debug, Clone)]
pub struct Translation<S> {
    from: Vec<S>,
    to: FxHashMap<S, StateId>,
}

impl<S: StateValue> Translation<S> {
    /// Builds a translation from values indexed by id: exit first, then init,
    /// then every other state.
    pub fn from_values(values: Vec<S>) -> Result<Self> {
        if values.len() < 2 {
            return Err(Error::ModelCompilation(format!(
                "a translation needs an exit and an initial state, got {} values",
                values.len()
            )));
        }
        let mut to = FxHashMap::with_capacity_and_hasher(values.len(), Default::default());
        for (id, value) in values.iter().enumerate() {
            if to.insert(value.clone(), id as StateId).is_some() {
                return Err(Error::ModelCompilation(format!("state {value:?} is listed twice")));
            }
        }
        Ok(Self { from: values, to })
    }

    fn of_model<T: TokenValue>(model: &Model<S, T>) -> Result<Self> {
        let values = [model.exit(), model.init()]
            .into_iter()
            .chain(model.states().iter().map(State::value))
            .cloned()
            .collect();
        Self::from_values(values)
    }

    pub fn value(&self, id: StateId) -> Option<&S> {
        self.from.get(id as usize)
    }

    /// The value for `id`, or exit's value for ids outside the table.
    pub fn resolve(&self, id: StateId) -> &S {
        match self.from.get(id as usize) {
            Some(value) => value,
            None => &self.from[EXIT_ID as usize],
        }
    }

    pub fn id(&self, value: &S) -> Option<StateId> {
        self.to.get(value).copied()
    }

    /// Values ordered by id.
    pub fn values(&self) -> &[S] {
        &self.from
    }

    pub fn len(&self) -> usize {
        self.from.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_empty()
    }

    fn require(&self, value: &S) -> Result<StateId> {
        self.id(value).ok_or_else(|| {
            let message = format!("state {value:?} has no id");
            tracing::error!(%message, "internal compiler invariant violated");
            Error::ModelCompilation(message)
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeArm<T> {
    pub start: T,
    pub end: T,
    pub target: StateId,
}

/// Lowered branch logic of one state.
#[derive(Debug, Clone)]
pub enum BranchPlan<T> {
    /// No conditional transitions.
    Jump(StateId),
    /// One single-value test.
    Single {
        value: T,
        target: StateId,
        fallback: StateId,
    },
    /// A hash switch over explicit values and range boundaries, then the
    /// ranges in insertion order, then the fallback.
    Switch {
        map: SwitchMap<T, StateId>,
        ranges: Vec<RangeArm<T>>,
        fallback: StateId,
    },
}

impl<T: TokenValue> BranchPlan<T> {
    #[inline]
    pub fn transit(&self, token: &T) -> StateId {
        match self {
            Self::Jump(target) => *target,
            Self::Single {
                value,
                target,
                fallback,
            } => {
                if value.same(token) {
                    *target
                } else {
                    *fallback
                }
            }
            Self::Switch {
                map,
                ranges,
                fallback,
            } => {
                if let Some(target) = map.find(token) {
                    return *target;
                }
                ranges
                    .iter()
                    .find(|arm| crate::token::within(token, &arm.start, &arm.end))
                    .map_or(*fallback, |arm| arm.target)
            }
        }
    }
}

/// Branch plans of a whole machine, indexed by state id.
#[derive(Debug, Clone)]
pub struct MachinePlan<T> {
    branches: Vec<BranchPlan<T>>,
}

impl<T: TokenValue> MachinePlan<T> {
    pub fn kind(&self) -> TokenKind {
        T::KIND
    }

    pub fn branches(&self) -> &[BranchPlan<T>] {
        &self.branches
    }

    pub fn branch(&self, state: StateId) -> Option<&BranchPlan<T>> {
        self.branches.get(state as usize)
    }
}

impl<T: TokenValue> TransitionFunction<T> for MachinePlan<T> {
    #[inline]
    fn transit(&self, state: StateId, token: &T) -> StateId {
        match self.branches.get(state as usize) {
            Some(branch) => branch.transit(token),
            None => EXIT_ID,
        }
    }
}

struct Compiled<S, T> {
    routine: Arc<dyn TransitionFunction<T>>,
    translation: Translation<S>,
    fingerprint: Option<Fingerprint>,
}

/// A compiled routine bundled with its id translation. Cloning is cheap.
pub struct Dispatcher<S, T> {
    inner: Arc<Compiled<S, T>>,
}

impl<S, T> Clone for Dispatcher<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: StateValue, T: TokenValue> Dispatcher<S, T> {
    /// Wraps a routine whose ids index `values`: exit at 0, init at 1.
    pub fn new(routine: impl TransitionFunction<T> + 'static, values: Vec<S>) -> Result<Self> {
        let translation = Translation::from_values(values)?;
        Ok(Self::from_parts(Arc::new(routine), translation, None))
    }

    pub(crate) fn from_parts(
        routine: Arc<dyn TransitionFunction<T>>,
        translation: Translation<S>,
        fingerprint: Option<Fingerprint>,
    ) -> Self {
        Self {
            inner: Arc::new(Compiled {
                routine,
                translation,
                fingerprint,
            }),
        }
    }

    /// Runs the routine once. Ids the translation does not know map to exit.
    #[inline]
    pub fn transit(&self, state: StateId, token: &T) -> StateId {
        let next = self.inner.routine.transit(state, token);
        if (next as usize) < self.inner.translation.len() {
            next
        } else {
            tracing::error!(state, next, "routine returned an unknown state id");
            EXIT_ID
        }
    }

    pub fn init_id(&self) -> StateId {
        INIT_ID
    }

    pub fn exit_id(&self) -> StateId {
        EXIT_ID
    }

    pub fn translation(&self) -> &Translation<S> {
        &self.inner.translation
    }

    pub fn routine(&self) -> &Arc<dyn TransitionFunction<T>> {
        &self.inner.routine
    }

    /// Present for dispatchers compiled from a [`Model`].
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.inner.fingerprint.as_ref()
    }

    pub fn machine(&self) -> Machine<S, T> {
        Machine::new(self.clone())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<S: StateValue, T> std::fmt::Debug for Dispatcher<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("states", &self.inner.translation.from)
            .field("fingerprint", &self.inner.fingerprint)
            .finish_non_exhaustive()
    }
}

/// Turns models into dispatchers through a backend, memoizing results in a
/// [`DispatcherCache`].
pub struct Compiler<B = TableBackend> {
    config: CompilerConfig,
    backend: B,
    cache: Arc<DispatcherCache>,
}

impl Compiler<TableBackend> {
    pub fn new() -> Self {
        Self::with_backend(TableBackend::default())
    }
}

impl Default for Compiler<TableBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Compiler<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            config: CompilerConfig::default(),
            backend,
            cache: Arc::new(DispatcherCache::new()),
        }
    }

    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares a cache with other compilers. Cached dispatchers are keyed by
    /// model only, so a hit may have been produced under another compiler's
    /// strategy or delta; routing is identical either way. Token kind support
    /// is still checked against this compiler before the cache is consulted.
    pub fn with_cache(mut self, cache: Arc<DispatcherCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn cache(&self) -> &Arc<DispatcherCache> {
        &self.cache
    }

    /// Compiles `model`, reusing a cached dispatcher for an identical
    /// fingerprint.
    pub fn compile<S: StateValue, T: TokenValue>(&self, model: &Model<S, T>) -> Result<Dispatcher<S, T>> {
        self.check_kind(model.token_kind())?;
        self.cache.get_or_compile(model, |model| self.compile_uncached(model))
    }

    pub fn compile_uncached<S: StateValue, T: TokenValue>(
        &self,
        model: &Model<S, T>,
    ) -> Result<Dispatcher<S, T>> {
        let (translation, plan) = self.plan(model)?;
        let name = self.routine_name(model.fingerprint(), &translation);
        let routine = self.backend.compile(&name, plan)?;
        tracing::debug!(
            routine = %name,
            states = translation.len(),
            kind = %T::KIND,
            "compiled dispatcher"
        );
        Ok(Dispatcher::from_parts(
            routine,
            translation,
            Some(model.fingerprint().clone()),
        ))
    }

    /// Assigns ids and lowers every state into a branch plan.
    pub fn plan<S: StateValue, T: TokenValue>(
        &self,
        model: &Model<S, T>,
    ) -> Result<(Translation<S>, MachinePlan<T>)> {
        self.check_kind(model.token_kind())?;

        let translation = Translation::of_model(model)?;
        let mut branches = Vec::with_capacity(translation.len());
        branches.push(BranchPlan::Jump(EXIT_ID));
        for state in std::iter::once(model.init_state()).chain(model.states()) {
            branches.push(self.branch(state, &translation)?);
        }
        Ok((translation, MachinePlan { branches }))
    }

    fn branch<S: StateValue, T: TokenValue>(
        &self,
        state: &State<S, T>,
        translation: &Translation<S>,
    ) -> Result<BranchPlan<T>> {
        let fallback = match state.unconditional() {
            Some(transition) => translation.require(transition.target())?,
            None => EXIT_ID,
        };

        let conditional = state.conditional();
        if conditional.is_empty() {
            return Ok(BranchPlan::Jump(fallback));
        }
        if let [only] = conditional
            && let Some(Token::Single(value)) = only.token()
        {
            return Ok(BranchPlan::Single {
                value: value.clone(),
                target: translation.require(only.target())?,
                fallback,
            });
        }

        let mut boundaries = Vec::new();
        let mut explicit = Vec::new();
        let mut ranges = Vec::new();
        for transition in conditional {
            let target = translation.require(transition.target())?;
            let Some(token) = transition.token() else {
                let message = format!("conditional transition of {:?} has no token", state.value());
                tracing::error!(%message, "internal compiler invariant violated");
                return Err(Error::ModelCompilation(message));
            };
            match token {
                Token::Single(value) => explicit.push((value.clone(), target)),
                Token::Set(values) => explicit.extend(values.iter().map(|value| (value.clone(), target))),
                Token::Range { start, end } => {
                    boundaries.push((start.clone(), target));
                    boundaries.push((end.clone(), target));
                    ranges.push(RangeArm {
                        start: start.clone(),
                        end: end.clone(),
                        target,
                    });
                }
            }
        }

        let map = SwitchMap::with_strategy(
            boundaries.into_iter().chain(explicit),
            self.config.max_delta,
            self.config.strategy,
        )?;
        Ok(BranchPlan::Switch {
            map,
            ranges,
            fallback,
        })
    }

    fn check_kind(&self, kind: TokenKind) -> Result<()> {
        if !self.config.supports(kind) || !self.backend.supports(kind) {
            return Err(Error::UnsupportedTokenType(kind));
        }
        Ok(())
    }

    /// Fingerprints ignore declaration order but state ids do not, so the id
    /// order is part of the name the loader dedupes on.
    fn routine_name<S: StateValue>(&self, fingerprint: &Fingerprint, translation: &Translation<S>) -> String {
        let mut hasher = FxHasher::default();
        fingerprint.hash(&mut hasher);
        translation.values().hash(&mut hasher);
        format!(
            "Machine{:016x}{:?}{}",
            hasher.finish(),
            self.config.strategy,
            self.config.max_delta
        )
    }
}
