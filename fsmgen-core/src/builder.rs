//! Mutable, validated construction of a [`Model`].

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use rustc_hash::FxHashMap;

use crate::error::{Error, ModelError, Result};
use crate::model::{Model, State, StateValue, Transition, TransitionKind};
use crate::token::{Token, TokenValue};

/// Outgoing edges of one source state, in insertion order.
#[derive(Debug, Clone)]
struct Edges<S, T> {
    conditional: Vec<(S, Token<T>)>,
    unconditional: Vec<S>,
}

impl<S, T> Default for Edges<S, T> {
    fn default() -> Self {
        Self {
            conditional: Vec::new(),
            unconditional: Vec::new(),
        }
    }
}

impl<S: StateValue, T> Edges<S, T> {
    fn drop_target(&mut self, target: &S) {
        self.conditional.retain(|(to, _)| to != target);
        self.unconditional.retain(|to| to != target);
    }
}

/// Accumulates edits and validates them into an immutable [`Model`].
///
/// Mutators fail eagerly on role conflicts and unknown endpoints; structural
/// problems such as malformed tokens or unreachable states are reported by
/// [`ModelBuilder::build`].
#[derive(Debug, Clone)]
pub struct ModelBuilder<S, T> {
    init: Option<S>,
    exit: Option<S>,
    states: Vec<S>,
    edges: FxHashMap<S, Edges<S, T>>,
    allow_unreachable: bool,
}

impl<S, T> Default for ModelBuilder<S, T> {
    fn default() -> Self {
        Self {
            init: None,
            exit: None,
            states: Vec::new(),
            edges: FxHashMap::default(),
            allow_unreachable: false,
        }
    }
}

impl<S: StateValue, T: TokenValue> ModelBuilder<S, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial state. Replacing a previous initial state discards
    /// its outgoing transitions.
    pub fn set_init(&mut self, state: S) -> Result<&mut Self> {
        if self.init.as_ref() == Some(&state) {
            return Ok(self);
        }
        if self.exit.as_ref() == Some(&state) {
            return Err(Error::invalid_state(&state, "already used as the exit state"));
        }
        if self.states.contains(&state) {
            return Err(Error::invalid_state(&state, "already declared as a state"));
        }
        if let Some(previous) = self.init.replace(state.clone()) {
            self.edges.remove(&previous);
        }
        self.edges.entry(state).or_default();
        Ok(self)
    }

    /// Sets the exit state. Replacing a previous exit state discards every
    /// transition that targeted it.
    pub fn set_exit(&mut self, state: S) -> Result<&mut Self> {
        if self.exit.as_ref() == Some(&state) {
            return Ok(self);
        }
        if self.init.as_ref() == Some(&state) {
            return Err(Error::invalid_state(&state, "already used as the initial state"));
        }
        if self.states.contains(&state) {
            return Err(Error::invalid_state(&state, "already declared as a state"));
        }
        if let Some(previous) = self.exit.replace(state) {
            for edges in self.edges.values_mut() {
                edges.drop_target(&previous);
            }
        }
        Ok(self)
    }

    pub fn add_state(&mut self, state: S) -> Result<&mut Self> {
        if self.init.as_ref() == Some(&state) {
            return Err(Error::invalid_state(&state, "is the initial state"));
        }
        if self.exit.as_ref() == Some(&state) {
            return Err(Error::invalid_state(&state, "is the exit state"));
        }
        if !self.states.contains(&state) {
            self.states.push(state.clone());
            self.edges.entry(state).or_default();
        }
        Ok(self)
    }

    /// Removes a state together with its outgoing transitions and every
    /// transition targeting it. Unknown states are ignored.
    pub fn remove_state(&mut self, state: &S) -> &mut Self {
        let Some(position) = self.states.iter().position(|s| s == state) else {
            return self;
        };
        self.states.remove(position);
        self.edges.remove(state);
        for edges in self.edges.values_mut() {
            edges.drop_target(state);
        }
        self
    }

    /// Adds a conditional transition when `token` is given, an unconditional
    /// one otherwise. A conditional transition to an existing target replaces
    /// its token.
    pub fn add_transition(&mut self, from: S, to: S, token: Option<Token<T>>) -> Result<&mut Self> {
        let target_known = self.exit.as_ref() == Some(&to) || self.states.contains(&to);
        let Some(edges) = self.edges.get_mut(&from) else {
            return Err(Error::invalid_state(
                &from,
                "is neither the initial state nor a declared state",
            ));
        };
        if !target_known {
            return Err(Error::invalid_state(
                &to,
                "is neither a declared state nor the exit state",
            ));
        }
        match token {
            Some(token) => match edges.conditional.iter_mut().find(|(target, _)| *target == to) {
                Some(existing) => existing.1 = token,
                None => edges.conditional.push((to, token)),
            },
            None => {
                if !edges.unconditional.contains(&to) {
                    edges.unconditional.push(to);
                }
            }
        }
        Ok(self)
    }

    /// Removes both the conditional and the unconditional transition
    /// `from -> to`.
    pub fn remove_transition(&mut self, from: &S, to: &S) -> &mut Self {
        if let Some(edges) = self.edges.get_mut(from) {
            edges.drop_target(to);
        }
        self
    }

    pub fn remove_transition_kind(&mut self, from: &S, to: &S, kind: TransitionKind) -> &mut Self {
        if let Some(edges) = self.edges.get_mut(from) {
            match kind {
                TransitionKind::Conditional => edges.conditional.retain(|(target, _)| target != to),
                TransitionKind::Unconditional => edges.unconditional.retain(|target| target != to),
            }
        }
        self
    }

    /// Accept states that cannot be reached from the initial state, logging
    /// them instead of failing the build.
    pub fn allow_unreachable(&mut self, allow: bool) -> &mut Self {
        self.allow_unreachable = allow;
        self
    }

    /// Validates the accumulated edits. The builder is reset on success and
    /// left untouched on failure.
    pub fn build(&mut self) -> Result<Model<S, T>> {
        let init = self.init.clone().ok_or(ModelError::MissingInit)?;
        let exit = self.exit.clone().ok_or(ModelError::MissingExit)?;
        if init == exit {
            return Err(ModelError::InitIsExit.into());
        }

        for source in std::iter::once(&init).chain(&self.states) {
            if let Some(edges) = self.edges.get(source) {
                self.check_edges(source, edges)?;
            }
        }
        self.check_reachability(&init)?;

        let init_state = self.freeze(init);
        let states = self.states.iter().map(|state| self.freeze(state.clone())).collect();
        let model = Model::new(init_state, exit, states);
        tracing::debug!(
            states = model.state_count(),
            fingerprint = %model.fingerprint(),
            "built model"
        );
        *self = Self::default();
        Ok(model)
    }

    fn check_edges(&self, source: &S, edges: &Edges<S, T>) -> Result<()> {
        if edges.unconditional.len() > 1 {
            return Err(ModelError::DuplicateUnconditional {
                state: format!("{source:?}"),
            }
            .into());
        }

        let ambiguous = |token: String| ModelError::AmbiguousToken {
            state: format!("{source:?}"),
            token,
        };
        let mut claimed: FxHashMap<i32, Vec<(&T, &S)>> = FxHashMap::default();
        let mut ranges: Vec<(&T, &T)> = Vec::new();
        for (target, token) in &edges.conditional {
            token.validate()?;
            match token {
                Token::Range { start, end } => {
                    let overlapping = ranges.iter().find(|&&(other_start, other_end)| {
                        crate::token::within(start, other_start, other_end)
                            || crate::token::within(other_start, start, end)
                    });
                    if let Some((other_start, other_end)) = overlapping {
                        return Err(ambiguous(format!("{token} and {other_start:?}..={other_end:?}")).into());
                    }
                    ranges.push((start, end));
                }
                Token::Single(_) | Token::Set(_) => {
                    for value in token.values() {
                        let bucket = claimed.entry(value.switch_hash()).or_default();
                        let conflict = bucket
                            .iter()
                            .any(|(seen, owner)| seen.same(value) && *owner != target);
                        if conflict {
                            return Err(ambiguous(format!("{value:?}")).into());
                        }
                        bucket.push((value, target));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_reachability(&self, init: &S) -> Result<()> {
        let mut graph = DiGraph::<(), ()>::new();
        let mut nodes: FxHashMap<&S, NodeIndex> = FxHashMap::default();
        for state in std::iter::once(init).chain(&self.states) {
            nodes.insert(state, graph.add_node(()));
        }
        for (source, edges) in &self.edges {
            let Some(&from) = nodes.get(source) else {
                continue;
            };
            let targets = edges.conditional.iter().map(|(to, _)| to).chain(&edges.unconditional);
            for target in targets {
                if let Some(&to) = nodes.get(target) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        let start = nodes[init];
        let mut reached = vec![false; graph.node_count()];
        let mut bfs = Bfs::new(&graph, start);
        while let Some(node) = bfs.next(&graph) {
            reached[node.index()] = true;
        }

        for state in &self.states {
            if reached[nodes[state].index()] {
                continue;
            }
            if self.allow_unreachable {
                tracing::warn!(state = ?state, "state is unreachable from the initial state");
            } else {
                return Err(ModelError::UnreachableState {
                    state: format!("{state:?}"),
                }
                .into());
            }
        }
        Ok(())
    }

    fn freeze(&self, value: S) -> State<S, T> {
        let (conditional, unconditional) = match self.edges.get(&value) {
            Some(edges) => (
                edges
                    .conditional
                    .iter()
                    .map(|(to, token)| Transition::conditional(to.clone(), token.clone()))
                    .collect(),
                edges.unconditional.first().cloned().map(Transition::unconditional),
            ),
            None => (Vec::new(), None),
        };
        State::new(value, conditional, unconditional)
    }
}
