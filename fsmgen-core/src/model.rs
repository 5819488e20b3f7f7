//! Immutable machine descriptions produced by [`crate::ModelBuilder`].

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::token::{Token, TokenKind, TokenValue};

/// Values usable as machine states.
pub trait StateValue: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<S> StateValue for S where S: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    /// Taken when the token matches.
    Conditional,
    /// Taken when no conditional transition of the state matches.
    Unconditional,
}

#[derive(Debug, Clone)]
pub struct Transition<S, T> {
    target: S,
    token: Option<Token<T>>,
}

impl<S, T> Transition<S, T> {
    pub(crate) fn conditional(target: S, token: Token<T>) -> Self {
        Self {
            target,
            token: Some(token),
        }
    }

    pub(crate) fn unconditional(target: S) -> Self {
        Self {
            target,
            token: None,
        }
    }

    pub fn target(&self) -> &S {
        &self.target
    }

    /// `None` for unconditional transitions.
    pub fn token(&self) -> Option<&Token<T>> {
        self.token.as_ref()
    }

    pub fn kind(&self) -> TransitionKind {
        match self.token {
            Some(_) => TransitionKind::Conditional,
            None => TransitionKind::Unconditional,
        }
    }
}

/// A state and its outgoing transitions. Equality only considers the value.
#[derive(Debug, Clone)]
pub struct State<S, T> {
    value: S,
    conditional: Vec<Transition<S, T>>,
    unconditional: Option<Transition<S, T>>,
}

impl<S: StateValue, T: TokenValue> State<S, T> {
    pub(crate) fn new(
        value: S,
        conditional: Vec<Transition<S, T>>,
        unconditional: Option<Transition<S, T>>,
    ) -> Self {
        Self {
            value,
            conditional,
            unconditional,
        }
    }

    pub fn value(&self) -> &S {
        &self.value
    }

    /// Conditional transitions in insertion order, one per target.
    pub fn conditional(&self) -> &[Transition<S, T>] {
        &self.conditional
    }

    pub fn unconditional(&self) -> Option<&Transition<S, T>> {
        self.unconditional.as_ref()
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition<S, T>> + '_ {
        self.conditional.iter().chain(self.unconditional.as_ref())
    }

    /// Evaluates this state's transitions for `token`: explicit values first,
    /// then ranges in insertion order, then the unconditional fallback.
    pub fn next<'a>(&'a self, token: &T, exit: &'a S) -> &'a S {
        let explicit = self.conditional.iter().find(|transition| {
            transition
                .token
                .as_ref()
                .is_some_and(|t| !t.is_range() && t.matches(token))
        });
        let ranged = || {
            self.conditional.iter().find(|transition| {
                transition
                    .token
                    .as_ref()
                    .is_some_and(|t| t.is_range() && t.matches(token))
            })
        };
        explicit
            .or_else(ranged)
            .or(self.unconditional.as_ref())
            .map_or(exit, |transition| &transition.target)
    }

    fn fragment(&self) -> String {
        let mut edges: Vec<String> = self
            .conditional
            .iter()
            .filter_map(|transition| {
                let token = transition.token.as_ref()?;
                Some(format!("{:?}{}", transition.target, token.canonical()))
            })
            .collect();
        edges.sort();
        let mut fragment = format!("{:?}(", self.value);
        fragment.push_str(&edges.join(","));
        if let Some(fallback) = &self.unconditional {
            fragment.push_str(&format!(";{:?}", fallback.target));
        }
        fragment.push(')');
        fragment
    }
}

impl<S: PartialEq, T> PartialEq for State<S, T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<S: Eq, T> Eq for State<S, T> {}

/// Structural identity of a model, independent of construction order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated, read-only transition model.
#[derive(Debug, Clone)]
pub struct Model<S, T> {
    init: State<S, T>,
    exit: S,
    states: Vec<State<S, T>>,
    index: FxHashMap<S, usize>,
    fingerprint: Fingerprint,
}

impl<S: StateValue, T: TokenValue> Model<S, T> {
    pub(crate) fn new(init: State<S, T>, exit: S, states: Vec<State<S, T>>) -> Self {
        let index = states
            .iter()
            .enumerate()
            .map(|(i, state)| (state.value.clone(), i))
            .collect();

        let mut fragments: Vec<String> = states.iter().map(State::fragment).collect();
        fragments.sort();
        let fingerprint = Fingerprint(format!(
            "{}:{:?}|{}|{}",
            T::KIND,
            exit,
            init.fragment(),
            fragments.join("|")
        ));

        Self {
            init,
            exit,
            states,
            index,
            fingerprint,
        }
    }

    pub fn token_kind(&self) -> TokenKind {
        T::KIND
    }

    pub fn init(&self) -> &S {
        &self.init.value
    }

    pub fn init_state(&self) -> &State<S, T> {
        &self.init
    }

    pub fn exit(&self) -> &S {
        &self.exit
    }

    /// Intermediate states in declaration order. Init and exit are not
    /// included.
    pub fn states(&self) -> &[State<S, T>] {
        &self.states
    }

    /// Looks up any state with outgoing transitions, init included.
    pub fn state(&self, value: &S) -> Option<&State<S, T>> {
        if *value == self.init.value {
            return Some(&self.init);
        }
        self.index.get(value).map(|&i| &self.states[i])
    }

    /// Number of states, init and exit included.
    pub fn state_count(&self) -> usize {
        self.states.len() + 2
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Interprets one transition straight from the model. Unknown states and
    /// the exit state lead to exit.
    pub fn next_state<'a>(&'a self, state: &S, token: &T) -> &'a S {
        match self.state(state) {
            Some(state) => state.next(token, &self.exit),
            None => &self.exit,
        }
    }
}
