//! The runtime handle around a compiled dispatcher.

use std::borrow::Borrow;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::compiler::{Dispatcher, EXIT_ID, INIT_ID, StateId};
use crate::model::StateValue;
use crate::token::TokenValue;

/// Seed of the rolling hash computed by [`Machine::stamp`].
pub const STAMP_SEED: i64 = 1;

/// Returned by [`Machine::stamp`] when a run reaches the exit state.
pub const EXIT_STAMP: i64 = -1;

/// A machine instance: a shared dispatcher plus the id of the current state.
///
/// [`Machine::step`], [`Machine::state`] and [`Machine::reset`] serialize on
/// an internal mutex. [`Machine::run`] and [`Machine::stamp`] work on a local
/// copy starting from the initial state and never observe or modify the
/// current state.
pub struct Machine<S, T> {
    dispatcher: Dispatcher<S, T>,
    current: Mutex<StateId>,
}

impl<S: StateValue, T: TokenValue> Machine<S, T> {
    pub fn new(dispatcher: Dispatcher<S, T>) -> Self {
        Self {
            dispatcher,
            current: Mutex::new(INIT_ID),
        }
    }

    /// Advances the current state by one token and returns the new state.
    pub fn step(&self, token: &T) -> &S {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = self.dispatcher.transit(*current, token);
        self.dispatcher.translation().resolve(*current)
    }

    /// Folds `tokens` from the initial state, stopping at exit.
    pub fn run<I>(&self, tokens: I) -> &S
    where
        I: IntoIterator,
        I::Item: Borrow<T>,
    {
        let mut state = INIT_ID;
        for token in tokens {
            state = self.dispatcher.transit(state, token.borrow());
            if state == EXIT_ID {
                break;
            }
        }
        self.dispatcher.translation().resolve(state)
    }

    /// Rolling hash `h * 31 + id` over every visited state id, seeded with
    /// [`STAMP_SEED`]. Returns [`EXIT_STAMP`] as soon as exit is reached.
    pub fn stamp<I>(&self, tokens: I) -> i64
    where
        I: IntoIterator,
        I::Item: Borrow<T>,
    {
        let mut state = INIT_ID;
        let mut hash = STAMP_SEED;
        for token in tokens {
            state = self.dispatcher.transit(state, token.borrow());
            if state == EXIT_ID {
                return EXIT_STAMP;
            }
            hash = hash.wrapping_mul(31).wrapping_add(i64::from(state));
        }
        hash
    }

    pub fn state(&self) -> &S {
        self.dispatcher.translation().resolve(self.state_id())
    }

    pub fn state_id(&self) -> StateId {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_terminated(&self) -> bool {
        self.state_id() == EXIT_ID
    }

    pub fn reset(&self) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = INIT_ID;
    }

    pub fn dispatcher(&self) -> &Dispatcher<S, T> {
        &self.dispatcher
    }
}

impl<S: StateValue, T: TokenValue> Clone for Machine<S, T> {
    /// A new machine on the same dispatcher, positioned at the same state.
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            current: Mutex::new(self.state_id()),
        }
    }
}

impl<S: StateValue, T: TokenValue> fmt::Debug for Machine<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("state", self.state())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
