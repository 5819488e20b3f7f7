//! Error types shared by the builder, the compiler and the dispatch tables.

use thiserror::Error;

use crate::token::TokenKind;

pub type Result<T, E = crate::Error> = std::result::Result<T, E>;

/// Errors raised while building or compiling a machine.
///
/// None of these are retryable: each one points at a malformed model, a
/// malformed build sequence, or (for [`Error::ModelCompilation`]) a defect in
/// the compiler itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A builder edit referenced a state in a role it cannot take.
    #[error("invalid state {state}: {reason}")]
    InvalidState { state: String, reason: &'static str },
    /// The accumulated edits do not describe a valid model.
    #[error("invalid model: {0}")]
    InvalidModel(#[from] ModelError),
    /// The compiler or its backend cannot dispatch on this token kind.
    #[error("unsupported token type `{0}`")]
    UnsupportedTokenType(TokenKind),
    /// An internal invariant was violated while compiling a model.
    #[error("model compilation failed: {0}")]
    ModelCompilation(String),
    #[error(transparent)]
    Switch(#[from] SwitchError),
}

impl Error {
    pub(crate) fn invalid_state(state: &impl std::fmt::Debug, reason: &'static str) -> Self {
        Self::InvalidState {
            state: format!("{state:?}"),
            reason,
        }
    }

    pub fn is_defect(&self) -> bool {
        matches!(self, Self::ModelCompilation(_))
    }
}

/// Reasons a [`crate::ModelBuilder::build`] call rejects its input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("initial state is not set")]
    MissingInit,
    #[error("exit state is not set")]
    MissingExit,
    #[error("initial and exit state must be different")]
    InitIsExit,
    #[error("state {state} has more than one unconditional transition")]
    DuplicateUnconditional { state: String },
    #[error("range [{start}, {end}] is empty: start must be less than end")]
    InvalidRange { start: String, end: String },
    #[error("`{0}` tokens cannot be used in range checks")]
    UnorderedRange(TokenKind),
    #[error("set token needs at least two distinct values, got {0}")]
    DegenerateSet(usize),
    #[error("token {token} of state {state} matches more than one transition")]
    AmbiguousToken { state: String, token: String },
    #[error("state {state} is unreachable from the initial state")]
    UnreachableState { state: String },
}

/// Misuse of the dispatch-strategy selector.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchError {
    #[error("cannot create an empty switch map")]
    Empty,
    #[error("max delta must be greater than zero")]
    ZeroDelta,
    #[error("dense table spanning {span} slots exceeds the limit of {limit}")]
    TableTooLarge { span: u64, limit: u64 },
}
