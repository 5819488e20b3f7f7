//! Core model, compiler and runtime types for fsmgen.

pub mod backend;
pub mod builder;
pub mod cache;
pub mod compiler;
pub mod error;
pub mod machine;
pub mod model;
pub mod switch;
pub mod token;

pub use backend::{Backend, Loader, TableBackend, TransitionFunction};
pub use builder::ModelBuilder;
pub use cache::{CacheStats, DispatcherCache};
pub use compiler::{
    BranchPlan, Compiler, CompilerConfig, DEFAULT_MAX_DELTA, Dispatcher, EXIT_ID, INIT_ID,
    MachinePlan, RangeArm, StateId, Translation,
};
pub use error::{Error, ModelError, Result, SwitchError};
pub use machine::Machine;
pub use model::{Fingerprint, Model, State, StateValue, Transition, TransitionKind};
pub use switch::{Comparison, Strategy, SwitchMap};
pub use token::{Token, TokenKind, TokenValue};
