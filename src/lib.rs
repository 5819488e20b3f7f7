//! # fsmgen
//!
//! Finite state machines compiled into specialized dispatch routines. A
//! declarative model of states and token predicates is lowered into per-state
//! branch plans (a single equality test, a dense jump table or a sparse
//! binary-searched switch) instead of being interpreted generically.
//!
//! Machines can be compiled at run time with [`Compiler`], or ahead of time
//! with the [`machine`] attribute.
//!
//! ## Runtime compilation
//!
//! ```rust
//! use fsmgen::{Compiler, ModelBuilder, Token};
//!
//! # fn main() -> fsmgen::Result<()> {
//! let mut builder = ModelBuilder::new();
//! builder.set_init("idle")?.set_exit("done")?;
//! builder.add_state("word")?;
//! builder
//!     .add_transition("idle", "word", Some(Token::range('a', 'z')?))?
//!     .add_transition("word", "word", Some(Token::range('a', 'z')?))?
//!     .add_transition("word", "done", Some(Token::single('.')))?;
//! let model = builder.build()?;
//!
//! let machine = Compiler::new().compile(&model)?.machine();
//! assert_eq!(*machine.run("hello".chars()), "word");
//! assert_eq!(*machine.run("hi.".chars()), "done");
//! assert_eq!(machine.stamp("1".chars()), -1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Ahead-of-time generation
//!
//! ```rust
//! #[fsmgen::machine(state = &'static str, token = u8, init = "idle", exit = "done")]
//! #[transition(from = "idle", to = "busy", on = [1, 2, 3])]
//! #[transition(from = "busy", to = "rest", on = 0)]
//! #[transition(from = "busy", to = "done")]
//! #[transition(from = "rest", to = "busy", on = [1, 2, 3])]
//! pub struct Worker;
//!
//! # fn main() -> fsmgen::Result<()> {
//! let machine = Worker::machine()?;
//! assert_eq!(*machine.step(&2), "busy");
//! assert_eq!(*machine.step(&0), "rest");
//! assert_eq!(*machine.step(&1), "busy");
//! assert_eq!(*machine.step(&9), "done");
//! assert_eq!(Worker::transit(Worker::INIT, &3), 2);
//! # Ok(())
//! # }
//! ```

#[doc(inline)]
pub use fsmgen_core::*;
#[doc(inline)]
pub use fsmgen_macros::machine;
