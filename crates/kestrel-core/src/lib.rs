#![doc = include_str!("../README.md")]

//! Term substrate shared by the projection and polynomial cores.
//!
//! Terms are interned in a [`TermManager`] and never mutated. Models evaluate
//! terms to [`Value`]s. [`ResourceLimit`] provides the cancellation points the
//! cores consult inside their main loops.

pub mod limits;
pub mod model;
pub mod printer;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest_generators;
pub mod sort;
pub mod term;

pub use limits::{CancelHandle, LimitConfig, LimitExceeded, ResourceLimit};
pub use model::{EvalError, FuncInterp, Model, Value};
pub use printer::to_smtlib;
pub use sort::Sort;
pub use term::{FuncDecl, FuncId, TermError, TermId, TermKind, TermManager, TermNode, Trail};
