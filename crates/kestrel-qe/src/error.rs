use kestrel_core::{EvalError, LimitExceeded, TermError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QeError {
    #[error("Invalid argument at position {index}: {reason}")]
    InvalidArgument { index: usize, reason: String },
    #[error("{what} is false under the model")]
    NotSatisfied { what: String },
    #[error("Cancelled: {0}")]
    Cancelled(#[from] LimitExceeded),
    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),
    #[error("Term error: {0}")]
    Term(#[from] TermError),
}
