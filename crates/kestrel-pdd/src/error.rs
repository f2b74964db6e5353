use kestrel_core::LimitExceeded;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PddError {
    #[error("Cancelled: {0}")]
    Cancelled(#[from] LimitExceeded),
    #[error("No fixpoint after {rounds} rounds")]
    RoundLimit { rounds: usize },
}
