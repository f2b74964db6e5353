#![doc = include_str!("../README.md")]

//! The solver owns every equation; a [`Simplifier`] borrows it for one call
//! and keeps a [`UseList`] from variables to the live equations using them.

pub mod config;
pub mod error;
pub mod pdd;
pub mod simplifier;
pub mod solver;
pub mod use_list;

pub use config::SolverConfig;
pub use error::PddError;
pub use pdd::{Monomial, Pdd, PddManager};
pub use simplifier::{Mutation, Pass, Simplifier, SimplifierStats};
pub use solver::{EqId, Equation, EquationState, Solver};
pub use use_list::UseList;
