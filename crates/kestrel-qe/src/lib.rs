#![doc = include_str!("../README.md")]

//! Model-based projection and its building blocks.
//!
//! The free functions below are the public entry points. They validate their
//! arguments before building any term, so an `InvalidArgument` error leaves
//! the manager untouched.

mod arith;
pub mod config;
pub mod error;
mod euf;
pub mod implicant;
pub mod light;
pub mod linear;
pub mod mbp;

use kestrel_core::{Model, TermId, TermManager};

pub use config::{LightConfig, MbpConfig};
pub use error::QeError;
pub use light::LightOutcome;
pub use mbp::{project_with_config, MbpStats, Projection, ProjectionRule};

/// Remove variables with a defining conjunct from `fml`, shrinking `vars`.
pub fn light_eliminate(
    mgr: &mut TermManager,
    vars: &mut Vec<TermId>,
    fml: TermId,
) -> Result<TermId, QeError> {
    light_eliminate_with(mgr, &LightConfig::default(), vars, fml).map(|out| out.formula)
}

/// Light elimination with explicit options, also returning the definitions
/// that were substituted.
pub fn light_eliminate_with(
    mgr: &mut TermManager,
    config: &LightConfig,
    vars: &mut Vec<TermId>,
    fml: TermId,
) -> Result<LightOutcome, QeError> {
    mbp::validate_vars(mgr, vars)?;
    light::eliminate(mgr, config, vars, fml)
}

/// Literals true under `model` that entail `facts`.
pub fn implicant(
    mgr: &mut TermManager,
    model: &Model,
    facts: &[TermId],
) -> Result<Vec<TermId>, QeError> {
    implicant::implicant(mgr, model, facts)
}

/// Generalize `model` to the conjunction of an implicant of `fml`.
pub fn model_extrapolate(
    mgr: &mut TermManager,
    model: &Model,
    fml: TermId,
) -> Result<TermId, QeError> {
    let facts = mgr.flatten_and(&[fml])?;
    let literals = implicant::implicant(mgr, model, &facts)?;
    Ok(mgr.mk_and(&literals)?)
}

/// Project `vars` out of `fml` with the default options.
pub fn project(
    mgr: &mut TermManager,
    model: &Model,
    vars: &[TermId],
    fml: TermId,
) -> Result<Projection, QeError> {
    project_with_config(mgr, model, vars, fml, &MbpConfig::default(), false)
}

/// Like [`project`], also returning a witness per eliminated variable.
pub fn project_skolem(
    mgr: &mut TermManager,
    model: &Model,
    vars: &[TermId],
    fml: TermId,
) -> Result<Projection, QeError> {
    project_with_config(mgr, model, vars, fml, &MbpConfig::default(), true)
}
