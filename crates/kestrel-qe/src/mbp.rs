//! Model-based projection engine.
//!
//! The engine reduces the formula to an implicant under the model and then
//! eliminates the requested variables one at a time, in caller order. Each
//! variable is handled by the first applicable [`ProjectionRule`]; a variable
//! no rule handles stays in the result and is reported as residual.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::{debug, info, warn};

use kestrel_core::{EvalError, Model, ResourceLimit, TermId, TermManager, Value};

use crate::arith;
use crate::config::MbpConfig;
use crate::error::QeError;
use crate::euf;
use crate::implicant::implicant;
use crate::light;

/// How a variable was eliminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProjectionRule {
    /// Removed by the light pre-pass through a defining conjunct.
    Light,
    /// Does not occur in any literal.
    Unbounded,
    /// Solved from a linear equality.
    LinearEquality,
    /// Bounds resolved against the model-selected tightest bound.
    LinearBounds,
    /// Replaced by an equal term.
    Equality,
    /// Replaced by its model value.
    ModelValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MbpStats {
    pub requested: usize,
    pub eliminated: usize,
    pub residual: usize,
    pub literals: usize,
    pub light: usize,
    pub unbounded: usize,
    pub linear_equality: usize,
    pub linear_bounds: usize,
    pub equality: usize,
    pub model_value: usize,
}

impl MbpStats {
    fn record(&mut self, rule: ProjectionRule) {
        self.eliminated += 1;
        let slot = match rule {
            ProjectionRule::Light => &mut self.light,
            ProjectionRule::Unbounded => &mut self.unbounded,
            ProjectionRule::LinearEquality => &mut self.linear_equality,
            ProjectionRule::LinearBounds => &mut self.linear_bounds,
            ProjectionRule::Equality => &mut self.equality,
            ProjectionRule::ModelValue => &mut self.model_value,
        };
        *slot += 1;
    }
}

/// Result of a projection. Every handle in `formula` and `witnesses` is
/// retained for the caller; give them back with [`Projection::release`].
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub formula: TermId,
    /// Witness per eliminated variable (skolem mode only). No witness
    /// mentions an eliminated variable.
    pub witnesses: IndexMap<TermId, TermId>,
    /// Requested variables that could not be eliminated, in request order.
    pub residual: Vec<TermId>,
    pub rules: IndexMap<TermId, ProjectionRule>,
    pub stats: MbpStats,
}

impl Projection {
    pub fn release(self, mgr: &mut TermManager) {
        mgr.release(self.formula);
        for (var, witness) in self.witnesses {
            mgr.release(var);
            mgr.release(witness);
        }
    }
}

pub(crate) struct RuleOutcome {
    pub literals: Vec<TermId>,
    pub witness: TermId,
}

/// Substitute `witness` for `x` in every literal, dropping literals that
/// become `true` and duplicates.
pub(crate) fn substitute_literals(
    mgr: &mut TermManager,
    literals: &[TermId],
    x: TermId,
    witness: TermId,
) -> Result<Vec<TermId>, QeError> {
    let mut sub = IndexMap::new();
    sub.insert(x, witness);
    let rewritten = mgr.substitute_all(literals, &sub)?;
    let out: IndexSet<TermId> = rewritten.into_iter().filter(|&l| !mgr.is_true(l)).collect();
    Ok(out.into_iter().collect())
}

/// Reject non-application and duplicate variables before anything is built.
pub(crate) fn validate_vars(mgr: &TermManager, vars: &[TermId]) -> Result<(), QeError> {
    let mut seen = IndexSet::new();
    for (index, &v) in vars.iter().enumerate() {
        if !mgr.is_app(v) {
            return Err(QeError::InvalidArgument {
                index,
                reason: format!("{} is not an application", mgr.display(v)),
            });
        }
        if !seen.insert(v) {
            return Err(QeError::InvalidArgument {
                index,
                reason: format!("{} occurs more than once", mgr.display(v)),
            });
        }
    }
    Ok(())
}

fn model_value(mgr: &mut TermManager, model: &Model, x: TermId) -> Result<TermId, QeError> {
    match model.value_term(mgr, x) {
        Ok(t) => Ok(t),
        Err(EvalError::Unassigned(_)) => {
            let sort = mgr.sort(x).clone();
            Ok(Value::default_for(&sort).to_term(mgr, &sort)?)
        }
        Err(e) => Err(e.into()),
    }
}

fn project_var(
    mgr: &mut TermManager,
    model: &Model,
    config: &MbpConfig,
    x: TermId,
    literals: &[TermId],
) -> Result<Option<(ProjectionRule, RuleOutcome)>, QeError> {
    if !literals.iter().any(|&l| mgr.contains(l, x)) {
        let witness = model_value(mgr, model, x)?;
        let outcome = RuleOutcome {
            literals: literals.to_vec(),
            witness,
        };
        return Ok(Some((ProjectionRule::Unbounded, outcome)));
    }
    let sort = mgr.sort(x).clone();
    if sort.is_arith() {
        if let Some(out) = arith::linear_equality(mgr, x, literals)? {
            return Ok(Some((ProjectionRule::LinearEquality, out)));
        }
        if let Some(out) = arith::linear_bounds(mgr, model, x, literals)? {
            return Ok(Some((ProjectionRule::LinearBounds, out)));
        }
    }
    if !sort.is_bool() {
        if let Some(out) = euf::equality(mgr, model, x, literals)? {
            return Ok(Some((ProjectionRule::Equality, out)));
        }
        if !config.model_value_fallback {
            return Ok(None);
        }
        warn!(var = %mgr.display(x), "no projection rule applies, using model value");
    }
    let witness = model_value(mgr, model, x)?;
    let literals = substitute_literals(mgr, literals, x, witness)?;
    Ok(Some((
        ProjectionRule::ModelValue,
        RuleOutcome { literals, witness },
    )))
}

/// Project `vars` out of `fml` under `model`.
///
/// With `skolem` set, the witness of every eliminated variable is returned
/// in [`Projection::witnesses`].
pub fn project_with_config(
    mgr: &mut TermManager,
    model: &Model,
    vars: &[TermId],
    fml: TermId,
    config: &MbpConfig,
    skolem: bool,
) -> Result<Projection, QeError> {
    validate_vars(mgr, vars)?;
    if !model.is_true(mgr, fml)? {
        return Err(QeError::NotSatisfied {
            what: "formula".to_string(),
        });
    }
    let mut limit = ResourceLimit::new(config.limits);
    if let Some(cancel) = &config.cancel {
        limit = limit.with_cancel(cancel.clone());
    }

    let mut stats = MbpStats {
        requested: vars.len(),
        ..MbpStats::default()
    };
    let mut witnesses: IndexMap<TermId, TermId> = IndexMap::new();
    let mut rules: IndexMap<TermId, ProjectionRule> = IndexMap::new();
    let mut pending = vars.to_vec();
    let mut formula = fml;

    if config.light_pre_pass && !pending.is_empty() {
        let out = light::eliminate(mgr, &config.light, &mut pending, fml)?;
        formula = out.formula;
        for (var, def) in out.definitions {
            debug!(var = %mgr.display(var), rule = ?ProjectionRule::Light, "eliminated");
            witnesses.insert(var, def);
            rules.insert(var, ProjectionRule::Light);
            stats.record(ProjectionRule::Light);
        }
    }

    let mut literals = implicant(mgr, model, &[formula])?;
    let mut residual = Vec::new();
    for &x in &pending {
        limit.check("model-based projection")?;
        match project_var(mgr, model, config, x, &literals)? {
            Some((rule, outcome)) => {
                debug!(var = %mgr.display(x), ?rule, witness = %mgr.display(outcome.witness), "eliminated");
                let mut sub = IndexMap::new();
                sub.insert(x, outcome.witness);
                for value in witnesses.values_mut() {
                    *value = mgr.substitute(*value, &sub)?;
                }
                witnesses.insert(x, outcome.witness);
                rules.insert(x, rule);
                stats.record(rule);
                literals = outcome.literals;
            }
            None => {
                debug!(var = %mgr.display(x), "left in place");
                residual.push(x);
            }
        }
    }

    let result = mgr.mk_and(&literals)?;
    stats.literals = literals.len();
    stats.residual = residual.len();
    if !skolem {
        witnesses.clear();
    }
    mgr.retain(result);
    for (&var, &witness) in &witnesses {
        mgr.retain(var);
        mgr.retain(witness);
    }
    info!(
        requested = stats.requested,
        eliminated = stats.eliminated,
        residual = stats.residual,
        literals = stats.literals,
        "model-based projection finished"
    );
    Ok(Projection {
        formula: result,
        witnesses,
        residual,
        rules,
        stats,
    })
}
