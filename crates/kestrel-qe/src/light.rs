//! Light elimination: model-free removal of variables with a defining
//! conjunct (`v = t`, `v`, `not v`, or a solvable linear equation).

use indexmap::IndexMap;
use tracing::debug;

use kestrel_core::{TermId, TermKind, TermManager, Trail};

use crate::config::LightConfig;
use crate::error::QeError;
use crate::linear::{self, ArithLit, Cmp};

/// Result of light elimination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightOutcome {
    pub formula: TermId,
    /// Definition substituted for each eliminated variable. Definitions only
    /// mention variables that were not eliminated.
    pub definitions: IndexMap<TermId, TermId>,
}

impl LightOutcome {
    /// Keep the formula and every definition alive on `trail`.
    pub fn keep(&self, mgr: &mut TermManager, trail: &mut Trail) {
        trail.push(mgr, self.formula);
        for &def in self.definitions.values() {
            trail.push(mgr, def);
        }
    }
}

fn definition(
    mgr: &mut TermManager,
    config: &LightConfig,
    var: TermId,
    conjunct: TermId,
) -> Result<Option<TermId>, QeError> {
    if conjunct == var {
        return Ok(Some(mgr.mk_true()));
    }
    match mgr.kind(conjunct).clone() {
        TermKind::Not(inner) if inner == var => Ok(Some(mgr.mk_false())),
        TermKind::Eq(a, b) => {
            if a == var && !mgr.contains(b, var) {
                return Ok(Some(b));
            }
            if b == var && !mgr.contains(a, var) {
                return Ok(Some(a));
            }
            if !config.arith_solve || !mgr.sort(var).is_arith() {
                return Ok(None);
            }
            let lit = match ArithLit::from_term(mgr, conjunct) {
                Some(lit) if lit.cmp == Cmp::Eq => lit,
                _ => return Ok(None),
            };
            match linear::solve_for(mgr, &lit.expr, var) {
                Some(solution) => Ok(Some(solution.to_term(mgr, &lit.sort)?)),
                None => Ok(None),
            }
        }
        _ => Ok(None),
    }
}

/// Eliminate every variable of `vars` that has a defining top-level
/// conjunct in `fml`, removing it from `vars`. The result is equivalent to
/// `fml` with the eliminated variables existentially quantified.
pub fn eliminate(
    mgr: &mut TermManager,
    config: &LightConfig,
    vars: &mut Vec<TermId>,
    fml: TermId,
) -> Result<LightOutcome, QeError> {
    let mut formula = fml;
    let mut definitions: IndexMap<TermId, TermId> = IndexMap::new();
    'outer: loop {
        let conjuncts = mgr.flatten_and(&[formula])?;
        for vi in 0..vars.len() {
            let var = vars[vi];
            for (ci, &conjunct) in conjuncts.iter().enumerate() {
                let Some(def) = definition(mgr, config, var, conjunct)? else {
                    continue;
                };
                debug!(var = %mgr.display(var), def = %mgr.display(def), "light elimination");
                let rest: Vec<TermId> = conjuncts
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| i != ci)
                    .map(|(_, &c)| c)
                    .collect();
                let remaining = mgr.mk_and(&rest)?;
                let mut sub = IndexMap::new();
                sub.insert(var, def);
                formula = mgr.substitute(remaining, &sub)?;
                for value in definitions.values_mut() {
                    *value = mgr.substitute(*value, &sub)?;
                }
                definitions.insert(var, def);
                vars.remove(vi);
                continue 'outer;
            }
        }
        break;
    }
    Ok(LightOutcome {
        formula,
        definitions,
    })
}
