//! Equation store for polynomial equations `p = 0`.
//!
//! The solver owns the diagram manager and every equation ever added. An
//! equation moves between states but its storage is never dropped, so an
//! [`EqId`] stays valid for the lifetime of the solver.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use kestrel_core::{CancelHandle, ResourceLimit};

use crate::config::SolverConfig;
use crate::error::PddError;
use crate::pdd::{Pdd, PddManager};
use crate::simplifier::{Simplifier, SimplifierStats};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EqId(u32);

impl EqId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum EquationState {
    /// Waiting to be simplified.
    ToSimplify,
    /// Already consumed by basis completion.
    Processed,
    /// Solved for a variable; kept for back-substitution.
    Solved,
    /// Reduced to `0 = 0` or shown redundant.
    Retired,
}

impl EquationState {
    /// Part of the working set.
    pub fn is_live(self) -> bool {
        matches!(self, Self::ToSimplify | Self::Processed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equation {
    id: EqId,
    poly: Pdd,
    state: EquationState,
    solved_var: Option<u32>,
}

impl Equation {
    pub fn id(&self) -> EqId {
        self.id
    }

    pub fn poly(&self) -> Pdd {
        self.poly
    }

    pub fn state(&self) -> EquationState {
        self.state
    }

    /// Variable this equation was solved for, once solved.
    pub fn solved_var(&self) -> Option<u32> {
        self.solved_var
    }
}

#[derive(Debug, Clone)]
pub struct Solver {
    pdd: PddManager,
    equations: Vec<Equation>,
    solved: Vec<EqId>,
    conflict: Option<EqId>,
    config: SolverConfig,
    limit: ResourceLimit,
    stats: SimplifierStats,
    /// Monic forms of every row exlin has derived.
    exlin_rows: HashSet<Pdd>,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        Self::with_manager(PddManager::new(), config)
    }

    /// Solver over polynomials already built in `pdd`.
    pub fn with_manager(pdd: PddManager, config: SolverConfig) -> Self {
        let mut limit = ResourceLimit::new(config.limits);
        if let Some(cancel) = &config.cancel {
            limit = limit.with_cancel(cancel.clone());
        }
        Self {
            pdd,
            equations: Vec::new(),
            solved: Vec::new(),
            conflict: None,
            config,
            limit,
            stats: SimplifierStats::default(),
            exlin_rows: HashSet::new(),
        }
    }

    pub fn pdd(&self) -> &PddManager {
        &self.pdd
    }

    pub fn pdd_mut(&mut self) -> &mut PddManager {
        &mut self.pdd
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.limit.cancel_handle()
    }

    /// Add `p = 0` to the equations waiting for simplification.
    pub fn add(&mut self, p: Pdd) -> EqId {
        self.push(p, EquationState::ToSimplify)
    }

    /// Add `p = 0` as an equation basis completion already consumed.
    pub fn add_processed(&mut self, p: Pdd) -> EqId {
        self.push(p, EquationState::Processed)
    }

    fn push(&mut self, poly: Pdd, state: EquationState) -> EqId {
        let id = EqId(self.equations.len() as u32);
        let state = if self.pdd.is_zero(poly) {
            EquationState::Retired
        } else {
            state
        };
        self.equations.push(Equation {
            id,
            poly,
            state,
            solved_var: None,
        });
        if state.is_live() && self.pdd.is_val(poly) {
            self.set_conflict(id);
        }
        id
    }

    pub fn equation(&self, id: EqId) -> &Equation {
        &self.equations[id.index()]
    }

    pub fn num_equations(&self) -> usize {
        self.equations.len()
    }

    /// Equations in `state`. Solved equations come in the order they were
    /// solved; all others in insertion order.
    pub fn equations(&self, state: EquationState) -> Vec<EqId> {
        if state == EquationState::Solved {
            return self.solved.clone();
        }
        self.equations
            .iter()
            .filter(|e| e.state == state)
            .map(|e| e.id)
            .collect()
    }

    /// Equations still in the working set, in insertion order.
    pub fn live(&self) -> Vec<EqId> {
        self.equations
            .iter()
            .filter(|e| e.state.is_live())
            .map(|e| e.id)
            .collect()
    }

    pub fn is_conflict(&self) -> bool {
        self.conflict.is_some()
    }

    /// The equation that reduced to a non-zero constant, if any.
    pub fn conflict(&self) -> Option<EqId> {
        self.conflict
    }

    /// Accumulated over every [`Solver::simplify`] call.
    pub fn stats(&self) -> &SimplifierStats {
        &self.stats
    }

    /// Simplify the working set to a fixpoint.
    ///
    /// Stops early on a conflict, which [`Solver::is_conflict`] then reports.
    /// A limit violation aborts with [`PddError::Cancelled`], and running out
    /// of rounds with [`PddError::RoundLimit`].
    pub fn simplify(&mut self) -> Result<SimplifierStats, PddError> {
        let cancel = self.limit.cancel_handle();
        self.limit = ResourceLimit::new(self.config.limits).with_cancel(cancel);
        let stats = Simplifier::new(self).run()?;
        self.stats.merge(&stats);
        Ok(stats)
    }

    /// Value of every solved variable in terms of the variables that are
    /// still free, obtained by resolving solved equations newest first.
    pub fn back_substitution(&mut self) -> IndexMap<u32, Pdd> {
        let mut values: IndexMap<u32, Pdd> = IndexMap::new();
        for &id in self.solved.iter().rev() {
            let eq = &self.equations[id.index()];
            let Some(v) = eq.solved_var else {
                continue;
            };
            let (coeff, rest) = self.pdd.split(eq.poly, v);
            let Some(c) = self.pdd.value(coeff).cloned() else {
                continue;
            };
            let mut value = self.pdd.scale(rest, &(-c.recip()));
            for (&w, &s) in &values {
                value = self.pdd.substitute(value, w, s);
            }
            values.insert(v, value);
        }
        values
    }

    pub(crate) fn limit_mut(&mut self) -> &mut ResourceLimit {
        &mut self.limit
    }

    pub(crate) fn set_poly(&mut self, id: EqId, poly: Pdd) {
        self.equations[id.index()].poly = poly;
    }

    pub(crate) fn set_state(&mut self, id: EqId, state: EquationState) {
        self.equations[id.index()].state = state;
    }

    pub(crate) fn mark_solved(&mut self, id: EqId, v: u32) {
        let eq = &mut self.equations[id.index()];
        eq.state = EquationState::Solved;
        eq.solved_var = Some(v);
        self.solved.push(id);
    }

    /// Remember an exlin row by its monic form; false if it was derived
    /// before, even when its equation has since been rewritten or retired.
    pub(crate) fn note_exlin_row(&mut self, monic: Pdd) -> bool {
        self.exlin_rows.insert(monic)
    }

    pub(crate) fn set_conflict(&mut self, id: EqId) {
        if self.conflict.is_none() {
            debug!(equation = %id, "conflict");
            self.conflict = Some(id);
        }
    }
}
