//! Fixpoint simplification of a polynomial equation set.
//!
//! Each round tries the passes of [`Pass::ORDER`] in turn and restarts as
//! soon as one of them changes the working set. The loop ends when a whole
//! round makes no progress, a conflict is found, or a limit trips.
//!
//! Every change to an equation goes through [`Simplifier::apply`], which also
//! keeps the [`UseList`] in step with the live equations.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use num::rational::BigRational;
use num::traits::Zero;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::PddError;
use crate::pdd::{Monomial, Pdd};
use crate::solver::{EqId, EquationState, Solver};
use crate::use_list::UseList;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Pass {
    /// Solve two-monomial equations with a constant leading coefficient.
    LinearBinary,
    /// Solve linear equations; only while the working set is small.
    LinearFull,
    /// Subtract equations with a shared tail and drop constant multiples.
    Cc,
    /// Set aside equations whose top variable occurs nowhere else.
    Pure,
    /// Eliminate a variable shared by exactly two equations.
    Dual,
    /// Reduce equations in which a solvable variable occurs only linearly.
    Leaf,
    /// Extended linearization.
    Exlin,
}

impl Pass {
    pub const ORDER: [Pass; 7] = [
        Pass::LinearBinary,
        Pass::LinearFull,
        Pass::Cc,
        Pass::Pure,
        Pass::Dual,
        Pass::Leaf,
        Pass::Exlin,
    ];
}

/// Successful pass invocations and related counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimplifierStats {
    pub rounds: usize,
    pub linear_binary: usize,
    pub linear_full: usize,
    pub cc: usize,
    pub pure: usize,
    pub dual: usize,
    pub leaf: usize,
    pub exlin: usize,
    /// Linear equations derived by exlin.
    pub exlin_rows: usize,
    pub solved: usize,
    pub retired: usize,
    pub conflicts: usize,
}

impl SimplifierStats {
    /// Total successful pass invocations.
    pub fn passes(&self) -> usize {
        self.linear_binary + self.linear_full + self.cc + self.pure + self.dual + self.leaf + self.exlin
    }

    pub fn merge(&mut self, other: &Self) {
        self.rounds += other.rounds;
        self.linear_binary += other.linear_binary;
        self.linear_full += other.linear_full;
        self.cc += other.cc;
        self.pure += other.pure;
        self.dual += other.dual;
        self.leaf += other.leaf;
        self.exlin += other.exlin;
        self.exlin_rows += other.exlin_rows;
        self.solved += other.solved;
        self.retired += other.retired;
        self.conflicts += other.conflicts;
    }

    fn record(&mut self, pass: Pass) {
        let slot = match pass {
            Pass::LinearBinary => &mut self.linear_binary,
            Pass::LinearFull => &mut self.linear_full,
            Pass::Cc => &mut self.cc,
            Pass::Pure => &mut self.pure,
            Pass::Dual => &mut self.dual,
            Pass::Leaf => &mut self.leaf,
            Pass::Exlin => &mut self.exlin,
        };
        *slot += 1;
    }
}

/// A change to the equation set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Add a new equation to the working set.
    Insert(Pdd),
    /// Replace the polynomial of a live equation. A processed equation goes
    /// back to the ones waiting for simplification.
    Rewrite(EqId, Pdd),
    /// Move a live equation to the solved list for the given variable.
    Solve(EqId, u32),
    /// Drop a live equation from the working set.
    Retire(EqId),
}

pub struct Simplifier<'a> {
    solver: &'a mut Solver,
    uses: UseList,
    stats: SimplifierStats,
}

impl<'a> Simplifier<'a> {
    pub fn new(solver: &'a mut Solver) -> Self {
        let uses = UseList::build(solver);
        Self {
            solver,
            uses,
            stats: SimplifierStats::default(),
        }
    }

    pub fn use_list(&self) -> &UseList {
        &self.uses
    }

    pub fn solver(&self) -> &Solver {
        &*self.solver
    }

    pub fn stats(&self) -> &SimplifierStats {
        &self.stats
    }

    /// Run rounds until nothing changes. Needing more than
    /// [`SolverConfig::max_rounds`](crate::SolverConfig::max_rounds) rounds
    /// of progress is an error.
    pub fn run(mut self) -> Result<SimplifierStats, PddError> {
        let max_rounds = self.solver.config().max_rounds;
        let had_conflict = self.solver.is_conflict();
        while !self.solver.is_conflict() {
            self.solver.limit_mut().check("pdd simplification")?;
            if !self.step() {
                break;
            }
            self.stats.rounds += 1;
            if self.stats.rounds > max_rounds && !self.solver.is_conflict() {
                warn!(
                    rounds = self.stats.rounds,
                    live = self.solver.live().len(),
                    "round limit reached before a fixpoint"
                );
                return Err(PddError::RoundLimit { rounds: max_rounds });
            }
        }
        if self.solver.is_conflict() && !had_conflict {
            self.stats.conflicts += 1;
        }
        info!(
            rounds = self.stats.rounds,
            passes = self.stats.passes(),
            live = self.solver.live().len(),
            solved = self.stats.solved,
            conflict = self.solver.is_conflict(),
            "pdd simplification finished"
        );
        Ok(self.stats)
    }

    /// One round: the first pass that makes progress wins.
    pub fn step(&mut self) -> bool {
        let small = self.solver.live().len() <= self.solver.config().linear_full_threshold;
        for pass in Pass::ORDER {
            if pass == Pass::LinearFull && !small {
                continue;
            }
            let progress = self.run_pass(pass);
            debug_assert!(
                self.uses.is_consistent(self.solver),
                "use list out of sync after {pass:?}"
            );
            if progress {
                debug!(?pass, live = self.solver.live().len(), "progress");
                self.stats.record(pass);
                return true;
            }
        }
        false
    }

    pub fn run_pass(&mut self, pass: Pass) -> bool {
        match pass {
            Pass::LinearBinary => self.linear(true),
            Pass::LinearFull => self.linear(false),
            Pass::Cc => self.cc(),
            Pass::Pure => self.pure(),
            Pass::Dual => self.dual(),
            Pass::Leaf => self.leaf(),
            Pass::Exlin => self.exlin(),
        }
    }

    /// The single place where equations change.
    pub fn apply(&mut self, mutation: Mutation) -> EqId {
        match mutation {
            Mutation::Insert(p) => {
                let id = self.solver.add(p);
                if self.solver.equation(id).state().is_live() {
                    let vars = self.solver.pdd().free_vars(p);
                    self.uses.insert(id, &vars);
                } else {
                    self.stats.retired += 1;
                }
                id
            }
            Mutation::Rewrite(id, p) => {
                let eq = self.solver.equation(id);
                let (old, state) = (eq.poly(), eq.state());
                if old == p || !state.is_live() {
                    return id;
                }
                let old_vars = self.solver.pdd().free_vars(old);
                self.uses.remove(id, &old_vars);
                self.solver.set_poly(id, p);
                let pdd = self.solver.pdd();
                if pdd.is_zero(p) {
                    self.solver.set_state(id, EquationState::Retired);
                    self.stats.retired += 1;
                    return id;
                }
                let vars = pdd.free_vars(p);
                let is_val = pdd.is_val(p);
                self.uses.insert(id, &vars);
                if is_val {
                    self.solver.set_conflict(id);
                } else if state == EquationState::Processed {
                    // basis completion has to see it again
                    self.solver.set_state(id, EquationState::ToSimplify);
                }
                id
            }
            Mutation::Solve(id, v) => {
                let vars = self.solver.pdd().free_vars(self.poly(id));
                self.uses.remove(id, &vars);
                self.solver.mark_solved(id, v);
                self.stats.solved += 1;
                id
            }
            Mutation::Retire(id) => {
                let vars = self.solver.pdd().free_vars(self.poly(id));
                self.uses.remove(id, &vars);
                self.solver.set_state(id, EquationState::Retired);
                self.stats.retired += 1;
                id
            }
        }
    }

    fn poly(&self, id: EqId) -> Pdd {
        self.solver.equation(id).poly()
    }

    fn is_pending(&self, id: EqId) -> bool {
        self.solver.equation(id).state() == EquationState::ToSimplify
    }

    /// Top variable of `id` when its coefficient is a non-zero constant.
    fn solvable_var(&self, id: EqId) -> Option<u32> {
        let pdd = self.solver.pdd();
        let p = self.poly(id);
        let v = pdd.var(p)?;
        pdd.is_val(pdd.hi(p)).then_some(v)
    }

    /// Eliminate the solvable top variable of `by` from `target`.
    fn reduce(&mut self, target: EqId, by: EqId) {
        let src = self.poly(by);
        let dst = self.poly(target);
        let pdd = self.solver.pdd_mut();
        let (Some(v), Some(c)) = (pdd.var(src), pdd.value(pdd.hi(src)).cloned()) else {
            return;
        };
        let lo = pdd.lo(src);
        let value = pdd.scale(lo, &(-c.recip()));
        let reduced = pdd.substitute(dst, v, value);
        self.apply(Mutation::Rewrite(target, reduced));
    }

    /// Solve `id` for `v`: reduce every other use of `v`, then set it aside.
    fn eliminate(&mut self, id: EqId, v: u32) {
        for other in self.uses.uses(v) {
            if other == id {
                continue;
            }
            self.reduce(other, id);
            if self.solver.is_conflict() {
                return;
            }
        }
        debug!(equation = %id, var = v, "solved");
        self.apply(Mutation::Solve(id, v));
    }

    fn linear(&mut self, binary: bool) -> bool {
        let is_candidate = |s: &Self, id: EqId| {
            if !s.is_pending(id) || s.solvable_var(id).is_none() {
                return false;
            }
            let p = s.poly(id);
            if binary {
                s.solver.pdd().is_binary(p)
            } else {
                s.solver.pdd().is_linear(p)
            }
        };
        let mut candidates: Vec<(u32, EqId)> = self
            .solver
            .equations(EquationState::ToSimplify)
            .into_iter()
            .filter(|&id| is_candidate(&*self, id))
            .filter_map(|id| Some((self.solvable_var(id)?, id)))
            .collect();
        candidates.sort_unstable();

        let mut progress = false;
        for (_, id) in candidates {
            if self.solver.is_conflict() {
                break;
            }
            // earlier eliminations may have rewritten this one
            if !is_candidate(&*self, id) {
                continue;
            }
            let Some(v) = self.solvable_var(id) else {
                continue;
            };
            self.eliminate(id, v);
            progress = true;
        }
        progress
    }

    fn cc(&mut self) -> bool {
        let mut by_tail: IndexMap<Pdd, EqId> = IndexMap::new();
        let mut by_monic: IndexMap<Pdd, EqId> = IndexMap::new();
        let mut progress = false;
        for id in self.solver.equations(EquationState::ToSimplify) {
            if self.solver.is_conflict() {
                break;
            }
            if !self.is_pending(id) {
                continue;
            }
            let p = self.poly(id);
            let monic = self.solver.pdd_mut().monic(p);
            match by_monic.get(&monic) {
                Some(&other) if self.solver.equation(other).state().is_live() => {
                    debug!(equation = %id, duplicate_of = %other, "constant multiple");
                    self.apply(Mutation::Retire(id));
                    progress = true;
                    continue;
                }
                _ => {
                    by_monic.insert(monic, id);
                }
            }

            let pdd = self.solver.pdd();
            let tail = pdd.lo(p);
            if pdd.is_val(tail) {
                continue;
            }
            let Some(&other) = by_tail.get(&tail) else {
                by_tail.insert(tail, id);
                continue;
            };
            let q = self.poly(other);
            if !self.solver.equation(other).state().is_live() || q == p || pdd.lo(q) != tail {
                continue;
            }
            if !pdd.is_val(pdd.hi(p)) && !pdd.is_val(pdd.hi(q)) {
                continue;
            }
            let diff = self.solver.pdd_mut().sub(p, q);
            debug!(equation = %id, using = %other, "shared tail");
            self.apply(Mutation::Rewrite(id, diff));
            progress = true;
        }
        progress
    }

    fn pure(&mut self) -> bool {
        let mut progress = false;
        for id in self.solver.equations(EquationState::ToSimplify) {
            if !self.is_pending(id) {
                continue;
            }
            let Some(v) = self.solvable_var(id) else {
                continue;
            };
            if self.uses.count(v) == 1 {
                debug!(equation = %id, var = v, "pure");
                self.apply(Mutation::Solve(id, v));
                progress = true;
            }
        }
        progress
    }

    fn dual(&mut self) -> bool {
        let mut progress = false;
        for id in self.solver.equations(EquationState::ToSimplify) {
            if self.solver.is_conflict() {
                break;
            }
            if !self.is_pending(id) {
                continue;
            }
            let Some(v) = self.solvable_var(id) else {
                continue;
            };
            if self.uses.count(v) != 2 {
                continue;
            }
            let Some(other) = self.uses.uses(v).into_iter().find(|&e| e != id) else {
                continue;
            };
            let q = self.poly(other);
            let (coeff, _) = self.solver.pdd_mut().split(q, v);
            if !self.solver.pdd().is_val(coeff) {
                continue;
            }
            debug!(equation = %id, other = %other, var = v, "dual");
            self.eliminate(id, v);
            progress = true;
        }
        progress
    }

    fn leaf(&mut self) -> bool {
        let mut progress = false;
        for id in self.solver.equations(EquationState::ToSimplify) {
            if self.solver.is_conflict() {
                break;
            }
            if !self.is_pending(id) {
                continue;
            }
            let Some(v) = self.solvable_var(id) else {
                continue;
            };
            let leaves: Vec<EqId> = self
                .uses
                .uses(v)
                .into_iter()
                .filter(|&e| e != id && self.solver.pdd().var_is_leaf(self.poly(e), v))
                .collect();
            for e in leaves {
                debug!(equation = %e, using = %id, var = v, "leaf");
                self.reduce(e, id);
                progress = true;
                if self.solver.is_conflict() {
                    return true;
                }
            }
        }
        progress
    }

    fn exlin(&mut self) -> bool {
        let polys: Vec<Pdd> = self.solver.live().into_iter().map(|id| self.poly(id)).collect();
        if polys.iter().all(|&p| self.solver.pdd().is_linear(p)) {
            return false;
        }
        let rows = self.exlin_augment(&polys);
        let derived = self.exlin_eliminate(&rows);

        let pdd = self.solver.pdd_mut();
        let known: HashSet<Pdd> = polys.iter().map(|&p| pdd.monic(p)).collect();
        let candidates: Vec<(Pdd, Pdd)> =
            derived.into_iter().map(|r| (r, pdd.monic(r))).collect();
        let mut fresh = Vec::new();
        for (r, monic) in candidates {
            let unseen = self.solver.note_exlin_row(monic);
            if unseen && !known.contains(&monic) {
                fresh.push(r);
            }
        }
        for &r in &fresh {
            let id = self.apply(Mutation::Insert(r));
            debug!(equation = %id, "exlin row");
            if self.solver.is_conflict() {
                break;
            }
        }
        self.stats.exlin_rows += fresh.len();
        !fresh.is_empty()
    }

    /// The equations plus their products with variables of their orbits.
    /// The orbit of `v` is every variable sharing a monomial with `v`.
    fn exlin_augment(&mut self, polys: &[Pdd]) -> Vec<Pdd> {
        let config = self.solver.config();
        let (max_new, max_degree) = (config.exlin_max_new, config.exlin_max_degree);
        let pdd = self.solver.pdd_mut();

        let mut orbits: IndexMap<u32, BTreeSet<u32>> = IndexMap::new();
        for &p in polys {
            for m in pdd.monomials(p) {
                for &a in &m.vars {
                    for &b in &m.vars {
                        if a != b {
                            orbits.entry(a).or_default().insert(b);
                        }
                    }
                }
            }
        }

        let mut rows = polys.to_vec();
        let mut added = 0;
        'polys: for &p in polys {
            if pdd.degree(p) + 1 > max_degree {
                continue;
            }
            let multipliers: BTreeSet<u32> = pdd
                .free_vars(p)
                .iter()
                .filter_map(|v| orbits.get(v))
                .flatten()
                .copied()
                .collect();
            for w in multipliers {
                if added >= max_new {
                    break 'polys;
                }
                let pw = pdd.mk_var(w);
                rows.push(pdd.mul(p, pw));
                added += 1;
            }
        }
        rows
    }

    /// Gaussian elimination over monomials, highest degree first. Returns
    /// the pivot rows that only mention monomials of degree at most one.
    fn exlin_eliminate(&mut self, rows: &[Pdd]) -> Vec<Pdd> {
        let pdd = self.solver.pdd_mut();
        let terms: Vec<Vec<Monomial>> = rows.iter().map(|&r| pdd.monomials(r)).collect();
        let mut columns: Vec<Vec<u32>> = terms
            .iter()
            .flatten()
            .map(|m| m.vars.clone())
            .collect();
        columns.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| b.cmp(a)));
        columns.dedup();
        let index: HashMap<Vec<u32>, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        let mut basis: BTreeMap<usize, BTreeMap<usize, BigRational>> = BTreeMap::new();
        for monomials in &terms {
            let mut row: BTreeMap<usize, BigRational> = monomials
                .iter()
                .map(|m| (index[&m.vars], m.coeff.clone()))
                .collect();
            while let Some((&lead, coeff)) = row.iter().next() {
                let coeff = coeff.clone();
                match basis.get(&lead) {
                    Some(pivot) => {
                        for (&col, c) in pivot {
                            let current = row.remove(&col).unwrap_or_else(BigRational::zero);
                            let updated = current - &coeff * c;
                            if !updated.is_zero() {
                                row.insert(col, updated);
                            }
                        }
                    }
                    None => {
                        let inv = coeff.recip();
                        for c in row.values_mut() {
                            *c = &*c * &inv;
                        }
                        basis.insert(lead, row);
                        break;
                    }
                }
            }
        }

        basis
            .values()
            .filter(|row| {
                row.keys()
                    .next()
                    .is_some_and(|&lead| columns[lead].len() <= 1)
            })
            .map(|row| {
                let monomials: Vec<Monomial> = row
                    .iter()
                    .map(|(&col, c)| Monomial {
                        coeff: c.clone(),
                        vars: columns[col].clone(),
                    })
                    .collect();
                pdd.from_monomials(&monomials)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;
    use crate::pdd::PddManager;

    fn solver_with(build: impl FnOnce(&mut PddManager) -> Vec<Pdd>) -> Solver {
        let mut s = Solver::default();
        for p in build(s.pdd_mut()) {
            s.add(p);
        }
        s
    }

    #[test]
    fn binary_linear_step_solves_and_substitutes() {
        let mut s = solver_with(|m| {
            let x = m.mk_var(0);
            let y = m.mk_var(1);
            let z = m.mk_var(2);
            let xz = m.mul(x, z);
            // y - x = 0, y*z... as x*z + y = 0
            vec![m.sub(y, x), m.add(xz, y)]
        });
        let mut simp = Simplifier::new(&mut s);
        assert!(simp.run_pass(Pass::LinearBinary));
        assert!(simp.use_list().is_consistent(simp.solver()));
        let solver = simp.solver();
        let solved = solver.equations(EquationState::Solved);
        assert_eq!(solved.len(), 1);
        assert_eq!(solver.equation(solved[0]).solved_var(), Some(1));
        // x*z + x remains
        let live = solver.live();
        assert_eq!(live.len(), 1);
        assert_eq!(solver.pdd().free_vars(solver.equation(live[0]).poly()), vec![0, 2]);
    }

    #[test]
    fn cc_step_drops_constant_multiples() {
        let mut s = solver_with(|m| {
            let x = m.mk_var(0);
            let y = m.mk_var(1);
            let xy = m.mul(x, y);
            let one = m.one();
            let p = m.add(xy, one);
            let three = m.int(3);
            vec![p, m.mul(three, p)]
        });
        let mut simp = Simplifier::new(&mut s);
        assert!(simp.run_pass(Pass::Cc));
        assert_eq!(simp.solver().live().len(), 1);
        assert!(simp.use_list().is_consistent(simp.solver()));
        assert!(!simp.run_pass(Pass::Cc));
    }

    #[test]
    fn cc_step_subtracts_shared_tails() {
        let mut s = solver_with(|m| {
            let x = m.mk_var(0);
            let y = m.mk_var(1);
            let z = m.mk_var(2);
            let xx = m.mul(x, x);
            let one = m.one();
            let tail = m.add(xx, one);
            // y + x^2 + 1 and z + x^2 + 1
            vec![m.add(y, tail), m.add(z, tail)]
        });
        let mut simp = Simplifier::new(&mut s);
        assert!(simp.run_pass(Pass::Cc));
        let solver = simp.solver();
        let live = solver.live();
        // z - y replaces the second equation
        let p = solver.equation(live[1]).poly();
        assert_eq!(solver.pdd().free_vars(p), vec![1, 2]);
        assert!(solver.pdd().is_linear(p));
        assert!(simp.use_list().is_consistent(simp.solver()));
    }

    #[test]
    fn pure_step_sets_aside_private_variables() {
        let mut s = solver_with(|m| {
            let x = m.mk_var(0);
            let y = m.mk_var(1);
            let xx = m.mul(x, x);
            // y + x^2 = 0: y occurs nowhere else
            vec![m.add(y, xx), m.sub(xx, x)]
        });
        let mut simp = Simplifier::new(&mut s);
        assert!(simp.run_pass(Pass::Pure));
        let solver = simp.solver();
        assert_eq!(solver.equations(EquationState::Solved).len(), 1);
        assert_eq!(solver.live().len(), 1);
    }

    #[test]
    fn dual_step_eliminates_shared_variable() {
        let mut s = solver_with(|m| {
            let x = m.mk_var(0);
            let y = m.mk_var(1);
            let xx = m.mul(x, x);
            let yx = m.mul(y, x);
            // y + x^2 = 0 and y*x + 1 = 0
            let one = m.one();
            vec![m.add(y, xx), m.add(yx, one)]
        });
        let mut simp = Simplifier::new(&mut s);
        assert!(!simp.run_pass(Pass::Pure));
        // y*x has non-constant coefficient x, so the second is not solvable
        assert!(!simp.run_pass(Pass::Dual));
        let mut s = solver_with(|m| {
            let x = m.mk_var(0);
            let y = m.mk_var(1);
            let xx = m.mul(x, x);
            let one = m.one();
            let two = m.int(2);
            let y2 = m.mul(two, y);
            vec![m.add(y, xx), m.add(y2, one)]
        });
        let mut simp = Simplifier::new(&mut s);
        assert!(simp.run_pass(Pass::Dual));
        let solver = simp.solver();
        let live = solver.live();
        assert_eq!(live.len(), 1);
        // -2x^2 + 1
        assert_eq!(solver.pdd().free_vars(solver.equation(live[0]).poly()), vec![0]);
        assert!(simp.use_list().is_consistent(simp.solver()));
    }

    #[test]
    fn leaf_step_reduces_linear_occurrences() {
        let mut s = solver_with(|m| {
            let x = m.mk_var(0);
            let y = m.mk_var(1);
            let z = m.mk_var(2);
            let xx = m.mul(x, x);
            let zy = m.mul(z, y);
            let zz = m.mul(z, z);
            let xy = m.mul(x, y);
            let xyz = m.mul(xy, z);
            // y occurs linearly in z*y + z^2 but under x in x*y*z + z^2
            vec![m.add(y, xx), m.add(zy, zz), m.add(xyz, zz)]
        });
        let mut simp = Simplifier::new(&mut s);
        assert!(simp.run_pass(Pass::Leaf));
        let solver = simp.solver();
        let live = solver.live();
        assert_eq!(live.len(), 3);
        let vars_of = |i: usize| solver.pdd().free_vars(solver.equation(live[i]).poly());
        assert_eq!(vars_of(1), vec![0, 2]);
        assert_eq!(vars_of(2), vec![0, 1, 2]);
        assert!(simp.use_list().is_consistent(simp.solver()));
        assert!(!simp.run_pass(Pass::Leaf));
    }

    #[test]
    fn exlin_derives_linear_consequences() {
        // x*y - 1 = 0 and x*y + x - 3 = 0 imply x - 2 = 0
        let config = SolverConfig::default();
        let mut s = Solver::new(config);
        let (p, q) = {
            let m = s.pdd_mut();
            let x = m.mk_var(0);
            let y = m.mk_var(1);
            let xy = m.mul(x, y);
            let one = m.one();
            let three = m.int(3);
            let p = m.sub(xy, one);
            let xyx = m.add(xy, x);
            (p, m.sub(xyx, three))
        };
        s.add(p);
        s.add(q);
        let mut simp = Simplifier::new(&mut s);
        assert!(!simp.run_pass(Pass::Cc));
        assert!(simp.run_pass(Pass::Exlin));
        let solver = simp.solver();
        let derived = *solver.live().last().unwrap();
        let r = solver.equation(derived).poly();
        assert!(solver.pdd().is_linear(r));
        assert_eq!(solver.pdd().free_vars(r), vec![0]);
        assert!(simp.use_list().is_consistent(simp.solver()));
        assert!(!simp.run_pass(Pass::Exlin));

        // a derived row that later leaves the working set is not derived again
        let rows = simp.stats().exlin_rows;
        simp.apply(Mutation::Retire(derived));
        assert!(!simp.run_pass(Pass::Exlin));
        assert_eq!(simp.stats().exlin_rows, rows);
    }

    #[test]
    fn exceeding_the_round_limit_is_an_error() {
        let config = SolverConfig {
            max_rounds: 1,
            ..SolverConfig::default()
        };
        // solving z takes one round, dropping the multiple a second one
        let mut s = Solver::new(config.clone());
        {
            let m = s.pdd_mut();
            let x = m.mk_var(0);
            let y = m.mk_var(1);
            let z = m.mk_var(2);
            let xy = m.mul(x, y);
            let one = m.one();
            let p = m.add(xy, one);
            let three = m.int(3);
            let q = m.mul(three, p);
            let r = m.sub(z, one);
            for e in [p, q, r] {
                s.add(e);
            }
        }
        assert_eq!(s.simplify(), Err(PddError::RoundLimit { rounds: 1 }));

        let mut s = Solver::new(config);
        let x = s.pdd_mut().mk_var(0);
        let one = s.pdd().one();
        let e = s.pdd_mut().sub(x, one);
        s.add(e);
        assert_eq!(s.simplify().unwrap().rounds, 1);
    }

    #[test]
    fn conflict_stops_the_run() {
        let mut s = solver_with(|m| {
            let x = m.mk_var(0);
            let one = m.one();
            let two = m.int(2);
            vec![m.sub(x, one), m.sub(x, two)]
        });
        let stats = s.simplify().unwrap();
        assert!(s.is_conflict());
        assert_eq!(stats.conflicts, 1);
    }
}
