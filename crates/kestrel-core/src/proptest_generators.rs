//! Proptest strategies for random linear-arithmetic problems with a model and
//! for polynomial equation systems with a known root.

use num::rational::BigRational;
use num::BigInt;
use proptest::prelude::*;

use crate::model::{Model, Value};
use crate::sort::Sort;
use crate::term::{TermId, TermManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rel {
    Le,
    Lt,
    Eq,
}

/// `sum(coeffs[i] * x_i) REL rhs`.
#[derive(Debug, Clone)]
pub struct AtomSpec {
    pub coeffs: Vec<i64>,
    pub rel: Rel,
    pub rhs: i64,
}

/// Conjunction of clauses, each a disjunction of atoms, together with an
/// integer assignment that satisfies it.
#[derive(Debug, Clone)]
pub struct LinearProblem {
    pub num_vars: usize,
    pub clauses: Vec<Vec<AtomSpec>>,
    pub model: Vec<i64>,
}

/// Terms and model built from a [`LinearProblem`].
#[derive(Debug)]
pub struct BuiltProblem {
    pub vars: Vec<TermId>,
    pub formula: TermId,
    pub model: Model,
}

impl LinearProblem {
    pub fn build(&self, mgr: &mut TermManager, sort: &Sort) -> BuiltProblem {
        let vars: Vec<TermId> = (0..self.num_vars)
            .map(|i| {
                mgr.mk_const(&format!("x{i}"), sort.clone())
                    .expect("fresh constant")
            })
            .collect();
        let mut model = Model::new();
        for (&v, &m) in vars.iter().zip(&self.model) {
            model.assign(mgr, v, Value::int(m)).expect("integral value");
        }
        let mut clauses = Vec::new();
        for clause in &self.clauses {
            let atoms: Vec<TermId> = clause
                .iter()
                .map(|atom| build_atom(mgr, sort, &vars, atom))
                .collect();
            clauses.push(mgr.mk_or(&atoms).expect("boolean atoms"));
        }
        let formula = mgr.mk_and(&clauses).expect("boolean clauses");
        BuiltProblem {
            vars,
            formula,
            model,
        }
    }
}

fn numeral(mgr: &mut TermManager, sort: &Sort, value: i64) -> TermId {
    mgr.mk_numeral(BigRational::from_integer(BigInt::from(value)), sort)
        .expect("arithmetic sort")
}

fn build_atom(mgr: &mut TermManager, sort: &Sort, vars: &[TermId], atom: &AtomSpec) -> TermId {
    let mut summands = Vec::new();
    for (&v, &c) in vars.iter().zip(&atom.coeffs) {
        if c != 0 {
            let coeff = numeral(mgr, sort, c);
            summands.push(mgr.mk_mul(&[coeff, v]).expect("arithmetic product"));
        }
    }
    let lhs = if summands.is_empty() {
        numeral(mgr, sort, 0)
    } else {
        mgr.mk_add(&summands).expect("arithmetic sum")
    };
    let rhs = numeral(mgr, sort, atom.rhs);
    match atom.rel {
        Rel::Le => mgr.mk_le(lhs, rhs),
        Rel::Lt => mgr.mk_lt(lhs, rhs),
        Rel::Eq => mgr.mk_eq(lhs, rhs),
    }
    .expect("arithmetic comparison")
}

fn arb_rel() -> impl Strategy<Value = Rel> {
    prop_oneof![3 => Just(Rel::Le), 2 => Just(Rel::Lt), 1 => Just(Rel::Eq)]
}

/// An atom over `model` that the model satisfies when `holds` is set and
/// may violate otherwise.
fn arb_atom(model: Vec<i64>, coeff_range: i64, holds: bool) -> impl Strategy<Value = AtomSpec> {
    let n = model.len();
    (
        proptest::collection::vec(-coeff_range..=coeff_range, n..=n),
        arb_rel(),
        0..=3i64,
    )
        .prop_map(move |(coeffs, rel, slack)| {
            let value: i64 = coeffs.iter().zip(&model).map(|(c, m)| c * m).sum();
            let rhs = match (rel, holds) {
                (Rel::Eq, _) => value,
                (Rel::Le, true) => value + slack,
                (Rel::Lt, true) => value + slack + 1,
                (_, false) => value - slack - 1,
            };
            AtomSpec { coeffs, rel, rhs }
        })
}

/// Satisfiable linear problems; `coeff_range` bounds coefficient magnitude.
pub fn arb_linear_problem(coeff_range: i64) -> impl Strategy<Value = LinearProblem> {
    (2..=4usize, 1..=5usize)
        .prop_flat_map(move |(num_vars, num_clauses)| {
            proptest::collection::vec(-5..=5i64, num_vars..=num_vars).prop_flat_map(
                move |model| {
                    let clause = (
                        arb_atom(model.clone(), coeff_range, true),
                        proptest::option::of(arb_atom(model.clone(), coeff_range, false)),
                    )
                        .prop_map(|(sat, other)| {
                            let mut atoms = vec![sat];
                            atoms.extend(other);
                            atoms
                        });
                    (
                        Just(num_vars),
                        proptest::collection::vec(clause, num_clauses..=num_clauses),
                        Just(model),
                    )
                },
            )
        })
        .prop_map(|(num_vars, clauses, model)| LinearProblem {
            num_vars,
            clauses,
            model,
        })
}

/// Integer assignments for `num_vars` variables, for sampling models of a
/// projected formula.
pub fn arb_assignment(num_vars: usize) -> impl Strategy<Value = Vec<i64>> {
    proptest::collection::vec(-8..=8i64, num_vars..=num_vars)
}

/// `coeff * x_vars[0] * x_vars[1] * ...`; an empty `vars` is a constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermSpec {
    pub coeff: i64,
    pub vars: Vec<u32>,
}

/// Polynomial equations `p_i = 0` over `num_vars` variables. The constant
/// term of every polynomial is chosen so that `root` solves the system.
#[derive(Debug, Clone)]
pub struct PolySystem {
    pub num_vars: usize,
    pub polys: Vec<Vec<TermSpec>>,
    pub root: Vec<i64>,
}

fn eval_terms(terms: &[TermSpec], point: &[i64]) -> i64 {
    terms
        .iter()
        .map(|t| t.coeff * t.vars.iter().map(|&v| point[v as usize]).product::<i64>())
        .sum()
}

impl PolySystem {
    /// Value of polynomial `i` at `point`.
    pub fn eval(&self, i: usize, point: &[i64]) -> i64 {
        eval_terms(&self.polys[i], point)
    }

    pub fn is_solution(&self, point: &[i64]) -> bool {
        (0..self.polys.len()).all(|i| self.eval(i, point) == 0)
    }
}

fn arb_term(num_vars: usize, max_degree: usize) -> impl Strategy<Value = TermSpec> {
    (
        prop_oneof![-3..=-1i64, 1..=3i64],
        proptest::collection::vec(0..num_vars as u32, 0..=max_degree),
    )
        .prop_map(|(coeff, vars)| TermSpec { coeff, vars })
}

/// Systems of 1 to 4 equations over 2 to 4 variables with a common integer
/// root; monomials have degree at most `max_degree`.
pub fn arb_poly_system(max_degree: usize) -> impl Strategy<Value = PolySystem> {
    (2..=4usize, 1..=4usize)
        .prop_flat_map(move |(num_vars, num_polys)| {
            let poly = proptest::collection::vec(arb_term(num_vars, max_degree), 1..=3);
            (
                Just(num_vars),
                proptest::collection::vec(poly, num_polys..=num_polys),
                proptest::collection::vec(-2..=2i64, num_vars..=num_vars),
            )
        })
        .prop_map(|(num_vars, raw, root)| {
            let polys = raw
                .into_iter()
                .map(|mut terms| {
                    let shift = eval_terms(&terms, &root);
                    if shift != 0 {
                        terms.push(TermSpec {
                            coeff: -shift,
                            vars: Vec::new(),
                        });
                    }
                    terms
                })
                .collect();
            PolySystem {
                num_vars,
                polys,
                root,
            }
        })
}
