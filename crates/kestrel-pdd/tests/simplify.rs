//! Simplification behavior through the solver's public interface.

use kestrel_core::{LimitConfig, LimitExceeded};
use kestrel_pdd::{EquationState, Monomial, PddError, Solver, SolverConfig};
use num::BigRational;

fn rat(n: i64) -> BigRational {
    BigRational::from_integer(n.into())
}

/// `{x - 2y = 0, y - 3 = 0}`.
fn scenario_b(config: SolverConfig) -> Solver {
    let mut s = Solver::new(config);
    let m = s.pdd_mut();
    let x = m.mk_var(0);
    let y = m.mk_var(1);
    let two = m.int(2);
    let two_y = m.mul(two, y);
    let e1 = m.sub(x, two_y);
    let three = m.int(3);
    let e2 = m.sub(y, three);
    s.add(e1);
    s.add(e2);
    s
}

#[test]
fn scenario_b_reduces_to_the_empty_set() {
    let mut s = scenario_b(SolverConfig::default());
    let stats = s.simplify().unwrap();
    assert!(!s.is_conflict());
    assert!(s.live().is_empty());
    assert_eq!(s.equations(EquationState::Solved).len(), 2);
    assert_eq!(stats.solved, 2);

    let values = s.back_substitution();
    assert_eq!(values.len(), 2);
    assert_eq!(s.pdd().value(values[&0]), Some(&rat(6)));
    assert_eq!(s.pdd().value(values[&1]), Some(&rat(3)));
}

#[test]
fn second_run_on_a_fixpoint_does_nothing() {
    let mut s = scenario_b(SolverConfig::default());
    s.simplify().unwrap();
    let again = s.simplify().unwrap();
    assert_eq!(again.rounds, 0);
    assert_eq!(again.passes(), 0);
    assert_eq!(s.stats().solved, 2);
}

#[test]
fn processed_equations_are_rewritten_too() {
    let mut s = Solver::default();
    let m = s.pdd_mut();
    let x = m.mk_var(0);
    let y = m.mk_var(1);
    let xy = m.mul(x, y);
    let one = m.one();
    let xy1 = m.add(xy, one);
    let four = m.int(4);
    let x4 = m.sub(x, four);
    let kept = s.add_processed(xy1);
    s.add(x4);

    s.simplify().unwrap();
    // x = 4 turns x*y + 1 into 4y + 1, which is then solved as well
    assert_eq!(s.equation(kept).state(), EquationState::Solved);
    let values = s.back_substitution();
    assert_eq!(s.pdd().value(values[&1]), Some(&(rat(-1) / rat(4))));
}

#[test]
fn inconsistent_system_reports_a_conflict() {
    let mut s = Solver::default();
    let m = s.pdd_mut();
    let x = m.mk_var(0);
    let y = m.mk_var(1);
    let sum = m.add(x, y);
    let one = m.one();
    let e1 = m.sub(sum, one);
    let two = m.int(2);
    let e2 = m.sub(sum, two);
    s.add(e1);
    s.add(e2);
    let stats = s.simplify().unwrap();
    assert!(s.is_conflict());
    assert_eq!(stats.conflicts, 1);
    let conflict = s.conflict().unwrap();
    assert!(s.pdd().is_val(s.equation(conflict).poly()));
}

#[test]
fn nonlinear_system_uses_extended_linearization() {
    // x*y = 1, x*y + x = 3
    let mut s = Solver::default();
    let m = s.pdd_mut();
    let x = m.mk_var(0);
    let y = m.mk_var(1);
    let xy = m.mul(x, y);
    let one = m.one();
    let three = m.int(3);
    let e1 = m.sub(xy, one);
    let xyx = m.add(xy, x);
    let e2 = m.sub(xyx, three);
    s.add(e1);
    s.add(e2);

    let stats = s.simplify().unwrap();
    assert!(!s.is_conflict());
    assert!(stats.passes() > 0);
    let values = s.back_substitution();
    assert_eq!(s.pdd().value(values[&0]), Some(&rat(2)));
    for id in s.live() {
        let p = s.equation(id).poly();
        let at_root = s.pdd().eval(p, &|v| if v == 0 { rat(2) } else { rat(1) / rat(2) });
        assert_eq!(at_root, rat(0));
    }
}

#[test]
fn step_budget_cancels_simplification() {
    let config = SolverConfig {
        limits: LimitConfig {
            timeout_ms: 0,
            step_budget: 1,
        },
        ..SolverConfig::default()
    };
    let mut s = scenario_b(config);
    let err = s.simplify().unwrap_err();
    assert!(matches!(err, PddError::Cancelled(LimitExceeded::Budget { .. })));
}

#[test]
fn cancel_handle_stops_simplification() {
    let mut s = scenario_b(SolverConfig::default());
    s.cancel_handle().cancel();
    let err = s.simplify().unwrap_err();
    assert!(matches!(err, PddError::Cancelled(LimitExceeded::Cancelled { .. })));
    assert_eq!(s.live().len(), 2);
}

#[test]
fn stats_serialize_to_json() {
    let mut s = scenario_b(SolverConfig::default());
    let stats = s.simplify().unwrap();
    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["solved"], 2);
    assert!(json["rounds"].as_u64().unwrap() >= 1);
}

fn term(coeff: i64, vars: &[u32]) -> Monomial {
    Monomial {
        coeff: rat(coeff),
        vars: vars.to_vec(),
    }
}

#[test]
fn binary_only_linear_mode_reaches_a_fixpoint() {
    // root (2, 1, 0); exlin rows get rewritten by leaf and dropped by cc
    let config = SolverConfig {
        linear_full_threshold: 0,
        max_rounds: 500,
        ..SolverConfig::default()
    };
    let mut s = Solver::new(config);
    let system = [
        vec![term(3, &[1]), term(1, &[2, 2]), term(-3, &[])],
        vec![term(1, &[0, 2])],
        vec![term(-1, &[0, 0]), term(-1, &[1, 2]), term(4, &[])],
        vec![term(1, &[1]), term(3, &[1, 1]), term(-4, &[])],
    ];
    for monomials in &system {
        let p = s.pdd_mut().from_monomials(monomials);
        s.add(p);
    }

    let first = s.simplify().unwrap();
    assert!(first.rounds < 500);
    assert!(!s.is_conflict());
    let allocated = s.num_equations();
    let again = s.simplify().unwrap();
    assert_eq!(again.rounds, 0);
    assert_eq!(s.num_equations(), allocated);

    let root = [rat(2), rat(1), rat(0)];
    for id in s.live() {
        let p = s.equation(id).poly();
        assert_eq!(s.pdd().eval(p, &|v| root[v as usize].clone()), rat(0));
    }
    let values = s.back_substitution();
    for (&v, &value) in &values {
        let at_root = s.pdd().eval(value, &|w| root[w as usize].clone());
        assert_eq!(at_root, root[v as usize]);
    }
}
