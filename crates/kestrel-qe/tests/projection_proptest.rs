//! Randomized soundness checks for projection and implicants.

use indexmap::IndexMap;
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

use kestrel_core::proptest_generators::{arb_assignment, arb_linear_problem, LinearProblem};
use kestrel_core::{Model, Sort, TermId, TermManager, Value};
use kestrel_qe::{implicant, project_skolem};

fn sample_model(mgr: &TermManager, vars: &[TermId], values: &[i64]) -> Model {
    let mut m = Model::new();
    for (&v, &val) in vars.iter().zip(values) {
        m.assign(mgr, v, Value::int(val)).unwrap();
    }
    m
}

/// Project the first `k` variables and check the result against samples.
fn check_projection(problem: &LinearProblem, sort: Sort, k: usize, samples: &[Vec<i64>]) {
    let mut mgr = TermManager::new();
    let built = problem.build(&mut mgr, &sort);
    let k = k.min(built.vars.len());
    let eliminate: Vec<TermId> = built.vars[..k].to_vec();

    let p = project_skolem(&mut mgr, &built.model, &eliminate, built.formula).unwrap();
    assert!(built.model.is_true(&mgr, p.formula).unwrap());
    for (&v, &w) in &p.witnesses {
        assert!(!mgr.contains(p.formula, v));
        for &other in p.witnesses.keys() {
            assert!(!mgr.contains(w, other));
        }
    }
    for &v in &eliminate {
        assert!(p.witnesses.contains_key(&v) || p.residual.contains(&v));
    }

    let witnesses: IndexMap<TermId, TermId> = p.witnesses.clone();
    let instantiated = mgr.substitute(built.formula, &witnesses).unwrap();
    for values in samples {
        let m = sample_model(&mgr, &built.vars, values);
        if m.is_true(&mgr, p.formula).unwrap() {
            assert!(
                m.is_true(&mgr, instantiated).unwrap(),
                "witnesses fail for sample {values:?}"
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn projection_over_reals_is_sound(
        problem in arb_linear_problem(3),
        k in 1..=3usize,
        samples in proptest::collection::vec(arb_assignment(4), 16),
    ) {
        check_projection(&problem, Sort::Real, k, &samples);
    }

    #[test]
    fn projection_over_unit_integers_is_sound(
        problem in arb_linear_problem(1),
        k in 1..=3usize,
        samples in proptest::collection::vec(arb_assignment(4), 16),
    ) {
        check_projection(&problem, Sort::Int, k, &samples);
    }

    #[test]
    fn projection_over_general_integers_is_sound(
        problem in arb_linear_problem(3),
        k in 1..=2usize,
        samples in proptest::collection::vec(arb_assignment(4), 16),
    ) {
        check_projection(&problem, Sort::Int, k, &samples);
    }

    #[test]
    fn implicant_is_sound_and_deterministic(
        problem in arb_linear_problem(3),
        samples in proptest::collection::vec(arb_assignment(4), 16),
    ) {
        let mut mgr = TermManager::new();
        let built = problem.build(&mut mgr, &Sort::Int);
        let lits = implicant(&mut mgr, &built.model, &[built.formula]).unwrap();
        let again = implicant(&mut mgr, &built.model, &[built.formula]).unwrap();
        prop_assert_eq!(&lits, &again);
        for &l in &lits {
            prop_assert!(built.model.is_true(&mgr, l).unwrap());
        }
        let conj = mgr.mk_and(&lits).unwrap();
        for values in &samples {
            let m = sample_model(&mgr, &built.vars, values);
            if m.is_true(&mgr, conj).unwrap() {
                prop_assert!(m.is_true(&mgr, built.formula).unwrap());
            }
        }
    }
}
