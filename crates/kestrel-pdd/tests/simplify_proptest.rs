//! Randomized checks of the simplifier on systems with a known root.

use num::BigRational;
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

use kestrel_core::proptest_generators::{arb_poly_system, PolySystem};
use kestrel_pdd::{Monomial, Pass, Pdd, Simplifier, Solver, SolverConfig};

fn rat(n: i64) -> BigRational {
    BigRational::from_integer(n.into())
}

fn config() -> SolverConfig {
    SolverConfig {
        max_rounds: 200,
        ..SolverConfig::default()
    }
}

/// Never runs the full linear step.
fn binary_only() -> SolverConfig {
    SolverConfig {
        linear_full_threshold: 0,
        ..config()
    }
}

fn load(system: &PolySystem) -> (Solver, Vec<Pdd>) {
    load_with(system, config())
}

fn load_with(system: &PolySystem, config: SolverConfig) -> (Solver, Vec<Pdd>) {
    let mut s = Solver::new(config);
    let mut originals = Vec::new();
    for terms in &system.polys {
        let monomials: Vec<Monomial> = terms
            .iter()
            .map(|t| Monomial {
                coeff: rat(t.coeff),
                vars: t.vars.clone(),
            })
            .collect();
        let p = s.pdd_mut().from_monomials(&monomials);
        originals.push(p);
        s.add(p);
    }
    (s, originals)
}

fn eval_at(s: &Solver, p: Pdd, point: &[BigRational]) -> BigRational {
    s.pdd().eval(p, &|v| point[v as usize].clone())
}

/// The root still solves every live equation and back-substitution
/// reproduces it.
fn check_root(s: &mut Solver, system: &PolySystem) -> Result<(), TestCaseError> {
    prop_assert!(system.is_solution(&system.root));
    let root: Vec<BigRational> = system.root.iter().map(|&v| rat(v)).collect();
    prop_assert!(!s.is_conflict());
    for id in s.live() {
        prop_assert_eq!(eval_at(s, s.equation(id).poly(), &root), rat(0));
    }
    let values = s.back_substitution();
    for (&v, &value) in &values {
        prop_assert_eq!(eval_at(s, value, &root), root[v as usize].clone());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn simplification_preserves_solutions(
        system in arb_poly_system(2),
        samples in proptest::collection::vec(proptest::collection::vec(-2..=2i64, 4), 12),
    ) {
        let (mut s, originals) = load(&system);
        s.simplify().unwrap();
        check_root(&mut s, &system)?;

        // any solution of what is left extends to a solution of the input
        let values = s.back_substitution();
        for sample in &samples {
            let mut point: Vec<BigRational> =
                sample[..system.num_vars].iter().map(|&v| rat(v)).collect();
            let free = point.clone();
            for (&v, &value) in &values {
                point[v as usize] = eval_at(&s, value, &free);
            }
            let live_holds = s
                .live()
                .into_iter()
                .all(|id| eval_at(&s, s.equation(id).poly(), &point) == rat(0));
            if live_holds {
                for &p in &originals {
                    prop_assert_eq!(eval_at(&s, p, &point), rat(0));
                }
            }
        }
    }

    #[test]
    fn fixpoint_is_idempotent(system in arb_poly_system(2)) {
        let (mut s, _) = load(&system);
        let first = s.simplify();
        prop_assert!(first.is_ok(), "no fixpoint: {:?}", first);
        let again = s.simplify().unwrap();
        prop_assert_eq!(again.rounds, 0);
        prop_assert_eq!(again.passes(), 0);
    }

    #[test]
    fn binary_only_mode_reaches_a_fixpoint(system in arb_poly_system(2)) {
        let (mut s, _) = load_with(&system, binary_only());
        let first = s.simplify();
        prop_assert!(first.is_ok(), "no fixpoint: {:?}", first);
        check_root(&mut s, &system)?;
        let allocated = s.num_equations();
        let again = s.simplify().unwrap();
        prop_assert_eq!(again.rounds, 0);
        prop_assert_eq!(s.num_equations(), allocated);
    }

    #[test]
    fn use_list_tracks_every_pass(
        system in arb_poly_system(2),
        order in proptest::collection::vec(0..Pass::ORDER.len(), 1..12),
    ) {
        let (mut s, _) = load(&system);
        {
            let mut simp = Simplifier::new(&mut s);
            for i in order {
                simp.run_pass(Pass::ORDER[i]);
                prop_assert!(simp.use_list().is_consistent(simp.solver()));
                if simp.solver().is_conflict() {
                    break;
                }
            }
        }
        check_root(&mut s, &system)?;
    }
}
