//! End-to-end projection behavior through the public entry points.

use kestrel_core::{LimitConfig, Model, Sort, TermId, TermManager, Value};
use kestrel_qe::{
    project, project_skolem, project_with_config, MbpConfig, ProjectionRule, QeError,
};

struct Scenario {
    mgr: TermManager,
    model: Model,
    x: TermId,
    y: TermId,
    fml: TermId,
}

/// `x + y > 0 and x < 5` with `x = 2, y = 0`.
fn scenario_a(sort: Sort) -> Scenario {
    let mut mgr = TermManager::new();
    let x = mgr.mk_const("x", sort.clone()).unwrap();
    let y = mgr.mk_const("y", sort.clone()).unwrap();
    let zero = mgr
        .mk_numeral(num::BigRational::from_integer(0.into()), &sort)
        .unwrap();
    let five = mgr
        .mk_numeral(num::BigRational::from_integer(5.into()), &sort)
        .unwrap();
    let sum = mgr.mk_add(&[x, y]).unwrap();
    let a = mgr.mk_gt(sum, zero).unwrap();
    let b = mgr.mk_lt(x, five).unwrap();
    let fml = mgr.mk_and(&[a, b]).unwrap();
    let mut model = Model::new();
    model.assign(&mgr, x, Value::int(2)).unwrap();
    model.assign(&mgr, y, Value::int(0)).unwrap();
    Scenario {
        mgr,
        model,
        x,
        y,
        fml,
    }
}

fn eval_with_y(s: &Scenario, fml: TermId, y: i64) -> bool {
    let mut m = Model::with_completion();
    m.assign(&s.mgr, s.y, Value::int(y)).unwrap();
    m.is_true(&s.mgr, fml).unwrap()
}

#[test]
fn scenario_a_over_integers() {
    let mut s = scenario_a(Sort::Int);
    let p = project(&mut s.mgr, &s.model, &[s.x], s.fml).unwrap();
    assert!(!s.mgr.contains(p.formula, s.x));
    assert!(s.model.is_true(&s.mgr, p.formula).unwrap());
    assert_eq!(p.rules[&s.x], ProjectionRule::LinearBounds);
    assert!(p.residual.is_empty());
    // exists x:Int. x > -y and x < 5  <=>  y >= -3
    for y in -8..=8 {
        assert_eq!(eval_with_y(&s, p.formula, y), y >= -3, "y = {y}");
    }
    p.release(&mut s.mgr);
}

#[test]
fn scenario_a_over_reals() {
    let mut s = scenario_a(Sort::Real);
    let p = project_skolem(&mut s.mgr, &s.model, &[s.x], s.fml).unwrap();
    assert!(!s.mgr.contains(p.formula, s.x));
    assert!(s.model.is_true(&s.mgr, p.formula).unwrap());
    // exists x:Real. -y < x < 5  <=>  y > -5
    for y in -8..=8 {
        assert_eq!(eval_with_y(&s, p.formula, y), y > -5, "y = {y}");
    }
    let witness = p.witnesses[&s.x];
    assert!(!s.mgr.contains(witness, s.x));
    let mut sub = indexmap::IndexMap::new();
    sub.insert(s.x, witness);
    let instantiated = s.mgr.substitute(s.fml, &sub).unwrap();
    assert!(s.model.is_true(&s.mgr, instantiated).unwrap());
}

#[test]
fn scenario_c_non_application_is_rejected_before_any_work() {
    let mut s = scenario_a(Sort::Int);
    let one = s.mgr.mk_int(1);
    let not_a_var = s.mgr.mk_add(&[s.x, one]).unwrap();
    let vars = vec![s.x, not_a_var];
    let terms_before = s.mgr.num_terms();

    let err = project(&mut s.mgr, &s.model, &vars, s.fml).unwrap_err();
    assert!(matches!(err, QeError::InvalidArgument { index: 1, .. }));
    assert_eq!(s.mgr.num_terms(), terms_before);
    assert_eq!(vars, vec![s.x, not_a_var]);
    assert_eq!(s.mgr.ref_count(s.fml), 0);

    let err = project_skolem(&mut s.mgr, &s.model, &[one], s.fml).unwrap_err();
    assert!(matches!(err, QeError::InvalidArgument { index: 0, .. }));
    assert_eq!(s.mgr.num_terms(), terms_before);
}

#[test]
fn unsatisfied_formula_is_rejected() {
    let mut s = scenario_a(Sort::Int);
    s.model.assign(&s.mgr, s.y, Value::int(-10)).unwrap();
    let err = project(&mut s.mgr, &s.model, &[s.x], s.fml).unwrap_err();
    assert!(matches!(err, QeError::NotSatisfied { .. }));
}

#[test]
fn plain_projection_returns_no_witnesses() {
    let mut s = scenario_a(Sort::Int);
    let p = project(&mut s.mgr, &s.model, &[s.x], s.fml).unwrap();
    assert!(p.witnesses.is_empty());
    assert_eq!(p.stats.eliminated, 1);
}

#[test]
fn light_pre_pass_definitions_become_witnesses() {
    let mut mgr = TermManager::new();
    let x = mgr.mk_const("x", Sort::Int).unwrap();
    let y = mgr.mk_const("y", Sort::Int).unwrap();
    let z = mgr.mk_const("z", Sort::Int).unwrap();
    let eq = mgr.mk_eq(x, y).unwrap();
    let lt = mgr.mk_lt(x, z).unwrap();
    let fml = mgr.mk_and(&[eq, lt]).unwrap();
    let mut model = Model::new();
    model.assign(&mgr, x, Value::int(1)).unwrap();
    model.assign(&mgr, y, Value::int(1)).unwrap();
    model.assign(&mgr, z, Value::int(4)).unwrap();

    let p = project_skolem(&mut mgr, &model, &[x], fml).unwrap();
    assert_eq!(p.rules[&x], ProjectionRule::Light);
    assert_eq!(p.witnesses[&x], y);
    let expected = mgr.mk_lt(y, z).unwrap();
    assert_eq!(p.formula, expected);

    let config = MbpConfig {
        light_pre_pass: false,
        ..MbpConfig::default()
    };
    let p = project_with_config(&mut mgr, &model, &[x], fml, &config, true).unwrap();
    assert_eq!(p.rules[&x], ProjectionRule::LinearEquality);
    assert_eq!(p.formula, expected);
}

#[test]
fn non_unit_int_coefficients_fall_back_or_stay_residual() {
    let mut mgr = TermManager::new();
    let x = mgr.mk_const("x", Sort::Int).unwrap();
    let y = mgr.mk_const("y", Sort::Int).unwrap();
    let two = mgr.mk_int(2);
    let two_x = mgr.mk_mul(&[two, x]).unwrap();
    let fml = mgr.mk_le(two_x, y).unwrap();
    let mut model = Model::new();
    model.assign(&mgr, x, Value::int(3)).unwrap();
    model.assign(&mgr, y, Value::int(7)).unwrap();

    let strict = MbpConfig {
        model_value_fallback: false,
        ..MbpConfig::default()
    };
    let p = project_with_config(&mut mgr, &model, &[x], fml, &strict, true).unwrap();
    assert_eq!(p.residual, vec![x]);
    assert!(p.witnesses.is_empty());
    assert!(mgr.contains(p.formula, x));

    let p = project_skolem(&mut mgr, &model, &[x], fml).unwrap();
    assert_eq!(p.rules[&x], ProjectionRule::ModelValue);
    assert!(!mgr.contains(p.formula, x));
    assert!(model.is_true(&mgr, p.formula).unwrap());
}

#[test]
fn step_budget_cancels_projection() {
    let mut s = scenario_a(Sort::Int);
    let config = MbpConfig {
        limits: LimitConfig {
            timeout_ms: 0,
            step_budget: 1,
        },
        light_pre_pass: false,
        ..MbpConfig::default()
    };
    let vars = [s.x, s.y];
    let err = project_with_config(&mut s.mgr, &s.model, &vars, s.fml, &config, false).unwrap_err();
    assert!(matches!(err, QeError::Cancelled(_)));
}

#[test]
fn uninterpreted_variable_uses_equal_term() {
    let mut mgr = TermManager::new();
    let u = Sort::uninterpreted("U");
    let x = mgr.mk_const("x", u.clone()).unwrap();
    let a = mgr.mk_const("a", u.clone()).unwrap();
    let f = mgr.declare_fun("f", vec![u.clone()], Sort::Int).unwrap();
    let fx = mgr.mk_app(f, &[x]).unwrap();
    let fa = mgr.mk_app(f, &[a]).unwrap();
    let zero = mgr.mk_int(0);
    let pos = mgr.mk_lt(zero, fx).unwrap();
    let ge = mgr.mk_le(zero, fa).unwrap();
    let fml = mgr.mk_and(&[pos, ge]).unwrap();

    let mut model = Model::with_completion();
    model.assign(&mgr, x, Value::Elem(u.clone(), 0)).unwrap();
    model.assign(&mgr, a, Value::Elem(u, 0)).unwrap();
    model.define_fun(
        f,
        kestrel_core::FuncInterp::new(Some(Value::int(1))),
    );

    let p = project_skolem(&mut mgr, &model, &[x], fml).unwrap();
    assert_eq!(p.rules[&x], ProjectionRule::Equality);
    assert_eq!(p.witnesses[&x], a);
    assert!(!mgr.contains(p.formula, x));
}

#[test]
fn stats_serialize_to_json() {
    let mut s = scenario_a(Sort::Int);
    let p = project(&mut s.mgr, &s.model, &[s.x], s.fml).unwrap();
    let json = serde_json::to_value(&p.stats).unwrap();
    assert_eq!(json["requested"], 1);
    assert_eq!(json["linear_bounds"], 1);
}
