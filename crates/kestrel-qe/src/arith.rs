//! Linear arithmetic projection rules.
//!
//! Both rules work on the literal list of an implicant. They give up (return
//! `None`) whenever the variable is not handled exactly; the engine then tries
//! the next rule.

use num::rational::BigRational;
use num::traits::{One, Signed, Zero};
use num::BigInt;
use tracing::trace;

use kestrel_core::{Model, Sort, TermId, TermManager};

use crate::error::QeError;
use crate::linear::{self, ArithLit, Cmp, LinearExpr};
use crate::mbp::{substitute_literals, RuleOutcome};

/// Solve an equality literal for `x` and substitute the solution everywhere.
pub(crate) fn linear_equality(
    mgr: &mut TermManager,
    x: TermId,
    literals: &[TermId],
) -> Result<Option<RuleOutcome>, QeError> {
    let sort = mgr.sort(x).clone();
    for (i, &lit) in literals.iter().enumerate() {
        if !mgr.contains(lit, x) {
            continue;
        }
        let Some(al) = ArithLit::from_term(mgr, lit) else {
            continue;
        };
        if al.cmp != Cmp::Eq {
            continue;
        }
        let Some(solution) = linear::solve_for(mgr, &al.expr, x) else {
            continue;
        };
        let witness = solution.to_term(mgr, &sort)?;
        let rest: Vec<TermId> = literals
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, &l)| l)
            .collect();
        let literals = substitute_literals(mgr, &rest, x, witness)?;
        return Ok(Some(RuleOutcome { literals, witness }));
    }
    Ok(None)
}

#[derive(Debug, Clone)]
struct Bound {
    expr: LinearExpr,
    strict: bool,
    value: BigRational,
}

/// Index of the best bound; `tighter(a, b)` says whether `a` beats `b` on value.
fn select(bounds: &[Bound], tighter: impl Fn(&BigRational, &BigRational) -> bool) -> usize {
    let mut best = 0;
    for (i, b) in bounds.iter().enumerate().skip(1) {
        let cur = &bounds[best];
        if tighter(&b.value, &cur.value) || (b.value == cur.value && b.strict && !cur.strict) {
            best = i;
        }
    }
    best
}

/// Build `lhs < rhs` or `lhs <= rhs`.
fn resolvent(
    mgr: &mut TermManager,
    sort: &Sort,
    lhs: &LinearExpr,
    strict: bool,
    rhs: &LinearExpr,
) -> Result<TermId, QeError> {
    let a = lhs.to_term(mgr, sort)?;
    let b = rhs.to_term(mgr, sort)?;
    Ok(if strict {
        mgr.mk_lt(a, b)?
    } else {
        mgr.mk_le(a, b)?
    })
}

fn push_literal(mgr: &TermManager, out: &mut Vec<TermId>, lit: TermId) {
    if !mgr.is_true(lit) && !out.contains(&lit) {
        out.push(lit);
    }
}

/// Model-guided bound resolution (Loos-Weispfenning style).
///
/// Every literal mentioning `x` must be a linear inequality in which `x`
/// occurs only with a direct coefficient; for Int variables that coefficient
/// must be a unit, and strict bounds have already been tightened.
pub(crate) fn linear_bounds(
    mgr: &mut TermManager,
    model: &Model,
    x: TermId,
    literals: &[TermId],
) -> Result<Option<RuleOutcome>, QeError> {
    let sort = mgr.sort(x).clone();
    let is_int = sort.is_int();
    let mut lowers = Vec::new();
    let mut uppers = Vec::new();
    let mut kept = Vec::new();
    for &lit in literals {
        if !mgr.contains(lit, x) {
            kept.push(lit);
            continue;
        }
        let Some(al) = ArithLit::from_term(mgr, lit) else {
            return Ok(None);
        };
        if al.cmp == Cmp::Eq || al.expr.mentions_inside_atoms(mgr, x) {
            return Ok(None);
        }
        let mut rest = al.expr;
        let c = rest.take(x);
        if c.is_zero() || (is_int && !c.abs().is_one()) {
            return Ok(None);
        }
        // c*x + rest CMP 0  =>  x CMP' -rest/c
        let expr = rest.scaled(&(-c.recip()));
        let value = expr.eval(mgr, model)?;
        let bound = Bound {
            expr,
            strict: al.cmp == Cmp::Lt,
            value,
        };
        if c.is_positive() {
            uppers.push(bound);
        } else {
            lowers.push(bound);
        }
    }
    trace!(lowers = lowers.len(), uppers = uppers.len(), "bounds collected");

    let one = LinearExpr::constant(BigRational::one());
    let mut out = kept;
    let witness_expr = if !lowers.is_empty() {
        let sel = select(&lowers, |a, b| a > b);
        let l_sel = &lowers[sel];
        for (j, l) in lowers.iter().enumerate() {
            if j != sel {
                let lit = resolvent(mgr, &sort, &l.expr, l.strict && !l_sel.strict, &l_sel.expr)?;
                push_literal(mgr, &mut out, lit);
            }
        }
        for u in &uppers {
            let lit = resolvent(mgr, &sort, &l_sel.expr, l_sel.strict || u.strict, &u.expr)?;
            push_literal(mgr, &mut out, lit);
        }
        if !l_sel.strict {
            l_sel.expr.clone()
        } else if uppers.is_empty() {
            let mut w = l_sel.expr.clone();
            w.add_scaled(&one, &BigRational::one());
            w
        } else {
            let min = select(&uppers, |a, b| a < b);
            let u_min = &uppers[min];
            for (k, u) in uppers.iter().enumerate() {
                if k != min {
                    let lit = resolvent(mgr, &sort, &u_min.expr, false, &u.expr)?;
                    push_literal(mgr, &mut out, lit);
                }
            }
            let half = BigRational::new(BigInt::from(1), BigInt::from(2));
            let mut w = l_sel.expr.scaled(&half);
            w.add_scaled(&u_min.expr, &half);
            w
        }
    } else if !uppers.is_empty() {
        let sel = select(&uppers, |a, b| a < b);
        let u_sel = &uppers[sel];
        for (k, u) in uppers.iter().enumerate() {
            if k != sel {
                let lit = resolvent(mgr, &sort, &u_sel.expr, u.strict && !u_sel.strict, &u.expr)?;
                push_literal(mgr, &mut out, lit);
            }
        }
        if u_sel.strict {
            let mut w = u_sel.expr.clone();
            w.add_scaled(&one, &-BigRational::one());
            w
        } else {
            u_sel.expr.clone()
        }
    } else {
        return Ok(None);
    };
    let witness = witness_expr.to_term(mgr, &sort)?;
    Ok(Some(RuleOutcome {
        literals: out,
        witness,
    }))
}
