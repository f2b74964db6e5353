//! Linear arithmetic view of terms.
//!
//! [`linearize`] turns an arithmetic term into `sum(c_i * a_i) + k`, where
//! each `a_i` is an opaque atom (a constant, an application, an `ite`, or a
//! non-linear product). Atoms may themselves contain a variable being
//! projected; callers check that with [`LinearExpr::mentions_inside_atoms`].

use indexmap::IndexMap;
use num::rational::BigRational;
use num::traits::{One, Signed, Zero};

use kestrel_core::{Model, Sort, TermError, TermId, TermKind, TermManager};

use crate::error::QeError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinearExpr {
    pub coeffs: IndexMap<TermId, BigRational>,
    pub constant: BigRational,
}

impl LinearExpr {
    pub fn constant(value: BigRational) -> Self {
        Self {
            coeffs: IndexMap::new(),
            constant: value,
        }
    }

    pub fn atom(t: TermId) -> Self {
        let mut coeffs = IndexMap::new();
        coeffs.insert(t, BigRational::one());
        Self {
            coeffs,
            constant: BigRational::zero(),
        }
    }

    pub fn is_constant(&self) -> bool {
        self.coeffs.is_empty()
    }

    pub fn coeff(&self, t: TermId) -> BigRational {
        self.coeffs.get(&t).cloned().unwrap_or_else(BigRational::zero)
    }

    /// `self += k * other`.
    pub fn add_scaled(&mut self, other: &LinearExpr, k: &BigRational) {
        for (&t, c) in &other.coeffs {
            let entry = self.coeffs.entry(t).or_insert_with(BigRational::zero);
            *entry += c * k;
            if entry.is_zero() {
                self.coeffs.shift_remove(&t);
            }
        }
        self.constant += &other.constant * k;
    }

    pub fn scaled(&self, k: &BigRational) -> LinearExpr {
        let mut out = LinearExpr::default();
        out.add_scaled(self, k);
        out
    }

    pub fn sub(&self, other: &LinearExpr) -> LinearExpr {
        let mut out = self.clone();
        out.add_scaled(other, &-BigRational::one());
        out
    }

    /// Remove `t` and return its coefficient.
    pub fn take(&mut self, t: TermId) -> BigRational {
        self.coeffs
            .shift_remove(&t)
            .unwrap_or_else(BigRational::zero)
    }

    /// Whether `x` occurs inside an atom other than `x` itself.
    pub fn mentions_inside_atoms(&self, mgr: &TermManager, x: TermId) -> bool {
        self.coeffs
            .keys()
            .any(|&a| a != x && mgr.contains(a, x))
    }

    pub fn eval(&self, mgr: &TermManager, model: &Model) -> Result<BigRational, QeError> {
        let mut sum = self.constant.clone();
        for (&t, c) in &self.coeffs {
            sum += model.num_value(mgr, t)? * c;
        }
        Ok(sum)
    }

    pub fn to_term(&self, mgr: &mut TermManager, sort: &Sort) -> Result<TermId, TermError> {
        let mut summands = Vec::with_capacity(self.coeffs.len() + 1);
        for (&t, c) in &self.coeffs {
            if c.is_one() {
                summands.push(t);
            } else {
                summands.push(mgr.mk_scaled(c, t)?);
            }
        }
        if !self.constant.is_zero() || summands.is_empty() {
            summands.push(mgr.mk_numeral(self.constant.clone(), sort)?);
        }
        mgr.mk_add(&summands)
    }
}

pub fn linearize(mgr: &TermManager, t: TermId) -> LinearExpr {
    match mgr.kind(t) {
        TermKind::Numeral(value) => LinearExpr::constant(value.clone()),
        TermKind::Add(args) => {
            let mut out = LinearExpr::default();
            for &a in args {
                out.add_scaled(&linearize(mgr, a), &BigRational::one());
            }
            out
        }
        TermKind::Mul(args) => {
            let mut out = LinearExpr::constant(BigRational::one());
            for &a in args {
                let factor = linearize(mgr, a);
                if factor.is_constant() {
                    out = out.scaled(&factor.constant);
                } else if out.is_constant() {
                    out = factor.scaled(&out.constant);
                } else {
                    return LinearExpr::atom(t);
                }
            }
            out
        }
        _ => LinearExpr::atom(t),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Le,
    Lt,
    Eq,
}

/// `expr CMP 0` over an arithmetic sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArithLit {
    pub expr: LinearExpr,
    pub cmp: Cmp,
    pub sort: Sort,
}

impl ArithLit {
    /// Read a comparison literal. Negations are not handled; implicants
    /// contain only positive comparisons.
    pub fn from_term(mgr: &TermManager, lit: TermId) -> Option<ArithLit> {
        let (a, b, cmp) = match mgr.kind(lit) {
            TermKind::Le(a, b) => (*a, *b, Cmp::Le),
            TermKind::Lt(a, b) => (*a, *b, Cmp::Lt),
            TermKind::Eq(a, b) if mgr.sort(*a).is_arith() => (*a, *b, Cmp::Eq),
            _ => return None,
        };
        let mut lit = ArithLit {
            expr: linearize(mgr, a).sub(&linearize(mgr, b)),
            cmp,
            sort: mgr.sort(a).clone(),
        };
        // e < 0 over the integers is e + 1 <= 0
        if lit.cmp == Cmp::Lt && lit.sort.is_int() {
            lit.expr.constant += BigRational::one();
            lit.cmp = Cmp::Le;
        }
        Some(lit)
    }
}

/// Solve `expr = 0` for `x`. Returns `None` when `x` has no direct
/// coefficient, occurs inside another atom, or (for Int) the coefficient is
/// not a unit.
pub fn solve_for(mgr: &TermManager, expr: &LinearExpr, x: TermId) -> Option<LinearExpr> {
    let c = expr.coeffs.get(&x)?;
    if expr.mentions_inside_atoms(mgr, x) {
        return None;
    }
    if mgr.sort(x).is_int() && !c.abs().is_one() {
        return None;
    }
    let mut rest = expr.clone();
    let c = rest.take(x);
    Some(rest.scaled(&(-c.recip())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::BigInt;

    fn rat(n: i64) -> BigRational {
        BigRational::from_integer(BigInt::from(n))
    }

    #[test]
    fn linearize_collects_like_terms() {
        let mut mgr = TermManager::new();
        let x = mgr.mk_const("x", Sort::Real).unwrap();
        let y = mgr.mk_const("y", Sort::Real).unwrap();
        let two = mgr.mk_real(rat(2));
        let three = mgr.mk_real(rat(3));
        let two_x = mgr.mk_mul(&[two, x]).unwrap();
        let t = mgr.mk_add(&[two_x, y, x, three]).unwrap();
        let e = linearize(&mgr, t);
        assert_eq!(e.coeff(x), rat(3));
        assert_eq!(e.coeff(y), rat(1));
        assert_eq!(e.constant, rat(3));
    }

    #[test]
    fn nonlinear_products_are_atoms() {
        let mut mgr = TermManager::new();
        let x = mgr.mk_const("x", Sort::Real).unwrap();
        let y = mgr.mk_const("y", Sort::Real).unwrap();
        let xy = mgr.mk_mul(&[x, y]).unwrap();
        let e = linearize(&mgr, xy);
        assert_eq!(e.coeff(xy), rat(1));
        assert!(e.mentions_inside_atoms(&mgr, x));
        assert!(solve_for(&mgr, &e, x).is_none());
    }

    #[test]
    fn int_strict_literals_are_tightened() {
        let mut mgr = TermManager::new();
        let x = mgr.mk_const("x", Sort::Int).unwrap();
        let five = mgr.mk_int(5);
        let lt = mgr.mk_lt(x, five).unwrap();
        let lit = ArithLit::from_term(&mgr, lt).unwrap();
        assert_eq!(lit.cmp, Cmp::Le);
        assert_eq!(lit.expr.constant, rat(-4));
    }

    #[test]
    fn solve_for_requires_unit_coefficient_on_ints() {
        let mut mgr = TermManager::new();
        let x = mgr.mk_const("x", Sort::Int).unwrap();
        let y = mgr.mk_const("y", Sort::Int).unwrap();
        let mut e = LinearExpr::atom(x);
        e.add_scaled(&LinearExpr::atom(y), &rat(-2));
        // x - 2y = 0  =>  x = 2y
        let sol = solve_for(&mgr, &e, x).unwrap();
        assert_eq!(sol.coeff(y), rat(2));
        assert!(solve_for(&mgr, &e, y).is_none());
    }
}
