use num::rational::BigRational;
use num::traits::Signed;
use std::fmt;

use crate::term::{TermId, TermKind, TermManager};

fn numeral_to_smtlib(value: &BigRational, is_int: bool) -> String {
    let magnitude = value.abs();
    let body = if magnitude.is_integer() {
        if is_int {
            magnitude.numer().to_string()
        } else {
            format!("{}.0", magnitude.numer())
        }
    } else {
        format!("(/ {} {})", magnitude.numer(), magnitude.denom())
    };
    if value.is_negative() {
        format!("(- {body})")
    } else {
        body
    }
}

fn nary(op: &str, mgr: &TermManager, args: &[TermId]) -> String {
    let inner: Vec<String> = args.iter().map(|&a| to_smtlib(mgr, a)).collect();
    format!("({op} {})", inner.join(" "))
}

/// Print a term as SMT-LIB2.
pub fn to_smtlib(mgr: &TermManager, t: TermId) -> String {
    match mgr.kind(t) {
        TermKind::True => "true".to_string(),
        TermKind::False => "false".to_string(),
        TermKind::Numeral(value) => numeral_to_smtlib(value, mgr.sort(t).is_int()),
        TermKind::App(f, args) => {
            let name = &mgr.decl(*f).name;
            if args.is_empty() {
                name.clone()
            } else {
                nary(name, mgr, args)
            }
        }
        TermKind::Elem(idx) => format!("{}!val!{idx}", mgr.sort(t)),
        TermKind::Not(a) => format!("(not {})", to_smtlib(mgr, *a)),
        TermKind::And(args) => nary("and", mgr, args),
        TermKind::Or(args) => nary("or", mgr, args),
        TermKind::Add(args) => nary("+", mgr, args),
        TermKind::Mul(args) => nary("*", mgr, args),
        TermKind::Implies(a, b) => nary("=>", mgr, &[*a, *b]),
        TermKind::Eq(a, b) => nary("=", mgr, &[*a, *b]),
        TermKind::Le(a, b) => nary("<=", mgr, &[*a, *b]),
        TermKind::Lt(a, b) => nary("<", mgr, &[*a, *b]),
        TermKind::Ite(c, th, el) => nary("ite", mgr, &[*c, *th, *el]),
    }
}

/// `Display` adapter pairing a term with its manager.
pub struct DisplayTerm<'a> {
    mgr: &'a TermManager,
    term: TermId,
}

impl fmt::Display for DisplayTerm<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_smtlib(self.mgr, self.term))
    }
}

impl TermManager {
    pub fn display(&self, t: TermId) -> DisplayTerm<'_> {
        DisplayTerm { mgr: self, term: t }
    }
}
