//! Hash-consed term graph.
//!
//! Every term lives in a [`TermManager`] arena and is addressed by a [`TermId`].
//! The manager keeps a unique table keyed by `(kind, sort)`, so two structurally
//! equal terms always share one handle and `TermId` equality is semantic
//! identity.
//!
//! Smart constructors (`mk_*`) only perform local rewrites: flattening, unit and
//! absorbing elements, numeral folding and trivially decided comparisons.
//! Anything deeper belongs to the callers.
//!
//! Ownership is explicit. Structures that keep a term alive past the current
//! call [`TermManager::retain`] it and [`TermManager::release`] it on teardown;
//! nothing changes a reference count implicitly.

use indexmap::{IndexMap, IndexSet};
use num::rational::BigRational;
use num::traits::{One, Zero};
use num::BigInt;
use std::collections::HashMap;
use thiserror::Error;

use crate::sort::Sort;

/// Handle of an interned term.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(u32);

impl TermId {
    /// Position of the term in the manager arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle of a declared function symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(u32);

impl FuncId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Uninterpreted function (or constant, when `domain` is empty) signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: String,
    pub domain: Vec<Sort>,
    pub range: Sort,
}

/// Shape of a term node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermKind {
    True,
    False,
    /// Integer or rational constant, depending on the node sort.
    Numeral(BigRational),
    /// Application of an uninterpreted symbol; constants have no arguments.
    App(FuncId, Vec<TermId>),
    /// Model value of an uninterpreted sort.
    Elem(u32),
    Not(TermId),
    And(Vec<TermId>),
    Or(Vec<TermId>),
    Implies(TermId, TermId),
    Ite(TermId, TermId, TermId),
    Eq(TermId, TermId),
    Add(Vec<TermId>),
    Mul(Vec<TermId>),
    Le(TermId, TermId),
    Lt(TermId, TermId),
}

impl TermKind {
    /// Direct children in argument order.
    pub fn children(&self) -> Vec<TermId> {
        match self {
            TermKind::True | TermKind::False | TermKind::Numeral(_) | TermKind::Elem(_) => {
                Vec::new()
            }
            TermKind::App(_, args)
            | TermKind::And(args)
            | TermKind::Or(args)
            | TermKind::Add(args)
            | TermKind::Mul(args) => args.clone(),
            TermKind::Not(a) => vec![*a],
            TermKind::Implies(a, b)
            | TermKind::Eq(a, b)
            | TermKind::Le(a, b)
            | TermKind::Lt(a, b) => vec![*a, *b],
            TermKind::Ite(c, t, e) => vec![*c, *t, *e],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermNode {
    pub kind: TermKind,
    pub sort: Sort,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TermError {
    #[error("Sort mismatch in {op}: expected {expected}, found {found}")]
    SortMismatch {
        op: &'static str,
        expected: Sort,
        found: Sort,
    },
    #[error("Arity mismatch for '{name}': expected {expected} arguments, found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Function '{name}' redeclared with a different signature")]
    Redeclared { name: String },
    #[error("Numeral {value} is not an integer")]
    NonIntegral { value: String },
    #[error("{op} requires at least one argument")]
    Empty { op: &'static str },
    #[error("Sort {0} has no model elements")]
    NotUninterpreted(Sort),
}

/// Arena of hash-consed terms plus the symbol table.
#[derive(Debug, Clone, Default)]
pub struct TermManager {
    nodes: Vec<TermNode>,
    unique: HashMap<(TermKind, Sort), TermId>,
    ref_counts: Vec<u32>,
    decls: Vec<FuncDecl>,
    decl_lookup: HashMap<String, FuncId>,
}

impl TermManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, kind: TermKind, sort: Sort) -> TermId {
        let key = (kind, sort);
        if let Some(&id) = self.unique.get(&key) {
            return id;
        }
        let id = TermId(self.nodes.len() as u32);
        self.nodes.push(TermNode {
            kind: key.0.clone(),
            sort: key.1.clone(),
        });
        self.ref_counts.push(0);
        self.unique.insert(key, id);
        id
    }

    // === Accessors ===

    pub fn node(&self, t: TermId) -> &TermNode {
        &self.nodes[t.index()]
    }

    pub fn kind(&self, t: TermId) -> &TermKind {
        &self.nodes[t.index()].kind
    }

    pub fn sort(&self, t: TermId) -> &Sort {
        &self.nodes[t.index()].sort
    }

    pub fn children(&self, t: TermId) -> Vec<TermId> {
        self.kind(t).children()
    }

    /// Number of interned terms.
    pub fn num_terms(&self) -> usize {
        self.nodes.len()
    }

    pub fn decl(&self, f: FuncId) -> &FuncDecl {
        &self.decls[f.index()]
    }

    /// Whether `t` is an application of an uninterpreted symbol.
    pub fn is_app(&self, t: TermId) -> bool {
        matches!(self.kind(t), TermKind::App(..))
    }

    pub fn is_true(&self, t: TermId) -> bool {
        matches!(self.kind(t), TermKind::True)
    }

    pub fn is_false(&self, t: TermId) -> bool {
        matches!(self.kind(t), TermKind::False)
    }

    pub fn numeral(&self, t: TermId) -> Option<&BigRational> {
        match self.kind(t) {
            TermKind::Numeral(value) => Some(value),
            _ => None,
        }
    }

    // === Reference counting ===

    /// Record one more external owner of `t`.
    pub fn retain(&mut self, t: TermId) {
        self.ref_counts[t.index()] += 1;
    }

    /// Drop one external owner of `t`.
    pub fn release(&mut self, t: TermId) {
        let rc = &mut self.ref_counts[t.index()];
        debug_assert!(*rc > 0, "release of an unretained term");
        *rc = rc.saturating_sub(1);
    }

    pub fn ref_count(&self, t: TermId) -> u32 {
        self.ref_counts[t.index()]
    }

    // === Symbols ===

    /// Declare (or look up) an uninterpreted function symbol.
    pub fn declare_fun(
        &mut self,
        name: &str,
        domain: Vec<Sort>,
        range: Sort,
    ) -> Result<FuncId, TermError> {
        if let Some(&f) = self.decl_lookup.get(name) {
            let decl = &self.decls[f.index()];
            if decl.domain != domain || decl.range != range {
                return Err(TermError::Redeclared {
                    name: name.to_string(),
                });
            }
            return Ok(f);
        }
        let f = FuncId(self.decls.len() as u32);
        self.decls.push(FuncDecl {
            name: name.to_string(),
            domain,
            range,
        });
        self.decl_lookup.insert(name.to_string(), f);
        Ok(f)
    }

    // === Leaf constructors ===

    pub fn mk_true(&mut self) -> TermId {
        self.intern(TermKind::True, Sort::Bool)
    }

    pub fn mk_false(&mut self) -> TermId {
        self.intern(TermKind::False, Sort::Bool)
    }

    pub fn mk_bool(&mut self, value: bool) -> TermId {
        if value {
            self.mk_true()
        } else {
            self.mk_false()
        }
    }

    pub fn mk_int(&mut self, value: i64) -> TermId {
        self.intern(
            TermKind::Numeral(BigRational::from_integer(BigInt::from(value))),
            Sort::Int,
        )
    }

    pub fn mk_real(&mut self, value: BigRational) -> TermId {
        self.intern(TermKind::Numeral(value), Sort::Real)
    }

    /// Numeral of an arithmetic sort; Int numerals must be integral.
    pub fn mk_numeral(&mut self, value: BigRational, sort: &Sort) -> Result<TermId, TermError> {
        match sort {
            Sort::Int if !value.is_integer() => Err(TermError::NonIntegral {
                value: value.to_string(),
            }),
            Sort::Int | Sort::Real => Ok(self.intern(TermKind::Numeral(value), sort.clone())),
            other => Err(TermError::SortMismatch {
                op: "numeral",
                expected: Sort::Real,
                found: other.clone(),
            }),
        }
    }

    /// Model element `idx` of an uninterpreted sort.
    pub fn mk_elem(&mut self, sort: &Sort, idx: u32) -> Result<TermId, TermError> {
        match sort {
            Sort::Uninterpreted(_) => Ok(self.intern(TermKind::Elem(idx), sort.clone())),
            other => Err(TermError::NotUninterpreted(other.clone())),
        }
    }

    pub fn mk_app(&mut self, f: FuncId, args: &[TermId]) -> Result<TermId, TermError> {
        let decl = &self.decls[f.index()];
        if decl.domain.len() != args.len() {
            return Err(TermError::ArityMismatch {
                name: decl.name.clone(),
                expected: decl.domain.len(),
                found: args.len(),
            });
        }
        for (expected, arg) in decl.domain.iter().zip(args) {
            let found = &self.nodes[arg.index()].sort;
            if expected != found {
                return Err(TermError::SortMismatch {
                    op: "application",
                    expected: expected.clone(),
                    found: found.clone(),
                });
            }
        }
        let range = decl.range.clone();
        Ok(self.intern(TermKind::App(f, args.to_vec()), range))
    }

    /// Declare a nullary symbol and return its application.
    pub fn mk_const(&mut self, name: &str, sort: Sort) -> Result<TermId, TermError> {
        let f = self.declare_fun(name, Vec::new(), sort)?;
        self.mk_app(f, &[])
    }

    // === Boolean constructors ===

    fn expect_sort(&self, op: &'static str, t: TermId, expected: &Sort) -> Result<(), TermError> {
        let found = self.sort(t);
        if found != expected {
            return Err(TermError::SortMismatch {
                op,
                expected: expected.clone(),
                found: found.clone(),
            });
        }
        Ok(())
    }

    pub fn mk_not(&mut self, t: TermId) -> Result<TermId, TermError> {
        self.expect_sort("not", t, &Sort::Bool)?;
        Ok(match self.kind(t) {
            TermKind::True => self.mk_false(),
            TermKind::False => self.mk_true(),
            TermKind::Not(inner) => *inner,
            _ => self.intern(TermKind::Not(t), Sort::Bool),
        })
    }

    pub fn mk_and(&mut self, args: &[TermId]) -> Result<TermId, TermError> {
        self.mk_junction(args, true)
    }

    pub fn mk_or(&mut self, args: &[TermId]) -> Result<TermId, TermError> {
        self.mk_junction(args, false)
    }

    /// Shared body of `and` (`conj = true`) and `or`.
    fn mk_junction(&mut self, args: &[TermId], conj: bool) -> Result<TermId, TermError> {
        let op = if conj { "and" } else { "or" };
        let mut flat: IndexSet<TermId> = IndexSet::new();
        let mut stack: Vec<TermId> = args.iter().rev().copied().collect();
        while let Some(t) = stack.pop() {
            self.expect_sort(op, t, &Sort::Bool)?;
            match (self.kind(t), conj) {
                (TermKind::True, true) | (TermKind::False, false) => {}
                (TermKind::False, true) => return Ok(self.mk_false()),
                (TermKind::True, false) => return Ok(self.mk_true()),
                (TermKind::And(inner), true) | (TermKind::Or(inner), false) => {
                    stack.extend(inner.iter().rev().copied());
                }
                _ => {
                    flat.insert(t);
                }
            }
        }
        for &t in &flat {
            if let TermKind::Not(inner) = self.kind(t) {
                if flat.contains(inner) {
                    return Ok(self.mk_bool(!conj));
                }
            }
        }
        Ok(match flat.len() {
            0 => self.mk_bool(conj),
            1 => flat[0],
            _ => {
                let items: Vec<TermId> = flat.into_iter().collect();
                let kind = if conj {
                    TermKind::And(items)
                } else {
                    TermKind::Or(items)
                };
                self.intern(kind, Sort::Bool)
            }
        })
    }

    pub fn mk_implies(&mut self, a: TermId, b: TermId) -> Result<TermId, TermError> {
        self.expect_sort("=>", a, &Sort::Bool)?;
        self.expect_sort("=>", b, &Sort::Bool)?;
        if self.is_true(a) {
            return Ok(b);
        }
        if self.is_false(a) || self.is_true(b) || a == b {
            return Ok(self.mk_true());
        }
        if self.is_false(b) {
            return self.mk_not(a);
        }
        Ok(self.intern(TermKind::Implies(a, b), Sort::Bool))
    }

    pub fn mk_ite(&mut self, c: TermId, t: TermId, e: TermId) -> Result<TermId, TermError> {
        self.expect_sort("ite", c, &Sort::Bool)?;
        let sort = self.sort(t).clone();
        self.expect_sort("ite", e, &sort)?;
        if self.is_true(c) || t == e {
            return Ok(t);
        }
        if self.is_false(c) {
            return Ok(e);
        }
        Ok(self.intern(TermKind::Ite(c, t, e), sort))
    }

    /// Equality; arguments are stored in handle order so `a = b` and `b = a`
    /// intern to the same node.
    pub fn mk_eq(&mut self, a: TermId, b: TermId) -> Result<TermId, TermError> {
        let sort = self.sort(a).clone();
        self.expect_sort("=", b, &sort)?;
        if a == b {
            return Ok(self.mk_true());
        }
        match (self.kind(a), self.kind(b)) {
            (TermKind::Numeral(x), TermKind::Numeral(y)) => {
                let equal = x == y;
                return Ok(self.mk_bool(equal));
            }
            (TermKind::Elem(_), TermKind::Elem(_))
            | (TermKind::True, TermKind::False)
            | (TermKind::False, TermKind::True) => return Ok(self.mk_false()),
            (TermKind::True, _) => return Ok(b),
            (_, TermKind::True) => return Ok(a),
            (TermKind::False, _) => return self.mk_not(b),
            (_, TermKind::False) => return self.mk_not(a),
            _ => {}
        }
        let (lhs, rhs) = if a <= b { (a, b) } else { (b, a) };
        Ok(self.intern(TermKind::Eq(lhs, rhs), Sort::Bool))
    }

    // === Arithmetic constructors ===

    fn arith_sort(&self, op: &'static str, args: &[TermId]) -> Result<Sort, TermError> {
        let first = args.first().ok_or(TermError::Empty { op })?;
        let sort = self.sort(*first).clone();
        if !sort.is_arith() {
            return Err(TermError::SortMismatch {
                op,
                expected: Sort::Real,
                found: sort,
            });
        }
        for &arg in &args[1..] {
            self.expect_sort(op, arg, &sort)?;
        }
        Ok(sort)
    }

    pub fn mk_add(&mut self, args: &[TermId]) -> Result<TermId, TermError> {
        let sort = self.arith_sort("+", args)?;
        let mut constant = BigRational::zero();
        let mut items = Vec::with_capacity(args.len());
        let mut stack: Vec<TermId> = args.iter().rev().copied().collect();
        while let Some(t) = stack.pop() {
            match self.kind(t) {
                TermKind::Numeral(value) => constant += value,
                TermKind::Add(inner) => stack.extend(inner.iter().rev().copied()),
                _ => items.push(t),
            }
        }
        if !constant.is_zero() || items.is_empty() {
            items.push(self.intern(TermKind::Numeral(constant), sort.clone()));
        }
        Ok(if items.len() == 1 {
            items[0]
        } else {
            self.intern(TermKind::Add(items), sort)
        })
    }

    pub fn mk_mul(&mut self, args: &[TermId]) -> Result<TermId, TermError> {
        let sort = self.arith_sort("*", args)?;
        let mut coeff = BigRational::one();
        let mut items = Vec::with_capacity(args.len());
        let mut stack: Vec<TermId> = args.iter().rev().copied().collect();
        while let Some(t) = stack.pop() {
            match self.kind(t) {
                TermKind::Numeral(value) => coeff *= value,
                TermKind::Mul(inner) => stack.extend(inner.iter().rev().copied()),
                _ => items.push(t),
            }
        }
        if coeff.is_zero() {
            return Ok(self.intern(TermKind::Numeral(coeff), sort));
        }
        if !coeff.is_one() || items.is_empty() {
            items.insert(0, self.intern(TermKind::Numeral(coeff), sort.clone()));
        }
        Ok(if items.len() == 1 {
            items[0]
        } else {
            self.intern(TermKind::Mul(items), sort)
        })
    }

    /// `value * t` for a numeral coefficient.
    pub fn mk_scaled(&mut self, value: &BigRational, t: TermId) -> Result<TermId, TermError> {
        let sort = self.sort(t).clone();
        let c = self.mk_numeral(value.clone(), &sort)?;
        self.mk_mul(&[c, t])
    }

    pub fn mk_neg(&mut self, t: TermId) -> Result<TermId, TermError> {
        self.mk_scaled(&-BigRational::one(), t)
    }

    pub fn mk_sub(&mut self, a: TermId, b: TermId) -> Result<TermId, TermError> {
        let neg = self.mk_neg(b)?;
        self.mk_add(&[a, neg])
    }

    pub fn mk_le(&mut self, a: TermId, b: TermId) -> Result<TermId, TermError> {
        self.arith_sort("<=", &[a, b])?;
        if a == b {
            return Ok(self.mk_true());
        }
        if let (Some(x), Some(y)) = (self.numeral(a), self.numeral(b)) {
            let holds = x <= y;
            return Ok(self.mk_bool(holds));
        }
        Ok(self.intern(TermKind::Le(a, b), Sort::Bool))
    }

    pub fn mk_lt(&mut self, a: TermId, b: TermId) -> Result<TermId, TermError> {
        self.arith_sort("<", &[a, b])?;
        if a == b {
            return Ok(self.mk_false());
        }
        if let (Some(x), Some(y)) = (self.numeral(a), self.numeral(b)) {
            let holds = x < y;
            return Ok(self.mk_bool(holds));
        }
        Ok(self.intern(TermKind::Lt(a, b), Sort::Bool))
    }

    pub fn mk_ge(&mut self, a: TermId, b: TermId) -> Result<TermId, TermError> {
        self.mk_le(b, a)
    }

    pub fn mk_gt(&mut self, a: TermId, b: TermId) -> Result<TermId, TermError> {
        self.mk_lt(b, a)
    }

    /// Rebuild `t` with new children through the smart constructors.
    pub fn rebuild(&mut self, t: TermId, children: &[TermId]) -> Result<TermId, TermError> {
        let kind = self.kind(t).clone();
        match kind {
            TermKind::True | TermKind::False | TermKind::Numeral(_) | TermKind::Elem(_) => Ok(t),
            TermKind::App(f, _) => self.mk_app(f, children),
            TermKind::Not(_) => self.mk_not(children[0]),
            TermKind::And(_) => self.mk_and(children),
            TermKind::Or(_) => self.mk_or(children),
            TermKind::Implies(..) => self.mk_implies(children[0], children[1]),
            TermKind::Ite(..) => self.mk_ite(children[0], children[1], children[2]),
            TermKind::Eq(..) => self.mk_eq(children[0], children[1]),
            TermKind::Add(_) => self.mk_add(children),
            TermKind::Mul(_) => self.mk_mul(children),
            TermKind::Le(..) => self.mk_le(children[0], children[1]),
            TermKind::Lt(..) => self.mk_lt(children[0], children[1]),
        }
    }

    // === Traversal ===

    /// Replace every occurrence of a key of `map` inside `t` by its value.
    pub fn substitute(
        &mut self,
        t: TermId,
        map: &IndexMap<TermId, TermId>,
    ) -> Result<TermId, TermError> {
        if map.is_empty() {
            return Ok(t);
        }
        let mut cache = HashMap::new();
        self.substitute_cached(t, map, &mut cache)
    }

    /// Apply one substitution to several terms, sharing the rewrite cache.
    pub fn substitute_all(
        &mut self,
        terms: &[TermId],
        map: &IndexMap<TermId, TermId>,
    ) -> Result<Vec<TermId>, TermError> {
        let mut cache = HashMap::new();
        terms
            .iter()
            .map(|&t| self.substitute_cached(t, map, &mut cache))
            .collect()
    }

    fn substitute_cached(
        &mut self,
        t: TermId,
        map: &IndexMap<TermId, TermId>,
        cache: &mut HashMap<TermId, TermId>,
    ) -> Result<TermId, TermError> {
        if let Some(&r) = map.get(&t) {
            return Ok(r);
        }
        if let Some(&r) = cache.get(&t) {
            return Ok(r);
        }
        let children = self.children(t);
        let result = if children.is_empty() {
            t
        } else {
            let mut new_children = Vec::with_capacity(children.len());
            for &c in &children {
                new_children.push(self.substitute_cached(c, map, cache)?);
            }
            if new_children == children {
                t
            } else {
                self.rebuild(t, &new_children)?
            }
        };
        cache.insert(t, result);
        Ok(result)
    }

    /// Whether `sub` occurs inside `t` (or is `t`).
    pub fn contains(&self, t: TermId, sub: TermId) -> bool {
        let mut visited = IndexSet::new();
        let mut stack = vec![t];
        while let Some(cur) = stack.pop() {
            if cur == sub {
                return true;
            }
            if visited.insert(cur) {
                stack.extend(self.kind(cur).children());
            }
        }
        false
    }

    /// Distinct subterms of `t` in post-order (children before parents).
    pub fn subterms(&self, t: TermId) -> Vec<TermId> {
        let mut order = Vec::new();
        let mut visited = IndexSet::new();
        let mut stack = vec![(t, false)];
        while let Some((cur, expanded)) = stack.pop() {
            if expanded {
                order.push(cur);
                continue;
            }
            if !visited.insert(cur) {
                continue;
            }
            stack.push((cur, true));
            for c in self.kind(cur).children().into_iter().rev() {
                if !visited.contains(&c) {
                    stack.push((c, false));
                }
            }
        }
        order
    }

    /// Uninterpreted applications occurring in `t`, in post-order.
    pub fn collect_apps(&self, t: TermId) -> IndexSet<TermId> {
        self.subterms(t)
            .into_iter()
            .filter(|&s| self.is_app(s))
            .collect()
    }

    /// Split top-level conjunctions (including negated disjunctions) into a
    /// duplicate-free list of conjuncts. `true` conjuncts are dropped.
    pub fn flatten_and(&mut self, facts: &[TermId]) -> Result<Vec<TermId>, TermError> {
        let mut out: IndexSet<TermId> = IndexSet::new();
        let mut stack: Vec<TermId> = facts.iter().rev().copied().collect();
        while let Some(t) = stack.pop() {
            match self.kind(t).clone() {
                TermKind::True => {}
                TermKind::And(args) => stack.extend(args.into_iter().rev()),
                TermKind::Not(inner) => match self.kind(inner).clone() {
                    TermKind::Or(args) => {
                        let mut negated = Vec::with_capacity(args.len());
                        for a in args {
                            negated.push(self.mk_not(a)?);
                        }
                        stack.extend(negated.into_iter().rev());
                    }
                    TermKind::Implies(a, b) => {
                        let nb = self.mk_not(b)?;
                        stack.push(nb);
                        stack.push(a);
                    }
                    _ => {
                        out.insert(t);
                    }
                },
                _ => {
                    out.insert(t);
                }
            }
        }
        Ok(out.into_iter().collect())
    }
}

/// Keep-alive list of terms owned beyond a single call.
#[derive(Debug, Default)]
pub struct Trail {
    terms: Vec<TermId>,
}

impl Trail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain `t` and keep it on the trail.
    pub fn push(&mut self, mgr: &mut TermManager, t: TermId) {
        mgr.retain(t);
        self.terms.push(t);
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Release every term on the trail.
    pub fn release_all(&mut self, mgr: &mut TermManager) {
        for t in self.terms.drain(..) {
            mgr.release(t);
        }
    }
}
