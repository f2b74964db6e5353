//! Polynomial decision diagrams over the rationals.
//!
//! A non-constant node `(v, hi, lo)` denotes `v * hi + lo`. `lo` only
//! mentions variables below `v`; `hi` mentions no variable above `v` and may
//! mention `v` itself (powers). `hi` is never zero. Together with the unique
//! table this makes every polynomial's representation canonical, so two
//! handles are equal exactly when the polynomials are.

use num::rational::BigRational;
use num::traits::{One, Zero};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Handle of an interned polynomial.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pdd(u32);

impl Pdd {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PddNode {
    Const(BigRational),
    Node { var: u32, hi: Pdd, lo: Pdd },
}

/// A monomial `coeff * vars[0] * vars[1] * ...`, variables ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monomial {
    pub coeff: BigRational,
    pub vars: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct PddManager {
    nodes: Vec<PddNode>,
    unique: HashMap<PddNode, Pdd>,
    add_cache: HashMap<(Pdd, Pdd), Pdd>,
    mul_cache: HashMap<(Pdd, Pdd), Pdd>,
    zero: Pdd,
    one: Pdd,
    num_vars: u32,
}

impl Default for PddManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PddManager {
    pub fn new() -> Self {
        let mut mgr = Self {
            nodes: Vec::new(),
            unique: HashMap::new(),
            add_cache: HashMap::new(),
            mul_cache: HashMap::new(),
            zero: Pdd(0),
            one: Pdd(0),
            num_vars: 0,
        };
        mgr.zero = mgr.intern(PddNode::Const(BigRational::zero()));
        mgr.one = mgr.intern(PddNode::Const(BigRational::one()));
        mgr
    }

    fn intern(&mut self, node: PddNode) -> Pdd {
        if let Some(&p) = self.unique.get(&node) {
            return p;
        }
        let p = Pdd(self.nodes.len() as u32);
        self.nodes.push(node.clone());
        self.unique.insert(node, p);
        p
    }

    fn node(&self, p: Pdd) -> &PddNode {
        &self.nodes[p.index()]
    }

    fn mk_node(&mut self, var: u32, hi: Pdd, lo: Pdd) -> Pdd {
        if hi == self.zero {
            return lo;
        }
        self.intern(PddNode::Node { var, hi, lo })
    }

    // === Construction ===

    pub fn zero(&self) -> Pdd {
        self.zero
    }

    pub fn one(&self) -> Pdd {
        self.one
    }

    pub fn constant(&mut self, value: BigRational) -> Pdd {
        self.intern(PddNode::Const(value))
    }

    pub fn int(&mut self, value: i64) -> Pdd {
        self.constant(BigRational::from_integer(value.into()))
    }

    pub fn mk_var(&mut self, v: u32) -> Pdd {
        self.num_vars = self.num_vars.max(v + 1);
        let (one, zero) = (self.one, self.zero);
        self.mk_node(v, one, zero)
    }

    /// One more than the largest variable index seen.
    pub fn num_vars(&self) -> u32 {
        self.num_vars
    }

    /// Number of interned nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    // === Inspection ===

    pub fn is_val(&self, p: Pdd) -> bool {
        matches!(self.node(p), PddNode::Const(_))
    }

    pub fn is_zero(&self, p: Pdd) -> bool {
        p == self.zero
    }

    pub fn value(&self, p: Pdd) -> Option<&BigRational> {
        match self.node(p) {
            PddNode::Const(c) => Some(c),
            PddNode::Node { .. } => None,
        }
    }

    /// Top (largest) variable.
    pub fn var(&self, p: Pdd) -> Option<u32> {
        match self.node(p) {
            PddNode::Const(_) => None,
            PddNode::Node { var, .. } => Some(*var),
        }
    }

    /// Cofactor of the top variable; zero for constants.
    pub fn hi(&self, p: Pdd) -> Pdd {
        match self.node(p) {
            PddNode::Const(_) => self.zero,
            PddNode::Node { hi, .. } => *hi,
        }
    }

    /// Part without the top variable; `p` itself for constants.
    pub fn lo(&self, p: Pdd) -> Pdd {
        match self.node(p) {
            PddNode::Const(_) => p,
            PddNode::Node { lo, .. } => *lo,
        }
    }

    /// Coefficient reached by following `hi` to a constant.
    pub fn leading_coeff(&self, p: Pdd) -> &BigRational {
        let mut cur = p;
        loop {
            match self.node(cur) {
                PddNode::Const(c) => return c,
                PddNode::Node { hi, .. } => cur = *hi,
            }
        }
    }

    // === Arithmetic ===

    pub fn add(&mut self, a: Pdd, b: Pdd) -> Pdd {
        if a == self.zero {
            return b;
        }
        if b == self.zero {
            return a;
        }
        let key = if a <= b { (a, b) } else { (b, a) };
        if let Some(&r) = self.add_cache.get(&key) {
            return r;
        }
        let r = match (self.node(a).clone(), self.node(b).clone()) {
            (PddNode::Const(x), PddNode::Const(y)) => self.constant(x + y),
            (PddNode::Node { var, hi, lo }, PddNode::Const(_)) => {
                let l = self.add(lo, b);
                self.mk_node(var, hi, l)
            }
            (PddNode::Const(_), PddNode::Node { var, hi, lo }) => {
                let l = self.add(a, lo);
                self.mk_node(var, hi, l)
            }
            (
                PddNode::Node {
                    var: va,
                    hi: ha,
                    lo: la,
                },
                PddNode::Node {
                    var: vb,
                    hi: hb,
                    lo: lb,
                },
            ) => {
                if va > vb {
                    let l = self.add(la, b);
                    self.mk_node(va, ha, l)
                } else if va < vb {
                    let l = self.add(a, lb);
                    self.mk_node(vb, hb, l)
                } else {
                    let h = self.add(ha, hb);
                    let l = self.add(la, lb);
                    self.mk_node(va, h, l)
                }
            }
        };
        self.add_cache.insert(key, r);
        r
    }

    pub fn scale(&mut self, p: Pdd, c: &BigRational) -> Pdd {
        if c.is_zero() {
            return self.zero;
        }
        if c.is_one() {
            return p;
        }
        let mut memo = HashMap::new();
        self.scale_rec(p, c, &mut memo)
    }

    fn scale_rec(&mut self, p: Pdd, c: &BigRational, memo: &mut HashMap<Pdd, Pdd>) -> Pdd {
        if let Some(&r) = memo.get(&p) {
            return r;
        }
        let r = match self.node(p).clone() {
            PddNode::Const(x) => self.constant(x * c),
            PddNode::Node { var, hi, lo } => {
                let h = self.scale_rec(hi, c, memo);
                let l = self.scale_rec(lo, c, memo);
                self.mk_node(var, h, l)
            }
        };
        memo.insert(p, r);
        r
    }

    pub fn neg(&mut self, p: Pdd) -> Pdd {
        self.scale(p, &-BigRational::one())
    }

    pub fn sub(&mut self, a: Pdd, b: Pdd) -> Pdd {
        let nb = self.neg(b);
        self.add(a, nb)
    }

    pub fn mul(&mut self, a: Pdd, b: Pdd) -> Pdd {
        if a == self.zero || b == self.zero {
            return self.zero;
        }
        if a == self.one {
            return b;
        }
        if b == self.one {
            return a;
        }
        let key = if a <= b { (a, b) } else { (b, a) };
        if let Some(&r) = self.mul_cache.get(&key) {
            return r;
        }
        let r = match (self.node(a).clone(), self.node(b).clone()) {
            (PddNode::Const(x), PddNode::Const(y)) => self.constant(x * y),
            (PddNode::Const(x), _) => self.scale(b, &x),
            (_, PddNode::Const(y)) => self.scale(a, &y),
            (
                PddNode::Node {
                    var: va,
                    hi: ha,
                    lo: la,
                },
                PddNode::Node {
                    var: vb,
                    hi: hb,
                    lo: lb,
                },
            ) => {
                if va > vb {
                    let h = self.mul(ha, b);
                    let l = self.mul(la, b);
                    self.mk_node(va, h, l)
                } else if va < vb {
                    let h = self.mul(a, hb);
                    let l = self.mul(a, lb);
                    self.mk_node(vb, h, l)
                } else {
                    // (v*h1 + l1)(v*h2 + l2) = v*(v*h1*h2 + h1*l2 + l1*h2) + l1*l2
                    let hh = self.mul(ha, hb);
                    let v = self.mk_var(va);
                    let vhh = self.mul(v, hh);
                    let c1 = self.mul(ha, lb);
                    let c2 = self.mul(la, hb);
                    let mid = self.add(c1, c2);
                    let h = self.add(vhh, mid);
                    let l = self.mul(la, lb);
                    self.mk_node(va, h, l)
                }
            }
        };
        self.mul_cache.insert(key, r);
        r
    }

    /// `p` with the leading coefficient normalized to one.
    pub fn monic(&mut self, p: Pdd) -> Pdd {
        if p == self.zero {
            return p;
        }
        let lc = self.leading_coeff(p).clone();
        self.scale(p, &lc.recip())
    }

    /// `(q, r)` with `p = v*q + r` and `r` free of `v`.
    pub fn split(&mut self, p: Pdd, v: u32) -> (Pdd, Pdd) {
        let mut memo = HashMap::new();
        self.split_rec(p, v, &mut memo)
    }

    fn split_rec(&mut self, p: Pdd, v: u32, memo: &mut HashMap<Pdd, (Pdd, Pdd)>) -> (Pdd, Pdd) {
        let (var, hi, lo) = match self.node(p) {
            PddNode::Node { var, hi, lo } if *var >= v => (*var, *hi, *lo),
            _ => return (self.zero, p),
        };
        if var == v {
            return (hi, lo);
        }
        if let Some(&r) = memo.get(&p) {
            return r;
        }
        // p = t*(v*qh + rh) + v*ql + rl
        let (qh, rh) = self.split_rec(hi, v, memo);
        let (ql, rl) = self.split_rec(lo, v, memo);
        let t = self.mk_var(var);
        let tq = self.mul(t, qh);
        let q = self.add(tq, ql);
        let tr = self.mul(t, rh);
        let r = self.add(tr, rl);
        memo.insert(p, (q, r));
        (q, r)
    }

    /// `p[v := s]`.
    pub fn substitute(&mut self, p: Pdd, v: u32, s: Pdd) -> Pdd {
        let mut memo = HashMap::new();
        self.substitute_rec(p, v, s, &mut memo)
    }

    fn substitute_rec(&mut self, p: Pdd, v: u32, s: Pdd, memo: &mut HashMap<Pdd, Pdd>) -> Pdd {
        let (var, hi, lo) = match self.node(p) {
            PddNode::Node { var, hi, lo } if *var >= v => (*var, *hi, *lo),
            _ => return p,
        };
        if let Some(&r) = memo.get(&p) {
            return r;
        }
        let h = self.substitute_rec(hi, v, s, memo);
        let r = if var == v {
            let hs = self.mul(h, s);
            self.add(hs, lo)
        } else {
            let l = self.substitute_rec(lo, v, s, memo);
            let t = self.mk_var(var);
            let th = self.mul(t, h);
            self.add(th, l)
        };
        memo.insert(p, r);
        r
    }

    // === Structure queries ===

    fn reachable(&self, p: Pdd) -> Vec<Pdd> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut todo = vec![p];
        while let Some(cur) = todo.pop() {
            if !seen.insert(cur) {
                continue;
            }
            order.push(cur);
            if let PddNode::Node { hi, lo, .. } = self.node(cur) {
                todo.push(*lo);
                todo.push(*hi);
            }
        }
        order
    }

    /// Variables occurring in `p`, ascending.
    pub fn free_vars(&self, p: Pdd) -> Vec<u32> {
        let vars: BTreeSet<u32> = self
            .reachable(p)
            .into_iter()
            .filter_map(|n| self.var(n))
            .collect();
        vars.into_iter().collect()
    }

    /// Number of distinct nodes reachable from `p`.
    pub fn tree_size(&self, p: Pdd) -> usize {
        self.reachable(p).len()
    }

    pub fn degree(&self, p: Pdd) -> u32 {
        let mut memo = HashMap::new();
        self.degree_rec(p, &mut memo)
    }

    fn degree_rec(&self, p: Pdd, memo: &mut HashMap<Pdd, u32>) -> u32 {
        match self.node(p) {
            PddNode::Const(_) => 0,
            PddNode::Node { hi, lo, .. } => {
                if let Some(&d) = memo.get(&p) {
                    return d;
                }
                let d = (1 + self.degree_rec(*hi, memo)).max(self.degree_rec(*lo, memo));
                memo.insert(p, d);
                d
            }
        }
    }

    pub fn num_monomials(&self, p: Pdd) -> u64 {
        let mut memo = HashMap::new();
        self.count_rec(p, &mut memo)
    }

    fn count_rec(&self, p: Pdd, memo: &mut HashMap<Pdd, u64>) -> u64 {
        match self.node(p) {
            PddNode::Const(c) => u64::from(!c.is_zero()),
            PddNode::Node { hi, lo, .. } => {
                if let Some(&n) = memo.get(&p) {
                    return n;
                }
                let n = self
                    .count_rec(*hi, memo)
                    .saturating_add(self.count_rec(*lo, memo));
                memo.insert(p, n);
                n
            }
        }
    }

    pub fn is_linear(&self, p: Pdd) -> bool {
        self.degree(p) <= 1
    }

    /// Exactly two monomials.
    pub fn is_binary(&self, p: Pdd) -> bool {
        self.num_monomials(p) == 2
    }

    pub fn is_monomial(&self, p: Pdd) -> bool {
        self.num_monomials(p) == 1
    }

    /// Whether every node labelled `v` has constant children, i.e. `v` only
    /// occurs as `c * v * m + d * m` for monomials `m` over larger variables.
    pub fn var_is_leaf(&self, p: Pdd, v: u32) -> bool {
        self.reachable(p).into_iter().all(|n| match self.node(n) {
            PddNode::Node { var, hi, lo } if *var == v => self.is_val(*hi) && self.is_val(*lo),
            _ => true,
        })
    }

    /// Monomials, higher branches first.
    pub fn monomials(&self, p: Pdd) -> Vec<Monomial> {
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        self.monomials_rec(p, &mut prefix, &mut out);
        out
    }

    fn monomials_rec(&self, p: Pdd, prefix: &mut Vec<u32>, out: &mut Vec<Monomial>) {
        match self.node(p) {
            PddNode::Const(c) => {
                if !c.is_zero() {
                    let mut vars = prefix.clone();
                    vars.sort_unstable();
                    out.push(Monomial {
                        coeff: c.clone(),
                        vars,
                    });
                }
            }
            PddNode::Node { var, hi, lo } => {
                let (var, hi, lo) = (*var, *hi, *lo);
                prefix.push(var);
                self.monomials_rec(hi, prefix, out);
                prefix.pop();
                self.monomials_rec(lo, prefix, out);
            }
        }
    }

    pub fn from_monomials(&mut self, monomials: &[Monomial]) -> Pdd {
        let mut sum = self.zero;
        for m in monomials {
            let mut term = self.constant(m.coeff.clone());
            for &v in &m.vars {
                let pv = self.mk_var(v);
                term = self.mul(term, pv);
            }
            sum = self.add(sum, term);
        }
        sum
    }

    pub fn eval(&self, p: Pdd, value: &impl Fn(u32) -> BigRational) -> BigRational {
        let mut memo = HashMap::new();
        self.eval_rec(p, value, &mut memo)
    }

    fn eval_rec(
        &self,
        p: Pdd,
        value: &impl Fn(u32) -> BigRational,
        memo: &mut HashMap<Pdd, BigRational>,
    ) -> BigRational {
        match self.node(p) {
            PddNode::Const(c) => c.clone(),
            PddNode::Node { var, hi, lo } => {
                if let Some(r) = memo.get(&p) {
                    return r.clone();
                }
                let r = value(*var) * self.eval_rec(*hi, value, memo) + self.eval_rec(*lo, value, memo);
                memo.insert(p, r.clone());
                r
            }
        }
    }

    /// Human-readable form, e.g. `2*v0*v1 + -3`.
    pub fn display(&self, p: Pdd) -> String {
        let monomials = self.monomials(p);
        if monomials.is_empty() {
            return "0".to_string();
        }
        let terms: Vec<String> = monomials
            .iter()
            .map(|m| {
                let mut parts = Vec::with_capacity(m.vars.len() + 1);
                if !m.coeff.is_one() || m.vars.is_empty() {
                    parts.push(m.coeff.to_string());
                }
                parts.extend(m.vars.iter().map(|v| format!("v{v}")));
                parts.join("*")
            })
            .collect();
        terms.join(" + ")
    }
}
