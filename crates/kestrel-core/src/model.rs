//! Models: interpretations of uninterpreted symbols plus an evaluator.

use indexmap::IndexMap;
use num::rational::BigRational;
use num::traits::{One, Zero};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::sort::Sort;
use crate::term::{FuncId, TermError, TermId, TermKind, TermManager};

/// A concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Bool(bool),
    Num(BigRational),
    Elem(Sort, u32),
}

impl Value {
    pub fn int(value: i64) -> Self {
        Value::Num(BigRational::from_integer(value.into()))
    }

    pub fn as_bool(&self) -> Result<bool, EvalError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(EvalError::Type {
                expected: "Bool",
                found: other.to_string(),
            }),
        }
    }

    pub fn as_num(&self) -> Result<&BigRational, EvalError> {
        match self {
            Value::Num(n) => Ok(n),
            other => Err(EvalError::Type {
                expected: "numeric",
                found: other.to_string(),
            }),
        }
    }

    /// Default value used by completion for a sort.
    pub fn default_for(sort: &Sort) -> Self {
        match sort {
            Sort::Bool => Value::Bool(false),
            Sort::Int | Sort::Real => Value::Num(BigRational::zero()),
            Sort::Uninterpreted(_) => Value::Elem(sort.clone(), 0),
        }
    }

    fn fits(&self, sort: &Sort) -> bool {
        match (self, sort) {
            (Value::Bool(_), Sort::Bool) => true,
            (Value::Num(n), Sort::Int) => n.is_integer(),
            (Value::Num(_), Sort::Real) => true,
            (Value::Elem(s, _), _) => s == sort,
            _ => false,
        }
    }

    /// Build the term denoting this value.
    pub fn to_term(&self, mgr: &mut TermManager, sort: &Sort) -> Result<TermId, TermError> {
        match self {
            Value::Bool(b) => Ok(mgr.mk_bool(*b)),
            Value::Num(n) => mgr.mk_numeral(n.clone(), sort),
            Value::Elem(s, idx) => mgr.mk_elem(s, *idx),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Num(n) => write!(f, "{n}"),
            Value::Elem(sort, idx) => write!(f, "{sort}!val!{idx}"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("No interpretation for '{0}'")]
    Unassigned(String),
    #[error("Expected a {expected} value, found {found}")]
    Type { expected: &'static str, found: String },
    #[error("Value {value} does not fit sort {sort} of '{name}'")]
    IllSorted {
        name: String,
        value: String,
        sort: Sort,
    },
    #[error("Term error: {0}")]
    Term(#[from] TermError),
}

/// Finite function table with an optional else value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuncInterp {
    pub entries: Vec<(Vec<Value>, Value)>,
    pub default: Option<Value>,
}

impl FuncInterp {
    pub fn new(default: Option<Value>) -> Self {
        Self {
            entries: Vec::new(),
            default,
        }
    }

    pub fn with_entry(mut self, args: Vec<Value>, value: Value) -> Self {
        self.entries.push((args, value));
        self
    }

    fn apply(&self, args: &[Value]) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key.as_slice() == args)
            .map(|(_, v)| v)
            .or(self.default.as_ref())
    }
}

/// Assignment of values to uninterpreted symbols.
///
/// In completion mode, symbols without an interpretation evaluate to the
/// default value of their range sort instead of failing.
#[derive(Debug, Clone, Default)]
pub struct Model {
    consts: IndexMap<FuncId, Value>,
    funcs: IndexMap<FuncId, FuncInterp>,
    completion: bool,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_completion() -> Self {
        Self {
            completion: true,
            ..Self::default()
        }
    }

    /// Interpret the nullary symbol applied by `constant`.
    pub fn assign(
        &mut self,
        mgr: &TermManager,
        constant: TermId,
        value: Value,
    ) -> Result<(), EvalError> {
        let f = match mgr.kind(constant) {
            TermKind::App(f, args) if args.is_empty() => *f,
            _ => {
                return Err(EvalError::Type {
                    expected: "constant",
                    found: crate::printer::to_smtlib(mgr, constant),
                })
            }
        };
        let decl = mgr.decl(f);
        if !value.fits(&decl.range) {
            return Err(EvalError::IllSorted {
                name: decl.name.clone(),
                value: value.to_string(),
                sort: decl.range.clone(),
            });
        }
        self.consts.insert(f, value);
        Ok(())
    }

    pub fn define_fun(&mut self, f: FuncId, interp: FuncInterp) {
        self.funcs.insert(f, interp);
    }

    pub fn const_value(&self, f: FuncId) -> Option<&Value> {
        self.consts.get(&f)
    }

    /// Interpreted constants in assignment order.
    pub fn consts(&self) -> impl Iterator<Item = (&FuncId, &Value)> {
        self.consts.iter()
    }

    pub fn eval(&self, mgr: &TermManager, t: TermId) -> Result<Value, EvalError> {
        let mut cache = HashMap::new();
        self.eval_cached(mgr, t, &mut cache)
    }

    fn eval_cached(
        &self,
        mgr: &TermManager,
        t: TermId,
        cache: &mut HashMap<TermId, Value>,
    ) -> Result<Value, EvalError> {
        if let Some(v) = cache.get(&t) {
            return Ok(v.clone());
        }
        let value = match mgr.kind(t) {
            TermKind::True => Value::Bool(true),
            TermKind::False => Value::Bool(false),
            TermKind::Numeral(n) => Value::Num(n.clone()),
            TermKind::Elem(idx) => Value::Elem(mgr.sort(t).clone(), *idx),
            TermKind::App(f, args) => {
                if args.is_empty() {
                    self.lookup_const(mgr, *f)?
                } else {
                    let mut vals = Vec::with_capacity(args.len());
                    for &a in args {
                        vals.push(self.eval_cached(mgr, a, cache)?);
                    }
                    self.lookup_app(mgr, *f, &vals)?
                }
            }
            TermKind::Not(a) => Value::Bool(!self.eval_cached(mgr, *a, cache)?.as_bool()?),
            TermKind::And(args) => {
                let mut result = true;
                for &a in args {
                    if !self.eval_cached(mgr, a, cache)?.as_bool()? {
                        result = false;
                        break;
                    }
                }
                Value::Bool(result)
            }
            TermKind::Or(args) => {
                let mut result = false;
                for &a in args {
                    if self.eval_cached(mgr, a, cache)?.as_bool()? {
                        result = true;
                        break;
                    }
                }
                Value::Bool(result)
            }
            TermKind::Implies(a, b) => {
                let va = self.eval_cached(mgr, *a, cache)?.as_bool()?;
                Value::Bool(!va || self.eval_cached(mgr, *b, cache)?.as_bool()?)
            }
            TermKind::Ite(c, th, el) => {
                if self.eval_cached(mgr, *c, cache)?.as_bool()? {
                    self.eval_cached(mgr, *th, cache)?
                } else {
                    self.eval_cached(mgr, *el, cache)?
                }
            }
            TermKind::Eq(a, b) => {
                let va = self.eval_cached(mgr, *a, cache)?;
                Value::Bool(va == self.eval_cached(mgr, *b, cache)?)
            }
            TermKind::Add(args) => {
                let mut sum = BigRational::zero();
                for &a in args {
                    sum += self.eval_cached(mgr, a, cache)?.as_num()?;
                }
                Value::Num(sum)
            }
            TermKind::Mul(args) => {
                let mut prod = BigRational::one();
                for &a in args {
                    prod *= self.eval_cached(mgr, a, cache)?.as_num()?;
                }
                Value::Num(prod)
            }
            TermKind::Le(a, b) => {
                let va = self.eval_cached(mgr, *a, cache)?;
                let vb = self.eval_cached(mgr, *b, cache)?;
                Value::Bool(va.as_num()? <= vb.as_num()?)
            }
            TermKind::Lt(a, b) => {
                let va = self.eval_cached(mgr, *a, cache)?;
                let vb = self.eval_cached(mgr, *b, cache)?;
                Value::Bool(va.as_num()? < vb.as_num()?)
            }
        };
        cache.insert(t, value.clone());
        Ok(value)
    }

    fn lookup_const(&self, mgr: &TermManager, f: FuncId) -> Result<Value, EvalError> {
        if let Some(v) = self.consts.get(&f) {
            return Ok(v.clone());
        }
        let decl = mgr.decl(f);
        if self.completion {
            return Ok(Value::default_for(&decl.range));
        }
        Err(EvalError::Unassigned(decl.name.clone()))
    }

    fn lookup_app(&self, mgr: &TermManager, f: FuncId, args: &[Value]) -> Result<Value, EvalError> {
        let decl = mgr.decl(f);
        match self.funcs.get(&f).and_then(|interp| interp.apply(args)) {
            Some(v) => Ok(v.clone()),
            None if self.completion => Ok(Value::default_for(&decl.range)),
            None => Err(EvalError::Unassigned(decl.name.clone())),
        }
    }

    /// The value of `t` as a term.
    pub fn value_term(&self, mgr: &mut TermManager, t: TermId) -> Result<TermId, EvalError> {
        let value = self.eval(mgr, t)?;
        let sort = mgr.sort(t).clone();
        Ok(value.to_term(mgr, &sort)?)
    }

    pub fn is_true(&self, mgr: &TermManager, t: TermId) -> Result<bool, EvalError> {
        self.eval(mgr, t)?.as_bool()
    }

    pub fn num_value(&self, mgr: &TermManager, t: TermId) -> Result<BigRational, EvalError> {
        match self.eval(mgr, t)? {
            Value::Num(n) => Ok(n),
            other => Err(EvalError::Type {
                expected: "numeric",
                found: other.to_string(),
            }),
        }
    }
}
