//! Model implicants: literals true under a model that entail a set of facts.

use indexmap::IndexSet;
use std::collections::HashMap;

use kestrel_core::{Model, TermId, TermKind, TermManager};

use crate::error::QeError;

struct Extractor<'a> {
    mgr: &'a mut TermManager,
    model: &'a Model,
    visited: IndexSet<(TermId, bool)>,
    stripped: HashMap<TermId, TermId>,
    literals: IndexSet<TermId>,
}

impl Extractor<'_> {
    fn value(&self, t: TermId) -> Result<bool, QeError> {
        Ok(self.model.is_true(self.mgr, t)?)
    }

    /// Collect literals entailing `t` (when `pos`) or `not t`. The model must
    /// give `t` the value `pos`.
    fn visit(&mut self, t: TermId, pos: bool) -> Result<(), QeError> {
        if !self.visited.insert((t, pos)) {
            return Ok(());
        }
        match self.mgr.kind(t).clone() {
            TermKind::True | TermKind::False => {}
            TermKind::Not(a) => self.visit(a, !pos)?,
            TermKind::And(args) if pos => {
                for a in args {
                    self.visit(a, true)?;
                }
            }
            TermKind::Or(args) if !pos => {
                for a in args {
                    self.visit(a, false)?;
                }
            }
            // a false conjunction or a true disjunction needs one witness child
            TermKind::And(args) | TermKind::Or(args) => {
                for a in args {
                    if self.value(a)? == pos {
                        return self.visit(a, pos);
                    }
                }
            }
            TermKind::Implies(a, b) => {
                if pos {
                    if self.value(a)? {
                        self.visit(b, true)?;
                    } else {
                        self.visit(a, false)?;
                    }
                } else {
                    self.visit(a, true)?;
                    self.visit(b, false)?;
                }
            }
            TermKind::Ite(c, th, el) => {
                let vc = self.value(c)?;
                self.visit(c, vc)?;
                self.visit(if vc { th } else { el }, pos)?;
            }
            TermKind::Eq(a, b) if self.mgr.sort(a).is_bool() => {
                let va = self.value(a)?;
                self.visit(a, va)?;
                self.visit(b, if pos { va } else { !va })?;
            }
            _ => self.add_atom(t, pos)?,
        }
        Ok(())
    }

    /// Replace `ite` subterms by the branch the model selects, recording the
    /// condition literals.
    fn strip_ites(&mut self, t: TermId) -> Result<TermId, QeError> {
        if let Some(&r) = self.stripped.get(&t) {
            return Ok(r);
        }
        let result = match self.mgr.kind(t).clone() {
            TermKind::Ite(c, th, el) => {
                let vc = self.value(c)?;
                self.visit(c, vc)?;
                self.strip_ites(if vc { th } else { el })?
            }
            kind => {
                let children = kind.children();
                let mut new_children = Vec::with_capacity(children.len());
                for &c in &children {
                    new_children.push(self.strip_ites(c)?);
                }
                if new_children == children {
                    t
                } else {
                    self.mgr.rebuild(t, &new_children)?
                }
            }
        };
        self.stripped.insert(t, result);
        Ok(result)
    }

    fn add_atom(&mut self, atom: TermId, pos: bool) -> Result<(), QeError> {
        let atom = self.strip_ites(atom)?;
        let lit = if pos {
            atom
        } else {
            match self.mgr.kind(atom).clone() {
                TermKind::Le(a, b) => self.mgr.mk_lt(b, a)?,
                TermKind::Lt(a, b) => self.mgr.mk_le(b, a)?,
                TermKind::Eq(a, b) if self.mgr.sort(a).is_arith() => {
                    let va = self.model.num_value(self.mgr, a)?;
                    let vb = self.model.num_value(self.mgr, b)?;
                    if va < vb {
                        self.mgr.mk_lt(a, b)?
                    } else {
                        self.mgr.mk_lt(b, a)?
                    }
                }
                _ => self.mgr.mk_not(atom)?,
            }
        };
        if !self.mgr.is_true(lit) {
            self.literals.insert(lit);
        }
        Ok(())
    }
}

/// Literals true under `model` whose conjunction implies every fact.
///
/// Facts are split at top-level conjunctions first. The output is
/// deduplicated and depends only on `model` and `facts`.
pub fn implicant(
    mgr: &mut TermManager,
    model: &Model,
    facts: &[TermId],
) -> Result<Vec<TermId>, QeError> {
    let flat = mgr.flatten_and(facts)?;
    for &f in &flat {
        if !model.is_true(mgr, f)? {
            return Err(QeError::NotSatisfied {
                what: format!("fact {}", mgr.display(f)),
            });
        }
    }
    let mut extractor = Extractor {
        mgr,
        model,
        visited: IndexSet::new(),
        stripped: HashMap::new(),
        literals: IndexSet::new(),
    };
    for f in flat {
        extractor.visit(f, true)?;
    }
    Ok(extractor.literals.into_iter().collect())
}
