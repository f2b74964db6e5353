//! Equality projection: replace a variable by an equal term.

use kestrel_core::{Model, TermId, TermKind, TermManager};

use crate::error::QeError;
use crate::mbp::{substitute_literals, RuleOutcome};

fn is_value(mgr: &TermManager, t: TermId) -> bool {
    matches!(
        mgr.kind(t),
        TermKind::True | TermKind::False | TermKind::Numeral(_) | TermKind::Elem(_)
    )
}

/// A term equal to `x`: first from an equality literal `x = t`, then any
/// subterm of the literals with the same sort and model value as `x`.
fn representative(
    mgr: &TermManager,
    model: &Model,
    x: TermId,
    literals: &[TermId],
) -> Result<Option<TermId>, QeError> {
    for &lit in literals {
        if let TermKind::Eq(a, b) = mgr.kind(lit) {
            let (a, b) = (*a, *b);
            if a == x && !mgr.contains(b, x) {
                return Ok(Some(b));
            }
            if b == x && !mgr.contains(a, x) {
                return Ok(Some(a));
            }
        }
    }
    let sort = mgr.sort(x);
    let target = model.eval(mgr, x)?;
    for &lit in literals {
        for s in mgr.subterms(lit) {
            if mgr.sort(s) != sort || is_value(mgr, s) || mgr.contains(s, x) {
                continue;
            }
            // subterms the model leaves open are skipped
            if model.eval(mgr, s).ok().as_ref() == Some(&target) {
                return Ok(Some(s));
            }
        }
    }
    Ok(None)
}

pub(crate) fn equality(
    mgr: &mut TermManager,
    model: &Model,
    x: TermId,
    literals: &[TermId],
) -> Result<Option<RuleOutcome>, QeError> {
    let Some(witness) = representative(mgr, model, x, literals)? else {
        return Ok(None);
    };
    let literals = substitute_literals(mgr, literals, x, witness)?;
    Ok(Some(RuleOutcome { literals, witness }))
}
