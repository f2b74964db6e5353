//! Variable to equation index over the live working set.

use indexmap::{IndexMap, IndexSet};

use crate::solver::{EqId, Solver};

/// For every variable, the live equations it occurs in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UseList {
    uses: IndexMap<u32, IndexSet<EqId>>,
}

impl UseList {
    /// Index every live equation of `solver` from scratch.
    pub fn build(solver: &Solver) -> Self {
        let mut list = Self::default();
        for id in solver.live() {
            let vars = solver.pdd().free_vars(solver.equation(id).poly());
            list.insert(id, &vars);
        }
        list
    }

    /// Equations using `v`, ascending.
    pub fn uses(&self, v: u32) -> Vec<EqId> {
        let mut ids: Vec<EqId> = self
            .uses
            .get(&v)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    pub fn count(&self, v: u32) -> usize {
        self.uses.get(&v).map_or(0, IndexSet::len)
    }

    pub fn contains(&self, v: u32, id: EqId) -> bool {
        self.uses.get(&v).is_some_and(|set| set.contains(&id))
    }

    /// Variables with at least one use.
    pub fn vars(&self) -> impl Iterator<Item = u32> + '_ {
        self.uses.keys().copied()
    }

    pub(crate) fn insert(&mut self, id: EqId, vars: &[u32]) {
        for &v in vars {
            self.uses.entry(v).or_default().insert(id);
        }
    }

    pub(crate) fn remove(&mut self, id: EqId, vars: &[u32]) {
        for v in vars {
            if let Some(set) = self.uses.get_mut(v) {
                set.shift_remove(&id);
                if set.is_empty() {
                    self.uses.shift_remove(v);
                }
            }
        }
    }

    /// Whether the index matches the live equations of `solver` exactly.
    pub fn is_consistent(&self, solver: &Solver) -> bool {
        *self == Self::build(solver)
    }
}
