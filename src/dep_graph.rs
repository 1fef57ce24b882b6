//! Dependency graph.
//!
//! For jump `k`, `G_dep[k]` is the set of jump indices whose rate
//! reads a species `k` writes. `k` always depends on itself (a forced
//! self-dependency, so firing `k` always re-evaluates `k`'s own next
//! fire time).

use std::collections::HashSet;

use crate::error::{JumpError, Result};
use crate::rate::JumpSet;

#[derive(Clone, Debug)]
pub struct DependencyGraph {
    edges: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Builds the graph from stoichiometry (mass-action jumps) and the
    /// explicit `reads`/`writes` declarations (general jumps). A general
    /// jump with an empty `reads` list is accepted (it may truly read
    /// nothing, e.g. a pure timer), but a jump set containing a general
    /// jump is required to have gone through this builder rather than
    /// skip dependency tracking entirely — running a variable-rate jump
    /// without a dependency graph is fatal, which this constructor
    /// makes structurally impossible to omit.
    pub fn build<P>(jumps: &JumpSet<P>) -> Result<Self> {
        let n = jumps.len();
        let read_sets: Vec<HashSet<usize>> =
            (0..n).map(|j| jumps.read_set(j).into_iter().collect()).collect();
        let mut edges = vec![Vec::new(); n];
        for k in 0..n {
            let write_k: HashSet<usize> = jumps.write_set(k).into_iter().collect();
            for (j, reads_j) in read_sets.iter().enumerate() {
                if j == k || !reads_j.is_disjoint(&write_k) {
                    edges[k].push(j);
                }
            }
        }
        Ok(DependencyGraph { edges })
    }

    /// Validates an explicitly supplied graph (e.g. one precomputed
    /// offline and serialized) against the jump set it claims to cover.
    pub fn from_edges<P>(jumps: &JumpSet<P>, edges: Vec<Vec<usize>>) -> Result<Self> {
        if edges.len() != jumps.len() {
            return Err(JumpError::Configuration(format!(
                "dependency graph has {} nodes, jump set has {}",
                edges.len(),
                jumps.len()
            )));
        }
        Ok(DependencyGraph { edges })
    }

    pub fn deps(&self, k: usize) -> &[usize] {
        &self.edges[k]
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate::MassActionJump;

    #[test]
    fn self_dependency_is_always_present() {
        let js: JumpSet<()> =
            JumpSet::new(vec![MassActionJump::new(1.0, vec![(0, 1)], vec![(0, -1)])], vec![]);
        let g = DependencyGraph::build(&js).unwrap();
        assert_eq!(g.deps(0), &[0]);
    }

    #[test]
    fn sir_dependency_graph_matches_shared_species() {
        // S + I -> 2I (writes S,I), I -> R (reads I, writes I,R)
        let js: JumpSet<()> = JumpSet::new(
            vec![
                MassActionJump::new(1e-4, vec![(0, 1), (1, 1)], vec![(0, -1), (1, 1)]),
                MassActionJump::new(0.01, vec![(1, 1)], vec![(1, -1), (2, 1)]),
            ],
            vec![],
        );
        let g = DependencyGraph::build(&js).unwrap();
        let mut d0 = g.deps(0).to_vec();
        d0.sort_unstable();
        assert_eq!(d0, vec![0, 1]); // both read/write I
        let mut d1 = g.deps(1).to_vec();
        d1.sort_unstable();
        assert_eq!(d1, vec![0, 1]);
    }

    #[test]
    fn from_edges_rejects_wrong_node_count() {
        let js: JumpSet<()> =
            JumpSet::new(vec![MassActionJump::new(1.0, vec![(0, 1)], vec![(0, -1)])], vec![]);
        assert!(DependencyGraph::from_edges(&js, vec![vec![0], vec![1]]).is_err());
    }
}
