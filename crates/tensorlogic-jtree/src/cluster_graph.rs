//! Cluster graphs and greedy variable elimination.
//!
//! A cluster graph is a sequence of clusters (sets of variables). Two
//! variables are adjacent when some cluster contains both. Seeded from the
//! factor domains of a [`FactorGraph`], it is the working structure from which
//! variable elimination derives the cliques of a junction tree.

use std::collections::BTreeSet;
use tracing::debug;

use crate::error::{PgmError, Result};
use crate::graph::FactorGraph;
use crate::node::{Node, NodeId, NodeSet};

/// A cluster, tagged with the elimination step that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cluster {
    /// Variables of the cluster
    pub vars: NodeSet,
    /// Elimination step, `None` for clusters seeded from factors
    pub step: Option<usize>,
}

/// Sequence of clusters over a fixed, indexed set of variables.
///
/// Variables are indexed in ascending [`NodeId`] order.
#[derive(Clone, Debug, Default)]
pub struct ClusterGraph {
    /// Variables, sorted
    vars: NodeSet,
    /// Elimination state count per variable index, 1 for observed nodes
    states: Vec<usize>,
    /// Clusters in insertion order
    clusters: Vec<Cluster>,
}

impl ClusterGraph {
    /// Seed one cluster per factor domain.
    ///
    /// With `only_maximal`, clusters contained in another cluster are erased.
    /// Observed nodes weigh a single state.
    pub fn from_factor_graph(fg: &FactorGraph, only_maximal: bool) -> Result<Self> {
        let vars = fg.vars().clone();
        let states = vars
            .iter()
            .map(|v| {
                fg.node(v)
                    .map(Node::elimination_states)
                    .ok_or(PgmError::VariableNotFound(v))
            })
            .collect::<Result<Vec<_>>>()?;
        let mut cg = Self {
            vars,
            states,
            clusters: Vec::with_capacity(fg.num_factors()),
        };
        for factor in fg.factors() {
            cg.clusters.push(Cluster {
                vars: factor.vars().clone(),
                step: None,
            });
        }
        if only_maximal {
            cg.erase_non_maximal();
        }
        Ok(cg)
    }

    /// Empty graph over the same variables.
    fn empty_like(&self) -> Self {
        Self {
            vars: self.vars.clone(),
            states: self.states.clone(),
            clusters: Vec::new(),
        }
    }

    /// Number of variables.
    pub fn num_nodes(&self) -> usize {
        self.vars.len()
    }

    /// Number of clusters.
    pub fn num_clusters(&self) -> usize {
        self.clusters.len()
    }

    /// Variables in index order.
    pub fn vars(&self) -> &NodeSet {
        &self.vars
    }

    /// Handle of variable `i`.
    pub fn var(&self, i: usize) -> Option<NodeId> {
        self.vars.as_slice().get(i).copied()
    }

    /// Index of a variable.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.vars.position(id)
    }

    /// Elimination state count of variable `i`; 0 if out of range.
    pub fn states(&self, i: usize) -> usize {
        self.states.get(i).copied().unwrap_or(0)
    }

    /// The clusters.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Cluster domains, without step tags.
    pub fn cliques(&self) -> Vec<NodeSet> {
        self.clusters.iter().map(|c| c.vars.clone()).collect()
    }

    fn containing(&self, i: usize) -> impl Iterator<Item = &Cluster> {
        let var = self.var(i);
        self.clusters
            .iter()
            .filter(move |c| var.is_some_and(|v| c.vars.contains(v)))
    }

    /// Variable `i` together with every variable adjacent to it.
    pub fn full_delta(&self, i: usize) -> NodeSet {
        let mut result: NodeSet = self.var(i).into_iter().collect();
        for cluster in self.containing(i) {
            result = &result | &cluster.vars;
        }
        result
    }

    /// Variables adjacent to `i`.
    pub fn delta(&self, i: usize) -> NodeSet {
        let mut result = self.full_delta(i);
        if let Some(var) = self.var(i) {
            result.remove(var);
        }
        result
    }

    /// Indices of the variables adjacent to `i`, ascending.
    pub fn delta_indices(&self, i: usize) -> Vec<usize> {
        self.delta(i)
            .iter()
            .filter_map(|v| self.index_of(v))
            .collect()
    }

    /// Whether some cluster contains both variables.
    pub fn adjacent(&self, i: usize, j: usize) -> bool {
        match (self.var(i), self.var(j)) {
            (Some(a), Some(b)) if a != b => self
                .clusters
                .iter()
                .any(|c| c.vars.contains(a) && c.vars.contains(b)),
            _ => false,
        }
    }

    /// Whether no other cluster contains cluster `c`.
    pub fn is_maximal(&self, c: usize) -> bool {
        let Some(cluster) = self.clusters.get(c) else {
            return false;
        };
        self.clusters
            .iter()
            .enumerate()
            .all(|(d, other)| d == c || !cluster.vars.is_subset(&other.vars))
    }

    /// Erase clusters contained in another cluster.
    ///
    /// Clusters are visited in order; of several identical clusters the last
    /// one survives.
    pub fn erase_non_maximal(&mut self) -> &mut Self {
        let mut c = 0;
        while c < self.clusters.len() {
            if self.is_maximal(c) {
                c += 1;
            } else {
                self.clusters.remove(c);
            }
        }
        self
    }

    /// Append a cluster unless it is empty or already present.
    pub fn insert(&mut self, vars: NodeSet, step: Option<usize>) {
        if vars.is_empty() || self.clusters.iter().any(|c| c.vars == vars) {
            return;
        }
        self.clusters.push(Cluster { vars, step });
    }

    /// Erase every cluster that contains variable `i`.
    pub fn erase_subsuming(&mut self, i: usize) -> &mut Self {
        if let Some(var) = self.var(i) {
            self.clusters.retain(|c| !c.vars.contains(var));
        }
        self
    }

    /// Eliminate variable `i` and return the clique it induces.
    ///
    /// The clusters containing `i` are replaced by the set of its neighbours.
    pub fn elim_var(&mut self, i: usize) -> NodeSet {
        let clique = self.full_delta(i);
        let mut neighbors = clique.clone();
        if let Some(var) = self.var(i) {
            neighbors.remove(var);
        }
        self.erase_subsuming(i);
        self.insert(neighbors, None);
        clique
    }

    /// Run variable elimination and return the induced cliques.
    ///
    /// `choose` picks the next variable index among the remaining ones. When
    /// `max_states` is positive, elimination aborts as soon as the running sum
    /// of clique state counts exceeds it.
    pub fn var_elim<F>(&self, mut choose: F, max_states: usize) -> Result<ClusterGraph>
    where
        F: FnMut(&ClusterGraph, &BTreeSet<usize>) -> Option<usize>,
    {
        let mut cg = self.clone();
        let mut result = self.empty_like();
        let mut remaining: BTreeSet<usize> = (0..self.num_nodes()).collect();
        let mut total_states: u128 = 0;
        let mut step = 0;

        while let Some(i) = choose(&cg, &remaining) {
            if !remaining.remove(&i) {
                return Err(PgmError::InvalidArgument(format!(
                    "variable index {} chosen twice",
                    i
                )));
            }
            let clique = cg.elim_var(i);
            if max_states > 0 {
                total_states = total_states.saturating_add(self.nr_states(&clique));
                if total_states > max_states as u128 {
                    return Err(PgmError::ResourceExhausted(format!(
                        "variable elimination needs more than {} states",
                        max_states
                    )));
                }
            }
            result.insert(clique, Some(step));
            step += 1;
        }

        debug!(
            steps = step,
            cliques = result.num_clusters(),
            "variable elimination finished"
        );
        Ok(result)
    }

    /// Joint elimination state count of `vs`, saturating.
    pub fn nr_states(&self, vs: &NodeSet) -> u128 {
        vs.iter()
            .filter_map(|v| self.index_of(v))
            .fold(1u128, |acc, i| acc.saturating_mul(self.states[i] as u128))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elimination::{
        elimination_cost_weighted_min_fill, EliminationHeuristic, GreedyVariableElimination,
    };
    use crate::factor::Factor;

    /// Eight nodes, only x2 and x6 hidden; x4 is not used by any factor.
    fn fixture_graph(extra: &[&[u32]]) -> FactorGraph {
        let nodes = [
            (1, 13, true),
            (2, 44, false),
            (3, 2, true),
            (4, 9, true),
            (5, 13, true),
            (6, 44, false),
            (7, 2, true),
            (8, 9, true),
        ];
        let mut graph = FactorGraph::new();
        for (id, states, observed) in nodes {
            graph.add_node(Node::new(id, states, observed).unwrap());
        }

        let domains: [&[u32]; 5] = [&[1, 2, 3], &[2, 5, 6], &[6, 8], &[5, 6, 7], &[1, 3, 5]];
        for domain in domains.iter().chain(extra) {
            let vars: NodeSet = domain.iter().map(|&v| NodeId(v)).collect();
            let shape = graph.shape(&vars).unwrap();
            graph
                .add_factor(Factor::constant(vars, &shape, 1.0).unwrap())
                .unwrap();
        }
        graph
    }

    #[test]
    fn test_fixture_counts() {
        let cg = ClusterGraph::from_factor_graph(&fixture_graph(&[]), true).unwrap();
        assert_eq!(cg.num_nodes(), 7);
        assert_eq!(cg.num_clusters(), 5);
    }

    #[test]
    fn test_fixture_redundant_cluster() {
        let graph = fixture_graph(&[&[1, 2]]);
        let maximal = ClusterGraph::from_factor_graph(&graph, true).unwrap();
        assert_eq!(maximal.num_clusters(), 5);
        let all = ClusterGraph::from_factor_graph(&graph, false).unwrap();
        assert_eq!(all.num_clusters(), 6);
        assert!(!all.is_maximal(5));
        assert!(all.is_maximal(0));
    }

    #[test]
    fn test_fixture_weighted_min_fill() {
        let cg = ClusterGraph::from_factor_graph(&fixture_graph(&[]), true).unwrap();
        assert_eq!(elimination_cost_weighted_min_fill(&cg, 0), 0);
        // Eliminating x2 joins x1-x6 and x3-x6: 1*44 + 1*44
        assert_eq!(elimination_cost_weighted_min_fill(&cg, 1), 88);
    }

    #[test]
    fn test_observed_nodes_weigh_one_state() {
        let graph = fixture_graph(&[]);
        let cg = ClusterGraph::from_factor_graph(&graph, true).unwrap();
        let states: Vec<usize> = (0..cg.num_nodes()).map(|i| cg.states(i)).collect();
        assert_eq!(states, vec![1, 44, 1, 1, 44, 1, 1]);
        assert_eq!(cg.nr_states(&NodeSet::from([1, 2, 6])), 44 * 44);
        // Factor tables keep the full state counts
        assert_eq!(graph.nr_states(&NodeSet::from([1, 2, 6])).unwrap(), 13 * 44 * 44);
    }

    #[test]
    fn test_delta_and_adjacency() {
        let cg = ClusterGraph::from_factor_graph(&fixture_graph(&[]), true).unwrap();
        assert_eq!(cg.delta(1), NodeSet::from([1, 3, 5, 6]));
        assert_eq!(cg.full_delta(1), NodeSet::from([1, 2, 3, 5, 6]));
        assert_eq!(cg.delta_indices(6), vec![4]);
        assert!(cg.adjacent(0, 3));
        assert!(!cg.adjacent(0, 4));
        assert!(!cg.adjacent(2, 2));
    }

    #[test]
    fn test_duplicates_collapse() {
        let graph = fixture_graph(&[&[6, 8]]);
        let cg = ClusterGraph::from_factor_graph(&graph, true).unwrap();
        assert_eq!(cg.num_clusters(), 5);
        assert_eq!(
            cg.clusters()
                .iter()
                .filter(|c| c.vars == NodeSet::from([6, 8]))
                .count(),
            1
        );
    }

    #[test]
    fn test_elim_var() {
        let mut cg = ClusterGraph::from_factor_graph(&fixture_graph(&[]), true).unwrap();
        // x8 only touches x6
        let clique = cg.elim_var(6);
        assert_eq!(clique, NodeSet::from([6, 8]));
        assert_eq!(cg.num_clusters(), 5);
        assert!(cg.clusters().iter().any(|c| c.vars == NodeSet::from([6])));
        assert_eq!(cg.delta(6), NodeSet::new());
    }

    #[test]
    fn test_var_elim_covers_factors() {
        let graph = fixture_graph(&[]);
        let cg = ClusterGraph::from_factor_graph(&graph, true).unwrap();
        let greedy = GreedyVariableElimination::new(EliminationHeuristic::MinFill);

        let mut cliques = cg.var_elim(|g, rem| greedy.choose(g, rem), 0).unwrap();
        cliques.erase_non_maximal();

        for factor in graph.factors() {
            assert!(cliques
                .clusters()
                .iter()
                .any(|c| factor.vars().is_subset(&c.vars)));
        }
        assert!(cliques.clusters().iter().all(|c| c.step.is_some()));
    }

    #[test]
    fn test_var_elim_memory_cap() {
        let cg = ClusterGraph::from_factor_graph(&fixture_graph(&[]), true).unwrap();
        let greedy = GreedyVariableElimination::new(EliminationHeuristic::MinFill);
        // {x1,x2,x3,x5} and {x2,x3,x5} take 44 each, then {x2,x5,x6} takes 44*44
        let result = cg.var_elim(|g, rem| greedy.choose(g, rem), 100);
        assert!(matches!(result, Err(PgmError::ResourceExhausted(_))));
    }
}
