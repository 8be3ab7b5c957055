//! Elimination ordering heuristics for greedy variable elimination.
//!
//! Each heuristic scores a candidate variable of a [`ClusterGraph`] against
//! the current (possibly partially eliminated) adjacency structure. The greedy
//! chooser picks the cheapest remaining variable, so different heuristics can
//! produce very different clique sizes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::cluster_graph::ClusterGraph;
use crate::error::PgmError;

/// Cost function used to rank elimination candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EliminationHeuristic {
    /// Number of neighbours
    #[serde(rename = "MINNEIGHBORS")]
    MinNeighbors,
    /// Product of the neighbours' state counts
    #[serde(rename = "MINWEIGHT")]
    MinWeight,
    /// Number of fill edges
    #[default]
    #[serde(rename = "MINFILL")]
    MinFill,
    /// Sum over fill edges of the product of their endpoints' state counts
    #[serde(rename = "WEIGHTEDMINFILL")]
    WeightedMinFill,
}

impl EliminationHeuristic {
    /// All heuristics, in declaration order.
    pub const ALL: [EliminationHeuristic; 4] = [
        EliminationHeuristic::MinNeighbors,
        EliminationHeuristic::MinWeight,
        EliminationHeuristic::MinFill,
        EliminationHeuristic::WeightedMinFill,
    ];

    /// Cost of eliminating variable `i` from `cg`.
    pub fn cost(self, cg: &ClusterGraph, i: usize) -> u128 {
        match self {
            EliminationHeuristic::MinNeighbors => elimination_cost_min_neighbors(cg, i),
            EliminationHeuristic::MinWeight => elimination_cost_min_weight(cg, i),
            EliminationHeuristic::MinFill => elimination_cost_min_fill(cg, i),
            EliminationHeuristic::WeightedMinFill => elimination_cost_weighted_min_fill(cg, i),
        }
    }

    /// Upper-case name used in property strings.
    pub fn as_str(self) -> &'static str {
        match self {
            EliminationHeuristic::MinNeighbors => "MINNEIGHBORS",
            EliminationHeuristic::MinWeight => "MINWEIGHT",
            EliminationHeuristic::MinFill => "MINFILL",
            EliminationHeuristic::WeightedMinFill => "WEIGHTEDMINFILL",
        }
    }
}

impl fmt::Display for EliminationHeuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EliminationHeuristic {
    type Err = PgmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EliminationHeuristic::ALL
            .into_iter()
            .find(|h| h.as_str() == s)
            .ok_or_else(|| PgmError::InvalidArgument(format!("unknown heuristic '{}'", s)))
    }
}

/// Number of variables adjacent to variable `i`.
pub fn elimination_cost_min_neighbors(cg: &ClusterGraph, i: usize) -> u128 {
    cg.delta(i).len() as u128
}

/// Product of the state counts of the variables adjacent to `i`.
pub fn elimination_cost_min_weight(cg: &ClusterGraph, i: usize) -> u128 {
    cg.delta_indices(i)
        .into_iter()
        .fold(1u128, |acc, j| acc.saturating_mul(cg.states(j) as u128))
}

/// Number of edges that eliminating `i` would add.
pub fn elimination_cost_min_fill(cg: &ClusterGraph, i: usize) -> u128 {
    fill_edges(cg, i).count() as u128
}

/// Sum over the fill edges of `i` of the product of their endpoints' state counts.
pub fn elimination_cost_weighted_min_fill(cg: &ClusterGraph, i: usize) -> u128 {
    fill_edges(cg, i).fold(0u128, |acc, (j, k)| {
        acc.saturating_add((cg.states(j) as u128).saturating_mul(cg.states(k) as u128))
    })
}

/// Pairs of neighbours of `i` that are not yet adjacent.
fn fill_edges(cg: &ClusterGraph, i: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
    let neighbors = cg.delta_indices(i);
    let pairs: Vec<(usize, usize)> = neighbors
        .iter()
        .enumerate()
        .flat_map(|(a, &j)| neighbors[a + 1..].iter().map(move |&k| (j, k)))
        .filter(|&(j, k)| !cg.adjacent(j, k))
        .collect();
    pairs.into_iter()
}

/// Greedy elimination: always pick the cheapest remaining variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GreedyVariableElimination {
    heuristic: EliminationHeuristic,
}

impl GreedyVariableElimination {
    /// Create with a specific heuristic.
    pub fn new(heuristic: EliminationHeuristic) -> Self {
        Self { heuristic }
    }

    /// The cost function in use.
    pub fn heuristic(&self) -> EliminationHeuristic {
        self.heuristic
    }

    /// Choose the next variable to eliminate among `remaining`.
    ///
    /// Ties keep the lowest variable index.
    pub fn choose(&self, cg: &ClusterGraph, remaining: &BTreeSet<usize>) -> Option<usize> {
        let mut best: Option<(usize, u128)> = None;
        for &i in remaining {
            let cost = self.heuristic.cost(cg, i);
            match best {
                Some((_, best_cost)) if cost >= best_cost => {}
                _ => best = Some((i, cost)),
            }
        }
        best.map(|(i, _)| i)
    }
}
