//! Treewidth bounds from greedy variable elimination.
//!
//! Runs the same elimination that builds a junction tree, but only measures
//! the induced cliques. Useful for picking a heuristic or a memory cap before
//! committing to a full construction.

use tracing::debug;

use crate::cluster_graph::ClusterGraph;
use crate::elimination::{EliminationHeuristic, GreedyVariableElimination};
use crate::error::{PgmError, Result};
use crate::graph::FactorGraph;

/// Upper bound on the treewidth of `fg` under `heuristic`.
///
/// Returns the largest clique size minus one and the largest clique state
/// count, where observed nodes count a single state. With a positive
/// `max_states`, elimination stops with [`PgmError::ResourceExhausted`] as
/// soon as the running sum of clique state counts exceeds it.
pub fn bound_treewidth(
    fg: &FactorGraph,
    heuristic: EliminationHeuristic,
    max_states: usize,
) -> Result<(usize, u128)> {
    if fg.is_empty() {
        return Err(PgmError::InvalidArgument(
            "cannot bound the treewidth of an empty factor graph".to_string(),
        ));
    }

    let cg = ClusterGraph::from_factor_graph(fg, true)?;
    let greedy = GreedyVariableElimination::new(heuristic);
    let elimination = cg.var_elim(|g, remaining| greedy.choose(g, remaining), max_states)?;

    let (largest_size, largest_states) = elimination
        .clusters()
        .iter()
        .fold((0, 0u128), |(size, states), clique| {
            (
                size.max(clique.vars.len()),
                states.max(cg.nr_states(&clique.vars)),
            )
        });

    debug!(
        heuristic = %heuristic,
        treewidth = largest_size.saturating_sub(1),
        states = %largest_states,
        "treewidth bounded"
    );
    Ok((largest_size.saturating_sub(1), largest_states))
}
