//! Marginals over variables that do not share a clique.

use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

use super::{project, JunctionTree};
use crate::error::{PgmError, Result};
use crate::factor::Factor;
use crate::node::NodeSet;
use crate::spanning_tree::{DEdge, RootedTree};

impl JunctionTree {
    /// Reroot the tree for a query over `vs`.
    ///
    /// The new root is the clique with the largest joint state count of
    /// `vs ∩ clique` (ties keep the lowest index). The returned tree lists
    /// first the edges of the smallest subtree reaching every clique that
    /// contains a variable of `vs`, and `previous_root` if given; the second
    /// value is the number of those edges.
    pub fn find_efficient_tree(
        &self,
        vs: &NodeSet,
        previous_root: Option<usize>,
    ) -> Result<(RootedTree, usize)> {
        if !self.has_tree() {
            return Err(PgmError::PreconditionViolated(
                "junction tree has no cliques".to_string(),
            ));
        }

        let mut max_val = 0u128;
        let mut max_alpha = 0;
        for (alpha, region) in self.regions.outer_regions().iter().enumerate() {
            let val = self.graph.nr_states(&(vs & region.vars()))?;
            if val > max_val {
                max_val = val;
                max_alpha = alpha;
            }
        }

        let new_tree = self.tree.reroot(max_alpha)?;
        let edges = new_tree.edges();
        let mut sub_tree: BTreeSet<DEdge> = BTreeSet::new();

        // Walk from edge `e` back to the root
        let track_back = |mut e: usize, sub_tree: &mut BTreeSet<DEdge>| {
            sub_tree.insert(edges[e]);
            let mut pos = edges[e].first;
            while e > 0 {
                e -= 1;
                if edges[e].second == pos {
                    sub_tree.insert(edges[e]);
                    pos = edges[e].first;
                }
            }
        };

        for var in vs {
            for (e, edge) in edges.iter().enumerate() {
                if self.regions.outer(edge.second).vars().contains(var) {
                    track_back(e, &mut sub_tree);
                }
            }
        }
        if let Some(previous) = previous_root.filter(|&p| p != max_alpha) {
            let e = new_tree.parent_edge(previous).ok_or_else(|| {
                PgmError::InvalidArgument(format!("previous root {} is not a clique", previous))
            })?;
            track_back(e, &mut sub_tree);
        }

        let (mut ordered, rest): (Vec<DEdge>, Vec<DEdge>) =
            edges.iter().copied().partition(|e| sub_tree.contains(e));
        let size = ordered.len();
        ordered.extend(rest);

        Ok((RootedTree::from_ordered(max_alpha, ordered), size))
    }

    /// Marginal over `vs`, which may span several cliques.
    ///
    /// When a separator or clique contains `vs` the belief is marginalized
    /// directly. Otherwise the query variables outside the root of an
    /// efficient subtree are conditioned on, one joint state at a time: each
    /// state is clamped into the subtree cliques, evidence is collected to the
    /// root, and the root marginal weighted by the state's probability is
    /// added to the result.
    pub fn calc_marginal(&self, vs: &NodeSet) -> Result<Factor> {
        let calibration = self.calibration()?;
        self.check_vars(vs)?;
        let inference = self.props.inference;

        if let Some(belief) = calibration
            .inner
            .iter()
            .chain(&calibration.outer)
            .find(|b| vs.is_subset(b.vars()))
        {
            return project(belief, vs, true, inference);
        }

        let (tree, size) = self.find_efficient_tree(vs, None)?;
        let root = tree.root();
        let vs_rem = vs - self.regions.outer(root).vars();
        let vs_root = vs - &vs_rem;

        // Inner region of every subtree edge
        let inner_of: BTreeMap<(usize, usize), usize> = self
            .regions
            .inner_regions()
            .iter()
            .enumerate()
            .map(|(beta, r)| ((r.outer[0].min(r.outer[1]), r.outer[0].max(r.outer[1])), beta))
            .collect();
        let sub_edges: Vec<(DEdge, usize)> = tree.edges()[..size]
            .iter()
            .map(|e| {
                inner_of
                    .get(&(e.first.min(e.second), e.first.max(e.second)))
                    .map(|&beta| (*e, beta))
                    .ok_or_else(|| {
                        PgmError::InvalidArgument(format!(
                            "edge {} - {} is not a separator",
                            e.first, e.second
                        ))
                    })
            })
            .collect::<Result<_>>()?;

        let shape = self.graph.shape(&vs_rem)?;
        let rem_vars = vs_rem.as_slice();
        let states = Factor::constant(vs_rem.clone(), &shape, 0.0)?;
        let mut result = Factor::constant(vs.clone(), &self.graph.shape(vs)?, 0.0)?;

        for (state, _) in states.values().indexed_iter() {
            let mut qa: BTreeMap<usize, Factor> = BTreeMap::new();
            let mut log_z = 0.0;
            let mut possible = true;

            // Collect evidence on the subtree only
            for &(edge, beta) in sub_edges.iter().rev() {
                let mut child = match qa.remove(&edge.second) {
                    Some(f) => f,
                    None => calibration.outer[edge.second].clone(),
                };
                for (axis, &var) in rem_vars.iter().enumerate() {
                    if child.vars().contains(var) {
                        child = child.clamp(var, state[axis])?;
                    }
                }

                let separator = &self.regions.inner(beta).vars;
                let mut new_qb = project(&child, separator, false, inference)?;
                if new_qb.sum() <= 0.0 {
                    possible = false;
                    break;
                }
                log_z += new_qb.normalize()?.ln();

                let parent = match qa.remove(&edge.first) {
                    Some(f) => f,
                    None => calibration.outer[edge.first].clone(),
                };
                let parent = parent.product(&new_qb.divide(&calibration.inner[beta])?)?;
                qa.insert(edge.first, parent);
            }
            if !possible {
                continue;
            }

            let mut root_belief = match qa.remove(&root) {
                Some(f) => f,
                None => calibration.outer[root].clone(),
            };
            if root_belief.sum() <= 0.0 {
                continue;
            }
            log_z += root_belief.normalize()?.ln();

            let rem_state: Vec<usize> = (0..rem_vars.len()).map(|axis| state[axis]).collect();
            let weight = Factor::point_mass(vs_rem.clone(), &shape, &rem_state, log_z.exp())?;
            let conditional = project(&root_belief, &vs_root, false, inference)?;
            result = result.add(&weight.product(&conditional)?)?;
            trace!(state = ?rem_state, log_z, "cutset state");
        }

        result.normalize()?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_models::{joint, sprinkler, square};
    use super::*;
    use crate::graph::FactorGraph;
    use crate::node::{Node, NodeId};
    use crate::properties::{InferenceType, JTreeProperties, UpdateType};
    use approx::assert_abs_diff_eq;

    /// Chain X0 - X1 - X2 - X3 - X4 of pairwise factors.
    fn chain() -> FactorGraph {
        let mut graph = FactorGraph::new();
        for id in 0..5 {
            graph.add_node(Node::discrete(id, 2).unwrap());
        }
        for a in 0..4u32 {
            let values = vec![1.0 + a as f64, 2.0, 0.5, 3.0 - a as f64 * 0.5];
            graph
                .add_factor(Factor::from_vec(NodeSet::from([a, a + 1]), &[2, 2], values).unwrap())
                .unwrap();
        }
        graph
    }

    fn assert_matches_brute_force(jt: &JunctionTree, graph: &FactorGraph, vs: &NodeSet) {
        let full = joint(graph);
        let exact = match jt.props().inference {
            InferenceType::SumProduct => full.marginal(vs, true).unwrap(),
            InferenceType::MaxProduct => full.max_marginal(vs, true).unwrap(),
        };
        let marginal = jt.calc_marginal(vs).unwrap();
        assert_eq!(marginal.vars(), vs);
        for (a, b) in marginal.values().iter().zip(exact.values()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_find_efficient_tree() {
        let graph = chain();
        let jt = JunctionTree::from_factor_graph(&graph, JTreeProperties::default()).unwrap();
        let cliques = jt.cliques();

        let vs = NodeSet::from([0, 4]);
        let (tree, size) = jt.find_efficient_tree(&vs, None).unwrap();
        assert_eq!(tree.len(), jt.tree().len());
        assert!(cliques[tree.root()].intersects(&vs));
        // The path between the two ends covers every edge of the chain
        assert_eq!(size, 3);

        let single = NodeSet::singleton(NodeId(2));
        let (tree, size) = jt.find_efficient_tree(&single, None).unwrap();
        assert!(cliques[tree.root()].contains(NodeId(2)));
        // Only the other clique holding X2 hangs below the root
        assert_eq!(size, 1);
    }

    #[test]
    fn test_subtree_edges_come_first() {
        let jt = JunctionTree::from_factor_graph(&chain(), JTreeProperties::default()).unwrap();
        let vs = NodeSet::singleton(NodeId(0));
        let (tree, size) = jt.find_efficient_tree(&vs, None).unwrap();
        assert_eq!(size, 0);

        let previous = jt.tree().root();
        assert_ne!(previous, tree.root());
        let (with_previous, size) = jt.find_efficient_tree(&vs, Some(previous)).unwrap();
        assert_eq!(with_previous.root(), tree.root());
        assert!(with_previous.edges()[..size]
            .iter()
            .any(|e| e.second == previous));
        assert!(jt.find_efficient_tree(&vs, Some(99)).is_err());
    }

    #[test]
    fn test_calc_marginal_direct() {
        let graph = sprinkler();
        let mut jt = JunctionTree::from_factor_graph(&graph, JTreeProperties::default()).unwrap();
        jt.run().unwrap();
        assert_matches_brute_force(&jt, &graph, &NodeSet::from([1, 2]));
        assert_matches_brute_force(&jt, &graph, &NodeSet::from([3]));
    }

    #[test]
    fn test_calc_marginal_cutset() {
        let graph = chain();
        for updates in [UpdateType::Hugin, UpdateType::ShaferShenoy] {
            let mut jt =
                JunctionTree::from_factor_graph(&graph, JTreeProperties::new(updates)).unwrap();
            jt.run().unwrap();
            assert_matches_brute_force(&jt, &graph, &NodeSet::from([0, 4]));
            assert_matches_brute_force(&jt, &graph, &NodeSet::from([0, 2, 4]));
            assert_matches_brute_force(&jt, &graph, &NodeSet::from([1, 3]));
        }
    }

    #[test]
    fn test_calc_marginal_cutset_loop() {
        let graph = square();
        let mut jt = JunctionTree::from_factor_graph(&graph, JTreeProperties::default()).unwrap();
        jt.run().unwrap();
        assert_matches_brute_force(&jt, &graph, &NodeSet::from([0, 1, 2, 3]));

        let graph = sprinkler();
        let mut jt = JunctionTree::from_factor_graph(&graph, JTreeProperties::default()).unwrap();
        jt.run().unwrap();
        assert_matches_brute_force(&jt, &graph, &NodeSet::from([0, 3]));
    }

    #[test]
    fn test_calc_marginal_max_product() {
        let graph = chain();
        let props = JTreeProperties::default().with_inference(InferenceType::MaxProduct);
        let mut jt = JunctionTree::from_factor_graph(&graph, props).unwrap();
        jt.run().unwrap();
        assert_matches_brute_force(&jt, &graph, &NodeSet::from([0, 4]));
    }

    #[test]
    fn test_calc_marginal_zero_probability_states() {
        // X0 = X2 always, so half of the cutset states are impossible
        let mut graph = FactorGraph::new();
        for id in 0..3 {
            graph.add_node(Node::discrete(id, 2).unwrap());
        }
        let copy = vec![1.0, 0.0, 0.0, 1.0];
        graph
            .add_factor(Factor::from_vec(NodeSet::from([0, 1]), &[2, 2], copy.clone()).unwrap())
            .unwrap();
        graph
            .add_factor(Factor::from_vec(NodeSet::from([1, 2]), &[2, 2], copy).unwrap())
            .unwrap();
        graph
            .add_factor(Factor::from_vec(NodeSet::from([0]), &[2], vec![0.3, 0.7]).unwrap())
            .unwrap();

        let mut jt = JunctionTree::from_factor_graph(&graph, JTreeProperties::default()).unwrap();
        jt.run().unwrap();
        let marginal = jt.calc_marginal(&NodeSet::from([0, 2])).unwrap();
        assert_abs_diff_eq!(marginal.get(&[0, 0]).unwrap(), 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(marginal.get(&[1, 1]).unwrap(), 0.7, epsilon = 1e-12);
        assert_eq!(marginal.get(&[0, 1]).unwrap(), 0.0);
    }

    #[test]
    fn test_calc_marginal_errors() {
        let graph = chain();
        let jt = JunctionTree::from_factor_graph(&graph, JTreeProperties::default()).unwrap();
        assert!(matches!(
            jt.calc_marginal(&NodeSet::from([0, 4])),
            Err(PgmError::PreconditionViolated(_))
        ));

        let mut jt = jt;
        jt.run().unwrap();
        assert!(matches!(
            jt.calc_marginal(&NodeSet::from([0, 7])),
            Err(PgmError::InvalidArgument(_))
        ));
    }
}
