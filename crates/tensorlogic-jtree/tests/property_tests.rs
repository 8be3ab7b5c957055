//! Property-based tests for junction tree correctness.
//!
//! Random discrete models are small enough to enumerate, so every property
//! is checked against the brute-force joint distribution:
//! - Construction (factor coverage, running intersection, tree shape)
//! - Calibration (exact marginals, logZ, separator consistency)
//! - Schedule equivalence (HUGIN vs Shafer-Shenoy)
//! - Queries (MAP assignment, marginals across cliques, treewidth bound)

use approx::assert_abs_diff_eq;
use proptest::prelude::*;
use tensorlogic_jtree::{
    bound_treewidth, EliminationHeuristic, Factor, FactorGraph, InferenceType, JTreeProperties,
    JunctionTree, Node, NodeId, NodeSet, UpdateType,
};

// ============================================================================
// Helper Functions
// ============================================================================

/// Build a model from variable cardinalities, factor scopes (indices taken
/// modulo the variable count) and a pool of positive table entries.
fn build_model(cards: &[usize], scopes: &[Vec<usize>], pool: &[f64]) -> FactorGraph {
    let mut graph = FactorGraph::new();
    for (id, &card) in cards.iter().enumerate() {
        graph.add_node(Node::discrete(id as u32, card).unwrap());
    }

    let mut cursor = 0;
    for scope in scopes {
        let vars: NodeSet = scope
            .iter()
            .map(|&i| NodeId((i % cards.len()) as u32))
            .collect();
        let shape: Vec<usize> = vars.iter().map(|v| cards[v.0 as usize]).collect();
        let size: usize = shape.iter().product();
        let values = (0..size)
            .map(|k| pool[(cursor + k) % pool.len()])
            .collect();
        cursor += size;
        graph
            .add_factor(Factor::from_vec(vars, &shape, values).unwrap())
            .unwrap();
    }
    graph
}

fn random_model() -> impl Strategy<Value = FactorGraph> {
    (
        prop::collection::vec(2usize..4, 3..6),
        prop::collection::vec(prop::collection::vec(0usize..6, 1..4), 1..7),
        prop::collection::vec(0.1f64..5.0, 1..40),
    )
        .prop_map(|(cards, scopes, pool)| build_model(&cards, &scopes, &pool))
}

fn joint(graph: &FactorGraph) -> Factor {
    graph
        .factors()
        .iter()
        .fold(Factor::scalar(1.0), |acc, f| acc.product(f).unwrap())
}

fn updates_strategy() -> impl Strategy<Value = UpdateType> {
    prop_oneof![Just(UpdateType::Hugin), Just(UpdateType::ShaferShenoy)]
}

fn heuristic_strategy() -> impl Strategy<Value = EliminationHeuristic> {
    prop::sample::select(EliminationHeuristic::ALL.to_vec())
}

// ============================================================================
// Construction Properties
// ============================================================================

proptest! {
    /// Property: every factor lives in a clique that contains its domain
    #[test]
    fn factors_are_covered(graph in random_model(), heuristic in heuristic_strategy()) {
        let props = JTreeProperties::default().with_heuristic(heuristic);
        let jt = JunctionTree::from_factor_graph(&graph, props).unwrap();

        for (index, factor) in graph.factors().iter().enumerate() {
            let alpha = jt.regions().fac_to_outer(index).unwrap();
            prop_assert!(factor.vars().is_subset(jt.regions().outer(alpha).vars()));
        }
    }

    /// Property: the cliques form a tree with the running intersection property
    #[test]
    fn running_intersection_holds(graph in random_model(), heuristic in heuristic_strategy()) {
        let props = JTreeProperties::default().with_heuristic(heuristic);
        let jt = JunctionTree::from_factor_graph(&graph, props).unwrap();

        prop_assert!(jt.verify_running_intersection_property());
        prop_assert_eq!(jt.tree().len() + 1, jt.regions().nr_outer());
        prop_assert!(jt.regions().check_counting_numbers());

        let cliques = jt.cliques();
        for (i, a) in cliques.iter().enumerate() {
            for b in &cliques[i + 1..] {
                prop_assert!(!a.is_subset(b) && !b.is_subset(a));
            }
        }
    }

    /// Property: the treewidth bound matches the tree that is actually built
    #[test]
    fn treewidth_bound_matches(graph in random_model(), heuristic in heuristic_strategy()) {
        let (width, states) = bound_treewidth(&graph, heuristic, 0).unwrap();
        let props = JTreeProperties::default().with_heuristic(heuristic);
        let jt = JunctionTree::from_factor_graph(&graph, props).unwrap();

        prop_assert_eq!(width, jt.treewidth());
        let largest = jt
            .cliques()
            .iter()
            .map(|c| graph.nr_states(c).unwrap())
            .max()
            .unwrap();
        prop_assert_eq!(states, largest);
    }
}

// ============================================================================
// Calibration Properties
// ============================================================================

proptest! {
    /// Property: clique beliefs and logZ are exact
    #[test]
    fn beliefs_are_exact(graph in random_model(), updates in updates_strategy()) {
        let full = joint(&graph);
        let mut jt = JunctionTree::from_factor_graph(&graph, JTreeProperties::new(updates)).unwrap();
        jt.run().unwrap();

        assert_abs_diff_eq!(jt.log_z().unwrap(), full.sum().ln(), epsilon = 1e-9);
        for belief in jt.beliefs().unwrap() {
            let exact = full.marginal(belief.vars(), true).unwrap();
            for (a, b) in belief.values().iter().zip(exact.values()) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-9);
            }
        }
    }

    /// Property: neighbouring cliques agree on their separator
    #[test]
    fn separators_are_consistent(graph in random_model(), updates in updates_strategy()) {
        let mut jt = JunctionTree::from_factor_graph(&graph, JTreeProperties::new(updates)).unwrap();
        jt.run().unwrap();

        let beliefs = jt.beliefs().unwrap();
        for (beta, region) in jt.regions().inner_regions().iter().enumerate() {
            let [parent, child] = region.outer;
            let left = beliefs[parent].marginal(&region.vars, true).unwrap();
            let right = beliefs[child].marginal(&region.vars, true).unwrap();
            let separator = &jt.inner_beliefs().unwrap()[beta];
            for ((a, b), c) in left.values().iter().zip(right.values()).zip(separator.values()) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-9);
                assert_abs_diff_eq!(a, c, epsilon = 1e-9);
            }
        }
    }

    /// Property: both schedules compute the same beliefs and logZ
    #[test]
    fn schedules_agree(graph in random_model(), max_product in any::<bool>()) {
        let inference = if max_product {
            InferenceType::MaxProduct
        } else {
            InferenceType::SumProduct
        };
        let mut hugin = JunctionTree::from_factor_graph(
            &graph,
            JTreeProperties::new(UpdateType::Hugin).with_inference(inference),
        )
        .unwrap();
        let mut shsh = JunctionTree::from_factor_graph(
            &graph,
            JTreeProperties::new(UpdateType::ShaferShenoy).with_inference(inference),
        )
        .unwrap();
        hugin.run().unwrap();
        shsh.run().unwrap();

        assert_abs_diff_eq!(hugin.log_z().unwrap(), shsh.log_z().unwrap(), epsilon = 1e-9);
        for (a, b) in hugin.beliefs().unwrap().iter().zip(shsh.beliefs().unwrap().iter()) {
            for (x, y) in a.values().iter().zip(b.values()) {
                assert_abs_diff_eq!(x, y, epsilon = 1e-9);
            }
        }
    }
}

// ============================================================================
// Query Properties
// ============================================================================

proptest! {
    /// Property: the MAP assignment reaches the largest joint entry
    #[test]
    fn map_reaches_maximum(graph in random_model(), updates in updates_strategy()) {
        let props = JTreeProperties::new(updates).with_inference(InferenceType::MaxProduct);
        let mut jt = JunctionTree::from_factor_graph(&graph, props).unwrap();
        jt.run().unwrap();

        let maximum = jt.find_maximum().unwrap();
        prop_assert_eq!(maximum.len(), graph.num_variables());

        let full = joint(&graph);
        let state: Vec<usize> = maximum.values().copied().collect();
        let value = full.get(&state).unwrap();
        prop_assert!((value - full.max_value()).abs() <= 1e-9 * full.max_value());
    }

    /// Property: marginals over arbitrary variable pairs are exact
    #[test]
    fn calc_marginal_is_exact(
        graph in random_model(),
        updates in updates_strategy(),
        picks in (0usize..6, 0usize..6),
    ) {
        let mut jt = JunctionTree::from_factor_graph(&graph, JTreeProperties::new(updates)).unwrap();
        jt.run().unwrap();

        let vars = graph.vars().as_slice();
        let vs: NodeSet = [vars[picks.0 % vars.len()], vars[picks.1 % vars.len()]]
            .into_iter()
            .collect();
        let marginal = jt.calc_marginal(&vs).unwrap();
        let exact = joint(&graph).marginal(&vs, true).unwrap();
        prop_assert_eq!(marginal.vars(), exact.vars());
        for (a, b) in marginal.values().iter().zip(exact.values()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }
}
