//! Exact inference on factor graphs with junction trees.
//!
//! A [`JunctionTree`] turns a [`FactorGraph`] into a tree of cliques by greedy
//! variable elimination, connects the cliques with a maximum-weight spanning
//! tree and calibrates them with one collect and one distribute pass. The
//! calibrated engine answers marginal, partition-sum and MAP queries exactly.
//!
//! # Core Concepts
//!
//! - **Elimination heuristics**: MinNeighbors, MinWeight, MinFill and
//!   WeightedMinFill choose the variable order that induces the cliques
//! - **Cluster graphs**: the working structure of variable elimination
//! - **Region graphs**: cliques (outer regions) and separators (inner regions)
//! - **Schedules**: HUGIN keeps separator beliefs, Shafer-Shenoy keeps messages
//! - **Inference types**: sum-product for marginals, max-product for MAP
//!
//! # Architecture
//!
//! ```text
//! FactorGraph → ClusterGraph → cliques → RootedTree → RegionGraph → run()
//!      ↓            ↓                         ↓                      ↓
//!   Factors    Elimination           Spanning tree          Beliefs, logZ, MAP
//! ```
//!
//! # Example
//!
//! ```
//! use tensorlogic_jtree::{Factor, FactorGraph, JTreeProperties, JunctionTree, Node, NodeSet};
//!
//! # fn main() -> tensorlogic_jtree::Result<()> {
//! let mut graph = FactorGraph::new();
//! graph.add_node(Node::discrete(0, 2)?);
//! graph.add_node(Node::discrete(1, 2)?);
//! graph.add_factor(Factor::from_vec(NodeSet::from([0]), &[2], vec![0.4, 0.6])?)?;
//! graph.add_factor(Factor::from_vec(
//!     NodeSet::from([0, 1]),
//!     &[2, 2],
//!     vec![0.9, 0.1, 0.2, 0.8],
//! )?)?;
//!
//! let mut jt = JunctionTree::from_factor_graph(&graph, JTreeProperties::default())?;
//! jt.run()?;
//! let belief = jt.belief(&NodeSet::from([1]))?;
//! assert!((belief.get(&[1]).unwrap_or(0.0) - 0.52).abs() < 1e-12);
//! # Ok(())
//! # }
//! ```

pub mod cluster_graph;
pub mod elimination;
mod error;
mod factor;
mod graph;
mod inference;
mod junction_tree;
mod node;
pub mod properties;
pub mod region_graph;
pub mod spanning_tree;
mod treewidth;

pub use cluster_graph::{Cluster, ClusterGraph};
pub use elimination::{EliminationHeuristic, GreedyVariableElimination};
pub use error::{PgmError, Result};
pub use factor::Factor;
pub use graph::FactorGraph;
pub use inference::InferenceAlgorithm;
pub use junction_tree::JunctionTree;
pub use node::{Node, NodeId, NodeSet};
pub use properties::{InferenceType, JTreeProperties, PropertySet, UpdateType};
pub use region_graph::{InnerRegion, Neighbor, OuterRegion, RegionGraph};
pub use spanning_tree::{max_spanning_tree, DEdge, RootedTree};
pub use treewidth::bound_treewidth;
