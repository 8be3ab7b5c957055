//! Factor graph representation.

use std::collections::BTreeMap;

use crate::error::{PgmError, Result};
use crate::factor::Factor;
use crate::node::{Node, NodeId, NodeSet};

/// Factor graph: declared nodes plus an ordered sequence of factors.
///
/// The junction tree only reads a factor graph. Factor order is significant,
/// it decides which clique a factor is assigned to.
#[derive(Clone, Debug, Default)]
pub struct FactorGraph {
    /// Declared nodes by handle
    nodes: BTreeMap<NodeId, Node>,
    /// Factors in insertion order
    factors: Vec<Factor>,
    /// Union of all factor domains
    vars: NodeSet,
}

impl FactorGraph {
    /// Create a new empty factor graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from nodes and factors in one go.
    pub fn from_parts(
        nodes: impl IntoIterator<Item = Node>,
        factors: impl IntoIterator<Item = Factor>,
    ) -> Result<Self> {
        let mut graph = Self::new();
        for node in nodes {
            graph.add_node(node);
        }
        for factor in factors {
            graph.add_factor(factor)?;
        }
        Ok(graph)
    }

    /// Declare a node, replacing an earlier declaration with the same handle.
    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    /// Add a factor to the graph and return its index.
    pub fn add_factor(&mut self, factor: Factor) -> Result<usize> {
        // Ensure all variables exist with matching state counts
        for var in factor.vars() {
            let node = self.nodes.get(&var).ok_or(PgmError::VariableNotFound(var))?;
            let cardinality = factor.cardinality(var).unwrap_or_default();
            if cardinality != node.states {
                return Err(PgmError::DimensionMismatch {
                    expected: vec![node.states],
                    got: vec![cardinality],
                });
            }
        }

        self.vars = &self.vars | factor.vars();
        self.factors.push(factor);
        Ok(self.factors.len() - 1)
    }

    /// Get factor by index.
    pub fn factor(&self, index: usize) -> Option<&Factor> {
        self.factors.get(index)
    }

    /// All factors in insertion order.
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    /// Get number of factors.
    pub fn num_factors(&self) -> usize {
        self.factors.len()
    }

    /// Number of variables referenced by some factor.
    pub fn num_variables(&self) -> usize {
        self.vars.len()
    }

    /// Whether the graph has no factors.
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Union of all factor domains.
    pub fn vars(&self) -> &NodeSet {
        &self.vars
    }

    /// Get a declared node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// All declared nodes in ascending handle order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Number of states of a declared node.
    pub fn states(&self, id: NodeId) -> Result<usize> {
        self.node(id)
            .map(|n| n.states)
            .ok_or(PgmError::VariableNotFound(id))
    }

    /// Joint state count of `vs`, saturating on overflow.
    pub fn nr_states(&self, vs: &NodeSet) -> Result<u128> {
        vs.iter().try_fold(1u128, |acc, v| {
            Ok(acc.saturating_mul(self.states(v)? as u128))
        })
    }

    /// Shape of a factor table over `vs`.
    pub fn shape(&self, vs: &NodeSet) -> Result<Vec<usize>> {
        vs.iter().map(|v| self.states(v)).collect()
    }
}
