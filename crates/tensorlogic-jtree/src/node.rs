//! Model variables and sets of variables.
//!
//! Nodes are owned by the surrounding model and referred to by a stable
//! integer handle ([`NodeId`]). A [`NodeSet`] is a sorted, duplicate-free set
//! of handles with value semantics, so it can be hashed, compared and used as
//! the domain of a [`Factor`](crate::Factor).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, Sub};

use crate::error::{PgmError, Result};

/// Stable handle of a model variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        NodeId(id)
    }
}

/// A model variable.
///
/// The conditional distribution attached to a node is an external
/// collaborator; the junction tree only needs the size of its state space.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Handle of the node
    pub id: NodeId,
    /// Number of states of the node's distribution
    pub states: usize,
    /// Whether the node is observed; evidence pins it to a single state
    pub observed: bool,
}

impl Node {
    /// Create a node.
    pub fn new(id: u32, states: usize, observed: bool) -> Result<Self> {
        let id = NodeId(id);
        if states == 0 {
            return Err(PgmError::InvalidArgument(format!(
                "node {} must have at least one state",
                id
            )));
        }
        Ok(Self {
            id,
            states,
            observed,
        })
    }

    /// Create a hidden node with `states` states.
    pub fn discrete(id: u32, states: usize) -> Result<Self> {
        Self::new(id, states, false)
    }

    /// Create an observed node.
    pub fn observed(id: u32, states: usize) -> Result<Self> {
        Self::new(id, states, true)
    }

    /// States the node contributes to an elimination clique.
    ///
    /// An observed node counts once, whatever the size of its table.
    pub fn elimination_states(&self) -> usize {
        if self.observed {
            1
        } else {
            self.states
        }
    }
}

/// An immutable set of node handles, kept sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeSet(Vec<NodeId>);

impl NodeSet {
    /// The empty set.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// A set with a single node.
    pub fn singleton(id: NodeId) -> Self {
        Self(vec![id])
    }

    /// Number of nodes in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `id` is a member.
    pub fn contains(&self, id: NodeId) -> bool {
        self.0.binary_search(&id).is_ok()
    }

    /// Position of `id` in ascending order, which is also its axis in a factor table.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.0.binary_search(&id).ok()
    }

    /// Iterate over the members in ascending order.
    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, NodeId>> {
        self.0.iter().copied()
    }

    /// Members as a sorted slice.
    pub fn as_slice(&self) -> &[NodeId] {
        &self.0
    }

    /// Add a node, keeping the set sorted.
    pub fn insert(&mut self, id: NodeId) {
        if let Err(pos) = self.0.binary_search(&id) {
            self.0.insert(pos, id);
        }
    }

    /// Remove a node if present.
    pub fn remove(&mut self, id: NodeId) {
        if let Ok(pos) = self.0.binary_search(&id) {
            self.0.remove(pos);
        }
    }

    /// Set union.
    pub fn union(&self, other: &NodeSet) -> NodeSet {
        let mut merged = Vec::with_capacity(self.len() + other.len());
        let (mut i, mut j) = (0, 0);
        while i < self.0.len() && j < other.0.len() {
            match self.0[i].cmp(&other.0[j]) {
                std::cmp::Ordering::Less => {
                    merged.push(self.0[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    merged.push(other.0[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    merged.push(self.0[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&self.0[i..]);
        merged.extend_from_slice(&other.0[j..]);
        NodeSet(merged)
    }

    /// Set intersection.
    pub fn intersection(&self, other: &NodeSet) -> NodeSet {
        NodeSet(self.iter().filter(|&v| other.contains(v)).collect())
    }

    /// Members of `self` that are not in `other`.
    pub fn difference(&self, other: &NodeSet) -> NodeSet {
        NodeSet(self.iter().filter(|&v| !other.contains(v)).collect())
    }

    /// Whether every member of `self` is in `other`.
    pub fn is_subset(&self, other: &NodeSet) -> bool {
        self.len() <= other.len() && self.iter().all(|v| other.contains(v))
    }

    /// Whether every member of `other` is in `self`.
    pub fn is_superset(&self, other: &NodeSet) -> bool {
        other.is_subset(self)
    }

    /// Whether the two sets share a member.
    pub fn intersects(&self, other: &NodeSet) -> bool {
        self.iter().any(|v| other.contains(v))
    }
}

impl FromIterator<NodeId> for NodeSet {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        let mut ids: Vec<NodeId> = iter.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        NodeSet(ids)
    }
}

impl From<Vec<NodeId>> for NodeSet {
    fn from(ids: Vec<NodeId>) -> Self {
        ids.into_iter().collect()
    }
}

impl<const N: usize> From<[u32; N]> for NodeSet {
    fn from(ids: [u32; N]) -> Self {
        ids.into_iter().map(NodeId).collect()
    }
}

impl<'a> IntoIterator for &'a NodeSet {
    type Item = NodeId;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, NodeId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().copied()
    }
}

impl BitOr for &NodeSet {
    type Output = NodeSet;

    fn bitor(self, rhs: &NodeSet) -> NodeSet {
        self.union(rhs)
    }
}

impl BitAnd for &NodeSet {
    type Output = NodeSet;

    fn bitand(self, rhs: &NodeSet) -> NodeSet {
        self.intersection(rhs)
    }
}

impl Sub for &NodeSet {
    type Output = NodeSet;

    fn sub(self, rhs: &NodeSet) -> NodeSet {
        self.difference(rhs)
    }
}

impl fmt::Display for NodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", id)?;
        }
        write!(f, "}}")
    }
}
