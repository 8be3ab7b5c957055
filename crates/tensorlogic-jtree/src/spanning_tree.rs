//! Rooted trees over clique indices and maximum-weight spanning trees.

use std::collections::{BTreeSet, VecDeque};

use crate::error::{PgmError, Result};

/// Directed edge from `first` (parent) to `second` (child).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DEdge {
    /// Parent end
    pub first: usize,
    /// Child end
    pub second: usize,
}

impl DEdge {
    /// Create a directed edge.
    pub fn new(first: usize, second: usize) -> Self {
        Self { first, second }
    }
}

/// A tree over `0..n` stored as parent-to-child edges in breadth-first order.
///
/// Visiting the edges forwards goes root to leaves; backwards goes leaves to
/// root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootedTree {
    root: usize,
    edges: Vec<DEdge>,
}

impl RootedTree {
    /// A tree with a single node.
    pub fn singleton(root: usize) -> Self {
        Self {
            root,
            edges: Vec::new(),
        }
    }

    /// Orient undirected `edges` away from `root`.
    ///
    /// Neighbours are visited in ascending order. Edges not reachable from
    /// `root` are an error, as is a cycle.
    pub fn from_edges(edges: &[(usize, usize)], root: usize) -> Result<Self> {
        let mut adjacency: Vec<BTreeSet<usize>> = Vec::new();
        for &(a, b) in edges {
            let needed = a.max(b).max(root) + 1;
            if adjacency.len() < needed {
                adjacency.resize(needed, BTreeSet::new());
            }
            adjacency[a].insert(b);
            adjacency[b].insert(a);
        }

        let mut visited = vec![false; adjacency.len().max(root + 1)];
        let mut queue = VecDeque::from([root]);
        visited[root] = true;
        let mut oriented = Vec::with_capacity(edges.len());

        while let Some(current) = queue.pop_front() {
            let Some(neighbors) = adjacency.get(current) else {
                continue;
            };
            for &next in neighbors {
                if !visited[next] {
                    visited[next] = true;
                    oriented.push(DEdge::new(current, next));
                    queue.push_back(next);
                }
            }
        }

        if oriented.len() != edges.len() {
            return Err(PgmError::InvalidArgument(format!(
                "{} edges do not form a tree rooted at {}",
                edges.len(),
                root
            )));
        }
        Ok(Self {
            root,
            edges: oriented,
        })
    }

    /// Tree from edges already ordered parent before child.
    pub(crate) fn from_ordered(root: usize, edges: Vec<DEdge>) -> Self {
        Self { root, edges }
    }

    /// Same tree, rooted at `root`.
    pub fn reroot(&self, root: usize) -> Result<Self> {
        let undirected: Vec<(usize, usize)> =
            self.edges.iter().map(|e| (e.first, e.second)).collect();
        Self::from_edges(&undirected, root)
    }

    /// The root node.
    pub fn root(&self) -> usize {
        self.root
    }

    /// Edges in breadth-first order.
    pub fn edges(&self) -> &[DEdge] {
        &self.edges
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the tree has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edge by position.
    pub fn get(&self, index: usize) -> Option<&DEdge> {
        self.edges.get(index)
    }

    /// Iterate over the edges in breadth-first order.
    pub fn iter(&self) -> std::slice::Iter<'_, DEdge> {
        self.edges.iter()
    }

    /// Parent of `node`, `None` for the root.
    pub fn parent(&self, node: usize) -> Option<usize> {
        self.edges
            .iter()
            .find(|e| e.second == node)
            .map(|e| e.first)
    }

    /// Position of the edge leading into `node`.
    pub fn parent_edge(&self, node: usize) -> Option<usize> {
        self.edges.iter().position(|e| e.second == node)
    }

    /// Whether `nodes` induce a connected subtree.
    pub fn is_connected(&self, nodes: &BTreeSet<usize>) -> bool {
        let Some(&start) = nodes.iter().next() else {
            return true;
        };

        let mut visited = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for edge in &self.edges {
                let neighbor = if edge.first == current {
                    edge.second
                } else if edge.second == current {
                    edge.first
                } else {
                    continue;
                };
                if nodes.contains(&neighbor) && visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        visited.len() == nodes.len()
    }
}

/// Maximum-weight spanning tree of the complete graph on `0..n`, by Prim's
/// algorithm grown from `root`.
///
/// A node joins the tree through its heaviest edge to the current tree; among
/// equal candidates the lowest node index joins first, attached to the
/// earliest tree node offering that weight.
pub fn max_spanning_tree<W, F>(n: usize, root: usize, weight: F) -> Result<RootedTree>
where
    W: Ord,
    F: Fn(usize, usize) -> W,
{
    if root >= n {
        return Err(PgmError::InvalidArgument(format!(
            "root {} out of range for {} nodes",
            root, n
        )));
    }

    let mut in_tree = vec![false; n];
    in_tree[root] = true;
    // Best known connection of every node outside the tree
    let mut best: Vec<Option<(W, usize)>> = (0..n)
        .map(|v| (v != root).then(|| (weight(root, v), root)))
        .collect();
    let mut edges = Vec::with_capacity(n.saturating_sub(1));

    for _ in 1..n {
        let mut pick: Option<usize> = None;
        for v in 0..n {
            if in_tree[v] {
                continue;
            }
            pick = match (pick, &best[v]) {
                (Some(p), Some((w, _))) => match &best[p] {
                    Some((pw, _)) if w > pw => Some(v),
                    _ => Some(p),
                },
                (None, Some(_)) => Some(v),
                (p, None) => p,
            };
        }
        let Some(v) = pick else {
            break;
        };
        let Some((_, from)) = best[v].take() else {
            break;
        };

        in_tree[v] = true;
        edges.push((from, v));
        for u in 0..n {
            if in_tree[u] {
                continue;
            }
            let w = weight(v, u);
            let better = match &best[u] {
                Some((bw, _)) => w > *bw,
                None => true,
            };
            if better {
                best[u] = Some((w, v));
            }
        }
    }

    RootedTree::from_edges(&edges, root)
}
