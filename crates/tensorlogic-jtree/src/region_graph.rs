//! Region graph of a junction tree.
//!
//! Every clique becomes an outer region with counting number 1 and every tree
//! edge an inner region over the separator, with counting number -1 (0 when
//! the separator is empty). Each factor of the factor graph is multiplied into
//! the first outer region whose clique contains its domain.

use std::collections::BTreeMap;

use crate::error::{PgmError, Result};
use crate::factor::Factor;
use crate::graph::FactorGraph;
use crate::node::NodeSet;
use crate::spanning_tree::RootedTree;

/// A clique together with the product of the factors assigned to it.
#[derive(Clone, Debug, PartialEq)]
pub struct OuterRegion {
    /// Local potential over the clique
    pub factor: Factor,
    /// Counting number, always 1
    pub counting_number: f64,
}

impl OuterRegion {
    /// Variables of the region.
    pub fn vars(&self) -> &NodeSet {
        self.factor.vars()
    }
}

/// A separator between two adjacent outer regions.
#[derive(Clone, Debug, PartialEq)]
pub struct InnerRegion {
    /// Variables shared by both outer regions
    pub vars: NodeSet,
    /// -1, or 0 when `vars` is empty
    pub counting_number: f64,
    /// Parent and child outer region
    pub outer: [usize; 2],
}

/// Link from an outer region to one of its inner regions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Neighbor {
    /// Inner region index
    pub inner: usize,
    /// Position of the outer region within `InnerRegion::outer`
    pub dual: usize,
}

/// Outer and inner regions of a junction tree.
#[derive(Clone, Debug, Default)]
pub struct RegionGraph {
    outer: Vec<OuterRegion>,
    inner: Vec<InnerRegion>,
    /// Neighbours of every outer region, in inner region order
    nb_outer: Vec<Vec<Neighbor>>,
    /// Outer region each factor was assigned to
    fac_to_outer: Vec<Option<usize>>,
}

impl RegionGraph {
    /// Build the regions for `cliques` connected by `tree`.
    ///
    /// Inner region `i` is the separator of tree edge `i`. With `verify`, a
    /// factor not contained in any clique is a validity error; otherwise it
    /// is left out.
    pub fn new(
        fg: &FactorGraph,
        cliques: &[NodeSet],
        tree: &RootedTree,
        verify: bool,
    ) -> Result<Self> {
        let mut fac_to_outer = Vec::with_capacity(fg.num_factors());
        for (index, factor) in fg.factors().iter().enumerate() {
            let alpha = cliques.iter().position(|c| factor.vars().is_subset(c));
            if alpha.is_none() && verify {
                return Err(PgmError::Validity(format!(
                    "factor {} over {} is not contained in any clique",
                    index,
                    factor.vars()
                )));
            }
            fac_to_outer.push(alpha);
        }

        let mut outer = Vec::with_capacity(cliques.len());
        for clique in cliques {
            let shape = fg.shape(clique)?;
            outer.push(OuterRegion {
                factor: Factor::constant(clique.clone(), &shape, 1.0)?,
                counting_number: 1.0,
            });
        }
        for (factor, alpha) in fg.factors().iter().zip(&fac_to_outer) {
            if let Some(alpha) = *alpha {
                outer[alpha].factor = outer[alpha].factor.product(factor)?;
            }
        }

        let mut inner = Vec::with_capacity(tree.len());
        let mut nb_outer = vec![Vec::new(); cliques.len()];
        for (beta, edge) in tree.iter().enumerate() {
            let (Some(parent), Some(child)) = (cliques.get(edge.first), cliques.get(edge.second))
            else {
                return Err(PgmError::InvalidArgument(format!(
                    "tree edge {} -> {} refers to a missing clique",
                    edge.first, edge.second
                )));
            };
            let vars = parent & child;
            let counting_number = if vars.is_empty() { 0.0 } else { -1.0 };
            inner.push(InnerRegion {
                vars,
                counting_number,
                outer: [edge.first, edge.second],
            });
            nb_outer[edge.first].push(Neighbor {
                inner: beta,
                dual: 0,
            });
            nb_outer[edge.second].push(Neighbor {
                inner: beta,
                dual: 1,
            });
        }

        Ok(Self {
            outer,
            inner,
            nb_outer,
            fac_to_outer,
        })
    }

    /// Number of outer regions.
    pub fn nr_outer(&self) -> usize {
        self.outer.len()
    }

    /// Number of inner regions.
    pub fn nr_inner(&self) -> usize {
        self.inner.len()
    }

    /// Outer region `alpha`.
    pub fn outer(&self, alpha: usize) -> &OuterRegion {
        &self.outer[alpha]
    }

    /// All outer regions.
    pub fn outer_regions(&self) -> &[OuterRegion] {
        &self.outer
    }

    /// Inner region `beta`.
    pub fn inner(&self, beta: usize) -> &InnerRegion {
        &self.inner[beta]
    }

    /// All inner regions.
    pub fn inner_regions(&self) -> &[InnerRegion] {
        &self.inner
    }

    /// Inner regions adjacent to outer region `alpha`.
    pub fn nb_outer(&self, alpha: usize) -> &[Neighbor] {
        &self.nb_outer[alpha]
    }

    /// Outer region that factor `index` was assigned to.
    pub fn fac_to_outer(&self, index: usize) -> Option<usize> {
        self.fac_to_outer.get(index).copied().flatten()
    }

    /// Whether, for every variable, the counting numbers of the regions
    /// containing it sum to one.
    pub fn check_counting_numbers(&self) -> bool {
        let mut totals: BTreeMap<_, f64> = BTreeMap::new();
        for region in &self.outer {
            for var in region.vars() {
                *totals.entry(var).or_default() += region.counting_number;
            }
        }
        for region in &self.inner {
            for var in &region.vars {
                *totals.entry(var).or_default() += region.counting_number;
            }
        }
        totals.values().all(|&c| (c - 1.0).abs() < 1e-10)
    }
}
