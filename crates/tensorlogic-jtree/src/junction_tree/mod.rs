//! Junction tree algorithm for exact inference.
//!
//! The junction tree algorithm converts a factor graph into a tree of cliques
//! that satisfies the running intersection property. Greedy variable
//! elimination yields the cliques, a maximum-weight spanning tree connects
//! them, and one of two exact message-passing schedules calibrates the beliefs.
//!
//! # Algorithm Overview
//!
//! 1. **Elimination**: Eliminate variables greedily by a cost heuristic
//! 2. **Cliques**: Keep the maximal cliques induced by the elimination
//! 3. **Spanning tree**: Connect cliques, maximizing shared state space
//! 4. **Regions**: Assign every factor to one clique
//! 5. **Message passing**: HUGIN or Shafer-Shenoy collect/distribute
//! 6. **Query**: Read beliefs, the partition sum, or a MAP assignment
//!
//! # Complexity
//!
//! - Time: O(n × d^(w+1)) where w is treewidth, d is max domain size
//! - Space: O(d^(w+1)) per clique

mod hugin;
mod marginal;
mod shafer_shenoy;

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, debug_span, warn};

use crate::cluster_graph::ClusterGraph;
use crate::elimination::GreedyVariableElimination;
use crate::error::{PgmError, Result};
use crate::factor::Factor;
use crate::graph::FactorGraph;
use crate::inference::InferenceAlgorithm;
use crate::node::{NodeId, NodeSet};
use crate::properties::{InferenceType, JTreeProperties, PropertySet, UpdateType};
use crate::region_graph::RegionGraph;
use crate::spanning_tree::{max_spanning_tree, RootedTree};

/// Beliefs written by a successful run.
#[derive(Clone, Debug)]
pub(crate) struct Calibration {
    /// Outer region beliefs
    pub(crate) outer: Vec<Factor>,
    /// Inner region beliefs
    pub(crate) inner: Vec<Factor>,
    /// Shafer-Shenoy messages by outer region and neighbour position
    pub(crate) messages: Vec<Vec<Factor>>,
    /// Log partition sum
    pub(crate) log_z: f64,
}

/// Junction tree inference engine.
#[derive(Clone, Debug)]
pub struct JunctionTree {
    /// Model the tree was built for
    graph: FactorGraph,
    /// Configuration
    props: JTreeProperties,
    /// Cliques, separators and factor assignment
    regions: RegionGraph,
    /// Spanning tree over the cliques; edge `i` is inner region `i`
    tree: RootedTree,
    /// Present after a successful run
    calibration: Option<Calibration>,
}

impl JunctionTree {
    /// Create an engine for `fg`.
    ///
    /// With `automatic`, the cliques are found by greedy variable
    /// elimination using the configured heuristic, and the memory cap bounds
    /// the total size of the maximal cliques that survive. Otherwise
    /// the engine has no tree until [`generate_jt`](Self::generate_jt) is
    /// called.
    pub fn construct(fg: &FactorGraph, props: JTreeProperties, automatic: bool) -> Result<Self> {
        if fg.is_empty() {
            return Err(PgmError::InvalidArgument(
                "cannot build a junction tree for an empty factor graph".to_string(),
            ));
        }

        let mut jt = Self {
            graph: fg.clone(),
            props,
            regions: RegionGraph::default(),
            tree: RootedTree::singleton(0),
            calibration: None,
        };

        if automatic {
            let cg = ClusterGraph::from_factor_graph(fg, true)?;
            let greedy = GreedyVariableElimination::new(jt.props.heuristic);
            // The cap is checked on the outer regions in construct_regions
            let mut elimination = cg.var_elim(|g, remaining| greedy.choose(g, remaining), 0)?;
            elimination.erase_non_maximal();
            jt.generate_jt(&elimination.cliques())?;
        }

        Ok(jt)
    }

    /// Create an engine with an automatically built tree.
    pub fn from_factor_graph(fg: &FactorGraph, props: JTreeProperties) -> Result<Self> {
        Self::construct(fg, props, true)
    }

    /// Build regions and tree from an explicit clique list and verify the
    /// region counting numbers.
    pub fn generate_jt(&mut self, cliques: &[NodeSet]) -> Result<()> {
        self.construct_regions(cliques, true)?;
        if !self.regions.check_counting_numbers() {
            warn!("counting numbers of the junction tree regions do not sum to one");
        }
        Ok(())
    }

    /// Build regions and tree from an explicit clique list.
    ///
    /// With `verify`, every factor must fit in some clique. On error the
    /// engine is left unchanged.
    pub fn construct_regions(&mut self, cliques: &[NodeSet], verify: bool) -> Result<()> {
        if cliques.is_empty() {
            return Err(PgmError::InvalidArgument("no cliques given".to_string()));
        }

        // Sizes first, nothing is allocated if the cap is exceeded
        let mut total_states: u128 = 0;
        let mut largest = 0;
        for clique in cliques {
            total_states = total_states.saturating_add(self.graph.nr_states(clique)?);
            largest = largest.max(clique.len());
        }
        let budget = self.props.max_entries();
        if budget > 0 && total_states > budget as u128 {
            return Err(PgmError::ResourceExhausted(format!(
                "junction tree needs {} states, memory cap allows {}",
                total_states, budget
            )));
        }

        let root = self.find_root(cliques)?;
        let graph = &self.graph;
        let tree = max_spanning_tree(cliques.len(), root, |a, b| {
            let separator = &cliques[a] & &cliques[b];
            if separator.is_empty() {
                (0, 0)
            } else {
                (graph.nr_states(&separator).unwrap_or(0), separator.len())
            }
        })?;
        let regions = RegionGraph::new(&self.graph, cliques, &tree, verify)?;

        debug!(
            cliques = cliques.len(),
            treewidth = largest.saturating_sub(1),
            total_states = %total_states,
            root,
            "junction tree built"
        );

        self.regions = regions;
        self.tree = tree;
        self.calibration = None;
        Ok(())
    }

    /// Index of the root clique: the first clique containing the configured
    /// root set, or the last clique.
    fn find_root(&self, cliques: &[NodeSet]) -> Result<usize> {
        match &self.props.root {
            Some(root) => cliques.iter().position(|c| root.is_subset(c)).ok_or_else(|| {
                PgmError::InvalidArgument(format!("no clique contains the root set {}", root))
            }),
            None => Ok(cliques.len() - 1),
        }
    }

    /// Whether the engine has a tree.
    pub fn has_tree(&self) -> bool {
        self.regions.nr_outer() > 0
    }

    /// The model.
    pub fn graph(&self) -> &FactorGraph {
        &self.graph
    }

    /// The configuration.
    pub fn props(&self) -> &JTreeProperties {
        &self.props
    }

    /// Cliques, separators and factor assignment.
    pub fn regions(&self) -> &RegionGraph {
        &self.regions
    }

    /// The rooted spanning tree.
    pub fn tree(&self) -> &RootedTree {
        &self.tree
    }

    /// Clique domains in outer region order.
    pub fn cliques(&self) -> Vec<NodeSet> {
        self.regions
            .outer_regions()
            .iter()
            .map(|r| r.vars().clone())
            .collect()
    }

    /// Largest clique size minus one.
    pub fn treewidth(&self) -> usize {
        self.regions
            .outer_regions()
            .iter()
            .map(|r| r.vars().len())
            .max()
            .unwrap_or(0)
            .saturating_sub(1)
    }

    /// Check if the junction tree satisfies the running intersection property.
    ///
    /// For every variable X, the set of cliques containing X forms a connected subtree.
    pub fn verify_running_intersection_property(&self) -> bool {
        let mut var_to_cliques: BTreeMap<NodeId, BTreeSet<usize>> = BTreeMap::new();
        for (alpha, region) in self.regions.outer_regions().iter().enumerate() {
            for var in region.vars() {
                var_to_cliques.entry(var).or_default().insert(alpha);
            }
        }
        var_to_cliques
            .values()
            .all(|cliques| self.tree.is_connected(cliques))
    }

    /// Run message passing with the configured schedule.
    ///
    /// Beliefs from an earlier run stay in place if this run fails.
    pub fn run(&mut self) -> Result<f64> {
        if !self.has_tree() {
            return Err(PgmError::PreconditionViolated(
                "junction tree has no cliques; call generate_jt first".to_string(),
            ));
        }

        let span = debug_span!(
            "jtree_run",
            updates = %self.props.updates,
            inference = %self.props.inference
        );
        let _enter = span.enter();

        let calibration = match self.props.updates {
            UpdateType::Hugin => hugin::calibrate(&self.regions, &self.tree, self.props.inference)?,
            UpdateType::ShaferShenoy => {
                shafer_shenoy::calibrate(&self.regions, &self.tree, self.props.inference)?
            }
        };
        debug!(log_z = calibration.log_z, "junction tree calibrated");
        self.calibration = Some(calibration);
        Ok(0.0)
    }

    pub(crate) fn calibration(&self) -> Result<&Calibration> {
        self.calibration.as_ref().ok_or_else(|| {
            PgmError::PreconditionViolated("junction tree has not been run".to_string())
        })
    }

    /// Whether a run has completed.
    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_some()
    }

    fn check_vars(&self, vs: &NodeSet) -> Result<()> {
        match vs.iter().find(|&v| !self.graph.vars().contains(v)) {
            Some(v) => Err(PgmError::InvalidArgument(format!(
                "variable {} is not part of the model",
                v
            ))),
            None => Ok(()),
        }
    }

    /// Belief over `vs`, read from a separator or clique containing it.
    pub fn belief(&self, vs: &NodeSet) -> Result<Factor> {
        let calibration = self.calibration()?;
        self.check_vars(vs)?;

        let found = calibration
            .inner
            .iter()
            .chain(&calibration.outer)
            .find(|belief| vs.is_subset(belief.vars()));
        match found {
            Some(belief) => project(belief, vs, true, self.props.inference),
            None => Err(PgmError::InvalidArgument(format!(
                "{} is not contained in a single clique; use calc_marginal",
                vs
            ))),
        }
    }

    /// Outer region beliefs.
    pub fn beliefs(&self) -> Result<Vec<Factor>> {
        Ok(self.calibration()?.outer.clone())
    }

    /// Inner region beliefs.
    pub fn inner_beliefs(&self) -> Result<&[Factor]> {
        Ok(&self.calibration()?.inner)
    }

    /// Logarithm of the partition sum.
    pub fn log_z(&self) -> Result<f64> {
        Ok(self.calibration()?.log_z)
    }

    /// Shafer-Shenoy message arriving at outer region `alpha` through its
    /// `k`-th separator.
    pub fn message(&self, alpha: usize, k: usize) -> Result<&Factor> {
        let calibration = self.calibration()?;
        if self.props.updates != UpdateType::ShaferShenoy {
            return Err(PgmError::PreconditionViolated(
                "messages are only stored by the Shafer-Shenoy schedule".to_string(),
            ));
        }
        calibration
            .messages
            .get(alpha)
            .and_then(|m| m.get(k))
            .ok_or_else(|| {
                PgmError::InvalidArgument(format!("no message {} for outer region {}", k, alpha))
            })
    }

    /// Most probable joint state after a max-product run.
    ///
    /// Cliques are decoded depth first from the root, each taking the best
    /// state consistent with the variables decoded so far. Ties keep the
    /// first state in table order.
    pub fn find_maximum(&self) -> Result<BTreeMap<NodeId, usize>> {
        let calibration = self.calibration()?;
        if self.props.inference != InferenceType::MaxProduct {
            return Err(PgmError::PreconditionViolated(
                "find_maximum requires a MAXPROD run".to_string(),
            ));
        }

        let mut maximum: BTreeMap<NodeId, usize> = BTreeMap::new();
        let mut visited = vec![false; self.regions.nr_outer()];
        let mut scheduled = vec![self.tree.root()];

        while let Some(alpha) = scheduled.pop() {
            if visited[alpha] {
                continue;
            }
            visited[alpha] = true;

            let belief = &calibration.outer[alpha];
            let vars = belief.vars().as_slice();
            let mut best: Option<(Vec<usize>, f64)> = None;
            for (state, &p) in belief.values().indexed_iter() {
                let allowed = vars
                    .iter()
                    .enumerate()
                    .all(|(axis, v)| maximum.get(v).map_or(true, |&s| s == state[axis]));
                if allowed && best.as_ref().map_or(true, |(_, bp)| p > *bp) {
                    best = Some(((0..vars.len()).map(|axis| state[axis]).collect(), p));
                }
            }

            match best {
                Some((state, p)) if p > 0.0 => {
                    for (axis, &var) in vars.iter().enumerate() {
                        maximum.entry(var).or_insert(state[axis]);
                    }
                }
                _ => {
                    return Err(PgmError::InvalidDistribution(format!(
                        "no consistent state with positive belief in clique {}",
                        alpha
                    )))
                }
            }

            for nb in self.regions.nb_outer(alpha) {
                for &other in &self.regions.inner(nb.inner).outer {
                    if !visited[other] {
                        scheduled.push(other);
                    }
                }
            }
        }

        Ok(maximum)
    }
}

/// Marginal of `factor` onto `vs`, summing or maximizing per inference type.
pub(crate) fn project(
    factor: &Factor,
    vs: &NodeSet,
    normed: bool,
    inference: InferenceType,
) -> Result<Factor> {
    match inference {
        InferenceType::SumProduct => factor.marginal(vs, normed),
        InferenceType::MaxProduct => factor.max_marginal(vs, normed),
    }
}

/// All-ones factor over `vs`, with the state counts `domain` uses.
pub(crate) fn unit_over(domain: &Factor, vs: &NodeSet) -> Result<Factor> {
    let shape = vs
        .iter()
        .map(|v| domain.cardinality(v).ok_or(PgmError::VariableNotFound(v)))
        .collect::<Result<Vec<_>>>()?;
    Factor::constant(vs.clone(), &shape, 1.0)
}

impl InferenceAlgorithm for JunctionTree {
    fn name(&self) -> &str {
        "JTREE"
    }

    fn run(&mut self) -> Result<f64> {
        JunctionTree::run(self)
    }

    fn belief(&self, vs: &NodeSet) -> Result<Factor> {
        JunctionTree::belief(self, vs)
    }

    fn beliefs(&self) -> Result<Vec<Factor>> {
        JunctionTree::beliefs(self)
    }

    fn log_z(&self) -> Result<f64> {
        JunctionTree::log_z(self)
    }

    fn max_diff(&self) -> f64 {
        0.0
    }

    fn iterations(&self) -> usize {
        1
    }

    fn properties(&self) -> PropertySet {
        self.props.to_property_set()
    }

    fn set_properties(&mut self, opts: &PropertySet) -> Result<()> {
        self.props = JTreeProperties::from_property_set(opts)?;
        self.calibration = None;
        Ok(())
    }

    fn construct(&self, fg: &FactorGraph) -> Result<Box<dyn InferenceAlgorithm>> {
        Ok(Box::new(JunctionTree::from_factor_graph(
            fg,
            self.props.clone(),
        )?))
    }

    fn box_clone(&self) -> Box<dyn InferenceAlgorithm> {
        Box::new(self.clone())
    }
}
