//! Interface shared by inference engines.

use crate::error::Result;
use crate::factor::Factor;
use crate::graph::FactorGraph;
use crate::node::NodeSet;
use crate::properties::PropertySet;

/// An inference engine bound to a factor graph.
///
/// Exact engines report a `max_diff` of 0 and a single iteration; iterative
/// engines report their convergence through the same methods.
pub trait InferenceAlgorithm: Send + Sync {
    /// Short name of the algorithm.
    fn name(&self) -> &str;

    /// Run inference and return the maximum belief change of the last pass.
    fn run(&mut self) -> Result<f64>;

    /// Belief over `vs`.
    fn belief(&self, vs: &NodeSet) -> Result<Factor>;

    /// One belief per region of the engine.
    fn beliefs(&self) -> Result<Vec<Factor>>;

    /// Logarithm of the partition sum.
    fn log_z(&self) -> Result<f64>;

    /// Maximum belief change of the last run.
    fn max_diff(&self) -> f64;

    /// Number of passes performed by the last run.
    fn iterations(&self) -> usize;

    /// Configuration in string form.
    fn properties(&self) -> PropertySet;

    /// Replace the configuration from its string form.
    fn set_properties(&mut self, opts: &PropertySet) -> Result<()>;

    /// A fresh engine of the same kind and configuration on another graph.
    fn construct(&self, fg: &FactorGraph) -> Result<Box<dyn InferenceAlgorithm>>;

    /// Deep copy behind a box.
    fn box_clone(&self) -> Box<dyn InferenceAlgorithm>;
}

impl Clone for Box<dyn InferenceAlgorithm> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}
