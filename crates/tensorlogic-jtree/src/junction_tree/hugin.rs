//! HUGIN schedule: collect and distribute with separator beliefs.

use tracing::trace;

use super::{project, unit_over, Calibration};
use crate::error::Result;
use crate::factor::Factor;
use crate::properties::InferenceType;
use crate::region_graph::RegionGraph;
use crate::spanning_tree::RootedTree;

/// Calibrate all regions with one collect and one distribute pass.
///
/// Collect walks the tree edges backwards: the child's marginal on the
/// separator is normalized (its constant added to logZ) and the parent is
/// multiplied by the ratio of new to old separator belief. Distribute walks
/// the edges forwards and updates the children the same way.
pub(crate) fn calibrate(
    regions: &RegionGraph,
    tree: &RootedTree,
    inference: InferenceType,
) -> Result<Calibration> {
    let mut qa: Vec<Factor> = regions
        .outer_regions()
        .iter()
        .map(|r| r.factor.clone())
        .collect();
    let mut qb: Vec<Factor> = regions
        .inner_regions()
        .iter()
        .map(|r| unit_over(&qa[r.outer[0]], &r.vars))
        .collect::<Result<_>>()?;

    // Collect evidence (inward pass)
    let mut log_z = 0.0;
    for (i, edge) in tree.iter().enumerate().rev() {
        let separator = &regions.inner(i).vars;
        let mut new_qb = project(&qa[edge.second], separator, false, inference)?;
        log_z += new_qb.normalize()?.ln();
        qa[edge.first] = qa[edge.first].product(&new_qb.divide(&qb[i])?)?;
        qb[i] = new_qb;
        trace!(from = edge.second, to = edge.first, "collect");
    }
    log_z += qa[tree.root()].normalize()?.ln();

    // Distribute evidence (outward pass)
    for (i, edge) in tree.iter().enumerate() {
        let separator = &regions.inner(i).vars;
        let new_qb = project(&qa[edge.first], separator, true, inference)?;
        qa[edge.second] = qa[edge.second].product(&new_qb.divide(&qb[i])?)?;
        qb[i] = new_qb;
        trace!(from = edge.first, to = edge.second, "distribute");
    }

    for belief in &mut qa {
        belief.normalize()?;
    }

    Ok(Calibration {
        outer: qa,
        inner: qb,
        messages: Vec::new(),
        log_z,
    })
}
