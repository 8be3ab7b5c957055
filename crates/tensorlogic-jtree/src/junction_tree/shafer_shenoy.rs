//! Shafer-Shenoy schedule: explicit messages between outer regions.

use tracing::trace;

use super::{project, unit_over, Calibration};
use crate::error::{PgmError, Result};
use crate::factor::Factor;
use crate::properties::InferenceType;
use crate::region_graph::RegionGraph;
use crate::spanning_tree::RootedTree;

/// Position of inner region `beta` among the neighbours of outer region `alpha`.
fn nb_position(regions: &RegionGraph, alpha: usize, beta: usize) -> Result<usize> {
    regions
        .nb_outer(alpha)
        .iter()
        .position(|nb| nb.inner == beta)
        .ok_or_else(|| {
            PgmError::InvalidArgument(format!(
                "inner region {} is not adjacent to outer region {}",
                beta, alpha
            ))
        })
}

/// Local factor of `alpha` times every incoming message except the one
/// through inner region `skip`.
fn outgoing(
    regions: &RegionGraph,
    messages: &[Vec<Factor>],
    alpha: usize,
    skip: Option<usize>,
) -> Result<Factor> {
    let mut msg = regions.outer(alpha).factor.clone();
    for (k, nb) in regions.nb_outer(alpha).iter().enumerate() {
        if Some(nb.inner) != skip {
            msg = msg.product(&messages[alpha][k])?;
        }
    }
    Ok(msg)
}

/// Compute every message, then the beliefs.
///
/// `messages[alpha][k]` is the message arriving at outer region `alpha`
/// through its `k`-th inner region. The upward pass normalizes each message
/// and adds its constant to logZ; the root belief contributes the rest.
pub(crate) fn calibrate(
    regions: &RegionGraph,
    tree: &RootedTree,
    inference: InferenceType,
) -> Result<Calibration> {
    let mut messages: Vec<Vec<Factor>> = (0..regions.nr_outer())
        .map(|alpha| {
            regions
                .nb_outer(alpha)
                .iter()
                .map(|nb| {
                    unit_over(&regions.outer(alpha).factor, &regions.inner(nb.inner).vars)
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<_>>()?;

    // Leaves to root
    let mut log_z = 0.0;
    for (e, edge) in tree.iter().enumerate().rev() {
        let msg = outgoing(regions, &messages, edge.second, Some(e))?;
        let mut message = project(&msg, &regions.inner(e).vars, false, inference)?;
        log_z += message.normalize()?.ln();
        let k = nb_position(regions, edge.first, e)?;
        messages[edge.first][k] = message;
        trace!(from = edge.second, to = edge.first, "message");
    }

    // Root to leaves
    for (e, edge) in tree.iter().enumerate() {
        let msg = outgoing(regions, &messages, edge.first, Some(e))?;
        let message = project(&msg, &regions.inner(e).vars, true, inference)?;
        let k = nb_position(regions, edge.second, e)?;
        messages[edge.second][k] = message;
        trace!(from = edge.first, to = edge.second, "message");
    }

    let mut outer = Vec::with_capacity(regions.nr_outer());
    for alpha in 0..regions.nr_outer() {
        let mut belief = outgoing(regions, &messages, alpha, None)?;
        let z = belief.normalize()?;
        if alpha == tree.root() {
            log_z += z.ln();
        }
        outer.push(belief);
    }

    let inner = regions
        .inner_regions()
        .iter()
        .map(|r| project(&outer[r.outer[0]], &r.vars, true, inference))
        .collect::<Result<Vec<_>>>()?;

    Ok(Calibration {
        outer,
        inner,
        messages,
        log_z,
    })
}
