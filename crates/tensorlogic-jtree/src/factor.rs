//! Factor representation and operations.
//!
//! A factor is a non-negative table over the joint states of a [`NodeSet`].
//! Table axes follow the ascending order of the node handles, so two factors
//! over the same set always share a layout.

use scirs2_core::ndarray::{ArrayD, Axis, IxDyn};

use crate::error::{PgmError, Result};
use crate::node::{NodeId, NodeSet};

/// A factor in a probabilistic graphical model.
///
/// Represents a function over a subset of variables: φ(X₁, X₂, ..., Xₖ) → ℝ⁺
#[derive(Clone, Debug, PartialEq)]
pub struct Factor {
    /// Variables this factor depends on
    vars: NodeSet,
    /// Potential values, one axis per variable
    values: ArrayD<f64>,
}

impl Factor {
    /// Create a new factor.
    pub fn new(vars: NodeSet, values: ArrayD<f64>) -> Result<Self> {
        // Validate dimensions match number of variables
        if values.ndim() != vars.len() {
            return Err(PgmError::DimensionMismatch {
                expected: vec![vars.len()],
                got: vec![values.ndim()],
            });
        }
        if values.iter().any(|&x| x < 0.0 || x.is_nan()) {
            return Err(PgmError::InvalidDistribution(format!(
                "factor over {} has negative or NaN entries",
                vars
            )));
        }

        Ok(Self { vars, values })
    }

    /// Create a factor from a flat row-major table.
    pub fn from_vec(vars: NodeSet, shape: &[usize], data: Vec<f64>) -> Result<Self> {
        let values = ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|_| {
            PgmError::DimensionMismatch {
                expected: shape.to_vec(),
                got: vec![],
            }
        })?;
        Self::new(vars, values)
    }

    /// Create a factor with every entry set to `value`.
    pub fn constant(vars: NodeSet, shape: &[usize], value: f64) -> Result<Self> {
        Self::new(vars, ArrayD::from_elem(IxDyn(shape), value))
    }

    /// Create a factor that is zero everywhere except at `state`.
    pub fn point_mass(vars: NodeSet, shape: &[usize], state: &[usize], value: f64) -> Result<Self> {
        let mut factor = Self::constant(vars, shape, 0.0)?;
        let slot = factor.values.get_mut(state).ok_or_else(|| {
            PgmError::InvalidArgument(format!(
                "state {:?} out of bounds for shape {:?}",
                state, shape
            ))
        })?;
        *slot = value;
        Ok(factor)
    }

    /// Indicator of a single variable taking `state`.
    pub fn indicator(var: NodeId, states: usize, state: usize) -> Result<Self> {
        Self::point_mass(NodeSet::singleton(var), &[states], &[state], 1.0)
    }

    /// A factor over no variables.
    pub fn scalar(value: f64) -> Self {
        Self {
            vars: NodeSet::new(),
            values: ArrayD::from_elem(IxDyn(&[]), value),
        }
    }

    /// Domain of the factor.
    pub fn vars(&self) -> &NodeSet {
        &self.vars
    }

    /// Table of values.
    pub fn values(&self) -> &ArrayD<f64> {
        &self.values
    }

    /// Shape of the table.
    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    /// Number of joint states.
    pub fn nr_states(&self) -> usize {
        self.values.len()
    }

    /// Value at a joint state given in axis order.
    pub fn get(&self, state: &[usize]) -> Option<f64> {
        self.values.get(state).copied()
    }

    /// Get cardinality of a variable.
    pub fn cardinality(&self, var: NodeId) -> Option<usize> {
        self.vars.position(var).map(|idx| self.values.shape()[idx])
    }

    /// Sum of all entries.
    pub fn sum(&self) -> f64 {
        self.values.sum()
    }

    /// Largest entry.
    pub fn max_value(&self) -> f64 {
        self.values.iter().fold(f64::NEG_INFINITY, |acc, &x| acc.max(x))
    }

    /// Normalize factor to sum to 1, returning the normalizing constant.
    pub fn normalize(&mut self) -> Result<f64> {
        let sum = self.sum();
        if !(sum > 0.0) || !sum.is_finite() {
            return Err(PgmError::InvalidDistribution(format!(
                "cannot normalize factor over {} with total mass {}",
                self.vars, sum
            )));
        }
        self.values /= sum;
        Ok(sum)
    }

    /// Normalized copy.
    pub fn normalized(&self) -> Result<Factor> {
        let mut result = self.clone();
        result.normalize()?;
        Ok(result)
    }
}

impl Factor {
    /// Apply `op` entry-wise over the union of both domains.
    fn combine<F>(&self, other: &Factor, op: F) -> Result<Factor>
    where
        F: Fn(f64, f64) -> f64,
    {
        // Find union of variables
        let vars = &self.vars | &other.vars;

        let mut shape = Vec::with_capacity(vars.len());
        for var in vars.iter() {
            let cardinality = match (self.cardinality(var), other.cardinality(var)) {
                (Some(a), Some(b)) if a != b => {
                    return Err(PgmError::DimensionMismatch {
                        expected: vec![a],
                        got: vec![b],
                    })
                }
                (Some(a), _) => a,
                (None, Some(b)) => b,
                (None, None) => return Err(PgmError::VariableNotFound(var)),
            };
            shape.push(cardinality);
        }

        // Maps each operand axis to its axis in the result
        let self_axes = axes_within(&self.vars, &vars)?;
        let other_axes = axes_within(&other.vars, &vars)?;
        let mut self_idx = vec![0; self_axes.len()];
        let mut other_idx = vec![0; other_axes.len()];

        let values = ArrayD::from_shape_fn(IxDyn(&shape), |assignment| {
            for (slot, &axis) in self_idx.iter_mut().zip(&self_axes) {
                *slot = assignment[axis];
            }
            for (slot, &axis) in other_idx.iter_mut().zip(&other_axes) {
                *slot = assignment[axis];
            }
            op(
                self.values[self_idx.as_slice()],
                other.values[other_idx.as_slice()],
            )
        });

        Ok(Factor { vars, values })
    }

    /// Compute the product of two factors.
    ///
    /// φ₁(X₁) * φ₂(X₂) = φ(X₁ ∪ X₂)
    pub fn product(&self, other: &Factor) -> Result<Factor> {
        self.combine(other, |a, b| a * b)
    }

    /// Divide this factor by another factor.
    ///
    /// φ₁(X) / φ₂(X) with x / 0 := 0, used for separator updates.
    pub fn divide(&self, other: &Factor) -> Result<Factor> {
        self.combine(other, |a, b| if b == 0.0 { 0.0 } else { a / b })
    }

    /// Entry-wise sum of two factors.
    pub fn add(&self, other: &Factor) -> Result<Factor> {
        self.combine(other, |a, b| a + b)
    }

    /// Sum out every variable not in `keep`.
    ///
    /// ∑ₓ φ(X, Y) = φ(Y)
    pub fn marginal(&self, keep: &NodeSet, normed: bool) -> Result<Factor> {
        self.eliminate(keep, normed, |values, axis| values.sum_axis(axis))
    }

    /// Maximize out every variable not in `keep` (for max-product).
    ///
    /// max_x φ(X, Y) = φ(Y)
    pub fn max_marginal(&self, keep: &NodeSet, normed: bool) -> Result<Factor> {
        self.eliminate(keep, normed, |values, axis| {
            values.map_axis(axis, |view| {
                view.iter().fold(f64::NEG_INFINITY, |acc, &x| acc.max(x))
            })
        })
    }

    fn eliminate<F>(&self, keep: &NodeSet, normed: bool, reduce: F) -> Result<Factor>
    where
        F: Fn(&ArrayD<f64>, Axis) -> ArrayD<f64>,
    {
        if !keep.is_subset(&self.vars) {
            return Err(PgmError::InvalidArgument(format!(
                "cannot marginalize factor over {} onto {}",
                self.vars, keep
            )));
        }

        // Highest axis first so the remaining axis numbers stay valid
        let mut values = self.values.clone();
        for (axis, var) in self.vars.iter().enumerate().rev() {
            if !keep.contains(var) {
                values = reduce(&values, Axis(axis));
            }
        }

        let mut result = Factor {
            vars: keep.clone(),
            values,
        };
        if normed {
            result.normalize()?;
        }
        Ok(result)
    }

    /// Zero every entry where `var` differs from `state` (evidence).
    pub fn clamp(&self, var: NodeId, state: usize) -> Result<Factor> {
        let var_idx = self
            .vars
            .position(var)
            .ok_or(PgmError::VariableNotFound(var))?;

        // Check bounds
        let cardinality = self.values.shape()[var_idx];
        if state >= cardinality {
            return Err(PgmError::InvalidArgument(format!(
                "state {} out of bounds for variable {} with cardinality {}",
                state, var, cardinality
            )));
        }

        let mut values = self.values.clone();
        for (s, mut lane) in values.axis_iter_mut(Axis(var_idx)).enumerate() {
            if s != state {
                lane.fill(0.0);
            }
        }

        Ok(Factor {
            vars: self.vars.clone(),
            values,
        })
    }
}

fn axes_within(part: &NodeSet, whole: &NodeSet) -> Result<Vec<usize>> {
    part.iter()
        .map(|v| whole.position(v).ok_or(PgmError::VariableNotFound(v)))
        .collect()
}
