//! Error types for junction tree construction and inference.

use thiserror::Error;

use crate::node::NodeId;

/// Errors that can occur while building or querying a junction tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PgmError {
    /// A query or construction argument does not fit the model
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The junction tree does not cover the factor graph
    #[error("Validity error: {0}")]
    Validity(String),

    /// A memory cap or state-count bound was exceeded
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// An operation was called in a state that does not allow it
    #[error("Precondition violated: {0}")]
    PreconditionViolated(String),

    /// Variable not declared in the factor graph
    #[error("Variable not found: {0}")]
    VariableNotFound(NodeId),

    /// Dimension mismatch in tensor operations
    #[error("Dimension mismatch: expected {expected:?}, got {got:?}")]
    DimensionMismatch { expected: Vec<usize>, got: Vec<usize> },

    /// Invalid probability distribution
    #[error("Invalid distribution: {0}")]
    InvalidDistribution(String),
}

/// Result type for PGM operations.
pub type Result<T> = std::result::Result<T, PgmError>;
