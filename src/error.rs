//! Error taxonomy for the coarsening core

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result alias used by the graph model, scorers, engines and evaluator
pub type Result<T> = std::result::Result<T, CoarsenError>;

/// Errors raised by a single (network, method, alpha) combination.
///
/// None of these abort a batch: orchestration records them against the
/// combination that produced them and moves on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoarsenError {
    /// Alpha outside (0, 1), unknown method name, bad evaluation parameters
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        name: &'static str,
        message: String,
    },

    /// Graph is not simple/undirected/connected where that is required
    #[error("malformed graph: {0}")]
    MalformedGraph(String),

    /// Evaluator was handed a disconnected original graph
    #[error("original graph has {components} connected components; evaluation requires a connected graph")]
    DisconnectedInput { components: usize },

    /// Candidates ran out before the live cluster count reached the target
    #[error("cannot reduce to {target} clusters without splitting components (stopped at {reached})")]
    ReductionInfeasible { target: usize, reached: usize },

    /// Non-finite values appeared while scoring
    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    /// Per-run wall-clock budget exceeded
    #[error("run exceeded its {budget:?} budget after {elapsed:?}")]
    Timeout { budget: Duration, elapsed: Duration },
}

/// Category tag of a [`CoarsenError`], recorded in result tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidParameter,
    MalformedGraph,
    DisconnectedInput,
    ReductionInfeasible,
    NumericalInstability,
    Timeout,
}

impl CoarsenError {
    /// Shorthand for an [`CoarsenError::InvalidParameter`]
    pub fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        CoarsenError::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoarsenError::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            CoarsenError::MalformedGraph(_) => ErrorKind::MalformedGraph,
            CoarsenError::DisconnectedInput { .. } => ErrorKind::DisconnectedInput,
            CoarsenError::ReductionInfeasible { .. } => ErrorKind::ReductionInfeasible,
            CoarsenError::NumericalInstability(_) => ErrorKind::NumericalInstability,
            CoarsenError::Timeout { .. } => ErrorKind::Timeout,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidParameter => "InvalidParameterError",
            ErrorKind::MalformedGraph => "MalformedGraphError",
            ErrorKind::DisconnectedInput => "DisconnectedInputError",
            ErrorKind::ReductionInfeasible => "ReductionInfeasibleError",
            ErrorKind::NumericalInstability => "NumericalInstabilityError",
            ErrorKind::Timeout => "TimeoutError",
        };
        f.write_str(name)
    }
}
