//! Core library for graph coarsening experiments
//!
//! Greedy contraction of connected undirected graphs (`CoCoNUT`, driven by
//! communicability, and the `CoarseNet` spectral-embedding baseline) plus a
//! spectral evaluator comparing original and reduced graphs.

pub mod coarsen;
pub mod config;
pub mod data;
pub mod error;
pub mod experiment;
pub mod graph;
pub mod metrics;
pub mod scoring;
pub mod storage;
pub mod viz;

pub use coarsen::{
    coarsen, coarsen_checkpoints, coarsen_with_deadline, target_clusters, CoarsenOptions, Coarsening,
    Deadline, Method, Partition, UpdateStrategy,
};
pub use error::{CoarsenError, ErrorKind, Result};
pub use graph::{Graph, GraphBuilder};
pub use metrics::{evaluate, evaluate_with, evaluate_within, EdgeWeighting, EvaluationOptions, SpectralMetrics};
