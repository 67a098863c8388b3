//! Spectral and connectivity metrics comparing an original and reduced graph

use crate::coarsen::{Deadline, Partition};
use crate::error::{CoarsenError, Result};
use crate::graph::algorithms::component_count;
use crate::graph::Graph;
use crate::scoring::eigen::symmetric_eigenvalues;
use serde::{Deserialize, Serialize};

/// Eigenvalues below this magnitude are treated as exact zeros
pub const EIGEN_TOLERANCE: f64 = 1e-12;

/// Which Laplacian/adjacency the spectra are taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeWeighting {
    /// Use edge weights (aggregated weights on the reduced graph)
    Weighted,
    /// Every edge counts as 1
    Unweighted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationOptions {
    /// Number of largest Laplacian eigenvalues compared
    pub k: usize,
    pub weighting: EdgeWeighting,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            k: 10,
            weighting: EdgeWeighting::Weighted,
        }
    }
}

/// Structural and spectral profile of one graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphProfile {
    pub nodes: usize,
    pub edges: usize,
    pub components: usize,

    /// Second-smallest Laplacian eigenvalue
    pub algebraic_connectivity: f64,

    /// Largest minus second-largest adjacency eigenvalue
    pub spectral_gap: f64,

    /// Largest adjacency eigenvalue magnitude
    pub spectral_radius: f64,

    /// Largest Laplacian eigenvalue over the algebraic connectivity
    pub spectral_ratio: f64,

    /// Smallest non-zero Laplacian eigenvalue over the largest
    pub eigenratio: f64,

    /// Laplacian eigenvalues, ascending
    #[serde(skip)]
    pub laplacian_spectrum: Vec<f64>,
}

/// Metrics record for one (original, reduced, mapping) triple
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectralMetrics {
    pub original: GraphProfile,
    pub reduced: GraphProfile,

    /// 1 - |V_reduced| / |V_original|
    pub reduction_ratio: f64,

    /// 1 - |E_reduced| / |E_original|
    pub edge_reduction_ratio: f64,

    /// Reduced / original algebraic connectivity
    pub algebraic_connectivity_preservation: f64,

    /// Reduced / original spectral gap
    pub spectral_gap_preservation: f64,

    /// Mean relative difference of the top-k Laplacian eigenvalues
    pub eigenvalue_error: f64,

    /// Largest relative difference among the top-k Laplacian eigenvalues
    pub eigenvalue_max_error: f64,

    /// k after clamping to the smaller graph
    pub k: usize,

    pub connectivity_preserved: bool,
}

/// Evaluate with default weighting and the given `k`
pub fn evaluate(original: &Graph, reduced: &Graph, partition: &Partition, k: usize) -> Result<SpectralMetrics> {
    evaluate_with(
        original,
        reduced,
        partition,
        &EvaluationOptions {
            k,
            ..EvaluationOptions::default()
        },
    )
}

pub fn evaluate_with(
    original: &Graph,
    reduced: &Graph,
    partition: &Partition,
    options: &EvaluationOptions,
) -> Result<SpectralMetrics> {
    evaluate_within(original, reduced, partition, options, &Deadline::unlimited())
}

/// Evaluate under a wall-clock budget; the deadline is checked around each
/// eigen-decomposition pass
pub fn evaluate_within(
    original: &Graph,
    reduced: &Graph,
    partition: &Partition,
    options: &EvaluationOptions,
    deadline: &Deadline,
) -> Result<SpectralMetrics> {
    deadline.check()?;
    if original.node_count == 0 {
        return Err(CoarsenError::MalformedGraph("original graph has no nodes".to_string()));
    }
    let components = component_count(original);
    if components != 1 {
        return Err(CoarsenError::DisconnectedInput { components });
    }
    if options.k == 0 {
        return Err(CoarsenError::invalid("k", "must compare at least one eigenvalue"));
    }
    if partition.len() != original.node_count {
        return Err(CoarsenError::invalid(
            "mapping",
            format!(
                "mapping covers {} nodes but the original graph has {}",
                partition.len(),
                original.node_count
            ),
        ));
    }
    if partition.cluster_count() != reduced.node_count {
        return Err(CoarsenError::invalid(
            "mapping",
            format!(
                "mapping has {} clusters but the reduced graph has {} nodes",
                partition.cluster_count(),
                reduced.node_count
            ),
        ));
    }

    let original_profile = profile(original, options.weighting)?;
    deadline.check()?;
    let reduced_profile = profile(reduced, options.weighting)?;
    deadline.check()?;

    let k = options.k.min(original.node_count).min(reduced.node_count);
    let (eigenvalue_error, eigenvalue_max_error) = top_k_error(
        &original_profile.laplacian_spectrum,
        &reduced_profile.laplacian_spectrum,
        k,
    );

    let metrics = SpectralMetrics {
        reduction_ratio: 1.0 - reduced.node_count as f64 / original.node_count as f64,
        edge_reduction_ratio: if original.edge_count() > 0 {
            1.0 - reduced.edge_count() as f64 / original.edge_count() as f64
        } else {
            0.0
        },
        algebraic_connectivity_preservation: ratio(
            reduced_profile.algebraic_connectivity,
            original_profile.algebraic_connectivity,
        ),
        spectral_gap_preservation: ratio(reduced_profile.spectral_gap, original_profile.spectral_gap),
        eigenvalue_error,
        eigenvalue_max_error,
        k,
        connectivity_preserved: reduced_profile.components == original_profile.components,
        original: original_profile,
        reduced: reduced_profile,
    };

    log::debug!(
        "Evaluated {} -> {} nodes: lambda_2 {:.4} -> {:.4}, top-{} error {:.4}",
        metrics.original.nodes,
        metrics.reduced.nodes,
        metrics.original.algebraic_connectivity,
        metrics.reduced.algebraic_connectivity,
        k,
        metrics.eigenvalue_error
    );

    Ok(metrics)
}

/// One scalar metric on both graphs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricComparison {
    pub metric: &'static str,
    pub original: f64,
    pub reduced: f64,

    /// (original - reduced) / original * 100, or 0 when the original is 0
    pub reduction_pct: f64,
}

impl SpectralMetrics {
    /// Long-format view: one row per metric in reporting order
    pub fn comparisons(&self) -> Vec<MetricComparison> {
        let (o, r) = (&self.original, &self.reduced);
        [
            ("Spectral Ratio of L", o.spectral_ratio, r.spectral_ratio),
            ("Eigenratio", o.eigenratio, r.eigenratio),
            ("Spectral Gap of A", o.spectral_gap, r.spectral_gap),
            ("Algebraic Connectivity of L", o.algebraic_connectivity, r.algebraic_connectivity),
            ("Spectral Radius of A", o.spectral_radius, r.spectral_radius),
            ("Number of Nodes", o.nodes as f64, r.nodes as f64),
            ("Number of Edges", o.edges as f64, r.edges as f64),
        ]
        .into_iter()
        .map(|(metric, original, reduced)| MetricComparison {
            metric,
            original,
            reduced,
            reduction_pct: if original != 0.0 {
                (original - reduced) / original * 100.0
            } else {
                0.0
            },
        })
        .collect()
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > EIGEN_TOLERANCE {
        numerator / denominator
    } else {
        0.0
    }
}

fn clean(values: &mut [f64]) {
    for v in values.iter_mut() {
        if v.abs() < EIGEN_TOLERANCE {
            *v = 0.0;
        }
    }
}

/// Spectral profile of a single graph
pub fn profile(graph: &Graph, weighting: EdgeWeighting) -> Result<GraphProfile> {
    let weighted = weighting == EdgeWeighting::Weighted;
    let mut laplacian = symmetric_eigenvalues(&graph.laplacian_matrix(weighted))?;
    let mut adjacency = symmetric_eigenvalues(&graph.adjacency_matrix(weighted))?;
    clean(&mut laplacian);
    clean(&mut adjacency);

    let n = laplacian.len();
    let largest_l = laplacian.last().copied().unwrap_or(0.0);
    let algebraic_connectivity = if n > 1 { laplacian[1] } else { 0.0 };
    let smallest_nonzero = laplacian
        .iter()
        .copied()
        .find(|&v| v > EIGEN_TOLERANCE)
        .unwrap_or(0.0);

    let spectral_gap = if adjacency.len() > 1 {
        adjacency[adjacency.len() - 1] - adjacency[adjacency.len() - 2]
    } else {
        0.0
    };
    let spectral_radius = adjacency.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));

    Ok(GraphProfile {
        nodes: graph.node_count,
        edges: graph.edge_count(),
        components: component_count(graph),
        algebraic_connectivity,
        spectral_gap,
        spectral_radius,
        spectral_ratio: ratio(largest_l, algebraic_connectivity),
        eigenratio: ratio(smallest_nonzero, largest_l),
        laplacian_spectrum: laplacian,
    })
}

/// Mean and max relative difference between the k largest eigenvalues of two
/// ascending spectra
fn top_k_error(original: &[f64], reduced: &[f64], k: usize) -> (f64, f64) {
    if k == 0 {
        return (0.0, 0.0);
    }
    let errors: Vec<f64> = original
        .iter()
        .rev()
        .zip(reduced.iter().rev())
        .take(k)
        .map(|(&o, &r)| {
            if o.abs() > EIGEN_TOLERANCE {
                (o - r).abs() / o.abs()
            } else {
                (o - r).abs()
            }
        })
        .collect();
    let mean = errors.iter().sum::<f64>() / errors.len() as f64;
    let max = errors.iter().copied().fold(0.0, f64::max);
    (mean, max)
}
