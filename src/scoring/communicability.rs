//! Communicability: all-length weighted walks via a matrix exponential
//!
//! `S = exp(A / c)` where `c` bounds the spectral radius of the adjacency
//! matrix `A`. For graphs up to `dense_limit` nodes the exponential is taken
//! through the eigen-decomposition `A = V diag(mu) V^T`, giving
//! `S = V diag(exp(mu / c)) V^T`. Above that limit a truncated Taylor series
//! with sparse-times-dense products is used instead; it is a lower-fidelity
//! fallback whose truncation error is bounded (entrywise) by `e / (K+1)!`
//! for the K terms kept.

use crate::error::{CoarsenError, Result};
use crate::graph::Graph;
use crate::scoring::eigen::symmetric_eigen;
use ndarray::{Array1, Array2, Zip};
use serde::{Deserialize, Serialize};

/// Largest series order the fallback will evaluate
const MAX_SERIES_TERMS: usize = 64;

/// How the adjacency matrix is scaled before exponentiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Normalization {
    /// Divide by the largest adjacency eigenvalue magnitude
    SpectralRadius,
    /// Divide by the largest weighted degree
    MaxDegree,
}

/// How a cluster pair's aggregated communicability becomes a score.
///
/// Cluster scores are sums over member pairs of a node-level matrix, so they
/// can be updated exactly by adding rows and columns when clusters merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreNormalization {
    /// Sum of `S_ij` over the pair
    Raw,
    /// Mean of `S_ij` over the pair
    Mean,
    /// Mean of `S_ij / sqrt(S_ii S_jj)` over the pair; removes the advantage
    /// high-degree nodes get from their large self-communicability
    Cosine,
}

impl ScoreNormalization {
    /// Turn node-level communicability into the matrix whose sums are scored
    pub fn prepare(&self, matrix: &mut Array2<f64>) {
        if *self != ScoreNormalization::Cosine {
            return;
        }
        let scale: Array1<f64> = matrix
            .diag()
            .iter()
            .map(|&d| if d > 0.0 { 1.0 / d.sqrt() } else { 0.0 })
            .collect();
        let n = matrix.nrows();
        for i in 0..n {
            for j in 0..n {
                matrix[[i, j]] *= scale[i] * scale[j];
            }
        }
    }
}

/// Which evaluation path produced a communicability matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Backend {
    Eigen,
    TruncatedSeries { terms: usize },
}

#[derive(Debug, Clone)]
pub struct Communicability {
    /// Symmetric, non-negative n x n matrix
    pub matrix: Array2<f64>,

    /// Scale the adjacency matrix was divided by
    pub scale: f64,

    pub backend: Backend,

    /// Entrywise error bound; zero for the eigen path
    pub error_bound: f64,
}

/// Computes the pairwise communicability matrix of a graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunicabilityScorer {
    pub normalization: Normalization,

    /// Node count above which the truncated series replaces the eigen path
    pub dense_limit: usize,

    /// Target truncation bound for the series fallback
    pub series_tolerance: f64,
}

impl Default for CommunicabilityScorer {
    fn default() -> Self {
        Self {
            normalization: Normalization::SpectralRadius,
            dense_limit: 4000,
            series_tolerance: 1e-12,
        }
    }
}

impl CommunicabilityScorer {
    /// Compute `S` for the whole graph
    pub fn score_matrix(&self, graph: &Graph) -> Result<Communicability> {
        let result = if graph.node_count <= self.dense_limit {
            self.eigen_exponential(graph)?
        } else {
            log::info!(
                "Graph has {} nodes (> {}); using truncated-series communicability",
                graph.node_count,
                self.dense_limit
            );
            self.series_exponential(graph)?
        };
        finalize(result)
    }

    fn eigen_exponential(&self, graph: &Graph) -> Result<Communicability> {
        let adjacency = graph.adjacency_matrix(true);
        let spectrum = symmetric_eigen(&adjacency)?;

        let scale = match self.normalization {
            Normalization::SpectralRadius => spectrum
                .values
                .iter()
                .fold(0.0f64, |acc, v| acc.max(v.abs())),
            Normalization::MaxDegree => graph.max_weighted_degree(),
        };
        let scale = if scale > 0.0 { scale } else { 1.0 };

        let transformed: Array1<f64> = spectrum.values.iter().map(|mu| (mu / scale).exp()).collect();
        // Column j of V scaled by exp(mu_j / c)
        let scaled = &spectrum.vectors * &transformed;
        let matrix = scaled.dot(&spectrum.vectors.t());

        Ok(Communicability {
            matrix,
            scale,
            backend: Backend::Eigen,
            error_bound: 0.0,
        })
    }

    fn series_exponential(&self, graph: &Graph) -> Result<Communicability> {
        let n = graph.node_count;
        // The series path never runs an eigen-solve, so it always uses the
        // degree bound; ||A / d_max|| <= 1 keeps every term below 1/k!
        let scale = graph.max_weighted_degree();
        let scale = if scale > 0.0 { scale } else { 1.0 };

        let mut term = Array2::<f64>::eye(n);
        let mut sum = term.clone();
        let mut terms = 0;
        let mut bound = std::f64::consts::E;

        for k in 1..=MAX_SERIES_TERMS {
            let mut next = Array2::<f64>::zeros((n, n));
            for u in 0..n {
                let mut row = next.row_mut(u);
                for (v, w) in graph.weighted_neighbors(u) {
                    row.scaled_add(w / (scale * k as f64), &term.row(v));
                }
            }
            term = next;
            sum += &term;
            terms = k;

            bound = std::f64::consts::E * inverse_factorial(k + 1);
            if bound < self.series_tolerance {
                break;
            }
        }

        log::debug!("Series communicability: {} terms, error bound {:.3e}", terms, bound);

        Ok(Communicability {
            matrix: sum,
            scale,
            backend: Backend::TruncatedSeries { terms },
            error_bound: bound,
        })
    }
}

fn inverse_factorial(k: usize) -> f64 {
    (1..=k).fold(1.0, |acc, i| acc / i as f64)
}

/// Symmetrize, clamp round-off negatives and reject non-finite output
fn finalize(mut result: Communicability) -> Result<Communicability> {
    if result.matrix.iter().any(|x| !x.is_finite()) {
        return Err(CoarsenError::NumericalInstability(format!(
            "communicability transform produced non-finite values (scale {})",
            result.scale
        )));
    }

    let transposed = result.matrix.t().to_owned();
    Zip::from(&mut result.matrix)
        .and(&transposed)
        .for_each(|x, &y| *x = 0.5 * (*x + y));
    result.matrix.mapv_inplace(|x| if x < 0.0 { 0.0 } else { x });

    Ok(result)
}

/// Score of a cluster pair from the sum of its prepared matrix entries
pub fn pair_score(normalization: ScoreNormalization, cross: f64, size_a: usize, size_b: usize) -> f64 {
    match normalization {
        ScoreNormalization::Raw => cross,
        ScoreNormalization::Mean | ScoreNormalization::Cosine => cross / (size_a * size_b) as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::generators::{complete, path, star};

    #[test]
    fn symmetric_nonnegative_and_diagonal_heavy() {
        let graph = path(6);
        let s = CommunicabilityScorer::default().score_matrix(&graph).unwrap();
        let n = graph.node_count;
        for i in 0..n {
            for j in 0..n {
                assert!((s.matrix[[i, j]] - s.matrix[[j, i]]).abs() < 1e-12);
                assert!(s.matrix[[i, j]] >= 0.0);
                let max_diag = s.matrix[[i, i]].max(s.matrix[[j, j]]);
                assert!(s.matrix[[i, j]] <= max_diag + 1e-12);
            }
        }
        // Adjacent pairs communicate more than distant ones
        assert!(s.matrix[[0, 1]] > s.matrix[[0, 3]]);
    }

    #[test]
    fn single_edge_matches_closed_form() {
        // A = [[0,1],[1,0]], scale 1: exp(A) = [[cosh 1, sinh 1], [sinh 1, cosh 1]]
        let graph = path(2);
        let s = CommunicabilityScorer::default().score_matrix(&graph).unwrap();
        assert!((s.matrix[[0, 0]] - 1f64.cosh()).abs() < 1e-10);
        assert!((s.matrix[[0, 1]] - 1f64.sinh()).abs() < 1e-10);
    }

    #[test]
    fn series_fallback_agrees_with_eigen_path() {
        let graph = complete(5);
        let eigen = CommunicabilityScorer {
            normalization: Normalization::MaxDegree,
            ..Default::default()
        }
        .score_matrix(&graph)
        .unwrap();
        let series = CommunicabilityScorer {
            normalization: Normalization::MaxDegree,
            dense_limit: 0,
            ..Default::default()
        }
        .score_matrix(&graph)
        .unwrap();

        assert!(matches!(series.backend, Backend::TruncatedSeries { .. }));
        assert!(series.error_bound < 1e-12);
        for (a, b) in eigen.matrix.iter().zip(series.matrix.iter()) {
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn cosine_preparation_gives_unit_diagonal() {
        let graph = star(4);
        let mut s = CommunicabilityScorer::default().score_matrix(&graph).unwrap().matrix;
        ScoreNormalization::Cosine.prepare(&mut s);
        for i in 0..graph.node_count {
            assert!((s[[i, i]] - 1.0).abs() < 1e-12);
            for j in 0..graph.node_count {
                assert!(s[[i, j]] <= 1.0 + 1e-12);
            }
        }
        assert_eq!(pair_score(ScoreNormalization::Cosine, 3.0, 2, 3), 0.5);
        assert_eq!(pair_score(ScoreNormalization::Raw, 3.0, 2, 3), 3.0);
    }
}
