//! Graph coarsening: greedy contraction driven by pairwise similarity
//!
//! Two methods share one contract. `CoCoNUT` scores adjacent cluster pairs by
//! aggregated communicability, `CoarseNet` by proximity in a Laplacian
//! spectral embedding. Both contract edges greedily in priority order with a
//! deterministic tie-break until the live cluster count reaches
//! `round(n * (1 - alpha))`.

pub mod candidates;
pub mod engine;
pub mod partition;

pub use partition::{Cluster, Partition};

use crate::error::{CoarsenError, Result};
use crate::graph::Graph;
use crate::scoring::{CommunicabilityScorer, ScoreNormalization};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Coarsening strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "CoCoNUT")]
    Coconut,
    #[serde(rename = "CoarseNet")]
    CoarseNet,
}

impl Method {
    pub const ALL: [Method; 2] = [Method::Coconut, Method::CoarseNet];

    pub fn name(&self) -> &'static str {
        match self {
            Method::Coconut => "CoCoNUT",
            Method::CoarseNet => "CoarseNet",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = CoarsenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coconut" => Ok(Method::Coconut),
            "coarsenet" => Ok(Method::CoarseNet),
            other => Err(CoarsenError::invalid(
                "method",
                format!("unknown method '{other}' (expected CoCoNUT or CoarseNet)"),
            )),
        }
    }
}

/// How scores are refreshed after an accepted merge.
///
/// The two strategies are different scoring models, not two speeds of the
/// same one. They share the initial scores, so the first merge always
/// agrees; later merges generally diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateStrategy {
    /// Keep the node-level matrix of the input graph fixed and score a
    /// cluster pair from its member pairs (rows/columns summed on merge).
    /// Approximates `FullRecompute`: it ignores the aggregated edge weights
    /// of the working graph. Only pairs touching the new cluster change, so
    /// a merge costs O(n) instead of a fresh O(n^3) decomposition.
    Aggregated,
    /// Rebuild the scorer on the weighted quotient graph after every merge,
    /// treating each cluster as a single node. The reference behavior.
    FullRecompute,
}

/// Tuning shared by both methods
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoarsenOptions {
    pub scorer: CommunicabilityScorer,
    pub score_normalization: ScoreNormalization,
    pub update: UpdateStrategy,

    /// Laplacian eigenvectors used by CoarseNet
    pub embedding_dim: usize,
}

impl Default for CoarsenOptions {
    fn default() -> Self {
        Self {
            scorer: CommunicabilityScorer::default(),
            score_normalization: ScoreNormalization::Cosine,
            update: UpdateStrategy::Aggregated,
            embedding_dim: 2,
        }
    }
}

/// Wall-clock budget for one run, checked cooperatively by the engine
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    pub fn unlimited() -> Self {
        Self {
            start: Instant::now(),
            budget: None,
        }
    }

    pub fn after(budget: Duration) -> Self {
        Self {
            start: Instant::now(),
            budget: Some(budget),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn check(&self) -> Result<()> {
        match self.budget {
            Some(budget) => {
                let elapsed = self.start.elapsed();
                if elapsed > budget {
                    Err(CoarsenError::Timeout { budget, elapsed })
                } else {
                    Ok(())
                }
            }
            None => Ok(()),
        }
    }
}

/// Counters describing one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoarseningStats {
    pub merges: usize,
    pub stale_candidates: usize,
    pub guard_rejections: usize,
    pub rescoring_passes: usize,
}

/// Output of one coarsening run (or one checkpoint of it)
#[derive(Debug, Clone, Serialize)]
pub struct Coarsening {
    pub method: Method,
    pub alpha: f64,
    pub target: usize,

    /// One node per cluster; node i is cluster i
    pub reduced: Graph,
    pub partition: Partition,
    pub clusters: Vec<Cluster>,
    pub stats: CoarseningStats,
}

/// Validate alpha and compute `round(n * (1 - alpha))`, ties to even
pub fn target_clusters(node_count: usize, alpha: f64) -> Result<usize> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(CoarsenError::invalid(
            "alpha",
            format!("reduction factor must lie in (0, 1), got {alpha}"),
        ));
    }
    Ok((node_count as f64 * (1.0 - alpha)).round_ties_even() as usize)
}

/// Coarsen `graph` by reduction factor `alpha`
pub fn coarsen(graph: &Graph, alpha: f64, method: Method, options: &CoarsenOptions) -> Result<Coarsening> {
    coarsen_with_deadline(graph, alpha, method, options, &Deadline::unlimited())
}

pub fn coarsen_with_deadline(
    graph: &Graph,
    alpha: f64,
    method: Method,
    options: &CoarsenOptions,
    deadline: &Deadline,
) -> Result<Coarsening> {
    let mut results = coarsen_checkpoints(graph, &[alpha], method, options, deadline)?;
    results
        .pop()
        .ok_or_else(|| CoarsenError::invalid("alpha", "no checkpoint produced"))
}

/// Run one contraction to the largest alpha and snapshot every intermediate
/// target; one result per distinct alpha, ascending
pub fn coarsen_checkpoints(
    graph: &Graph,
    alphas: &[f64],
    method: Method,
    options: &CoarsenOptions,
    deadline: &Deadline,
) -> Result<Vec<Coarsening>> {
    if alphas.is_empty() {
        return Err(CoarsenError::invalid("alpha", "at least one reduction factor is required"));
    }

    let mut alphas = alphas.to_vec();
    alphas.sort_by(f64::total_cmp);
    alphas.dedup();

    let targets = alphas
        .iter()
        .map(|&alpha| target_clusters(graph.node_count, alpha))
        .collect::<Result<Vec<_>>>()?;

    let mut engine = engine::Engine::new(graph, method, options, deadline)?;
    let snapshots = engine.run(&targets, deadline)?;

    Ok(snapshots
        .into_iter()
        .zip(alphas)
        .map(|(mut result, alpha)| {
            result.alpha = alpha;
            result
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_rounds_half_to_even() {
        assert_eq!(target_clusters(3, 0.34).unwrap(), 2);
        assert_eq!(target_clusters(5, 0.6).unwrap(), 2);
        assert_eq!(target_clusters(5, 0.5).unwrap(), 2);
        assert_eq!(target_clusters(100, 0.1).unwrap(), 90);
    }

    #[test]
    fn alpha_bounds_are_exclusive() {
        for alpha in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let err = target_clusters(10, alpha).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::InvalidParameter);
        }
    }

    #[test]
    fn method_names_parse() {
        assert_eq!("CoCoNUT".parse::<Method>().unwrap(), Method::Coconut);
        assert_eq!("coarsenet".parse::<Method>().unwrap(), Method::CoarseNet);
        assert!("louvain".parse::<Method>().is_err());
        assert_eq!(Method::Coconut.to_string(), "CoCoNUT");
    }

    #[test]
    fn expired_deadline_times_out() {
        let deadline = Deadline::after(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));
        let err = deadline.check().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Timeout);
        assert!(Deadline::unlimited().check().is_ok());
    }
}
