//! Configuration management for coarsening experiments

use crate::coarsen::{CoarsenOptions, Method};
use crate::data::Thresholds;
use crate::error::CoarsenError;
use crate::metrics::EvaluationOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Inclusive alpha grid `start, start + step, ..` up to `end`, rounded to two
/// decimals
pub fn alpha_range(start: f64, end: f64, step: f64) -> Vec<f64> {
    let count = ((end - start) / step + 1e-9).floor() as usize + 1;
    (0..count)
        .map(|i| ((start + i as f64 * step) * 100.0).round() / 100.0)
        .collect()
}

/// Output table formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    Csv,
    Parquet,
    Json,
}

/// Named experiment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    QuickTest,
    ComparisonStudy,
    AlphaSensitivity,
    CoconutOnly,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::QuickTest,
        Preset::ComparisonStudy,
        Preset::AlphaSensitivity,
        Preset::CoconutOnly,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::QuickTest => "quick_test",
            Preset::ComparisonStudy => "comparison_study",
            Preset::AlphaSensitivity => "alpha_sensitivity",
            Preset::CoconutOnly => "coconut_only",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Preset::QuickTest => "Quick test with sample networks",
            Preset::ComparisonStudy => "Compare CoCoNUT vs CoarseNet",
            Preset::AlphaSensitivity => "Study sensitivity to alpha parameter",
            Preset::CoconutOnly => "CoCoNUT algorithm evaluation",
        }
    }
}

impl FromStr for Preset {
    type Err = CoarsenError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| CoarsenError::invalid("preset", format!("unknown preset '{s}'")))
    }
}

/// Settings for one batch experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Directory of input graph files
    pub input_path: PathBuf,

    /// Directory results are written to
    pub output_path: PathBuf,

    /// Reduction factors, each in (0, 1)
    pub alphas: Vec<f64>,

    pub methods: Vec<Method>,

    /// Only the first N networks (by file name) when set
    pub max_networks: Option<usize>,

    /// Networks below these sizes are skipped
    pub thresholds: Thresholds,

    /// Coarsen the largest component of a disconnected network instead of
    /// recording it as malformed
    pub largest_component_only: bool,

    /// Wall-clock budget per (network, method, alpha)
    pub timeout_secs: u64,

    pub evaluation: EvaluationOptions,
    pub coarsening: CoarsenOptions,

    pub save_graphs: bool,
    pub save_adjacency_matrices: bool,
    pub save_visualizations: bool,
    pub result_formats: Vec<ResultFormat>,

    /// Number of worker threads (0 = use all available cores)
    pub threads: usize,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/networks"),
            output_path: PathBuf::from("results/coarsening_experiments"),
            alphas: alpha_range(0.10, 0.95, 0.05),
            methods: Method::ALL.to_vec(),
            max_networks: None,
            thresholds: Thresholds::default(),
            largest_component_only: false,
            timeout_secs: 300,
            evaluation: EvaluationOptions::default(),
            coarsening: CoarsenOptions::default(),
            save_graphs: true,
            save_adjacency_matrices: true,
            save_visualizations: false,
            result_formats: vec![ResultFormat::Csv, ResultFormat::Json],
            threads: 0,
        }
    }
}

impl ExperimentConfig {
    /// Start from the defaults and apply a preset's alphas, methods and
    /// network limit
    pub fn preset(preset: Preset) -> Self {
        let base = Self::default();
        match preset {
            Preset::QuickTest => Self {
                alphas: vec![0.3, 0.5, 0.7],
                max_networks: Some(3),
                methods: vec![Method::Coconut],
                ..base
            },
            Preset::ComparisonStudy => Self {
                alphas: vec![0.2, 0.4, 0.6, 0.8],
                methods: Method::ALL.to_vec(),
                ..base
            },
            Preset::AlphaSensitivity => Self {
                alphas: alpha_range(0.10, 0.90, 0.02),
                max_networks: Some(10),
                methods: vec![Method::Coconut],
                ..base
            },
            Preset::CoconutOnly => Self {
                alphas: alpha_range(0.10, 0.95, 0.05),
                methods: vec![Method::Coconut],
                ..base
            },
        }
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Worker threads to use, resolving 0 to the core count
    pub fn worker_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            num_cpus::get()
        }
    }

    /// Reject settings no run could use
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.alphas.is_empty() {
            return Err(CoarsenError::invalid("alphas", "at least one reduction factor is required"));
        }
        if let Some(&bad) = self.alphas.iter().find(|&&a| !(a > 0.0 && a < 1.0)) {
            return Err(CoarsenError::invalid(
                "alphas",
                format!("reduction factor must lie in (0, 1), got {bad}"),
            ));
        }
        if self.methods.is_empty() {
            return Err(CoarsenError::invalid("methods", "at least one method is required"));
        }
        if self.evaluation.k == 0 {
            return Err(CoarsenError::invalid("k", "must compare at least one eigenvalue"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_alpha_grid() {
        let alphas = alpha_range(0.10, 0.95, 0.05);
        assert_eq!(alphas.len(), 18);
        assert_eq!(alphas[0], 0.1);
        assert_eq!(alphas[1], 0.15);
        assert_eq!(alphas[17], 0.95);
        assert_eq!(alpha_range(0.10, 0.90, 0.02).len(), 41);
    }

    #[test]
    fn presets_parse_and_validate() {
        for preset in Preset::ALL {
            let parsed: Preset = preset.name().parse().unwrap();
            assert_eq!(parsed, preset);
            ExperimentConfig::preset(preset).validate().unwrap();
        }
        assert!("nope".parse::<Preset>().is_err());
        assert_eq!(ExperimentConfig::preset(Preset::QuickTest).max_networks, Some(3));
    }

    #[test]
    fn json_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"alphas": [0.25], "methods": ["CoarseNet"], "timeout_secs": 5}"#).unwrap();
        let config = ExperimentConfig::from_json_file(&path).unwrap();
        assert_eq!(config.alphas, vec![0.25]);
        assert_eq!(config.methods, vec![Method::CoarseNet]);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.thresholds.min_nodes, 3);
        assert_eq!(config.evaluation.k, 10);

        std::fs::write(&path, r#"{"alphas": [1.5]}"#).unwrap();
        assert!(ExperimentConfig::from_json_file(&path).is_err());
    }
}
