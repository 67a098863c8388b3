//! Batch experiments over (network, method, alpha) combinations
//!
//! Every combination gets its own engine state and deadline. A failure is
//! recorded as an error row and never aborts the other combinations.

use crate::coarsen::{coarsen_with_deadline, Coarsening, Deadline, Method};
use crate::config::ExperimentConfig;
use crate::data::{self, preprocessing};
use crate::error::{self, CoarsenError, ErrorKind};
use crate::graph::algorithms::component_count;
use crate::graph::Graph;
use crate::metrics::{evaluate_within, SpectralMetrics};
use crate::{storage, viz};
use anyhow::Result;
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

/// A loaded input network
#[derive(Debug, Clone)]
pub struct Network {
    pub name: String,
    pub graph: Graph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
}

/// Outcome of one (network, method, alpha) combination
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub network: String,
    pub method: Method,
    pub alpha: f64,
    pub status: RunStatus,
    pub error_kind: Option<ErrorKind>,
    pub error: Option<String>,

    /// Seconds spent coarsening and evaluating
    pub execution_time: f64,

    pub metrics: Option<SpectralMetrics>,
}

impl RunRecord {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// Drives a batch experiment from an [`ExperimentConfig`]
pub struct Experiment {
    config: ExperimentConfig,
}

impl Experiment {
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Load every supported graph file in the input directory, skipping
    /// files that fail to parse or fall below the size thresholds
    pub fn load_networks(&self) -> Result<Vec<Network>> {
        let files = data::iter_graph_files(&self.config.input_path)?;
        let limit = self.config.max_networks.unwrap_or(usize::MAX);
        log::info!(
            "Loading up to {} of {} networks from {}",
            limit.min(files.len()),
            files.len(),
            self.config.input_path.display()
        );

        let mut networks = Vec::new();
        for (name, path) in files.into_iter().take(limit) {
            let graph = match data::load_graph(&path) {
                Ok((graph, _report)) => graph,
                Err(err) => {
                    log::warn!("Skipped {}: {:#}", name, err);
                    continue;
                }
            };
            match self.prepare_network(name, graph)? {
                Some(network) => networks.push(network),
                None => continue,
            }
        }

        log::info!("Successfully loaded {} networks", networks.len());
        Ok(networks)
    }

    /// Apply the size thresholds and the component policy
    pub fn prepare_network(&self, name: String, graph: Graph) -> Result<Option<Network>> {
        let graph = if self.config.largest_component_only && component_count(&graph) > 1 {
            preprocessing::largest_component(&graph)?
        } else {
            graph
        };

        if let Some(reason) = self.config.thresholds.rejection(&graph) {
            log::warn!("Skipped {}: {}", name, reason);
            return Ok(None);
        }

        log::info!(
            "Loaded {}: {} nodes, {} edges",
            name,
            graph.node_count,
            graph.edge_count()
        );
        Ok(Some(Network { name, graph }))
    }

    /// Run every combination on a dedicated worker pool; records come back
    /// in (network, method, alpha) enumeration order
    pub fn run_networks(&self, networks: &[Network]) -> Result<Vec<RunRecord>> {
        let jobs: Vec<(&Network, Method, f64)> = networks
            .iter()
            .flat_map(|network| {
                self.config.methods.iter().flat_map(move |&method| {
                    self.config.alphas.iter().map(move |&alpha| (network, method, alpha))
                })
            })
            .collect();

        let threads = self.config.worker_threads();
        log::info!("Running {} combinations on {} worker threads", jobs.len(), threads);

        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
        let records = pool.install(|| {
            jobs.par_iter()
                .map(|&(network, method, alpha)| self.run_combination(network, method, alpha))
                .collect::<Vec<_>>()
        });

        let failures = records.iter().filter(|r| !r.is_success()).count();
        log::info!(
            "Finished {} combinations ({} failed)",
            records.len(),
            failures
        );
        Ok(records)
    }

    /// Load, run, save results and summary
    pub fn run(&self) -> Result<Vec<RunRecord>> {
        std::fs::create_dir_all(&self.config.output_path)?;

        let networks = self.load_networks()?;
        if self.config.save_graphs {
            for network in &networks {
                let dir = self.config.output_path.join(&network.name);
                std::fs::create_dir_all(&dir)?;
                storage::save_graph_files(
                    &network.graph,
                    &dir,
                    &format!("original_{}", network.name),
                    self.config.save_adjacency_matrices,
                )?;
            }
        }

        let records = self.run_networks(&networks)?;
        storage::save_results(&records, &self.config.output_path, &self.config.result_formats)?;
        storage::save_summary(&records, &self.config, &self.config.output_path)?;

        log::info!("Experiment complete. Results saved to {}", self.config.output_path.display());
        Ok(records)
    }

    fn run_combination(&self, network: &Network, method: Method, alpha: f64) -> RunRecord {
        let start = Instant::now();
        let deadline = Deadline::after(self.config.timeout());
        let outcome = self.coarsen_and_evaluate(network, method, alpha, &deadline);
        let execution_time = start.elapsed().as_secs_f64();

        match outcome {
            Ok((coarsening, metrics)) => {
                log::debug!(
                    "{} / {} / {:.2}: {} -> {} nodes in {:.3}s",
                    network.name,
                    method,
                    alpha,
                    network.graph.node_count,
                    coarsening.reduced.node_count,
                    execution_time
                );
                if let Err(err) = self.save_outputs(network, &coarsening) {
                    log::warn!("Could not save outputs for {} / {} / {}: {:#}", network.name, method, alpha, err);
                }
                RunRecord {
                    network: network.name.clone(),
                    method,
                    alpha,
                    status: RunStatus::Success,
                    error_kind: None,
                    error: None,
                    execution_time,
                    metrics: Some(metrics),
                }
            }
            Err(err) => failed_record(network, method, alpha, execution_time, &err),
        }
    }

    /// Coarsening and evaluation share one budget
    fn coarsen_and_evaluate(
        &self,
        network: &Network,
        method: Method,
        alpha: f64,
        deadline: &Deadline,
    ) -> error::Result<(Coarsening, SpectralMetrics)> {
        let coarsening = coarsen_with_deadline(&network.graph, alpha, method, &self.config.coarsening, deadline)?;
        let metrics = evaluate_within(
            &network.graph,
            &coarsening.reduced,
            &coarsening.partition,
            &self.config.evaluation,
            deadline,
        )?;
        Ok((coarsening, metrics))
    }

    fn save_outputs(&self, network: &Network, coarsening: &Coarsening) -> Result<()> {
        if !(self.config.save_graphs || self.config.save_visualizations) {
            return Ok(());
        }
        let dir = self.config.output_path.join(&network.name);
        std::fs::create_dir_all(&dir)?;
        let base = format!("reduced_{}_{}_{}", coarsening.method, network.name, coarsening.alpha);

        if self.config.save_graphs {
            storage::save_graph_files(&coarsening.reduced, &dir, &base, self.config.save_adjacency_matrices)?;
            storage::save_partition(&network.graph, coarsening, &dir.join(format!("{base}_mapping.json")))?;
        }
        if self.config.save_visualizations {
            viz::generate_visualizations(coarsening, &network.graph, &visualization_dir(&dir, &base))?;
        }
        Ok(())
    }
}

fn visualization_dir(network_dir: &Path, base: &str) -> std::path::PathBuf {
    network_dir.join("visualizations").join(base)
}

fn failed_record(network: &Network, method: Method, alpha: f64, execution_time: f64, err: &CoarsenError) -> RunRecord {
    log::warn!("{} / {} / {}: {}", network.name, method, alpha, err);
    RunRecord {
        network: network.name.clone(),
        method,
        alpha,
        status: RunStatus::Error,
        error_kind: Some(err.kind()),
        error: Some(err.to_string()),
        execution_time,
        metrics: None,
    }
}
