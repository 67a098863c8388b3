use anyhow::Result;
use clap::{Parser, Subcommand};
use graph_coarsener::coarsen::Method;
use graph_coarsener::config::{ExperimentConfig, Preset, ResultFormat};
use graph_coarsener::data::{self, iter_graph_files};
use graph_coarsener::experiment::Experiment;
use graph_coarsener::graph::algorithms::component_count;
use graph_coarsener::graph::generators::sample_networks;
use graph_coarsener::storage;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "graph-coarsener",
    about = "Communicability-based graph coarsening with spectral evaluation"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Verbose logging
    #[clap(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Coarsen every network in a directory and evaluate the results
    Run(RunArgs),

    /// Describe the graph files in a directory
    Info {
        /// Directory of graph files
        #[clap(long)]
        input: PathBuf,
    },

    /// Write the built-in sample networks as GML
    Samples {
        /// Output directory
        #[clap(long, default_value = "data/sample_networks")]
        output_dir: PathBuf,
    },
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Directory of input graph files
    #[clap(long)]
    input: Option<PathBuf>,

    /// Output directory for results
    #[clap(long)]
    output_dir: Option<PathBuf>,

    /// JSON configuration file
    #[clap(long)]
    config: Option<PathBuf>,

    /// Named preset: quick_test, comparison_study, alpha_sensitivity, coconut_only
    #[clap(long)]
    preset: Option<Preset>,

    /// Reduction factors, comma separated
    #[clap(long, value_delimiter = ',')]
    alphas: Option<Vec<f64>>,

    /// Methods to run, comma separated (CoCoNUT, CoarseNet)
    #[clap(long, value_delimiter = ',')]
    methods: Option<Vec<Method>>,

    /// Only the first N networks
    #[clap(long)]
    max_networks: Option<usize>,

    /// Seconds allowed per (network, method, alpha)
    #[clap(long)]
    timeout: Option<u64>,

    /// Number of Laplacian eigenvalues compared
    #[clap(long)]
    k: Option<usize>,

    /// Coarsen the largest component of disconnected networks
    #[clap(long)]
    largest_component: bool,

    /// Skip writing reduced graphs
    #[clap(long)]
    skip_graphs: bool,

    /// Write GraphML and CSV visualization data for every result
    #[clap(long)]
    visualize: bool,

    /// Also write results as parquet
    #[clap(long)]
    parquet: bool,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long)]
    threads: Option<usize>,
}

impl RunArgs {
    /// Preset or file first, then flags on top
    fn into_config(self) -> Result<ExperimentConfig> {
        let mut config = match (&self.config, self.preset) {
            (Some(path), _) => ExperimentConfig::from_json_file(path)?,
            (None, Some(preset)) => {
                log::info!("Using preset {}: {}", preset.name(), preset.description());
                ExperimentConfig::preset(preset)
            }
            (None, None) => ExperimentConfig::default(),
        };

        if let Some(input) = self.input {
            config.input_path = input;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_path = output_dir;
        }
        if let Some(alphas) = self.alphas {
            config.alphas = alphas;
        }
        if let Some(methods) = self.methods {
            config.methods = methods;
        }
        if self.max_networks.is_some() {
            config.max_networks = self.max_networks;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(k) = self.k {
            config.evaluation.k = k;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        config.largest_component_only |= self.largest_component;
        config.save_graphs &= !self.skip_graphs;
        config.save_visualizations |= self.visualize;
        if self.parquet && !config.result_formats.contains(&ResultFormat::Parquet) {
            config.result_formats.push(ResultFormat::Parquet);
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Configure logging
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    match args.command {
        Command::Run(run_args) => {
            let config = run_args.into_config()?;
            log::info!("Starting coarsening experiment");
            log::info!("Input: {}", config.input_path.display());
            log::info!("Output: {}", config.output_path.display());
            log::info!(
                "Alphas: {:?}; methods: {}",
                config.alphas,
                config
                    .methods
                    .iter()
                    .map(|m| m.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            );

            let experiment = Experiment::new(config)?;
            let records = experiment.run()?;
            for summary in storage::summarize(&records) {
                log::info!(
                    "{}: {}/{} successful, mean node reduction {:.1}%",
                    summary.method,
                    summary.successful,
                    summary.runs,
                    summary.mean_node_reduction.unwrap_or(0.0) * 100.0
                );
            }
        }
        Command::Info { input } => {
            for (name, path) in iter_graph_files(&input)? {
                match data::load_graph(&path) {
                    Ok((graph, report)) => log::info!(
                        "{}: {} nodes, {} edges, {} components ({} self-loops, {} parallel edges, {} isolated nodes removed)",
                        name,
                        graph.node_count,
                        graph.edge_count(),
                        component_count(&graph),
                        report.self_loops_removed,
                        report.parallel_edges_removed,
                        report.isolated_removed.len()
                    ),
                    Err(err) => log::warn!("{}: {:#}", name, err),
                }
            }
        }
        Command::Samples { output_dir } => {
            std::fs::create_dir_all(&output_dir)?;
            for (name, graph) in sample_networks() {
                data::formats::write_gml(&graph, &output_dir.join(format!("{name}.gml")))?;
                log::info!("Wrote {}: {} nodes, {} edges", name, graph.node_count, graph.edge_count());
            }
        }
    }

    Ok(())
}
