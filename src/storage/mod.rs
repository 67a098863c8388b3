//! Results persistence module

use crate::coarsen::{Coarsening, Method};
use crate::config::{ExperimentConfig, ResultFormat};
use crate::data::formats::{write_adjacency_matrix, write_gml};
use crate::experiment::RunRecord;
use crate::graph::Graph;
use crate::metrics::{MetricComparison, SpectralMetrics};
use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;
use serde_json::{json, to_string_pretty};
use statrs::statistics::Statistics;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Write `{base}.gml` and, when asked, `{base}_adj_matrix.txt` (0/1 entries)
pub fn save_graph_files(graph: &Graph, dir: &Path, base: &str, adjacency: bool) -> Result<()> {
    write_gml(graph, &dir.join(format!("{base}.gml")))?;
    if adjacency {
        write_adjacency_matrix(graph, &dir.join(format!("{base}_adj_matrix.txt")), false)?;
    }
    Ok(())
}

/// Save the node-to-cluster mapping and per-cluster details as JSON
pub fn save_partition(original: &Graph, coarsening: &Coarsening, path: &Path) -> Result<()> {
    let mapping: serde_json::Map<String, serde_json::Value> = coarsening
        .partition
        .assignment()
        .iter()
        .enumerate()
        .map(|(node, &cluster)| (original.label(node), json!(cluster)))
        .collect();

    let clusters: Vec<_> = coarsening
        .clusters
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "label": coarsening.reduced.label(c.id),
                "size": c.size,
                "internal_weight": c.internal_weight,
                "external_weight": c.external_weight,
                "members": c.members.iter().map(|&m| original.label(m)).collect::<Vec<_>>(),
            })
        })
        .collect();

    let document = json!({
        "method": coarsening.method,
        "alpha": coarsening.alpha,
        "target": coarsening.target,
        "stats": coarsening.stats,
        "clusters": clusters,
        "mapping": mapping,
    });

    let mut file = File::create(path)?;
    file.write_all(to_string_pretty(&document)?.as_bytes())?;
    Ok(())
}

fn text_column(name: &str, records: &[RunRecord], f: impl Fn(&RunRecord) -> Option<String>) -> Column {
    Column::new(name.into(), records.iter().map(f).collect::<Vec<_>>())
}

fn metric_column(name: &str, records: &[RunRecord], f: impl Fn(&SpectralMetrics) -> f64) -> Column {
    let values: Vec<Option<f64>> = records.iter().map(|r| r.metrics.as_ref().map(&f)).collect();
    Column::new(name.into(), values)
}

fn count_column(name: &str, records: &[RunRecord], f: impl Fn(&SpectralMetrics) -> usize) -> Column {
    let values: Vec<Option<u64>> = records
        .iter()
        .map(|r| r.metrics.as_ref().map(|m| f(m) as u64))
        .collect();
    Column::new(name.into(), values)
}

/// Flatten run records into one table row each
pub fn results_frame(records: &[RunRecord]) -> PolarsResult<DataFrame> {
    let status = |r: &RunRecord| Some(if r.is_success() { "success" } else { "error" }.to_string());

    let columns = vec![
        text_column("network", records, |r| Some(r.network.clone())),
        text_column("method", records, |r| Some(r.method.to_string())),
        Column::new("alpha".into(), records.iter().map(|r| r.alpha).collect::<Vec<f64>>()),
        text_column("status", records, status),
        text_column("error_kind", records, |r| r.error_kind.map(|k| k.to_string())),
        text_column("error", records, |r| r.error.clone()),
        Column::new(
            "execution_time".into(),
            records.iter().map(|r| r.execution_time).collect::<Vec<f64>>(),
        ),
        count_column("original_nodes", records, |m| m.original.nodes),
        count_column("reduced_nodes", records, |m| m.reduced.nodes),
        count_column("original_edges", records, |m| m.original.edges),
        count_column("reduced_edges", records, |m| m.reduced.edges),
        metric_column("reduction_ratio", records, |m| m.reduction_ratio),
        metric_column("edge_reduction_ratio", records, |m| m.edge_reduction_ratio),
        metric_column("original_algebraic_connectivity", records, |m| m.original.algebraic_connectivity),
        metric_column("reduced_algebraic_connectivity", records, |m| m.reduced.algebraic_connectivity),
        metric_column("algebraic_connectivity_preservation", records, |m| {
            m.algebraic_connectivity_preservation
        }),
        metric_column("original_spectral_gap", records, |m| m.original.spectral_gap),
        metric_column("reduced_spectral_gap", records, |m| m.reduced.spectral_gap),
        metric_column("spectral_gap_preservation", records, |m| m.spectral_gap_preservation),
        metric_column("original_spectral_radius", records, |m| m.original.spectral_radius),
        metric_column("reduced_spectral_radius", records, |m| m.reduced.spectral_radius),
        metric_column("original_spectral_ratio", records, |m| m.original.spectral_ratio),
        metric_column("reduced_spectral_ratio", records, |m| m.reduced.spectral_ratio),
        metric_column("original_eigenratio", records, |m| m.original.eigenratio),
        metric_column("reduced_eigenratio", records, |m| m.reduced.eigenratio),
        metric_column("eigenvalue_error", records, |m| m.eigenvalue_error),
        metric_column("eigenvalue_max_error", records, |m| m.eigenvalue_max_error),
        Column::new(
            "connectivity_preserved".into(),
            records
                .iter()
                .map(|r| r.metrics.as_ref().map(|m| m.connectivity_preserved))
                .collect::<Vec<Option<bool>>>(),
        ),
    ];

    DataFrame::new(columns)
}

/// One row per (record, metric) with original, reduced and percent
/// reduction; failed runs contribute no rows
pub fn long_frame(records: &[RunRecord]) -> PolarsResult<DataFrame> {
    let rows: Vec<(&RunRecord, MetricComparison)> = records
        .iter()
        .filter_map(|r| r.metrics.as_ref().map(|m| (r, m)))
        .flat_map(|(r, m)| m.comparisons().into_iter().map(move |c| (r, c)))
        .collect();

    let columns = vec![
        Column::new("network".into(), rows.iter().map(|(r, _)| r.network.clone()).collect::<Vec<_>>()),
        Column::new("method".into(), rows.iter().map(|(r, _)| r.method.to_string()).collect::<Vec<_>>()),
        Column::new("alpha".into(), rows.iter().map(|(r, _)| r.alpha).collect::<Vec<f64>>()),
        Column::new("metric".into(), rows.iter().map(|(_, c)| c.metric).collect::<Vec<&str>>()),
        Column::new("original".into(), rows.iter().map(|(_, c)| c.original).collect::<Vec<f64>>()),
        Column::new("reduced".into(), rows.iter().map(|(_, c)| c.reduced).collect::<Vec<f64>>()),
        Column::new(
            "reduction_pct".into(),
            rows.iter().map(|(_, c)| c.reduction_pct).collect::<Vec<f64>>(),
        ),
    ];

    DataFrame::new(columns)
}

/// Write the results table in every requested format
pub fn save_results(records: &[RunRecord], output_dir: &Path, formats: &[ResultFormat]) -> Result<()> {
    log::info!("Saving {} result rows to {}", records.len(), output_dir.display());
    fs::create_dir_all(output_dir)?;

    let needs_frame = formats
        .iter()
        .any(|f| matches!(f, ResultFormat::Csv | ResultFormat::Parquet));
    let mut df = if needs_frame { Some(results_frame(records)?) } else { None };

    for format in formats {
        match (format, df.as_mut()) {
            (ResultFormat::Csv, Some(df)) => {
                let mut file = File::create(output_dir.join("results.csv"))?;
                CsvWriter::new(&mut file).include_header(true).finish(df)?;

                let mut long = long_frame(records)?;
                let mut file = File::create(output_dir.join("metrics_long.csv"))?;
                CsvWriter::new(&mut file).include_header(true).finish(&mut long)?;
            }
            (ResultFormat::Parquet, Some(df)) => {
                let file = File::create(output_dir.join("results.parquet"))?;
                ParquetWriter::new(file).finish(df)?;
            }
            (ResultFormat::Json, _) => {
                let mut file = File::create(output_dir.join("results.json"))?;
                file.write_all(to_string_pretty(records)?.as_bytes())?;
            }
            _ => {}
        }
    }

    Ok(())
}

/// Aggregate figures for one method
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodSummary {
    pub method: Method,
    pub runs: usize,
    pub successful: usize,
    pub mean_node_reduction: Option<f64>,
    pub mean_edge_reduction: Option<f64>,
    pub mean_execution_time: Option<f64>,
    pub std_execution_time: Option<f64>,
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Per-method summary over successful runs, in method order
pub fn summarize(records: &[RunRecord]) -> Vec<MethodSummary> {
    let mut methods: Vec<Method> = records.iter().map(|r| r.method).collect();
    methods.sort();
    methods.dedup();

    methods
        .into_iter()
        .map(|method| {
            let runs: Vec<&RunRecord> = records.iter().filter(|r| r.method == method).collect();
            let ok: Vec<&SpectralMetrics> =
                runs.iter().filter_map(|r| r.metrics.as_ref()).collect();
            let times: Vec<f64> = runs
                .iter()
                .filter(|r| r.is_success())
                .map(|r| r.execution_time)
                .collect();

            let node: Vec<f64> = ok.iter().map(|m| m.reduction_ratio).collect();
            let edge: Vec<f64> = ok.iter().map(|m| m.edge_reduction_ratio).collect();

            MethodSummary {
                method,
                runs: runs.len(),
                successful: ok.len(),
                mean_node_reduction: finite(node.iter().mean()),
                mean_edge_reduction: finite(edge.iter().mean()),
                mean_execution_time: finite(times.iter().mean()),
                std_execution_time: if times.len() > 1 {
                    finite(times.iter().std_dev())
                } else {
                    None
                },
            }
        })
        .collect()
}

/// Write `summary.json` and the human-readable `experiment_summary.txt`
pub fn save_summary(records: &[RunRecord], config: &ExperimentConfig, output_dir: &Path) -> Result<()> {
    let summaries = summarize(records);
    let networks = {
        let mut names: Vec<&str> = records.iter().map(|r| r.network.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    };

    let summary = json!({
        "networks": networks,
        "combinations": records.len(),
        "successful": records.iter().filter(|r| r.is_success()).count(),
        "alphas": config.alphas,
        "methods": config.methods,
        "timeout_secs": config.timeout_secs,
        "per_method": summaries,
    });
    let mut file = File::create(output_dir.join("summary.json"))?;
    file.write_all(to_string_pretty(&summary)?.as_bytes())?;

    fs::write(output_dir.join("experiment_summary.txt"), summary_text(records, &summaries, networks))?;
    Ok(())
}

fn summary_text(records: &[RunRecord], summaries: &[MethodSummary], networks: usize) -> String {
    let fmt = |v: Option<f64>, scale: f64, unit: &str| match v {
        Some(v) => format!("{:.2}{}", v * scale, unit),
        None => "n/a".to_string(),
    };

    let mut out = String::new();
    let _ = writeln!(out, "Graph Coarsening Experiment Summary");
    let _ = writeln!(out, "===================================");
    let _ = writeln!(out);
    let _ = writeln!(out, "Networks: {}", networks);
    let _ = writeln!(out, "Combinations: {}", records.len());
    let _ = writeln!(
        out,
        "Successful: {}",
        records.iter().filter(|r| r.is_success()).count()
    );
    let _ = writeln!(out);

    for s in summaries {
        let _ = writeln!(out, "{}:", s.method);
        let _ = writeln!(out, "  Successful runs: {} / {}", s.successful, s.runs);
        let _ = writeln!(out, "  Average node reduction: {}", fmt(s.mean_node_reduction, 100.0, "%"));
        let _ = writeln!(out, "  Average edge reduction: {}", fmt(s.mean_edge_reduction, 100.0, "%"));
        let _ = writeln!(
            out,
            "  Average execution time: {} (std {})",
            fmt(s.mean_execution_time, 1.0, "s"),
            fmt(s.std_execution_time, 1.0, "s")
        );
    }
    out
}
