//! Parquet edge tables

use crate::graph::{BuildReport, Graph, GraphBuilder};
use anyhow::Result;
use polars::prelude::*;
use std::path::Path;

/// Load an undirected graph from a parquet table with `source` and `target`
/// columns and an optional numeric `weight` column
pub fn load_edge_table(path: &Path) -> Result<(Graph, BuildReport)> {
    log::info!("Reading parquet file: {}", path.display());

    if !path.exists() {
        return Err(anyhow::anyhow!("File not found: {}", path.display()));
    }

    let df = LazyFrame::scan_parquet(path, Default::default())?.collect()?;
    log::debug!("File schema: {:?}", df.schema());

    let source = df.column("source")?.cast(&DataType::String)?;
    let target = df.column("target")?.cast(&DataType::String)?;
    let weight = match df.column("weight") {
        Ok(column) => Some(column.cast(&DataType::Float64)?),
        Err(_) => None,
    };

    let source = source.str()?;
    let target = target.str()?;
    let weight = weight.as_ref().map(|w| w.f64()).transpose()?;

    let row_count = df.height();
    log::info!("Processing {} edge rows", row_count);

    let mut builder = GraphBuilder::with_capacity(row_count);
    let mut skipped = 0usize;
    for i in 0..row_count {
        let (Some(src), Some(dst)) = (source.get(i), target.get(i)) else {
            skipped += 1;
            continue;
        };
        builder.add_edge(src, dst, weight.and_then(|w| w.get(i)))?;
    }

    if skipped > 0 {
        log::warn!("Skipped {} rows with a null endpoint", skipped);
    }

    Ok(builder.build()?)
}
