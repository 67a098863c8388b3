//! Visualization exports for a coarsening result

use crate::coarsen::Coarsening;
use crate::graph::Graph;
use anyhow::Result;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write GraphML and CSV files describing one coarsening into `viz_dir`
pub fn generate_visualizations(coarsening: &Coarsening, original: &Graph, viz_dir: &Path) -> Result<()> {
    log::debug!(
        "Generating visualizations for {} clusters in {}",
        coarsening.clusters.len(),
        viz_dir.display()
    );
    fs::create_dir_all(viz_dir)?;

    write_graphml(coarsening, &viz_dir.join("reduced_network.graphml"))?;
    write_nodes_csv(coarsening, original, &viz_dir.join("nodes.csv"))?;
    write_cluster_stats(coarsening, viz_dir)?;

    Ok(())
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Reduced graph as GraphML; each super-node carries its label and size
pub fn write_graphml(coarsening: &Coarsening, path: &Path) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    let reduced = &coarsening.reduced;

    writeln!(file, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(file, "<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">")?;
    writeln!(file, "  <key id=\"label\" for=\"node\" attr.name=\"label\" attr.type=\"string\"/>")?;
    writeln!(file, "  <key id=\"size\" for=\"node\" attr.name=\"size\" attr.type=\"int\"/>")?;
    writeln!(file, "  <key id=\"internal\" for=\"node\" attr.name=\"internal_weight\" attr.type=\"double\"/>")?;
    writeln!(file, "  <key id=\"weight\" for=\"edge\" attr.name=\"weight\" attr.type=\"double\"/>")?;
    writeln!(file, "  <graph id=\"G\" edgedefault=\"undirected\">")?;

    for cluster in &coarsening.clusters {
        writeln!(file, "    <node id=\"n{}\">", cluster.id)?;
        writeln!(file, "      <data key=\"label\">{}</data>", xml_escape(&reduced.label(cluster.id)))?;
        writeln!(file, "      <data key=\"size\">{}</data>", cluster.size)?;
        writeln!(file, "      <data key=\"internal\">{}</data>", cluster.internal_weight)?;
        writeln!(file, "    </node>")?;
    }

    for (edge_id, (u, v, w)) in reduced.edges().enumerate() {
        writeln!(
            file,
            "    <edge id=\"e{}\" source=\"n{}\" target=\"n{}\">\n      <data key=\"weight\">{}</data>\n    </edge>",
            edge_id, u, v, w
        )?;
    }

    writeln!(file, "  </graph>")?;
    writeln!(file, "</graphml>")?;
    file.flush()?;
    Ok(())
}

/// One row per original node with its cluster assignment
pub fn write_nodes_csv(coarsening: &Coarsening, original: &Graph, path: &Path) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "id,label,cluster_id")?;
    for (node, &cluster) in coarsening.partition.assignment().iter().enumerate() {
        writeln!(file, "{},{},{}", node, csv_field(&original.label(node)), cluster)?;
    }
    file.flush()?;
    Ok(())
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Per-cluster statistics and the cluster size distribution
fn write_cluster_stats(coarsening: &Coarsening, viz_dir: &Path) -> Result<()> {
    let mut stats_file = BufWriter::new(File::create(viz_dir.join("cluster_stats.csv"))?);
    writeln!(stats_file, "cluster_id,representative,size,internal_weight,external_weight")?;
    for cluster in &coarsening.clusters {
        writeln!(
            stats_file,
            "{},{},{},{:.6},{:.6}",
            cluster.id, cluster.representative, cluster.size, cluster.internal_weight, cluster.external_weight
        )?;
    }
    stats_file.flush()?;

    let mut buckets = [0usize; 11];
    for bucket in coarsening.clusters.iter().map(|c| size_bucket(c.size)) {
        buckets[bucket] += 1;
    }

    let mut size_dist_file = BufWriter::new(File::create(viz_dir.join("size_distribution.csv"))?);
    writeln!(size_dist_file, "size_range,count")?;
    writeln!(size_dist_file, "1-9,{}", buckets[0])?;
    for (i, count) in buckets.iter().enumerate().take(10).skip(1) {
        writeln!(size_dist_file, "{}-{},{}", i * 10, i * 10 + 9, count)?;
    }
    writeln!(size_dist_file, "100+,{}", buckets[10])?;
    size_dist_file.flush()?;

    Ok(())
}

/// 1-9 -> 0, 10-19 -> 1, .., 100+ -> 10
fn size_bucket(size: usize) -> usize {
    (size / 10).min(10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coarsen::{coarsen, CoarsenOptions, Method};
    use crate::graph::generators::cycle;

    #[test]
    fn writes_graphml_and_csv() {
        let graph = cycle(6);
        let result = coarsen(&graph, 0.5, Method::Coconut, &CoarsenOptions::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        generate_visualizations(&result, &graph, dir.path()).unwrap();

        let graphml = fs::read_to_string(dir.path().join("reduced_network.graphml")).unwrap();
        assert_eq!(graphml.matches("<node ").count(), 3);
        assert_eq!(graphml.matches("<edge ").count(), result.reduced.edge_count());

        let nodes = fs::read_to_string(dir.path().join("nodes.csv")).unwrap();
        assert_eq!(nodes.lines().count(), 7);

        let dist = fs::read_to_string(dir.path().join("size_distribution.csv")).unwrap();
        assert!(dist.contains("1-9,3"));
    }

    #[test]
    fn buckets_sizes() {
        assert_eq!(size_bucket(1), 0);
        assert_eq!(size_bucket(10), 1);
        assert_eq!(size_bucket(99), 9);
        assert_eq!(size_bucket(250), 10);
    }
}
