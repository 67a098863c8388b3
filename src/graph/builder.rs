//! Graph construction module

use crate::error::{CoarsenError, Result};
use crate::graph::Graph;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// What the builder had to clean up to produce a simple graph
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
    /// Self-loops dropped
    pub self_loops_removed: usize,

    /// Duplicate edges dropped (the first occurrence's weight is kept)
    pub parallel_edges_removed: usize,

    /// External ids of nodes removed because no edge touched them
    pub isolated_removed: Vec<String>,
}

/// Builder for incrementally constructing a [`Graph`] from external ids.
///
/// Ids get dense indices in first-seen order. Edges are undirected: `a -> b`
/// and `b -> a` are the same edge.
pub struct GraphBuilder {
    /// Mapping from string IDs to node indices
    id_to_index: HashMap<String, u32>,

    /// Node string IDs in first-seen order
    node_ids: Vec<String>,

    /// Edges as recorded, normalized so the lower index comes first
    edges: Vec<(u32, u32, f64)>,

    /// Self-loops seen while recording
    self_loops: usize,
}

impl GraphBuilder {
    /// Create a new graph builder with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id_to_index: HashMap::with_capacity(capacity),
            node_ids: Vec::with_capacity(capacity),
            edges: Vec::new(),
            self_loops: 0,
        }
    }

    /// Get or create a node index for the given string ID
    pub fn get_or_create_node(&mut self, id: &str) -> u32 {
        if let Some(&idx) = self.id_to_index.get(id) {
            return idx;
        }

        let idx = self.node_ids.len() as u32;
        self.id_to_index.insert(id.to_string(), idx);
        self.node_ids.push(id.to_string());
        idx
    }

    /// Add an undirected edge; a missing weight means 1.0
    pub fn add_edge(&mut self, src_id: &str, dst_id: &str, weight: Option<f64>) -> Result<()> {
        let weight = weight.unwrap_or(1.0);
        if !weight.is_finite() || weight < 0.0 {
            return Err(CoarsenError::MalformedGraph(format!(
                "edge ({src_id}, {dst_id}) has invalid weight {weight}"
            )));
        }

        let src_idx = self.get_or_create_node(src_id);
        let dst_idx = self.get_or_create_node(dst_id);

        if src_idx == dst_idx {
            self.self_loops += 1;
            return Ok(());
        }

        let (u, v) = if src_idx < dst_idx {
            (src_idx, dst_idx)
        } else {
            (dst_idx, src_idx)
        };
        self.edges.push((u, v, weight));
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    /// Build the simple graph and report what was cleaned up
    pub fn build(self) -> Result<(Graph, BuildReport)> {
        let mut report = BuildReport {
            self_loops_removed: self.self_loops,
            ..BuildReport::default()
        };

        // Drop parallel edges, first occurrence wins
        let mut seen = HashSet::with_capacity(self.edges.len());
        let mut simple_edges = Vec::with_capacity(self.edges.len());
        for (u, v, w) in self.edges {
            if seen.insert((u, v)) {
                simple_edges.push((u, v, w));
            } else {
                report.parallel_edges_removed += 1;
            }
        }

        // Drop isolated nodes and compact the index space
        let mut touched = vec![false; self.node_ids.len()];
        for &(u, v, _) in &simple_edges {
            touched[u as usize] = true;
            touched[v as usize] = true;
        }

        let mut old_to_new = vec![u32::MAX; self.node_ids.len()];
        let mut node_ids = Vec::with_capacity(self.node_ids.len());
        for (old, id) in self.node_ids.into_iter().enumerate() {
            if touched[old] {
                old_to_new[old] = node_ids.len() as u32;
                node_ids.push(id);
            } else {
                report.isolated_removed.push(id);
            }
        }

        let edges: Vec<(usize, usize, f64)> = simple_edges
            .into_iter()
            .map(|(u, v, w)| {
                (
                    old_to_new[u as usize] as usize,
                    old_to_new[v as usize] as usize,
                    w,
                )
            })
            .collect();

        if report.self_loops_removed > 0
            || report.parallel_edges_removed > 0
            || !report.isolated_removed.is_empty()
        {
            log::debug!(
                "Cleaned input: {} self-loops, {} parallel edges, {} isolated nodes removed",
                report.self_loops_removed,
                report.parallel_edges_removed,
                report.isolated_removed.len()
            );
        }

        let graph = Graph::from_edges(node_ids.len(), &edges)?.with_node_ids(node_ids)?;
        Ok((graph, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_ids_and_strips_noise() {
        let mut builder = GraphBuilder::with_capacity(8);
        builder.add_edge("a", "b", Some(2.0)).unwrap();
        builder.add_edge("b", "a", Some(5.0)).unwrap();
        builder.add_edge("b", "b", None).unwrap();
        builder.get_or_create_node("lonely");
        builder.add_edge("c", "b", None).unwrap();

        let (graph, report) = builder.build().unwrap();
        assert_eq!(graph.node_count, 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edge_weight(0, 1), Some(2.0));
        assert_eq!(graph.label(2), "c");
        assert_eq!(report.self_loops_removed, 1);
        assert_eq!(report.parallel_edges_removed, 1);
        assert_eq!(report.isolated_removed, vec!["lonely".to_string()]);
    }

    #[test]
    fn rejects_negative_weights() {
        let mut builder = GraphBuilder::with_capacity(2);
        assert!(builder.add_edge("a", "b", Some(-0.5)).is_err());
    }
}
