//! Network screening before an experiment

use crate::error::Result;
use crate::graph::algorithms::component_labels;
use crate::graph::Graph;
use serde::{Deserialize, Serialize};

/// Size thresholds a network must meet to be coarsened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub min_nodes: usize,
    pub min_edges: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_nodes: 3,
            min_edges: 1,
        }
    }
}

impl Thresholds {
    /// Why the graph falls short, if it does
    pub fn rejection(&self, graph: &Graph) -> Option<String> {
        if graph.node_count < self.min_nodes {
            Some(format!("{} nodes < {}", graph.node_count, self.min_nodes))
        } else if graph.edge_count() < self.min_edges {
            Some(format!("{} edges < {}", graph.edge_count(), self.min_edges))
        } else {
            None
        }
    }
}

/// Subgraph induced by the nodes with `keep[node]` set, indices compacted in
/// order and external ids carried over
pub fn induced_subgraph(graph: &Graph, keep: &[bool]) -> Result<Graph> {
    let mut orig_to_sub = vec![usize::MAX; graph.node_count];
    let mut labels = Vec::new();
    for node in 0..graph.node_count {
        if keep[node] {
            orig_to_sub[node] = labels.len();
            labels.push(graph.label(node));
        }
    }

    let edges: Vec<(usize, usize, f64)> = graph
        .edges()
        .filter(|&(u, v, _)| keep[u] && keep[v])
        .map(|(u, v, w)| (orig_to_sub[u], orig_to_sub[v], w))
        .collect();

    Graph::from_edges(labels.len(), &edges)?.with_node_ids(labels)
}

/// Restrict the graph to its largest connected component; ties go to the
/// component containing the lowest node index
pub fn largest_component(graph: &Graph) -> Result<Graph> {
    let labels = component_labels(graph);
    let count = labels.iter().copied().max().map_or(0, |m| m + 1);
    if count <= 1 {
        return Ok(graph.clone());
    }

    let mut sizes = vec![0usize; count];
    for &label in &labels {
        sizes[label] += 1;
    }
    // Labels are assigned in order of first node, so the first maximum wins ties
    let best = sizes
        .iter()
        .enumerate()
        .fold((0, 0), |best, (label, &size)| if size > best.1 { (label, size) } else { best })
        .0;

    let keep: Vec<bool> = labels.iter().map(|&label| label == best).collect();
    let sub = induced_subgraph(graph, &keep)?;
    log::debug!(
        "Kept largest component: {} of {} nodes ({} components)",
        sub.node_count,
        graph.node_count,
        count
    );
    Ok(sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_explain_rejections() {
        let t = Thresholds::default();
        let tiny = Graph::from_edges(2, &[(0, 1, 1.0)]).unwrap();
        assert!(t.rejection(&tiny).unwrap().contains("nodes"));
        let ok = crate::graph::generators::path(3);
        assert!(t.rejection(&ok).is_none());
    }

    #[test]
    fn largest_component_compacts_indices() {
        let graph = Graph::from_edges(5, &[(0, 1, 1.0), (2, 3, 1.0), (3, 4, 2.0)])
            .unwrap()
            .with_node_ids(["a", "b", "c", "d", "e"].map(String::from).to_vec())
            .unwrap();
        let sub = largest_component(&graph).unwrap();
        assert_eq!(sub.node_count, 3);
        assert_eq!(sub.label(0), "c");
        assert_eq!(sub.edge_weight(1, 2), Some(2.0));
    }
}
