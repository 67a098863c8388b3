//! Compressed sparse representation of a simple undirected weighted graph

use crate::error::{CoarsenError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Undirected weighted graph in CSR form.
///
/// Every edge is stored in both directions and each adjacency list is sorted
/// by neighbor index, so lookups are binary searches and iteration order is
/// deterministic. Instances are immutable once built; coarsening works on its
/// own cluster-level state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    /// Number of nodes in the graph
    pub node_count: usize,

    /// Offset array: offsets[i] to offsets[i+1] is the neighbor range of node i
    pub offsets: Vec<u32>,

    /// Concatenated sorted neighbor lists
    pub neighbors: Vec<u32>,

    /// Edge weights, parallel to `neighbors`
    pub weights: Vec<f64>,

    /// Optional mapping from dense indices to the stable external ids
    pub node_ids: Option<Vec<String>>,
}

impl Graph {
    /// Build a graph from an undirected edge list over nodes `0..node_count`.
    ///
    /// Rejects out-of-range endpoints, self-loops, parallel edges (in either
    /// orientation) and negative or non-finite weights.
    pub fn from_edges(node_count: usize, edges: &[(usize, usize, f64)]) -> Result<Self> {
        let mut adjacency: Vec<Vec<(u32, f64)>> = vec![Vec::new(); node_count];

        for &(u, v, w) in edges {
            if u >= node_count || v >= node_count {
                return Err(CoarsenError::MalformedGraph(format!(
                    "edge ({u}, {v}) references a node outside 0..{node_count}"
                )));
            }
            if u == v {
                return Err(CoarsenError::MalformedGraph(format!("self-loop on node {u}")));
            }
            if !w.is_finite() || w < 0.0 {
                return Err(CoarsenError::MalformedGraph(format!(
                    "edge ({u}, {v}) has invalid weight {w}"
                )));
            }
            adjacency[u].push((v as u32, w));
            adjacency[v].push((u as u32, w));
        }

        let mut offsets = Vec::with_capacity(node_count + 1);
        let mut neighbors = Vec::with_capacity(edges.len() * 2);
        let mut weights = Vec::with_capacity(edges.len() * 2);
        offsets.push(0u32);

        for (node, list) in adjacency.iter_mut().enumerate() {
            list.sort_by_key(|&(n, _)| n);
            if let Some(pair) = list.windows(2).find(|pair| pair[0].0 == pair[1].0) {
                return Err(CoarsenError::MalformedGraph(format!(
                    "parallel edges between {} and {}",
                    node, pair[0].0
                )));
            }
            for &(n, w) in list.iter() {
                neighbors.push(n);
                weights.push(w);
            }
            offsets.push(neighbors.len() as u32);
        }

        Ok(Self {
            node_count,
            offsets,
            neighbors,
            weights,
            node_ids: None,
        })
    }

    /// Attach external ids (one per node)
    pub fn with_node_ids(mut self, node_ids: Vec<String>) -> Result<Self> {
        if node_ids.len() != self.node_count {
            return Err(CoarsenError::MalformedGraph(format!(
                "{} node ids supplied for {} nodes",
                node_ids.len(),
                self.node_count
            )));
        }
        self.node_ids = Some(node_ids);
        Ok(self)
    }

    /// Sorted neighbor indices of a node
    pub fn neighbors(&self, node: usize) -> &[u32] {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        &self.neighbors[start..end]
    }

    /// Weights of a node's edges, parallel to [`Graph::neighbors`]
    pub fn neighbor_weights(&self, node: usize) -> &[f64] {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        &self.weights[start..end]
    }

    /// Iterate `(neighbor, weight)` pairs of a node in neighbor order
    pub fn weighted_neighbors(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.neighbors(node)
            .iter()
            .zip(self.neighbor_weights(node))
            .map(|(&n, &w)| (n as usize, w))
    }

    pub fn degree(&self, node: usize) -> usize {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        end - start
    }

    pub fn weighted_degree(&self, node: usize) -> f64 {
        self.neighbor_weights(node).iter().sum()
    }

    /// Weight of the edge between `u` and `v`, if any
    pub fn edge_weight(&self, u: usize, v: usize) -> Option<f64> {
        self.neighbors(u)
            .binary_search(&(v as u32))
            .ok()
            .map(|pos| self.neighbor_weights(u)[pos])
    }

    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.neighbors(u).binary_search(&(v as u32)).is_ok()
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.neighbors.len() / 2
    }

    /// Each undirected edge once as `(u, v, w)` with `u < v`, in ascending order
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.node_count).flat_map(move |u| {
            self.weighted_neighbors(u)
                .filter(move |&(v, _)| u < v)
                .map(move |(v, w)| (u, v, w))
        })
    }

    /// Sum of all undirected edge weights
    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum::<f64>() / 2.0
    }

    /// Largest weighted degree (an upper bound on the adjacency spectral radius)
    pub fn max_weighted_degree(&self) -> f64 {
        (0..self.node_count)
            .map(|node| self.weighted_degree(node))
            .fold(0.0, f64::max)
    }

    /// External id of a node, falling back to its dense index
    pub fn label(&self, node: usize) -> String {
        match self.node_ids {
            Some(ref ids) => ids[node].clone(),
            None => node.to_string(),
        }
    }

    /// Dense adjacency matrix; with `weighted == false` every edge counts as 1
    pub fn adjacency_matrix(&self, weighted: bool) -> Array2<f64> {
        let n = self.node_count;
        let mut a = Array2::<f64>::zeros((n, n));
        for u in 0..n {
            for (v, w) in self.weighted_neighbors(u) {
                a[[u, v]] = if weighted { w } else { 1.0 };
            }
        }
        a
    }

    /// Dense combinatorial Laplacian `L = D - A`
    pub fn laplacian_matrix(&self, weighted: bool) -> Array2<f64> {
        let mut l = self.adjacency_matrix(weighted).mapv(|x| -x);
        for u in 0..self.node_count {
            let degree = if weighted {
                self.weighted_degree(u)
            } else {
                self.degree(u) as f64
            };
            l[[u, u]] = degree;
        }
        l
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Graph {
        Graph::from_edges(3, &[(0, 1, 1.0), (1, 2, 2.0), (0, 2, 3.0)]).unwrap()
    }

    #[test]
    fn stores_edges_symmetrically_and_sorted() {
        let g = triangle();
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.neighbors(0), &[1, 2]);
        assert_eq!(g.neighbors(2), &[0, 1]);
        assert_eq!(g.edge_weight(2, 1), Some(2.0));
        assert_eq!(g.edge_weight(1, 2), Some(2.0));
        assert!(!g.has_edge(0, 0));
        assert_eq!(g.weighted_degree(0), 4.0);
        assert_eq!(g.total_weight(), 6.0);
    }

    #[test]
    fn edges_are_listed_once_in_order() {
        let edges: Vec<_> = triangle().edges().collect();
        assert_eq!(edges, vec![(0, 1, 1.0), (0, 2, 3.0), (1, 2, 2.0)]);
    }

    #[test]
    fn rejects_non_simple_input() {
        assert!(Graph::from_edges(2, &[(0, 0, 1.0)]).is_err());
        assert!(Graph::from_edges(2, &[(0, 1, 1.0), (1, 0, 1.0)]).is_err());
        assert!(Graph::from_edges(2, &[(0, 1, -1.0)]).is_err());
        assert!(Graph::from_edges(2, &[(0, 1, f64::NAN)]).is_err());
        assert!(Graph::from_edges(2, &[(0, 2, 1.0)]).is_err());
    }

    #[test]
    fn laplacian_rows_sum_to_zero() {
        let l = triangle().laplacian_matrix(true);
        for row in l.rows() {
            assert!(row.sum().abs() < 1e-12);
        }
        let unweighted = triangle().laplacian_matrix(false);
        assert_eq!(unweighted[[0, 0]], 2.0);
        assert_eq!(unweighted[[0, 2]], -1.0);
    }
}
