//! Deterministic sample networks

use crate::graph::Graph;
use itertools::Itertools;

fn unit(edges: impl IntoIterator<Item = (usize, usize)>) -> Vec<(usize, usize, f64)> {
    edges.into_iter().map(|(u, v)| (u, v, 1.0)).collect()
}

// The edge sets below are simple by construction, so `from_edges` cannot fail
// for any n; the fallbacks only exist to keep the signatures infallible.

/// 0 - 1 - ... - (n-1)
pub fn path(n: usize) -> Graph {
    let edges = unit((1..n).map(|v| (v - 1, v)));
    Graph::from_edges(n, &edges).unwrap_or_else(|_| empty(n))
}

/// Path closed into a ring (needs n >= 3 to be simple)
pub fn cycle(n: usize) -> Graph {
    if n < 3 {
        return path(n);
    }
    let mut edges = unit((1..n).map(|v| (v - 1, v)));
    edges.push((0, n - 1, 1.0));
    Graph::from_edges(n, &edges).unwrap_or_else(|_| empty(n))
}

pub fn complete(n: usize) -> Graph {
    let edges = unit((0..n).tuple_combinations());
    Graph::from_edges(n, &edges).unwrap_or_else(|_| empty(n))
}

/// Hub 0 with `leaves` spokes (leaves + 1 nodes in total)
pub fn star(leaves: usize) -> Graph {
    let edges = unit((1..=leaves).map(|v| (0, v)));
    Graph::from_edges(leaves + 1, &edges).unwrap_or_else(|_| empty(leaves + 1))
}

/// rows x cols lattice, node index = r * cols + c
pub fn grid_2d(rows: usize, cols: usize) -> Graph {
    let mut edges = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            let node = r * cols + c;
            if c + 1 < cols {
                edges.push((node, node + 1, 1.0));
            }
            if r + 1 < rows {
                edges.push((node, node + cols, 1.0));
            }
        }
    }
    Graph::from_edges(rows * cols, &edges).unwrap_or_else(|_| empty(rows * cols))
}

/// Two cliques of size `clique` joined by a path of `bridge` extra nodes
pub fn barbell(clique: usize, bridge: usize) -> Graph {
    if clique == 0 {
        return path(bridge);
    }
    let n = 2 * clique + bridge;
    let mut edges = unit((0..clique).tuple_combinations());
    let offset = clique + bridge;
    edges.extend(unit(
        (0..clique)
            .tuple_combinations()
            .map(|(u, v)| (u + offset, v + offset)),
    ));
    // Chain: last node of the first clique, bridge nodes, first of the second
    let chain: Vec<usize> = std::iter::once(clique - 1)
        .chain(clique..offset)
        .chain(std::iter::once(offset))
        .collect();
    edges.extend(unit(chain.iter().copied().tuple_windows()));
    Graph::from_edges(n, &edges).unwrap_or_else(|_| empty(n))
}

fn empty(n: usize) -> Graph {
    Graph {
        node_count: n,
        offsets: vec![0; n + 1],
        neighbors: Vec::new(),
        weights: Vec::new(),
        node_ids: None,
    }
}

/// Named catalogue written by the `samples` command
pub fn sample_networks() -> Vec<(&'static str, Graph)> {
    vec![
        ("complete_graph_10", complete(10)),
        ("complete_graph_15", complete(15)),
        ("cycle_graph_20", cycle(20)),
        ("cycle_graph_30", cycle(30)),
        ("star_graph_15", star(14)),
        ("star_graph_25", star(24)),
        ("grid_2d_5x5", grid_2d(5, 5)),
        ("grid_2d_6x4", grid_2d(6, 4)),
        ("path_graph_25", path(25)),
        ("path_graph_35", path(35)),
        ("barbell_8_4", barbell(8, 4)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::algorithms::is_connected;

    #[test]
    fn shapes_have_expected_sizes() {
        assert_eq!(path(5).edge_count(), 4);
        assert_eq!(cycle(6).edge_count(), 6);
        assert_eq!(complete(5).edge_count(), 10);
        assert_eq!(star(6).node_count, 7);
        assert_eq!(grid_2d(3, 4).edge_count(), 3 * 3 + 2 * 4);
        let b = barbell(4, 2);
        assert_eq!(b.node_count, 10);
        assert_eq!(b.edge_count(), 6 + 6 + 3);
    }

    #[test]
    fn catalogue_is_connected() {
        for (name, graph) in sample_networks() {
            assert!(is_connected(&graph), "{name} is disconnected");
        }
    }
}
