//! Graph algorithms for connectivity analysis

use crate::graph::Graph;
use petgraph::graph::UnGraph;

/// Union-Find over dense node indices.
///
/// The root of every set is its lowest member index, so the root doubles as
/// the deterministic representative id of a cluster.
#[derive(Debug, Clone)]
pub struct DisjointSets {
    /// Parent pointers (parent[i] = parent of node i)
    parent: Vec<u32>,
}

impl DisjointSets {
    /// Create `size` singleton sets
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size as u32).collect(),
        }
    }

    /// Find the root of the set containing x with path compression
    pub fn find(&mut self, x: u32) -> u32 {
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }

        // Path compression
        let mut node = x;
        while self.parent[node as usize] != root {
            let next = self.parent[node as usize];
            self.parent[node as usize] = root;
            node = next;
        }
        root
    }

    /// Union the sets containing x and y; returns the surviving root
    pub fn union(&mut self, x: u32, y: u32) -> u32 {
        let root_x = self.find(x);
        let root_y = self.find(y);

        if root_x == root_y {
            return root_x;
        }

        // Lower index always survives as the representative
        let (keep, absorb) = if root_x < root_y {
            (root_x, root_y)
        } else {
            (root_y, root_x)
        };
        self.parent[absorb as usize] = keep;
        keep
    }
}

/// Label every node with a component id, numbered 0.. in order of each
/// component's lowest node index
pub fn component_labels(graph: &Graph) -> Vec<usize> {
    let mut sets = DisjointSets::new(graph.node_count);
    for (u, v, _) in graph.edges() {
        sets.union(u as u32, v as u32);
    }

    let mut root_to_label = vec![usize::MAX; graph.node_count];
    let mut next = 0;
    let mut labels = Vec::with_capacity(graph.node_count);
    for node in 0..graph.node_count {
        let root = sets.find(node as u32) as usize;
        if root_to_label[root] == usize::MAX {
            root_to_label[root] = next;
            next += 1;
        }
        labels.push(root_to_label[root]);
    }
    labels
}

/// Convert to a petgraph undirected graph (node weights are dense indices)
pub fn to_petgraph(graph: &Graph) -> UnGraph<usize, f64> {
    let mut pg = UnGraph::with_capacity(graph.node_count, graph.edge_count());
    let nodes: Vec<_> = (0..graph.node_count).map(|i| pg.add_node(i)).collect();
    for (u, v, w) in graph.edges() {
        pg.add_edge(nodes[u], nodes[v], w);
    }
    pg
}

/// Number of connected components (isolated nodes count as components)
pub fn component_count(graph: &Graph) -> usize {
    petgraph::algo::connected_components(&to_petgraph(graph))
}

pub fn is_connected(graph: &Graph) -> bool {
    graph.node_count > 0 && component_count(graph) == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_keeps_lowest_index_as_root() {
        let mut sets = DisjointSets::new(5);
        assert_eq!(sets.union(4, 2), 2);
        assert_eq!(sets.union(3, 4), 2);
        assert_eq!(sets.union(1, 3), 1);
        assert_eq!(sets.find(4), 1);
        assert_eq!(sets.find(2), 1);
        assert_eq!(sets.find(0), 0);
    }

    #[test]
    fn components_of_two_paths() {
        let g = Graph::from_edges(5, &[(0, 1, 1.0), (3, 4, 1.0), (1, 2, 1.0)]).unwrap();
        assert_eq!(component_labels(&g), vec![0, 0, 0, 1, 1]);
        assert_eq!(component_count(&g), 2);
        assert!(!is_connected(&g));
    }

    #[test]
    fn isolated_nodes_are_their_own_components() {
        let g = Graph::from_edges(3, &[(0, 1, 1.0)]).unwrap();
        assert_eq!(component_count(&g), 2);
        assert_eq!(component_labels(&g), vec![0, 0, 1]);
    }
}
