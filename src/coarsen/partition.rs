//! Node-to-cluster mapping produced by a coarsening run

use crate::error::{CoarsenError, Result};
use serde::{Deserialize, Serialize};

/// Total surjective mapping from original nodes to clusters `0..cluster_count`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// assignment[node] = cluster id
    assignment: Vec<usize>,
    cluster_count: usize,
}

impl Partition {
    /// One cluster per node
    pub fn identity(node_count: usize) -> Self {
        Self {
            assignment: (0..node_count).collect(),
            cluster_count: node_count,
        }
    }

    /// Wrap an assignment, checking that cluster ids are exactly `0..k`
    pub fn from_assignment(assignment: Vec<usize>) -> Result<Self> {
        let cluster_count = assignment.iter().map(|&c| c + 1).max().unwrap_or(0);
        let mut used = vec![false; cluster_count];
        for &c in &assignment {
            used[c] = true;
        }
        if let Some(missing) = used.iter().position(|&u| !u) {
            return Err(CoarsenError::invalid(
                "mapping",
                format!("cluster id {missing} is unused; ids must be contiguous from 0"),
            ));
        }
        Ok(Self {
            assignment,
            cluster_count,
        })
    }

    pub fn cluster_of(&self, node: usize) -> usize {
        self.assignment[node]
    }

    pub fn assignment(&self) -> &[usize] {
        &self.assignment
    }

    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    /// Number of original nodes covered
    pub fn len(&self) -> usize {
        self.assignment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignment.is_empty()
    }

    /// Member lists per cluster, members ascending
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut members = vec![Vec::new(); self.cluster_count];
        for (node, &cluster) in self.assignment.iter().enumerate() {
            members[cluster].push(node);
        }
        members
    }

    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.cluster_count];
        for &cluster in &self.assignment {
            sizes[cluster] += 1;
        }
        sizes
    }
}

/// A super-node of the reduced graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Dense id in the reduced graph
    pub id: usize,

    /// Lowest original member index
    pub representative: usize,

    /// Original node indices, ascending
    pub members: Vec<usize>,

    pub size: usize,

    /// Total weight of original edges absorbed inside the cluster
    pub internal_weight: f64,

    /// Total weight of edges to every other cluster
    pub external_weight: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_and_sizes() {
        let p = Partition::from_assignment(vec![0, 0, 1, 2, 1]).unwrap();
        assert_eq!(p.cluster_count(), 3);
        assert_eq!(p.members(), vec![vec![0, 1], vec![2, 4], vec![3]]);
        assert_eq!(p.sizes(), vec![2, 2, 1]);
        assert_eq!(p.cluster_of(4), 1);
    }

    #[test]
    fn rejects_gaps_in_cluster_ids() {
        assert!(Partition::from_assignment(vec![0, 2]).is_err());
        assert_eq!(Partition::identity(3).cluster_count(), 3);
    }
}
