//! Low-dimensional spectral embedding from Laplacian eigenvectors

use crate::error::Result;
use crate::graph::Graph;
use crate::scoring::eigen::symmetric_eigen;
use ndarray::{s, Array2, ArrayView1};

/// Embeds nodes with the `dim` Laplacian eigenvectors that follow the
/// trivial (constant) one.
#[derive(Debug, Clone, Copy)]
pub struct SpectralEmbedding {
    pub dim: usize,
}

impl SpectralEmbedding {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// n x d coordinate matrix, d = min(dim, n - 1)
    pub fn embed(&self, graph: &Graph) -> Result<Array2<f64>> {
        let n = graph.node_count;
        if n <= 1 || self.dim == 0 {
            return Ok(Array2::zeros((n, 0)));
        }

        let laplacian = graph.laplacian_matrix(true);
        let spectrum = symmetric_eigen(&laplacian)?;
        let d = self.dim.min(n - 1);

        Ok(spectrum.vectors.slice(s![.., 1..=d]).to_owned())
    }
}

/// Similarity of two points from their squared distance
pub fn similarity(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let dist2: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
    1.0 / (1.0 + dist2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::generators::path;

    #[test]
    fn fiedler_coordinate_orders_a_path() {
        let graph = path(5);
        let coords = SpectralEmbedding::new(1).embed(&graph).unwrap();
        assert_eq!(coords.dim(), (5, 1));

        let x: Vec<f64> = coords.column(0).to_vec();
        let increasing = x.windows(2).all(|w| w[0] < w[1]);
        let decreasing = x.windows(2).all(|w| w[0] > w[1]);
        assert!(increasing || decreasing, "{x:?}");
    }

    #[test]
    fn neighbors_are_more_similar_than_ends() {
        let graph = path(5);
        let coords = SpectralEmbedding::new(2).embed(&graph).unwrap();
        let near = similarity(coords.row(0), coords.row(1));
        let far = similarity(coords.row(0), coords.row(4));
        assert!(near > far);
    }

    #[test]
    fn tiny_graphs_embed_to_nothing() {
        let graph = path(1);
        assert_eq!(SpectralEmbedding::new(3).embed(&graph).unwrap().dim(), (1, 0));
    }
}
