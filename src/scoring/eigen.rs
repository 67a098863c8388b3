//! Symmetric eigen-decomposition bridge between ndarray and nalgebra

use crate::error::{CoarsenError, Result};
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::Array2;

/// Eigenpairs of a real symmetric matrix, eigenvalues ascending.
///
/// Column `j` of `vectors` belongs to `values[j]`. Each eigenvector's sign is
/// fixed so that its largest-magnitude entry is positive.
#[derive(Debug, Clone)]
pub struct Spectrum {
    pub values: Vec<f64>,
    pub vectors: Array2<f64>,
}

fn to_nalgebra(matrix: &Array2<f64>) -> Result<DMatrix<f64>> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(CoarsenError::invalid(
            "matrix",
            format!("expected a square matrix, got {rows}x{cols}"),
        ));
    }
    if matrix.iter().any(|x| !x.is_finite()) {
        return Err(CoarsenError::NumericalInstability(
            "matrix handed to the eigen-solver contains non-finite entries".to_string(),
        ));
    }
    Ok(DMatrix::from_fn(rows, cols, |i, j| matrix[[i, j]]))
}

fn decompose(matrix: &Array2<f64>) -> Result<SymmetricEigen<f64, nalgebra::Dyn>> {
    let n = matrix.nrows();
    let m = to_nalgebra(matrix)?;
    SymmetricEigen::try_new(m, f64::EPSILON, 10_000 + 100 * n).ok_or_else(|| {
        CoarsenError::NumericalInstability(format!(
            "symmetric eigen-solver did not converge on a {n}x{n} matrix"
        ))
    })
}

/// Full eigen-decomposition of a symmetric matrix
pub fn symmetric_eigen(matrix: &Array2<f64>) -> Result<Spectrum> {
    let n = matrix.nrows();
    if n == 0 {
        return Ok(Spectrum {
            values: Vec::new(),
            vectors: Array2::zeros((0, 0)),
        });
    }

    let eigen = decompose(matrix)?;

    // Ascending; the stable sort keeps solver order for exact ties
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

    let values: Vec<f64> = order.iter().map(|&j| eigen.eigenvalues[j]).collect();
    let mut vectors = Array2::<f64>::zeros((n, n));
    for (col, &j) in order.iter().enumerate() {
        let column = eigen.eigenvectors.column(j);
        let pivot = column
            .iter()
            .copied()
            .fold(0.0f64, |best, x| if x.abs() > best.abs() { x } else { best });
        let sign = if pivot < 0.0 { -1.0 } else { 1.0 };
        for i in 0..n {
            vectors[[i, col]] = sign * column[i];
        }
    }

    if values.iter().any(|v| !v.is_finite()) || vectors.iter().any(|v| !v.is_finite()) {
        return Err(CoarsenError::NumericalInstability(
            "eigen-decomposition produced non-finite values".to_string(),
        ));
    }

    Ok(Spectrum { values, vectors })
}

/// Eigenvalues only, ascending
pub fn symmetric_eigenvalues(matrix: &Array2<f64>) -> Result<Vec<f64>> {
    if matrix.nrows() == 0 {
        return Ok(Vec::new());
    }
    let eigen = decompose(matrix)?;
    let mut values: Vec<f64> = eigen.eigenvalues.iter().copied().collect();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(CoarsenError::NumericalInstability(
            "eigen-decomposition produced non-finite eigenvalues".to_string(),
        ));
    }
    values.sort_by(f64::total_cmp);
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn reconstructs_a_symmetric_matrix() {
        let m = array![[2.0, 1.0, 0.0], [1.0, 2.0, 1.0], [0.0, 1.0, 2.0]];
        let spectrum = symmetric_eigen(&m).unwrap();
        assert!(spectrum.values.windows(2).all(|w| w[0] <= w[1]));

        let d = Array2::from_diag(&ndarray::Array1::from(spectrum.values.clone()));
        let rebuilt = spectrum.vectors.dot(&d).dot(&spectrum.vectors.t());
        for (a, b) in rebuilt.iter().zip(m.iter()) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn path_laplacian_eigenvalues() {
        // L of 0-1-2 has eigenvalues 0, 1, 3
        let l = array![[1.0, -1.0, 0.0], [-1.0, 2.0, -1.0], [0.0, -1.0, 1.0]];
        let values = symmetric_eigenvalues(&l).unwrap();
        let expected = [0.0, 1.0, 3.0];
        for (v, e) in values.iter().zip(expected) {
            assert!((v - e).abs() < 1e-10, "{v} vs {e}");
        }
    }

    #[test]
    fn rejects_non_finite_input() {
        let m = array![[f64::NAN, 0.0], [0.0, 1.0]];
        let err = symmetric_eigen(&m).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NumericalInstability);
    }
}
