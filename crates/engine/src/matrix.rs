//! Dense row-major matrix and pairwise cosine similarity.
//!
//! Both similarity engines boil down to "cosine similarity between every
//! pair of rows of a dense matrix". Values are stored as f32; dot products
//! and norms accumulate in f64 so the symmetry and unit-diagonal properties
//! hold to tight tolerances.

use rayon::prelude::*;

/// Dense row-major f32 matrix.
#[derive(Debug, Clone)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl DenseMatrix {
    /// Create a zero-filled matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * self.cols + col] = value;
    }

    /// View of a single row
    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Mean over every cell, zeros included
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let total: f64 = self.data.iter().map(|&v| v as f64).sum();
        (total / self.data.len() as f64) as f32
    }
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| x as f64 * y as f64)
        .sum()
}

fn norm(v: &[f32]) -> f64 {
    dot(v, v).sqrt()
}

/// Pairwise cosine similarity between every pair of rows.
///
/// Returns a rows×rows matrix: symmetric, 1.0 on the diagonal for rows with
/// a non-zero norm. A zero-norm row is similar to nothing, itself included.
pub fn pairwise_cosine(matrix: &DenseMatrix) -> DenseMatrix {
    let n = matrix.rows();
    let norms: Vec<f64> = (0..n).map(|i| norm(matrix.row(i))).collect();

    let data: Vec<f32> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            let matrix = &*matrix;
            let norms = &*norms;
            (0..n).map(move |j| {
                if norms[i] == 0.0 || norms[j] == 0.0 {
                    0.0
                } else if i == j {
                    1.0
                } else {
                    (dot(matrix.row(i), matrix.row(j)) / (norms[i] * norms[j])) as f32
                }
            })
        })
        .collect();

    DenseMatrix { rows: n, cols: n, data }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DenseMatrix {
        let mut m = DenseMatrix::zeros(3, 2);
        m.set(0, 0, 1.0);
        m.set(0, 1, 0.0);
        m.set(1, 0, 1.0);
        m.set(1, 1, 1.0);
        // row 2 stays all-zero
        m
    }

    #[test]
    fn test_cosine_symmetry_and_diagonal() {
        let sim = pairwise_cosine(&sample());

        for i in 0..3 {
            for j in 0..3 {
                assert!(
                    (sim.get(i, j) as f64 - sim.get(j, i) as f64).abs() < 1e-9,
                    "matrix must be symmetric"
                );
            }
        }
        assert_eq!(sim.get(0, 0), 1.0);
        assert_eq!(sim.get(1, 1), 1.0);
        // zero-norm row: no self-similarity
        assert_eq!(sim.get(2, 2), 0.0);
    }

    #[test]
    fn test_cosine_known_value() {
        let sim = pairwise_cosine(&sample());
        // cos([1,0], [1,1]) = 1/sqrt(2)
        let expected = 1.0 / 2.0_f64.sqrt();
        assert!((sim.get(0, 1) as f64 - expected).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_bounded() {
        let sim = pairwise_cosine(&sample());
        for i in 0..3 {
            for j in 0..3 {
                let v = sim.get(i, j);
                assert!((-1.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_matrix_mean_includes_zeros() {
        let m = sample();
        // cells: 1, 0, 1, 1, 0, 0 -> mean 0.5
        assert!((m.mean() - 0.5).abs() < 1e-6);
    }
}
