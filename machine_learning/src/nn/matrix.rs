use env::rand::Rng;

use crate::error::{Error, Result};

/// Dense row-major matrix of `f64` with a shape fixed at construction.
///
/// Every operation returns a new matrix; nothing mutates its receiver, so
/// gradient expressions compose without aliasing surprises.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::shape("from_vec", (rows, cols), (1, data.len())));
        }
        Ok(Self { rows, cols, data })
    }

    /// A 1×n matrix.
    pub fn row_vector(data: Vec<f64>) -> Self {
        Self {
            rows: 1,
            cols: data.len(),
            data,
        }
    }

    /// Refill every entry uniformly from `[-1, 1]`.
    pub fn randomize(self, rng: &mut impl Rng) -> Self {
        self.map(|_, _, _| rng.random_range(-1.0..=1.0))
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        (row < self.rows && col < self.cols).then(|| self.data[row * self.cols + col])
    }

    pub fn row(&self, row: usize) -> Option<&[f64]> {
        (row < self.rows).then(|| &self.data[row * self.cols..(row + 1) * self.cols])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn dot(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(Error::shape("dot", self.shape(), other.shape()));
        }
        let mut out = Matrix::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.data[i * self.cols + k];
                for j in 0..other.cols {
                    out.data[i * other.cols + j] += a * other.data[k * other.cols + j];
                }
            }
        }
        Ok(out)
    }

    pub fn transpose(&self) -> Matrix {
        let mut out = Matrix::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out.data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        out
    }

    fn zip_with(&self, other: &Matrix, op: &'static str, f: impl Fn(f64, f64) -> f64) -> Result<Matrix> {
        if self.shape() != other.shape() {
            return Err(Error::shape(op, self.shape(), other.shape()));
        }
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    pub fn subtract(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with(other, "subtract", |a, b| a - b)
    }

    /// Element-wise (Hadamard) product.
    pub fn multiply(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with(other, "multiply", |a, b| a * b)
    }

    pub fn scale(&self, scalar: f64) -> Matrix {
        self.map(|value, _, _| value * scalar)
    }

    /// `f(value, row, col)` applied to every entry.
    pub fn map(&self, mut f: impl FnMut(f64, usize, usize) -> f64) -> Matrix {
        let cols = self.cols;
        Matrix {
            rows: self.rows,
            cols,
            data: self
                .data
                .iter()
                .enumerate()
                .map(|(idx, &value)| f(value, idx / cols, idx % cols))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use env::rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn m(rows: usize, cols: usize, data: &[f64]) -> Matrix {
        Matrix::from_vec(rows, cols, data.to_vec()).unwrap()
    }

    #[test]
    fn dot_multiplies() {
        let a = m(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = m(3, 2, &[7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
        assert_eq!(a.dot(&b).unwrap(), m(2, 2, &[58.0, 64.0, 139.0, 154.0]));
    }

    #[test]
    fn dot_rejects_every_mismatched_shape() {
        for a_rows in 1..4 {
            for a_cols in 1..4 {
                for b_rows in 1..4 {
                    for b_cols in 1..4 {
                        let a = Matrix::zeros(a_rows, a_cols);
                        let b = Matrix::zeros(b_rows, b_cols);
                        let result = a.dot(&b);
                        if a_cols == b_rows {
                            assert_eq!(result.unwrap().shape(), (a_rows, b_cols));
                        } else {
                            assert!(matches!(
                                result,
                                Err(Error::ShapeMismatch { op: "dot", left, right })
                                    if left == (a_rows, a_cols) && right == (b_rows, b_cols)
                            ));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn transpose_round_trips() {
        let mut rng = ChaCha12Rng::seed_from_u64(11);
        for rows in 1..6 {
            for cols in 1..6 {
                let a = Matrix::zeros(rows, cols).randomize(&mut rng);
                let t = a.transpose();
                assert_eq!(t.shape(), (cols, rows));
                assert_eq!(t.get(cols - 1, 0), a.get(0, cols - 1));
                assert_eq!(t.transpose(), a);
            }
        }
    }

    #[test]
    fn elementwise_ops_check_shapes() {
        let a = m(1, 3, &[1.0, 2.0, 3.0]);
        let b = m(1, 3, &[0.5, 0.5, 2.0]);
        assert_eq!(a.add(&b).unwrap().as_slice(), &[1.5, 2.5, 5.0]);
        assert_eq!(a.subtract(&b).unwrap().as_slice(), &[0.5, 1.5, 1.0]);
        assert_eq!(a.multiply(&b).unwrap().as_slice(), &[0.5, 1.0, 6.0]);
        assert_eq!(a.scale(2.0).as_slice(), &[2.0, 4.0, 6.0]);

        let c = m(3, 1, &[1.0, 2.0, 3.0]);
        assert!(matches!(a.add(&c), Err(Error::ShapeMismatch { op: "add", .. })));
        assert!(matches!(a.subtract(&c), Err(Error::ShapeMismatch { op: "subtract", .. })));
        assert!(matches!(a.multiply(&c), Err(Error::ShapeMismatch { op: "multiply", .. })));
    }

    #[test]
    fn map_sees_positions_and_leaves_the_receiver_alone() {
        let a = Matrix::zeros(2, 3);
        let b = a.map(|_, row, col| (row * 10 + col) as f64);
        assert_eq!(b.as_slice(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert!(a.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn randomize_stays_in_unit_range() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let a = Matrix::zeros(8, 8).randomize(&mut rng);
        assert!(a.as_slice().iter().all(|v| (-1.0..=1.0).contains(v)));
        assert!(a.as_slice().iter().any(|&v| v != 0.0));
    }

    #[test]
    fn from_vec_checks_length() {
        assert!(Matrix::from_vec(2, 2, vec![1.0; 3]).is_err());
        assert_eq!(Matrix::row_vector(vec![1.0, 2.0]).shape(), (1, 2));
    }
}
