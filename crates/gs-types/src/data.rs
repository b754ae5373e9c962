//! Sample matrices and cross-validation folds.

use serde::{Deserialize, Serialize};

use crate::errors::{DataContractError, GsResult};

/// Dense row-major matrix of samples × features.
///
/// For estimators that work on precomputed kernels the matrix is square,
/// samples × samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> GsResult<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(DataContractError::ShapeMismatch {
                rows,
                cols,
                len: data.len(),
            }
            .into());
        }
        Ok(Self { rows, cols, data })
    }

    /// Build a matrix from equally sized rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> GsResult<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for row in rows {
            if row.len() != n_cols {
                return Err(DataContractError::ShapeMismatch {
                    rows: n_rows,
                    cols: n_cols,
                    len: row.len(),
                }
                .into());
            }
            data.extend(row);
        }
        Self::new(n_rows, n_cols, data)
    }

    /// Single-feature column matrix.
    pub fn column(values: Vec<f64>) -> Self {
        Self {
            rows: values.len(),
            cols: 1,
            data: values,
        }
    }

    pub fn n_samples(&self) -> usize {
        self.rows
    }

    pub fn n_features(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Copy the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> GsResult<Self> {
        check_indices(indices, self.rows)?;
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Ok(Self {
            rows: indices.len(),
            cols: self.cols,
            data,
        })
    }

    /// Copy the `rows × cols` block, the equivalent of `X[ix_(rows, cols)]`.
    pub fn select_block(&self, rows: &[usize], cols: &[usize]) -> GsResult<Self> {
        check_indices(rows, self.rows)?;
        check_indices(cols, self.cols)?;
        let mut data = Vec::with_capacity(rows.len() * cols.len());
        for &i in rows {
            let row = self.row(i);
            data.extend(cols.iter().map(|&j| row[j]));
        }
        Ok(Self {
            rows: rows.len(),
            cols: cols.len(),
            data,
        })
    }
}

/// Copy the targets at `indices`.
pub fn select_targets(targets: &[f64], indices: &[usize]) -> GsResult<Vec<f64>> {
    check_indices(indices, targets.len())?;
    Ok(indices.iter().map(|&i| targets[i]).collect())
}

fn check_indices(indices: &[usize], bound: usize) -> GsResult<()> {
    match indices.iter().find(|&&i| i >= bound) {
        Some(&index) => Err(DataContractError::IndexOutOfBounds {
            index,
            n_samples: bound,
        }
        .into()),
        None => Ok(()),
    }
}

/// One train/test split over the sample axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl Fold {
    pub fn new(train: Vec<usize>, test: Vec<usize>) -> Self {
        Self { train, test }
    }
}

/// Produces the ordered train/test splits of a search.
///
/// The list is built once per search; its length fixes the fold count that
/// every configuration is evaluated on.
pub trait FoldGenerator: Send + Sync + std::fmt::Debug {
    fn split(&self, x: &Matrix, y: Option<&[f64]>, classifier: bool) -> anyhow::Result<Vec<Fold>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_matrix() -> Matrix {
        Matrix::from_rows(vec![
            vec![0.0, 1.0, 2.0],
            vec![3.0, 4.0, 5.0],
            vec![6.0, 7.0, 8.0],
        ])
        .unwrap()
    }

    #[test]
    fn new_rejects_wrong_length() {
        assert!(Matrix::new(2, 2, vec![1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        let err = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(err.to_string().contains("cannot hold"));
    }

    #[test]
    fn select_rows_preserves_order() {
        let m = sample_matrix();
        let picked = m.select_rows(&[2, 0]).unwrap();
        assert_eq!(picked.shape(), (2, 3));
        assert_eq!(picked.row(0), &[6.0, 7.0, 8.0]);
        assert_eq!(picked.row(1), &[0.0, 1.0, 2.0]);
    }

    #[test]
    fn select_block_indexes_both_axes() {
        let m = sample_matrix();
        let block = m.select_block(&[1, 2], &[0, 2]).unwrap();
        assert_eq!(block.shape(), (2, 2));
        assert_eq!(block.as_slice(), &[3.0, 5.0, 6.0, 8.0]);
    }

    #[test]
    fn out_of_bounds_index_is_a_data_error() {
        let m = sample_matrix();
        let err = m.select_rows(&[0, 3]).unwrap_err();
        assert!(err.to_string().contains("index 3 out of bounds"));
        assert!(select_targets(&[1.0, 2.0], &[5]).is_err());
    }
}
