//! Matrix-write abstraction used by the Jacobian assembler.
//!
//! The assembler only needs to size a block, clear it and write single cells in any
//! order. Every cell is written at most once per evaluation, so implementations never
//! accumulate.
//!
//! Implementations:
//! - [`DMatrix<f64>`]: dense, column-major (nalgebra)
//! - [`RowMajorMatrix`]: dense, row-major
//! - [`TripletMatrix`]: sparse coordinate list, convertible to a faer [`SparseColMat`]

use crate::error::{BundleError, BundleResult};
use faer::sparse::{SparseColMat, Triplet};
use nalgebra::DMatrix;

/// Destination of one Jacobian block.
pub trait JacobianStorage {
    /// Writes `value` at (`row`, `col`).
    fn set(&mut self, row: usize, col: usize, value: f64);

    /// Clears every entry while keeping the shape.
    fn zero(&mut self);

    /// Changes the shape to `rows` × `cols`. Contents are unspecified until `zero`.
    fn reshape(&mut self, rows: usize, cols: usize);

    fn nrows(&self) -> usize;

    fn ncols(&self) -> usize;
}

impl JacobianStorage for DMatrix<f64> {
    #[inline]
    fn set(&mut self, row: usize, col: usize, value: f64) {
        self[(row, col)] = value;
    }

    fn zero(&mut self) {
        self.fill(0.0);
    }

    fn reshape(&mut self, rows: usize, cols: usize) {
        if self.shape() != (rows, cols) {
            self.resize_mut(rows, cols, 0.0);
        }
    }

    fn nrows(&self) -> usize {
        self.shape().0
    }

    fn ncols(&self) -> usize {
        self.shape().1
    }
}

/// Dense row-major matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowMajorMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl RowMajorMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Row-major backing storage.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.rows, self.cols, &self.data)
    }
}

impl JacobianStorage for RowMajorMatrix {
    #[inline]
    fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    fn zero(&mut self) {
        self.data.fill(0.0);
    }

    fn reshape(&mut self, rows: usize, cols: usize) {
        self.rows = rows;
        self.cols = cols;
        self.data.resize(rows * cols, 0.0);
    }

    fn nrows(&self) -> usize {
        self.rows
    }

    fn ncols(&self) -> usize {
        self.cols
    }
}

/// Sparse matrix in coordinate (triplet) form.
///
/// Storage grows with the number of writes, not with the matrix shape, which is what
/// the Schur blocks of a large scene need.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripletMatrix {
    rows: usize,
    cols: usize,
    row_indices: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<f64>,
}

impl TripletMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            ..Self::default()
        }
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Iterates over `(row, col, value)` in write order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.row_indices
            .iter()
            .zip(&self.col_indices)
            .zip(&self.values)
            .map(|((&row, &col), &value)| (row, col, value))
    }

    /// Builds a compressed sparse column matrix.
    pub fn to_sparse(&self) -> BundleResult<SparseColMat<usize, f64>> {
        let triplets: Vec<_> = self
            .iter()
            .map(|(row, col, value)| Triplet::new(row, col, value))
            .collect();

        SparseColMat::try_new_from_triplets(self.rows, self.cols, &triplets).map_err(|e| {
            BundleError::LinearAlgebra(format!("Failed to create sparse matrix: {e:?}"))
        })
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.rows, self.cols);
        for (row, col, value) in self.iter() {
            dense[(row, col)] = value;
        }
        dense
    }
}

impl JacobianStorage for TripletMatrix {
    #[inline]
    fn set(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.rows && col < self.cols);
        self.row_indices.push(row);
        self.col_indices.push(col);
        self.values.push(value);
    }

    fn zero(&mut self) {
        self.row_indices.clear();
        self.col_indices.clear();
        self.values.clear();
    }

    fn reshape(&mut self, rows: usize, cols: usize) {
        self.rows = rows;
        self.cols = cols;
    }

    fn nrows(&self) -> usize {
        self.rows
    }

    fn ncols(&self) -> usize {
        self.cols
    }
}
