//! Finite-difference Jacobians for validating the analytic blocks.
//!
//! # Example
//!
//! ```
//! use sba_jacobian::{numerical_jacobian, NumericalJacobianConfig};
//!
//! let config = NumericalJacobianConfig::default().with_step(1e-6);
//! let jac = numerical_jacobian(
//!     |x: &[f64], out: &mut [f64]| {
//!         out[0] = x[0] * x[1];
//!         Ok(())
//!     },
//!     &[2.0, 3.0],
//!     1,
//!     &config,
//! )?;
//! assert!((jac[(0, 0)] - 3.0).abs() < 1e-6);
//! # Ok::<(), sba_jacobian::BundleError>(())
//! ```

use crate::error::BundleResult;
use nalgebra::DMatrix;
use std::fmt::{self, Display, Formatter};

/// Settings for central differences and for comparing against them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericalJacobianConfig {
    /// Relative step; the actual step is `step · max(1, |xᵢ|)`.
    pub step: f64,
    /// Largest accepted relative error.
    pub tolerance: f64,
}

impl Default for NumericalJacobianConfig {
    fn default() -> Self {
        Self {
            step: 1e-6,
            tolerance: 1e-4,
        }
    }
}

impl NumericalJacobianConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Central-difference Jacobian of `f` at `params`.
///
/// `f` writes `rows` outputs into its second argument.
pub fn numerical_jacobian<F>(
    mut f: F,
    params: &[f64],
    rows: usize,
    config: &NumericalJacobianConfig,
) -> BundleResult<DMatrix<f64>>
where
    F: FnMut(&[f64], &mut [f64]) -> BundleResult<()>,
{
    let mut jacobian = DMatrix::zeros(rows, params.len());
    let mut x = params.to_vec();
    let mut plus = vec![0.0; rows];
    let mut minus = vec![0.0; rows];

    for col in 0..params.len() {
        let original = x[col];
        let h = config.step * original.abs().max(1.0);

        x[col] = original + h;
        f(&x, &mut plus)?;
        x[col] = original - h;
        f(&x, &mut minus)?;
        x[col] = original;

        for row in 0..rows {
            jacobian[(row, col)] = (plus[row] - minus[row]) / (2.0 * h);
        }
    }
    Ok(jacobian)
}

/// Joins the left and right Schur blocks into the full Jacobian.
pub fn hstack(left: &DMatrix<f64>, right: &DMatrix<f64>) -> DMatrix<f64> {
    let rows = left.nrows().max(right.nrows());
    let mut full = DMatrix::zeros(rows, left.ncols() + right.ncols());
    full.view_mut((0, 0), left.shape()).copy_from(left);
    full.view_mut((0, left.ncols()), right.shape()).copy_from(right);
    full
}

/// Element-wise comparison of an analytic Jacobian with a numerical one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JacobianComparison {
    pub max_abs_error: f64,
    /// Largest `|a - n| / max(|a|, |n|, 1)`.
    pub max_rel_error: f64,
    /// `(row, col)` of the largest relative error.
    pub worst: (usize, usize),
    pub analytic: f64,
    pub numerical: f64,
}

impl JacobianComparison {
    /// Compares two matrices of the same shape.
    pub fn compare(analytic: &DMatrix<f64>, numerical: &DMatrix<f64>) -> Self {
        let mut result = Self {
            max_abs_error: 0.0,
            max_rel_error: 0.0,
            worst: (0, 0),
            analytic: 0.0,
            numerical: 0.0,
        };

        for col in 0..analytic.ncols() {
            for row in 0..analytic.nrows() {
                let a = analytic[(row, col)];
                let n = numerical[(row, col)];
                let abs = (a - n).abs();
                let rel = abs / a.abs().max(n.abs()).max(1.0);
                result.max_abs_error = result.max_abs_error.max(abs);
                if rel > result.max_rel_error {
                    result.max_rel_error = rel;
                    result.worst = (row, col);
                    result.analytic = a;
                    result.numerical = n;
                }
            }
        }
        result
    }

    pub fn passes(&self, config: &NumericalJacobianConfig) -> bool {
        self.max_rel_error <= config.tolerance
    }
}

impl Display for JacobianComparison {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max abs error {:.3e}, max rel error {:.3e} at ({}, {}): analytic {:.6e} numerical {:.6e}",
            self.max_abs_error,
            self.max_rel_error,
            self.worst.0,
            self.worst.1,
            self.analytic,
            self.numerical
        )
    }
}
