//! Rotation parameterizations and rigid transforms for bundle adjustment.
//!
//! This crate provides the geometric building blocks consumed by the metric
//! bundle adjustment Jacobian:
//!
//! - **`RotationJacobian` trait**: a minimal rotation parameterization that can
//!   materialize its rotation matrix together with the partial derivative of that
//!   matrix with respect to every parameter.
//! - **`RodriguesJacobian`**: 3-parameter axis-angle (exponential coordinates).
//! - **`QuaternionJacobian`**: 4-parameter, not necessarily normalized, quaternion.
//! - **`RigidTransform`**: rotation matrix + translation applied to 3D and
//!   homogeneous 4D points.
//!
//! # Parameter slices
//!
//! Providers never see the whole optimization vector. Callers hand them the
//! sub-slice that starts at the rotation's offset, so `set_parameters(&x[offset..])`
//! is the Rust rendition of "read N values starting at `offset`".

use nalgebra::{Matrix3, Vector3};

pub mod quaternion;
pub mod rodrigues;
pub mod se3;

pub use quaternion::QuaternionJacobian;
pub use rodrigues::RodriguesJacobian;
pub use se3::RigidTransform;

/// Below this squared rotation angle the Rodrigues partials use the generators of so(3).
pub const SMALL_ANGLE_THRESHOLD: f64 = 1e-12;

/// Tolerance used when checking that a matrix is a proper rotation.
pub const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

/// Geometry errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Rotation matrix is not orthonormal (|RᵀR - I| = {0:e})")]
    NotOrthonormal(f64),
    #[error("Rotation matrix has negative determinant ({0})")]
    Reflection(f64),
    #[error("Expected {expected} rotation parameters, got {actual}")]
    ParameterLength { expected: usize, actual: usize },
}

/// A minimal rotation parameterization with analytic matrix partials.
///
/// After `set_parameters` the provider caches both the rotation matrix and the
/// `PARAMETER_LENGTH` partial matrices ∂R/∂pᵢ, so the Jacobian assembler can ask
/// for them repeatedly while visiting every observation of a view.
pub trait RotationJacobian: Clone + Default + std::fmt::Debug + Send + 'static {
    /// Number of parameters consumed from the parameter vector.
    const PARAMETER_LENGTH: usize;

    /// Number of parameters consumed from the parameter vector.
    fn parameter_length(&self) -> usize {
        Self::PARAMETER_LENGTH
    }

    /// Reads `PARAMETER_LENGTH` values from the front of `params` and refreshes the
    /// cached rotation matrix and partials.
    ///
    /// # Panics
    ///
    /// Panics if `params` is shorter than `PARAMETER_LENGTH`.
    fn set_parameters(&mut self, params: &[f64]);

    /// Rotation matrix for the most recent parameters.
    fn rotation_matrix(&self) -> &Matrix3<f64>;

    /// Partial derivative of the rotation matrix with respect to parameter `index`.
    fn partial(&self, index: usize) -> &Matrix3<f64>;

    /// Writes the parameters describing `rotation` into the front of `out`.
    fn encode(&self, rotation: &Matrix3<f64>, out: &mut [f64]);
}

/// Compute skew-symmetric matrix from a 3D vector.
///
/// Returns the cross-product matrix [v]× such that [v]× w = v × w.
///
/// ```text
/// [  0  -vz   vy ]
/// [ vz    0  -vx ]
/// [-vy   vx    0 ]
/// ```
#[inline]
pub fn skew_symmetric(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

/// Checks that `rotation` is orthonormal with determinant +1.
pub fn check_rotation(rotation: &Matrix3<f64>) -> Result<(), GeometryError> {
    let error = (rotation.transpose() * rotation - Matrix3::identity()).abs().max();
    if error > ORTHONORMAL_TOLERANCE {
        return Err(GeometryError::NotOrthonormal(error));
    }
    let det = rotation.determinant();
    if det < 0.0 {
        return Err(GeometryError::Reflection(det));
    }
    Ok(())
}
