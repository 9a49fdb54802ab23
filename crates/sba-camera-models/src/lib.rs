//! Camera intrinsic models for metric bundle adjustment.
//!
//! Every model maps a point expressed in the camera frame (+z forward) to pixel
//! coordinates and supplies the analytic Jacobian of that projection with respect
//! to the point and, optionally, with respect to its own intrinsic parameters.
//!
//! # Key Components
//!
//! - **`CameraModel` trait**: object-safe interface so a scene can mix models
//!   behind `Box<dyn CameraModel>`.
//! - **`PinholeCamera`**: fx, fy, cx, cy and an optional skew term.
//! - **`RadialPinholeCamera`**: single focal length with two radial distortion
//!   coefficients (f, k1, k2), no principal point.
//!
//! # Intrinsic vectors
//!
//! `set_intrinsic` / `get_intrinsic` read and write exactly `intrinsic_count()`
//! values from the front of the slice they are given. The bundle adjustment
//! layout passes the sub-slice that starts at the camera's offset.

use nalgebra::{Matrix2x3, Vector2, Vector3};

pub mod pinhole;
pub mod radial;

pub use pinhole::PinholeCamera;
pub use radial::RadialPinholeCamera;

/// Minimum depth for valid 3D points (meters).
pub const MIN_DEPTH: f64 = 1e-6;

/// Epsilon for numerical differentiation in Jacobian tests.
pub const NUMERICAL_DERIVATIVE_EPS: f64 = 1e-6;

/// Tolerance for numerical Jacobian validation in tests.
pub const JACOBIAN_TEST_TOLERANCE: f64 = 1e-5;

/// Camera model errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CameraModelError {
    #[error("z is close to zero, point is at camera center")]
    PointAtCameraCenter,
    #[error("Focal length must be positive")]
    FocalLengthMustBePositive,
    #[error("Principal point must be finite")]
    PrincipalPointMustBeFinite,
    #[error("Invalid camera parameters: {0}")]
    InvalidParams(String),
}

/// Rows of the intrinsic Jacobian: (∂u/∂θ, ∂v/∂θ), each `intrinsic_count()` long.
pub type IntrinsicGradient<'a> = (&'a mut [f64], &'a mut [f64]);

/// Trait for camera projection models.
pub trait CameraModel: std::fmt::Debug + Send + Sync {
    /// Number of intrinsic parameters.
    fn intrinsic_count(&self) -> usize;

    /// Reads `intrinsic_count()` values from the front of `params`.
    fn set_intrinsic(&mut self, params: &[f64]);

    /// Writes `intrinsic_count()` values into the front of `params`.
    fn get_intrinsic(&self, params: &mut [f64]);

    /// Projects a point in the camera frame to pixel coordinates.
    ///
    /// No validity check is performed; use [`CameraModel::is_valid_point`] when
    /// the point may lie behind the camera.
    fn project(&self, p_cam: &Vector3<f64>) -> Vector2<f64>;

    /// Jacobian of the projection.
    ///
    /// Returns ∂(u,v)/∂(x,y,z). When `intrinsic` is `Some`, its two slices are
    /// filled with ∂u/∂θ and ∂v/∂θ for the first `intrinsic_count()` entries.
    fn jacobian(
        &self,
        p_cam: &Vector3<f64>,
        intrinsic: Option<IntrinsicGradient<'_>>,
    ) -> Matrix2x3<f64>;

    /// Checks if a 3D point can be validly projected.
    fn is_valid_point(&self, p_cam: &Vector3<f64>) -> bool {
        p_cam.z >= MIN_DEPTH
    }

    /// Validates camera parameters.
    fn validate_params(&self) -> Result<(), CameraModelError>;

    /// Get model name identifier.
    fn model_name(&self) -> &'static str;

    /// Boxed copy, used to clone scene structures that own their models.
    fn clone_box(&self) -> Box<dyn CameraModel>;
}

impl Clone for Box<dyn CameraModel> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Validates that a 3D point's z-coordinate is positive (in front of camera).
pub fn validate_point_in_front(z: f64) -> Result<(), CameraModelError> {
    if z < MIN_DEPTH {
        return Err(CameraModelError::PointAtCameraCenter);
    }
    Ok(())
}
