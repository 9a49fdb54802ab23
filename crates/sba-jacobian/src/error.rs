//! Error types for the sba-jacobian crate
//!
//! Every failure at this layer is a precondition violation: the call is
//! abandoned and no partial Jacobian or residual is meaningful.

use sba_camera_models::CameraModelError;
use sba_geometry::GeometryError;
use thiserror::Error;

/// Main result type used throughout the sba-jacobian crate
pub type BundleResult<T> = Result<T, BundleError>;

/// Main error type for the sba-jacobian crate
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BundleError {
    /// `evaluate` was called before `configure`
    #[error("Not configured: call configure() before evaluating")]
    NotConfigured,

    /// Parameter vector does not match the configured layout
    #[error("Parameter vector has {actual} values, layout expects {expected}")]
    ParameterLength { expected: usize, actual: usize },

    /// Residual buffer does not match the configured observation count
    #[error("Residual buffer has {actual} values, expected {expected}")]
    ResidualLength { expected: usize, actual: usize },

    /// Scene structure no longer matches the one seen at configure time
    #[error("Scene structure changed since configure: {0}")]
    StructureChanged(String),

    /// Malformed scene structure
    #[error("Invalid scene structure: {0}")]
    InvalidStructure(String),

    /// Observations inconsistent with the scene structure
    #[error("Invalid observations: {0}")]
    InvalidObservations(String),

    /// Sparse matrix assembly errors
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(String),

    /// Camera model errors
    #[error("Camera model error: {0}")]
    Camera(String),

    /// Rotation / rigid transform errors
    #[error("Geometry error: {0}")]
    Geometry(String),
}

impl From<CameraModelError> for BundleError {
    fn from(err: CameraModelError) -> Self {
        BundleError::Camera(err.to_string())
    }
}

impl From<GeometryError> for BundleError {
    fn from(err: GeometryError) -> Self {
        BundleError::Geometry(err.to_string())
    }
}
