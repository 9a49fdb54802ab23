//! Pinhole Camera Model
//!
//! Perspective projection with no lens distortion.
//!
//! # Mathematical Model
//!
//! For a 3D point p = (x, y, z) in camera coordinates:
//!
//! ```text
//! u = fx · (x/z) + skew · (y/z) + cx
//! v = fy · (y/z) + cy
//! ```
//!
//! # Parameters
//!
//! - **Intrinsics**: fx, fy, cx, cy (4 parameters)
//! - **Skew**: appended as a fifth parameter when `zero_skew` is false
//!
//! # References
//!
//! - Hartley & Zisserman, "Multiple View Geometry in Computer Vision"

use crate::{CameraModel, CameraModelError, IntrinsicGradient};
use nalgebra::{Matrix2x3, Vector2, Vector3};

/// Pinhole camera model with 4 or 5 intrinsic parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeCamera {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub skew: f64,
    /// When true the skew is pinned to zero and is not an intrinsic parameter.
    pub zero_skew: bool,
}

impl PinholeCamera {
    /// Creates a zero-skew pinhole camera.
    ///
    /// # Example
    ///
    /// ```
    /// use sba_camera_models::{CameraModel, PinholeCamera};
    ///
    /// let camera = PinholeCamera::new(500.0, 500.0, 320.0, 240.0)?;
    /// assert_eq!(camera.intrinsic_count(), 4);
    /// # Ok::<(), sba_camera_models::CameraModelError>(())
    /// ```
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Result<Self, CameraModelError> {
        let camera = Self {
            fx,
            fy,
            cx,
            cy,
            skew: 0.0,
            zero_skew: true,
        };
        camera.validate_params()?;
        Ok(camera)
    }

    /// Creates a pinhole camera whose skew is an optimizable intrinsic.
    pub fn with_skew(
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
        skew: f64,
    ) -> Result<Self, CameraModelError> {
        let camera = Self {
            fx,
            fy,
            cx,
            cy,
            skew,
            zero_skew: false,
        };
        camera.validate_params()?;
        Ok(camera)
    }
}

impl CameraModel for PinholeCamera {
    fn intrinsic_count(&self) -> usize {
        if self.zero_skew { 4 } else { 5 }
    }

    fn set_intrinsic(&mut self, params: &[f64]) {
        self.fx = params[0];
        self.fy = params[1];
        self.cx = params[2];
        self.cy = params[3];
        if !self.zero_skew {
            self.skew = params[4];
        }
    }

    fn get_intrinsic(&self, params: &mut [f64]) {
        params[0] = self.fx;
        params[1] = self.fy;
        params[2] = self.cx;
        params[3] = self.cy;
        if !self.zero_skew {
            params[4] = self.skew;
        }
    }

    fn project(&self, p_cam: &Vector3<f64>) -> Vector2<f64> {
        let nx = p_cam.x / p_cam.z;
        let ny = p_cam.y / p_cam.z;
        Vector2::new(
            self.fx * nx + self.skew * ny + self.cx,
            self.fy * ny + self.cy,
        )
    }

    /// ```text
    /// ∂u/∂x = fx/z   ∂u/∂y = skew/z   ∂u/∂z = -(fx·x/z + skew·y/z)/z
    /// ∂v/∂x = 0      ∂v/∂y = fy/z     ∂v/∂z = -fy·(y/z)/z
    ///
    ///         fx   fy   cx   cy   skew
    /// ∂u/∂θ = [x/z, 0,   1,   0,   y/z]
    /// ∂v/∂θ = [0,   y/z, 0,   1,   0  ]
    /// ```
    fn jacobian(
        &self,
        p_cam: &Vector3<f64>,
        intrinsic: Option<IntrinsicGradient<'_>>,
    ) -> Matrix2x3<f64> {
        let inv_z = 1.0 / p_cam.z;
        let nx = p_cam.x * inv_z;
        let ny = p_cam.y * inv_z;

        if let Some((grad_x, grad_y)) = intrinsic {
            grad_x[0] = nx;
            grad_x[1] = 0.0;
            grad_x[2] = 1.0;
            grad_x[3] = 0.0;

            grad_y[0] = 0.0;
            grad_y[1] = ny;
            grad_y[2] = 0.0;
            grad_y[3] = 1.0;

            if !self.zero_skew {
                grad_x[4] = ny;
                grad_y[4] = 0.0;
            }
        }

        Matrix2x3::new(
            self.fx * inv_z,
            self.skew * inv_z,
            -(self.fx * nx + self.skew * ny) * inv_z,
            0.0,
            self.fy * inv_z,
            -self.fy * ny * inv_z,
        )
    }

    fn validate_params(&self) -> Result<(), CameraModelError> {
        if self.fx <= 0.0 || self.fy <= 0.0 {
            return Err(CameraModelError::FocalLengthMustBePositive);
        }
        if !self.cx.is_finite() || !self.cy.is_finite() {
            return Err(CameraModelError::PrincipalPointMustBeFinite);
        }
        if !self.skew.is_finite() {
            return Err(CameraModelError::InvalidParams(
                "Skew must be finite".to_string(),
            ));
        }
        Ok(())
    }

    fn model_name(&self) -> &'static str {
        "pinhole"
    }

    fn clone_box(&self) -> Box<dyn CameraModel> {
        Box::new(*self)
    }
}
