//! Pinhole camera with a single focal length and two radial distortion terms.
//!
//! Matches the Bundler / BAL intrinsic parameterization but keeps the +z forward
//! convention used by the rest of this workspace.
//!
//! # Projection Model
//!
//! ```text
//! x_n = x / z
//! y_n = y / z
//! r² = x_n² + y_n²
//! d  = 1 + k1·r² + k2·r⁴
//! u  = f · d · x_n
//! v  = f · d · y_n
//! ```
//!
//! # Parameters
//!
//! `[f, k1, k2]`, no principal point (cx = cy = 0 by convention).

use crate::{CameraModel, CameraModelError, IntrinsicGradient};
use nalgebra::{Matrix2x3, Vector2, Vector3};

/// Radial-distortion pinhole camera with 3 intrinsic parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialPinholeCamera {
    /// Single focal length (fx = fy = f)
    pub f: f64,
    pub k1: f64,
    pub k2: f64,
}

impl RadialPinholeCamera {
    pub fn new(f: f64, k1: f64, k2: f64) -> Result<Self, CameraModelError> {
        let camera = Self { f, k1, k2 };
        camera.validate_params()?;
        Ok(camera)
    }

    /// Create a camera without distortion (k1 = k2 = 0).
    pub fn new_no_distortion(f: f64) -> Result<Self, CameraModelError> {
        Self::new(f, 0.0, 0.0)
    }
}

impl From<[f64; 3]> for RadialPinholeCamera {
    fn from(params: [f64; 3]) -> Self {
        Self {
            f: params[0],
            k1: params[1],
            k2: params[2],
        }
    }
}

impl CameraModel for RadialPinholeCamera {
    fn intrinsic_count(&self) -> usize {
        3
    }

    fn set_intrinsic(&mut self, params: &[f64]) {
        self.f = params[0];
        self.k1 = params[1];
        self.k2 = params[2];
    }

    fn get_intrinsic(&self, params: &mut [f64]) {
        params[0] = self.f;
        params[1] = self.k1;
        params[2] = self.k2;
    }

    fn project(&self, p_cam: &Vector3<f64>) -> Vector2<f64> {
        let x_n = p_cam.x / p_cam.z;
        let y_n = p_cam.y / p_cam.z;
        let r2 = x_n * x_n + y_n * y_n;
        let distortion = 1.0 + self.k1 * r2 + self.k2 * r2 * r2;
        Vector2::new(self.f * distortion * x_n, self.f * distortion * y_n)
    }

    /// Chain rule through normalized, distorted and pixel coordinates:
    ///
    /// ```text
    /// ∂d/∂(r²)   = k1 + 2·k2·r²
    /// ∂x_d/∂x_n  = d + 2·x_n²·∂d/∂(r²)      ∂x_d/∂y_n = 2·x_n·y_n·∂d/∂(r²)
    /// ∂y_d/∂x_n  = 2·x_n·y_n·∂d/∂(r²)       ∂y_d/∂y_n = d + 2·y_n²·∂d/∂(r²)
    /// ∂x_n/∂x    = 1/z   ∂x_n/∂z = -x_n/z   (same for y)
    ///
    ///         ∂/∂f     ∂/∂k1       ∂/∂k2
    /// ∂u/∂θ = [d·x_n,  f·x_n·r²,   f·x_n·r⁴]
    /// ∂v/∂θ = [d·y_n,  f·y_n·r²,   f·y_n·r⁴]
    /// ```
    fn jacobian(
        &self,
        p_cam: &Vector3<f64>,
        intrinsic: Option<IntrinsicGradient<'_>>,
    ) -> Matrix2x3<f64> {
        let inv_z = 1.0 / p_cam.z;
        let x_n = p_cam.x * inv_z;
        let y_n = p_cam.y * inv_z;
        let r2 = x_n * x_n + y_n * y_n;
        let r4 = r2 * r2;
        let distortion = 1.0 + self.k1 * r2 + self.k2 * r4;

        if let Some((grad_x, grad_y)) = intrinsic {
            grad_x[0] = distortion * x_n;
            grad_x[1] = self.f * x_n * r2;
            grad_x[2] = self.f * x_n * r4;
            grad_y[0] = distortion * y_n;
            grad_y[1] = self.f * y_n * r2;
            grad_y[2] = self.f * y_n * r4;
        }

        let d_dist_dr2 = self.k1 + 2.0 * self.k2 * r2;
        let dxd_dxn = distortion + 2.0 * x_n * x_n * d_dist_dr2;
        let dxd_dyn = 2.0 * x_n * y_n * d_dist_dr2;
        let dyd_dxn = dxd_dyn;
        let dyd_dyn = distortion + 2.0 * y_n * y_n * d_dist_dr2;

        let dxn_dz = -x_n * inv_z;
        let dyn_dz = -y_n * inv_z;

        Matrix2x3::new(
            self.f * dxd_dxn * inv_z,
            self.f * dxd_dyn * inv_z,
            self.f * (dxd_dxn * dxn_dz + dxd_dyn * dyn_dz),
            self.f * dyd_dxn * inv_z,
            self.f * dyd_dyn * inv_z,
            self.f * (dyd_dxn * dxn_dz + dyd_dyn * dyn_dz),
        )
    }

    fn validate_params(&self) -> Result<(), CameraModelError> {
        if self.f <= 0.0 {
            return Err(CameraModelError::FocalLengthMustBePositive);
        }
        if !self.k1.is_finite() || !self.k2.is_finite() {
            return Err(CameraModelError::InvalidParams(
                "Distortion coefficients must be finite".to_string(),
            ));
        }
        Ok(())
    }

    fn model_name(&self) -> &'static str {
        "radial_pinhole"
    }

    fn clone_box(&self) -> Box<dyn CameraModel> {
        Box::new(*self)
    }
}
