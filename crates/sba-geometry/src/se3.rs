//! Rigid-body transform stored as an explicit rotation matrix and translation.
//!
//! The bundle adjustment Jacobian writes rotation matrices straight out of a
//! [`RotationJacobian`](crate::RotationJacobian) provider, so the transform keeps
//! the 3×3 matrix instead of a quaternion.
//!
//! ```text
//! p' = R · p + t            (Euclidean point)
//! p' = R · [x y z]ᵀ + t · w  (homogeneous point [x y z w])
//! ```

use crate::{GeometryError, check_rotation};
use nalgebra::{Isometry3, Matrix3, Rotation3, Translation3, UnitQuaternion, Vector3, Vector4};
use std::fmt::{self, Display, Formatter};

/// Rotation + translation acting on 3D and homogeneous points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Display for RigidTransform {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let v = Rotation3::from_matrix_unchecked(self.rotation).scaled_axis();
        write!(
            f,
            "RigidTransform(rotation: [{:.4}, {:.4}, {:.4}], translation: [{:.4}, {:.4}, {:.4}])",
            v.x, v.y, v.z, self.translation.x, self.translation.y, self.translation.z
        )
    }
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Creates a transform without checking the rotation matrix.
    pub fn new(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Creates a transform, rejecting matrices that are not proper rotations.
    pub fn try_new(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Result<Self, GeometryError> {
        check_rotation(&rotation)?;
        Ok(Self::new(rotation, translation))
    }

    /// Creates a transform from a rotation vector (axis-angle) and translation.
    pub fn from_axis_angle(axis_angle: Vector3<f64>, translation: Vector3<f64>) -> Self {
        Self::new(Rotation3::new(axis_angle).into_inner(), translation)
    }

    pub fn from_isometry(isometry: &Isometry3<f64>) -> Self {
        Self::new(
            isometry.rotation.to_rotation_matrix().into_inner(),
            isometry.translation.vector,
        )
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        let rotation =
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(self.rotation));
        Isometry3::from_parts(Translation3::from(self.translation), rotation)
    }

    /// Applies the transform to a Euclidean point.
    #[inline]
    pub fn transform_point(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * point + self.translation
    }

    /// Applies the transform to a homogeneous point, returning R·xyz + t·w.
    #[inline]
    pub fn transform_homogeneous(&self, point: &Vector4<f64>) -> Vector3<f64> {
        self.rotation * point.xyz() + self.translation * point.w
    }

    /// Composition that applies `self` first and `next` second.
    pub fn then(&self, next: &RigidTransform) -> RigidTransform {
        RigidTransform::new(
            next.rotation * self.rotation,
            next.rotation * self.translation + next.translation,
        )
    }

    pub fn inverse(&self) -> RigidTransform {
        let rt = self.rotation.transpose();
        RigidTransform::new(rt, -(rt * self.translation))
    }
}
