//! Rodrigues (axis-angle) rotation parameterization.
//!
//! # Mathematical Model
//!
//! A rotation is encoded by the vector v = θ·u where u is the unit rotation axis
//! and θ = |v| the angle. The rotation matrix is the exponential map
//!
//! ```text
//! R = exp([v]×) = I + sin θ [u]× + (1 - cos θ) [u]×²
//! ```
//!
//! # Partials
//!
//! The partial derivatives use the compact formula of Gallego & Yezzi:
//!
//! ```text
//! ∂R/∂vᵢ = (vᵢ [v]× + [v × (I - R) eᵢ]×) · R / θ²
//! ```
//!
//! which is singular at θ = 0. There the limit ∂R/∂vᵢ = [eᵢ]× (the so(3)
//! generators) is used instead.
//!
//! # References
//!
//! - Gallego & Yezzi, "A Compact Formula for the Derivative of a 3-D Rotation in
//!   Exponential Coordinates", J. Math. Imaging Vis. 2015

use crate::{RotationJacobian, SMALL_ANGLE_THRESHOLD, skew_symmetric};
use nalgebra::{Matrix3, Rotation3, Vector3};

/// Axis-angle rotation with cached matrix and partials.
#[derive(Debug, Clone, PartialEq)]
pub struct RodriguesJacobian {
    rotation: Matrix3<f64>,
    partials: [Matrix3<f64>; 3],
}

impl Default for RodriguesJacobian {
    fn default() -> Self {
        let mut jac = Self {
            rotation: Matrix3::identity(),
            partials: [Matrix3::zeros(); 3],
        };
        jac.update(&Vector3::zeros());
        jac
    }
}

impl RodriguesJacobian {
    /// Creates a provider already set to the rotation vector `v`.
    pub fn from_vector(v: &Vector3<f64>) -> Self {
        let mut jac = Self::default();
        jac.update(v);
        jac
    }

    fn update(&mut self, v: &Vector3<f64>) {
        self.rotation = Rotation3::new(*v).into_inner();

        let theta2 = v.norm_squared();
        if theta2 <= SMALL_ANGLE_THRESHOLD {
            for (i, partial) in self.partials.iter_mut().enumerate() {
                *partial = skew_symmetric(&Vector3::ith(i, 1.0));
            }
            return;
        }

        let v_hat = skew_symmetric(v);
        let i_minus_r = Matrix3::identity() - self.rotation;
        for (i, partial) in self.partials.iter_mut().enumerate() {
            let column = v.cross(&i_minus_r.column(i).into_owned());
            *partial = (v_hat * v[i] + skew_symmetric(&column)) * self.rotation / theta2;
        }
    }
}

impl RotationJacobian for RodriguesJacobian {
    const PARAMETER_LENGTH: usize = 3;

    fn set_parameters(&mut self, params: &[f64]) {
        self.update(&Vector3::new(params[0], params[1], params[2]));
    }

    fn rotation_matrix(&self) -> &Matrix3<f64> {
        &self.rotation
    }

    fn partial(&self, index: usize) -> &Matrix3<f64> {
        &self.partials[index]
    }

    fn encode(&self, rotation: &Matrix3<f64>, out: &mut [f64]) {
        let v = Rotation3::from_matrix_unchecked(*rotation).scaled_axis();
        out[..3].copy_from_slice(v.as_slice());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const STEP: f64 = 1e-6;

    fn numerical_partial(params: &[f64; 3], index: usize) -> Matrix3<f64> {
        let mut plus = *params;
        let mut minus = *params;
        plus[index] += STEP;
        minus[index] -= STEP;

        let mut jac = RodriguesJacobian::default();
        jac.set_parameters(&plus);
        let r_plus = *jac.rotation_matrix();
        jac.set_parameters(&minus);
        let r_minus = *jac.rotation_matrix();
        (r_plus - r_minus) / (2.0 * STEP)
    }

    #[test]
    fn test_rodrigues_identity_at_zero() {
        let jac = RodriguesJacobian::default();
        assert!((jac.rotation_matrix() - Matrix3::identity()).norm() < 1e-15);
        assert_eq!(*jac.partial(0), skew_symmetric(&Vector3::x()));
        assert_eq!(*jac.partial(1), skew_symmetric(&Vector3::y()));
        assert_eq!(*jac.partial(2), skew_symmetric(&Vector3::z()));
    }

    #[test]
    fn test_rodrigues_matches_axis_angle() {
        let axis = Vector3::new(1.0, -2.0, 0.5).normalize();
        let angle = 0.8;
        let jac = RodriguesJacobian::from_vector(&(axis * angle));
        let expected = Rotation3::from_axis_angle(&nalgebra::Unit::new_normalize(axis), angle);
        assert!((jac.rotation_matrix() - expected.matrix()).norm() < 1e-12);
    }

    #[test]
    fn test_rodrigues_partials_numerical() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let params = [
                rng.random_range(-1.5..1.5),
                rng.random_range(-1.5..1.5),
                rng.random_range(-1.5..1.5),
            ];
            let mut jac = RodriguesJacobian::default();
            jac.set_parameters(&params);
            for i in 0..3 {
                let numerical = numerical_partial(&params, i);
                let error = (jac.partial(i) - numerical).abs().max();
                assert!(error < 1e-7, "partial {i} error {error} for {params:?}");
            }
        }
    }

    #[test]
    fn test_rodrigues_partials_near_zero() {
        let params = [1e-9, -2e-9, 5e-10];
        let mut jac = RodriguesJacobian::default();
        jac.set_parameters(&params);
        for i in 0..3 {
            let numerical = numerical_partial(&params, i);
            assert!((jac.partial(i) - numerical).abs().max() < 1e-5);
        }
    }

    #[test]
    fn test_rodrigues_encode_round_trip() {
        let v = Vector3::new(0.3, -0.2, 1.1);
        let jac = RodriguesJacobian::from_vector(&v);
        let mut out = [0.0; 3];
        jac.encode(jac.rotation_matrix(), &mut out);
        assert!((Vector3::from(out) - v).norm() < 1e-12);
    }

    #[test]
    fn test_rodrigues_reads_only_front_of_slice() {
        let params = [0.1, 0.2, 0.3, 99.0, -99.0];
        let mut jac = RodriguesJacobian::default();
        jac.set_parameters(&params);
        let expected = RodriguesJacobian::from_vector(&Vector3::new(0.1, 0.2, 0.3));
        assert_eq!(jac, expected);
        assert_eq!(jac.parameter_length(), 3);
    }
}
