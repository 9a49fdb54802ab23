//! Quaternion rotation parameterization.
//!
//! Four parameters p = (w, x, y, z) that are normalized before building the
//! rotation matrix. Because the optimizer moves the raw parameters freely, the
//! partials ∂R/∂pᵢ include the Jacobian of the normalization:
//!
//! ```text
//! q = p / |p|
//! ∂qⱼ/∂pᵢ = (δᵢⱼ - qᵢ qⱼ) / |p|
//! ∂R/∂pᵢ  = Σⱼ ∂R/∂qⱼ · ∂qⱼ/∂pᵢ
//! ```
//!
//! The rotation matrix of a unit quaternion is
//!
//! ```text
//! [ w²+x²-y²-z²   2(xy - wz)    2(xz + wy)  ]
//! [ 2(xy + wz)    w²-x²+y²-z²   2(yz - wx)  ]
//! [ 2(xz - wy)    2(yz + wx)    w²-x²-y²+z² ]
//! ```

use crate::RotationJacobian;
use nalgebra::{Matrix3, Rotation3, UnitQuaternion};

/// Quaternion rotation with cached matrix and normalization-aware partials.
#[derive(Debug, Clone, PartialEq)]
pub struct QuaternionJacobian {
    rotation: Matrix3<f64>,
    partials: [Matrix3<f64>; 4],
}

impl Default for QuaternionJacobian {
    fn default() -> Self {
        let mut jac = Self {
            rotation: Matrix3::identity(),
            partials: [Matrix3::zeros(); 4],
        };
        jac.update([1.0, 0.0, 0.0, 0.0]);
        jac
    }
}

impl QuaternionJacobian {
    /// Creates a provider set to the quaternion coefficients `[w, x, y, z]`.
    pub fn from_wxyz(coeffs: [f64; 4]) -> Self {
        let mut jac = Self::default();
        jac.update(coeffs);
        jac
    }

    fn update(&mut self, p: [f64; 4]) {
        let norm = p.iter().map(|v| v * v).sum::<f64>().sqrt();
        debug_assert!(norm > 0.0, "quaternion parameters must not all be zero");
        if norm == 0.0 {
            self.rotation = Matrix3::identity();
            self.partials = [Matrix3::zeros(); 4];
            return;
        }

        let [w, x, y, z] = p.map(|v| v / norm);

        self.rotation = Matrix3::new(
            w * w + x * x - y * y - z * z,
            2.0 * (x * y - w * z),
            2.0 * (x * z + w * y),
            2.0 * (x * y + w * z),
            w * w - x * x + y * y - z * z,
            2.0 * (y * z - w * x),
            2.0 * (x * z - w * y),
            2.0 * (y * z + w * x),
            w * w - x * x - y * y + z * z,
        );

        // ∂R/∂q for a unit quaternion
        let d_unit = [
            Matrix3::new(w, -z, y, z, w, -x, -y, x, w) * 2.0,
            Matrix3::new(x, y, z, y, -x, -w, z, w, -x) * 2.0,
            Matrix3::new(-y, x, w, x, y, z, -w, z, -y) * 2.0,
            Matrix3::new(-z, -w, x, w, -z, y, x, y, z) * 2.0,
        ];

        let q = [w, x, y, z];
        for (i, partial) in self.partials.iter_mut().enumerate() {
            let mut sum = Matrix3::zeros();
            for (j, d) in d_unit.iter().enumerate() {
                let delta = if i == j { 1.0 } else { 0.0 };
                sum += d * ((delta - q[i] * q[j]) / norm);
            }
            *partial = sum;
        }
    }
}

impl RotationJacobian for QuaternionJacobian {
    const PARAMETER_LENGTH: usize = 4;

    fn set_parameters(&mut self, params: &[f64]) {
        self.update([params[0], params[1], params[2], params[3]]);
    }

    fn rotation_matrix(&self) -> &Matrix3<f64> {
        &self.rotation
    }

    fn partial(&self, index: usize) -> &Matrix3<f64> {
        &self.partials[index]
    }

    fn encode(&self, rotation: &Matrix3<f64>, out: &mut [f64]) {
        let q = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*rotation));
        out[0] = q.w;
        out[1] = q.i;
        out[2] = q.j;
        out[3] = q.k;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Quaternion, Vector3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_quaternion_matches_nalgebra() {
        let coeffs = [0.9, 0.1, -0.3, 0.2];
        let jac = QuaternionJacobian::from_wxyz(coeffs);
        let expected = UnitQuaternion::from_quaternion(Quaternion::new(
            coeffs[0], coeffs[1], coeffs[2], coeffs[3],
        ))
        .to_rotation_matrix();
        assert!((jac.rotation_matrix() - expected.matrix()).norm() < 1e-12);
    }

    #[test]
    fn test_quaternion_partials_numerical() {
        let step = 1e-6;
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            // deliberately not unit length
            let params: [f64; 4] = std::array::from_fn(|_| rng.random_range(-2.0..2.0));
            let jac = QuaternionJacobian::from_wxyz(params);

            for i in 0..4 {
                let mut plus = params;
                let mut minus = params;
                plus[i] += step;
                minus[i] -= step;
                let numerical = (QuaternionJacobian::from_wxyz(plus).rotation_matrix()
                    - QuaternionJacobian::from_wxyz(minus).rotation_matrix())
                    / (2.0 * step);
                let error = (jac.partial(i) - numerical).abs().max();
                assert!(error < 1e-6, "partial {i} error {error} for {params:?}");
            }
        }
    }

    #[test]
    fn test_quaternion_scale_invariance() {
        let a = QuaternionJacobian::from_wxyz([0.5, 0.5, -0.5, 0.5]);
        let b = QuaternionJacobian::from_wxyz([2.0, 2.0, -2.0, 2.0]);
        assert!((a.rotation_matrix() - b.rotation_matrix()).norm() < 1e-12);
        // moving along the parameter ray does not rotate
        let radial = a.partial(0) * 0.5 + a.partial(1) * 0.5 - a.partial(2) * 0.5
            + a.partial(3) * 0.5;
        assert!(radial.norm() < 1e-12);
    }

    #[test]
    fn test_quaternion_encode_round_trip() {
        let rotation = Rotation3::new(Vector3::new(0.2, 0.4, -0.3)).into_inner();
        let jac = QuaternionJacobian::default();
        let mut out = [0.0; 4];
        jac.encode(&rotation, &mut out);

        let mut decoded = QuaternionJacobian::default();
        decoded.set_parameters(&out);
        assert!((decoded.rotation_matrix() - rotation).norm() < 1e-12);
        assert_eq!(decoded.parameter_length(), 4);
    }
}
