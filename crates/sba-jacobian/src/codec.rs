//! Conversion between a scene structure and its flat parameter vector.

use crate::error::{BundleError, BundleResult};
use crate::layout::ParameterLayout;
use crate::structure::SceneStructure;
use nalgebra::Vector3;
use sba_camera_models::CameraModel;
use sba_geometry::{RigidTransform, RodriguesJacobian, RotationJacobian};

/// Encodes a scene into parameters and writes parameters back into a scene.
#[derive(Debug, Clone, Default)]
pub struct SceneCodec<R: RotationJacobian = RodriguesJacobian> {
    rotation: R,
}

impl<R: RotationJacobian> SceneCodec<R> {
    pub fn new() -> Self {
        Self {
            rotation: R::default(),
        }
    }

    /// Parameter vector describing the current state of `structure`.
    pub fn encode(&self, structure: &SceneStructure) -> Vec<f64> {
        let layout = ParameterLayout::plan(structure, R::PARAMETER_LENGTH);
        let mut params = vec![0.0; layout.parameter_count()];

        for (i, point) in structure.points().iter().enumerate() {
            let column = layout.point_column(i);
            params[column..column + layout.point_length]
                .copy_from_slice(&point.as_slice()[..layout.point_length]);
        }
        for (i, rigid) in structure.rigids().iter().enumerate() {
            if let Some(index) = layout.rigid_parameter_index(i) {
                self.write_pose(&rigid.object_to_world, &mut params[index..]);
            }
        }
        for (i, view) in structure.views().iter().enumerate() {
            if let Some(index) = layout.view_parameter_index(i) {
                self.write_pose(&view.world_to_view, &mut params[index..]);
            }
        }
        for (i, camera) in structure.cameras().iter().enumerate() {
            if let Some(index) = layout.camera_parameter_index(i) {
                camera.model.get_intrinsic(&mut params[index..]);
            }
        }
        params
    }

    /// Writes every free parameter in `params` back into `structure`.
    pub fn decode(&mut self, params: &[f64], structure: &mut SceneStructure) -> BundleResult<()> {
        let layout = ParameterLayout::plan(structure, R::PARAMETER_LENGTH);
        if params.len() != layout.parameter_count() {
            return Err(BundleError::ParameterLength {
                expected: layout.parameter_count(),
                actual: params.len(),
            });
        }

        for i in 0..structure.point_count() {
            structure.set_point_homogeneous(i, layout.free_point(params, i));
        }
        for i in 0..structure.rigid_count() {
            if let Some(index) = layout.rigid_parameter_index(i) {
                structure.rigid_mut(i).object_to_world = self.read_pose(&params[index..]);
            }
        }
        for i in 0..structure.view_count() {
            if let Some(index) = layout.view_parameter_index(i) {
                structure.view_mut(i).world_to_view = self.read_pose(&params[index..]);
            }
        }
        for i in 0..structure.camera_count() {
            if let Some(index) = layout.camera_parameter_index(i) {
                structure.camera_mut(i).model.set_intrinsic(&params[index..]);
            }
        }
        Ok(())
    }

    fn write_pose(&self, pose: &RigidTransform, out: &mut [f64]) {
        let n = R::PARAMETER_LENGTH;
        self.rotation.encode(&pose.rotation, out);
        out[n..n + 3].copy_from_slice(pose.translation.as_slice());
    }

    fn read_pose(&mut self, params: &[f64]) -> RigidTransform {
        let n = R::PARAMETER_LENGTH;
        self.rotation.set_parameters(params);
        RigidTransform::new(
            *self.rotation.rotation_matrix(),
            Vector3::new(params[n], params[n + 1], params[n + 2]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector4;
    use sba_camera_models::{PinholeCamera, RadialPinholeCamera};
    use sba_geometry::QuaternionJacobian;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn scene(homogeneous: bool) -> Result<SceneStructure, Box<dyn std::error::Error>> {
        let mut scene = SceneStructure::new(homogeneous);
        let c0 = scene.add_camera(Box::new(PinholeCamera::new(500.0, 510.0, 320.0, 240.0)?), false);
        let c1 = scene.add_camera(Box::new(RadialPinholeCamera::new(400.0, 0.01, 0.0)?), true);
        scene.add_view(
            c0,
            RigidTransform::from_axis_angle(Vector3::new(0.1, -0.2, 0.3), Vector3::new(1.0, 2.0, 3.0)),
            false,
        )?;
        scene.add_view(c1, RigidTransform::identity(), true)?;
        scene.add_point_homogeneous(Vector4::new(0.5, 1.0, 2.0, 0.5));
        scene.add_point(Vector3::new(-1.0, 0.0, 4.0));
        scene.add_rigid(
            RigidTransform::from_axis_angle(Vector3::new(0.0, 0.4, 0.0), Vector3::new(0.0, 0.0, 1.0)),
            &[Vector3::new(0.1, 0.2, 0.3)],
            false,
        );
        Ok(scene)
    }

    fn assert_same_scene(a: &SceneStructure, b: &SceneStructure) {
        for (p, q) in a.points().iter().zip(b.points()) {
            assert!((p - q).norm() < 1e-12);
        }
        for (v, w) in a.views().iter().zip(b.views()) {
            assert!((v.world_to_view.rotation - w.world_to_view.rotation).norm() < 1e-10);
            assert!((v.world_to_view.translation - w.world_to_view.translation).norm() < 1e-12);
        }
        for (r, s) in a.rigids().iter().zip(b.rigids()) {
            assert!((r.object_to_world.rotation - s.object_to_world.rotation).norm() < 1e-10);
        }
    }

    #[test]
    fn test_decode_restores_encoded_scene() -> TestResult {
        for homogeneous in [false, true] {
            let original = scene(homogeneous)?;
            let codec = SceneCodec::<RodriguesJacobian>::new();
            let params = codec.encode(&original);

            let mut target = scene(homogeneous)?;
            for i in 0..target.view_count() {
                if !target.view(i).known {
                    target.view_mut(i).world_to_view = RigidTransform::identity();
                }
            }
            target.set_point(0, Vector3::zeros());
            SceneCodec::<RodriguesJacobian>::new().decode(&params, &mut target)?;
            assert_same_scene(&original, &target);
        }
        Ok(())
    }

    #[test]
    fn test_encode_layout_order() -> TestResult {
        let scene = scene(false)?;
        let params = SceneCodec::<QuaternionJacobian>::new().encode(&scene);
        // 2 points, 1 rigid (7), 1 unknown view (7), pinhole (4)
        assert_eq!(params.len(), 6 + 7 + 7 + 4);
        assert_eq!(&params[0..3], &[1.0, 2.0, 4.0]);
        assert_eq!(&params[10..13], &[0.0, 0.0, 1.0]);
        assert_eq!(&params[17..20], &[1.0, 2.0, 3.0]);
        assert_eq!(&params[20..24], &[500.0, 510.0, 320.0, 240.0]);
        Ok(())
    }

    #[test]
    fn test_decode_updates_camera_and_rejects_bad_length() -> TestResult {
        let mut scene = scene(false)?;
        let codec = SceneCodec::<RodriguesJacobian>::new();
        let mut params = codec.encode(&scene);
        let n = params.len();
        params[n - 4..].copy_from_slice(&[450.0, 455.0, 300.0, 200.0]);

        let mut codec = codec;
        codec.decode(&params, &mut scene)?;
        let mut intrinsics = [0.0; 4];
        scene.camera(0).model.get_intrinsic(&mut intrinsics);
        assert_eq!(intrinsics, [450.0, 455.0, 300.0, 200.0]);

        assert!(matches!(
            codec.decode(&params[1..], &mut scene),
            Err(BundleError::ParameterLength { .. })
        ));
        Ok(())
    }
}
