//! Decodes the flat parameter vector into per-view and per-rigid-body transforms.
//!
//! One rotation provider per view and per rigid body is allocated when the decoder is
//! configured; `decode` only overwrites them. After `decode` the provider of every
//! unknown entity holds the partials ∂R/∂pᵢ for the current parameters.

use crate::error::{BundleError, BundleResult};
use crate::layout::ParameterLayout;
use crate::structure::SceneStructure;
use nalgebra::Vector3;
use sba_camera_models::CameraModel;
use sba_geometry::{RigidTransform, RotationJacobian};

/// Current transform state of a scene for one parameter vector.
#[derive(Debug, Clone, Default)]
pub struct StateDecoder<R: RotationJacobian> {
    view_rotations: Vec<R>,
    rigid_rotations: Vec<R>,
    world_to_view: Vec<RigidTransform>,
    object_to_world: Vec<RigidTransform>,
}

impl<R: RotationJacobian> StateDecoder<R> {
    pub fn new() -> Self {
        Self {
            view_rotations: Vec::new(),
            rigid_rotations: Vec::new(),
            world_to_view: Vec::new(),
            object_to_world: Vec::new(),
        }
    }

    /// Sizes the arena for `structure`.
    pub fn configure(&mut self, structure: &SceneStructure) {
        self.view_rotations = vec![R::default(); structure.view_count()];
        self.rigid_rotations = vec![R::default(); structure.rigid_count()];
        self.world_to_view = structure.views().iter().map(|v| v.world_to_view).collect();
        self.object_to_world = structure
            .rigids()
            .iter()
            .map(|r| r.object_to_world)
            .collect();
    }

    /// Reads every unknown pose out of `params` and pushes unknown camera intrinsics
    /// into the camera models of `structure`. Known poses are copied from `structure`.
    pub fn decode(
        &mut self,
        structure: &mut SceneStructure,
        layout: &ParameterLayout,
        params: &[f64],
    ) -> BundleResult<()> {
        if params.len() != layout.parameter_count() {
            return Err(BundleError::ParameterLength {
                expected: layout.parameter_count(),
                actual: params.len(),
            });
        }
        if self.view_rotations.len() != structure.view_count()
            || self.rigid_rotations.len() != structure.rigid_count()
        {
            return Err(BundleError::NotConfigured);
        }

        let rotation_length = layout.rotation_length;

        for (i, view) in structure.views().iter().enumerate() {
            self.world_to_view[i] = match layout.view_parameter_index(i) {
                Some(index) => {
                    read_pose(&mut self.view_rotations[i], params, index, rotation_length)
                }
                None => view.world_to_view,
            };
        }

        for (i, rigid) in structure.rigids().iter().enumerate() {
            self.object_to_world[i] = match layout.rigid_parameter_index(i) {
                Some(index) => {
                    read_pose(&mut self.rigid_rotations[i], params, index, rotation_length)
                }
                None => rigid.object_to_world,
            };
        }

        for i in 0..structure.camera_count() {
            if let Some(index) = layout.camera_parameter_index(i) {
                structure.camera_mut(i).model.set_intrinsic(&params[index..]);
            }
        }

        Ok(())
    }

    pub fn world_to_view(&self, view: usize) -> &RigidTransform {
        &self.world_to_view[view]
    }

    pub fn object_to_world(&self, rigid: usize) -> &RigidTransform {
        &self.object_to_world[rigid]
    }

    /// Rotation provider of `view`. Only meaningful for unknown views.
    pub fn view_rotation(&self, view: usize) -> &R {
        &self.view_rotations[view]
    }

    /// Rotation provider of `rigid`. Only meaningful for unknown rigid bodies.
    pub fn rigid_rotation(&self, rigid: usize) -> &R {
        &self.rigid_rotations[rigid]
    }
}

fn read_pose<R: RotationJacobian>(
    rotation: &mut R,
    params: &[f64],
    index: usize,
    rotation_length: usize,
) -> RigidTransform {
    rotation.set_parameters(&params[index..]);
    let t = index + rotation_length;
    RigidTransform::new(
        *rotation.rotation_matrix(),
        Vector3::new(params[t], params[t + 1], params[t + 2]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Rotation3;
    use sba_camera_models::PinholeCamera;
    use sba_geometry::{QuaternionJacobian, RodriguesJacobian};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn scene() -> Result<SceneStructure, Box<dyn std::error::Error>> {
        let mut scene = SceneStructure::new(false);
        let unknown = scene.add_camera(Box::new(PinholeCamera::new(500.0, 500.0, 0.0, 0.0)?), false);
        let known_pose =
            RigidTransform::from_axis_angle(Vector3::new(0.0, 0.1, 0.0), Vector3::new(1.0, 2.0, 3.0));
        scene.add_view(unknown, known_pose, true)?;
        scene.add_view(unknown, RigidTransform::identity(), false)?;
        scene.add_point(Vector3::new(0.0, 0.0, 4.0));
        scene.add_rigid(RigidTransform::identity(), &[Vector3::zeros()], false);
        Ok(scene)
    }

    #[test]
    fn test_decode_reads_unknown_and_copies_known() -> TestResult {
        let mut scene = scene()?;
        let layout = ParameterLayout::plan(&scene, 3);
        let mut decoder = StateDecoder::<RodriguesJacobian>::new();
        decoder.configure(&scene);

        // point(3) rigid(6) view(6) camera(4)
        let mut params = vec![0.0; layout.parameter_count()];
        params[3..9].copy_from_slice(&[0.2, 0.0, 0.0, -1.0, 0.0, 0.5]);
        params[9..15].copy_from_slice(&[0.0, 0.0, 0.3, 4.0, 5.0, 6.0]);
        params[15..19].copy_from_slice(&[450.0, 460.0, 10.0, 20.0]);
        decoder.decode(&mut scene, &layout, &params)?;

        assert_eq!(decoder.world_to_view(0), &scene.view(0).world_to_view);

        let view = decoder.world_to_view(1);
        let expected = Rotation3::new(Vector3::new(0.0, 0.0, 0.3));
        assert!((view.rotation - expected.matrix()).norm() < 1e-12);
        assert_eq!(view.translation, Vector3::new(4.0, 5.0, 6.0));

        let rigid = decoder.object_to_world(0);
        assert_eq!(rigid.translation, Vector3::new(-1.0, 0.0, 0.5));

        let mut intrinsics = [0.0; 4];
        scene.camera(0).model.get_intrinsic(&mut intrinsics);
        assert_eq!(intrinsics, [450.0, 460.0, 10.0, 20.0]);
        Ok(())
    }

    #[test]
    fn test_decode_quaternion_layout() -> TestResult {
        let mut scene = scene()?;
        let layout = ParameterLayout::plan(&scene, 4);
        let mut decoder = StateDecoder::<QuaternionJacobian>::new();
        decoder.configure(&scene);

        // point(3) rigid(7) view(7) camera(4)
        let mut params = vec![0.0; layout.parameter_count()];
        params[3..10].copy_from_slice(&[1.0, 0.0, 0.0, 0.0, 7.0, 8.0, 9.0]);
        params[10..17].copy_from_slice(&[2.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        params[17..21].copy_from_slice(&[500.0, 500.0, 0.0, 0.0]);
        decoder.decode(&mut scene, &layout, &params)?;

        assert_eq!(decoder.object_to_world(0).translation, Vector3::new(7.0, 8.0, 9.0));
        assert!((decoder.world_to_view(1).rotation - nalgebra::Matrix3::identity()).norm() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_decode_rejects_wrong_length() -> TestResult {
        let mut scene = scene()?;
        let layout = ParameterLayout::plan(&scene, 3);
        let mut decoder = StateDecoder::<RodriguesJacobian>::new();
        decoder.configure(&scene);
        let result = decoder.decode(&mut scene, &layout, &[0.0; 3]);
        assert_eq!(
            result,
            Err(BundleError::ParameterLength {
                expected: 19,
                actual: 3
            })
        );
        Ok(())
    }

    #[test]
    fn test_decode_requires_configure() -> TestResult {
        let mut scene = scene()?;
        let layout = ParameterLayout::plan(&scene, 3);
        let mut decoder = StateDecoder::<RodriguesJacobian>::new();
        let params = vec![0.0; layout.parameter_count()];
        assert_eq!(
            decoder.decode(&mut scene, &layout, &params),
            Err(BundleError::NotConfigured)
        );
        Ok(())
    }
}
