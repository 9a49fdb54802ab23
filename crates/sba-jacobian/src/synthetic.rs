//! Deterministic synthetic scenes for tests, benchmarks and the `check_jacobian` tool.
//!
//! Views sit on an arc of radius ~6 around the origin and look at a point cloud in
//! [-1, 1]³. An optional rigid body with points in [-0.5, 0.5]³ is placed near the
//! origin. Every view observes every point.

use crate::error::BundleResult;
use crate::observations::SceneObservations;
use crate::structure::SceneStructure;
use nalgebra::{Isometry3, Point3, Vector2, Vector3, Vector4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sba_camera_models::{CameraModel, PinholeCamera, RadialPinholeCamera};
use sba_geometry::RigidTransform;

const ARC_RADIUS: f64 = 6.0;
const ARC_SPAN: f64 = 0.8;

/// Camera model used for every camera of a synthetic scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyntheticCamera {
    #[default]
    Pinhole,
    Radial,
}

/// Builder for synthetic scenes.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSceneConfig {
    pub views: usize,
    pub points: usize,
    /// Points of the rigid body; 0 disables it.
    pub rigid_points: usize,
    pub homogeneous: bool,
    pub camera: SyntheticCamera,
    /// Number of cameras, assigned to views round robin.
    pub cameras: usize,
    pub known_cameras: bool,
    /// Half width of the uniform noise added to every observed pixel.
    pub pixel_noise: f64,
    pub seed: u64,
}

impl Default for SyntheticSceneConfig {
    fn default() -> Self {
        Self {
            views: 3,
            points: 10,
            rigid_points: 4,
            homogeneous: false,
            camera: SyntheticCamera::Pinhole,
            cameras: 1,
            known_cameras: false,
            pixel_noise: 0.0,
            seed: 42,
        }
    }
}

impl SyntheticSceneConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_views(mut self, views: usize) -> Self {
        self.views = views;
        self
    }

    pub fn with_points(mut self, points: usize) -> Self {
        self.points = points;
        self
    }

    pub fn with_rigid_points(mut self, rigid_points: usize) -> Self {
        self.rigid_points = rigid_points;
        self
    }

    pub fn with_homogeneous(mut self, homogeneous: bool) -> Self {
        self.homogeneous = homogeneous;
        self
    }

    pub fn with_camera(mut self, camera: SyntheticCamera) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_cameras(mut self, cameras: usize) -> Self {
        self.cameras = cameras;
        self
    }

    pub fn with_known_cameras(mut self, known: bool) -> Self {
        self.known_cameras = known;
        self
    }

    pub fn with_pixel_noise(mut self, noise: f64) -> Self {
        self.pixel_noise = noise;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builds the scene and the observations of every point in every view.
    ///
    /// All views and the rigid body are unknown; cameras follow `known_cameras`.
    pub fn generate(&self) -> BundleResult<(SceneStructure, SceneObservations)> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut scene = SceneStructure::new(self.homogeneous);

        for _ in 0..self.cameras.max(1) {
            let model: Box<dyn CameraModel> = match self.camera {
                SyntheticCamera::Pinhole => Box::new(PinholeCamera::new(
                    rng.random_range(480.0..520.0),
                    rng.random_range(480.0..520.0),
                    rng.random_range(300.0..340.0),
                    rng.random_range(220.0..260.0),
                )?),
                SyntheticCamera::Radial => Box::new(RadialPinholeCamera::new(
                    rng.random_range(480.0..520.0),
                    rng.random_range(-0.05..0.05),
                    rng.random_range(-0.01..0.01),
                )?),
            };
            scene.add_camera(model, self.known_cameras);
        }

        let target = Point3::origin();
        let up = Vector3::y();
        for i in 0..self.views {
            let t = if self.views > 1 {
                i as f64 / (self.views - 1) as f64 - 0.5
            } else {
                0.0
            };
            let angle = t * ARC_SPAN;
            let eye = Point3::new(
                ARC_RADIUS * angle.sin() + rng.random_range(-0.1..0.1),
                rng.random_range(-0.3..0.3),
                -ARC_RADIUS * angle.cos() + rng.random_range(-0.1..0.1),
            );
            let view_to_world = Isometry3::face_towards(&eye, &target, &up);
            let world_to_view = RigidTransform::from_isometry(&view_to_world.inverse());
            scene.add_view(i % scene.camera_count(), world_to_view, false)?;
        }

        for _ in 0..self.points {
            let p = Vector3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            );
            if self.homogeneous {
                let w = rng.random_range(0.5..2.0);
                scene.add_point_homogeneous((p * w).push(w));
            } else {
                scene.add_point(p);
            }
        }

        if self.rigid_points > 0 {
            let object_to_world = RigidTransform::from_axis_angle(
                Vector3::new(
                    rng.random_range(-0.3..0.3),
                    rng.random_range(-0.3..0.3),
                    rng.random_range(-0.3..0.3),
                ),
                Vector3::new(
                    rng.random_range(-0.5..0.5),
                    rng.random_range(-0.5..0.5),
                    rng.random_range(-0.5..0.5),
                ),
            );
            let local: Vec<Vector3<f64>> = (0..self.rigid_points)
                .map(|_| {
                    Vector3::new(
                        rng.random_range(-0.5..0.5),
                        rng.random_range(-0.5..0.5),
                        rng.random_range(-0.5..0.5),
                    )
                })
                .collect();
            scene.add_rigid(object_to_world, &local, false);
        }

        let mut observations = SceneObservations::new(self.views, self.rigid_points > 0);
        for (view_index, view) in scene.views().iter().enumerate() {
            let camera = &scene.camera(view.camera).model;

            for (point_index, point) in scene.points().iter().enumerate() {
                let p_cam = view.world_to_view.transform_homogeneous(point);
                let pixel = camera.project(&p_cam) + self.noise(&mut rng);
                observations.view_mut(view_index).add(point_index, pixel);
            }

            for rigid in scene.rigids() {
                for (local, point) in rigid.points.iter().enumerate() {
                    let p_world = rigid.object_to_world.transform_homogeneous(point);
                    let p_cam = view.world_to_view.transform_point(&p_world);
                    let pixel = camera.project(&p_cam) + self.noise(&mut rng);
                    if let Some(rigid_view) = observations.rigid_view_mut(view_index) {
                        rigid_view.add(rigid.index_first + local, pixel);
                    }
                }
            }
        }

        Ok((scene, observations))
    }

    fn noise(&self, rng: &mut StdRng) -> Vector2<f64> {
        if self.pixel_noise > 0.0 {
            Vector2::new(
                rng.random_range(-self.pixel_noise..self.pixel_noise),
                rng.random_range(-self.pixel_noise..self.pixel_noise),
            )
        } else {
            Vector2::zeros()
        }
    }
}

/// Rescales every free point by a random factor so that w ≠ 1. No-op in Euclidean mode.
pub fn rescale_homogeneous(structure: &mut SceneStructure, seed: u64) {
    if !structure.is_homogeneous() {
        return;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    for i in 0..structure.point_count() {
        let scale = rng.random_range(0.5..2.0);
        let point: Vector4<f64> = structure.points()[i] * scale;
        structure.set_point_homogeneous(i, point);
    }
}
