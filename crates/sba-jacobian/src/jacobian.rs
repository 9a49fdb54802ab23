//! Analytic Jacobian of the metric reprojection residual, split for a Schur complement solver.
//!
//! Rows follow the observation traversal order: view by view, free-point observations
//! first and rigid-point observations second, two rows (x, y) per observation.
//!
//! The columns are split in two blocks:
//!
//! - **left**: free points, then unknown rigid bodies
//! - **right**: unknown views, then unknown camera intrinsics
//!
//! # Chain rule
//!
//! For a free point X = [x y z w] seen by a view with world-to-view transform [R|T]:
//!
//! ```text
//! p_cam = R·[x y z]ᵀ + T·w        G = ∂(u,v)/∂p_cam   (2×3, from the camera model)
//!
//! ∂/∂[x y z] = G·R     ∂/∂w = G·T
//! ∂/∂rᵢ      = G·(∂R/∂rᵢ·[x y z]ᵀ)
//! ∂/∂T       = G·w
//! ```
//!
//! For a point Xl of a rigid body with object-to-world transform [Rr|Tr]:
//!
//! ```text
//! p_world = Rr·[xl yl zl]ᵀ + Tr·wl
//! p_cam   = R·p_world + T
//!
//! ∂/∂rrᵢ = G·R·(∂Rr/∂rrᵢ·[xl yl zl]ᵀ)
//! ∂/∂Tr  = G·R·wl
//! ```
//!
//! and the view partials are taken at (p_world, w = 1).

use crate::decoder::StateDecoder;
use crate::error::{BundleError, BundleResult};
use crate::layout::ParameterLayout;
use crate::observations::SceneObservations;
use crate::storage::JacobianStorage;
use crate::structure::SceneStructure;
use nalgebra::{Matrix2x3, Vector2, Vector3};
use sba_camera_models::CameraModel;
use sba_geometry::{RodriguesJacobian, RotationJacobian};
use tracing::debug;

/// Metric Schur Jacobian with Rodrigues rotations.
pub type RodriguesSchurJacobian = MetricSchurJacobian<RodriguesJacobian>;

/// Computes the left and right Jacobian blocks of a metric bundle adjustment problem.
///
/// Call [`configure`](Self::configure) once per scene structure, then
/// [`evaluate`](Self::evaluate) for every new parameter vector. One instance must not
/// be shared between threads that evaluate concurrently; its scratch state is reused.
#[derive(Debug, Clone, Default)]
pub struct MetricSchurJacobian<R: RotationJacobian = RodriguesJacobian> {
    layout: Option<ParameterLayout>,
    decoder: StateDecoder<R>,
    observation_count: usize,
    calib_grad_x: Vec<f64>,
    calib_grad_y: Vec<f64>,
}

/// Residual rows of one observation.
#[derive(Debug, Clone, Copy)]
struct Rows {
    x: usize,
    y: usize,
}

impl Rows {
    fn of_observation(index: usize) -> Self {
        Self {
            x: 2 * index,
            y: 2 * index + 1,
        }
    }
}

impl<R: RotationJacobian> MetricSchurJacobian<R> {
    pub fn new() -> Self {
        Self {
            layout: None,
            decoder: StateDecoder::new(),
            observation_count: 0,
            calib_grad_x: Vec::new(),
            calib_grad_y: Vec::new(),
        }
    }

    /// Binds the parameter layout of `structure` and the row count of `observations`.
    ///
    /// Must be called again whenever entities are added or their `known` flags change.
    pub fn configure(
        &mut self,
        structure: &SceneStructure,
        observations: &SceneObservations,
    ) -> BundleResult<()> {
        observations.validate(structure)?;

        let layout = ParameterLayout::plan(structure, R::PARAMETER_LENGTH);
        self.decoder.configure(structure);
        self.calib_grad_x = vec![0.0; layout.largest_camera()];
        self.calib_grad_y = vec![0.0; layout.largest_camera()];
        self.observation_count = observations.observation_count();

        debug!(
            "Jacobian layout: {} parameters ({} point block, {} view block), {} residuals",
            layout.parameter_count(),
            layout.point_block_width(),
            layout.view_block_width(),
            2 * self.observation_count
        );
        debug!(
            "  {} points x {}, {}/{} unknown rigid, {}/{} unknown views, {} camera parameters",
            structure.point_count(),
            layout.point_length,
            structure.unknown_rigid_count(),
            structure.rigid_count(),
            structure.unknown_view_count(),
            structure.view_count(),
            structure.unknown_camera_parameter_count()
        );

        self.layout = Some(layout);
        Ok(())
    }

    /// Number of optimization parameters, 0 before `configure`.
    pub fn input_count(&self) -> usize {
        self.layout.as_ref().map_or(0, ParameterLayout::parameter_count)
    }

    /// Number of residuals: two per observation.
    pub fn output_count(&self) -> usize {
        2 * self.observation_count
    }

    pub fn layout(&self) -> Option<&ParameterLayout> {
        self.layout.as_ref()
    }

    /// Fills `left` (points, rigid bodies) and `right` (views, cameras) for `params`.
    ///
    /// Both blocks are reshaped to `output_count()` rows and cleared first. Unknown camera
    /// intrinsics are written into the camera models of `structure`.
    ///
    /// Observation indices are validated by `configure`; here only the view and
    /// observation counts are compared against it.
    pub fn evaluate<M: JacobianStorage>(
        &mut self,
        structure: &mut SceneStructure,
        observations: &SceneObservations,
        params: &[f64],
        left: &mut M,
        right: &mut M,
    ) -> BundleResult<()> {
        let Self {
            layout,
            decoder,
            observation_count,
            calib_grad_x,
            calib_grad_y,
        } = self;
        let layout = layout.as_ref().ok_or(BundleError::NotConfigured)?;

        if params.len() != layout.parameter_count() {
            return Err(BundleError::ParameterLength {
                expected: layout.parameter_count(),
                actual: params.len(),
            });
        }
        layout.check(structure)?;
        // indices were validated by configure; only the shape is rechecked here
        if observations.view_count() != structure.view_count()
            || observations.observation_count() != *observation_count
        {
            return Err(BundleError::StructureChanged(format!(
                "{} observations in {} views, configured with {}",
                observations.observation_count(),
                observations.view_count(),
                observation_count
            )));
        }

        decoder.decode(structure, layout, params)?;

        let rows = 2 * *observation_count;
        left.reshape(rows, layout.point_block_width());
        right.reshape(rows, layout.view_block_width());
        left.zero();
        right.zero();

        let structure = &*structure;
        let homogeneous = structure.is_homogeneous();
        let mut observation = 0;

        for (view_index, view) in structure.views().iter().enumerate() {
            let camera = structure.camera(view.camera).model.as_ref();
            let camera_column = layout.camera_column(view.camera);
            let view_column = layout.view_column(view_index);
            let view_rotation = decoder.view_rotation(view_index);
            let world_to_view = decoder.world_to_view(view_index);

            for (point, _) in observations.view(view_index).iter() {
                if point >= structure.point_count() {
                    return Err(BundleError::InvalidObservations(format!("unknown point {point}")));
                }
                let rows = Rows::of_observation(observation);
                let x = layout.free_point(params, point);
                let p_cam = world_to_view.transform_homogeneous(&x);
                let grad = camera_gradient(
                    camera,
                    &p_cam,
                    camera_column,
                    calib_grad_x.as_mut_slice(),
                    calib_grad_y.as_mut_slice(),
                    right,
                    rows,
                );

                let column = layout.point_column(point);
                set_block(left, rows, column, &(grad * world_to_view.rotation));
                if homogeneous {
                    set_column(left, rows, column + 3, &(grad * world_to_view.translation));
                }

                if let Some(column) = view_column {
                    partial_se3(right, rows, column, &grad, view_rotation, &x.xyz(), x.w);
                }
                observation += 1;
            }

            let Some(rigid_view) = observations.rigid_view(view_index) else {
                continue;
            };
            for (global, _) in rigid_view.iter() {
                let rows = Rows::of_observation(observation);
                let (rigid_index, local) = structure.lookup_rigid(global).ok_or_else(|| {
                    BundleError::InvalidObservations(format!("unknown rigid point {global}"))
                })?;
                let xl = structure.rigid(rigid_index).points[local];
                let p_world = decoder
                    .object_to_world(rigid_index)
                    .transform_homogeneous(&xl);
                let p_cam = world_to_view.transform_point(&p_world);
                let grad = camera_gradient(
                    camera,
                    &p_cam,
                    camera_column,
                    calib_grad_x.as_mut_slice(),
                    calib_grad_y.as_mut_slice(),
                    right,
                    rows,
                );

                if let Some(column) = view_column {
                    partial_se3(right, rows, column, &grad, view_rotation, &p_world, 1.0);
                }

                if let Some(column) = layout.rigid_column(rigid_index) {
                    // rigid transform is nested inside the view transform
                    let grad_world = grad * world_to_view.rotation;
                    partial_se3(
                        left,
                        rows,
                        column,
                        &grad_world,
                        decoder.rigid_rotation(rigid_index),
                        &xl.xyz(),
                        xl.w,
                    );
                }
                observation += 1;
            }
        }

        Ok(())
    }
}

/// Projection gradient at `p_cam`; writes the intrinsic columns when the camera is unknown.
fn camera_gradient<M: JacobianStorage>(
    camera: &dyn CameraModel,
    p_cam: &Vector3<f64>,
    camera_column: Option<usize>,
    calib_grad_x: &mut [f64],
    calib_grad_y: &mut [f64],
    right: &mut M,
    rows: Rows,
) -> Matrix2x3<f64> {
    let Some(column) = camera_column else {
        return camera.jacobian(p_cam, None);
    };

    let n = camera.intrinsic_count();
    let grad = camera.jacobian(p_cam, Some((&mut calib_grad_x[..n], &mut calib_grad_y[..n])));
    for j in 0..n {
        right.set(rows.x, column + j, calib_grad_x[j]);
        right.set(rows.y, column + j, calib_grad_y[j]);
    }
    grad
}

/// Rotation and translation columns of a transform `p' = R·p + T·w` whose output is
/// differentiated by `grad`.
fn partial_se3<M: JacobianStorage, R: RotationJacobian>(
    storage: &mut M,
    rows: Rows,
    column: usize,
    grad: &Matrix2x3<f64>,
    rotation: &R,
    point: &Vector3<f64>,
    w: f64,
) {
    for i in 0..R::PARAMETER_LENGTH {
        set_column(storage, rows, column + i, &(grad * (rotation.partial(i) * point)));
    }
    set_block(storage, rows, column + R::PARAMETER_LENGTH, &(grad * w));
}

#[inline]
fn set_block<M: JacobianStorage>(storage: &mut M, rows: Rows, column: usize, block: &Matrix2x3<f64>) {
    for k in 0..3 {
        storage.set(rows.x, column + k, block[(0, k)]);
        storage.set(rows.y, column + k, block[(1, k)]);
    }
}

#[inline]
fn set_column<M: JacobianStorage>(storage: &mut M, rows: Rows, column: usize, value: &Vector2<f64>) {
    storage.set(rows.x, column, value.x);
    storage.set(rows.y, column, value.y);
}
