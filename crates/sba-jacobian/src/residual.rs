//! Metric reprojection residual.
//!
//! ```text
//! r = π(p_cam) - observed      (x row, then y row)
//! ```
//!
//! Row order and transform state are identical to [`MetricSchurJacobian`](crate::MetricSchurJacobian)
//! so the two can be paired in a least-squares solver.

use crate::decoder::StateDecoder;
use crate::error::{BundleError, BundleResult};
use crate::layout::ParameterLayout;
use crate::observations::SceneObservations;
use crate::structure::SceneStructure;
use sba_camera_models::CameraModel;
use sba_geometry::{RodriguesJacobian, RotationJacobian};
use tracing::debug;

/// Reprojection residual of a metric scene.
#[derive(Debug, Clone, Default)]
pub struct MetricResidual<R: RotationJacobian = RodriguesJacobian> {
    layout: Option<ParameterLayout>,
    decoder: StateDecoder<R>,
    observation_count: usize,
}

impl<R: RotationJacobian> MetricResidual<R> {
    pub fn new() -> Self {
        Self {
            layout: None,
            decoder: StateDecoder::new(),
            observation_count: 0,
        }
    }

    pub fn configure(
        &mut self,
        structure: &SceneStructure,
        observations: &SceneObservations,
    ) -> BundleResult<()> {
        observations.validate(structure)?;
        let layout = ParameterLayout::plan(structure, R::PARAMETER_LENGTH);
        self.decoder.configure(structure);
        self.observation_count = observations.observation_count();
        debug!(
            "Residual layout: {} parameters, {} residuals",
            layout.parameter_count(),
            2 * self.observation_count
        );
        self.layout = Some(layout);
        Ok(())
    }

    pub fn input_count(&self) -> usize {
        self.layout.as_ref().map_or(0, ParameterLayout::parameter_count)
    }

    pub fn output_count(&self) -> usize {
        2 * self.observation_count
    }

    /// Writes `output_count()` residuals for `params` into `residuals`.
    pub fn evaluate(
        &mut self,
        structure: &mut SceneStructure,
        observations: &SceneObservations,
        params: &[f64],
        residuals: &mut [f64],
    ) -> BundleResult<()> {
        let layout = self.layout.as_ref().ok_or(BundleError::NotConfigured)?;
        if params.len() != layout.parameter_count() {
            return Err(BundleError::ParameterLength {
                expected: layout.parameter_count(),
                actual: params.len(),
            });
        }
        if residuals.len() != 2 * self.observation_count {
            return Err(BundleError::ResidualLength {
                expected: 2 * self.observation_count,
                actual: residuals.len(),
            });
        }
        layout.check(structure)?;
        // indices were validated by configure; only the shape is rechecked here
        if observations.view_count() != structure.view_count()
            || observations.observation_count() != self.observation_count
        {
            return Err(BundleError::StructureChanged(format!(
                "{} observations in {} views, configured with {}",
                observations.observation_count(),
                observations.view_count(),
                self.observation_count
            )));
        }

        self.decoder.decode(structure, layout, params)?;

        let structure = &*structure;
        let mut index = 0;
        for (view_index, view) in structure.views().iter().enumerate() {
            let camera = &structure.camera(view.camera).model;
            let world_to_view = self.decoder.world_to_view(view_index);

            for (point, observed) in observations.view(view_index).iter() {
                if point >= structure.point_count() {
                    return Err(BundleError::InvalidObservations(format!("unknown point {point}")));
                }
                let x = layout.free_point(params, point);
                let predicted = camera.project(&world_to_view.transform_homogeneous(&x));
                residuals[index] = predicted.x - observed.x;
                residuals[index + 1] = predicted.y - observed.y;
                index += 2;
            }

            let Some(rigid_view) = observations.rigid_view(view_index) else {
                continue;
            };
            for (global, observed) in rigid_view.iter() {
                let (rigid_index, local) = structure.lookup_rigid(global).ok_or_else(|| {
                    BundleError::InvalidObservations(format!("unknown rigid point {global}"))
                })?;
                let xl = structure.rigid(rigid_index).points[local];
                let p_world = self
                    .decoder
                    .object_to_world(rigid_index)
                    .transform_homogeneous(&xl);
                let predicted = camera.project(&world_to_view.transform_point(&p_world));
                residuals[index] = predicted.x - observed.x;
                residuals[index + 1] = predicted.y - observed.y;
                index += 2;
            }
        }

        Ok(())
    }
}
