//! Flat parameter vector layout.
//!
//! ```text
//! [ free points | unknown rigid bodies | unknown views | unknown camera intrinsics ]
//!   N·(3|4)       (rot + 3) each          (rot + 3) each  model specific
//! ```
//!
//! The first two groups are the columns of the left (point) Jacobian block, the last
//! two the columns of the right (view) block. Known entities get no slot; their
//! offset is `None`.

use crate::error::{BundleError, BundleResult};
use crate::structure::SceneStructure;
use nalgebra::Vector4;
use sba_camera_models::CameraModel;

/// Offsets of every entity inside the flat parameter vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterLayout {
    /// 3 (Euclidean) or 4 (homogeneous)
    pub point_length: usize,
    /// rotation parameters + 3 translation
    pub se3_length: usize,
    pub rotation_length: usize,
    pub index_first_rigid: usize,
    pub index_first_view: usize,
    pub index_last_view: usize,
    pub total: usize,
    point_count: usize,
    rigid_point_count: usize,
    /// Offset of each unknown rigid body relative to `index_first_rigid`.
    rigid_offsets: Vec<Option<usize>>,
    /// Offset of each unknown view relative to `index_first_view`.
    view_offsets: Vec<Option<usize>>,
    /// Offset of each unknown camera relative to `index_last_view`.
    camera_offsets: Vec<Option<usize>>,
    camera_lengths: Vec<usize>,
    largest_camera: usize,
}

impl ParameterLayout {
    /// Computes the layout for `structure` with rotations of `rotation_length` parameters.
    pub fn plan(structure: &SceneStructure, rotation_length: usize) -> Self {
        let point_length = structure.point_length();
        let se3_length = rotation_length + 3;

        let index_first_rigid = structure.point_count() * point_length;
        let index_first_view = index_first_rigid + structure.unknown_rigid_count() * se3_length;
        let index_last_view = index_first_view + structure.unknown_view_count() * se3_length;

        let rigid_offsets = slot_offsets(
            structure.rigids().iter().map(|r| (r.known, se3_length)),
        );
        let view_offsets = slot_offsets(
            structure.views().iter().map(|v| (v.known, se3_length)),
        );
        let camera_lengths: Vec<usize> = structure
            .cameras()
            .iter()
            .map(|c| c.model.intrinsic_count())
            .collect();
        let camera_offsets = slot_offsets(
            structure
                .cameras()
                .iter()
                .zip(&camera_lengths)
                .map(|(c, &len)| (c.known, len)),
        );
        let largest_camera = camera_lengths.iter().copied().max().unwrap_or(0);

        Self {
            point_length,
            se3_length,
            rotation_length,
            index_first_rigid,
            index_first_view,
            index_last_view,
            total: index_last_view + structure.unknown_camera_parameter_count(),
            point_count: structure.point_count(),
            rigid_point_count: structure.total_rigid_points(),
            rigid_offsets,
            view_offsets,
            camera_offsets,
            camera_lengths,
            largest_camera,
        }
    }

    /// Number of optimization parameters.
    pub fn parameter_count(&self) -> usize {
        self.total
    }

    /// Width of the left (points and rigid bodies) Jacobian block.
    pub fn point_block_width(&self) -> usize {
        self.index_first_view
    }

    /// Width of the right (views and cameras) Jacobian block.
    pub fn view_block_width(&self) -> usize {
        self.total - self.index_first_view
    }

    /// Largest intrinsic parameter count over all cameras.
    pub fn largest_camera(&self) -> usize {
        self.largest_camera
    }

    /// Left-block column of the first parameter of free point `point`.
    pub fn point_column(&self, point: usize) -> usize {
        point * self.point_length
    }

    /// Reads free point `point` out of `params` as `[x, y, z, w]` (w = 1 in Euclidean mode).
    #[inline]
    pub fn free_point(&self, params: &[f64], point: usize) -> Vector4<f64> {
        let c = self.point_column(point);
        let w = if self.point_length == 4 {
            params[c + 3]
        } else {
            1.0
        };
        Vector4::new(params[c], params[c + 1], params[c + 2], w)
    }

    /// Left-block column of the first parameter of rigid body `rigid`, if unknown.
    pub fn rigid_column(&self, rigid: usize) -> Option<usize> {
        self.rigid_offsets[rigid].map(|offset| self.index_first_rigid + offset)
    }

    /// Right-block column of the first parameter of view `view`, if unknown.
    pub fn view_column(&self, view: usize) -> Option<usize> {
        self.view_offsets[view]
    }

    /// Right-block column of the first intrinsic of camera `camera`, if unknown.
    pub fn camera_column(&self, camera: usize) -> Option<usize> {
        self.camera_offsets[camera]
            .map(|offset| self.index_last_view - self.index_first_view + offset)
    }

    /// Index in the parameter vector of the first parameter of rigid body `rigid`.
    pub fn rigid_parameter_index(&self, rigid: usize) -> Option<usize> {
        self.rigid_column(rigid)
    }

    /// Index in the parameter vector of the first parameter of view `view`.
    pub fn view_parameter_index(&self, view: usize) -> Option<usize> {
        self.view_offsets[view].map(|offset| self.index_first_view + offset)
    }

    /// Index in the parameter vector of the first intrinsic of camera `camera`.
    pub fn camera_parameter_index(&self, camera: usize) -> Option<usize> {
        self.camera_offsets[camera].map(|offset| self.index_last_view + offset)
    }

    /// Verifies that `structure` still has the shape this layout was planned for.
    pub fn check(&self, structure: &SceneStructure) -> BundleResult<()> {
        if structure.point_length() != self.point_length {
            return Err(changed("point mode switched between Euclidean and homogeneous"));
        }
        if structure.point_count() != self.point_count {
            return Err(changed(format!(
                "{} points, layout has {}",
                structure.point_count(),
                self.point_count
            )));
        }
        if structure.total_rigid_points() != self.rigid_point_count
            || structure.rigid_count() != self.rigid_offsets.len()
        {
            return Err(changed("rigid bodies added or resized"));
        }
        if structure.view_count() != self.view_offsets.len() {
            return Err(changed(format!(
                "{} views, layout has {}",
                structure.view_count(),
                self.view_offsets.len()
            )));
        }
        if structure.camera_count() != self.camera_offsets.len() {
            return Err(changed(format!(
                "{} cameras, layout has {}",
                structure.camera_count(),
                self.camera_offsets.len()
            )));
        }

        let rigids = structure.rigids().iter().map(|r| r.known);
        if let Some(i) = first_flip(rigids, &self.rigid_offsets) {
            return Err(changed(format!("known flag of rigid body {i}")));
        }
        let views = structure.views().iter().map(|v| v.known);
        if let Some(i) = first_flip(views, &self.view_offsets) {
            return Err(changed(format!("known flag of view {i}")));
        }
        let cameras = structure.cameras().iter().map(|c| c.known);
        if let Some(i) = first_flip(cameras, &self.camera_offsets) {
            return Err(changed(format!("known flag of camera {i}")));
        }
        for (i, (camera, &len)) in structure.cameras().iter().zip(&self.camera_lengths).enumerate() {
            if camera.model.intrinsic_count() != len {
                return Err(changed(format!("intrinsic count of camera {i}")));
            }
        }
        Ok(())
    }
}

fn changed(detail: impl Into<String>) -> BundleError {
    BundleError::StructureChanged(detail.into())
}

/// Assigns consecutive offsets to the unknown entries of `(known, length)` pairs.
fn slot_offsets(entries: impl Iterator<Item = (bool, usize)>) -> Vec<Option<usize>> {
    let mut next = 0;
    entries
        .map(|(known, length)| {
            if known {
                None
            } else {
                let offset = next;
                next += length;
                Some(offset)
            }
        })
        .collect()
}

fn first_flip(known: impl Iterator<Item = bool>, offsets: &[Option<usize>]) -> Option<usize> {
    known
        .zip(offsets)
        .position(|(known, offset)| known != offset.is_none())
}
