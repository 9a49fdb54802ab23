//! Scene structure: the entities whose parameters a metric bundle adjustment refines.
//!
//! A scene is made of
//!
//! - **points** in world coordinates, stored as `[x, y, z, w]` (w is 1 in Euclidean mode),
//! - **rigid bodies**, each owning an object-to-world transform and a fixed set of
//!   points in body-local coordinates,
//! - **views**, each with a world-to-view transform and a reference to a camera,
//! - **cameras**, each owning an intrinsic model.
//!
//! Every rigid body, view and camera carries a `known` flag. Known entities keep their
//! current value and contribute no optimization parameters, but still take part in the
//! transform chain.
//!
//! Rigid points are numbered globally, in the order the rigid bodies were added, so an
//! observation can refer to a rigid point with a single index.

use crate::error::{BundleError, BundleResult};
use nalgebra::{Vector3, Vector4};
use sba_camera_models::CameraModel;
use sba_geometry::RigidTransform;

/// Camera intrinsics shared by one or more views.
#[derive(Debug, Clone)]
pub struct SceneCamera {
    pub known: bool,
    pub model: Box<dyn CameraModel>,
}

/// A view (image) of the scene.
#[derive(Debug, Clone)]
pub struct SceneView {
    pub known: bool,
    /// Index of the camera that captured this view.
    pub camera: usize,
    pub world_to_view: RigidTransform,
}

/// A rigid object whose points move together.
#[derive(Debug, Clone)]
pub struct SceneRigid {
    pub known: bool,
    pub object_to_world: RigidTransform,
    /// Points in body-local coordinates, `[x, y, z, w]`.
    pub points: Vec<Vector4<f64>>,
    /// Global index of the first rigid point owned by this body.
    pub index_first: usize,
}

impl SceneRigid {
    /// Body-local point with global rigid index `global`, if this body owns it.
    pub fn local_index(&self, global: usize) -> Option<usize> {
        global
            .checked_sub(self.index_first)
            .filter(|&local| local < self.points.len())
    }
}

/// Container for every entity in a metric scene.
#[derive(Debug, Clone)]
pub struct SceneStructure {
    homogeneous: bool,
    cameras: Vec<SceneCamera>,
    views: Vec<SceneView>,
    points: Vec<Vector4<f64>>,
    rigids: Vec<SceneRigid>,
    /// rigid point global index -> owning rigid body
    rigid_owner: Vec<usize>,
}

impl SceneStructure {
    /// Creates an empty scene. `homogeneous` selects 4-parameter points.
    pub fn new(homogeneous: bool) -> Self {
        Self {
            homogeneous,
            cameras: Vec::new(),
            views: Vec::new(),
            points: Vec::new(),
            rigids: Vec::new(),
            rigid_owner: Vec::new(),
        }
    }

    pub fn is_homogeneous(&self) -> bool {
        self.homogeneous
    }

    /// Number of optimization parameters per free point (3 or 4).
    pub fn point_length(&self) -> usize {
        if self.homogeneous { 4 } else { 3 }
    }

    pub fn add_camera(&mut self, model: Box<dyn CameraModel>, known: bool) -> usize {
        self.cameras.push(SceneCamera { known, model });
        self.cameras.len() - 1
    }

    pub fn add_view(
        &mut self,
        camera: usize,
        world_to_view: RigidTransform,
        known: bool,
    ) -> BundleResult<usize> {
        if camera >= self.cameras.len() {
            return Err(BundleError::InvalidStructure(format!(
                "view references camera {camera} but only {} cameras exist",
                self.cameras.len()
            )));
        }
        self.views.push(SceneView {
            known,
            camera,
            world_to_view,
        });
        Ok(self.views.len() - 1)
    }

    /// Adds a free point. In homogeneous mode it is stored with w = 1.
    pub fn add_point(&mut self, point: Vector3<f64>) -> usize {
        self.points.push(point.push(1.0));
        self.points.len() - 1
    }

    /// Adds a free point in homogeneous coordinates.
    ///
    /// In Euclidean mode the point is dehomogenized before it is stored.
    pub fn add_point_homogeneous(&mut self, point: Vector4<f64>) -> usize {
        let stored = self.normalize(point);
        self.points.push(stored);
        self.points.len() - 1
    }

    pub fn set_point(&mut self, index: usize, point: Vector3<f64>) {
        self.points[index] = point.push(1.0);
    }

    pub fn set_point_homogeneous(&mut self, index: usize, point: Vector4<f64>) {
        self.points[index] = self.normalize(point);
    }

    fn normalize(&self, point: Vector4<f64>) -> Vector4<f64> {
        if self.homogeneous {
            point
        } else {
            (point.xyz() / point.w).push(1.0)
        }
    }

    /// Adds a rigid body with Euclidean body-local points. Returns its index.
    pub fn add_rigid(
        &mut self,
        object_to_world: RigidTransform,
        points: &[Vector3<f64>],
        known: bool,
    ) -> usize {
        let points = points.iter().map(|p| p.push(1.0)).collect();
        self.push_rigid(object_to_world, points, known)
    }

    /// Adds a rigid body with homogeneous body-local points. Returns its index.
    pub fn add_rigid_homogeneous(
        &mut self,
        object_to_world: RigidTransform,
        points: &[Vector4<f64>],
        known: bool,
    ) -> usize {
        let points = points.iter().map(|p| self.normalize(*p)).collect();
        self.push_rigid(object_to_world, points, known)
    }

    fn push_rigid(
        &mut self,
        object_to_world: RigidTransform,
        points: Vec<Vector4<f64>>,
        known: bool,
    ) -> usize {
        let index = self.rigids.len();
        let index_first = self.rigid_owner.len();
        self.rigid_owner
            .extend(std::iter::repeat_n(index, points.len()));
        self.rigids.push(SceneRigid {
            known,
            object_to_world,
            points,
            index_first,
        });
        index
    }

    /// Maps a global rigid point index to `(rigid body, local point index)`.
    pub fn lookup_rigid(&self, global: usize) -> Option<(usize, usize)> {
        let rigid = *self.rigid_owner.get(global)?;
        Some((rigid, global - self.rigids[rigid].index_first))
    }

    pub fn cameras(&self) -> &[SceneCamera] {
        &self.cameras
    }

    pub fn views(&self) -> &[SceneView] {
        &self.views
    }

    pub fn points(&self) -> &[Vector4<f64>] {
        &self.points
    }

    pub fn rigids(&self) -> &[SceneRigid] {
        &self.rigids
    }

    pub fn camera(&self, index: usize) -> &SceneCamera {
        &self.cameras[index]
    }

    pub fn camera_mut(&mut self, index: usize) -> &mut SceneCamera {
        &mut self.cameras[index]
    }

    pub fn view(&self, index: usize) -> &SceneView {
        &self.views[index]
    }

    pub fn view_mut(&mut self, index: usize) -> &mut SceneView {
        &mut self.views[index]
    }

    pub fn rigid(&self, index: usize) -> &SceneRigid {
        &self.rigids[index]
    }

    pub fn rigid_mut(&mut self, index: usize) -> &mut SceneRigid {
        &mut self.rigids[index]
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    pub fn rigid_count(&self) -> usize {
        self.rigids.len()
    }

    pub fn unknown_view_count(&self) -> usize {
        self.views.iter().filter(|v| !v.known).count()
    }

    pub fn unknown_rigid_count(&self) -> usize {
        self.rigids.iter().filter(|r| !r.known).count()
    }

    /// Total intrinsic parameters over all unknown cameras.
    pub fn unknown_camera_parameter_count(&self) -> usize {
        self.cameras
            .iter()
            .filter(|c| !c.known)
            .map(|c| c.model.intrinsic_count())
            .sum()
    }

    pub fn total_rigid_points(&self) -> usize {
        self.rigid_owner.len()
    }
}
