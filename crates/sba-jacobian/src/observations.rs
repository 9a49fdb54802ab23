//! Pixel observations of scene points, grouped per view.
//!
//! The traversal order of observations defines the row order of both the residual
//! vector and the Jacobian: view by view, free-point observations first, then rigid
//! point observations, two rows (x, y) each.

use crate::error::{BundleError, BundleResult};
use crate::structure::SceneStructure;
use nalgebra::Vector2;

/// Observations made by a single view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationView {
    /// Observed point index (free point index or global rigid point index).
    pub points: Vec<usize>,
    /// Measured pixel for the matching entry of `points`.
    pub pixels: Vec<Vector2<f64>>,
}

impl ObservationView {
    pub fn add(&mut self, point: usize, pixel: Vector2<f64>) {
        self.points.push(point);
        self.pixels.push(pixel);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Vector2<f64>)> + '_ {
        self.points.iter().copied().zip(self.pixels.iter())
    }
}

/// All observations in a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObservations {
    views: Vec<ObservationView>,
    rigid_views: Option<Vec<ObservationView>>,
}

impl SceneObservations {
    /// Creates empty observation lists for `view_count` views. `with_rigid` adds a
    /// parallel list per view for rigid-body points.
    pub fn new(view_count: usize, with_rigid: bool) -> Self {
        Self {
            views: vec![ObservationView::default(); view_count],
            rigid_views: with_rigid.then(|| vec![ObservationView::default(); view_count]),
        }
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn has_rigid(&self) -> bool {
        self.rigid_views.is_some()
    }

    pub fn view(&self, index: usize) -> &ObservationView {
        &self.views[index]
    }

    pub fn view_mut(&mut self, index: usize) -> &mut ObservationView {
        &mut self.views[index]
    }

    pub fn rigid_view(&self, index: usize) -> Option<&ObservationView> {
        self.rigid_views.as_ref().map(|views| &views[index])
    }

    pub fn rigid_view_mut(&mut self, index: usize) -> Option<&mut ObservationView> {
        self.rigid_views.as_mut().map(|views| &mut views[index])
    }

    /// Total observations, free and rigid.
    pub fn observation_count(&self) -> usize {
        let free: usize = self.views.iter().map(ObservationView::len).sum();
        let rigid: usize = self
            .rigid_views
            .iter()
            .flatten()
            .map(ObservationView::len)
            .sum();
        free + rigid
    }

    /// Checks that these observations can be evaluated against `structure`.
    pub fn validate(&self, structure: &SceneStructure) -> BundleResult<()> {
        if self.views.len() != structure.view_count() {
            return Err(BundleError::InvalidObservations(format!(
                "{} observation views for {} scene views",
                self.views.len(),
                structure.view_count()
            )));
        }

        for (view_index, view) in self.views.iter().enumerate() {
            if view.points.len() != view.pixels.len() {
                return Err(BundleError::InvalidObservations(format!(
                    "view {view_index}: {} points but {} pixels",
                    view.points.len(),
                    view.pixels.len()
                )));
            }
            if let Some(&point) = view.points.iter().find(|&&p| p >= structure.point_count()) {
                return Err(BundleError::InvalidObservations(format!(
                    "view {view_index} observes point {point} but only {} points exist",
                    structure.point_count()
                )));
            }
        }

        for (view_index, view) in self.rigid_views.iter().flatten().enumerate() {
            if view.points.len() != view.pixels.len() {
                return Err(BundleError::InvalidObservations(format!(
                    "view {view_index}: {} rigid points but {} pixels",
                    view.points.len(),
                    view.pixels.len()
                )));
            }
            if let Some(&point) = view
                .points
                .iter()
                .find(|&&p| p >= structure.total_rigid_points())
            {
                return Err(BundleError::InvalidObservations(format!(
                    "view {view_index} observes rigid point {point} but only {} rigid points exist",
                    structure.total_rigid_points()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use sba_camera_models::PinholeCamera;
    use sba_geometry::RigidTransform;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn two_view_scene() -> Result<SceneStructure, Box<dyn std::error::Error>> {
        let mut scene = SceneStructure::new(false);
        let camera = scene.add_camera(Box::new(PinholeCamera::new(500.0, 500.0, 0.0, 0.0)?), true);
        scene.add_view(camera, RigidTransform::identity(), false)?;
        scene.add_view(camera, RigidTransform::identity(), false)?;
        scene.add_point(Vector3::new(0.0, 0.0, 5.0));
        scene.add_rigid(RigidTransform::identity(), &[Vector3::new(0.0, 0.0, 4.0)], false);
        Ok(scene)
    }

    #[test]
    fn test_observation_count_includes_rigid() {
        let mut obs = SceneObservations::new(2, true);
        obs.view_mut(0).add(0, Vector2::new(1.0, 2.0));
        obs.view_mut(1).add(0, Vector2::new(3.0, 4.0));
        if let Some(rigid) = obs.rigid_view_mut(1) {
            rigid.add(0, Vector2::new(5.0, 6.0));
        }
        assert_eq!(obs.observation_count(), 3);
        assert_eq!(obs.rigid_view(1).map(ObservationView::len), Some(1));
        assert!(obs.has_rigid());

        let collected: Vec<_> = obs.view(1).iter().collect();
        assert_eq!(collected, vec![(0, &Vector2::new(3.0, 4.0))]);
    }

    #[test]
    fn test_without_rigid_lists() {
        let mut obs = SceneObservations::new(3, false);
        assert!(!obs.has_rigid());
        assert!(obs.rigid_view(0).is_none());
        assert!(obs.rigid_view_mut(0).is_none());
        assert_eq!(obs.observation_count(), 0);
    }

    #[test]
    fn test_validate() -> TestResult {
        let scene = two_view_scene()?;

        let mut obs = SceneObservations::new(2, true);
        obs.view_mut(0).add(0, Vector2::zeros());
        if let Some(rigid) = obs.rigid_view_mut(0) {
            rigid.add(0, Vector2::zeros());
        }
        obs.validate(&scene)?;

        let mut bad_point = obs.clone();
        bad_point.view_mut(1).add(1, Vector2::zeros());
        assert!(bad_point.validate(&scene).is_err());

        let mut bad_rigid = obs.clone();
        if let Some(rigid) = bad_rigid.rigid_view_mut(1) {
            rigid.add(1, Vector2::zeros());
        }
        assert!(bad_rigid.validate(&scene).is_err());

        assert!(SceneObservations::new(3, false).validate(&scene).is_err());
        Ok(())
    }
}
