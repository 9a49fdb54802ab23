//! Shared utilities for the Jacobian integration tests
//!
//! Builds the reference scenes and runs the finite-difference comparison through the
//! public API only.

#![allow(dead_code)]

use nalgebra::{DMatrix, Vector2, Vector3, Vector4};
use sba_jacobian::sba_camera_models::{PinholeCamera, RadialPinholeCamera};
use sba_jacobian::sba_geometry::{RigidTransform, RotationJacobian};
use sba_jacobian::{
    BundleResult, JacobianComparison, MetricResidual, MetricSchurJacobian,
    NumericalJacobianConfig, SceneCodec, SceneObservations, SceneStructure, SyntheticCamera,
    SyntheticSceneConfig, hstack, numerical_jacobian, rescale_homogeneous,
};

/// 3 views, 6 free points, one unknown rigid body with 4 points, one unknown camera.
pub fn reference_scene(
    homogeneous: bool,
    camera: SyntheticCamera,
) -> BundleResult<(SceneStructure, SceneObservations)> {
    let (mut scene, observations) = SyntheticSceneConfig::new()
        .with_views(3)
        .with_points(6)
        .with_rigid_points(4)
        .with_homogeneous(homogeneous)
        .with_camera(camera)
        .with_pixel_noise(0.5)
        .with_seed(11)
        .generate()?;
    rescale_homogeneous(&mut scene, 5);
    Ok((scene, observations))
}

/// Weights of the three body-local points of [`mixed_camera_scene`]'s rigid body.
pub const RIGID_POINT_WEIGHTS: [f64; 3] = [2.0, 0.5, 1.5];

/// Hand-built scene exercising camera offsets and rigid points with w != 1.
///
/// Cameras are [known skewed pinhole (5), unknown radial (3), unknown skewed pinhole (5)],
/// one view each. The unknown rigid body is added with homogeneous local points, so
/// their weights survive in homogeneous mode. Every view observes the points out of
/// insertion order.
pub fn mixed_camera_scene(
    homogeneous: bool,
) -> BundleResult<(SceneStructure, SceneObservations)> {
    let mut scene = SceneStructure::new(homogeneous);
    let c0 = scene.add_camera(
        Box::new(PinholeCamera::with_skew(510.0, 500.0, 320.0, 240.0, 0.8)?),
        true,
    );
    let c1 = scene.add_camera(Box::new(RadialPinholeCamera::new(480.0, 0.02, -0.005)?), false);
    let c2 = scene.add_camera(
        Box::new(PinholeCamera::with_skew(495.0, 505.0, 310.0, 250.0, -1.2)?),
        false,
    );

    let poses = [
        (Vector3::new(0.05, -0.1, 0.02), Vector3::new(0.1, -0.2, 5.0)),
        (Vector3::new(-0.08, 0.12, -0.03), Vector3::new(-0.3, 0.1, 5.5)),
        (Vector3::new(0.1, 0.05, 0.07), Vector3::new(0.25, 0.15, 4.8)),
    ];
    for (camera, (axis_angle, translation)) in [c0, c1, c2].into_iter().zip(poses) {
        scene.add_view(camera, RigidTransform::from_axis_angle(axis_angle, translation), false)?;
    }

    let points = [
        (Vector3::new(0.3, -0.4, 0.2), 1.3),
        (Vector3::new(-0.5, 0.1, -0.3), 0.7),
        (Vector3::new(0.6, 0.5, 0.4), 1.8),
        (Vector3::new(-0.2, -0.6, 0.1), 0.6),
        (Vector3::new(0.0, 0.3, -0.5), 1.1),
    ];
    for (p, w) in points {
        scene.add_point_homogeneous((p * w).push(w));
    }

    let local = [
        Vector3::new(0.2, -0.1, 0.15),
        Vector3::new(-0.15, 0.2, -0.1),
        Vector3::new(0.1, 0.1, -0.2),
    ];
    let rigid_points: Vec<Vector4<f64>> = local
        .iter()
        .zip(RIGID_POINT_WEIGHTS)
        .map(|(p, w)| (p * w).push(w))
        .collect();
    scene.add_rigid_homogeneous(
        RigidTransform::from_axis_angle(Vector3::new(0.1, -0.2, 0.15), Vector3::new(0.2, 0.1, -0.3)),
        &rigid_points,
        false,
    );

    let mut observations = SceneObservations::new(3, true);
    for view in 0..3 {
        for (k, point) in [4, 1, 3, 0, 2].into_iter().enumerate() {
            let pixel = Vector2::new(300.0 + 10.0 * k as f64, 200.0 - 5.0 * view as f64);
            observations.view_mut(view).add((point + view) % 5, pixel);
        }
        if let Some(rigid) = observations.rigid_view_mut(view) {
            for (k, point) in [2, 0, 1].into_iter().enumerate() {
                rigid.add(point, Vector2::new(250.0 - 7.0 * k as f64, 260.0));
            }
        }
    }
    Ok((scene, observations))
}

/// Left and right blocks evaluated at the scene's own parameters.
pub fn evaluate_blocks<R: RotationJacobian>(
    scene: &SceneStructure,
    observations: &SceneObservations,
) -> BundleResult<(DMatrix<f64>, DMatrix<f64>)> {
    let params = SceneCodec::<R>::new().encode(scene);
    let mut work = scene.clone();
    let mut jacobian = MetricSchurJacobian::<R>::new();
    jacobian.configure(&work, observations)?;
    let mut left = DMatrix::zeros(0, 0);
    let mut right = DMatrix::zeros(0, 0);
    jacobian.evaluate(&mut work, observations, &params, &mut left, &mut right)?;
    Ok((left, right))
}

/// Analytic Jacobian vs central differences of the residual.
pub fn compare_with_numerical<R: RotationJacobian>(
    scene: &SceneStructure,
    observations: &SceneObservations,
    config: &NumericalJacobianConfig,
) -> BundleResult<JacobianComparison> {
    let (left, right) = evaluate_blocks::<R>(scene, observations)?;

    let params = SceneCodec::<R>::new().encode(scene);
    let mut work = scene.clone();
    let mut residual = MetricResidual::<R>::new();
    residual.configure(&work, observations)?;
    let rows = residual.output_count();
    let numerical = numerical_jacobian(
        |x: &[f64], out: &mut [f64]| residual.evaluate(&mut work, observations, x, out),
        &params,
        rows,
        config,
    )?;

    Ok(JacobianComparison::compare(&hstack(&left, &right), &numerical))
}

/// Same scene with homogeneous points (w = 1) in place of Euclidean ones.
pub fn to_homogeneous(scene: &SceneStructure) -> BundleResult<SceneStructure> {
    let mut out = SceneStructure::new(true);
    for camera in scene.cameras() {
        out.add_camera(camera.model.clone(), camera.known);
    }
    for view in scene.views() {
        out.add_view(view.camera, view.world_to_view, view.known)?;
    }
    for point in scene.points() {
        out.add_point(point.xyz() / point.w);
    }
    for rigid in scene.rigids() {
        out.add_rigid_homogeneous(rigid.object_to_world, &rigid.points, rigid.known);
    }
    Ok(out)
}

/// Largest element-wise difference, relative to max(|a|, |b|, 1).
pub fn max_relative_difference(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    assert_eq!(a.shape(), b.shape());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs() / x.abs().max(y.abs()).max(1.0))
        .fold(0.0, f64::max)
}
