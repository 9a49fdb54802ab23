//! Jacobian Check Binary
//!
//! Builds a synthetic metric scene, evaluates the analytic Schur Jacobian and compares
//! it against central finite differences of the reprojection residual.
//!
//! # Usage
//! ```bash
//! cargo run --release --bin check_jacobian
//!
//! # Homogeneous points, quaternion rotations, radial cameras:
//! cargo run --release --bin check_jacobian -- --homogeneous -r quaternion -c radial
//!
//! # Larger scene with the layout logged:
//! RUST_LOG=debug cargo run --release --bin check_jacobian -- --views 8 --points 200
//! ```

use clap::{Parser, ValueEnum};
use nalgebra::DMatrix;
use sba_jacobian::sba_geometry::{QuaternionJacobian, RodriguesJacobian, RotationJacobian};
use sba_jacobian::{
    JacobianComparison, MetricResidual, MetricSchurJacobian, NumericalJacobianConfig, SceneCodec,
    SceneObservations, SceneStructure, SyntheticCamera, SyntheticSceneConfig, hstack,
    init_logger, numerical_jacobian, rescale_homogeneous,
};
use std::error::Error;
use std::time::Instant;
use tracing::{info, warn};

/// Rotation parameterization of views and rigid bodies
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum RotationArg {
    /// Axis-angle, 3 parameters (default)
    #[default]
    Rodrigues,
    /// Quaternion, 4 parameters
    Quaternion,
}

/// Camera model of every synthetic camera
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum CameraArg {
    /// fx, fy, cx, cy (default)
    #[default]
    Pinhole,
    /// f, k1, k2
    Radial,
}

impl From<CameraArg> for SyntheticCamera {
    fn from(arg: CameraArg) -> Self {
        match arg {
            CameraArg::Pinhole => SyntheticCamera::Pinhole,
            CameraArg::Radial => SyntheticCamera::Radial,
        }
    }
}

/// Compare the analytic metric Schur Jacobian with finite differences
#[derive(Parser)]
#[command(name = "check_jacobian")]
#[command(about = "Compare the analytic bundle adjustment Jacobian with finite differences")]
struct Args {
    /// Number of views
    #[arg(long, default_value_t = 3)]
    views: usize,

    /// Number of free points
    #[arg(short = 'n', long, default_value_t = 10)]
    points: usize,

    /// Number of rigid body points (0 disables the rigid body)
    #[arg(long, default_value_t = 4)]
    rigid_points: usize,

    /// Use homogeneous (4 parameter) points
    #[arg(long)]
    homogeneous: bool,

    /// Rotation parameterization
    #[arg(short = 'r', long, value_enum, default_value = "rodrigues")]
    rotation: RotationArg,

    /// Camera model
    #[arg(short = 'c', long, value_enum, default_value = "pinhole")]
    camera: CameraArg,

    /// Keep camera intrinsics fixed
    #[arg(long)]
    known_cameras: bool,

    /// Mark the first view as known
    #[arg(long)]
    known_first_view: bool,

    /// Finite difference step
    #[arg(long, default_value_t = 1e-6)]
    step: f64,

    /// Accepted relative error
    #[arg(long, default_value_t = 1e-4)]
    tolerance: f64,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logger();

    let (mut scene, observations) = SyntheticSceneConfig::new()
        .with_views(args.views)
        .with_points(args.points)
        .with_rigid_points(args.rigid_points)
        .with_homogeneous(args.homogeneous)
        .with_camera(args.camera.into())
        .with_known_cameras(args.known_cameras)
        .with_seed(args.seed)
        .generate()?;
    rescale_homogeneous(&mut scene, args.seed);
    if args.known_first_view && scene.view_count() > 0 {
        scene.view_mut(0).known = true;
    }

    info!(
        "Scene: {} views, {} points, {} rigid points, {} observations ({})",
        scene.view_count(),
        scene.point_count(),
        scene.total_rigid_points(),
        observations.observation_count(),
        if args.homogeneous { "homogeneous" } else { "euclidean" }
    );

    let config = NumericalJacobianConfig::new()
        .with_step(args.step)
        .with_tolerance(args.tolerance);

    let comparison = match args.rotation {
        RotationArg::Rodrigues => check::<RodriguesJacobian>(&scene, &observations, &config)?,
        RotationArg::Quaternion => check::<QuaternionJacobian>(&scene, &observations, &config)?,
    };

    info!("{comparison}");
    if comparison.passes(&config) {
        info!("Jacobian check PASSED (tolerance {:.1e})", config.tolerance);
        Ok(())
    } else {
        warn!("Jacobian check FAILED (tolerance {:.1e})", config.tolerance);
        Err(format!("relative error {:.3e} above tolerance", comparison.max_rel_error).into())
    }
}

fn check<R: RotationJacobian>(
    scene: &SceneStructure,
    observations: &SceneObservations,
    config: &NumericalJacobianConfig,
) -> Result<JacobianComparison, Box<dyn Error>> {
    let params = SceneCodec::<R>::new().encode(scene);

    let mut jacobian = MetricSchurJacobian::<R>::new();
    jacobian.configure(scene, observations)?;
    info!(
        "Parameters: {}, residuals: {}",
        jacobian.input_count(),
        jacobian.output_count()
    );

    let mut work = scene.clone();
    let mut left = DMatrix::zeros(0, 0);
    let mut right = DMatrix::zeros(0, 0);
    let start = Instant::now();
    jacobian.evaluate(&mut work, observations, &params, &mut left, &mut right)?;
    info!(
        "Analytic Jacobian: {}x{} + {}x{} in {:?}",
        left.nrows(),
        left.ncols(),
        right.nrows(),
        right.ncols(),
        start.elapsed()
    );

    let mut residual = MetricResidual::<R>::new();
    residual.configure(scene, observations)?;
    let start = Instant::now();
    let numerical: DMatrix<f64> = numerical_jacobian(
        |x: &[f64], out: &mut [f64]| residual.evaluate(&mut work, observations, x, out),
        &params,
        jacobian.output_count(),
        config,
    )?;
    info!("Numerical Jacobian in {:?}", start.elapsed());

    Ok(JacobianComparison::compare(&hstack(&left, &right), &numerical))
}
