//! Metric Schur Jacobian Benchmark
//!
//! Times one `evaluate` call on synthetic scenes of increasing size, for each storage
//! backend. The dense backends only run on the smallest scene.
//!
//! ## Usage
//!
//! ```bash
//! cargo bench --bench jacobian_benchmark
//! ```

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use nalgebra::DMatrix;
use sba_jacobian::sba_geometry::RodriguesJacobian;
use sba_jacobian::{
    BundleResult, JacobianStorage, RodriguesSchurJacobian, RowMajorMatrix, SceneCodec,
    SceneObservations, SceneStructure, SyntheticSceneConfig, TripletMatrix,
};
use std::hint::black_box;

/// (views, points)
const SCENE_SIZES: [(usize, usize); 3] = [(5, 100), (10, 500), (20, 1000)];

/// Dense blocks hold every zero, so only the smallest scene is timed with them.
const DENSE_SCENE_SIZES: [(usize, usize); 1] = [(5, 100)];

struct Fixture {
    scene: SceneStructure,
    observations: SceneObservations,
    params: Vec<f64>,
    jacobian: RodriguesSchurJacobian,
}

fn fixture(views: usize, points: usize) -> BundleResult<Fixture> {
    let (scene, observations) = SyntheticSceneConfig::new()
        .with_views(views)
        .with_points(points)
        .with_rigid_points(points / 10)
        .generate()?;
    let mut jacobian = RodriguesSchurJacobian::new();
    jacobian.configure(&scene, &observations)?;
    let params = SceneCodec::<RodriguesJacobian>::new().encode(&scene);
    Ok(Fixture {
        scene,
        observations,
        params,
        jacobian,
    })
}

fn bench_storage<M: JacobianStorage>(
    c: &mut Criterion,
    name: &str,
    sizes: &[(usize, usize)],
    mut make: impl FnMut() -> M,
) {
    let mut group = c.benchmark_group(format!("evaluate_{name}"));
    for &(views, points) in sizes {
        let mut f = match fixture(views, points) {
            Ok(f) => f,
            Err(e) => panic!("failed to build {views}x{points} scene: {e}"),
        };
        let mut left = make();
        let mut right = make();
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{views}x{points}")),
            &(views, points),
            |b, _| {
                b.iter(|| {
                    let result = f.jacobian.evaluate(
                        &mut f.scene,
                        &f.observations,
                        black_box(&f.params),
                        &mut left,
                        &mut right,
                    );
                    assert!(result.is_ok(), "evaluate failed: {result:?}");
                    black_box(&left);
                })
            },
        );
    }
    group.finish();
}

fn criterion_benchmark(c: &mut Criterion) {
    bench_storage(c, "triplet", &SCENE_SIZES, TripletMatrix::default);
    bench_storage(c, "dense", &DENSE_SCENE_SIZES, || DMatrix::<f64>::zeros(0, 0));
    bench_storage(c, "row_major", &DENSE_SCENE_SIZES, RowMajorMatrix::default);
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
