use calib_labeler_core::CalibrationPattern;
use calib_labeler_lidar::{segment_plane, PlaneSegmentParams};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A noisy board in front of a sparse scene, roughly one 16-beam sweep.
fn scene(rng: &mut StdRng) -> Vec<Point3<f64>> {
    let mut cloud = Vec::new();
    for j in 0..40 {
        for i in 0..40 {
            cloud.push(Point3::new(
                2.0 + rng.random_range(-0.01..0.01),
                -0.4 + i as f64 * 0.02,
                -0.3 + j as f64 * 0.02,
            ));
        }
    }
    for _ in 0..20_000 {
        cloud.push(Point3::new(
            rng.random_range(-20.0..20.0),
            rng.random_range(-20.0..20.0),
            rng.random_range(-1.5..3.0),
        ));
    }
    cloud
}

fn bench_segment_plane(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let cloud = scene(&mut rng);
    let params = PlaneSegmentParams::for_pattern(&CalibrationPattern::chessboard(9, 7, 0.1));
    let seed = Point3::new(2.0, 0.0, 0.1);

    c.bench_function("segment_plane_21k", |b| {
        b.iter(|| {
            let out = segment_plane(black_box(&cloud), &seed, &params, &mut rng);
            black_box(out.inliers.len())
        })
    });
}

criterion_group!(benches, bench_segment_plane);
criterion_main!(benches);
