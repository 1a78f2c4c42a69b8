use approx::assert_relative_eq;
use calib_labeler_core::CalibrationPattern;
use calib_labeler_lidar::{segment_plane, PlaneSegmentParams};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Grid of points on the tilted plane through `origin` spanned by `u`, `v`.
fn plane_grid(
    origin: Point3<f64>,
    u: Vector3<f64>,
    v: Vector3<f64>,
    n: usize,
    step: f64,
) -> Vec<Point3<f64>> {
    let mut pts = Vec::new();
    for j in 0..n {
        for i in 0..n {
            pts.push(origin + u * (i as f64 * step) + v * (j as f64 * step));
        }
    }
    pts
}

fn params() -> PlaneSegmentParams {
    PlaneSegmentParams::for_pattern(&CalibrationPattern::chessboard(8, 6, 0.1))
}

#[test]
fn exact_plane_inliers_equal_gated_points() {
    let u = Vector3::new(1.0, 0.2, 0.1).normalize();
    let v = u.cross(&Vector3::new(0.0, 0.3, 1.0)).cross(&u).normalize();
    let center = Point3::new(2.0, 0.5, 0.3);
    let cloud = plane_grid(center - u * 0.5 - v * 0.5, u, v, 21, 0.05);
    let params = params();
    let gated = cloud
        .iter()
        .filter(|p| (*p - center).norm() <= params.tracker_threshold)
        .count();

    for iterations in [1, 3, 15] {
        let p = PlaneSegmentParams {
            ransac_iterations: iterations,
            ..params.clone()
        };
        let mut rng = StdRng::seed_from_u64(iterations as u64);
        let out = segment_plane(&cloud, &center, &p, &mut rng);
        assert!(out.labels.detected);
        assert_eq!(out.inliers.len(), gated, "iterations = {iterations}");
        let limit = out.labels.idxs_limit_points.as_ref().expect("limit points");
        assert_eq!(out.labels.idxs.len() + limit.len(), gated);
        let plane = out.plane.expect("plane");
        assert_relative_eq!(plane.normal.dot(&u).abs(), 0.0, epsilon = 1e-9);
    }
}

#[test]
fn too_few_gated_points_is_a_miss() {
    let seed = Point3::new(0.0, 0.0, 0.0);
    let cloud = vec![
        Point3::new(0.1, 0.0, 0.0),
        Point3::new(0.0, 0.1, 0.0),
        Point3::new(10.0, 0.0, 0.0),
        Point3::new(0.0, 10.0, 0.0),
    ];
    let mut rng = StdRng::seed_from_u64(7);
    let out = segment_plane(&cloud, &seed, &params(), &mut rng);
    assert!(!out.labels.detected);
    assert!(out.labels.idxs.is_empty());
    assert_eq!(out.seed, seed);
    assert!(out.plane.is_none());

    let empty = segment_plane(&[], &seed, &params(), &mut rng);
    assert!(!empty.labels.detected);
}

#[test]
fn board_is_separated_from_background_wall() {
    let mut rng = StdRng::seed_from_u64(42);
    // board: 0.7 x 0.7 m at x = 2, facing the sensor
    let mut cloud = plane_grid(
        Point3::new(2.0, -0.35, -0.35),
        Vector3::y(),
        Vector3::z(),
        15,
        0.05,
    );
    let board_len = cloud.len();
    for p in &mut cloud {
        p.x += rng.random_range(-0.005..0.005);
    }
    // wall far behind the board and a few stray points near it
    cloud.extend(plane_grid(Point3::new(5.0, -2.0, -1.0), Vector3::y(), Vector3::z(), 20, 0.2));
    cloud.push(Point3::new(1.6, 0.0, 0.0));
    cloud.push(Point3::new(2.4, 0.1, 0.1));

    let seed = Point3::new(2.05, 0.02, 0.0);
    let out = segment_plane(&cloud, &seed, &params(), &mut rng);
    assert!(out.labels.detected);
    assert_eq!(out.inliers, (0..board_len).collect::<Vec<_>>());
    assert_relative_eq!(out.seed.x, 2.0, epsilon = 0.01);
    assert_relative_eq!(out.seed.y, 0.0, epsilon = 1e-9);
    assert_relative_eq!(out.seed.z, 0.0, epsilon = 1e-9);
}

#[test]
fn seeded_rng_is_reproducible() {
    let cloud = plane_grid(Point3::new(1.0, -0.3, -0.3), Vector3::y(), Vector3::z(), 12, 0.05);
    let seed = Point3::new(1.0, 0.0, 0.0);
    let a = segment_plane(&cloud, &seed, &params(), &mut StdRng::seed_from_u64(3));
    let b = segment_plane(&cloud, &seed, &params(), &mut StdRng::seed_from_u64(3));
    assert_eq!(a, b);
}
