//! Seed-gated RANSAC plane segmentation of 3D point clouds.

use calib_labeler_core::{CalibrationPattern, ConfigError, LabelIdxs, Labels, Modality};
use log::{debug, warn};
use nalgebra::{Point2, Point3, Vector3};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::hull::convex_hull_indices;

/// Redraws allowed for one RANSAC iteration before it is skipped.
const MAX_SAMPLE_ATTEMPTS: usize = 32;
const COLLINEAR_EPS: f64 = 1e-12;

/// Plane `normal · p + d = 0` with a unit normal.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub d: f64,
}

impl Plane {
    /// Plane through three points; `None` when they are (nearly) collinear.
    pub fn from_points(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<Plane> {
        let n = (b - a).cross(&(c - a));
        let len = n.norm();
        if !len.is_finite() || len <= COLLINEAR_EPS {
            return None;
        }
        let normal = n / len;
        Some(Plane {
            normal,
            d: -normal.dot(&a.coords),
        })
    }

    /// Unsigned point-to-plane distance.
    #[inline]
    pub fn distance(&self, p: &Point3<f64>) -> f64 {
        (self.normal.dot(&p.coords) + self.d).abs()
    }

    /// `[A, B, C, D]` of `Ax + By + Cz + D = 0`.
    pub fn coefficients(&self) -> [f64; 4] {
        [self.normal.x, self.normal.y, self.normal.z, self.d]
    }

    /// Orthonormal in-plane axes `(u, v)`.
    pub fn basis(&self) -> (Vector3<f64>, Vector3<f64>) {
        let n = self.normal;
        let helper = if n.x.abs() <= n.y.abs() && n.x.abs() <= n.z.abs() {
            Vector3::x()
        } else if n.y.abs() <= n.z.abs() {
            Vector3::y()
        } else {
            Vector3::z()
        };
        let u = n.cross(&helper).normalize();
        let v = n.cross(&u);
        (u, v)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneSegmentParams {
    /// Gate radius around the seed (meters).
    pub tracker_threshold: f64,
    pub ransac_iterations: usize,
    /// Inlier distance to the plane (meters).
    pub ransac_threshold: f64,
    /// Fewer gated points than this is a miss.
    pub min_points: usize,
}

impl Default for PlaneSegmentParams {
    fn default() -> Self {
        Self {
            tracker_threshold: 1.0,
            ransac_iterations: 15,
            ransac_threshold: 0.1,
            min_points: 3,
        }
    }
}

impl PlaneSegmentParams {
    pub fn for_pattern(pattern: &CalibrationPattern) -> Self {
        Self {
            tracker_threshold: pattern.tracker_threshold(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tracker_threshold.is_finite() && self.tracker_threshold > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "tracker_threshold",
                reason: format!("must be positive, got {}", self.tracker_threshold),
            });
        }
        if self.ransac_iterations == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "ransac_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.ransac_threshold.is_finite() && self.ransac_threshold > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "ransac_threshold",
                reason: format!("must be positive, got {}", self.ransac_threshold),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlaneSegmentation {
    /// `idxs` are interior inliers, `idxs_limit_points` the hull of the inliers.
    pub labels: Labels,
    /// Inlier centroid, or the input seed on a miss.
    pub seed: Point3<f64>,
    /// All inlier indices in cloud order.
    pub inliers: Vec<usize>,
    pub plane: Option<Plane>,
}

impl PlaneSegmentation {
    fn miss(seed: &Point3<f64>) -> Self {
        Self {
            labels: Labels::empty(Modality::Lidar3d),
            seed: *seed,
            inliers: Vec::new(),
            plane: None,
        }
    }
}

/// Fit the pattern plane among the points within the tracker gate of `seed`.
///
/// Samples come from `rng`, so a seeded generator makes the result
/// reproducible.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(cloud, params, rng), fields(n = cloud.len()))
)]
pub fn segment_plane<R: Rng + ?Sized>(
    cloud: &[Point3<f64>],
    seed: &Point3<f64>,
    params: &PlaneSegmentParams,
    rng: &mut R,
) -> PlaneSegmentation {
    let gated: Vec<usize> = cloud
        .iter()
        .enumerate()
        .filter(|(_, p)| (*p - seed).norm() <= params.tracker_threshold)
        .map(|(i, _)| i)
        .collect();
    if gated.len() < params.min_points.max(3) {
        debug!("plane: only {} points near the seed", gated.len());
        return PlaneSegmentation::miss(seed);
    }

    let mut best: Option<(Plane, usize)> = None;
    for _ in 0..params.ransac_iterations {
        let Some(plane) = sample_plane(cloud, &gated, rng) else {
            continue;
        };
        let count = gated
            .iter()
            .filter(|&&i| plane.distance(&cloud[i]) < params.ransac_threshold)
            .count();
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((plane, count));
        }
    }
    let Some((plane, _)) = best else {
        warn!("plane: every sample of {} gated points was collinear", gated.len());
        return PlaneSegmentation::miss(seed);
    };

    let inliers: Vec<usize> = gated
        .iter()
        .copied()
        .filter(|&i| plane.distance(&cloud[i]) < params.ransac_threshold)
        .collect();

    let mut centroid = Vector3::zeros();
    for &i in &inliers {
        centroid += cloud[i].coords;
    }
    let centroid = Point3::from(centroid / inliers.len() as f64);

    let (u, v) = plane.basis();
    let projected: Vec<Point2<f64>> = inliers
        .iter()
        .map(|&i| {
            let q = cloud[i] - centroid;
            Point2::new(q.dot(&u), q.dot(&v))
        })
        .collect();
    let hull = convex_hull_indices(&projected);
    let mut on_hull = vec![false; inliers.len()];
    for &k in &hull {
        on_hull[k] = true;
    }
    let limit: Vec<usize> = hull.iter().map(|&k| inliers[k]).collect();
    let interior: Vec<usize> = inliers
        .iter()
        .zip(&on_hull)
        .filter(|&(_, &h)| !h)
        .map(|(&i, _)| i)
        .collect();

    debug!(
        "plane: {} gated, {} inliers, {} limit points",
        gated.len(),
        inliers.len(),
        limit.len()
    );
    PlaneSegmentation {
        labels: Labels {
            detected: true,
            idxs: LabelIdxs::Indices(interior),
            idxs_limit_points: Some(limit),
        },
        seed: centroid,
        inliers,
        plane: Some(plane),
    }
}

fn sample_plane<R: Rng + ?Sized>(cloud: &[Point3<f64>], gated: &[usize], rng: &mut R) -> Option<Plane> {
    for _ in 0..MAX_SAMPLE_ATTEMPTS {
        let pick = rand::seq::index::sample(rng, gated.len(), 3);
        let [a, b, c] = [pick.index(0), pick.index(1), pick.index(2)].map(|k| &cloud[gated[k]]);
        if let Some(plane) = Plane::from_points(a, b, c) {
            return Some(plane);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn plane_through_points_has_unit_normal() {
        let p = Plane::from_points(
            &Point3::new(0.0, 0.0, 1.0),
            &Point3::new(1.0, 0.0, 1.0),
            &Point3::new(0.0, 1.0, 1.0),
        )
        .expect("plane");
        assert_relative_eq!(p.normal.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.distance(&Point3::new(3.0, -2.0, 1.5)), 0.5, epsilon = 1e-12);
        let [a, b, c, d] = p.coefficients();
        assert_relative_eq!(a * 2.0 + b * 5.0 + c + d, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn collinear_points_have_no_plane() {
        assert!(Plane::from_points(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 1.0, 1.0),
            &Point3::new(2.0, 2.0, 2.0),
        )
        .is_none());
    }

    #[test]
    fn basis_is_orthonormal() {
        let plane = Plane {
            normal: Vector3::new(1.0, 2.0, 3.0).normalize(),
            d: 0.3,
        };
        let (u, v) = plane.basis();
        assert_relative_eq!(u.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(u.dot(&v), 0.0, epsilon = 1e-12);
        assert_relative_eq!(u.dot(&plane.normal), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn collinear_cloud_is_a_miss() {
        let cloud: Vec<Point3<f64>> = (0..10).map(|i| Point3::new(i as f64 * 0.05, 0.0, 0.0)).collect();
        let seed = Point3::new(0.2, 0.0, 0.0);
        let mut rng = StdRng::seed_from_u64(1);
        let out = segment_plane(&cloud, &seed, &PlaneSegmentParams::default(), &mut rng);
        assert!(!out.labels.detected);
        assert_eq!(out.seed, seed);
    }

    #[test]
    fn zero_iterations_are_rejected() {
        let params = PlaneSegmentParams {
            ransac_iterations: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
        PlaneSegmentParams::default().validate().expect("valid");
    }
}
