//! Distance-threshold clustering of planar range scans.

use calib_labeler_core::{ConfigError, LabelIdxs, Labels, LaserScan, Modality};
use log::debug;
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanClusterParams {
    /// Readings below this range (meters) count as "no return".
    pub min_range: f64,
    /// Maximal gap between consecutive points of one cluster (meters).
    pub distance_threshold: f64,
    /// Fraction of the selected cluster dropped from each end, in `[0, 0.5)`.
    pub trim_fraction: f64,
    /// Treat the last reading as the predecessor of the first (360° scans).
    pub wrap_predecessor: bool,
}

impl Default for ScanClusterParams {
    fn default() -> Self {
        Self {
            min_range: 0.3,
            distance_threshold: 0.2,
            trim_fraction: 0.0,
            wrap_predecessor: false,
        }
    }
}

impl ScanClusterParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_range.is_finite() && self.min_range >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "min_range",
                reason: format!("must be finite and >= 0, got {}", self.min_range),
            });
        }
        if !(self.distance_threshold.is_finite() && self.distance_threshold > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "distance_threshold",
                reason: format!("must be positive, got {}", self.distance_threshold),
            });
        }
        if !(0.0..0.5).contains(&self.trim_fraction) {
            return Err(ConfigError::InvalidParameter {
                name: "trim_fraction",
                reason: format!("must be in [0, 0.5), got {}", self.trim_fraction),
            });
        }
        Ok(())
    }
}

/// Consecutive scan readings closer than the distance threshold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanCluster {
    pub id: usize,
    /// Range-array indices in scan order.
    pub indices: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScanClustering {
    pub labels: Labels,
    /// Centroid of the selected cluster (z = 0), or the input seed on a miss.
    pub seed: Point3<f64>,
    /// Full partition of the valid readings.
    pub clusters: Vec<ScanCluster>,
    /// Id of the cluster associated with the seed.
    pub selected: Option<usize>,
    /// Cartesian position per reading; `None` for readings without a return.
    pub points: Vec<Option<Point2<f64>>>,
}

/// Cluster `scan` and pick the cluster holding the point nearest to `seed`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(scan, params), fields(n = scan.ranges.len()))
)]
pub fn cluster_scan(
    scan: &LaserScan,
    seed: &Point3<f64>,
    params: &ScanClusterParams,
) -> ScanClustering {
    let n = scan.ranges.len();
    let valid = |i: usize| {
        let r = scan.ranges[i];
        r.is_finite() && f64::from(r) >= params.min_range
    };
    let points: Vec<Option<Point2<f64>>> = (0..n)
        .map(|i| valid(i).then(|| scan.point(i)))
        .collect();

    let mut clusters: Vec<ScanCluster> = Vec::new();
    let mut last: Option<Point2<f64>> = None;
    for (i, p) in points.iter().enumerate() {
        let Some(p) = *p else {
            continue;
        };
        let predecessor = match i {
            0 if params.wrap_predecessor && n > 1 => Some(n - 1),
            0 => None,
            _ => Some(i - 1),
        };
        if predecessor.is_some_and(|k| points[k].is_none()) {
            continue;
        }
        let split = last.map_or(true, |q| (p - q).norm() > params.distance_threshold);
        if split {
            clusters.push(ScanCluster {
                id: clusters.len(),
                indices: vec![i],
            });
        } else if let Some(current) = clusters.last_mut() {
            current.indices.push(i);
        }
        last = Some(p);
    }

    let target = Point2::new(seed.x, seed.y);
    let mut nearest: Option<(usize, f64)> = None;
    for cluster in &clusters {
        for &i in &cluster.indices {
            let Some(p) = points[i] else { continue };
            let d = (p - target).norm_squared();
            if nearest.map_or(true, |(_, best)| d < best) {
                nearest = Some((cluster.id, d));
            }
        }
    }

    let Some((selected, _)) = nearest else {
        debug!("scan: no valid readings among {n}");
        return ScanClustering {
            labels: Labels::empty(Modality::Lidar2d),
            seed: *seed,
            clusters,
            selected: None,
            points,
        };
    };

    let members = &clusters[selected].indices;
    let mut centroid = Point2::origin();
    for &i in members {
        if let Some(p) = points[i] {
            centroid += p.coords;
        }
    }
    let centroid = centroid / members.len() as f64;

    let trim = (params.trim_fraction * members.len() as f64).floor() as usize;
    let idxs = members[trim..members.len() - trim].to_vec();
    debug!(
        "scan: {} clusters, selected {} with {} points",
        clusters.len(),
        selected,
        idxs.len()
    );

    ScanClustering {
        labels: Labels {
            detected: !idxs.is_empty(),
            idxs: LabelIdxs::Indices(idxs),
            idxs_limit_points: None,
        },
        seed: Point3::new(centroid.x, centroid.y, 0.0),
        clusters,
        selected: Some(selected),
        points,
    }
}
