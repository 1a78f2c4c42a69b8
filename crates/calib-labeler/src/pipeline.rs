//! Per-modality labeling pass.

use calib_labeler_core::{ConfigError, LabelIdxs, Labels, Modality, Seed, SensorData};
use calib_labeler_depth::{track_depth, DepthTrackerParams};
use calib_labeler_lidar::{
    cluster_scan, segment_plane, Plane, PlaneSegmentParams, ScanCluster, ScanClusterParams,
};
use calib_labeler_pattern::{draw_detection, PatternDetector};
use image::RgbImage;
use nalgebra::{Point2, Point3};
use rand::rngs::StdRng;

use crate::LabelerConfig;

/// Marker position used for 3D lidars when nothing else is configured.
pub const DEFAULT_LIDAR3D_MARKER: [f64; 3] = [0.804, 0.298, 0.409];

/// Modality-specific by-products of one pass.
#[derive(Clone, Debug, PartialEq)]
pub enum PassDetails {
    /// Passive sensor, nothing computed.
    Skipped,
    Pattern {
        markers: usize,
    },
    Scan {
        clusters: Vec<ScanCluster>,
        selected: Option<usize>,
    },
    Cloud {
        inliers: Vec<usize>,
        plane: Option<Plane>,
    },
    Depth {
        /// Region centroid before the border gate.
        candidate: Point2<f64>,
        region_pixels: usize,
    },
}

pub(crate) struct PassResult {
    pub labels: Labels,
    pub seed: Option<Seed>,
    pub debug_image: Option<RgbImage>,
    pub details: PassDetails,
}

pub(crate) enum Pipeline {
    Rgb {
        detector: PatternDetector,
        equalize_histogram: bool,
    },
    Lidar2d(ScanClusterParams),
    Lidar3d(PlaneSegmentParams),
    Depth(DepthTrackerParams),
}

impl Pipeline {
    pub(crate) fn build(config: &LabelerConfig) -> Result<Self, ConfigError> {
        let params = &config.params;
        Ok(match config.sensor.modality {
            Modality::Rgb => Pipeline::Rgb {
                detector: PatternDetector::new(&config.pattern, params.pattern.clone())?,
                equalize_histogram: params.equalize_histogram,
            },
            Modality::Lidar2d => Pipeline::Lidar2d(params.scan.clone()),
            Modality::Lidar3d => Pipeline::Lidar3d(params.cloud.segment_params(&config.pattern)),
            Modality::Depth => Pipeline::Depth(params.depth.clone()),
        })
    }

    pub(crate) fn initial_seed(config: &LabelerConfig) -> Option<Seed> {
        match config.sensor.modality {
            Modality::Rgb => None,
            Modality::Lidar2d => Some(Seed::Position(Point3::origin())),
            Modality::Lidar3d => {
                let [x, y, z] = config.params.initial_marker.unwrap_or(DEFAULT_LIDAR3D_MARKER);
                Some(Seed::Position(Point3::new(x, y, z)))
            }
            Modality::Depth => config
                .sensor
                .camera_info
                .as_ref()
                .map(|info| Seed::Pixel(info.center())),
        }
    }

    pub(crate) fn depth_scale(&self) -> Option<u32> {
        match self {
            Pipeline::Depth(params) => Some(params.scale()),
            _ => None,
        }
    }

    pub(crate) fn run(
        &self,
        data: &SensorData,
        seed: Option<Seed>,
        rng: &mut StdRng,
    ) -> PassResult {
        match (self, data) {
            (
                Pipeline::Rgb {
                    detector,
                    equalize_histogram,
                },
                SensorData::Image(image),
            ) => {
                let detection = detector.detect(image, *equalize_histogram);
                let mut debug = image.clone();
                draw_detection(&mut debug, &detection);
                PassResult {
                    labels: Labels {
                        detected: detection.detected,
                        idxs: LabelIdxs::Keypoints(detection.keypoints_with_ids()),
                        idxs_limit_points: None,
                    },
                    seed,
                    debug_image: Some(debug),
                    details: PassDetails::Pattern {
                        markers: detection.markers,
                    },
                }
            }
            (Pipeline::Lidar2d(params), SensorData::Scan(scan)) => {
                let current = seed.and_then(|s| s.position()).unwrap_or_else(Point3::origin);
                let out = cluster_scan(scan, &current, params);
                PassResult {
                    labels: out.labels,
                    seed: Some(Seed::Position(out.seed)),
                    debug_image: None,
                    details: PassDetails::Scan {
                        clusters: out.clusters,
                        selected: out.selected,
                    },
                }
            }
            (Pipeline::Lidar3d(params), SensorData::Cloud(cloud)) => {
                let current = seed.and_then(|s| s.position()).unwrap_or_else(|| {
                    let [x, y, z] = DEFAULT_LIDAR3D_MARKER;
                    Point3::new(x, y, z)
                });
                let out = segment_plane(&cloud.points, &current, params, rng);
                PassResult {
                    labels: out.labels,
                    seed: Some(Seed::Position(out.seed)),
                    debug_image: None,
                    details: PassDetails::Cloud {
                        inliers: out.inliers,
                        plane: out.plane,
                    },
                }
            }
            (Pipeline::Depth(params), SensorData::Depth(depth)) => {
                let current = seed.and_then(|s| s.pixel()).unwrap_or_else(|| {
                    Point2::new(
                        (depth.width() as f64 / 2.0).round(),
                        (depth.height() as f64 / 2.0).round(),
                    )
                });
                let out = track_depth(depth, &current, params);
                PassResult {
                    labels: out.labels,
                    seed: Some(Seed::Pixel(out.seed)),
                    debug_image: Some(out.debug_image),
                    details: PassDetails::Depth {
                        candidate: out.candidate,
                        region_pixels: out.region_pixels,
                    },
                }
            }
            // payloads are matched against the modality before a pass starts
            (pipeline, _) => PassResult {
                labels: Labels::empty(pipeline.modality()),
                seed,
                debug_image: None,
                details: PassDetails::Skipped,
            },
        }
    }

    pub(crate) fn modality(&self) -> Modality {
        match self {
            Pipeline::Rgb { .. } => Modality::Rgb,
            Pipeline::Lidar2d(_) => Modality::Lidar2d,
            Pipeline::Lidar3d(_) => Modality::Lidar3d,
            Pipeline::Depth(_) => Modality::Depth,
        }
    }
}
