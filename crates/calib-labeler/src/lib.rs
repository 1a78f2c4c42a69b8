//! Per-sensor calibration pattern labeling.
//!
//! A [`SensorLabeler`] owns one sensor's configuration, its last frame and
//! the seed carried between frames. Each incoming [`Frame`] is labeled by the
//! algorithm of the sensor's modality:
//!
//! | modality | algorithm | labels |
//! |---|---|---|
//! | `rgb` | chessboard / ChArUco keypoints | keypoints (with ids for ChArUco) |
//! | `lidar2d` | range clustering, nearest cluster to the seed | scan indices |
//! | `lidar3d` | seed-gated RANSAC plane | cloud indices + hull limit points |
//! | `depth` | seeded region growing | pixel indices + boundary limit points |
//!
//! Passes of one labeler are serialized; separate labelers are independent
//! and can run on separate threads.
//!
//! ```no_run
//! use calib_labeler::{Frame, LabelerConfig, SensorData, SensorLabeler};
//!
//! # fn main() -> Result<(), calib_labeler::LabelerError> {
//! let config = LabelerConfig::load_json("front_camera.json")?;
//! let labeler = SensorLabeler::new(config)?;
//! let image = image::RgbImage::new(640, 480);
//! let out = labeler.process_frame(Frame::new(0.0, "camera", SensorData::Image(image)))?;
//! println!("detected: {}", out.labels.detected);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod labeler;
mod pipeline;
mod publisher;

pub use config::{CloudParams, LabelerConfig, LabelerParams};
pub use error::LabelerError;
pub use labeler::{LabelerPhase, LabelingOutput, SensorLabeler};
pub use pipeline::{PassDetails, DEFAULT_LIDAR3D_MARKER};
pub use publisher::{LabelPublisher, NoopPublisher};

pub use calib_labeler_core::{
    CalibrationPattern, CameraIntrinsics, ConfigError, DepthImage, Frame, GridDimension, Keypoint,
    LabelIdxs, Labels, LaserScan, Modality, PatternKind, PointCloud, Seed, SensorData,
    SensorDescriptor,
};
pub use calib_labeler_depth::DepthTrackerParams;
pub use calib_labeler_lidar::{PlaneSegmentParams, ScanClusterParams};
pub use calib_labeler_pattern::{Dictionary, PatternDetectorParams};

pub use calib_labeler_core as core;
pub use calib_labeler_depth as depth;
pub use calib_labeler_lidar as lidar;
pub use calib_labeler_pattern as pattern;
