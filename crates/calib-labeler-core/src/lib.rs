//! Core types shared by the per-sensor calibration labelers.
//!
//! This crate holds the data model (sensor descriptors, pattern geometry,
//! frame payloads, seeds, label results) and a few raster helpers. It does
//! not run any detection itself; the algorithms live in the pattern, lidar and depth
//! crates and the `calib-labeler` facade ties them together.

mod error;
mod frame;
mod labels;
mod logger;
mod pattern;
mod raster;
mod sensor;

pub use error::ConfigError;
pub use frame::{DepthImage, Frame, LaserScan, PointCloud, SensorData};
pub use labels::{Keypoint, LabelIdxs, Labels, Seed};
pub use pattern::{CalibrationPattern, GridDimension, PatternKind};
pub use raster::{draw_cross, gray_from_rgb, sample_bilinear, GrayImageView};
pub use sensor::{CameraIntrinsics, Modality, SensorDescriptor};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
