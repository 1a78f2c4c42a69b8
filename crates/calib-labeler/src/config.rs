//! Labeler configuration and its JSON form.

use std::fs;
use std::path::Path;

use calib_labeler_core::{CalibrationPattern, ConfigError, Modality, SensorDescriptor};
use calib_labeler_depth::DepthTrackerParams;
use calib_labeler_lidar::{PlaneSegmentParams, ScanClusterParams};
use calib_labeler_pattern::PatternDetectorParams;
use serde::{Deserialize, Serialize};

use crate::LabelerError;

/// RANSAC settings for point clouds. The gate radius defaults to the one
/// derived from the pattern size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudParams {
    pub ransac_iterations: usize,
    pub ransac_threshold: f64,
    pub min_points: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker_threshold: Option<f64>,
}

impl Default for CloudParams {
    fn default() -> Self {
        let base = PlaneSegmentParams::default();
        Self {
            ransac_iterations: base.ransac_iterations,
            ransac_threshold: base.ransac_threshold,
            min_points: base.min_points,
            tracker_threshold: None,
        }
    }
}

impl CloudParams {
    pub fn segment_params(&self, pattern: &CalibrationPattern) -> PlaneSegmentParams {
        PlaneSegmentParams {
            tracker_threshold: self
                .tracker_threshold
                .unwrap_or_else(|| pattern.tracker_threshold()),
            ransac_iterations: self.ransac_iterations,
            ransac_threshold: self.ransac_threshold,
            min_points: self.min_points,
        }
    }
}

/// Algorithm parameters; only the block of the sensor's modality is used.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelerParams {
    pub pattern: PatternDetectorParams,
    pub scan: ScanClusterParams,
    pub cloud: CloudParams,
    pub depth: DepthTrackerParams,
    /// Equalize the gray image before pattern detection.
    pub equalize_histogram: bool,
    /// Fixed RANSAC seed; OS entropy when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
    /// Initial 3D marker position for lidar sensors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_marker: Option<[f64; 3]>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelerConfig {
    pub sensor: SensorDescriptor,
    pub pattern: CalibrationPattern,
    /// `false` keeps the sensor passive: frames are received but never labeled.
    #[serde(default = "default_label_data")]
    pub label_data: bool,
    #[serde(default)]
    pub params: LabelerParams,
}

fn default_label_data() -> bool {
    true
}

impl LabelerConfig {
    pub fn new(sensor: SensorDescriptor, pattern: CalibrationPattern) -> Self {
        Self {
            sensor,
            pattern,
            label_data: true,
            params: LabelerParams::default(),
        }
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, LabelerError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), LabelerError> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        Ok(())
    }

    /// Check the descriptor, the pattern and the parameter block in use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sensor.validate()?;
        self.pattern.validate()?;
        match self.sensor.modality {
            Modality::Rgb => Ok(()),
            Modality::Lidar2d => self.params.scan.validate(),
            Modality::Lidar3d => self
                .params
                .cloud
                .segment_params(&self.pattern)
                .validate(),
            Modality::Depth => self.params.depth.validate(),
        }
    }
}
