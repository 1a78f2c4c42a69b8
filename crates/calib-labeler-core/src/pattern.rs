use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Number of board squares along x and y.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDimension {
    pub x: u32,
    pub y: u32,
}

/// Pattern family.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern_type", rename_all = "lowercase")]
pub enum PatternKind {
    Chessboard,
    Charuco {
        /// Marker side in meters.
        inner_size: f64,
        /// Marker dictionary name, e.g. `DICT_ARUCO_ORIGINAL`.
        dictionary: String,
    },
}

/// Geometry of a flat calibration target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPattern {
    pub dimension: GridDimension,
    /// Square side in meters.
    pub size: f64,
    #[serde(flatten)]
    pub kind: PatternKind,
}

impl CalibrationPattern {
    pub fn chessboard(x: u32, y: u32, size: f64) -> Self {
        Self {
            dimension: GridDimension { x, y },
            size,
            kind: PatternKind::Chessboard,
        }
    }

    pub fn charuco(x: u32, y: u32, size: f64, inner_size: f64, dictionary: &str) -> Self {
        Self {
            dimension: GridDimension { x, y },
            size,
            kind: PatternKind::Charuco {
                inner_size,
                dictionary: dictionary.to_string(),
            },
        }
    }

    /// Inner corner grid `(x-1, y-1)`.
    pub fn inner_corners(&self) -> (u32, u32) {
        (
            self.dimension.x.saturating_sub(1),
            self.dimension.y.saturating_sub(1),
        )
    }

    /// Gate radius used when tracking the pattern in a point cloud:
    /// 80% of the inner corner grid diagonal.
    pub fn tracker_threshold(&self) -> f64 {
        let (cx, cy) = self.inner_corners();
        let w = cx as f64 * self.size;
        let h = cy as f64 * self.size;
        0.8 * (w * w + h * h).sqrt()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let GridDimension { x, y } = self.dimension;
        if x < 3 || y < 3 {
            return Err(ConfigError::InvalidPattern(format!(
                "need at least 3x3 squares, got {x}x{y}"
            )));
        }
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(ConfigError::InvalidPattern(format!(
                "square size must be positive, got {}",
                self.size
            )));
        }
        if let PatternKind::Charuco { inner_size, .. } = &self.kind {
            if !(inner_size.is_finite() && *inner_size > 0.0 && *inner_size < self.size) {
                return Err(ConfigError::InvalidPattern(format!(
                    "marker size {inner_size} must be in (0, {})",
                    self.size
                )));
            }
        }
        Ok(())
    }
}
