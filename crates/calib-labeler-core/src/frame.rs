use image::{ImageBuffer, Luma, RgbImage};
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

use crate::Modality;

/// Single-channel depth in meters; `<= 0` or non-finite means no return.
pub type DepthImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Planar range scan; reading `i` lies at `angle_min + i * angle_increment`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaserScan {
    #[serde(default)]
    pub angle_min: f64,
    pub angle_increment: f64,
    pub ranges: Vec<f32>,
}

impl LaserScan {
    pub fn angle(&self, idx: usize) -> f64 {
        self.angle_min + idx as f64 * self.angle_increment
    }

    /// Cartesian position of reading `idx` in the scan plane.
    pub fn point(&self, idx: usize) -> Point2<f64> {
        let r = self.ranges[idx] as f64;
        let a = self.angle(idx);
        Point2::new(r * a.cos(), r * a.sin())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub points: Vec<Point3<f64>>,
}

/// Modality-specific payload of one frame.
#[derive(Clone, Debug)]
pub enum SensorData {
    Image(RgbImage),
    Scan(LaserScan),
    Cloud(PointCloud),
    Depth(DepthImage),
}

impl SensorData {
    /// Modality this payload belongs to.
    pub fn modality(&self) -> Modality {
        match self {
            SensorData::Image(_) => Modality::Rgb,
            SensorData::Scan(_) => Modality::Lidar2d,
            SensorData::Cloud(_) => Modality::Lidar3d,
            SensorData::Depth(_) => Modality::Depth,
        }
    }
}

/// One received sensor message.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Acquisition time in seconds.
    pub stamp: f64,
    pub frame_id: String,
    pub data: SensorData,
}

impl Frame {
    pub fn new(stamp: f64, frame_id: impl Into<String>, data: SensorData) -> Self {
        Self {
            stamp,
            frame_id: frame_id.into(),
            data,
        }
    }
}
