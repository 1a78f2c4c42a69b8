use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

use crate::Modality;

/// A sub-pixel image corner, optionally carrying its board corner id.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
}

/// Labeled data: indices into the frame's points/pixels, or image keypoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelIdxs {
    Indices(Vec<usize>),
    Keypoints(Vec<Keypoint>),
}

impl LabelIdxs {
    pub fn len(&self) -> usize {
        match self {
            LabelIdxs::Indices(v) => v.len(),
            LabelIdxs::Keypoints(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn indices(&self) -> Option<&[usize]> {
        match self {
            LabelIdxs::Indices(v) => Some(v),
            LabelIdxs::Keypoints(_) => None,
        }
    }

    pub fn keypoints(&self) -> Option<&[Keypoint]> {
        match self {
            LabelIdxs::Keypoints(v) => Some(v),
            LabelIdxs::Indices(_) => None,
        }
    }
}

/// Per-frame labeling result. Valid only for the frame it was computed on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Labels {
    pub detected: bool,
    pub idxs: LabelIdxs,
    /// Boundary points, reported apart from `idxs` (lidar3d and depth).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idxs_limit_points: Option<Vec<usize>>,
}

impl Labels {
    /// Negative result in the shape used by `modality`.
    pub fn empty(modality: Modality) -> Self {
        match modality {
            Modality::Rgb => Self {
                detected: false,
                idxs: LabelIdxs::Keypoints(Vec::new()),
                idxs_limit_points: None,
            },
            Modality::Lidar2d => Self {
                detected: false,
                idxs: LabelIdxs::Indices(Vec::new()),
                idxs_limit_points: None,
            },
            Modality::Lidar3d | Modality::Depth => Self {
                detected: false,
                idxs: LabelIdxs::Indices(Vec::new()),
                idxs_limit_points: Some(Vec::new()),
            },
        }
    }
}

/// Last known pattern location.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seed {
    /// Image-plane seed in full-resolution pixels.
    Pixel(Point2<f64>),
    /// Metric seed in the sensor frame.
    Position(Point3<f64>),
}

impl Seed {
    pub fn pixel(&self) -> Option<Point2<f64>> {
        match *self {
            Seed::Pixel(p) => Some(p),
            Seed::Position(_) => None,
        }
    }

    pub fn position(&self) -> Option<Point3<f64>> {
        match *self {
            Seed::Position(p) => Some(p),
            Seed::Pixel(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_serialize_in_flat_shape() {
        let labels = Labels {
            detected: true,
            idxs: LabelIdxs::Indices(vec![3, 4, 5]),
            idxs_limit_points: Some(vec![3, 5]),
        };
        let json = serde_json::to_value(&labels).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"detected": true, "idxs": [3, 4, 5], "idxs_limit_points": [3, 5]})
        );
    }

    #[test]
    fn keypoint_labels_omit_limit_points() {
        let labels = Labels {
            detected: true,
            idxs: LabelIdxs::Keypoints(vec![Keypoint {
                x: 1.5,
                y: 2.0,
                id: Some(7),
            }]),
            idxs_limit_points: None,
        };
        let json = serde_json::to_value(&labels).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"detected": true, "idxs": [{"x": 1.5, "y": 2.0, "id": 7}]})
        );
    }

    #[test]
    fn empty_labels_follow_modality_shape() {
        assert!(Labels::empty(Modality::Rgb).idxs.keypoints().is_some());
        assert!(Labels::empty(Modality::Lidar2d).idxs_limit_points.is_none());
        let depth = Labels::empty(Modality::Depth);
        assert!(!depth.detected);
        assert_eq!(depth.idxs_limit_points, Some(Vec::new()));
    }
}
