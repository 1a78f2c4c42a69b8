use std::fmt;
use std::str::FromStr;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Sensing mode of a stream; selects the labeling algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", rename_all = "lowercase")]
pub enum Modality {
    Rgb,
    Lidar2d,
    Lidar3d,
    Depth,
}

impl Modality {
    pub const ALL: [Modality; 4] = [
        Modality::Rgb,
        Modality::Lidar2d,
        Modality::Lidar3d,
        Modality::Depth,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Modality::Rgb => "rgb",
            Modality::Lidar2d => "lidar2d",
            Modality::Lidar3d => "lidar3d",
            Modality::Depth => "depth",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Modality::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownModality(s.to_string()))
    }
}

impl TryFrom<String> for Modality {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Pinhole camera parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub width: u32,
    pub height: u32,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Image center `(round(w/2), round(h/2))`, the default pixel seed.
    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            (self.width as f64 / 2.0).round(),
            (self.height as f64 / 2.0).round(),
        )
    }
}

/// Immutable per-sensor configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    pub name: String,
    /// Parent coordinate frame of the sensor.
    #[serde(default)]
    pub parent: String,
    /// Topic the sensor's frames arrive on.
    #[serde(default)]
    pub topic: String,
    pub modality: Modality,
    /// Required for `depth`; optional elsewhere.
    #[serde(default)]
    pub camera_info: Option<CameraIntrinsics>,
}

impl SensorDescriptor {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingField {
                sensor: self.name.clone(),
                field: "name",
            });
        }
        if self.modality == Modality::Depth {
            match &self.camera_info {
                Some(info) if info.width > 0 && info.height > 0 => {}
                _ => {
                    return Err(ConfigError::MissingField {
                        sensor: self.name.clone(),
                        field: "camera_info",
                    })
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(modality: Modality) -> SensorDescriptor {
        SensorDescriptor {
            name: "sensor".to_string(),
            parent: "base_link".to_string(),
            topic: "/sensor/data".to_string(),
            modality,
            camera_info: None,
        }
    }

    #[test]
    fn modality_parses_known_names() {
        for m in Modality::ALL {
            assert_eq!(m.as_str().parse::<Modality>(), Ok(m));
        }
    }

    #[test]
    fn unknown_modality_is_a_config_error() {
        assert_eq!(
            "thermal".parse::<Modality>(),
            Err(ConfigError::UnknownModality("thermal".to_string()))
        );
        let err = serde_json::from_str::<Modality>("\"radar\"").unwrap_err();
        assert!(err.to_string().contains("radar"), "{err}");
    }

    #[test]
    fn modality_serializes_lowercase() {
        let json = serde_json::to_string(&Modality::Lidar3d).expect("serialize");
        assert_eq!(json, "\"lidar3d\"");
    }

    #[test]
    fn depth_requires_camera_info() {
        let mut d = descriptor(Modality::Depth);
        assert!(matches!(
            d.validate(),
            Err(ConfigError::MissingField {
                field: "camera_info",
                ..
            })
        ));
        d.camera_info = Some(CameraIntrinsics {
            width: 640,
            height: 480,
            fx: 525.0,
            fy: 525.0,
            cx: 319.5,
            cy: 239.5,
        });
        assert!(d.validate().is_ok());
        assert_eq!(
            d.camera_info.as_ref().map(|c| c.center()),
            Some(Point2::new(320.0, 240.0))
        );
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut d = descriptor(Modality::Lidar2d);
        d.name = "  ".to_string();
        assert!(d.validate().is_err());
    }
}
