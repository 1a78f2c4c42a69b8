/// Construction-time configuration errors.
///
/// These are the only failures that propagate out of a labeler; everything
/// that goes wrong while labeling a single frame is folded into the
/// per-frame [`Labels`](crate::Labels) result instead.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown modality '{0}' (expected rgb, lidar2d, lidar3d or depth)")]
    UnknownModality(String),
    #[error("unknown marker dictionary '{0}'")]
    UnknownDictionary(String),
    #[error("sensor '{sensor}' is missing required field '{field}'")]
    MissingField { sensor: String, field: &'static str },
    #[error("invalid calibration pattern: {0}")]
    InvalidPattern(String),
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}
