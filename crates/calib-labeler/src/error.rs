use calib_labeler_core::{ConfigError, Modality};

#[derive(thiserror::Error, Debug)]
pub enum LabelerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("sensor '{sensor}' labels {expected} data, got a {got} frame")]
    FrameMismatch {
        sensor: String,
        expected: Modality,
        got: Modality,
    },
    #[error("sensor '{sensor}' does not take this seed ({modality} modality)")]
    SeedMismatch { sensor: String, modality: Modality },
    #[error("sensor '{0}' is busy with another frame")]
    Busy(String),
}
