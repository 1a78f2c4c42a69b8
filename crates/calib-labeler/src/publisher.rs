//! Result publication seam towards the transport and visualization layers.

use calib_labeler_core::{Labels, Seed};
use image::RgbImage;

/// Receives the results of each labeling pass.
///
/// Called from inside the labeler's critical section, so implementations
/// should hand data off quickly (e.g. into a channel).
pub trait LabelPublisher: Send + Sync {
    fn publish_labels(&self, sensor: &str, stamp: f64, frame_id: &str, labels: &Labels);

    /// Annotated image for rgb and depth sensors.
    fn publish_debug_image(&self, _sensor: &str, _stamp: f64, _frame_id: &str, _image: &RgbImage) {}

    /// Updated marker/seed after a pass.
    fn publish_seed(&self, _sensor: &str, _seed: &Seed) {}
}

/// Drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPublisher;

impl LabelPublisher for NoopPublisher {
    fn publish_labels(&self, _sensor: &str, _stamp: f64, _frame_id: &str, _labels: &Labels) {}
}
