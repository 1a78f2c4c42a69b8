//! X-corner detection through `chess-corners`.

use chess_corners::{find_chess_corners_image, ChessConfig, CornerDescriptor};
use image::GrayImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Serializable subset of the ChESS detector settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChessParams {
    /// Keep responses above this fraction of the image maximum.
    pub threshold_rel: f32,
    /// Non-maximum suppression radius in pixels.
    pub nms_radius: u32,
}

impl Default for ChessParams {
    fn default() -> Self {
        Self {
            threshold_rel: 0.2,
            nms_radius: 2,
        }
    }
}

impl ChessParams {
    pub fn chess_config(&self) -> ChessConfig {
        let mut cfg = ChessConfig::single_scale();
        cfg.params.threshold_rel = self.threshold_rel;
        cfg.params.nms_radius = self.nms_radius;
        cfg
    }
}

/// A detected X-corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChessCorner {
    /// Sub-pixel position, pixel centers at integer coordinates.
    pub position: Point2<f32>,
    /// Direction of the bright diagonal, modulo π.
    pub orientation: f32,
    pub strength: f32,
}

impl From<&CornerDescriptor> for ChessCorner {
    fn from(c: &CornerDescriptor) -> Self {
        Self {
            position: Point2::new(c.x, c.y),
            orientation: c.orientation,
            strength: c.response,
        }
    }
}

#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(img, params), fields(width = img.width(), height = img.height()))
)]
pub fn detect_corners(img: &GrayImage, params: &ChessParams) -> Vec<ChessCorner> {
    let corners: Vec<ChessCorner> = find_chess_corners_image(img, &params.chess_config())
        .iter()
        .map(ChessCorner::from)
        .collect();
    log::debug!("chess: {} corners", corners.len());
    corners
}
