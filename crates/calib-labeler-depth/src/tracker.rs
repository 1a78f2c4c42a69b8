//! Seeded depth-region tracking.

use calib_labeler_core::{draw_cross, ConfigError, DepthImage, LabelIdxs, Labels, Modality};
use image::{Rgb, RgbImage};
use log::{debug, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::pyramid::{downsample, is_valid_depth};
use crate::region::{grow_region, nearest_valid, ContinuityRule, Region};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthTrackerParams {
    /// Number of 2× downsampling steps before growing.
    pub pyr_levels: u32,
    /// Seed gate margin as a fraction of each image dimension.
    pub border_fraction: f64,
    /// Interior stride in downsampled pixels.
    pub subsample_solid_points: u32,
    /// Keep every n-th boundary pixel.
    pub limit_sample_step: u32,
    pub max_depth_step: f32,
    pub max_relative_step: f32,
    pub min_region_pixels: usize,
    /// Fall back to the nearest valid pixel when the seed has no depth.
    pub scatter_seed: bool,
    pub scatter_radius: u32,
}

impl Default for DepthTrackerParams {
    fn default() -> Self {
        Self {
            pyr_levels: 1,
            border_fraction: 0.025,
            subsample_solid_points: 3,
            limit_sample_step: 1,
            max_depth_step: 0.05,
            max_relative_step: 0.02,
            min_region_pixels: 25,
            scatter_seed: true,
            scatter_radius: 5,
        }
    }
}

impl DepthTrackerParams {
    /// Full-resolution pixels per downsampled pixel.
    #[inline]
    pub fn scale(&self) -> u32 {
        1 << self.pyr_levels
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pyr_levels > 8 {
            return Err(ConfigError::InvalidParameter {
                name: "pyr_levels",
                reason: format!("at most 8 levels, got {}", self.pyr_levels),
            });
        }
        if !(0.0..0.5).contains(&self.border_fraction) {
            return Err(ConfigError::InvalidParameter {
                name: "border_fraction",
                reason: format!("must be in [0, 0.5), got {}", self.border_fraction),
            });
        }
        if self.subsample_solid_points == 0 || self.limit_sample_step == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "subsample_solid_points",
                reason: "sampling steps must be at least 1".to_string(),
            });
        }
        if !(self.max_depth_step >= 0.0 && self.max_relative_step >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "max_depth_step",
                reason: "depth steps must be non-negative".to_string(),
            });
        }
        Ok(())
    }

    fn rule(&self) -> ContinuityRule {
        ContinuityRule {
            max_step: self.max_depth_step,
            max_relative_step: self.max_relative_step,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DepthTracking {
    /// Interior samples in `idxs`, boundary samples in `idxs_limit_points`,
    /// both as full-resolution linear indices.
    pub labels: Labels,
    /// Region centroid in full-resolution pixels, or the input seed on a miss.
    pub candidate: Point2<f64>,
    /// `candidate` after [`gate_seed`].
    pub seed: Point2<f64>,
    /// Downsampled depth with the region overlay.
    pub debug_image: RgbImage,
    pub region_pixels: usize,
}

/// Accept `candidate` if it lies strictly inside the image shrunk by
/// `border_fraction` on every side, otherwise return the image center.
pub fn gate_seed(
    candidate: Point2<f64>,
    width: u32,
    height: u32,
    border_fraction: f64,
) -> Point2<f64> {
    let (w, h) = (width as f64, height as f64);
    let (mx, my) = (border_fraction * w, border_fraction * h);
    let inside =
        candidate.x > mx && candidate.x < w - mx && candidate.y > my && candidate.y < h - my;
    if inside {
        candidate
    } else {
        Point2::new((w / 2.0).round(), (h / 2.0).round())
    }
}

/// Grow the pattern region around `seed` and propose the next seed.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(depth, params), fields(width = depth.width(), height = depth.height()))
)]
pub fn track_depth(
    depth: &DepthImage,
    seed: &Point2<f64>,
    params: &DepthTrackerParams,
) -> DepthTracking {
    let (full_w, full_h) = depth.dimensions();
    let scale = params.scale();
    let small = downsample(depth, params.pyr_levels);
    let to_small = |v: f64| ((v + 0.5) / scale as f64).floor();
    let to_full = |v: f64| (v + 0.5) * scale as f64 - 0.5;

    let (sx, sy) = (to_small(seed.x), to_small(seed.y));
    let in_bounds =
        sx >= 0.0 && sy >= 0.0 && sx < small.width() as f64 && sy < small.height() as f64;
    let mut start = in_bounds.then_some((sx as u32, sy as u32));
    if let Some(p) = start {
        if params.scatter_seed && !is_valid_depth(small.get_pixel(p.0, p.1)[0]) {
            start = nearest_valid(&small, p, params.scatter_radius);
        }
    }

    let region = match start {
        Some(p) => grow_region(&small, p, &params.rule()),
        None => Region::empty(small.width(), small.height()),
    };

    let found = region.pixels.len() >= params.min_region_pixels.max(1);
    let (labels, candidate) = match region.centroid() {
        Some((cx, cy)) if found => (
            region_labels(&region, params, scale, full_w),
            Point2::new(to_full(cx), to_full(cy)),
        ),
        _ => {
            debug!("depth: region of {} pixels is too small", region.pixels.len());
            (Labels::empty(Modality::Depth), *seed)
        }
    };

    let gated = gate_seed(candidate, full_w, full_h, params.border_fraction);
    if gated != candidate {
        warn!(
            "depth: seed ({:.1}, {:.1}) outside the border gate, reset to center",
            candidate.x, candidate.y
        );
    }

    let mut debug_image = render_debug(&small, &region, params);
    draw_cross(
        &mut debug_image,
        ((gated.x + 0.5) / scale as f64 - 0.5) as f32,
        ((gated.y + 0.5) / scale as f64 - 0.5) as f32,
        4,
        Rgb([0, 128, 255]),
    );

    DepthTracking {
        labels,
        candidate,
        seed: gated,
        debug_image,
        region_pixels: region.pixels.len(),
    }
}

fn region_labels(
    region: &Region,
    params: &DepthTrackerParams,
    scale: u32,
    full_w: u32,
) -> Labels {
    let stride = params.subsample_solid_points;
    let full_index = |x: u32, y: u32| {
        let fx = x * scale + scale / 2;
        let fy = y * scale + scale / 2;
        fy as usize * full_w as usize + fx as usize
    };

    let mut interior = Vec::new();
    let mut limit = Vec::new();
    let mut boundary_seen = 0u32;
    for &(x, y) in &region.pixels {
        if region.is_boundary(x, y) {
            if boundary_seen % params.limit_sample_step == 0 {
                limit.push(full_index(x, y));
            }
            boundary_seen += 1;
        } else if x % stride == 0 && y % stride == 0 {
            interior.push(full_index(x, y));
        }
    }
    Labels {
        detected: true,
        idxs: LabelIdxs::Indices(interior),
        idxs_limit_points: Some(limit),
    }
}

fn render_debug(small: &DepthImage, region: &Region, params: &DepthTrackerParams) -> RgbImage {
    let (lo, hi) = small
        .pixels()
        .map(|p| p[0])
        .filter(|&d| is_valid_depth(d))
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), d| (lo.min(d), hi.max(d)));
    let range = (hi - lo).max(1e-6);

    let mut out = RgbImage::from_fn(small.width(), small.height(), |x, y| {
        let d = small.get_pixel(x, y)[0];
        if !is_valid_depth(d) {
            return Rgb([0, 0, 0]);
        }
        let g = (255.0 * (1.0 - (d - lo) / range)).clamp(0.0, 255.0) as u8;
        if region.contains(x as i64, y as i64) {
            Rgb([g / 2, 128 + g / 2, g / 2])
        } else {
            Rgb([g, g, g])
        }
    });
    let mut boundary_seen = 0u32;
    for &(x, y) in &region.pixels {
        if region.is_boundary(x, y) {
            if boundary_seen % params.limit_sample_step == 0 {
                out.put_pixel(x, y, Rgb([255, 0, 0]));
            }
            boundary_seen += 1;
        }
    }
    out
}
