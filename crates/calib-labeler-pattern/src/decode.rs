//! Marker decoding inside one board square.

use crate::homography::homography_from_4pt;
use crate::matcher::{Match, Matcher};
use crate::threshold::otsu_threshold;
use calib_labeler_core::{sample_bilinear, GrayImageView};
use nalgebra::Point2;

/// Decode the marker centered in the square with image corners `quad`
/// (TL, TR, BR, BL in grid order).
///
/// The marker covers `marker_size_rel` of the square side and carries a
/// one-cell black border around `n × n` inner bits.
pub fn decode_marker_in_square(
    img: &GrayImageView<'_>,
    quad: &[Point2<f32>; 4],
    marker_size_rel: f32,
    min_border_score: f32,
    matcher: &Matcher,
) -> Option<Match> {
    let unit = [
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(0.0, 1.0),
    ];
    let h = homography_from_4pt(&unit, quad)?;

    let bits = matcher.marker_size();
    let cells = bits + 2;
    let start = 0.5 * (1.0 - marker_size_rel);
    let step = marker_size_rel / cells as f32;

    let mut samples = Vec::with_capacity(cells * cells);
    for cy in 0..cells {
        for cx in 0..cells {
            let p = h.apply(Point2::new(
                start + (cx as f32 + 0.5) * step,
                start + (cy as f32 + 0.5) * step,
            ));
            if !(p.x.is_finite() && p.y.is_finite()) {
                return None;
            }
            samples.push(sample_bilinear(img, p.x, p.y).clamp(0.0, 255.0) as u8);
        }
    }

    let lo = samples.iter().copied().min().unwrap_or(0);
    let hi = samples.iter().copied().max().unwrap_or(0);
    if hi - lo < 32 {
        return None; // no contrast, no marker
    }
    let thr = otsu_threshold(&samples);
    let mut border_black = 0usize;
    let mut border_total = 0usize;
    let mut code = 0u64;
    for cy in 0..cells {
        for cx in 0..cells {
            let black = samples[cy * cells + cx] <= thr;
            if cx == 0 || cy == 0 || cx + 1 == cells || cy + 1 == cells {
                border_total += 1;
                border_black += black as usize;
            } else if black {
                code |= 1 << ((cy - 1) * bits + (cx - 1));
            }
        }
    }

    let border_score = border_black as f32 / border_total as f32;
    if border_score < min_border_score {
        return None;
    }
    matcher.match_code(code)
}
