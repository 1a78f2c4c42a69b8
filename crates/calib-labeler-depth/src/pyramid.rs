use calib_labeler_core::DepthImage;
use image::Luma;

/// `true` for a usable depth sample.
#[inline]
pub fn is_valid_depth(d: f32) -> bool {
    d.is_finite() && d > 0.0
}

/// Halve `depth` `levels` times. Each output pixel is the mean of the valid
/// samples of its 2×2 block, or 0 when none is valid; odd trailing rows and
/// columns are dropped, so images smaller than `2^levels` come out empty.
pub fn downsample(depth: &DepthImage, levels: u32) -> DepthImage {
    let mut current = depth.clone();
    for _ in 0..levels {
        let (w, h) = (current.width() / 2, current.height() / 2);
        let src = &current;
        let next = DepthImage::from_fn(w, h, |x, y| {
            let mut sum = 0.0f32;
            let mut n = 0u32;
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let d = src.get_pixel(2 * x + dx, 2 * y + dy)[0];
                if is_valid_depth(d) {
                    sum += d;
                    n += 1;
                }
            }
            Luma([if n > 0 { sum / n as f32 } else { 0.0 }])
        });
        current = next;
    }
    current
}
