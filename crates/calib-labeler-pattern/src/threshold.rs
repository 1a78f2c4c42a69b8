//! Global intensity statistics: Otsu threshold and histogram equalization.

use image::GrayImage;

fn histogram<'a>(samples: impl IntoIterator<Item = &'a u8>) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    hist
}

/// Otsu threshold; values `<= t` form the dark class.
pub(crate) fn otsu_threshold(samples: &[u8]) -> u8 {
    let (Some(&min_v), Some(&max_v)) = (samples.iter().min(), samples.iter().max()) else {
        return 127;
    };
    if min_v == max_v {
        return min_v;
    }
    let hist = histogram(samples);
    if hist.iter().filter(|&&h| h > 0).count() <= 2 {
        return ((min_v as u16 + max_v as u16) / 2) as u8;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;
    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }
        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;
        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }
    best_t
}

/// Global histogram equalization.
pub fn equalize_histogram(img: &GrayImage) -> GrayImage {
    let hist = histogram(img.as_raw());
    let total = img.as_raw().len() as u64;
    let mut cdf = [0u64; 256];
    let mut acc = 0u64;
    for (c, &h) in cdf.iter_mut().zip(hist.iter()) {
        acc += h as u64;
        *c = acc;
    }
    let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);
    let denom = total.saturating_sub(cdf_min);
    if denom == 0 {
        return img.clone();
    }
    let lut: Vec<u8> = cdf
        .iter()
        .map(|&c| ((c.saturating_sub(cdf_min) * 255 + denom / 2) / denom) as u8)
        .collect();
    let mut out = img.clone();
    for p in out.iter_mut() {
        *p = lut[*p as usize];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otsu_splits_two_clusters() {
        let mut samples = vec![20u8, 22, 25, 30, 28];
        samples.extend([200u8, 210, 205, 220, 215]);
        let t = otsu_threshold(&samples);
        assert!((30..200).contains(&t), "{t}");
    }

    #[test]
    fn binary_samples_use_midpoint() {
        assert_eq!(otsu_threshold(&[0, 255, 0, 255]), 127);
        assert_eq!(otsu_threshold(&[]), 127);
        assert_eq!(otsu_threshold(&[9, 9]), 9);
    }

    #[test]
    fn equalization_stretches_narrow_range() {
        let img = GrayImage::from_raw(4, 1, vec![100, 101, 102, 103]).expect("size");
        let eq = equalize_histogram(&img);
        assert_eq!(eq.as_raw(), &vec![0, 85, 170, 255]);
    }

    #[test]
    fn equalization_keeps_flat_image() {
        let img = GrayImage::from_pixel(3, 3, image::Luma([77]));
        assert_eq!(equalize_histogram(&img), img);
    }
}
