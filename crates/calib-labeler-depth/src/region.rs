use std::collections::VecDeque;

use calib_labeler_core::DepthImage;

use crate::pyramid::is_valid_depth;

const NEIGHBORS_4: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Depth continuity rule between neighboring pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContinuityRule {
    /// Absolute step in meters.
    pub max_step: f32,
    /// Step relative to the current pixel depth.
    pub max_relative_step: f32,
}

impl ContinuityRule {
    #[inline]
    pub fn accepts(&self, from: f32, to: f32) -> bool {
        is_valid_depth(to) && (to - from).abs() <= self.max_step.max(self.max_relative_step * from)
    }
}

/// Connected region grown from one pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub width: u32,
    pub height: u32,
    /// Row-major membership mask.
    pub mask: Vec<bool>,
    /// Member pixels in raster order.
    pub pixels: Vec<(u32, u32)>,
}

impl Region {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            mask: vec![false; width as usize * height as usize],
            pixels: Vec::new(),
        }
    }

    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0
            && y >= 0
            && x < self.width as i64
            && y < self.height as i64
            && self.mask[y as usize * self.width as usize + x as usize]
    }

    /// A member is on the boundary when one of its 4-neighbors is not.
    pub fn is_boundary(&self, x: u32, y: u32) -> bool {
        NEIGHBORS_4
            .iter()
            .any(|&(dx, dy)| !self.contains(x as i64 + dx, y as i64 + dy))
    }

    /// Mean pixel position.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.pixels.is_empty() {
            return None;
        }
        let n = self.pixels.len() as f64;
        let (sx, sy) = self
            .pixels
            .iter()
            .fold((0.0, 0.0), |(ax, ay), &(x, y)| (ax + x as f64, ay + y as f64));
        Some((sx / n, sy / n))
    }
}

/// 4-connected breadth-first growth from `seed`. An invalid seed yields an
/// empty region.
pub fn grow_region(depth: &DepthImage, seed: (u32, u32), rule: &ContinuityRule) -> Region {
    let (w, h) = depth.dimensions();
    let mut mask = vec![false; w as usize * h as usize];
    let (sx, sy) = seed;
    let seeded = sx < w && sy < h && is_valid_depth(depth.get_pixel(sx, sy)[0]);
    if seeded {
        mask[sy as usize * w as usize + sx as usize] = true;
        let mut queue = VecDeque::from([(sx, sy)]);
        while let Some((x, y)) = queue.pop_front() {
            let d = depth.get_pixel(x, y)[0];
            for (dx, dy) in NEIGHBORS_4 {
                let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                    continue;
                }
                let (nx, ny) = (nx as u32, ny as u32);
                let k = ny as usize * w as usize + nx as usize;
                if !mask[k] && rule.accepts(d, depth.get_pixel(nx, ny)[0]) {
                    mask[k] = true;
                    queue.push_back((nx, ny));
                }
            }
        }
    }

    let pixels = mask
        .iter()
        .enumerate()
        .filter(|&(_, &m)| m)
        .map(|(k, _)| ((k % w as usize) as u32, (k / w as usize) as u32))
        .collect();
    Region {
        width: w,
        height: h,
        mask,
        pixels,
    }
}

/// Nearest valid pixel to `seed` within `radius` (Chebyshev window), first
/// in raster order on ties.
pub fn nearest_valid(depth: &DepthImage, seed: (u32, u32), radius: u32) -> Option<(u32, u32)> {
    let (w, h) = depth.dimensions();
    let (sx, sy) = (seed.0 as i64, seed.1 as i64);
    let r = radius as i64;
    let mut best: Option<((u32, u32), i64)> = None;
    for y in (sy - r).max(0)..=(sy + r).min(h as i64 - 1) {
        for x in (sx - r).max(0)..=(sx + r).min(w as i64 - 1) {
            if !is_valid_depth(depth.get_pixel(x as u32, y as u32)[0]) {
                continue;
            }
            let d2 = (x - sx).pow(2) + (y - sy).pow(2);
            if best.map_or(true, |(_, b)| d2 < b) {
                best = Some(((x as u32, y as u32), d2));
            }
        }
    }
    best.map(|(p, _)| p)
}
