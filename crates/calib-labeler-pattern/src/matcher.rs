//! Dictionary matching and rotation helpers.

use crate::Dictionary;

/// A dictionary match for an observed marker code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub id: u32,
    /// Rotation `0..=3` with `observed == rotate(dict_code, rotation)`.
    pub rotation: u8,
    pub hamming: u8,
}

/// Brute-force matcher over all ids and the four rotations.
#[derive(Clone, Debug)]
pub struct Matcher {
    marker_size: usize,
    max_hamming: u8,
    rotated: Vec<[u64; 4]>,
}

impl Matcher {
    /// `dict` must have passed [`Dictionary::validate`].
    pub fn new(dict: &Dictionary, max_hamming: u8) -> Self {
        let n = dict.marker_size;
        let rotated = dict
            .codes
            .iter()
            .map(|&code| [0, 1, 2, 3].map(|rot| rotate_code_u64(code, n, rot)))
            .collect();
        Self {
            marker_size: n,
            max_hamming,
            rotated,
        }
    }

    #[inline]
    pub fn marker_size(&self) -> usize {
        self.marker_size
    }

    /// Best match within `max_hamming`; the lowest id wins ties.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        let mut best: Option<Match> = None;
        for (id, rots) in self.rotated.iter().enumerate() {
            for (rot, &cand) in rots.iter().enumerate() {
                let h = (observed ^ cand).count_ones() as u8;
                if h > self.max_hamming || best.is_some_and(|b| b.hamming <= h) {
                    continue;
                }
                best = Some(Match {
                    id: id as u32,
                    rotation: rot as u8,
                    hamming: h,
                });
                if h == 0 {
                    return best;
                }
            }
        }
        best
    }
}

/// Rotate a row-major `n × n` code (`idx = y * n + x`) by `rot` quarter turns.
pub fn rotate_code_u64(code: u64, n: usize, rot: u8) -> u64 {
    let rot = rot & 3;
    if rot == 0 {
        return code;
    }
    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            let (sx, sy) = match rot {
                1 => (y, n - 1 - x),
                2 => (n - 1 - x, n - 1 - y),
                _ => (n - 1 - y, x),
            };
            out |= ((code >> (sy * n + sx)) & 1) << (y * n + x);
        }
    }
    out
}
