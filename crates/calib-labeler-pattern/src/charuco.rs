//! ChArUco board layout and marker-to-board alignment.
//!
//! Squares are addressed by their top-left corner. Alignment works on the
//! doubled lattice, where corner `(i, j)` is `(2i, 2j)` and the center of
//! square `(sx, sy)` is `(2sx + 1, 2sy + 1)`; D4 transforms map square
//! centers to square centers there without the off-by-one a corner-based
//! rotation would introduce.

use std::collections::BTreeMap;

use crate::gridgraph::GridCorner;

/// Integer grid transform `(i', j') = (a*i + b*j, c*i + d*j)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridTransform {
    pub a: i32,
    pub b: i32,
    pub c: i32,
    pub d: i32,
}

impl GridTransform {
    pub const IDENTITY: GridTransform = GridTransform {
        a: 1,
        b: 0,
        c: 0,
        d: 1,
    };

    #[inline]
    pub fn apply(&self, i: i32, j: i32) -> [i32; 2] {
        [self.a * i + self.b * j, self.c * i + self.d * j]
    }
}

/// The dihedral group of the square: rotations first, then reflections.
pub const GRID_TRANSFORMS_D4: [GridTransform; 8] = [
    GridTransform::IDENTITY,
    GridTransform { a: 0, b: -1, c: 1, d: 0 },
    GridTransform { a: -1, b: 0, c: 0, d: -1 },
    GridTransform { a: 0, b: 1, c: -1, d: 0 },
    GridTransform { a: -1, b: 0, c: 0, d: 1 },
    GridTransform { a: 1, b: 0, c: 0, d: -1 },
    GridTransform { a: 0, b: 1, c: 1, d: 0 },
    GridTransform { a: 0, b: -1, c: -1, d: 0 },
];

/// Grid-to-board transform of a marker decoded with `rotation`, where
/// `observed == rotate_code_u64(code, n, rotation)` in grid coordinates.
///
/// Boards are seen from the front, so only the four rotations occur.
pub fn rotation_transform(rotation: u8) -> GridTransform {
    GRID_TRANSFORMS_D4[rotation_index(rotation)]
}

#[inline]
fn rotation_index(rotation: u8) -> usize {
    ((4 - (rotation & 3)) % 4) as usize
}

/// `board = transform(grid) + translation` on the doubled lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridAlignment {
    pub transform: GridTransform,
    pub translation: [i32; 2],
}

impl GridAlignment {
    #[inline]
    pub fn map_doubled(&self, i: i32, j: i32) -> [i32; 2] {
        let [x, y] = self.transform.apply(i, j);
        [x + self.translation[0], y + self.translation[1]]
    }

    /// Board corner for grid corner `(i, j)`.
    pub fn map_corner(&self, i: i32, j: i32) -> [i32; 2] {
        let [x, y] = self.map_doubled(2 * i, 2 * j);
        [x.div_euclid(2), y.div_euclid(2)]
    }
}

/// OpenCV-style layout: top-left square black, markers on the white squares
/// (`(sx + sy)` odd) with ids assigned row-major.
#[derive(Clone, Debug)]
pub struct CharucoBoard {
    cols: i32,
    rows: i32,
    marker_size_rel: f32,
    marker_positions: Vec<[i32; 2]>,
}

impl CharucoBoard {
    /// `cols × rows` squares.
    pub fn new(cols: u32, rows: u32, marker_size_rel: f32) -> Self {
        let (cols, rows) = (cols as i32, rows as i32);
        let mut marker_positions = Vec::new();
        for sy in 0..rows {
            for sx in 0..cols {
                if (sx + sy) & 1 == 1 {
                    marker_positions.push([sx, sy]);
                }
            }
        }
        Self {
            cols,
            rows,
            marker_size_rel,
            marker_positions,
        }
    }

    #[inline]
    pub fn marker_count(&self) -> usize {
        self.marker_positions.len()
    }

    #[inline]
    pub fn marker_size_rel(&self) -> f32 {
        self.marker_size_rel
    }

    pub fn marker_position(&self, id: u32) -> Option<[i32; 2]> {
        self.marker_positions.get(id as usize).copied()
    }

    /// ChArUco id of the inner board corner `(i, j)`.
    pub fn corner_id(&self, i: i32, j: i32) -> Option<u32> {
        if i <= 0 || j <= 0 || i >= self.cols || j >= self.rows {
            return None;
        }
        Some(((j - 1) * (self.cols - 1) + (i - 1)) as u32)
    }
}

/// A decoded marker in the square whose top-left grid corner is `cell`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkerObservation {
    pub id: u32,
    pub cell: [i32; 2],
    /// Quarter turns reported by the matcher.
    pub rotation: u8,
}

/// Most voted alignment and its vote count.
///
/// Every marker votes once, for the transform fixed by its decoded
/// rotation and the translation placing it on its board square. Ties go to
/// the lowest transform index, then the lowest translation.
pub fn solve_alignment(
    board: &CharucoBoard,
    markers: &[MarkerObservation],
) -> Option<(GridAlignment, usize)> {
    let mut votes: BTreeMap<(usize, i32, i32), usize> = BTreeMap::new();
    for m in markers {
        let Some([bx, by]) = board.marker_position(m.id) else {
            continue;
        };
        let (gx, gy) = (2 * m.cell[0] + 1, 2 * m.cell[1] + 1);
        let t_idx = rotation_index(m.rotation);
        let [x, y] = GRID_TRANSFORMS_D4[t_idx].apply(gx, gy);
        *votes.entry((t_idx, 2 * bx + 1 - x, 2 * by + 1 - y)).or_default() += 1;
    }

    let mut best: Option<((usize, i32, i32), usize)> = None;
    for (&key, &count) in &votes {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((key, count));
        }
    }
    best.map(|((t_idx, tx, ty), count)| {
        (
            GridAlignment {
                transform: GRID_TRANSFORMS_D4[t_idx],
                translation: [tx, ty],
            },
            count,
        )
    })
}

/// `(corner index, charuco id)` for grid corners that land on inner board corners.
pub fn map_charuco_corners(
    board: &CharucoBoard,
    alignment: &GridAlignment,
    grid: &[GridCorner],
) -> Vec<(usize, u32)> {
    let mut out: Vec<(usize, u32)> = grid
        .iter()
        .filter_map(|c| {
            let [bi, bj] = alignment.map_corner(c.i, c.j);
            board.corner_id(bi, bj).map(|id| (c.index, id))
        })
        .collect();
    out.sort_by_key(|&(_, id)| id);
    out
}
