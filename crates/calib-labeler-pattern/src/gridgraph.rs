//! 4-connected grid graph over detected X-corners.
//!
//! Neighbors are found per corner in the frame of the dominant grid axis so
//! that `Right`/`Down` keep the image's handedness even for rotated boards.

use crate::corners::ChessCorner;
use crate::geom::{angle_diff_abs, axis_vec_diff, is_orthogonal, wrap_quarter_turn};
use calib_labeler_core::{sample_bilinear, GrayImageView};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GridGraphParams {
    pub min_spacing_pix: f32,
    pub max_spacing_pix: f32,
    pub orientation_tolerance_deg: f32,
    /// Minimal intensity step across a grid edge, relative to the image range.
    pub edge_contrast_rel: f32,
}

impl Default for GridGraphParams {
    fn default() -> Self {
        Self {
            min_spacing_pix: 8.0,
            max_spacing_pix: 200.0,
            orientation_tolerance_deg: 22.5,
            edge_contrast_rel: 0.3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NeighborDirection {
    Right,
    Left,
    Up,
    Down,
}

impl NeighborDirection {
    fn slot(self) -> usize {
        match self {
            NeighborDirection::Right => 0,
            NeighborDirection::Left => 1,
            NeighborDirection::Up => 2,
            NeighborDirection::Down => 3,
        }
    }

    fn opposite(self) -> Self {
        match self {
            NeighborDirection::Right => NeighborDirection::Left,
            NeighborDirection::Left => NeighborDirection::Right,
            NeighborDirection::Up => NeighborDirection::Down,
            NeighborDirection::Down => NeighborDirection::Up,
        }
    }

    fn step(self) -> (i32, i32) {
        match self {
            NeighborDirection::Right => (1, 0),
            NeighborDirection::Left => (-1, 0),
            NeighborDirection::Up => (0, -1),
            NeighborDirection::Down => (0, 1),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct NodeNeighbor {
    pub direction: NeighborDirection,
    pub index: usize,
    pub distance: f32,
    pub score: f32,
}

/// Corner `index` placed at grid coordinates `(i, j)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridCorner {
    pub index: usize,
    pub i: i32,
    pub j: i32,
}

pub struct GridGraph {
    /// Grid axis angle in `(-π/4, π/4]`; `Right` points along it.
    pub axis: f32,
    pub neighbors: Vec<Vec<NodeNeighbor>>,
}

/// Dominant grid axis from the 4θ mean of corner orientations.
///
/// Adjacent corners have orthogonal orientations, so the 2θ mean cancels;
/// quadrupling folds both families onto one direction.
pub fn estimate_grid_axis(corners: &[ChessCorner]) -> f32 {
    let (mut c, mut s) = (0.0f32, 0.0f32);
    for corner in corners {
        c += corner.strength * (4.0 * corner.orientation).cos();
        s += corner.strength * (4.0 * corner.orientation).sin();
    }
    let diagonal = 0.25 * s.atan2(c);
    wrap_quarter_turn(diagonal + FRAC_PI_4)
}

struct EdgeCheck<'a> {
    img: GrayImageView<'a>,
    min_contrast: f32,
}

impl EdgeCheck<'_> {
    /// A grid edge separates a dark and a light square along its whole length.
    fn separates_squares(&self, a: Point2<f32>, b: Point2<f32>) -> bool {
        let d = b - a;
        let len = d.norm();
        if len <= f32::EPSILON {
            return false;
        }
        let n = Vector2::new(-d.y, d.x) / len;
        let off = (0.06 * len).max(1.5);
        let mut sign = 0.0f32;
        for t in [0.25f32, 0.5, 0.75] {
            let p = a + d * t;
            let plus = sample_bilinear(&self.img, p.x + off * n.x, p.y + off * n.y);
            let minus = sample_bilinear(&self.img, p.x - off * n.x, p.y - off * n.y);
            let step = plus - minus;
            if step.abs() < self.min_contrast {
                return false;
            }
            if sign == 0.0 {
                sign = step.signum();
            } else if step.signum() != sign {
                return false;
            }
        }
        true
    }
}

fn is_good_neighbor(
    corner: &ChessCorner,
    neighbor: &ChessCorner,
    neighbor_index: usize,
    params: &GridGraphParams,
    axis: Vector2<f32>,
) -> Option<NodeNeighbor> {
    let tol = params.orientation_tolerance_deg.to_radians();
    if !is_orthogonal(corner.orientation, neighbor.orientation, tol) {
        return None;
    }

    let vec_to_neighbor = neighbor.position - corner.position;
    let distance = vec_to_neighbor.norm();
    if distance < params.min_spacing_pix || distance > params.max_spacing_pix {
        return None;
    }

    // Orientations follow the bright diagonals, so a grid edge sits at 45°
    // to both of them.
    let edge_angle = vec_to_neighbor.y.atan2(vec_to_neighbor.x);
    let score_corner = (axis_vec_diff(corner.orientation, edge_angle) - FRAC_PI_4).abs();
    let score_neighbor = (axis_vec_diff(neighbor.orientation, edge_angle) - FRAC_PI_4).abs();
    if score_corner > tol || score_neighbor > tol {
        return None;
    }

    let score_orientation =
        (FRAC_PI_2 - angle_diff_abs(corner.orientation, neighbor.orientation)).abs();

    Some(NodeNeighbor {
        direction: direction_in_axis_frame(&vec_to_neighbor, axis),
        index: neighbor_index,
        distance,
        score: score_corner + score_neighbor + score_orientation,
    })
}

fn direction_in_axis_frame(v: &Vector2<f32>, axis: Vector2<f32>) -> NeighborDirection {
    let u = v.x * axis.x + v.y * axis.y;
    let w = -v.x * axis.y + v.y * axis.x;
    if u.abs() > w.abs() {
        if u >= 0.0 {
            NeighborDirection::Right
        } else {
            NeighborDirection::Left
        }
    } else if w >= 0.0 {
        NeighborDirection::Down
    } else {
        NeighborDirection::Up
    }
}

/// Keep at most one neighbor per direction, choosing the lowest-score candidate.
fn select_neighbors(candidates: Vec<NodeNeighbor>) -> [Option<NodeNeighbor>; 4] {
    let mut best: [Option<NodeNeighbor>; 4] = [None; 4];
    for candidate in candidates {
        let slot = &mut best[candidate.direction.slot()];
        let replace = match slot {
            None => true,
            Some(current) => {
                candidate.score < current.score
                    || (candidate.score == current.score && candidate.distance < current.distance)
            }
        };
        if replace {
            *slot = Some(candidate);
        }
    }
    best
}

impl GridGraph {
    pub fn new(corners: &[ChessCorner], img: &GrayImageView<'_>, params: &GridGraphParams) -> Self {
        let axis = estimate_grid_axis(corners);
        let axis_vec = Vector2::new(axis.cos(), axis.sin());
        let (lo, hi) = img
            .data
            .iter()
            .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let edges = EdgeCheck {
            img: *img,
            min_contrast: (params.edge_contrast_rel * hi.saturating_sub(lo) as f32).max(1.0),
        };

        let selected: Vec<[Option<NodeNeighbor>; 4]> = corners
            .iter()
            .enumerate()
            .map(|(i, corner)| {
                let candidates = corners
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .filter_map(|(j, n)| is_good_neighbor(corner, n, j, params, axis_vec))
                    .filter(|nn| edges.separates_squares(corner.position, corners[nn.index].position))
                    .collect();
                select_neighbors(candidates)
            })
            .collect();

        // An edge survives only if both ends picked each other.
        let neighbors = selected
            .iter()
            .enumerate()
            .map(|(i, slots)| {
                slots
                    .iter()
                    .flatten()
                    .filter(|nn| {
                        selected[nn.index][nn.direction.opposite().slot()]
                            .is_some_and(|back| back.index == i)
                    })
                    .copied()
                    .collect()
            })
            .collect();

        Self { axis, neighbors }
    }

    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        let mut visited = vec![false; self.neighbors.len()];
        let mut components = Vec::new();
        for start in 0..self.neighbors.len() {
            if visited[start] {
                continue;
            }
            let mut component = Vec::new();
            let mut stack = vec![start];
            while let Some(node) = stack.pop() {
                if visited[node] {
                    continue;
                }
                visited[node] = true;
                component.push(node);
                for neighbor in &self.neighbors[node] {
                    if !visited[neighbor.index] {
                        stack.push(neighbor.index);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    /// BFS grid coordinates for one component, shifted so the minimum is `(0, 0)`.
    ///
    /// A node reached at an already occupied coordinate is dropped.
    pub fn assign_grid_coordinates(&self, component: &[usize]) -> Vec<GridCorner> {
        let Some(&start) = component.first() else {
            return Vec::new();
        };
        let mut visited = vec![false; self.neighbors.len()];
        let mut occupied: HashMap<(i32, i32), usize> = HashMap::new();
        let mut coords = Vec::with_capacity(component.len());
        let mut queue = VecDeque::from([(start, 0i32, 0i32)]);

        while let Some((node, i, j)) = queue.pop_front() {
            if visited[node] || occupied.contains_key(&(i, j)) {
                continue;
            }
            visited[node] = true;
            occupied.insert((i, j), node);
            coords.push(GridCorner { index: node, i, j });
            for neighbor in &self.neighbors[node] {
                let (di, dj) = neighbor.direction.step();
                queue.push_back((neighbor.index, i + di, j + dj));
            }
        }

        let min_i = coords.iter().map(|c| c.i).min().unwrap_or(0);
        let min_j = coords.iter().map(|c| c.j).min().unwrap_or(0);
        for c in &mut coords {
            c.i -= min_i;
            c.j -= min_j;
        }
        coords
    }

    /// Coordinates of the largest component (first one on ties).
    pub fn largest_grid(&self) -> Vec<GridCorner> {
        let mut best: Vec<GridCorner> = Vec::new();
        for component in self.connected_components() {
            if component.len() <= best.len() {
                continue;
            }
            let grid = self.assign_grid_coordinates(&component);
            if grid.len() > best.len() {
                best = grid;
            }
        }
        best
    }
}
