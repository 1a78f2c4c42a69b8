use std::collections::HashMap;

use calib_labeler_core::{
    draw_cross, gray_from_rgb, CalibrationPattern, ConfigError, GrayImageView, Keypoint,
    PatternKind,
};
use image::{GrayImage, Rgb, RgbImage};
use log::{debug, info};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::charuco::{map_charuco_corners, solve_alignment, CharucoBoard, MarkerObservation};
use crate::corners::{detect_corners, ChessCorner, ChessParams};
use crate::chessboard::assemble_chessboard;
use crate::decode::decode_marker_in_square;
use crate::gridgraph::{GridCorner, GridGraph, GridGraphParams};
use crate::threshold::equalize_histogram;
use crate::{Dictionary, Matcher};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternDetectorParams {
    pub chess: ChessParams,
    pub graph: GridGraphParams,
    /// Maximum Hamming distance for marker matching.
    pub max_hamming: u8,
    /// Minimal fraction of black marker border cells.
    pub min_border_score: f32,
    /// Minimal number of markers agreeing on the board alignment.
    pub min_markers: usize,
}

impl Default for PatternDetectorParams {
    fn default() -> Self {
        Self {
            chess: ChessParams::default(),
            graph: GridGraphParams::default(),
            max_hamming: 0,
            min_border_score: 0.85,
            min_markers: 1,
        }
    }
}

/// Result of one detection. A miss is `detected = false` with no keypoints.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatternDetection {
    pub detected: bool,
    /// Sub-pixel corners; row-major for chessboards, by id for ChArUco.
    pub keypoints: Vec<Point2<f32>>,
    /// ChArUco corner ids, parallel to `keypoints`.
    pub ids: Option<Vec<u32>>,
    /// Decoded markers that voted for the accepted alignment.
    pub markers: usize,
}

impl PatternDetection {
    pub fn keypoints_with_ids(&self) -> Vec<Keypoint> {
        self.keypoints
            .iter()
            .enumerate()
            .map(|(k, p)| Keypoint {
                x: p.x,
                y: p.y,
                id: self.ids.as_ref().and_then(|ids| ids.get(k).copied()),
            })
            .collect()
    }
}

#[derive(Clone, Debug)]
enum Family {
    Chessboard { inner: (u32, u32) },
    Charuco { board: CharucoBoard, matcher: Matcher },
}

/// Stateless chessboard / ChArUco keypoint detector.
#[derive(Clone, Debug)]
pub struct PatternDetector {
    family: Family,
    params: PatternDetectorParams,
}

impl PatternDetector {
    /// Build a detector; ChArUco dictionaries are resolved among the builtins.
    pub fn new(
        pattern: &CalibrationPattern,
        params: PatternDetectorParams,
    ) -> Result<Self, ConfigError> {
        let dictionary = match &pattern.kind {
            PatternKind::Chessboard => None,
            PatternKind::Charuco { dictionary, .. } => Some(
                Dictionary::builtin(dictionary)
                    .ok_or_else(|| ConfigError::UnknownDictionary(dictionary.clone()))?,
            ),
        };
        Self::build(pattern, dictionary, params)
    }

    /// Build a ChArUco detector around a custom dictionary.
    pub fn with_dictionary(
        pattern: &CalibrationPattern,
        dictionary: Dictionary,
        params: PatternDetectorParams,
    ) -> Result<Self, ConfigError> {
        Self::build(pattern, Some(dictionary), params)
    }

    fn build(
        pattern: &CalibrationPattern,
        dictionary: Option<Dictionary>,
        params: PatternDetectorParams,
    ) -> Result<Self, ConfigError> {
        pattern.validate()?;
        let family = match (&pattern.kind, dictionary) {
            (PatternKind::Chessboard, _) => Family::Chessboard {
                inner: pattern.inner_corners(),
            },
            (PatternKind::Charuco { inner_size, .. }, Some(dict)) => {
                dict.validate()?;
                let board = CharucoBoard::new(
                    pattern.dimension.x,
                    pattern.dimension.y,
                    (inner_size / pattern.size) as f32,
                );
                if board.marker_count() > dict.codes.len() {
                    return Err(ConfigError::InvalidPattern(format!(
                        "board needs {} markers, dictionary '{}' has {}",
                        board.marker_count(),
                        dict.name,
                        dict.codes.len()
                    )));
                }
                let matcher = Matcher::new(&dict, params.max_hamming);
                Family::Charuco { board, matcher }
            }
            (PatternKind::Charuco { dictionary, .. }, None) => {
                return Err(ConfigError::UnknownDictionary(dictionary.clone()))
            }
        };
        Ok(Self { family, params })
    }

    pub fn params(&self) -> &PatternDetectorParams {
        &self.params
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image), fields(width = image.width(), height = image.height()))
    )]
    pub fn detect(&self, image: &RgbImage, equalize: bool) -> PatternDetection {
        let gray = gray_from_rgb(image);
        if equalize {
            self.detect_gray(&equalize_histogram(&gray))
        } else {
            self.detect_gray(&gray)
        }
    }

    pub fn detect_gray(&self, gray: &GrayImage) -> PatternDetection {
        let view = GrayImageView::from(gray);
        let corners = detect_corners(gray, &self.params.chess);
        if corners.is_empty() {
            return PatternDetection::default();
        }
        let graph = GridGraph::new(&corners, &view, &self.params.graph);
        let grid = graph.largest_grid();
        debug!(
            "pattern: {} corners, largest grid component {}",
            corners.len(),
            grid.len()
        );

        let detection = match &self.family {
            Family::Chessboard { inner } => match assemble_chessboard(&corners, &grid, *inner) {
                Some(keypoints) => PatternDetection {
                    detected: true,
                    keypoints,
                    ids: None,
                    markers: 0,
                },
                None => PatternDetection::default(),
            },
            Family::Charuco { board, matcher } => {
                self.detect_charuco(&view, &corners, &grid, board, matcher)
            }
        };
        if detection.detected {
            info!("pattern: detected {} keypoints", detection.keypoints.len());
        }
        detection
    }

    fn detect_charuco(
        &self,
        view: &GrayImageView<'_>,
        corners: &[ChessCorner],
        grid: &[GridCorner],
        board: &CharucoBoard,
        matcher: &Matcher,
    ) -> PatternDetection {
        let at: HashMap<(i32, i32), usize> = grid.iter().map(|c| ((c.i, c.j), c.index)).collect();
        let mut markers = Vec::new();
        for c in grid {
            let quad_idx = [
                at.get(&(c.i, c.j)),
                at.get(&(c.i + 1, c.j)),
                at.get(&(c.i + 1, c.j + 1)),
                at.get(&(c.i, c.j + 1)),
            ];
            let [Some(&tl), Some(&tr), Some(&br), Some(&bl)] = quad_idx else {
                continue;
            };
            let quad = [tl, tr, br, bl].map(|k| corners[k].position);
            let Some(m) = decode_marker_in_square(
                view,
                &quad,
                board.marker_size_rel(),
                self.params.min_border_score,
                matcher,
            ) else {
                continue;
            };
            if (m.id as usize) < board.marker_count() {
                markers.push(MarkerObservation {
                    id: m.id,
                    cell: [c.i, c.j],
                    rotation: m.rotation,
                });
            }
        }
        debug!("charuco: decoded {} markers", markers.len());

        let Some((alignment, votes)) = solve_alignment(board, &markers) else {
            return PatternDetection::default();
        };
        if votes < self.params.min_markers.max(1) {
            debug!("charuco: alignment has {votes} votes, need {}", self.params.min_markers);
            return PatternDetection::default();
        }

        let mapped = map_charuco_corners(board, &alignment, grid);
        if mapped.is_empty() {
            return PatternDetection::default();
        }
        PatternDetection {
            detected: true,
            keypoints: mapped.iter().map(|&(k, _)| corners[k].position).collect(),
            ids: Some(mapped.iter().map(|&(_, id)| id).collect()),
            markers: votes,
        }
    }
}

/// Overlay detected keypoints; the first one is drawn larger in red.
pub fn draw_detection(image: &mut RgbImage, detection: &PatternDetection) {
    for (k, p) in detection.keypoints.iter().enumerate().rev() {
        if k == 0 {
            draw_cross(image, p.x, p.y, 6, Rgb([255, 0, 0]));
        } else {
            draw_cross(image, p.x, p.y, 3, Rgb([0, 255, 0]));
        }
    }
}
