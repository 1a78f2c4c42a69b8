//! Chessboard and ChArUco keypoint detection for camera labeling.
//!
//! The pipeline is:
//! - ChESS X-corners from `chess-corners`,
//! - a 4-connected grid graph over the corners (orientation, spacing and
//!   edge-contrast checks, mutual neighbors only),
//! - for chessboards, acceptance of a complete inner-corner grid,
//! - for ChArUco boards, marker decoding inside grid squares and a D4
//!   alignment vote that assigns board ids to the grid corners.
//!
//! The entry point is [`PatternDetector`]; the lower-level stages are public
//! for tests and tooling.

pub mod charuco;
mod chessboard;
pub mod corners;
mod decode;
mod detector;
mod dictionary;
pub mod geom;
pub mod gridgraph;
mod homography;
mod matcher;
mod threshold;

pub use chessboard::assemble_chessboard;
pub use decode::decode_marker_in_square;
pub use detector::{draw_detection, PatternDetection, PatternDetector, PatternDetectorParams};
pub use dictionary::{Dictionary, DictionaryIoError, BUILTIN_DICTIONARIES};
pub use homography::{homography_from_4pt, Homography};
pub use matcher::{rotate_code_u64, Match, Matcher};
pub use threshold::equalize_histogram;
