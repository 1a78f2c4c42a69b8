//! Depth-camera labeling: the calibration board is tracked as a connected
//! region of continuous depth grown from the previous frame's seed.
//!
//! ```text
//! depth ──downsample──▶ grow_region(seed) ──▶ interior / boundary samples
//!                                        └──▶ centroid ──gate_seed──▶ next seed
//! ```

mod pyramid;
mod region;
mod tracker;

pub use pyramid::{downsample, is_valid_depth};
pub use region::{grow_region, nearest_valid, ContinuityRule, Region};
pub use tracker::{gate_seed, track_depth, DepthTracking, DepthTrackerParams};
