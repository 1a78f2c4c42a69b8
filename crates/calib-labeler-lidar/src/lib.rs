//! Lidar labeling: 2D range-scan clustering and seed-gated RANSAC plane
//! segmentation of 3D point clouds.
//!
//! Both algorithms take the current seed and return the labeled indices
//! together with the updated seed; a miss leaves the seed untouched.

mod hull;
mod plane;
mod scan_cluster;

pub use hull::convex_hull_indices;
pub use plane::{segment_plane, Plane, PlaneSegmentParams, PlaneSegmentation};
pub use scan_cluster::{cluster_scan, ScanCluster, ScanClusterParams, ScanClustering};
