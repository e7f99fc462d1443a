//! larreco-algorithms: straight-track reconstruction in 3-D point clouds.
//!
//! This crate provides:
//! - **Hough accumulator** - voting over sampled directions and transverse
//!   positions
//! - **Line fitting** - PCA refinement of a candidate line and optional
//!   jackknife covariance
//! - **Track finding** - iterative peel-off of disjoint tracks
//! - **Processing** - event-level and stream-level reconstruction drivers
//!
#![warn(missing_docs)]

pub mod fit;
pub mod hough;
mod processing;
mod tracking;

pub use fit::{fit_line, inliers, jackknife_covariance, refine};
pub use hough::{
    center_translate, fibonacci_hemisphere, hemisphere_directions, position_edges,
    HoughAccumulator, HoughCell,
};
pub use processing::{reconstruct_all, reconstruct_event, reconstruct_stream, ReconstructionSummary};
pub use tracking::{find_tracks, TrackFinder};
