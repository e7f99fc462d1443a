//! larreco-core: Core types for pixel-detector event reconstruction.
//!
//! This crate provides the hit, event and track data model shared by the
//! event builder and the track finder, along with the line representation,
//! configuration and error types.
//!

pub mod config;
pub mod error;
pub mod event;
pub mod hit;
pub mod line;
pub mod track;

pub use config::{
    BoundaryHitPolicy, EventBuilderConfig, HoughConfig, PointScale, ReconstructionConfig,
};
pub use error::{Error, Result};
pub use event::{Event, HitCollection};
pub use hit::{Hit, HitSource, RawRow, RowLayout, RowValue, Timestamp};
pub use line::{compute_xp_yp, direction_angles, unit_direction, Line, Projection};
pub use track::{LineCovariance, ReconstructedEvent, Track};

pub use nalgebra::{Point3, Vector3};
