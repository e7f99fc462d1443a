//! Track types and per-event reconstruction results.

use crate::event::Event;
use crate::hit::Hit;
use crate::line::Line;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Covariance of `(theta, phi, xp, yp)`.
pub type LineCovariance = [[f64; 4]; 4];

/// A fitted straight line and the event hits assigned to it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Track {
    /// Fitted line.
    pub line: Line,
    /// Indices into the owning event's hit list, ascending.
    pub hit_indices: Vec<usize>,
    /// Line-parameter covariance, when estimated.
    pub covariance: Option<LineCovariance>,
}

impl Track {
    /// Creates a track without covariance.
    #[must_use]
    pub fn new(line: Line, mut hit_indices: Vec<usize>) -> Self {
        hit_indices.sort_unstable();
        Self {
            line,
            hit_indices,
            covariance: None,
        }
    }

    /// Attaches a covariance estimate.
    #[must_use]
    pub fn with_covariance(mut self, covariance: LineCovariance) -> Self {
        self.covariance = Some(covariance);
        self
    }

    /// Number of hits on the track.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hit_indices.len()
    }

    /// Returns true if no hits are assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hit_indices.is_empty()
    }

    /// Resolves the member hits against the owning event.
    pub fn hits<'a>(&'a self, event: &'a Event) -> impl Iterator<Item = &'a Hit> + 'a {
        self.hit_indices
            .iter()
            .filter_map(move |&index| event.hits().get(index))
    }
}

/// An event together with the tracks found in it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReconstructedEvent {
    /// The reconstructed event.
    pub event: Arc<Event>,
    /// Accepted tracks in the order they were found.
    pub tracks: Vec<Track>,
    /// Hit indices not claimed by any track, ascending.
    pub orphans: Vec<usize>,
}

impl ReconstructedEvent {
    /// Bundles an event with its tracks and derives the orphan set.
    #[must_use]
    pub fn new(event: Arc<Event>, tracks: Vec<Track>) -> Self {
        let mut claimed = vec![false; event.len()];
        for index in tracks.iter().flat_map(|t| t.hit_indices.iter().copied()) {
            if let Some(slot) = claimed.get_mut(index) {
                *slot = true;
            }
        }
        let orphans = claimed
            .iter()
            .enumerate()
            .filter_map(|(index, &taken)| (!taken).then_some(index))
            .collect();
        Self {
            event,
            tracks,
            orphans,
        }
    }
}
