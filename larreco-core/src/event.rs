//! Hit collections and events.

use crate::config::PointScale;
use crate::hit::{Hit, Timestamp};
use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An ordered sequence of hits with aggregates computed at construction.
///
/// The aggregates are never recomputed, so the hit list is not exposed
/// mutably.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitCollection {
    hits: Vec<Hit>,
    hid_start: usize,
    hid_end: usize,
    ts_start: Timestamp,
    ts_end: Timestamp,
    q: f64,
}

impl HitCollection {
    /// Creates a collection and computes its aggregates.
    #[must_use]
    pub fn new(hits: Vec<Hit>) -> Self {
        let hid_start = hits.iter().map(|h| h.id).min().unwrap_or(0);
        let hid_end = hits.iter().map(|h| h.id).max().unwrap_or(0);
        let ts_start = hits.iter().map(|h| h.ts).min().unwrap_or_default();
        let ts_end = hits.iter().map(|h| h.ts).max().unwrap_or_default();
        let q = hits.iter().map(|h| h.q).sum();
        Self {
            hits,
            hid_start,
            hid_end,
            ts_start,
            ts_end,
            q,
        }
    }

    /// Returns the hits.
    #[must_use]
    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    /// Returns the number of hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Returns an iterator over the hits.
    pub fn iter(&self) -> impl Iterator<Item = &Hit> {
        self.hits.iter()
    }

    /// Smallest source index.
    #[must_use]
    pub fn hid_start(&self) -> usize {
        self.hid_start
    }

    /// Largest source index.
    #[must_use]
    pub fn hid_end(&self) -> usize {
        self.hid_end
    }

    /// Earliest timestamp.
    #[must_use]
    pub fn ts_start(&self) -> Timestamp {
        self.ts_start
    }

    /// Latest timestamp.
    #[must_use]
    pub fn ts_end(&self) -> Timestamp {
        self.ts_end
    }

    /// Total charge.
    #[must_use]
    pub fn charge_sum(&self) -> f64 {
        self.q
    }

    /// Maps each hit to a 3-D point, using drift time relative to
    /// [`Self::ts_start`] as the third coordinate.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn points(&self, scale: &PointScale) -> Vec<Point3<f64>> {
        let t0 = self.ts_start.as_u64();
        self.hits
            .iter()
            .map(|hit| {
                Point3::new(
                    hit.px * scale.xy_scale,
                    hit.py * scale.xy_scale,
                    (hit.ts.as_u64() - t0) as f64 * scale.time_scale,
                )
            })
            .collect()
    }
}

impl FromIterator<Hit> for HitCollection {
    fn from_iter<I: IntoIterator<Item = Hit>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A time-cohesive group of hits produced by the event builder.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    id: u64,
    collection: HitCollection,
}

impl Event {
    /// Creates an event.
    #[must_use]
    pub fn new(id: u64, hits: Vec<Hit>) -> Self {
        Self {
            id,
            collection: HitCollection::new(hits),
        }
    }

    /// Event identifier (monotonic per builder run).
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The hits and their aggregates.
    #[must_use]
    pub fn collection(&self) -> &HitCollection {
        &self.collection
    }

    /// Returns the hits.
    #[must_use]
    pub fn hits(&self) -> &[Hit] {
        self.collection.hits()
    }

    /// Returns the number of hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.collection.len()
    }

    /// Returns true if the event holds no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    /// See [`HitCollection::points`].
    #[must_use]
    pub fn points(&self, scale: &PointScale) -> Vec<Point3<f64>> {
        self.collection.points(scale)
    }
}
