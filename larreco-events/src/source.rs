//! In-memory hit source.

use larreco_core::{Hit, HitSource, RawRow, Result};

/// A hit source backed by a vector of hits.
///
/// Hits are re-identified by their position, so `get_hit(i).id == i`.
#[derive(Debug, Clone, Default)]
pub struct MemoryHitSource {
    hits: Vec<Hit>,
}

impl MemoryHitSource {
    /// Creates a source from hits in storage order.
    #[must_use]
    pub fn new(hits: Vec<Hit>) -> Self {
        let hits = hits
            .into_iter()
            .enumerate()
            .map(|(index, hit)| Hit { id: index, ..hit })
            .collect();
        Self { hits }
    }

    /// Creates a source of bare hits from timestamps alone.
    #[must_use]
    pub fn from_timestamps(timestamps: &[u64]) -> Self {
        Self::new(
            timestamps
                .iter()
                .map(|&ts| Hit::new(0, 0.0, 0.0, ts, 0.0))
                .collect(),
        )
    }

    /// Returns the stored hits.
    #[must_use]
    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }
}

impl FromIterator<Hit> for MemoryHitSource {
    fn from_iter<I: IntoIterator<Item = Hit>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl HitSource for MemoryHitSource {
    fn len(&self) -> usize {
        self.hits.len()
    }

    fn get_row(&self, index: usize) -> Result<Option<RawRow>> {
        Ok(self.hits.get(index).map(Hit::to_row))
    }

    fn get_hit(&self, index: usize) -> Result<Option<Hit>> {
        Ok(self.hits.get(index).cloned())
    }
}
