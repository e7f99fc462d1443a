//! Time-ordering of a nearly sorted hit source.
//!
//! Detector readout delivers hits roughly in time order, but chips drain
//! their FIFOs independently so neighbouring rows can be swapped. The
//! [`StreamSorter`] keeps a bounded look-ahead window of `K` rows in a
//! min-heap and always emits the earliest hit it knows about.
//!
//! # Ordering guarantee
//! The output is non-decreasing in time only if no hit is displaced from its
//! sorted position by more than `K` rows. Violations are not detected: the
//! sorter emits the best order it can see within the window.

use larreco_core::{Error, Hit, HitSource, Result, Timestamp};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A buffered hit, ordered by `(timestamp, source index)`.
#[derive(Debug, Clone)]
struct WindowEntry {
    hit: Hit,
}

impl WindowEntry {
    fn key(&self) -> (Timestamp, usize) {
        (self.hit.ts, self.hit.id)
    }
}

// Reverse ordering for a min-heap (earliest timestamp first)
impl PartialEq for WindowEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for WindowEntry {}

impl PartialOrd for WindowEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WindowEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// Emits hits from a [`HitSource`] one at a time in timestamp order.
///
/// Hits with equal timestamps come out in source order.
#[derive(Debug)]
pub struct StreamSorter<S> {
    source: S,
    buffer_length: usize,
    window: BinaryHeap<WindowEntry>,
    next_row: usize,
}

impl<S: HitSource> StreamSorter<S> {
    /// Creates a sorter with a look-ahead window of `buffer_length` rows.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if `buffer_length` is zero.
    pub fn new(source: S, buffer_length: usize) -> Result<Self> {
        if buffer_length == 0 {
            return Err(Error::ConfigError(
                "sort_buffer_length must be at least 1".into(),
            ));
        }
        Ok(Self {
            source,
            buffer_length,
            window: BinaryHeap::with_capacity(buffer_length),
            next_row: 0,
        })
    }

    /// Returns the next hit in time order, or `Ok(None)` at end of stream.
    ///
    /// # Errors
    /// Propagates read and decode errors from the source.
    pub fn next_hit(&mut self) -> Result<Option<Hit>> {
        self.fill()?;
        Ok(self.window.pop().map(|entry| entry.hit))
    }

    /// Rewinds to the first source row and empties the window.
    pub fn reset(&mut self) {
        self.window.clear();
        self.next_row = 0;
    }

    /// Number of rows read from the source so far.
    #[must_use]
    pub fn rows_consumed(&self) -> usize {
        self.next_row
    }

    /// Look-ahead window length.
    #[must_use]
    pub fn buffer_length(&self) -> usize {
        self.buffer_length
    }

    /// Returns the wrapped source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Consumes the sorter, returning the wrapped source.
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Tops the window up to `buffer_length` entries while rows remain.
    fn fill(&mut self) -> Result<()> {
        while self.window.len() < self.buffer_length {
            let Some(hit) = self.source.get_hit(self.next_row)? else {
                break;
            };
            self.next_row += 1;
            self.window.push(WindowEntry { hit });
        }
        Ok(())
    }
}

impl<S: HitSource> Iterator for StreamSorter<S> {
    type Item = Result<Hit>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_hit().transpose()
    }
}
