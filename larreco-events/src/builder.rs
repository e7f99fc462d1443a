//! Time-gap event building over a sorted hit stream.

use crate::ordering::StreamSorter;
use larreco_core::{BoundaryHitPolicy, Event, EventBuilderConfig, Hit, HitSource, Result};
use log::debug;
use std::sync::Arc;

/// Partitions a hit stream into time-cohesive events.
///
/// A hit joins the pending group if the group is empty or if at least one
/// pending hit lies within `dt_cut` of it. A hit that does not join closes
/// the group: groups of at least `min_event_len` hits become events, shorter
/// groups are discarded and the hit starts a new group. A group reaching
/// `max_event_len` is emitted immediately.
///
/// Emitted events are kept in an in-memory history until [`Self::clear`] or
/// [`Self::reset`] is called.
#[derive(Debug)]
pub struct EventBuilder<S> {
    sorter: StreamSorter<S>,
    config: EventBuilderConfig,
    next_id: u64,
    events: Vec<Arc<Event>>,
    carry: Option<Hit>,
}

impl<S: HitSource> EventBuilder<S> {
    /// Creates a builder reading from `source`.
    ///
    /// # Errors
    /// Returns a configuration error if `config` fails validation.
    pub fn new(source: S, config: EventBuilderConfig) -> Result<Self> {
        config.validate()?;
        let sorter = StreamSorter::new(source, config.sort_buffer_length)?;
        Ok(Self {
            sorter,
            config,
            next_id: 0,
            events: Vec::new(),
            carry: None,
        })
    }

    /// Returns the builder configuration.
    #[must_use]
    pub fn config(&self) -> &EventBuilderConfig {
        &self.config
    }

    /// Events emitted since the last [`Self::clear`] or [`Self::reset`].
    #[must_use]
    pub fn events(&self) -> &[Arc<Event>] {
        &self.events
    }

    /// Forgets emitted events without rewinding the stream.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Rewinds to the start of the source, restarts event ids at zero and
    /// forgets emitted events.
    pub fn reset(&mut self) {
        self.sorter.reset();
        self.next_id = 0;
        self.events.clear();
        self.carry = None;
    }

    /// Builds the next event, or returns `Ok(None)` at end of stream.
    ///
    /// # Errors
    /// Propagates errors from the hit source.
    pub fn next_event(&mut self) -> Result<Option<Arc<Event>>> {
        let mut pending: Vec<Hit> = self.carry.take().into_iter().collect();

        while pending.len() < self.config.max_event_len {
            let Some(hit) = self.sorter.next_hit()? else {
                break;
            };

            if is_associated(&hit, &pending, self.config.dt_cut) {
                pending.push(hit);
            } else if pending.len() >= self.config.min_event_len {
                match self.config.boundary_policy {
                    BoundaryHitPolicy::Drop => {
                        debug!("dropping boundary hit {} at ts={}", hit.id, hit.ts.as_u64());
                    }
                    BoundaryHitPolicy::SeedNext => self.carry = Some(hit),
                }
                return Ok(Some(self.store(pending)));
            } else {
                debug!(
                    "discarding {} hits below min_event_len={}",
                    pending.len(),
                    self.config.min_event_len
                );
                pending.clear();
                pending.push(hit);
            }
        }

        if pending.len() >= self.config.min_event_len {
            Ok(Some(self.store(pending)))
        } else {
            if !pending.is_empty() {
                debug!("end of stream: dropping {} trailing hits", pending.len());
            }
            Ok(None)
        }
    }

    fn store(&mut self, hits: Vec<Hit>) -> Arc<Event> {
        let event = Arc::new(Event::new(self.next_id, hits));
        debug!(
            "event {}: {} hits, ts {}..{}",
            event.id(),
            event.len(),
            event.collection().ts_start().as_u64(),
            event.collection().ts_end().as_u64()
        );
        self.next_id += 1;
        self.events.push(Arc::clone(&event));
        event
    }
}

impl<S: HitSource> Iterator for EventBuilder<S> {
    type Item = Result<Arc<Event>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

/// Returns true if `hit` lies within `dt_cut` of any pending hit, or if
/// nothing is pending.
#[must_use]
pub fn is_associated(hit: &Hit, pending: &[Hit], dt_cut: u64) -> bool {
    pending.is_empty()
        || pending
            .iter()
            .rev()
            .any(|p| hit.ts.abs_diff(&p.ts) < dt_cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryHitSource;

    fn config() -> EventBuilderConfig {
        EventBuilderConfig::new()
            .with_dt_cut(10)
            .with_min_event_len(2)
            .with_max_event_len(100)
            .with_sort_buffer_length(4)
    }

    fn event_ts(event: &Event) -> Vec<u64> {
        event.hits().iter().map(|h| h.ts.as_u64()).collect()
    }

    #[test]
    fn test_association_any_member() {
        let pending = vec![Hit::new(0, 0.0, 0.0, 100, 0.0), Hit::new(1, 0.0, 0.0, 200, 0.0)];
        assert!(is_associated(&Hit::new(2, 0.0, 0.0, 105, 0.0), &pending, 10));
        assert!(!is_associated(&Hit::new(2, 0.0, 0.0, 210, 0.0), &pending, 10));
        assert!(is_associated(&Hit::new(2, 0.0, 0.0, 9_999, 0.0), &[], 10));
    }

    #[test]
    fn test_drops_boundary_hit() {
        let source = MemoryHitSource::from_timestamps(&[0, 5, 9, 100, 105, 110, 200, 205]);
        let mut builder = EventBuilder::new(source, config()).unwrap();

        let first = builder.next_event().unwrap().unwrap();
        assert_eq!(event_ts(&first), vec![0, 5, 9]);
        // 100 closed the first event and is lost
        let second = builder.next_event().unwrap().unwrap();
        assert_eq!(event_ts(&second), vec![105, 110]);
        // 200 is lost the same way, leaving 205 alone below min_event_len
        assert!(builder.next_event().unwrap().is_none());
        assert_eq!(builder.events().len(), 2);
    }

    #[test]
    fn test_seed_next_keeps_boundary_hit() {
        let source = MemoryHitSource::from_timestamps(&[0, 5, 9, 100, 105, 110, 200, 205]);
        let config = config().with_boundary_policy(BoundaryHitPolicy::SeedNext);
        let builder = EventBuilder::new(source, config).unwrap();

        let events: Vec<Vec<u64>> = builder.map(|e| event_ts(&e.unwrap())).collect();
        assert_eq!(
            events,
            vec![vec![0, 5, 9], vec![100, 105, 110], vec![200, 205]]
        );
    }

    #[test]
    fn test_short_group_discarded_hit_kept() {
        let source = MemoryHitSource::from_timestamps(&[0, 50, 55, 60]);
        let mut builder = EventBuilder::new(source, config()).unwrap();

        let event = builder.next_event().unwrap().unwrap();
        assert_eq!(event_ts(&event), vec![50, 55, 60]);
        assert_eq!(event.id(), 0);
    }

    #[test]
    fn test_max_len_forces_emission() {
        let timestamps: Vec<u64> = (0..7).collect();
        let source = MemoryHitSource::from_timestamps(&timestamps);
        let config = config().with_max_event_len(3);
        let mut builder = EventBuilder::new(source, config).unwrap();

        assert_eq!(event_ts(&builder.next_event().unwrap().unwrap()), vec![0, 1, 2]);
        assert_eq!(event_ts(&builder.next_event().unwrap().unwrap()), vec![3, 4, 5]);
        assert!(builder.next_event().unwrap().is_none());
    }

    #[test]
    fn test_reset_and_clear() {
        let source = MemoryHitSource::from_timestamps(&[0, 1, 50, 51, 52, 100, 101, 102]);
        let mut builder = EventBuilder::new(source, config()).unwrap();

        let first = builder.next_event().unwrap().unwrap();
        let second = builder.next_event().unwrap().unwrap();
        assert_eq!((first.id(), second.id()), (0, 1));

        builder.clear();
        assert!(builder.events().is_empty());
        let third = builder.next_event().unwrap().unwrap();
        assert_eq!(third.id(), 2);
        assert_eq!(event_ts(&third), vec![101, 102]);

        builder.reset();
        assert!(builder.events().is_empty());
        let again = builder.next_event().unwrap().unwrap();
        assert_eq!(again.id(), 0);
        assert_eq!(event_ts(&again), event_ts(&first));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = config().with_min_event_len(10).with_max_event_len(2);
        assert!(EventBuilder::new(MemoryHitSource::default(), config).is_err());
    }
}
