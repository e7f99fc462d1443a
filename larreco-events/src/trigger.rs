//! External-trigger pairing for built events.
//!
//! Trigger finding is a strategy applied to an already-built event stream:
//! [`TriggerPairing`] wraps any event iterator and attaches the timestamp
//! found by an [`ExternalTriggerFinder`] to each event.

use larreco_core::{Event, Result, Timestamp};
use std::sync::Arc;

/// Locates an external trigger signature inside an event.
pub trait ExternalTriggerFinder {
    /// Returns the trigger time if the event carries a trigger signature.
    fn find_external_trigger(&self, event: &Event) -> Option<Timestamp>;
}

impl<F: Fn(&Event) -> Option<Timestamp>> ExternalTriggerFinder for F {
    fn find_external_trigger(&self, event: &Event) -> Option<Timestamp> {
        self(event)
    }
}

/// Detects a trigger as a burst of consecutive hits on one channel.
///
/// The trigger time is the timestamp of the first hit of the first run of
/// `run_length` consecutive hits on `channel_id` (and `chip_id`, when set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelBurstTrigger {
    pub channel_id: u32,
    pub chip_id: Option<u32>,
    pub run_length: usize,
}

impl ChannelBurstTrigger {
    /// Creates a trigger on `channel_id` of any chip.
    #[must_use]
    pub fn new(channel_id: u32, run_length: usize) -> Self {
        Self {
            channel_id,
            chip_id: None,
            run_length,
        }
    }

    /// Restricts the trigger channel to one chip.
    #[must_use]
    pub fn with_chip(mut self, chip_id: u32) -> Self {
        self.chip_id = Some(chip_id);
        self
    }
}

impl ExternalTriggerFinder for ChannelBurstTrigger {
    fn find_external_trigger(&self, event: &Event) -> Option<Timestamp> {
        if self.run_length == 0 {
            return None;
        }

        let mut run = 0;
        for (index, hit) in event.hits().iter().enumerate() {
            let on_channel = hit.channel_id == self.channel_id
                && self.chip_id.map_or(true, |chip| hit.chip_id == chip);
            if !on_channel {
                run = 0;
                continue;
            }
            run += 1;
            if run == self.run_length {
                return Some(event.hits()[index + 1 - run].ts);
            }
        }
        None
    }
}

/// Iterator adapter pairing each event with its external trigger time.
#[derive(Debug)]
pub struct TriggerPairing<I, F> {
    events: I,
    finder: F,
}

impl<I, F> TriggerPairing<I, F>
where
    I: Iterator<Item = Result<Arc<Event>>>,
    F: ExternalTriggerFinder,
{
    /// Wraps an event stream.
    pub fn new(events: I, finder: F) -> Self {
        Self { events, finder }
    }
}

impl<I, F> Iterator for TriggerPairing<I, F>
where
    I: Iterator<Item = Result<Arc<Event>>>,
    F: ExternalTriggerFinder,
{
    type Item = Result<(Arc<Event>, Option<Timestamp>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let event = match self.events.next()? {
            Ok(event) => event,
            Err(e) => return Some(Err(e)),
        };
        let trigger = self.finder.find_external_trigger(&event);
        Some(Ok((event, trigger)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larreco_core::Hit;

    fn event(channels: &[u32]) -> Event {
        let hits = channels
            .iter()
            .enumerate()
            .map(|(i, &ch)| Hit::new(i, 0.0, 0.0, 100 + i as u64, 1.0).with_channel(1, ch))
            .collect();
        Event::new(0, hits)
    }

    #[test]
    fn test_burst_found() {
        let trigger = ChannelBurstTrigger::new(7, 3);
        let event = event(&[1, 7, 7, 2, 7, 7, 7, 7]);
        assert_eq!(trigger.find_external_trigger(&event), Some(Timestamp::new(104)));
    }

    #[test]
    fn test_no_burst() {
        let trigger = ChannelBurstTrigger::new(7, 3);
        assert_eq!(trigger.find_external_trigger(&event(&[7, 7, 1, 7])), None);
        assert_eq!(trigger.with_chip(2).find_external_trigger(&event(&[7, 7, 7])), None);
    }

    #[test]
    fn test_pairing_adapter() {
        let events: Vec<Result<Arc<Event>>> = vec![
            Ok(Arc::new(event(&[7, 7]))),
            Ok(Arc::new(event(&[1, 2]))),
        ];
        let pairs: Vec<_> = TriggerPairing::new(events.into_iter(), ChannelBurstTrigger::new(7, 2))
            .map(|pair| pair.unwrap().1)
            .collect();
        assert_eq!(pairs, vec![Some(Timestamp::new(100)), None]);
    }

    #[test]
    fn test_closure_finder() {
        let finder = |event: &Event| event.hits().first().map(|h| h.ts);
        assert_eq!(
            finder.find_external_trigger(&event(&[3])),
            Some(Timestamp::new(100))
        );
    }
}
