//! Summary scan of a hit source.

use crate::Result;
use larreco_core::{HitSource, Timestamp};
use larreco_events::StreamSorter;

/// Statistics gathered by [`scan_source`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SourceSummary {
    /// Number of rows in the source.
    pub rows: usize,
    /// Earliest timestamp, if any rows.
    pub ts_min: Option<Timestamp>,
    /// Latest timestamp, if any rows.
    pub ts_max: Option<Timestamp>,
    /// Sum of hit charges.
    pub charge_sum: f64,
    /// Rows whose timestamp is earlier than some preceding row.
    pub out_of_order: usize,
    /// Largest number of rows any late hit trails its position in time order.
    pub max_lag: usize,
    /// Buffer length the ordering check used.
    pub buffer_length: usize,
    /// Rows still out of order after sorting with `buffer_length`.
    pub unsorted_after_buffer: usize,
}

impl SourceSummary {
    /// True if the stream sorter fully orders the source.
    #[must_use]
    pub fn sorted_within_buffer(&self) -> bool {
        self.unsorted_after_buffer == 0
    }
}

/// Reads every row of `source` and checks whether a sorter with
/// `buffer_length` slots restores time order.
///
/// # Errors
/// Returns an error if a row cannot be read or `buffer_length` is zero.
pub fn scan_source<S: HitSource>(source: &S, buffer_length: usize) -> Result<SourceSummary> {
    let mut summary = SourceSummary {
        rows: source.len(),
        buffer_length,
        ..SourceSummary::default()
    };

    // (timestamp, position) of every row seen so far that is later than all
    // rows before it; a late hit trails the first of these exceeding it.
    let mut maxima: Vec<(Timestamp, usize)> = Vec::new();
    for index in 0..source.len() {
        let Some(hit) = source.get_hit(index)? else {
            break;
        };
        summary.charge_sum += hit.q;
        summary.ts_min = Some(summary.ts_min.map_or(hit.ts, |t| t.min(hit.ts)));
        summary.ts_max = Some(summary.ts_max.map_or(hit.ts, |t| t.max(hit.ts)));

        match maxima.last() {
            Some(&(latest, _)) if hit.ts < latest => {
                summary.out_of_order += 1;
                let first = maxima.partition_point(|&(ts, _)| ts <= hit.ts);
                summary.max_lag = summary.max_lag.max(index - maxima[first].1);
            }
            Some(&(latest, _)) if hit.ts == latest => {}
            _ => maxima.push((hit.ts, index)),
        }
    }

    let mut sorter = StreamSorter::new(source, buffer_length)?;
    let mut previous: Option<Timestamp> = None;
    while let Some(hit) = sorter.next_hit()? {
        if previous.is_some_and(|ts| hit.ts < ts) {
            summary.unsorted_after_buffer += 1;
        } else {
            previous = Some(hit.ts);
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use larreco_events::MemoryHitSource;

    #[test]
    fn test_scan_sorted_source() {
        let source = MemoryHitSource::from_timestamps(&[10, 20, 20, 30]);
        let summary = scan_source(&source, 1).unwrap();
        assert_eq!(summary.rows, 4);
        assert_eq!(summary.ts_min, Some(Timestamp::new(10)));
        assert_eq!(summary.ts_max, Some(Timestamp::new(30)));
        assert_eq!(summary.out_of_order, 0);
        assert_eq!(summary.max_lag, 0);
        assert!(summary.sorted_within_buffer());
    }

    #[test]
    fn test_scan_late_hits() {
        // 15 trails 20 by two rows, 25 trails 30 by three
        let source = MemoryHitSource::from_timestamps(&[10, 20, 30, 15, 40, 25]);
        let summary = scan_source(&source, 4).unwrap();
        assert_eq!(summary.out_of_order, 2);
        assert_eq!(summary.max_lag, 3);
        assert!(summary.sorted_within_buffer());

        let tight = scan_source(&source, 1).unwrap();
        assert!(!tight.sorted_within_buffer());
    }

    #[test]
    fn test_scan_empty_source() {
        let source = MemoryHitSource::new(Vec::new());
        let summary = scan_source(&source, 8).unwrap();
        assert_eq!(summary.rows, 0);
        assert!(summary.ts_min.is_none());
        assert!(summary.sorted_within_buffer());
        assert!(scan_source(&source, 0).is_err());
    }
}
