//! High-level helpers that combine event building and track finding.

use crate::tracking::TrackFinder;
use larreco_core::{
    Event, HitSource, HoughConfig, PointScale, ReconstructedEvent, ReconstructionConfig, Result,
};
use larreco_events::EventBuilder;
use log::{debug, info};
use std::sync::Arc;

/// Totals gathered by [`reconstruct_stream`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructionSummary {
    /// Events emitted by the builder.
    pub events: usize,
    /// Hits contained in those events.
    pub hits: usize,
    /// Accepted tracks.
    pub tracks: usize,
    /// Event hits not claimed by any track.
    pub orphans: usize,
}

/// Finds the tracks of one event.
///
/// # Errors
/// Returns configuration or degenerate-geometry errors.
pub fn reconstruct_event(
    event: Arc<Event>,
    hough: &HoughConfig,
    scale: &PointScale,
) -> Result<ReconstructedEvent> {
    let finder = TrackFinder::new(hough.clone())?;
    reconstruct_with(&finder, event, scale)
}

fn reconstruct_with(
    finder: &TrackFinder,
    event: Arc<Event>,
    scale: &PointScale,
) -> Result<ReconstructedEvent> {
    let points = event.points(scale);
    let tracks = finder.find_tracks(&points)?;
    let reco = ReconstructedEvent::new(event, tracks);
    debug!(
        "event {}: {} tracks, {} orphans",
        reco.event.id(),
        reco.tracks.len(),
        reco.orphans.len()
    );
    Ok(reco)
}

/// Builds events from `source` and hands each reconstructed event to `sink`.
///
/// The builder history is cleared after every event, so memory use does not
/// grow with the stream.
///
/// # Errors
/// Stops at the first error from the source, the track finder or the sink.
pub fn reconstruct_stream<S, F, E>(
    source: S,
    config: &ReconstructionConfig,
    mut sink: F,
) -> std::result::Result<ReconstructionSummary, E>
where
    S: HitSource,
    F: FnMut(ReconstructedEvent) -> std::result::Result<(), E>,
    E: From<larreco_core::Error>,
{
    config.validate()?;
    let finder = TrackFinder::new(config.hough.clone())?;
    let mut builder = EventBuilder::new(source, config.events.clone())?;
    let mut summary = ReconstructionSummary::default();

    while let Some(event) = builder.next_event()? {
        builder.clear();
        let reco = reconstruct_with(&finder, event, &config.scale)?;
        summary.events += 1;
        summary.hits += reco.event.len();
        summary.tracks += reco.tracks.len();
        summary.orphans += reco.orphans.len();
        sink(reco)?;
    }

    info!(
        "reconstructed {} events: {} hits, {} tracks, {} orphans",
        summary.events, summary.hits, summary.tracks, summary.orphans
    );
    Ok(summary)
}

/// Collects every reconstructed event of `source` in memory.
///
/// # Errors
/// See [`reconstruct_stream`].
pub fn reconstruct_all<S: HitSource>(
    source: S,
    config: &ReconstructionConfig,
) -> Result<Vec<ReconstructedEvent>> {
    let mut out = Vec::new();
    reconstruct_stream(source, config, |reco| {
        out.push(reco);
        Ok::<(), larreco_core::Error>(())
    })?;
    Ok(out)
}
