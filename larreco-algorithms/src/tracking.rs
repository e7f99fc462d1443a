//! Iterative peel-off track finding.
//!
//! 1. Vote every point into a fresh [`HoughAccumulator`].
//! 2. Take the best cell as a guess line and refine it against the points
//!    not yet claimed, using one position-bin width as the distance cut.
//! 3. Accept the refined line if it has at least `track_threshold` inliers,
//!    remove their votes and repeat; otherwise stop.
//!
//! Each point is claimed by at most one track.

use crate::fit::{inliers, jackknife_covariance, refine};
use crate::hough::HoughAccumulator;
use larreco_core::{Error, HoughConfig, Result, Track};
use log::debug;
use nalgebra::Point3;

/// Finds straight tracks in point clouds.
#[derive(Debug, Clone, Default)]
pub struct TrackFinder {
    config: HoughConfig,
}

impl TrackFinder {
    /// Creates a finder.
    ///
    /// # Errors
    /// Returns a configuration error if `config` fails validation.
    pub fn new(config: HoughConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the Hough configuration.
    #[must_use]
    pub fn config(&self) -> &HoughConfig {
        &self.config
    }

    /// Extracts disjoint tracks from `points`, in the order found.
    ///
    /// Track hit indices refer to positions in `points`.
    ///
    /// # Errors
    /// Propagates degenerate-geometry and non-finite point errors. Running
    /// out of points is not an error; the tracks found so far are returned.
    pub fn find_tracks(&self, points: &[Point3<f64>]) -> Result<Vec<Track>> {
        let threshold = self.config.track_threshold;
        let mut tracks = Vec::new();
        if points.len() < threshold {
            return Ok(tracks);
        }

        let mut remaining: Vec<usize> = (0..points.len()).collect();
        let mut acc = HoughAccumulator::build(points, &self.config)?;
        acc.add_votes(&remaining);
        let distance = acc.bin_width();

        while remaining.len() >= threshold {
            let Some(cell) = acc.best_cell() else {
                break;
            };
            let guess = acc.line_for(&cell)?;

            let fitted = match refine(points, &remaining, &guess, distance) {
                Ok(line) => line,
                Err(Error::InsufficientPoints { found, .. }) => {
                    debug!("proposal with {} votes rejected: {found} points near guess", cell.votes);
                    break;
                }
                Err(e) => return Err(e),
            };

            let members = inliers(points, &remaining, &fitted, distance);
            if members.len() < threshold {
                debug!(
                    "proposal with {} votes rejected: {} inliers < {threshold}",
                    cell.votes,
                    members.len()
                );
                break;
            }

            let mut track = Track::new(fitted, members.clone());
            if self.config.fit_covariance {
                match jackknife_covariance(points, &members, &fitted) {
                    Ok(cov) => track = track.with_covariance(cov),
                    Err(e) => debug!("no covariance for track {}: {e}", tracks.len()),
                }
            }

            acc.remove_votes(&members);
            remaining.retain(|i| members.binary_search(i).is_err());
            debug!(
                "track {}: {} hits, theta={:.4} phi={:.4}",
                tracks.len(),
                track.len(),
                fitted.theta(),
                fitted.phi()
            );
            tracks.push(track);
        }

        Ok(tracks)
    }
}

/// Convenience wrapper around [`TrackFinder::find_tracks`].
///
/// # Errors
/// See [`TrackFinder::new`] and [`TrackFinder::find_tracks`].
pub fn find_tracks(points: &[Point3<f64>], config: &HoughConfig) -> Result<Vec<Track>> {
    TrackFinder::new(config.clone())?.find_tracks(points)
}
