//! Reconstruction configuration.
//!
//! Every component receives its parameters explicitly at construction; there
//! is no process-wide configuration state.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What to do with the hit whose arrival closes an event.
///
/// The closing hit is not associable with the pending hits, so it belongs to
/// neither the emitted event nor (by default) the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BoundaryHitPolicy {
    /// Discard the closing hit.
    #[default]
    Drop,
    /// Start the next event with the closing hit.
    SeedNext,
}

/// Configuration for sorting and event building.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EventBuilderConfig {
    /// Maximum time difference (ns) for a hit to join pending hits.
    pub dt_cut: u64,
    /// Minimum number of hits in an emitted event.
    pub min_event_len: usize,
    /// Maximum number of hits in an emitted event.
    pub max_event_len: usize,
    /// Look-ahead window of the stream sorter (rows).
    pub sort_buffer_length: usize,
    /// Handling of the hit that closes an event.
    pub boundary_policy: BoundaryHitPolicy,
}

impl Default for EventBuilderConfig {
    fn default() -> Self {
        Self {
            dt_cut: 10_000,
            min_event_len: 5,
            max_event_len: 5000,
            sort_buffer_length: 100,
            boundary_policy: BoundaryHitPolicy::Drop,
        }
    }
}

impl EventBuilderConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the time-association threshold.
    #[must_use]
    pub fn with_dt_cut(mut self, dt_cut: u64) -> Self {
        self.dt_cut = dt_cut;
        self
    }

    /// Sets the minimum event length.
    #[must_use]
    pub fn with_min_event_len(mut self, len: usize) -> Self {
        self.min_event_len = len;
        self
    }

    /// Sets the maximum event length.
    #[must_use]
    pub fn with_max_event_len(mut self, len: usize) -> Self {
        self.max_event_len = len;
        self
    }

    /// Sets the sorter look-ahead window.
    #[must_use]
    pub fn with_sort_buffer_length(mut self, len: usize) -> Self {
        self.sort_buffer_length = len;
        self
    }

    /// Sets the boundary-hit policy.
    #[must_use]
    pub fn with_boundary_policy(mut self, policy: BoundaryHitPolicy) -> Self {
        self.boundary_policy = policy;
        self
    }

    /// Checks parameter ranges.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for out-of-range parameters.
    pub fn validate(&self) -> Result<()> {
        if self.dt_cut == 0 {
            return Err(Error::ConfigError("dt_cut must be positive".into()));
        }
        if self.sort_buffer_length == 0 {
            return Err(Error::ConfigError(
                "sort_buffer_length must be at least 1".into(),
            ));
        }
        if self.min_event_len == 0 {
            return Err(Error::ConfigError("min_event_len must be at least 1".into()));
        }
        if self.min_event_len > self.max_event_len {
            return Err(Error::ConfigError(format!(
                "min_event_len ({}) exceeds max_event_len ({})",
                self.min_event_len, self.max_event_len
            )));
        }
        Ok(())
    }
}

/// Configuration for the Hough transform and iterative track finding.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HoughConfig {
    /// Number of sampled directions on the upper hemisphere.
    pub num_directions: usize,
    /// Number of position bins along each transverse axis.
    pub num_positions: usize,
    /// Minimum inliers for a track to be accepted.
    pub track_threshold: usize,
    /// Vote directions in parallel.
    pub parallel: bool,
    /// Estimate the line-parameter covariance of accepted tracks.
    pub fit_covariance: bool,
}

impl Default for HoughConfig {
    fn default() -> Self {
        Self {
            num_directions: 1000,
            num_positions: 30,
            track_threshold: 5,
            parallel: true,
            fit_covariance: false,
        }
    }
}

impl HoughConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the direction sampling resolution.
    #[must_use]
    pub fn with_num_directions(mut self, n: usize) -> Self {
        self.num_directions = n;
        self
    }

    /// Sets the position binning resolution.
    #[must_use]
    pub fn with_num_positions(mut self, n: usize) -> Self {
        self.num_positions = n;
        self
    }

    /// Sets the minimum inlier count for accepted tracks.
    #[must_use]
    pub fn with_track_threshold(mut self, threshold: usize) -> Self {
        self.track_threshold = threshold;
        self
    }

    /// Enables or disables parallel voting.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enables or disables covariance estimation.
    #[must_use]
    pub fn with_fit_covariance(mut self, enabled: bool) -> Self {
        self.fit_covariance = enabled;
        self
    }

    /// Checks parameter ranges.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for out-of-range parameters.
    pub fn validate(&self) -> Result<()> {
        if self.num_directions == 0 {
            return Err(Error::ConfigError("num_directions must be at least 1".into()));
        }
        if self.num_positions == 0 {
            return Err(Error::ConfigError("num_positions must be at least 1".into()));
        }
        if self.track_threshold == 0 {
            return Err(Error::ConfigError("track_threshold must be at least 1".into()));
        }
        Ok(())
    }
}

/// Conversion from hit coordinates to a common 3-D length unit.
///
/// A hit maps to `(px * xy_scale, py * xy_scale, (ts - ts_start) * time_scale)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PointScale {
    pub xy_scale: f64,
    pub time_scale: f64,
}

impl Default for PointScale {
    fn default() -> Self {
        Self {
            xy_scale: 0.1,
            time_scale: 0.001,
        }
    }
}

impl PointScale {
    /// Identity scaling (pixel units and nanoseconds).
    #[must_use]
    pub fn identity() -> Self {
        Self {
            xy_scale: 1.0,
            time_scale: 1.0,
        }
    }

    /// Checks that both scales are finite and positive.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] otherwise.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("xy_scale", self.xy_scale), ("time_scale", self.time_scale)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::ConfigError(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReconstructionConfig {
    pub events: EventBuilderConfig,
    pub hough: HoughConfig,
    pub scale: PointScale,
}

impl ReconstructionConfig {
    /// Checks all sections.
    ///
    /// # Errors
    /// Returns the first [`Error::ConfigError`] found.
    pub fn validate(&self) -> Result<()> {
        self.events.validate()?;
        self.hough.validate()?;
        self.scale.validate()
    }

    /// Loads and validates a configuration from a JSON file.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if the file cannot be read or parsed, or
    /// fails validation.
    #[cfg(feature = "serde")]
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| Error::ConfigError(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| Error::ConfigError(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration from a JSON string.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if parsing or validation fails.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
