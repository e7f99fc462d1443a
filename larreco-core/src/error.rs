//! Error types for larreco-core.

use thiserror::Error;

/// Result type alias for larreco operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for larreco operations.
///
/// End of input is never reported through this type: pull-style operations
/// return `Ok(None)` once their source is exhausted.
#[derive(Error, Debug)]
pub enum Error {
    /// Too few (or degenerate) points to compute a stable line direction.
    #[error("insufficient points for a line fit: found {found}, need at least {required}")]
    InsufficientPoints { found: usize, required: usize },

    /// Line direction lies in the reference plane (`bz = -1`), where the
    /// optimal-line projection is undefined.
    #[error("degenerate line direction: theta={theta}, phi={phi}")]
    DegenerateLine { theta: f64, phi: f64 },

    /// A point has a NaN or infinite coordinate.
    #[error("non-finite point at index {index}")]
    NonFinitePoint { index: usize },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Hit source could not produce a row.
    #[error("hit source error: {0}")]
    Source(String),
}
