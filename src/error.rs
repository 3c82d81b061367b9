//! Error taxonomy shared by the table store, the caches and the engine.
use thiserror::Error;

/// Failures surfaced by table loading, mutation and interpolation.
///
/// A failed call never leaves a partially mutated table or a partially
/// filled output behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpError {
    /// Malformed table or query contents (fractional row count, ragged rows,
    /// unrepresentable or NaN coordinates, bad column index)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The table shape (`nparams`/`ndata`) has not been set
    #[error("Not configured: {0}")]
    NotConfigured(&'static str),

    /// Query length does not match the number of parameters
    #[error("Dimension mismatch: expected {expected} parameters, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// No table loaded, or the table has no rows
    #[error("Table not set or empty")]
    EmptyTable,

    /// Query is outside the sampled range and the configured policy
    /// does not allow leaving it
    #[error("Coordinate {value} on dimension {dim} is outside the sampled range [{lo}, {hi}]")]
    OutOfDomain {
        dim: usize,
        value: f64,
        lo: f64,
        hi: f64,
    },

    /// A corner of the cell bracketing the query has no table row
    /// and the configured policy does not allow a nearest-row fallback
    #[error("No table row at grid corner {corner:?}")]
    HoleInGrid { corner: Vec<f64> },

    /// Internal invariant violation between a table and its derived index
    #[error("Cache inconsistency: {0}")]
    CacheInconsistency(String),
}

/// Result alias used throughout the crate
pub type Result<T> = core::result::Result<T, InterpError>;
