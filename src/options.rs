//! Engine configuration.
use serde::{Deserialize, Serialize};

/// What to do with a query coordinate outside the sampled range of its axis.
///
/// Queries are never clamped unless `Clamp` is chosen explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extrapolation {
    /// Clamp the coordinate onto the sampled range, then interpolate.
    Clamp,
    /// Fail with `OutOfDomain`.
    Error,
    /// Return the data of the nearest table row.
    #[default]
    Nearest,
    /// Extend the edge cell linearly.
    Linear,
}

/// What to do when a corner of the bounding hyper-cube has no table row,
/// which happens on sparse or irregular grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingCorner {
    /// Return the data of the nearest table row.
    #[default]
    Nearest,
    /// Fail with `HoleInGrid`.
    Error,
}

/// Configuration for an [`Interpolator`](crate::Interpolator).
///
/// ```rust
/// use rinterpolate::{Extrapolation, Options};
///
/// let opts = Options::default()
///     .with_name("opacity")
///     .with_result_cache(1024)
///     .with_extrapolation(Extrapolation::Linear);
/// assert!(opts.use_result_cache);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Name used in diagnostics
    pub name: String,
    /// Memoize results for exact repeated queries
    pub use_result_cache: bool,
    /// Maximum number of memoized results
    pub result_cache_capacity: usize,
    /// Out-of-range policy
    pub extrapolation: Extrapolation,
    /// Missing-corner policy
    pub missing_corner: MissingCorner,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            name: String::from("rinterpolator"),
            use_result_cache: false,
            result_cache_capacity: 4096,
            extrapolation: Extrapolation::default(),
            missing_corner: MissingCorner::default(),
        }
    }
}

impl Options {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enable the result cache with room for `capacity` entries.
    /// A capacity of zero disables it.
    pub fn with_result_cache(mut self, capacity: usize) -> Self {
        self.use_result_cache = capacity > 0;
        self.result_cache_capacity = capacity;
        self
    }

    pub fn with_extrapolation(mut self, extrapolation: Extrapolation) -> Self {
        self.extrapolation = extrapolation;
        self
    }

    pub fn with_missing_corner(mut self, missing_corner: MissingCorner) -> Self {
        self.missing_corner = missing_corner;
        self
    }
}
