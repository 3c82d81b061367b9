//! Query-optimized index of a table: the native representation that the
//! interpolation engine searches.
//!
//! Rows may arrive in any order and need not fill a full grid. For each
//! parameter the sorted unique sampled values form an axis; each row is then
//! addressed by its tuple of axis indices. A cell of the resulting rectilinear
//! grid is fully sampled when all of its `2^nparams` corners have rows.
//!
//! When several rows share one parameter tuple, the last of them wins.
use crate::error::{InterpError, Result};
use crate::nearest::NearestRows;
use crate::table::Table;
use log::debug;
use rustc_hash::FxHashMap;

/// Sorted axes, corner map and nearest-row index for one version of a table.
pub struct GridIndex {
    /// Sorted unique sampled values, one axis per parameter
    axes: Vec<Vec<f64>>,

    /// Axis-index tuple of each distinct parameter tuple -> row number
    corners: FxHashMap<Box<[usize]>, usize>,

    /// Fallback lookup over the rows held in `corners`
    nearest: NearestRows,

    /// Number of values in the indexed table
    size: usize,

    /// Table version this index was built from
    version: u64,
}

impl GridIndex {
    /// Build the index in O(nrows log nrows).
    ///
    /// # Errors
    /// * If the table has no rows
    pub fn build(table: &Table, version: u64) -> Result<Self> {
        if table.is_empty() {
            return Err(InterpError::EmptyTable);
        }
        let nparams = table.nparams();

        let axes: Vec<Vec<f64>> = (0..nparams)
            .map(|j| {
                let mut axis: Vec<f64> = table.rows().map(|r| r[j]).collect();
                axis.sort_by(f64::total_cmp);
                axis.dedup();
                axis
            })
            .collect();

        let mut corners = FxHashMap::default();
        corners.reserve(table.nrows());
        let mut loc = vec![0_usize; nparams];
        for (i, row) in table.rows().enumerate() {
            for j in 0..nparams {
                loc[j] = axes[j].partition_point(|a| *a < row[j]);
            }
            corners.insert(loc.clone().into_boxed_slice(), i);
        }

        let mut winners: Vec<usize> = corners.values().copied().collect();
        winners.sort_unstable();
        let bounds: Vec<(f64, f64)> = axes.iter().map(|a| (a[0], a[a.len() - 1])).collect();
        let nearest = NearestRows::build(table, &winners, &bounds)?;

        let out = Self {
            axes,
            corners,
            nearest,
            size: table.len(),
            version,
        };
        debug!(
            "Built table index v{version}: {} rows, {} distinct points, axis sizes {:?}, complete grid: {}",
            table.nrows(),
            out.corner_count(),
            out.axes.iter().map(Vec::len).collect::<Vec<_>>(),
            out.is_complete()
        );
        Ok(out)
    }

    /// Sorted unique values of every parameter
    #[inline]
    pub fn axes(&self) -> &[Vec<f64>] {
        &self.axes
    }

    #[inline]
    pub fn axis(&self, dim: usize) -> &[f64] {
        &self.axes[dim]
    }

    /// Sampled `(lo, hi)` range of a parameter
    #[inline]
    pub fn bounds(&self, dim: usize) -> (f64, f64) {
        let axis = &self.axes[dim];
        (axis[0], axis[axis.len() - 1])
    }

    #[inline]
    pub fn ndims(&self) -> usize {
        self.axes.len()
    }

    /// Number of distinct parameter tuples
    #[inline]
    pub fn corner_count(&self) -> usize {
        self.corners.len()
    }

    /// Whether every point of the rectilinear grid spanned by the axes has a row
    pub fn is_complete(&self) -> bool {
        self.axes
            .iter()
            .try_fold(1_usize, |acc, a| acc.checked_mul(a.len()))
            .is_some_and(|n| n == self.corners.len())
    }

    /// Number of values in the table this index was built from
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Row at the grid point with the given per-axis indices
    #[inline]
    pub fn corner(&self, loc: &[usize]) -> Option<usize> {
        self.corners.get(loc).copied()
    }

    /// Row nearest to an arbitrary point
    pub fn nearest(&self, x: &[f64]) -> Result<usize> {
        self.nearest
            .nearest(x)?
            .ok_or_else(|| InterpError::CacheInconsistency("index holds no rows".to_string()))
    }
}

impl core::fmt::Debug for GridIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GridIndex")
            .field("axes", &self.axes.iter().map(Vec::len).collect::<Vec<_>>())
            .field("corners", &self.corners.len())
            .field("size", &self.size)
            .field("version", &self.version)
            .finish()
    }
}
