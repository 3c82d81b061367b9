//! The interpolation engine: owns one table and the caches derived from it.
//!
//! ```rust
//! use rinterpolate::{Interpolator, Options};
//!
//! // x, y, f(x, y)
//! let rows = [
//!     [0.0, 0.0, 0.0],
//!     [1.0, 0.0, 1.0],
//!     [0.0, 1.0, 2.0],
//!     [1.0, 1.0, 3.0],
//! ];
//! let mut interp = Interpolator::from_rows(&rows, 2, 1, Options::default()).unwrap();
//! assert_eq!(interp.interpolate(&[0.5, 0.5]).unwrap(), vec![1.5]);
//!
//! // Scaling a column invalidates everything derived from the table
//! interp.scale_column(2, 10.0).unwrap();
//! assert_eq!(interp.interpolate(&[0.5, 0.5]).unwrap(), vec![15.0]);
//! ```
use crate::cache::{NativeCache, ResultCache};
use crate::error::{InterpError, Result};
use crate::grid::GridIndex;
use crate::multilinear::evaluate;
use crate::options::Options;
use crate::table::{Shape, Table};
use log::{debug, info, trace};
use num_traits::ToPrimitive;
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;

/// Single-threaded interpolation engine.
///
/// Querying takes `&mut self` because the native index is built lazily and
/// results may be memoized. For concurrent read-only use, take a
/// [`Snapshot`].
///
/// Every mutation of the table bumps its version and drops the native index
/// before returning, so the next query always sees the new contents.
#[derive(Debug)]
pub struct Interpolator {
    options: Options,
    shape: Option<Shape>,
    table: Option<Arc<Table>>,
    native: NativeCache,
    results: Option<ResultCache>,
    version: u64,
}

impl Interpolator {
    /// An engine with neither shape nor table.
    pub fn new(options: Options) -> Self {
        info!("{}: creating", options.name);
        let results = options
            .use_result_cache
            .then(|| ResultCache::new(options.result_cache_capacity));
        Self {
            options,
            shape: None,
            table: None,
            native: NativeCache::new(),
            results,
            version: 0,
        }
    }

    pub fn with_table(table: Table, options: Options) -> Self {
        let mut out = Self::new(options);
        out.set_table(table);
        out
    }

    /// Load a nested table of `nparams` parameters and `ndata` data values per row.
    ///
    /// # Errors
    /// * If `nparams` is zero or any row is not `nparams + ndata` long
    pub fn from_rows<T, R>(rows: &[R], nparams: usize, ndata: usize, options: Options) -> Result<Self>
    where
        T: ToPrimitive,
        R: AsRef<[T]>,
    {
        let table = Table::from_rows(rows, Shape::new(nparams, ndata)?)?;
        Ok(Self::with_table(table, options))
    }

    /// Set the row shape. If a table is loaded, its values are reinterpreted
    /// with the new shape.
    ///
    /// # Errors
    /// * If `nparams` is zero
    /// * If the loaded table is not a whole number of rows of the new width;
    ///   the previous shape is kept
    pub fn configure(&mut self, nparams: usize, ndata: usize) -> Result<()> {
        let shape = Shape::new(nparams, ndata)?;
        if self.shape == Some(shape) {
            return Ok(());
        }
        if let Some(table) = &mut self.table {
            Arc::make_mut(table).reshape(shape)?;
        }
        debug!("{}: shape set to {nparams} parameters, {ndata} data", self.name());
        self.shape = Some(shape);
        self.mutated();
        Ok(())
    }

    /// Replace the table, adopting its shape.
    pub fn set_table(&mut self, table: Table) {
        debug!(
            "{}: setting table of {} rows ({} parameters, {} data)",
            self.name(),
            table.nrows(),
            table.nparams(),
            table.ndata()
        );
        self.shape = Some(table.shape());
        self.table = Some(Arc::new(table));
        self.mutated();
    }

    /// Replace the table with nested rows of the configured shape.
    ///
    /// # Errors
    /// * `NotConfigured` if no shape has been set
    /// * `InvalidInput` if the rows do not fit the shape; the previous table is kept
    pub fn set_rows<T, R>(&mut self, rows: &[R]) -> Result<()>
    where
        T: ToPrimitive,
        R: AsRef<[T]>,
    {
        let shape = self.configured()?;
        self.set_table(Table::from_rows(rows, shape)?);
        Ok(())
    }

    /// Replace the table with a flat row-major buffer of the configured shape.
    ///
    /// # Errors
    /// * `NotConfigured` if no shape has been set
    /// * `InvalidInput` if the buffer does not fit the shape; the previous table is kept
    pub fn set_flat(&mut self, values: Vec<f64>) -> Result<()> {
        let shape = self.configured()?;
        self.set_table(Table::from_flat(values, shape)?);
        Ok(())
    }

    /// Multiply logical column `index` (0 = first parameter) by `factor`.
    ///
    /// # Errors
    /// * `EmptyTable` if no table is loaded
    /// * `InvalidInput` if the column does not exist; the table is kept
    pub fn scale_column(&mut self, index: usize, factor: f64) -> Result<()> {
        let table = self.table.as_mut().ok_or(InterpError::EmptyTable)?;
        Arc::make_mut(table).scale_column(index, factor)?;
        debug!("{}: multiplied column {index} by {factor}", self.name());
        self.mutated();
        Ok(())
    }

    /// Interpolate at `query`, which must have one value per parameter.
    ///
    /// # Errors
    /// See [`interpolate_into`](Self::interpolate_into).
    pub fn interpolate(&mut self, query: &[f64]) -> Result<Vec<f64>> {
        let shape = self.configured()?;
        let mut out = vec![0.0; shape.ndata()];
        self.interpolate_into(query, &mut out)?;
        Ok(out)
    }

    /// Interpolate at `query`, writing one value per data column into `out`.
    /// On failure nothing is written to `out` or memoized.
    ///
    /// # Errors
    /// * `NotConfigured` if no shape has been set
    /// * `EmptyTable` if no table is loaded or it has no rows
    /// * `DimensionMismatch` if `query` does not have `nparams` entries
    /// * Any error of [`evaluate`](crate::multilinear::evaluate)
    pub fn interpolate_into(&mut self, query: &[f64], out: &mut [f64]) -> Result<()> {
        let table = self.checked_table(query)?;
        trace!("{}: interpolate at {query:?}", self.options.name);

        if let Some(results) = &mut self.results {
            if let Some(hit) = results.lookup(self.version, query) {
                if hit.len() == out.len() {
                    out.copy_from_slice(hit);
                    return Ok(());
                }
            }
        }

        let index = self.native.ensure_built(&table, self.version)?;
        evaluate(&table, &index, &self.options, query, out)?;

        if let Some(results) = &mut self.results {
            results.store(self.version, query, out);
        }
        Ok(())
    }

    /// Interpolate at many points given back to back, `nparams` values each,
    /// writing `ndata` values per point into `out`.
    /// On failure `out` is left untouched.
    pub fn interpolate_many(&mut self, queries: &[f64], out: &mut [f64]) -> Result<()> {
        let shape = self.configured()?;
        let npoints = batch_len(shape, queries, Some(out.len()))?;

        let mut tmp = vec![0.0; out.len()];
        for i in 0..npoints {
            let q = &queries[i * shape.nparams()..(i + 1) * shape.nparams()];
            let o = &mut tmp[i * shape.ndata()..(i + 1) * shape.ndata()];
            self.interpolate_into(q, o)?;
        }
        out.copy_from_slice(&tmp);
        Ok(())
    }

    /// Build the native index now and share it, with the table it indexes,
    /// as an immutable snapshot. Later mutations of this engine do not affect
    /// the snapshot.
    ///
    /// # Errors
    /// * `NotConfigured` or `EmptyTable` as for queries
    pub fn snapshot(&mut self) -> Result<Snapshot> {
        self.configured()?;
        let table = match &self.table {
            Some(t) if !t.is_empty() => Arc::clone(t),
            _ => return Err(InterpError::EmptyTable),
        };
        let index = self.native.ensure_built(&table, self.version)?;
        Ok(Snapshot {
            options: self.options.clone(),
            table,
            index,
        })
    }

    /// Free the native index and memoized results, keeping the table.
    pub fn clear_cache(&mut self) {
        if self.native.invalidate() {
            debug!("{}: freed native table index", self.name());
        }
        if let Some(results) = &mut self.results {
            results.clear();
        }
    }

    /// Release the table and every cache.
    pub fn destroy(mut self) {
        self.clear_cache();
        info!("{}: destroyed", self.name());
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.options.name
    }

    #[inline]
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn param_count(&self) -> Option<usize> {
        self.shape.map(|s| s.nparams())
    }

    pub fn data_count(&self) -> Option<usize> {
        self.shape.map(|s| s.ndata())
    }

    pub fn row_count(&self) -> Option<usize> {
        self.table.as_ref().map(|t| t.nrows())
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_deref()
    }

    /// Counter bumped by every table mutation
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_cache_built(&self) -> bool {
        self.native.is_built()
    }

    /// Number of memoized results, including stale ones awaiting eviction
    pub fn cached_results(&self) -> usize {
        self.results.as_ref().map_or(0, ResultCache::len)
    }

    fn configured(&self) -> Result<Shape> {
        self.shape
            .ok_or(InterpError::NotConfigured("nparams and ndata are not set"))
    }

    /// Validate a query against the loaded table without touching any cache
    fn checked_table(&self, query: &[f64]) -> Result<Arc<Table>> {
        let shape = self.configured()?;
        let table = match &self.table {
            Some(t) if !t.is_empty() => Arc::clone(t),
            _ => return Err(InterpError::EmptyTable),
        };
        if query.len() != shape.nparams() {
            return Err(InterpError::DimensionMismatch {
                expected: shape.nparams(),
                got: query.len(),
            });
        }
        Ok(table)
    }

    fn mutated(&mut self) {
        self.version = self.version.wrapping_add(1);
        if self.native.invalidate() {
            debug!("{}: table changed, freed native table index", self.name());
        }
    }
}

impl fmt::Display for Interpolator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An immutable table with its native index, safe to share across threads.
#[derive(Debug, Clone)]
pub struct Snapshot {
    options: Options,
    table: Arc<Table>,
    index: Arc<GridIndex>,
}

impl Snapshot {
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn index(&self) -> &GridIndex {
        &self.index
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn interpolate(&self, query: &[f64]) -> Result<Vec<f64>> {
        let mut out = vec![0.0; self.table.ndata()];
        self.interpolate_into(query, &mut out)?;
        Ok(out)
    }

    pub fn interpolate_into(&self, query: &[f64], out: &mut [f64]) -> Result<()> {
        evaluate(&self.table, &self.index, &self.options, query, out)
    }

    /// Interpolate at many points given back to back, `nparams` values each,
    /// in parallel. Returns `ndata` values per point.
    pub fn interpolate_batch(&self, queries: &[f64]) -> Result<Vec<f64>> {
        let shape = self.table.shape();
        let npoints = batch_len(shape, queries, None)?;
        let mut out = vec![0.0; npoints * shape.ndata()];

        if shape.ndata() == 0 {
            // No outputs to chunk; still validate every query
            let mut empty = [0.0_f64; 0];
            for q in queries.chunks_exact(shape.nparams()) {
                self.interpolate_into(q, &mut empty)?;
            }
            return Ok(out);
        }

        queries
            .par_chunks_exact(shape.nparams())
            .zip(out.par_chunks_exact_mut(shape.ndata()))
            .try_for_each(|(q, o)| self.interpolate_into(q, o))?;
        Ok(out)
    }
}

/// Number of points in a back-to-back batch, checking the output size if given
fn batch_len(shape: Shape, queries: &[f64], out_len: Option<usize>) -> Result<usize> {
    if queries.len() % shape.nparams() != 0 {
        return Err(InterpError::InvalidInput(format!(
            "{} query values do not make whole points of {} parameters",
            queries.len(),
            shape.nparams()
        )));
    }
    let npoints = queries.len() / shape.nparams();
    if let Some(out_len) = out_len {
        if out_len != npoints * shape.ndata() {
            return Err(InterpError::InvalidInput(format!(
                "output has {out_len} entries, expected {}",
                npoints * shape.ndata()
            )));
        }
    }
    Ok(npoints)
}
