//! Lazily built native index of the current table.
use crate::error::{InterpError, Result};
use crate::grid::GridIndex;
use crate::table::Table;
use log::debug;
use std::sync::Arc;

/// Holds at most one [`GridIndex`], keyed by the table version and size it
/// was built from.
///
/// The owner must call [`invalidate`](Self::invalidate) whenever the table
/// changes. The version key makes a missed invalidation a rebuild rather than
/// a stale read.
#[derive(Debug, Default)]
pub struct NativeCache {
    index: Option<Arc<GridIndex>>,
}

impl NativeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the index for `table` at `version`, building it if it is absent
    /// or was built from a different version or size.
    ///
    /// # Errors
    /// * If the table is empty
    /// * If the freshly built index disagrees with the table it came from
    pub fn ensure_built(&mut self, table: &Table, version: u64) -> Result<Arc<GridIndex>> {
        if let Some(index) = &self.index {
            if index.version() == version && index.size() == table.len() {
                return Ok(Arc::clone(index));
            }
            debug!(
                "Table changed (v{} size {} -> v{} size {}), rebuilding index",
                index.version(),
                index.size(),
                version,
                table.len()
            );
            self.index = None;
        }

        let index = GridIndex::build(table, version)?;
        if index.size() != table.len() || index.ndims() != table.nparams() {
            return Err(InterpError::CacheInconsistency(format!(
                "index of {} values in {} dims built from a table of {} values in {} dims",
                index.size(),
                index.ndims(),
                table.len(),
                table.nparams()
            )));
        }
        let index = Arc::new(index);
        self.index = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Drop the index. Returns whether there was one to drop.
    pub fn invalidate(&mut self) -> bool {
        self.index.take().is_some()
    }

    pub fn is_built(&self) -> bool {
        self.index.is_some()
    }

    pub fn get(&self) -> Option<&Arc<GridIndex>> {
        self.index.as_ref()
    }
}
