//! Nearest-row lookup, the fallback for queries that cannot be
//! bracketed by a full cell of table rows.
use crate::error::{InterpError, Result};
use crate::table::Table;
use kdtree::distance::squared_euclidean;
use kdtree::KdTree;

/// Largest magnitude of a normalized coordinate, keeping squared distances finite
const NORMALIZED_LIMIT: f64 = 1e150;

/// A kd-tree over the parameter coordinates of a set of table rows.
///
/// Coordinates are normalized by the span of each axis before insertion,
/// so parameters with very different magnitudes weigh equally.
/// Spans are taken on halved values, so any finite range stays finite.
pub struct NearestRows {
    tree: KdTree<f64, usize, Vec<f64>>,
    half_lo: Vec<f64>,
    half_span: Vec<f64>,
}

impl NearestRows {
    /// Index `rows` of `table`, normalizing with the per-axis `(lo, hi)` bounds.
    pub fn build(table: &Table, rows: &[usize], bounds: &[(f64, f64)]) -> Result<Self> {
        let half_lo: Vec<f64> = bounds.iter().map(|&(lo, _)| 0.5 * lo).collect();
        let half_span: Vec<f64> = bounds
            .iter()
            .map(|&(lo, hi)| {
                let half = 0.5 * hi - 0.5 * lo;
                if half > 0.0 {
                    half
                } else {
                    0.5
                }
            })
            .collect();

        let mut out = Self {
            tree: KdTree::new(table.nparams()),
            half_lo,
            half_span,
        };
        for &i in rows {
            let params = table.params(i).ok_or_else(|| {
                InterpError::CacheInconsistency(format!("row {i} is not in the table"))
            })?;
            let point = out.normalize(params);
            out.tree.add(point, i).map_err(kdtree_error)?;
        }
        Ok(out)
    }

    /// Number of indexed rows
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row number of the table row nearest to `x`, if any rows are indexed.
    pub fn nearest(&self, x: &[f64]) -> Result<Option<usize>> {
        let point = self.normalize(x);
        let found = self
            .tree
            .nearest(&point, 1, &squared_euclidean)
            .map_err(kdtree_error)?;
        Ok(found.first().map(|&(_, &i)| i))
    }

    fn normalize(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.half_lo.iter().zip(&self.half_span))
            .map(|(&v, (&lo, &span))| {
                ((0.5 * v - lo) / span).clamp(-NORMALIZED_LIMIT, NORMALIZED_LIMIT)
            })
            .collect()
    }
}

fn kdtree_error(e: kdtree::ErrorKind) -> InterpError {
    InterpError::InvalidInput(format!("nearest-row search failed: {e:?}"))
}

#[cfg(test)]
mod test {
    use super::NearestRows;
    use crate::table::{Shape, Table};

    #[test]
    fn test_nearest_uses_normalized_distance() {
        // x spans 0..1, y spans 0..1000
        let table = Table::from_rows(
            &[
                [0.0, 0.0, 1.0],
                [1.0, 0.0, 2.0],
                [0.0, 1000.0, 3.0],
                [1.0, 1000.0, 4.0],
            ],
            Shape::new(2, 1).unwrap(),
        )
        .unwrap();
        let nearest =
            NearestRows::build(&table, &[0, 1, 2, 3], &[(0.0, 1.0), (0.0, 1000.0)]).unwrap();
        assert_eq!(nearest.len(), 4);

        // In raw units row 0 would be closest; normalized, x dominates
        assert_eq!(nearest.nearest(&[0.9, 200.0]).unwrap(), Some(1));
        assert_eq!(nearest.nearest(&[0.1, 900.0]).unwrap(), Some(2));
    }

    #[test]
    fn test_nearest_over_full_float_range() {
        let table = Table::from_rows(
            &[[-1e308, 0.0], [0.0, 5.0], [1e308, 10.0]],
            Shape::new(1, 1).unwrap(),
        )
        .unwrap();
        let nearest = NearestRows::build(&table, &[0, 1, 2], &[(-1e308, 1e308)]).unwrap();
        assert_eq!(nearest.nearest(&[-f64::MAX]).unwrap(), Some(0));
        assert_eq!(nearest.nearest(&[1e300]).unwrap(), Some(1));
        assert_eq!(nearest.nearest(&[f64::MAX]).unwrap(), Some(2));

        // A tiny span with a far query saturates instead of overflowing
        let tiny = NearestRows::build(&table, &[0, 2], &[(0.0, 1e-300)]).unwrap();
        assert_eq!(tiny.nearest(&[1e300]).unwrap(), Some(2));
    }

    #[test]
    fn test_nearest_only_sees_indexed_rows() {
        let table =
            Table::from_rows(&[[0.0, 1.0], [1.0, 2.0]], Shape::new(1, 1).unwrap()).unwrap();
        let nearest = NearestRows::build(&table, &[1], &[(0.0, 1.0)]).unwrap();
        assert_eq!(nearest.nearest(&[0.0]).unwrap(), Some(1));

        let empty = NearestRows::build(&table, &[], &[(0.0, 1.0)]).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.nearest(&[0.0]).unwrap(), None);
    }
}
