//! Multilinear interpolation/extrapolation over an indexed table.
//!
//! The query is bracketed on each parameter axis by bisection, then the
//! interpolant is evaluated one dimension at a time, recursing from the last
//! parameter down to the corner rows of the bracketing cell:
//!
//! ```text
//! f(x, y) = lerp_y( lerp_x(f00, f10), lerp_x(f01, f11) )
//! ```
//!
//! Each lerp reads `y0 + t * (y1 - y0)` with `t = (x - x0) / (x1 - x0)`.
//! A coordinate lying exactly on a sample gives `t == 0` or `t == 1`, and the
//! branch with zero weight is never visited, so exact samples reproduce their
//! row bit-for-bit and only need that row to exist.
//!
//! Operation Complexity
//! * O(nparams * log2(nrows)) for the bracketing search
//! * O(2^nparams * ndata) for evaluation
//!
//! References
//! * https://en.wikipedia.org/wiki/Bilinear_interpolation#Repeated_linear_interpolation
use crate::error::{InterpError, Result};
use crate::grid::GridIndex;
use crate::options::{Extrapolation, MissingCorner, Options};
use crate::table::Table;
use log::{debug, trace};

/// Interpolate `table` at `query`, writing `ndata` values into `out`.
///
/// `out` is only written on success.
///
/// # Errors
/// * `DimensionMismatch` if `query` does not have `nparams` entries
/// * `InvalidInput` if `out` does not have `ndata` entries or `query` is not finite
/// * `EmptyTable` if the table has no rows
/// * `CacheInconsistency` if `index` was not built from `table`
/// * `OutOfDomain` if the query is outside the sampled range and
///   extrapolation is set to `Error`
/// * `HoleInGrid` if a bracketing corner has no row and the missing-corner
///   policy is `Error`
pub fn evaluate(
    table: &Table,
    index: &GridIndex,
    options: &Options,
    query: &[f64],
    out: &mut [f64],
) -> Result<()> {
    let nparams = table.nparams();
    let ndata = table.ndata();

    if query.len() != nparams {
        return Err(InterpError::DimensionMismatch {
            expected: nparams,
            got: query.len(),
        });
    }
    if out.len() != ndata {
        return Err(InterpError::InvalidInput(format!(
            "output has {} entries, expected {ndata}",
            out.len()
        )));
    }
    if let Some(dim) = query.iter().position(|x| !x.is_finite()) {
        return Err(InterpError::InvalidInput(format!(
            "query coordinate {} on dimension {dim} is not finite",
            query[dim]
        )));
    }
    if table.is_empty() {
        return Err(InterpError::EmptyTable);
    }
    if index.size() != table.len() || index.ndims() != nparams {
        return Err(InterpError::CacheInconsistency(format!(
            "index of {} values used with a table of {} values",
            index.size(),
            table.len()
        )));
    }

    // Lower corner and normalized position on each dimension
    let mut origin = vec![0_usize; nparams];
    let mut dts = vec![0.0_f64; nparams];
    for dim in 0..nparams {
        let (lo, hi) = index.bounds(dim);
        let mut x = query[dim];
        if x < lo || x > hi {
            match options.extrapolation {
                Extrapolation::Clamp => x = x.clamp(lo, hi),
                Extrapolation::Error => {
                    return Err(InterpError::OutOfDomain {
                        dim,
                        value: x,
                        lo,
                        hi,
                    });
                }
                Extrapolation::Nearest => {
                    debug!("Query {query:?} outside the table on dimension {dim}, using nearest row");
                    return nearest_into(table, index, query, out);
                }
                Extrapolation::Linear => {}
            }
        }
        (origin[dim], dts[dim]) = bracket(index.axis(dim), x);
    }

    let cell = Cell {
        table,
        index,
        origin: &origin,
        dts: &dts,
    };
    let mut loc = origin.clone();
    let mut acc = vec![0.0_f64; ndata];
    let mut scratch = vec![0.0_f64; ndata * nparams];

    match cell.populate(nparams, &mut loc, &mut acc, &mut scratch)? {
        Fill::Complete => {
            trace!("Interpolated {query:?} in cell {origin:?} at {dts:?}");
            out.copy_from_slice(&acc);
            Ok(())
        }
        Fill::Missing => match options.missing_corner {
            MissingCorner::Nearest => {
                debug!("Cell {origin:?} around {query:?} is not fully sampled, using nearest row");
                nearest_into(table, index, query, out)
            }
            MissingCorner::Error => Err(InterpError::HoleInGrid {
                corner: loc
                    .iter()
                    .enumerate()
                    .map(|(dim, &i)| index.axis(dim)[i])
                    .collect(),
            }),
        },
    }
}

/// Get the lower-corner index along a sorted axis where `x` is found and
/// the normalized position of `x` in that cell, saturating to the edge cells
/// outside the axis.
///
/// A value equal to a sample gives exactly `t == 0`, or `t == 1` on the last
/// sample. An axis with a single sample holds that sample (`t == 0`).
#[inline]
fn bracket(axis: &[f64], x: f64) -> (usize, f64) {
    let n = axis.len();
    if n < 2 {
        return (0, 0.0);
    }
    let iloc = axis.partition_point(|a| *a <= x) as isize - 1;
    let i = iloc.max(0).min(n as isize - 2) as usize;
    let (x0, x1) = (axis[i], axis[i + 1]);
    let dx = x1 - x0;
    let t = if dx.is_finite() {
        (x - x0) / dx
    } else {
        // Cell wider than f64::MAX; halves keep the span finite
        (0.5 * x - 0.5 * x0) / (0.5 * x1 - 0.5 * x0)
    };
    (i, t)
}

/// Outcome of evaluating one subtree of the cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fill {
    Complete,
    Missing,
}

/// The bracketing cell of one query
struct Cell<'a> {
    table: &'a Table,
    index: &'a GridIndex,
    origin: &'a [usize],
    dts: &'a [f64],
}

impl Cell<'_> {
    /// Recursive evaluation of the interpolant on each dimension.
    ///
    /// `loc` is reset to the origin on `dim - 1` before returning, except
    /// after a missing corner, where it is left pointing at that corner.
    /// `scratch` holds one `ndata` buffer per remaining level.
    fn populate(
        &self,
        dim: usize,
        loc: &mut [usize],
        out: &mut [f64],
        scratch: &mut [f64],
    ) -> Result<Fill> {
        match dim {
            // If we have arrived at a leaf, index into the table
            0 => {
                let Some(row) = self.index.corner(loc) else {
                    return Ok(Fill::Missing);
                };
                let data = self.table.data(row).ok_or_else(|| {
                    InterpError::CacheInconsistency(format!("index points at missing row {row}"))
                })?;
                out.copy_from_slice(data);
                Ok(Fill::Complete)
            }

            // Otherwise, continue recursion
            _ => {
                let next_dim = dim - 1;
                let t = self.dts[next_dim];
                let (upper, rest) = scratch.split_at_mut(out.len());

                // Zero-weight branches are skipped entirely
                if t == 0.0 {
                    loc[next_dim] = self.origin[next_dim];
                    return self.populate(next_dim, loc, out, rest);
                }
                if t == 1.0 {
                    loc[next_dim] = self.origin[next_dim] + 1;
                    let fill = self.populate(next_dim, loc, out, rest)?;
                    if fill == Fill::Complete {
                        loc[next_dim] = self.origin[next_dim];
                    }
                    return Ok(fill);
                }

                loc[next_dim] = self.origin[next_dim];
                if self.populate(next_dim, loc, out, rest)? == Fill::Missing {
                    return Ok(Fill::Missing);
                }
                loc[next_dim] = self.origin[next_dim] + 1;
                if self.populate(next_dim, loc, upper, rest)? == Fill::Missing {
                    return Ok(Fill::Missing);
                }
                loc[next_dim] = self.origin[next_dim];

                // Interpolate on next dim's values to populate an entry in this dim
                for (y0, &y1) in out.iter_mut().zip(upper.iter()) {
                    let dy = y1 - *y0;
                    *y0 = *y0 + t * dy;
                }
                Ok(Fill::Complete)
            }
        }
    }
}

/// Copy the data of the row nearest to `query` into `out`
fn nearest_into(table: &Table, index: &GridIndex, query: &[f64], out: &mut [f64]) -> Result<()> {
    let row = index.nearest(query)?;
    let data = table.data(row).ok_or_else(|| {
        InterpError::CacheInconsistency(format!("nearest-row index points at missing row {row}"))
    })?;
    out.copy_from_slice(data);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{bracket, evaluate};
    use crate::error::InterpError;
    use crate::grid::GridIndex;
    use crate::options::{Extrapolation, MissingCorner, Options};
    use crate::table::{Shape, Table};
    use crate::testing::*;
    use crate::utils::*;

    fn eval(table: &Table, options: &Options, query: &[f64]) -> Result<Vec<f64>, InterpError> {
        let index = GridIndex::build(table, 0)?;
        let mut out = vec![0.0; table.ndata()];
        evaluate(table, &index, options, query, &mut out)?;
        Ok(out)
    }

    #[test]
    fn test_bracket() {
        let axis = [0.0, 1.0, 3.0];
        assert_eq!(bracket(&axis, 0.0), (0, 0.0));
        assert_eq!(bracket(&axis, 1.0), (1, 0.0));
        assert_eq!(bracket(&axis, 3.0), (1, 1.0));
        assert_eq!(bracket(&axis, 2.0), (1, 0.5));
        // Saturates to the edge cells outside
        assert_eq!(bracket(&axis, -1.0), (0, -1.0));
        assert_eq!(bracket(&axis, 5.0), (1, 2.0));
        // Single-sample axis holds
        assert_eq!(bracket(&[4.0], 9.0), (0, 0.0));
        // Cells wider than f64::MAX
        let wide = [-1e308, 1e308];
        assert_eq!(bracket(&wide, 0.0), (0, 0.5));
        assert_eq!(bracket(&wide, 1e308), (0, 1.0));
        assert_eq!(bracket(&wide, -1e308), (0, 0.0));
    }

    #[test]
    fn test_table_spanning_full_float_range() {
        let table = Table::from_rows(&[[-1e308, 0.0], [1e308, 10.0]], Shape::new(1, 1).unwrap())
            .unwrap();
        assert_eq!(eval(&table, &Options::default(), &[0.0]).unwrap(), vec![5.0]);
        assert_eq!(eval(&table, &Options::default(), &[1.5e308]).unwrap(), vec![10.0]);

        // Sparse cells over the same range fall back to the nearest row
        let sparse = Table::from_rows(
            &[[-1e308, -1e308, 1.0], [1e308, -1e308, 2.0], [-1e308, 1e308, 3.0]],
            Shape::new(2, 1).unwrap(),
        )
        .unwrap();
        assert_eq!(eval(&sparse, &Options::default(), &[9e307, -9e307]).unwrap(), vec![2.0]);
    }

    #[test]
    fn test_linear_1d() {
        let table =
            Table::from_rows(&[[0.0, 0.0], [1.0, 10.0]], Shape::new(1, 1).unwrap()).unwrap();
        assert_eq!(eval(&table, &Options::default(), &[0.5]).unwrap(), vec![5.0]);
    }

    #[test]
    fn test_exact_samples_bit_exact() {
        let mut rng = rng_fixed_seed();
        let axes = vec![linspace(0.0, 1.0, 3), vec![-2.0, 0.5, 7.0]];
        let flat = grid_rows(&axes, 3, |_| randn::<f64>(&mut rng, 3)).unwrap();
        let table = Table::from_flat(flat, Shape::new(2, 3).unwrap()).unwrap();

        for row in table.rows() {
            let got = eval(&table, &Options::default(), &row[..2]).unwrap();
            assert_eq!(
                got.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
                row[2..].iter().map(|v| v.to_bits()).collect::<Vec<_>>()
            );
        }
    }

    /// Sum of coordinates is linear in every direction, so multilinear
    /// interpolation reproduces it everywhere, regardless of row order.
    #[test]
    fn test_interp_1d_to_5d_shuffled() {
        let mut rng = rng_fixed_seed();

        for ndims in 1..=5 {
            println!("Testing in {ndims} dims");
            let axes: Vec<Vec<f64>> = (0..ndims)
                .map(|i| {
                    // Make a linear grid and add noise
                    let mut x = linspace(-5.0 * (i as f64), 5.0 * ((i + 1) as f64), 4);
                    let dx = randn::<f64>(&mut rng, x.len());
                    (0..x.len()).for_each(|i| x[i] += (dx[i] - 0.5) / 10.0);
                    (0..x.len() - 1).for_each(|i| assert!(x[i + 1] > x[i]));
                    x
                })
                .collect();
            let flat = grid_rows(&axes, 2, |p| {
                let s: f64 = p.iter().sum();
                vec![s, -2.0 * s]
            })
            .unwrap();
            let flat = shuffle_rows(&mut rng, &flat, ndims + 2);
            let table = Table::from_flat(flat, Shape::new(ndims, 2).unwrap()).unwrap();

            let obs: Vec<Vec<f64>> = (0..ndims)
                .map(|i| linspace(-4.0 * (i as f64), 4.0 * ((i + 1) as f64), 3))
                .collect();
            // Noise may push the grid edge past the observation edge
            let opts = Options::default().with_extrapolation(Extrapolation::Linear);
            for point in meshgrid(obs.iter().collect()) {
                let s: f64 = point.iter().sum();
                let got = eval(&table, &opts, &point).unwrap();
                assert!((got[0] - s).abs() < 1e-10);
                assert!((got[1] + 2.0 * s).abs() < 1e-10);
            }
        }
    }

    /// Interpolate on a hat-shaped function to make sure that the grid cell indexing is aligned properly
    #[test]
    fn test_interp_hat_func() {
        fn hat_func(x: f64) -> f64 {
            if x <= 1.0 {
                x
            } else {
                2.0 - x
            }
        }

        let flat = grid_rows(&[vec![2.0, 0.0, 1.0]], 1, |p| vec![hat_func(p[0])]).unwrap();
        let table = Table::from_flat(flat, Shape::new(1, 1).unwrap()).unwrap();
        let opts = Options::default().with_extrapolation(Extrapolation::Linear);

        for x in linspace(-2.0, 4.0, 100) {
            let got = eval(&table, &opts, &[x]).unwrap();
            assert!((hat_func(x) - got[0]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_extrapolation_policies() {
        let flat =
            grid_rows(&[vec![0.0, 1.0], vec![0.0, 1.0]], 1, |p| vec![p[0] + 2.0 * p[1]]).unwrap();
        let table = Table::from_flat(flat, Shape::new(2, 1).unwrap()).unwrap();
        let query = [2.0, 0.5];

        let clamp = Options::default().with_extrapolation(Extrapolation::Clamp);
        assert_eq!(eval(&table, &clamp, &query).unwrap(), vec![2.0]);

        let linear = Options::default().with_extrapolation(Extrapolation::Linear);
        assert_eq!(eval(&table, &linear, &query).unwrap(), vec![3.0]);

        let nearest = Options::default().with_extrapolation(Extrapolation::Nearest);
        let got = eval(&table, &nearest, &[2.0, 0.9]).unwrap();
        assert_eq!(got, vec![3.0]);

        let error = Options::default().with_extrapolation(Extrapolation::Error);
        assert_eq!(
            eval(&table, &error, &query).unwrap_err(),
            InterpError::OutOfDomain {
                dim: 0,
                value: 2.0,
                lo: 0.0,
                hi: 1.0
            }
        );
        // Inside the hull every policy interpolates
        assert_eq!(eval(&table, &error, &[0.5, 0.5]).unwrap(), vec![1.5]);
    }

    /// Without an explicit policy, out-of-range queries take the nearest row
    /// rather than being clamped onto the edge and interpolated.
    #[test]
    fn test_default_does_not_clamp() {
        let flat =
            grid_rows(&[vec![0.0, 1.0], vec![0.0, 1.0]], 1, |p| vec![p[0] + 2.0 * p[1]]).unwrap();
        let table = Table::from_flat(flat, Shape::new(2, 1).unwrap()).unwrap();
        let defaults = Options::default();
        assert_eq!(defaults.extrapolation, Extrapolation::Nearest);

        // Clamping would give 1.0 + 2.0 * 0.25
        assert_eq!(eval(&table, &defaults, &[2.0, 0.25]).unwrap(), vec![1.0]);
        let clamp = Options::default().with_extrapolation(Extrapolation::Clamp);
        assert_eq!(eval(&table, &clamp, &[2.0, 0.25]).unwrap(), vec![1.5]);
    }

    #[test]
    fn test_sparse_grid() {
        // (1, 1) is missing
        let table = Table::from_rows(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 1.0, 2.0]],
            Shape::new(2, 1).unwrap(),
        )
        .unwrap();

        // Exact rows and edges between present rows still interpolate
        assert_eq!(eval(&table, &Options::default(), &[1.0, 0.0]).unwrap(), vec![1.0]);
        assert_eq!(eval(&table, &Options::default(), &[0.5, 0.0]).unwrap(), vec![0.5]);
        assert_eq!(eval(&table, &Options::default(), &[0.0, 0.25]).unwrap(), vec![0.5]);

        // Interior needs the missing corner: nearest row by default
        assert_eq!(eval(&table, &Options::default(), &[0.9, 0.1]).unwrap(), vec![1.0]);

        let strict = Options::default().with_missing_corner(MissingCorner::Error);
        assert_eq!(
            eval(&table, &strict, &[0.9, 0.1]).unwrap_err(),
            InterpError::HoleInGrid {
                corner: vec![1.0, 1.0]
            }
        );
    }

    #[test]
    fn test_degenerate_axis() {
        // y only sampled at 3.0
        let table = Table::from_rows(
            &[[0.0, 3.0, 0.0], [2.0, 3.0, 4.0]],
            Shape::new(2, 1).unwrap(),
        )
        .unwrap();
        assert_eq!(eval(&table, &Options::default(), &[1.0, 3.0]).unwrap(), vec![2.0]);
        // Clamped onto the single sample
        let clamp = Options::default().with_extrapolation(Extrapolation::Clamp);
        assert_eq!(eval(&table, &clamp, &[1.0, 8.0]).unwrap(), vec![2.0]);
    }

    #[test]
    fn test_no_data_columns() {
        let table = Table::from_flat(vec![0.0, 1.0], Shape::new(1, 0).unwrap()).unwrap();
        assert_eq!(eval(&table, &Options::default(), &[0.5]).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn test_bad_queries() {
        let table =
            Table::from_rows(&[[0.0, 0.0], [1.0, 10.0]], Shape::new(1, 1).unwrap()).unwrap();
        assert_eq!(
            eval(&table, &Options::default(), &[0.5, 0.5]).unwrap_err(),
            InterpError::DimensionMismatch {
                expected: 1,
                got: 2
            }
        );
        assert!(matches!(
            eval(&table, &Options::default(), &[f64::NAN]),
            Err(InterpError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_output_untouched_on_failure() {
        let table =
            Table::from_rows(&[[0.0, 0.0], [1.0, 10.0]], Shape::new(1, 1).unwrap()).unwrap();
        let index = GridIndex::build(&table, 0).unwrap();
        let opts = Options::default().with_extrapolation(Extrapolation::Error);
        let mut out = [-1.0];
        assert!(evaluate(&table, &index, &opts, &[3.0], &mut out).is_err());
        assert_eq!(out, [-1.0]);
    }
}
