//! N-dimensional interpolation over tables of rows, each row holding
//! `nparams` parameter coordinates followed by `ndata` data values.
//!
//! Rows may come in any order and need not cover a full grid. The table is
//! indexed once into sorted per-parameter axes, then each query is bracketed
//! by bisection on every axis and evaluated by repeated linear interpolation
//! over the corners of the bracketing cell.
//!
//! # Performance Scalings
//! | Operation            | Cost                                   |
//! |----------------------|----------------------------------------|
//! | Index build          | O(nrows log nrows), once per table change |
//! | Bracketing search    | O(nparams * log2(nrows))               |
//! | Evaluation           | O(2^nparams * ndata)                   |
//! | Nearest-row fallback | O(log2(nrows)) expected                |
//!
//! # Example
//! ```rust
//! use rinterpolate::{Extrapolation, Interpolator, Options};
//!
//! // p0, p1, d0, d1
//! let rows = [
//!     [0.0, 0.0, 1.0, 0.0],
//!     [1.0, 0.0, 2.0, 10.0],
//!     [1.0, 1.0, 4.0, 30.0],
//!     [0.0, 1.0, 3.0, 20.0],
//! ];
//! let options = Options::default().with_extrapolation(Extrapolation::Linear);
//! let mut interp = Interpolator::from_rows(&rows, 2, 2, options).unwrap();
//!
//! assert_eq!(interp.interpolate(&[0.5, 0.5]).unwrap(), vec![2.5, 15.0]);
//! assert_eq!(interp.interpolate(&[2.0, 0.0]).unwrap(), vec![3.0, 20.0]);
//! ```
// These "needless" range loops are a significant speedup
#![allow(clippy::needless_range_loop)]

pub mod cache;
pub mod error;
pub mod grid;
pub mod interpolator;
pub mod multilinear;
pub mod nearest;
pub mod options;
pub mod table;
pub mod utils;

pub use error::{InterpError, Result};
pub use grid::GridIndex;
pub use interpolator::{Interpolator, Snapshot};
pub use options::{Extrapolation, MissingCorner, Options};
pub use table::{flatten, Shape, Table};

#[cfg(test)]
pub(crate) mod testing;
