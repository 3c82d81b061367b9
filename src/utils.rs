//! Convenience methods for constructing grids and gridded tables in a way that echoes,
//! but does not exactly match, methods common in scripting languages.
use crate::error::{InterpError, Result};
use itertools::Itertools;
use num_traits::Float;

/// Generates evenly spaced values from start to stop,
/// including the endpoint.
pub fn linspace<T>(start: T, stop: T, n: usize) -> Vec<T>
where
    T: Float,
{
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let dx: T = (stop - start) / T::from(n - 1).unwrap_or_else(T::one);
            (0..n)
                .map(|i| start + T::from(i).unwrap_or_else(T::zero) * dx)
                .collect()
        }
    }
}

/// Generates a meshgrid in C ordering (x0, y0, z0, x0, y0, z1, ..., x0, yn, zn)
pub fn meshgrid<T>(x: Vec<&Vec<T>>) -> Vec<Vec<T>>
where
    T: Float,
{
    x.into_iter()
        .multi_cartesian_product()
        .map(|xx| xx.iter().map(|y| **y).collect())
        .collect()
}

/// Build the flat rows of a full rectilinear table, one row per point of the
/// meshgrid of `axes`, with the data columns filled by `f(coordinates)`.
///
/// Each row is laid out as the coordinates followed by `ndata` values, which is
/// the layout [`Table::from_flat`](crate::Table::from_flat) expects.
///
/// # Errors
/// * If `f` returns other than `ndata` values for any point
pub fn grid_rows<F>(axes: &[Vec<f64>], ndata: usize, mut f: F) -> Result<Vec<f64>>
where
    F: FnMut(&[f64]) -> Vec<f64>,
{
    let mut out = Vec::new();
    for point in meshgrid(axes.iter().collect()) {
        let data = f(&point);
        if data.len() != ndata {
            return Err(InterpError::InvalidInput(format!(
                "{} data values generated at {point:?}, expected {ndata}",
                data.len()
            )));
        }
        out.extend_from_slice(&point);
        out.extend_from_slice(&data);
    }
    Ok(out)
}
