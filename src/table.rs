//! Table store: an owned, validated, row-major table of
//! `nparams` parameter columns followed by `ndata` data columns.
//!
//! ```text
//! p0[0] p1[0] ... d0[0] d1[0] ...
//! p0[1] p1[1] ... d0[1] d1[1] ...
//! ```
//!
//! ```rust
//! use rinterpolate::{Shape, Table};
//!
//! let table = Table::from_rows(&[[1, 2, 3], [4, 5, 6]], Shape::new(2, 1).unwrap()).unwrap();
//! assert_eq!(table.nrows(), 2);
//! assert_eq!(table.values(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! ```
use crate::error::{InterpError, Result};
use ndarray::ArrayView2;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Number of parameter and data columns in each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    nparams: usize,
    ndata: usize,
}

impl Shape {
    /// # Errors
    /// * If `nparams` is zero
    pub fn new(nparams: usize, ndata: usize) -> Result<Self> {
        if nparams < 1 {
            return Err(InterpError::InvalidInput(
                "nparams must be at least 1".to_string(),
            ));
        }
        Ok(Self { nparams, ndata })
    }

    #[inline]
    pub fn nparams(&self) -> usize {
        self.nparams
    }

    #[inline]
    pub fn ndata(&self) -> usize {
        self.ndata
    }

    /// Total number of columns in a row
    #[inline]
    pub fn width(&self) -> usize {
        self.nparams + self.ndata
    }

    /// Number of rows in a flat table of `len` values.
    ///
    /// # Errors
    /// * If `len` is not a multiple of the row width
    pub fn nrows(&self, len: usize) -> Result<usize> {
        let width = self.width();
        if len % width != 0 {
            return Err(InterpError::InvalidInput(format!(
                "{len} values do not make a whole number of rows of width {width}"
            )));
        }
        Ok(len / width)
    }
}

/// Flatten a strictly homogeneous nested table row-major, converting every
/// value to `f64`.
///
/// # Errors
/// * If rows differ in length
/// * If a value is not representable as `f64`
pub fn flatten<T, R>(rows: &[R]) -> Result<Vec<f64>>
where
    T: ToPrimitive,
    R: AsRef<[T]>,
{
    let width = rows.first().map_or(0, |r| r.as_ref().len());
    let mut out = Vec::with_capacity(width * rows.len());
    for (i, row) in rows.iter().enumerate() {
        let row = row.as_ref();
        if row.len() != width {
            return Err(InterpError::InvalidInput(format!(
                "row {i} has {} values, expected {width}",
                row.len()
            )));
        }
        for v in row {
            out.push(v.to_f64().ok_or_else(|| {
                InterpError::InvalidInput(format!("row {i} holds a non-numeric value"))
            })?);
        }
    }
    Ok(out)
}

/// A validated table of rows.
///
/// Rows are kept in the order they were given; no sorting is required.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    values: Vec<f64>,
    shape: Shape,
    nrows: usize,
}

impl Table {
    /// Take ownership of a flat row-major buffer.
    ///
    /// # Errors
    /// * If the length is not a whole number of rows
    /// * If any parameter value is NaN or infinite
    pub fn from_flat(values: Vec<f64>, shape: Shape) -> Result<Self> {
        let nrows = shape.nrows(values.len())?;
        check_params(&values, shape)?;
        Ok(Self {
            values,
            shape,
            nrows,
        })
    }

    /// Load a nested table, one inner sequence per row.
    ///
    /// # Errors
    /// * If any row is not exactly `nparams + ndata` long
    /// * If any value is not representable or a parameter is not finite
    pub fn from_rows<T, R>(rows: &[R], shape: Shape) -> Result<Self>
    where
        T: ToPrimitive,
        R: AsRef<[T]>,
    {
        if let Some(first) = rows.first() {
            let got = first.as_ref().len();
            if got != shape.width() {
                return Err(InterpError::InvalidInput(format!(
                    "rows have {got} values, expected {}",
                    shape.width()
                )));
            }
        }
        Self::from_flat(flatten(rows)?, shape)
    }

    /// Load a table from a (rows x columns) array.
    ///
    /// # Errors
    /// * If the column count is not `nparams + ndata`
    /// * If any parameter is not finite
    pub fn from_array(arr: ArrayView2<'_, f64>, shape: Shape) -> Result<Self> {
        if arr.ncols() != shape.width() {
            return Err(InterpError::InvalidInput(format!(
                "array has {} columns, expected {}",
                arr.ncols(),
                shape.width()
            )));
        }
        Self::from_flat(arr.iter().copied().collect(), shape)
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    #[inline]
    pub fn nparams(&self) -> usize {
        self.shape.nparams
    }

    #[inline]
    pub fn ndata(&self) -> usize {
        self.shape.ndata
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Total number of values, `nrows * (nparams + ndata)`
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nrows == 0
    }

    /// The flat row-major buffer
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterate over rows
    pub fn rows(&self) -> core::slice::ChunksExact<'_, f64> {
        self.values.chunks_exact(self.shape.width())
    }

    #[inline]
    pub fn row(&self, i: usize) -> Option<&[f64]> {
        let w = self.shape.width();
        self.values.get(i * w..(i + 1) * w)
    }

    /// Parameter coordinates of row `i`
    #[inline]
    pub fn params(&self, i: usize) -> Option<&[f64]> {
        self.row(i).map(|r| &r[..self.shape.nparams])
    }

    /// Data values of row `i`
    #[inline]
    pub fn data(&self, i: usize) -> Option<&[f64]> {
        self.row(i).map(|r| &r[self.shape.nparams..])
    }

    /// View the table as a (rows x columns) array.
    ///
    /// # Errors
    /// * Only if the internal shape bookkeeping is broken
    pub fn as_array(&self) -> Result<ArrayView2<'_, f64>> {
        ArrayView2::from_shape((self.nrows, self.shape.width()), &self.values)
            .map_err(|e| InterpError::CacheInconsistency(e.to_string()))
    }

    /// Multiply logical column `index` (0 = first parameter) of every row by `factor`.
    ///
    /// # Errors
    /// * If `index` is not a column of this table
    /// * If `index` is a parameter column and any scaled coordinate would not be finite
    pub fn scale_column(&mut self, index: usize, factor: f64) -> Result<()> {
        let width = self.shape.width();
        if index >= width {
            return Err(InterpError::InvalidInput(format!(
                "column {index} out of range for rows of width {width}"
            )));
        }
        if index < self.shape.nparams
            && self.rows().any(|r| !(r[index] * factor).is_finite())
        {
            return Err(InterpError::InvalidInput(format!(
                "scaling parameter column {index} by {factor} leaves non-finite coordinates"
            )));
        }
        for i in 0..self.nrows {
            self.values[i * width + index] *= factor;
        }
        Ok(())
    }

    /// Replace the contents with a new flat buffer of the same shape.
    /// On failure the previous contents are kept.
    pub fn replace(&mut self, values: Vec<f64>) -> Result<()> {
        *self = Self::from_flat(values, self.shape)?;
        Ok(())
    }

    /// Reinterpret the same values with a different shape.
    /// On failure the previous shape is kept.
    pub fn reshape(&mut self, shape: Shape) -> Result<()> {
        let nrows = shape.nrows(self.values.len())?;
        check_params(&self.values, shape)?;
        self.shape = shape;
        self.nrows = nrows;
        Ok(())
    }
}

/// Parameter columns must be finite to be placed on an axis
fn check_params(values: &[f64], shape: Shape) -> Result<()> {
    for (i, row) in values.chunks_exact(shape.width()).enumerate() {
        if let Some(j) = row[..shape.nparams].iter().position(|p| !p.is_finite()) {
            return Err(InterpError::InvalidInput(format!(
                "row {i} has a non-finite value in parameter column {j}"
            )));
        }
    }
    Ok(())
}
