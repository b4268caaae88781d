//! Raster grid and hazard region labeling.
//!
//! [`Grid`] is the unit of data exchanged between raster stages. It owns a
//! dense row-major buffer of 8-bit samples plus the palette the renderer
//! uses to display them. Dimensions are fixed at construction; the only
//! mutation is in-place reclassification of sample values.

mod criteria;
mod labeler;

pub use criteria::HazardCriteria;
pub use labeler::{CellIndex, LabelSummary, RegionLabeler};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::GridError;

/// An RGBA display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba(pub u8, pub u8, pub u8, pub u8);

impl Rgba {
    /// Opaque red, the default hazard color.
    pub const RED: Self = Self(255, 0, 0, 255);
}

/// Palette mapping sample values to display colors.
pub type ColorTable = BTreeMap<u8, Rgba>;

/// A dense 2D raster of 8-bit samples.
///
/// Deserialization goes through [`Grid::from_raw`], so a decoded grid is
/// held to the same extent checks as one built in memory.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid")]
pub struct Grid {
    rows: usize,
    cols: usize,
    samples: Vec<u8>,
    #[serde(default)]
    color_table: ColorTable,
}

/// Unchecked wire form of [`Grid`].
#[derive(Deserialize)]
struct RawGrid {
    rows: usize,
    cols: usize,
    samples: Vec<u8>,
    #[serde(default)]
    color_table: ColorTable,
}

impl TryFrom<RawGrid> for Grid {
    type Error = GridError;

    fn try_from(raw: RawGrid) -> Result<Self, Self::Error> {
        Ok(Self::from_raw(raw.rows, raw.cols, raw.samples)?.with_color_table(raw.color_table))
    }
}

impl Grid {
    /// Creates a zero-filled grid.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Empty`] if either extent is zero.
    pub fn new(rows: usize, cols: usize) -> Result<Self, GridError> {
        Self::filled(rows, cols, 0)
    }

    /// Creates a grid with every sample set to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Empty`] if either extent is zero.
    pub fn filled(rows: usize, cols: usize, value: u8) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::Empty { rows, cols });
        }
        Ok(Self {
            rows,
            cols,
            samples: vec![value; rows * cols],
            color_table: ColorTable::new(),
        })
    }

    /// Creates a grid from a row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if either extent is zero or the buffer length does
    /// not equal `rows * cols`.
    pub fn from_raw(rows: usize, cols: usize, samples: Vec<u8>) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::Empty { rows, cols });
        }
        if rows.checked_mul(cols) != Some(samples.len()) {
            return Err(GridError::BufferMismatch {
                len: samples.len(),
                rows,
                cols,
            });
        }
        Ok(Self {
            rows,
            cols,
            samples,
            color_table: ColorTable::new(),
        })
    }

    /// Creates a grid from nested rows of wide integers, as decoders of
    /// signed or 16-bit rasters produce them.
    ///
    /// # Errors
    ///
    /// Rejects empty or ragged input and any value outside `0..=255`.
    pub fn from_rows<R, V>(rows: &[R]) -> Result<Self, GridError>
    where
        R: AsRef<[V]>,
        V: Copy + Into<i64>,
    {
        let cols = rows.first().map_or(0, |row| row.as_ref().len());
        if rows.is_empty() || cols == 0 {
            return Err(GridError::Empty {
                rows: rows.len(),
                cols,
            });
        }

        let mut samples = Vec::with_capacity(rows.len() * cols);
        for (index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(GridError::Ragged {
                    row: index,
                    expected: cols,
                    found: row.len(),
                });
            }
            for value in row {
                samples.push(to_sample((*value).into())?);
            }
        }

        Self::from_raw(rows.len(), cols, samples)
    }

    /// Returns `(rows, cols)`.
    #[must_use]
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns the number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false: a grid has at least one cell.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Reads one sample.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] outside the extent.
    pub fn get(&self, row: usize, col: usize) -> Result<u8, GridError> {
        self.offset(row, col).map(|i| self.samples[i])
    }

    /// Writes one sample.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] outside the extent and
    /// [`GridError::InvalidValue`] for values outside `0..=255`.
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<i64>) -> Result<(), GridError> {
        let offset = self.offset(row, col)?;
        self.samples[offset] = to_sample(value.into())?;
        Ok(())
    }

    /// Returns the display palette.
    #[must_use]
    pub const fn color_table(&self) -> &ColorTable {
        &self.color_table
    }

    /// Sets the display color of one sample value.
    pub fn set_color_table(&mut self, value: u8, rgba: Rgba) {
        self.color_table.insert(value, rgba);
    }

    /// Replaces the whole palette.
    #[must_use]
    pub fn with_color_table(mut self, table: ColorTable) -> Self {
        self.color_table = table;
        self
    }

    /// Row-major view of the samples.
    #[must_use]
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// One row of samples.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] if `row` is past the last row.
    pub fn row(&self, row: usize) -> Result<&[u8], GridError> {
        let start = self.offset(row, 0)?;
        Ok(&self.samples[start..start + self.cols])
    }

    /// Number of cells holding `value`.
    #[must_use]
    pub fn count(&self, value: u8) -> usize {
        self.samples.iter().filter(|v| **v == value).count()
    }

    /// SHA-256 over the extent and samples, hex encoded.
    ///
    /// The palette is not part of the digest.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.rows as u64).to_le_bytes());
        hasher.update((self.cols as u64).to_le_bytes());
        hasher.update(&self.samples);
        hex::encode(hasher.finalize())
    }

    pub(crate) fn offset(&self, row: usize, col: usize) -> Result<usize, GridError> {
        if row >= self.rows || col >= self.cols {
            return Err(GridError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(row * self.cols + col)
    }

    pub(crate) fn samples_mut(&mut self) -> &mut [u8] {
        &mut self.samples
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("palette_entries", &self.color_table.len())
            .finish_non_exhaustive()
    }
}

fn to_sample(value: i64) -> Result<u8, GridError> {
    u8::try_from(value).map_err(|_| GridError::InvalidValue { value })
}
