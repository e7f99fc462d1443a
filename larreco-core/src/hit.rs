//! Hit types and the raw-row interface for detector data sources.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Hit timestamp in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Creates a new timestamp.
    #[inline]
    #[must_use]
    pub fn new(ns: u64) -> Self {
        Self(ns)
    }

    /// Returns the raw time value.
    #[inline]
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Computes the absolute time difference.
    #[inline]
    #[must_use]
    pub fn abs_diff(&self, other: &Self) -> u64 {
        self.0.abs_diff(other.0)
    }
}

/// A single trigger of one detector channel.
///
/// Hits are immutable once created; `id` is the row index in the source the
/// hit was read from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hit {
    /// Source row index.
    pub id: usize,
    /// Pixel x position.
    pub px: f64,
    /// Pixel y position.
    pub py: f64,
    /// Trigger time.
    pub ts: Timestamp,
    /// Collected charge (pedestal subtracted).
    pub q: f64,
    /// Chip identifier.
    pub chip_id: u32,
    /// Channel identifier on the chip.
    pub channel_id: u32,
    /// IO chain the chip is read out on, when known.
    pub io_chain: Option<u32>,
    /// Detector geometry tag, when known.
    pub geometry: Option<u32>,
}

impl Hit {
    /// Creates a hit without chain or geometry information.
    #[must_use]
    pub fn new(id: usize, px: f64, py: f64, ts: u64, q: f64) -> Self {
        Self {
            id,
            px,
            py,
            ts: Timestamp::new(ts),
            q,
            chip_id: 0,
            channel_id: 0,
            io_chain: None,
            geometry: None,
        }
    }

    /// Sets the chip and channel identity.
    #[must_use]
    pub fn with_channel(mut self, chip_id: u32, channel_id: u32) -> Self {
        self.chip_id = chip_id;
        self.channel_id = channel_id;
        self
    }

    /// Builds a hit from a decoded raw row.
    ///
    /// The charge is the pedestal-subtracted voltage `v - pdst_v`.
    ///
    /// # Errors
    /// Returns [`Error::Source`] if the timestamp or identifiers are negative.
    pub fn from_row(index: usize, row: &RawRow) -> Result<Self> {
        let ts = u64::try_from(row.timestamp).map_err(|_| {
            Error::Source(format!("row {index}: negative timestamp {}", row.timestamp))
        })?;
        let chip_id = u32::try_from(row.chip_id)
            .map_err(|_| Error::Source(format!("row {index}: invalid chip id {}", row.chip_id)))?;
        let channel_id = u32::try_from(row.channel_id).map_err(|_| {
            Error::Source(format!("row {index}: invalid channel id {}", row.channel_id))
        })?;

        Ok(Self {
            id: index,
            px: row.pixel_x,
            py: row.pixel_y,
            ts: Timestamp::new(ts),
            q: row.v - row.pdst_v,
            chip_id,
            channel_id,
            io_chain: None,
            geometry: None,
        })
    }

    /// Converts the hit back into a raw row (ADC and serial fields zeroed).
    #[must_use]
    pub fn to_row(&self) -> RawRow {
        RawRow {
            channel_id: i64::from(self.channel_id),
            chip_id: i64::from(self.chip_id),
            pixel_x: self.px,
            pixel_y: self.py,
            timestamp: self.ts.0 as i64,
            raw_timestamp: self.ts.0 as i64,
            v: self.q,
            ..RawRow::default()
        }
    }
}

/// One undecoded row of detector data with named columns.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawRow {
    pub channel_id: i64,
    pub chip_id: i64,
    pub pixel_id: i64,
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub raw_adc: i64,
    pub raw_timestamp: i64,
    pub adc: i64,
    pub timestamp: i64,
    pub serial_block: i64,
    pub v: f64,
    pub pdst_v: f64,
}

/// Numeric cell types a row can be stored as.
pub trait RowValue: Copy {
    fn as_i64(self) -> i64;
    fn as_f64(self) -> f64;
}

impl RowValue for i64 {
    #[inline]
    fn as_i64(self) -> i64 {
        self
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl RowValue for f64 {
    #[inline]
    fn as_i64(self) -> i64 {
        self as i64
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self
    }
}

/// Column positions of each named field within a stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RowLayout {
    pub channel_id: usize,
    pub chip_id: usize,
    pub pixel_id: usize,
    pub pixel_x: usize,
    pub pixel_y: usize,
    pub raw_adc: usize,
    pub raw_timestamp: usize,
    pub adc: usize,
    pub timestamp: usize,
    pub serial_block: usize,
    pub v: usize,
    pub pdst_v: usize,
}

impl Default for RowLayout {
    fn default() -> Self {
        Self {
            channel_id: 0,
            chip_id: 1,
            pixel_id: 2,
            pixel_x: 3,
            pixel_y: 4,
            raw_adc: 5,
            raw_timestamp: 6,
            adc: 7,
            timestamp: 8,
            serial_block: 9,
            v: 10,
            pdst_v: 11,
        }
    }
}

impl RowLayout {
    /// Minimum row width addressed by this layout.
    #[must_use]
    pub fn width(&self) -> usize {
        [
            self.channel_id,
            self.chip_id,
            self.pixel_id,
            self.pixel_x,
            self.pixel_y,
            self.raw_adc,
            self.raw_timestamp,
            self.adc,
            self.timestamp,
            self.serial_block,
            self.v,
            self.pdst_v,
        ]
        .into_iter()
        .max()
        .map_or(0, |max| max + 1)
    }

    /// Decodes one stored row into named fields.
    ///
    /// # Errors
    /// Returns [`Error::Source`] if the row is narrower than the layout.
    pub fn decode<T: RowValue>(&self, cells: &[T]) -> Result<RawRow> {
        if cells.len() < self.width() {
            return Err(Error::Source(format!(
                "row has {} columns, layout needs {}",
                cells.len(),
                self.width()
            )));
        }

        Ok(RawRow {
            channel_id: cells[self.channel_id].as_i64(),
            chip_id: cells[self.chip_id].as_i64(),
            pixel_id: cells[self.pixel_id].as_i64(),
            pixel_x: cells[self.pixel_x].as_f64(),
            pixel_y: cells[self.pixel_y].as_f64(),
            raw_adc: cells[self.raw_adc].as_i64(),
            raw_timestamp: cells[self.raw_timestamp].as_i64(),
            adc: cells[self.adc].as_i64(),
            timestamp: cells[self.timestamp].as_i64(),
            serial_block: cells[self.serial_block].as_i64(),
            v: cells[self.v].as_f64(),
            pdst_v: cells[self.pdst_v].as_f64(),
        })
    }
}

/// Random-access provider of raw detector rows.
///
/// Reads must be repeatable: asking for the same index twice returns the same
/// row. Indices at or past [`HitSource::len`] yield `Ok(None)`.
pub trait HitSource {
    /// Number of rows in the source.
    fn len(&self) -> usize;

    /// Returns true if the source holds no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches the row at `index`.
    ///
    /// # Errors
    /// Returns an error if the underlying storage cannot be read.
    fn get_row(&self, index: usize) -> Result<Option<RawRow>>;

    /// Fetches the row at `index` decoded as a [`Hit`].
    ///
    /// # Errors
    /// Returns an error if the row cannot be read or decoded.
    fn get_hit(&self, index: usize) -> Result<Option<Hit>> {
        match self.get_row(index)? {
            Some(row) => Hit::from_row(index, &row).map(Some),
            None => Ok(None),
        }
    }
}

impl<S: HitSource + ?Sized> HitSource for &S {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get_row(&self, index: usize) -> Result<Option<RawRow>> {
        (**self).get_row(index)
    }

    fn get_hit(&self, index: usize) -> Result<Option<Hit>> {
        (**self).get_hit(index)
    }
}

impl<S: HitSource + ?Sized> HitSource for Box<S> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get_row(&self, index: usize) -> Result<Option<RawRow>> {
        (**self).get_row(index)
    }

    fn get_hit(&self, index: usize) -> Result<Option<Hit>> {
        (**self).get_hit(index)
    }
}
