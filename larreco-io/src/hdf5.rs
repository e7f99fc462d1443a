//! HDF5 hit tables.
//!
//! The table is a 2-D dataset named `data` with one row per hit. Integer and
//! floating-point tables are both accepted; rows are decoded through a
//! [`RowLayout`].

use crate::{Error, Result};
use hdf5::types::{TypeDescriptor, VarLenUnicode};
use hdf5::{Dataset, File};
use larreco_core::{Hit, HitSource, RawRow, RowLayout, RowValue};
use log::debug;
use ndarray::Array2;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Name of the hit table within the file.
pub const DATA_DATASET: &str = "data";

const DESCRIPTION_ATTR: &str = "description";

/// Attribute names read for the description, in order. Older files carry
/// the misspelled name.
const DESCRIPTION_ATTRS: [&str; 2] = [DESCRIPTION_ATTR, "descripiton"];

enum Cells {
    Int(Array2<i64>),
    Float(Array2<f64>),
}

impl Cells {
    fn rows(&self) -> usize {
        match self {
            Self::Int(cells) => cells.nrows(),
            Self::Float(cells) => cells.nrows(),
        }
    }

    fn cols(&self) -> usize {
        match self {
            Self::Int(cells) => cells.ncols(),
            Self::Float(cells) => cells.ncols(),
        }
    }

    fn decode(&self, index: usize, layout: &RowLayout) -> larreco_core::Result<RawRow> {
        match self {
            Self::Int(cells) => decode_row(cells, index, layout),
            Self::Float(cells) => decode_row(cells, index, layout),
        }
    }
}

fn decode_row<T: RowValue>(
    cells: &Array2<T>,
    index: usize,
    layout: &RowLayout,
) -> larreco_core::Result<RawRow> {
    let row = cells.row(index);
    match row.as_slice() {
        Some(slice) => layout.decode(slice),
        None => layout.decode(&row.to_vec()),
    }
}

/// Hit source over the `data` table of an HDF5 file.
///
/// The table is read once on open.
pub struct Hdf5HitSource {
    cells: Cells,
    layout: RowLayout,
    description: Option<String>,
    path: PathBuf,
}

impl Hdf5HitSource {
    /// Opens `path` with the default column layout.
    ///
    /// # Errors
    /// Returns an error if the file or dataset cannot be read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_layout(path, RowLayout::default())
    }

    /// Opens `path`, decoding rows with `layout`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the dataset is not 2-D or is
    /// narrower than the layout.
    pub fn open_with_layout<P: AsRef<Path>>(path: P, layout: RowLayout) -> Result<Self> {
        let file = File::open(&path)?;
        let dataset = file.dataset(DATA_DATASET)?;
        let shape = dataset.shape();
        if shape.len() != 2 {
            return Err(Error::InvalidFormat(format!(
                "dataset `{DATA_DATASET}` has rank {}, expected 2",
                shape.len()
            )));
        }

        let cells = read_cells(&dataset)?;
        if cells.rows() > 0 && cells.cols() < layout.width() {
            return Err(Error::InvalidFormat(format!(
                "dataset `{DATA_DATASET}` has {} columns, layout needs {}",
                cells.cols(),
                layout.width()
            )));
        }

        let description = read_description(&dataset)?;

        debug!(
            "read {} rows of width {} from {}",
            cells.rows(),
            cells.cols(),
            path.as_ref().display()
        );
        Ok(Self {
            cells,
            layout,
            description,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Free-text description stored alongside the table, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Number of columns in the table.
    #[must_use]
    pub fn width(&self) -> usize {
        self.cells.cols()
    }

    /// Returns the path of the opened file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HitSource for Hdf5HitSource {
    fn len(&self) -> usize {
        self.cells.rows()
    }

    fn get_row(&self, index: usize) -> larreco_core::Result<Option<RawRow>> {
        if index >= self.cells.rows() {
            return Ok(None);
        }
        self.cells.decode(index, &self.layout).map(Some)
    }
}

fn read_description(dataset: &Dataset) -> Result<Option<String>> {
    for name in DESCRIPTION_ATTRS {
        if let Ok(attr) = dataset.attr(name) {
            let value: VarLenUnicode = attr.read_scalar()?;
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}

fn read_cells(dataset: &Dataset) -> Result<Cells> {
    let descriptor = dataset.dtype()?.to_descriptor()?;
    match descriptor {
        TypeDescriptor::Float(_) => Ok(Cells::Float(dataset.read_2d::<f64>()?)),
        TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) => {
            Ok(Cells::Int(dataset.read_2d::<i64>()?))
        }
        other => Err(Error::InvalidFormat(format!(
            "dataset `{DATA_DATASET}` has unsupported type {other:?}"
        ))),
    }
}

/// Writes `hits` as a floating-point `data` table in the default layout.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
#[allow(clippy::cast_precision_loss)]
pub fn write_hits_hdf5<P: AsRef<Path>>(
    path: P,
    hits: &[Hit],
    description: Option<&str>,
) -> Result<()> {
    let layout = RowLayout::default();
    let width = layout.width();
    let mut cells = Array2::<f64>::zeros((hits.len(), width));
    for (mut row, hit) in cells.rows_mut().into_iter().zip(hits) {
        let raw = hit.to_row();
        row[layout.channel_id] = raw.channel_id as f64;
        row[layout.chip_id] = raw.chip_id as f64;
        row[layout.pixel_id] = raw.pixel_id as f64;
        row[layout.pixel_x] = raw.pixel_x;
        row[layout.pixel_y] = raw.pixel_y;
        row[layout.raw_adc] = raw.raw_adc as f64;
        row[layout.raw_timestamp] = raw.raw_timestamp as f64;
        row[layout.adc] = raw.adc as f64;
        row[layout.timestamp] = raw.timestamp as f64;
        row[layout.serial_block] = raw.serial_block as f64;
        row[layout.v] = raw.v;
        row[layout.pdst_v] = raw.pdst_v;
    }

    let file = File::create(path)?;
    let dataset = file
        .new_dataset::<f64>()
        .shape((hits.len(), width))
        .create(DATA_DATASET)?;
    dataset.write(&cells)?;

    if let Some(text) = description {
        let value = VarLenUnicode::from_str(text)
            .map_err(|e| Error::InvalidFormat(format!("invalid utf-8 attribute: {e}")))?;
        dataset
            .new_attr::<VarLenUnicode>()
            .create(DESCRIPTION_ATTR)?
            .write_scalar(&value)?;
    }
    Ok(())
}
